//! Single socket lifecycle: opening, closing and sending
use crate::commands::Command;
use crate::engine::{Progress, ALREADY_CONNECTED, CONNECT, ERROR, PROMPT, SEND_FAIL, SEND_OK};
use crate::error::Error;
use crate::session::{ConnectionType, SocketStatus};
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use fugit_timer::Timer;

/// Max. number of bytes sent by a single [Adapter::send_socket_data] call
pub const MAX_SEND_SIZE: usize = 2048;

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// Opens the socket to the given remote host (IP address or domain name).
    ///
    /// Any socket still open gets closed first. Returns true if the module confirmed the
    /// connection, false if it answered without confirmation.
    pub fn open_socket(
        &mut self,
        connection_type: ConnectionType,
        host: &str,
        port: u16,
        keep_alive: u16,
        retries: usize,
    ) -> Result<bool, Error> {
        let command = Command::start_socket(connection_type, host, port, keep_alive, retries)?;

        // Module does not rebind UDP sockets implicitly
        if connection_type == ConnectionType::Udp {
            self.close_socket()?;
        }

        self.wait_for_free_socket()?;
        let response = self.execute(&command)?;

        if response.contains(ALREADY_CONNECTED) {
            debug!("Socket was already connected");
            self.socket_opened(connection_type);
            return Ok(true);
        }

        if !response.contains(CONNECT) {
            return Ok(false);
        }

        let confirmed = match connection_type {
            // UDP has no connection state to confirm
            ConnectionType::Udp => true,
            ConnectionType::Tcp | ConnectionType::Ssl => self.status()? == SocketStatus::SocketOpen,
        };

        if confirmed {
            info!("Socket opened to {}:{}", host, port);
            self.socket_opened(connection_type);
        }

        Ok(confirmed)
    }

    /// Closes the socket. A missing acknowledgement means there was no open socket.
    pub fn close_socket(&mut self) -> Result<(), Error> {
        self.session.socket_disconnected();
        self.pending = None;

        match self.execute(&Command::close_socket()?) {
            Ok(_) | Err(Error::NoAcknowledgement(_)) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Sends the buffer over the open socket. Returns true if the module confirmed the transmission.
    /// UDP transmissions are not confirmed, so true is returned as soon as the data is written.
    pub fn send_socket_data(&mut self, buffer: &[u8], timeout_ms: u32) -> Result<bool, Error> {
        if buffer.is_empty() || buffer.len() > MAX_SEND_SIZE {
            return Err(Error::InvalidArgument);
        }

        let response = self.execute(&Command::send_length(buffer.len(), timeout_ms)?)?;

        if !response.as_bytes().contains(&PROMPT) {
            self.read_response(timeout_ms, |data| {
                if data.contains(&PROMPT) {
                    Progress::Complete
                } else {
                    Progress::Pending
                }
            })?;
        }

        trace!("Sending {} bytes", buffer.len());
        self.transport.write(buffer).map_err(Error::transport)?;

        if self.session.connection_type == Some(ConnectionType::Udp) {
            return Ok(true);
        }

        let confirmation = self.read_response(timeout_ms, |data| {
            if data.ends_with(SEND_OK) || data.ends_with(SEND_FAIL) || data.ends_with(ERROR) {
                Progress::Complete
            } else {
                Progress::Pending
            }
        })?;

        if !confirmation.ends_with(SEND_OK) {
            warn!("Transmission of {} bytes failed", buffer.len());
            return Ok(false);
        }

        Ok(true)
    }

    /// Polls the status until a new socket may be opened. A socket still open gets closed.
    fn wait_for_free_socket(&mut self) -> Result<(), Error> {
        for _ in 0..self.config.socket_poll_limit.max(1) {
            match self.status()? {
                status if status.is_ready_for_socket() => return Ok(()),
                SocketStatus::SocketOpen => {
                    debug!("Closing stale socket");
                    self.close_socket()?;
                }
                _ => self.delay_ms(self.config.socket_poll_interval_ms)?,
            }
        }

        warn!("No free socket available");
        Err(Error::Timeout)
    }

    fn socket_opened(&mut self, connection_type: ConnectionType) {
        self.session.connection_type = Some(connection_type);
        self.session.socket_status = SocketStatus::SocketOpen;
    }
}
