//! # TCP client stack
//!
//! This crate implements [TcpClientStack] of [embedded_nal] on top of the single socket of the module.
//! So just one socket may be used at a time.
//!
//! Outgoing data is sent in chunks of [MAX_SEND_SIZE] bytes. Inbound frames exceeding the
//! receive buffer are kept and returned by subsequent receive calls.
//!
//! ## Example
//!
//! ````
//! # use core::net::SocketAddr;
//! # use core::str::FromStr;
//! # use embedded_nal::TcpClientStack;
//! # use wizfi_at::example::{ExampleTimer, ExampleTransport};
//! # use wizfi_at::transport::NoReset;
//! # use wizfi_at::wifi::Adapter;
//! #
//! let mut adapter: Adapter<_, _, _, 1_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default(), NoReset);
//! adapter.initialize().unwrap();
//! adapter.join_access_point("test_wifi", "secret", 15_000, 3).unwrap();
//!
//! // Creating a TCP connection
//! let mut socket = adapter.socket().unwrap();
//! adapter.connect(&mut socket, SocketAddr::from_str("10.0.0.1:21").unwrap()).unwrap();
//!
//! // Sending some data
//! adapter.send(&mut socket, b"hallo!").unwrap();
//!
//! // Receiving some data
//! let mut rx_buffer = [0x0; 64];
//! let length = adapter.receive(&mut socket, &mut rx_buffer).unwrap();
//! assert_eq!(b"nice to see you!", &rx_buffer[..length]);
//!
//! // Closing socket
//! adapter.close(socket).unwrap();
//! ````
use crate::error::{Error, Rejection};
use crate::ipd::InboundFrame;
use crate::session::ConnectionType;
use crate::socket::MAX_SEND_SIZE;
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use core::fmt::Write;
use core::net::{SocketAddr, SocketAddrV4};
use embedded_nal::TcpClientStack;
use fugit_timer::Timer;
use heapless::String;

/// Handle of the single socket
#[derive(Debug)]
pub struct Socket {
    /// Remote address if connected
    remote: Option<SocketAddrV4>,
}

impl Socket {
    pub(crate) fn new() -> Self {
        Self { remote: None }
    }

    /// Remote address the socket is connected to
    pub fn remote(&self) -> Option<SocketAddrV4> {
        self.remote
    }
}

/// Received frame which did not fit completely into the receive buffer
#[derive(Debug)]
pub(crate) struct PendingFrame {
    data: InboundFrame,

    /// Index of the next byte to return
    position: usize,
}

impl PendingFrame {
    pub(crate) fn new(data: InboundFrame) -> Self {
        Self { data, position: 0 }
    }

    /// Copies as many remaining bytes as fit into the buffer and returns the copied length
    pub(crate) fn read_into(&mut self, buffer: &mut [u8]) -> usize {
        let remaining = &self.data[self.position..];
        let length = remaining.len().min(buffer.len());

        buffer[..length].copy_from_slice(&remaining[..length]);
        self.position += length;
        length
    }

    /// Returns true if all bytes were returned
    pub(crate) fn is_consumed(&self) -> bool {
        self.position >= self.data.len()
    }
}

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> TcpClientStack
    for Adapter<S, T, R, TIMER_HZ>
{
    type TcpSocket = Socket;
    type Error = Error;

    /// Returns the socket. Fails with [Error::NoSocketAvailable] if the socket is already in use.
    fn socket(&mut self) -> Result<Self::TcpSocket, Self::Error> {
        if self.socket_taken {
            return Err(Error::NoSocketAvailable);
        }

        self.socket_taken = true;
        Ok(Socket::new())
    }

    /// Opens a TCP connection. Just IPv4 remotes are supported.
    fn connect(&mut self, socket: &mut Socket, remote: SocketAddr) -> nb::Result<(), Self::Error> {
        let SocketAddr::V4(address) = remote else {
            return Err(nb::Error::Other(Error::InvalidArgument));
        };

        let mut host: String<15> = String::new();
        write!(host, "{}", address.ip()).map_err(|_| Error::InvalidArgument)?;

        let keep_alive = self.config.keep_alive_s;
        let retries = self.config.retries;

        if !self.open_socket(ConnectionType::Tcp, &host, address.port(), keep_alive, retries)? {
            return Err(nb::Error::Other(Error::ConnectionRejected(Rejection::SocketRefused)));
        }

        socket.remote = Some(address);
        Ok(())
    }

    /// Sends the whole buffer and returns its length
    fn send(&mut self, socket: &mut Socket, buffer: &[u8]) -> nb::Result<usize, Self::Error> {
        self.assert_socket_connected(socket)?;

        for chunk in buffer.chunks(MAX_SEND_SIZE) {
            if !self.send_socket_data(chunk, self.config.send_timeout_ms)? {
                return Err(nb::Error::Other(Error::ConnectionRejected(Rejection::SendFailed)));
            }
        }

        Ok(buffer.len())
    }

    /// Receives the next frame, or the remainder of the previous one. Returns [nb::Error::WouldBlock]
    /// if no data arrived within the configured receive timeout.
    fn receive(&mut self, socket: &mut Socket, buffer: &mut [u8]) -> nb::Result<usize, Self::Error> {
        self.assert_socket_connected(socket)?;

        let mut pending = match self.pending.take() {
            Some(pending) => pending,
            None => {
                let frame = self.socket_receive(self.config.receive_timeout_ms)?;

                if frame.is_empty() {
                    return Err(nb::Error::WouldBlock);
                }

                PendingFrame::new(frame)
            }
        };

        let length = pending.read_into(buffer);

        if !pending.is_consumed() {
            self.pending = Some(pending);
        }

        Ok(length)
    }

    /// Closes the socket. Sockets which were never connected are just released.
    fn close(&mut self, socket: Socket) -> Result<(), Self::Error> {
        self.socket_taken = false;

        if socket.remote.is_none() {
            return Ok(());
        }

        self.close_socket()
    }
}

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// The socket counts as disconnected once the module reported it closed, e.g. by a status query
    fn assert_socket_connected(&self, socket: &Socket) -> Result<(), Error> {
        if socket.remote.is_none() || self.session.connection_type.is_none() {
            return Err(Error::SocketUnconnected);
        }

        Ok(())
    }
}
