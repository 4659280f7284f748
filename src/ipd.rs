//! # Inbound socket data
//!
//! The module pushes received socket data unsolicited as `+IPD,<length>:<data>` frames. The
//! payload is binary and not escaped, so after the header exactly `<length>` bytes are consumed,
//! independent of any line structure.
//!
//! Noise preceding a frame (e.g. left over status lines) is skipped.
use crate::error::Error;
use crate::reader::Deadline;
use crate::responses::parse_number;
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use fugit_timer::Timer;
use heapless::Vec;

/// Max. payload length of a single inbound frame
pub const MAX_FRAME_SIZE: usize = 1500;

/// Payload of an inbound frame
pub type InboundFrame = Vec<u8, MAX_FRAME_SIZE>;

const IPD_MARKER: &[u8] = b"+IPD,";

/// Max. length of a frame header. Longer candidates are dropped.
const HEADER_WINDOW: usize = 20;

/// Byte-wise detector of the `+IPD,<length>:` header
#[derive(Default)]
pub(crate) struct IpdScanner {
    window: Vec<u8, HEADER_WINDOW>,
}

impl IpdScanner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Processes the next byte. Returns the payload length once a complete and valid header was received.
    pub(crate) fn feed(&mut self, byte: u8) -> Option<usize> {
        if byte == b'+' {
            self.window.clear();
        } else if self.window.is_empty() {
            return None;
        }

        if self.window.push(byte).is_err() {
            self.window.clear();
            return None;
        }

        let compared = self.window.len().min(IPD_MARKER.len());
        if self.window[..compared] != IPD_MARKER[..compared] {
            self.window.clear();
            return None;
        }

        if byte != b':' || self.window.len() <= IPD_MARKER.len() {
            return None;
        }

        let length = parse_number::<usize>(&self.window[IPD_MARKER.len()..self.window.len() - 1]);
        self.window.clear();

        match length {
            Some(length) if length > 0 && length <= MAX_FRAME_SIZE => Some(length),
            _ => {
                debug!("Skipping invalid +IPD header");
                None
            }
        }
    }
}

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// Receives the next inbound frame of the open socket.
    ///
    /// Returns as soon as the frame is complete. If the timeout (restarted on every received byte)
    /// passes first, the data received so far is returned, which may be empty. A short result
    /// just means that no more data arrived in time.
    pub fn socket_receive(&mut self, timeout_ms: u32) -> Result<InboundFrame, Error> {
        let mut scanner = IpdScanner::new();
        let mut frame = InboundFrame::new();
        let mut expected = None;
        let mut deadline = Deadline::start(&mut self.timer, timeout_ms);

        loop {
            let available = self.transport.read_available().map_err(Error::transport)?;

            if available == 0 {
                self.transport.set_flow_control(true).map_err(Error::transport)?;

                if deadline.is_expired(&mut self.timer) {
                    break;
                }

                continue;
            }

            self.transport.set_flow_control(false).map_err(Error::transport)?;
            deadline.restart(&mut self.timer);

            let Some(length) = expected else {
                let byte = self.transport.read_byte().map_err(Error::transport)?;
                expected = scanner.feed(byte);

                if let Some(length) = expected {
                    trace!("Receiving {} bytes", length);
                }
                continue;
            };

            for _ in 0..(length - frame.len()).min(available) {
                let byte = self.transport.read_byte().map_err(Error::transport)?;
                frame.push(byte).map_err(|_| Error::ResponseOverflow)?;
            }

            if frame.len() == length {
                trace!("Received frame of {} bytes", length);
                return Ok(frame);
            }
        }

        self.transport.set_flow_control(false).map_err(Error::transport)?;

        if let Some(length) = expected {
            debug!("Frame incomplete, received {} of {} bytes", frame.len(), length);
        }

        Ok(frame)
    }
}
