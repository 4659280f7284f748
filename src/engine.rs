//! # Command engine
//!
//! Sends a [Command], collects the response until the command's [Completion] rule signals the end
//! and retries the whole exchange if the module did not acknowledge it.
//!
//! The firmware is inconsistent about how responses end: most commands finish with `OK`, but e.g.
//! joining an access point finishes with `WIFI GOT IP` and a transmission request with a `>`
//! prompt. These exceptions are expressed by the [Completion] of each command.
use crate::commands::Command;
use crate::error::Error;
use crate::fmt::printable;
use crate::responses::{contains, Response};
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use fugit_timer::Timer;

/// Regular success terminator
pub const OK: &[u8] = b"OK\r\n";

/// Regular failure terminator
pub const ERROR: &[u8] = b"ERROR\r\n";

/// Module is still busy with a previous command (sending)
pub const BUSY_SENDING: &[u8] = b"busy s...\r\n";

/// Module is still busy with a previous command (processing)
pub const BUSY_PROCESSING: &[u8] = b"busy p...\r\n";

/// Extended error report, ends the current attempt
pub const ERR_CODE: &[u8] = b"ERR CODE:";

pub const CONNECT: &[u8] = b"CONNECT\r\n";
pub const WIFI_CONNECTED: &[u8] = b"WIFI CONNECTED\r\n";
pub const WIFI_GOT_IP: &[u8] = b"WIFI GOT IP\r\n";
pub const ALREADY_CONNECTED: &[u8] = b"ALREADY CONNECTED\r\n";
pub const CLOSED: &[u8] = b"CLOSED\r\n";
pub const SEND_OK: &[u8] = b"SEND OK\r\n";
pub const SEND_FAIL: &[u8] = b"SEND FAIL\r\n";

/// Data prompt sent when the module is ready to receive raw socket data
pub const PROMPT: u8 = b'>';

/// Rule detecting the end of a command response and whether it counts as acknowledged
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Ends on `OK` (acknowledged) or `ERROR`
    Default,

    /// Additionally ends as soon as the given marker was received, which counts as acknowledged
    AlternateMarker(&'static [u8]),

    /// Additionally ends as soon as the `>` data prompt was received, which counts as acknowledged
    Prompt,

    /// Ends on `OK` or `ERROR`, both count as acknowledged
    AcceptError,
}

/// State of a response after receiving a byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// More data is expected
    Pending,

    /// Module signaled it is busy. Waiting continues after a backoff.
    Busy,

    /// Response is complete
    Complete,
}

impl Completion {
    /// Evaluates the response received so far
    pub fn evaluate(&self, data: &[u8]) -> Progress {
        if contains(data, ERR_CODE) {
            return Progress::Complete;
        }

        let alternate_reached = match self {
            Completion::AlternateMarker(marker) => contains(data, marker),
            Completion::Prompt => data.contains(&PROMPT),
            Completion::Default | Completion::AcceptError => false,
        };

        if alternate_reached || data.ends_with(OK) || data.ends_with(ERROR) {
            return Progress::Complete;
        }

        if data.ends_with(BUSY_SENDING) || data.ends_with(BUSY_PROCESSING) {
            return Progress::Busy;
        }

        Progress::Pending
    }

    /// Returns the payload of a complete response, or None if the response was not acknowledged.
    /// The `OK` terminator is stripped, alternate markers are kept.
    pub fn accept(&self, mut response: Response) -> Option<Response> {
        if response.contains(ERR_CODE) {
            return None;
        }

        let alternate_reached = match self {
            Completion::AlternateMarker(marker) => response.contains(marker),
            Completion::Prompt => response.as_bytes().contains(&PROMPT),
            Completion::AcceptError => response.ends_with(ERROR),
            Completion::Default => false,
        };

        if alternate_reached {
            return Some(response);
        }

        if response.ends_with(OK) {
            response.strip_suffix(OK.len());
            return Some(response);
        }

        None
    }
}

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// Sends the command and returns the acknowledged response.
    ///
    /// Each attempt discards stale input, writes the command and waits for the response. Busy
    /// signals of the module are waited out within the same attempt. Attempts ending without
    /// acknowledgement (including timeouts) are repeated after a backoff. If all attempts fail
    /// [Error::NoAcknowledgement] naming the command is returned.
    pub fn execute(&mut self, command: &Command) -> Result<Response, Error> {
        let attempts = command.retries().unwrap_or(self.config.retries).max(1);
        let timeout_ms = command.timeout_ms().unwrap_or(self.config.command_timeout_ms);
        let completion = command.completion();

        for attempt in 1..=attempts {
            self.discard_stale_input()?;
            debug!("---> {}", command.name());
            self.transport.write(command.as_bytes()).map_err(Error::transport)?;

            match self.read_response(timeout_ms, |data| completion.evaluate(data)) {
                Ok(response) => {
                    if command.is_sensitive() {
                        debug!("<--- {} bytes", response.len());
                    } else {
                        debug!("<--- {}", printable(response.as_bytes()));
                    }

                    if let Some(payload) = completion.accept(response) {
                        return Ok(payload);
                    }
                }
                Err(Error::Timeout) => debug!("Timeout waiting for response of {}", command.name()),
                Err(error) => return Err(error),
            }

            if attempt < attempts {
                warn!("{} not acknowledged, attempt {}/{}", command.name(), attempt, attempts);
                self.delay_ms(self.config.retry_backoff_ms)?;
            }
        }

        warn!("{} not acknowledged", command.name());
        Err(Error::no_acknowledgement(command.text()))
    }
}
