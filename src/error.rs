use crate::responses::truncated;
use embedded_io::ErrorKind;
use embedded_nal::{TcpError, TcpErrorKind};
use heapless::String;

/// Max. length of a command text stored in [Error::NoAcknowledgement]
pub const COMMAND_TEXT_CAPACITY: usize = 64;

/// Command text (possibly truncated) naming the command which was not acknowledged
pub type CommandText = String<COMMAND_TEXT_CAPACITY>;

/// Driver errors
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// All attempts were exhausted without a recognized success terminator
    NoAcknowledgement(CommandText),

    /// Deadline passed without a complete response, prompt or confirmation
    Timeout,

    /// The expected structured reply line (given prefix) was not found or could not be parsed.
    /// Indicates a protocol or firmware mismatch, so retrying does not help.
    MalformedResponse(&'static str),

    /// The module explicitly refused the operation
    ConnectionRejected(Rejection),

    /// Unsupported connection type, out-of-range mode or an argument exceeding the command limits
    InvalidArgument,

    /// Response did not fit into the response buffer
    ResponseOverflow,

    /// Upstream transport error
    Transport(ErrorKind),

    /// Upstream timer error
    TimerError,

    /// Setting the reset line failed
    ResetFailed,

    /// The single socket is already in use
    NoSocketAvailable,

    /// Socket is not connected, e.g. because the remote side closed it
    SocketUnconnected,
}

/// Reason of [Error::ConnectionRejected]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Join response is missing `WIFI CONNECTED`
    NotConnected,

    /// Join response is missing `WIFI GOT IP`
    NoIpAddress,

    /// Socket start was answered without a confirmed `CONNECT`
    SocketRefused,

    /// Data transmission was answered by `ERROR` or `SEND FAIL`
    SendFailed,
}

impl Error {
    /// Creates a [Error::NoAcknowledgement] for the given command text, truncated if necessary
    pub(crate) fn no_acknowledgement(text: &str) -> Self {
        Self::NoAcknowledgement(truncated(text))
    }

    /// Maps an upstream transport error
    pub(crate) fn transport<E: embedded_io::Error>(error: E) -> Self {
        Self::Transport(error.kind())
    }
}

impl TcpError for Error {
    fn kind(&self) -> TcpErrorKind {
        match self {
            Error::ConnectionRejected(Rejection::SocketRefused) | Error::SocketUnconnected => TcpErrorKind::PipeClosed,
            _ => TcpErrorKind::Other,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NoAcknowledgement(command) => defmt::write!(f, "Error::NoAcknowledgement({})", command.as_str()),
            Error::Timeout => defmt::write!(f, "Error::Timeout"),
            Error::MalformedResponse(prefix) => defmt::write!(f, "Error::MalformedResponse({})", prefix),
            Error::ConnectionRejected(reason) => {
                defmt::write!(f, "Error::ConnectionRejected({})", defmt::Debug2Format(reason))
            }
            Error::InvalidArgument => defmt::write!(f, "Error::InvalidArgument"),
            Error::ResponseOverflow => defmt::write!(f, "Error::ResponseOverflow"),
            Error::Transport(kind) => defmt::write!(f, "Error::Transport({})", defmt::Debug2Format(kind)),
            Error::TimerError => defmt::write!(f, "Error::TimerError"),
            Error::ResetFailed => defmt::write!(f, "Error::ResetFailed"),
            Error::NoSocketAvailable => defmt::write!(f, "Error::NoSocketAvailable"),
            Error::SocketUnconnected => defmt::write!(f, "Error::SocketUnconnected"),
        }
    }
}
