//! # Session state
//!
//! Connection state of one module. Only the [Adapter](crate::wifi::Adapter) operations owning the
//! corresponding lifecycle mutate it.
use crate::error::Error;
use core::str::FromStr;
use heapless::String;

/// Connection state of the module tracked by the driver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Module has been synced and configured
    pub initialized: bool,

    /// SSID of the currently joined access point
    pub associated_ssid: Option<String<32>>,

    /// Last known socket state
    pub socket_status: SocketStatus,

    /// Type of the currently open socket. Gets cleared when the socket is disconnected.
    pub connection_type: Option<ConnectionType>,

    /// True if connected to a MQTT broker
    pub mqtt_connected: bool,

    /// Current baud rate of the serial link
    pub baud_rate: u32,
}

impl Session {
    pub(crate) fn new(baud_rate: u32) -> Self {
        Self {
            initialized: false,
            associated_ssid: None,
            socket_status: SocketStatus::Idle,
            connection_type: None,
            mqtt_connected: false,
            baud_rate,
        }
    }

    /// Resets everything except the baud rate, e.g. after the module was restarted
    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.baud_rate);
    }

    /// Marks the socket as disconnected
    pub(crate) fn socket_disconnected(&mut self) {
        self.connection_type = None;

        if self.socket_status == SocketStatus::SocketOpen {
            self.socket_status = SocketStatus::SocketClosed;
        }
    }
}

/// Socket state as reported by `AT+CIPSTATUS`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SocketStatus {
    /// Not joined to an access point (or not initialized yet)
    Idle,

    /// Joined to an access point, IP assigned, no socket was opened yet
    ApConnectedNoSocket,

    /// Socket is open
    SocketOpen,

    /// Socket was closed
    SocketClosed,
}

impl SocketStatus {
    /// Maps the numeric `STATUS:<n>` value
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            2 => Self::ApConnectedNoSocket,
            3 => Self::SocketOpen,
            4 => Self::SocketClosed,
            _ => Self::Idle,
        }
    }

    /// True if a new socket may be opened
    pub fn is_ready_for_socket(&self) -> bool {
        matches!(self, Self::ApConnectedNoSocket | Self::SocketClosed)
    }

    /// True if joined to an access point
    pub fn is_associated(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Socket connection type
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionType {
    Tcp,
    Udp,
    /// TLS is performed by the module itself
    Ssl,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Tcp => "TCP",
            ConnectionType::Udp => "UDP",
            ConnectionType::Ssl => "SSL",
        }
    }
}

impl FromStr for ConnectionType {
    type Err = Error;

    /// Parses `TCP`, `UDP` or `SSL`, everything else is unsupported
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "TCP" => Ok(Self::Tcp),
            "UDP" => Ok(Self::Udp),
            "SSL" => Ok(Self::Ssl),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// WIFI mode of the module
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WifiMode {
    Station = 1,
    SoftAp = 2,
    SoftApStation = 3,
}

impl TryFrom<u8> for WifiMode {
    type Error = Error;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            1 => Ok(Self::Station),
            2 => Ok(Self::SoftAp),
            3 => Ok(Self::SoftApStation),
            _ => Err(Error::InvalidArgument),
        }
    }
}
