//! # WIFI access point client
//!
//! Joining a network, scanning for access points and obtaining address information is supported.
//!
//! ## Example
//!
//! ````
//! # use wizfi_at::example::{ExampleTimer, ExampleTransport};
//! # use wizfi_at::transport::NoReset;
//! # use wizfi_at::wifi::Adapter;
//! #
//! let mut adapter: Adapter<_, _, _, 1_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default(), NoReset);
//! adapter.initialize().unwrap();
//!
//! adapter.join_access_point("test_wifi", "secret", 15_000, 3).unwrap();
//! assert_eq!("test_wifi", adapter.session().associated_ssid.as_ref().unwrap().as_str());
//!
//! let address = adapter.get_address().unwrap();
//! assert_eq!("10.0.0.181", address.ipv4.unwrap().to_string());
//! ````
use crate::commands::Command;
use crate::config::Config;
use crate::engine::{WIFI_CONNECTED, WIFI_GOT_IP};
use crate::error::{Error, Rejection};
use crate::responses::{AccessPoint, LocalAddress, RemoteAccessPoint};
use crate::session::{Session, SocketStatus, WifiMode};
use crate::stack::PendingFrame;
use crate::transport::{ResetLine, Transport};
use core::net::Ipv4Addr;
use core::str::FromStr;
use fugit_timer::Timer;
use heapless::{String, Vec};

/// Max. number of access points returned by a scan
pub const MAX_SCAN_RESULTS: usize = 20;

/// Join timeout used by [Adapter::connect_access_point]
const CONNECT_TIMEOUT_MS: u32 = 15_000;

/// Central client for network communication
///
/// TIMER_HZ: Frequency of the timer used for timeouts and delays
pub struct Adapter<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> {
    /// Serial link to the module
    pub(crate) transport: S,

    /// Timer used as monotonic clock and for delays
    pub(crate) timer: T,

    /// Hardware reset line
    pub(crate) reset: R,

    /// Timing and protocol settings
    pub(crate) config: Config,

    /// Connection state
    pub(crate) session: Session,

    /// Firmware version, cached by [Adapter::version]
    pub(crate) version: Option<String<64>>,

    /// True if the socket was handed out as [embedded_nal::TcpClientStack] socket
    pub(crate) socket_taken: bool,

    /// Received frame not fully consumed yet by [embedded_nal::TcpClientStack::receive]
    pub(crate) pending: Option<PendingFrame>,
}

/// Access point credentials, optionally with SNTP settings applied after joining
#[derive(Copy, Clone, Debug, Default)]
pub struct Credentials<'a> {
    pub ssid: &'a str,

    pub password: &'a str,

    /// UTC offset in hours. If set SNTP gets enabled after joining.
    pub timezone: Option<i8>,

    /// SNTP server, just used in combination with timezone
    pub ntp_server: Option<&'a str>,
}

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// Creates a new adapter using the default configuration
    pub fn new(transport: S, timer: T, reset: R) -> Self {
        Self::with_config(transport, timer, reset, Config::default())
    }

    pub fn with_config(transport: S, timer: T, reset: R, config: Config) -> Self {
        Self {
            transport,
            timer,
            reset,
            session: Session::new(config.baud_rate),
            config,
            version: None,
            socket_taken: false,
            pending: None,
        }
    }

    /// Current connection state
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Releases transport, timer and reset line
    pub fn release(self) -> (S, T, R) {
        (self.transport, self.timer, self.reset)
    }

    /// Joins the access point of the credentials unless already joined. Enables SNTP if a timezone is given.
    pub fn connect_access_point(&mut self, credentials: &Credentials<'_>) -> Result<(), Error> {
        let retries = self.config.retries;
        self.join_access_point(credentials.ssid, credentials.password, CONNECT_TIMEOUT_MS, retries)?;

        if let Some(timezone) = credentials.timezone {
            self.sntp_config(true, Some(timezone), credentials.ntp_server)?;
        }

        Ok(())
    }

    /// Joins the given access point. Does nothing if the module is already joined to this SSID.
    ///
    /// Station mode is enabled if necessary. Joining succeeds only if the module confirmed both
    /// the connection and the IP assignment, otherwise [Error::ConnectionRejected] names the
    /// missing confirmation.
    pub fn join_access_point(&mut self, ssid: &str, password: &str, timeout_ms: u32, retries: usize) -> Result<(), Error> {
        let command = Command::join(ssid, password, timeout_ms, retries)?;

        if let Some(remote) = self.remote_access_point()? {
            if remote.ssid.as_str() == ssid {
                info!("Already joined to {}", ssid);
                self.session.associated_ssid = Some(remote.ssid);
                return Ok(());
            }
        }

        if self.mode()? != WifiMode::Station {
            self.set_mode(WifiMode::Station)?;
        }

        let response = self.execute(&command)?;

        if !response.contains(WIFI_CONNECTED) {
            return Err(Error::ConnectionRejected(Rejection::NotConnected));
        }

        if !response.contains(WIFI_GOT_IP) {
            return Err(Error::ConnectionRejected(Rejection::NoIpAddress));
        }

        self.session.associated_ssid = String::from_str(ssid).ok();
        self.session.socket_status = SocketStatus::ApConnectedNoSocket;
        info!("Joined to {}", ssid);

        // Just confirms that the station IP configuration is readable
        self.execute(&Command::station_address_query(timeout_ms, retries)?)?;
        Ok(())
    }

    /// Returns the currently joined access point, None if not joined
    pub fn remote_access_point(&mut self) -> Result<Option<RemoteAccessPoint>, Error> {
        if !self.status()?.is_associated() {
            self.session.associated_ssid = None;
            return Ok(None);
        }

        let response = self.execute(&Command::remote_access_point()?)?;

        match response.line_after(b"+CWJAP:") {
            Some(arguments) => Ok(Some(RemoteAccessPoint::parse(arguments)?)),
            None => {
                self.session.associated_ssid = None;
                Ok(None)
            }
        }
    }

    /// Scans for access points. A scan may fail transiently, so it is repeated up to `retries` times.
    pub fn scan_access_points(&mut self, retries: usize) -> Result<Vec<AccessPoint, MAX_SCAN_RESULTS>, Error> {
        let mut last_error = Error::Timeout;

        for attempt in 1..=retries.max(1) {
            match self.scan() {
                Ok(access_points) => return Ok(access_points),
                Err(error @ (Error::NoAcknowledgement(_) | Error::Timeout)) => {
                    warn!("Scan attempt {} failed", attempt);
                    last_error = error;
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error)
    }

    fn scan(&mut self) -> Result<Vec<AccessPoint, MAX_SCAN_RESULTS>, Error> {
        if self.mode()? != WifiMode::Station {
            self.set_mode(WifiMode::Station)?;
        }

        let response = self.execute(&Command::list_access_points()?)?;
        let mut access_points = Vec::new();

        for arguments in response.lines().filter_map(|line| line.strip_prefix(b"+CWLAP:")) {
            if access_points.push(AccessPoint::parse(arguments)?).is_err() {
                debug!("Scan result limit reached");
                break;
            }
        }

        Ok(access_points)
    }

    /// Returns the current WIFI mode
    pub fn mode(&mut self) -> Result<WifiMode, Error> {
        let response = self.execute(&Command::mode_query()?)?;
        let mode = response
            .line_after(b"+CWMODE:")
            .and_then(crate::responses::parse_number::<u8>)
            .ok_or(Error::MalformedResponse("+CWMODE:"))?;

        WifiMode::try_from(mode).map_err(|_| Error::MalformedResponse("+CWMODE:"))
    }

    /// Sets the WIFI mode (not stored in flash)
    pub fn set_mode(&mut self, mode: WifiMode) -> Result<(), Error> {
        self.execute(&Command::set_mode(mode)?)?;
        Ok(())
    }

    /// Returns local address information
    pub fn get_address(&mut self) -> Result<LocalAddress, Error> {
        let response = self.execute(&Command::local_address()?)?;
        LocalAddress::from_response(&response)
    }

    /// Returns the local station IPv4 address
    pub fn local_ip(&mut self) -> Result<Ipv4Addr, Error> {
        self.get_address()?.ipv4.ok_or(Error::MalformedResponse("+CIFSR:STAIP"))
    }
}
