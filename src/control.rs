//! Module control: synchronization, resets, status and diagnostic queries
use crate::commands::Command;
use crate::engine::ERROR;
use crate::error::Error;
use crate::responses::{parse_number, truncated};
use crate::session::SocketStatus;
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use core::net::Ipv4Addr;
use core::str::FromStr;
use fugit_timer::Timer;
use heapless::String;

/// Number of sync attempts of [Adapter::initialize]
const INITIALIZE_ATTEMPTS: usize = 3;

/// Recovery time after `AT+RST`
const SOFT_RESET_RECOVERY_MS: u32 = 2_000;

/// Time the reset line is held low
const RESET_PULSE_MS: u32 = 100;

/// Boot time after releasing the reset line
const BOOT_TIME_MS: u32 = 5_000;

/// Settle time before and after switching the baud rate
const BAUD_RATE_SETTLE_MS: u32 = 250;

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// Syncs with the module (soft reset if out of sync), enforces single connection mode and configures
    /// the SSL buffer. May be called multiple times.
    pub fn initialize(&mut self) -> Result<(), Error> {
        let mut last_error = Error::no_acknowledgement("AT");

        for attempt in 1..=INITIALIZE_ATTEMPTS {
            match self.configure() {
                Ok(()) => {
                    self.session.initialized = true;
                    info!("Module initialized");
                    return Ok(());
                }
                Err(error @ Error::NoAcknowledgement(_)) => {
                    warn!("Initialization attempt {} failed", attempt);
                    last_error = error;
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error)
    }

    fn configure(&mut self) -> Result<(), Error> {
        if !self.sync()? && !self.soft_reset()? && !self.soft_reset()? {
            return Err(Error::no_acknowledgement("AT"));
        }

        if self.multiplexing()? != 0 {
            self.execute(&Command::single_connection()?)?;
        }

        match self.execute(&Command::ssl_buffer_size(self.config.ssl_buffer_size)?) {
            Ok(_) => {}
            Err(Error::NoAcknowledgement(_)) => {
                // Older firmware does not support setting the buffer size
                if self.execute(&Command::ssl_configuration_query()?).is_err() {
                    warn!("SSL configuration not available");
                }
            }
            Err(error) => return Err(error),
        }

        Ok(())
    }

    /// Checks if the module answers to a plain `AT`
    pub fn sync(&mut self) -> Result<bool, Error> {
        match self.execute(&Command::probe()?) {
            Ok(_) => Ok(true),
            Err(Error::NoAcknowledgement(_)) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Restarts the module by `AT+RST`. Returns true if the module answers again after restart.
    pub fn soft_reset(&mut self) -> Result<bool, Error> {
        match self.execute(&Command::restart()?) {
            Ok(_) => {}
            Err(Error::NoAcknowledgement(_)) => return Ok(false),
            Err(error) => return Err(error),
        }

        self.delay_ms(SOFT_RESET_RECOVERY_MS)?;
        self.module_restarted();

        match self.execute(&Command::probe()?.with_retries(1)) {
            Ok(_) => Ok(true),
            Err(Error::NoAcknowledgement(_)) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Restarts the module by toggling the reset line
    pub fn hard_reset(&mut self) -> Result<(), Error> {
        info!("Hard reset");
        self.reset.set_level(false).map_err(|_| Error::ResetFailed)?;
        self.delay_ms(RESET_PULSE_MS)?;
        self.reset.set_level(true).map_err(|_| Error::ResetFailed)?;
        self.delay_ms(BOOT_TIME_MS)?;

        self.module_restarted();
        Ok(())
    }

    /// Hard reset followed by restoring the factory settings
    pub fn factory_reset(&mut self) -> Result<(), Error> {
        self.hard_reset()?;
        self.execute(&Command::restore()?)?;
        self.module_restarted();
        Ok(())
    }

    /// Puts the module in deep sleep for the given duration. Zero means until the next hard reset.
    pub fn deep_sleep(&mut self, duration_ms: u32) -> Result<bool, Error> {
        match self.execute(&Command::deep_sleep(duration_ms)?) {
            Ok(_) => Ok(true),
            Err(Error::NoAcknowledgement(_)) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Performs an OTA firmware update
    pub fn update_firmware(&mut self) -> Result<(), Error> {
        self.execute(&Command::firmware_update()?)?;
        self.delay_ms(1_000)
    }

    /// Initializes the module if not done yet. Returns true if joined to an access point.
    pub fn is_connected(&mut self) -> Result<bool, Error> {
        if !self.session.initialized {
            self.initialize()?;
        }

        match self.status() {
            Ok(status) => Ok(status.is_associated()),
            Err(Error::NoAcknowledgement(_) | Error::MalformedResponse(_)) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Returns the multiplexing mode. 0 => single connection, 1 => multiple connections
    pub fn multiplexing(&mut self) -> Result<u8, Error> {
        let response = self.execute(&Command::multiplexing_query()?)?;

        response
            .line_after(b"+CIPMUX:")
            .and_then(parse_number)
            .ok_or(Error::MalformedResponse("+CIPMUX:"))
    }

    /// Queries the connection status and updates the session
    pub fn status(&mut self) -> Result<SocketStatus, Error> {
        let response = self.execute(&Command::status()?)?;
        let code = response
            .line_after(b"STATUS:")
            .and_then(|value| value.first())
            .filter(|digit| digit.is_ascii_digit())
            .ok_or(Error::MalformedResponse("STATUS:"))?;

        let status = SocketStatus::from_code(code - b'0');
        self.session.socket_status = status;

        if matches!(status, SocketStatus::SocketClosed | SocketStatus::Idle) {
            self.session.connection_type = None;
        }

        Ok(status)
    }

    /// Pings the given host. Returns the round trip time in ms or None if the host did not answer.
    pub fn ping(&mut self, host: &str) -> Result<Option<u32>, Error> {
        let response = self.execute(&Command::ping(host)?)?;

        if response.ends_with(ERROR) {
            return Ok(None);
        }

        let line = response
            .lines()
            .find(|line| line.starts_with(b"+"))
            .ok_or(Error::MalformedResponse("+PING:"))?;

        let value = line.strip_prefix(b"+PING:").unwrap_or(&line[1..]);
        Ok(parse_number(value))
    }

    /// Resolves the given host name
    pub fn nslookup(&mut self, host: &str) -> Result<Ipv4Addr, Error> {
        let response = self.execute(&Command::domain_lookup(host)?)?;

        response
            .line_after(b"+CIPDOMAIN:")
            .and_then(|value| core::str::from_utf8(value).ok())
            .and_then(|value| Ipv4Addr::from_str(value.trim().trim_matches('"')).ok())
            .ok_or(Error::MalformedResponse("+CIPDOMAIN:"))
    }

    /// Requests the firmware version line. The result gets cached, s. [Adapter::cached_version]
    pub fn version(&mut self) -> Result<&str, Error> {
        let response = self.execute(&Command::version()?)?;

        let line = response
            .lines()
            .filter(|line| crate::responses::contains(line, b"version"))
            .filter_map(|line| core::str::from_utf8(line).ok())
            .last()
            .ok_or(Error::MalformedResponse("version"))?;

        Ok(self.version.insert(truncated(line)).as_str())
    }

    /// Version of the last [Adapter::version] call
    pub fn cached_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Configures SNTP. Timezone is the UTC offset in hours.
    pub fn sntp_config(&mut self, enable: bool, timezone: Option<i8>, server: Option<&str>) -> Result<(), Error> {
        self.execute(&Command::sntp_config(enable, timezone, server)?)?;
        Ok(())
    }

    /// Returns the SNTP time as reported by the module, e.g. `Thu Aug 04 14:48:05 2016`
    pub fn sntp_time(&mut self) -> Result<Option<String<64>>, Error> {
        let response = self.execute(&Command::sntp_time()?)?;

        Ok(response
            .line_after(b"+CIPSNTPTIME:")
            .and_then(|value| core::str::from_utf8(value).ok())
            .map(truncated))
    }

    /// Switches module and transport to the given baud rate. Fails if the module is not in sync afterwards.
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), Error> {
        let command = Command::uart(baud_rate, self.config.hardware_flow_control)?;
        info!("Changing baud rate to {}", baud_rate);

        // Module switches immediately, so the response is lost anyway
        self.transport.write(command.as_bytes()).map_err(Error::transport)?;
        self.delay_ms(BAUD_RATE_SETTLE_MS)?;

        self.transport.set_baud_rate(baud_rate).map_err(Error::transport)?;
        self.session.baud_rate = baud_rate;
        self.delay_ms(BAUD_RATE_SETTLE_MS)?;

        if !self.sync()? {
            return Err(Error::no_acknowledgement("AT"));
        }

        Ok(())
    }

    /// Enables or disables the command echo
    pub fn set_echo(&mut self, enabled: bool) -> Result<(), Error> {
        self.execute(&Command::echo(enabled)?)?;
        Ok(())
    }

    /// Forgets all state bound to the previous module run
    fn module_restarted(&mut self) {
        self.session.reset();
        self.pending = None;
    }
}
