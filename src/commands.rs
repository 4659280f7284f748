//! # AT commands
//!
//! A [Command] bundles the command line with its completion rule, timeout and retry budget.
//! The constructors below encode the module's command set in one place, including the
//! per-command completion exceptions of the firmware.
use crate::engine::{Completion, ALREADY_CONNECTED, CLOSED, WIFI_GOT_IP};
use crate::error::Error;
use crate::session::{ConnectionType, WifiMode};
use core::fmt::{Arguments, Write};
use heapless::String;

/// Max. length of an encoded command line including CRLF
pub const COMMAND_CAPACITY: usize = 256;

/// Single AT command
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// Encoded command line including the trailing CRLF
    line: String<COMMAND_CAPACITY>,

    /// Rule for detecting the end of the response
    completion: Completion,

    /// Response timeout in ms. None => default of [Config](crate::config::Config)
    timeout_ms: Option<u32>,

    /// Number of attempts. None => default of [Config](crate::config::Config)
    retries: Option<usize>,

    /// Arguments contain credentials. Echoed by the module, so the response is not logged.
    sensitive: bool,
}

impl Command {
    /// Creates a command with default completion rule, e.g. `Command::new("AT+CIPSTATUS")`
    pub fn new(text: &str) -> Result<Self, Error> {
        Self::format(format_args!("{}", text))
    }

    /// Creates a command from format arguments. Fails if the encoded line exceeds [COMMAND_CAPACITY].
    pub(crate) fn format(arguments: Arguments<'_>) -> Result<Self, Error> {
        let mut line = String::new();
        line.write_fmt(arguments).map_err(|_| Error::InvalidArgument)?;
        line.push_str("\r\n").map_err(|_| Error::InvalidArgument)?;

        Ok(Self {
            line,
            completion: Completion::Default,
            timeout_ms: None,
            retries: None,
            sensitive: false,
        })
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Marks the command as carrying credentials
    pub fn with_secrets(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Command text without CRLF
    pub fn text(&self) -> &str {
        let line = self.line.as_str();
        &line[..line.len() - 2]
    }

    /// Command text without arguments, e.g. `AT+CWJAP`. Used for logging, as arguments may contain secrets.
    pub fn name(&self) -> &str {
        let text = self.text();
        text.split_once('=').map_or(text, |(name, _)| name)
    }

    /// Encoded command line including CRLF
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }

    pub fn completion(&self) -> Completion {
        self.completion
    }

    pub fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }

    pub fn retries(&self) -> Option<usize> {
        self.retries
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }
}

/// Ensures that the value may be placed inside a quoted command argument
fn quotable(value: &str) -> Result<&str, Error> {
    if value.bytes().any(|byte| matches!(byte, b'"' | b'\r' | b'\n')) {
        return Err(Error::InvalidArgument);
    }

    Ok(value)
}

/// WPA passphrase of up to 63 characters, or a raw PSK given as 64 hex digits
fn is_valid_passphrase(password: &str) -> bool {
    match password.len() {
        0..=63 => true,
        64 => password.bytes().all(|byte| byte.is_ascii_hexdigit()),
        _ => false,
    }
}

impl Command {
    /// Plain `AT` probe for checking sync
    pub(crate) fn probe() -> Result<Self, Error> {
        Ok(Self::new("AT")?.with_timeout_ms(1_000))
    }

    pub(crate) fn restart() -> Result<Self, Error> {
        Ok(Self::new("AT+RST")?.with_timeout_ms(1_000))
    }

    pub(crate) fn restore() -> Result<Self, Error> {
        Ok(Self::new("AT+RESTORE")?.with_timeout_ms(1_000))
    }

    pub(crate) fn echo(enabled: bool) -> Result<Self, Error> {
        let text = if enabled { "ATE1" } else { "ATE0" };
        Ok(Self::new(text)?.with_timeout_ms(1_000))
    }

    pub(crate) fn multiplexing_query() -> Result<Self, Error> {
        Ok(Self::new("AT+CIPMUX?")?.with_timeout_ms(3_000))
    }

    /// Disables multiple connections
    pub(crate) fn single_connection() -> Result<Self, Error> {
        Ok(Self::new("AT+CIPMUX=0")?.with_timeout_ms(3_000))
    }

    pub(crate) fn ssl_buffer_size(size: u16) -> Result<Self, Error> {
        Ok(Self::format(format_args!("AT+CIPSSLSIZE={}", size))?
            .with_timeout_ms(3_000)
            .with_retries(1))
    }

    pub(crate) fn ssl_configuration_query() -> Result<Self, Error> {
        Self::new("AT+CIPSSLCCONF?")
    }

    pub(crate) fn status() -> Result<Self, Error> {
        Ok(Self::new("AT+CIPSTATUS")?.with_timeout_ms(5_000))
    }

    pub(crate) fn mode_query() -> Result<Self, Error> {
        Ok(Self::new("AT+CWMODE?")?.with_timeout_ms(5_000))
    }

    pub(crate) fn set_mode(mode: WifiMode) -> Result<Self, Error> {
        Ok(Self::format(format_args!("AT+CWMODE_CUR={}", mode as u8))?.with_timeout_ms(3_000))
    }

    pub(crate) fn local_address() -> Result<Self, Error> {
        Self::new("AT+CIFSR")
    }

    /// A failed ping is answered by ERROR, which is a valid answer
    pub(crate) fn ping(host: &str) -> Result<Self, Error> {
        let host = quotable(host.trim_matches('"'))?;

        Ok(Self::format(format_args!("AT+PING=\"{}\"", host))?
            .with_completion(Completion::AcceptError)
            .with_timeout_ms(5_000))
    }

    pub(crate) fn domain_lookup(host: &str) -> Result<Self, Error> {
        let host = quotable(host.trim_matches('"'))?;
        Ok(Self::format(format_args!("AT+CIPDOMAIN=\"{}\"", host))?.with_timeout_ms(3_000))
    }

    pub(crate) fn remote_access_point() -> Result<Self, Error> {
        Ok(Self::new("AT+CWJAP?")?.with_timeout_ms(10_000))
    }

    /// Joining is not finished by OK but by `WIFI GOT IP`
    pub(crate) fn join(ssid: &str, password: &str, timeout_ms: u32, retries: usize) -> Result<Self, Error> {
        if ssid.len() > 32 || !is_valid_passphrase(password) {
            return Err(Error::InvalidArgument);
        }

        Ok(
            Self::format(format_args!("AT+CWJAP=\"{}\",\"{}\"", quotable(ssid)?, quotable(password)?))?
                .with_completion(Completion::AlternateMarker(WIFI_GOT_IP))
                .with_timeout_ms(timeout_ms)
                .with_retries(retries)
                .with_secrets(),
        )
    }

    pub(crate) fn station_address_query(timeout_ms: u32, retries: usize) -> Result<Self, Error> {
        Ok(Self::new("AT+CIPSTA_CUR?")?
            .with_timeout_ms(timeout_ms)
            .with_retries(retries))
    }

    pub(crate) fn list_access_points() -> Result<Self, Error> {
        Ok(Self::new("AT+CWLAP")?.with_timeout_ms(5_000))
    }

    pub(crate) fn version() -> Result<Self, Error> {
        Ok(Self::new("AT+GMR")?.with_timeout_ms(3_000))
    }

    pub(crate) fn sntp_config(enable: bool, timezone: Option<i8>, server: Option<&str>) -> Result<Self, Error> {
        let mut text: String<COMMAND_CAPACITY> = String::new();
        write!(text, "AT+CIPSNTPCFG={}", u8::from(enable)).map_err(|_| Error::InvalidArgument)?;

        if let Some(timezone) = timezone {
            write!(text, ",{}", timezone).map_err(|_| Error::InvalidArgument)?;
        }

        if let Some(server) = server {
            write!(text, ",\"{}\"", quotable(server)?).map_err(|_| Error::InvalidArgument)?;
        }

        Ok(Self::new(&text)?.with_timeout_ms(3_000))
    }

    pub(crate) fn sntp_time() -> Result<Self, Error> {
        Ok(Self::new("AT+CIPSNTPTIME?")?.with_timeout_ms(5_000))
    }

    /// Baud rate change. The module switches immediately, so no response is expected.
    pub(crate) fn uart(baud_rate: u32, flow_control: bool) -> Result<Self, Error> {
        Self::format(format_args!(
            "AT+UART_CUR={},8,1,0,{}",
            baud_rate,
            if flow_control { 2 } else { 0 }
        ))
    }

    pub(crate) fn deep_sleep(duration_ms: u32) -> Result<Self, Error> {
        Ok(Self::format(format_args!("AT+GSLP={}", duration_ms))?.with_retries(1))
    }

    pub(crate) fn firmware_update() -> Result<Self, Error> {
        Ok(Self::new("AT+CIUPDATE")?.with_timeout_ms(300_000).with_retries(1))
    }

    /// A socket being already open is answered by `ALREADY CONNECTED` instead of OK
    pub(crate) fn start_socket(
        connection_type: ConnectionType,
        host: &str,
        port: u16,
        keep_alive: u16,
        retries: usize,
    ) -> Result<Self, Error> {
        Ok(Self::format(format_args!(
            "AT+CIPSTART=\"{}\",\"{}\",{},{}",
            connection_type.as_str(),
            quotable(host)?,
            port,
            keep_alive
        ))?
        .with_completion(Completion::AlternateMarker(ALREADY_CONNECTED))
        .with_timeout_ms(100_000)
        .with_retries(retries))
    }

    pub(crate) fn close_socket() -> Result<Self, Error> {
        Ok(Self::new("AT+CIPCLOSE")?.with_retries(1))
    }

    /// Announces the data length. The module answers with a `>` prompt when ready for the data.
    pub(crate) fn send_length(length: usize, timeout_ms: u32) -> Result<Self, Error> {
        Ok(Self::format(format_args!("AT+CIPSEND={}", length))?
            .with_completion(Completion::Prompt)
            .with_timeout_ms(timeout_ms)
            .with_retries(1))
    }

    pub(crate) fn mqtt_set(username: &str, password: &str, client_id: &str, keep_alive: u16) -> Result<Self, Error> {
        Ok(Self::format(format_args!(
            "AT+MQTTSET=\"{}\",\"{}\",\"{}\",{}",
            quotable(username)?,
            quotable(password)?,
            quotable(client_id)?,
            keep_alive
        ))?
        .with_retries(1)
        .with_secrets())
    }

    pub(crate) fn mqtt_qos(qos: u8) -> Result<Self, Error> {
        if qos > 2 {
            return Err(Error::InvalidArgument);
        }

        Ok(Self::format(format_args!("AT+MQTTQOS={}", qos))?.with_retries(1))
    }

    pub(crate) fn mqtt_topic(publish_topic: &str, subscribe_topic: &str) -> Result<Self, Error> {
        Ok(Self::format(format_args!(
            "AT+MQTTTOPIC=\"{}\",\"{}\"",
            quotable(publish_topic)?,
            quotable(subscribe_topic)?
        ))?
        .with_retries(1))
    }

    /// Link ID qualified form is used if a link ID is given
    pub(crate) fn mqtt_connect(auth: bool, broker: &str, port: u16, link_id: Option<u8>) -> Result<Self, Error> {
        let broker = quotable(broker)?;
        let auth = u8::from(auth);

        let command = match link_id {
            Some(link_id) => Self::format(format_args!(
                "AT+MQTTCON={},{},\"{}\",{}",
                link_id, auth, broker, port
            ))?,
            None => Self::format(format_args!("AT+MQTTCON={},\"{}\",{}", auth, broker, port))?,
        };

        Ok(command.with_timeout_ms(100_000).with_retries(3))
    }

    pub(crate) fn mqtt_publish(message: &str) -> Result<Self, Error> {
        Ok(Self::format(format_args!("AT+MQTTPUB=\"{}\"", quotable(message)?))?.with_retries(1))
    }

    /// Disconnect is confirmed by `CLOSED` instead of OK
    pub(crate) fn mqtt_disconnect() -> Result<Self, Error> {
        Ok(Self::new("AT+MQTTDIS")?
            .with_completion(Completion::AlternateMarker(CLOSED))
            .with_retries(2))
    }
}
