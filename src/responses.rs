use crate::error::Error;
use core::net::Ipv4Addr;
use core::str::FromStr;
use heapless::{String, Vec};

/// Max. length of a single command response in bytes
pub const RESPONSE_CAPACITY: usize = 2048;

/// Raw command response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    data: Vec<u8, RESPONSE_CAPACITY>,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Appends a received byte
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), Error> {
        self.data.push(byte).map_err(|_| Error::ResponseOverflow)
    }

    /// Removes the given number of trailing bytes
    pub(crate) fn strip_suffix(&mut self, length: usize) {
        self.data.truncate(self.data.len().saturating_sub(length));
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if the marker is contained anywhere in the response
    pub fn contains(&self, marker: &[u8]) -> bool {
        contains(self.as_bytes(), marker)
    }

    pub fn ends_with(&self, marker: &[u8]) -> bool {
        self.as_bytes().ends_with(marker)
    }

    /// Non-empty lines without line terminators
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        lines(self.as_bytes())
    }

    /// Returns the remainder of the first line starting with the given prefix
    pub fn line_after(&self, prefix: &[u8]) -> Option<&[u8]> {
        self.lines().find_map(|line| line.strip_prefix(prefix))
    }
}

/// True if needle is contained in haystack
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// Splits into non-empty lines, tolerating both CRLF and LF
pub(crate) fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
}

/// Parses an ASCII decimal number
pub(crate) fn parse_number<N: FromStr>(data: &[u8]) -> Option<N> {
    core::str::from_utf8(data).ok()?.trim().parse().ok()
}

/// Splits a comma separated argument list. Commas within quotes are kept, quotes get removed.
pub(crate) struct Fields<'a> {
    rest: Option<&'a str>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(value: &'a str) -> Self {
        Self { rest: Some(value) }
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        let mut quoted = false;

        for (index, byte) in rest.bytes().enumerate() {
            match byte {
                b'"' => quoted = !quoted,
                b',' if !quoted => {
                    self.rest = Some(&rest[index + 1..]);
                    return Some(unquote(&rest[..index]));
                }
                _ => {}
            }
        }

        self.rest = None;
        Some(unquote(rest))
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

/// Copies as many leading characters as fit into the fixed size string
pub(crate) fn truncated<const N: usize>(value: &str) -> String<N> {
    let mut text = String::new();

    for character in value.chars() {
        if text.push(character).is_err() {
            break;
        }
    }

    text
}

/// Converts a field to a fixed size string, None if it does not fit
fn bounded<const N: usize>(value: &str) -> Option<String<N>> {
    String::from_str(value).ok()
}

/// Encryption of a scanned access point
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Encryption {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Unknown(u8),
}

impl From<u8> for Encryption {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Open,
            1 => Self::Wep,
            2 => Self::WpaPsk,
            3 => Self::Wpa2Psk,
            4 => Self::WpaWpa2Psk,
            5 => Self::Wpa2Enterprise,
            other => Self::Unknown(other),
        }
    }
}

/// Single access point found by a scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPoint {
    pub encryption: Encryption,

    pub ssid: String<32>,

    /// Signal strength in dBm
    pub rssi: i16,

    pub mac: String<17>,

    pub channel: u8,
}

impl AccessPoint {
    /// Parses the arguments of a `+CWLAP:(<ecn>,"<ssid>",<rssi>,"<mac>",<channel>,...)` line
    pub(crate) fn parse(arguments: &[u8]) -> Result<Self, Error> {
        Self::try_parse(arguments).ok_or(Error::MalformedResponse("+CWLAP:"))
    }

    fn try_parse(arguments: &[u8]) -> Option<Self> {
        let arguments = core::str::from_utf8(arguments).ok()?;
        let arguments = arguments.strip_prefix('(')?;
        let arguments = arguments.strip_suffix(')').unwrap_or(arguments);
        let mut fields = Fields::new(arguments);

        Some(Self {
            encryption: Encryption::from(fields.next()?.parse::<u8>().ok()?),
            ssid: bounded(fields.next()?)?,
            rssi: fields.next()?.parse().ok()?,
            mac: bounded(fields.next()?)?,
            channel: fields.next()?.parse().ok()?,
        })
    }
}

/// Currently joined access point
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteAccessPoint {
    pub ssid: String<32>,

    pub bssid: String<17>,

    pub channel: u8,

    /// Signal strength in dBm
    pub rssi: i16,
}

impl RemoteAccessPoint {
    /// Parses the arguments of a `+CWJAP:"<ssid>","<bssid>",<channel>,<rssi>` line
    pub(crate) fn parse(arguments: &[u8]) -> Result<Self, Error> {
        Self::try_parse(arguments).ok_or(Error::MalformedResponse("+CWJAP:"))
    }

    fn try_parse(arguments: &[u8]) -> Option<Self> {
        let mut fields = Fields::new(core::str::from_utf8(arguments).ok()?);

        Some(Self {
            ssid: bounded(fields.next()?)?,
            bssid: bounded(fields.next()?)?,
            channel: fields.next()?.parse().ok()?,
            rssi: fields.next()?.parse().ok()?,
        })
    }
}

/// Local IP and MAC addresses
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct LocalAddress {
    /// Local IPv4 address if assigned
    pub ipv4: Option<Ipv4Addr>,

    /// Local MAC address
    pub mac: Option<String<17>>,
}

impl LocalAddress {
    /// Collects the `+CIFSR:<type>,"<address>"` lines of the response
    pub(crate) fn from_response(response: &Response) -> Result<Self, Error> {
        let mut data = Self::default();

        for line in response.lines() {
            let Some(arguments) = line.strip_prefix(b"+CIFSR:") else {
                continue;
            };

            let arguments = core::str::from_utf8(arguments).map_err(|_| Error::MalformedResponse("+CIFSR:"))?;
            let mut fields = Fields::new(arguments);
            let (Some(address_type), Some(address)) = (fields.next(), fields.next()) else {
                return Err(Error::MalformedResponse("+CIFSR:"));
            };

            match address_type {
                "STAIP" => {
                    data.ipv4 = Some(Ipv4Addr::from_str(address).map_err(|_| Error::MalformedResponse("+CIFSR:"))?)
                }
                "STAMAC" => data.mac = Some(bounded(address).ok_or(Error::MalformedResponse("+CIFSR:"))?),
                _ => {}
            }
        }

        Ok(data)
    }
}
