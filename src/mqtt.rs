//! # MQTT client
//!
//! The module's MQTT client is configured and driven by AT commands. Messages of the subscribed
//! topic are pushed unsolicited as `<topic> -> <payload>`.
//!
//! ## Example
//!
//! ````
//! # use wizfi_at::example::{ExampleTimer, ExampleTransport};
//! # use wizfi_at::transport::NoReset;
//! # use wizfi_at::wifi::Adapter;
//! #
//! # let mut adapter: Adapter<_, _, _, 1_000> = Adapter::new(ExampleTransport::default(), ExampleTimer::default(), NoReset);
//! adapter.mqtt_configure("user", "secret", "client-1", 60).unwrap();
//! adapter.mqtt_set_topic("sensors/out", "sensors/in").unwrap();
//! adapter.mqtt_connect(true, "10.0.0.2", 1883, None).unwrap();
//!
//! adapter.mqtt_publish("hello").unwrap();
//!
//! let message = adapter.mqtt_subscribe("sensors/in", 20_000).unwrap().unwrap();
//! assert_eq!(b"reply", message.payload.as_slice());
//! ````
use crate::commands::Command;
use crate::error::Error;
use crate::fmt::printable;
use crate::ipd::MAX_FRAME_SIZE;
use crate::reader::Deadline;
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use core::str::FromStr;
use fugit_timer::Timer;
use heapless::{String, Vec};

/// Max. length of a subscribed topic
pub const MAX_TOPIC_LENGTH: usize = 128;

const DELIMITER: &[u8] = b" -> ";

const TOPIC_WINDOW: usize = MAX_TOPIC_LENGTH + DELIMITER.len();

/// Message received on the subscribed topic
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String<MAX_TOPIC_LENGTH>,

    pub payload: Vec<u8, MAX_FRAME_SIZE>,
}

/// Byte-wise detector of the `<topic> -> ` message header
#[derive(Default)]
pub(crate) struct TopicScanner {
    window: Vec<u8, TOPIC_WINDOW>,
}

impl TopicScanner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Processes the next byte. Returns true once the delimiter was received, s. [TopicScanner::topic]
    pub(crate) fn feed(&mut self, byte: u8) -> bool {
        if byte == b'\n' {
            self.window.clear();
            return false;
        }

        if self.window.push(byte).is_err() {
            self.window.clear();
            return false;
        }

        self.window.ends_with(DELIMITER)
    }

    /// Topic preceding the delimiter without leading whitespace
    pub(crate) fn topic(&self) -> &[u8] {
        let topic = &self.window[..self.window.len().saturating_sub(DELIMITER.len())];
        let start = topic
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
            .unwrap_or(topic.len());

        &topic[start..]
    }
}

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// Sets the MQTT credentials, client ID and keep alive in seconds
    pub fn mqtt_configure(&mut self, username: &str, password: &str, client_id: &str, keep_alive: u16) -> Result<(), Error> {
        self.execute(&Command::mqtt_set(username, password, client_id, keep_alive)?)?;
        Ok(())
    }

    /// Sets the QoS level (0, 1 or 2)
    pub fn mqtt_set_qos(&mut self, qos: u8) -> Result<(), Error> {
        self.execute(&Command::mqtt_qos(qos)?)?;
        Ok(())
    }

    /// Sets the topic used for publishing and the subscribed topic
    pub fn mqtt_set_topic(&mut self, publish_topic: &str, subscribe_topic: &str) -> Result<(), Error> {
        self.execute(&Command::mqtt_topic(publish_topic, subscribe_topic)?)?;
        Ok(())
    }

    /// Connects to the broker. The link ID qualified command form is used if a link ID is given.
    pub fn mqtt_connect(&mut self, auth: bool, broker: &str, port: u16, link_id: Option<u8>) -> Result<(), Error> {
        self.execute(&Command::mqtt_connect(auth, broker, port, link_id)?)?;
        self.session.mqtt_connected = true;
        info!("Connected to MQTT broker {}:{}", broker, port);
        Ok(())
    }

    /// Publishes the message on the configured publish topic
    pub fn mqtt_publish(&mut self, message: &str) -> Result<(), Error> {
        self.execute(&Command::mqtt_publish(message)?)?;
        Ok(())
    }

    pub fn mqtt_disconnect(&mut self) -> Result<(), Error> {
        self.execute(&Command::mqtt_disconnect()?)?;
        self.session.mqtt_connected = false;
        Ok(())
    }

    /// Waits for a message of the given topic.
    ///
    /// The payload is collected until no more data arrives within the timeout. Returns None if
    /// nothing was received in time or the next message belongs to another topic.
    pub fn mqtt_subscribe(&mut self, topic: &str, timeout_ms: u32) -> Result<Option<MqttMessage>, Error> {
        let topic_name = String::from_str(topic).map_err(|_| Error::InvalidArgument)?;

        let mut scanner = TopicScanner::new();
        let mut matched = false;
        let mut payload = Vec::<u8, MAX_FRAME_SIZE>::new();
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

            for _ in 0..available {
                let byte = self.transport.read_byte().map_err(Error::transport)?;

                if matched {
                    if payload.push(byte).is_err() {
                        debug!("MQTT payload truncated");
                    }
                    continue;
                }

                if !scanner.feed(byte) {
                    continue;
                }

                if scanner.topic() != topic.as_bytes() {
                    debug!("Ignoring message of topic {}", printable(scanner.topic()));
                    return Ok(None);
                }

                matched = true;
            }
        }

        self.transport.set_flow_control(false).map_err(Error::transport)?;

        if !matched {
            return Ok(None);
        }

        if payload.ends_with(b"\r\n") {
            payload.truncate(payload.len() - 2);
        }

        trace!("Received {} bytes on {}", payload.len(), topic);
        Ok(Some(MqttMessage {
            topic: topic_name,
            payload,
        }))
    }
}
