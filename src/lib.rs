//! # WizFi360 / ESP-AT driver
//!
//! Blocking driver for WIFI co-processors speaking the ESP-AT command set (e.g. WizFi360) over
//! a serial link. Supports joining access points, a single TCP/UDP/SSL socket and the module's
//! built-in MQTT client.
//!
//! The serial link is abstracted by [Transport](transport::Transport). [Serial](transport::Serial)
//! adapts any [embedded_io] UART. Timeouts and delays are driven by a [fugit_timer::Timer].
//!
//! All operations are methods of [Adapter](wifi::Adapter):
//!
//! ````
//! # use wizfi_at::example::{ExampleTimer, ExampleTransport};
//! use wizfi_at::session::ConnectionType;
//! use wizfi_at::transport::NoReset;
//! use wizfi_at::wifi::{Adapter, Credentials};
//! #
//! # let transport = ExampleTransport::default();
//! # let timer = ExampleTimer::default();
//!
//! let mut adapter: Adapter<_, _, _, 1_000> = Adapter::new(transport, timer, NoReset);
//! adapter.initialize().unwrap();
//!
//! adapter.connect_access_point(&Credentials { ssid: "home", password: "secret", ..Default::default() }).unwrap();
//! assert!(adapter.open_socket(ConnectionType::Tcp, "10.0.0.5", 8080, 10, 1).unwrap());
//! assert!(adapter.send_socket_data(b"hello", 10_000).unwrap());
//!
//! let frame = adapter.socket_receive(15_000).unwrap();
//! assert_eq!(b"nice to see you!", frame.as_slice());
//! ````
//!
//! In addition [embedded_nal::TcpClientStack] is implemented, s. [stack].
//!
//! ## Logging
//!
//! Enable either the `log` or the `defmt` feature.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

#[macro_use]
pub(crate) mod fmt;

pub mod commands;
pub mod config;
mod control;
pub mod engine;
pub mod error;
#[cfg(feature = "examples")]
pub mod example;
pub mod ipd;
pub mod mqtt;
mod reader;
pub mod responses;
pub mod session;
mod socket;
pub mod stack;
pub mod transport;
pub mod wifi;

pub use socket::MAX_SEND_SIZE;

#[cfg(test)]
mod tests;
