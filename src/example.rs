//! Mocks for doc examples
use crate::transport::Transport;
use core::convert::Infallible;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::Vec;

/// Serial link mock answering the commands used in the doc examples
///
/// Tracks the connection status the way the module reports it by `AT+CIPSTATUS`.
pub struct ExampleTransport {
    /// Reply bytes not read yet
    reply: Vec<u8, 256>,

    /// Read position inside reply
    position: usize,

    /// Current `STATUS:` code
    status: u8,
}

impl Default for ExampleTransport {
    fn default() -> Self {
        Self {
            reply: Vec::new(),
            position: 0,
            status: 5,
        }
    }
}

impl ExampleTransport {
    fn respond(&mut self, parts: &[&[u8]]) {
        self.reply.clear();
        self.position = 0;

        for part in parts {
            // Replies are static and fit into the buffer
            let _ = self.reply.extend_from_slice(part);
        }
    }

    fn respond_status(&mut self) {
        let status = [b'0' + self.status];
        self.respond(&[b"STATUS:", &status, b"\r\n\r\nOK\r\n"]);
    }
}

impl Transport for ExampleTransport {
    type Error = Infallible;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        match data {
            b"AT+CIPSTATUS\r\n" => self.respond_status(),
            b"AT+CIPMUX?\r\n" => self.respond(&[b"+CIPMUX:0\r\n\r\nOK\r\n"]),
            b"AT+CWMODE?\r\n" => self.respond(&[b"+CWMODE:1\r\n\r\nOK\r\n"]),
            b"AT+CIPSTA_CUR?\r\n" => self.respond(&[b"+CIPSTA_CUR:ip:\"10.0.0.181\"\r\n\r\nOK\r\n"]),
            b"AT+CIFSR\r\n" => self.respond(&[
                b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n\r\nOK\r\n",
            ]),
            b"AT+CIPCLOSE\r\n" => {
                self.status = 4;
                self.respond(&[b"CLOSED\r\n\r\nOK\r\n"]);
            }
            b"AT+MQTTPUB=\"hello\"\r\n" => self.respond(&[b"\r\nOK\r\n\r\nsensors/in -> reply\r\n"]),
            command if command.starts_with(b"AT+CWJAP=") => {
                self.status = 2;
                self.respond(&[b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n"]);
            }
            command if command.starts_with(b"AT+CIPSTART=") => {
                self.status = 3;
                self.respond(&[b"CONNECT\r\n\r\nOK\r\n"]);
            }
            command if command.starts_with(b"AT+CIPSEND=") => self.respond(&[b"\r\nOK\r\n> "]),
            command if command.starts_with(b"AT") => self.respond(&[b"\r\nOK\r\n"]),
            // Raw socket data, answered by the remote
            _ => self.respond(&[b"\r\nSEND OK\r\n\r\n+IPD,16:nice to see you!"]),
        }

        Ok(())
    }

    fn read_available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.reply.len() - self.position)
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let byte = self.reply.get(self.position).copied().unwrap_or_default();
        self.position += 1;
        Ok(byte)
    }
}

/// Simulated millisecond clock, advancing on every read
#[derive(Default)]
pub struct ExampleTimer {
    now: u32,

    delay: Option<u32>,
}

impl Timer<1_000> for ExampleTimer {
    type Error = Infallible;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        self.now = self.now.wrapping_add(1);
        TimerInstantU32::from_ticks(self.now)
    }

    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        self.delay = Some(duration.ticks());
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.delay = None;
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        if let Some(delay) = self.delay.take() {
            self.now = self.now.wrapping_add(delay);
        }

        Ok(())
    }
}
