//! # Host platform capabilities
//!
//! The driver only needs a byte-oriented serial link to the module and (optionally) a reset line.
//! Both are supplied by the host platform via the traits below.
use embedded_io::{Read, ReadReady, Write};

/// Byte sink/source connected to the module
pub trait Transport {
    /// Upstream error
    type Error: embedded_io::Error;

    /// Writes all the given bytes
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Returns the number of bytes which may be read without blocking
    fn read_available(&mut self) -> Result<usize, Self::Error>;

    /// Reads a single byte. Only valid if [Transport::read_available] reported pending data.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Enables (module may send) or disables (module has to pause) inbound data via the RTS line.
    /// Transports without hardware flow control keep the default no-op.
    fn set_flow_control(&mut self, _enabled: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Switches the local baud rate after the module was reconfigured
    fn set_baud_rate(&mut self, _baud_rate: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Hardware reset line of the module
pub trait ResetLine {
    /// Upstream error
    type Error;

    /// Drives the reset line. Low level holds the module in reset.
    fn set_level(&mut self, high: bool) -> Result<(), Self::Error>;
}

/// Placeholder for hosts without a reset GPIO. Hardware resets become a pure wait.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoReset;

impl ResetLine for NoReset {
    type Error = core::convert::Infallible;

    fn set_level(&mut self, _high: bool) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// [Transport] for any UART implementing the [embedded_io] traits. Flow control is not supported.
pub struct Serial<U> {
    uart: U,
}

impl<U> Serial<U> {
    pub fn new(uart: U) -> Self {
        Self { uart }
    }

    /// Returns the wrapped UART
    pub fn release(self) -> U {
        self.uart
    }
}

impl<U: Read + Write + ReadReady> Transport for Serial<U> {
    type Error = U::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.uart.write_all(data)?;
        self.uart.flush()
    }

    fn read_available(&mut self) -> Result<usize, Self::Error> {
        // ReadReady just signals pending data, so at least one byte is available
        Ok(usize::from(self.uart.read_ready()?))
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut byte = [0x0; 1];

        while self.uart.read(&mut byte)? == 0 {}
        Ok(byte[0])
    }
}
