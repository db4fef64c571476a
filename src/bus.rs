//! Bus transport consumed by the antenna drivers.
//!
//! The transport is assumed to hold exclusive access to the physical bus
//! for the duration of each call; serialising access between device drivers
//! is the transport's job, not the driver's.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use thiserror::Error;
use tracing::trace;

/// Largest response any antenna command produces.
pub const MAX_RESPONSE_LEN: usize = 8;

pub type Response = heapless::Vec<u8, MAX_RESPONSE_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("device did not acknowledge")]
    Nack,
    #[error("bus arbitration lost")]
    ArbitrationLost,
    #[error("bus fault")]
    Bus,
    #[error("receive overrun")]
    Overrun,
    #[error("response of {requested} bytes exceeds the {max} byte buffer")]
    ResponseTooLong { requested: usize, max: usize },
    #[error("transport error")]
    Other,
}

impl From<ErrorKind> for BusError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => BusError::Nack,
            ErrorKind::ArbitrationLoss => BusError::ArbitrationLost,
            ErrorKind::Bus => BusError::Bus,
            ErrorKind::Overrun => BusError::Overrun,
            _ => BusError::Other,
        }
    }
}

/// Blocking command/response channel to one antenna board.
pub trait AntennaBus {
    fn write_command(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    fn read_response(&mut self, len: usize) -> Result<Response, BusError>;

    /// Blocking sleep. Never fails.
    fn delay_ms(&mut self, ms: u32);

    fn delay_s(&mut self, s: u8) {
        self.delay_ms(u32::from(s) * 1000);
    }
}

impl<T: AntennaBus + ?Sized> AntennaBus for &mut T {
    fn write_command(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write_command(bytes)
    }

    fn read_response(&mut self, len: usize) -> Result<Response, BusError> {
        (**self).read_response(len)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms);
    }

    fn delay_s(&mut self, s: u8) {
        (**self).delay_s(s);
    }
}

/// [`AntennaBus`] over an `embedded-hal` I2C peripheral and delay source,
/// bound to one slave address.
#[derive(Debug)]
pub struct I2cTransport<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> I2cTransport<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> AntennaBus for I2cTransport<I2C, D> {
    fn write_command(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        trace!(address = self.address, ?bytes, "i2c write");
        self.i2c
            .write(self.address, bytes)
            .map_err(|e| BusError::from(e.kind()))
    }

    fn read_response(&mut self, len: usize) -> Result<Response, BusError> {
        let mut response = Response::new();
        response
            .resize(len, 0)
            .map_err(|()| BusError::ResponseTooLong { requested: len, max: MAX_RESPONSE_LEN })?;
        self.i2c
            .read(self.address, &mut response)
            .map_err(|e| BusError::from(e.kind()))?;
        trace!(address = self.address, bytes = ?response.as_slice(), "i2c read");
        Ok(response)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
