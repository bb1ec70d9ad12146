use crate::mcp23017::Register;
use thiserror::Error;

pub mod dummy;
pub mod i2c;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("I2C transfer failed: {0}")]
    I2c(embedded_hal::i2c::ErrorKind),
    #[error("Failed to open bus {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("{0}")]
    Injected(String),
}

/// Byte-wide register access to a device on a shared bus.
pub trait RegisterBus: Send {
    fn read_register(&mut self, address: u8, register: Register) -> Result<u8, BusError>;

    fn write_register(&mut self, address: u8, register: Register, value: u8) -> Result<(), BusError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for Box<T> {
    fn read_register(&mut self, address: u8, register: Register) -> Result<u8, BusError> {
        (**self).read_register(address, register)
    }

    fn write_register(&mut self, address: u8, register: Register, value: u8) -> Result<(), BusError> {
        (**self).write_register(address, register, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Read { address: u8, register: Register },
    Write { address: u8, register: Register, value: u8 },
}
