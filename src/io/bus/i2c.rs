use embedded_hal::i2c::{Error, I2c};
use log::trace;

use crate::io::bus::{BusError, RegisterBus};
use crate::mcp23017::Register;

/// Register access over any `embedded-hal` I2C bus.
///
/// A read is a write of the register address followed by a repeated-start read of one byte; a
/// write sends the register address and the value in one transfer.
pub struct I2cRegisters<I> {
    i2c: I,
}

impl<I: I2c> I2cRegisters<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }
}

impl<I> RegisterBus for I2cRegisters<I>
where
    I: I2c + Send,
{
    fn read_register(&mut self, address: u8, register: Register) -> Result<u8, BusError> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(address, &[register.addr()], &mut value)
            .map_err(|err| BusError::I2c(err.kind()))?;
        trace!("Read {:#04x} from {} @ {:#04x}", value[0], register, address);
        Ok(value[0])
    }

    fn write_register(&mut self, address: u8, register: Register, value: u8) -> Result<(), BusError> {
        trace!("Writing {:#04x} to {} @ {:#04x}", value, register, address);
        self.i2c
            .write(address, &[register.addr(), value])
            .map_err(|err| BusError::I2c(err.kind()))
    }
}

#[cfg(target_os = "linux")]
pub fn open_i2c(path: &str) -> Result<I2cRegisters<linux_embedded_hal::I2cdev>, BusError> {
    let i2c = linux_embedded_hal::I2cdev::new(path).map_err(|err| BusError::Open {
        path: path.to_owned(),
        reason: err.to_string(),
    })?;
    Ok(I2cRegisters::new(i2c))
}

#[cfg(not(target_os = "linux"))]
pub fn open_i2c(path: &str) -> Result<I2cRegisters<NoI2c>, BusError> {
    Err(BusError::Open {
        path: path.to_owned(),
        reason: "I2C character devices are only supported on Linux".to_owned(),
    })
}

/// Stand-in bus type on platforms without `/dev/i2c-*`; it can never be constructed.
#[cfg(not(target_os = "linux"))]
pub enum NoI2c {}

#[cfg(not(target_os = "linux"))]
impl embedded_hal::i2c::ErrorType for NoI2c {
    type Error = embedded_hal::i2c::ErrorKind;
}

#[cfg(not(target_os = "linux"))]
impl I2c for NoI2c {
    fn transaction(
        &mut self,
        _address: u8,
        _operations: &mut [embedded_hal::i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        match *self {}
    }
}
