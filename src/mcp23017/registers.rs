//! Register map of the MCP23017, with IOCON.BANK = 0 (the power-on default), where the A and B
//! registers of each pair are interleaved.
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf

use strum_macros::{Display, EnumIter};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(clippy::upper_case_acronyms)]
pub enum Register {
    /// Pin direction, 1 = input
    IODIRA = 0x00,
    IODIRB = 0x01,
    IPOLA = 0x02,
    IPOLB = 0x03,
    GPINTENA = 0x04,
    GPINTENB = 0x05,
    DEFVALA = 0x06,
    DEFVALB = 0x07,
    INTCONA = 0x08,
    INTCONB = 0x09,
    IOCONA = 0x0A,
    IOCONB = 0x0B,
    GPPUA = 0x0C,
    GPPUB = 0x0D,
    INTFA = 0x0E,
    INTFB = 0x0F,
    INTCAPA = 0x10,
    INTCAPB = 0x11,
    GPIOA = 0x12,
    GPIOB = 0x13,
    /// Output latch, the value driven onto output pins
    OLATA = 0x14,
    OLATB = 0x15,
}

impl Register {
    /// Number of addressable registers in the BANK = 0 layout.
    pub const COUNT: usize = 0x16;

    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Bit positions within IOCONA / IOCONB.
pub mod iocon {
    pub const BANK_BIT: u8 = 7;
    pub const MIRROR_BIT: u8 = 6;
    pub const SEQOP_BIT: u8 = 5;
    pub const DISSLW_BIT: u8 = 4;
    pub const HAEN_BIT: u8 = 3;
    pub const ODR_BIT: u8 = 2;
    pub const INTPOL_BIT: u8 = 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    A,
    B,
}

impl Port {
    pub fn direction_register(&self) -> Register {
        match self {
            Port::A => Register::IODIRA,
            Port::B => Register::IODIRB,
        }
    }

    pub fn latch_register(&self) -> Register {
        match self {
            Port::A => Register::OLATA,
            Port::B => Register::OLATB,
        }
    }
}

/// The 16 GPIO lines, numbered the way the datasheet numbers them: GPA0..GPA7 are 0..7 and
/// GPB0..GPB7 are 8..15.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Pin {
    GPA0 = 0,
    GPA1 = 1,
    GPA2 = 2,
    GPA3 = 3,
    GPA4 = 4,
    GPA5 = 5,
    GPA6 = 6,
    GPA7 = 7,
    GPB0 = 8,
    GPB1 = 9,
    GPB2 = 10,
    GPB3 = 11,
    GPB4 = 12,
    GPB5 = 13,
    GPB6 = 14,
    GPB7 = 15,
}

impl Pin {
    pub const fn line(self) -> u8 {
        self as u8
    }

    pub const fn port(self) -> Port {
        if self.line() < 8 { Port::A } else { Port::B }
    }

    /// Bit position within the port's byte-wide registers.
    pub const fn bit(self) -> u8 {
        self.line() % 8
    }

    pub const fn mask(self) -> u8 {
        1 << self.bit()
    }
}
