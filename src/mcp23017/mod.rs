pub mod registers;

pub use registers::{Pin, Port, Register};

/// OLATA at setup: every output driven low.
pub const OUTPUTS_LOW: u8 = 0x00;

/// IODIRA at setup: GPA7..GPA4 inputs, GPA3..GPA0 outputs.
///
/// ```text
/// GPA: 7, 6, 5, 4, 3, 2, 1, 0
/// VAL: 1, 1, 1, 1, 0, 0, 0, 0
/// I/O: I, I, I, I, O, O, O, O
/// ```
pub const PORT_A_DIRECTIONS: u8 = 0xF0;

/// IODIRB at setup: port B is unused, so every line is an input.
pub const PORT_B_DIRECTIONS: u8 = 0xFF;

pub const DEFAULT_ADDRESS: u8 = 0x20;

/// Highest 7-bit bus address.
pub const MAX_ADDRESS: u8 = 0x7F;
