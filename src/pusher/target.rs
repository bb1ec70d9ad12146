use std::fmt::{Display, Formatter};

use crate::mcp23017::Pin;
use crate::pusher::error::PushError;

pub const TARGET_COUNT: usize = 5;

/// Output line wired to each target's power button, by index.
///
/// Indices 0 to 2 have no line: only GPA0..GPA3 are outputs, and GPA2 and GPA3 belong to
/// indices 3 and 4 (bit = index - 1).
const OUTPUT_PINS: [Option<Pin>; TARGET_COUNT] = [None, None, None, Some(Pin::GPA2), Some(Pin::GPA3)];

/// A validated target index, within 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetIndex(u8);

impl TargetIndex {
    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn output_pin(&self) -> Result<Pin, PushError> {
        OUTPUT_PINS[self.0 as usize].ok_or(PushError::UnsupportedIndex(self.0))
    }

    pub fn all() -> impl Iterator<Item = TargetIndex> {
        (0..TARGET_COUNT as u8).map(TargetIndex)
    }
}

impl TryFrom<i64> for TargetIndex {
    type Error = PushError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        if (0..TARGET_COUNT as i64).contains(&index) {
            Ok(TargetIndex(index as u8))
        } else {
            Err(PushError::IndexOutOfRange(index))
        }
    }
}

impl Display for TargetIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves a raw index to the output pin to press, without touching the bus.
pub fn resolve(index: i64) -> Result<(TargetIndex, Pin), PushError> {
    let target = TargetIndex::try_from(index)?;
    let pin = target.output_pin()?;
    Ok((target, pin))
}
