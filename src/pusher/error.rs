use thiserror::Error;

use crate::io::bus::BusError;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Index {0} is out of range, it must be within 0..=4")]
    IndexOutOfRange(i64),
    #[error("Index {0} has no output assigned to it")]
    UnsupportedIndex(u8),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
    /// The button was pressed but releasing it failed, so it may still be held down.
    #[error("Failed to release the button for index {index}, it may STILL BE HELD: {source}")]
    StuckAsserted { index: u8, source: BusError },
    #[error("Hold of index {index} was interrupted, the button was released early")]
    Interrupted { index: u8 },
    #[error("Session is closed")]
    SessionClosed,
}

impl PushError {
    /// Whether an output may have been left asserted.
    pub fn is_critical(&self) -> bool {
        matches!(self, PushError::StuckAsserted { .. })
    }
}
