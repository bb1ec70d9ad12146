use std::time::Duration;

use log::{debug, error, warn};

use crate::io::bus::{BusError, RegisterBus};
use crate::mcp23017::{Pin, Register};
use crate::pusher::error::PushError;
use crate::pusher::target::TargetIndex;
use crate::pusher::waiter::{AsyncWaiter, Interrupted, Waiter};

/// Latch values that press and release `mask`, leaving every other bit as it was in `value0`.
pub fn latch_values(value0: u8, mask: u8) -> (u8, u8) {
    (value0 | mask, value0 & !mask)
}

/// A button that is currently held down.
///
/// The release is written when [`Press::release`] is called, or otherwise when the press is
/// dropped: by an early return, a panic in the waiter, or an async hold being cancelled.
pub struct Press<'a, B: RegisterBus + ?Sized> {
    bus: &'a mut B,
    address: u8,
    target: TargetIndex,
    register: Register,
    release_value: u8,
    released: bool,
}

impl<'a, B: RegisterBus + ?Sized> Press<'a, B> {
    /// Reads the latch and writes it back with the target's bit set.
    pub fn start(bus: &'a mut B, address: u8, target: TargetIndex, pin: Pin) -> Result<Self, PushError> {
        let register = pin.port().latch_register();
        let value0 = bus.read_register(address, register)?;
        let (press_value, release_value) = latch_values(value0, pin.mask());

        debug!("Pressing index {} ({}): {} {:#04x} -> {:#04x}", target, pin, register, value0, press_value);
        bus.write_register(address, register, press_value)?;

        Ok(Self {
            bus,
            address,
            target,
            register,
            release_value,
            released: false,
        })
    }

    pub fn release(mut self) -> Result<(), PushError> {
        self.released = true;
        self.write_release()
    }

    fn write_release(&mut self) -> Result<(), PushError> {
        debug!("Releasing index {}: {} <- {:#04x}", self.target, self.register, self.release_value);
        self.bus
            .write_register(self.address, self.register, self.release_value)
            .map_err(|source| stuck(self.target, source))
    }
}

impl<B: RegisterBus + ?Sized> Drop for Press<'_, B> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("Hold of index {} ended early, releasing", self.target);
        // Already logged as critical.
        let _ = self.write_release();
    }
}

fn stuck(target: TargetIndex, source: BusError) -> PushError {
    error!("Failed to release index {}, the button may STILL BE HELD: {}", target, source);
    PushError::StuckAsserted { index: target.get(), source }
}

fn finish(target: TargetIndex, waited: Result<(), Interrupted>) -> Result<(), PushError> {
    waited.map_err(|Interrupted| {
        warn!("Hold of index {} was interrupted", target);
        PushError::Interrupted { index: target.get() }
    })
}

/// Press, block for `hold`, release.
pub fn hold_blocking<B: RegisterBus + ?Sized>(
    bus: &mut B,
    address: u8,
    target: TargetIndex,
    pin: Pin,
    hold: Duration,
    waiter: &mut dyn Waiter,
) -> Result<(), PushError> {
    let press = Press::start(bus, address, target, pin)?;
    let waited = waiter.wait(hold);
    press.release()?;
    finish(target, waited)
}

/// Press, suspend for `hold`, release. The bus is only touched between suspension points.
pub async fn hold_suspending<B: RegisterBus + ?Sized>(
    bus: &mut B,
    address: u8,
    target: TargetIndex,
    pin: Pin,
    hold: Duration,
    waiter: &dyn AsyncWaiter,
) -> Result<(), PushError> {
    let press = Press::start(bus, address, target, pin)?;
    let waited = waiter.wait(hold).await;
    press.release()?;
    finish(target, waited)
}
