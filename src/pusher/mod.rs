//! Presses the power buttons of up to five targets by pulsing outputs on an MCP23017.
//!
//! Every press goes through one sequence: read the output latch, write it back with the
//! target's bit set, wait out the hold, then write it back with the bit cleared. The bus stays
//! locked for the whole sequence so two presses on the same chip can never interleave their
//! read-modify-write.

use std::time::Duration;

use log::{debug, info};
use tokio::sync::Mutex;

use crate::io::bus::RegisterBus;
use crate::mcp23017::{DEFAULT_ADDRESS, OUTPUTS_LOW, PORT_A_DIRECTIONS, PORT_B_DIRECTIONS, Register};

pub mod error;
pub mod hold;
pub mod session;
pub mod target;
pub mod waiter;

pub use error::PushError;
pub use session::{AsyncPowerSession, BlockingSession, CooperativeSession, PowerSession, SessionState};
pub use target::TargetIndex;
pub use waiter::{AsyncWaiter, InterruptibleSleep, Interrupted, SleepWaiter, TokioSleep, Waiter};

/// A short press, enough to wake most machines.
pub const DEFAULT_POWER_ON_HOLD: Duration = Duration::from_millis(500);
/// A long press, which forces most machines off.
pub const DEFAULT_POWER_OFF_HOLD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldDurations {
    pub power_on: Duration,
    pub power_off: Duration,
}

impl Default for HoldDurations {
    fn default() -> Self {
        Self {
            power_on: DEFAULT_POWER_ON_HOLD,
            power_off: DEFAULT_POWER_OFF_HOLD,
        }
    }
}

pub struct PowerPusher<B> {
    bus: Mutex<B>,
    address: u8,
    holds: HoldDurations,
}

impl<B: RegisterBus> PowerPusher<B> {
    /// No bus traffic happens until pins are set up or a button is pressed.
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus: Mutex::new(bus),
            address,
            holds: HoldDurations::default(),
        }
    }

    pub fn with_default_address(bus: B) -> Self {
        Self::new(bus, DEFAULT_ADDRESS)
    }

    pub fn with_holds(mut self, holds: HoldDurations) -> Self {
        self.holds = holds;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn holds(&self) -> &HoldDurations {
        &self.holds
    }

    pub fn into_bus(self) -> B {
        self.bus.into_inner()
    }

    /// Drives every output low, then makes GPA0..GPA3 outputs and everything else inputs.
    ///
    /// Safe to repeat: the same three values are written every time, nothing is read first.
    /// Blocks the thread, so must not be called from within an async runtime; use
    /// [`PowerPusher::setup_pins_async`] there.
    pub fn setup_pins(&self) -> Result<(), PushError> {
        let mut bus = self.bus.blocking_lock();
        write_pin_setup(&mut *bus, self.address)
    }

    pub async fn setup_pins_async(&self) -> Result<(), PushError> {
        let mut bus = self.bus.lock().await;
        write_pin_setup(&mut *bus, self.address)
    }

    /// Holds the button of `index` down for `hold`, using `waiter` to wait.
    ///
    /// The index is checked before the bus is touched. Blocks the thread, like
    /// [`PowerPusher::setup_pins`].
    pub fn hold_with(&self, index: i64, hold: Duration, waiter: &mut dyn Waiter) -> Result<(), PushError> {
        let (target, pin) = target::resolve(index)?;
        info!("Holding power button of index {} for {:?}", target, hold);
        let mut bus = self.bus.blocking_lock();
        hold::hold_blocking(&mut *bus, self.address, target, pin, hold, waiter)
    }

    pub async fn hold_with_async(&self, index: i64, hold: Duration, waiter: &dyn AsyncWaiter) -> Result<(), PushError> {
        let (target, pin) = target::resolve(index)?;
        info!("Holding power button of index {} for {:?}", target, hold);
        let mut bus = self.bus.lock().await;
        hold::hold_suspending(&mut *bus, self.address, target, pin, hold, waiter).await
    }

    pub fn power_hold(&self, index: i64, hold: Duration) -> Result<(), PushError> {
        self.hold_with(index, hold, &mut SleepWaiter)
    }

    pub fn power_on(&self, index: i64) -> Result<(), PushError> {
        self.power_on_for(index, self.holds.power_on)
    }

    pub fn power_on_for(&self, index: i64, hold: Duration) -> Result<(), PushError> {
        self.power_hold(index, hold)
    }

    pub fn power_off(&self, index: i64) -> Result<(), PushError> {
        self.power_off_for(index, self.holds.power_off)
    }

    pub fn power_off_for(&self, index: i64, hold: Duration) -> Result<(), PushError> {
        self.power_hold(index, hold)
    }

    /// Opens a session whose operations block the calling thread.
    pub fn session(&self) -> BlockingSession<'_, B> {
        debug!("Opening blocking session on {:#04x}", self.address);
        BlockingSession::new(self)
    }

    /// Opens a session whose operations suspend during the hold instead of blocking.
    pub fn async_session(&self) -> CooperativeSession<'_, B> {
        debug!("Opening cooperative session on {:#04x}", self.address);
        CooperativeSession::new(self)
    }
}

fn write_pin_setup<B: RegisterBus + ?Sized>(bus: &mut B, address: u8) -> Result<(), PushError> {
    debug!("Setting up pins on {:#04x}", address);
    bus.write_register(address, Register::OLATA, OUTPUTS_LOW)?;
    bus.write_register(address, Register::IODIRA, PORT_A_DIRECTIONS)?;
    bus.write_register(address, Register::IODIRB, PORT_B_DIRECTIONS)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::io::bus::BusOp;
    use crate::io::bus::dummy::{Dummy, ModifyState};
    use crate::io::dummy::DummyIO;

    const ADDR: u8 = 0x20;

    fn pusher_with_latch(value0: u8) -> PowerPusher<Dummy> {
        let (bus, handle) = Dummy::create(&false);
        handle.send(ModifyState::SetRegister(ADDR, Register::OLATA, value0)).unwrap();
        PowerPusher::with_default_address(bus)
    }

    /// Records each hold instead of sleeping.
    fn recorder(holds: &mut Vec<Duration>) -> impl FnMut(Duration) -> Result<(), Interrupted> + '_ {
        move |hold| {
            holds.push(hold);
            Ok(())
        }
    }

    fn read_olata() -> BusOp {
        BusOp::Read { address: ADDR, register: Register::OLATA }
    }

    fn write_olata(value: u8) -> BusOp {
        BusOp::Write { address: ADDR, register: Register::OLATA, value }
    }

    #[test_log::test]
    fn test_setup_pins() {
        let pusher = pusher_with_latch(0x0F);
        pusher.setup_pins().unwrap();
        let bus = pusher.into_bus();

        assert_eq!(bus.ops(), &[
            write_olata(0x00),
            BusOp::Write { address: ADDR, register: Register::IODIRA, value: 0xF0 },
            BusOp::Write { address: ADDR, register: Register::IODIRB, value: 0xFF },
        ]);
    }

    #[test]
    fn test_setup_pins_is_idempotent() {
        let once = pusher_with_latch(0x0F);
        once.setup_pins().unwrap();
        let twice = pusher_with_latch(0x0F);
        twice.setup_pins().unwrap();
        twice.setup_pins().unwrap();

        let (once, twice) = (once.into_bus(), twice.into_bus());
        for register in [Register::OLATA, Register::IODIRA, Register::IODIRB] {
            assert_eq!(once.register(ADDR, register), twice.register(ADDR, register), "{}", register);
        }
        assert_eq!(twice.register(ADDR, Register::OLATA), 0x00);
        assert_eq!(twice.register(ADDR, Register::IODIRA), 0xF0);
        assert_eq!(twice.register(ADDR, Register::IODIRB), 0xFF);
        assert!(twice.ops().iter().all(|op| matches!(op, BusOp::Write { .. })), "Setup should never read");
    }

    #[test_log::test]
    fn test_power_on_from_clear_latch() {
        let pusher = pusher_with_latch(0x00);
        let mut holds = Vec::new();
        pusher.hold_with(3, pusher.holds().power_on, &mut recorder(&mut holds)).unwrap();

        assert_eq!(holds, vec![Duration::from_millis(500)]);
        assert_eq!(pusher.into_bus().ops(), &[read_olata(), write_olata(0x04), write_olata(0x00)]);
    }

    #[test]
    fn test_release_wins_over_preexisting_bit() {
        // Bit 2 is already set by someone else, release still clears it.
        let pusher = pusher_with_latch(0x05);
        pusher.hold_with(3, Duration::ZERO, &mut recorder(&mut Vec::new())).unwrap();

        assert_eq!(pusher.into_bus().ops(), &[read_olata(), write_olata(0x05), write_olata(0x01)]);
    }

    #[test]
    fn test_other_bits_preserved() {
        let pusher = pusher_with_latch(0x05);
        pusher.hold_with(4, Duration::ZERO, &mut recorder(&mut Vec::new())).unwrap();

        assert_eq!(pusher.into_bus().ops(), &[read_olata(), write_olata(0x0D), write_olata(0x05)]);
    }

    #[test]
    fn test_net_change_is_only_target_bit() {
        for value0 in 0..=u8::MAX {
            for index in [3, 4] {
                let pusher = pusher_with_latch(value0);
                pusher.hold_with(index, Duration::ZERO, &mut recorder(&mut Vec::new())).unwrap();
                let bus = pusher.into_bus();

                let mask = 1u8 << (index - 1);
                assert_eq!(bus.ops().len(), 3);
                assert_eq!(bus.writes_to(Register::OLATA), vec![value0 | mask, value0 & !mask]);
                assert_eq!(bus.register(ADDR, Register::OLATA), value0 & !mask);
            }
        }
    }

    #[test]
    fn test_invalid_indices_touch_nothing() {
        for index in [-1, 5, 42, 0, 1, 2] {
            let pusher = pusher_with_latch(0x00);
            let mut holds = Vec::new();
            let err = pusher.hold_with(index, Duration::ZERO, &mut recorder(&mut holds)).unwrap_err();

            match index {
                0..=2 => assert!(matches!(err, PushError::UnsupportedIndex(_)), "Got {:?}", err),
                _ => assert!(matches!(err, PushError::IndexOutOfRange(_)), "Got {:?}", err),
            }
            assert!(holds.is_empty());
            assert!(pusher.into_bus().ops().is_empty(), "Index {} should not touch the bus", index);
        }
    }

    #[test]
    fn test_interrupted_hold_still_releases() {
        let pusher = pusher_with_latch(0x01);
        let mut interrupted = |_: Duration| -> Result<(), Interrupted> { Err(Interrupted) };
        let err = pusher.hold_with(4, Duration::from_secs(5), &mut interrupted).unwrap_err();

        assert!(matches!(err, PushError::Interrupted { index: 4 }), "Got {:?}", err);
        assert_eq!(pusher.into_bus().writes_to(Register::OLATA), vec![0x09, 0x01]);
    }

    #[test]
    fn test_panicking_waiter_still_releases() {
        let pusher = pusher_with_latch(0x00);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut panics = |_: Duration| -> Result<(), Interrupted> { panic!("Waiter blew up") };
            pusher.hold_with(3, Duration::from_secs(1), &mut panics)
        }));

        assert!(result.is_err());
        assert_eq!(pusher.into_bus().writes_to(Register::OLATA), vec![0x04, 0x00]);
    }

    #[test]
    fn test_read_failure_is_propagated() {
        let (bus, handle) = Dummy::create(&false);
        handle.send(ModifyState::FailRead(0)).unwrap();
        let pusher = PowerPusher::with_default_address(bus);

        let err = pusher.power_hold(3, Duration::ZERO).unwrap_err();
        assert!(matches!(err, PushError::Bus(_)), "Got {:?}", err);
        assert!(pusher.into_bus().writes_to(Register::OLATA).is_empty());
    }

    #[test]
    fn test_named_holds_share_the_sequence() {
        let holds = HoldDurations {
            power_on: Duration::from_millis(1),
            power_off: Duration::from_millis(2),
        };
        let pusher = pusher_with_latch(0x00).with_holds(holds);
        pusher.power_on(3).unwrap();
        pusher.power_off(4).unwrap();
        pusher.power_hold(3, Duration::ZERO).unwrap();
        pusher.power_on_for(4, Duration::ZERO).unwrap();
        pusher.power_off_for(3, Duration::ZERO).unwrap();

        assert_eq!(pusher.into_bus().writes_to(Register::OLATA), vec![
            0x04, 0x00,
            0x08, 0x00,
            0x04, 0x00,
            0x08, 0x00,
            0x04, 0x00,
        ]);
    }

    #[test]
    fn test_other_address() {
        let (bus, _handle) = Dummy::create(&false);
        let pusher = PowerPusher::new(bus, 0x27);
        assert_eq!(pusher.address(), 0x27);
        pusher.power_hold(4, Duration::ZERO).unwrap();

        let bus = pusher.into_bus();
        assert!(bus.ops().iter().all(|op| match op {
            BusOp::Read { address, .. } | BusOp::Write { address, .. } => *address == 0x27,
        }));
    }

    #[test]
    fn test_default_holds() {
        let holds = HoldDurations::default();
        assert_eq!(holds.power_on, Duration::from_secs_f64(0.5));
        assert_eq!(holds.power_off, Duration::from_secs(5));
    }
}
