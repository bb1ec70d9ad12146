//! Scoped handles for pressing buttons.
//!
//! A session is open from the moment it is taken from a [`PowerPusher`] until it is closed or
//! dropped. Opening and closing do no bus traffic: pins are set up separately with
//! [`PowerPusher::setup_pins`], and outputs are left as they were last written.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::io::bus::RegisterBus;
use crate::pusher::waiter::{AsyncWaiter, SleepWaiter, TokioSleep, Waiter};
use crate::pusher::{HoldDurations, PowerPusher, PushError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Button presses that block the calling thread for the whole hold.
pub trait PowerSession {
    fn power_hold(&mut self, index: i64, hold: Duration) -> Result<(), PushError>;

    fn holds(&self) -> HoldDurations;

    fn state(&self) -> SessionState;

    fn close(&mut self);

    fn power_on(&mut self, index: i64) -> Result<(), PushError> {
        let hold = self.holds().power_on;
        self.power_on_for(index, hold)
    }

    fn power_on_for(&mut self, index: i64, hold: Duration) -> Result<(), PushError> {
        self.power_hold(index, hold)
    }

    fn power_off(&mut self, index: i64) -> Result<(), PushError> {
        let hold = self.holds().power_off;
        self.power_off_for(index, hold)
    }

    fn power_off_for(&mut self, index: i64, hold: Duration) -> Result<(), PushError> {
        self.power_hold(index, hold)
    }
}

/// Button presses that suspend during the hold, leaving the thread free for other tasks.
#[async_trait]
pub trait AsyncPowerSession: Send + Sync {
    async fn power_hold(&self, index: i64, hold: Duration) -> Result<(), PushError>;

    fn holds(&self) -> HoldDurations;

    fn state(&self) -> SessionState;

    fn close(&mut self);

    async fn power_on(&self, index: i64) -> Result<(), PushError> {
        self.power_on_for(index, self.holds().power_on).await
    }

    async fn power_on_for(&self, index: i64, hold: Duration) -> Result<(), PushError> {
        self.power_hold(index, hold).await
    }

    async fn power_off(&self, index: i64) -> Result<(), PushError> {
        self.power_off_for(index, self.holds().power_off).await
    }

    async fn power_off_for(&self, index: i64, hold: Duration) -> Result<(), PushError> {
        self.power_hold(index, hold).await
    }
}

pub struct BlockingSession<'a, B> {
    pusher: &'a PowerPusher<B>,
    waiter: Box<dyn Waiter + 'a>,
    state: SessionState,
}

impl<'a, B: RegisterBus> BlockingSession<'a, B> {
    pub(super) fn new(pusher: &'a PowerPusher<B>) -> Self {
        Self {
            pusher,
            waiter: Box::new(SleepWaiter),
            state: SessionState::Open,
        }
    }

    /// Replaces the thread sleep used to wait out holds.
    pub fn with_waiter(mut self, waiter: impl Waiter + 'a) -> Self {
        self.waiter = Box::new(waiter);
        self
    }
}

impl<B: RegisterBus> PowerSession for BlockingSession<'_, B> {
    fn power_hold(&mut self, index: i64, hold: Duration) -> Result<(), PushError> {
        ensure_open(self.state)?;
        self.pusher.hold_with(index, hold, &mut *self.waiter)
    }

    fn holds(&self) -> HoldDurations {
        *self.pusher.holds()
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn close(&mut self) {
        close(&mut self.state, self.pusher.address());
    }
}

impl<B> Drop for BlockingSession<'_, B> {
    fn drop(&mut self) {
        close(&mut self.state, self.pusher.address);
    }
}

pub struct CooperativeSession<'a, B> {
    pusher: &'a PowerPusher<B>,
    waiter: Box<dyn AsyncWaiter + 'a>,
    state: SessionState,
}

impl<'a, B: RegisterBus> CooperativeSession<'a, B> {
    pub(super) fn new(pusher: &'a PowerPusher<B>) -> Self {
        Self {
            pusher,
            waiter: Box::new(TokioSleep),
            state: SessionState::Open,
        }
    }

    /// Replaces the tokio timer used to wait out holds.
    pub fn with_waiter(mut self, waiter: impl AsyncWaiter + 'a) -> Self {
        self.waiter = Box::new(waiter);
        self
    }
}

#[async_trait]
impl<'a, B: RegisterBus> AsyncPowerSession for CooperativeSession<'a, B> {
    async fn power_hold(&self, index: i64, hold: Duration) -> Result<(), PushError> {
        ensure_open(self.state)?;
        self.pusher.hold_with_async(index, hold, &*self.waiter).await
    }

    fn holds(&self) -> HoldDurations {
        *self.pusher.holds()
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn close(&mut self) {
        close(&mut self.state, self.pusher.address());
    }
}

impl<B> Drop for CooperativeSession<'_, B> {
    fn drop(&mut self) {
        close(&mut self.state, self.pusher.address);
    }
}

fn ensure_open(state: SessionState) -> Result<(), PushError> {
    match state {
        SessionState::Open => Ok(()),
        SessionState::Closed => Err(PushError::SessionClosed),
    }
}

fn close(state: &mut SessionState, address: u8) {
    if *state == SessionState::Open {
        debug!("Closing session on {:#04x}", address);
        *state = SessionState::Closed;
    }
}
