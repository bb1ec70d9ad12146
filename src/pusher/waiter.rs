//! Ways of waiting out a hold while the button is pressed.
//!
//! The hold sequence is the same for every caller; only the wait differs. A blocking [`Waiter`]
//! occupies the calling thread, an [`AsyncWaiter`] yields to the runtime instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// The wait ended before the full hold duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

pub trait Waiter {
    fn wait(&mut self, hold: Duration) -> Result<(), Interrupted>;
}

impl<F> Waiter for F
    where F: FnMut(Duration) -> Result<(), Interrupted> {
    fn wait(&mut self, hold: Duration) -> Result<(), Interrupted> {
        self(hold)
    }
}

/// Sleeps the thread for the whole hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepWaiter;

impl Waiter for SleepWaiter {
    fn wait(&mut self, hold: Duration) -> Result<(), Interrupted> {
        std::thread::sleep(hold);
        Ok(())
    }
}

const DEFAULT_POLL: Duration = Duration::from_millis(50);

/// Sleeps in short slices so that the hold can be cut short by setting a shared stop flag, e.g.
/// from a Ctrl-C handler.
#[derive(Debug, Clone)]
pub struct InterruptibleSleep {
    stop: Arc<AtomicBool>,
    poll: Duration,
}

impl InterruptibleSleep {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop, poll: DEFAULT_POLL }
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }
}

impl Waiter for InterruptibleSleep {
    fn wait(&mut self, hold: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + hold;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Err(Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(self.poll.min(deadline - now));
        }
    }
}

#[async_trait]
pub trait AsyncWaiter: Send + Sync {
    async fn wait(&self, hold: Duration) -> Result<(), Interrupted>;
}

/// Suspends on the tokio timer, leaving the thread free for other tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleep;

#[async_trait]
impl AsyncWaiter for TokioSleep {
    async fn wait(&self, hold: Duration) -> Result<(), Interrupted> {
        tokio::time::sleep(hold).await;
        Ok(())
    }
}
