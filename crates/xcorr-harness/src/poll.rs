//! Bounded-retry polling engine.
//!
//! There are no interrupts and no blocking primitives on this interface;
//! software rendezvouses with the device by re-reading status registers.
//! Every wait is a fixed number of re-checks with no inter-attempt delay:
//! the "timeout" is an iteration count, not a clock, so elapsed time is a
//! function of polling overhead only. Tests inject an attempt hook
//! instead of sleeping.

use crate::error::{Result, XcorrError};
use crate::fifo::StreamFifo;

/// Default attempt budget, carried over from the deployed harness.
pub const DEFAULT_POLL_BUDGET: u32 = 10_000;

/// Bounded-retry condition waits over a [`StreamFifo`].
pub struct Poller {
    budget: u32,
    /// Called once per attempt; tests use it to count or to flip mock
    /// state. Never a sleep in production.
    attempt_hook: Option<Box<dyn FnMut(u32)>>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("budget", &self.budget)
            .field("attempt_hook", &self.attempt_hook.is_some())
            .finish()
    }
}

impl Poller {
    /// Create a poller with the given attempt budget.
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            attempt_hook: None,
        }
    }

    /// Install a per-attempt hook (test instrumentation).
    #[must_use]
    pub fn with_attempt_hook(mut self, hook: impl FnMut(u32) + 'static) -> Self {
        self.attempt_hook = Some(Box::new(hook));
        self
    }

    /// Configured attempt budget.
    pub const fn budget(&self) -> u32 {
        self.budget
    }

    /// Wait for the transmit-complete bit, clearing it on success.
    ///
    /// # Errors
    ///
    /// Returns [`XcorrError::PollTimeout`] after the attempt budget.
    pub fn wait_tx_complete<F: StreamFifo>(&mut self, fifo: &mut F) -> Result<u32> {
        for attempt in 1..=self.budget {
            if let Some(hook) = self.attempt_hook.as_mut() {
                hook(attempt);
            }
            if fifo.tx_complete() {
                fifo.clear_tx_complete();
                tracing::debug!("transmit complete after {attempt} poll(s)");
                return Ok(attempt);
            }
        }
        Err(XcorrError::PollTimeout {
            condition: "transmit complete",
            budget: self.budget,
            observed: u32::from(fifo.tx_complete()),
        })
    }

    /// Wait until the receive occupancy equals `expected` exactly.
    ///
    /// Exact equality, not "at least": a partial or oversized response is
    /// a desynchronization, and accepting it here would mask one.
    ///
    /// # Errors
    ///
    /// Returns [`XcorrError::PollTimeout`] after the attempt budget.
    pub fn wait_rx_count<F: StreamFifo>(&mut self, fifo: &F, expected: u32) -> Result<u32> {
        for attempt in 1..=self.budget {
            if let Some(hook) = self.attempt_hook.as_mut() {
                hook(attempt);
            }
            if fifo.rx_occupancy() == expected {
                tracing::debug!("{expected} response words ready after {attempt} poll(s)");
                return Ok(attempt);
            }
        }
        Err(XcorrError::PollTimeout {
            condition: "rx occupancy",
            budget: self.budget,
            observed: fifo.rx_occupancy(),
        })
    }

    /// Wait until the transmit vacancy is at least `min_words`.
    ///
    /// Advisory: used as a pre-push check so a whole payload fits without
    /// stalling mid-frame.
    ///
    /// # Errors
    ///
    /// Returns [`XcorrError::PollTimeout`] after the attempt budget.
    pub fn wait_vacancy<F: StreamFifo>(&mut self, fifo: &F, min_words: u32) -> Result<u32> {
        for attempt in 1..=self.budget {
            if let Some(hook) = self.attempt_hook.as_mut() {
                hook(attempt);
            }
            if fifo.tx_vacancy() >= min_words {
                return Ok(attempt);
            }
        }
        Err(XcorrError::PollTimeout {
            condition: "tx vacancy",
            budget: self.budget,
            observed: fifo.tx_vacancy(),
        })
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_BUDGET)
    }
}
