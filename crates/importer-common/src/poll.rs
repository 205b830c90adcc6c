//! Fixed-interval polling with a wall-clock budget.
//!
//! Unlike exponential backoff, a poll loop runs its first attempt immediately
//! and then waits a fixed interval between attempts until the overall budget
//! is spent. The caller owns the loop and any state it carries between
//! attempts; the [`Poller`] only decides whether another attempt is allowed.
//!
//! # Example
//!
//! ```ignore
//! use importer_common::poll::{PollConfig, Poller};
//!
//! let mut poller = Poller::new(&PollConfig::default());
//! loop {
//!     if try_once(&mut state).await? {
//!         break;
//!     }
//!     poller.wait().await?;
//! }
//! ```

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::trace;

/// Budget for a poll loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two attempts
    pub interval: Duration,
    /// Total time after which no further attempt is made
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(4),
        }
    }
}

impl PollConfig {
    /// Create a config with the default interval and the given timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// The poll budget was exhausted before the loop finished
#[derive(Debug, Error, PartialEq, Eq)]
#[error("timed out after {elapsed:?} (budget {budget:?})")]
pub struct PollTimeout {
    /// Time spent polling
    pub elapsed: Duration,
    /// Configured budget
    pub budget: Duration,
}

/// Tracks the budget of one poll loop
#[derive(Debug)]
pub struct Poller {
    config: PollConfig,
    started: Instant,
    attempts: u32,
}

impl Poller {
    /// Start a poll loop; the clock starts now
    pub fn new(config: &PollConfig) -> Self {
        Self {
            config: config.clone(),
            started: Instant::now(),
            attempts: 1,
        }
    }

    /// Number of attempts allowed so far, including the first one
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait for the next attempt.
    ///
    /// Returns `Err(PollTimeout)` without sleeping once the budget is spent,
    /// otherwise sleeps one interval and allows another attempt.
    pub async fn wait(&mut self) -> Result<(), PollTimeout> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.config.timeout {
            return Err(PollTimeout {
                elapsed,
                budget: self.config.timeout,
            });
        }

        trace!(
            attempt = self.attempts,
            elapsed_ms = elapsed.as_millis(),
            "waiting for next poll attempt"
        );
        tokio::time::sleep(self.config.interval).await;
        self.attempts += 1;
        Ok(())
    }
}
