//! Bounded "wait until" polling
//!
//! Wallet providers often acknowledge a request before the state it asks for
//! is visible (a chain switch the user silently declined, an extension that
//! has not injected yet). [`await_condition`] re-checks a predicate on a fixed
//! tick until it holds or the configured bound is reached.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// Smallest tick accepted, so a zero interval cannot spin
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// How long a poll may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLimit {
    /// Give up after this many failed checks
    Attempts(u32),
    /// Give up on the first tick whose elapsed time exceeds this window
    Window(Duration),
}

/// Poll schedule: one check per `interval`, bounded by `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before each check
    pub interval: Duration,
    /// When to stop
    pub limit: PollLimit,
}

impl PollConfig {
    /// Checks every `interval`, at most `max_attempts` times
    pub fn attempts(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            limit: PollLimit::Attempts(max_attempts),
        }
    }

    /// Checks every `interval` until `window` has passed
    pub fn within(interval: Duration, window: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            limit: PollLimit::Window(window),
        }
    }

    /// Chain switch confirmation: 300 ms ticks for 5 s
    pub fn chain_switch() -> Self {
        Self::within(Duration::from_millis(300), Duration::from_millis(5000))
    }

    /// Tron injection detection: 50 checks at 10 ms
    pub fn tron_injection() -> Self {
        Self::attempts(Duration::from_millis(10), 50)
    }

    /// Number of checks that will run before giving up
    pub fn max_checks(&self) -> u32 {
        match self.limit {
            PollLimit::Attempts(n) => n,
            PollLimit::Window(window) => {
                let ticks = window.as_nanos() / self.interval.as_nanos();
                u32::try_from(ticks).unwrap_or(u32::MAX)
            }
        }
    }

    /// Upper bound on how long a poll can take
    pub fn max_wait(&self) -> Duration {
        let ticks = match self.limit {
            PollLimit::Attempts(n) => n,
            PollLimit::Window(_) => self.max_checks().saturating_add(1),
        };
        self.interval.saturating_mul(ticks)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::chain_switch()
    }
}

/// Result of a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate held on the given check (1-based)
    Confirmed {
        /// Which check succeeded
        attempt: u32,
    },
    /// The bound was reached first
    TimedOut,
}

impl PollOutcome {
    /// Checks if the predicate held
    pub fn is_confirmed(&self) -> bool {
        matches!(self, PollOutcome::Confirmed { .. })
    }
}

/// Waits one interval, then evaluates `predicate`, until it returns true or
/// the limit is reached.
///
/// Exactly one timer is live at a time. Dropping the returned future cancels
/// the poll.
///
/// # Example
///
/// ```rust
/// use polywallet_resilience::{await_condition, PollConfig, PollOutcome};
/// use std::time::Duration;
///
/// # async fn example() {
/// let outcome = await_condition(
///     PollConfig::attempts(Duration::from_millis(10), 3),
///     || async { true },
/// ).await;
/// assert_eq!(outcome, PollOutcome::Confirmed { attempt: 1 });
/// # }
/// ```
pub async fn await_condition<F, Fut>(config: PollConfig, mut predicate: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut elapsed = Duration::ZERO;
    let mut attempt: u32 = 0;

    loop {
        tokio::time::sleep(config.interval).await;
        elapsed = elapsed.saturating_add(config.interval);

        if let PollLimit::Window(window) = config.limit {
            if elapsed > window {
                debug!(?elapsed, checks = attempt, "poll window exhausted");
                return PollOutcome::TimedOut;
            }
        }

        attempt += 1;
        if predicate().await {
            trace!(attempt, ?elapsed, "poll condition met");
            return PollOutcome::Confirmed { attempt };
        }

        if let PollLimit::Attempts(max) = config.limit {
            if attempt >= max {
                debug!(?elapsed, checks = attempt, "poll attempts exhausted");
                return PollOutcome::TimedOut;
            }
        }
    }
}
