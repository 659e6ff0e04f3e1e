//! Bounded retry loop for state that converges asynchronously on the platform
//! (IP assignment, request completion).

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::vra::{Result, VraError};

/// Wait between probes when the caller does not choose one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How often to probe and when to give up.
///
/// The default probes every ten seconds and never gives up; callers that
/// need a bound set `max_attempts` and/or `timeout`, or drop the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// True when neither an attempt limit nor a timeout is set
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.timeout.is_none()
    }
}

/// Run `probe` until it yields `Some`, sleeping `policy.interval` between
/// passes. Errors from `probe` abort the loop immediately.
///
/// The probe always runs at least once, even with a zero timeout or
/// `max_attempts == 0`.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();
    // A deadline past the end of representable time is no deadline
    let deadline = policy.timeout.and_then(|t| started.checked_add(t));
    let mut attempts: u32 = 0;

    if policy.is_unbounded() {
        tracing::debug!("Waiting for {} with no deadline", what);
    }

    loop {
        attempts = attempts.saturating_add(1);
        if let Some(value) = probe().await? {
            tracing::debug!("{} ready after {} attempt(s)", what, attempts);
            return Ok(value);
        }

        let out_of_attempts = policy.max_attempts.is_some_and(|max| attempts >= max);
        let past_deadline = deadline.is_some_and(|deadline| {
            Instant::now()
                .checked_add(policy.interval)
                .map_or(true, |next| next > deadline)
        });
        if out_of_attempts || past_deadline {
            return Err(VraError::Timeout {
                what: what.to_string(),
                attempts,
                elapsed: started.elapsed(),
            });
        }

        tracing::trace!("{} not ready (attempt {}), retrying in {:?}", what, attempts, policy.interval);
        sleep(policy.interval).await;
    }
}
