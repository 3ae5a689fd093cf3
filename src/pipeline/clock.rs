//! Time source and bounded polling.
//!
//! All settle sleeps and polling loops go through [`Clock`] so the waiting policy can be
//! exercised with virtual time.

use std::{
    future::Future,
    sync::Mutex,
    time::Duration,
};

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Suspends for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Wall-clock implementation backed by the tokio timer.
#[derive(Debug, Clone)]
pub struct TokioClock {
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Virtual clock: time only moves when something sleeps.
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves virtual time forward without sleeping.
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += duration;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}

/// How long and how often to poll for a condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second probe
    pub interval: Duration,
    /// Total time after which polling gives up
    pub timeout: Duration,
    /// Multiplier applied to the delay after each probe (1.0 = fixed interval)
    pub backoff: f64,
    /// Upper bound for the delay between probes
    pub max_interval: Duration,
}

impl PollPolicy {
    /// Fixed-interval policy.
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            backoff: 1.0,
            max_interval: interval,
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        if self.backoff <= 1.0 {
            return delay;
        }
        let cap = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff)
            .unwrap_or(cap)
            .min(cap)
    }
}

/// Result of [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The probe succeeded
    Ready {
        /// Time from the first probe to the successful one
        elapsed: Duration,
        /// Number of probes made, including the successful one
        attempts: u32,
    },
    /// The timeout elapsed without the probe succeeding
    TimedOut {
        /// Time spent polling; equal to the policy timeout
        elapsed: Duration,
        /// Number of probes made
        attempts: u32,
    },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Ready { elapsed, .. } | PollOutcome::TimedOut { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

/// Probes immediately, then after each delay, until `probe` returns true or the timeout
/// is reached.
///
/// The last delay is clamped to the remaining time, so a timeout is reported exactly at
/// `policy.timeout`, after one final probe.
pub async fn poll_until<C, F>(clock: &C, policy: &PollPolicy, mut probe: F) -> PollOutcome
where
    C: Clock,
    F: FnMut() -> bool,
{
    let start = clock.elapsed();
    let mut delay = policy.interval;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let elapsed = clock.elapsed().saturating_sub(start);

        if probe() {
            return PollOutcome::Ready { elapsed, attempts };
        }
        if elapsed >= policy.timeout || delay.is_zero() {
            return PollOutcome::TimedOut { elapsed, attempts };
        }

        clock.sleep(delay.min(policy.timeout - elapsed)).await;
        delay = policy.next_delay(delay);
    }
}
