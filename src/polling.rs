//! Run completion polling.
//!
//! [`poll_until_done`] repeatedly calls a retrieve closure until a terminal
//! predicate holds. The delay between calls follows a hybrid schedule:
//!
//! - **Fast phase**: for the first `fast_poll_duration`, poll every
//!   `fast_poll_interval`. Most runs finish here.
//! - **Backoff phase**: afterwards the delay grows geometrically from
//!   `initial_delay` by `backoff_multiplier`, capped at `max_delay`.
//!
//! Every delay is jittered by `±jitter_fraction`. The backoff attempt number
//! is derived from elapsed time rather than from a call counter, so the
//! schedule is a pure function of `(elapsed, options)` no matter how slow the
//! individual retrievals are.
//!
//! ```ignore
//! use extend::{poll_until_done, PollingOptions};
//!
//! let run = poll_until_done(
//!     || client.extract_runs().retrieve(&run_id),
//!     |run| run.is_terminal(),
//!     &PollingOptions::default().with_max_wait(Duration::from_secs(300)),
//! )
//! .await?;
//! ```

use std::{future::Future, time::Duration};

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::{PollingCancelledError, PollingTimeoutError};

/// Default length of the fixed-interval phase.
pub const DEFAULT_FAST_POLL_DURATION: Duration = Duration::from_secs(30);
/// Default interval during the fixed-interval phase.
pub const DEFAULT_FAST_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default seed delay of the backoff phase.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
/// Default cap on any computed delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.15;
pub const DEFAULT_JITTER_FRACTION: f64 = 0.25;

// Absorbs float error when the elapsed time lands exactly on a schedule boundary.
const ATTEMPT_EPSILON: f64 = 1e-9;

/// Polling schedule configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingOptions {
    /// Overall deadline. `None` waits indefinitely.
    pub max_wait: Option<Duration>,
    pub fast_poll_duration: Duration,
    pub fast_poll_interval: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Values below 1.0 are treated as 1.0.
    pub backoff_multiplier: f64,
    /// Clamped to `[0, 1]`.
    pub jitter_fraction: f64,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            max_wait: None,
            fast_poll_duration: DEFAULT_FAST_POLL_DURATION,
            fast_poll_interval: DEFAULT_FAST_POLL_INTERVAL,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl PollingOptions {
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_fast_poll(mut self, duration: Duration, interval: Duration) -> Self {
        self.fast_poll_duration = duration;
        self.fast_poll_interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    /// Which phase of the schedule applies after `elapsed`.
    pub fn phase_at(&self, elapsed: Duration) -> PollPhase {
        if elapsed < self.fast_poll_duration {
            PollPhase::Fast
        } else {
            PollPhase::Backoff
        }
    }

    fn multiplier(&self) -> f64 {
        if self.backoff_multiplier.is_finite() && self.backoff_multiplier > 1.0 {
            self.backoff_multiplier
        } else {
            1.0
        }
    }

    fn jitter(&self) -> f64 {
        if self.jitter_fraction.is_finite() {
            self.jitter_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Phase of the hybrid polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Fast,
    Backoff,
}

impl PollPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollPhase::Fast => "fast",
            PollPhase::Backoff => "backoff",
        }
    }
}

/// Source of uniform samples in `[0, 1)` used to jitter delays.
///
/// Any `Fn() -> f64` closure is a jitter source, which keeps tests free of
/// global RNG state.
pub trait JitterSource: Send + Sync {
    fn sample(&self) -> f64;
}

impl<F> JitterSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn sample(&self) -> f64 {
        self()
    }
}

/// Default jitter source backed by `fastrand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        fastrand::f64()
    }
}

fn millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Backoff attempt number implied by time spent in the backoff phase.
///
/// Inverts `t = d0 * (m^n - 1) / (m - 1)`; with `m == 1` the series is
/// linear and `n = t / d0`.
fn backoff_attempt(backoff_elapsed_ms: f64, initial_ms: f64, multiplier: f64) -> f64 {
    if backoff_elapsed_ms <= 0.0 {
        return 0.0;
    }
    if multiplier <= 1.0 {
        return (backoff_elapsed_ms / initial_ms + ATTEMPT_EPSILON).floor();
    }
    let ratio = backoff_elapsed_ms * (multiplier - 1.0) / initial_ms + 1.0;
    (ratio.ln() / multiplier.ln() + ATTEMPT_EPSILON).floor()
}

/// Un-jittered delay in milliseconds; always in `(0, max_delay]`.
pub fn base_delay_ms(elapsed: Duration, options: &PollingOptions) -> f64 {
    let max_ms = millis_f64(options.max_delay).max(1.0);

    let raw = match options.phase_at(elapsed) {
        PollPhase::Fast => millis_f64(options.fast_poll_interval),
        PollPhase::Backoff => {
            let initial_ms = millis_f64(options.initial_delay).max(1.0);
            let backoff_elapsed = millis_f64(elapsed.saturating_sub(options.fast_poll_duration));
            let multiplier = options.multiplier();
            let attempt = backoff_attempt(backoff_elapsed, initial_ms, multiplier);
            initial_ms * multiplier.powf(attempt)
        }
    };

    if !raw.is_finite() {
        return max_ms;
    }
    raw.clamp(1.0, max_ms)
}

/// Next delay after `elapsed`, with jitter applied and rounded to whole milliseconds.
pub fn compute_delay(elapsed: Duration, options: &PollingOptions, jitter: &dyn JitterSource) -> Duration {
    let base = base_delay_ms(elapsed, options);
    let fraction = options.jitter();
    let factor = if fraction > 0.0 {
        let sample = jitter.sample().clamp(0.0, 1.0);
        1.0 + (2.0 * sample - 1.0) * fraction
    } else {
        1.0
    };
    let ms = (base * factor).round().max(1.0);
    Duration::from_millis(ms as u64)
}

/// Poll `retrieve` until `is_terminal` holds for its result.
///
/// - Returns the first terminal result; a run that is already finished costs
///   exactly one retrieval.
/// - Errors from `retrieve` are returned as-is, without retry.
/// - When `max_wait` is set and elapsed time reaches it, fails with
///   [`PollingTimeoutError`].
///
/// The predicate is assumed to be monotonic: once a result is terminal it is
/// returned and polling stops.
pub async fn poll_until_done<T, E, F, Fut, P>(
    retrieve: F,
    is_terminal: P,
    options: &PollingOptions,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
    E: From<PollingTimeoutError> + From<PollingCancelledError>,
{
    poll_until_done_with(retrieve, is_terminal, options, &RandomJitter, None).await
}

/// [`poll_until_done`] with an explicit jitter source and optional cancellation.
///
/// The token is checked before every retrieval and raced against every sleep.
pub async fn poll_until_done_with<T, E, F, Fut, P>(
    mut retrieve: F,
    mut is_terminal: P,
    options: &PollingOptions,
    jitter: &dyn JitterSource,
    cancel: Option<&CancellationToken>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
    E: From<PollingTimeoutError> + From<PollingCancelledError>,
{
    let start = Instant::now();

    loop {
        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(PollingCancelledError {
                elapsed: start.elapsed(),
            }
            .into());
        }

        let result = retrieve().await?;
        if is_terminal(&result) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "run reached terminal state"
            );
            return Ok(result);
        }

        let elapsed = start.elapsed();
        let mut delay = compute_delay(elapsed, options, jitter);
        if let Some(max_wait) = options.max_wait {
            if elapsed >= max_wait {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    max_wait_ms = max_wait.as_millis() as u64,
                    "polling deadline exceeded"
                );
                return Err(PollingTimeoutError { elapsed, max_wait }.into());
            }
            delay = delay.min(max_wait - elapsed);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            elapsed_ms = elapsed.as_millis() as u64,
            delay_ms = delay.as_millis() as u64,
            phase = options.phase_at(elapsed).as_str(),
            "run not terminal; sleeping"
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        return Err(PollingCancelledError {
                            elapsed: start.elapsed(),
                        }
                        .into());
                    }
                    _ = sleep(delay) => {}
                }
            }
            None => sleep(delay).await,
        }
    }
}
