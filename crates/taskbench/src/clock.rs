//! Millisecond clock sources.
//!
//! The run loop reads time through a [`Clock`] so tests and embedders can
//! substitute their own source. [`Clock::monotonic`] (the default) wraps
//! [`std::time::Instant`]; [`ManualClock`] is advanced by hand.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

type NowFn = dyn Fn() -> f64 + Send + Sync;

/// A source of monotonically non-decreasing time, in milliseconds.
///
/// # Example
///
/// ```
/// use taskbench::Clock;
///
/// let clock = Clock::monotonic();
/// let start = clock.now();
/// let end = clock.now();
/// assert!(end >= start);
///
/// let fixed = Clock::from_fn(|| 42.0);
/// assert_eq!(fixed.now(), 42.0);
/// ```
#[derive(Clone)]
pub struct Clock {
    now: Arc<NowFn>,
}

impl Clock {
    /// The host's monotonic timer, as milliseconds since the first call in
    /// this process.
    pub fn monotonic() -> Self {
        Self::from_fn(|| {
            static ORIGIN: OnceLock<Instant> = OnceLock::new();
            let origin = ORIGIN.get_or_init(Instant::now);
            origin.elapsed().as_secs_f64() * 1_000.0
        })
    }

    /// A clock backed by an arbitrary function returning milliseconds.
    pub fn from_fn<F>(now: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self { now: Arc::new(now) }
    }

    /// Current time in milliseconds.
    #[inline]
    pub fn now(&self) -> f64 {
        (self.now)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::monotonic()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}

/// A clock that only moves when told to.
///
/// Useful for deterministic tests: a task function can advance the clock
/// by the amount of "work" it pretends to do.
///
/// ```
/// use taskbench::ManualClock;
///
/// let manual = ManualClock::new();
/// let clock = manual.clock();
/// manual.advance(10.0);
/// assert_eq!(clock.now(), 10.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Creates a clock reading `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `ms`. Negative values are ignored.
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            *self.lock() += ms;
        }
    }

    /// Current reading in milliseconds.
    pub fn now(&self) -> f64 {
        *self.lock()
    }

    /// A [`Clock`] reading this manual clock.
    pub fn clock(&self) -> Clock {
        let manual = self.clone();
        Clock::from_fn(move || manual.now())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, f64> {
        // A poisoned lock still holds a valid reading.
        self.now_ms.lock().unwrap_or_else(|e| e.into_inner())
    }
}
