//! Shared bench configuration and setup/teardown hooks.

use crate::clock::Clock;
use crate::signal::AbortSignal;
use crate::task::Task;
use crate::types::{BenchError, BoxError, Phase};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;

/// Default minimum measurement time, in milliseconds.
pub const DEFAULT_TIME_MS: f64 = 500.0;
/// Default minimum number of measured invocations.
pub const DEFAULT_ITERATIONS: u64 = 10;
/// Default minimum warmup time, in milliseconds.
pub const DEFAULT_WARMUP_TIME_MS: f64 = 100.0;
/// Default minimum number of warmup invocations.
pub const DEFAULT_WARMUP_ITERATIONS: u64 = 5;

type HookFn = dyn for<'a> Fn(&'a Task, Phase) -> LocalBoxFuture<'a, Result<(), BoxError>>;

/// A setup or teardown callback.
///
/// Hooks receive the task being run and the current [`Phase`]. They may be
/// synchronous ([`Hook::from_fn`]) or asynchronous ([`Hook::from_async`]).
/// A hook failure ends the task in the `errored` state, just like a
/// failure of the task function.
///
/// # Example
///
/// ```
/// use futures::FutureExt;
/// use taskbench::{BoxError, Hook, Phase};
///
/// let sync_hook = Hook::from_fn(|task, phase| {
///     assert!(!task.name().is_empty());
///     let _ = phase == Phase::Run;
///     Ok::<(), BoxError>(())
/// });
///
/// let async_hook = Hook::from_async(|task, _phase| {
///     async move {
///         let _ = task.name();
///         Ok::<(), BoxError>(())
///     }
///     .boxed_local()
/// });
/// # let _ = (sync_hook, async_hook);
/// ```
#[derive(Clone)]
pub struct Hook {
    call: Rc<HookFn>,
}

impl Hook {
    /// Wraps a synchronous hook.
    pub fn from_fn<F, E>(hook: F) -> Self
    where
        F: Fn(&Task, Phase) -> Result<(), E> + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::from_async(move |task, phase| {
            let outcome = hook(task, phase).map_err(Into::into);
            std::future::ready(outcome).boxed_local()
        })
    }

    /// Wraps an asynchronous hook returning a boxed local future.
    pub fn from_async<F>(hook: F) -> Self
    where
        F: for<'a> Fn(&'a Task, Phase) -> LocalBoxFuture<'a, Result<(), BoxError>> + 'static,
    {
        Self {
            call: Rc::new(hook),
        }
    }

    pub(crate) fn call<'a>(
        &self,
        task: &'a Task,
        phase: Phase,
    ) -> LocalBoxFuture<'a, Result<(), BoxError>> {
        (self.call)(task, phase)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").finish_non_exhaustive()
    }
}

/// Configuration shared by a bench and all of its tasks.
///
/// A phase keeps invoking the task function until *both* its time floor and
/// its iteration floor are met, so a fast function still runs `iterations`
/// times and a slow one still runs for `time` milliseconds.
///
/// # Example
///
/// ```
/// use taskbench::Options;
///
/// let options = Options::default();
/// assert_eq!(options.time, 500.0);
/// assert_eq!(options.iterations, 10);
/// assert!(options.warmup);
/// assert_eq!(options.warmup_time, 100.0);
/// assert_eq!(options.warmup_iterations, 5);
/// ```
#[derive(Clone)]
pub struct Options {
    /// Minimum measurement time, in milliseconds.
    pub time: f64,
    /// Minimum number of measured invocations.
    pub iterations: u64,
    /// Whether to run a warmup phase before measuring.
    pub warmup: bool,
    /// Minimum warmup time, in milliseconds.
    pub warmup_time: f64,
    /// Minimum number of warmup invocations.
    pub warmup_iterations: u64,
    /// Time source for phase budgets and samples.
    pub now: Clock,
    /// Cancellation flag checked before every invocation and every task.
    pub signal: Option<AbortSignal>,
    /// Runs before every invocation.
    pub setup: Option<Hook>,
    /// Runs after every invocation.
    pub teardown: Option<Hook>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            time: DEFAULT_TIME_MS,
            iterations: DEFAULT_ITERATIONS,
            warmup: true,
            warmup_time: DEFAULT_WARMUP_TIME_MS,
            warmup_iterations: DEFAULT_WARMUP_ITERATIONS,
            now: Clock::monotonic(),
            signal: None,
            setup: None,
            teardown: None,
        }
    }
}

impl Options {
    /// Checks that both time budgets are finite and non-negative.
    pub fn validate(&self) -> Result<(), BenchError> {
        for (field, value) in [("time", self.time), ("warmup_time", self.warmup_time)] {
            if !value.is_finite() || value < 0.0 {
                return Err(BenchError::Config(format!(
                    "{field} must be a finite, non-negative number of milliseconds (got {value})"
                )));
            }
        }
        Ok(())
    }

    /// Returns `true` if the abort signal is set.
    pub fn is_aborted(&self) -> bool {
        self.signal.as_ref().is_some_and(AbortSignal::is_aborted)
    }

    /// Time floor and iteration floor for `phase`.
    pub(crate) fn thresholds(&self, phase: Phase) -> (f64, u64) {
        match phase {
            Phase::Warmup => (self.warmup_time, self.warmup_iterations),
            Phase::Run => (self.time, self.iterations),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("time", &self.time)
            .field("iterations", &self.iterations)
            .field("warmup", &self.warmup)
            .field("warmup_time", &self.warmup_time)
            .field("warmup_iterations", &self.warmup_iterations)
            .field("signal", &self.signal)
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish_non_exhaustive()
    }
}
