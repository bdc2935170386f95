//! A single benchmark task and its run loop.
//!
//! A [`Task`] wraps one function plus the shared [`Options`]. [`Task::run`]
//! drives it through an optional warmup phase and a measurement phase. Both
//! phases use the same loop:
//!
//! 1. stop if the abort signal is set
//! 2. run the setup hook
//! 3. time one invocation of the function
//! 4. run the teardown hook
//! 5. in the measurement phase, record the sample
//! 6. stop once `elapsed >= time floor && invocations >= iteration floor`
//!
//! Failures of the function or a hook (returned errors and panics alike) end
//! the task in [`TaskState::Errored`]; they never escape `run`.

use crate::events::{Emitter, Event, EventKind, ListenerId};
use crate::options::Options;
use crate::stats::{TaskResult, compute_result};
use crate::types::{BenchError, BoxError, HookKind, Phase, TaskError, TaskState};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, trace};

/// The function a task benchmarks.
///
/// Return `Err` to signal failure; panics are caught and treated the same
/// way.
///
/// # Example
///
/// ```
/// use taskbench::{BoxError, TaskFn};
///
/// let sync_fn = TaskFn::from_fn(|| {
///     std::hint::black_box((0..100u64).sum::<u64>());
///     Ok::<(), BoxError>(())
/// });
///
/// let async_fn = TaskFn::from_async(|| async {
///     std::hint::black_box(42);
///     Ok::<(), BoxError>(())
/// });
/// # let _ = (sync_fn, async_fn);
/// ```
pub enum TaskFn {
    /// Runs to completion when called.
    Sync(Box<dyn FnMut() -> Result<(), BoxError>>),
    /// Returns a future that is awaited inside the timed region.
    Async(Box<dyn FnMut() -> LocalBoxFuture<'static, Result<(), BoxError>>>),
}

impl TaskFn {
    /// Wraps a synchronous function.
    pub fn from_fn<F, E>(mut f: F) -> Self
    where
        F: FnMut() -> Result<(), E> + 'static,
        E: Into<BoxError> + 'static,
    {
        TaskFn::Sync(Box::new(move || f().map_err(Into::into)))
    }

    /// Wraps a function returning a future.
    pub fn from_async<F, Fut, E>(mut f: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: Into<BoxError> + 'static,
    {
        TaskFn::Async(Box::new(move || {
            f().map(|outcome| outcome.map_err(Into::into))
                .boxed_local()
        }))
    }

    /// Returns `true` for [`TaskFn::Async`].
    pub fn is_async(&self) -> bool {
        matches!(self, TaskFn::Async(_))
    }
}

impl fmt::Debug for TaskFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFn::Sync(_) => f.write_str("TaskFn::Sync"),
            TaskFn::Async(_) => f.write_str("TaskFn::Async"),
        }
    }
}

/// Run state. Results and errors live inside the state they belong to.
enum Status {
    Idle,
    WarmingUp,
    Running,
    Completed(TaskResult),
    Errored(TaskError),
    Aborted,
}

impl Status {
    fn state(&self) -> TaskState {
        match self {
            Status::Idle => TaskState::Idle,
            Status::WarmingUp => TaskState::WarmingUp,
            Status::Running => TaskState::Running,
            Status::Completed(_) => TaskState::Completed,
            Status::Errored(_) => TaskState::Errored,
            Status::Aborted => TaskState::Aborted,
        }
    }
}

enum PhaseOutcome {
    Finished,
    Aborted,
    Failed(TaskError),
}

/// Returns `true` once a phase has satisfied both of its floors.
fn budget_met(elapsed: f64, invocations: u64, time_floor: f64, iteration_floor: u64) -> bool {
    elapsed >= time_floor && invocations >= iteration_floor
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

fn flatten(outcome: Result<Result<(), BoxError>, Box<dyn Any + Send>>) -> Result<(), BoxError> {
    outcome.unwrap_or_else(|payload| Err(panic_message(payload).into()))
}

/// One benchmark: a named function, its samples and its outcome.
///
/// Tasks are usually created through [`crate::Bench::add`]; [`Task::new`]
/// allows running one on its own.
///
/// # Example
///
/// ```
/// use taskbench::{BoxError, Options, Task, TaskFn, TaskState};
///
/// let options = Options {
///     time: 0.0,
///     iterations: 5,
///     warmup: false,
///     ..Options::default()
/// };
/// let mut task = Task::new("sum", TaskFn::from_fn(|| {
///     std::hint::black_box((0..100u64).sum::<u64>());
///     Ok::<(), BoxError>(())
/// }), options);
///
/// let state = futures::executor::block_on(task.run());
/// assert_eq!(state, TaskState::Completed);
/// assert_eq!(task.samples().len(), 5);
/// assert!(task.result().is_some());
/// ```
pub struct Task {
    name: String,
    func: TaskFn,
    options: Rc<Options>,
    samples: Vec<f64>,
    status: Status,
    events: Emitter,
}

impl Task {
    /// Creates an idle task.
    pub fn new(name: impl Into<String>, func: TaskFn, options: Options) -> Self {
        Self::with_shared_options(name, func, Rc::new(options))
    }

    pub(crate) fn with_shared_options(
        name: impl Into<String>,
        func: TaskFn,
        options: Rc<Options>,
    ) -> Self {
        Self {
            name: name.into(),
            func,
            options,
            samples: Vec::new(),
            status: Status::Idle,
            events: Emitter::new(),
        }
    }

    /// The task's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The options this task runs with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.status.state()
    }

    /// Measured durations so far, in invocation order (milliseconds).
    ///
    /// Empty after an error or a reset.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// The statistics, present only in [`TaskState::Completed`].
    pub fn result(&self) -> Option<&TaskResult> {
        match &self.status {
            Status::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// The failure, present only in [`TaskState::Errored`].
    pub fn error(&self) -> Option<&TaskError> {
        match &self.status {
            Status::Errored(error) => Some(error),
            _ => None,
        }
    }

    /// Like [`result`](Self::result), but reports why statistics are
    /// unavailable.
    pub fn try_result(&self) -> Result<&TaskResult, BenchError> {
        self.result().ok_or_else(|| BenchError::Unavailable {
            name: self.name.clone(),
            state: self.state(),
        })
    }

    /// Registers an event handler on this task.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&Event<'_>) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    /// Removes an event handler from this task.
    pub fn unsubscribe(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.events.unsubscribe(kind, id)
    }

    /// Runs warmup (if enabled) and measurement, then computes the result.
    ///
    /// Only an idle task runs; calling this in any other state returns the
    /// current state without invoking the function. Call
    /// [`reset`](Self::reset) to run a finished task again.
    pub async fn run(&mut self) -> TaskState {
        if self.state() != TaskState::Idle {
            debug!(task = %self.name, state = %self.state(), "task is not idle, skipping run");
            return self.state();
        }

        if self.options.warmup {
            self.status = Status::WarmingUp;
            self.emit(EventKind::Warmup);
            match self.run_phase(Phase::Warmup).await {
                PhaseOutcome::Finished => {}
                outcome => return self.finish(outcome),
            }
        }

        self.status = Status::Running;
        self.emit(EventKind::Start);
        let outcome = self.run_phase(Phase::Run).await;
        self.finish(outcome)
    }

    /// Moves an idle task straight to [`TaskState::Aborted`].
    ///
    /// Used when the abort signal fires before the task gets its turn.
    /// Tasks in any other state are left alone.
    pub fn abort(&mut self) -> TaskState {
        if self.state() == TaskState::Idle {
            debug!(task = %self.name, "task aborted before start");
            self.status = Status::Aborted;
            self.emit(EventKind::Abort);
        }
        self.state()
    }

    /// Returns the task to [`TaskState::Idle`], clearing samples, result
    /// and error.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.status = Status::Idle;
        self.emit(EventKind::Reset);
    }

    async fn run_phase(&mut self, phase: Phase) -> PhaseOutcome {
        let (time_floor, iteration_floor) = self.options.thresholds(phase);
        let clock = self.options.now.clone();
        let started = clock.now();
        let mut invocations: u64 = 0;

        debug!(
            task = %self.name,
            %phase,
            time_floor,
            iteration_floor,
            is_async = self.func.is_async(),
            "phase started"
        );

        loop {
            if self.options.is_aborted() {
                debug!(task = %self.name, %phase, invocations, "abort signal observed");
                return PhaseOutcome::Aborted;
            }

            if let Err(error) = self.call_hook(HookKind::Setup, phase).await {
                return PhaseOutcome::Failed(error);
            }
            let invocation = self.invoke().await;
            let teardown = self.call_hook(HookKind::Teardown, phase).await;

            let sample = match invocation {
                Ok(sample) => sample,
                Err(source) => return PhaseOutcome::Failed(TaskError::Function { source }),
            };
            if let Err(error) = teardown {
                return PhaseOutcome::Failed(error);
            }

            invocations += 1;
            trace!(task = %self.name, %phase, sample, "invocation finished");

            if phase == Phase::Run {
                self.samples.push(sample);
                self.emit(EventKind::Cycle);
            }

            if budget_met(clock.now() - started, invocations, time_floor, iteration_floor) {
                debug!(task = %self.name, %phase, invocations, "phase finished");
                return PhaseOutcome::Finished;
            }
        }
    }

    /// Times one call of the function, in milliseconds.
    async fn invoke(&mut self) -> Result<f64, BoxError> {
        let clock = self.options.now.clone();
        match &mut self.func {
            TaskFn::Sync(f) => {
                let start = clock.now();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| f()));
                let elapsed = clock.now() - start;
                flatten(outcome).map(|()| elapsed)
            }
            TaskFn::Async(f) => {
                let start = clock.now();
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| f())) {
                    Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                    Err(payload) => Err(payload),
                };
                let elapsed = clock.now() - start;
                flatten(outcome).map(|()| elapsed)
            }
        }
    }

    async fn call_hook(&self, kind: HookKind, phase: Phase) -> Result<(), TaskError> {
        let hook = match kind {
            HookKind::Setup => self.options.setup.clone(),
            HookKind::Teardown => self.options.teardown.clone(),
        };
        let Some(hook) = hook else {
            return Ok(());
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| hook.call(self, phase))) {
            Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
            Err(payload) => Err(payload),
        };
        flatten(outcome).map_err(|source| TaskError::Hook {
            kind,
            phase,
            source,
        })
    }

    fn finish(&mut self, outcome: PhaseOutcome) -> TaskState {
        match outcome {
            PhaseOutcome::Finished => {
                let result = compute_result(&self.samples);
                debug!(
                    task = %self.name,
                    samples = result.sample_count(),
                    mean_ms = result.mean,
                    rme = result.rme,
                    "task completed"
                );
                self.status = Status::Completed(result);
                self.emit(EventKind::Complete);
            }
            PhaseOutcome::Aborted => {
                self.status = Status::Aborted;
                self.emit(EventKind::Abort);
            }
            PhaseOutcome::Failed(error) => {
                debug!(task = %self.name, %error, "task errored");
                self.samples.clear();
                self.status = Status::Errored(error);
                self.emit(EventKind::Error);
            }
        }
        self.state()
    }

    fn emit(&self, kind: EventKind) {
        self.events.emit(&Event {
            kind,
            task: Some(self),
        });
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("func", &self.func)
            .field("state", &self.state())
            .field("samples", &self.samples.len())
            .finish_non_exhaustive()
    }
}
