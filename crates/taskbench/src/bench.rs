//! Benchmark orchestration.
//!
//! A [`Bench`] owns an ordered set of [`Task`]s and one shared [`Options`].
//! [`Bench::run`] executes the tasks one after another in insertion order;
//! a failing task is recorded and reported, never fatal to the run.

use crate::clock::Clock;
use crate::events::{Emitter, Event, EventKind, ListenerId};
use crate::options::{Hook, Options};
use crate::report::{BenchReport, TableRow};
use crate::signal::AbortSignal;
use crate::stats::TaskResult;
use crate::task::{Task, TaskFn};
use crate::types::{BenchError, BoxError, TaskState};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Builder for a [`Bench`].
///
/// # Example
///
/// ```
/// use taskbench::Bench;
///
/// let bench = Bench::builder()
///     .time(100.0)
///     .iterations(20)
///     .warmup_time(10.0)
///     .warmup_iterations(2)
///     .build()?;
///
/// assert_eq!(bench.options().time, 100.0);
/// assert_eq!(bench.options().iterations, 20);
/// # Ok::<(), taskbench::BenchError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct BenchBuilder {
    options: Options,
}

impl BenchBuilder {
    /// Creates a builder with the default [`Options`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum measurement time per task, in milliseconds.
    pub fn time(mut self, ms: f64) -> Self {
        self.options.time = ms;
        self
    }

    /// Minimum number of measured invocations per task.
    pub fn iterations(mut self, n: u64) -> Self {
        self.options.iterations = n;
        self
    }

    /// Enables or disables the warmup phase.
    pub fn warmup(mut self, enabled: bool) -> Self {
        self.options.warmup = enabled;
        self
    }

    /// Minimum warmup time per task, in milliseconds.
    pub fn warmup_time(mut self, ms: f64) -> Self {
        self.options.warmup_time = ms;
        self
    }

    /// Minimum number of warmup invocations per task.
    pub fn warmup_iterations(mut self, n: u64) -> Self {
        self.options.warmup_iterations = n;
        self
    }

    /// Replaces the default monotonic clock.
    pub fn now(mut self, clock: Clock) -> Self {
        self.options.now = clock;
        self
    }

    /// Attaches an abort signal.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.options.signal = Some(signal);
        self
    }

    /// Hook run before every invocation.
    pub fn setup(mut self, hook: Hook) -> Self {
        self.options.setup = Some(hook);
        self
    }

    /// Hook run after every invocation.
    pub fn teardown(mut self, hook: Hook) -> Self {
        self.options.teardown = Some(hook);
        self
    }

    /// Validates the options and creates the bench.
    pub fn build(self) -> Result<Bench, BenchError> {
        Bench::with_options(self.options)
    }
}

/// An ordered collection of tasks sharing one configuration.
///
/// # Example
///
/// ```
/// use taskbench::{Bench, BoxError, TaskState};
///
/// let mut bench = Bench::builder().time(0.0).iterations(3).warmup(false).build()?;
/// bench
///     .add("sum", || {
///         std::hint::black_box((0..1_000u64).sum::<u64>());
///         Ok::<(), BoxError>(())
///     })
///     .add_async("ready", || async { Ok::<(), BoxError>(()) });
///
/// futures::executor::block_on(bench.run());
///
/// for task in bench.tasks() {
///     assert_eq!(task.state(), TaskState::Completed);
///     assert_eq!(task.samples().len(), 3);
/// }
/// # Ok::<(), taskbench::BenchError>(())
/// ```
pub struct Bench {
    options: Rc<Options>,
    tasks: Vec<Task>,
    events: Emitter,
}

impl Bench {
    /// Starts building a bench.
    pub fn builder() -> BenchBuilder {
        BenchBuilder::new()
    }

    /// Creates a bench with validated options.
    pub fn with_options(options: Options) -> Result<Self, BenchError> {
        options.validate()?;
        Ok(Self {
            options: Rc::new(options),
            tasks: Vec::new(),
            events: Emitter::new(),
        })
    }

    /// The shared options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Adds a synchronous task. See [`add_task`](Self::add_task).
    pub fn add<F, E>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: FnMut() -> Result<(), E> + 'static,
        E: Into<BoxError> + 'static,
    {
        self.add_task(name, TaskFn::from_fn(f))
    }

    /// Adds an asynchronous task. See [`add_task`](Self::add_task).
    pub fn add_async<F, Fut, E>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: Into<BoxError> + 'static,
    {
        self.add_task(name, TaskFn::from_async(f))
    }

    /// Adds a task and emits `add`.
    ///
    /// A task with the same name is replaced in place, keeping its
    /// position in the run order.
    pub fn add_task(&mut self, name: impl Into<String>, func: TaskFn) -> &mut Self {
        let task = Task::with_shared_options(name, func, Rc::clone(&self.options));
        let index = match self.position(task.name()) {
            Some(index) => {
                debug!(task = %task.name(), "replacing task with the same name");
                self.tasks[index] = task;
                index
            }
            None => {
                self.tasks.push(task);
                self.tasks.len() - 1
            }
        };
        self.emit(EventKind::Add, Some(&self.tasks[index]));
        self
    }

    /// Removes the task called `name`, emitting `remove`.
    pub fn remove(&mut self, name: &str) -> Option<Task> {
        let index = self.position(name)?;
        let task = self.tasks.remove(index);
        self.emit(EventKind::Remove, Some(&task));
        Some(task)
    }

    /// Tasks in run order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks a task up by name.
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.name() == name)
    }

    /// Looks a task up by name, mutably (for example to subscribe to it).
    pub fn get_task_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.name() == name)
    }

    /// Each task's result, in run order. `None` for tasks that did not
    /// complete.
    pub fn results(&self) -> Vec<Option<&TaskResult>> {
        self.tasks.iter().map(Task::result).collect()
    }

    /// One summary row per task, in run order.
    pub fn table(&self) -> Vec<TableRow> {
        self.tasks.iter().map(TableRow::from_task).collect()
    }

    /// A serializable snapshot of every task.
    pub fn report(&self) -> BenchReport {
        BenchReport::from_tasks(&self.tasks)
    }

    /// Registers an event handler on the bench.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&Event<'_>) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    /// Removes an event handler from the bench.
    pub fn unsubscribe(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.events.unsubscribe(kind, id)
    }

    /// Runs every task sequentially, in insertion order.
    ///
    /// Emits `warmup` (when warmup is enabled) and `start` first, `cycle`
    /// after each task reaches a terminal state, `error` for each task that
    /// errored, `abort` the first time the abort signal is observed, and
    /// `complete` last. If the signal is set before a task starts, that
    /// task and all later ones are marked aborted without running.
    pub async fn run(&mut self) -> &[Task] {
        info!(tasks = self.tasks.len(), "bench started");
        if self.options.warmup {
            self.emit(EventKind::Warmup, None);
        }
        self.emit(EventKind::Start, None);

        let mut abort_seen = false;
        for index in 0..self.tasks.len() {
            let state = if self.options.is_aborted() {
                self.tasks[index].abort()
            } else {
                self.tasks[index].run().await
            };

            let task = &self.tasks[index];
            match state {
                TaskState::Errored => {
                    if let Some(error) = task.error() {
                        warn!(task = %task.name(), %error, "task errored");
                    }
                    self.emit(EventKind::Error, Some(task));
                }
                TaskState::Aborted if !abort_seen => {
                    abort_seen = true;
                    info!(task = %task.name(), "abort signal observed, skipping remaining tasks");
                    self.emit(EventKind::Abort, None);
                }
                _ => {}
            }
            self.emit(EventKind::Cycle, Some(task));
        }

        self.emit(EventKind::Complete, None);
        info!(tasks = self.tasks.len(), "bench finished");
        &self.tasks
    }

    /// Returns every task to `idle`, clearing samples, results and errors.
    ///
    /// Tasks stay in the collection.
    pub fn reset(&mut self) {
        self.emit(EventKind::Reset, None);
        for task in &mut self.tasks {
            task.reset();
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.name() == name)
    }

    fn emit(&self, kind: EventKind, task: Option<&Task>) {
        self.events.emit(&Event { kind, task });
    }
}

impl fmt::Debug for Bench {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bench")
            .field("options", &self.options)
            .field("tasks", &self.tasks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let bench = Bench::builder().build().unwrap();
        assert_eq!(bench.options().time, 500.0);
        assert_eq!(bench.options().iterations, 10);
        assert!(bench.options().warmup);
        assert_eq!(bench.options().warmup_time, 100.0);
        assert_eq!(bench.options().warmup_iterations, 5);
        assert!(bench.options().signal.is_none());
    }

    #[test]
    fn test_builder_customization() {
        let signal = AbortSignal::new();
        let bench = Bench::builder()
            .time(50.0)
            .iterations(7)
            .warmup(false)
            .warmup_time(5.0)
            .warmup_iterations(1)
            .signal(signal)
            .build()
            .unwrap();

        assert_eq!(bench.options().time, 50.0);
        assert_eq!(bench.options().iterations, 7);
        assert!(!bench.options().warmup);
        assert_eq!(bench.options().warmup_time, 5.0);
        assert_eq!(bench.options().warmup_iterations, 1);
        assert!(bench.options().signal.is_some());
    }

    #[test]
    fn test_builder_rejects_invalid_time() {
        let result = Bench::builder().warmup_time(f64::INFINITY).build();
        assert!(matches!(result, Err(BenchError::Config(_))));
    }

    #[test]
    fn test_add_replaces_same_name_in_place() {
        let mut bench = Bench::builder().build().unwrap();
        bench
            .add("a", || Ok::<(), BoxError>(()))
            .add("b", || Ok::<(), BoxError>(()))
            .add_async("a", || async { Ok::<(), BoxError>(()) });

        let names: Vec<&str> = bench.tasks().iter().map(Task::name).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(bench.get_task("a").is_some());
    }

    #[test]
    fn test_tasks_share_bench_options() {
        let mut bench = Bench::builder().time(3.0).iterations(4).build().unwrap();
        bench.add("a", || Ok::<(), BoxError>(()));

        let options = bench.get_task("a").unwrap().options();
        assert_eq!(options.time, 3.0);
        assert_eq!(options.iterations, 4);
        assert!(std::ptr::eq(options, bench.options()));
    }

    #[test]
    fn test_remove_returns_task() {
        let mut bench = Bench::builder().build().unwrap();
        bench.add("a", || Ok::<(), BoxError>(()));

        let removed = bench.remove("a").expect("task exists");
        assert_eq!(removed.name(), "a");
        assert!(bench.tasks().is_empty());
        assert!(bench.remove("a").is_none());
    }
}
