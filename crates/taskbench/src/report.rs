//! Serializable run summaries.
//!
//! [`BenchReport`] captures every task's state, statistics and error after
//! a run; [`TableRow`] is the condensed per-task view used for console
//! output (ops/sec, average time, margin, sample count).

use crate::stats::TaskResult;
use crate::task::Task;
use crate::types::{BenchError, TaskState};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot of one task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskReport {
    /// Task name.
    pub name: String,
    /// State at the time of the snapshot.
    pub state: TaskState,
    /// Statistics, present only for completed tasks.
    pub result: Option<TaskResult>,
    /// Error message, present only for errored tasks.
    pub error: Option<String>,
}

impl TaskReport {
    /// Captures `task` as it is now.
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name().to_string(),
            state: task.state(),
            result: task.result().cloned(),
            error: task.error().map(ToString::to_string),
        }
    }
}

/// Snapshot of a whole bench.
///
/// # Example
///
/// ```
/// use taskbench::{Bench, BenchReport, BoxError};
///
/// let mut bench = Bench::builder().time(0.0).iterations(2).warmup(false).build()?;
/// bench.add("noop", || Ok::<(), BoxError>(()));
/// futures::executor::block_on(bench.run());
///
/// let json = bench.report().to_json()?;
/// let restored: BenchReport = serde_json::from_str(&json)?;
/// assert_eq!(restored.tasks[0].name, "noop");
/// assert_eq!(restored.tasks[0].result.as_ref().unwrap().samples.len(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BenchReport {
    /// One entry per task, in run order.
    pub tasks: Vec<TaskReport>,
}

impl BenchReport {
    /// Captures every task in `tasks`.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            tasks: tasks.iter().map(TaskReport::from_task).collect(),
        }
    }

    /// Number of tasks in `state`.
    pub fn count(&self, state: TaskState) -> usize {
        self.tasks.iter().filter(|t| t.state == state).count()
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, BenchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the pretty-printed JSON to `path`.
    pub fn write_json(&self, path: &Path) -> Result<(), BenchError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Condensed per-task summary.
///
/// Statistics are `None` unless the task completed, so an errored task is
/// never shown with zeroed numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Task name.
    pub name: String,
    /// Task state.
    pub state: TaskState,
    /// Invocations per second.
    pub ops_per_sec: Option<f64>,
    /// Mean duration in nanoseconds.
    pub average_ns: Option<f64>,
    /// Relative margin of error, in percent.
    pub margin_pct: Option<f64>,
    /// Number of measured samples.
    pub samples: usize,
}

impl TableRow {
    /// Summarizes `task`.
    pub fn from_task(task: &Task) -> Self {
        let result = task.result();
        Self {
            name: task.name().to_string(),
            state: task.state(),
            ops_per_sec: result.map(|r| r.hz),
            average_ns: result.map(|r| r.mean * 1_000_000.0),
            margin_pct: result.map(|r| r.rme),
            samples: task.samples().len(),
        }
    }
}
