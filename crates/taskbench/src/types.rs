//! Core types for taskbench.
//!
//! This module defines the types shared by the task loop and the bench:
//!
//! - [`BoxError`] - Error value produced by task functions and hooks
//! - [`TaskError`] - Why a task ended in the `errored` state
//! - [`BenchError`] - Errors returned by bench configuration and reporting APIs
//! - [`TaskState`] - The task state machine
//! - [`Phase`] / [`HookKind`] - Tags passed to hooks and carried in errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error value returned by task functions and hooks.
///
/// Anything implementing [`std::error::Error`] converts into it, as do
/// `String`, `&str` and `anyhow::Error`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Benchmark phase a hook or invocation belongs to.
///
/// # Example
///
/// ```
/// use taskbench::Phase;
///
/// assert_eq!(Phase::Warmup.as_str(), "warmup");
/// assert_eq!(Phase::Run.as_str(), "run");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Samples are discarded.
    Warmup,
    /// Samples are retained and reduced into a [`crate::TaskResult`].
    Run,
}

impl Phase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Warmup => "warmup",
            Phase::Run => "run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Runs before every invocation.
    Setup,
    /// Runs after every invocation.
    Teardown,
}

impl HookKind {
    /// Returns the string representation of the hook kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Setup => "setup",
            HookKind::Teardown => "teardown",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle state.
///
/// ```text
/// idle -> warming-up -> running -> completed | errored | aborted
/// ```
///
/// `completed`, `errored` and `aborted` are terminal. [`crate::Task::reset`]
/// returns any state to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Not started, or reset.
    Idle,
    /// Running the warmup phase.
    WarmingUp,
    /// Running the measurement phase.
    Running,
    /// Finished with a result.
    Completed,
    /// The task function or a hook failed.
    Errored,
    /// The abort signal was observed.
    Aborted,
}

impl TaskState {
    /// Returns `true` for `completed`, `errored` and `aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Errored | TaskState::Aborted
        )
    }

    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Idle => "idle",
            TaskState::WarmingUp => "warming-up",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Errored => "errored",
            TaskState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task ended in [`TaskState::Errored`].
///
/// Task errors never escape [`crate::Task::run`] or [`crate::Bench::run`];
/// they are stored on the task and reported through the `error` event.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task function returned an error or panicked.
    #[error("task function failed: {source}")]
    Function {
        /// The error returned by the function, or the panic message.
        #[source]
        source: BoxError,
    },

    /// A setup or teardown hook returned an error or panicked.
    #[error("{kind} hook failed during {phase} phase: {source}")]
    Hook {
        /// Which hook failed.
        kind: HookKind,
        /// The phase the hook ran in.
        phase: Phase,
        /// The error returned by the hook.
        #[source]
        source: BoxError,
    },
}

/// Errors returned by bench configuration and reporting APIs.
///
/// # Example
///
/// ```
/// use taskbench::{Bench, BenchError};
///
/// let err = Bench::builder().time(-1.0).build().unwrap_err();
/// assert!(matches!(err, BenchError::Config(_)));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The options are invalid (negative or non-finite durations).
    #[error("configuration error: {0}")]
    Config(String),

    /// Statistics were requested from a task that has no result.
    ///
    /// Only `completed` tasks have a [`crate::TaskResult`]; an errored
    /// task's statistics are unavailable rather than zero.
    #[error("task '{name}' has no result (state: {state})")]
    Unavailable {
        /// Name of the task.
        name: String,
        /// The state the task was in.
        state: TaskState,
    },

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing a report failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Idle.is_terminal());
        assert!(!TaskState::WarmingUp.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Errored.is_terminal());
        assert!(TaskState::Aborted.is_terminal());
    }

    #[test]
    fn test_state_serializes_kebab_case() {
        let json = serde_json::to_string(&TaskState::WarmingUp).unwrap();
        assert_eq!(json, "\"warming-up\"");
        assert_eq!(TaskState::WarmingUp.to_string(), "warming-up");
    }

    #[test]
    fn test_hook_error_message_names_kind_and_phase() {
        let err = TaskError::Hook {
            kind: HookKind::Teardown,
            phase: Phase::Warmup,
            source: "boom".into(),
        };
        assert_eq!(
            err.to_string(),
            "teardown hook failed during warmup phase: boom"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
