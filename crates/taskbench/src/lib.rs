//! Micro-benchmarking engine for Rust
//!
//! `taskbench` repeatedly runs a unit of work (a synchronous closure or a
//! future-returning one), times every invocation and reduces the samples to
//! a statistical summary: throughput, variance, a 95% confidence margin and
//! tail percentiles.
//!
//! # Quick Start
//!
//! ```
//! use taskbench::{Bench, BoxError};
//!
//! let mut bench = Bench::builder()
//!     .time(10.0)        // run each task for at least 10 ms
//!     .iterations(20)    // and at least 20 times
//!     .build()?;
//!
//! bench
//!     .add("sum 1..1000", || {
//!         std::hint::black_box((1..1_000u64).sum::<u64>());
//!         Ok::<(), BoxError>(())
//!     })
//!     .add("product 1..20", || {
//!         std::hint::black_box((1..20u64).product::<u64>());
//!         Ok::<(), BoxError>(())
//!     });
//!
//! futures::executor::block_on(bench.run());
//!
//! for row in bench.table() {
//!     println!("{}: {:?} ops/sec", row.name, row.ops_per_sec);
//! }
//! # Ok::<(), taskbench::BenchError>(())
//! ```
//!
//! # Architecture
//!
//! - **Clock**: millisecond time source, injectable ([`Clock`], [`ManualClock`])
//! - **Statistics**: pure reduction of samples into a [`TaskResult`] ([`stats`])
//! - **Task**: one function, its warmup/measurement loop and state machine ([`Task`])
//! - **Bench**: ordered tasks, shared [`Options`], sequential orchestration ([`Bench`])
//! - **Events**: per-entity publish/subscribe for lifecycle signals ([`Emitter`])
//!
//! Everything runs on one logical thread. Async task functions and hooks
//! are awaited inside the loop; nothing runs in parallel. Cancellation is
//! cooperative through an [`AbortSignal`] checked between invocations.

pub mod bench;
pub mod clock;
pub mod events;
pub mod options;
pub mod report;
pub mod signal;
pub mod stats;
pub mod task;
pub mod types;

pub use bench::{Bench, BenchBuilder};
pub use clock::{Clock, ManualClock};
pub use events::{Emitter, Event, EventKind, ListenerId};
pub use options::{Hook, Options};
pub use report::{BenchReport, TableRow, TaskReport};
pub use signal::AbortSignal;
pub use stats::{TaskResult, compute_result};
pub use task::{Task, TaskFn};
pub use types::{BenchError, BoxError, HookKind, Phase, TaskError, TaskState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
