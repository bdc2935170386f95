//! Bundled demo tasks used by `taskbench demo` and `taskbench list`.

use std::hint::black_box;
use std::time::Duration;
use taskbench::{Bench, BoxError};

const CHECKSUM_INPUT: [u8; 1024] = [1; 1024];
const SORT_LEN: usize = 10_000;
const SLEEP: Duration = Duration::from_millis(1);

/// Name and one-line description of a bundled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoTask {
    pub name: &'static str,
    pub description: &'static str,
}

/// Tasks registered by every demo run, in run order.
pub const DEMO_TASKS: &[DemoTask] = &[
    DemoTask {
        name: "fibonacci",
        description: "iterative fibonacci(30), 1000 times",
    },
    DemoTask {
        name: "checksum",
        description: "byte sum of a 1 KiB buffer, 10000 times",
    },
    DemoTask {
        name: "vector-sort",
        description: "unstable sort of 10000 pseudo-random u32 values",
    },
    DemoTask {
        name: "async-sleep",
        description: "awaits a 1 ms tokio sleep",
    },
];

/// Task added with `--include-failing`.
pub const FAILING_TASK: DemoTask = DemoTask {
    name: "failing",
    description: "returns an error on its first invocation",
};

/// Adds the demo tasks to `bench`.
///
/// `async-sleep` needs a tokio runtime to be driving the bench.
pub fn register(bench: &mut Bench, include_failing: bool) {
    let unsorted = pseudo_random(SORT_LEN, 0x2545_f491);

    bench
        .add(DEMO_TASKS[0].name, || {
            black_box(fibonacci_batch(30, 1000));
            Ok::<(), BoxError>(())
        })
        .add(DEMO_TASKS[1].name, || {
            let mut sum = 0u64;
            for _ in 0..10_000 {
                sum = sum.wrapping_add(checksum(black_box(&CHECKSUM_INPUT)));
            }
            black_box(sum);
            Ok::<(), BoxError>(())
        })
        .add(DEMO_TASKS[2].name, move || {
            let mut values = unsorted.clone();
            values.sort_unstable();
            black_box(values);
            Ok::<(), BoxError>(())
        })
        .add_async(DEMO_TASKS[3].name, || async {
            tokio::time::sleep(SLEEP).await;
            Ok::<(), BoxError>(())
        });

    if include_failing {
        bench.add(FAILING_TASK.name, || {
            Err::<(), BoxError>("demo task failed on purpose".into())
        });
    }
}

/// Compute fibonacci number iteratively.
pub fn fibonacci(n: u32) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => {
            let mut a = 0u64;
            let mut b = 1u64;
            for _ in 2..=n {
                let next = a.wrapping_add(b);
                a = b;
                b = next;
            }
            b
        }
    }
}

/// Repeats [`fibonacci`] so a single invocation is measurable.
pub fn fibonacci_batch(n: u32, iterations: u32) -> u64 {
    let mut result = 0u64;
    for _ in 0..iterations {
        result = result.wrapping_add(fibonacci(black_box(n)));
    }
    result
}

/// Compute checksum by summing all bytes.
pub fn checksum(bytes: &[u8]) -> u64 {
    bytes.iter().map(|&b| b as u64).sum()
}

/// Deterministic xorshift sequence.
fn pseudo_random(len: usize, seed: u32) -> Vec<u32> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        })
        .collect()
}
