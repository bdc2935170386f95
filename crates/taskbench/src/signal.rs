//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A one-shot abort flag shared between a bench and whoever may cancel it.
///
/// Clones observe the same flag. Once set it stays set. The run loop checks
/// it before every invocation and before every task; an invocation already
/// in flight is allowed to finish.
///
/// # Example
///
/// ```
/// use taskbench::AbortSignal;
///
/// let signal = AbortSignal::new();
/// let handle = signal.clone();
/// assert!(!signal.is_aborted());
///
/// std::thread::spawn(move || handle.abort()).join().unwrap();
/// assert!(signal.is_aborted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Creates a signal that has not been triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers the signal.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`abort`](Self::abort) has been called on any clone.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}
