//! Lifecycle notifications.
//!
//! [`Emitter`] is a small per-entity publish/subscribe registry. [`Task`]
//! and [`crate::Bench`] each own one and forward `subscribe`/`unsubscribe`
//! to it. Handlers run synchronously, in subscription order, before the
//! emitting run loop takes its next step.

use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// The lifecycle signals a task or bench can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The abort signal was observed.
    Abort,
    /// A task finished with a result, or a bench finished running.
    Complete,
    /// A task function or hook failed.
    Error,
    /// State was cleared by `reset()`.
    Reset,
    /// The measurement phase (task) or the run (bench) began.
    Start,
    /// The warmup phase (task) or the run's warmup (bench) began.
    Warmup,
    /// A measured invocation finished (task), or a task finished (bench).
    Cycle,
    /// A task was added to a bench.
    Add,
    /// A task was removed from a bench.
    Remove,
}

/// A notification delivered to handlers.
#[derive(Clone, Copy)]
pub struct Event<'a> {
    /// Which signal fired.
    pub kind: EventKind,
    /// The task the signal concerns, if any.
    pub task: Option<&'a Task>,
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("task", &self.task.map(Task::name))
            .finish()
    }
}

/// Handle returned by [`Emitter::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Rc<dyn Fn(&Event<'_>)>;

struct Listener {
    id: ListenerId,
    kind: EventKind,
    handler: Handler,
}

/// Per-entity event registry.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use taskbench::{Emitter, Event, EventKind};
///
/// let mut emitter = Emitter::new();
/// let seen = Rc::new(Cell::new(0));
/// let counter = seen.clone();
/// let id = emitter.subscribe(EventKind::Start, move |_| counter.set(counter.get() + 1));
///
/// emitter.emit(&Event { kind: EventKind::Start, task: None });
/// emitter.emit(&Event { kind: EventKind::Complete, task: None });
/// assert_eq!(seen.get(), 1);
///
/// assert!(emitter.unsubscribe(EventKind::Start, id));
/// emitter.emit(&Event { kind: EventKind::Start, task: None });
/// assert_eq!(seen.get(), 1);
/// ```
#[derive(Default)]
pub struct Emitter {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl Emitter {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&Event<'_>) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            kind,
            handler: Rc::new(handler),
        });
        id
    }

    /// Removes the handler registered under `id` for `kind`.
    ///
    /// Returns `false` if no such handler exists.
    pub fn unsubscribe(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners
            .retain(|listener| !(listener.id == id && listener.kind == kind));
        self.listeners.len() != before
    }

    /// Calls every handler registered for `event.kind`, in subscription order.
    pub fn emit(&self, event: &Event<'_>) {
        for listener in self.listeners.iter().filter(|l| l.kind == event.kind) {
            (listener.handler)(event);
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|l| l.kind == kind).count()
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
