//! Diagnostic tracing for registry operations.
//!
//! Every registry operation reports its call, its outcome, and any
//! recoverable fault it noticed to an injectable sink. The sink is purely
//! observational: swapping or disabling it never changes what an operation
//! returns or mutates. The default sink is disabled, and the registry
//! skips event construction entirely for disabled sinks, so tracing costs
//! one virtual call per operation when off.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::handle::Handle;

/// Names of the registry operations, as rendered in trace output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Create,
    Delete,
    Size,
    InsertAt,
    RemoveAt,
    GetAt,
    Clear,
    Compare,
}

impl Op {
    /// The operation's name in trace output.
    pub fn name(self) -> &'static str {
        return match self {
            Op::Create => "create",
            Op::Delete => "delete",
            Op::Size => "size",
            Op::InsertAt => "insert_at",
            Op::RemoveAt => "remove_at",
            Op::GetAt => "get_at",
            Op::Clear => "clear",
            Op::Compare => "compare",
        };
    }
}

/// A recoverable failure noticed while carrying out an operation.
///
/// Faults travel on the trace channel only. By the time one is reported,
/// the operation's functional result is already defined (a no-op, a zero,
/// an absence, or treat-as-empty), so callers never see these as errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Fault {
    /// The handle names no live queue.
    #[error("queue {0} does not exist")]
    NoSuchQueue(Handle),
    /// The position is at or past the end of the queue.
    #[error("queue {handle} does not contain string at position {position}")]
    NoSuchPosition { handle: Handle, position: usize },
    /// Insert was called without a value.
    #[error("missing value")]
    MissingValue,
}

/// One structured record emitted by the registry.
///
/// Each operation emits `Call` on entry and exactly one of `Return` or
/// `Done` on exit, with a `Fault` in between for every failure it noticed
/// along the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// An operation was invoked with the given rendered arguments.
    Call { op: Op, args: String },
    /// An operation produced a value.
    Return { op: Op, value: String },
    /// A void operation ran to completion.
    Done { op: Op },
    /// An operation noticed a recoverable fault.
    Fault { op: Op, fault: Fault },
}

/// Where trace events go.
pub trait TraceSink {
    /// Whether the registry should construct events at all.
    ///
    /// Rendering arguments allocates, so the registry checks this once per
    /// operation and skips every `record` call when it returns false.
    fn enabled(&self) -> bool {
        return true;
    }

    /// Receive one event.
    fn record(&self, event: Event);
}

/// The default sink: disabled, drops anything recorded anyway.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn enabled(&self) -> bool {
        return false;
    }

    fn record(&self, _event: Event) {}
}

/// A sink that forwards events to the `tracing` ecosystem.
///
/// Calls and results are emitted at DEBUG, faults at WARN.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&self, event: Event) {
        match event {
            Event::Call { op, args } => {
                tracing::debug!(op = op.name(), %args, "call");
            }
            Event::Return { op, value } => {
                tracing::debug!(op = op.name(), %value, "return");
            }
            Event::Done { op } => {
                tracing::debug!(op = op.name(), "done");
            }
            Event::Fault { op, fault } => {
                tracing::warn!(op = op.name(), %fault, "fault");
            }
        }
    }
}

/// A sink that buffers events in memory.
///
/// Clones share one buffer, so a caller can keep a clone for inspection
/// and hand the other to the registry.
#[derive(Clone, Debug, Default)]
pub struct RecordingTrace {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingTrace {
    /// Create a new empty recording sink.
    pub fn new() -> RecordingTrace {
        return RecordingTrace {
            events: Rc::new(RefCell::new(Vec::new())),
        };
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        return self.events.borrow().clone();
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Event> {
        return std::mem::take(&mut *self.events.borrow_mut());
    }
}

impl TraceSink for RecordingTrace {
    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}
