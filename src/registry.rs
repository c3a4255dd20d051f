//! The queue registry: every live queue, the handle allocator, and the
//! eight operations.
//!
//! Misuse is absorbed, not surfaced. An operation aimed at an unknown
//! handle or a bad position falls back to a benign result (a no-op, zero,
//! `None`, or treat-as-empty) and reports the detail on the trace channel,
//! so a caller cannot tell a retired handle from an empty queue through
//! return values alone. The one exception is handle exhaustion, which is
//! a fatal assert in the allocator.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::handle::Handle;
use crate::handle::HandleAlloc;
use crate::queue::StrQueue;
use crate::trace::Event;
use crate::trace::Fault;
use crate::trace::NoopTrace;
use crate::trace::Op;
use crate::trace::TraceSink;

/// How an `Ordering` is rendered in trace output.
fn ordering_name(ordering: Ordering) -> &'static str {
    return match ordering {
        Ordering::Less => "less",
        Ordering::Equal => "equal",
        Ordering::Greater => "greater",
    };
}

/// The registry owning all queues and the handle allocator.
///
/// Single-threaded by design: no internal synchronization. Embedders that
/// share a registry across threads must serialize access externally.
pub struct Registry {
    /// Live queues by handle. Every key was issued by `alloc`.
    queues: FxHashMap<Handle, StrQueue>,
    /// Issues fresh handles; never repeats one, even across deletions.
    alloc: HandleAlloc,
    /// Observational only. Swapping sinks never changes results.
    trace: Box<dyn TraceSink>,
}

impl Default for Registry {
    fn default() -> Self {
        return Self::new();
    }
}

impl Registry {
    /// Create an empty registry with tracing disabled.
    pub fn new() -> Registry {
        return Registry::with_trace(Box::new(NoopTrace));
    }

    /// Create an empty registry that reports to the given sink.
    pub fn with_trace(trace: Box<dyn TraceSink>) -> Registry {
        return Registry {
            queues: FxHashMap::default(),
            alloc: HandleAlloc::new(),
            trace,
        };
    }

    /// The number of live queues.
    #[inline]
    pub fn len(&self) -> usize {
        return self.queues.len();
    }

    /// Check if there are no live queues.
    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.queues.is_empty();
    }

    /// Create a new empty queue and return its handle.
    ///
    /// Handles count up from zero and are never reused. Panics if the
    /// handle space is exhausted.
    pub fn create(&mut self) -> Handle {
        let traced = self.trace.enabled();
        if traced {
            self.trace.record(Event::Call {
                op: Op::Create,
                args: String::new(),
            });
        }

        let handle = self.alloc.fresh();
        self.queues.insert(handle, StrQueue::new());

        if traced {
            self.trace.record(Event::Return {
                op: Op::Create,
                value: handle.to_string(),
            });
        }
        return handle;
    }

    /// Destroy the queue named by `handle`, retiring the handle for good.
    ///
    /// A no-op for unknown handles.
    pub fn delete(&mut self, handle: Handle) {
        let traced = self.trace.enabled();
        if traced {
            self.trace.record(Event::Call {
                op: Op::Delete,
                args: handle.to_string(),
            });
        }

        if self.queues.remove(&handle).is_none() {
            if traced {
                self.trace.record(Event::Fault {
                    op: Op::Delete,
                    fault: Fault::NoSuchQueue(handle),
                });
            }
            return;
        }

        if traced {
            self.trace.record(Event::Done { op: Op::Delete });
        }
    }

    /// The number of strings in the queue named by `handle`.
    ///
    /// An unknown handle counts as an empty queue: the answer is 0.
    pub fn size(&self, handle: Handle) -> usize {
        let traced = self.trace.enabled();
        if traced {
            self.trace.record(Event::Call {
                op: Op::Size,
                args: handle.to_string(),
            });
        }

        let Some(queue) = self.queues.get(&handle) else {
            if traced {
                self.trace.record(Event::Fault {
                    op: Op::Size,
                    fault: Fault::NoSuchQueue(handle),
                });
                self.trace.record(Event::Return {
                    op: Op::Size,
                    value: "0".to_string(),
                });
            }
            return 0;
        };

        if traced {
            self.trace.record(Event::Return {
                op: Op::Size,
                value: queue.len().to_string(),
            });
        }
        return queue.len();
    }

    /// Insert `value` into the queue at `position`.
    ///
    /// A position at or past the end is clamped to an append, so inserting
    /// at `size` is the idiomatic push-back and any position works on an
    /// empty queue. Rejected without mutation when the handle is unknown
    /// or `value` is `None`; both conditions are reported when both hold.
    pub fn insert_at(&mut self, handle: Handle, position: usize, value: Option<&str>) {
        let traced = self.trace.enabled();
        if traced {
            let args = match value {
                Some(value) => format!("{}, {}, \"{}\"", handle, position, value),
                None => format!("{}, {}, NULL", handle, position),
            };
            self.trace.record(Event::Call {
                op: Op::InsertAt,
                args,
            });
        }

        match (self.queues.get_mut(&handle), value) {
            (Some(queue), Some(value)) => {
                queue.insert(position, value);
                if traced {
                    self.trace.record(Event::Done { op: Op::InsertAt });
                }
            }
            (queue, value) => {
                if traced {
                    if queue.is_none() {
                        self.trace.record(Event::Fault {
                            op: Op::InsertAt,
                            fault: Fault::NoSuchQueue(handle),
                        });
                    }
                    if value.is_none() {
                        self.trace.record(Event::Fault {
                            op: Op::InsertAt,
                            fault: Fault::MissingValue,
                        });
                    }
                }
            }
        }
    }

    /// Remove the string at `position` in the queue named by `handle`,
    /// shifting later strings down by one.
    ///
    /// Rejected without mutation when the handle is unknown or the
    /// position is out of bounds. Unlike insertion, out-of-bounds
    /// positions are strict here.
    pub fn remove_at(&mut self, handle: Handle, position: usize) {
        let traced = self.trace.enabled();
        if traced {
            self.trace.record(Event::Call {
                op: Op::RemoveAt,
                args: format!("{}, {}", handle, position),
            });
        }

        let Some(queue) = self.queues.get_mut(&handle) else {
            if traced {
                self.trace.record(Event::Fault {
                    op: Op::RemoveAt,
                    fault: Fault::NoSuchQueue(handle),
                });
            }
            return;
        };

        if queue.remove(position).is_none() {
            if traced {
                self.trace.record(Event::Fault {
                    op: Op::RemoveAt,
                    fault: Fault::NoSuchPosition { handle, position },
                });
            }
            return;
        }

        if traced {
            self.trace.record(Event::Done { op: Op::RemoveAt });
        }
    }

    /// The string at `position` in the queue named by `handle`.
    ///
    /// `None` when the handle is unknown or the position is out of
    /// bounds. The borrow ends at the next mutation of the registry, so
    /// callers that need the value longer must copy it out.
    pub fn get_at(&self, handle: Handle, position: usize) -> Option<&str> {
        let traced = self.trace.enabled();
        if traced {
            self.trace.record(Event::Call {
                op: Op::GetAt,
                args: format!("{}, {}", handle, position),
            });
        }

        let Some(queue) = self.queues.get(&handle) else {
            if traced {
                self.trace.record(Event::Fault {
                    op: Op::GetAt,
                    fault: Fault::NoSuchQueue(handle),
                });
                self.trace.record(Event::Return {
                    op: Op::GetAt,
                    value: "NULL".to_string(),
                });
            }
            return None;
        };

        let Some(value) = queue.get(position) else {
            if traced {
                self.trace.record(Event::Fault {
                    op: Op::GetAt,
                    fault: Fault::NoSuchPosition { handle, position },
                });
                self.trace.record(Event::Return {
                    op: Op::GetAt,
                    value: "NULL".to_string(),
                });
            }
            return None;
        };

        if traced {
            self.trace.record(Event::Return {
                op: Op::GetAt,
                value: format!("\"{}\"", value),
            });
        }
        return Some(value);
    }

    /// Remove every string from the queue named by `handle`, keeping the
    /// handle live.
    ///
    /// A no-op for unknown handles.
    pub fn clear(&mut self, handle: Handle) {
        let traced = self.trace.enabled();
        if traced {
            self.trace.record(Event::Call {
                op: Op::Clear,
                args: handle.to_string(),
            });
        }

        let Some(queue) = self.queues.get_mut(&handle) else {
            if traced {
                self.trace.record(Event::Fault {
                    op: Op::Clear,
                    fault: Fault::NoSuchQueue(handle),
                });
            }
            return;
        };

        queue.clear();

        if traced {
            self.trace.record(Event::Done { op: Op::Clear });
        }
    }

    /// Lexicographic order between the queues named by `h1` and `h2`.
    ///
    /// Element-wise string comparison, with a queue that is a strict
    /// prefix of a longer one ordering as less. An unknown handle takes
    /// part as an empty queue, so the result is always defined; the
    /// substitution is still reported per handle on the trace channel.
    pub fn compare(&self, h1: Handle, h2: Handle) -> Ordering {
        let traced = self.trace.enabled();
        if traced {
            self.trace.record(Event::Call {
                op: Op::Compare,
                args: format!("{}, {}", h1, h2),
            });
        }

        let q1 = self.queues.get(&h1);
        let q2 = self.queues.get(&h2);

        if traced {
            if q1.is_none() {
                self.trace.record(Event::Fault {
                    op: Op::Compare,
                    fault: Fault::NoSuchQueue(h1),
                });
            }
            if q2.is_none() {
                self.trace.record(Event::Fault {
                    op: Op::Compare,
                    fault: Fault::NoSuchQueue(h2),
                });
            }
        }

        let a = q1.map(StrQueue::as_slice).unwrap_or_default();
        let b = q2.map(StrQueue::as_slice).unwrap_or_default();
        let ordering = a.cmp(b);

        if traced {
            self.trace.record(Event::Return {
                op: Op::Compare,
                value: ordering_name(ordering).to_string(),
            });
        }
        return ordering;
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(
            f,
            "Registry {{ queues: {}, next: {} }}",
            self.queues.len(),
            self.alloc.peek()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::RecordingTrace;

    fn traced_registry() -> (Registry, RecordingTrace) {
        let trace = RecordingTrace::new();
        let registry = Registry::with_trace(Box::new(trace.clone()));
        return (registry, trace);
    }

    #[test]
    fn create_emits_call_then_return() {
        let (mut registry, trace) = traced_registry();
        let handle = registry.create();
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::Create,
                    args: String::new(),
                },
                Event::Return {
                    op: Op::Create,
                    value: handle.to_string(),
                },
            ]
        );
    }

    #[test]
    fn delete_unknown_reports_no_such_queue() {
        let (mut registry, trace) = traced_registry();
        registry.delete(Handle(42));
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::Delete,
                    args: "42".to_string(),
                },
                Event::Fault {
                    op: Op::Delete,
                    fault: Fault::NoSuchQueue(Handle(42)),
                },
            ]
        );
    }

    #[test]
    fn delete_live_queue_emits_done() {
        let (mut registry, trace) = traced_registry();
        let handle = registry.create();
        trace.take();
        registry.delete(handle);
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::Delete,
                    args: handle.to_string(),
                },
                Event::Done { op: Op::Delete },
            ]
        );
    }

    #[test]
    fn size_of_unknown_reports_fault_and_returns_zero() {
        let (registry, trace) = traced_registry();
        assert_eq!(registry.size(Handle(7)), 0);
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::Size,
                    args: "7".to_string(),
                },
                Event::Fault {
                    op: Op::Size,
                    fault: Fault::NoSuchQueue(Handle(7)),
                },
                Event::Return {
                    op: Op::Size,
                    value: "0".to_string(),
                },
            ]
        );
    }

    #[test]
    fn insert_renders_value_in_call_args() {
        let (mut registry, trace) = traced_registry();
        let handle = registry.create();
        trace.take();
        registry.insert_at(handle, 0, Some("hello"));
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::InsertAt,
                    args: format!("{}, 0, \"hello\"", handle),
                },
                Event::Done { op: Op::InsertAt },
            ]
        );
    }

    #[test]
    fn insert_missing_value_reports_missing_value() {
        let (mut registry, trace) = traced_registry();
        let handle = registry.create();
        trace.take();
        registry.insert_at(handle, 0, None);
        assert_eq!(registry.size(handle), 0);
        assert_eq!(
            trace.take()[..2],
            vec![
                Event::Call {
                    op: Op::InsertAt,
                    args: format!("{}, 0, NULL", handle),
                },
                Event::Fault {
                    op: Op::InsertAt,
                    fault: Fault::MissingValue,
                },
            ]
        );
    }

    #[test]
    fn insert_unknown_handle_and_missing_value_reports_both() {
        let (mut registry, trace) = traced_registry();
        registry.insert_at(Handle(5), 0, None);
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::InsertAt,
                    args: "5, 0, NULL".to_string(),
                },
                Event::Fault {
                    op: Op::InsertAt,
                    fault: Fault::NoSuchQueue(Handle(5)),
                },
                Event::Fault {
                    op: Op::InsertAt,
                    fault: Fault::MissingValue,
                },
            ]
        );
    }

    #[test]
    fn remove_out_of_bounds_reports_position_fault() {
        let (mut registry, trace) = traced_registry();
        let handle = registry.create();
        registry.insert_at(handle, 0, Some("a"));
        trace.take();
        registry.remove_at(handle, 3);
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::RemoveAt,
                    args: format!("{}, 3", handle),
                },
                Event::Fault {
                    op: Op::RemoveAt,
                    fault: Fault::NoSuchPosition {
                        handle,
                        position: 3,
                    },
                },
            ]
        );
    }

    #[test]
    fn remove_on_unknown_handle_reports_queue_fault_only() {
        let (mut registry, trace) = traced_registry();
        registry.remove_at(Handle(9), 0);
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::RemoveAt,
                    args: "9, 0".to_string(),
                },
                Event::Fault {
                    op: Op::RemoveAt,
                    fault: Fault::NoSuchQueue(Handle(9)),
                },
            ]
        );
    }

    #[test]
    fn get_renders_hit_and_miss() {
        let (mut registry, trace) = traced_registry();
        let handle = registry.create();
        registry.insert_at(handle, 0, Some("x"));
        trace.take();

        assert_eq!(registry.get_at(handle, 0), Some("x"));
        assert_eq!(
            trace.take()[1],
            Event::Return {
                op: Op::GetAt,
                value: "\"x\"".to_string(),
            }
        );

        assert_eq!(registry.get_at(handle, 1), None);
        assert_eq!(
            trace.take()[1..],
            vec![
                Event::Fault {
                    op: Op::GetAt,
                    fault: Fault::NoSuchPosition {
                        handle,
                        position: 1,
                    },
                },
                Event::Return {
                    op: Op::GetAt,
                    value: "NULL".to_string(),
                },
            ]
        );
    }

    #[test]
    fn compare_reports_each_missing_handle_before_returning() {
        let (mut registry, trace) = traced_registry();
        let handle = registry.create();
        registry.insert_at(handle, 0, Some("a"));
        trace.take();

        assert_eq!(registry.compare(Handle(100), handle), Ordering::Less);
        assert_eq!(
            trace.take(),
            vec![
                Event::Call {
                    op: Op::Compare,
                    args: format!("100, {}", handle),
                },
                Event::Fault {
                    op: Op::Compare,
                    fault: Fault::NoSuchQueue(Handle(100)),
                },
                Event::Return {
                    op: Op::Compare,
                    value: "less".to_string(),
                },
            ]
        );
    }

    #[test]
    fn disabled_sink_records_nothing() {
        let mut registry = Registry::new();
        let handle = registry.create();
        registry.insert_at(handle, 0, Some("a"));
        registry.delete(Handle(1000));
        // Nothing to assert on the trace side: NoopTrace has no buffer.
        // The point is that the operations above all took the untraced
        // paths and still behaved.
        assert_eq!(registry.size(handle), 1);
    }

    #[test]
    fn debug_shows_queue_count_and_next_handle() {
        let mut registry = Registry::new();
        registry.create();
        registry.create();
        assert_eq!(format!("{:?}", registry), "Registry { queues: 2, next: 2 }");
    }
}
