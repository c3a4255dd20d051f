//! Corral - an in-memory registry of string queues behind integer handles.
//!
//! Callers that cannot hold collection objects directly (for example,
//! across a foreign interface boundary) create a queue, receive an opaque
//! handle, and address every later operation to that handle. Invalid
//! handles and positions degrade gracefully instead of erroring; the
//! details land on an optional trace sink.
//!
//! # Quick Start
//!
//! ```
//! use std::cmp::Ordering;
//!
//! use corral::registry::Registry;
//!
//! let mut registry = Registry::new();
//!
//! // Create a queue and fill it
//! let h = registry.create();
//! registry.insert_at(h, 0, Some("world"));
//! registry.insert_at(h, 0, Some("hello"));
//! assert_eq!(registry.size(h), 2);
//! assert_eq!(registry.get_at(h, 1), Some("world"));
//!
//! // Queues order lexicographically, element by element
//! let empty = registry.create();
//! assert_eq!(registry.compare(h, empty), Ordering::Greater);
//!
//! // Deletion retires the handle for good
//! registry.delete(h);
//! assert_eq!(registry.size(h), 0);
//! assert_eq!(registry.get_at(h, 0), None);
//! ```

pub mod handle;
pub mod queue;
pub mod registry;
pub mod trace;
