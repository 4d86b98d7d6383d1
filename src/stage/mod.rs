// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Staged views over live objects.
//!
//! A [`Staged`] view sits between a consumer and a live [`Object`](crate::Object) (the
//! *principal*). Reads pass through to the principal; writes and deletions are buffered until
//! [`Staged::commit`] flushes them, recursively, into every nested object that was touched.
//! Dropping the view without committing leaves the principal untouched.
//!
//! # Example
//!
//! ```
//! use staged::{PropertyState, Staged, Value, object};
//!
//! let principal = object! {
//!     "a" => "A",
//!     "o" => { "n" => 42, "useless" => "void" },
//!     "toDelete" => 42
//! };
//! let root = Staged::new(&principal).unwrap();
//!
//! root.set("a", "AA").unwrap();
//! root.delete("toDelete").unwrap();
//! let o = root.get("o").unwrap().unwrap().into_staged().unwrap();
//! o.delete("useless").unwrap();
//!
//! assert!(!root.has("toDelete").unwrap());
//! assert!(principal.has_own("toDelete"));
//! assert_eq!(root.property_state("toDelete").unwrap(), Some(PropertyState::Deleted));
//!
//! root.commit().unwrap();
//! assert!(!principal.has_own("toDelete"));
//! assert_eq!(root.property_state("toDelete").unwrap(), None);
//! ```
//!
//! # How Staging Works
//!
//! - **On creation**: only the root node exists. Nothing is copied.
//! - **On read**: the first access of a property materializes a node mirroring the principal's
//!   own property (state [`PropertyState::Retained`]). Absent properties create no node.
//! - **On write**: a fresh node replaces whatever was staged for the property. Its state is
//!   [`PropertyState::Dirty`] if the live principal has the property, otherwise
//!   [`PropertyState::New`]. An overwrite keeps the attributes of the live property, a new
//!   property is a plain data property. The node and all its ancestors are marked as changed.
//! - **On delete**: the node collapses to a tombstone ([`PropertyState::Deleted`]). The
//!   property disappears from [`Staged::keys`] and [`Staged::has`] right away.
//! - **On commit**: children are processed depth-first in the order they were first accessed;
//!   a nested object's own changes are flushed before the reference to it is written back.
//!
//! # Partial Commits
//!
//! Commit is not atomic. When the principal rejects a change (a read-only property, a frozen or
//! non-extensible object), the changes applied before the failure stay applied and a
//! [`StageError::Commit`](crate::StageError::Commit) is returned. Fix the obstruction and commit
//! again to apply the rest.
//!
//! # Detecting Outside Changes
//!
//! [`Staged::changed`] only tracks changes made through the staging layer. Use
//! [`Staged::test_principal_equal`] to detect changes made directly to the principal.

mod control;
mod node;
mod staged;

pub use control::{Control, ControlValue, UnknownControl};
pub use node::PropertyState;
pub use staged::{Staged, StagedValue};
