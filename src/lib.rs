// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # Staged: Buffered Views over Live Objects
//!
//! This crate provides a *staging layer* that sits between a consumer and a live, arbitrarily
//! nested mutable object (the *principal*). All reads pass through to the principal. All writes,
//! deletions, and existence checks are buffered in the staging layer instead, until an explicit
//! commit flushes the buffered changes down through every nested object that was touched.
//! Dropping the staging layer without committing leaves the principal untouched.
//!
//! A typical use is editing shared application state behind a form: the form edits a staged
//! view, the rest of the application keeps seeing the live state, and the edits land in one
//! commit once the user confirms.
//!
//! ## Core Concepts
//!
//! - [`Object`]: a shared, mutable property table. This is the principal. Every property has a
//!   [`Descriptor`] constraining how it may change.
//! - [`Staged`]: a view of an object through the staging layer. Reading an object-valued
//!   property through a view returns another view ([`StagedValue::Object`]), so nested mutations
//!   are staged as well.
//! - [`PropertyState`]: each property touched through a view is tracked as
//!   [`Retained`](PropertyState::Retained), [`New`](PropertyState::New),
//!   [`Dirty`](PropertyState::Dirty), or [`Deleted`](PropertyState::Deleted).
//!
//! ## Lazy Mirroring
//!
//! Staging copies nothing up front. A node of the mirror tree is created for a property only
//! when that property is first read or written. Probing absent properties creates no nodes at
//! all. The cost of a staged view is proportional to what was touched, not to the size of the
//! principal.
//!
//! ## Getting Started
//!
//! ```rust
//! use staged::{PropertyState, Staged, Value, object};
//!
//! let principal = object! {
//!     "a" => "A",
//!     "o" => { "n" => 42, "useless" => "void" },
//!     "toDelete" => 42
//! };
//!
//! let root = Staged::new(&principal).unwrap();
//! root.set("a", "AA").unwrap();
//! root.set("x", object! {}).unwrap();
//! root.delete("toDelete").unwrap();
//!
//! let o = root.get("o").unwrap().unwrap().into_staged().unwrap();
//! o.set("z", object! { "name" => "bing" }).unwrap();
//! o.delete("useless").unwrap();
//!
//! // Nothing reached the principal yet.
//! assert_eq!(principal.get("a"), Some(Value::from("A")));
//! assert!(principal.has_own("toDelete"));
//! assert_eq!(root.property_state("x").unwrap(), Some(PropertyState::New));
//!
//! root.commit().unwrap();
//!
//! assert_eq!(principal.get("a"), Some(Value::from("AA")));
//! assert!(!principal.has_own("toDelete"));
//! assert_eq!(root.property_state("a").unwrap(), Some(PropertyState::Retained));
//! ```
//!
//! See the [`stage`] module documentation for the commit protocol and its failure modes.
//!
//! ## Threading
//!
//! Objects and views are reference counted without synchronization and are therefore neither
//! `Send` nor `Sync`. All operations run to completion synchronously.
//!
//! ## Features
//!
//! - `json`: Enables conversion of objects and staged views to and from `serde_json::Value`.
//!   This feature is enabled by default.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

use ahash::RandomState;
use std::hash::BuildHasher;

mod arena;
mod error;
pub use error::{CommitOp, StageError};
mod key;
pub use key::{Key, Symbol};
#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
pub use json::{MAX_ARRAY_HOLES, ToJsonError};
/// Macros usable for tests and initialization
pub mod macros;
mod object;
pub use object::{Descriptor, Object, PropertyError};
pub mod stage;
pub use stage::{Control, ControlValue, PropertyState, Staged, StagedValue, UnknownControl};
mod value;
pub use value::Value;

#[cfg(all(test, feature = "json"))]
mod tests;

fn create_map<K, V>() -> std::collections::HashMap<K, V, StageRandomState> {
    std::collections::HashMap::with_hasher(StageRandomState::default())
}

/// This is a small wrapper around the ahash RandomState used by all internal hash maps.
///
/// Iteration order of these maps is never observable: objects and staging nodes keep their own
/// insertion order next to the map.
#[derive(Clone, Default)]
pub struct StageRandomState {
    inner: RandomState,
}

// We implement BuildHasher for StageRandomState, but all we do is delegate to
// the wrapped 'inner' RandomState.
impl BuildHasher for StageRandomState {
    type Hasher = <RandomState as BuildHasher>::Hasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        self.inner.build_hasher()
    }
}
