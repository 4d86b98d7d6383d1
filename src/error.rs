// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Errors raised by staged views.
use crate::{Key, PropertyError};
use std::{error, fmt};

/// The principal operation that failed during a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitOp {
    Set,
    Delete,
}

impl fmt::Display for CommitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitOp::Set => f.write_str("set"),
            CommitOp::Delete => f.write_str("delete"),
        }
    }
}

/// Error returned by operations on a [`Staged`](crate::Staged) view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A staged view was requested over a value that is not an object.
    Construction {
        /// [`Value::type_name`](crate::Value::type_name) of the rejected value.
        type_name: &'static str,
    },

    /// The view no longer belongs to a live node of its staging tree, or that node no longer
    /// holds the object the view was created for.
    ///
    /// This happens when the property a view was obtained from is overwritten, deleted and
    /// committed, or otherwise detached. It indicates a defect in the caller and should not be
    /// recovered from.
    Attachment,

    /// A delete was attempted on a property that is not configurable.
    ImmutableProperty { key: Key },

    /// The principal rejected a change while committing.
    ///
    /// Changes applied before the failure are not rolled back.
    Commit {
        key: Key,
        op: CommitOp,
        source: PropertyError,
    },

    /// Commit was invoked on a node that does not hold an object.
    Usage,
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Construction { type_name } => {
                write!(f, "cannot stage a value of type {type_name}, expected an object")
            }
            StageError::Attachment => {
                write!(f, "staged view is detached from its staging tree")
            }
            StageError::ImmutableProperty { key } => {
                write!(f, "cannot delete immutable property '{key}'")
            }
            StageError::Commit { key, op, source } => {
                write!(f, "failed to commit {op} of property '{key}': {source}")
            }
            StageError::Usage => write!(f, "cannot commit a node that does not hold an object"),
        }
    }
}

impl error::Error for StageError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            StageError::Commit { source, .. } => Some(source),
            _ => None,
        }
    }
}
