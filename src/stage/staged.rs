// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::node::{NodeId, PropertyState, Tree};
use crate::error::StageError;
use crate::{Descriptor, Key, Object, Value};
use std::{cell::RefCell, fmt, rc::Rc};

/// A staged view of an object.
///
/// Reads pass through to the principal; writes and deletions are buffered until
/// [`commit`](Staged::commit) is called. Reading an object-valued property returns another
/// `Staged` view over the same staging tree, so nested mutations are staged too.
///
/// `Staged` is a cheap handle: clones refer to the same node of the same staging tree. The tree
/// lives as long as any handle into it.
///
/// # Example
///
/// ```
/// use staged::{PropertyState, Staged, Value, object};
///
/// let principal = object! { "a" => "A", "o" => { "n" => 42 } };
/// let root = Staged::new(&principal).unwrap();
///
/// root.set("a", "AA").unwrap();
/// let o = root.get("o").unwrap().unwrap().into_staged().unwrap();
/// o.set("z", true).unwrap();
///
/// // the principal is untouched until commit
/// assert_eq!(principal.get("a"), Some(Value::from("A")));
/// assert_eq!(root.property_state("a").unwrap(), Some(PropertyState::Dirty));
///
/// root.commit().unwrap();
/// assert_eq!(principal.get("a"), Some(Value::from("AA")));
/// assert!(!root.changed().unwrap());
/// ```
#[derive(Clone)]
pub struct Staged {
    tree: Rc<RefCell<Tree>>,
    node: NodeId,
    // the object this view was created for
    object: Object,
}

/// A value read through a [`Staged`] view.
#[derive(Clone, Debug)]
pub enum StagedValue {
    /// An object-valued property, itself staged.
    Object(Staged),
    /// A primitive value.
    Value(Value),
}

impl StagedValue {
    /// Returns true if this is a staged view rather than a raw value.
    pub fn is_staged(&self) -> bool {
        matches!(self, StagedValue::Object(_))
    }

    pub fn as_staged(&self) -> Option<&Staged> {
        match self {
            StagedValue::Object(staged) => Some(staged),
            StagedValue::Value(_) => None,
        }
    }

    pub fn into_staged(self) -> Option<Staged> {
        match self {
            StagedValue::Object(staged) => Some(staged),
            StagedValue::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            StagedValue::Object(_) => None,
            StagedValue::Value(value) => Some(value),
        }
    }

    /// Returns the buffered value: the object behind a staged view, or the primitive itself.
    pub fn to_value(&self) -> Value {
        match self {
            StagedValue::Object(staged) => Value::Object(staged.object.clone()),
            StagedValue::Value(value) => value.clone(),
        }
    }
}

impl PartialEq<Value> for StagedValue {
    fn eq(&self, other: &Value) -> bool {
        self.to_value().same_value(other)
    }
}

impl Staged {
    /// Creates a staged view over `principal`.
    ///
    /// # Errors
    ///
    /// Fails with [`StageError::Construction`] if `principal` is not an object.
    pub fn new(principal: impl Into<Value>) -> Result<Self, StageError> {
        let object = match principal.into() {
            Value::Object(object) => object,
            other => {
                return Err(StageError::Construction {
                    type_name: other.type_name(),
                });
            }
        };
        let tree = Tree::new(object.clone());
        let node = tree.root();
        Ok(Self {
            tree: Rc::new(RefCell::new(tree)),
            node,
            object,
        })
    }

    /// Runs `f` against the tree, after checking this view is still attached to its node.
    fn with_tree<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> Result<R, StageError> {
        let mut tree = self.tree.borrow_mut();
        if !tree.is_attached(self.node, &self.object) {
            return Err(StageError::Attachment);
        }
        Ok(f(&mut tree))
    }

    fn wrap(&self, tree: &Tree, child: NodeId) -> StagedValue {
        match tree.node(child).map(|node| node.principal()) {
            Some(Value::Object(object)) => StagedValue::Object(Staged {
                tree: Rc::clone(&self.tree),
                node: child,
                object: object.clone(),
            }),
            Some(value) => StagedValue::Value(value.clone()),
            None => StagedValue::Value(Value::Undefined),
        }
    }

    /// Always true; marks this as a staging view rather than a raw value.
    pub fn is_staged(&self) -> bool {
        true
    }

    /// Returns the object this view was created for, without going through the staging layer.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Returns whether `self` and `other` are views of the same node.
    pub fn ptr_eq(&self, other: &Staged) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree) && self.node == other.node
    }

    /// The value currently buffered for this node.
    pub fn principal(&self) -> Result<Value, StageError> {
        self.with_tree(|tree| {
            tree.node(self.node)
                .map(|node| node.principal().clone())
                .unwrap_or_default()
        })
    }

    /// Whether this node or any node below it holds uncommitted changes.
    pub fn changed(&self) -> Result<bool, StageError> {
        self.with_tree(|tree| tree.node(self.node).is_some_and(|node| node.changed()))
    }

    /// Writes all changes staged at and below this node into the principal.
    ///
    /// Children are committed depth-first in the order they were first accessed. The commit is
    /// not atomic: if the principal rejects a change, the changes applied before it stay applied
    /// and the error is returned. Calling `commit` again retries the remaining work.
    ///
    /// # Errors
    ///
    /// Fails with [`StageError::Commit`] if the principal rejects a set or delete.
    pub fn commit(&self) -> Result<(), StageError> {
        self.with_tree(|tree| tree.commit(self.node))?
    }

    /// The state of this node relative to its parent, or `None` for the root.
    pub fn own_state(&self) -> Result<Option<PropertyState>, StageError> {
        self.with_tree(|tree| {
            tree.node(self.node)
                .filter(|node| !node.is_root())
                .map(|node| node.state())
        })
    }

    /// The state of the property `key`, or `None` if it does not exist and was never staged.
    ///
    /// Materializes the property if it was not accessed yet.
    pub fn property_state(&self, key: impl Into<Key>) -> Result<Option<PropertyState>, StageError> {
        let key = key.into();
        self.with_tree(|tree| {
            let child = tree.get_or_retain_child(self.node, &key)?;
            tree.node(child).map(|node| node.state())
        })
    }

    /// Whether this node's buffered value is identical to the live value in its parent's
    /// principal. Always true for the root.
    ///
    /// This detects changes made to the principal behind the staging layer's back, which
    /// [`changed`](Staged::changed) does not track.
    pub fn test_principal_equal(&self) -> Result<bool, StageError> {
        self.with_tree(|tree| tree.test_principal_equal(self.node))
    }

    /// Like [`test_principal_equal`](Staged::test_principal_equal), for the property `key`.
    ///
    /// Returns `None` if the property does not exist and was never staged.
    pub fn test_principal_equal_at(&self, key: impl Into<Key>) -> Result<Option<bool>, StageError> {
        let key = key.into();
        self.with_tree(|tree| {
            let child = tree.get_or_retain_child(self.node, &key)?;
            Some(tree.test_principal_equal(child))
        })
    }

    /// Reads the property `key`.
    ///
    /// Returns `None` if the property is absent or staged for deletion. Object values are
    /// returned as staged views.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<StagedValue>, StageError> {
        let key = key.into();
        self.with_tree(|tree| {
            let child = tree.get_present_child(self.node, &key)?;
            Some(self.wrap(tree, child))
        })
    }

    /// Stages `value` at `key`.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), StageError> {
        let key = key.into();
        let value = value.into();
        self.with_tree(|tree| tree.set_child(self.node, key, value).map(|_| ()))?
    }

    /// Stages the removal of `key`.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Fails with [`StageError::ImmutableProperty`] if the property is not configurable.
    pub fn delete(&self, key: impl Into<Key>) -> Result<bool, StageError> {
        let key = key.into();
        self.with_tree(|tree| tree.delete_child(self.node, &key))?
    }

    /// Lists the own keys: the principal's keys without pending deletions, followed by newly
    /// staged keys in the order they were staged.
    pub fn keys(&self) -> Result<Vec<Key>, StageError> {
        self.with_tree(|tree| tree.own_keys(self.node))
    }

    /// Whether the property `key` exists, taking staged changes into account.
    pub fn has(&self, key: impl Into<Key>) -> Result<bool, StageError> {
        let key = key.into();
        self.with_tree(|tree| tree.has(self.node, &key))
    }

    /// The descriptor of the property `key`, taking staged changes into account.
    pub fn descriptor(&self, key: impl Into<Key>) -> Result<Option<Descriptor>, StageError> {
        let key = key.into();
        self.with_tree(|tree| tree.descriptor(self.node, &key))
    }

    /// Reads every own property, in [`keys`](Staged::keys) order.
    pub fn entries(&self) -> Result<Vec<(Key, StagedValue)>, StageError> {
        self.with_tree(|tree| {
            tree.own_keys(self.node)
                .into_iter()
                .filter_map(|key| {
                    let child = tree.get_present_child(self.node, &key)?;
                    Some((key, self.wrap(tree, child)))
                })
                .collect()
        })
    }

    pub fn len(&self) -> Result<usize, StageError> {
        self.keys().map(|keys| keys.len())
    }

    pub fn is_empty(&self) -> Result<bool, StageError> {
        self.len().map(|len| len == 0)
    }
}

impl fmt::Debug for Staged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Staged")
            .field("node", &self.node)
            .field("object", &self.object)
            .finish()
    }
}
