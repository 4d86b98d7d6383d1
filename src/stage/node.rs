// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The staging tree: per-property nodes, their state machine, and the commit protocol.
use crate::arena::{Arena, Idx};
use crate::error::{CommitOp, StageError};
use crate::{Descriptor, Key, Object, StageRandomState, Value, create_map};
use smallvec::SmallVec;
use std::{collections::HashMap, fmt};
use tracing::{debug, trace, warn};

pub(crate) type NodeId = Idx<Node>;

/// State of a staged property relative to the principal it will be committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PropertyState {
    /// The buffered value mirrors the principal.
    Retained,
    /// The property does not exist on the principal yet.
    New,
    /// The property exists on the principal, but the buffered value may differ.
    Dirty,
    /// The property will be removed from the principal.
    Deleted,
}

impl PropertyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyState::Retained => "RETAINED",
            PropertyState::New => "NEW",
            PropertyState::Dirty => "DIRTY",
            PropertyState::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Child nodes keyed by property, iterated in creation order.
struct Children {
    index: HashMap<Key, NodeId, StageRandomState>,
    order: SmallVec<[Key; 8]>,
}

impl Children {
    fn new() -> Self {
        Self {
            index: create_map(),
            order: SmallVec::new(),
        }
    }

    fn get(&self, key: &Key) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Registers `id` under `key`, returning the node it replaces. A replacement keeps the
    /// position of the node it replaces.
    fn insert(&mut self, key: Key, id: NodeId) -> Option<NodeId> {
        let previous = self.index.insert(key.clone(), id);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    fn remove(&mut self, key: &Key) -> Option<NodeId> {
        let id = self.index.remove(key)?;
        self.order.retain(|k| k != key);
        Some(id)
    }

    fn entries(&self) -> Vec<(Key, NodeId)> {
        self.order
            .iter()
            .map(|key| (key.clone(), self.index[key]))
            .collect()
    }

    fn take_ids(&mut self) -> Vec<NodeId> {
        let ids = self.index.values().copied().collect();
        self.index.clear();
        self.order.clear();
        ids
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Buffered state for one property (or the root object).
pub(crate) struct Node {
    principal: Value,
    parent: Option<NodeId>,
    key: Option<Key>,
    state: PropertyState,
    children: Children,
    descriptor: Descriptor,
    // set by mutations at or below this node, cleared by commit
    changed: bool,
}

impl Node {
    fn root(object: Object) -> Self {
        Self {
            principal: Value::Object(object),
            parent: None,
            key: None,
            state: PropertyState::Retained,
            children: Children::new(),
            descriptor: Descriptor::DATA,
            changed: false,
        }
    }

    fn child(
        parent: NodeId,
        key: Key,
        principal: Value,
        state: PropertyState,
        descriptor: Descriptor,
    ) -> Self {
        Self {
            principal,
            parent: Some(parent),
            key: Some(key),
            state,
            children: Children::new(),
            descriptor,
            changed: false,
        }
    }

    pub(crate) fn principal(&self) -> &Value {
        &self.principal
    }

    pub(crate) fn state(&self) -> PropertyState {
        self.state
    }

    pub(crate) fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Pending work at or below this node.
    pub(crate) fn changed(&self) -> bool {
        self.changed || matches!(self.state, PropertyState::New | PropertyState::Dirty)
    }
}

/// The lazily materialized mirror of a principal object.
///
/// Nodes live in an arena and refer to each other by handle: children are owned through their
/// parent's `children` map, parents are referenced without ownership. Dropping the tree drops
/// every node at once.
pub(crate) struct Tree {
    nodes: Arena<Node>,
    root: NodeId,
}

impl Tree {
    pub fn new(object: Object) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::root(object));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[cfg(test)]
    pub fn live_nodes(&self) -> usize {
        self.nodes.live_count()
    }

    /// Looks up a node reachable from the tree.
    ///
    /// Handles stored in the tree itself (children, parents) are freed together with the
    /// references to them, so they always resolve.
    fn get(&self, id: NodeId) -> &Node {
        self.nodes.get(id).expect("tree handles are live")
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(id).expect("tree handles are live")
    }

    /// Returns the object held by `id`, if `id` is live and object-valued.
    pub fn object(&self, id: NodeId) -> Option<Object> {
        self.nodes.get(id)?.principal.as_object().cloned()
    }

    /// Checks that `id` is live and still holds `object`.
    pub fn is_attached(&self, id: NodeId, object: &Object) -> bool {
        self.nodes
            .get(id)
            .and_then(|node| node.principal.as_object())
            .is_some_and(|held| held.ptr_eq(object))
    }

    /// Returns the child for `key`, materializing it from the principal's own property if needed.
    ///
    /// Returns `None` without creating a node if the principal has no such own property.
    pub fn get_or_retain_child(&mut self, id: NodeId, key: &Key) -> Option<NodeId> {
        let node = self.nodes.get(id)?;
        if let Some(child) = node.children.get(key) {
            return Some(child);
        }
        let object = node.principal.as_object()?;
        let (value, descriptor) = object.get_own_property(key)?;

        trace!(%key, "materializing staged property");
        let child = self.nodes.alloc(Node::child(
            id,
            key.clone(),
            value,
            PropertyState::Retained,
            descriptor,
        ));
        self.get_mut(id).children.insert(key.clone(), child);
        Some(child)
    }

    /// Returns the child for `key` unless it is absent or pending deletion.
    pub fn get_present_child(&mut self, id: NodeId, key: &Key) -> Option<NodeId> {
        let child = self.get_or_retain_child(id, key)?;
        (self.get(child).state != PropertyState::Deleted).then_some(child)
    }

    /// Stages `value` at `key`, replacing any node previously staged there.
    pub fn set_child(&mut self, id: NodeId, key: Key, value: Value) -> Result<NodeId, StageError> {
        let object = self.object(id).ok_or(StageError::Attachment)?;
        // assignment keeps the attributes of an existing property
        let (state, descriptor) = match object.descriptor(&key) {
            Some(descriptor) => (PropertyState::Dirty, descriptor),
            None => (PropertyState::New, Descriptor::DATA),
        };

        let child = self
            .nodes
            .alloc(Node::child(id, key.clone(), value, state, descriptor));
        if let Some(previous) = self.get_mut(id).children.insert(key, child) {
            self.free_subtree(previous);
        }
        self.mark_changed(id);
        Ok(child)
    }

    /// Stages the removal of `key`.
    ///
    /// Returns `Ok(false)` if there is nothing to delete.
    pub fn delete_child(&mut self, id: NodeId, key: &Key) -> Result<bool, StageError> {
        let Some(child) = self.get_or_retain_child(id, key) else {
            return Ok(false);
        };
        let node = self.get(child);
        if node.state == PropertyState::Deleted {
            return Ok(false);
        }
        if !node.descriptor.configurable {
            return Err(StageError::ImmutableProperty { key: key.clone() });
        }

        let node = self.get_mut(child);
        let grandchildren = node.children.take_ids();
        node.principal = Value::Undefined;
        node.state = PropertyState::Deleted;
        node.changed = false;
        for grandchild in grandchildren {
            self.free_subtree(grandchild);
        }
        self.mark_changed(id);
        Ok(true)
    }

    /// Flushes the buffered changes at and below `id` into the principal.
    ///
    /// Children are processed in creation order, each child's own subtree before the child
    /// itself. The first rejected change aborts the remaining work at the node where it occurred;
    /// changes applied before it stay applied.
    pub fn commit(&mut self, id: NodeId) -> Result<(), StageError> {
        let object = self.object(id).ok_or(StageError::Usage)?;

        for (key, child) in self.get(id).children.entries() {
            let node = self.get(child);
            if node.changed && node.principal.is_object() {
                self.commit(child)?;
            }

            let node = self.get(child);
            let state = node.state;
            match state {
                PropertyState::Retained => {}
                PropertyState::Deleted => {
                    if let Err(source) = object.delete(&key) {
                        warn!(%key, %source, "principal rejected staged deletion");
                        return Err(StageError::Commit {
                            key,
                            op: CommitOp::Delete,
                            source,
                        });
                    }
                    debug!(%key, "committed deletion");
                    self.get_mut(id).children.remove(&key);
                    self.nodes.free(child);
                }
                PropertyState::New | PropertyState::Dirty => {
                    if let Err(source) = object.set(&key, node.principal.clone()) {
                        warn!(%key, %source, "principal rejected staged value");
                        return Err(StageError::Commit {
                            key,
                            op: CommitOp::Set,
                            source,
                        });
                    }
                    debug!(%key, %state, "committed value");
                    let descriptor = object.descriptor(&key).unwrap_or(Descriptor::DATA);
                    let node = self.get_mut(child);
                    node.state = PropertyState::Retained;
                    node.descriptor = descriptor;
                }
            }
        }

        self.get_mut(id).changed = false;
        Ok(())
    }

    /// Compares the buffered value of `id` against the live value in its parent's principal.
    ///
    /// Always true for the root.
    pub fn test_principal_equal(&self, id: NodeId) -> bool {
        let node = self.get(id);
        let (Some(parent), Some(key)) = (node.parent, node.key.as_ref()) else {
            return true;
        };
        let live = self
            .get(parent)
            .principal
            .as_object()
            .and_then(|object| object.get(key))
            .unwrap_or_default();
        live.same_value(&node.principal)
    }

    /// Own keys as seen through the staging layer: the principal's keys minus pending
    /// deletions, followed by newly staged keys in the order they were staged.
    pub fn own_keys(&self, id: NodeId) -> Vec<Key> {
        let node = self.get(id);
        let Some(object) = node.principal.as_object() else {
            return Vec::new();
        };

        let mut keys: Vec<Key> = object
            .own_keys()
            .into_iter()
            .filter(|key| {
                node.children
                    .get(key)
                    .is_none_or(|child| self.get(child).state != PropertyState::Deleted)
            })
            .collect();
        for (key, child) in node.children.entries() {
            if self.get(child).state == PropertyState::New && !object.has_own(&key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn has(&self, id: NodeId, key: &Key) -> bool {
        let node = self.get(id);
        match node.children.get(key) {
            Some(child) => self.get(child).state != PropertyState::Deleted,
            None => node
                .principal
                .as_object()
                .is_some_and(|object| object.has_own(key)),
        }
    }

    pub fn descriptor(&self, id: NodeId, key: &Key) -> Option<Descriptor> {
        let node = self.get(id);
        if let Some(child) = node.children.get(key).map(|child| self.get(child)) {
            if child.state != PropertyState::Deleted {
                return Some(child.descriptor);
            }
        }
        node.principal.as_object()?.descriptor(key)
    }

    fn mark_changed(&mut self, id: NodeId) {
        let mut next = Some(id);
        while let Some(id) = next {
            let node = self.get_mut(id);
            node.changed = true;
            next = node.parent;
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(mut node) = self.nodes.free(id) {
                debug_assert!(node.state != PropertyState::Deleted || node.children.is_empty());
                stack.extend(node.children.take_ids());
            }
        }
    }
}
