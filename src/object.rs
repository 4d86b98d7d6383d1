// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The live object model staged views operate on.
//!
//! An [`Object`] is a shared, mutable property table. Handles are cheap to clone and all clones
//! refer to the same table, so a mutation made through one handle is visible through every other.
//! This is what makes an object a suitable *principal* for a [`Staged`](crate::Staged) view: the
//! view buffers changes and writes them back to the very same table on commit, while anyone else
//! holding a handle keeps observing the live state.
//!
//! Every property carries a [`Descriptor`] that constrains how it may be changed. Objects can
//! also be made non-extensible, which rejects the addition of new keys.
use crate::{Key, StageRandomState, Value, create_map};
use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

/// Shape of a property, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct Descriptor {
    /// Whether the property may be deleted.
    pub configurable: bool,
    /// Whether the property shows up in serialized output.
    pub enumerable: bool,
    /// Whether the property value may be replaced.
    pub writable: bool,
}

impl Descriptor {
    /// The descriptor of a plain assigned property.
    pub const DATA: Descriptor = Descriptor {
        configurable: true,
        enumerable: true,
        writable: true,
    };

    /// The descriptor of a property on a frozen object.
    pub const FROZEN: Descriptor = Descriptor {
        configurable: false,
        enumerable: true,
        writable: false,
    };

    pub const fn new(configurable: bool, enumerable: bool, writable: bool) -> Self {
        Self {
            configurable,
            enumerable,
            writable,
        }
    }
}

/// Error returned when an object rejects a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The property exists but is not writable.
    NotWritable(Key),
    /// The property does not exist and the object is not extensible.
    NotExtensible(Key),
    /// The property is not configurable and thus cannot be deleted.
    NotConfigurable(Key),
}

impl PropertyError {
    pub fn key(&self) -> &Key {
        match self {
            PropertyError::NotWritable(key)
            | PropertyError::NotExtensible(key)
            | PropertyError::NotConfigurable(key) => key,
        }
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::NotWritable(key) => {
                write!(f, "cannot assign to read only property '{key}'")
            }
            PropertyError::NotExtensible(key) => {
                write!(f, "cannot add property '{key}', object is not extensible")
            }
            PropertyError::NotConfigurable(key) => {
                write!(f, "cannot delete non-configurable property '{key}'")
            }
        }
    }
}

impl std::error::Error for PropertyError {}

#[derive(Clone)]
struct Property {
    value: Value,
    descriptor: Descriptor,
}

struct ObjectData {
    properties: HashMap<Key, Property, StageRandomState>,
    // insertion order across string and symbol keys
    order: Vec<Key>,
    extensible: bool,
    array: bool,
}

impl ObjectData {
    fn new(array: bool) -> Self {
        Self {
            properties: create_map(),
            order: Vec::new(),
            extensible: true,
            array,
        }
    }

    fn define(&mut self, key: Key, value: Value, descriptor: Descriptor) {
        if self
            .properties
            .insert(key.clone(), Property { value, descriptor })
            .is_none()
        {
            self.order.push(key);
        }
    }
}

/// A shared handle to a mutable property table.
///
/// # Example
///
/// ```
/// use staged::{Object, Value};
///
/// let object = Object::new();
/// object.set("name", "Alice").unwrap();
///
/// let alias = object.clone();
/// alias.set("name", "Bob").unwrap();
/// assert_eq!(object.get("name"), Some(Value::from("Bob")));
/// ```
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    /// Creates an empty, extensible object.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(ObjectData::new(false))))
    }

    /// Creates an empty array object.
    ///
    /// Array objects are ordinary objects keyed by index strings; the flag only affects how they
    /// are rendered to JSON.
    pub fn array() -> Self {
        Self(Rc::new(RefCell::new(ObjectData::new(true))))
    }

    /// Creates an array object holding `values` at keys `"0"`, `"1"`, and so on.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let array = Self::array();
        for (index, value) in values.into_iter().enumerate() {
            array.insert(index, value);
        }
        array
    }

    pub fn is_array(&self) -> bool {
        self.0.borrow().array
    }

    /// Returns whether `self` and `other` are handles to the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the value of the own property `key`, if any.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        self.0.borrow().properties.get(&key).map(|p| p.value.clone())
    }

    /// Returns the value and descriptor of the own property `key`, if any.
    pub fn get_own_property(&self, key: impl Into<Key>) -> Option<(Value, Descriptor)> {
        let key = key.into();
        self.0
            .borrow()
            .properties
            .get(&key)
            .map(|p| (p.value.clone(), p.descriptor))
    }

    /// Assigns `value` to `key`.
    ///
    /// Existing properties keep their descriptor. New properties are created with
    /// [`Descriptor::DATA`].
    ///
    /// # Errors
    ///
    /// Fails if the existing property is not writable, or if the property is new and the object
    /// is not extensible.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), PropertyError> {
        let key = key.into();
        let mut data = self.0.borrow_mut();
        if let Some(property) = data.properties.get_mut(&key) {
            if !property.descriptor.writable {
                return Err(PropertyError::NotWritable(key));
            }
            property.value = value.into();
            return Ok(());
        }
        if !data.extensible {
            return Err(PropertyError::NotExtensible(key));
        }
        data.define(key, value.into(), Descriptor::DATA);
        Ok(())
    }

    /// Defines `key` with [`Descriptor::DATA`], bypassing writability and extensibility checks.
    pub fn insert(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.define(key, value, Descriptor::DATA);
    }

    /// Defines `key` with the given descriptor, bypassing writability and extensibility checks.
    ///
    /// Redefining an existing property keeps its position in the key order.
    pub fn define(&self, key: impl Into<Key>, value: impl Into<Value>, descriptor: Descriptor) {
        self.0
            .borrow_mut()
            .define(key.into(), value.into(), descriptor);
    }

    /// Removes the own property `key`. Removing an absent property succeeds.
    ///
    /// # Errors
    ///
    /// Fails if the property is not configurable.
    pub fn delete(&self, key: impl Into<Key>) -> Result<(), PropertyError> {
        let key = key.into();
        let mut data = self.0.borrow_mut();
        let Some(descriptor) = data.properties.get(&key).map(|p| p.descriptor) else {
            return Ok(());
        };
        if !descriptor.configurable {
            return Err(PropertyError::NotConfigurable(key));
        }
        data.properties.remove(&key);
        data.order.retain(|k| k != &key);
        Ok(())
    }

    pub fn has_own(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.0.borrow().properties.contains_key(&key)
    }

    pub fn descriptor(&self, key: impl Into<Key>) -> Option<Descriptor> {
        let key = key.into();
        self.0.borrow().properties.get(&key).map(|p| p.descriptor)
    }

    /// Returns the own keys: string keys in insertion order, then symbol keys in insertion order.
    pub fn own_keys(&self) -> Vec<Key> {
        let data = self.0.borrow();
        let strings = data.order.iter().filter(|k| !k.is_symbol());
        let symbols = data.order.iter().filter(|k| k.is_symbol());
        strings.chain(symbols).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects the addition of new properties from now on.
    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    /// Makes every property read-only and non-configurable, and the object non-extensible.
    ///
    /// Nested objects are not frozen.
    pub fn freeze(&self) {
        let mut data = self.0.borrow_mut();
        data.extensible = false;
        for property in data.properties.values_mut() {
            property.descriptor.configurable = false;
            property.descriptor.writable = false;
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    // Values are not printed since objects may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.is_array() { "Array" } else { "Object" };
        write!(f, "{name}@{:p}", Rc::as_ptr(&self.0))?;
        f.debug_list().entries(self.own_keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    #[test]
    fn set_then_get() {
        let object = Object::new();
        object.set("a", 1).unwrap();
        assert_eq!(object.get("a"), Some(Value::from(1)));
        assert_eq!(object.get("b"), None);
        assert!(object.has_own("a"));
        assert_eq!(object.descriptor("a"), Some(Descriptor::DATA));
    }

    #[test]
    fn own_keys_lists_strings_before_symbols() {
        let sym = Symbol::new("s");
        let object = Object::new();
        object.insert("b", 1);
        object.insert(&sym, 2);
        object.insert("a", 3);
        assert_eq!(
            object.own_keys(),
            vec![Key::from("b"), Key::from("a"), Key::from(&sym)]
        );
    }

    #[test]
    fn redefining_keeps_position() {
        let object = Object::new();
        object.insert("a", 1);
        object.insert("b", 2);
        object.insert("a", 3);
        assert_eq!(object.own_keys(), vec![Key::from("a"), Key::from("b")]);
        assert_eq!(object.get("a"), Some(Value::from(3)));
    }

    #[test]
    fn delete_respects_configurable() {
        let object = Object::new();
        object.define("fixed", 1, Descriptor::new(false, true, true));
        object.insert("loose", 2);

        assert_eq!(
            object.delete("fixed"),
            Err(PropertyError::NotConfigurable("fixed".into()))
        );
        assert_eq!(object.delete("loose"), Ok(()));
        assert_eq!(object.delete("absent"), Ok(()));
        assert_eq!(object.own_keys(), vec![Key::from("fixed")]);
    }

    #[test]
    fn set_respects_writable_and_extensible() {
        let object = Object::new();
        object.define("ro", 1, Descriptor::new(true, true, false));
        assert_eq!(
            object.set("ro", 2),
            Err(PropertyError::NotWritable("ro".into()))
        );

        object.prevent_extensions();
        assert!(!object.is_extensible());
        assert_eq!(
            object.set("new", 2),
            Err(PropertyError::NotExtensible("new".into()))
        );
    }

    #[test]
    fn set_keeps_existing_descriptor() {
        let object = Object::new();
        object.define("hidden", 1, Descriptor::new(true, false, true));
        object.set("hidden", 2).unwrap();
        assert_eq!(
            object.descriptor("hidden"),
            Some(Descriptor::new(true, false, true))
        );
    }

    #[test]
    fn freeze() {
        let object = Object::new();
        object.insert("a", 1);
        object.freeze();
        assert_eq!(object.descriptor("a"), Some(Descriptor::FROZEN));
        assert!(object.set("a", 2).is_err());
        assert!(object.delete("a").is_err());
        assert!(object.set("b", 2).is_err());
    }

    #[test]
    fn clones_share_state() {
        let object = Object::new();
        let alias = object.clone();
        alias.insert("a", 1);
        assert!(object.ptr_eq(&alias));
        assert_eq!(object.len(), 1);
    }

    #[test]
    fn arrays() {
        let array = Object::from_values(["x", "y"]);
        assert!(array.is_array());
        assert_eq!(array.own_keys(), vec![Key::from("0"), Key::from("1")]);
        assert_eq!(array.get(1usize), Some(Value::from("y")));
    }
}
