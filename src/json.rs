// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! JSON representation
//!
//! Objects and staged views render to [`serde_json::Value`] following the usual JSON
//! conventions for dynamic objects:
//!
//! - only enumerable string keys are rendered, in enumeration order,
//! - `undefined` and symbol values are skipped in objects and rendered as `null` in arrays,
//! - non-finite numbers are rendered as `null`,
//! - array objects render as JSON arrays indexed by their numeric keys; other keys of an
//!   array object, including integers of `2^32 - 1` and above, are not rendered.
//!
//! A staged view renders what the principal will look like after commit:
//!
//! ```
//! use staged::{Staged, object};
//! use serde_json::json;
//!
//! let principal = object! { "a" => "A", "o" => { "n" => 42 } };
//! let root = Staged::new(&principal).unwrap();
//! root.set("a", "AA").unwrap();
//!
//! assert_eq!(root.to_json().unwrap(), json!({ "a": "AA", "o": { "n": 42 } }));
//! assert_eq!(principal.to_json().unwrap(), json!({ "a": "A", "o": { "n": 42 } }));
//! ```
use crate::{Key, Object, StageError, Staged, StagedValue, Value};
use std::fmt;

/// Error returned when rendering to JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToJsonError {
    /// The structure refers to itself.
    Cyclic,
    /// An array object is too sparse to render: filling its holes with `null` would exceed
    /// the limit of holes per array.
    SparseArray {
        /// The length the rendered array would have.
        len: usize,
    },
    /// Reading through a staged view failed.
    Stage(StageError),
}

/// Maximum number of `null` holes rendered for a single array object.
pub const MAX_ARRAY_HOLES: usize = 1 << 20;

impl fmt::Display for ToJsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToJsonError::Cyclic => write!(f, "cannot render a cyclic structure to JSON"),
            ToJsonError::SparseArray { len } => {
                write!(f, "cannot render a sparse array of length {len} to JSON")
            }
            ToJsonError::Stage(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ToJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToJsonError::Cyclic | ToJsonError::SparseArray { .. } => None,
            ToJsonError::Stage(err) => Some(err),
        }
    }
}

impl From<StageError> for ToJsonError {
    fn from(err: StageError) -> Self {
        ToJsonError::Stage(err)
    }
}

enum Entry<N> {
    Nested(N),
    Value(Value),
}

/// Something that renders like an object.
trait Render: Sized {
    fn object(&self) -> &Object;

    /// Enumerable string-keyed entries, in enumeration order.
    fn entries(&self) -> Result<Vec<(Key, Entry<Self>)>, ToJsonError>;
}

impl Render for Object {
    fn object(&self) -> &Object {
        self
    }

    fn entries(&self) -> Result<Vec<(Key, Entry<Self>)>, ToJsonError> {
        Ok(self
            .own_keys()
            .into_iter()
            .filter_map(|key| {
                let (value, descriptor) = self.get_own_property(&key)?;
                if key.is_symbol() || !descriptor.enumerable {
                    return None;
                }
                let entry = match value {
                    Value::Object(object) => Entry::Nested(object),
                    value => Entry::Value(value),
                };
                Some((key, entry))
            })
            .collect())
    }
}

impl Render for Staged {
    fn object(&self) -> &Object {
        Staged::object(self)
    }

    fn entries(&self) -> Result<Vec<(Key, Entry<Self>)>, ToJsonError> {
        let mut entries = Vec::new();
        for key in self.keys()? {
            if key.is_symbol() || !self.descriptor(&key)?.is_some_and(|d| d.enumerable) {
                continue;
            }
            let entry = match self.get(&key)? {
                Some(StagedValue::Object(staged)) => Entry::Nested(staged),
                Some(StagedValue::Value(value)) => Entry::Value(value),
                None => continue,
            };
            entries.push((key, entry));
        }
        Ok(entries)
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if !n.is_finite() {
        serde_json::Value::Null
    } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        // -0 renders as 0
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Renders a primitive; `None` for values JSON cannot represent.
fn primitive_to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Undefined | Value::Symbol(_) | Value::Object(_) => None,
        Value::Null => Some(serde_json::Value::Null),
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Number(n) => Some(number_to_json(*n)),
        Value::String(s) => Some(serde_json::Value::String(s.to_string())),
    }
}

fn render<N: Render>(node: &N, path: &mut Vec<Object>) -> Result<serde_json::Value, ToJsonError> {
    let object = node.object().clone();
    if path.iter().any(|seen| seen.ptr_eq(&object)) {
        return Err(ToJsonError::Cyclic);
    }
    path.push(object.clone());

    let mut rendered = Vec::new();
    for (key, entry) in node.entries()? {
        let value = match entry {
            Entry::Nested(nested) => Some(render(&nested, path)?),
            Entry::Value(value) => primitive_to_json(&value),
        };
        rendered.push((key, value));
    }
    path.pop();

    if object.is_array() {
        let len = rendered
            .iter()
            .filter_map(|(key, _)| key.as_index())
            .max()
            .map_or(Some(0), |max| max.checked_add(1))
            .ok_or(ToJsonError::SparseArray { len: usize::MAX })?;
        let slots = rendered
            .iter()
            .filter(|(key, _)| key.as_index().is_some())
            .count();
        if len - slots > MAX_ARRAY_HOLES {
            return Err(ToJsonError::SparseArray { len });
        }
        let mut array = vec![serde_json::Value::Null; len];
        for (key, value) in rendered {
            if let (Some(index), Some(value)) = (key.as_index(), value) {
                array[index] = value;
            }
        }
        Ok(serde_json::Value::Array(array))
    } else {
        let map = rendered
            .into_iter()
            .filter_map(|(key, value)| Some((key.to_string(), value?)))
            .collect();
        Ok(serde_json::Value::Object(map))
    }
}

impl Object {
    /// Renders the live state of this object.
    pub fn to_json(&self) -> Result<serde_json::Value, ToJsonError> {
        render(self, &mut Vec::new())
    }
}

impl Staged {
    /// Renders this view including all staged changes.
    pub fn to_json(&self) -> Result<serde_json::Value, ToJsonError> {
        render(self, &mut Vec::new())
    }
}

impl Value {
    /// Renders this value; `None` for `undefined` and symbols.
    pub fn to_json(&self) -> Result<Option<serde_json::Value>, ToJsonError> {
        match self {
            Value::Object(object) => object.to_json().map(Some),
            primitive => Ok(primitive_to_json(primitive)),
        }
    }
}

/// Builds a fresh object tree from JSON. Arrays become array objects.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Object(Object::from_values(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(map) => {
                let object = Object::new();
                for (key, value) in map {
                    object.insert(key, Value::from(value));
                }
                Value::Object(object)
            }
        }
    }
}
