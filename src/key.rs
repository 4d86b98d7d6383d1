// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Property keys.
//!
//! A [`Key`] names a property of an [`Object`](crate::Object). Keys are either strings or
//! [`Symbol`]s. Symbols are unique tokens: two symbols are equal only if they are the same
//! symbol, regardless of their description.
use std::{
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// A unique, identity-compared property key.
///
/// Cloning a `Symbol` yields a handle to the same symbol.
#[derive(Clone)]
pub struct Symbol(Rc<SymbolInner>);

struct SymbolInner {
    description: Option<String>,
}

impl Symbol {
    /// Creates a fresh symbol, distinct from every other symbol.
    pub fn new(description: impl Into<String>) -> Self {
        Self(Rc::new(SymbolInner {
            description: Some(description.into()),
        }))
    }

    /// Creates a fresh symbol without a description.
    pub fn anonymous() -> Self {
        Self(Rc::new(SymbolInner { description: None }))
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(description) => write!(f, "Symbol({description})"),
            None => write!(f, "Symbol()"),
        }
    }
}

/// The name of a property.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key {
    String(Rc<str>),
    Symbol(Symbol),
}

impl Key {
    /// Returns the string form of this key, or `None` for symbols.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) => Some(s),
            Key::Symbol(_) => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Key::Symbol(_))
    }

    /// Interprets this key as an array index: a canonical non-negative integer string below
    /// `2^32 - 1`. Larger integers are ordinary property names.
    pub fn as_index(&self) -> Option<usize> {
        let s = self.as_str()?;
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match s.parse::<u32>() {
            Ok(index) if index != u32::MAX => usize::try_from(index).ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => write!(f, "{s:?}"),
            Key::Symbol(sym) => write!(f, "{sym}"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => f.write_str(s),
            Key::Symbol(sym) => write!(f, "{sym}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.into())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s.into())
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::String(s.as_str().into())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::String(index.to_string().into())
    }
}

impl From<Symbol> for Key {
    fn from(sym: Symbol) -> Self {
        Key::Symbol(sym)
    }
}

impl From<&Symbol> for Key {
    fn from(sym: &Symbol) -> Self {
        Key::Symbol(sym.clone())
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
