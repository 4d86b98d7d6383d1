// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Name-based access to the control operations of a [`Staged`] view.
//!
//! Bindings that route operations by name (for example a UI layer forwarding property lookups)
//! use these names to reach the control operations. The names are part of the public contract.
use super::{PropertyState, Staged};
use crate::error::StageError;
use crate::{Key, Value};
use std::{fmt, str::FromStr};

/// A control operation of a staged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Control {
    IsStaged,
    Principal,
    Commit,
    Changed,
    PropertyState,
    TestPrincipalEqual,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::IsStaged,
        Control::Principal,
        Control::Commit,
        Control::Changed,
        Control::PropertyState,
        Control::TestPrincipalEqual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Control::IsStaged => "isStaged",
            Control::Principal => "principal",
            Control::Commit => "commit",
            Control::Changed => "changed",
            Control::PropertyState => "propertyState",
            Control::TestPrincipalEqual => "testPrincipalEqual",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown control name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownControl(pub String);

impl fmt::Display for UnknownControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown control operation {:?}", self.0)
    }
}

impl std::error::Error for UnknownControl {}

impl FromStr for Control {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Control::ALL
            .into_iter()
            .find(|control| control.as_str() == s)
            .ok_or_else(|| UnknownControl(s.to_string()))
    }
}

/// The result of a control operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
    /// Result of [`Control::IsStaged`] and [`Control::Changed`].
    Flag(bool),
    /// Result of [`Control::Principal`].
    Principal(Value),
    /// Result of [`Control::Commit`].
    Committed,
    /// Result of [`Control::PropertyState`]; `None` for the root or an absent property.
    State(Option<PropertyState>),
    /// Result of [`Control::TestPrincipalEqual`]; `None` for an absent property.
    Equal(Option<bool>),
}

impl Staged {
    /// Runs the control operation `control`.
    ///
    /// `name` selects a property for [`Control::PropertyState`] and
    /// [`Control::TestPrincipalEqual`]; without it they apply to this node. It is ignored by the
    /// other operations.
    pub fn control(
        &self,
        control: Control,
        name: Option<&Key>,
    ) -> Result<ControlValue, StageError> {
        Ok(match (control, name) {
            (Control::IsStaged, _) => ControlValue::Flag(self.is_staged()),
            (Control::Principal, _) => ControlValue::Principal(self.principal()?),
            (Control::Commit, _) => {
                self.commit()?;
                ControlValue::Committed
            }
            (Control::Changed, _) => ControlValue::Flag(self.changed()?),
            (Control::PropertyState, None) => ControlValue::State(self.own_state()?),
            (Control::PropertyState, Some(key)) => {
                ControlValue::State(self.property_state(key)?)
            }
            (Control::TestPrincipalEqual, None) => {
                ControlValue::Equal(Some(self.test_principal_equal()?))
            }
            (Control::TestPrincipalEqual, Some(key)) => {
                ControlValue::Equal(self.test_principal_equal_at(key)?)
            }
        })
    }
}
