// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Setting value types.
//!
//! The engine never stores record data. It only needs to compare values, copy
//! them along sync edges, and decide whether a value counts as *enabled* so it
//! knows which cascade trigger fires. [`SettingValue`] captures exactly that.

use alloc::string::String;
use core::fmt;

/// A value a setting can hold.
///
/// Implementations decide what "enabled" means for the type. Cascades fire
/// the `ENABLE` trigger when a setting's new value is enabled and the
/// `DISABLE` trigger otherwise.
///
/// # Example
///
/// ```
/// use understory_settings::{SettingValue, Value};
///
/// assert!(true.is_enabled());
/// assert!(!Value::Null.is_enabled());
/// assert!(Value::from("weekly").is_enabled());
/// assert_eq!(<bool as SettingValue>::enabled_value(), true);
/// ```
pub trait SettingValue: Clone + PartialEq + fmt::Debug {
    /// Returns `true` if this value means the setting is switched on.
    fn is_enabled(&self) -> bool;

    /// The value written to a setting when a cascade enables it, unless its
    /// definition overrides it.
    fn enabled_value() -> Self;

    /// The value written to a setting when a cascade disables it, unless its
    /// definition overrides it.
    fn disabled_value() -> Self;
}

impl SettingValue for bool {
    #[inline]
    fn is_enabled(&self) -> bool {
        *self
    }

    #[inline]
    fn enabled_value() -> Self {
        true
    }

    #[inline]
    fn disabled_value() -> Self {
        false
    }
}

/// A dynamically typed setting value.
///
/// `Null`, `false`, `0` and the empty string are disabled; everything else is
/// enabled.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A string.
    Text(String),
}

impl SettingValue for Value {
    fn is_enabled(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Text(s) => !s.is_empty(),
        }
    }

    fn enabled_value() -> Self {
        Self::Bool(true)
    }

    fn disabled_value() -> Self {
        Self::Bool(false)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}
