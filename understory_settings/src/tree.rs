// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested setting declarations.
//!
//! Settings are usually written as a tree: each node's children are the
//! settings nested in it. [`SettingTable::from_tree`] flattens such a tree
//! into a table in preorder, so parents always precede their children.
//!
//! With the `serde` feature the tree types deserialize from documents like:
//!
//! ```json
//! [
//!   { "name": "notifications", "cascade": { "enable": true, "disable": true },
//!     "children": [ { "name": "email" }, { "name": "sms" } ] },
//!   { "name": "digest", "sync": { "target": "email", "mode": "inverse" } }
//! ]
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use crate::definition::{Cascade, SettingDef, SyncMode};
use crate::id::SettingId;
use crate::table::SettingTable;
use crate::value::SettingValue;

/// Deserializes a field that is present as `Some`, even when it is `null`.
#[cfg(feature = "serde")]
fn present<'de, D, V>(deserializer: D) -> Result<Option<V>, D::Error>
where
    D: serde::Deserializer<'de>,
    V: serde::Deserialize<'de>,
{
    V::deserialize(deserializer).map(Some)
}

/// Which transitions of a node cascade into its children.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CascadeOn {
    /// Cascade enabling.
    pub enable: bool,
    /// Cascade disabling.
    pub disable: bool,
}

impl From<CascadeOn> for Cascade {
    fn from(on: CascadeOn) -> Self {
        let mut cascade = Self::empty();
        cascade.set(Self::ENABLE, on.enable);
        cascade.set(Self::DISABLE, on.disable);
        cascade
    }
}

/// A sync rule as written in a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncDecl {
    /// Name of the other setting.
    pub target: String,
    /// Defaults to [`SyncMode::Forward`].
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: SyncMode,
}

/// One setting and the settings nested in it.
///
/// A missing `enabled` or `disabled` field falls back to the value type's
/// default. An explicit `null` is kept as a value, so `"disabled": null`
/// makes a cascade write [`Value::Null`](crate::Value::Null).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(deserialize = "V: serde::Deserialize<'de>"))
)]
pub struct SettingNode<V> {
    /// Unique name.
    pub name: String,
    /// Cascade triggers; none by default.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cascade: CascadeOn,
    /// Optional sync rule.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sync: Option<SyncDecl>,
    /// Value written when a cascade enables this setting.
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub enabled: Option<V>,
    /// Value written when a cascade disables this setting.
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub disabled: Option<V>,
    /// Nested settings.
    #[cfg_attr(feature = "serde", serde(default = "Vec::new"))]
    pub children: Vec<SettingNode<V>>,
}

impl<V> SettingNode<V> {
    /// Creates a leaf node with no cascade, sync, or value overrides.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cascade: CascadeOn::default(),
            sync: None,
            enabled: None,
            disabled: None,
            children: Vec::new(),
        }
    }
}

impl<V: SettingValue> SettingTable<V> {
    /// Flattens `roots` into a table in preorder.
    ///
    /// Missing on/off values fall back to the value type's defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use understory_settings::{CascadeOn, SettingNode, SettingTable};
    ///
    /// let mut root = SettingNode::<bool>::new("root");
    /// root.cascade = CascadeOn { enable: true, disable: false };
    /// root.children = vec![SettingNode::new("a"), SettingNode::new("b")];
    ///
    /// let table = SettingTable::from_tree([root]);
    /// let names: Vec<_> = table.iter().map(|(_, def)| def.name()).collect();
    /// assert_eq!(names, ["root", "a", "b"]);
    /// ```
    #[must_use]
    pub fn from_tree(roots: impl IntoIterator<Item = SettingNode<V>>) -> Self {
        let mut table = Self::new();
        let mut stack: Vec<(Option<SettingId>, SettingNode<V>)> =
            roots.into_iter().map(|node| (None, node)).collect();
        stack.reverse();

        while let Some((parent, node)) = stack.pop() {
            let SettingNode {
                name,
                cascade,
                sync,
                enabled,
                disabled,
                children,
            } = node;

            let mut def = SettingDef::new(name).cascade(cascade.into()).values(
                enabled.unwrap_or_else(V::enabled_value),
                disabled.unwrap_or_else(V::disabled_value),
            );
            if let Some(parent) = parent {
                def = def.nested_in(parent);
            }
            if let Some(SyncDecl { target, mode }) = sync {
                def = def.sync(target, mode);
            }

            let id = table.add(def);
            stack.extend(children.into_iter().rev().map(|child| (Some(id), child)));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use alloc::vec;

    #[test]
    fn preorder_keeps_sibling_order_and_parents() {
        let mut a = SettingNode::<bool>::new("a");
        let mut a1 = SettingNode::new("a1");
        a1.children = vec![SettingNode::new("a1x")];
        a.children = vec![a1, SettingNode::new("a2")];
        let b = SettingNode::new("b");

        let table = SettingTable::from_tree([a, b]);
        let flat: Vec<_> = table
            .iter()
            .map(|(_, def)| (def.name(), def.parent().map(SettingId::index)))
            .collect();
        assert_eq!(
            flat,
            [
                ("a", None),
                ("a1", Some(0)),
                ("a1x", Some(1)),
                ("a2", Some(0)),
                ("b", None),
            ]
        );
    }

    #[test]
    fn value_overrides_and_sync_are_carried() {
        let mut node = SettingNode::<Value>::new("frequency");
        node.enabled = Some(Value::from("daily"));
        node.sync = Some(SyncDecl {
            target: String::from("digest"),
            mode: SyncMode::Inverse,
        });

        let table = SettingTable::from_tree([node]);
        let (_, def) = table.iter().next().unwrap();
        assert_eq!(def.enabled_value(), &Value::from("daily"));
        assert_eq!(def.disabled_value(), &Value::Bool(false));
        assert_eq!(def.sync_rule().unwrap().mode, SyncMode::Inverse);
    }

    #[test]
    fn cascade_flags_convert() {
        assert_eq!(Cascade::from(CascadeOn::default()), Cascade::empty());
        assert_eq!(
            Cascade::from(CascadeOn {
                enable: false,
                disable: true
            }),
            Cascade::DISABLE
        );
    }
}
