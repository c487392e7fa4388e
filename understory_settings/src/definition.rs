// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Setting definitions.
//!
//! A [`SettingDef`] is the static description of one setting: its name, the
//! setting it is nested in, which transitions cascade into its children, and
//! an optional [`SyncRule`] linking it to another setting.

use alloc::string::String;

use crate::id::SettingId;
use crate::value::SettingValue;

bitflags::bitflags! {
    /// Transitions that propagate from a setting to its nested children.
    ///
    /// An empty set means the setting never touches its children.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Cascade: u8 {
        /// Enabling the setting enables every direct child.
        const ENABLE = 0b0000_0001;
        /// Disabling the setting disables every direct child.
        const DISABLE = 0b0000_0010;
    }
}

impl Cascade {
    /// Returns `true` if a transition to a value with the given enabled state
    /// propagates to children.
    #[inline]
    #[must_use]
    pub const fn fires_on(self, enabled: bool) -> bool {
        if enabled {
            self.contains(Self::ENABLE)
        } else {
            self.contains(Self::DISABLE)
        }
    }
}

/// How a sync rule moves values between a setting and its target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SyncMode {
    /// The declaring setting mirrors the target's value whenever the target
    /// changes.
    #[default]
    Forward,
    /// Like [`Forward`](Self::Forward), and the declaring setting's own
    /// changes are written back to the target.
    Bidirectional,
    /// The declaring setting takes the target's opposite state: its disabled
    /// value when the target becomes enabled, its enabled value otherwise.
    Inverse,
    /// The reverse of [`Forward`](Self::Forward): the target mirrors the
    /// declaring setting.
    Backward,
}

/// A sync relationship declared on a setting.
///
/// The target is referenced by name and resolved when the graph is built, so
/// settings may sync with settings declared after them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncRule {
    /// Name of the other setting.
    pub target: String,
    /// Direction and transformation of the mirrored value.
    pub mode: SyncMode,
}

/// Static definition of a single setting.
///
/// # Example
///
/// ```
/// use understory_settings::{Cascade, SettingDef, SettingTable, SyncMode};
///
/// let mut table = SettingTable::<bool>::new();
/// let notifications = table.add(SettingDef::new("notifications").cascade(Cascade::all()));
/// let email = table.add(SettingDef::new("email").nested_in(notifications));
/// table.add(SettingDef::new("digest").sync("email", SyncMode::Forward));
///
/// assert_eq!(table.get(email).unwrap().parent(), Some(notifications));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SettingDef<V> {
    name: String,
    parent: Option<SettingId>,
    cascade: Cascade,
    sync: Option<SyncRule>,
    enabled: V,
    disabled: V,
}

impl<V: SettingValue> SettingDef<V> {
    /// Creates a top-level definition with no cascade or sync, using the
    /// value type's default on/off values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            cascade: Cascade::empty(),
            sync: None,
            enabled: V::enabled_value(),
            disabled: V::disabled_value(),
        }
    }

    /// Nests this setting inside `parent`.
    #[must_use]
    pub fn nested_in(mut self, parent: SettingId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets which transitions propagate to this setting's children.
    #[must_use]
    pub fn cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Links this setting to `target`.
    ///
    /// A setting carries at most one sync rule; a later call replaces it.
    #[must_use]
    pub fn sync(mut self, target: impl Into<String>, mode: SyncMode) -> Self {
        self.sync = Some(SyncRule {
            target: target.into(),
            mode,
        });
        self
    }

    /// Overrides the values cascades write into this setting.
    #[must_use]
    pub fn values(mut self, enabled: V, disabled: V) -> Self {
        self.enabled = enabled;
        self.disabled = disabled;
        self
    }
}

impl<V> SettingDef<V> {
    /// The setting's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The enclosing setting, if nested.
    #[must_use]
    pub fn parent(&self) -> Option<SettingId> {
        self.parent
    }

    /// Transitions that cascade into children.
    #[must_use]
    pub fn cascade_triggers(&self) -> Cascade {
        self.cascade
    }

    /// The sync rule, if any.
    #[must_use]
    pub fn sync_rule(&self) -> Option<&SyncRule> {
        self.sync.as_ref()
    }

    /// Value written when a cascade enables this setting.
    #[must_use]
    pub fn enabled_value(&self) -> &V {
        &self.enabled
    }

    /// Value written when a cascade disables this setting.
    #[must_use]
    pub fn disabled_value(&self) -> &V {
        &self.disabled
    }

    /// Replaces the cascade triggers in place.
    ///
    /// Mostly useful from compile passes.
    pub fn set_cascade(&mut self, cascade: Cascade) {
        self.cascade = cascade;
    }

    /// Replaces or clears the sync rule in place.
    pub fn set_sync(&mut self, sync: Option<SyncRule>) {
        self.sync = sync;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_fires_only_on_declared_direction() {
        assert!(Cascade::ENABLE.fires_on(true));
        assert!(!Cascade::ENABLE.fires_on(false));
        assert!(Cascade::DISABLE.fires_on(false));
        assert!(!Cascade::DISABLE.fires_on(true));
        assert!(Cascade::all().fires_on(true) && Cascade::all().fires_on(false));
        assert!(!Cascade::empty().fires_on(true));
    }

    #[test]
    fn builder_keeps_last_sync_rule() {
        let def = SettingDef::<bool>::new("a")
            .sync("b", SyncMode::Forward)
            .sync("c", SyncMode::Inverse);
        let rule = def.sync_rule().unwrap();
        assert_eq!(rule.target, "c");
        assert_eq!(rule.mode, SyncMode::Inverse);
    }
}
