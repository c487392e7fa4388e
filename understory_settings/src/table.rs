// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat arena of setting definitions.

use alloc::vec::Vec;

use crate::definition::SettingDef;
use crate::id::SettingId;

/// Ordered arena of [`SettingDef`]s for one model.
///
/// Nesting is expressed with [`SettingId`] parent indices rather than
/// references, so a table (and everything compiled from it) has no reference
/// cycles and can be shared freely once built.
///
/// A table is not validated as it is filled. Duplicate names, dangling parents
/// and unknown sync targets are reported when the table is compiled into a
/// [`DependencyGraph`](crate::DependencyGraph).
#[derive(Clone, Debug, PartialEq)]
pub struct SettingTable<V> {
    defs: Vec<SettingDef<V>>,
}

impl<V> Default for SettingTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SettingTable<V> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { defs: Vec::new() }
    }

    /// Appends a definition and returns its id.
    pub fn add(&mut self, def: SettingDef<V>) -> SettingId {
        let id = SettingId::new(self.defs.len());
        self.defs.push(def);
        id
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns `true` if the table has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Returns the definition for `id`, if in range.
    #[must_use]
    pub fn get(&self, id: SettingId) -> Option<&SettingDef<V>> {
        self.defs.get(id.index())
    }

    /// Returns the definition for `id` mutably, if in range.
    #[must_use]
    pub fn get_mut(&mut self, id: SettingId) -> Option<&mut SettingDef<V>> {
        self.defs.get_mut(id.index())
    }

    /// Looks up a setting by name.
    ///
    /// This is a linear scan; compiled graphs keep a name index.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SettingId> {
        self.defs
            .iter()
            .position(|def| def.name() == name)
            .map(SettingId::new)
    }

    /// Iterates definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SettingId, &SettingDef<V>)> + '_ {
        self.defs
            .iter()
            .enumerate()
            .map(|(idx, def)| (SettingId::new(idx), def))
    }

    /// Iterates definitions mutably in declaration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SettingId, &mut SettingDef<V>)> + '_ {
        self.defs
            .iter_mut()
            .enumerate()
            .map(|(idx, def)| (SettingId::new(idx), def))
    }

    /// Iterates the direct children of `parent` in declaration order.
    pub fn children(&self, parent: SettingId) -> impl Iterator<Item = SettingId> + '_ {
        self.iter()
            .filter(move |(_, def)| def.parent() == Some(parent))
            .map(|(id, _)| id)
    }
}
