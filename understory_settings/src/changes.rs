// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The write set produced by a propagation run.

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::definition::SyncMode;
use crate::id::SettingId;

/// Why a setting ended up in a [`PendingChangeSet`].
///
/// Only the most recent cause is kept when several paths write the same
/// setting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cause {
    /// The setting was one of the initially changed settings.
    Seed,
    /// A parent cascaded its transition.
    Cascade {
        /// The parent.
        from: SettingId,
    },
    /// A sync edge carried the value.
    Sync {
        /// The setting the value came from.
        from: SettingId,
        /// Mode of the rule behind the edge.
        mode: SyncMode,
    },
    /// A [`ChangeHook`](crate::ChangeHook) requested the write.
    Hook {
        /// The setting whose change ran the hook.
        from: SettingId,
    },
}

impl Cause {
    /// The upstream setting, or `None` for seeds.
    #[must_use]
    pub fn origin(self) -> Option<SettingId> {
        match self {
            Self::Seed => None,
            Self::Cascade { from } | Self::Sync { from, .. } | Self::Hook { from } => Some(from),
        }
    }
}

/// One planned write.
#[derive(Clone, Debug, PartialEq)]
pub struct Change<V> {
    /// The setting to write.
    pub setting: SettingId,
    /// Its value before propagation.
    pub old: V,
    /// The value to write.
    pub new: V,
    /// Breadth-first wave of the last write; seeds are wave 0.
    pub wave: usize,
    /// Why the setting changes.
    pub cause: Cause,
}

/// Deduplicated, ordered write set for one propagation run.
///
/// Each setting appears at most once, holding its final value. Entries are in
/// wave order (stable within a wave), and settings whose final value equals
/// their original value are omitted.
#[derive(Clone, Debug)]
pub struct PendingChangeSet<V> {
    entries: Vec<Change<V>>,
    slots: HashMap<SettingId, usize>,
}

impl<V> Default for PendingChangeSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PendingChangeSet<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
        }
    }

    pub(crate) fn slot(&self, setting: SettingId) -> Option<usize> {
        self.slots.get(&setting).copied()
    }

    pub(crate) fn at(&self, slot: usize) -> &Change<V> {
        &self.entries[slot]
    }

    pub(crate) fn insert(&mut self, change: Change<V>) -> usize {
        let slot = self.entries.len();
        self.slots.insert(change.setting, slot);
        self.entries.push(change);
        slot
    }

    pub(crate) fn overwrite(&mut self, slot: usize, new: V, cause: Cause, wave: usize) {
        let change = &mut self.entries[slot];
        change.new = new;
        change.cause = cause;
        change.wave = wave;
    }

    /// Number of planned writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the planned change for `setting`.
    #[must_use]
    pub fn get(&self, setting: SettingId) -> Option<&Change<V>> {
        self.slot(setting).map(|slot| &self.entries[slot])
    }

    /// Returns the value `setting` will be written with.
    #[must_use]
    pub fn new_value(&self, setting: SettingId) -> Option<&V> {
        self.get(setting).map(|c| &c.new)
    }

    /// Returns `true` if `setting` is written.
    #[must_use]
    pub fn contains(&self, setting: SettingId) -> bool {
        self.slots.contains_key(&setting)
    }

    /// Iterates planned writes in wave order.
    pub fn iter(&self) -> core::slice::Iter<'_, Change<V>> {
        self.entries.iter()
    }

    /// Iterates the writes that were not seeds.
    pub fn side_effects(&self) -> impl Iterator<Item = &Change<V>> + '_ {
        self.entries.iter().filter(|c| c.cause != Cause::Seed)
    }

    /// Returns the causal chain that led to `setting` changing, from a seed to
    /// `setting` inclusive.
    ///
    /// Returns `None` if `setting` does not change, or if the chain passes
    /// through a setting that ended up unchanged or loops on itself.
    #[must_use]
    pub fn explain(&self, setting: SettingId) -> Option<Vec<SettingId>> {
        let mut out = Vec::new();
        let mut seen: HashSet<SettingId> = HashSet::new();

        let mut current = setting;
        loop {
            if !seen.insert(current) {
                return None;
            }
            out.push(current);
            match self.get(current)?.cause.origin() {
                None => break,
                Some(from) => current = from,
            }
        }

        out.reverse();
        Some(out)
    }

    /// Consumes the set, returning `(setting, value)` writes in order.
    #[must_use]
    pub fn into_writes(self) -> Vec<(SettingId, V)> {
        self.entries.into_iter().map(|c| (c.setting, c.new)).collect()
    }
}

impl<V: PartialEq> PendingChangeSet<V> {
    /// Drops no-op entries and puts the rest in wave order.
    pub(crate) fn finish(mut self) -> Self {
        self.entries.retain(|c| c.old != c.new);
        self.entries.sort_by_key(|c| c.wave);
        self.slots.clear();
        for (slot, change) in self.entries.iter().enumerate() {
            self.slots.insert(change.setting, slot);
        }
        self
    }
}

impl<'a, V> IntoIterator for &'a PendingChangeSet<V> {
    type Item = &'a Change<V>;
    type IntoIter = core::slice::Iter<'a, Change<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn id(i: usize) -> SettingId {
        SettingId::new(i)
    }

    fn change(setting: usize, old: bool, new: bool, wave: usize, cause: Cause) -> Change<bool> {
        Change {
            setting: id(setting),
            old,
            new,
            wave,
            cause,
        }
    }

    #[test]
    fn finish_drops_reverted_entries_and_orders_by_wave() {
        let mut set = PendingChangeSet::new();
        set.insert(change(0, false, true, 0, Cause::Seed));
        let reverted = set.insert(change(1, false, true, 1, Cause::Cascade { from: id(0) }));
        let late = set.insert(change(2, false, true, 1, Cause::Cascade { from: id(0) }));
        set.insert(change(3, true, false, 2, Cause::Hook { from: id(2) }));

        set.overwrite(reverted, false, Cause::Hook { from: id(0) }, 2);
        set.overwrite(late, true, Cause::Hook { from: id(3) }, 3);

        let set = set.finish();
        let order: Vec<_> = set.iter().map(|c| c.setting).collect();
        assert_eq!(order, vec![id(0), id(3), id(2)]);
        assert!(!set.contains(id(1)));
        assert_eq!(set.get(id(2)).unwrap().wave, 3);
    }

    #[test]
    fn explain_walks_back_to_the_seed() {
        let mut set = PendingChangeSet::new();
        set.insert(change(0, false, true, 0, Cause::Seed));
        set.insert(change(1, false, true, 1, Cause::Cascade { from: id(0) }));
        set.insert(change(
            2,
            false,
            true,
            2,
            Cause::Sync {
                from: id(1),
                mode: SyncMode::Forward,
            },
        ));
        let set = set.finish();

        assert_eq!(set.explain(id(2)).unwrap(), vec![id(0), id(1), id(2)]);
        assert_eq!(set.explain(id(0)).unwrap(), vec![id(0)]);
        assert_eq!(set.explain(id(9)), None);
        assert_eq!(set.side_effects().count(), 2);
    }
}
