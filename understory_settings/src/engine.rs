// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compile once, propagate many times.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;

use crate::changes::PendingChangeSet;
use crate::config::PropagationConfig;
use crate::error::{ConfigurationError, Error};
use crate::graph::DependencyGraph;
use crate::id::SettingId;
use crate::propagate::{ChangeHook, Propagator};
use crate::table::SettingTable;
use crate::value::SettingValue;

/// Where current setting values live.
///
/// The engine reads through this while planning and writes the final change
/// set back only after planning succeeded.
pub trait SettingStore<V> {
    /// Current value of `setting`.
    fn read(&self, setting: SettingId) -> V;
    /// Stores `value` for `setting`.
    fn write(&mut self, setting: SettingId, value: V);
}

/// Dense store indexed by [`SettingId`].
impl<V: Clone> SettingStore<V> for Vec<V> {
    fn read(&self, setting: SettingId) -> V {
        self[setting.index()].clone()
    }

    fn write(&mut self, setting: SettingId, value: V) {
        self[setting.index()] = value;
    }
}

/// A table rewrite run before the graph is built.
///
/// Passes can fill in defaults, derive rules, or reject a table outright with
/// [`ConfigurationError::Rejected`].
pub type CompilePass<V> =
    Box<dyn Fn(&mut SettingTable<V>) -> Result<(), ConfigurationError> + Send + Sync>;

/// Builds a [`DependencyEngine`] from a [`SettingTable`].
///
/// # Example
///
/// ```
/// use understory_settings::{Cascade, Compiler, ConfigurationError, SettingDef, SettingTable};
///
/// let mut table = SettingTable::<bool>::new();
/// let root = table.add(SettingDef::new("root"));
/// table.add(SettingDef::new("leaf").nested_in(root));
///
/// // Every parent cascades both ways unless it says otherwise.
/// let engine = Compiler::new()
///     .pass(|table: &mut SettingTable<bool>| {
///         let parents: Vec<_> = table.iter().filter_map(|(_, def)| def.parent()).collect();
///         for parent in parents {
///             let def = table.get_mut(parent).unwrap();
///             if def.cascade_triggers().is_empty() {
///                 def.set_cascade(Cascade::all());
///             }
///         }
///         Ok::<_, ConfigurationError>(())
///     })
///     .compile(table)
///     .unwrap();
/// assert_eq!(engine.graph().cascade().edge_count(), 1);
/// ```
pub struct Compiler<V> {
    passes: Vec<CompilePass<V>>,
    config: PropagationConfig,
}

impl<V> fmt::Debug for Compiler<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("passes", &self.passes.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<V> Default for Compiler<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Compiler<V> {
    /// Creates a compiler with no passes and the default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            config: PropagationConfig::default(),
        }
    }

    /// Appends a pass; passes run in the order they were added.
    #[must_use]
    pub fn pass<F>(mut self, pass: F) -> Self
    where
        F: Fn(&mut SettingTable<V>) -> Result<(), ConfigurationError> + Send + Sync + 'static,
    {
        self.passes.push(Box::new(pass));
        self
    }

    /// Sets the propagation config of the compiled engine.
    #[must_use]
    pub fn config(mut self, config: PropagationConfig) -> Self {
        self.config = config;
        self
    }
}

impl<V: SettingValue> Compiler<V> {
    /// Runs the passes over `table` and builds the graph.
    ///
    /// # Errors
    ///
    /// The first error returned by a pass, or any error of
    /// [`DependencyGraph::build`].
    pub fn compile(&self, mut table: SettingTable<V>) -> Result<DependencyEngine<V>, ConfigurationError> {
        for pass in &self.passes {
            pass(&mut table)?;
        }
        let graph = DependencyGraph::build(&table)?;
        Ok(DependencyEngine {
            table,
            graph,
            config: self.config,
        })
    }
}

/// A compiled settings model.
///
/// Holds the (post-pass) definitions, the validated graph, and the
/// propagation config. Planning is read-only; [`apply`](Self::apply) also
/// writes to a [`SettingStore`].
///
/// # Example
///
/// ```
/// use understory_settings::{Cascade, DependencyEngine, SettingDef, SettingTable, SyncMode};
///
/// let mut table = SettingTable::new();
/// let alerts = table.add(SettingDef::new("alerts").cascade(Cascade::DISABLE));
/// table.add(SettingDef::new("sms").nested_in(alerts));
/// table.add(SettingDef::new("push").sync("sms", SyncMode::Bidirectional));
/// let engine = DependencyEngine::compile(table).unwrap();
///
/// let mut store = vec![true; engine.graph().len()];
/// let changes = engine.apply(&mut store, [(alerts, false)]).unwrap();
/// assert_eq!(changes.len(), 3);
/// assert_eq!(store, vec![false, false, false]);
/// ```
#[derive(Clone, Debug)]
pub struct DependencyEngine<V> {
    table: SettingTable<V>,
    graph: DependencyGraph<V>,
    config: PropagationConfig,
}

impl<V: SettingValue> DependencyEngine<V> {
    /// Compiles `table` without passes and with the default config.
    ///
    /// # Errors
    ///
    /// See [`DependencyGraph::build`].
    pub fn compile(table: SettingTable<V>) -> Result<Self, ConfigurationError> {
        Compiler::new().compile(table)
    }

    /// The definitions the graph was built from.
    #[must_use]
    pub fn table(&self) -> &SettingTable<V> {
        &self.table
    }

    /// The validated graph.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph<V> {
        &self.graph
    }

    /// The propagation config.
    #[must_use]
    pub fn config(&self) -> PropagationConfig {
        self.config
    }

    /// Looks up a setting by name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSetting`] if there is no such setting.
    pub fn id(&self, name: &str) -> Result<SettingId, Error> {
        self.graph
            .id(name)
            .ok_or_else(|| Error::UnknownSetting(name.to_string()))
    }

    /// Plans the writes caused by `changed` without touching any store.
    ///
    /// # Errors
    ///
    /// [`Error::InfiniteCascade`] if propagation ran away.
    pub fn plan(
        &self,
        changed: impl IntoIterator<Item = (SettingId, V)>,
        read_current: impl FnMut(SettingId) -> V,
    ) -> Result<PendingChangeSet<V>, Error> {
        Ok(Propagator::new(&self.graph)
            .config(self.config)
            .run(changed, read_current)?)
    }

    /// Like [`plan`](Self::plan), running `hook` after every recorded change.
    ///
    /// # Errors
    ///
    /// [`Error::InfiniteCascade`] if propagation ran away.
    pub fn plan_with_hook<H: ChangeHook<V>>(
        &self,
        hook: H,
        changed: impl IntoIterator<Item = (SettingId, V)>,
        read_current: impl FnMut(SettingId) -> V,
    ) -> Result<PendingChangeSet<V>, Error> {
        Ok(Propagator::new(&self.graph)
            .config(self.config)
            .hook(hook)
            .run(changed, read_current)?)
    }

    /// Like [`plan`](Self::plan), naming the changed settings.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSetting`] for the first unknown name, or
    /// [`Error::InfiniteCascade`] if propagation ran away.
    pub fn plan_by_name<'n>(
        &self,
        changed: impl IntoIterator<Item = (&'n str, V)>,
        read_current: impl FnMut(SettingId) -> V,
    ) -> Result<PendingChangeSet<V>, Error> {
        let seeds = changed
            .into_iter()
            .map(|(name, value)| Ok((self.id(name)?, value)))
            .collect::<Result<Vec<_>, Error>>()?;
        self.plan(seeds, read_current)
    }

    /// Plans `changed` against `store` and writes the result back.
    ///
    /// The store is left untouched if planning fails.
    ///
    /// # Errors
    ///
    /// [`Error::InfiniteCascade`] if propagation ran away.
    pub fn apply<S: SettingStore<V>>(
        &self,
        store: &mut S,
        changed: impl IntoIterator<Item = (SettingId, V)>,
    ) -> Result<PendingChangeSet<V>, Error> {
        let changes = self.plan(changed, |id| store.read(id))?;
        commit(store, &changes);
        Ok(changes)
    }

    /// Like [`apply`](Self::apply), running `hook` after every recorded change.
    ///
    /// # Errors
    ///
    /// [`Error::InfiniteCascade`] if propagation ran away.
    pub fn apply_with_hook<S: SettingStore<V>, H: ChangeHook<V>>(
        &self,
        store: &mut S,
        hook: H,
        changed: impl IntoIterator<Item = (SettingId, V)>,
    ) -> Result<PendingChangeSet<V>, Error> {
        let changes = self.plan_with_hook(hook, changed, |id| store.read(id))?;
        commit(store, &changes);
        Ok(changes)
    }
}

fn commit<V: Clone, S: SettingStore<V>>(store: &mut S, changes: &PendingChangeSet<V>) {
    for change in changes {
        store.write(change.setting, change.new.clone());
    }
    tracing::debug!(writes = changes.len(), "applied settings changes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::Change;
    use crate::config::IterationCap;
    use crate::definition::{Cascade, SettingDef, SyncMode};
    use crate::propagate::FollowUps;
    use alloc::string::String;
    use alloc::vec;

    #[test]
    fn failed_plan_leaves_store_untouched() {
        struct PingPong(SettingId);
        impl ChangeHook<bool> for PingPong {
            fn after_change(&mut self, change: &Change<bool>, follow_ups: &mut FollowUps<'_, bool>) {
                follow_ups.write(self.0, !change.new);
            }
        }

        let mut table = SettingTable::new();
        let a = table.add(SettingDef::new("a").cascade(Cascade::all()));
        table.add(SettingDef::new("b").nested_in(a));
        let engine = Compiler::new()
            .config(PropagationConfig::with_cap(IterationCap::Fixed(10)))
            .compile(table)
            .unwrap();

        let mut store = vec![false, false];
        let err = engine
            .apply_with_hook(&mut store, PingPong(a), [(a, true)])
            .unwrap_err();
        assert!(matches!(err, Error::InfiniteCascade(e) if e.cap == 10));
        assert_eq!(store, vec![false, false]);
    }

    #[test]
    fn rejecting_pass_aborts_compilation() {
        let mut table = SettingTable::<bool>::new();
        table.add(SettingDef::new("legacy_mode"));
        let err = Compiler::new()
            .pass(|table: &mut SettingTable<bool>| {
                match table.iter().find(|(_, def)| def.name().starts_with("legacy_")) {
                    Some((_, def)) => Err(ConfigurationError::Rejected {
                        setting: def.name().into(),
                        reason: String::from("legacy settings are retired"),
                    }),
                    None => Ok(()),
                }
            })
            .compile(table)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Rejected { setting, .. } if setting == "legacy_mode"));
    }

    #[test]
    fn passes_run_before_validation() {
        let mut table = SettingTable::<bool>::new();
        table.add(SettingDef::new("a").sync("b", SyncMode::Forward));
        table.add(SettingDef::new("b").sync("a", SyncMode::Forward));

        assert!(DependencyEngine::compile(table.clone()).is_err());

        // Dropping the back edge makes the table valid.
        let engine = Compiler::new()
            .pass(|table: &mut SettingTable<bool>| {
                if let Some(b) = table.find("b") {
                    table.get_mut(b).unwrap().set_sync(None);
                }
                Ok(())
            })
            .compile(table)
            .unwrap();
        assert_eq!(engine.graph().sync().edges().len(), 1);
        assert!(engine.table().get(engine.id("b").unwrap()).unwrap().sync_rule().is_none());
    }

    #[test]
    fn plan_by_name_reports_unknown_names() {
        let mut table = SettingTable::<bool>::new();
        table.add(SettingDef::new("a"));
        let engine = DependencyEngine::compile(table).unwrap();

        let err = engine.plan_by_name([("missing", true)], |_| false).unwrap_err();
        assert_eq!(err, Error::UnknownSetting(String::from("missing")));

        let changes = engine.plan_by_name([("a", true)], |_| false).unwrap();
        assert_eq!(changes.len(), 1);
    }
}
