// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compiled dependency graph: cascade and sync adjacency.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use smallvec::SmallVec;

use crate::cycle::{CyclePath, condense};
use crate::definition::{Cascade, SyncMode};
use crate::error::ConfigurationError;
use crate::id::SettingId;
use crate::table::SettingTable;
use crate::value::SettingValue;

/// Lower bound for the iteration cap derived from graph size.
///
/// Small graphs still get enough headroom for a few rounds of hook-driven
/// follow-up writes before propagation is declared runaway.
pub const MIN_ITERATION_CAP: usize = 100;

/// Parent → child cascade edges.
///
/// Only parents with at least one trigger have edges; children of a setting
/// without cascade triggers are never touched by it.
#[derive(Clone, Debug, Default)]
pub struct CascadeGraph {
    triggers: Vec<Cascade>,
    children: Vec<SmallVec<[SettingId; 4]>>,
    depth: usize,
}

impl CascadeGraph {
    /// Iterates the cascade children of `parent` with the triggers they react to.
    pub fn children(&self, parent: SettingId) -> impl Iterator<Item = (SettingId, Cascade)> + '_ {
        let triggers = self.triggers(parent);
        let slice = self
            .children
            .get(parent.index())
            .map_or(&[][..], |c| c.as_slice());
        slice.iter().map(move |&child| (child, triggers))
    }

    /// Transitions of `id` that cascade into its children.
    #[must_use]
    pub fn triggers(&self, id: SettingId) -> Cascade {
        self.triggers
            .get(id.index())
            .copied()
            .unwrap_or_else(Cascade::empty)
    }

    /// Total number of parent → child edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.children.iter().map(SmallVec::len).sum()
    }

    /// Length of the longest chain of cascade edges.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// A single directed sync edge: values flow from `source` to `target`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SyncEdge {
    /// Setting whose change triggers the edge.
    pub source: SettingId,
    /// Setting that receives the value.
    pub target: SettingId,
    /// Mode of the rule that produced the edge.
    pub mode: SyncMode,
}

/// Directed sync adjacency.
///
/// Rules are lowered to plain directed edges pointing the way values flow.
/// Forward and inverse rules become an edge from the target to the declaring
/// setting, a backward rule the opposite edge, and a bidirectional rule both
/// edges plus an entry in [`links`](Self::links).
#[derive(Clone, Debug, Default)]
pub struct SyncGraph {
    edges: Vec<SyncEdge>,
    outgoing: Vec<SmallVec<[usize; 2]>>,
    links: Vec<(SettingId, SettingId)>,
}

impl SyncGraph {
    pub(crate) fn with_nodes(len: usize) -> Self {
        Self {
            edges: Vec::new(),
            outgoing: vec![SmallVec::new(); len],
            links: Vec::new(),
        }
    }

    pub(crate) fn declare(&mut self, setting: SettingId, target: SettingId, mode: SyncMode) {
        match mode {
            SyncMode::Forward | SyncMode::Inverse => self.push(target, setting, mode),
            SyncMode::Backward => self.push(setting, target, mode),
            SyncMode::Bidirectional => {
                self.push(target, setting, mode);
                self.push(setting, target, mode);
                self.links.push((setting, target));
            }
        }
    }

    fn push(&mut self, source: SettingId, target: SettingId, mode: SyncMode) {
        self.outgoing[source.index()].push(self.edges.len());
        self.edges.push(SyncEdge {
            source,
            target,
            mode,
        });
    }

    /// Number of settings the graph spans.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    /// All edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[SyncEdge] {
        &self.edges
    }

    /// Edges leaving `id`, in insertion order.
    pub fn edges_from(&self, id: SettingId) -> impl Iterator<Item = &SyncEdge> + '_ {
        let slice = self
            .outgoing
            .get(id.index())
            .map_or(&[][..], |o| o.as_slice());
        slice.iter().map(|&idx| &self.edges[idx])
    }

    /// Bidirectional rules as `(declaring setting, target)` pairs.
    #[must_use]
    pub fn links(&self) -> &[(SettingId, SettingId)] {
        &self.links
    }

    /// Returns `true` if there are no sync edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node<V> {
    pub(crate) name: String,
    pub(crate) enabled: V,
    pub(crate) disabled: V,
}

/// Immutable, validated dependency graph for one setting table.
///
/// Built once when settings are compiled and shared by every propagation
/// afterwards. Building resolves sync target names, validates nesting, and
/// rejects sync cycles.
///
/// # Example
///
/// ```
/// use understory_settings::{Cascade, ConfigurationError, DependencyGraph, SettingDef, SettingTable, SyncMode};
///
/// let mut table = SettingTable::<bool>::new();
/// let root = table.add(SettingDef::new("root").cascade(Cascade::ENABLE));
/// let leaf = table.add(SettingDef::new("leaf").nested_in(root));
/// table.add(SettingDef::new("mirror").sync("leaf", SyncMode::Forward));
///
/// let graph = DependencyGraph::build(&table).unwrap();
/// assert_eq!(graph.cascade().children(root).collect::<Vec<_>>(), vec![(leaf, Cascade::ENABLE)]);
/// assert_eq!(graph.sync().edges_from(leaf).count(), 1);
///
/// let mut bad = SettingTable::<bool>::new();
/// bad.add(SettingDef::new("a").sync("nonexistent", SyncMode::Forward));
/// assert!(matches!(
///     DependencyGraph::build(&bad),
///     Err(ConfigurationError::UnknownSyncTarget { target, .. }) if target == "nonexistent"
/// ));
/// ```
#[derive(Clone, Debug)]
pub struct DependencyGraph<V> {
    nodes: Vec<Node<V>>,
    index: HashMap<String, SettingId>,
    cascade: CascadeGraph,
    sync: SyncGraph,
    sync_order: Vec<SettingId>,
    sync_depth: usize,
}

impl<V: SettingValue> DependencyGraph<V> {
    /// Builds and validates the graph for `table`.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::DuplicateSetting`] if two settings share a name.
    /// - [`ConfigurationError::UnknownParent`] if a setting is nested in a
    ///   parent declared after it (or not at all).
    /// - [`ConfigurationError::UnknownSyncTarget`] if a sync rule names a
    ///   missing setting.
    /// - [`ConfigurationError::CyclicSync`] if the sync relation has a cycle.
    pub fn build(table: &SettingTable<V>) -> Result<Self, ConfigurationError> {
        let len = table.len();
        let mut index: HashMap<String, SettingId> = HashMap::with_capacity(len);
        let mut nodes = Vec::with_capacity(len);

        for (id, def) in table.iter() {
            match index.entry(def.name().to_string()) {
                Entry::Occupied(_) => {
                    return Err(ConfigurationError::DuplicateSetting {
                        name: def.name().to_string(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            // Parents must precede their children, which also keeps nesting a forest.
            if let Some(parent) = def.parent()
                && parent >= id
            {
                return Err(ConfigurationError::UnknownParent {
                    setting: def.name().to_string(),
                    parent,
                });
            }
            nodes.push(Node {
                name: def.name().to_string(),
                enabled: def.enabled_value().clone(),
                disabled: def.disabled_value().clone(),
            });
        }

        let mut cascade = CascadeGraph {
            triggers: table.iter().map(|(_, def)| def.cascade_triggers()).collect(),
            children: vec![SmallVec::new(); len],
            depth: 0,
        };
        let mut depth = vec![0_usize; len];
        for (id, def) in table.iter() {
            if let Some(parent) = def.parent()
                && !cascade.triggers[parent.index()].is_empty()
            {
                cascade.children[parent.index()].push(id);
                depth[id.index()] = depth[parent.index()] + 1;
                cascade.depth = cascade.depth.max(depth[id.index()]);
            }
        }

        let mut sync = SyncGraph::with_nodes(len);
        for (id, def) in table.iter() {
            let Some(rule) = def.sync_rule() else {
                continue;
            };
            let Some(&target) = index.get(rule.target.as_str()) else {
                return Err(ConfigurationError::UnknownSyncTarget {
                    setting: def.name().to_string(),
                    target: rule.target.clone(),
                });
            };
            sync.declare(id, target, rule.mode);
        }

        let condensed = condense(&sync).map_err(|cycle| cyclic(&nodes, &cycle))?;
        if let Some(cycle) = condensed.find_cycle(&sync) {
            return Err(cyclic(&nodes, &cycle));
        }
        let (sync_order, sync_depth) = condensed.topological(&sync);

        tracing::debug!(
            settings = len,
            cascade_edges = cascade.edge_count(),
            sync_edges = sync.edges().len(),
            cascade_depth = cascade.depth,
            sync_depth,
            "built settings dependency graph"
        );

        Ok(Self {
            nodes,
            index,
            cascade,
            sync,
            sync_order,
            sync_depth,
        })
    }
}

fn cyclic<V>(nodes: &[Node<V>], cycle: &CyclePath) -> ConfigurationError {
    let path: Vec<String> = cycle
        .settings()
        .iter()
        .map(|id| nodes[id.index()].name.clone())
        .collect();
    tracing::warn!(cycle = %path.join(" -> "), "rejected cyclic sync dependency");
    ConfigurationError::CyclicSync { path }
}

impl<V> DependencyGraph<V> {
    /// Number of settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves a setting name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<SettingId> {
        self.index.get(name).copied()
    }

    /// Returns the name of `id`, if in range.
    #[must_use]
    pub fn name(&self, id: SettingId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.name.as_str())
    }

    /// Returns the `(enabled, disabled)` values cascades write into `id`.
    #[must_use]
    pub fn values(&self, id: SettingId) -> Option<(&V, &V)> {
        self.nodes.get(id.index()).map(|n| (&n.enabled, &n.disabled))
    }

    pub(crate) fn node(&self, id: SettingId) -> &Node<V> {
        &self.nodes[id.index()]
    }

    /// Cascade adjacency.
    #[must_use]
    pub fn cascade(&self) -> &CascadeGraph {
        &self.cascade
    }

    /// Sync adjacency.
    #[must_use]
    pub fn sync(&self) -> &SyncGraph {
        &self.sync
    }

    /// All settings in sync dependency order.
    ///
    /// Every sync source precedes the settings it writes to; settings joined by
    /// bidirectional rules are adjacent. Ties follow declaration order.
    #[must_use]
    pub fn sync_order(&self) -> &[SettingId] {
        &self.sync_order
    }

    /// Length (in hops) of the longest sync chain.
    #[must_use]
    pub fn sync_depth(&self) -> usize {
        self.sync_depth
    }

    /// Iteration cap derived from the graph's shape.
    ///
    /// `settings * (cascade depth + sync depth + 2)`, but never less than
    /// [`MIN_ITERATION_CAP`].
    #[must_use]
    pub fn propagation_bound(&self) -> usize {
        let per_setting = self.cascade.depth + self.sync_depth + 2;
        self.nodes
            .len()
            .saturating_mul(per_setting)
            .max(MIN_ITERATION_CAP)
    }
}
