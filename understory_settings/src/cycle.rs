// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sync cycle detection.
//!
//! A bidirectional rule is stored as two opposite edges, so the raw sync
//! adjacency always contains a two-node loop for every such rule. Those loops
//! are harmless: both ends simply hold the same value. Detection therefore
//! works on a condensed view:
//!
//! 1. Settings joined by bidirectional links are merged into one component.
//!    The links must form a forest; a link between settings that are already
//!    joined closes a cycle.
//! 2. The remaining one-way edges (forward, inverse, backward) must form a DAG
//!    between components, checked with white/gray/black DFS.
//!
//! Whenever a cycle is found, the full setting path is reconstructed, walking
//! through the link forest inside components where needed.

use alloc::collections::{BinaryHeap, VecDeque};
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Reverse;

use smallvec::SmallVec;

use crate::definition::SyncMode;
use crate::graph::SyncGraph;
use crate::id::SettingId;

/// A directed cycle in the sync relation.
///
/// The path starts and ends at the same setting, e.g. `[a, b, c, a]`. A
/// setting syncing with itself yields `[a, a]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CyclePath(Vec<SettingId>);

impl CyclePath {
    /// The settings along the cycle, first and last being equal.
    #[must_use]
    pub fn settings(&self) -> &[SettingId] {
        &self.0
    }

    /// Consumes the path, returning the settings.
    #[must_use]
    pub fn into_vec(self) -> Vec<SettingId> {
        self.0
    }
}

/// Checks the sync relation for directed cycles.
///
/// Returns `None` if the relation is acyclic, or the first cycle found.
/// Components are explored in declaration order and edges in insertion order,
/// so the reported path is deterministic for a given table.
#[must_use]
pub fn detect_cycle(sync: &SyncGraph) -> Option<CyclePath> {
    match condense(sync) {
        Ok(condensed) => condensed.find_cycle(sync),
        Err(cycle) => Some(cycle),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Debug)]
struct Frame {
    component: usize,
    /// Edge used to enter this component; `None` for DFS roots.
    via: Option<usize>,
    next: usize,
}

#[derive(Debug)]
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns `false` if `a` and `b` were already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[hi] = lo;
        true
    }
}

/// The sync relation with bidirectional links collapsed into components.
#[derive(Debug)]
pub(crate) struct Condensation {
    /// Component of each setting.
    component: Vec<usize>,
    /// Members of each component, in declaration order. Component indices are
    /// ordered by their first member.
    members: Vec<Vec<SettingId>>,
    /// One-way edge indices leaving each component.
    out: Vec<Vec<usize>>,
    /// Accepted bidirectional links, as an undirected forest.
    tree: Vec<SmallVec<[SettingId; 2]>>,
}

/// Collapses bidirectional links, failing if they close a loop.
pub(crate) fn condense(sync: &SyncGraph) -> Result<Condensation, CyclePath> {
    let n = sync.node_count();
    let mut sets = DisjointSets::new(n);
    let mut tree: Vec<SmallVec<[SettingId; 2]>> = vec![SmallVec::new(); n];

    for &(a, b) in sync.links() {
        if !sets.union(a.index(), b.index()) {
            let mut path = vec![a];
            path.extend(tree_path(&tree, b, a));
            return Err(CyclePath(path));
        }
        tree[a.index()].push(b);
        tree[b.index()].push(a);
    }

    let mut component = vec![usize::MAX; n];
    let mut dense = vec![usize::MAX; n];
    let mut members: Vec<Vec<SettingId>> = Vec::new();
    for node in 0..n {
        let root = sets.find(node);
        if dense[root] == usize::MAX {
            dense[root] = members.len();
            members.push(Vec::new());
        }
        component[node] = dense[root];
        members[dense[root]].push(SettingId::new(node));
    }

    let mut out = vec![Vec::new(); members.len()];
    for (idx, edge) in sync.edges().iter().enumerate() {
        if edge.mode != SyncMode::Bidirectional {
            out[component[edge.source.index()]].push(idx);
        }
    }

    Ok(Condensation {
        component,
        members,
        out,
        tree,
    })
}

impl Condensation {
    fn component_of(&self, id: SettingId) -> usize {
        self.component[id.index()]
    }

    /// White/gray/black DFS over the one-way edges between components.
    pub(crate) fn find_cycle(&self, sync: &SyncGraph) -> Option<CyclePath> {
        let edges = sync.edges();
        let mut color = vec![Color::White; self.members.len()];
        let mut stack: Vec<Frame> = Vec::new();

        for root in 0..self.members.len() {
            if color[root] != Color::White {
                continue;
            }
            color[root] = Color::Gray;
            stack.push(Frame {
                component: root,
                via: None,
                next: 0,
            });

            while let Some(top) = stack.last_mut() {
                let Some(&edge) = self.out[top.component].get(top.next) else {
                    color[top.component] = Color::Black;
                    stack.pop();
                    continue;
                };
                top.next += 1;

                let target = self.component_of(edges[edge].target);
                match color[target] {
                    Color::White => {
                        color[target] = Color::Gray;
                        stack.push(Frame {
                            component: target,
                            via: Some(edge),
                            next: 0,
                        });
                    }
                    Color::Gray => {
                        let start = stack
                            .iter()
                            .position(|frame| frame.component == target)
                            .expect("gray components are on the stack");
                        let mut arcs: Vec<usize> =
                            stack[start + 1..].iter().filter_map(|f| f.via).collect();
                        arcs.push(edge);
                        return Some(self.expand(sync, &arcs));
                    }
                    Color::Black => {}
                }
            }
        }

        None
    }

    /// Turns a cycle of component-level edges into a setting path.
    fn expand(&self, sync: &SyncGraph, arcs: &[usize]) -> CyclePath {
        let edges = sync.edges();
        let first = edges[arcs[arcs.len() - 1]].target;
        let mut path = vec![first];
        let mut at = first;
        for &arc in arcs {
            let edge = &edges[arc];
            path.extend(tree_path(&self.tree, at, edge.source).into_iter().skip(1));
            path.push(edge.target);
            at = edge.target;
        }
        CyclePath(path)
    }

    /// Topological order of settings and the longest sync chain.
    ///
    /// Ready components are taken smallest-first (Kahn's algorithm with a
    /// min-heap), so the order only depends on declaration order. The chain
    /// length counts edges along the longest path, where a component counts
    /// as many hops as it has extra members. Must only be called on an
    /// acyclic condensation.
    pub(crate) fn topological(&self, sync: &SyncGraph) -> (Vec<SettingId>, usize) {
        let edges = sync.edges();
        let k = self.members.len();
        let mut in_degree = vec![0_usize; k];
        for out in &self.out {
            for &edge in out {
                in_degree[self.component_of(edges[edge].target)] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = (0..k)
            .filter(|&c| in_degree[c] == 0)
            .map(Reverse)
            .collect();
        let mut chain = vec![0_usize; k];
        let mut order = Vec::with_capacity(sync.node_count());
        let mut longest = 0;

        while let Some(Reverse(c)) = ready.pop() {
            let reach = chain[c] + self.members[c].len();
            longest = longest.max(reach);
            order.extend_from_slice(&self.members[c]);
            for &edge in &self.out[c] {
                let t = self.component_of(edges[edge].target);
                chain[t] = chain[t].max(reach);
                in_degree[t] -= 1;
                if in_degree[t] == 0 {
                    ready.push(Reverse(t));
                }
            }
        }

        (order, longest.saturating_sub(1))
    }
}

/// Path between two settings in the link forest, inclusive of both ends.
fn tree_path(tree: &[SmallVec<[SettingId; 2]>], from: SettingId, to: SettingId) -> Vec<SettingId> {
    let mut prev: Vec<Option<SettingId>> = vec![None; tree.len()];
    let mut seen = vec![false; tree.len()];
    let mut queue = VecDeque::new();
    seen[from.index()] = true;
    queue.push_back(from);

    while let Some(at) = queue.pop_front() {
        if at == to {
            break;
        }
        for &next in &tree[at.index()] {
            if !seen[next.index()] {
                seen[next.index()] = true;
                prev[next.index()] = Some(at);
                queue.push_back(next);
            }
        }
    }

    let mut path = vec![to];
    let mut at = to;
    while let Some(p) = prev[at.index()] {
        path.push(p);
        at = p;
    }
    path.reverse();
    path
}
