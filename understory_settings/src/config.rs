// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Propagation configuration.

use crate::graph::DependencyGraph;

/// How many changes a single propagation may process before it is declared
/// runaway.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IterationCap {
    /// Derive the cap from the graph: see
    /// [`DependencyGraph::propagation_bound`].
    #[default]
    Static,
    /// Use this exact cap.
    Fixed(usize),
}

impl IterationCap {
    /// Returns the concrete cap for `graph`.
    #[must_use]
    pub fn resolve<V>(self, graph: &DependencyGraph<V>) -> usize {
        match self {
            Self::Static => graph.propagation_bound(),
            Self::Fixed(cap) => cap,
        }
    }
}

/// Runtime knobs for propagation.
///
/// # Example
///
/// ```
/// use understory_settings::{IterationCap, PropagationConfig};
///
/// let config = PropagationConfig::default();
/// assert_eq!(config.iteration_cap, IterationCap::Static);
///
/// let strict = PropagationConfig::with_cap(IterationCap::Fixed(16));
/// assert_eq!(strict.iteration_cap, IterationCap::Fixed(16));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PropagationConfig {
    /// Runaway guard.
    pub iteration_cap: IterationCap,
}

impl PropagationConfig {
    /// Creates a config with the given cap.
    #[must_use]
    pub const fn with_cap(iteration_cap: IterationCap) -> Self {
        Self { iteration_cap }
    }
}
