// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Nothing here is transient. [`ConfigurationError`] means the setting
//! definitions are wrong and must be fixed; [`InfiniteCascadeError`] means a
//! single propagation ran away and produced no write set.

use alloc::string::String;
use alloc::vec::Vec;

use crate::id::SettingId;

/// A setting table that cannot be compiled.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A sync rule names a setting that does not exist.
    #[error("setting `{setting}` syncs with unknown setting `{target}`")]
    UnknownSyncTarget {
        /// The setting declaring the rule.
        setting: String,
        /// The unresolved target name.
        target: String,
    },
    /// The sync relation contains a directed cycle.
    #[error("cyclic sync dependency: {}", .path.join(" -> "))]
    CyclicSync {
        /// Setting names along the cycle; the first and last entries are equal.
        path: Vec<String>,
    },
    /// Two settings share a name.
    #[error("setting `{name}` is declared more than once")]
    DuplicateSetting {
        /// The repeated name.
        name: String,
    },
    /// A setting is nested in a parent that was not declared before it.
    #[error("setting `{setting}` is nested in undeclared parent {parent}")]
    UnknownParent {
        /// The nested setting.
        setting: String,
        /// The dangling parent id.
        parent: SettingId,
    },
    /// A compile pass refused the table.
    #[error("setting `{setting}` rejected: {reason}")]
    Rejected {
        /// The offending setting.
        setting: String,
        /// Why the pass rejected it.
        reason: String,
    },
}

/// Propagation exceeded its iteration cap.
///
/// The two numbers distinguish a legitimately large fan-out (raise the cap)
/// from a genuine runaway loop (the count is exactly `cap + 1` no matter how
/// high the cap goes).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(
    "propagation did not settle: {iterations} iterations exceeded the cap of {cap} (last setting {setting})"
)]
pub struct InfiniteCascadeError {
    /// Changes processed when propagation was aborted.
    pub iterations: usize,
    /// The cap in effect.
    pub cap: usize,
    /// The setting whose processing crossed the cap.
    pub setting: SettingId,
}

/// Any error produced by the [`DependencyEngine`](crate::DependencyEngine) facade.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Compilation failed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Propagation ran away.
    #[error(transparent)]
    InfiniteCascade(#[from] InfiniteCascadeError),
    /// A name passed at runtime does not name a compiled setting.
    #[error("unknown setting `{0}`")]
    UnknownSetting(String),
}
