// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Settings: a dependency engine for hierarchical settings.
//!
//! Settings form a forest (each setting may be nested in a parent) and may
//! additionally be linked by sync rules. This crate compiles a set of
//! definitions into a validated graph once, then computes, for any set of
//! changed settings, every other setting that must change with them.
//!
//! - **Definitions** ([`SettingDef`], [`SettingTable`]): names, nesting,
//!   [`Cascade`] triggers, [`SyncRule`]s and the values cascades write.
//! - **Graph building** ([`DependencyGraph::build`]): resolves sync targets by
//!   name and rejects duplicates, dangling parents, unknown targets and
//!   cyclic sync relations with a [`ConfigurationError`].
//! - **Cycle detection** ([`detect_cycle`]): reports the full cycle, e.g.
//!   `a -> b -> a`, rather than just a yes/no.
//! - **Propagation** ([`propagate`], [`Propagator`]): breadth-first waves
//!   over cascade and sync edges producing a deduplicated
//!   [`PendingChangeSet`], guarded by an [`IterationCap`].
//! - **Engine** ([`DependencyEngine`], [`Compiler`]): compile passes plus a
//!   plan/apply facade over any [`SettingStore`].
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_settings::{Cascade, DependencyGraph, SettingDef, SettingTable, SyncMode, propagate};
//!
//! let mut table = SettingTable::new();
//! let notifications = table.add(SettingDef::new("notifications").cascade(Cascade::all()));
//! let email = table.add(SettingDef::new("email").nested_in(notifications));
//! let digest = table.add(SettingDef::new("digest").sync("email", SyncMode::Forward));
//!
//! let graph = DependencyGraph::build(&table).unwrap();
//!
//! // Everything starts off; turning notifications on turns email on, and the
//! // digest mirrors email.
//! let changes = propagate(&graph, [(notifications, true)], |_| false).unwrap();
//! let written: Vec<_> = changes.iter().map(|c| (c.setting, c.new)).collect();
//! assert_eq!(written, [(notifications, true), (email, true), (digest, true)]);
//! assert_eq!(changes.explain(digest).unwrap(), [notifications, email, digest]);
//! ```
//!
//! ## Rejected Models
//!
//! ```rust
//! use understory_settings::{ConfigurationError, DependencyGraph, SettingDef, SettingTable, SyncMode};
//!
//! let mut table = SettingTable::<bool>::new();
//! table.add(SettingDef::new("a").sync("b", SyncMode::Forward));
//! table.add(SettingDef::new("b").sync("a", SyncMode::Forward));
//!
//! let err = DependencyGraph::build(&table).unwrap_err();
//! assert_eq!(err, ConfigurationError::CyclicSync { path: vec!["a".into(), "b".into(), "a".into()] });
//! assert_eq!(err.to_string(), "cyclic sync dependency: a -> b -> a");
//! ```
//!
//! ## Propagation
//!
//! A run is a breadth-first walk starting from the changed settings. Each
//! write that would change a setting is recorded and expanded: cascades write
//! each child's own enabled/disabled value when the parent's transition
//! matches one of its triggers, sync edges carry the value (or the opposite
//! state, for inverse rules) to the settings that follow it, and a
//! [`ChangeHook`] may enqueue more writes. Writes found while processing wave
//! `n` belong to wave `n + 1`; when several paths reach the same setting the
//! last write wins. Every recorded write counts against the
//! [`IterationCap`], and crossing it returns [`InfiniteCascadeError`] with no
//! partial result.
//!
//! ## Values
//!
//! Propagation is generic over [`SettingValue`]. `bool` is the common case;
//! [`Value`] covers dynamically typed models where a cascade writes, say,
//! `"daily"` into a frequency setting rather than `true`.
//!
//! ## Logging
//!
//! Graph building and propagation emit [`tracing`] events: `debug` summaries
//! per build and per run, `trace` per recorded change, and `warn` when a
//! cyclic model is rejected or a run exceeds its cap.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`SettingNode`] trees, [`Value`],
//!   [`SyncMode`] and [`PropagationConfig`].

#![no_std]

extern crate alloc;

mod changes;
mod config;
mod cycle;
mod definition;
mod engine;
mod error;
mod graph;
mod id;
mod propagate;
mod table;
mod tree;
mod value;

pub use changes::{Cause, Change, PendingChangeSet};
pub use config::{IterationCap, PropagationConfig};
pub use cycle::{CyclePath, detect_cycle};
pub use definition::{Cascade, SettingDef, SyncMode, SyncRule};
pub use engine::{CompilePass, Compiler, DependencyEngine, SettingStore};
pub use error::{ConfigurationError, Error, InfiniteCascadeError};
pub use graph::{CascadeGraph, DependencyGraph, MIN_ITERATION_CAP, SyncEdge, SyncGraph};
pub use id::SettingId;
pub use propagate::{ChangeHook, FollowUps, NoHooks, Propagator, propagate};
pub use table::SettingTable;
pub use tree::{CascadeOn, SettingNode, SyncDecl};
pub use value::{SettingValue, Value};
