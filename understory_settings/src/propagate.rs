// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wave-based propagation of setting changes.
//!
//! Propagation is a breadth-first walk over the cascade and sync edges of a
//! [`DependencyGraph`], starting from the settings that were assigned. Every
//! popped write is either skipped (it would not change anything) or recorded
//! in the [`PendingChangeSet`] and expanded:
//!
//! - cascades write each child's own enabled/disabled value when the parent's
//!   transition matches one of its [`Cascade`](crate::Cascade) triggers;
//! - sync edges carry the value (or, for inverse rules, the opposite state) to
//!   every setting that follows the changed one;
//! - the [`ChangeHook`], if any, may enqueue follow-up writes.
//!
//! Writes discovered while processing wave `n` belong to wave `n + 1`, so a
//! setting's effects are only computed after its own value is settled for
//! that wave. When several paths reach the same setting, the last write wins.
//!
//! Every recorded write counts as one iteration. Crossing the
//! [`IterationCap`](crate::IterationCap) aborts the run with
//! [`InfiniteCascadeError`]; no partial write set is returned.

use alloc::collections::VecDeque;

use crate::changes::{Cause, Change, PendingChangeSet};
use crate::config::PropagationConfig;
use crate::definition::SyncMode;
use crate::error::InfiniteCascadeError;
use crate::graph::DependencyGraph;
use crate::id::SettingId;
use crate::value::SettingValue;

/// Observer of recorded changes that can request further writes.
///
/// This is where host callbacks plug in. A hook that keeps undoing the writes
/// it observes is exactly the kind of runaway the iteration cap exists for.
///
/// # Example
///
/// ```
/// use understory_settings::{
///     Change, ChangeHook, DependencyGraph, FollowUps, Propagator, SettingDef, SettingTable,
/// };
///
/// /// Turning on `beta` also turns on `telemetry`.
/// struct BetaNeedsTelemetry {
///     beta: understory_settings::SettingId,
///     telemetry: understory_settings::SettingId,
/// }
///
/// impl ChangeHook<bool> for BetaNeedsTelemetry {
///     fn after_change(&mut self, change: &Change<bool>, follow_ups: &mut FollowUps<'_, bool>) {
///         if change.setting == self.beta && change.new {
///             follow_ups.write(self.telemetry, true);
///         }
///     }
/// }
///
/// let mut table = SettingTable::new();
/// let beta = table.add(SettingDef::new("beta"));
/// let telemetry = table.add(SettingDef::new("telemetry"));
/// let graph = DependencyGraph::build(&table).unwrap();
///
/// let changes = Propagator::new(&graph)
///     .hook(BetaNeedsTelemetry { beta, telemetry })
///     .run([(beta, true)], |_| false)
///     .unwrap();
/// assert_eq!(changes.new_value(telemetry), Some(&true));
/// ```
pub trait ChangeHook<V> {
    /// Called after `change` was recorded and its cascade/sync effects were
    /// enqueued.
    fn after_change(&mut self, change: &Change<V>, follow_ups: &mut FollowUps<'_, V>);
}

/// A hook that does nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl<V> ChangeHook<V> for NoHooks {
    #[inline]
    fn after_change(&mut self, _change: &Change<V>, _follow_ups: &mut FollowUps<'_, V>) {}
}

impl<V, H> ChangeHook<V> for &mut H
where
    H: ChangeHook<V> + ?Sized,
{
    fn after_change(&mut self, change: &Change<V>, follow_ups: &mut FollowUps<'_, V>) {
        (**self).after_change(change, follow_ups);
    }
}

#[derive(Debug)]
struct Pending<V> {
    setting: SettingId,
    value: V,
    cause: Cause,
    wave: usize,
}

/// Handle a [`ChangeHook`] uses to enqueue writes into the next wave.
#[derive(Debug)]
pub struct FollowUps<'a, V> {
    queue: &'a mut VecDeque<Pending<V>>,
    from: SettingId,
    wave: usize,
}

impl<V> FollowUps<'_, V> {
    /// Enqueues a write of `value` to `setting`.
    pub fn write(&mut self, setting: SettingId, value: V) {
        self.queue.push_back(Pending {
            setting,
            value,
            cause: Cause::Hook { from: self.from },
            wave: self.wave,
        });
    }

    /// The setting whose change is being observed.
    #[must_use]
    pub fn source(&self) -> SettingId {
        self.from
    }
}

/// Configurable propagation run over one graph.
///
/// See the [crate docs](crate#propagation) for the algorithm. A propagator is
/// cheap to create; build one per run or keep one around to reuse its hook.
#[derive(Debug)]
pub struct Propagator<'g, V, H = NoHooks> {
    graph: &'g DependencyGraph<V>,
    config: PropagationConfig,
    hook: H,
}

impl<'g, V: SettingValue> Propagator<'g, V> {
    /// Creates a propagator with the default config and no hook.
    #[must_use]
    pub fn new(graph: &'g DependencyGraph<V>) -> Self {
        Self {
            graph,
            config: PropagationConfig::default(),
            hook: NoHooks,
        }
    }
}

impl<'g, V, H> Propagator<'g, V, H>
where
    V: SettingValue,
    H: ChangeHook<V>,
{
    /// Replaces the config.
    #[must_use]
    pub fn config(mut self, config: PropagationConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the hook.
    #[must_use]
    pub fn hook<H2: ChangeHook<V>>(self, hook: H2) -> Propagator<'g, V, H2> {
        Propagator {
            graph: self.graph,
            config: self.config,
            hook,
        }
    }

    /// Consumes the propagator, returning its hook.
    #[must_use]
    pub fn into_hook(self) -> H {
        self.hook
    }

    /// Computes the full write set caused by `changed`.
    ///
    /// `read_current` returns a setting's value before propagation; it is
    /// called at most once per setting, and only for settings that are
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns [`InfiniteCascadeError`] if more changes than the configured
    /// cap were processed.
    ///
    /// # Panics
    ///
    /// Panics if a seed or hook write names a setting outside the graph.
    pub fn run(
        &mut self,
        changed: impl IntoIterator<Item = (SettingId, V)>,
        mut read_current: impl FnMut(SettingId) -> V,
    ) -> Result<PendingChangeSet<V>, InfiniteCascadeError> {
        let graph = self.graph;
        let cap = self.config.iteration_cap.resolve(graph);
        let mut queue: VecDeque<Pending<V>> = changed
            .into_iter()
            .map(|(setting, value)| Pending {
                setting,
                value,
                cause: Cause::Seed,
                wave: 0,
            })
            .collect();
        let mut changes = PendingChangeSet::new();
        let mut iterations = 0_usize;

        while let Some(Pending {
            setting,
            value,
            cause,
            wave,
        }) = queue.pop_front()
        {
            let slot = match changes.slot(setting) {
                Some(slot) => {
                    if changes.at(slot).new == value {
                        continue;
                    }
                    tick(&mut iterations, cap, setting)?;
                    changes.overwrite(slot, value.clone(), cause, wave);
                    slot
                }
                None => {
                    let old = read_current(setting);
                    if old == value {
                        continue;
                    }
                    tick(&mut iterations, cap, setting)?;
                    changes.insert(Change {
                        setting,
                        old,
                        new: value.clone(),
                        wave,
                        cause,
                    })
                }
            };

            let enabled = value.is_enabled();
            let next = wave + 1;

            if graph.cascade().triggers(setting).fires_on(enabled) {
                for (child, _) in graph.cascade().children(setting) {
                    let node = graph.node(child);
                    let value = if enabled {
                        node.enabled.clone()
                    } else {
                        node.disabled.clone()
                    };
                    queue.push_back(Pending {
                        setting: child,
                        value,
                        cause: Cause::Cascade { from: setting },
                        wave: next,
                    });
                }
            }

            for edge in graph.sync().edges_from(setting) {
                let carried = match edge.mode {
                    SyncMode::Inverse => {
                        let node = graph.node(edge.target);
                        if enabled {
                            node.disabled.clone()
                        } else {
                            node.enabled.clone()
                        }
                    }
                    SyncMode::Forward | SyncMode::Bidirectional | SyncMode::Backward => {
                        value.clone()
                    }
                };
                queue.push_back(Pending {
                    setting: edge.target,
                    value: carried,
                    cause: Cause::Sync {
                        from: setting,
                        mode: edge.mode,
                    },
                    wave: next,
                });
            }

            tracing::trace!(
                setting = graph.node(setting).name.as_str(),
                wave,
                iterations,
                "recorded setting change"
            );

            let mut follow_ups = FollowUps {
                queue: &mut queue,
                from: setting,
                wave: next,
            };
            self.hook.after_change(changes.at(slot), &mut follow_ups);
        }

        let changes = changes.finish();
        tracing::debug!(
            changes = changes.len(),
            iterations,
            cap,
            "settings propagation settled"
        );
        Ok(changes)
    }
}

fn tick(iterations: &mut usize, cap: usize, setting: SettingId) -> Result<(), InfiniteCascadeError> {
    *iterations += 1;
    if *iterations > cap {
        tracing::warn!(
            iterations = *iterations,
            cap,
            setting = setting.as_u32(),
            "settings propagation exceeded its iteration cap"
        );
        return Err(InfiniteCascadeError {
            iterations: *iterations,
            cap,
            setting,
        });
    }
    Ok(())
}

/// Computes the write set for `changed` with the default config and no hook.
///
/// Shorthand for `Propagator::new(graph).run(changed, read_current)`.
///
/// # Example
///
/// ```
/// use understory_settings::{Cascade, DependencyGraph, SettingDef, SettingTable, propagate};
///
/// let mut table = SettingTable::new();
/// let parent = table.add(SettingDef::new("parent").cascade(Cascade::ENABLE));
/// let child = table.add(SettingDef::new("child").nested_in(parent));
/// let graph = DependencyGraph::build(&table).unwrap();
///
/// let changes = propagate(&graph, [(parent, true)], |_| false).unwrap();
/// assert_eq!(changes.new_value(child), Some(&true));
///
/// // Only `ENABLE` cascades: disabling leaves the child alone.
/// let changes = propagate(&graph, [(parent, false)], |_| true).unwrap();
/// assert!(!changes.contains(child));
/// ```
///
/// # Errors
///
/// See [`Propagator::run`].
pub fn propagate<V: SettingValue>(
    graph: &DependencyGraph<V>,
    changed: impl IntoIterator<Item = (SettingId, V)>,
    read_current: impl FnMut(SettingId) -> V,
) -> Result<PendingChangeSet<V>, InfiniteCascadeError> {
    Propagator::new(graph).run(changed, read_current)
}
