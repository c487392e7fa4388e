// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tests for `understory_settings`.
//!
//! These build small but realistic setting models, compile them, and check the
//! exact write sets propagation produces.

use understory_settings::{
    Cascade, Cause, ConfigurationError, DependencyEngine, DependencyGraph, Error, SettingDef,
    SettingId, SettingTable, SyncMode, Value, propagate,
};

fn chain_of_cascades(len: usize) -> (SettingTable<bool>, Vec<SettingId>) {
    let mut table = SettingTable::new();
    let mut ids = Vec::new();
    for i in 0..len {
        let mut def = SettingDef::new(format!("level_{i}")).cascade(Cascade::all());
        if let Some(&parent) = ids.last() {
            def = def.nested_in(parent);
        }
        ids.push(table.add(def));
    }
    (table, ids)
}

#[test]
fn five_level_cascade_reaches_every_descendant() {
    let (table, ids) = chain_of_cascades(6);
    let graph = DependencyGraph::build(&table).unwrap();
    assert_eq!(graph.cascade().depth(), 5);
    assert_eq!(table.get(ids[5]).unwrap().name(), "level_5");

    let changes = propagate(&graph, [(ids[0], true)], |_| false).unwrap();

    let side_effects: Vec<_> = changes.side_effects().map(|c| (c.setting, c.new)).collect();
    assert_eq!(
        side_effects,
        [
            (ids[1], true),
            (ids[2], true),
            (ids[3], true),
            (ids[4], true),
            (ids[5], true)
        ]
    );
    let waves: Vec<_> = changes.iter().map(|c| c.wave).collect();
    assert_eq!(waves, [0, 1, 2, 3, 4, 5]);
    assert_eq!(changes.explain(ids[5]).unwrap(), ids);
}

#[test]
fn cascade_from_the_middle_leaves_ancestors_alone() {
    let (table, ids) = chain_of_cascades(5);
    let graph = DependencyGraph::build(&table).unwrap();

    let changes = propagate(&graph, [(ids[2], false)], |_| true).unwrap();
    let written: Vec<_> = changes.iter().map(|c| c.setting).collect();
    assert_eq!(written, &ids[2..]);
}

#[test]
fn five_deep_sync_chain_propagates_in_order() {
    // Each target follows the one before it.
    let mut table = SettingTable::new();
    let source = table.add(SettingDef::new("source"));
    let target_1 = table.add(SettingDef::new("target_1").sync("source", SyncMode::Forward));
    let target_2 = table.add(SettingDef::new("target_2").sync("target_1", SyncMode::Forward));
    let target_3 = table.add(SettingDef::new("target_3").sync("target_2", SyncMode::Forward));
    let target_4 = table.add(SettingDef::new("target_4").sync("target_3", SyncMode::Forward));
    let target_5 = table.add(SettingDef::new("target_5").sync("target_4", SyncMode::Forward));
    let ids = [source, target_1, target_2, target_3, target_4, target_5];
    let graph = DependencyGraph::build(&table).unwrap();
    assert_eq!(graph.sync_depth(), 5);
    assert_eq!(graph.sync_order(), &ids[..]);

    let changes = propagate(&graph, [(source, true)], |_| false).unwrap();
    assert_eq!(changes.len(), 6);
    for (wave, change) in changes.iter().enumerate() {
        assert_eq!(change.setting, ids[wave]);
        assert_eq!(change.wave, wave);
        assert!(change.new);
    }
    assert_eq!(
        changes.get(target_5).unwrap().cause,
        Cause::Sync {
            from: target_4,
            mode: SyncMode::Forward
        }
    );
}

#[test]
fn mutual_forward_sync_is_rejected_with_full_path() {
    let mut table = SettingTable::<bool>::new();
    table.add(SettingDef::new("a").sync("b", SyncMode::Forward));
    table.add(SettingDef::new("b").sync("a", SyncMode::Forward));

    let err = DependencyGraph::build(&table).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::CyclicSync {
            path: vec!["a".into(), "b".into(), "a".into()]
        }
    );
}

#[test]
fn longer_cycle_is_reported_from_its_first_setting() {
    let mut table = SettingTable::<bool>::new();
    table.add(SettingDef::new("free"));
    table.add(SettingDef::new("x").sync("y", SyncMode::Forward));
    table.add(SettingDef::new("y").sync("z", SyncMode::Forward));
    table.add(SettingDef::new("z").sync("x", SyncMode::Forward));

    let err = DependencyGraph::build(&table).unwrap_err();
    assert_eq!(err.to_string(), "cyclic sync dependency: x -> z -> y -> x");
}

#[test]
fn enable_only_cascade_ignores_disable() {
    let mut table = SettingTable::new();
    let parent = table.add(SettingDef::new("parent").cascade(Cascade::ENABLE));
    let child = table.add(SettingDef::new("child").nested_in(parent));
    let graph = DependencyGraph::build(&table).unwrap();

    let changes = propagate(&graph, [(parent, false)], |_| true).unwrap();
    assert_eq!(changes.side_effects().count(), 0);
    assert!(!changes.contains(child));
    assert_eq!(changes.new_value(parent), Some(&false));

    let changes = propagate(&graph, [(parent, true)], |_| false).unwrap();
    assert_eq!(changes.new_value(child), Some(&true));
}

#[test]
fn unknown_sync_target_is_rejected() {
    let mut table = SettingTable::<bool>::new();
    table.add(SettingDef::new("a").sync("nonexistent", SyncMode::Forward));

    let err = DependencyGraph::build(&table).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::UnknownSyncTarget {
            setting: "a".into(),
            target: "nonexistent".into()
        }
    );
    assert_eq!(
        err.to_string(),
        "setting `a` syncs with unknown setting `nonexistent`"
    );
}

#[test]
fn bidirectional_sync_mirrors_both_ways() {
    let mut table = SettingTable::new();
    let dark = table.add(SettingDef::new("dark_mode").sync("high_contrast", SyncMode::Bidirectional));
    let contrast = table.add(SettingDef::new("high_contrast"));
    let graph = DependencyGraph::build(&table).unwrap();

    let forward = propagate(&graph, [(dark, true)], |_| false).unwrap();
    assert_eq!(forward.new_value(contrast), Some(&true));

    let backward = propagate(&graph, [(contrast, true)], |_| false).unwrap();
    assert_eq!(backward.new_value(dark), Some(&true));
    assert_eq!(backward.len(), 2);
}

#[test]
fn cascade_then_sync_crosses_subtrees() {
    let mut table = SettingTable::<Value>::new();
    let notifications = table.add(SettingDef::new("notifications").cascade(Cascade::all()));
    let email = table.add(
        SettingDef::new("email")
            .nested_in(notifications)
            .values(Value::from("weekly"), Value::Null),
    );
    let privacy = table.add(SettingDef::new("privacy").cascade(Cascade::DISABLE));
    let tracking = table.add(
        SettingDef::new("tracking")
            .nested_in(privacy)
            .sync("email", SyncMode::Forward),
    );
    let engine = DependencyEngine::compile(table).unwrap();

    let mut store = vec![Value::Null; 4];
    let changes = engine
        .apply(&mut store, [(notifications, Value::Bool(true))])
        .unwrap();
    assert_eq!(changes.len(), 3);
    assert_eq!(store[email.index()], Value::from("weekly"));
    assert_eq!(store[tracking.index()], Value::from("weekly"));
    assert_eq!(store[privacy.index()], Value::Null);
}

#[test]
fn engine_resolves_names() {
    let (table, ids) = chain_of_cascades(3);
    let engine = DependencyEngine::compile(table).unwrap();
    assert_eq!(engine.id("level_2").unwrap(), ids[2]);
    assert!(matches!(engine.id("level_9"), Err(Error::UnknownSetting(name)) if name == "level_9"));

    let changes = engine.plan_by_name([("level_1", true)], |_| false).unwrap();
    assert_eq!(changes.len(), 2);
}
