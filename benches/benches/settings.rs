// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_settings::{
    Cascade, DependencyGraph, SettingDef, SettingId, SettingTable, SyncMode, propagate,
};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

fn name(i: usize) -> String {
    format!("s{i}")
}

/// A random forest of `n` settings, all cascading both ways, with every
/// `sync_every`-th setting following a later one.
fn build_table(n: usize, sync_every: usize, seed: u64) -> SettingTable<bool> {
    let mut table = SettingTable::new();
    let mut rng = Lcg::new(seed);
    let mut ids = Vec::with_capacity(n);

    for i in 0..n {
        let mut def = SettingDef::new(name(i)).cascade(Cascade::all());
        // Roughly one root per 16 settings.
        if i > 0 && rng.gen_range_usize(16) != 0 {
            def = def.nested_in(ids[rng.gen_range_usize(i)]);
        }
        // Only sync into later settings so the sync relation stays acyclic.
        if i + 1 < n && i % sync_every == 0 {
            let target = i + 1 + rng.gen_range_usize(n - i - 1);
            def = def.sync(name(target), SyncMode::Forward);
        }
        ids.push(table.add(def));
    }

    table
}

fn roots(table: &SettingTable<bool>) -> Vec<SettingId> {
    table
        .iter()
        .filter(|(_, def)| def.parent().is_none())
        .map(|(id, _)| id)
        .collect()
}

fn bench_settings(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_settings");
    group.sample_size(50);

    for &(n, sync_every) in &[(256_usize, 8_usize), (256, 2), (4_096, 8), (4_096, 2)] {
        group.bench_function(format!("build_graph(n={n},sync_every={sync_every})"), |b| {
            b.iter_batched(
                || build_table(n, sync_every, 0x5E77_0000_0000_0001),
                |table| {
                    let graph = DependencyGraph::build(&table).expect("generated tables are valid");
                    black_box(graph);
                },
                BatchSize::LargeInput,
            );
        });

        let table = build_table(n, sync_every, 0x5E77_0000_0000_0002);
        let graph = DependencyGraph::build(&table).expect("generated tables are valid");
        let roots = roots(&table);

        group.bench_function(
            format!("enable_all_roots(n={n},sync_every={sync_every})"),
            |b| {
                b.iter(|| {
                    let changes = propagate(&graph, roots.iter().map(|&id| (id, true)), |_| false)
                        .expect("forest propagation settles");
                    black_box(changes.len());
                });
            },
        );

        group.bench_function(
            format!("disable_one_root(n={n},sync_every={sync_every})"),
            |b| {
                b.iter(|| {
                    let changes = propagate(&graph, [(roots[0], false)], |_| true)
                        .expect("forest propagation settles");
                    black_box(changes.len());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_settings);
criterion_main!(benches);
