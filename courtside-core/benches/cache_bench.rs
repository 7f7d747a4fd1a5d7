//! Criterion benchmarks for the cache hot paths.
//!
//! Benchmarks:
//! 1. Fast-tier hit (clone of a cached frame)
//! 2. Shared-tier hit (column-map decode, conform, fast-tier refill)
//! 3. Set through both tiers (column-map encode)
//! 4. Plain column-map round trip at several sizes

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;

use courtside_core::data::assemble::{conform_games, games_to_frame};
use courtside_core::data::shared_tier::MemoryTier;
use courtside_core::data::{CacheStore, TableSnapshot};
use courtside_core::domain::GameRecord;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_games(n: usize) -> Vec<GameRecord> {
    let opener = NaiveDate::from_ymd_opt(2024, 10, 22).unwrap();
    (0..n)
        .map(|i| GameRecord {
            game_id: format!("00224{i:05}"),
            game_date: Some(opener + chrono::Duration::days(i as i64 * 2)),
            matchup: if i % 2 == 0 { "TOR vs. BOS" } else { "TOR @ NYK" }.to_string(),
            wl: if i % 3 == 0 { "W" } else { "L" }.to_string(),
            points: 95 + (i % 30) as i32,
            field_goal_pct: Some(0.40 + (i % 10) as f64 * 0.01),
            three_pt_pct: Some(0.30 + (i % 8) as f64 * 0.01),
            rebounds: 38 + (i % 12) as i32,
            assists: 20 + (i % 9) as i32,
            season: "2024-25".to_string(),
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get");
    let df = games_to_frame(&make_games(82)).unwrap();

    let fast = CacheStore::in_process();
    fast.set("team_games:2024-25", &df, Duration::from_secs(3600));
    group.bench_function("fast_tier_hit_82_games", |b| {
        b.iter(|| black_box(fast.get(black_box("team_games:2024-25"))))
    });

    let tier = Arc::new(MemoryTier::new());
    CacheStore::with_shared(tier.clone()).set("team_games:2024-25", &df, Duration::from_secs(3600));
    group.bench_function("shared_tier_hit_82_games", |b| {
        b.iter(|| {
            // Fresh store each time so the fast tier is cold.
            let reader = CacheStore::with_shared(tier.clone());
            black_box(reader.get_conformed(black_box("team_games:2024-25"), conform_games))
        })
    });

    group.finish();
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_set");
    let df = games_to_frame(&make_games(82)).unwrap();
    let store = CacheStore::with_shared(Arc::new(MemoryTier::new()));

    group.bench_function("both_tiers_82_games", |b| {
        b.iter(|| store.set(black_box("team_games:2024-25"), &df, Duration::from_secs(3600)))
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_snapshot");

    for n in [82usize, 246, 1230] {
        let df = games_to_frame(&make_games(n)).unwrap();
        group.bench_with_input(BenchmarkId::new("plain_json_roundtrip", n), &df, |b, df| {
            b.iter(|| {
                let plain = TableSnapshot::from_frame(df).unwrap().to_plain_columns();
                let json = serde_json::to_string(&plain).unwrap();
                let value: serde_json::Value = serde_json::from_str(&json).unwrap();
                let back = TableSnapshot::from_plain_columns(&value).unwrap();
                black_box(back.to_frame().unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_get, bench_set, bench_snapshot);
criterion_main!(benches);
