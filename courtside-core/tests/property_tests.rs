//! Property tests for cache and assembly invariants.
//!
//! Uses proptest to verify:
//! 1. Hit-rate identity: hits + misses equals lookups, rate within [0, 1]
//! 2. Counter monotonicity between clears
//! 3. Rolling mean: defined exactly from index window - 1 on gap-free input

use polars::prelude::*;
use proptest::prelude::*;
use std::time::Duration;

use courtside_core::data::assemble::rolling_mean;
use courtside_core::data::CacheStore;

// ── Strategies (proptest) ────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Set(u8),
    Get(u8),
    Delete(u8),
    ApiCall,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Set),
        (0u8..6).prop_map(Op::Get),
        (0u8..6).prop_map(Op::Delete),
        Just(Op::ApiCall),
    ]
}

fn frame() -> DataFrame {
    DataFrame::new(vec![Column::new("PTS".into(), vec![100i32])]).unwrap()
}

// ── 1–2. Counters ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn hit_rate_identity(ops in prop::collection::vec(arb_op(), 0..60)) {
        let store = CacheStore::in_process();
        let mut lookups = 0u64;
        let mut last = store.get_stats();

        for op in &ops {
            match op {
                Op::Set(k) => store.set(&format!("k{k}"), &frame(), Duration::from_secs(60)),
                Op::Get(k) => {
                    store.get(&format!("k{k}"));
                    lookups += 1;
                }
                Op::Delete(k) => store.delete(&format!("k{k}")),
                Op::ApiCall => store.track_api_call(),
            }

            let stats = store.get_stats();
            prop_assert!(stats.hits >= last.hits);
            prop_assert!(stats.misses >= last.misses);
            prop_assert!(stats.api_calls >= last.api_calls);
            last = stats;
        }

        let stats = store.get_stats();
        prop_assert_eq!(stats.hits + stats.misses, lookups);
        let rate = stats.hit_rate();
        prop_assert!((0.0..=1.0).contains(&rate));
        if lookups == 0 {
            prop_assert_eq!(rate, 0.0);
        } else {
            prop_assert!((rate - stats.hits as f64 / lookups as f64).abs() < 1e-12);
        }
    }
}

// ── 3. Rolling mean ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn rolling_mean_defined_from_window(
        values in prop::collection::vec(0.0..150.0_f64, 0..40),
        window in 1usize..8,
    ) {
        let input: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let ma = rolling_mean(&input, window);
        prop_assert_eq!(ma.len(), values.len());
        for (i, v) in ma.iter().enumerate() {
            if i + 1 < window {
                prop_assert!(v.is_none());
            } else {
                let expected = values[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                prop_assert!(v.is_some());
                prop_assert!((v.unwrap_or_default() - expected).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn rolling_mean_known_sequence() {
    let values: Vec<Option<f64>> = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]
        .into_iter()
        .map(Some)
        .collect();
    let ma = rolling_mean(&values, 5);
    assert!(ma[..4].iter().all(Option::is_none));
    assert_eq!(ma[4], Some(30.0));
}
