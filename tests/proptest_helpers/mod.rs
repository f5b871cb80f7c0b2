#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use dataprep::split::SplitOptions;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Unique, non-empty image names.
pub fn arb_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z0-9_]{1,8}", 0..=max)
        .prop_map(|set| set.into_iter().map(|s| format!("{s}.jpg")).collect())
}

/// Valid split options: train + val <= 1.
pub fn arb_split_options() -> impl Strategy<Value = SplitOptions> {
    (0u32..=100, 0u32..=100, any::<u64>(), any::<bool>()).prop_map(|(t, v, seed, shuffle)| {
        let train = t as f64 / 100.0;
        let val = (v.min(100 - t)) as f64 / 100.0;
        SplitOptions {
            train_fraction: train,
            val_fraction: val,
            ignore_negatives: false,
            seed,
            shuffle,
        }
    })
}
