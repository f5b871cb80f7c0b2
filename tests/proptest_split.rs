use std::collections::BTreeSet;

use dataprep::split::{assign_splits, holdout_count};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn every_candidate_lands_in_exactly_one_split(
        names in proptest_helpers::arb_names(40),
        opts in proptest_helpers::arb_split_options(),
    ) {
        let split = assign_splits(&names, &opts);

        prop_assert_eq!(split.total(), names.len());

        let mut seen = BTreeSet::new();
        for name in split.train.iter().chain(&split.val).chain(&split.test) {
            prop_assert!(seen.insert(name.clone()), "{} assigned twice", name);
        }
        let expected: BTreeSet<String> = names.iter().cloned().collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn train_size_follows_the_holdout_rounding(
        names in proptest_helpers::arb_names(40),
        opts in proptest_helpers::arb_split_options(),
    ) {
        let split = assign_splits(&names, &opts);

        let expected_train = if opts.train_fraction >= 1.0 {
            names.len()
        } else {
            names.len() - holdout_count(names.len(), 1.0 - opts.train_fraction)
        };
        prop_assert_eq!(split.train.len(), expected_train);

        if opts.test_fraction() == 0.0 {
            prop_assert!(split.test.is_empty());
        }
    }

    #[test]
    fn assignment_is_deterministic_for_a_seed(
        names in proptest_helpers::arb_names(40),
        opts in proptest_helpers::arb_split_options(),
    ) {
        prop_assert_eq!(assign_splits(&names, &opts), assign_splits(&names, &opts));
    }

    #[test]
    fn unshuffled_splits_preserve_sorted_order(
        names in proptest_helpers::arb_names(40),
        opts in proptest_helpers::arb_split_options(),
    ) {
        let mut opts = opts;
        opts.shuffle = false;
        let split = assign_splits(&names, &opts);

        prop_assert!(split.train.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(split.val.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(split.test.windows(2).all(|w| w[0] < w[1]));
    }
}
