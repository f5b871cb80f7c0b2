//! Deterministic train/val/test split planning.
//!
//! The candidate set is every canonical image in `<root>/images`, optionally
//! restricted to positively labelled images. Candidates are always sorted
//! first, so the same inputs produce the same partition regardless of
//! directory iteration order. Shuffling uses a [`StdRng`] seeded from the
//! configured seed; a fresh generator is used for each partition step.
//!
//! One manifest per non-empty split is written to the dataset root
//! (`train.csv`, `val.csv`, `test.csv`). Manifests from a previous run are
//! removed first, so a split that comes out empty has no file on disk. An
//! empty candidate set leaves every existing manifest as it is.

mod manifest;
mod report;

pub use manifest::{read_manifest, render_manifest, write_manifest};
pub use report::{SplitReport, SplitSummary};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use log::{info, warn};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::consistency::{has_nonempty_label, index_labels};
use crate::error::DataprepError;
use crate::normalize::CANONICAL_EXTENSION;
use crate::vfs::{DatasetFs, FileEntry};

/// Test fractions at or below this are treated as zero.
pub const SPLIT_EPSILON: f64 = 0.001;

// Absorbs float error when turning a fraction into an item count, so that
// 10 * (1.0 - 0.7) yields 3 and not 4.
const COUNT_TOLERANCE: f64 = 1e-9;

/// The three dataset splits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitName {
    Train,
    Val,
    Test,
}

impl SplitName {
    pub const ALL: [SplitName; 3] = [SplitName::Train, SplitName::Val, SplitName::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitName::Train => "train",
            SplitName::Val => "val",
            SplitName::Test => "test",
        }
    }

    /// File name of this split's manifest, e.g. `train.csv`.
    pub fn manifest_file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split planning options.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitOptions {
    pub train_fraction: f64,
    pub val_fraction: f64,
    /// Drop images without a non-empty label from the candidate set.
    pub ignore_negatives: bool,
    pub seed: u64,
    /// Randomize assignment; otherwise assignment follows sorted order.
    pub shuffle: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            val_fraction: 0.2,
            ignore_negatives: false,
            seed: 42,
            shuffle: true,
        }
    }
}

impl SplitOptions {
    /// The remainder after train and val, clamped to zero at the epsilon.
    pub fn test_fraction(&self) -> f64 {
        let test = 1.0 - self.train_fraction - self.val_fraction;
        if test <= SPLIT_EPSILON {
            0.0
        } else {
            test
        }
    }
}

/// Validate split options before running.
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), DataprepError> {
    for (name, value) in [
        ("train_split", opts.train_fraction),
        ("val_split", opts.val_fraction),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(DataprepError::InvalidConfig {
                message: format!("{} must be between 0.0 and 1.0, got {}", name, value),
            });
        }
    }

    if opts.train_fraction + opts.val_fraction > 1.0 + SPLIT_EPSILON {
        return Err(DataprepError::InvalidConfig {
            message: format!(
                "train_split + val_split must not exceed 1.0, got {} + {}",
                opts.train_fraction, opts.val_fraction
            ),
        });
    }

    Ok(())
}

/// A partition of the candidate set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitAssignment {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
}

impl SplitAssignment {
    pub fn get(&self, name: SplitName) -> &[String] {
        match name {
            SplitName::Train => &self.train,
            SplitName::Val => &self.val,
            SplitName::Test => &self.test,
        }
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}

/// Build the sorted candidate list from an image inventory.
///
/// With `labels`, only images whose `<stem>.txt` is non-empty are kept.
pub fn collect_candidates(
    images: &[FileEntry],
    labels: Option<&HashMap<String, u64>>,
) -> Vec<String> {
    let mut candidates: Vec<String> = images
        .iter()
        .filter(|entry| entry.has_extension(&[CANONICAL_EXTENSION]))
        .filter(|entry| labels.map_or(true, |labels| has_nonempty_label(labels, entry.stem())))
        .map(|entry| entry.name.clone())
        .collect();
    candidates.sort();
    candidates
}

/// Number of items a `fraction` of `total` takes, rounded up.
pub fn holdout_count(total: usize, fraction: f64) -> usize {
    let raw = (total as f64 * fraction - COUNT_TOLERANCE).ceil();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(total)
    }
}

/// Split `items` into `(kept, holdout)` where the holdout takes
/// `holdout_fraction` of the items.
///
/// With `shuffle`, the items are permuted by a generator seeded with `seed`
/// and the holdout is taken from the front. Without it, input order is kept
/// and the holdout is taken from the back.
pub fn partition(
    mut items: Vec<String>,
    holdout_fraction: f64,
    seed: u64,
    shuffle: bool,
) -> (Vec<String>, Vec<String>) {
    let holdout = holdout_count(items.len(), holdout_fraction);

    if shuffle {
        let mut rng = StdRng::seed_from_u64(seed);
        items.shuffle(&mut rng);
        let kept = items.split_off(holdout);
        (kept, items)
    } else {
        let split_at = items.len() - holdout;
        let held = items.split_off(split_at);
        (items, held)
    }
}

/// Assign every candidate to exactly one split.
pub fn assign_splits(candidates: &[String], opts: &SplitOptions) -> SplitAssignment {
    let items = candidates.to_vec();

    if opts.train_fraction >= 1.0 {
        let mut train = items;
        if opts.shuffle {
            let mut rng = StdRng::seed_from_u64(opts.seed);
            train.shuffle(&mut rng);
        }
        return SplitAssignment {
            train,
            ..Default::default()
        };
    }

    let (train, rest) = partition(items, 1.0 - opts.train_fraction, opts.seed, opts.shuffle);

    let test_fraction = opts.test_fraction();
    let (test, val) = if test_fraction > 0.0 {
        let val_share = opts.val_fraction / (opts.val_fraction + test_fraction);
        partition(rest, val_share, opts.seed, opts.shuffle)
    } else {
        (Vec::new(), rest)
    };

    SplitAssignment { train, val, test }
}

/// Replace the manifests in `root` with the given assignment.
///
/// Every existing manifest is removed first; only non-empty splits get a
/// new file.
pub fn write_manifests<F: DatasetFs + ?Sized>(
    fs: &F,
    root: &Path,
    assignment: &SplitAssignment,
) -> Result<Vec<SplitSummary>, DataprepError> {
    let mut summaries = Vec::with_capacity(SplitName::ALL.len());

    for name in SplitName::ALL {
        let path = root.join(name.manifest_file_name());
        if fs.file_len(&path).is_some() {
            info!("{} already exists. Removing...", path.display());
            fs.remove_file(&path)?;
        }

        let names = assignment.get(name);
        let manifest = if names.is_empty() {
            None
        } else {
            write_manifest(fs, &path, names)?;
            info!("{}: {} were saved to {}", name, names.len(), path.display());
            Some(path)
        };

        summaries.push(SplitSummary {
            name,
            count: names.len(),
            manifest,
        });
    }

    Ok(summaries)
}

/// Plan splits for `<root>/images` and write the manifests into `root`.
pub fn split_dataset<F: DatasetFs + ?Sized>(
    fs: &F,
    root: &Path,
    opts: &SplitOptions,
) -> Result<SplitReport, DataprepError> {
    validate_split_options(opts)?;

    let images_dir = root.join("images");
    if !fs.is_dir(&images_dir) {
        return Err(DataprepError::MissingDirectory { path: images_dir });
    }
    let images = fs.list_files(&images_dir)?;

    let labels = if opts.ignore_negatives {
        let labels_dir = root.join("labels");
        if fs.is_dir(&labels_dir) {
            Some(index_labels(&fs.list_files(&labels_dir)?))
        } else {
            warn!(
                "{} not found; every image counts as a negative",
                labels_dir.display()
            );
            Some(HashMap::new())
        }
    } else {
        None
    };

    let candidates = collect_candidates(&images, labels.as_ref());
    let splits = if candidates.is_empty() {
        warn!(
            "No images to split in {}; manifests left unchanged",
            images_dir.display()
        );
        SplitName::ALL
            .into_iter()
            .map(|name| SplitSummary {
                name,
                count: 0,
                manifest: None,
            })
            .collect()
    } else {
        let assignment = assign_splits(&candidates, opts);
        write_manifests(fs, root, &assignment)?
    };

    Ok(SplitReport {
        root: root.to_path_buf(),
        candidates: candidates.len(),
        train_fraction: opts.train_fraction,
        val_fraction: opts.val_fraction,
        test_fraction: opts.test_fraction(),
        seed: opts.seed,
        shuffle: opts.shuffle,
        ignore_negatives: opts.ignore_negatives,
        splits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryFs;
    use std::collections::BTreeSet;

    fn letters(n: usize) -> Vec<String> {
        (b'a'..)
            .take(n)
            .map(|c| format!("{}.jpg", c as char))
            .collect()
    }

    fn opts(train: f64, val: f64, seed: u64, shuffle: bool) -> SplitOptions {
        SplitOptions {
            train_fraction: train,
            val_fraction: val,
            ignore_negatives: false,
            seed,
            shuffle,
        }
    }

    fn dataset_fs(names: &[String]) -> MemoryFs {
        let fs = MemoryFs::new();
        fs.create_dir("/ds/images");
        for name in names {
            fs.insert(format!("/ds/images/{}", name), vec![0xFF, 0xD8]);
        }
        fs
    }

    fn root() -> &'static Path {
        Path::new("/ds")
    }

    #[test]
    fn test_fraction_is_clamped_at_epsilon() {
        assert_eq!(opts(0.8, 0.2, 0, true).test_fraction(), 0.0);
        assert_eq!(opts(0.8, 0.1995, 0, true).test_fraction(), 0.0);
        assert!((opts(0.7, 0.2, 0, true).test_fraction() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_bad_fractions() {
        assert!(validate_split_options(&opts(0.8, 0.2, 0, true)).is_ok());
        assert!(validate_split_options(&opts(1.0, 0.0, 0, true)).is_ok());
        assert!(validate_split_options(&opts(1.2, 0.0, 0, true)).is_err());
        assert!(validate_split_options(&opts(0.5, -0.1, 0, true)).is_err());
        assert!(validate_split_options(&opts(0.8, 0.3, 0, true)).is_err());
        assert!(validate_split_options(&opts(f64::NAN, 0.1, 0, true)).is_err());
    }

    #[test]
    fn holdout_count_tolerates_float_error() {
        assert_eq!(holdout_count(10, 1.0 - 0.7), 3);
        assert_eq!(holdout_count(10, 0.25), 3);
        assert_eq!(holdout_count(0, 0.5), 0);
        assert_eq!(holdout_count(5, 0.0), 0);
        assert_eq!(holdout_count(5, 1.0), 5);
    }

    #[test]
    fn ten_items_split_seven_two_one() {
        let candidates = letters(10);
        let split = assign_splits(&candidates, &opts(0.7, 0.2, 7, true));

        assert_eq!(split.train.len(), 7);
        assert_eq!(split.val.len(), 2);
        assert_eq!(split.test.len(), 1);

        let again = assign_splits(&candidates, &opts(0.7, 0.2, 7, true));
        assert_eq!(split, again);
    }

    #[test]
    fn assignment_is_a_partition() {
        let candidates = letters(23);
        for (train, val) in [(0.7, 0.2), (0.5, 0.5), (0.0, 0.3), (0.9, 0.0), (0.33, 0.33)] {
            for shuffle in [true, false] {
                let split = assign_splits(&candidates, &opts(train, val, 3, shuffle));
                assert_eq!(split.total(), candidates.len());

                let all: BTreeSet<&String> = split
                    .train
                    .iter()
                    .chain(&split.val)
                    .chain(&split.test)
                    .collect();
                assert_eq!(all.len(), candidates.len());
            }
        }
    }

    #[test]
    fn unshuffled_split_follows_sorted_order() {
        let candidates = letters(10);
        let split = assign_splits(&candidates, &opts(0.7, 0.2, 7, false));

        assert_eq!(split.train, candidates[..7].to_vec());
        assert_eq!(split.test, candidates[7..8].to_vec());
        assert_eq!(split.val, candidates[8..].to_vec());
    }

    #[test]
    fn different_seeds_usually_differ() {
        let candidates = letters(20);
        let a = assign_splits(&candidates, &opts(0.5, 0.5, 1, true));
        let b = assign_splits(&candidates, &opts(0.5, 0.5, 2, true));
        assert_ne!(a.train, b.train);
    }

    #[test]
    fn saturated_train_takes_everything() {
        let candidates = letters(6);

        let sorted = assign_splits(&candidates, &opts(1.0, 0.0, 7, false));
        assert_eq!(sorted.train, candidates);
        assert!(sorted.val.is_empty() && sorted.test.is_empty());

        let shuffled = assign_splits(&candidates, &opts(1.0, 0.0, 7, true));
        let mut members = shuffled.train.clone();
        members.sort();
        assert_eq!(members, candidates);
        assert!(shuffled.val.is_empty() && shuffled.test.is_empty());
    }

    #[test]
    fn candidates_are_sorted_and_canonical_only() {
        let images = vec![
            FileEntry::new("/ds/images/c.jpg", 1),
            FileEntry::new("/ds/images/a.JPG", 1),
            FileEntry::new("/ds/images/b.png", 1),
        ];
        assert_eq!(collect_candidates(&images, None), vec!["a.JPG", "c.jpg"]);
    }

    #[test]
    fn ignore_negatives_filters_without_skipping_neighbours() {
        let images: Vec<FileEntry> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| FileEntry::new(format!("/ds/images/{}.jpg", s), 1))
            .collect();
        let labels: HashMap<String, u64> = [
            ("a".to_string(), 10),
            ("b".to_string(), 0),
            ("e".to_string(), 4),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            collect_candidates(&images, Some(&labels)),
            vec!["a.jpg", "e.jpg"]
        );
    }

    #[test]
    fn epsilon_clamp_writes_no_test_manifest() {
        let fs = dataset_fs(&letters(10));
        let report = split_dataset(&fs, root(), &opts(0.8, 0.2, 42, true)).expect("split");

        assert_eq!(report.count(SplitName::Train), 8);
        assert_eq!(report.count(SplitName::Val), 2);
        assert_eq!(report.count(SplitName::Test), 0);
        assert!(fs.exists("/ds/train.csv"));
        assert!(fs.exists("/ds/val.csv"));
        assert!(!fs.exists("/ds/test.csv"));
    }

    #[test]
    fn saturated_split_removes_stale_manifests() {
        let candidates = letters(4);
        let fs = dataset_fs(&candidates);
        fs.insert("/ds/val.csv", "old.jpg\n");
        fs.insert("/ds/test.csv", "old.jpg\n");

        split_dataset(&fs, root(), &opts(1.0, 0.0, 1, false)).expect("split");

        assert!(!fs.exists("/ds/val.csv"));
        assert!(!fs.exists("/ds/test.csv"));
        let train = read_manifest(&fs, Path::new("/ds/train.csv")).expect("read");
        assert_eq!(train, candidates);
    }

    #[test]
    fn manifests_are_reproducible() {
        let fs = dataset_fs(&letters(10));
        let options = opts(0.7, 0.2, 7, true);

        split_dataset(&fs, root(), &options).expect("first split");
        let first: Vec<Option<Vec<u8>>> = SplitName::ALL
            .iter()
            .map(|n| fs.contents(root().join(n.manifest_file_name())))
            .collect();

        split_dataset(&fs, root(), &options).expect("second split");
        let second: Vec<Option<Vec<u8>>> = SplitName::ALL
            .iter()
            .map(|n| fs.contents(root().join(n.manifest_file_name())))
            .collect();

        assert_eq!(first, second);
        assert!(first.iter().all(Option::is_some));
    }

    #[test]
    fn empty_candidate_set_writes_nothing() {
        let fs = dataset_fs(&[]);
        fs.insert("/ds/images/readme.md", "not an image");

        let report = split_dataset(&fs, root(), &opts(0.7, 0.2, 7, true)).expect("split");

        assert_eq!(report.candidates, 0);
        assert!(report.splits.iter().all(|s| s.manifest.is_none()));
        for name in SplitName::ALL {
            assert!(!fs.exists(root().join(name.manifest_file_name())));
        }
    }

    #[test]
    fn empty_candidate_set_leaves_existing_manifests_alone() {
        let fs = dataset_fs(&[]);
        fs.insert("/ds/train.csv", "a.jpg\nb.jpg\n");
        fs.insert("/ds/val.csv", "c.jpg\n");

        let report = split_dataset(&fs, root(), &opts(0.7, 0.2, 7, true)).expect("split");

        assert_eq!(report.candidates, 0);
        assert_eq!(
            fs.contents("/ds/train.csv"),
            Some(b"a.jpg\nb.jpg\n".to_vec())
        );
        assert_eq!(fs.contents("/ds/val.csv"), Some(b"c.jpg\n".to_vec()));
        assert!(!fs.exists("/ds/test.csv"));
    }

    #[test]
    fn ignore_negatives_without_labels_dir_has_no_candidates() {
        let fs = dataset_fs(&letters(3));
        let options = SplitOptions {
            ignore_negatives: true,
            ..opts(0.7, 0.2, 7, true)
        };
        let report = split_dataset(&fs, root(), &options).expect("split");
        assert_eq!(report.candidates, 0);
    }

    #[test]
    fn missing_images_dir_is_an_error() {
        let fs = MemoryFs::new();
        fs.create_dir("/ds");
        let err = split_dataset(&fs, root(), &SplitOptions::default()).unwrap_err();
        assert!(matches!(err, DataprepError::MissingDirectory { .. }));
    }
}
