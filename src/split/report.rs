//! Report type for split planning.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::SplitName;

/// Outcome of planning and writing dataset splits.
#[derive(Clone, Debug, Serialize)]
pub struct SplitReport {
    /// Dataset root the manifests are written to.
    pub root: PathBuf,
    /// Size of the candidate set.
    pub candidates: usize,
    pub train_fraction: f64,
    pub val_fraction: f64,
    /// Test fraction after the epsilon clamp.
    pub test_fraction: f64,
    pub seed: u64,
    pub shuffle: bool,
    pub ignore_negatives: bool,
    pub splits: Vec<SplitSummary>,
}

impl SplitReport {
    /// Number of items assigned to `name`.
    pub fn count(&self, name: SplitName) -> usize {
        self.splits
            .iter()
            .find(|s| s.name == name)
            .map_or(0, |s| s.count)
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Split {} candidate image(s) (train {:.3}, val {:.3}, test {:.3}, seed {}, shuffle {})",
            self.candidates,
            self.train_fraction,
            self.val_fraction,
            self.test_fraction,
            self.seed,
            self.shuffle
        )?;

        if self.candidates == 0 {
            return writeln!(f, "  no images to split; no manifests written");
        }

        for split in &self.splits {
            match &split.manifest {
                Some(path) => writeln!(
                    f,
                    "  {}: {} saved to {}",
                    split.name,
                    split.count,
                    path.display()
                )?,
                None => writeln!(f, "  {}: empty", split.name)?,
            }
        }
        Ok(())
    }
}

/// Per-split result.
#[derive(Clone, Debug, Serialize)]
pub struct SplitSummary {
    pub name: SplitName,
    pub count: usize,
    /// Manifest written for this split; `None` when the split is empty.
    pub manifest: Option<PathBuf>,
}
