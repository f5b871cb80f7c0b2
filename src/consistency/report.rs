//! Report types for quarantine sweeps.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Which sweep produced a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Zero-length label files moved out of `labels/`.
    EmptyLabels,
    /// Images without a non-empty label moved out of the image directory.
    OrphanImages,
}

impl SweepKind {
    fn describe(&self) -> &'static str {
        match self {
            SweepKind::EmptyLabels => "labels without images",
            SweepKind::OrphanImages => "images without labels",
        }
    }
}

/// Outcome of one quarantine sweep.
#[derive(Clone, Debug, Serialize)]
pub struct SweepReport {
    pub kind: SweepKind,
    /// Directory that was scanned.
    pub dir: PathBuf,
    /// Where offending files are moved.
    pub quarantine_dir: PathBuf,
    /// Number of files looked at.
    pub scanned: usize,
    /// Names of the files moved (or that would be moved in a dry run).
    pub relocated: Vec<String>,
    /// Moves that failed; the files stay where they were.
    pub failures: Vec<RelocationFailure>,
    pub dry_run: bool,
}

/// A file the sweep could not move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelocationFailure {
    pub file: String,
    pub reason: String,
}

impl SweepReport {
    pub fn count(&self) -> usize {
        self.relocated.len()
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "Would move" } else { "Moved" };
        writeln!(
            f,
            "{} {} {} (of {} scanned) to {}",
            verb,
            self.count(),
            self.kind.describe(),
            self.scanned,
            self.quarantine_dir.display()
        )?;
        for name in &self.relocated {
            writeln!(f, "  - {}", name)?;
        }

        if !self.failures.is_empty() {
            writeln!(f, "Could not move ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  - {}: {}", failure.file, failure.reason)?;
            }
        }
        Ok(())
    }
}
