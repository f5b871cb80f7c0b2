//! Report types for image normalization runs.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Outcome of normalizing one directory.
///
/// Per-file problems never abort a run; they end up here instead so the
/// operator can see exactly what was left behind.
#[derive(Clone, Debug, Default, Serialize)]
pub struct NormalizeReport {
    /// Directory that was normalized.
    pub dir: PathBuf,
    /// True if the plan was computed but not applied.
    pub dry_run: bool,
    /// Files converted to the canonical format.
    pub converted: usize,
    /// Files that were already canonical and left alone.
    pub already_canonical: usize,
    /// Files whose extension is neither convertible nor canonical.
    pub unsupported: Vec<String>,
    /// Conversions that failed, with the reason.
    pub failures: Vec<ConversionFailure>,
    /// Conversions that would run (dry run only).
    pub planned: Vec<String>,
    /// Stems seen before the run that have no canonical file afterwards.
    pub lost: Vec<String>,
    /// Canonical files present after the run.
    pub canonical_total: usize,
}

impl NormalizeReport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Returns true if every seen stem now has a canonical file.
    pub fn is_lossless(&self) -> bool {
        self.lost.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for NormalizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Normalize {}:", self.dir.display())?;

        if self.dry_run {
            writeln!(
                f,
                "  dry run: {} file(s) would be converted, {} already canonical",
                self.planned.len(),
                self.already_canonical
            )?;
            for name in &self.planned {
                writeln!(f, "  - {}", name)?;
            }
        } else {
            writeln!(
                f,
                "  {} converted, {} already canonical, {} canonical total",
                self.converted, self.already_canonical, self.canonical_total
            )?;
        }

        if !self.unsupported.is_empty() {
            writeln!(f)?;
            writeln!(f, "Not converted ({}):", self.unsupported.len())?;
            for name in &self.unsupported {
                writeln!(f, "  - {}", name)?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  - {}", failure)?;
            }
        }

        if !self.dry_run && !self.lost.is_empty() {
            writeln!(f)?;
            writeln!(f, "Lost ({}): {}", self.lost.len(), self.lost.join(", "))?;
        }

        Ok(())
    }
}

/// A single file that could not be converted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversionFailure {
    pub file: String,
    pub reason: String,
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.reason)
    }
}
