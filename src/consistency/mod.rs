//! Image/label consistency enforcement.
//!
//! Two independent sweeps keep `images/` and `labels/` paired by stem:
//!
//! - the empty-label sweep moves zero-length files out of `labels/` into
//!   `labels/noimages/`;
//! - the orphan-image sweep moves every image whose `<stem>.txt` label is
//!   missing or empty into `<image dir>/nolabels/`.
//!
//! Nothing is ever deleted. Scans only see regular files, so quarantined
//! files are invisible on the next run and both sweeps are idempotent.

mod report;

pub use report::{RelocationFailure, SweepKind, SweepReport};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::DataprepError;
use crate::vfs::{DatasetFs, FileEntry};

/// Quarantine folder for empty labels, inside `labels/`.
pub const EMPTY_LABEL_QUARANTINE: &str = "noimages";

/// Quarantine folder for orphan images, inside the scanned image directory.
pub const ORPHAN_IMAGE_QUARANTINE: &str = "nolabels";

pub const LABEL_EXTENSION: &str = "txt";

/// Image extensions the orphan-image sweep looks at.
pub const PAIRED_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// A single planned move into quarantine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl Relocation {
    fn into_dir(entry: &FileEntry, dir: &Path) -> Self {
        Self {
            from: entry.path.clone(),
            to: dir.join(&entry.name),
        }
    }
}

/// The `labels/` directory that sits next to an image directory.
pub fn sibling_labels_dir(images_dir: &Path) -> PathBuf {
    images_dir
        .parent()
        .map(|parent| parent.join("labels"))
        .unwrap_or_else(|| PathBuf::from("labels"))
}

/// Index label files by stem, mapping to their size in bytes.
pub fn index_labels(entries: &[FileEntry]) -> HashMap<String, u64> {
    entries
        .iter()
        .filter(|entry| entry.has_extension(&[LABEL_EXTENSION]))
        .map(|entry| (entry.stem().to_string(), entry.len))
        .collect()
}

/// True if `stem` has a label file with content.
pub fn has_nonempty_label(labels: &HashMap<String, u64>, stem: &str) -> bool {
    labels.get(stem).is_some_and(|len| *len > 0)
}

/// Plan the empty-label sweep: every zero-length file moves to quarantine.
pub fn plan_empty_label_sweep(labels_dir: &Path, labels: &[FileEntry]) -> Vec<Relocation> {
    let quarantine = labels_dir.join(EMPTY_LABEL_QUARANTINE);
    labels
        .iter()
        .filter(|entry| entry.is_empty())
        .map(|entry| Relocation::into_dir(entry, &quarantine))
        .collect()
}

/// Plan the orphan-image sweep: every image without a non-empty label moves
/// to quarantine.
pub fn plan_orphan_image_sweep(
    images_dir: &Path,
    images: &[FileEntry],
    labels: &HashMap<String, u64>,
) -> Vec<Relocation> {
    let quarantine = images_dir.join(ORPHAN_IMAGE_QUARANTINE);
    images
        .iter()
        .filter(|entry| entry.has_extension(&PAIRED_IMAGE_EXTENSIONS))
        .filter(|entry| !has_nonempty_label(labels, entry.stem()))
        .map(|entry| Relocation::into_dir(entry, &quarantine))
        .collect()
}

/// Moves that were carried out and moves that failed.
#[derive(Clone, Debug, Default)]
pub struct AppliedRelocations {
    /// Relocations that succeeded, with the destination actually used.
    pub moved: Vec<Relocation>,
    pub failures: Vec<RelocationFailure>,
}

/// Apply a list of relocations in order.
///
/// A failed move is logged and recorded; the remaining moves still run. A
/// destination that is already taken gets a numbered name (`b.1.jpg`) so an
/// earlier quarantined file is never replaced.
pub fn apply_relocations<F: DatasetFs + ?Sized>(
    fs: &F,
    relocations: &[Relocation],
) -> AppliedRelocations {
    let mut applied = AppliedRelocations::default();

    for relocation in relocations {
        let to = free_destination(fs, &relocation.to);
        if to != relocation.to {
            info!(
                "{} is taken, quarantining {} as {}",
                relocation.to.display(),
                relocation.from.display(),
                to.display()
            );
        }

        match fs.relocate(&relocation.from, &to) {
            Ok(()) => applied.moved.push(Relocation {
                from: relocation.from.clone(),
                to,
            }),
            Err(e) => {
                error!("Can't move {}: {}", relocation.from.display(), e);
                applied.failures.push(RelocationFailure {
                    file: file_name(&relocation.from),
                    reason: e.to_string(),
                });
            }
        }
    }

    applied
}

/// `to` if nothing is there, otherwise the first free `<stem>.<n>.<ext>`.
pub fn free_destination<F: DatasetFs + ?Sized>(fs: &F, to: &Path) -> PathBuf {
    let occupied = |path: &Path| fs.file_len(path).is_some() || fs.is_dir(path);
    if !occupied(to) {
        return to.to_path_buf();
    }

    let stem = to
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = to
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());

    let mut n = 1usize;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}.{}.{}", stem, n, ext),
            None => format!("{}.{}", stem, n),
        };
        let candidate = to.with_file_name(name);
        if !occupied(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Names to report: the plan on a dry run, the completed moves otherwise.
fn run_plan<F: DatasetFs + ?Sized>(
    fs: &F,
    plan: &[Relocation],
    dry_run: bool,
) -> (Vec<String>, Vec<RelocationFailure>) {
    if dry_run {
        let planned = plan.iter().map(|r| file_name(&r.from)).collect();
        return (planned, Vec::new());
    }

    let applied = apply_relocations(fs, plan);
    let moved = applied.moved.iter().map(|r| file_name(&r.from)).collect();
    (moved, applied.failures)
}

/// Move zero-length label files into `labels/noimages/`.
pub fn sweep_empty_labels<F: DatasetFs + ?Sized>(
    fs: &F,
    labels_dir: &Path,
    dry_run: bool,
) -> Result<SweepReport, DataprepError> {
    let labels = fs.list_files(labels_dir)?;
    let plan = plan_empty_label_sweep(labels_dir, &labels);
    let (relocated, failures) = run_plan(fs, &plan, dry_run);

    let report = SweepReport {
        kind: SweepKind::EmptyLabels,
        dir: labels_dir.to_path_buf(),
        quarantine_dir: labels_dir.join(EMPTY_LABEL_QUARANTINE),
        scanned: labels.len(),
        relocated,
        failures,
        dry_run,
    };
    info!(
        "Moved {} labels without images to {}",
        report.count(),
        report.quarantine_dir.display()
    );
    if !report.failures.is_empty() {
        warn!(
            "{} file(s) could not be moved to {}",
            report.failures.len(),
            report.quarantine_dir.display()
        );
    }
    Ok(report)
}

/// Move images without a non-empty label into `<images_dir>/nolabels/`.
pub fn sweep_orphan_images<F: DatasetFs + ?Sized>(
    fs: &F,
    images_dir: &Path,
    labels_dir: &Path,
    dry_run: bool,
) -> Result<SweepReport, DataprepError> {
    let images = fs.list_files(images_dir)?;
    let labels = index_labels(&fs.list_files(labels_dir)?);
    let plan = plan_orphan_image_sweep(images_dir, &images, &labels);
    let (relocated, failures) = run_plan(fs, &plan, dry_run);

    let scanned = images
        .iter()
        .filter(|entry| entry.has_extension(&PAIRED_IMAGE_EXTENSIONS))
        .count();
    let report = SweepReport {
        kind: SweepKind::OrphanImages,
        dir: images_dir.to_path_buf(),
        quarantine_dir: images_dir.join(ORPHAN_IMAGE_QUARANTINE),
        scanned,
        relocated,
        failures,
        dry_run,
    };
    info!(
        "Moved {} images without labels to {}",
        report.count(),
        report.quarantine_dir.display()
    );
    if !report.failures.is_empty() {
        warn!(
            "{} file(s) could not be moved to {}",
            report.failures.len(),
            report.quarantine_dir.display()
        );
    }
    Ok(report)
}
