//! Image format normalization.
//!
//! Every convertible raster file in a directory is decoded, rotated
//! according to its EXIF orientation, forced to RGB and re-encoded as JPEG
//! under the same stem. Conversions run as independent tasks on a bounded
//! worker pool; a file that fails is logged, left in place and recorded in
//! the [`NormalizeReport`] without affecting the rest of the batch.
//!
//! After the batch, the directory is re-scanned and every stem seen before
//! the run that has no canonical file is reported as lost.

mod decode;
mod orientation;
mod report;

pub use decode::{decode_upright, HEIF_EXTENSIONS};
pub use orientation::{apply_orientation, read_exif_orientation};
pub use report::{ConversionFailure, NormalizeReport};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use image::codecs::jpeg::JpegEncoder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use crate::error::DataprepError;
use crate::vfs::{DatasetFs, FileEntry};

/// Extension every image ends up with.
pub const CANONICAL_EXTENSION: &str = "jpg";

/// Extensions that are decoded and re-encoded as canonical JPEG.
pub const CONVERTIBLE_EXTENSIONS: [&str; 8] =
    ["tif", "tiff", "jpeg", "png", "heic", "heif", "bmp", "webp"];

/// Default JPEG quality for re-encoded images.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Options for a normalization run.
#[derive(Clone, Debug)]
pub struct NormalizeOptions {
    /// Worker pool width. Zero means available parallelism.
    pub num_workers: usize,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// Compute the plan but do not touch any file.
    pub dry_run: bool,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            num_workers: 0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            dry_run: false,
            progress: false,
        }
    }
}

impl NormalizeOptions {
    /// Pool width after resolving zero to available parallelism.
    pub fn worker_count(&self) -> usize {
        if self.num_workers > 0 {
            self.num_workers
        } else {
            thread::available_parallelism().map_or(1, |n| n.get())
        }
    }
}

/// What a scan decided to do with one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileAction {
    Convert,
    Keep,
    Unsupported,
}

/// Classify a file by its extension.
pub fn classify(entry: &FileEntry) -> FileAction {
    match entry.extension() {
        Some(ext) if ext == CANONICAL_EXTENSION => FileAction::Keep,
        Some(ext) if CONVERTIBLE_EXTENSIONS.contains(&ext.as_str()) => FileAction::Convert,
        _ => FileAction::Unsupported,
    }
}

/// The conversion plan for one directory, computed from a scan.
#[derive(Clone, Debug, Default)]
pub struct NormalizePlan {
    pub convert: Vec<FileEntry>,
    pub keep: Vec<FileEntry>,
    pub unsupported: Vec<FileEntry>,
    /// Convertible files left alone because their canonical name is taken
    /// by an existing file or claimed by another convertible file.
    pub collisions: Vec<ConversionFailure>,
    /// Every stem present before the run.
    pub seen_stems: BTreeSet<String>,
}

/// Build a plan from a directory inventory.
pub fn plan_normalization(entries: Vec<FileEntry>) -> NormalizePlan {
    let mut plan = NormalizePlan::default();
    let mut candidates = Vec::new();

    for entry in entries {
        plan.seen_stems.insert(entry.stem().to_string());
        match classify(&entry) {
            FileAction::Convert => candidates.push(entry),
            FileAction::Keep => plan.keep.push(entry),
            FileAction::Unsupported => plan.unsupported.push(entry),
        }
    }

    let kept: HashSet<&str> = plan.keep.iter().map(FileEntry::stem).collect();
    let mut claims: HashMap<&str, usize> = HashMap::new();
    for entry in &candidates {
        *claims.entry(entry.stem()).or_default() += 1;
    }

    let mut collisions = Vec::new();
    let mut convert = Vec::new();
    for entry in &candidates {
        let target = format!("{}.{}", entry.stem(), CANONICAL_EXTENSION);
        if kept.contains(entry.stem()) {
            collisions.push(ConversionFailure {
                file: entry.name.clone(),
                reason: format!("{} already exists", target),
            });
        } else if claims.get(entry.stem()).copied().unwrap_or(0) > 1 {
            collisions.push(ConversionFailure {
                file: entry.name.clone(),
                reason: format!("another file in the directory also converts to {}", target),
            });
        } else {
            convert.push(entry.clone());
        }
    }

    plan.convert = convert;
    plan.collisions = collisions;
    plan
}

/// Path the canonical copy of `entry` is written to.
pub fn canonical_path(entry: &FileEntry) -> PathBuf {
    entry
        .path
        .with_file_name(format!("{}.{}", entry.stem(), CANONICAL_EXTENSION))
}

/// Decode `bytes`, fix orientation and re-encode as RGB JPEG.
pub fn reencode_as_jpeg(
    path: &Path,
    bytes: &[u8],
    quality: u8,
) -> Result<Vec<u8>, DataprepError> {
    let rgb = decode_upright(path, bytes)?.to_rgb8();

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|source| DataprepError::ImageEncode {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(encoded)
}

/// Convert a single file in place. The original is removed only after the
/// canonical copy has been written; an existing canonical file is never
/// replaced.
pub fn convert_file<F: DatasetFs + ?Sized>(
    fs: &F,
    entry: &FileEntry,
    quality: u8,
) -> Result<PathBuf, DataprepError> {
    let target = canonical_path(entry);
    if fs.file_len(&target).is_some() {
        return Err(DataprepError::TargetExists { path: target });
    }

    let bytes = fs.read(&entry.path)?;
    let encoded = reencode_as_jpeg(&entry.path, &bytes, quality)?;

    fs.write(&target, &encoded)?;
    fs.remove_file(&entry.path)?;
    Ok(target)
}

/// Normalize every convertible file in `dir`.
///
/// Per-file failures are recorded in the report. Only a failure to scan the
/// directory or to start the worker pool is returned as an error.
pub fn normalize_dir<F: DatasetFs + ?Sized>(
    fs: &F,
    dir: &Path,
    opts: &NormalizeOptions,
) -> Result<NormalizeReport, DataprepError> {
    let plan = plan_normalization(fs.list_files(dir)?);

    let mut report = NormalizeReport::new(dir);
    report.dry_run = opts.dry_run;
    report.already_canonical = plan.keep.len();
    report.unsupported = plan.unsupported.iter().map(|e| e.name.clone()).collect();

    for entry in &plan.unsupported {
        warn!("NOT converted: {}", entry.path.display());
    }
    for collision in &plan.collisions {
        warn!(
            "NOT converted: {} in {}: {}",
            collision.file,
            dir.display(),
            collision.reason
        );
    }
    report.failures = plan.collisions.clone();

    if opts.dry_run {
        report.planned = plan.convert.iter().map(|e| e.name.clone()).collect();
        report.canonical_total = plan.keep.len();
        return Ok(report);
    }

    run_conversions(fs, &plan.convert, opts, &mut report)?;

    let canonical_stems: BTreeSet<String> = fs
        .list_files(dir)?
        .iter()
        .filter(|entry| classify(entry) == FileAction::Keep)
        .map(|entry| entry.stem().to_string())
        .collect();

    report.canonical_total = canonical_stems.len();
    report.lost = plan
        .seen_stems
        .difference(&canonical_stems)
        .cloned()
        .collect();

    if report.lost.is_empty() {
        info!(
            "In {}, all files are .{}, total amount: {}",
            dir.display(),
            CANONICAL_EXTENSION,
            report.canonical_total
        );
    } else {
        warn!(
            "In {}, not converted to .{}, amount: {}, files: {:?}",
            dir.display(),
            CANONICAL_EXTENSION,
            report.lost.len(),
            report.lost
        );
    }

    Ok(report)
}

fn run_conversions<F: DatasetFs + ?Sized>(
    fs: &F,
    files: &[FileEntry],
    opts: &NormalizeOptions,
    report: &mut NormalizeReport,
) -> Result<(), DataprepError> {
    if files.is_empty() {
        return Ok(());
    }

    let workers = opts.worker_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("dataprep-convert-{}", i))
        .build()?;
    debug!("Converting {} file(s) on {} worker(s)", files.len(), workers);

    let pb = if opts.progress {
        create_progress_bar(files.len() as u64, "Convert")
    } else {
        ProgressBar::hidden()
    };

    let quality = opts.jpeg_quality;
    let (tx, rx) = mpsc::channel();

    thread::scope(|outer| {
        outer.spawn(move || {
            pool.scope(|scope| {
                for entry in files {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let outcome = convert_file(fs, entry, quality);
                        // The receiver only goes away if the draining loop panicked.
                        let _ = tx.send((entry, outcome));
                    });
                }
            });
        });

        for (entry, outcome) in rx {
            match outcome {
                Ok(target) => {
                    debug!("{} -> {}", entry.path.display(), target.display());
                    report.converted += 1;
                }
                Err(e) => {
                    error!("Can't convert {}: {}", entry.path.display(), e);
                    report.failures.push(ConversionFailure {
                        file: entry.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            pb.inc(1);
        }
    });

    pb.finish_with_message("Conversion complete");
    Ok(())
}

/// Create a progress bar with the given length and label.
fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
