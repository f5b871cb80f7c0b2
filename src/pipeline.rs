//! Pipeline entry points.
//!
//! `preprocess` normalizes each configured image directory and, where a
//! sibling `labels/` directory exists, runs both quarantine sweeps on it.
//! `split` plans the train/val/test manifests for the dataset root. The two
//! stages are independent; a skipped root in one does not stop the other.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::consistency::{
    sibling_labels_dir, sweep_empty_labels, sweep_orphan_images, SweepReport,
};
use crate::error::DataprepError;
use crate::normalize::{normalize_dir, NormalizeOptions, NormalizeReport};
use crate::split::{split_dataset, SplitReport};
use crate::vfs::DatasetFs;

/// Everything that happened to one image directory during preprocessing.
#[derive(Clone, Debug, Serialize)]
pub struct RootReport {
    pub images_dir: PathBuf,
    /// Why the root was skipped, if it was.
    pub skipped: Option<String>,
    pub normalize: Option<NormalizeReport>,
    pub empty_labels: Option<SweepReport>,
    pub orphan_images: Option<SweepReport>,
}

impl RootReport {
    fn new(images_dir: &Path) -> Self {
        Self {
            images_dir: images_dir.to_path_buf(),
            skipped: None,
            normalize: None,
            empty_labels: None,
            orphan_images: None,
        }
    }
}

impl fmt::Display for RootReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.skipped {
            return writeln!(f, "Skipped {}: {}", self.images_dir.display(), reason);
        }
        if let Some(normalize) = &self.normalize {
            write!(f, "{}", normalize)?;
        }
        if let Some(sweep) = &self.empty_labels {
            write!(f, "{}", sweep)?;
        }
        if let Some(sweep) = &self.orphan_images {
            write!(f, "{}", sweep)?;
        }
        Ok(())
    }
}

/// Result of the preprocess stage across all roots.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PreprocessReport {
    pub roots: Vec<RootReport>,
}

impl fmt::Display for PreprocessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, root) in self.roots.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", root)?;
        }
        Ok(())
    }
}

/// Result of `run`: preprocess followed by split.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub preprocess: PreprocessReport,
    pub split: SplitReport,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preprocess)?;
        writeln!(f)?;
        write!(f, "{}", self.split)
    }
}

/// Image directories the preprocess stage works on, in order.
pub fn preprocess_roots(config: &PipelineConfig) -> Vec<PathBuf> {
    let mut roots = vec![config.images_dir()];
    if let Some(test_dir) = config.test_data_dir() {
        roots.push(test_dir.to_path_buf());
    }
    roots
}

/// Normalize and clean a single image directory.
pub fn preprocess_root<F: DatasetFs + ?Sized>(
    fs: &F,
    images_dir: &Path,
    opts: &NormalizeOptions,
) -> Result<RootReport, DataprepError> {
    let mut report = RootReport::new(images_dir);

    if !fs.is_dir(images_dir) {
        warn!("{} does not exist, skipping", images_dir.display());
        report.skipped = Some("directory does not exist".to_string());
        return Ok(report);
    }

    report.normalize = Some(normalize_dir(fs, images_dir, opts)?);

    let labels_dir = sibling_labels_dir(images_dir);
    if !fs.is_dir(&labels_dir) {
        info!(
            "No labels directory at {}, skipping consistency checks",
            labels_dir.display()
        );
        return Ok(report);
    }

    report.empty_labels = Some(sweep_empty_labels(fs, &labels_dir, opts.dry_run)?);
    report.orphan_images = Some(sweep_orphan_images(
        fs,
        images_dir,
        &labels_dir,
        opts.dry_run,
    )?);

    Ok(report)
}

/// Run the preprocess stage over every configured root.
pub fn preprocess<F: DatasetFs + ?Sized>(
    fs: &F,
    config: &PipelineConfig,
    opts: &NormalizeOptions,
) -> Result<PreprocessReport, DataprepError> {
    let mut report = PreprocessReport::default();
    for root in preprocess_roots(config) {
        report.roots.push(preprocess_root(fs, &root, opts)?);
    }
    Ok(report)
}

/// Run the split stage over the dataset root.
pub fn split<F: DatasetFs + ?Sized>(
    fs: &F,
    config: &PipelineConfig,
) -> Result<SplitReport, DataprepError> {
    split_dataset(fs, &config.train.data_path, &config.split_options())
}

/// Preprocess, then split.
pub fn run<F: DatasetFs + ?Sized>(
    fs: &F,
    config: &PipelineConfig,
    opts: &NormalizeOptions,
) -> Result<RunReport, DataprepError> {
    let preprocess = preprocess(fs, config, opts)?;
    let split = split(fs, config)?;
    Ok(RunReport { preprocess, split })
}
