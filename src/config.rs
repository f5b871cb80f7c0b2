//! Pipeline configuration.
//!
//! A YAML file with `train:` and `split:` sections provides the base values;
//! command-line flags override individual keys. The resolved
//! [`PipelineConfig`] is immutable and passed by reference into every stage.
//!
//! ```yaml
//! train:
//!   data_path: data/dataset
//!   path_to_test_data: data/test/images
//!   num_workers: 8
//!   seed: 42
//! split:
//!   train_split: 0.8
//!   val_split: 0.2
//!   ignore_negatives: false
//!   shuffle: true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DataprepError;
use crate::normalize::NormalizeOptions;
use crate::split::{validate_split_options, SplitOptions};

/// The full pipeline configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub train: TrainSection,
    pub split: SplitSection,
}

/// Dataset locations and shared run settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainSection {
    /// Dataset root containing `images/` and `labels/`.
    pub data_path: PathBuf,
    /// Optional extra image directory to normalize and clean.
    pub path_to_test_data: Option<PathBuf>,
    /// Conversion pool width; unset means available parallelism.
    pub num_workers: Option<usize>,
    pub seed: u64,
}

impl Default for TrainSection {
    fn default() -> Self {
        Self {
            data_path: PathBuf::new(),
            path_to_test_data: None,
            num_workers: None,
            seed: 42,
        }
    }
}

/// Split proportions and candidate filtering.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SplitSection {
    pub train_split: f64,
    pub val_split: f64,
    pub ignore_negatives: bool,
    pub shuffle: bool,
}

impl Default for SplitSection {
    fn default() -> Self {
        let defaults = SplitOptions::default();
        Self {
            train_split: defaults.train_fraction,
            val_split: defaults.val_fraction,
            ignore_negatives: defaults.ignore_negatives,
            shuffle: defaults.shuffle,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(data: &str, path: &Path) -> Result<Self, DataprepError> {
        serde_yaml::from_str(data).map_err(|source| DataprepError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<data_path>/images`.
    pub fn images_dir(&self) -> PathBuf {
        self.train.data_path.join("images")
    }

    /// The extra test directory, ignoring an empty value.
    pub fn test_data_dir(&self) -> Option<&Path> {
        self.train
            .path_to_test_data
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Options for the split stage.
    pub fn split_options(&self) -> SplitOptions {
        SplitOptions {
            train_fraction: self.split.train_split,
            val_fraction: self.split.val_split,
            ignore_negatives: self.split.ignore_negatives,
            seed: self.train.seed,
            shuffle: self.split.shuffle,
        }
    }

    /// Options for the normalize stage; worker count only.
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            num_workers: self.train.num_workers.unwrap_or(0),
            ..Default::default()
        }
    }

    /// Check the configuration before running any stage.
    pub fn validate(&self) -> Result<(), DataprepError> {
        if self.train.data_path.as_os_str().is_empty() {
            return Err(DataprepError::InvalidConfig {
                message: "train.data_path is not set (use --data-path or a config file)"
                    .to_string(),
            });
        }
        if self.train.num_workers == Some(0) {
            return Err(DataprepError::InvalidConfig {
                message: "train.num_workers must be greater than 0".to_string(),
            });
        }
        validate_split_options(&self.split_options())
    }
}

/// Load a configuration file.
pub fn load_config(path: &Path) -> Result<PipelineConfig, DataprepError> {
    let data = fs::read_to_string(path).map_err(|source| DataprepError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    PipelineConfig::from_yaml_str(&data, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> PipelineConfig {
        PipelineConfig::from_yaml_str(yaml, Path::new("config.yaml")).expect("parse config")
    }

    #[test]
    fn parses_full_config() {
        let config = parse(
            "train:\n  data_path: /data/set\n  path_to_test_data: /data/test/images\n  num_workers: 4\n  seed: 7\n\
             split:\n  train_split: 0.7\n  val_split: 0.2\n  ignore_negatives: true\n  shuffle: false\n",
        );

        assert_eq!(config.images_dir(), PathBuf::from("/data/set/images"));
        assert_eq!(config.test_data_dir(), Some(Path::new("/data/test/images")));
        assert_eq!(config.normalize_options().num_workers, 4);

        let split = config.split_options();
        assert_eq!(split.seed, 7);
        assert_eq!(split.train_fraction, 0.7);
        assert!(split.ignore_negatives);
        assert!(!split.shuffle);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = parse("train:\n  data_path: ds\n");
        assert_eq!(config.train.seed, 42);
        assert_eq!(config.train.num_workers, None);
        assert_eq!(config.split.train_split, 0.8);
        assert_eq!(config.split.val_split, 0.2);
        assert!(config.split.shuffle);
        assert!(!config.split.ignore_negatives);
    }

    #[test]
    fn empty_or_null_test_path_is_unset() {
        assert_eq!(
            parse("train:\n  data_path: ds\n  path_to_test_data: ''\n").test_data_dir(),
            None
        );
        assert_eq!(
            parse("train:\n  data_path: ds\n  path_to_test_data: null\n").test_data_dir(),
            None
        );
    }

    #[test]
    fn validate_requires_data_path() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(matches!(err, DataprepError::InvalidConfig { .. }));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = parse("train:\n  data_path: ds\n  num_workers: 0\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = PipelineConfig::from_yaml_str("train: [1, 2", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, DataprepError::ConfigParse { .. }));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, DataprepError::ConfigRead { .. }));
    }
}
