use std::path::PathBuf;
use thiserror::Error;

/// The main error type for dataprep operations.
#[derive(Debug, Error)]
pub enum DataprepError {
    #[error("IO error at {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan directory {path}: {message}")]
    DirectoryScan { path: PathBuf, message: String },

    #[error("Refusing to overwrite existing file {path}")]
    TargetExists { path: PathBuf },

    #[error("Directory not found: {path}")]
    MissingDirectory { path: PathBuf },

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Can't open image {path}: {source}")]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Can't decode HEIF image {path}: {message}")]
    HeifDecode { path: PathBuf, message: String },

    #[error("Can't open image {path}: HEIC/HEIF support is not built in (enable the `heic` feature)")]
    HeifUnsupported { path: PathBuf },

    #[error("Failed to encode {path} as JPEG: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] serde_json::Error),
}

impl DataprepError {
    /// Attach a path to a raw IO error.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataprepError::IoAt {
            path: path.into(),
            source,
        }
    }
}
