//! Manifest files: one bare file name per line, no header, no quoting.

use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::DataprepError;
use crate::vfs::DatasetFs;

/// Render file names as manifest bytes.
pub fn render_manifest(path: &Path, names: &[String]) -> Result<Vec<u8>, DataprepError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for name in names {
        writer
            .write_record([name])
            .map_err(|source| DataprepError::ManifestWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }

    writer.into_inner().map_err(|e| DataprepError::ManifestWrite {
        path: path.to_path_buf(),
        source: e.into_error().into(),
    })
}

/// Write a manifest, replacing whatever was there.
pub fn write_manifest<F: DatasetFs + ?Sized>(
    fs: &F,
    path: &Path,
    names: &[String],
) -> Result<(), DataprepError> {
    let bytes = render_manifest(path, names)?;
    fs.write(path, &bytes)
}

/// Read the file names listed in a manifest.
pub fn read_manifest<F: DatasetFs + ?Sized>(
    fs: &F,
    path: &Path,
) -> Result<Vec<String>, DataprepError> {
    let bytes = fs.read(path)?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
