#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};

pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([40, 90, 160])))
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode fixture image");
    bytes
}

pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write fixture file");
}

pub fn write_image(path: &Path, format: ImageFormat) {
    write_file(path, image_bytes(4, 3, format));
}

pub fn write_label(path: &Path, contents: &str) {
    write_file(path, contents);
}

/// Dataset root with `images/` and `labels/` under a temp dir.
pub struct DatasetDir {
    pub temp: tempfile::TempDir,
}

impl DatasetDir {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("images")).expect("create images dir");
        fs::create_dir_all(temp.path().join("labels")).expect("create labels dir");
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn images(&self) -> PathBuf {
        self.root().join("images")
    }

    pub fn labels(&self) -> PathBuf {
        self.root().join("labels")
    }

    /// Add a canonical image with a one-box label.
    pub fn add_labelled(&self, stem: &str) {
        write_image(&self.images().join(format!("{stem}.jpg")), ImageFormat::Jpeg);
        write_label(
            &self.labels().join(format!("{stem}.txt")),
            "0 0.5 0.5 0.25 0.25\n",
        );
    }

    pub fn write_config(&self, body: &str) -> PathBuf {
        let path = self.root().join("config.yaml");
        write_file(&path, body);
        path
    }
}

/// Sorted regular-file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry"))
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn manifest_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read manifest")
        .lines()
        .map(str::to_string)
        .collect()
}
