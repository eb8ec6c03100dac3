use image::ImageFormat;
use sharpframe_common::config::OutputConfig;
use sharpframe_common::frame::Frame;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::keys::frame_file_name;

/// Destination for frames that passed the blur check.
pub trait FrameSink {
    /// Make sure the destination exists. Safe to call more than once.
    fn ensure_directory(&mut self) -> Result<(), StorageError>;

    /// Persist the original, full-resolution frame under its source index.
    fn save(&mut self, frame: &Frame) -> Result<(), StorageError>;
}

/// Writes each frame as `Frame<index>.<ext>` into a local directory.
pub struct DirectorySink {
    dir: PathBuf,
    extension: String,
    format: ImageFormat,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Result<Self, StorageError> {
        let format = ImageFormat::from_extension(extension)
            .filter(|f| f.can_write())
            .ok_or_else(|| StorageError::Format(extension.to_string()))?;
        Ok(Self {
            dir: dir.into(),
            extension: extension.to_string(),
            format,
        })
    }

    pub fn from_config(config: &OutputConfig) -> Result<Self, StorageError> {
        Self::new(&config.dir, &config.extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for DirectorySink {
    fn ensure_directory(&mut self) -> Result<(), StorageError> {
        let dir_str = self.dir.display().to_string();
        if self.dir.is_dir() {
            info!(dir = dir_str, "output directory exists");
            return Ok(());
        }
        if self.dir.exists() {
            return Err(StorageError::NotADirectory(dir_str));
        }

        info!(dir = dir_str, "creating output directory");
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::CreateDir(dir_str, e))?;
        Ok(())
    }

    fn save(&mut self, frame: &Frame) -> Result<(), StorageError> {
        let path = self
            .dir
            .join(frame_file_name(frame.index(), &self.extension));

        frame
            .image()
            .save_with_format(&path, self.format)
            .map_err(|e| StorageError::Write(path.display().to_string(), e))?;

        debug!(
            path = path.display().to_string(),
            index = frame.index(),
            width = frame.width(),
            height = frame.height(),
            channels = frame.channels(),
            "saved frame"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("output path {0} exists and is not a directory")]
    NotADirectory(String),
    #[error("failed to create output directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write frame {0}: {1}")]
    Write(String, image::ImageError),
    #[error("unsupported output image extension {0:?}")]
    Format(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn ensure_directory_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("non_blur");
        let mut sink = DirectorySink::new(&dir, "jpg").unwrap();

        sink.ensure_directory().unwrap();
        assert!(dir.is_dir());
        sink.ensure_directory().unwrap();
        assert!(dir.is_dir());
        assert!(entries(&dir).is_empty());
        assert_eq!(entries(root.path()), vec!["non_blur".to_string()]);
    }

    #[test]
    fn ensure_directory_creates_parents() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("a").join("b");
        DirectorySink::new(&dir, "png").unwrap().ensure_directory().unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn file_in_the_way() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("taken");
        std::fs::write(&path, "x").unwrap();
        let result = DirectorySink::new(&path, "jpg").unwrap().ensure_directory();
        assert!(matches!(result, Err(StorageError::NotADirectory(_))));
    }

    #[test]
    fn save_writes_named_full_resolution_file() {
        let root = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(root.path(), "png").unwrap();
        sink.ensure_directory().unwrap();

        let image = RgbImage::from_fn(37, 21, |x, y| image::Rgb([x as u8, y as u8, 9]));
        sink.save(&Frame::new(12, DynamicImage::ImageRgb8(image.clone())))
            .unwrap();

        assert_eq!(entries(root.path()), vec!["Frame12.png".to_string()]);
        let written = image::open(root.path().join("Frame12.png")).unwrap().to_rgb8();
        assert_eq!(written, image);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(root.path().join("never_created"), "jpg").unwrap();
        let frame = Frame::new(0, DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        assert!(matches!(sink.save(&frame), Err(StorageError::Write(..))));
    }

    #[test]
    fn unknown_extension_rejected() {
        assert!(matches!(
            DirectorySink::new("out", "nope"),
            Err(StorageError::Format(_))
        ));
    }
}
