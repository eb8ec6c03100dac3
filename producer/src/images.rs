use sharpframe_common::frame::Frame;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{FrameSource, SourceError};

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Frames read from a directory of still images (e.g. frames extracted by
/// another tool), in file-name order.
pub struct ImageDirSource {
    files: std::vec::IntoIter<PathBuf>,
    next_index: u64,
    finished: bool,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        let dir_str = dir.display().to_string();
        if !dir.is_dir() {
            return Err(SourceError::NotFound(dir_str));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| SourceError::ReadDir(dir_str.clone(), e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SourceError::ReadDir(dir_str.clone(), e))?.path();
            if path.is_file() && is_frame_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        debug!(dir = dir_str, count = files.len(), "listed frame files");

        Ok(Self {
            files: files.into_iter(),
            next_index: 0,
            finished: false,
        })
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }
        let Some(path) = self.files.next() else {
            self.finished = true;
            return None;
        };

        match image::open(&path) {
            Ok(img) => {
                let frame = Frame::new(self.next_index, img);
                self.next_index += 1;
                Some(frame)
            }
            Err(e) => {
                warn!(
                    path = path.display().to_string(),
                    index = self.next_index,
                    error = %e,
                    "failed to decode frame, ending stream"
                );
                self.finished = true;
                None
            }
        }
    }

    fn name(&self) -> &str {
        "images"
    }
}
