//! Frame sources: decode an input into an ordered, forward-only sequence of
//! indexed [`Frame`]s.

mod ffmpeg;
mod images;
mod memory;

pub use ffmpeg::VideoSource;
pub use images::ImageDirSource;
pub use memory::MemorySource;

use sharpframe_common::config::InputConfig;
use sharpframe_common::frame::Frame;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("input not found: {0}")]
    NotFound(String),
    #[error("ffprobe failed for {0}: {1}")]
    Probe(String, String),
    #[error("no decodable video stream in {0}")]
    NoVideoStream(String),
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(String),
    #[error("ffmpeg could not decode {0}: {1}")]
    Decode(String, String),
    #[error("failed to read frame directory {0}: {1}")]
    ReadDir(String, std::io::Error),
    #[error("unknown input mode {0:?}, expected 'video' or 'images'")]
    UnknownMode(String),
}

/// A lazy, non-restartable sequence of frames.
///
/// Indices start at 0 and grow by one per decoded frame. A decode failure
/// and plain exhaustion both end the sequence; once `next_frame` has
/// returned `None` it keeps returning `None`.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Open the source selected by `config.mode`.
pub fn open(config: &InputConfig) -> Result<Box<dyn FrameSource>, SourceError> {
    let source: Box<dyn FrameSource> = match config.mode.as_str() {
        "video" => Box::new(VideoSource::open(
            &config.path,
            &config.ffprobe,
            &config.ffmpeg,
        )?),
        "images" => Box::new(ImageDirSource::open(&config.path)?),
        other => return Err(SourceError::UnknownMode(other.to_string())),
    };
    info!(
        path = config.path.display().to_string(),
        source = source.name(),
        "opened frame source"
    );
    Ok(source)
}
