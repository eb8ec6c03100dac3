use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Video file, or a directory of frames when `mode = "images"`.
    pub path: PathBuf,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_primary")]
    pub primary: String,
    /// Frames are resized to this height before the FFT so one threshold fits every source.
    #[serde(default = "default_target_height")]
    pub target_height: u32,
    /// Half-width of the low-frequency square zeroed around the DC component.
    #[serde(default = "default_mask_size")]
    pub mask_size: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_laplacian_threshold")]
    pub laplacian_threshold: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            primary: default_filter_primary(),
            target_height: default_target_height(),
            mask_size: default_mask_size(),
            threshold: default_threshold(),
            laplacian_threshold: default_laplacian_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub const INPUT_MODES: &[&str] = &["video", "images"];
pub const FILTERS: &[&str] = &["fft", "laplacian"];

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.input.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("input.path must not be empty".into()));
        }
        if !INPUT_MODES.contains(&self.input.mode.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "input.mode must be one of {INPUT_MODES:?}, got {:?}",
                self.input.mode
            )));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output.dir must not be empty".into()));
        }
        if image::ImageFormat::from_extension(&self.output.extension)
            .map_or(true, |f| !f.can_write())
        {
            return Err(ConfigError::Invalid(format!(
                "output.extension {:?} is not a writable image format",
                self.output.extension
            )));
        }
        if !FILTERS.contains(&self.filter.primary.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "filter.primary must be one of {FILTERS:?}, got {:?}",
                self.filter.primary
            )));
        }
        if self.filter.target_height == 0 {
            return Err(ConfigError::Invalid("filter.target_height must be positive".into()));
        }
        if !self.filter.threshold.is_finite() || !self.filter.laplacian_threshold.is_finite() {
            return Err(ConfigError::Invalid("filter thresholds must be finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_mode() -> String {
    "video".into()
}
fn default_ffmpeg() -> String {
    "ffmpeg".into()
}
fn default_ffprobe() -> String {
    "ffprobe".into()
}
fn default_extension() -> String {
    "jpg".into()
}
fn default_filter_primary() -> String {
    "fft".into()
}
fn default_target_height() -> u32 {
    800
}
fn default_mask_size() -> u32 {
    60
}
fn default_threshold() -> f64 {
    17.0
}
fn default_laplacian_threshold() -> f64 {
    1300.0
}
fn default_log_level() -> String {
    "info".into()
}
