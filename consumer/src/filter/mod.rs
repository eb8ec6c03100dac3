pub mod fft;
pub mod laplacian;
mod resize;
pub mod traits;

use sharpframe_common::config::FilterConfig;

pub use fft::FftBlurClassifier;
pub use laplacian::LaplacianClassifier;
pub use traits::FrameClassifier;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("unknown classifier {0:?}, expected 'fft' or 'laplacian'")]
    UnknownClassifier(String),
}

/// Build the classifier named by `filter.primary`.
pub fn from_config(config: &FilterConfig) -> Result<Box<dyn FrameClassifier>, FilterError> {
    let classifier: Box<dyn FrameClassifier> = match config.primary.as_str() {
        "fft" => Box::new(FftBlurClassifier::new(
            config.target_height,
            config.mask_size,
            config.threshold,
        )),
        "laplacian" => Box::new(LaplacianClassifier::new(config.laplacian_threshold)),
        other => return Err(FilterError::UnknownClassifier(other.to_string())),
    };
    Ok(classifier)
}
