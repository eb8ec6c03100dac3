use sharpframe_common::frame::Frame;

/// Sharpness verdict for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurDecision {
    pub score: f64,
    pub is_blurry: bool,
}

impl BlurDecision {
    /// A score at or below the threshold is blurry.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        Self {
            score,
            is_blurry: score <= threshold,
        }
    }
}

/// Blur classifier interface.
///
/// Implementations are pure: the decision depends only on the frame's pixels
/// and the parameters the classifier was built with.
pub trait FrameClassifier {
    fn classify(&self, frame: &Frame) -> BlurDecision;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
