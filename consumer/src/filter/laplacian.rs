use image::GrayImage;
use sharpframe_common::frame::Frame;
use tracing::trace;

use super::traits::{BlurDecision, FrameClassifier};

/// 3x3 aperture Laplacian. Only the corners and the centre carry weight.
const KERNEL: [[i32; 3]; 3] = [[2, 0, 2], [0, -8, 0], [2, 0, 2]];

/// Variance-of-Laplacian blur classifier.
///
/// Works on the full-resolution grayscale frame with reflect-101 borders.
/// Cheaper than the FFT path but its threshold depends on the source
/// resolution.
pub struct LaplacianClassifier {
    threshold: f64,
}

impl LaplacianClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn score(&self, frame: &Frame) -> f64 {
        laplacian_variance(&frame.to_gray())
    }
}

impl FrameClassifier for LaplacianClassifier {
    fn classify(&self, frame: &Frame) -> BlurDecision {
        let decision = BlurDecision::from_score(self.score(frame), self.threshold);
        trace!(
            index = frame.index(),
            score = decision.score,
            threshold = self.threshold,
            "laplacian variance"
        );
        decision
    }

    fn name(&self) -> &str {
        "laplacian"
    }
}

/// Mirror an out-of-range coordinate without repeating the edge pixel.
fn reflect_101(i: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i >= len {
        i = 2 * len - 2 - i;
    }
    i as usize
}

fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as i64, height as i64);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let raw = gray.as_raw();
    let at = |x: i64, y: i64| raw[reflect_101(y, h) * width as usize + reflect_101(x, w)] as i32;

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let mut response = 0i32;
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, &k) in row.iter().enumerate() {
                    if k != 0 {
                        response += k * at(x + kx as i64 - 1, y + ky as i64 - 1);
                    }
                }
            }
            let r = response as f64;
            sum += r;
            sum_sq += r * r;
        }
    }

    let n = (w * h) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma};

    fn frame(gray: GrayImage) -> Frame {
        Frame::new(0, DynamicImage::ImageLuma8(gray))
    }

    #[test]
    fn flat_frame_is_blurry() {
        let c = LaplacianClassifier::new(1300.0);
        let decision = c.classify(&frame(GrayImage::from_pixel(64, 48, Luma([200]))));
        assert_eq!(decision.score, 0.0);
        assert!(decision.is_blurry);
    }

    #[test]
    fn stripes_are_sharp() {
        let stripes = GrayImage::from_fn(64, 48, |x, _| Luma([if x % 2 == 0 { 0 } else { 255 }]));
        let decision = LaplacianClassifier::new(1300.0).classify(&frame(stripes));
        assert!(!decision.is_blurry, "score {}", decision.score);
    }

    #[test]
    fn pixel_checkerboard_cancels() {
        // Diagonal neighbours share the centre's colour, so the corner-only
        // kernel sums to zero everywhere.
        let board = GrayImage::from_fn(32, 32, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
        assert_eq!(laplacian_variance(&board), 0.0);
    }

    #[test]
    fn reflect_indices() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-1, 1), 0);
        assert_eq!(reflect_101(1, 1), 0);
    }

    #[test]
    fn tiny_frames_do_not_panic() {
        assert_eq!(laplacian_variance(&GrayImage::new(1, 1)), 0.0);
        assert_eq!(laplacian_variance(&GrayImage::new(0, 0)), 0.0);
        let _ = laplacian_variance(&GrayImage::from_fn(2, 1, |x, _| Luma([x as u8 * 255])));
    }
}
