use image::GrayImage;
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};
use sharpframe_common::frame::Frame;
use std::ops::Range;
use tracing::trace;

use super::resize::resize_to_height;
use super::traits::{BlurDecision, FrameClassifier};

/// Frequency-domain blur classifier.
///
/// Algorithm:
/// 1. Convert to grayscale, resize to `target_height` (area interpolation)
/// 2. 2D FFT, shift the DC component to the centre
/// 3. Zero a `2 * mask_size` square around the centre (drops low frequencies)
/// 4. Unshift, inverse FFT
/// 5. Score is the mean of `20 * ln(|recon|)`; blurry if `score <= threshold`
///
/// Sharp frames keep a lot of energy once the low frequencies are gone, so
/// they score high. Flat or smeared frames collapse towards zero magnitude.
pub struct FftBlurClassifier {
    target_height: u32,
    mask_size: u32,
    threshold: f64,
}

impl FftBlurClassifier {
    pub fn new(target_height: u32, mask_size: u32, threshold: f64) -> Self {
        Self {
            target_height,
            mask_size,
            threshold,
        }
    }

    /// Grayscale, height-normalized copy the score is computed on.
    pub fn derivative(&self, frame: &Frame) -> GrayImage {
        resize_to_height(&frame.to_gray(), self.target_height)
    }

    pub fn score(&self, frame: &Frame) -> f64 {
        let gray = self.derivative(frame);
        let mut spectrum = Spectrum::forward(&gray);
        spectrum.shift_to_center();
        spectrum.zero_center(self.mask_size as usize);
        spectrum.shift_from_center();
        spectrum.inverse();
        spectrum.mean_log_magnitude()
    }
}

impl FrameClassifier for FftBlurClassifier {
    fn classify(&self, frame: &Frame) -> BlurDecision {
        let decision = BlurDecision::from_score(self.score(frame), self.threshold);
        trace!(
            index = frame.index(),
            score = decision.score,
            threshold = self.threshold,
            "fft score"
        );
        decision
    }

    fn name(&self) -> &str {
        "fft"
    }
}

/// Row-major complex 2D array, alive for one classification only.
struct Spectrum {
    width: usize,
    height: usize,
    bins: Vec<Complex<f64>>,
}

impl Spectrum {
    fn forward(gray: &GrayImage) -> Self {
        let mut spectrum = Self {
            width: gray.width() as usize,
            height: gray.height() as usize,
            bins: gray
                .as_raw()
                .iter()
                .map(|&p| Complex::new(p as f64, 0.0))
                .collect(),
        };
        spectrum.transform(FftDirection::Forward);
        spectrum
    }

    /// Inverse transform, normalized by `1 / (width * height)`.
    fn inverse(&mut self) {
        self.transform(FftDirection::Inverse);
        let scale = 1.0 / self.bins.len() as f64;
        for bin in &mut self.bins {
            *bin *= scale;
        }
    }

    /// Separable 2D transform: every row, then every column.
    fn transform(&mut self, direction: FftDirection) {
        let (width, height) = (self.width, self.height);
        let mut planner = FftPlanner::<f64>::new();
        let row_fft = planner.plan_fft(width, direction);
        let col_fft = planner.plan_fft(height, direction);

        for row in self.bins.chunks_exact_mut(width) {
            row_fft.process(row);
        }

        let mut column = vec![Complex::default(); height];
        for x in 0..width {
            for (y, c) in column.iter_mut().enumerate() {
                *c = self.bins[y * width + x];
            }
            col_fft.process(&mut column);
            for (y, c) in column.iter().enumerate() {
                self.bins[y * width + x] = *c;
            }
        }
    }

    /// Circular shift: the bin at `(x, y)` moves to `(x + dx, y + dy)`.
    fn roll(&mut self, dx: usize, dy: usize) {
        let (width, height) = (self.width, self.height);
        let mut rolled = vec![Complex::default(); self.bins.len()];
        for y in 0..height {
            let ty = (y + dy) % height;
            for x in 0..width {
                rolled[ty * width + (x + dx) % width] = self.bins[y * width + x];
            }
        }
        self.bins = rolled;
    }

    /// Move the DC bin from `(0, 0)` to `(width / 2, height / 2)`.
    fn shift_to_center(&mut self) {
        self.roll(self.width / 2, self.height / 2);
    }

    /// Exact inverse of `shift_to_center`, also for odd dimensions.
    fn shift_from_center(&mut self) {
        self.roll(self.width - self.width / 2, self.height - self.height / 2);
    }

    fn zero_center(&mut self, size: usize) {
        let rows = mask_bounds(self.height / 2, size, self.height);
        let cols = mask_bounds(self.width / 2, size, self.width);
        for y in rows {
            self.bins[y * self.width + cols.start..y * self.width + cols.end]
                .fill(Complex::default());
        }
    }

    fn mean_log_magnitude(&self) -> f64 {
        let total: f64 = self.bins.iter().map(|c| 20.0 * c.norm().ln()).sum();
        total / self.bins.len() as f64
    }
}

/// `[center - size, center + size)` clipped to `[0, len)`.
///
/// When the frame is narrower than the mask the square is cut at the array
/// edge rather than wrapping around to the far side.
fn mask_bounds(center: usize, size: usize, len: usize) -> Range<usize> {
    let start = center.saturating_sub(size).min(len);
    let end = center.saturating_add(size).min(len);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma, Rgb, RgbImage};

    fn classifier() -> FftBlurClassifier {
        FftBlurClassifier::new(800, 60, 17.0)
    }

    fn flat(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(0, DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value]))))
    }

    fn checkerboard(width: u32, height: u32) -> Frame {
        let gray = GrayImage::from_fn(width, height, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
        Frame::new(0, DynamicImage::ImageLuma8(gray))
    }

    #[test]
    fn flat_frame_is_blurry() {
        let decision = classifier().classify(&flat(160, 800, 128));
        assert!(decision.is_blurry, "score {}", decision.score);
    }

    #[test]
    fn checkerboard_is_sharp() {
        let decision = classifier().classify(&checkerboard(160, 800));
        assert!(!decision.is_blurry, "score {}", decision.score);
        // Only the Nyquist bin survives, reconstructing +-127.5 everywhere.
        let expected = 20.0 * 127.5f64.ln();
        assert!((decision.score - expected).abs() < 1e-6, "score {}", decision.score);
    }

    #[test]
    fn color_checkerboard_is_sharp() {
        let rgb = RgbImage::from_fn(160, 800, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let decision = classifier().classify(&Frame::new(4, DynamicImage::ImageRgb8(rgb)));
        assert!(!decision.is_blurry);
    }

    #[test]
    fn classification_is_deterministic() {
        let gray = GrayImage::from_fn(96, 120, |x, y| Luma([((x * 7 + y * 13) % 251) as u8]));
        let frame = Frame::new(0, DynamicImage::ImageLuma8(gray));
        let c = classifier();
        let first = c.classify(&frame);
        for _ in 0..3 {
            assert_eq!(c.classify(&frame), first);
        }
    }

    #[test]
    fn score_equal_to_threshold_is_blurry() {
        let gray = GrayImage::from_fn(80, 800, |x, y| Luma([((x * 31 + y * 17) % 256) as u8]));
        let frame = Frame::new(0, DynamicImage::ImageLuma8(gray));
        let score = classifier().score(&frame);
        assert!(score.is_finite());

        let at = FftBlurClassifier::new(800, 60, score).classify(&frame);
        assert_eq!(at.score, score);
        assert!(at.is_blurry);

        let below = FftBlurClassifier::new(800, 60, score - 1e-6).classify(&frame);
        assert!(!below.is_blurry);
    }

    #[test]
    fn derivative_height_normalized() {
        let c = classifier();
        assert_eq!(c.derivative(&flat(1920, 1080, 10)).dimensions(), (1422, 800));
        assert_eq!(c.derivative(&flat(300, 200, 10)).dimensions(), (1200, 800));
    }

    #[test]
    fn narrow_frame_mask_is_clipped() {
        assert_eq!(mask_bounds(20, 60, 40), 0..40);
        assert_eq!(mask_bounds(400, 60, 800), 340..460);
        assert_eq!(mask_bounds(0, 60, 1), 0..1);

        // cx = 20 < 60: every column of the centre band is zeroed, the
        // Nyquist row still survives.
        let decision = classifier().classify(&checkerboard(40, 800));
        assert!(!decision.is_blurry, "score {}", decision.score);
    }

    #[test]
    fn shift_round_trip_odd_dimensions() {
        let gray = GrayImage::from_fn(5, 3, |x, y| Luma([(x + 5 * y) as u8]));
        let mut spectrum = Spectrum {
            width: 5,
            height: 3,
            bins: gray.as_raw().iter().map(|&p| Complex::new(p as f64, 0.0)).collect(),
        };
        let original = spectrum.bins.clone();

        spectrum.shift_to_center();
        // DC position (0, 0) lands on the centre (2, 1).
        assert_eq!(spectrum.bins[5 + 2], original[0]);

        spectrum.shift_from_center();
        assert_eq!(spectrum.bins, original);
    }

    #[test]
    fn transform_round_trip() {
        let gray = GrayImage::from_fn(6, 4, |x, y| Luma([(x * 40 + y * 3) as u8]));
        let mut spectrum = Spectrum::forward(&gray);
        // DC bin is the pixel sum.
        let sum: f64 = gray.as_raw().iter().map(|&p| p as f64).sum();
        assert!((spectrum.bins[0].re - sum).abs() < 1e-9);

        spectrum.inverse();
        for (c, &p) in spectrum.bins.iter().zip(gray.as_raw()) {
            assert!((c.re - p as f64).abs() < 1e-9);
            assert!(c.im.abs() < 1e-9);
        }
    }
}
