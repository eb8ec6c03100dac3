use image::{DynamicImage, GrayImage, Luma};

/// A decoded video frame tagged with its position in the source.
///
/// The pixel data is always single-channel (`Luma8`) or three-channel
/// (`Rgb8`); any other layout is converted to `Rgb8` on construction.
/// Frames are immutable once built.
#[derive(Debug, Clone)]
pub struct Frame {
    index: u64,
    image: DynamicImage,
}

impl Frame {
    pub fn new(index: u64, image: DynamicImage) -> Self {
        let image = match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        Self { index, image }
    }

    /// Zero-based position of this frame in its source.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// Single-channel copy using BT.601 luma weights in 14-bit fixed point.
    ///
    /// `image`'s own `to_luma8` uses Rec. 709 weights; the blur thresholds were
    /// tuned against BT.601 grayscale, so the conversion is done here.
    pub fn to_gray(&self) -> GrayImage {
        match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            other => {
                let rgb = other.to_rgb8();
                GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    let [r, g, b] = rgb.get_pixel(x, y).0;
                    Luma([luma_bt601(r, g, b)])
                })
            }
        }
    }
}

const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const FIXED_SHIFT: u32 = 14;

fn luma_bt601(r: u8, g: u8, b: u8) -> u8 {
    let sum = R_WEIGHT * r as u32 + G_WEIGHT * g as u32 + B_WEIGHT * b as u32;
    ((sum + (1 << (FIXED_SHIFT - 1))) >> FIXED_SHIFT) as u8
}
