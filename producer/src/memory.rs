use image::DynamicImage;
use sharpframe_common::frame::Frame;

use crate::FrameSource;

/// Frames held in memory. Used to drive the pipeline without video I/O.
pub struct MemorySource {
    images: std::vec::IntoIter<DynamicImage>,
    next_index: u64,
}

impl MemorySource {
    pub fn new(images: Vec<DynamicImage>) -> Self {
        Self {
            images: images.into_iter(),
            next_index: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Option<Frame> {
        let image = self.images.next()?;
        let frame = Frame::new(self.next_index, image);
        self.next_index += 1;
        Some(frame)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn indices_monotonic_then_end() {
        let n = 5;
        let images = (0..n)
            .map(|_| DynamicImage::ImageRgb8(RgbImage::new(4, 4)))
            .collect();
        let mut source = MemorySource::new(images);

        for expected in 0..n as u64 {
            assert_eq!(source.next_frame().map(|f| f.index()), Some(expected));
        }
        assert!(source.next_frame().is_none(), "call N+1 must end the stream");
        assert!(source.next_frame().is_none(), "stream must stay ended");
    }

    #[test]
    fn empty_source() {
        let mut source = MemorySource::new(Vec::new());
        assert!(source.next_frame().is_none());
    }
}
