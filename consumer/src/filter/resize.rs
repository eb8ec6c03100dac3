use image::{GrayImage, Luma};

/// Width that keeps the aspect ratio when scaling `height` to `target_height`.
pub fn target_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return 1;
    }
    let scaled = (width as f64 * target_height as f64 / height as f64).round();
    (scaled as u32).max(1)
}

/// Area-interpolated resize to a fixed height, width scaled by the same ratio.
pub fn resize_to_height(gray: &GrayImage, target_height: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(1, target_height);
    }
    let dst_width = target_width(width, height, target_height);
    if (dst_width, target_height) == (width, height) {
        return gray.clone();
    }
    area_resize(gray, dst_width, target_height)
}

/// Source taps `(index, weight)` for every destination position along one axis.
///
/// A destination pixel covers the source interval `[d * scale, (d + 1) * scale)`;
/// each source pixel contributes in proportion to its overlap with it.
fn area_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f64)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len as usize);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 1e-9).then_some((s, overlap / scale))
                })
                .collect()
        })
        .collect()
}

fn area_resize(gray: &GrayImage, dst_width: u32, dst_height: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (src_w, dst_w) = (width as usize, dst_width as usize);
    let x_taps = area_weights(width, dst_width);
    let y_taps = area_weights(height, dst_height);
    let raw = gray.as_raw();

    // Horizontal pass: height x dst_width
    let mut rows = vec![0.0f64; height as usize * dst_w];
    for y in 0..height as usize {
        let src_row = &raw[y * src_w..(y + 1) * src_w];
        let out_row = &mut rows[y * dst_w..(y + 1) * dst_w];
        for (out, taps) in out_row.iter_mut().zip(&x_taps) {
            *out = taps.iter().map(|&(s, w)| src_row[s] as f64 * w).sum();
        }
    }

    // Vertical pass
    GrayImage::from_fn(dst_width, dst_height, |x, y| {
        let value: f64 = y_taps[y as usize]
            .iter()
            .map(|&(s, w)| rows[s * dst_w + x as usize] * w)
            .sum();
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
