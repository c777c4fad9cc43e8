//! Pixel helpers shared by the detector and both descriptor extractors

use image::GrayImage;

/// Check for at least `min_count` consecutive set entries on the 16-pixel
/// Bresenham circle, wrapping around.
pub fn has_consecutive_pixels(pixels: &[bool; 16], min_count: usize) -> bool {
    if min_count > 16 || min_count == 0 {
        return false;
    }

    let mut mask: u16 = 0;
    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            mask |= 1 << i;
        }
    }

    // AND of the mask with its rotations leaves a bit set only where a run starts
    let mut run = mask;
    for i in 1..min_count {
        run &= mask.rotate_left(i as u32);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

/// Bilinear sample at a fractional location, clamping to the nearest edge
/// pixel outside the image.
pub fn bilinear_sample(img: &GrayImage, x: f32, y: f32) -> f32 {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let raw = img.as_raw();

    let x0 = x.floor();
    let y0 = y.floor();
    if x0 < 0.0 || y0 < 0.0 || x0 + 1.0 >= w as f32 || y0 + 1.0 >= h as f32 {
        let cx = x.round().clamp(0.0, (w - 1) as f32) as usize;
        let cy = y.round().clamp(0.0, (h - 1) as f32) as usize;
        return raw[cy * w + cx] as f32;
    }

    let dx = x - x0;
    let dy = y - y0;
    let (xi, yi) = (x0 as usize, y0 as usize);

    let p00 = raw[yi * w + xi] as f32;
    let p10 = raw[yi * w + xi + 1] as f32;
    let p01 = raw[(yi + 1) * w + xi] as f32;
    let p11 = raw[(yi + 1) * w + xi + 1] as f32;

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;
    top * (1.0 - dy) + bottom * dy
}

/// Intensity centroid orientation of a square patch, in radians.
///
/// Pixels outside the image are clamped to the border.
pub fn intensity_centroid_angle(img: &GrayImage, x: f32, y: f32, patch_size: usize) -> f32 {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let raw = img.as_raw();
    let half = (patch_size / 2) as i32;
    let (cx, cy) = (x.round() as i32, y.round() as i32);

    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dy in -half..=half {
        let yy = (cy + dy).clamp(0, h - 1) as usize;
        for dx in -half..=half {
            let xx = (cx + dx).clamp(0, w - 1) as usize;
            let intensity = raw[yy * w as usize + xx] as i64;
            m10 += dx as i64 * intensity;
            m01 += dy as i64 * intensity;
        }
    }
    (m01 as f32).atan2(m10 as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_consecutive_pixels_simple() {
        let mut pixels = [false; 16];
        for p in pixels.iter_mut().take(9) {
            *p = true;
        }
        assert!(has_consecutive_pixels(&pixels, 9));
        assert!(!has_consecutive_pixels(&pixels, 10));
    }

    #[test]
    fn test_consecutive_pixels_wrap_around() {
        let mut pixels = [false; 16];
        for i in (12..16).chain(0..5) {
            pixels[i] = true;
        }
        assert!(has_consecutive_pixels(&pixels, 9));
    }

    #[test]
    fn test_non_consecutive_pixels() {
        let mut pixels = [false; 16];
        for i in (0..16).step_by(2) {
            pixels[i] = true;
        }
        assert!(!has_consecutive_pixels(&pixels, 2));
        assert!(has_consecutive_pixels(&pixels, 1));
    }

    #[test]
    fn test_bilinear_interpolates_and_clamps() {
        let img = GrayImage::from_fn(4, 4, |x, _| image::Luma([(x * 10) as u8]));
        assert!((bilinear_sample(&img, 1.5, 1.0) - 15.0).abs() < 1e-4);
        assert_eq!(bilinear_sample(&img, -5.0, 2.0), 0.0);
        assert_eq!(bilinear_sample(&img, 10.0, 2.0), 30.0);
    }

    #[test]
    fn test_centroid_points_towards_bright_side() {
        let img = GrayImage::from_fn(21, 21, |x, _| image::Luma([if x > 10 { 200 } else { 0 }]));
        let angle = intensity_centroid_angle(&img, 10.0, 10.0, 7);
        assert!(angle.abs() < 1e-3);

        let img = GrayImage::from_fn(21, 21, |_, y| image::Luma([if y > 10 { 200 } else { 0 }]));
        let angle = intensity_centroid_angle(&img, 10.0, 10.0, 7);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
    }

    fn longest_circular_run(pixels: &[bool; 16]) -> usize {
        (0..16)
            .map(|start| (0..16).take_while(|k| pixels[(start + k) % 16]).count())
            .max()
            .unwrap_or(0)
    }

    proptest! {
        #[test]
        fn prop_consecutive_pixels_matches_run_scan(
            pixels in proptest::array::uniform16(any::<bool>()),
            min_count in 1usize..=16,
        ) {
            prop_assert_eq!(
                has_consecutive_pixels(&pixels, min_count),
                longest_circular_run(&pixels) >= min_count
            );
        }
    }
}
