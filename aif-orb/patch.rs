use aif_core::{GrayImage, Keypoint};
use rayon::prelude::*;

use crate::utils::bilinear_sample;

/// Oriented intensity patch sampled on a regular grid, mean-subtracted and
/// scaled to unit length. Flat patches give an all-zero row.
#[derive(Debug, Clone)]
pub struct PatchExtractor {
    offsets: Vec<(f32, f32)>,
}

impl PatchExtractor {
    pub fn new(patch_size: usize, grid_size: usize) -> Self {
        let half = (patch_size / 2) as f32;
        let step = if grid_size > 1 { 2.0 * half / (grid_size - 1) as f32 } else { 0.0 };
        let offsets = (0..grid_size)
            .flat_map(|row| {
                (0..grid_size).map(move |col| (-half + col as f32 * step, -half + row as f32 * step))
            })
            .collect();
        Self { offsets }
    }

    /// Elements per descriptor row
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn compute(&self, img: &GrayImage, keypoints: &[Keypoint]) -> Vec<f32> {
        keypoints
            .par_iter()
            .flat_map_iter(|kp| self.describe(img, kp))
            .collect()
    }

    fn describe(&self, img: &GrayImage, kp: &Keypoint) -> Vec<f32> {
        let (s, c) = kp.angle.sin_cos();
        let mut values: Vec<f32> = self
            .offsets
            .iter()
            .map(|&(ox, oy)| bilinear_sample(img, kp.x + c * ox - s * oy, kp.y + s * ox + c * oy))
            .collect();

        let mean = values.iter().sum::<f32>() / values.len().max(1) as f32;
        values.iter_mut().for_each(|v| *v -= mean);
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm < 1e-6 {
            values.iter_mut().for_each(|v| *v = 0.0);
        } else {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aif_core::Luma;

    #[test]
    fn test_rows_are_unit_length() {
        let img = GrayImage::from_fn(48, 48, |x, y| Luma([((x * 7) ^ (y * 5)) as u8]));
        let extractor = PatchExtractor::new(15, 8);
        assert_eq!(extractor.len(), 64);

        let data = extractor.compute(&img, &[Keypoint::new(20.0, 24.0), Keypoint::new(30.0, 12.0)]);
        assert_eq!(data.len(), 128);
        for row in data.chunks(64) {
            let norm: f32 = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
            assert!(row.iter().sum::<f32>().abs() < 1e-3);
        }
    }

    #[test]
    fn test_flat_patch_is_zero() {
        let img = GrayImage::from_pixel(30, 30, Luma([7]));
        let data = PatchExtractor::new(9, 3).compute(&img, &[Keypoint::new(15.0, 15.0)]);
        assert_eq!(data, vec![0.0; 9]);
    }

    #[test]
    fn test_orientation_steers_sampling() {
        let img = GrayImage::from_fn(40, 40, |x, _| Luma([(x * 6) as u8]));
        let extractor = PatchExtractor::new(9, 3);
        let upright = extractor.compute(&img, &[Keypoint::new(20.0, 20.0)]);
        let turned = Keypoint { angle: std::f32::consts::FRAC_PI_2, ..Keypoint::new(20.0, 20.0) };
        let rotated = extractor.compute(&img, &[turned]);
        assert_ne!(upright, rotated);
    }
}
