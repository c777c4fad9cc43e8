use aif_core::{GrayImage, Keypoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::utils::bilinear_sample;

/// Bytes per descriptor row
pub const DESCRIPTOR_SIZE: usize = 32;
const PAIR_COUNT: usize = DESCRIPTOR_SIZE * 8;
const PAIR_SEED: u64 = 0x0b71_ef5e;

/// Steered BRIEF: binary intensity comparisons on a test pattern rotated by
/// each key-point's orientation.
#[derive(Debug, Clone)]
pub struct BriefExtractor {
    pairs: Vec<[f32; 4]>,
}

impl BriefExtractor {
    /// Build the test pattern for a patch of side `patch_size`. The pattern
    /// only depends on the patch size.
    pub fn new(patch_size: usize) -> Self {
        let radius = (patch_size / 2) as i32;
        let mut rng = StdRng::seed_from_u64(PAIR_SEED);
        let pairs = (0..PAIR_COUNT)
            .map(|_| {
                [
                    rng.gen_range(-radius..=radius) as f32,
                    rng.gen_range(-radius..=radius) as f32,
                    rng.gen_range(-radius..=radius) as f32,
                    rng.gen_range(-radius..=radius) as f32,
                ]
            })
            .collect();
        Self { pairs }
    }

    /// Packed descriptors, `DESCRIPTOR_SIZE` bytes per key-point, in key-point order
    pub fn compute(&self, img: &GrayImage, keypoints: &[Keypoint]) -> Vec<u8> {
        let rows: Vec<[u8; DESCRIPTOR_SIZE]> =
            keypoints.par_iter().map(|kp| self.describe(img, kp)).collect();
        rows.into_iter().flatten().collect()
    }

    fn describe(&self, img: &GrayImage, kp: &Keypoint) -> [u8; DESCRIPTOR_SIZE] {
        let (s, c) = kp.angle.sin_cos();
        let mut d = [0u8; DESCRIPTOR_SIZE];
        for (i, &[x1, y1, x2, y2]) in self.pairs.iter().enumerate() {
            let a = bilinear_sample(img, kp.x + c * x1 - s * y1, kp.y + s * x1 + c * y1);
            let b = bilinear_sample(img, kp.x + c * x2 - s * y2, kp.y + s * x2 + c * y2);
            d[i / 8] |= ((a < b) as u8) << (i % 8);
        }
        d
    }
}
