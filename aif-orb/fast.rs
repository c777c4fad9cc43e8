use aif_core::{GrayImage, Keypoint};
use rayon::prelude::*;

use crate::error::OrbResult;
use crate::types::{FastParameters, ScoredKeypoint};
use crate::utils::has_consecutive_pixels;

const BORDER: usize = 3;

/// FAST segment-test corner detector with response-ordered suppression
#[derive(Debug, Clone)]
pub struct FastDetector {
    params: FastParameters,
}

impl FastDetector {
    /// Bresenham circle of radius 3, in consecutive order
    pub const CIRCLE: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    pub fn new(params: FastParameters) -> OrbResult<Self> {
        crate::config::validate_fast(&params)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &FastParameters {
        &self.params
    }

    /// Detect corners where `mask` is non-zero, strongest first.
    ///
    /// Images smaller than the circle diameter yield no corners.
    pub fn detect(&self, img: &GrayImage, mask: Option<&GrayImage>) -> Vec<ScoredKeypoint> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        if w < 2 * BORDER + 1 || h < 2 * BORDER + 1 {
            return Vec::new();
        }
        let raw = img.as_raw();
        let mask_raw = mask.map(|m| m.as_raw());

        let candidates: Vec<ScoredKeypoint> = (BORDER..h - BORDER)
            .into_par_iter()
            .flat_map_iter(|y| {
                (BORDER..w - BORDER).filter_map(move |x| {
                    if let Some(m) = mask_raw {
                        if m[y * w + x] == 0 {
                            return None;
                        }
                    }
                    self.segment_test(raw, w, x, y).map(|response| ScoredKeypoint {
                        keypoint: Keypoint {
                            x: x as f32,
                            y: y as f32,
                            response,
                            ..Keypoint::default()
                        },
                        response,
                    })
                })
            })
            .collect();

        let mut kept = non_maximum_suppression(candidates, self.params.nms_distance);
        kept.truncate(self.params.max_features);
        kept
    }

    /// Segment test at `(x, y)`; returns the mean absolute difference of the
    /// winning arc class when the pixel is a corner.
    fn segment_test(&self, raw: &[u8], w: usize, x: usize, y: usize) -> Option<f32> {
        let center = raw[y * w + x] as i16;
        let t = self.params.threshold as i16;

        let mut brighter = [false; 16];
        let mut darker = [false; 16];
        let (mut bright_sum, mut dark_sum) = (0i32, 0i32);
        let (mut bright_n, mut dark_n) = (0i32, 0i32);

        for (i, &(dx, dy)) in Self::CIRCLE.iter().enumerate() {
            let px = (x as i32 + dx) as usize;
            let py = (y as i32 + dy) as usize;
            let v = raw[py * w + px] as i16;
            if v >= center + t {
                brighter[i] = true;
                bright_sum += (v - center) as i32;
                bright_n += 1;
            } else if v <= center - t {
                darker[i] = true;
                dark_sum += (center - v) as i32;
                dark_n += 1;
            }
        }

        if has_consecutive_pixels(&brighter, self.params.arc_length) {
            Some(bright_sum as f32 / bright_n as f32)
        } else if has_consecutive_pixels(&darker, self.params.arc_length) {
            Some(dark_sum as f32 / dark_n as f32)
        } else {
            None
        }
    }
}

/// Keep corners in descending response order, dropping any closer than
/// `min_distance` to one already kept. Ties keep raster order.
pub fn non_maximum_suppression(mut keypoints: Vec<ScoredKeypoint>, min_distance: f32) -> Vec<ScoredKeypoint> {
    keypoints.sort_by(|a, b| {
        b.response
            .partial_cmp(&a.response)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let min_distance_sq = min_distance * min_distance;
    let mut kept: Vec<ScoredKeypoint> = Vec::new();
    for candidate in keypoints {
        let suppressed = kept.iter().any(|existing| {
            let dx = candidate.keypoint.x - existing.keypoint.x;
            let dy = candidate.keypoint.y - existing.keypoint.y;
            dx * dx + dy * dy < min_distance_sq
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
