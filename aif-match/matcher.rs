use std::sync::Arc;

use aif_core::Results;
use nalgebra::Matrix3;

use crate::error::{MatchError, MatchResult};
use crate::homography::{fit_homography_ransac, RansacConfig};
use crate::index::{DescriptorIndex, Neighbor};

/// Fewest correspondences a homography can be estimated from
pub const MIN_CORRESPONDENCES: usize = 4;

/// Query row matched to a reference row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub query_index: usize,
    pub reference_index: usize,
    pub distance: f32,
}

/// Query-to-reference homography and the matches consistent with it.
///
/// The default, identity and no matches, means no registration was found.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub transform: Matrix3<f64>,
    pub matches: Vec<Match>,
}

impl Default for MatchOutcome {
    fn default() -> Self {
        Self { transform: Matrix3::identity(), matches: Vec::new() }
    }
}

impl MatchOutcome {
    pub fn is_registered(&self) -> bool {
        !self.matches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// A match survives unless `nearest > ratio * second_nearest`
    pub ratio: f32,
    pub ransac: RansacConfig,
}

impl MatcherConfig {
    pub const fn defaults() -> Self {
        Self { ratio: 0.75, ransac: RansacConfig::defaults() }
    }

    pub fn ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn ransac_threshold(mut self, threshold: f64) -> Self {
        self.ransac.inlier_threshold = threshold;
        self
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Ratio test over k=2 neighbour lists. Rows with fewer than two neighbours
/// are dropped; output keeps query row order.
pub fn ratio_filter(neighbors: &[Vec<Neighbor>], ratio: f32) -> Vec<Match> {
    neighbors
        .iter()
        .enumerate()
        .filter_map(|(query_index, found)| match found.as_slice() {
            [first, second, ..] if first.distance <= ratio * second.distance => Some(Match {
                query_index,
                reference_index: first.index,
                distance: first.distance,
            }),
            _ => None,
        })
        .collect()
}

/// Matches query results against one fixed reference.
///
/// The nearest-neighbour index is built once and shared read-only, so one
/// matcher can serve many queries concurrently.
#[derive(Debug, Clone)]
pub struct ResultMatcher {
    reference: Arc<Results>,
    index: DescriptorIndex,
    config: MatcherConfig,
}

impl ResultMatcher {
    pub fn new(reference: Arc<Results>) -> MatchResult<Self> {
        Self::with_config(reference, MatcherConfig::defaults())
    }

    pub fn with_config(reference: Arc<Results>, config: MatcherConfig) -> MatchResult<Self> {
        let index = DescriptorIndex::build(reference.descriptors(), reference.metric())?;
        Ok(Self { reference, index, config })
    }

    pub fn reference(&self) -> &Arc<Results> {
        &self.reference
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    fn check_compatible(&self, query: &Results) -> MatchResult<()> {
        if query.metric() != self.reference.metric() {
            return Err(MatchError::MetricMismatch {
                reference: self.reference.metric(),
                query: query.metric(),
            });
        }
        let (r, q) = (self.reference.descriptors(), query.descriptors());
        if r.is_empty() || q.is_empty() {
            return Ok(());
        }
        if r.cols() != q.cols() || r.element_type() != q.element_type() {
            return Err(MatchError::IncompatibleDescriptors {
                reference_cols: r.cols(),
                reference_type: r.element_type(),
                query_cols: q.cols(),
                query_type: q.element_type(),
            });
        }
        Ok(())
    }

    /// Ratio-filter nearest neighbours of every query row, then keep the
    /// matches consistent with a RANSAC homography.
    ///
    /// Too few survivors or a failed estimation give [`MatchOutcome::default`];
    /// only incompatible descriptors are errors.
    pub fn match_results(&self, query: &Results) -> MatchResult<MatchOutcome> {
        self.check_compatible(query)?;
        if query.is_empty() || self.index.is_empty() {
            return Ok(MatchOutcome::default());
        }

        let neighbors = self.index.knn(query.descriptors(), 2);
        let candidates = ratio_filter(&neighbors, self.config.ratio);
        log::debug!(
            "{} of {} query rows passed the ratio test",
            candidates.len(),
            query.len()
        );
        if candidates.len() < MIN_CORRESPONDENCES {
            return Ok(MatchOutcome::default());
        }

        let to_point = |kp: &aif_core::Keypoint| [kp.x as f64, kp.y as f64];
        let src: Vec<[f64; 2]> = candidates
            .iter()
            .map(|m| to_point(&query.keypoints()[m.query_index]))
            .collect();
        let dst: Vec<[f64; 2]> = candidates
            .iter()
            .map(|m| to_point(&self.reference.keypoints()[m.reference_index]))
            .collect();

        match fit_homography_ransac(&src, &dst, &self.config.ransac) {
            Ok(fit) => {
                let matches = candidates
                    .into_iter()
                    .zip(&fit.inlier_mask)
                    .filter(|(_, inlier)| **inlier)
                    .map(|(m, _)| m)
                    .collect();
                Ok(MatchOutcome { transform: fit.h, matches })
            }
            Err(e) => {
                log::info!("No homography between query and reference: {}", e);
                Ok(MatchOutcome::default())
            }
        }
    }
}
