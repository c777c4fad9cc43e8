//! FAST corner based feature backends.
//!
//! [`OrbFeature`] pairs FAST corners with steered BRIEF bit strings compared
//! by Hamming distance. [`PatchFeature`] pairs the same corners with
//! normalized oriented intensity patches compared by L2 distance.

pub mod brief;
pub mod config;
pub mod error;
pub mod fast;
pub mod patch;
pub mod types;
pub mod utils;

pub use brief::{BriefExtractor, DESCRIPTOR_SIZE};
pub use config::{OrbParameters, PatchParameters};
pub use error::{OrbError, OrbResult};
pub use fast::FastDetector;
pub use patch::PatchExtractor;
pub use types::{FastParameters, ScoredKeypoint};

use aif_core::{
    validate_input, CoreResult, DescriptorMatrix, DistanceMetric, FeatureBackend, Features,
    GrayImage, Keypoint,
};

/// Detect oriented FAST corners in `img`
fn oriented_corners(
    detector: &FastDetector,
    img: &GrayImage,
    mask: Option<&GrayImage>,
    patch_size: usize,
) -> Vec<Keypoint> {
    detector
        .detect(img, mask)
        .into_iter()
        .map(|scored| Keypoint {
            size: patch_size as f32,
            angle: utils::intensity_centroid_angle(img, scored.keypoint.x, scored.keypoint.y, patch_size),
            ..scored.keypoint
        })
        .collect()
}

/// FAST corners with steered BRIEF descriptors
#[derive(Debug, Clone)]
pub struct OrbFeature {
    params: OrbParameters,
    detector: FastDetector,
    extractor: BriefExtractor,
}

impl OrbFeature {
    pub fn new(params: OrbParameters) -> OrbResult<Self> {
        params.validate()?;
        let detector = FastDetector::new(params.fast())?;
        let extractor = BriefExtractor::new(params.patch_size);
        Ok(Self { params, detector, extractor })
    }

    pub fn params(&self) -> &OrbParameters {
        &self.params
    }
}

impl FeatureBackend for OrbFeature {
    fn name(&self) -> &str {
        "ORB"
    }

    fn distance_metric(&self) -> DistanceMetric {
        DistanceMetric::Hamming
    }

    fn detect_and_compute(
        &self,
        image: &GrayImage,
        mask: Option<&GrayImage>,
        _use_provided_keypoints: bool,
    ) -> CoreResult<Features> {
        validate_input(image, mask)?;
        let keypoints = oriented_corners(&self.detector, image, mask, self.params.patch_size);
        let data = self.extractor.compute(image, &keypoints);
        log::trace!("ORB: {} keypoints on {}x{}", keypoints.len(), image.width(), image.height());
        Features::new(keypoints, DescriptorMatrix::from_u8(DESCRIPTOR_SIZE, data)?)
    }
}

/// FAST corners with normalized oriented patch descriptors
#[derive(Debug, Clone)]
pub struct PatchFeature {
    params: PatchParameters,
    detector: FastDetector,
    extractor: PatchExtractor,
}

impl PatchFeature {
    pub fn new(params: PatchParameters) -> OrbResult<Self> {
        params.validate()?;
        let detector = FastDetector::new(params.fast())?;
        let extractor = PatchExtractor::new(params.patch_size, params.grid_size);
        Ok(Self { params, detector, extractor })
    }

    pub fn params(&self) -> &PatchParameters {
        &self.params
    }
}

impl FeatureBackend for PatchFeature {
    fn name(&self) -> &str {
        "Patch"
    }

    fn distance_metric(&self) -> DistanceMetric {
        DistanceMetric::L2
    }

    fn detect_and_compute(
        &self,
        image: &GrayImage,
        mask: Option<&GrayImage>,
        _use_provided_keypoints: bool,
    ) -> CoreResult<Features> {
        validate_input(image, mask)?;
        let keypoints = oriented_corners(&self.detector, image, mask, self.params.patch_size);
        let data = self.extractor.compute(image, &keypoints);
        log::trace!("Patch: {} keypoints on {}x{}", keypoints.len(), image.width(), image.height());
        Features::new(keypoints, DescriptorMatrix::from_f32(self.extractor.len(), data)?)
    }
}
