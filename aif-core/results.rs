use image::GrayImage;

use crate::backend::FeatureBackend;
use crate::descriptors::DescriptorMatrix;
use crate::error::{CoreError, CoreResult};
use crate::{DistanceMetric, Keypoint};

/// Key-points with their descriptor rows, as produced by one backend call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Features {
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorMatrix,
}

impl Features {
    /// Pair key-points with descriptors; the row count must equal the key-point count
    pub fn new(keypoints: Vec<Keypoint>, descriptors: DescriptorMatrix) -> CoreResult<Self> {
        if keypoints.len() != descriptors.rows() {
            return Err(CoreError::RowCountMismatch {
                keypoints: keypoints.len(),
                rows: descriptors.rows(),
            });
        }
        Ok(Self { keypoints, descriptors })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &DescriptorMatrix {
        &self.descriptors
    }

    pub fn into_parts(self) -> (Vec<Keypoint>, DescriptorMatrix) {
        (self.keypoints, self.descriptors)
    }
}

/// Immutable detection output tagged with the metric its descriptors use.
///
/// A reference `Results` is typically wrapped in an `Arc` and shared
/// read-only by every matcher built on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Results {
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorMatrix,
    metric: DistanceMetric,
}

impl Results {
    pub fn new(features: Features, metric: DistanceMetric) -> Self {
        let (keypoints, descriptors) = features.into_parts();
        Self { keypoints, descriptors, metric }
    }

    /// Run `backend` on `image` and tag the output with the backend's metric
    pub fn compute(
        backend: &dyn FeatureBackend,
        image: &GrayImage,
        mask: Option<&GrayImage>,
    ) -> CoreResult<Self> {
        let features = backend.detect_and_compute(image, mask, false)?;
        Ok(Self::new(features, backend.distance_metric()))
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &DescriptorMatrix {
        &self.descriptors
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}
