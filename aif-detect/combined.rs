use std::sync::Arc;

use aif_core::{
    CoreResult, DescriptorMatrix, DistanceMetric, FeatureBackend, Features, GrayImage,
};

use crate::error::{DetectError, DetectResult};

/// Two backends run on the same input, reported as one.
///
/// Key-points of the first backend come first. Descriptor rows are laid out
/// block-diagonally, `[first | 0]` then `[0 | second]`.
#[derive(Clone)]
pub struct CombinedFeature {
    first: Arc<dyn FeatureBackend>,
    second: Arc<dyn FeatureBackend>,
    name: String,
}

impl std::fmt::Debug for CombinedFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedFeature").field("name", &self.name).finish()
    }
}

impl CombinedFeature {
    /// Both backends must use the same distance metric
    pub fn new(first: Arc<dyn FeatureBackend>, second: Arc<dyn FeatureBackend>) -> DetectResult<Self> {
        if first.distance_metric() != second.distance_metric() {
            return Err(DetectError::IncompatibleBackends {
                first: first.name().to_string(),
                second: second.name().to_string(),
                reason: format!(
                    "distance metrics differ ({} vs {})",
                    first.distance_metric(),
                    second.distance_metric()
                ),
            });
        }
        let name = format!("{}+{}", first.name(), second.name());
        Ok(Self { first, second, name })
    }
}

impl FeatureBackend for CombinedFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn distance_metric(&self) -> DistanceMetric {
        self.first.distance_metric()
    }

    fn detect_and_compute(
        &self,
        image: &GrayImage,
        mask: Option<&GrayImage>,
        use_provided_keypoints: bool,
    ) -> CoreResult<Features> {
        let (mut keypoints, first) = self
            .first
            .detect_and_compute(image, mask, use_provided_keypoints)?
            .into_parts();
        let (more, second) = self
            .second
            .detect_and_compute(image, mask, use_provided_keypoints)?
            .into_parts();
        keypoints.extend(more);
        let descriptors = DescriptorMatrix::hconcat_padded(&first, &second)?;
        Features::new(keypoints, descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedBackend;
    use aif_core::Keypoint;

    #[test]
    fn test_block_layout() {
        let a = FixedBackend::f32("a", vec![Keypoint::new(1.0, 1.0)], 2, vec![1.0, 2.0]);
        let b = FixedBackend::f32(
            "b",
            vec![Keypoint::new(2.0, 2.0), Keypoint::new(3.0, 3.0)],
            1,
            vec![5.0, 6.0],
        );
        let combined = CombinedFeature::new(Arc::new(a), Arc::new(b)).unwrap();
        assert_eq!(combined.name(), "a+b");

        let features = combined
            .detect_and_compute(&GrayImage::new(8, 8), None, false)
            .unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features.keypoints()[0].x, 1.0);
        assert_eq!(features.keypoints()[2].x, 3.0);
        assert_eq!(features.descriptors().cols(), 3);
        assert_eq!(features.descriptors().row_f32(0), Some(&[1.0, 2.0, 0.0][..]));
        assert_eq!(features.descriptors().row_f32(1), Some(&[0.0, 0.0, 5.0][..]));
        assert_eq!(features.descriptors().row_f32(2), Some(&[0.0, 0.0, 6.0][..]));
    }

    #[test]
    fn test_rejects_mixed_metrics() {
        let a = FixedBackend::f32("a", Vec::new(), 2, Vec::new());
        let b = FixedBackend::u8("b", Vec::new(), 4, Vec::new());
        assert!(matches!(
            CombinedFeature::new(Arc::new(a), Arc::new(b)),
            Err(DetectError::IncompatibleBackends { .. })
        ));
    }
}
