use std::sync::Arc;

use aif_core::{
    run_indexed, validate_input, CoreResult, DescriptorMatrix, DistanceMetric, FeatureBackend,
    Features, GrayImage, ParallelOptions,
};

use crate::error::{DetectError, DetectResult};
use crate::params::AifParameters;
use crate::sampled::detect_sample;
use crate::sampling::affine_sample_plan;

/// Wraps a backend and runs it on every simulated viewpoint of the input,
/// merging the per-view output in plan order.
#[derive(Clone)]
pub struct AffineInvariantFeature {
    base: Arc<dyn FeatureBackend>,
    parallel: ParallelOptions,
}

impl std::fmt::Debug for AffineInvariantFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffineInvariantFeature")
            .field("base", &self.base.name())
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl AffineInvariantFeature {
    pub fn new(base: Arc<dyn FeatureBackend>) -> Self {
        Self { base, parallel: ParallelOptions::default() }
    }

    /// Build the base backend from a parameter tree
    pub fn from_parameters(params: &AifParameters) -> DetectResult<Self> {
        params
            .create_base()?
            .map(Self::new)
            .ok_or(DetectError::MissingBackend)
    }

    pub fn with_parallel_options(mut self, parallel: ParallelOptions) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn base(&self) -> &Arc<dyn FeatureBackend> {
        &self.base
    }

    pub fn parallel_options(&self) -> &ParallelOptions {
        &self.parallel
    }

    /// Detect on every sample of the plan and merge the results.
    ///
    /// The first failing sample aborts the call. When no sample yields a
    /// key-point the output is empty with an untyped descriptor matrix.
    pub fn detect_and_compute(
        &self,
        image: &GrayImage,
        mask: Option<&GrayImage>,
        use_provided_keypoints: bool,
    ) -> DetectResult<Features> {
        validate_input(image, mask)?;
        if use_provided_keypoints {
            log::debug!("use_provided_keypoints is forwarded to {} unchanged", self.base.name());
        }

        let plan = affine_sample_plan();
        let base = self.base.as_ref();
        let slots = run_indexed(plan.len(), &self.parallel, |i| {
            detect_sample(image, mask, plan[i], base, use_provided_keypoints)
        })?;

        let mut keypoints = Vec::new();
        let mut parts = Vec::with_capacity(slots.len());
        for slot in slots {
            let (kps, descriptors) = slot?.into_parts();
            keypoints.extend(kps);
            parts.push(descriptors);
        }
        let descriptors = DescriptorMatrix::vstack(&parts)?;

        log::debug!(
            "{}: {} samples, {} keypoints merged",
            self.base.name(),
            plan.len(),
            keypoints.len()
        );
        Ok(Features::new(keypoints, descriptors)?)
    }
}

impl FeatureBackend for AffineInvariantFeature {
    fn name(&self) -> &str {
        "AffineInvariantFeature"
    }

    fn distance_metric(&self) -> DistanceMetric {
        self.base.distance_metric()
    }

    fn detect_and_compute(
        &self,
        image: &GrayImage,
        mask: Option<&GrayImage>,
        use_provided_keypoints: bool,
    ) -> CoreResult<Features> {
        Ok(AffineInvariantFeature::detect_and_compute(self, image, mask, use_provided_keypoints)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::AffineSample;
    use crate::test_support::{blob_image, CentroidBackend, CountingBackend, FailingBackend};
    use aif_core::{ElementType, Luma, Results};
    use aif_orb::{OrbFeature, OrbParameters};

    fn orb() -> Arc<dyn FeatureBackend> {
        Arc::new(OrbFeature::new(OrbParameters::defaults().max_features(100)).unwrap())
    }

    fn textured(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let inside = x % 20 >= 5 && x % 20 < 13 && y % 20 >= 5 && y % 20 < 13;
            Luma([if inside { 220 } else { 30 }])
        })
    }

    #[test]
    fn test_count_parity() {
        let feature = AffineInvariantFeature::new(orb());
        let features = feature.detect_and_compute(&textured(80, 60), None, false).unwrap();
        assert!(!features.is_empty());
        assert_eq!(features.len(), features.descriptors().rows());
        assert_eq!(features.descriptors().element_type(), Some(ElementType::U8));
    }

    #[test]
    fn test_identity_prefix_matches_direct_backend() {
        let img = textured(80, 60);
        let base = orb();
        let direct = base.detect_and_compute(&img, None, false).unwrap();
        let merged = AffineInvariantFeature::new(base).detect_and_compute(&img, None, false).unwrap();

        let n = direct.len();
        assert!(merged.len() >= n);
        assert_eq!(&merged.keypoints()[..n], direct.keypoints());
        for row in 0..n {
            assert_eq!(merged.descriptors().row_u8(row), direct.descriptors().row_u8(row));
        }
    }

    #[test]
    fn test_identity_sample_sees_unmodified_image() {
        let img = textured(50, 40);
        let counting = CountingBackend::default();
        let features = detect_sample(&img, None, AffineSample::IDENTITY, &counting, false).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(counting.seen_sizes(), vec![(50, 40)]);
        assert!(counting.saw_no_mask());
    }

    #[test]
    fn test_round_trip_through_views() {
        let (cx, cy) = (40.0f32, 34.0f32);
        let img = blob_image(90, 70, cx, cy, 5.0);
        for sample in [
            AffineSample::new(1.0, 30.0),
            AffineSample::new(2.0, 0.0),
            AffineSample::new(2.0, 72.0),
            AffineSample::new(4.0, 126.0),
        ] {
            let features = detect_sample(&img, None, sample, &CentroidBackend, false).unwrap();
            let kp = features.keypoints()[0];
            assert!(
                (kp.x - cx).abs() < 0.5 && (kp.y - cy).abs() < 0.5,
                "{:?} mapped back to ({}, {})",
                sample,
                kp.x,
                kp.y
            );
        }
    }

    #[test]
    fn test_invalid_sample_is_rejected() {
        let img = textured(40, 40);
        let counting = CountingBackend::default();
        for sample in [
            AffineSample::new(1e-9, 0.0),
            AffineSample::new(0.0, 45.0),
            AffineSample::new(f64::NAN, 0.0),
        ] {
            assert!(matches!(
                detect_sample(&img, None, sample, &counting, false),
                Err(DetectError::InvalidSample { .. })
            ));
        }
        assert!(counting.seen_sizes().is_empty());
    }

    #[test]
    fn test_mask_holds_in_every_view() {
        let img = textured(120, 100);
        let mask = GrayImage::from_fn(120, 100, |x, _| Luma([if x < 60 { 255 } else { 0 }]));
        let features = AffineInvariantFeature::new(orb())
            .detect_and_compute(&img, Some(&mask), false)
            .unwrap();

        assert!(!features.is_empty());
        for kp in features.keypoints() {
            assert!(kp.x <= 62.0, "keypoint at ({}, {}) outside the mask", kp.x, kp.y);
        }
    }

    #[test]
    fn test_merge_is_deterministic() {
        let img = textured(64, 64);
        let feature = AffineInvariantFeature::new(orb());
        let single = feature
            .clone()
            .with_parallel_options(ParallelOptions::single_threaded())
            .detect_and_compute(&img, None, false)
            .unwrap();
        let striped = feature
            .with_parallel_options(ParallelOptions::default().stripes(4))
            .detect_and_compute(&img, None, false)
            .unwrap();
        assert_eq!(single, striped);
    }

    #[test]
    fn test_uniform_image_yields_empty() {
        let feature = AffineInvariantFeature::new(orb());
        let features = feature
            .detect_and_compute(&GrayImage::from_pixel(40, 40, Luma([77])), None, false)
            .unwrap();
        assert!(features.is_empty());
        assert_eq!(features.descriptors().element_type(), None);
    }

    #[test]
    fn test_one_call_per_sample() {
        let counting = Arc::new(CountingBackend::default());
        let feature = AffineInvariantFeature::new(counting.clone());
        let features = feature.detect_and_compute(&textured(40, 40), None, true).unwrap();
        assert_eq!(features.len(), 43);
        assert_eq!(counting.seen_sizes().len(), 43);
    }

    #[test]
    fn test_backend_failure_aborts() {
        let feature = AffineInvariantFeature::new(Arc::new(FailingBackend));
        assert!(matches!(
            feature.detect_and_compute(&textured(30, 30), None, false),
            Err(DetectError::Core(_))
        ));
    }

    #[test]
    fn test_missing_backend() {
        assert!(matches!(
            AffineInvariantFeature::from_parameters(&AifParameters::default()),
            Err(DetectError::MissingBackend)
        ));
    }

    #[test]
    fn test_acts_as_backend() {
        let feature = AffineInvariantFeature::new(orb());
        assert_eq!(FeatureBackend::name(&feature), "AffineInvariantFeature");
        let results = Results::compute(&feature, &textured(60, 60), None).unwrap();
        assert_eq!(results.metric(), DistanceMetric::Hamming);
        assert_eq!(results.len(), results.descriptors().rows());
    }
}
