use image::GrayImage;

use crate::error::{CoreError, CoreResult};
use crate::results::Features;
use crate::DistanceMetric;

/// A point-feature detector/descriptor that can be plugged into the affine
/// sampler and whose output can be matched.
///
/// Implementations must be usable from several threads at once: the affine
/// sampler calls `detect_and_compute` concurrently for every simulated view.
pub trait FeatureBackend: Send + Sync {
    /// Short human-readable name used in logs and errors
    fn name(&self) -> &str;

    /// Metric the produced descriptors are compared with
    fn distance_metric(&self) -> DistanceMetric;

    /// Detect key-points in `image` where `mask` is non-zero and compute one
    /// descriptor row per key-point.
    fn detect_and_compute(
        &self,
        image: &GrayImage,
        mask: Option<&GrayImage>,
        use_provided_keypoints: bool,
    ) -> CoreResult<Features>;
}

/// Check that `image` is non-empty and `mask`, if any, has the same size
pub fn validate_input(image: &GrayImage, mask: Option<&GrayImage>) -> CoreResult<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CoreError::InvalidImage { width, height });
    }
    if let Some(mask) = mask {
        if mask.dimensions() != (width, height) {
            return Err(CoreError::MaskSizeMismatch {
                image: (width, height),
                mask: mask.dimensions(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_input() {
        let image = GrayImage::new(8, 6);
        assert!(validate_input(&image, None).is_ok());
        assert!(validate_input(&image, Some(&GrayImage::new(8, 6))).is_ok());

        let result = validate_input(&image, Some(&GrayImage::new(6, 8)));
        assert!(matches!(result, Err(CoreError::MaskSizeMismatch { .. })));

        let result = validate_input(&GrayImage::new(0, 4), None);
        assert!(matches!(result, Err(CoreError::InvalidImage { width: 0, height: 4 })));
    }
}
