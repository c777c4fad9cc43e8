use aif_core::{FeatureBackend, Features, GrayImage};

use crate::error::DetectResult;
use crate::sampling::AffineSample;
use crate::warp::AffineWarp;

/// Run `backend` on one simulated view of `image` and express the detected
/// key-points in source coordinates. Descriptor rows are left untouched.
pub fn detect_sample(
    image: &GrayImage,
    mask: Option<&GrayImage>,
    sample: AffineSample,
    backend: &dyn FeatureBackend,
    use_provided_keypoints: bool,
) -> DetectResult<Features> {
    sample.validate()?;
    if sample.is_identity() {
        return Ok(backend.detect_and_compute(image, mask, use_provided_keypoints)?);
    }

    let (width, height) = image.dimensions();
    let warp = AffineWarp::new(sample, width, height)?;
    let view = warp.apply_to_image(image);
    let view_mask = warp.apply_to_mask(mask, width, height)?;

    let features = backend.detect_and_compute(&view, Some(&view_mask), use_provided_keypoints)?;
    let (mut keypoints, descriptors) = features.into_parts();
    warp.invert_keypoints(&mut keypoints);
    log::trace!(
        "sample tilt={:.3} phi={:.2}: {} keypoints on {}x{}",
        sample.tilt,
        sample.phi,
        keypoints.len(),
        view.width(),
        view.height()
    );
    Ok(Features::new(keypoints, descriptors)?)
}
