#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

/// One simulated viewpoint: horizontal compression `tilt` applied after an
/// in-plane rotation of `phi` degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AffineSample {
    pub tilt: f64,
    pub phi: f64,
}

impl AffineSample {
    pub const IDENTITY: AffineSample = AffineSample { tilt: 1.0, phi: 0.0 };

    pub fn new(tilt: f64, phi: f64) -> Self {
        Self { tilt, phi }
    }

    pub fn is_identity(&self) -> bool {
        self.tilt == 1.0 && self.phi == 0.0
    }

    /// A view can only compress: `tilt` must be finite and at least 1, `phi` finite.
    pub fn validate(&self) -> DetectResult<()> {
        if !self.tilt.is_finite() || self.tilt < 1.0 || !self.phi.is_finite() {
            return Err(DetectError::InvalidSample { tilt: self.tilt, phi: self.phi });
        }
        Ok(())
    }
}

const TILT_LEVELS: i32 = 5;
const ROTATION_STEP: f64 = 72.0;

/// Viewpoints simulated for every image: the identity first, then for
/// `tilt = 2^(i/2)`, `i = 1..=5`, rotations `0, 72/tilt, 2*72/tilt, ...`
/// below 180 degrees.
pub fn affine_sample_plan() -> Vec<AffineSample> {
    let mut plan = vec![AffineSample::IDENTITY];
    for i in 1..=TILT_LEVELS {
        let tilt = 2f64.powf(0.5 * i as f64);
        let mut phi = 0.0;
        while phi < 180.0 {
            plan.push(AffineSample::new(tilt, phi));
            phi += ROTATION_STEP / tilt;
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_size_and_order() {
        let plan = affine_sample_plan();
        assert_eq!(plan.len(), 43);
        assert_eq!(plan[0], AffineSample::IDENTITY);
        assert!(plan[0].is_identity());
        assert!(plan[1..].iter().all(|s| !s.is_identity()));
    }

    #[test]
    fn test_plan_per_tilt_counts() {
        let plan = affine_sample_plan();
        let counts: Vec<usize> = (1..=5)
            .map(|i| {
                let tilt = 2f64.powf(0.5 * i as f64);
                plan.iter().filter(|s| s.tilt == tilt).count()
            })
            .collect();
        assert_eq!(counts, vec![4, 5, 8, 10, 15]);
    }

    #[test]
    fn test_validate_rejects_bad_views() {
        assert!(affine_sample_plan().iter().all(|s| s.validate().is_ok()));
        for sample in [
            AffineSample::new(1e-9, 0.0),
            AffineSample::new(0.0, 0.0),
            AffineSample::new(0.5, 10.0),
            AffineSample::new(f64::NAN, 0.0),
            AffineSample::new(f64::INFINITY, 0.0),
            AffineSample::new(2.0, f64::NAN),
        ] {
            assert!(
                matches!(sample.validate(), Err(DetectError::InvalidSample { .. })),
                "{:?} accepted",
                sample
            );
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        assert_eq!(affine_sample_plan(), affine_sample_plan());
        assert!(affine_sample_plan()
            .iter()
            .all(|s| s.tilt >= 1.0 && (0.0..180.0).contains(&s.phi)));
    }

    proptest::proptest! {
        #[test]
        fn prop_rotation_step_is_72_over_tilt(index in 1usize..43) {
            let plan = affine_sample_plan();
            let sample = plan[index];
            let previous = plan[index - 1];
            if previous.tilt == sample.tilt {
                let step = sample.phi - previous.phi;
                proptest::prop_assert!((step - 72.0 / sample.tilt).abs() < 1e-9);
            } else {
                proptest::prop_assert_eq!(sample.phi, 0.0);
                proptest::prop_assert!(sample.tilt > previous.tilt);
            }
        }
    }
}
