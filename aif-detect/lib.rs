//! Affine invariant feature detection.
//!
//! An [`AffineInvariantFeature`] runs any [`FeatureBackend`] on a fixed plan
//! of simulated viewpoints (in-plane rotations followed by horizontal
//! compressions) and maps every detected key-point back into the source
//! image frame.

pub mod affine_feature;
pub mod combined;
pub mod error;
pub mod params;
pub mod sampled;
pub mod sampling;
pub mod warp;

pub use affine_feature::AffineInvariantFeature;
pub use combined::CombinedFeature;
pub use error::{DetectError, DetectResult};
pub use params::{create_feature_parameters, AifParameters, FeatureParameters, ParameterRegistry};
#[cfg(feature = "serde")]
pub use params::{load_parameters, to_node};
pub use sampled::detect_sample;
pub use sampling::{affine_sample_plan, AffineSample};
pub use warp::{AffineMap, AffineWarp};

pub use aif_core::FeatureBackend;
