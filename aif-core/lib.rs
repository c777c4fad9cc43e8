//! Shared data model and feature backend contract for affine invariant
//! feature detection and matching.

pub mod backend;
pub mod descriptors;
pub mod error;
pub mod parallel;
pub mod results;

pub use backend::{validate_input, FeatureBackend};
pub use descriptors::{DescriptorMatrix, ElementType};
pub use error::{CoreError, CoreResult};
pub use image::{GrayImage, Luma};
pub use parallel::{run_indexed, ParallelOptions};
pub use results::{Features, Results};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Key-point in image coordinates. Only the location is rewritten when a
/// key-point is mapped between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Diameter of the meaningful neighbourhood
    pub size: f32,
    /// Orientation in radians
    pub angle: f32,
    pub response: f32,
    pub octave: i32,
    pub class_id: i32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, ..Self::default() }
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            size: 0.0,
            angle: 0.0,
            response: 0.0,
            octave: 0,
            class_id: -1,
        }
    }
}

/// Distance used to compare descriptor rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DistanceMetric {
    /// Euclidean distance over `f32` rows
    L2,
    /// Bit difference count over packed `u8` rows
    Hamming,
}

impl DistanceMetric {
    /// Element type a descriptor matrix must have to be compared with this metric
    pub fn element_type(self) -> ElementType {
        match self {
            DistanceMetric::L2 => ElementType::F32,
            DistanceMetric::Hamming => ElementType::U8,
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::L2 => write!(f, "L2"),
            DistanceMetric::Hamming => write!(f, "Hamming"),
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L2" | "NORM_L2" => Ok(DistanceMetric::L2),
            "HAMMING" | "NORM_HAMMING" => Ok(DistanceMetric::Hamming),
            _ => Err(CoreError::UnknownMetric(s.to_string())),
        }
    }
}
