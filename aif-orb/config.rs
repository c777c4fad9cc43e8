use crate::error::{OrbError, OrbResult};
use crate::types::FastParameters;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MIN_PATCH_SIZE: usize = 7;

pub(crate) fn validate_fast(fast: &FastParameters) -> OrbResult<()> {
    if fast.threshold == 0 || fast.threshold > 127 {
        return Err(OrbError::InvalidThreshold(fast.threshold));
    }
    if !(9..=12).contains(&fast.arc_length) {
        return Err(OrbError::InvalidArcLength(fast.arc_length));
    }
    if !fast.nms_distance.is_finite() || fast.nms_distance < 0.0 {
        return Err(OrbError::InvalidNmsDistance(fast.nms_distance));
    }
    if fast.max_features == 0 {
        return Err(OrbError::InvalidMaxFeatures(fast.max_features));
    }
    Ok(())
}

fn validate_patch_size(patch_size: usize) -> OrbResult<()> {
    if patch_size < MIN_PATCH_SIZE || patch_size % 2 == 0 {
        return Err(OrbError::InvalidPatchSize(patch_size));
    }
    Ok(())
}

/// Settings for the FAST + steered BRIEF backend
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbParameters {
    /// FAST intensity threshold (1-127)
    pub threshold: u8,
    /// Contiguous circle pixels required for a corner (9-12)
    pub arc_length: usize,
    /// Minimum distance between two kept corners
    pub nms_distance: f32,
    /// Strongest corners kept per call
    pub max_features: usize,
    /// Odd side length of the orientation and sampling patch
    pub patch_size: usize,
}

impl OrbParameters {
    pub const fn defaults() -> Self {
        Self {
            threshold: 20,
            arc_length: 9,
            nms_distance: 3.0,
            max_features: 500,
            patch_size: 31,
        }
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn arc_length(mut self, arc_length: usize) -> Self {
        self.arc_length = arc_length;
        self
    }

    pub fn nms_distance(mut self, distance: f32) -> Self {
        self.nms_distance = distance;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.patch_size = patch_size;
        self
    }

    /// Detector part of these settings
    pub fn fast(&self) -> FastParameters {
        FastParameters {
            threshold: self.threshold,
            arc_length: self.arc_length,
            nms_distance: self.nms_distance,
            max_features: self.max_features,
        }
    }

    pub fn validate(&self) -> OrbResult<()> {
        validate_fast(&self.fast())?;
        validate_patch_size(self.patch_size)
    }

    pub fn summary(&self) -> String {
        format!(
            "OrbParameters: threshold={}, arc={}, nms={:.1}, max_features={}, patch={}",
            self.threshold, self.arc_length, self.nms_distance, self.max_features, self.patch_size
        )
    }
}

impl Default for OrbParameters {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Settings for the FAST + normalized oriented patch backend
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PatchParameters {
    pub threshold: u8,
    pub arc_length: usize,
    pub nms_distance: f32,
    pub max_features: usize,
    pub patch_size: usize,
    /// Samples per patch side; the descriptor has `grid_size^2` elements
    pub grid_size: usize,
}

impl PatchParameters {
    pub const fn defaults() -> Self {
        Self {
            threshold: 20,
            arc_length: 9,
            nms_distance: 3.0,
            max_features: 500,
            patch_size: 15,
            grid_size: 8,
        }
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn arc_length(mut self, arc_length: usize) -> Self {
        self.arc_length = arc_length;
        self
    }

    pub fn nms_distance(mut self, distance: f32) -> Self {
        self.nms_distance = distance;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.patch_size = patch_size;
        self
    }

    pub fn grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn fast(&self) -> FastParameters {
        FastParameters {
            threshold: self.threshold,
            arc_length: self.arc_length,
            nms_distance: self.nms_distance,
            max_features: self.max_features,
        }
    }

    pub fn validate(&self) -> OrbResult<()> {
        validate_fast(&self.fast())?;
        validate_patch_size(self.patch_size)?;
        if self.grid_size < 2 || self.grid_size > self.patch_size {
            return Err(OrbError::InvalidGridSize {
                grid_size: self.grid_size,
                patch_size: self.patch_size,
            });
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "PatchParameters: threshold={}, arc={}, nms={:.1}, max_features={}, patch={}, grid={}",
            self.threshold,
            self.arc_length,
            self.nms_distance,
            self.max_features,
            self.patch_size,
            self.grid_size
        )
    }
}

impl Default for PatchParameters {
    fn default() -> Self {
        Self::defaults()
    }
}
