use aif_core::Keypoint;

/// Keypoint with corner response score for NMS
#[derive(Debug, Clone, Copy)]
pub struct ScoredKeypoint {
    pub keypoint: Keypoint,
    pub response: f32,
}

/// Detection settings shared by every FAST-based backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastParameters {
    pub threshold: u8,
    pub arc_length: usize,
    pub nms_distance: f32,
    pub max_features: usize,
}
