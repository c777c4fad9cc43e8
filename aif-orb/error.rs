use aif_core::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum OrbError {
    InvalidThreshold(u8),
    InvalidArcLength(usize),
    InvalidPatchSize(usize),
    InvalidGridSize { grid_size: usize, patch_size: usize },
    InvalidNmsDistance(f32),
    InvalidMaxFeatures(usize),
}

impl std::fmt::Display for OrbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be 1-127)", t)
            }
            OrbError::InvalidArcLength(n) => {
                write!(f, "Invalid arc length: {} (must be 9-12)", n)
            }
            OrbError::InvalidPatchSize(size) => {
                write!(f, "Invalid patch size: {} (must be odd and at least 7)", size)
            }
            OrbError::InvalidGridSize { grid_size, patch_size } => {
                write!(f, "Grid size {} must be between 2 and patch size {}", grid_size, patch_size)
            }
            OrbError::InvalidNmsDistance(d) => {
                write!(f, "Invalid NMS distance: {} (must be finite and >= 0)", d)
            }
            OrbError::InvalidMaxFeatures(n) => {
                write!(f, "Invalid feature budget: {} (must be > 0)", n)
            }
        }
    }
}

impl std::error::Error for OrbError {}

impl From<OrbError> for CoreError {
    fn from(err: OrbError) -> Self {
        CoreError::Backend {
            backend: "aif-orb".to_string(),
            message: err.to_string(),
        }
    }
}

pub type OrbResult<T> = Result<T, OrbError>;
