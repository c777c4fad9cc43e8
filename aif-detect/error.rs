use aif_core::CoreError;
use aif_orb::OrbError;

#[derive(Debug)]
pub enum DetectError {
    /// The parameter tree produced no backend
    MissingBackend,
    /// More children than a combined backend can hold
    TooManyBackends(usize),
    DegenerateAffine { determinant: f64 },
    /// Tilt below 1 or a non-finite angle
    InvalidSample { tilt: f64, phi: f64 },
    IncompatibleBackends { first: String, second: String, reason: String },
    UnknownParameters(String),
    InvalidParameters(OrbError),
    Core(CoreError),
    Serialization(String),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::MissingBackend => write!(f, "No feature backend was configured"),
            DetectError::TooManyBackends(n) => {
                write!(f, "Too many feature backends: {} (at most 2 can be combined)", n)
            }
            DetectError::DegenerateAffine { determinant } => {
                write!(f, "Affine map is not invertible (determinant {:e})", determinant)
            }
            DetectError::InvalidSample { tilt, phi } => {
                write!(f, "Invalid affine sample: tilt={} phi={} (tilt must be finite and >= 1)", tilt, phi)
            }
            DetectError::IncompatibleBackends { first, second, reason } => {
                write!(f, "Backends {} and {} cannot be combined: {}", first, second, reason)
            }
            DetectError::UnknownParameters(name) => write!(f, "Unknown parameter type: {}", name),
            DetectError::InvalidParameters(e) => write!(f, "Invalid parameters: {}", e),
            DetectError::Core(e) => write!(f, "{}", e),
            DetectError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectError::InvalidParameters(e) => Some(e),
            DetectError::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for DetectError {
    fn from(err: CoreError) -> Self {
        DetectError::Core(err)
    }
}

impl From<OrbError> for DetectError {
    fn from(err: OrbError) -> Self {
        DetectError::InvalidParameters(err)
    }
}

impl From<DetectError> for CoreError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Core(inner) => inner,
            other => CoreError::Backend {
                backend: "AffineInvariantFeature".to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for DetectError {
    fn from(err: serde_json::Error) -> Self {
        DetectError::Serialization(err.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<toml::de::Error> for DetectError {
    fn from(err: toml::de::Error) -> Self {
        DetectError::Serialization(err.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<toml::ser::Error> for DetectError {
    fn from(err: toml::ser::Error) -> Self {
        DetectError::Serialization(err.to_string())
    }
}

pub type DetectResult<T> = Result<T, DetectError>;
