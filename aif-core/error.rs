use crate::descriptors::ElementType;

#[derive(Debug)]
pub enum CoreError {
    InvalidImage { width: u32, height: u32 },
    MaskSizeMismatch { image: (u32, u32), mask: (u32, u32) },
    DescriptorShape { len: usize, cols: usize },
    RowCountMismatch { keypoints: usize, rows: usize },
    IncompatibleDescriptors {
        expected_cols: usize,
        expected_type: ElementType,
        actual_cols: usize,
        actual_type: ElementType,
    },
    UnknownMetric(String),
    Backend { backend: String, message: String },
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidImage { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            CoreError::MaskSizeMismatch { image, mask } => {
                write!(
                    f,
                    "Mask size {}x{} does not match image size {}x{}",
                    mask.0, mask.1, image.0, image.1
                )
            }
            CoreError::DescriptorShape { len, cols } => {
                write!(f, "Descriptor data of length {} cannot be split into rows of {}", len, cols)
            }
            CoreError::RowCountMismatch { keypoints, rows } => {
                write!(f, "{} keypoints but {} descriptor rows", keypoints, rows)
            }
            CoreError::IncompatibleDescriptors { expected_cols, expected_type, actual_cols, actual_type } => {
                write!(
                    f,
                    "Incompatible descriptors: expected {} x {:?}, got {} x {:?}",
                    expected_cols, expected_type, actual_cols, actual_type
                )
            }
            CoreError::UnknownMetric(name) => write!(f, "Unknown distance metric: {}", name),
            CoreError::Backend { backend, message } => {
                write!(f, "Feature backend {} failed: {}", backend, message)
            }
            CoreError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<rayon::ThreadPoolBuildError> for CoreError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        CoreError::ThreadPool(err)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
