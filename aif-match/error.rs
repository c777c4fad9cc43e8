use aif_core::{CoreError, DistanceMetric, ElementType};

#[derive(Debug)]
pub enum MatchError {
    IncompatibleDescriptors {
        reference_cols: usize,
        reference_type: Option<ElementType>,
        query_cols: usize,
        query_type: Option<ElementType>,
    },
    /// Reference descriptors do not have the element type their metric needs
    MetricTypeMismatch { metric: DistanceMetric, actual: Option<ElementType> },
    MetricMismatch { reference: DistanceMetric, query: DistanceMetric },
    UnknownMetric(String),
    Core(CoreError),
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::IncompatibleDescriptors { reference_cols, reference_type, query_cols, query_type } => {
                write!(
                    f,
                    "Query descriptors {} x {:?} do not match reference descriptors {} x {:?}",
                    query_cols, query_type, reference_cols, reference_type
                )
            }
            MatchError::MetricTypeMismatch { metric, actual } => {
                write!(
                    f,
                    "{} matching needs {:?} descriptors, got {:?}",
                    metric,
                    metric.element_type(),
                    actual
                )
            }
            MatchError::MetricMismatch { reference, query } => {
                write!(f, "Query metric {} differs from reference metric {}", query, reference)
            }
            MatchError::UnknownMetric(name) => write!(f, "Unknown distance metric: {}", name),
            MatchError::Core(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<CoreError> for MatchError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownMetric(name) => MatchError::UnknownMetric(name),
            other => MatchError::Core(other),
        }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
