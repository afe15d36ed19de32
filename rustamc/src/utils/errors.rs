use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmcError {
    #[error("Unsupported cashflow kind: {0}")]
    UnsupportedCashflowKind(String),
    #[error("Insufficient samples: {0}")]
    InsufficientSamples(String),
    #[error("Missing simulation time: {0}")]
    MissingSimulationTime(String),
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Error while evaluating: {0}")]
    EvaluationError(String),
}

pub type Result<T> = std::result::Result<T, AmcError>;

impl From<AmcError> for String {
    fn from(e: AmcError) -> Self {
        e.to_string()
    }
}
