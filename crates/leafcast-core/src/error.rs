use thiserror::Error;

/// Error taxonomy shared by every stage of the pipeline.
///
/// All errors are terminal for the call that raised them: there is no local
/// recovery and no partial result.
#[derive(Debug, Error, Clone)]
pub enum ModelError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("empty input: at least one sample and one feature required")]
    EmptyInput,

    #[error("fit failed: {0}")]
    FitFailure(String),

    #[error("model has not been trained and no persisted state is available")]
    ModelNotTrained,

    #[error("unknown leaf identifier {value} in tree column {column}")]
    UnknownCategory { column: usize, value: u32 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
