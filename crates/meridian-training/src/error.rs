use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("versioning error: {0}")]
    Versioning(String),

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("model evaluation failed: {0}")]
    Evaluate(String),

    #[error(transparent)]
    Data(#[from] meridian_data::DataError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
