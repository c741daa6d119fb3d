use thiserror::Error;

pub type DataResult<T> = std::result::Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("failed to load partition: {0}")]
    Load(String),

    #[error("failed to convert records: {0}")]
    Convert(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
