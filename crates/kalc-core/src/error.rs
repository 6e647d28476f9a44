use thiserror::Error;

#[derive(Debug, Error)]
pub enum KalcError {
    #[error("calculation error: {0}")]
    Calculation(String),

    #[error("invalid function: contains '{0}'")]
    ForbiddenToken(String),

    #[error("matrix error: {0}")]
    Matrix(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type KalcResult<T> = Result<T, KalcError>;
