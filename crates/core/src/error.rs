use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid seed entry '{name}': {reason}")]
    InvalidSeed { name: String, reason: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TaskflowError>;
