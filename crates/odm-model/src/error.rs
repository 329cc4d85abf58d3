use thiserror::Error;

#[derive(Debug, Error)]
pub enum OdmError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("required column {0} not found in header row")]
    MissingColumn(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, OdmError>;
