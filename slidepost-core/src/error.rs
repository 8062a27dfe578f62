use thiserror::Error;

pub type Result<T> = std::result::Result<T, SlideError>;

#[derive(Error, Debug)]
pub enum SlideError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("maximum file size is {max} bytes, got {actual}")]
    SizeExceeded { max: u64, actual: u64 },

    #[error("disk quota exceeded: {used} + {incoming} > {quota}")]
    QuotaExceeded { used: u64, incoming: u64, quota: u64 },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),
}
