use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MedindexError {
    #[error("Can't find {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Unknown source format: {0}")]
    UnknownFormat(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MedindexError>;
