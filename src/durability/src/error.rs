//! Error types for the durability layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DurabilityError>;

#[derive(Error, Debug)]
pub enum DurabilityError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
