//! Error types for the trust engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrustError>;

#[derive(Error, Debug)]
pub enum TrustError {
    #[error("metric registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}
