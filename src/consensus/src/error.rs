//! Error types for consensus operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsensusError>;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("metric registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}
