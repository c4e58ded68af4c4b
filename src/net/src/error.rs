//! Error types for peer transport

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("request to {peer} failed: {source}")]
    Request {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("peer {peer} answered {status}")]
    Status {
        peer: String,
        status: reqwest::StatusCode,
    },

    #[error("client construction failed: {0}")]
    Build(#[from] reqwest::Error),
}
