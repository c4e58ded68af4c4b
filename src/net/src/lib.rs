//! HTTP transport between fabric peers
//!
//! Peers are named in configuration and resolved to `http://<name>:<port>`
//! unless an explicit endpoint override is supplied (tests run whole
//! clusters on loopback this way). Every call carries the fabric-wide
//! 2 second timeout; fan-out helpers swallow per-peer failures because a
//! silent peer is an ordinary condition, not an error.

pub mod client;
pub mod error;

pub use client::{PeerClient, PeerClientConfig};
pub use error::{NetError, Result};
