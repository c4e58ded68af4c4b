//! Peer endpoint
//!
//! The HTTP surface every fabric node serves: the consensus protocol
//! (`/propose`, `/vote`, `/alert`), governance orders, read-only views
//! (`/status`, `/events`, `/reputation`, `/metrics`) and the state
//! transfer routes used by recovery and replica sync.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, Result};
pub use routes::create_router;
pub use state::AppState;
