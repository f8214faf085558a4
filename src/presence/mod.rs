//! Presence subsystem.
//!
//! # Data Flow
//! ```text
//! interval tick
//!     → notifier.rs (read live settings: base URI, peers, path base)
//!     → GET {peer root}{admin path}?path={peer path}&reverseUri={self}
//!       for every peer at once, each bounded by the heartbeat timeout
//!     → peers refresh our record, keeping it available
//! ```

pub mod notifier;

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

pub use notifier::{NotifierHandle, ProxyNotifier};

/// Failures of a single announcement. None of them stop the notifier.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("invalid peer URI '{peer}': {reason}")]
    InvalidPeer { peer: String, reason: String },

    #[error("failed to build announcement: {0}")]
    Request(#[from] axum::http::Error),

    #[error("peer unreachable: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("peer did not answer within {0:?}")]
    Timeout(Duration),

    #[error("peer rejected announcement with {0}")]
    Rejected(StatusCode),
}
