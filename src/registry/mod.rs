//! Proxy registry subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     [[proxies]] config entries
//!     → record.rs (parse: normalize path, validate reverse URI)
//!     → store.rs (insert, bad entries logged and skipped)
//!
//! Runtime:
//!     registry endpoint (register / refresh / deregister)
//!     → store.rs (single write lock, conflict check, mutate)
//!     forwarding handler
//!     → store.rs (read lock, longest prefix lookup, snapshot)
//! ```
//!
//! # Design Decisions
//! - In-memory only; rebuilt from config plus peer heartbeats
//! - A path never changes target silently: a different target is a conflict
//! - Stale records are reported unavailable but never purged

pub mod record;
pub mod store;

use thiserror::Error;

pub use record::{ProxyRecord, ReverseTarget, AVAILABILITY_WINDOW};
pub use store::{Outcome, ProxyRegistry, Registration, RegistrationMode};

/// Errors raised while parsing or registering proxy records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid proxy path '{0}'")]
    InvalidPath(String),
    #[error("invalid reverse URI '{uri}': {reason}")]
    InvalidReverseUri { uri: String, reason: String },
    #[error("path '{path}' is already proxied to '{existing}', refusing to redirect it to '{requested}'")]
    Conflict {
        path: String,
        existing: String,
        requested: String,
    },
}

/// Errors raised while building the upstream URL for a forwarded request.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),
    #[error("'{target}' is outside the base path '{base}'")]
    OutsideBase { target: String, base: String },
}
