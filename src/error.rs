//! Request-level error taxonomy.
//!
//! Handlers return these by value; the middleware boundary turns them into a
//! negotiated error entity with the status from [`ProxyError::status_code`].

use std::time::Duration;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::registry::RegistryError;

/// Errors produced while serving the registry endpoint or forwarding.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("missing required query parameter '{0}'")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("no proxy registered at '{0}'")]
    NotFound(String),

    #[error("no resource at '{0}'")]
    NoRoute(String),

    #[error("method {0} is not supported on the registry endpoint")]
    MethodNotAllowed(Method),

    #[error("request path '{path}' is not under proxy path '{proxy}'")]
    PrefixMismatch { path: String, proxy: String },

    #[error("request for '{path}' has passed through this proxy {hops} times")]
    LoopDetected { path: String, hops: usize },

    #[error("cannot build upstream URI from '{target}': {reason}")]
    InvalidTargetUri { target: String, reason: String },

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("failed to build upstream request: {0}")]
    Http(#[from] axum::http::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter(_) | ProxyError::Registry(_) => StatusCode::BAD_REQUEST,
            ProxyError::NotFound(_) | ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::LoopDetected { .. } => StatusCode::LOOP_DETECTED,
            ProxyError::PrefixMismatch { .. }
            | ProxyError::InvalidTargetUri { .. }
            | ProxyError::Upstream(_)
            | ProxyError::UpstreamTimeout(_)
            | ProxyError::Http(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extended detail for transport failures (the source chain), if any.
    pub fn detail(&self) -> Option<String> {
        let mut source = std::error::Error::source(self)?;
        let mut detail = source.to_string();
        while let Some(next) = source.source() {
            detail.push_str(": ");
            detail.push_str(&next.to_string());
            source = next;
        }
        Some(detail)
    }
}
