//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware chain)
//!     → request.rs (request ID, query params, origin)
//!     → admin registry endpoint, or
//!     → forward.rs (prefix lookup, headers.rs, stream to upstream)
//!     → response.rs + negotiation.rs + entity.rs for anything the proxy answers itself
//! ```

pub mod entity;
pub mod forward;
pub mod headers;
pub mod negotiation;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
