//! Registry-driven reverse proxy library.
//!
//! Proxies register path prefixes at runtime through a small HTTP endpoint;
//! every other request under a registered prefix is forwarded to its target.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod presence;
pub mod registry;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::ProxyRegistry;
