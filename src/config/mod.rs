//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated)
//!     → stored in an ArcSwap shared by the handlers and the notifier
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<ProxyConfig>
//!     → static proxies merged into the live registry
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Static proxy entries are parsed by the registry, where a bad entry is skipped

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::ForwardingConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::PresenceConfig;
pub use schema::ProxyConfig;
pub use schema::RegistryConfig;
pub use schema::StaticProxyConfig;
pub use schema::TimeoutConfig;

pub use loader::{load_config, parse_config, ConfigError};
pub use watcher::ConfigWatcher;
