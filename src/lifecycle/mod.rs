//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Trigger → server stops accepting → in-flight requests drain
//!             → presence notifier stops → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - The notifier owns its own channel so it can be stopped independently

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
