//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (forwarding or heartbeat)
//!     → timeouts.rs (connect timeout on the connector, deadline on the call)
//!     → transport error or timeout surfaces as a distinct error to the caller
//! ```
//!
//! # Design Decisions
//! - No retries: forwarded bodies are streamed and cannot be replayed
//! - Heartbeats simply try again on the next tick

pub mod timeouts;
