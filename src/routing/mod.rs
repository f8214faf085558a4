//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → segments.rs (split, normalize, compare)
//!     → path_index.rs (trie walk: exact or longest prefix)
//!     → Return: matched value or no match
//!
//! Registration:
//!     Path template ("/Items/{id}")
//!     → lower-cased segment keys, placeholders under "*"
//!     → terminal node keeps the original path and the value
//! ```
//!
//! # Design Decisions
//! - No regex in the hot path (segment map lookups only)
//! - Case-insensitive segment matching, original case kept for display
//! - The index is not synchronized; owners wrap it in a lock

pub mod path_index;
pub mod segments;

pub use path_index::PathIndex;
