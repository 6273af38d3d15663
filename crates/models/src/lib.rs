//! Domain model for Sandwich Lab scan sessions.
//!
//! Value types for traded legs, detected sandwiches, token display metadata
//! and the block range covered by a scan.

pub mod models;
pub mod range;

pub use models::{ModelError, Sandwich, Swap, TokenMetadata};
pub use range::Range;
