//! Canonical shell AST.
//!
//! `types` holds the node definitions; `json` the structural serialization
//! used for cross-language interchange.

pub mod json;
pub mod types;

pub use types::*;
