//! shell-ast - A canonical typed AST for POSIX-family shell scripts
//!
//! This library provides one shared command tree for shell scripts, a
//! source-faithful unparser back to shell syntax, a tagged-array JSON
//! interchange form, and adapters that canonicalize the output of three
//! front ends (dash, bash, shfmt) into that tree.

pub mod adapters;
pub mod ast;
pub mod error;
pub mod printer;

pub use ast::types::*;
pub use error::TranslateError;
pub use printer::pretty;
