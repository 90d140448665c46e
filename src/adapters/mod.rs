//! Front-end adapters.
//!
//! Each submodule canonicalizes one parser's native output into the
//! shared [`Command`](crate::ast::types::Command) tree: `dash` takes the
//! POSIX parser's typed nodes, `bash` takes the richer word-flag graph,
//! and `shfmt` consumes the `-tojson` document. All three converge on
//! the same printable model; what a front end cannot represent becomes a
//! [`TranslateError`](crate::error::TranslateError) rather than a lossy
//! guess.

pub mod bash;
pub mod dash;
pub mod shfmt;
