//! Translation error taxonomy.
//!
//! Errors occur only at the front-end boundary: a source tree can hold
//! constructs the canonical model does not express, or redirection shapes
//! that make no sense. Printing never fails; invalid text in front-end
//! words is recovered locally with lossy decoding rather than reported.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// The front end handed over a node the canonical model cannot express.
    #[error("unsupported construct: {kind} (line {line:?})")]
    UnsupportedConstruct { kind: String, line: Option<usize> },

    /// A redirection whose operands do not fit its operator, e.g. a file
    /// redirection targeting a bare descriptor number.
    #[error("invalid redirection target for {kind} (line {line:?})")]
    InvalidRedirectionTarget { kind: String, line: Option<usize> },
}

impl TranslateError {
    pub fn unsupported(kind: impl Into<String>, line: Option<usize>) -> Self {
        TranslateError::UnsupportedConstruct {
            kind: kind.into(),
            line,
        }
    }

    pub fn bad_redirect(kind: impl Into<String>, line: Option<usize>) -> Self {
        TranslateError::InvalidRedirectionTarget {
            kind: kind.into(),
            line,
        }
    }
}
