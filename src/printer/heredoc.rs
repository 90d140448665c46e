//! Heredoc Deferral Protocol
//!
//! A heredoc's header (`<<MARKER`) must stay on its statement's line while
//! the body follows the entire logical line. The printer asks this module
//! which redirections of a command must be deferred and what marker text
//! delimits each body.

use crate::ast::types::Redirect;

/// The heredoc redirections of `redirs`, in declaration order. The caller
/// prints their headers inline and their bodies after the logical line,
/// in reverse of this order.
pub fn deferred_heredocs(redirs: &[Redirect]) -> Vec<&Redirect> {
    redirs.iter().filter(|r| r.is_heredoc()).collect()
}

/// Pick a delimiter for a heredoc body with no source delimiter: `EOF`,
/// then `EOF1`, `EOF2`, … until no body line equals the candidate.
pub fn fresh_marker(body: &str) -> String {
    let collides = |candidate: &str| body.lines().any(|line| line == candidate);
    if !collides("EOF") {
        return "EOF".to_string();
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("EOF{}", n);
        if !collides(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
