//! Quoting & Escaping Engine
//!
//! Pure, per-character decisions about how to re-emit argument characters
//! in a given syntactic context. Deterministic by construction: the same
//! `(character, mode)` pair always yields the same text, which the
//! fixpoint tests rely on.

/// The syntactic context a word is printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    Unquoted,
    /// Inside double quotes.
    Quoted,
    /// Inside a heredoc body.
    Heredoc,
}

/// Characters that must be escaped in every context.
fn always_escaped(c: char) -> bool {
    matches!(c, '\'' | '"' | '`' | '(' | ')' | '{' | '}' | '$' | '&' | '|' | ';')
}

/// Characters that must be escaped only outside quotes.
/// `!` is deliberately absent for non-interactive shell compatibility.
fn escaped_when_unquoted(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']' | '#' | '<' | '>' | '~' | ' ')
}

/// Emit an `Escaped` character.
pub fn push_escaped(buf: &mut String, c: char, mode: QuoteMode) {
    if always_escaped(c) || (mode == QuoteMode::Unquoted && escaped_when_unquoted(c)) {
        buf.push('\\');
        buf.push(c);
    } else {
        buf.push(c);
    }
}

/// Emit a `Literal` character. `guard_dollar` is set by the word printer
/// for a non-verbatim `$` with more characters following, so reprinted
/// text cannot re-parse as an expansion.
pub fn push_literal(buf: &mut String, c: char, mode: QuoteMode, guard_dollar: bool) {
    if mode == QuoteMode::Quoted && c == '"' {
        buf.push_str("\\\"");
    } else if guard_dollar && c == '$' {
        buf.push_str("\\$");
    } else {
        buf.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(c: char, mode: QuoteMode) -> String {
        let mut s = String::new();
        push_escaped(&mut s, c, mode);
        s
    }

    fn literal(c: char, mode: QuoteMode, guard: bool) -> String {
        let mut s = String::new();
        push_literal(&mut s, c, mode, guard);
        s
    }

    #[test]
    fn metacharacters_escape_in_every_mode() {
        for c in ['\'', '"', '`', '(', ')', '{', '}', '$', '&', '|', ';'] {
            for mode in [QuoteMode::Unquoted, QuoteMode::Quoted, QuoteMode::Heredoc] {
                assert_eq!(escaped(c, mode), format!("\\{}", c), "char {:?}", c);
            }
        }
    }

    #[test]
    fn glob_characters_escape_only_unquoted() {
        for c in ['*', '?', '[', ']', '#', '<', '>', '~', ' '] {
            assert_eq!(escaped(c, QuoteMode::Unquoted), format!("\\{}", c));
            assert_eq!(escaped(c, QuoteMode::Quoted), c.to_string());
            assert_eq!(escaped(c, QuoteMode::Heredoc), c.to_string());
        }
    }

    #[test]
    fn bang_is_never_escaped() {
        for mode in [QuoteMode::Unquoted, QuoteMode::Quoted, QuoteMode::Heredoc] {
            assert_eq!(escaped('!', mode), "!");
        }
    }

    #[test]
    fn plain_characters_pass_through() {
        assert_eq!(escaped('a', QuoteMode::Unquoted), "a");
        assert_eq!(literal('a', QuoteMode::Unquoted, false), "a");
    }

    #[test]
    fn double_quote_escapes_inside_quotes() {
        assert_eq!(literal('"', QuoteMode::Quoted, false), "\\\"");
        assert_eq!(literal('"', QuoteMode::Unquoted, false), "\"");
    }

    #[test]
    fn dollar_guard_applies_only_when_requested() {
        assert_eq!(literal('$', QuoteMode::Unquoted, true), "\\$");
        assert_eq!(literal('$', QuoteMode::Unquoted, false), "$");
    }
}
