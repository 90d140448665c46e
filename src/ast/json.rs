//! Structural Serialization
//!
//! Every node serializes to a nested two-element `[tag, payload]` array
//! (plus primitive leaves), the interchange format consumed by external
//! tooling. Tags are the stable string identifiers of the node kinds; the
//! runtime never dispatches on them.

use serde_json::{json, Value};

use crate::ast::types::*;

fn tagged(tag: &str, payload: Value) -> Value {
    json!([tag, payload])
}

fn word_json(word: &Word) -> Value {
    Value::Array(word.iter().map(ArgChar::json).collect())
}

fn words_json(words: &[Word]) -> Value {
    Value::Array(words.iter().map(word_json).collect())
}

fn opt_command_json(cmd: &Option<Box<Command>>) -> Value {
    match cmd {
        Some(c) => c.json(),
        None => Value::Null,
    }
}

impl FdTarget {
    pub fn json(&self) -> Value {
        match self {
            FdTarget::Fixed(n) => json!(["fixed", n]),
            FdTarget::Named(word) => json!(["var", word_json(word)]),
        }
    }
}

impl Assign {
    pub fn json(&self) -> Value {
        json!([self.name, word_json(&self.value)])
    }
}

impl ArgChar {
    pub fn json(&self) -> Value {
        match self {
            // The verbatim flag is print-only and deliberately absent here.
            ArgChar::Literal { c, .. } => tagged("C", json!(*c as u32)),
            ArgChar::Escaped(c) => tagged("E", json!(*c as u32)),
            ArgChar::Tilde(user) => tagged("T", json!(user)),
            ArgChar::ArithSub(expr) => tagged("A", word_json(expr)),
            ArgChar::VarExpand {
                format,
                treat_null_as_unset,
                name,
                arg,
            } => tagged(
                "V",
                json!([format.tag(), treat_null_as_unset, name, word_json(arg)]),
            ),
            ArgChar::Quoted(inner) => tagged("Q", word_json(inner)),
            ArgChar::CmdSub(body) => tagged("B", body.json()),
        }
    }
}

impl Redirect {
    pub fn json(&self) -> Value {
        match self {
            Redirect::File { kind, fd, arg } => {
                let tag = match kind {
                    FileRedirKind::To => "To",
                    FileRedirKind::Clobber => "Clobber",
                    FileRedirKind::From => "From",
                    FileRedirKind::FromTo => "FromTo",
                    FileRedirKind::Append => "Append",
                    FileRedirKind::ReadingString => "ReadingString",
                };
                tagged("File", json!([tag, fd.json(), word_json(arg)]))
            }
            Redirect::Dup {
                kind,
                fd,
                target,
                move_fd,
            } => {
                let tag = match kind {
                    DupRedirKind::FromFd => "FromFD",
                    DupRedirKind::ToFd => "ToFD",
                };
                tagged("Dup", json!([tag, fd.json(), target.json(), move_fd]))
            }
            Redirect::Heredoc {
                kind,
                fd,
                body,
                delimiter,
                ..
            } => {
                let tag = match kind {
                    HeredocKind::Here => "Here",
                    HeredocKind::XHere => "XHere",
                };
                tagged("Heredoc", json!([tag, fd.json(), word_json(body), delimiter]))
            }
            Redirect::SingleArg { kind, fd } => {
                let tag = match kind {
                    SingleArgRedirKind::CloseThis => "CloseThis",
                    SingleArgRedirKind::ErrAndOut => "ErrAndOut",
                    SingleArgRedirKind::AppendErrAndOut => "AppendErrAndOut",
                };
                tagged("SingleArg", json!([tag, fd.json()]))
            }
        }
    }
}

fn redirs_json(redirs: &[Redirect]) -> Value {
    Value::Array(redirs.iter().map(Redirect::json).collect())
}

impl CaseClause {
    pub fn json(&self) -> Value {
        json!({
            "cpattern": words_json(&self.patterns),
            "cbody": self.body.as_ref().map(Command::json),
            "fallthrough": self.fallthrough,
        })
    }
}

impl CondExpr {
    pub fn json(&self) -> Value {
        let kind = match self.kind {
            CondKind::And => 1,
            CondKind::Or => 2,
            CondKind::Unary => 3,
            CondKind::Binary => 4,
            CondKind::Term => 5,
            CondKind::Expr => 6,
        };
        json!([
            self.line,
            kind,
            self.op.as_ref().map(word_json),
            self.left.as_ref().map(|c| c.json()),
            self.right.as_ref().map(|c| c.json()),
            self.negate,
        ])
    }
}

impl Command {
    /// Serialize the tree for interchange.
    pub fn json(&self) -> Value {
        match self {
            Command::Pipe { background, items } => tagged(
                "Pipe",
                json!([background, Value::Array(items.iter().map(Command::json).collect())]),
            ),
            Command::Simple {
                line,
                assignments,
                arguments,
                redirects,
            } => tagged(
                "Command",
                json!([
                    line,
                    Value::Array(assignments.iter().map(Assign::json).collect()),
                    words_json(arguments),
                    redirs_json(redirects),
                ]),
            ),
            Command::Subshell {
                line,
                body,
                redirects,
            } => tagged("Subshell", json!([line, body.json(), redirs_json(redirects)])),
            Command::And { left, right, .. } => {
                tagged("And", json!([left.json(), right.json()]))
            }
            Command::Or { left, right, .. } => {
                tagged("Or", json!([left.json(), right.json()]))
            }
            Command::Semi { left, right, .. } => {
                tagged("Semi", json!([left.json(), right.json()]))
            }
            Command::Not { body, .. } => tagged("Not", body.json()),
            Command::Redir {
                line,
                body,
                redirects,
            } => tagged("Redir", json!([line, body.json(), redirs_json(redirects)])),
            Command::Background {
                line,
                body,
                redirects,
                ..
            } => tagged("Background", json!([line, body.json(), redirs_json(redirects)])),
            Command::Defun {
                line, name, body, ..
            } => tagged("Defun", json!([line, word_json(name), body.json()])),
            Command::For {
                line,
                var,
                items,
                body,
            } => tagged(
                "For",
                json!([line, words_json(items), body.json(), word_json(var)]),
            ),
            Command::While { test, body } => {
                tagged("While", json!([test.json(), body.json()]))
            }
            Command::If {
                cond,
                then_branch,
                else_branch,
            } => tagged(
                "If",
                json!([cond.json(), then_branch.json(), opt_command_json(else_branch)]),
            ),
            Command::Case {
                line,
                subject,
                clauses,
            } => tagged(
                "Case",
                json!([
                    line,
                    word_json(subject),
                    Value::Array(clauses.iter().map(CaseClause::json).collect()),
                ]),
            ),
            Command::Group { body } => tagged("Group", body.json()),
            Command::Select {
                line,
                var,
                items,
                body,
            } => tagged(
                "Select",
                json!([line, word_json(var), body.json(), words_json(items)]),
            ),
            Command::Arith { line, body } => tagged("Arith", json!([line, words_json(body)])),
            Command::Cond(expr) => tagged("Cond", expr.json()),
            Command::ArithFor {
                line,
                init,
                cond,
                step,
                body,
            } => tagged(
                "ArithFor",
                json!([
                    line,
                    words_json(init),
                    words_json(cond),
                    words_json(step),
                    body.json(),
                ]),
            ),
            Command::Coproc { name, body } => {
                tagged("Coproc", json!([word_json(name), body.json()]))
            }
            Command::Time {
                posix_format,
                body,
            } => tagged("Time", json!([posix_format, body.json()])),
        }
    }
}
