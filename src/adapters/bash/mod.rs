//! Bash front end: canonicalizes the bash command graph.
//!
//! Words arrive as raw bytes and are decoded lossily; the resulting
//! literals are verbatim (they reproduce source text, so the printer's
//! defensive `$` guard must not apply). Command-level flags become `Not`
//! and `Time` wrappers, `until` becomes an inverted `while`, and nested
//! pipe connections flatten into a single pipeline.
//!
//! Translation walks the graph with an explicit worklist instead of
//! call-stack recursion: each command is visited once to queue its
//! children and once more to assemble the canonical node from their
//! finished translations, so deeply nested inputs cannot overflow the
//! native stack.

pub mod command;

use crate::ast::types as ast;
use crate::ast::types::{ArgChar, Assign, Command, CondExpr, FdTarget, Word};
use crate::error::TranslateError;

use command::*;

enum Work<'a> {
    Visit(&'a BashCommand),
    /// Assemble a command from `child_count` finished translations.
    Build(&'a BashCommand, usize),
}

/// Finished child translations for the command being assembled, consumed
/// in the order `children` queued them.
struct Taken {
    items: Vec<Command>,
    cursor: usize,
}

impl Taken {
    fn next(&mut self) -> Command {
        match self.items.get_mut(self.cursor) {
            Some(slot) => {
                self.cursor += 1;
                std::mem::replace(slot, Command::empty())
            }
            None => Command::empty(),
        }
    }
}

/// Translate a list of top-level commands.
pub fn to_ast_nodes(nodes: &[BashCommand]) -> Result<Vec<Command>, TranslateError> {
    nodes.iter().map(to_ast).collect()
}

/// Translate one bash command into the canonical tree.
pub fn to_ast(node: &BashCommand) -> Result<Command, TranslateError> {
    let mut work = vec![Work::Visit(node)];
    let mut done: Vec<Command> = Vec::new();
    while let Some(item) = work.pop() {
        match item {
            Work::Visit(node) => {
                let mut kids = Vec::new();
                children(node, &mut kids);
                work.push(Work::Build(node, kids.len()));
                for child in kids.into_iter().rev() {
                    work.push(Work::Visit(child));
                }
            }
            Work::Build(node, child_count) => {
                let items = done.split_off(done.len().saturating_sub(child_count));
                let mut taken = Taken { items, cursor: 0 };
                let cmd = build(node, &mut taken)?;
                done.push(wrap_flags(node, cmd));
            }
        }
    }
    Ok(done.pop().unwrap_or_else(Command::empty))
}

/// Queue every child command of `node`, in the order `build` consumes
/// their translations.
fn children<'a>(node: &'a BashCommand, out: &mut Vec<&'a BashCommand>) {
    match &node.kind {
        BashCommandKind::Simple { .. }
        | BashCommandKind::Arith { .. }
        | BashCommandKind::Cond { .. } => {}
        BashCommandKind::Connection { left, right, .. } => {
            out.push(left);
            if let Some(r) = right {
                out.push(r);
            }
        }
        BashCommandKind::Subshell { body }
        | BashCommandKind::Group { body }
        | BashCommandKind::FunctionDef { body, .. }
        | BashCommandKind::Coproc { body, .. }
        | BashCommandKind::For { body, .. }
        | BashCommandKind::Select { body, .. }
        | BashCommandKind::ArithFor { body, .. } => out.push(body),
        BashCommandKind::If {
            test,
            true_case,
            false_case,
        } => {
            out.push(test);
            out.push(true_case);
            if let Some(f) = false_case {
                out.push(f);
            }
        }
        BashCommandKind::While { test, body } | BashCommandKind::Until { test, body } => {
            out.push(test);
            out.push(body);
        }
        BashCommandKind::Case { clauses, .. } => {
            for clause in clauses {
                if let Some(b) = &clause.body {
                    out.push(b);
                }
            }
        }
    }
}

fn build(node: &BashCommand, taken: &mut Taken) -> Result<Command, TranslateError> {
    match &node.kind {
        BashCommandKind::Simple { words } => simple(node, words),
        BashCommandKind::Connection {
            connector: ConnectionType::Ampersand,
            right,
            ..
        } => Ok(Command::Background {
            line: node.line,
            body: Box::new(taken.next()),
            redirects: redirect_list(&node.redirects, node.line)?,
            tail: match right {
                Some(_) => Some(Box::new(taken.next())),
                None => None,
            },
            no_braces: false,
        }),
        kind => {
            let base = kind_to_ast(node, kind, taken)?;
            Ok(if node.redirects.is_empty() {
                base
            } else {
                Command::Redir {
                    line: node.line,
                    body: Box::new(base),
                    redirects: redirect_list(&node.redirects, node.line)?,
                }
            })
        }
    }
}

/// Invert-return and time flags wrap the translated command.
fn wrap_flags(node: &BashCommand, mut cmd: Command) -> Command {
    if node.has_flag(CommandFlag::InvertReturn) {
        cmd = Command::Not {
            body: Box::new(cmd),
            no_braces: false,
        };
    }
    if node.has_flag(CommandFlag::TimePipeline) || node.has_flag(CommandFlag::TimePosix) {
        cmd = Command::Time {
            posix_format: node.has_flag(CommandFlag::TimePosix),
            body: Box::new(cmd),
        };
    }
    cmd
}

fn kind_to_ast(
    node: &BashCommand,
    kind: &BashCommandKind,
    taken: &mut Taken,
) -> Result<Command, TranslateError> {
    match kind {
        BashCommandKind::Simple { .. }
        | BashCommandKind::Connection {
            connector: ConnectionType::Ampersand,
            ..
        } => unreachable!("handled by build"),
        BashCommandKind::Connection {
            connector, right, ..
        } => connection(node, *connector, right.is_some(), taken),
        BashCommandKind::Subshell { .. } => Ok(Command::Subshell {
            line: node.line,
            body: Box::new(taken.next()),
            redirects: Vec::new(),
        }),
        BashCommandKind::Group { .. } => Ok(Command::Group {
            body: Box::new(taken.next()),
        }),
        BashCommandKind::If { false_case, .. } => Ok(Command::If {
            cond: Box::new(taken.next()),
            then_branch: Box::new(taken.next()),
            else_branch: match false_case {
                Some(_) => Some(Box::new(taken.next())),
                None => None,
            },
        }),
        BashCommandKind::While { .. } => Ok(Command::While {
            test: Box::new(taken.next()),
            body: Box::new(taken.next()),
        }),
        BashCommandKind::Until { .. } => Ok(Command::While {
            test: Box::new(Command::Not {
                body: Box::new(taken.next()),
                no_braces: true,
            }),
            body: Box::new(taken.next()),
        }),
        BashCommandKind::For { var, map_list, .. } => Ok(Command::For {
            line: node.line,
            var: decode_word(var),
            items: map_list.iter().map(decode_word).collect(),
            body: Box::new(taken.next()),
        }),
        BashCommandKind::Select { var, map_list, .. } => Ok(Command::Select {
            line: node.line,
            var: decode_word(var),
            items: map_list.iter().map(decode_word).collect(),
            body: Box::new(taken.next()),
        }),
        BashCommandKind::Case { subject, clauses } => Ok(Command::Case {
            line: node.line,
            subject: decode_word(subject),
            clauses: clauses
                .iter()
                .map(|c| ast::CaseClause {
                    patterns: c.patterns.iter().map(decode_word).collect(),
                    body: c.body.as_ref().map(|_| taken.next()),
                    fallthrough: c.fallthrough,
                })
                .collect(),
        }),
        BashCommandKind::FunctionDef { name, .. } => Ok(Command::Defun {
            line: node.line,
            name: decode_word(name),
            body: Box::new(taken.next()),
            bash_style: false,
        }),
        BashCommandKind::Arith { exprs } => Ok(Command::Arith {
            line: node.line,
            body: exprs.iter().map(decode_word).collect(),
        }),
        BashCommandKind::Cond { expr } => Ok(Command::Cond(cond_expr(expr))),
        BashCommandKind::ArithFor {
            init, test, step, ..
        } => Ok(Command::ArithFor {
            line: node.line,
            init: init.iter().map(decode_word).collect(),
            cond: test.iter().map(decode_word).collect(),
            step: step.iter().map(decode_word).collect(),
            body: Box::new(taken.next()),
        }),
        BashCommandKind::Coproc { name, .. } => Ok(Command::Coproc {
            name: decode_word(name),
            body: Box::new(taken.next()),
        }),
    }
}

fn connection(
    node: &BashCommand,
    connector: ConnectionType,
    has_right: bool,
    taken: &mut Taken,
) -> Result<Command, TranslateError> {
    let line = node.line;
    if !has_right {
        return Err(TranslateError::unsupported(
            "connection with a missing right operand",
            line,
        ));
    }
    match connector {
        ConnectionType::AndAnd => Ok(Command::And {
            left: Box::new(taken.next()),
            right: Box::new(taken.next()),
            no_braces: false,
        }),
        ConnectionType::OrOr => Ok(Command::Or {
            left: Box::new(taken.next()),
            right: Box::new(taken.next()),
            no_braces: false,
        }),
        ConnectionType::Semicolon => Ok(Command::Semi {
            left: Box::new(taken.next()),
            right: Box::new(taken.next()),
            explicit_semicolon: false,
        }),
        ConnectionType::Pipe => {
            let mut items = pipe_items(taken.next());
            items.extend(pipe_items(taken.next()));
            Ok(Command::Pipe {
                background: false,
                items,
            })
        }
        // The grammar reserves this connector but the parser never emits
        // it with a meaning we can reproduce.
        ConnectionType::Newline => {
            Err(TranslateError::unsupported("newline connection", line))
        }
        ConnectionType::Ampersand => unreachable!("handled by build"),
    }
}

/// Unwrap a translated operand so nested pipes flatten into one pipeline.
fn pipe_items(cmd: Command) -> Vec<Command> {
    let mut cmd = cmd;
    if let Command::Pipe { items, .. } = &mut cmd {
        return std::mem::take(items);
    }
    vec![cmd]
}

fn simple(node: &BashCommand, words: &[BashWord]) -> Result<Command, TranslateError> {
    let mut assignments = Vec::new();
    let mut arguments = Vec::new();
    for word in words {
        // Promotion is position-independent: the parser flags assignment
        // words wherever they sit.
        if word.has_flag(WordFlag::Assignment) {
            match split_assignment(word) {
                Some(assign) => assignments.push(assign),
                None => arguments.push(decode_word(word)),
            }
        } else {
            arguments.push(decode_word(word));
        }
    }
    Ok(Command::Simple {
        line: node.line,
        assignments,
        arguments,
        redirects: redirect_list(&node.redirects, node.line)?,
    })
}

fn split_assignment(word: &BashWord) -> Option<Assign> {
    let eq = word.bytes.iter().position(|b| *b == b'=')?;
    if eq == 0 {
        return None;
    }
    let name = String::from_utf8_lossy(&word.bytes[..eq]).into_owned();
    let value = decode_bytes(&word.bytes[eq + 1..]);
    Some(Assign { name, value })
}

/// Lossy decode: invalid UTF-8 becomes replacement characters rather
/// than failing the whole translation.
fn decode_bytes(bytes: &[u8]) -> Word {
    String::from_utf8_lossy(bytes)
        .chars()
        .map(ArgChar::raw)
        .collect()
}

fn decode_word(word: &BashWord) -> Word {
    decode_bytes(&word.bytes)
}

/// `[[ … ]]` expressions nest through their own boxes; the same
/// visit-then-assemble walk keeps them off the native stack.
fn cond_expr(expr: &BashCond) -> CondExpr {
    enum Step<'a> {
        Visit(&'a BashCond),
        Build(&'a BashCond),
    }
    let mut work = vec![Step::Visit(expr)];
    let mut done: Vec<CondExpr> = Vec::new();
    while let Some(step) = work.pop() {
        match step {
            Step::Visit(e) => {
                work.push(Step::Build(e));
                if let Some(r) = &e.right {
                    work.push(Step::Visit(r));
                }
                if let Some(l) = &e.left {
                    work.push(Step::Visit(l));
                }
            }
            Step::Build(e) => {
                let right = e.right.as_ref().and_then(|_| done.pop()).map(Box::new);
                let left = e.left.as_ref().and_then(|_| done.pop()).map(Box::new);
                done.push(CondExpr {
                    line: e.line,
                    kind: match e.kind {
                        BashCondKind::And => ast::CondKind::And,
                        BashCondKind::Or => ast::CondKind::Or,
                        BashCondKind::Unary => ast::CondKind::Unary,
                        BashCondKind::Binary => ast::CondKind::Binary,
                        BashCondKind::Term => ast::CondKind::Term,
                        BashCondKind::Expr => ast::CondKind::Expr,
                    },
                    op: e.op.as_ref().map(decode_word),
                    left,
                    right,
                    negate: e.flags.contains(&CommandFlag::InvertReturn),
                });
            }
        }
    }
    done.pop().unwrap_or_else(|| CondExpr {
        line: expr.line,
        kind: ast::CondKind::Term,
        op: None,
        left: None,
        right: None,
        negate: false,
    })
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

fn redirect_list(
    redirs: &[BashRedirect],
    line: Option<usize>,
) -> Result<Vec<ast::Redirect>, TranslateError> {
    redirs.iter().map(|r| redirect(r, line)).collect()
}

fn fd_target(side: &Redirectee) -> FdTarget {
    match side {
        Redirectee::Fd(n) => FdTarget::Fixed(*n),
        Redirectee::Filename(word) => FdTarget::Named(decode_word(word)),
    }
}

/// The redirection target when the instruction requires a word.
fn filename(
    side: &Redirectee,
    kind: &str,
    line: Option<usize>,
) -> Result<Word, TranslateError> {
    match side {
        Redirectee::Filename(word) => Ok(decode_word(word)),
        Redirectee::Fd(_) => Err(TranslateError::bad_redirect(kind, line)),
    }
}

/// The duplication target when the instruction requires a descriptor.
fn dup_fd(side: &Redirectee, kind: &str, line: Option<usize>) -> Result<u32, TranslateError> {
    match side {
        Redirectee::Fd(n) => Ok(*n),
        Redirectee::Filename(_) => Err(TranslateError::bad_redirect(kind, line)),
    }
}

fn redirect(redir: &BashRedirect, line: Option<usize>) -> Result<ast::Redirect, TranslateError> {
    use ast::{DupRedirKind, FileRedirKind, HeredocKind, Redirect, SingleArgRedirKind};
    use RedirInstruction as R;

    let fd = fd_target(&redir.redirector);
    let file = |kind: FileRedirKind, name: &str| -> Result<Redirect, TranslateError> {
        Ok(Redirect::File {
            kind,
            fd: fd_target(&redir.redirector),
            arg: filename(&redir.redirectee, name, line)?,
        })
    };

    match redir.instruction {
        R::OutputDirection => file(FileRedirKind::To, "output redirection"),
        R::InputDirection => file(FileRedirKind::From, "input redirection"),
        R::AppendingTo => file(FileRedirKind::Append, "append redirection"),
        R::InputOutput => file(FileRedirKind::FromTo, "input-output redirection"),
        R::OutputForce => file(FileRedirKind::Clobber, "clobber redirection"),
        R::ReadingString => file(FileRedirKind::ReadingString, "here-string"),
        R::ReadingUntil | R::DeblankReadingUntil => {
            let body = filename(&redir.redirectee, "heredoc", line)?;
            let quoted = matches!(
                &redir.redirectee,
                Redirectee::Filename(w) if w.has_flag(WordFlag::Quoted)
            );
            Ok(Redirect::Heredoc {
                kind: if quoted {
                    HeredocKind::Here
                } else {
                    HeredocKind::XHere
                },
                fd,
                body,
                strip_leading_tabs: redir.instruction == R::DeblankReadingUntil,
                delimiter: redir.here_doc_eof.clone(),
            })
        }
        R::DuplicatingInput | R::DuplicatingOutput | R::MoveInput | R::MoveOutput => {
            let kind = if matches!(redir.instruction, R::DuplicatingInput | R::MoveInput) {
                DupRedirKind::FromFd
            } else {
                DupRedirKind::ToFd
            };
            Ok(Redirect::Dup {
                kind,
                fd,
                target: FdTarget::Fixed(dup_fd(&redir.redirectee, "descriptor duplication", line)?),
                move_fd: matches!(redir.instruction, R::MoveInput | R::MoveOutput),
            })
        }
        R::DuplicatingInputWord
        | R::DuplicatingOutputWord
        | R::MoveInputWord
        | R::MoveOutputWord => {
            let kind = if matches!(
                redir.instruction,
                R::DuplicatingInputWord | R::MoveInputWord
            ) {
                DupRedirKind::FromFd
            } else {
                DupRedirKind::ToFd
            };
            Ok(Redirect::Dup {
                kind,
                fd,
                target: FdTarget::Named(filename(
                    &redir.redirectee,
                    "descriptor duplication",
                    line,
                )?),
                move_fd: matches!(redir.instruction, R::MoveInputWord | R::MoveOutputWord),
            })
        }
        R::CloseThis => Ok(Redirect::SingleArg {
            kind: SingleArgRedirKind::CloseThis,
            fd,
        }),
        R::ErrAndOut => Ok(Redirect::SingleArg {
            kind: SingleArgRedirKind::ErrAndOut,
            fd: FdTarget::Named(filename(&redir.redirectee, "combined redirection", line)?),
        }),
        R::AppendErrAndOut => Ok(Redirect::SingleArg {
            kind: SingleArgRedirKind::AppendErrAndOut,
            fd: FdTarget::Named(filename(&redir.redirectee, "combined redirection", line)?),
        }),
        R::InputADirection => Err(TranslateError::unsupported(
            "reserved input-a redirection",
            line,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::pretty;

    fn w(text: &str) -> BashWord {
        BashWord::new(text)
    }

    fn simple_cmd(words: Vec<BashWord>) -> BashCommand {
        BashCommand::plain(Some(1), BashCommandKind::Simple { words })
    }

    fn connect(
        connector: ConnectionType,
        left: BashCommand,
        right: Option<BashCommand>,
    ) -> BashCommand {
        BashCommand::plain(
            None,
            BashCommandKind::Connection {
                connector,
                left: Box::new(left),
                right: right.map(Box::new),
            },
        )
    }

    #[test]
    fn assignment_words_promote_regardless_of_position() {
        let mut assign = w("FOO=bar");
        assign.flags.push(WordFlag::Assignment);
        let cmd = simple_cmd(vec![w("echo"), w("hi"), assign]);
        let ast = to_ast(&cmd).unwrap();
        match &ast {
            Command::Simple {
                assignments,
                arguments,
                ..
            } => {
                assert_eq!(assignments.len(), 1);
                assert_eq!(assignments[0].name, "FOO");
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("expected Simple, got {:?}", other),
        }
        assert_eq!(pretty(&ast), "FOO=bar echo hi");
    }

    #[test]
    fn nested_pipe_connections_flatten() {
        let inner = connect(
            ConnectionType::Pipe,
            simple_cmd(vec![w("a")]),
            Some(simple_cmd(vec![w("b")])),
        );
        let outer = connect(ConnectionType::Pipe, inner, Some(simple_cmd(vec![w("c")])));
        let ast = to_ast(&outer).unwrap();
        match &ast {
            Command::Pipe { items, .. } => assert_eq!(items.len(), 3),
            other => panic!("expected Pipe, got {:?}", other),
        }
        assert_eq!(pretty(&ast), "a | b | c");
    }

    #[test]
    fn ampersand_keeps_the_right_operand_as_tail() {
        let conn = connect(
            ConnectionType::Ampersand,
            simple_cmd(vec![w("slow")]),
            Some(simple_cmd(vec![w("next")])),
        );
        let ast = to_ast(&conn).unwrap();
        assert!(matches!(&ast, Command::Background { tail: Some(_), .. }));
        assert_eq!(pretty(&ast), "slow & next");
    }

    #[test]
    fn until_translates_to_inverted_while() {
        let cmd = BashCommand::plain(
            None,
            BashCommandKind::Until {
                test: Box::new(simple_cmd(vec![w("check")])),
                body: Box::new(simple_cmd(vec![w("work")])),
            },
        );
        let ast = to_ast(&cmd).unwrap();
        match &ast {
            Command::While { test, .. } => assert!(matches!(test.as_ref(), Command::Not { .. })),
            other => panic!("expected While, got {:?}", other),
        }
        assert_eq!(pretty(&ast), "until check; do work; done");
    }

    #[test]
    fn newline_connections_are_rejected() {
        let conn = connect(
            ConnectionType::Newline,
            simple_cmd(vec![w("a")]),
            Some(simple_cmd(vec![w("b")])),
        );
        assert!(matches!(
            to_ast(&conn),
            Err(TranslateError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn invert_flag_becomes_not() {
        let mut cmd = simple_cmd(vec![w("true")]);
        cmd.flags.push(CommandFlag::InvertReturn);
        let ast = to_ast(&cmd).unwrap();
        assert!(matches!(&ast, Command::Not { .. }));
    }

    #[test]
    fn time_flags_become_time() {
        let mut cmd = simple_cmd(vec![w("work")]);
        cmd.flags.push(CommandFlag::TimePipeline);
        cmd.flags.push(CommandFlag::TimePosix);
        let ast = to_ast(&cmd).unwrap();
        assert!(matches!(
            &ast,
            Command::Time {
                posix_format: true,
                ..
            }
        ));
    }

    #[test]
    fn quoted_heredoc_delimiter_selects_literal_kind() {
        let mut body = w("hello\n");
        body.flags.push(WordFlag::Quoted);
        let mut cmd = simple_cmd(vec![w("cat")]);
        cmd.redirects.push(BashRedirect {
            redirector: Redirectee::Fd(0),
            instruction: RedirInstruction::ReadingUntil,
            redirectee: Redirectee::Filename(body),
            here_doc_eof: Some("EOF".into()),
        });
        let ast = to_ast(&cmd).unwrap();
        assert_eq!(pretty(&ast), "cat <<'EOF'\nhello\nEOF\n");
    }

    #[test]
    fn named_descriptor_redirector() {
        let mut cmd = simple_cmd(vec![w("a")]);
        cmd.redirects.push(BashRedirect {
            redirector: Redirectee::Filename(w("fd")),
            instruction: RedirInstruction::OutputDirection,
            redirectee: Redirectee::Filename(w("log")),
            here_doc_eof: None,
        });
        let ast = to_ast(&cmd).unwrap();
        assert_eq!(pretty(&ast), "a {fd}> log");
    }

    #[test]
    fn file_redirection_needs_a_word_target() {
        let mut cmd = simple_cmd(vec![w("a")]);
        cmd.redirects.push(BashRedirect {
            redirector: Redirectee::Fd(1),
            instruction: RedirInstruction::OutputDirection,
            redirectee: Redirectee::Fd(2),
            here_doc_eof: None,
        });
        assert!(matches!(
            to_ast(&cmd),
            Err(TranslateError::InvalidRedirectionTarget { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_recovered_lossily() {
        let word = BashWord::new([0x66u8, 0xff, 0x6f]);
        let decoded = decode_word(&word);
        assert_eq!(decoded.len(), 3);
        assert!(matches!(
            decoded[1],
            ArgChar::Literal { c: '\u{fffd}', .. }
        ));
    }

    #[test]
    fn decoded_literals_skip_the_dollar_guard() {
        let cmd = simple_cmd(vec![w("echo"), w("$x")]);
        assert_eq!(pretty(&to_ast(&cmd).unwrap()), "echo $x");
    }

    #[test]
    fn deeply_nested_groups_translate_without_overflow() {
        let mut cmd = simple_cmd(vec![w("x")]);
        for _ in 0..10_000 {
            cmd = BashCommand::plain(
                None,
                BashCommandKind::Group {
                    body: Box::new(cmd),
                },
            );
        }
        let out = pretty(&to_ast(&cmd).unwrap());
        assert!(out.starts_with("{ { "));
        assert!(out.ends_with("; } }"));
    }
}
