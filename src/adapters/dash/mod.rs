//! Dash front end: canonicalizes the POSIX parser's tree.
//!
//! Translation walks the input with an explicit worklist instead of
//! call-stack recursion, so machine-generated scripts nested thousands
//! of levels deep translate without overflowing the native stack. Each
//! node is visited twice: once to queue its children, once to assemble
//! the canonical node from their finished translations. Command
//! substitutions embedded in words are queued ahead of their word and
//! consumed in order while the word is decoded.
//!
//! An explicit per-call context rides along, so concurrent translations
//! never share state. The only context bit is whether we are inside a
//! function body, where sequencing renders with an explicit `;` instead
//! of newlines.

pub mod ast;

use crate::ast::types as canon;
use crate::ast::types::{ArgChar, Assign, Command, FdTarget, VarFormat, Word};
use crate::error::TranslateError;

use ast::*;

#[derive(Debug, Clone, Copy, Default)]
struct Ctx {
    in_function: bool,
}

enum Work<'a> {
    Visit(&'a DashNode, Ctx),
    /// Assemble a node from `child_count` finished translations.
    Build(&'a DashNode, Ctx, usize),
}

/// Finished child translations for the node being assembled, consumed
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

/// Translate a list of top-level statements.
pub fn to_ast_nodes(nodes: &[DashNode]) -> Result<Vec<Command>, TranslateError> {
    nodes.iter().map(to_ast).collect()
}

/// Translate one statement into the canonical tree.
pub fn to_ast(node: &DashNode) -> Result<Command, TranslateError> {
    let mut work = vec![Work::Visit(node, Ctx::default())];
    let mut done: Vec<Command> = Vec::new();
    while let Some(item) = work.pop() {
        match item {
            Work::Visit(node, ctx) => {
                let mut kids = Vec::new();
                children(node, ctx, &mut kids);
                work.push(Work::Build(node, ctx, kids.len()));
                for (child, ctx) in kids.into_iter().rev() {
                    work.push(Work::Visit(child, ctx));
                }
            }
            Work::Build(node, ctx, child_count) => {
                let items = done.split_off(done.len().saturating_sub(child_count));
                let mut taken = Taken { items, cursor: 0 };
                let cmd = build(node, ctx, &mut taken)?;
                done.push(cmd);
            }
        }
    }
    Ok(done.pop().unwrap_or_else(Command::empty))
}

/// Queue every child command of `node`, in the order `build` consumes
/// their translations: word-embedded substitutions in decoding order,
/// structural children in field order.
fn children<'a>(node: &'a DashNode, ctx: Ctx, out: &mut Vec<(&'a DashNode, Ctx)>) {
    match node {
        DashNode::Command {
            assignments,
            arguments,
            redirects,
            ..
        } => {
            // Assignment values reset the context, matching their
            // decoding below.
            for w in assignments {
                scan_word(w, Ctx::default(), out);
            }
            for w in arguments {
                scan_word(w, ctx, out);
            }
            scan_redirects(redirects, ctx, out);
        }
        DashNode::Pipe { items, .. } => {
            for item in items {
                out.push((item, ctx));
            }
        }
        DashNode::Redir {
            body, redirects, ..
        }
        | DashNode::Background {
            body, redirects, ..
        }
        | DashNode::Subshell {
            body, redirects, ..
        } => {
            out.push((body, ctx));
            scan_redirects(redirects, ctx, out);
        }
        DashNode::And { left, right }
        | DashNode::Or { left, right }
        | DashNode::Semi { left, right } => {
            out.push((left, ctx));
            out.push((right, ctx));
        }
        DashNode::Not { body } => out.push((body, ctx)),
        DashNode::If {
            cond,
            then_branch,
            else_branch,
        } => {
            out.push((cond, ctx));
            out.push((then_branch, ctx));
            if let Some(e) = else_branch {
                out.push((e, ctx));
            }
        }
        DashNode::While { test, body } | DashNode::Until { test, body } => {
            out.push((test, ctx));
            out.push((body, ctx));
        }
        DashNode::For { items, body, .. } => {
            for w in items {
                scan_word(w, ctx, out);
            }
            out.push((body, ctx));
        }
        DashNode::Case {
            subject, clauses, ..
        } => {
            scan_word(subject, ctx, out);
            for clause in clauses {
                for p in &clause.patterns {
                    scan_word(p, ctx, out);
                }
                if let Some(b) = &clause.body {
                    out.push((b, ctx));
                }
            }
        }
        DashNode::Defun { body, .. } => out.push((body, Ctx { in_function: true })),
    }
}

/// Substitution bodies embedded in a word, in decoding order.
fn scan_word<'a>(w: &'a [DashChar], ctx: Ctx, out: &mut Vec<(&'a DashNode, Ctx)>) {
    let mut frames: Vec<&'a [DashChar]> = vec![w];
    while let Some(chars) = frames.pop() {
        let Some((first, rest)) = chars.split_first() else {
            continue;
        };
        frames.push(rest);
        match first {
            DashChar::CmdSub(body) => out.push((body, ctx)),
            DashChar::Quoted(inner) | DashChar::ArithSub(inner) => frames.push(inner),
            DashChar::VarExpand { arg, .. } => frames.push(arg),
            DashChar::Literal(_) | DashChar::Escaped(_) | DashChar::Tilde(_) => {}
        }
    }
}

fn scan_redirects<'a>(
    redirects: &'a [DashRedirect],
    ctx: Ctx,
    out: &mut Vec<(&'a DashNode, Ctx)>,
) {
    for r in redirects {
        match r {
            DashRedirect::File { target, .. } | DashRedirect::Dup { target, .. } => {
                scan_word(target, ctx, out);
            }
            DashRedirect::Heredoc { body, .. } => scan_word(body, ctx, out),
        }
    }
}

fn build(node: &DashNode, ctx: Ctx, taken: &mut Taken) -> Result<Command, TranslateError> {
    Ok(match node {
        DashNode::Command {
            line,
            assignments,
            arguments,
            redirects,
        } => Command::Simple {
            line: *line,
            assignments: assignments
                .iter()
                .map(|w| split_assignment(w, *line, taken))
                .collect::<Result<Vec<_>, _>>()?,
            arguments: arguments.iter().map(|w| word(w, taken)).collect(),
            redirects: redirect_list(redirects, *line, taken)?,
        },
        DashNode::Pipe { background, items } => {
            let mut flat = Vec::new();
            for _ in items {
                flatten_stage(taken.next(), &mut flat);
            }
            Command::Pipe {
                background: *background,
                items: flat,
            }
        }
        DashNode::Redir {
            line, redirects, ..
        } => Command::Redir {
            line: *line,
            body: Box::new(taken.next()),
            redirects: redirect_list(redirects, *line, taken)?,
        },
        DashNode::Background {
            line, redirects, ..
        } => Command::Background {
            line: *line,
            body: Box::new(taken.next()),
            redirects: redirect_list(redirects, *line, taken)?,
            tail: None,
            no_braces: false,
        },
        DashNode::Subshell {
            line, redirects, ..
        } => Command::Subshell {
            line: *line,
            body: Box::new(taken.next()),
            redirects: redirect_list(redirects, *line, taken)?,
        },
        DashNode::And { .. } => Command::And {
            left: Box::new(taken.next()),
            right: Box::new(taken.next()),
            no_braces: false,
        },
        DashNode::Or { .. } => Command::Or {
            left: Box::new(taken.next()),
            right: Box::new(taken.next()),
            no_braces: false,
        },
        DashNode::Not { .. } => Command::Not {
            body: Box::new(taken.next()),
            no_braces: false,
        },
        DashNode::Semi { .. } => Command::Semi {
            left: Box::new(taken.next()),
            right: Box::new(taken.next()),
            // Function bodies keep their statements on one line.
            explicit_semicolon: ctx.in_function,
        },
        DashNode::If { else_branch, .. } => Command::If {
            cond: Box::new(taken.next()),
            then_branch: Box::new(taken.next()),
            else_branch: else_branch.as_ref().map(|_| Box::new(taken.next())),
        },
        DashNode::While { .. } => Command::While {
            test: Box::new(taken.next()),
            body: Box::new(taken.next()),
        },
        DashNode::Until { .. } => Command::While {
            test: Box::new(Command::Not {
                body: Box::new(taken.next()),
                no_braces: true,
            }),
            body: Box::new(taken.next()),
        },
        DashNode::For {
            line, var, items, ..
        } => Command::For {
            line: *line,
            var: var.chars().map(ArgChar::lit).collect(),
            items: items.iter().map(|w| word(w, taken)).collect(),
            body: Box::new(taken.next()),
        },
        DashNode::Case {
            line,
            subject,
            clauses,
        } => Command::Case {
            line: *line,
            subject: word(subject, taken),
            clauses: clauses
                .iter()
                .map(|c| canon::CaseClause {
                    patterns: c.patterns.iter().map(|w| word(w, taken)).collect(),
                    body: c.body.as_ref().map(|_| taken.next()),
                    fallthrough: false,
                })
                .collect(),
        },
        DashNode::Defun { line, name, .. } => Command::Defun {
            line: *line,
            name: name.chars().map(ArgChar::lit).collect(),
            body: Box::new(taken.next()),
            bash_style: false,
        },
    })
}

/// Append one translated pipeline stage, flattening nested pipes.
fn flatten_stage(stage: Command, flat: &mut Vec<Command>) {
    let mut stage = stage;
    if let Command::Pipe { items, .. } = &mut stage {
        flat.append(items);
    } else {
        flat.push(stage);
    }
}

/// Split a raw `name=value` assignment word at its first literal `=`.
fn split_assignment(
    raw: &DashWord,
    line: Option<usize>,
    taken: &mut Taken,
) -> Result<Assign, TranslateError> {
    let malformed = || TranslateError::unsupported("malformed assignment word", line);
    let mut name = String::new();
    let mut split = None;
    for (i, c) in raw.iter().enumerate() {
        match c {
            DashChar::Literal('=') => {
                split = Some(i);
                break;
            }
            DashChar::Literal(c) => name.push(*c),
            _ => return Err(malformed()),
        }
    }
    let split = split.ok_or_else(malformed)?;
    if name.is_empty() {
        return Err(malformed());
    }
    Ok(Assign {
        name,
        value: word(&raw[split + 1..], taken),
    })
}

/// Wrapper being closed once a nested word's characters run out.
enum Close {
    Quoted,
    Arith,
    Var {
        format: VarFormat,
        treat_null_as_unset: bool,
        name: String,
    },
}

/// Decode one word. Nested words are walked with an explicit frame
/// stack; each substitution slot consumes the next pre-translated body.
fn word(w: &[DashChar], taken: &mut Taken) -> Word {
    let mut levels: Vec<Word> = vec![Vec::new()];
    let mut frames: Vec<(&[DashChar], Option<Close>)> = vec![(w, None)];
    while let Some((chars, close)) = frames.pop() {
        let Some((first, rest)) = chars.split_first() else {
            let inner = levels.pop().unwrap_or_default();
            match (close, levels.last_mut()) {
                (Some(Close::Quoted), Some(parent)) => parent.push(ArgChar::Quoted(inner)),
                (Some(Close::Arith), Some(parent)) => parent.push(ArgChar::ArithSub(inner)),
                (
                    Some(Close::Var {
                        format,
                        treat_null_as_unset,
                        name,
                    }),
                    Some(parent),
                ) => parent.push(ArgChar::VarExpand {
                    format,
                    treat_null_as_unset,
                    name,
                    arg: inner,
                }),
                (None, _) | (_, None) => return inner,
            }
            continue;
        };
        frames.push((rest, close));
        match first {
            DashChar::Literal(c) => push_char(&mut levels, ArgChar::lit(*c)),
            DashChar::Escaped(c) => push_char(&mut levels, ArgChar::Escaped(*c)),
            DashChar::Tilde(user) => push_char(&mut levels, ArgChar::Tilde(user.clone())),
            DashChar::CmdSub(_) => {
                push_char(&mut levels, ArgChar::CmdSub(Box::new(taken.next())));
            }
            DashChar::Quoted(inner) => {
                frames.push((inner, Some(Close::Quoted)));
                levels.push(Vec::new());
            }
            DashChar::ArithSub(inner) => {
                frames.push((inner, Some(Close::Arith)));
                levels.push(Vec::new());
            }
            DashChar::VarExpand {
                format,
                treat_null_as_unset,
                name,
                arg,
            } => {
                frames.push((
                    arg,
                    Some(Close::Var {
                        format: *format,
                        treat_null_as_unset: *treat_null_as_unset,
                        name: name.clone(),
                    }),
                ));
                levels.push(Vec::new());
            }
        }
    }
    Vec::new()
}

fn push_char(levels: &mut Vec<Word>, ac: ArgChar) {
    if let Some(cur) = levels.last_mut() {
        cur.push(ac);
    }
}

fn redirect_list(
    redirs: &[DashRedirect],
    line: Option<usize>,
    taken: &mut Taken,
) -> Result<Vec<canon::Redirect>, TranslateError> {
    redirs.iter().map(|r| redirect(r, line, taken)).collect()
}

fn redirect(
    redir: &DashRedirect,
    line: Option<usize>,
    taken: &mut Taken,
) -> Result<canon::Redirect, TranslateError> {
    use canon::{DupRedirKind, FileRedirKind, HeredocKind, Redirect};
    Ok(match redir {
        DashRedirect::File { kind, fd, target } => Redirect::File {
            kind: match kind {
                DashFileKind::To => FileRedirKind::To,
                DashFileKind::Clobber => FileRedirKind::Clobber,
                DashFileKind::From => FileRedirKind::From,
                DashFileKind::FromTo => FileRedirKind::FromTo,
                DashFileKind::Append => FileRedirKind::Append,
            },
            fd: FdTarget::Fixed(*fd),
            arg: word(target, taken),
        },
        DashRedirect::Dup { kind, fd, target } => Redirect::Dup {
            kind: match kind {
                DashDupKind::FromFd => DupRedirKind::FromFd,
                DashDupKind::ToFd => DupRedirKind::ToFd,
            },
            fd: FdTarget::Fixed(*fd),
            target: FdTarget::Fixed(numeric_target(target, line)?),
            move_fd: false,
        },
        DashRedirect::Heredoc { kind, fd, body } => Redirect::Heredoc {
            kind: match kind {
                DashHeredocKind::Here => HeredocKind::Here,
                DashHeredocKind::XHere => HeredocKind::XHere,
            },
            fd: FdTarget::Fixed(*fd),
            body: word(body, taken),
            strip_leading_tabs: false,
            // The parser discards delimiters; the printer generates one.
            delimiter: None,
        },
    })
}

/// A duplication target must be a literal descriptor number.
fn numeric_target(target: &DashWord, line: Option<usize>) -> Result<u32, TranslateError> {
    let mut text = String::new();
    for c in target {
        match c {
            DashChar::Literal(c) if c.is_ascii_digit() => text.push(*c),
            _ => {
                return Err(TranslateError::bad_redirect("descriptor duplication", line));
            }
        }
    }
    text.parse()
        .map_err(|_| TranslateError::bad_redirect("descriptor duplication", line))
}
