//! The Unparser
//!
//! Renders a canonical tree back into shell source text. The walk is
//! driven by an explicit task stack instead of call-stack recursion, so
//! pathologically nested trees (thousands of levels) cannot overflow the
//! native stack. Heredoc bodies and named descriptors are rendered by a
//! nested printer instance when their text is needed up front (marker
//! generation).
//!
//! The printer is total: every well-formed tree renders, and every match
//! below is exhaustive so new node variants become compile errors here
//! rather than runtime failures.

pub mod heredoc;
pub mod quoting;

use crate::ast::types::*;
use heredoc::{deferred_heredocs, fresh_marker};
use quoting::{push_escaped, push_literal, QuoteMode};

/// Positional context for a command being printed.
#[derive(Debug, Clone, Copy)]
struct Ctx {
    /// Statement position: `Semi` chains newline-join and flatten instead
    /// of bracing their operands.
    stmt: bool,
    /// Heredoc redirections are being deferred by an enclosing connective;
    /// suppress them here.
    ignore_heredocs: bool,
}

impl Ctx {
    const STMT: Ctx = Ctx {
        stmt: true,
        ignore_heredocs: false,
    };
    const OPERAND: Ctx = Ctx {
        stmt: false,
        ignore_heredocs: false,
    };

    fn suppressing_heredocs(self) -> Ctx {
        Ctx {
            ignore_heredocs: true,
            ..self
        }
    }
}

enum Task<'a> {
    Str(&'static str),
    Text(String),
    Cmd { node: &'a Command, ctx: Ctx },
    Cond { expr: &'a CondExpr, brackets: bool },
    Word { word: &'a [ArgChar], mode: QuoteMode },
    /// Words joined by a separator.
    Words {
        words: &'a [Word],
        mode: QuoteMode,
        sep: &'static str,
    },
    Redirs {
        redirs: &'a [Redirect],
        ignore_heredocs: bool,
        /// Separator before the first redirect; false when the command
        /// printed nothing in front of it.
        lead: bool,
    },
    Redirect(&'a Redirect),
    /// `$(` emitted; remember where the body starts.
    CmdSubOpen,
    /// Close a command substitution, space-padding a body that starts
    /// with `(` so `$((` cannot re-parse as arithmetic.
    CmdSubClose,
}

/// Render a command in statement position.
pub fn pretty(cmd: &Command) -> String {
    let mut p = Printer::new();
    p.tasks.push(Task::Cmd {
        node: cmd,
        ctx: Ctx::STMT,
    });
    p.run()
}

/// Render one word in the given quoting context.
pub(crate) fn render_word(word: &[ArgChar], mode: QuoteMode) -> String {
    let mut p = Printer::new();
    p.tasks.push(Task::Word { word, mode });
    p.run()
}

impl Command {
    /// Render this node back to shell syntax.
    pub fn pretty(&self) -> String {
        pretty(self)
    }
}

/// `{word}` for named descriptors, the bare number for fixed ones;
/// a fixed descriptor equal to the kind's default is omitted.
fn fd_text(fd: &FdTarget, default: Option<u32>) -> String {
    match fd {
        FdTarget::Fixed(n) => {
            if default == Some(*n) {
                String::new()
            } else {
                n.to_string()
            }
        }
        FdTarget::Named(word) => format!("{{{}}}", render_word(word, QuoteMode::Unquoted)),
    }
}

/// A duplication target: bare number or bare word.
fn dup_target_text(target: &FdTarget) -> String {
    match target {
        FdTarget::Fixed(n) => n.to_string(),
        FdTarget::Named(word) => render_word(word, QuoteMode::Unquoted),
    }
}

/// Header line text and body text (body plus terminating marker) for one
/// heredoc redirection.
fn heredoc_parts(redir: &Redirect) -> (String, String) {
    let (kind, fd, body, strip, delimiter) = match redir {
        Redirect::Heredoc {
            kind,
            fd,
            body,
            strip_leading_tabs,
            delimiter,
        } => (kind, fd, body, *strip_leading_tabs, delimiter),
        _ => return (String::new(), String::new()),
    };
    let body_text = render_word(body, QuoteMode::Heredoc);
    let marker = delimiter
        .clone()
        .unwrap_or_else(|| fresh_marker(&body_text));
    let mut header = fd_text(fd, Some(0));
    header.push_str("<<");
    if strip {
        header.push('-');
    }
    match kind {
        // Quoted marker: the body is taken literally.
        HeredocKind::Here => {
            header.push('\'');
            header.push_str(&marker);
            header.push('\'');
        }
        HeredocKind::XHere => header.push_str(&marker),
    }
    let mut body_out = body_text;
    body_out.push_str(&marker);
    body_out.push('\n');
    (header, body_out)
}

struct Printer<'a> {
    out: String,
    tasks: Vec<Task<'a>>,
    /// Start offsets of open command substitutions.
    marks: Vec<usize>,
}

impl<'a> Printer<'a> {
    fn new() -> Self {
        Printer {
            out: String::new(),
            tasks: Vec::new(),
            marks: Vec::new(),
        }
    }

    fn run(mut self) -> String {
        while let Some(task) = self.tasks.pop() {
            self.step(task);
        }
        self.out
    }

    /// Queue tasks so they execute in the order given.
    fn enqueue(&mut self, items: Vec<Task<'a>>) {
        self.tasks.extend(items.into_iter().rev());
    }

    fn step(&mut self, task: Task<'a>) {
        match task {
            Task::Str(s) => self.out.push_str(s),
            Task::Text(s) => self.out.push_str(&s),
            Task::Cmd { node, ctx } => self.command(node, ctx),
            Task::Cond { expr, brackets } => self.cond(expr, brackets),
            Task::Word { word, mode } => self.word(word, mode),
            Task::Words { words, mode, sep } => {
                let mut items = Vec::new();
                for (i, w) in words.iter().enumerate() {
                    if i > 0 {
                        items.push(Task::Str(sep));
                    }
                    items.push(Task::Word { word: w, mode });
                }
                self.enqueue(items);
            }
            Task::Redirs {
                redirs,
                ignore_heredocs,
                lead,
            } => {
                let mut items = Vec::new();
                let mut sep = lead;
                for r in redirs {
                    if ignore_heredocs && r.is_heredoc() {
                        continue;
                    }
                    if sep {
                        items.push(Task::Str(" "));
                    }
                    sep = true;
                    items.push(Task::Redirect(r));
                }
                self.enqueue(items);
            }
            Task::Redirect(redir) => self.redirect(redir),
            Task::CmdSubOpen => {
                self.out.push_str("$(");
                self.marks.push(self.out.len());
            }
            Task::CmdSubClose => {
                let start = self.marks.pop().unwrap_or(self.out.len());
                let body = &self.out[start..];
                if body.starts_with('(') && body.ends_with(')') {
                    self.out.insert(start, ' ');
                    self.out.push(' ');
                }
                self.out.push(')');
            }
        }
    }

    // -------------------------------------------------------------------
    // words
    // -------------------------------------------------------------------

    fn word(&mut self, word: &'a [ArgChar], mode: QuoteMode) {
        let mut items: Vec<Task<'a>> = Vec::new();
        let mut pending = String::new();
        let last = word.len().saturating_sub(1);
        for (i, ac) in word.iter().enumerate() {
            match ac {
                ArgChar::Literal { c, verbatim } => {
                    let guard = !verbatim && *c == '$' && i < last;
                    push_literal(&mut pending, *c, mode, guard);
                }
                ArgChar::Escaped(c) => push_escaped(&mut pending, *c, mode),
                ArgChar::Tilde(user) => {
                    pending.push('~');
                    if let Some(u) = user {
                        pending.push_str(u);
                    }
                }
                ArgChar::ArithSub(expr) => {
                    if !pending.is_empty() {
                        items.push(Task::Text(std::mem::take(&mut pending)));
                    }
                    items.push(Task::Str("$(("));
                    items.push(Task::Word { word: expr, mode });
                    items.push(Task::Str("))"));
                }
                ArgChar::VarExpand {
                    format,
                    treat_null_as_unset,
                    name,
                    arg,
                } => {
                    if !pending.is_empty() {
                        items.push(Task::Text(std::mem::take(&mut pending)));
                    }
                    if *format == VarFormat::Length {
                        items.push(Task::Text(format!("${{#{}}}", name)));
                    } else {
                        let mut head = String::from("${");
                        head.push_str(name);
                        if *treat_null_as_unset {
                            head.push(':');
                        }
                        head.push_str(format.op_str());
                        items.push(Task::Text(head));
                        items.push(Task::Word { word: arg, mode });
                        items.push(Task::Str("}"));
                    }
                }
                ArgChar::Quoted(inner) => {
                    if !pending.is_empty() {
                        items.push(Task::Text(std::mem::take(&mut pending)));
                    }
                    items.push(Task::Str("\""));
                    items.push(Task::Word {
                        word: inner,
                        mode: QuoteMode::Quoted,
                    });
                    items.push(Task::Str("\""));
                }
                ArgChar::CmdSub(body) => {
                    if !pending.is_empty() {
                        items.push(Task::Text(std::mem::take(&mut pending)));
                    }
                    items.push(Task::CmdSubOpen);
                    items.push(Task::Cmd {
                        node: body,
                        ctx: Ctx::STMT,
                    });
                    items.push(Task::CmdSubClose);
                }
            }
        }
        if !pending.is_empty() {
            items.push(Task::Text(pending));
        }
        self.enqueue(items);
    }

    // -------------------------------------------------------------------
    // redirections
    // -------------------------------------------------------------------

    fn redirect(&mut self, redir: &'a Redirect) {
        let mut items: Vec<Task<'a>> = Vec::new();
        match redir {
            Redirect::File { kind, fd, arg } => {
                let (op, default) = match kind {
                    FileRedirKind::To => ("> ", 1),
                    FileRedirKind::Clobber => (">| ", 1),
                    FileRedirKind::Append => (">> ", 1),
                    FileRedirKind::From => ("< ", 0),
                    FileRedirKind::FromTo => ("<> ", 0),
                    FileRedirKind::ReadingString => ("<<< ", 0),
                };
                items.push(Task::Text(fd_text(fd, Some(default))));
                items.push(Task::Str(op));
                items.push(Task::Word {
                    word: arg,
                    mode: QuoteMode::Unquoted,
                });
            }
            Redirect::Dup {
                kind,
                fd,
                target,
                move_fd,
            } => {
                let (op, default) = match kind {
                    DupRedirKind::FromFd => ("<&", 0),
                    DupRedirKind::ToFd => (">&", 1),
                };
                let mut text = fd_text(fd, Some(default));
                text.push_str(op);
                text.push_str(&dup_target_text(target));
                if *move_fd {
                    text.push('-');
                }
                items.push(Task::Text(text));
            }
            Redirect::Heredoc { .. } => {
                // Inline form: only correct at the end of a logical line;
                // connectives defer bodies themselves.
                let (header, body) = heredoc_parts(redir);
                items.push(Task::Text(format!("{}\n{}", header, body)));
            }
            Redirect::SingleArg { kind, fd } => match kind {
                SingleArgRedirKind::CloseThis => {
                    items.push(Task::Text(format!("{}>&-", fd_text(fd, None))));
                }
                SingleArgRedirKind::ErrAndOut => {
                    items.push(Task::Text(format!("&> {}", dup_target_text(fd))));
                }
                SingleArgRedirKind::AppendErrAndOut => {
                    items.push(Task::Text(format!("&>> {}", dup_target_text(fd))));
                }
            },
        }
        self.enqueue(items);
    }

    // -------------------------------------------------------------------
    // commands
    // -------------------------------------------------------------------

    /// `{ node ; }`
    fn braced(items: &mut Vec<Task<'a>>, node: &'a Command) {
        items.push(Task::Str("{ "));
        items.push(Task::Cmd {
            node,
            ctx: Ctx::OPERAND,
        });
        items.push(Task::Str(" ; }"));
    }

    /// The heredoc redirections an enclosing construct must defer: those
    /// of a simple-command operand, or of the first stage of a pipeline
    /// operand, sitting before the construct's operator.
    fn operand_heredocs(node: &'a Command) -> Vec<&'a Redirect> {
        match node {
            Command::Simple { redirects, .. } => deferred_heredocs(redirects),
            Command::Pipe { items, .. } => items
                .first()
                .map(Self::operand_heredocs)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Print an operand whose heredoc bodies the caller appends after the
    /// current line. A simple command needs its headers emitted here; a
    /// pipeline keeps them inline after its first stage itself.
    fn deferred_operand(items: &mut Vec<Task<'a>>, node: &'a Command) -> Vec<(String, String)> {
        let parts: Vec<(String, String)> = Self::operand_heredocs(node)
            .iter()
            .map(|r| heredoc_parts(r))
            .collect();
        items.push(Task::Cmd {
            node,
            ctx: Ctx::OPERAND.suppressing_heredocs(),
        });
        if matches!(node, Command::Simple { .. }) {
            for (header, _) in &parts {
                items.push(Task::Text(format!(" {}", header)));
            }
        }
        parts
    }

    /// `left OP right` with operand bracing and heredoc deferral: headers
    /// stay on the statement line, bodies follow it in reverse order.
    fn connective(
        &mut self,
        left: &'a Command,
        right: &'a Command,
        op: &'static str,
        no_braces: bool,
    ) {
        let deferred = Self::operand_heredocs(left);
        let mut items: Vec<Task<'a>> = Vec::new();
        if deferred.is_empty() {
            if no_braces {
                items.push(Task::Cmd {
                    node: left,
                    ctx: Ctx::OPERAND,
                });
                items.push(Task::Str(" "));
                items.push(Task::Str(op));
                items.push(Task::Str(" "));
                items.push(Task::Cmd {
                    node: right,
                    ctx: Ctx::OPERAND,
                });
            } else {
                Self::braced(&mut items, left);
                items.push(Task::Str(" "));
                items.push(Task::Str(op));
                items.push(Task::Str(" "));
                Self::braced(&mut items, right);
            }
            self.enqueue(items);
            return;
        }

        let parts;
        if no_braces {
            parts = Self::deferred_operand(&mut items, left);
        } else {
            items.push(Task::Str("{ "));
            parts = Self::deferred_operand(&mut items, left);
            items.push(Task::Str(" ; }"));
        }
        items.push(Task::Str(" "));
        items.push(Task::Str(op));
        items.push(Task::Str("\n"));
        for (_, body) in parts.iter().rev() {
            items.push(Task::Text(body.clone()));
        }
        if no_braces {
            items.push(Task::Cmd {
                node: right,
                ctx: Ctx::OPERAND,
            });
        } else {
            Self::braced(&mut items, right);
        }
        self.enqueue(items);
    }

    fn command(&mut self, node: &'a Command, ctx: Ctx) {
        let mut items: Vec<Task<'a>> = Vec::new();
        match node {
            Command::Pipe { background, items: stages } => {
                let deferred = stages
                    .first()
                    .map(Self::operand_heredocs)
                    .unwrap_or_default();
                if deferred.is_empty() {
                    if *background {
                        items.push(Task::Str("{ "));
                    }
                    for (i, stage) in stages.iter().enumerate() {
                        if i > 0 {
                            items.push(Task::Str(" | "));
                        }
                        items.push(Task::Cmd {
                            node: stage,
                            ctx: Ctx::OPERAND,
                        });
                    }
                    if *background {
                        items.push(Task::Str(" & }"));
                    }
                } else {
                    let parts: Vec<(String, String)> =
                        deferred.iter().map(|r| heredoc_parts(r)).collect();
                    items.push(Task::Cmd {
                        node: &stages[0],
                        ctx: Ctx::OPERAND.suppressing_heredocs(),
                    });
                    for (header, _) in &parts {
                        items.push(Task::Text(format!(" {}", header)));
                    }
                    for stage in &stages[1..] {
                        items.push(Task::Str(" | "));
                        items.push(Task::Cmd {
                            node: stage,
                            ctx: Ctx::OPERAND,
                        });
                    }
                    if ctx.ignore_heredocs {
                        // An enclosing construct appends the bodies after
                        // its own operator.
                        if *background {
                            items.push(Task::Str(" &"));
                        }
                    } else {
                        if *background {
                            items.push(Task::Str(" &"));
                        }
                        items.push(Task::Str("\n"));
                        for (_, body) in parts.iter().rev() {
                            items.push(Task::Text(body.clone()));
                        }
                    }
                }
            }
            Command::Simple {
                assignments,
                arguments,
                redirects,
                ..
            } => {
                // Nothing printed ahead of the redirections; the first one
                // must not get a leading separator.
                let bare = assignments.is_empty() && arguments.is_empty();
                for (i, assign) in assignments.iter().enumerate() {
                    if i > 0 {
                        items.push(Task::Str(" "));
                    }
                    items.push(Task::Text(format!("{}=", assign.name)));
                    items.push(Task::Word {
                        word: &assign.value,
                        mode: QuoteMode::Unquoted,
                    });
                }
                if !assignments.is_empty() && !arguments.is_empty() {
                    items.push(Task::Str(" "));
                }
                items.push(Task::Words {
                    words: arguments,
                    mode: QuoteMode::Unquoted,
                    sep: " ",
                });
                let deferred = if ctx.ignore_heredocs {
                    Vec::new()
                } else {
                    deferred_heredocs(redirects)
                };
                if deferred.is_empty() {
                    items.push(Task::Redirs {
                        redirs: redirects,
                        ignore_heredocs: ctx.ignore_heredocs,
                        lead: !bare,
                    });
                } else {
                    items.push(Task::Redirs {
                        redirs: redirects,
                        ignore_heredocs: true,
                        lead: !bare,
                    });
                    let parts: Vec<(String, String)> =
                        deferred.iter().map(|r| heredoc_parts(r)).collect();
                    let mut sep = !bare || !redirects.iter().all(Redirect::is_heredoc);
                    for (header, _) in &parts {
                        if sep {
                            items.push(Task::Text(format!(" {}", header)));
                        } else {
                            items.push(Task::Text(header.clone()));
                            sep = true;
                        }
                    }
                    items.push(Task::Str("\n"));
                    for (_, body) in parts.iter().rev() {
                        items.push(Task::Text(body.clone()));
                    }
                }
            }
            Command::Subshell {
                body, redirects, ..
            } => {
                items.push(Task::Str("( "));
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::STMT,
                });
                items.push(Task::Str(" )"));
                items.push(Task::Redirs {
                    redirs: redirects,
                    ignore_heredocs: false,
                    lead: true,
                });
            }
            Command::And {
                left,
                right,
                no_braces,
            } => {
                self.connective(left, right, "&&", *no_braces);
                return;
            }
            Command::Or {
                left,
                right,
                no_braces,
            } => {
                self.connective(left, right, "||", *no_braces);
                return;
            }
            Command::Semi {
                left,
                right,
                explicit_semicolon,
            } => {
                if *explicit_semicolon {
                    let deferred = Self::operand_heredocs(left);
                    if deferred.is_empty() {
                        items.push(Task::Cmd {
                            node: left,
                            ctx: Ctx::OPERAND,
                        });
                        items.push(Task::Str(" ; "));
                    } else {
                        // `;` stays on the header line, ahead of the bodies.
                        let parts = Self::deferred_operand(&mut items, left);
                        items.push(Task::Str(" ;\n"));
                        for (_, body) in parts.iter().rev() {
                            items.push(Task::Text(body.clone()));
                        }
                    }
                    items.push(Task::Cmd {
                        node: right,
                        ctx: Ctx::OPERAND,
                    });
                } else if ctx.stmt {
                    // N chained statements flatten to N lines.
                    items.push(Task::Cmd {
                        node: left,
                        ctx: Ctx::STMT,
                    });
                    items.push(Task::Str("\n"));
                    items.push(Task::Cmd {
                        node: right,
                        ctx: Ctx::STMT,
                    });
                } else {
                    Self::braced(&mut items, left);
                    items.push(Task::Str("\n"));
                    Self::braced(&mut items, right);
                }
            }
            Command::Not { body, no_braces } => {
                items.push(Task::Str("! "));
                if *no_braces {
                    items.push(Task::Cmd {
                        node: body,
                        ctx: Ctx::OPERAND,
                    });
                } else {
                    Self::braced(&mut items, body);
                }
            }
            Command::Redir {
                body, redirects, ..
            } => {
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::OPERAND,
                });
                items.push(Task::Redirs {
                    redirs: redirects,
                    ignore_heredocs: false,
                    lead: true,
                });
            }
            Command::Background {
                body,
                redirects,
                tail,
                no_braces,
                ..
            } => {
                let own = deferred_heredocs(redirects);
                if own.is_empty() && Self::operand_heredocs(body).is_empty() {
                    match tail {
                        None => {
                            if *no_braces {
                                items.push(Task::Cmd {
                                    node: body,
                                    ctx: Ctx::OPERAND,
                                });
                                items.push(Task::Redirs {
                                    redirs: redirects,
                                    ignore_heredocs: false,
                                    lead: true,
                                });
                                items.push(Task::Str(" &"));
                            } else {
                                items.push(Task::Str("{ "));
                                items.push(Task::Cmd {
                                    node: body,
                                    ctx: Ctx::OPERAND,
                                });
                                items.push(Task::Redirs {
                                    redirs: redirects,
                                    ignore_heredocs: false,
                                    lead: true,
                                });
                                items.push(Task::Str(" & }"));
                            }
                        }
                        Some(tail) => {
                            items.push(Task::Cmd {
                                node: body,
                                ctx: Ctx::OPERAND,
                            });
                            items.push(Task::Redirs {
                                redirs: redirects,
                                ignore_heredocs: false,
                                lead: true,
                            });
                            items.push(Task::Str(" & "));
                            items.push(Task::Cmd {
                                node: tail,
                                ctx: Ctx::STMT,
                            });
                        }
                    }
                } else {
                    // `&` must stay on the header line; the bodies follow
                    // it, then any chained statement on its own line.
                    let own_parts: Vec<(String, String)> =
                        own.iter().map(|r| heredoc_parts(r)).collect();
                    let braced = !*no_braces && tail.is_none();
                    if braced {
                        items.push(Task::Str("{ "));
                    }
                    let body_parts = Self::deferred_operand(&mut items, body);
                    items.push(Task::Redirs {
                        redirs: redirects,
                        ignore_heredocs: true,
                        lead: true,
                    });
                    for (header, _) in &own_parts {
                        items.push(Task::Text(format!(" {}", header)));
                    }
                    items.push(Task::Str(if braced { " & }" } else { " &" }));
                    items.push(Task::Str("\n"));
                    for (_, body_text) in own_parts.iter().rev() {
                        items.push(Task::Text(body_text.clone()));
                    }
                    for (_, body_text) in body_parts.iter().rev() {
                        items.push(Task::Text(body_text.clone()));
                    }
                    if let Some(tail) = tail {
                        items.push(Task::Cmd {
                            node: tail,
                            ctx: Ctx::STMT,
                        });
                    }
                }
            }
            Command::Defun {
                name,
                body,
                bash_style,
                ..
            } => {
                if *bash_style {
                    items.push(Task::Str("function "));
                }
                items.push(Task::Word {
                    word: name,
                    mode: QuoteMode::Unquoted,
                });
                items.push(Task::Str(" () {\n"));
                // The function's own braces supply the grouping.
                let inner = match body.as_ref() {
                    Command::Group { body } => body.as_ref(),
                    other => other,
                };
                items.push(Task::Cmd {
                    node: inner,
                    ctx: Ctx::STMT,
                });
                items.push(Task::Str("\n}"));
            }
            Command::For {
                var, items: words, body, ..
            } => {
                items.push(Task::Str("for "));
                items.push(Task::Word {
                    word: var,
                    mode: QuoteMode::Unquoted,
                });
                items.push(Task::Str(" in "));
                items.push(Task::Words {
                    words,
                    mode: QuoteMode::Unquoted,
                    sep: " ",
                });
                items.push(Task::Str("; do\n"));
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::STMT,
                });
                items.push(Task::Str("\ndone"));
            }
            Command::While { test, body } => {
                // An inverted test prints back as `until`.
                match test.as_ref() {
                    Command::Not { body: test, .. } => {
                        items.push(Task::Str("until "));
                        items.push(Task::Cmd {
                            node: test,
                            ctx: Ctx::STMT,
                        });
                    }
                    test => {
                        items.push(Task::Str("while "));
                        items.push(Task::Cmd {
                            node: test,
                            ctx: Ctx::STMT,
                        });
                    }
                }
                items.push(Task::Str("; do "));
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::STMT,
                });
                items.push(Task::Str("; done"));
            }
            Command::If {
                cond,
                then_branch,
                else_branch,
            } => {
                items.push(Task::Str("if "));
                items.push(Task::Cmd {
                    node: cond,
                    ctx: Ctx::STMT,
                });
                items.push(Task::Str("; then "));
                items.push(Task::Cmd {
                    node: then_branch,
                    ctx: Ctx::STMT,
                });
                match else_branch.as_deref() {
                    None => items.push(Task::Str("; fi")),
                    Some(e) if e.is_empty_simple() => items.push(Task::Str("; fi")),
                    Some(e @ Command::If { .. }) => {
                        // `elif` chaining: the nested `if` supplies `fi`.
                        items.push(Task::Str("; el"));
                        items.push(Task::Cmd {
                            node: e,
                            ctx: Ctx::OPERAND,
                        });
                    }
                    Some(e) => {
                        items.push(Task::Str("; else "));
                        items.push(Task::Cmd {
                            node: e,
                            ctx: Ctx::STMT,
                        });
                        items.push(Task::Str("; fi"));
                    }
                }
            }
            Command::Case {
                subject, clauses, ..
            } => {
                items.push(Task::Str("case "));
                items.push(Task::Word {
                    word: subject,
                    mode: QuoteMode::Unquoted,
                });
                items.push(Task::Str(" in "));
                for clause in clauses {
                    // A leading `esac` pattern must be parenthesized to
                    // keep it distinct from the terminator.
                    let first = clause
                        .patterns
                        .first()
                        .map(|p| render_word(p, QuoteMode::Unquoted))
                        .unwrap_or_default();
                    if first == "esac" {
                        items.push(Task::Str("("));
                    }
                    items.push(Task::Words {
                        words: &clause.patterns,
                        mode: QuoteMode::Unquoted,
                        sep: "|",
                    });
                    items.push(Task::Str(") "));
                    if let Some(body) = &clause.body {
                        items.push(Task::Cmd {
                            node: body,
                            ctx: Ctx::STMT,
                        });
                    }
                    items.push(Task::Str(if clause.fallthrough { ";& " } else { ";; " }));
                }
                items.push(Task::Str("esac"));
            }
            Command::Group { body } => {
                match body.as_ref() {
                    b @ Command::Semi { .. } => {
                        items.push(Task::Str("{ "));
                        items.push(Task::Cmd {
                            node: b,
                            ctx: Ctx::STMT,
                        });
                        items.push(Task::Str("; }"));
                    }
                    b => {
                        // `&`-terminated or heredoc-terminated bodies must
                        // not gain a `;` before the closing brace.
                        let bare_end = matches!(
                            b,
                            Command::Background { tail: None, .. }
                        ) || !Self::operand_heredocs(b).is_empty();
                        items.push(Task::Str("{ "));
                        items.push(Task::Cmd {
                            node: b,
                            ctx: Ctx::OPERAND,
                        });
                        items.push(Task::Str(if bare_end { " }" } else { "; }" }));
                    }
                }
            }
            Command::Select {
                var, items: words, body, ..
            } => {
                items.push(Task::Str("select "));
                items.push(Task::Word {
                    word: var,
                    mode: QuoteMode::Unquoted,
                });
                items.push(Task::Str(" in "));
                items.push(Task::Words {
                    words,
                    mode: QuoteMode::Unquoted,
                    sep: " ",
                });
                items.push(Task::Str("; do\n"));
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::STMT,
                });
                items.push(Task::Str("\ndone"));
            }
            Command::Arith { body, .. } => {
                items.push(Task::Str("(("));
                items.push(Task::Words {
                    words: body,
                    mode: QuoteMode::Unquoted,
                    sep: " ",
                });
                items.push(Task::Str("))"));
            }
            Command::Cond(expr) => {
                items.push(Task::Cond {
                    expr,
                    brackets: true,
                });
            }
            Command::ArithFor {
                init,
                cond,
                step,
                body,
                ..
            } => {
                items.push(Task::Str("for (("));
                items.push(Task::Words {
                    words: init,
                    mode: QuoteMode::Unquoted,
                    sep: " ",
                });
                items.push(Task::Str("; "));
                items.push(Task::Words {
                    words: cond,
                    mode: QuoteMode::Unquoted,
                    sep: " ",
                });
                items.push(Task::Str("; "));
                items.push(Task::Words {
                    words: step,
                    mode: QuoteMode::Unquoted,
                    sep: " ",
                });
                items.push(Task::Str(")); do "));
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::STMT,
                });
                items.push(Task::Str("; done"));
            }
            Command::Coproc { name, body } => {
                items.push(Task::Str("coproc "));
                if !matches!(body.as_ref(), Command::Simple { .. }) {
                    items.push(Task::Word {
                        word: name,
                        mode: QuoteMode::Unquoted,
                    });
                    items.push(Task::Str(" "));
                }
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::OPERAND,
                });
            }
            Command::Time {
                posix_format,
                body,
            } => {
                items.push(Task::Str(if *posix_format { "time -p " } else { "time " }));
                items.push(Task::Cmd {
                    node: body,
                    ctx: Ctx::OPERAND,
                });
            }
        }
        self.enqueue(items);
    }

    fn cond(&mut self, expr: &'a CondExpr, brackets: bool) {
        let mut items: Vec<Task<'a>> = Vec::new();
        if brackets {
            items.push(Task::Str("[[ "));
        }
        if expr.negate {
            items.push(Task::Str("! "));
        }
        let op = |items: &mut Vec<Task<'a>>| {
            if let Some(op) = &expr.op {
                items.push(Task::Word {
                    word: op,
                    mode: QuoteMode::Unquoted,
                });
            }
        };
        let side = |items: &mut Vec<Task<'a>>, side: &'a Option<Box<CondExpr>>| {
            if let Some(e) = side {
                items.push(Task::Cond {
                    expr: e,
                    brackets: false,
                });
            }
        };
        match expr.kind {
            CondKind::Expr => {
                items.push(Task::Str("( "));
                side(&mut items, &expr.left);
                items.push(Task::Str(" )"));
            }
            CondKind::And => {
                side(&mut items, &expr.left);
                items.push(Task::Str(" && "));
                side(&mut items, &expr.right);
            }
            CondKind::Or => {
                side(&mut items, &expr.left);
                items.push(Task::Str(" || "));
                side(&mut items, &expr.right);
            }
            CondKind::Unary => {
                op(&mut items);
                items.push(Task::Str(" "));
                side(&mut items, &expr.left);
            }
            CondKind::Binary => {
                side(&mut items, &expr.left);
                items.push(Task::Str(" "));
                op(&mut items);
                items.push(Task::Str(" "));
                side(&mut items, &expr.right);
            }
            CondKind::Term => op(&mut items),
        }
        if brackets {
            items.push(Task::Str(" ]]"));
        }
        self.enqueue(items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Word {
        s.chars().map(ArgChar::lit).collect()
    }

    fn simple(s: &str) -> Command {
        Command::Simple {
            line: None,
            assignments: vec![],
            arguments: s.split_whitespace().map(word).collect(),
            redirects: vec![],
        }
    }

    fn simple_with_redirs(s: &str, redirects: Vec<Redirect>) -> Command {
        match simple(s) {
            Command::Simple {
                line,
                ref assignments,
                ref arguments,
                ..
            } => Command::Simple {
                line,
                assignments: assignments.clone(),
                arguments: arguments.clone(),
                redirects,
            },
            _ => unreachable!(),
        }
    }

    fn heredoc(delim: &str, body: &str) -> Redirect {
        Redirect::Heredoc {
            kind: HeredocKind::XHere,
            fd: FdTarget::Fixed(0),
            body: word(body),
            strip_leading_tabs: false,
            delimiter: Some(delim.to_string()),
        }
    }

    #[test]
    fn simple_command_prints_its_words() {
        assert_eq!(simple("echo hi").pretty(), "echo hi");
    }

    #[test]
    fn assignments_precede_arguments() {
        let cmd = Command::Simple {
            line: None,
            assignments: vec![Assign {
                name: "FOO".into(),
                value: word("bar"),
            }],
            arguments: vec![word("echo"), word("hi")],
            redirects: vec![],
        };
        assert_eq!(cmd.pretty(), "FOO=bar echo hi");
    }

    #[test]
    fn bare_assignment_has_no_trailing_space() {
        let cmd = Command::Simple {
            line: None,
            assignments: vec![Assign {
                name: "FOO".into(),
                value: word("bar"),
            }],
            arguments: vec![],
            redirects: vec![],
        };
        assert_eq!(cmd.pretty(), "FOO=bar");
    }

    #[test]
    fn pipeline_prints_flat() {
        let cmd = Command::Pipe {
            background: false,
            items: vec![simple("a"), simple("b"), simple("c")],
        };
        assert_eq!(cmd.pretty(), "a | b | c");
    }

    #[test]
    fn background_pipeline_is_braced() {
        let cmd = Command::Pipe {
            background: true,
            items: vec![simple("a"), simple("b")],
        };
        assert_eq!(cmd.pretty(), "{ a | b & }");
    }

    #[test]
    fn semi_chain_joins_statements_with_newlines() {
        let cmd = Command::semi_sequence(vec![simple("a"), simple("b"), simple("c")]);
        assert_eq!(cmd.pretty(), "a\nb\nc");
    }

    #[test]
    fn explicit_semicolon_stays_on_one_line() {
        let cmd = Command::Semi {
            left: Box::new(simple("a")),
            right: Box::new(simple("b")),
            explicit_semicolon: true,
        };
        assert_eq!(cmd.pretty(), "a ; b");
    }

    #[test]
    fn and_braces_operands_unless_told_not_to() {
        let braced = Command::And {
            left: Box::new(simple("a")),
            right: Box::new(simple("b")),
            no_braces: false,
        };
        assert_eq!(braced.pretty(), "{ a ; } && { b ; }");
        let plain = Command::Or {
            left: Box::new(simple("a")),
            right: Box::new(simple("b")),
            no_braces: true,
        };
        assert_eq!(plain.pretty(), "a || b");
    }

    #[test]
    fn negation_prints_bang() {
        let cmd = Command::Not {
            body: Box::new(simple("true")),
            no_braces: true,
        };
        assert_eq!(cmd.pretty(), "! true");
    }

    #[test]
    fn while_loop_prints_on_one_line() {
        let cmd = Command::While {
            test: Box::new(simple("check")),
            body: Box::new(simple("work")),
        };
        assert_eq!(cmd.pretty(), "while check; do work; done");
    }

    #[test]
    fn inverted_while_prints_as_until() {
        let cmd = Command::While {
            test: Box::new(Command::Not {
                body: Box::new(simple("check")),
                no_braces: true,
            }),
            body: Box::new(simple("work")),
        };
        assert_eq!(cmd.pretty(), "until check; do work; done");
    }

    #[test]
    fn for_loop_layout() {
        let cmd = Command::For {
            line: None,
            var: word("i"),
            items: vec![word("a"), word("b")],
            body: Box::new(simple("use")),
        };
        assert_eq!(cmd.pretty(), "for i in a b; do\nuse\ndone");
    }

    #[test]
    fn nested_else_if_prints_as_elif() {
        let inner = Command::If {
            cond: Box::new(simple("c2")),
            then_branch: Box::new(simple("t2")),
            else_branch: Some(Box::new(simple("e"))),
        };
        let cmd = Command::If {
            cond: Box::new(simple("c1")),
            then_branch: Box::new(simple("t1")),
            else_branch: Some(Box::new(inner)),
        };
        assert_eq!(
            cmd.pretty(),
            "if c1; then t1; elif c2; then t2; else e; fi"
        );
    }

    #[test]
    fn empty_else_branch_is_pruned() {
        let cmd = Command::If {
            cond: Box::new(simple("c")),
            then_branch: Box::new(simple("t")),
            else_branch: Some(Box::new(Command::empty())),
        };
        assert_eq!(cmd.pretty(), "if c; then t; fi");
    }

    #[test]
    fn esac_pattern_is_parenthesized() {
        let cmd = Command::Case {
            line: None,
            subject: word("x"),
            clauses: vec![CaseClause {
                patterns: vec![word("esac")],
                body: None,
                fallthrough: false,
            }],
        };
        assert_eq!(cmd.pretty(), "case x in (esac) ;; esac");
    }

    #[test]
    fn case_clause_with_fallthrough() {
        let cmd = Command::Case {
            line: None,
            subject: word("x"),
            clauses: vec![
                CaseClause {
                    patterns: vec![word("a"), word("b")],
                    body: Some(simple("first")),
                    fallthrough: true,
                },
                CaseClause {
                    patterns: vec![word("c")],
                    body: Some(simple("second")),
                    fallthrough: false,
                },
            ],
        };
        assert_eq!(cmd.pretty(), "case x in a|b) first;& c) second;; esac");
    }

    #[test]
    fn subshell_keeps_redirections_outside_parens() {
        let cmd = Command::Subshell {
            line: None,
            body: Box::new(Command::semi_sequence(vec![simple("a"), simple("b")])),
            redirects: vec![Redirect::File {
                kind: FileRedirKind::To,
                fd: FdTarget::Fixed(1),
                arg: word("f"),
            }],
        };
        assert_eq!(cmd.pretty(), "( a\nb ) > f");
    }

    #[test]
    fn group_braces_its_body() {
        let cmd = Command::Group {
            body: Box::new(Command::semi_sequence(vec![simple("a"), simple("b")])),
        };
        assert_eq!(cmd.pretty(), "{ a\nb; }");
    }

    #[test]
    fn background_group_body_drops_the_semicolon() {
        let cmd = Command::Group {
            body: Box::new(Command::Background {
                line: None,
                body: Box::new(simple("a")),
                redirects: vec![],
                tail: None,
                no_braces: true,
            }),
        };
        assert_eq!(cmd.pretty(), "{ a & }");
    }

    #[test]
    fn function_definition_layout() {
        let cmd = Command::Defun {
            line: None,
            name: word("f"),
            body: Box::new(Command::Group {
                body: Box::new(simple("a")),
            }),
            bash_style: false,
        };
        assert_eq!(cmd.pretty(), "f () {\na\n}");
    }

    #[test]
    fn bash_style_function_keyword() {
        let cmd = Command::Defun {
            line: None,
            name: word("f"),
            body: Box::new(simple("a")),
            bash_style: true,
        };
        assert_eq!(cmd.pretty(), "function f () {\na\n}");
    }

    #[test]
    fn background_with_tail_chains() {
        let cmd = Command::Background {
            line: None,
            body: Box::new(simple("slow")),
            redirects: vec![],
            tail: Some(Box::new(simple("next"))),
            no_braces: true,
        };
        assert_eq!(cmd.pretty(), "slow & next");
    }

    #[test]
    fn background_without_tail() {
        let plain = Command::Background {
            line: None,
            body: Box::new(simple("slow")),
            redirects: vec![],
            tail: None,
            no_braces: true,
        };
        assert_eq!(plain.pretty(), "slow &");
        let braced = Command::Background {
            line: None,
            body: Box::new(simple("slow")),
            redirects: vec![],
            tail: None,
            no_braces: false,
        };
        assert_eq!(braced.pretty(), "{ slow & }");
    }

    #[test]
    fn heredoc_body_follows_the_line() {
        let cmd = simple_with_redirs("cat", vec![heredoc("EOF", "hello\n")]);
        assert_eq!(cmd.pretty(), "cat <<EOF\nhello\nEOF\n");
    }

    #[test]
    fn literal_heredoc_quotes_its_marker() {
        let r = Redirect::Heredoc {
            kind: HeredocKind::Here,
            fd: FdTarget::Fixed(0),
            body: word("hello\n"),
            strip_leading_tabs: false,
            delimiter: Some("EOF".into()),
        };
        let cmd = simple_with_redirs("cat", vec![r]);
        assert_eq!(cmd.pretty(), "cat <<'EOF'\nhello\nEOF\n");
    }

    #[test]
    fn stacked_heredoc_bodies_print_in_reverse() {
        let cmd = simple_with_redirs(
            "cat",
            vec![heredoc("A", "first\n"), heredoc("B", "second\n")],
        );
        assert_eq!(cmd.pretty(), "cat <<A <<B\nsecond\nB\nfirst\nA\n");
    }

    #[test]
    fn missing_delimiter_gets_a_fresh_marker() {
        let r = Redirect::Heredoc {
            kind: HeredocKind::XHere,
            fd: FdTarget::Fixed(0),
            body: word("EOF\n"),
            strip_leading_tabs: false,
            delimiter: None,
        };
        let cmd = simple_with_redirs("cat", vec![r]);
        assert_eq!(cmd.pretty(), "cat <<EOF1\nEOF\nEOF1\n");
    }

    #[test]
    fn tab_stripping_heredoc_uses_dash() {
        let r = Redirect::Heredoc {
            kind: HeredocKind::XHere,
            fd: FdTarget::Fixed(0),
            body: word("\thello\n"),
            strip_leading_tabs: true,
            delimiter: Some("EOF".into()),
        };
        let cmd = simple_with_redirs("cat", vec![r]);
        assert_eq!(cmd.pretty(), "cat <<-EOF\n\thello\nEOF\n");
    }

    #[test]
    fn pipeline_defers_first_stage_heredoc() {
        let cmd = Command::Pipe {
            background: false,
            items: vec![
                simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")]),
                simple("wc"),
            ],
        };
        assert_eq!(cmd.pretty(), "cat <<EOF | wc\nhi\nEOF\n");
    }

    #[test]
    fn conjunction_defers_left_heredoc() {
        let cmd = Command::And {
            left: Box::new(simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")])),
            right: Box::new(simple("b")),
            no_braces: true,
        };
        assert_eq!(cmd.pretty(), "cat <<EOF &&\nhi\nEOF\nb");
    }

    #[test]
    fn piped_heredoc_under_conjunction_keeps_operator_on_the_line() {
        let pipe = Command::Pipe {
            background: false,
            items: vec![
                simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")]),
                simple("wc"),
            ],
        };
        let cmd = Command::And {
            left: Box::new(pipe),
            right: Box::new(simple("b")),
            no_braces: true,
        };
        assert_eq!(cmd.pretty(), "cat <<EOF | wc &&\nhi\nEOF\nb");
    }

    #[test]
    fn background_heredoc_keeps_ampersand_on_the_line() {
        let plain = Command::Background {
            line: None,
            body: Box::new(simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")])),
            redirects: vec![],
            tail: None,
            no_braces: true,
        };
        assert_eq!(plain.pretty(), "cat <<EOF &\nhi\nEOF\n");
        let braced = Command::Background {
            line: None,
            body: Box::new(simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")])),
            redirects: vec![],
            tail: None,
            no_braces: false,
        };
        assert_eq!(braced.pretty(), "{ cat <<EOF & }\nhi\nEOF\n");
    }

    #[test]
    fn background_heredoc_with_tail_splits_lines() {
        let cmd = Command::Background {
            line: None,
            body: Box::new(simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")])),
            redirects: vec![],
            tail: Some(Box::new(simple("next"))),
            no_braces: true,
        };
        assert_eq!(cmd.pretty(), "cat <<EOF &\nhi\nEOF\nnext");
    }

    #[test]
    fn explicit_semicolon_defers_left_heredoc() {
        let cmd = Command::Semi {
            left: Box::new(simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")])),
            right: Box::new(simple("b")),
            explicit_semicolon: true,
        };
        assert_eq!(cmd.pretty(), "cat <<EOF ;\nhi\nEOF\nb");
    }

    #[test]
    fn bare_redirection_has_no_leading_space() {
        let file = simple_with_redirs(
            "",
            vec![Redirect::File {
                kind: FileRedirKind::To,
                fd: FdTarget::Fixed(1),
                arg: word("f"),
            }],
        );
        assert_eq!(file.pretty(), "> f");
        let hd = simple_with_redirs("", vec![heredoc("EOF", "hi\n")]);
        assert_eq!(hd.pretty(), "<<EOF\nhi\nEOF\n");
    }

    #[test]
    fn default_descriptors_are_omitted() {
        let out = simple_with_redirs(
            "a",
            vec![Redirect::File {
                kind: FileRedirKind::To,
                fd: FdTarget::Fixed(1),
                arg: word("f"),
            }],
        );
        assert_eq!(out.pretty(), "a > f");
        let err = simple_with_redirs(
            "a",
            vec![Redirect::File {
                kind: FileRedirKind::To,
                fd: FdTarget::Fixed(2),
                arg: word("f"),
            }],
        );
        assert_eq!(err.pretty(), "a 2> f");
    }

    #[test]
    fn descriptor_duplication_and_move() {
        let dup = simple_with_redirs(
            "a",
            vec![Redirect::Dup {
                kind: DupRedirKind::ToFd,
                fd: FdTarget::Fixed(2),
                target: FdTarget::Fixed(1),
                move_fd: false,
            }],
        );
        assert_eq!(dup.pretty(), "a 2>&1");
        let mv = simple_with_redirs(
            "a",
            vec![Redirect::Dup {
                kind: DupRedirKind::ToFd,
                fd: FdTarget::Fixed(2),
                target: FdTarget::Fixed(1),
                move_fd: true,
            }],
        );
        assert_eq!(mv.pretty(), "a 2>&1-");
    }

    #[test]
    fn named_descriptor_in_braces() {
        let cmd = simple_with_redirs(
            "a",
            vec![Redirect::File {
                kind: FileRedirKind::To,
                fd: FdTarget::Named(word("fd")),
                arg: word("f"),
            }],
        );
        assert_eq!(cmd.pretty(), "a {fd}> f");
    }

    #[test]
    fn close_and_combined_redirections() {
        let close = simple_with_redirs(
            "a",
            vec![Redirect::SingleArg {
                kind: SingleArgRedirKind::CloseThis,
                fd: FdTarget::Fixed(2),
            }],
        );
        assert_eq!(close.pretty(), "a 2>&-");
        let both = simple_with_redirs(
            "a",
            vec![Redirect::SingleArg {
                kind: SingleArgRedirKind::ErrAndOut,
                fd: FdTarget::Named(word("log")),
            }],
        );
        assert_eq!(both.pretty(), "a &> log");
    }

    #[test]
    fn quoted_words_keep_spaces() {
        let cmd = Command::Simple {
            line: None,
            assignments: vec![],
            arguments: vec![word("echo"), vec![ArgChar::Quoted(word("hi there"))]],
            redirects: vec![],
        };
        assert_eq!(cmd.pretty(), "echo \"hi there\"");
    }

    #[test]
    fn command_substitution_prints_inline() {
        let cmd = Command::Simple {
            line: None,
            assignments: vec![],
            arguments: vec![
                word("echo"),
                vec![ArgChar::CmdSub(Box::new(simple("pwd")))],
            ],
            redirects: vec![],
        };
        assert_eq!(cmd.pretty(), "echo $(pwd)");
    }

    #[test]
    fn subshell_substitution_is_padded() {
        let sub = Command::Subshell {
            line: None,
            body: Box::new(simple("a")),
            redirects: vec![],
        };
        let cmd = Command::Simple {
            line: None,
            assignments: vec![],
            arguments: vec![word("echo"), vec![ArgChar::CmdSub(Box::new(sub))]],
            redirects: vec![],
        };
        assert_eq!(cmd.pretty(), "echo $( ( a ) )");
    }

    #[test]
    fn parameter_expansions() {
        let plain = vec![ArgChar::VarExpand {
            format: VarFormat::Normal,
            treat_null_as_unset: false,
            name: "x".into(),
            arg: vec![],
        }];
        assert_eq!(render_word(&plain, QuoteMode::Unquoted), "${x}");
        let with_default = vec![ArgChar::VarExpand {
            format: VarFormat::Minus,
            treat_null_as_unset: true,
            name: "x".into(),
            arg: word("d"),
        }];
        assert_eq!(render_word(&with_default, QuoteMode::Unquoted), "${x:-d}");
        let length = vec![ArgChar::VarExpand {
            format: VarFormat::Length,
            treat_null_as_unset: false,
            name: "x".into(),
            arg: vec![],
        }];
        assert_eq!(render_word(&length, QuoteMode::Unquoted), "${#x}");
    }

    #[test]
    fn escaped_characters_requote() {
        let w = vec![ArgChar::lit('a'), ArgChar::Escaped('*')];
        assert_eq!(render_word(&w, QuoteMode::Unquoted), "a\\*");
        assert_eq!(render_word(&w, QuoteMode::Quoted), "a*");
    }

    #[test]
    fn mid_word_dollar_is_guarded() {
        let w = vec![ArgChar::lit('$'), ArgChar::lit('x')];
        assert_eq!(render_word(&w, QuoteMode::Unquoted), "\\$x");
        let trailing = vec![ArgChar::lit('x'), ArgChar::lit('$')];
        assert_eq!(render_word(&trailing, QuoteMode::Unquoted), "x$");
        let raw = vec![ArgChar::raw('$'), ArgChar::raw('x')];
        assert_eq!(render_word(&raw, QuoteMode::Unquoted), "$x");
    }

    #[test]
    fn arithmetic_command_and_substitution() {
        let cmd = Command::Arith {
            line: None,
            body: vec![word("x"), word("+"), word("1")],
        };
        assert_eq!(cmd.pretty(), "((x + 1))");
        let w = vec![ArgChar::ArithSub(word("1+2"))];
        assert_eq!(render_word(&w, QuoteMode::Unquoted), "$((1+2))");
    }

    #[test]
    fn conditional_expression_brackets() {
        let term = |s: &str| {
            Box::new(CondExpr {
                line: None,
                kind: CondKind::Term,
                op: Some(word(s)),
                left: None,
                right: None,
                negate: false,
            })
        };
        let cmd = Command::Cond(CondExpr {
            line: None,
            kind: CondKind::Binary,
            op: Some(word("-eq")),
            left: Some(term("1")),
            right: Some(term("2")),
            negate: false,
        });
        assert_eq!(cmd.pretty(), "[[ 1 -eq 2 ]]");
    }

    #[test]
    fn time_and_coproc_prefixes() {
        let timed = Command::Time {
            posix_format: true,
            body: Box::new(simple("a")),
        };
        assert_eq!(timed.pretty(), "time -p a");
        let co = Command::Coproc {
            name: word("NAME"),
            body: Box::new(simple("a")),
        };
        assert_eq!(co.pretty(), "coproc a");
        let named = Command::Coproc {
            name: word("NAME"),
            body: Box::new(Command::Group {
                body: Box::new(simple("a")),
            }),
        };
        assert_eq!(named.pretty(), "coproc NAME { a; }");
    }

    #[test]
    fn printing_is_deterministic() {
        let cmd = Command::Pipe {
            background: false,
            items: vec![
                simple_with_redirs("cat", vec![heredoc("EOF", "hi\n")]),
                simple("wc"),
            ],
        };
        assert_eq!(cmd.pretty(), cmd.pretty());
    }

    #[test]
    fn deeply_nested_trees_print_without_overflow() {
        let mut cmd = simple("x");
        for _ in 0..4096 {
            cmd = Command::Subshell {
                line: None,
                body: Box::new(cmd),
                redirects: vec![],
            };
        }
        let out = cmd.pretty();
        assert!(out.starts_with("( ( "));
        assert!(out.ends_with(" ) )"));
    }
}
