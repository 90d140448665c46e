//! Canonical AST Types for Shell Scripts
//!
//! This module defines the single typed tree that every front end is
//! translated into. The node vocabulary is a closed set of enums so that
//! the printer and the adapters are forced by exhaustiveness checking to
//! handle every variant.
//!
//! Architecture:
//!   front-end tree → adapter → canonical AST → printer → shell text

// =============================================================================
// WORDS & ARGUMENT CHARACTERS
// =============================================================================

/// A shell word: an ordered, flat sequence of argument characters.
/// Concatenation order is the only structure.
pub type Word = Vec<ArgChar>;

/// The atomic units composing a shell word.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgChar {
    /// A plain character, emitted verbatim (modulo the defensive mid-word
    /// `$` guard and `"`-in-quotes escaping). `verbatim` marks characters
    /// reconstructed from original source text, which must never receive
    /// the `$` guard; it does not participate in serialization.
    Literal { c: char, verbatim: bool },
    /// A character the source escaped; re-escaped on print depending on
    /// the quoting context.
    Escaped(char),
    /// `~` or `~user`.
    Tilde(Option<String>),
    /// Arithmetic substitution `$(( … ))`.
    ArithSub(Word),
    /// Parameter expansion `${name…}` / `$name`.
    VarExpand {
        format: VarFormat,
        /// `:` present: a null value is treated as unset.
        treat_null_as_unset: bool,
        name: String,
        arg: Word,
    },
    /// A double-quoted sequence.
    Quoted(Word),
    /// Command substitution `$( … )`.
    CmdSub(Box<Command>),
}

impl ArgChar {
    /// Plain literal character (subject to defensive `$` escaping).
    pub fn lit(c: char) -> Self {
        ArgChar::Literal { c, verbatim: false }
    }

    /// Literal character reconstructed from source text; printed exactly.
    pub fn raw(c: char) -> Self {
        ArgChar::Literal { c, verbatim: true }
    }
}

/// Parameter expansion operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarFormat {
    /// `${name}`
    Normal,
    /// `${name-word}`
    Minus,
    /// `${name+word}`
    Plus,
    /// `${name?word}`
    Question,
    /// `${name=word}`
    Assign,
    /// `${name%word}`
    TrimR,
    /// `${name%%word}`
    TrimRMax,
    /// `${name#word}`
    TrimL,
    /// `${name##word}`
    TrimLMax,
    /// `${#name}`
    Length,
}

impl VarFormat {
    /// The operator text between the name and the argument word.
    pub fn op_str(self) -> &'static str {
        match self {
            VarFormat::Normal => "",
            VarFormat::Minus => "-",
            VarFormat::Plus => "+",
            VarFormat::Question => "?",
            VarFormat::Assign => "=",
            VarFormat::TrimR => "%",
            VarFormat::TrimRMax => "%%",
            VarFormat::TrimL => "#",
            VarFormat::TrimLMax => "##",
            VarFormat::Length => "#",
        }
    }

    /// Stable tag used at the serialization boundary.
    pub fn tag(self) -> &'static str {
        match self {
            VarFormat::Normal => "Normal",
            VarFormat::Minus => "Minus",
            VarFormat::Plus => "Plus",
            VarFormat::Question => "Question",
            VarFormat::Assign => "Assign",
            VarFormat::TrimR => "TrimR",
            VarFormat::TrimRMax => "TrimRMax",
            VarFormat::TrimL => "TrimL",
            VarFormat::TrimLMax => "TrimLMax",
            VarFormat::Length => "Length",
        }
    }
}

/// Variable assignment `name=value`, promoted out of a simple command's
/// argument list by the adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub name: String,
    pub value: Word,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

/// A file descriptor position: either a literal number or a variable-named
/// descriptor (the `{var}>…` extension).
#[derive(Debug, Clone, PartialEq)]
pub enum FdTarget {
    Fixed(u32),
    Named(Word),
}

/// File redirection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRedirKind {
    /// `>`
    To,
    /// `>|`
    Clobber,
    /// `<`
    From,
    /// `<>`
    FromTo,
    /// `>>`
    Append,
    /// `<<<`
    ReadingString,
}

/// Descriptor duplication direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupRedirKind {
    /// `<&`
    FromFd,
    /// `>&`
    ToFd,
}

/// Whether a heredoc body undergoes expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeredocKind {
    /// Quoted delimiter: body taken literally.
    Here,
    /// Unquoted delimiter: body is expanded.
    XHere,
}

/// Redirections rendered from the descriptor alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleArgRedirKind {
    /// `>&-`
    CloseThis,
    /// `&>`
    ErrAndOut,
    /// `&>>`
    AppendErrAndOut,
}

/// One redirection attached to a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Redirect {
    File {
        kind: FileRedirKind,
        fd: FdTarget,
        arg: Word,
    },
    Dup {
        kind: DupRedirKind,
        fd: FdTarget,
        target: FdTarget,
        /// `>&n-` moves rather than copies the descriptor.
        move_fd: bool,
    },
    Heredoc {
        kind: HeredocKind,
        fd: FdTarget,
        body: Word,
        /// `<<-`: leading tabs stripped from body lines.
        strip_leading_tabs: bool,
        /// Delimiter as written in the source; `None` when the front end
        /// dropped it and the printer must generate a fresh marker.
        delimiter: Option<String>,
    },
    SingleArg {
        kind: SingleArgRedirKind,
        fd: FdTarget,
    },
}

impl Redirect {
    pub fn is_heredoc(&self) -> bool {
        matches!(self, Redirect::Heredoc { .. })
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// One `case` clause: patterns, optional body, and whether it falls
/// through (`;&`) into the next clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub patterns: Vec<Word>,
    pub body: Option<Command>,
    pub fallthrough: bool,
}

/// Conditional-expression operators inside `[[ … ]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondKind {
    And,
    Or,
    Unary,
    Binary,
    Term,
    Expr,
}

/// A `[[ … ]]` conditional expression tree (bash dialect only).
#[derive(Debug, Clone, PartialEq)]
pub struct CondExpr {
    pub line: Option<usize>,
    pub kind: CondKind,
    pub op: Option<Word>,
    pub left: Option<Box<CondExpr>>,
    pub right: Option<Box<CondExpr>>,
    pub negate: bool,
}

/// The command node union. Nodes are immutable; ownership is strictly
/// hierarchical. Variants past `Group` are bash-dialect only and are never
/// produced by the POSIX front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `a | b | c`, always flattened: items are the pipeline stages in
    /// execution order, never nested pipes.
    Pipe {
        background: bool,
        items: Vec<Command>,
    },
    /// A simple command: assignments, argument words, redirections.
    Simple {
        line: Option<usize>,
        assignments: Vec<Assign>,
        arguments: Vec<Word>,
        redirects: Vec<Redirect>,
    },
    /// `( … )`
    Subshell {
        line: Option<usize>,
        body: Box<Command>,
        redirects: Vec<Redirect>,
    },
    /// `left && right`. `no_braces` records that the source grammar
    /// already guarantees unambiguous grouping, so the printer must not
    /// brace the operands.
    And {
        left: Box<Command>,
        right: Box<Command>,
        no_braces: bool,
    },
    /// `left || right`
    Or {
        left: Box<Command>,
        right: Box<Command>,
        no_braces: bool,
    },
    /// Sequencing. An explicit source `;` renders as `a ; b`; otherwise
    /// the operands are newline-joined and right-leaning chains flatten.
    Semi {
        left: Box<Command>,
        right: Box<Command>,
        explicit_semicolon: bool,
    },
    /// `! body`
    Not {
        body: Box<Command>,
        no_braces: bool,
    },
    /// A command with redirections that the front end did not attach to a
    /// more specific construct.
    Redir {
        line: Option<usize>,
        body: Box<Command>,
        redirects: Vec<Redirect>,
    },
    /// `body &`, optionally chained: `cmd1 & cmd2` keeps `cmd2` in `tail`.
    Background {
        line: Option<usize>,
        body: Box<Command>,
        redirects: Vec<Redirect>,
        tail: Option<Box<Command>>,
        no_braces: bool,
    },
    /// Function definition. `bash_style` prints the `function` keyword.
    Defun {
        line: Option<usize>,
        name: Word,
        body: Box<Command>,
        bash_style: bool,
    },
    /// `for var in items; do body; done`
    For {
        line: Option<usize>,
        var: Word,
        items: Vec<Word>,
        body: Box<Command>,
    },
    /// `while test; do body; done`. An `until` loop is represented as
    /// `While { test: Not { … } }` and prints back as `until`.
    While {
        test: Box<Command>,
        body: Box<Command>,
    },
    /// `if cond; then …; fi` with optional else/elif chain.
    If {
        cond: Box<Command>,
        then_branch: Box<Command>,
        else_branch: Option<Box<Command>>,
    },
    /// `case subject in clauses esac`
    Case {
        line: Option<usize>,
        subject: Word,
        clauses: Vec<CaseClause>,
    },
    /// `{ body; }`
    Group { body: Box<Command> },

    // ------------------------------------------------------------------
    // bash dialect only
    // ------------------------------------------------------------------
    /// `select var in items; do body; done`
    Select {
        line: Option<usize>,
        var: Word,
        items: Vec<Word>,
        body: Box<Command>,
    },
    /// `(( … ))`
    Arith { line: Option<usize>, body: Vec<Word> },
    /// `[[ … ]]`
    Cond(CondExpr),
    /// `for ((init; cond; step)); do body; done`
    ArithFor {
        line: Option<usize>,
        init: Vec<Word>,
        cond: Vec<Word>,
        step: Vec<Word>,
        body: Box<Command>,
    },
    /// `coproc [name] body`
    Coproc { name: Word, body: Box<Command> },
    /// `time [-p] body`
    Time {
        posix_format: bool,
        body: Box<Command>,
    },
}

impl Command {
    /// The empty simple command, used where a front end hands back an
    /// empty statement list.
    pub fn empty() -> Self {
        Command::Simple {
            line: None,
            assignments: Vec::new(),
            arguments: Vec::new(),
            redirects: Vec::new(),
        }
    }

    /// True for a simple command with no assignments, arguments or
    /// redirections. Empty else-branches are pruned with this.
    pub fn is_empty_simple(&self) -> bool {
        matches!(
            self,
            Command::Simple {
                assignments,
                arguments,
                redirects,
                ..
            } if assignments.is_empty() && arguments.is_empty() && redirects.is_empty()
        )
    }

    /// Fold a statement list into a right-leaning `Semi` chain.
    /// An empty list becomes the empty command.
    pub fn semi_sequence(mut items: Vec<Command>) -> Command {
        match items.len() {
            0 => Command::empty(),
            1 => items.pop().expect("len checked"),
            _ => {
                let mut acc = items.pop().expect("len checked");
                while let Some(item) = items.pop() {
                    acc = Command::Semi {
                        left: Box::new(item),
                        right: Box::new(acc),
                        explicit_semicolon: false,
                    };
                }
                acc
            }
        }
    }
}

// =============================================================================
// ITERATIVE DROP
// =============================================================================

/// Machine-generated scripts nest thousands of levels deep; the default
/// recursive drop glue would overflow the native stack on such trees, so
/// children are detached into an explicit worklist first.
impl Drop for Command {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

fn detach_box(slot: &mut Box<Command>, out: &mut Vec<Command>) {
    out.push(std::mem::replace(slot.as_mut(), Command::empty()));
}

/// Pull every command substitution out of a word, walking nested word
/// structure with an explicit stack.
fn detach_word(word: &mut Word, out: &mut Vec<Command>) {
    let mut words: Vec<Word> = vec![std::mem::take(word)];
    while let Some(w) = words.pop() {
        for ac in w {
            match ac {
                ArgChar::CmdSub(body) => out.push(*body),
                ArgChar::Quoted(inner) | ArgChar::ArithSub(inner) => words.push(inner),
                ArgChar::VarExpand { arg, .. } => words.push(arg),
                ArgChar::Literal { .. } | ArgChar::Escaped(_) | ArgChar::Tilde(_) => {}
            }
        }
    }
}

fn detach_fd(fd: &mut FdTarget, out: &mut Vec<Command>) {
    if let FdTarget::Named(word) = fd {
        detach_word(word, out);
    }
}

fn detach_redirects(redirects: &mut [Redirect], out: &mut Vec<Command>) {
    for redirect in redirects {
        match redirect {
            Redirect::File { fd, arg, .. } => {
                detach_fd(fd, out);
                detach_word(arg, out);
            }
            Redirect::Dup { fd, target, .. } => {
                detach_fd(fd, out);
                detach_fd(target, out);
            }
            Redirect::Heredoc { fd, body, .. } => {
                detach_fd(fd, out);
                detach_word(body, out);
            }
            Redirect::SingleArg { fd, .. } => detach_fd(fd, out),
        }
    }
}

fn detach_cond(expr: &mut CondExpr, out: &mut Vec<Command>) {
    let mut exprs: Vec<Box<CondExpr>> = Vec::new();
    if let Some(w) = expr.op.as_mut() {
        detach_word(w, out);
    }
    exprs.extend(expr.left.take());
    exprs.extend(expr.right.take());
    while let Some(mut e) = exprs.pop() {
        if let Some(w) = e.op.as_mut() {
            detach_word(w, out);
        }
        exprs.extend(e.left.take());
        exprs.extend(e.right.take());
    }
}

impl Command {
    /// Move every owned child command into `out`, leaving shallow leaves
    /// behind so the remaining drop glue cannot recurse.
    fn detach_children(&mut self, out: &mut Vec<Command>) {
        match self {
            Command::Pipe { items, .. } => out.append(items),
            Command::Simple {
                assignments,
                arguments,
                redirects,
                ..
            } => {
                for assign in assignments {
                    detach_word(&mut assign.value, out);
                }
                for word in arguments {
                    detach_word(word, out);
                }
                detach_redirects(redirects, out);
            }
            Command::Subshell {
                body, redirects, ..
            }
            | Command::Redir {
                body, redirects, ..
            } => {
                detach_box(body, out);
                detach_redirects(redirects, out);
            }
            Command::And { left, right, .. }
            | Command::Or { left, right, .. }
            | Command::Semi { left, right, .. } => {
                detach_box(left, out);
                detach_box(right, out);
            }
            Command::Not { body, .. }
            | Command::Group { body }
            | Command::Time { body, .. } => detach_box(body, out),
            Command::Background {
                body,
                redirects,
                tail,
                ..
            } => {
                detach_box(body, out);
                detach_redirects(redirects, out);
                if let Some(tail) = tail.take() {
                    out.push(*tail);
                }
            }
            Command::Defun { name, body, .. } => {
                detach_word(name, out);
                detach_box(body, out);
            }
            Command::For {
                var, items, body, ..
            }
            | Command::Select {
                var, items, body, ..
            } => {
                detach_word(var, out);
                for word in items {
                    detach_word(word, out);
                }
                detach_box(body, out);
            }
            Command::While { test, body } => {
                detach_box(test, out);
                detach_box(body, out);
            }
            Command::If {
                cond,
                then_branch,
                else_branch,
            } => {
                detach_box(cond, out);
                detach_box(then_branch, out);
                if let Some(e) = else_branch.take() {
                    out.push(*e);
                }
            }
            Command::Case {
                subject, clauses, ..
            } => {
                detach_word(subject, out);
                for clause in clauses {
                    for pattern in &mut clause.patterns {
                        detach_word(pattern, out);
                    }
                    if let Some(body) = clause.body.take() {
                        out.push(body);
                    }
                }
            }
            Command::Arith { body, .. } => {
                for word in body {
                    detach_word(word, out);
                }
            }
            Command::Cond(expr) => detach_cond(expr, out),
            Command::ArithFor {
                init,
                cond,
                step,
                body,
                ..
            } => {
                for word in init.iter_mut().chain(cond.iter_mut()).chain(step.iter_mut()) {
                    detach_word(word, out);
                }
                detach_box(body, out);
            }
            Command::Coproc { name, body } => {
                detach_word(name, out);
                detach_box(body, out);
            }
        }
    }
}
