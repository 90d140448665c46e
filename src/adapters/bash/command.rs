//! Bash front-end input model.
//!
//! An in-memory mirror of the bash parser's command graph: a tagged
//! command union plus word descriptors carrying raw bytes and flags.
//! Words may hold invalid UTF-8; decoding happens in the adapter.

/// Flags a word descriptor can carry. Only the ones the translation
/// consults are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordFlag {
    /// The word is a variable assignment.
    Assignment,
    /// The word was quoted in the source.
    Quoted,
}

/// Command-level flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlag {
    InvertReturn,
    TimePipeline,
    TimePosix,
}

/// A parsed word: raw bytes plus descriptor flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashWord {
    pub bytes: Vec<u8>,
    pub flags: Vec<WordFlag>,
}

impl BashWord {
    pub fn new(text: impl AsRef<[u8]>) -> Self {
        BashWord {
            bytes: text.as_ref().to_vec(),
            flags: Vec::new(),
        }
    }

    pub fn with_flags(text: impl AsRef<[u8]>, flags: Vec<WordFlag>) -> Self {
        BashWord {
            bytes: text.as_ref().to_vec(),
            flags,
        }
    }

    pub fn has_flag(&self, flag: WordFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// How two commands are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Ampersand,
    Semicolon,
    Newline,
    Pipe,
    AndAnd,
    OrOr,
}

/// The redirection instruction vocabulary of the bash parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirInstruction {
    OutputDirection,
    InputDirection,
    /// Reserved in the grammar, never produced by the parser.
    InputADirection,
    AppendingTo,
    ReadingUntil,
    ReadingString,
    DeblankReadingUntil,
    DuplicatingInput,
    DuplicatingOutput,
    DuplicatingInputWord,
    DuplicatingOutputWord,
    MoveInput,
    MoveOutput,
    MoveInputWord,
    MoveOutputWord,
    CloseThis,
    ErrAndOut,
    AppendErrAndOut,
    InputOutput,
    OutputForce,
}

/// Either side of a redirection: a descriptor number or a word. The
/// `{var}` descriptor extension puts a word on the redirector side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirectee {
    Fd(u32),
    Filename(BashWord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashRedirect {
    pub redirector: Redirectee,
    pub instruction: RedirInstruction,
    pub redirectee: Redirectee,
    /// The heredoc delimiter exactly as written, for `ReadingUntil`
    /// instructions.
    pub here_doc_eof: Option<String>,
}

/// `[[ … ]]` expression kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BashCondKind {
    And,
    Or,
    Unary,
    Binary,
    Term,
    Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashCond {
    pub line: Option<usize>,
    pub kind: BashCondKind,
    pub op: Option<BashWord>,
    pub left: Option<Box<BashCond>>,
    pub right: Option<Box<BashCond>>,
    pub flags: Vec<CommandFlag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashCaseClause {
    pub patterns: Vec<BashWord>,
    pub body: Option<Box<BashCommand>>,
    pub fallthrough: bool,
}

/// One parsed command: the kind-specific payload plus the flags and
/// redirections bash attaches at the command level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BashCommand {
    pub line: Option<usize>,
    pub flags: Vec<CommandFlag>,
    pub redirects: Vec<BashRedirect>,
    pub kind: BashCommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BashCommandKind {
    /// Assignment words are mixed into `words` and marked by flag.
    Simple { words: Vec<BashWord> },
    Connection {
        connector: ConnectionType,
        left: Box<BashCommand>,
        right: Option<Box<BashCommand>>,
    },
    Subshell { body: Box<BashCommand> },
    Group { body: Box<BashCommand> },
    If {
        test: Box<BashCommand>,
        true_case: Box<BashCommand>,
        false_case: Option<Box<BashCommand>>,
    },
    While {
        test: Box<BashCommand>,
        body: Box<BashCommand>,
    },
    Until {
        test: Box<BashCommand>,
        body: Box<BashCommand>,
    },
    For {
        var: BashWord,
        map_list: Vec<BashWord>,
        body: Box<BashCommand>,
    },
    Select {
        var: BashWord,
        map_list: Vec<BashWord>,
        body: Box<BashCommand>,
    },
    Case {
        subject: BashWord,
        clauses: Vec<BashCaseClause>,
    },
    FunctionDef {
        name: BashWord,
        body: Box<BashCommand>,
    },
    Arith { exprs: Vec<BashWord> },
    Cond { expr: BashCond },
    ArithFor {
        init: Vec<BashWord>,
        test: Vec<BashWord>,
        step: Vec<BashWord>,
        body: Box<BashCommand>,
    },
    Coproc {
        name: BashWord,
        body: Box<BashCommand>,
    },
}

impl BashCommand {
    /// A bare command with no flags or redirections.
    pub fn plain(line: Option<usize>, kind: BashCommandKind) -> Self {
        BashCommand {
            line,
            flags: Vec::new(),
            redirects: Vec::new(),
            kind,
        }
    }

    pub fn has_flag(&self, flag: CommandFlag) -> bool {
        self.flags.contains(&flag)
    }
}

// Deeply nested inputs would overflow the native stack in the default
// recursive drop glue; children are detached into an explicit worklist
// first. Words are flat byte strings, so only structural children need
// detaching.
impl Drop for BashCommand {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

fn hollow() -> BashCommand {
    BashCommand::plain(None, BashCommandKind::Simple { words: Vec::new() })
}

fn detach_box(slot: &mut Box<BashCommand>, out: &mut Vec<BashCommand>) {
    out.push(std::mem::replace(slot.as_mut(), hollow()));
}

impl BashCommand {
    fn detach_children(&mut self, out: &mut Vec<BashCommand>) {
        match &mut self.kind {
            BashCommandKind::Simple { .. }
            | BashCommandKind::Arith { .. }
            | BashCommandKind::Cond { .. } => {}
            BashCommandKind::Connection { left, right, .. } => {
                detach_box(left, out);
                if let Some(r) = right.take() {
                    out.push(*r);
                }
            }
            BashCommandKind::Subshell { body }
            | BashCommandKind::Group { body }
            | BashCommandKind::FunctionDef { body, .. }
            | BashCommandKind::Coproc { body, .. }
            | BashCommandKind::For { body, .. }
            | BashCommandKind::Select { body, .. }
            | BashCommandKind::ArithFor { body, .. } => detach_box(body, out),
            BashCommandKind::If {
                test,
                true_case,
                false_case,
            } => {
                detach_box(test, out);
                detach_box(true_case, out);
                if let Some(f) = false_case.take() {
                    out.push(*f);
                }
            }
            BashCommandKind::While { test, body } | BashCommandKind::Until { test, body } => {
                detach_box(test, out);
                detach_box(body, out);
            }
            BashCommandKind::Case { clauses, .. } => {
                for clause in clauses {
                    if let Some(b) = clause.body.take() {
                        out.push(*b);
                    }
                }
            }
        }
    }
}

// `[[ … ]]` expressions nest through their own boxes and get the same
// treatment.
impl Drop for BashCond {
    fn drop(&mut self) {
        let mut pending: Vec<Box<BashCond>> = Vec::new();
        pending.extend(self.left.take());
        pending.extend(self.right.take());
        while let Some(mut expr) = pending.pop() {
            pending.extend(expr.left.take());
            pending.extend(expr.right.take());
        }
    }
}
