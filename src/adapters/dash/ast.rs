//! Dash front-end input model.
//!
//! A typed mirror of the POSIX parser's tree. Unlike the bash graph,
//! words arrive pre-decomposed into argument characters, assignments sit
//! in a dedicated list of raw `name=value` words, and heredocs keep no
//! delimiter text.

use crate::ast::types::VarFormat;

pub type DashWord = Vec<DashChar>;

/// The POSIX parser's argument-character vocabulary. Maps one-to-one
/// onto the canonical model, except that literals here are subject to
/// the printer's defensive `$` guard.
#[derive(Debug, Clone, PartialEq)]
pub enum DashChar {
    Literal(char),
    Escaped(char),
    Tilde(Option<String>),
    ArithSub(DashWord),
    VarExpand {
        format: VarFormat,
        treat_null_as_unset: bool,
        name: String,
        arg: DashWord,
    },
    Quoted(DashWord),
    CmdSub(Box<DashNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashFileKind {
    To,
    Clobber,
    From,
    FromTo,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashDupKind {
    FromFd,
    ToFd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashHeredocKind {
    /// Quoted delimiter, body taken literally.
    Here,
    /// Unquoted delimiter, body expanded.
    XHere,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashRedirect {
    File {
        kind: DashFileKind,
        fd: u32,
        target: DashWord,
    },
    /// The duplication target is a word; the grammar only admits numeric
    /// ones.
    Dup {
        kind: DashDupKind,
        fd: u32,
        target: DashWord,
    },
    Heredoc {
        kind: DashHeredocKind,
        fd: u32,
        body: DashWord,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashCaseClause {
    pub patterns: Vec<DashWord>,
    pub body: Option<Box<DashNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashNode {
    Command {
        line: Option<usize>,
        /// Raw `name=value` words.
        assignments: Vec<DashWord>,
        arguments: Vec<DashWord>,
        redirects: Vec<DashRedirect>,
    },
    Pipe {
        background: bool,
        items: Vec<DashNode>,
    },
    Redir {
        line: Option<usize>,
        body: Box<DashNode>,
        redirects: Vec<DashRedirect>,
    },
    Background {
        line: Option<usize>,
        body: Box<DashNode>,
        redirects: Vec<DashRedirect>,
    },
    Subshell {
        line: Option<usize>,
        body: Box<DashNode>,
        redirects: Vec<DashRedirect>,
    },
    And {
        left: Box<DashNode>,
        right: Box<DashNode>,
    },
    Or {
        left: Box<DashNode>,
        right: Box<DashNode>,
    },
    Not { body: Box<DashNode> },
    Semi {
        left: Box<DashNode>,
        right: Box<DashNode>,
    },
    If {
        cond: Box<DashNode>,
        then_branch: Box<DashNode>,
        else_branch: Option<Box<DashNode>>,
    },
    While {
        test: Box<DashNode>,
        body: Box<DashNode>,
    },
    Until {
        test: Box<DashNode>,
        body: Box<DashNode>,
    },
    For {
        line: Option<usize>,
        var: String,
        items: Vec<DashWord>,
        body: Box<DashNode>,
    },
    Case {
        line: Option<usize>,
        subject: DashWord,
        clauses: Vec<DashCaseClause>,
    },
    Defun {
        line: Option<usize>,
        name: String,
        body: Box<DashNode>,
    },
}

// Deeply nested inputs would overflow the native stack in the default
// recursive drop glue; children are detached into an explicit worklist
// first.
impl Drop for DashNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

fn hollow() -> DashNode {
    DashNode::Command {
        line: None,
        assignments: Vec::new(),
        arguments: Vec::new(),
        redirects: Vec::new(),
    }
}

fn detach_box(slot: &mut Box<DashNode>, out: &mut Vec<DashNode>) {
    out.push(std::mem::replace(slot.as_mut(), hollow()));
}

fn detach_word(word: &mut DashWord, out: &mut Vec<DashNode>) {
    let mut words: Vec<DashWord> = vec![std::mem::take(word)];
    while let Some(w) = words.pop() {
        for c in w {
            match c {
                DashChar::CmdSub(body) => out.push(*body),
                DashChar::Quoted(inner) | DashChar::ArithSub(inner) => words.push(inner),
                DashChar::VarExpand { arg, .. } => words.push(arg),
                DashChar::Literal(_) | DashChar::Escaped(_) | DashChar::Tilde(_) => {}
            }
        }
    }
}

fn detach_redirects(redirects: &mut [DashRedirect], out: &mut Vec<DashNode>) {
    for r in redirects {
        match r {
            DashRedirect::File { target, .. } | DashRedirect::Dup { target, .. } => {
                detach_word(target, out);
            }
            DashRedirect::Heredoc { body, .. } => detach_word(body, out),
        }
    }
}

impl DashNode {
    fn detach_children(&mut self, out: &mut Vec<DashNode>) {
        match self {
            DashNode::Command {
                assignments,
                arguments,
                redirects,
                ..
            } => {
                for w in assignments.iter_mut().chain(arguments.iter_mut()) {
                    detach_word(w, out);
                }
                detach_redirects(redirects, out);
            }
            DashNode::Pipe { items, .. } => out.append(items),
            DashNode::Redir {
                body, redirects, ..
            }
            | DashNode::Background {
                body, redirects, ..
            }
            | DashNode::Subshell {
                body, redirects, ..
            } => {
                detach_box(body, out);
                detach_redirects(redirects, out);
            }
            DashNode::And { left, right }
            | DashNode::Or { left, right }
            | DashNode::Semi { left, right } => {
                detach_box(left, out);
                detach_box(right, out);
            }
            DashNode::Not { body } => detach_box(body, out),
            DashNode::If {
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
            DashNode::While { test, body } | DashNode::Until { test, body } => {
                detach_box(test, out);
                detach_box(body, out);
            }
            DashNode::For { items, body, .. } => {
                for w in items {
                    detach_word(w, out);
                }
                detach_box(body, out);
            }
            DashNode::Case {
                subject, clauses, ..
            } => {
                detach_word(subject, out);
                for clause in clauses {
                    for p in &mut clause.patterns {
                        detach_word(p, out);
                    }
                    if let Some(b) = clause.body.take() {
                        out.push(*b);
                    }
                }
            }
            DashNode::Defun { body, .. } => detach_box(body, out),
        }
    }
}
