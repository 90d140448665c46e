//! shfmt front end: canonicalizes shfmt's `-tojson` document.
//!
//! The input is a `serde_json::Value` tree (`Type` discriminators,
//! `Pos`/`End` objects with byte offsets). An optional borrowed source
//! slice reconstructs exact literal text for the constructs the
//! canonical model does not decompose (process substitutions, extended
//! globs, brace expansions); without it a string builder renders them
//! from the JSON. Everything reconstructed to text becomes verbatim
//! literals, exempt from the printer's `$` guard.
//!
//! Statement-level structure is walked with an explicit work stack, so
//! nesting depth is bounded by the heap rather than the native call
//! stack. Word-level substitutions re-enter the walk one native frame
//! per substitution level; the JSON parser's recursion limit keeps that
//! shallow.

pub mod ops;

use serde_json::Value;

use crate::ast::types::{
    ArgChar, Assign, CaseClause, Command, DupRedirKind, FdTarget, FileRedirKind, HeredocKind,
    Redirect, SingleArgRedirKind, Word,
};
use crate::error::TranslateError;
use crate::printer::{pretty, quoting::QuoteMode, render_word};

use ops::*;

type Res<T> = Result<T, TranslateError>;

/// Translate a parsed `-tojson` document.
pub fn to_ast_nodes(doc: &Value) -> Res<Vec<Command>> {
    Translator { source: None }.nodes(doc)
}

/// Translate with the original script bytes available for exact literal
/// reconstruction.
pub fn to_ast_nodes_with_source(doc: &Value, source: &[u8]) -> Res<Vec<Command>> {
    Translator {
        source: Some(source),
    }
    .nodes(doc)
}

// =============================================================================
// JSON helpers
// =============================================================================

fn type_of(v: &Value) -> Option<&str> {
    v.get("Type").and_then(Value::as_str)
}

fn flag(v: &Value, key: &str) -> bool {
    match v.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn op_of(v: &Value) -> Option<u64> {
    v.get("Op").and_then(Value::as_u64)
}

fn line_of(v: &Value, pos_key: &str) -> Option<usize> {
    v.get(pos_key)?.get("Line")?.as_u64().map(|n| n as usize)
}

fn str_of<'v>(v: &'v Value, key: &str) -> &'v str {
    v.get(key).and_then(Value::as_str).unwrap_or("")
}

fn arr<'v>(v: &'v Value, key: &str) -> &'v [Value] {
    v.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// Reconstructed text is emitted exactly as written.
fn verbatim(text: &str) -> Word {
    text.chars().map(ArgChar::raw).collect()
}

/// The single-literal text of a word, if that is its whole shape.
fn word_lit(word: Option<&Value>) -> Option<&str> {
    let parts = word?.get("Parts")?.as_array()?;
    if parts.len() != 1 || type_of(&parts[0]) != Some("Lit") {
        return None;
    }
    parts[0].get("Value").and_then(Value::as_str)
}

fn word_is_int(word: Option<&Value>) -> bool {
    word_lit(word).map_or(false, |s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
}

fn word_has_quotes(word: Option<&Value>) -> bool {
    let parts = match word.and_then(|w| w.get("Parts")).and_then(Value::as_array) {
        Some(p) => p,
        None => return false,
    };
    parts
        .iter()
        .any(|p| matches!(type_of(p), Some("SglQuoted") | Some("DblQuoted")))
}

// =============================================================================
// translation
// =============================================================================

struct Translator<'a> {
    source: Option<&'a [u8]>,
}

/// One step of the translation walk. Visit items queue their children
/// plus a matching build item; build items assemble a canonical node
/// from the finished child translations below them. The walk carries
/// its own stacks, so nesting depth is bounded by the heap, not the
/// native call stack.
enum Work<'v> {
    /// A statement object or typed command node.
    Node(&'v Value),
    /// A typed command node.
    Cmd(&'v Value),
    /// An `IfClause` or an untyped else object of its chain.
    If(&'v Value),
    /// A `Stmts` array.
    Seq(Option<&'v Value>),
    /// Placeholder for an absent operand.
    Empty,
    BuildStmt(&'v Value),
    BuildCmd(&'v Value),
    BuildIf(&'v Value),
    BuildSeq(usize),
}

/// The statement an operand field holds, or a placeholder when absent.
fn stmt_or_empty<'v>(v: Option<&'v Value>) -> Work<'v> {
    match v {
        Some(s) if !s.is_null() => Work::Node(s),
        _ => Work::Empty,
    }
}

impl<'a> Translator<'a> {
    fn nodes(&self, doc: &Value) -> Res<Vec<Command>> {
        if type_of(doc) == Some("File") {
            return arr(doc, "Stmts").iter().map(|s| self.node(s)).collect();
        }
        if let Some(items) = doc.as_array() {
            return items.iter().map(|s| self.node(s)).collect();
        }
        Ok(vec![self.node(doc)?])
    }

    fn node(&self, v: &Value) -> Res<Command> {
        self.run(Work::Node(v))
    }

    /// Translate a `Stmts` array into one sequenced command. Word-level
    /// substitutions re-enter here, costing one native frame per
    /// substitution level; the JSON parser's own recursion limit bounds
    /// that depth long before the stack does.
    fn seq(&self, v: Option<&Value>) -> Res<Command> {
        self.run(Work::Seq(v))
    }

    fn opt_stmt(&self, v: Option<&Value>) -> Res<Command> {
        self.run(stmt_or_empty(v))
    }

    fn run<'v>(&self, start: Work<'v>) -> Res<Command> {
        let mut work = vec![start];
        let mut done: Vec<Command> = Vec::new();
        while let Some(item) = work.pop() {
            match item {
                Work::Node(v) => {
                    let looks_like_stmt = v.get("Cmd").is_some()
                        || v.get("Redirs").is_some()
                        || v.get("Background").is_some()
                        || v.get("Negated").is_some();
                    if looks_like_stmt {
                        work.push(Work::BuildStmt(v));
                        work.push(match v.get("Cmd") {
                            Some(c) if !c.is_null() => Work::Cmd(c),
                            _ => Work::Empty,
                        });
                    } else if type_of(v).is_some() {
                        work.push(Work::Cmd(v));
                    } else {
                        return Err(TranslateError::unsupported(
                            "unrecognized document node",
                            None,
                        ));
                    }
                }
                Work::Cmd(v) => self.visit_command(v, &mut work)?,
                Work::If(v) => {
                    work.push(Work::BuildIf(v));
                    if let Some(else_clause) = v.get("Else").filter(|e| !e.is_null()) {
                        if arr(else_clause, "Cond").is_empty() {
                            work.push(Work::Seq(else_clause.get("Then")));
                        } else {
                            work.push(Work::If(else_clause));
                        }
                    }
                    work.push(Work::Seq(v.get("Then")));
                    work.push(Work::Seq(v.get("Cond")));
                }
                Work::Seq(v) => {
                    let items = v
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    work.push(Work::BuildSeq(items.len()));
                    for s in items.iter().rev() {
                        work.push(Work::Node(s));
                    }
                }
                Work::Empty => done.push(Command::empty()),
                Work::BuildStmt(v) => {
                    let cmd = done.pop().unwrap_or_else(Command::empty);
                    let cmd = self.finish_stmt(v, cmd)?;
                    done.push(cmd);
                }
                Work::BuildCmd(v) => {
                    let cmd = self.finish_command(v, &mut done)?;
                    done.push(cmd);
                }
                Work::BuildIf(v) => {
                    let else_branch = match v.get("Else").filter(|e| !e.is_null()) {
                        Some(_) => done.pop(),
                        None => None,
                    };
                    let then_branch = done.pop().unwrap_or_else(Command::empty);
                    let cond = done.pop().unwrap_or_else(Command::empty);
                    // An empty else body canonicalizes away entirely.
                    done.push(Command::If {
                        cond: Box::new(cond),
                        then_branch: Box::new(then_branch),
                        else_branch: else_branch
                            .filter(|e| !e.is_empty_simple())
                            .map(Box::new),
                    });
                }
                Work::BuildSeq(n) => {
                    let items = done.split_off(done.len().saturating_sub(n));
                    done.push(Command::semi_sequence(items));
                }
            }
        }
        Ok(done.pop().unwrap_or_else(Command::empty))
    }

    /// Queue a typed command node's children and its build step, in the
    /// order `finish_command` consumes them.
    fn visit_command<'v>(&self, v: &'v Value, work: &mut Vec<Work<'v>>) -> Res<()> {
        match type_of(v) {
            Some("CallExpr") | Some("ArithmCmd") | Some("DeclClause") | Some("LetClause")
            | Some("TestClause") | Some("TestDecl") => work.push(Work::BuildCmd(v)),
            Some("IfClause") => work.push(Work::If(v)),
            Some("BinaryCmd") => {
                work.push(Work::BuildCmd(v));
                work.push(stmt_or_empty(v.get("Y")));
                work.push(stmt_or_empty(v.get("X")));
            }
            Some("WhileClause") => {
                work.push(Work::BuildCmd(v));
                work.push(Work::Seq(v.get("Do")));
                work.push(Work::Seq(v.get("Cond")));
            }
            Some("ForClause") => {
                work.push(Work::BuildCmd(v));
                work.push(Work::Seq(v.get("Do")));
            }
            Some("CaseClause") => {
                work.push(Work::BuildCmd(v));
                for item in arr(v, "Items").iter().rev() {
                    work.push(Work::Seq(item.get("Stmts")));
                }
            }
            Some("Subshell") | Some("Block") => {
                work.push(Work::BuildCmd(v));
                work.push(Work::Seq(v.get("Stmts")));
            }
            Some("FuncDecl") => {
                work.push(Work::BuildCmd(v));
                work.push(stmt_or_empty(v.get("Body")));
            }
            Some("TimeClause") | Some("CoprocClause") => {
                work.push(Work::BuildCmd(v));
                work.push(stmt_or_empty(v.get("Stmt")));
            }
            other => {
                return Err(TranslateError::unsupported(
                    format!("command node {}", other.unwrap_or("without a type")),
                    None,
                ))
            }
        }
        Ok(())
    }

    /// Wrap a translated command with its statement-level negation,
    /// backgrounding and redirections.
    fn finish_stmt(&self, v: &Value, mut cmd: Command) -> Res<Command> {
        let redirs = self.redirects(v.get("Redirs"))?;

        if flag(v, "Negated") {
            cmd = Command::Not {
                body: Box::new(cmd),
                no_braces: true,
            };
        }
        if flag(v, "Background") {
            return Ok(Command::Background {
                line: None,
                body: Box::new(cmd),
                redirects: redirs,
                tail: None,
                no_braces: true,
            });
        }
        if !redirs.is_empty() {
            // A simple command owns its redirections directly so stacked
            // heredocs defer correctly.
            if let Command::Simple { redirects, .. } = &mut cmd {
                if redirects.is_empty() {
                    *redirects = redirs;
                    return Ok(cmd);
                }
            }
            cmd = Command::Redir {
                line: None,
                body: Box::new(cmd),
                redirects: redirs,
            };
        }
        Ok(cmd)
    }

    fn finish_command(&self, v: &Value, done: &mut Vec<Command>) -> Res<Command> {
        let pop = |done: &mut Vec<Command>| done.pop().unwrap_or_else(Command::empty);
        match type_of(v) {
            Some("CallExpr") => self.call_expr(v),
            Some("BinaryCmd") => {
                let right = pop(done);
                let left = pop(done);
                self.binary_cmd(v, left, right)
            }
            Some("WhileClause") => {
                let body = pop(done);
                let mut test = pop(done);
                if flag(v, "Until") {
                    test = Command::Not {
                        body: Box::new(test),
                        no_braces: true,
                    };
                }
                Ok(Command::While {
                    test: Box::new(test),
                    body: Box::new(body),
                })
            }
            Some("ForClause") => {
                let body = pop(done);
                self.for_clause(v, body)
            }
            Some("CaseClause") => {
                let items = arr(v, "Items");
                let bodies = done.split_off(done.len().saturating_sub(items.len()));
                let mut clauses = Vec::new();
                for (item, body) in items.iter().zip(bodies) {
                    clauses.push(CaseClause {
                        patterns: arr(item, "Patterns")
                            .iter()
                            .map(|w| self.word(Some(w)))
                            .collect::<Res<Vec<_>>>()?,
                        body: Some(body),
                        fallthrough: case_fallthrough(op_of(item)),
                    });
                }
                Ok(Command::Case {
                    line: line_of(v, "Case"),
                    subject: self.word(v.get("Word"))?,
                    clauses,
                })
            }
            Some("Subshell") => Ok(Command::Subshell {
                line: line_of(v, "Lparen"),
                body: Box::new(pop(done)),
                redirects: Vec::new(),
            }),
            Some("Block") => Ok(Command::Group {
                body: Box::new(pop(done)),
            }),
            Some("FuncDecl") => Ok(Command::Defun {
                line: line_of(v, "Position"),
                name: verbatim(str_of(v.get("Name").unwrap_or(&Value::Null), "Value")),
                body: Box::new(pop(done)),
                bash_style: flag(v, "RsrvWord"),
            }),
            Some("ArithmCmd") => Ok(Command::Arith {
                line: line_of(v, "Left"),
                body: self.arith_words(v.get("X"))?,
            }),
            Some("TimeClause") => Ok(Command::Time {
                posix_format: flag(v, "PosixFormat"),
                body: Box::new(pop(done)),
            }),
            Some("CoprocClause") => Ok(Command::Coproc {
                name: self.word(v.get("Name"))?,
                body: Box::new(pop(done)),
            }),
            Some("DeclClause") => self.decl_clause(v),
            Some("LetClause") => self.let_clause(v),
            Some("TestClause") => self.test_clause(v),
            Some("TestDecl") => self.test_decl(v),
            other => Err(TranslateError::unsupported(
                format!("command node {}", other.unwrap_or("without a type")),
                None,
            )),
        }
    }

    fn call_expr(&self, v: &Value) -> Res<Command> {
        let mut assignments = Vec::new();
        let mut arguments = Vec::new();
        for assign in arr(v, "Assigns") {
            match self.assign(assign)? {
                (Some(a), None) => assignments.push(a),
                (None, Some(word)) => arguments.push(word),
                _ => {}
            }
        }
        for word in arr(v, "Args") {
            arguments.push(self.word(Some(word))?);
        }
        Ok(Command::Simple {
            line: line_of(v, "Pos"),
            assignments,
            arguments,
            redirects: Vec::new(),
        })
    }

    /// Regular `name=value` assignments promote; append, array, indexed
    /// and naked forms re-render as literal argument text.
    fn assign(&self, v: &Value) -> Res<(Option<Assign>, Option<Word>)> {
        if flag(v, "Append") || flag(v, "Array") || flag(v, "Index") || flag(v, "Naked") {
            return Ok((None, Some(verbatim(&self.assign_text(v)?))));
        }
        let name = v
            .get("Name")
            .map(|n| str_of(n, "Value").to_string())
            .unwrap_or_default();
        let value = self.word(v.get("Value"))?;
        Ok((Some(Assign { name, value }), None))
    }

    fn assign_text(&self, v: &Value) -> Res<String> {
        let name = v
            .get("Name")
            .map(|n| str_of(n, "Value").to_string())
            .unwrap_or_default();
        let joiner = if flag(v, "Append") { "+=" } else { "=" };

        if flag(v, "Naked") {
            if !name.is_empty() {
                return Ok(name);
            }
            return self.word_string(v.get("Value"));
        }

        let mut text = name;
        if let Some(index) = v.get("Index").filter(|i| !i.is_null()) {
            text.push('[');
            text.push_str(&self.arith_string(index)?);
            text.push(']');
        }
        text.push_str(joiner);
        if let Some(array) = v.get("Array").filter(|a| !a.is_null()) {
            text.push_str(&self.array_text(array)?);
        } else if v.get("Value").map_or(false, |val| !val.is_null()) {
            text.push_str(&self.word_string(v.get("Value"))?);
        }
        Ok(text)
    }

    fn array_text(&self, v: &Value) -> Res<String> {
        let mut elems = Vec::new();
        for elem in arr(v, "Elems") {
            let idx = elem.get("Index").filter(|i| !i.is_null());
            let val = elem.get("Value").filter(|w| !w.is_null());
            match (idx, val) {
                (Some(idx), Some(val)) => elems.push(format!(
                    "[{}]={}",
                    self.arith_string(idx)?,
                    self.word_string(Some(val))?
                )),
                (Some(idx), None) => elems.push(format!("[{}]=", self.arith_string(idx)?)),
                (None, Some(val)) => elems.push(self.word_string(Some(val))?),
                (None, None) => {}
            }
        }
        Ok(format!("({})", elems.join(" ")))
    }

    fn binary_cmd(&self, v: &Value, left: Command, right: Command) -> Res<Command> {
        let op = op_of(v).and_then(bin_cmd_op).ok_or_else(|| {
            TranslateError::unsupported(
                format!("binary command operator {:?}", op_of(v)),
                None,
            )
        })?;
        match op {
            BinCmdOp::And => Ok(Command::And {
                left: Box::new(left),
                right: Box::new(right),
                no_braces: true,
            }),
            BinCmdOp::Or => Ok(Command::Or {
                left: Box::new(left),
                right: Box::new(right),
                no_braces: true,
            }),
            BinCmdOp::Pipe | BinCmdOp::PipeAll => {
                let mut items = pipe_items(left);
                items.extend(pipe_items(right));
                Ok(Command::Pipe {
                    background: false,
                    items,
                })
            }
        }
    }

    fn for_clause(&self, v: &Value, body: Command) -> Res<Command> {
        let line = line_of(v, "ForPos");
        let loop_node = v
            .get("Loop")
            .filter(|l| !l.is_null())
            .ok_or_else(|| TranslateError::unsupported("for clause without a loop", line))?;
        match type_of(loop_node) {
            Some("WordIter") => {
                let var = verbatim(str_of(
                    loop_node.get("Name").unwrap_or(&Value::Null),
                    "Value",
                ));
                let items = arr(loop_node, "Items")
                    .iter()
                    .map(|w| self.word(Some(w)))
                    .collect::<Res<Vec<_>>>()?;
                if flag(v, "Select") {
                    Ok(Command::Select {
                        line,
                        var,
                        items,
                        body: Box::new(body),
                    })
                } else {
                    Ok(Command::For {
                        line,
                        var,
                        items,
                        body: Box::new(body),
                    })
                }
            }
            Some("CStyleLoop") => Ok(Command::ArithFor {
                line,
                init: self.arith_words(loop_node.get("Init"))?,
                cond: self.arith_words(loop_node.get("Cond"))?,
                step: self.arith_words(loop_node.get("Post"))?,
                body: Box::new(body),
            }),
            other => Err(TranslateError::unsupported(
                format!("for loop {}", other.unwrap_or("without a type")),
                line,
            )),
        }
    }

    fn decl_clause(&self, v: &Value) -> Res<Command> {
        let mut arguments = Vec::new();
        if let Some(variant) = v.get("Variant").filter(|x| !x.is_null()) {
            arguments.push(verbatim(str_of(variant, "Value")));
        }
        for assign in arr(v, "Args") {
            arguments.push(verbatim(&self.assign_text(assign)?));
        }
        Ok(Command::Simple {
            line: None,
            assignments: Vec::new(),
            arguments,
            redirects: Vec::new(),
        })
    }

    fn let_clause(&self, v: &Value) -> Res<Command> {
        let mut arguments = vec![verbatim("let")];
        for expr in arr(v, "Exprs") {
            arguments.push(verbatim(&self.arith_string(expr)?));
        }
        Ok(Command::Simple {
            line: None,
            assignments: Vec::new(),
            arguments,
            redirects: Vec::new(),
        })
    }

    fn test_clause(&self, v: &Value) -> Res<Command> {
        let mut arguments = vec![verbatim("[[")];
        arguments.extend(self.test_expr_words(v.get("X").unwrap_or(&Value::Null))?);
        arguments.push(verbatim("]]"));
        Ok(Command::Simple {
            line: None,
            assignments: Vec::new(),
            arguments,
            redirects: Vec::new(),
        })
    }

    fn test_expr_words(&self, expr: &Value) -> Res<Vec<Word>> {
        match type_of(expr) {
            Some("Word") => Ok(vec![self.word(Some(expr))?]),
            Some("UnaryTest") => {
                let op = op_of(expr).map(unary_test_op).unwrap_or("");
                let mut words = vec![verbatim(op)];
                words.extend(self.test_expr_words(expr.get("X").unwrap_or(&Value::Null))?);
                Ok(words)
            }
            Some("BinaryTest") => {
                let op = op_of(expr).map(binary_test_op).unwrap_or("");
                let mut words = self.test_expr_words(expr.get("X").unwrap_or(&Value::Null))?;
                words.push(verbatim(op));
                words.extend(self.test_expr_words(expr.get("Y").unwrap_or(&Value::Null))?);
                Ok(words)
            }
            Some("ParenTest") => {
                let mut words = vec![verbatim("(")];
                words.extend(self.test_expr_words(expr.get("X").unwrap_or(&Value::Null))?);
                words.push(verbatim(")"));
                Ok(words)
            }
            other => Err(TranslateError::unsupported(
                format!("test expression {}", other.unwrap_or("without a type")),
                None,
            )),
        }
    }

    fn test_decl(&self, v: &Value) -> Res<Command> {
        let description = self.word_string(v.get("Description"))?;
        let body = self.opt_stmt(v.get("Body"))?;
        let mut body_text = pretty(&body);
        if !matches!(body, Command::Group { .. }) {
            body_text = format!("{{ {} ; }}", body_text);
        }
        Ok(Command::Simple {
            line: line_of(v, "Position"),
            assignments: Vec::new(),
            arguments: vec![verbatim(&format!("@test {} {}", description, body_text))],
            redirects: Vec::new(),
        })
    }

    // -------------------------------------------------------------------
    // words
    // -------------------------------------------------------------------

    fn word(&self, v: Option<&Value>) -> Res<Word> {
        let word = match v {
            Some(w) if !w.is_null() => w,
            _ => return Ok(Vec::new()),
        };
        let mut out = Vec::new();
        for part in arr(word, "Parts") {
            out.extend(self.word_part(part)?);
        }
        Ok(out)
    }

    fn word_part(&self, part: &Value) -> Res<Word> {
        match type_of(part) {
            Some("Lit") => Ok(verbatim(str_of(part, "Value"))),
            Some("SglQuoted") => Ok(vec![ArgChar::Quoted(verbatim(str_of(part, "Value")))]),
            Some("DblQuoted") => {
                let mut inner = Vec::new();
                for p in arr(part, "Parts") {
                    inner.extend(self.word_part(p)?);
                }
                Ok(vec![ArgChar::Quoted(inner)])
            }
            Some("ParamExp") => Ok(verbatim(&self.param_exp_string(part)?)),
            Some("CmdSubst") => Ok(vec![ArgChar::CmdSub(Box::new(
                self.seq(part.get("Stmts"))?,
            ))]),
            Some("ArithmExp") => Ok(vec![ArgChar::ArithSub(verbatim(
                &self.arith_string(part.get("X").unwrap_or(&Value::Null))?,
            ))]),
            Some("ProcSubst") => {
                let text = match self.source_slice(part) {
                    Some(text) => text,
                    None => self.proc_subst_string(part)?,
                };
                Ok(verbatim(&text))
            }
            Some("ExtGlob") => {
                let text = match self.source_slice(part) {
                    Some(text) => text,
                    None => extglob_string(part),
                };
                Ok(verbatim(&text))
            }
            Some("BraceExp") => {
                let text = match self.source_slice(part) {
                    Some(text) => text,
                    None => self.brace_exp_string(part)?,
                };
                Ok(verbatim(&text))
            }
            other => Err(TranslateError::unsupported(
                format!("word part {}", other.unwrap_or("without a type")),
                None,
            )),
        }
    }

    /// Exact source text between a node's byte offsets, when available.
    fn source_slice(&self, v: &Value) -> Option<String> {
        let source = self.source?;
        let start = v.get("Pos")?.get("Offset")?.as_u64()? as usize;
        let end = v.get("End")?.get("Offset")?.as_u64()? as usize;
        if start > end || end > source.len() {
            return None;
        }
        Some(String::from_utf8_lossy(&source[start..end]).into_owned())
    }

    fn word_string(&self, v: Option<&Value>) -> Res<String> {
        Ok(render_word(&self.word(v)?, QuoteMode::Unquoted))
    }

    fn param_exp_string(&self, v: &Value) -> Res<String> {
        let name = match v.get("Param").filter(|p| !p.is_null()) {
            Some(param) => str_of(param, "Value").to_string(),
            None => match v.get("NestedParam").filter(|p| !p.is_null()) {
                Some(nested) if type_of(nested) == Some("ParamExp") => {
                    self.param_exp_string(nested)?
                }
                Some(nested) if type_of(nested) == Some("CmdSubst") => {
                    format!("$({})", pretty(&self.seq(nested.get("Stmts"))?))
                }
                _ => String::new(),
            },
        };

        let has_index = v.get("Index").map_or(false, |i| !i.is_null());
        if flag(v, "Short") && !has_index {
            return Ok(format!("${}", name));
        }
        if flag(v, "Length") {
            return Ok(format!("${{#{}}}", name));
        }

        let mut buf = String::from("${");
        if flag(v, "Excl") {
            buf.push('!');
        }
        if let Some(flags) = v.get("Flags").filter(|f| !f.is_null()) {
            buf.push('(');
            buf.push_str(str_of(flags, "Value"));
            buf.push(')');
        }
        buf.push_str(&name);
        if let Some(index) = v.get("Index").filter(|i| !i.is_null()) {
            buf.push('[');
            buf.push_str(&self.arith_string(index)?);
            buf.push(']');
        }
        if let Some(slice) = v.get("Slice").filter(|s| !s.is_null()) {
            buf.push(':');
            buf.push_str(&self.arith_string(slice.get("Offset").unwrap_or(&Value::Null))?);
            if let Some(len) = slice.get("Length").filter(|l| !l.is_null()) {
                buf.push(':');
                buf.push_str(&self.arith_string(len)?);
            }
        }
        if let Some(repl) = v.get("Repl").filter(|r| !r.is_null()) {
            buf.push('/');
            buf.push_str(&self.word_string(repl.get("Orig"))?);
            buf.push('/');
            buf.push_str(&self.word_string(repl.get("With"))?);
        }
        if let Some(names) = v.get("Names").and_then(Value::as_u64) {
            buf = format!("${{!{}{}", name, if names == 1 { "*" } else { "@" });
        }
        if let Some(exp) = v.get("Exp").filter(|e| !e.is_null()) {
            let op = op_of(exp).and_then(par_exp_op).unwrap_or("");
            buf.push_str(op);
            buf.push_str(&self.word_string(exp.get("Word"))?);
        }
        buf.push('}');
        Ok(buf)
    }

    fn proc_subst_string(&self, v: &Value) -> Res<String> {
        let op = op_of(v).map(proc_subst_op).unwrap_or("<(");
        Ok(format!("{}{})", op, pretty(&self.seq(v.get("Stmts"))?)))
    }

    fn brace_exp_string(&self, v: &Value) -> Res<String> {
        let elems = arr(v, "Elems")
            .iter()
            .map(|w| self.word_string(Some(w)))
            .collect::<Res<Vec<_>>>()?;
        let sep = if flag(v, "Sequence") { ".." } else { "," };
        Ok(format!("{{{}}}", elems.join(sep)))
    }

    // -------------------------------------------------------------------
    // arithmetic
    // -------------------------------------------------------------------

    fn arith_words(&self, v: Option<&Value>) -> Res<Vec<Word>> {
        match v {
            Some(expr) if !expr.is_null() => Ok(vec![verbatim(&self.arith_string(expr)?)]),
            _ => Ok(Vec::new()),
        }
    }

    fn arith_string(&self, expr: &Value) -> Res<String> {
        match type_of(expr) {
            Some("Word") => Ok(render_word(&self.word(Some(expr))?, QuoteMode::Unquoted)),
            Some("BinaryArithm") => {
                let op = op_of(expr).and_then(arith_token).ok_or_else(|| {
                    TranslateError::unsupported(
                        format!("arithmetic operator {:?}", op_of(expr)),
                        None,
                    )
                })?;
                let left = self.arith_string(expr.get("X").unwrap_or(&Value::Null))?;
                let right = self.arith_string(expr.get("Y").unwrap_or(&Value::Null))?;
                Ok(format!("{} {} {}", left, op, right))
            }
            Some("UnaryArithm") => {
                let op = op_of(expr).and_then(arith_token).ok_or_else(|| {
                    TranslateError::unsupported(
                        format!("unary arithmetic operator {:?}", op_of(expr)),
                        None,
                    )
                })?;
                let inner = self.arith_string(expr.get("X").unwrap_or(&Value::Null))?;
                if flag(expr, "Post") {
                    Ok(format!("{}{}", inner, op))
                } else {
                    Ok(format!("{}{}", op, inner))
                }
            }
            Some("ParenArithm") => Ok(format!(
                "({})",
                self.arith_string(expr.get("X").unwrap_or(&Value::Null))?
            )),
            other => Err(TranslateError::unsupported(
                format!("arithmetic expression {}", other.unwrap_or("without a type")),
                None,
            )),
        }
    }

    // -------------------------------------------------------------------
    // redirections
    // -------------------------------------------------------------------

    fn redirects(&self, v: Option<&Value>) -> Res<Vec<Redirect>> {
        match v.and_then(Value::as_array) {
            Some(items) => items.iter().map(|r| self.redirect(r)).collect(),
            None => Ok(Vec::new()),
        }
    }

    fn redirect(&self, v: &Value) -> Res<Redirect> {
        let op = op_of(v).and_then(redir_op).ok_or_else(|| {
            TranslateError::unsupported(format!("redirection operator {:?}", op_of(v)), None)
        })?;
        let default_fd = match op {
            RedirOp::In
            | RedirOp::InOut
            | RedirOp::DupIn
            | RedirOp::Heredoc
            | RedirOp::DashHeredoc
            | RedirOp::WordHeredoc => 0,
            _ => 1,
        };
        let fd = self.redir_fd(v.get("N"), default_fd);
        let word = v.get("Word");

        let file = |kind: FileRedirKind| -> Res<Redirect> {
            Ok(Redirect::File {
                kind,
                fd: self.redir_fd(v.get("N"), default_fd),
                arg: self.word(word)?,
            })
        };

        match op {
            RedirOp::Out => file(FileRedirKind::To),
            RedirOp::AppendOut => file(FileRedirKind::Append),
            RedirOp::In => file(FileRedirKind::From),
            RedirOp::InOut => file(FileRedirKind::FromTo),
            RedirOp::Clobber => file(FileRedirKind::Clobber),
            RedirOp::WordHeredoc => file(FileRedirKind::ReadingString),
            RedirOp::Heredoc | RedirOp::DashHeredoc => Ok(Redirect::Heredoc {
                kind: if word_has_quotes(word) {
                    HeredocKind::Here
                } else {
                    HeredocKind::XHere
                },
                fd,
                body: self.word(v.get("Hdoc"))?,
                strip_leading_tabs: op == RedirOp::DashHeredoc,
                delimiter: Some(heredoc_delimiter(word)),
            }),
            RedirOp::DupIn | RedirOp::DupOut => {
                let kind = if op == RedirOp::DupIn {
                    DupRedirKind::FromFd
                } else {
                    DupRedirKind::ToFd
                };
                let lit = word_lit(word);
                if lit == Some("-") {
                    return Ok(Redirect::SingleArg {
                        kind: SingleArgRedirKind::CloseThis,
                        fd,
                    });
                }
                // A trailing dash on a numeric target is the move form.
                let moved = lit
                    .filter(|s| s.len() > 1 && s.ends_with('-'))
                    .map(|s| &s[..s.len() - 1])
                    .filter(|s| s.bytes().all(|b| b.is_ascii_digit()));
                let (target, move_fd) = if let Some(digits) = moved {
                    (FdTarget::Fixed(digits.parse().unwrap_or(0)), true)
                } else if word_is_int(word) {
                    (
                        FdTarget::Fixed(lit.unwrap_or("0").parse().unwrap_or(0)),
                        false,
                    )
                } else {
                    (FdTarget::Named(self.word(word)?), false)
                };
                Ok(Redirect::Dup {
                    kind,
                    fd,
                    target,
                    move_fd,
                })
            }
            RedirOp::All => Ok(Redirect::SingleArg {
                kind: SingleArgRedirKind::ErrAndOut,
                fd: FdTarget::Named(self.word(word)?),
            }),
            RedirOp::AppendAll => Ok(Redirect::SingleArg {
                kind: SingleArgRedirKind::AppendErrAndOut,
                fd: FdTarget::Named(self.word(word)?),
            }),
        }
    }

    fn redir_fd(&self, n: Option<&Value>, default_fd: u32) -> FdTarget {
        let lit = match n {
            Some(lit) if !lit.is_null() => str_of(lit, "Value"),
            _ => return FdTarget::Fixed(default_fd),
        };
        if !lit.is_empty() && lit.bytes().all(|b| b.is_ascii_digit()) {
            FdTarget::Fixed(lit.parse().unwrap_or(default_fd))
        } else {
            FdTarget::Named(verbatim(lit))
        }
    }
}

fn pipe_items(cmd: Command) -> Vec<Command> {
    let mut cmd = cmd;
    if let Command::Pipe { items, .. } = &mut cmd {
        return std::mem::take(items);
    }
    vec![cmd]
}

fn extglob_string(v: &Value) -> String {
    let op = op_of(v).map(glob_op).unwrap_or("?(");
    let pattern = v
        .get("Pattern")
        .map(|p| str_of(p, "Value"))
        .unwrap_or("");
    format!("{}{})", op, pattern)
}

/// The delimiter text as the user wrote it, with its quoting stripped.
fn heredoc_delimiter(word: Option<&Value>) -> String {
    let parts = match word.and_then(|w| w.get("Parts")).and_then(Value::as_array) {
        Some(parts) => parts,
        None => return String::new(),
    };
    let mut out = String::new();
    for part in parts {
        match type_of(part) {
            Some("Lit") | Some("SglQuoted") => out.push_str(str_of(part, "Value")),
            Some("DblQuoted") => {
                for p in part.get("Parts").and_then(Value::as_array).into_iter().flatten() {
                    if type_of(p) == Some("Lit") {
                        out.push_str(str_of(p, "Value"));
                    }
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lit_word(s: &str) -> Value {
        json!({ "Parts": [{ "Type": "Lit", "Value": s }] })
    }

    fn call(words: &[&str]) -> Value {
        json!({
            "Type": "CallExpr",
            "Pos": { "Line": 1, "Offset": 0 },
            "Args": words.iter().copied().map(lit_word).collect::<Vec<_>>(),
        })
    }

    fn stmt(cmd: Value) -> Value {
        json!({ "Cmd": cmd, "Redirs": [] })
    }

    fn one(doc: Value) -> Command {
        let mut nodes = to_ast_nodes(&doc).unwrap();
        assert_eq!(nodes.len(), 1);
        nodes.pop().unwrap()
    }

    #[test]
    fn file_document_translates_each_statement() {
        let doc = json!({
            "Type": "File",
            "Stmts": [stmt(call(&["echo", "hi"])), stmt(call(&["pwd"]))],
        });
        let nodes = to_ast_nodes(&doc).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(pretty(&nodes[0]), "echo hi");
    }

    #[test]
    fn assignments_promote_and_irregular_forms_stay_literal() {
        let cmd = json!({
            "Type": "CallExpr",
            "Pos": { "Line": 1 },
            "Assigns": [
                { "Name": { "Value": "FOO" }, "Value": lit_word("bar") },
                { "Name": { "Value": "ARR" }, "Append": true, "Value": lit_word("x") },
            ],
            "Args": [lit_word("echo")],
        });
        let ast = one(stmt(cmd));
        match &ast {
            Command::Simple {
                assignments,
                arguments,
                ..
            } => {
                assert_eq!(assignments.len(), 1);
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("expected Simple, got {:?}", other),
        }
        assert_eq!(pretty(&ast), "FOO=bar ARR+=x echo");
    }

    #[test]
    fn negated_statement_skips_braces() {
        let doc = json!({ "Cmd": call(&["true"]), "Negated": true });
        assert_eq!(pretty(&one(doc)), "! true");
    }

    #[test]
    fn background_statement_skips_braces() {
        let doc = json!({ "Cmd": call(&["slow"]), "Background": true });
        assert_eq!(pretty(&one(doc)), "slow &");
    }

    #[test]
    fn grammar_grouping_prints_without_braces() {
        let doc = stmt(json!({
            "Type": "BinaryCmd",
            "Op": 10,
            "X": stmt(call(&["a"])),
            "Y": stmt(call(&["b"])),
        }));
        assert_eq!(pretty(&one(doc)), "a && b");
    }

    #[test]
    fn nested_pipes_flatten() {
        let inner = json!({
            "Type": "BinaryCmd",
            "Op": 12,
            "X": stmt(call(&["a"])),
            "Y": stmt(call(&["b"])),
        });
        let doc = stmt(json!({
            "Type": "BinaryCmd",
            "Op": 12,
            "X": stmt(inner),
            "Y": stmt(call(&["c"])),
        }));
        let ast = one(doc);
        match &ast {
            Command::Pipe { items, .. } => assert_eq!(items.len(), 3),
            other => panic!("expected Pipe, got {:?}", other),
        }
        assert_eq!(pretty(&ast), "a | b | c");
    }

    #[test]
    fn deeply_nested_subshells_translate_without_overflow() {
        let mut cmd = call(&["x"]);
        for _ in 0..2_000 {
            cmd = json!({
                "Type": "Subshell",
                "Lparen": { "Line": 1 },
                "Stmts": [stmt(cmd)],
            });
        }
        let out = pretty(&one(stmt(cmd)));
        assert!(out.starts_with("( ( "));
        assert!(out.ends_with(" ) )"));
    }

    #[test]
    fn else_with_condition_chains_as_elif() {
        let doc = stmt(json!({
            "Type": "IfClause",
            "Cond": [stmt(call(&["c1"]))],
            "Then": [stmt(call(&["t1"]))],
            "Else": {
                "Cond": [stmt(call(&["c2"]))],
                "Then": [stmt(call(&["t2"]))],
            },
        }));
        assert_eq!(pretty(&one(doc)), "if c1; then t1; elif c2; then t2; fi");
    }

    #[test]
    fn until_flag_inverts_the_test() {
        let doc = stmt(json!({
            "Type": "WhileClause",
            "Until": true,
            "Cond": [stmt(call(&["check"]))],
            "Do": [stmt(call(&["work"]))],
        }));
        assert_eq!(pretty(&one(doc)), "until check; do work; done");
    }

    #[test]
    fn c_style_loop_renders_arithmetic() {
        let word_expr = |s: &str| json!({ "Type": "Word", "Parts": [{ "Type": "Lit", "Value": s }] });
        let doc = stmt(json!({
            "Type": "ForClause",
            "ForPos": { "Line": 2 },
            "Loop": {
                "Type": "CStyleLoop",
                "Init": { "Type": "BinaryArithm", "Op": 74, "X": word_expr("i"), "Y": word_expr("0") },
                "Cond": { "Type": "BinaryArithm", "Op": 56, "X": word_expr("i"), "Y": word_expr("3") },
                "Post": { "Type": "UnaryArithm", "Op": 36, "Post": true, "X": word_expr("i") },
            },
            "Do": [stmt(call(&["work"]))],
        }));
        assert_eq!(
            pretty(&one(doc)),
            "for ((i = 0; i < 3; i++)); do work; done"
        );
    }

    #[test]
    fn select_loops_are_recognized() {
        let doc = stmt(json!({
            "Type": "ForClause",
            "Select": true,
            "Loop": {
                "Type": "WordIter",
                "Name": { "Value": "opt" },
                "Items": [lit_word("a"), lit_word("b")],
            },
            "Do": [stmt(call(&["use"]))],
        }));
        assert_eq!(pretty(&one(doc)), "select opt in a b; do\nuse\ndone");
    }

    #[test]
    fn case_terminators_map_to_fallthrough() {
        let doc = stmt(json!({
            "Type": "CaseClause",
            "Case": { "Line": 1 },
            "Word": lit_word("x"),
            "Items": [
                { "Op": 34, "Patterns": [lit_word("a")], "Stmts": [stmt(call(&["first"]))] },
                { "Op": 33, "Patterns": [lit_word("b")], "Stmts": [stmt(call(&["second"]))] },
            ],
        }));
        assert_eq!(pretty(&one(doc)), "case x in a) first;& b) second;; esac");
    }

    #[test]
    fn function_declarations_keep_the_keyword() {
        let doc = stmt(json!({
            "Type": "FuncDecl",
            "Position": { "Line": 1 },
            "RsrvWord": true,
            "Name": { "Value": "f" },
            "Body": stmt(json!({ "Type": "Block", "Stmts": [stmt(call(&["a"]))] })),
        }));
        assert_eq!(pretty(&one(doc)), "function f () {\na\n}");
    }

    #[test]
    fn heredoc_keeps_its_delimiter_and_quoting() {
        let plain = json!({
            "Cmd": call(&["cat"]),
            "Redirs": [{
                "Op": 64,
                "Word": lit_word("END"),
                "Hdoc": lit_word("hi\n"),
            }],
        });
        assert_eq!(pretty(&one(plain)), "cat <<END\nhi\nEND\n");

        let quoted = json!({
            "Cmd": call(&["cat"]),
            "Redirs": [{
                "Op": 64,
                "Word": { "Parts": [{ "Type": "SglQuoted", "Value": "END" }] },
                "Hdoc": lit_word("hi\n"),
            }],
        });
        assert_eq!(pretty(&one(quoted)), "cat <<'END'\nhi\nEND\n");
    }

    #[test]
    fn stacked_heredocs_defer_in_reverse() {
        let doc = json!({
            "Cmd": call(&["cat"]),
            "Redirs": [
                { "Op": 64, "Word": lit_word("A"), "Hdoc": lit_word("first\n") },
                { "Op": 64, "Word": lit_word("B"), "Hdoc": lit_word("second\n") },
            ],
        });
        assert_eq!(pretty(&one(doc)), "cat <<A <<B\nsecond\nB\nfirst\nA\n");
    }

    #[test]
    fn dash_to_dup_and_close() {
        let close = json!({
            "Cmd": call(&["a"]),
            "Redirs": [{ "Op": 59, "N": { "Value": "2" }, "Word": lit_word("-") }],
        });
        assert_eq!(pretty(&one(close)), "a 2>&-");

        let dup = json!({
            "Cmd": call(&["a"]),
            "Redirs": [{ "Op": 59, "N": { "Value": "2" }, "Word": lit_word("1") }],
        });
        assert_eq!(pretty(&one(dup)), "a 2>&1");

        let moved = json!({
            "Cmd": call(&["a"]),
            "Redirs": [{ "Op": 59, "N": { "Value": "2" }, "Word": lit_word("1-") }],
        });
        assert_eq!(pretty(&one(moved)), "a 2>&1-");
    }

    #[test]
    fn combined_redirections() {
        let doc = json!({
            "Cmd": call(&["a"]),
            "Redirs": [{ "Op": 67, "Word": lit_word("log") }],
        });
        assert_eq!(pretty(&one(doc)), "a &> log");
    }

    #[test]
    fn param_expansions_render_to_text() {
        let exp = json!({
            "Type": "ParamExp",
            "Param": { "Value": "x" },
            "Exp": { "Op": 71, "Word": lit_word("y") },
        });
        let cmd = json!({
            "Type": "CallExpr",
            "Args": [lit_word("echo"), { "Parts": [exp] }],
        });
        assert_eq!(pretty(&one(stmt(cmd))), "echo ${x:-y}");
    }

    #[test]
    fn short_and_length_expansions() {
        let short = json!({ "Type": "ParamExp", "Short": true, "Param": { "Value": "x" } });
        let length = json!({ "Type": "ParamExp", "Length": true, "Param": { "Value": "x" } });
        let cmd = json!({
            "Type": "CallExpr",
            "Args": [lit_word("echo"), { "Parts": [short] }, { "Parts": [length] }],
        });
        assert_eq!(pretty(&one(stmt(cmd))), "echo $x ${#x}");
    }

    #[test]
    fn command_substitution_nests_statements() {
        let cmd = json!({
            "Type": "CallExpr",
            "Args": [lit_word("echo"), { "Parts": [{
                "Type": "CmdSubst",
                "Stmts": [stmt(call(&["pwd"]))],
            }] }],
        });
        assert_eq!(pretty(&one(stmt(cmd))), "echo $(pwd)");
    }

    #[test]
    fn extglob_uses_source_text_when_available() {
        let source = b"ls !(a|b)";
        let cmd = json!({
            "Type": "CallExpr",
            "Args": [lit_word("ls"), { "Parts": [{
                "Type": "ExtGlob",
                "Op": 126,
                "Pos": { "Offset": 3 },
                "End": { "Offset": 9 },
                "Pattern": { "Value": "a|b" },
            }] }],
        });
        let doc = stmt(cmd);
        let with = to_ast_nodes_with_source(&doc, source).unwrap();
        assert_eq!(pretty(&with[0]), "ls !(a|b)");
        let without = to_ast_nodes(&doc).unwrap();
        assert_eq!(pretty(&without[0]), "ls !(a|b)");
    }

    #[test]
    fn brace_expansion_fallback_builder() {
        let cmd = json!({
            "Type": "CallExpr",
            "Args": [lit_word("echo"), { "Parts": [{
                "Type": "BraceExp",
                "Sequence": true,
                "Elems": [lit_word("1"), lit_word("5")],
            }] }],
        });
        assert_eq!(pretty(&one(stmt(cmd))), "echo {1..5}");
    }

    #[test]
    fn test_clause_renders_as_bracket_command() {
        let doc = stmt(json!({
            "Type": "TestClause",
            "X": {
                "Type": "BinaryTest",
                "Op": 116,
                "X": { "Type": "Word", "Parts": [{ "Type": "Lit", "Value": "1" }] },
                "Y": { "Type": "Word", "Parts": [{ "Type": "Lit", "Value": "2" }] },
            },
        }));
        assert_eq!(pretty(&one(doc)), "[[ 1 -eq 2 ]]");
    }

    #[test]
    fn let_and_decl_clauses_become_simple_commands() {
        let let_doc = stmt(json!({
            "Type": "LetClause",
            "Exprs": [{
                "Type": "BinaryArithm",
                "Op": 44,
                "X": { "Type": "Word", "Parts": [{ "Type": "Lit", "Value": "x" }] },
                "Y": { "Type": "Word", "Parts": [{ "Type": "Lit", "Value": "1" }] },
            }],
        }));
        assert_eq!(pretty(&one(let_doc)), "let x += 1");

        let decl_doc = stmt(json!({
            "Type": "DeclClause",
            "Variant": { "Value": "declare" },
            "Args": [{ "Name": { "Value": "x" }, "Value": lit_word("1") }],
        }));
        assert_eq!(pretty(&one(decl_doc)), "declare x=1");
    }

    #[test]
    fn unknown_nodes_are_reported() {
        let doc = stmt(json!({ "Type": "Mystery" }));
        assert!(matches!(
            to_ast_nodes(&doc),
            Err(TranslateError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn unknown_arithmetic_operator_is_reported() {
        let doc = stmt(json!({
            "Type": "ArithmCmd",
            "X": { "Type": "BinaryArithm", "Op": 999,
                   "X": { "Type": "Word", "Parts": [] },
                   "Y": { "Type": "Word", "Parts": [] } },
        }));
        assert!(matches!(
            to_ast_nodes(&doc),
            Err(TranslateError::UnsupportedConstruct { .. })
        ));
    }
}
