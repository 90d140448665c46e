//! Operator token tables for the shfmt JSON schema.
//!
//! shfmt serializes operators as bare token numbers; these tables map
//! them back to meaning or to their source text.

/// Binary command operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinCmdOp {
    And,
    Or,
    Pipe,
    PipeAll,
}

pub fn bin_cmd_op(op: u64) -> Option<BinCmdOp> {
    match op {
        10 => Some(BinCmdOp::And),
        11 => Some(BinCmdOp::Or),
        12 => Some(BinCmdOp::Pipe),
        13 => Some(BinCmdOp::PipeAll),
        _ => None,
    }
}

/// Case terminators: only `;;` (Break) ends its clause; `;&`, `;;&` and
/// the Korn spelling all continue.
pub fn case_fallthrough(op: Option<u64>) -> bool {
    matches!(op, Some(34) | Some(35) | Some(36))
}

/// Redirection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirOp {
    Out,
    AppendOut,
    In,
    InOut,
    DupIn,
    DupOut,
    Clobber,
    Heredoc,
    DashHeredoc,
    WordHeredoc,
    All,
    AppendAll,
}

pub fn redir_op(op: u64) -> Option<RedirOp> {
    match op {
        54 => Some(RedirOp::Out),
        55 => Some(RedirOp::AppendOut),
        56 => Some(RedirOp::In),
        57 => Some(RedirOp::InOut),
        58 => Some(RedirOp::DupIn),
        59 => Some(RedirOp::DupOut),
        60..=63 => Some(if op == 60 || op == 61 {
            RedirOp::Clobber
        } else {
            RedirOp::AppendOut
        }),
        64 => Some(RedirOp::Heredoc),
        65 => Some(RedirOp::DashHeredoc),
        66 => Some(RedirOp::WordHeredoc),
        67..=69 => Some(RedirOp::All),
        70..=72 => Some(RedirOp::AppendAll),
        _ => None,
    }
}

/// Parameter-expansion operator text (`${x:-y}` and friends).
pub fn par_exp_op(op: u64) -> Option<&'static str> {
    match op {
        68 => Some("+"),
        69 => Some(":+"),
        70 => Some("-"),
        71 => Some(":-"),
        72 => Some("?"),
        73 => Some(":?"),
        74 => Some("="),
        75 => Some(":="),
        76 => Some("%"),
        77 => Some("%%"),
        78 => Some("#"),
        79 => Some("##"),
        _ => None,
    }
}

pub fn glob_op(op: u64) -> &'static str {
    match op {
        122 => "?(",
        123 => "*(",
        124 => "+(",
        125 => "@(",
        126 => "!(",
        _ => "?(",
    }
}

pub fn proc_subst_op(op: u64) -> &'static str {
    match op {
        66 => "<(",
        67 => "=(",
        68 => ">(",
        _ => "<(",
    }
}

pub fn unary_test_op(op: u64) -> &'static str {
    match op {
        88 => "-e",
        89 => "-f",
        90 => "-d",
        91 => "-c",
        92 => "-b",
        93 => "-p",
        94 => "-S",
        95 => "-L",
        96 => "-k",
        97 => "-g",
        98 => "-u",
        99 => "-G",
        100 => "-O",
        101 => "-N",
        102 => "-r",
        103 => "-w",
        104 => "-x",
        105 => "-s",
        106 => "-t",
        107 => "-z",
        108 => "-n",
        109 => "-o",
        110 => "-v",
        111 => "-R",
        112 => "!",
        113 => "(",
        _ => "",
    }
}

pub fn binary_test_op(op: u64) -> &'static str {
    match op {
        112 => "=~",
        113 => "-nt",
        114 => "-ot",
        115 => "-ef",
        116 => "-eq",
        117 => "-ne",
        118 => "-le",
        119 => "-ge",
        120 => "-lt",
        121 => "-gt",
        122 => "&&",
        123 => "||",
        124 => "=",
        125 => "==",
        126 => "!=",
        127 => "<",
        128 => ">",
        _ => "",
    }
}

/// Arithmetic operator tokens.
pub fn arith_token(op: u64) -> Option<&'static str> {
    match op {
        68 => Some("+"),
        70 => Some("-"),
        38 => Some("*"),
        85 => Some("/"),
        76 => Some("%"),
        39 => Some("**"),
        40 => Some("=="),
        54 => Some(">"),
        56 => Some("<"),
        41 => Some("!="),
        42 => Some("<="),
        43 => Some(">="),
        9 => Some("&"),
        12 => Some("|"),
        80 => Some("^"),
        55 => Some(">>"),
        61 => Some("<<"),
        10 => Some("&&"),
        11 => Some("||"),
        81 => Some("^^"),
        82 => Some(","),
        72 => Some("?"),
        87 => Some(":"),
        74 => Some("="),
        44 => Some("+="),
        45 => Some("-="),
        46 => Some("*="),
        47 => Some("/="),
        48 => Some("%="),
        49 => Some("&="),
        50 => Some("|="),
        51 => Some("^="),
        52 => Some("<<="),
        53 => Some(">>="),
        34 => Some("!"),
        35 => Some("~"),
        36 => Some("++"),
        37 => Some("--"),
        _ => None,
    }
}
