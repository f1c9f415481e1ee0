//! Describe failures that can happen while lexing, parsing or executing a
//! script.
use crate::interpreter::value::Value;
use failure_derive::Fail;
use std::fmt;

/// An error detected while turning program text into tokens or tokens into a
/// program. It remembers where it happened so it can be pretty-printed
/// against the source.
#[derive(Debug, Fail, PartialEq)]
#[fail(display = "{}", reason)]
pub struct SyntaxError {
    pub reason: String,
    /// Zero-based row of the offending character or token.
    pub row: usize,
    /// Zero-based column, in characters.
    pub col: usize,
    /// Length of the offending lexeme, in characters.
    pub len: usize,
}

impl SyntaxError {
    pub fn new(reason: String, row: usize, col: usize, len: usize) -> SyntaxError {
        SyntaxError {
            reason,
            row,
            col,
            len,
        }
    }

    /// Renders the offending source line with a caret pointing at the
    /// error. Tabs in the line are reproduced in the padding so the caret
    /// stays aligned on tab-faithful terminals.
    pub fn pretty(&self, source: &str) -> String {
        let prefix = format!("line {}: ", self.row + 1);
        let line = source.lines().nth(self.row).unwrap_or("");
        let mut pad = " ".repeat(prefix.len());
        for (i, c) in line.chars().enumerate() {
            if i >= self.col {
                break;
            } else if c == '\t' {
                pad.push('\t');
            } else {
                pad.push(' ');
            }
        }
        let carets = "^".repeat(self.len.max(1));
        format!("{}{}\n{}{} {}", prefix, line, pad, carets, self.reason)
    }
}

/// Non-local control flow. Jumps travel through the error channel and each
/// enclosing loop or caller consumes the ones addressed to it; a jump that
/// reaches the surface is a misuse of the corresponding keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Jump {
    Break,
    Continue,
    Next,
    NextFile,
    Return(Value),
    Exit(i32),
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Jump::Break => write!(f, "break"),
            Jump::Continue => write!(f, "continue"),
            Jump::Next => write!(f, "next"),
            Jump::NextFile => write!(f, "nextfile"),
            Jump::Return(..) => write!(f, "return"),
            Jump::Exit(..) => write!(f, "exit"),
        }
    }
}

/// An error that happened during the evaluation of a script.
#[derive(Debug, Fail, PartialEq)]
pub enum EvaluationError {
    /// Division or a divide-assignment by zero.
    #[fail(display = "bad divisor: 0")]
    BadDivisor,
    /// A dynamic regular expression failed to compile.
    #[fail(display = "bad regex: {}", _0)]
    BadRegex(String),
    /// An input or output file could not be opened.
    #[fail(display = "bad file '{}': {}", _0, _1)]
    BadFile(String, String),
    /// A subprocess could not be spawned.
    #[fail(display = "bad command '{}': {}", _0, _1)]
    BadCommand(String, String),
    /// A function was called with an unexpected number of arguments.
    #[fail(display = "bad argc: {}", _0)]
    BadArgc(String),
    /// Assignment to something that is not an lvalue.
    #[fail(display = "bad variable")]
    BadVariable,
    /// An unknown printf conversion.
    #[fail(display = "bad verb: {}", _0)]
    BadVerb(String),
    /// An unknown backslash escape in a value from the command line.
    #[fail(display = "bad escape: \\{}", _0)]
    BadEscape(char),
    /// A call to an undefined function.
    #[fail(display = "bad function: {}", _0)]
    BadFunction(String),
    /// A function defined more than once.
    #[fail(display = "bad function: {} redefined", _0)]
    RedefinedFunction(String),
    /// An attempt to access a field at a negative index.
    #[fail(display = "bad field index: {}", _0)]
    NegativeFieldIndex(isize),
    /// An array variable used where a scalar is required.
    #[fail(display = "attempt to use an array in a scalar context")]
    UseArrayInScalarContext,
    /// A scalar variable used as an array.
    #[fail(display = "attempt to use a scalar as an array")]
    UseScalarAsArray,
    /// An I/O failure on one of the streams.
    #[fail(display = "{}", _0)]
    IoError(String),
    /// Control flow looking for its enclosing construct; user-visible only
    /// when the keyword appears outside one.
    #[fail(display = "bad {}", _0)]
    Jump(Jump),
}

impl From<std::io::Error> for EvaluationError {
    fn from(e: std::io::Error) -> EvaluationError {
        EvaluationError::IoError(e.to_string())
    }
}

impl EvaluationError {
    pub fn bad_argc(want: &str, got: usize) -> EvaluationError {
        EvaluationError::BadArgc(format!("want {}, got {}", want, got))
    }
}
