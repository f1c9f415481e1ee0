//! Turns program text into a flat token buffer.
//!
//! Tokens are matched by longest-match over a fixed pattern list; ties go to
//! the earlier pattern, which is what keeps keywords ahead of plain names of
//! the same spelling. A `/` starts a regex literal only when the previously
//! emitted token is none of `)`, name, number or string; otherwise it is the
//! division operator.
use crate::errors::SyntaxError;
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords.
    Begin,
    End,
    Break,
    Continue,
    Delete,
    Do,
    Else,
    Exit,
    For,
    Function,
    Getline,
    If,
    In,
    Next,
    NextFile,
    Print,
    Printf,
    Return,
    While,
    // Punctuation and operators.
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Newline,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    Not,
    Gt,
    Lt,
    Ge,
    Le,
    EqEq,
    Ne,
    And,
    Or,
    Tilde,
    Dollar,
    Question,
    Colon,
    Pipe,
    Append,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
    Incr,
    Decr,
    // Leaves.
    Number,
    Str,
    Ere,
    Name,
    FuncName,
    BuiltinFunc,
    // End of input sentinel.
    Eof,
}

impl TokenKind {
    /// Short human name used in `want X, got Y` diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Begin => "BEGIN",
            TokenKind::End => "END",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Delete => "delete",
            TokenKind::Do => "do",
            TokenKind::Else => "else",
            TokenKind::Exit => "exit",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::Getline => "getline",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::Next => "next",
            TokenKind::NextFile => "nextfile",
            TokenKind::Print => "print",
            TokenKind::Printf => "printf",
            TokenKind::Return => "return",
            TokenKind::While => "while",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semi => ";",
            TokenKind::Comma => ",",
            TokenKind::Newline => "newline",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Pow => "^",
            TokenKind::Not => "!",
            TokenKind::Gt => ">",
            TokenKind::Lt => "<",
            TokenKind::Ge => ">=",
            TokenKind::Le => "<=",
            TokenKind::EqEq => "==",
            TokenKind::Ne => "!=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Tilde => "~",
            TokenKind::Dollar => "$",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Pipe => "|",
            TokenKind::Append => ">>",
            TokenKind::Assign => "=",
            TokenKind::AddAssign => "+=",
            TokenKind::SubAssign => "-=",
            TokenKind::MulAssign => "*=",
            TokenKind::DivAssign => "/=",
            TokenKind::ModAssign => "%=",
            TokenKind::PowAssign => "^=",
            TokenKind::Incr => "++",
            TokenKind::Decr => "--",
            TokenKind::Number => "number",
            TokenKind::Str => "string",
            TokenKind::Ere => "ere",
            TokenKind::Name => "name",
            TokenKind::FuncName => "function name",
            TokenKind::BuiltinFunc => "builtin",
            TokenKind::Eof => "EOF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Lexeme content: unescaped for strings, raw source for regexes,
    /// spelling for everything else.
    pub text: String,
    /// Zero-based row and column, in characters.
    pub row: usize,
    pub col: usize,
    /// Length of the lexeme in the source, in characters.
    pub len: usize,
}

/// Fixed spellings, keywords before the name pattern so equal-length ties
/// resolve to the keyword.
const FIXED: &[(&str, TokenKind)] = &[
    ("BEGIN", TokenKind::Begin),
    ("END", TokenKind::End),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("delete", TokenKind::Delete),
    ("do", TokenKind::Do),
    ("else", TokenKind::Else),
    ("exit", TokenKind::Exit),
    ("for", TokenKind::For),
    ("function", TokenKind::Function),
    ("getline", TokenKind::Getline),
    ("if", TokenKind::If),
    ("in", TokenKind::In),
    ("nextfile", TokenKind::NextFile),
    ("next", TokenKind::Next),
    ("printf", TokenKind::Printf),
    ("print", TokenKind::Print),
    ("return", TokenKind::Return),
    ("while", TokenKind::While),
    ("+=", TokenKind::AddAssign),
    ("-=", TokenKind::SubAssign),
    ("*=", TokenKind::MulAssign),
    ("/=", TokenKind::DivAssign),
    ("%=", TokenKind::ModAssign),
    ("^=", TokenKind::PowAssign),
    ("**=", TokenKind::PowAssign),
    ("||", TokenKind::Or),
    ("&&", TokenKind::And),
    ("==", TokenKind::EqEq),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("!=", TokenKind::Ne),
    ("++", TokenKind::Incr),
    ("--", TokenKind::Decr),
    (">>", TokenKind::Append),
    ("**", TokenKind::Pow),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (",", TokenKind::Comma),
    (";", TokenKind::Semi),
    ("\n", TokenKind::Newline),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("^", TokenKind::Pow),
    ("!", TokenKind::Not),
    (">", TokenKind::Gt),
    ("<", TokenKind::Lt),
    ("|", TokenKind::Pipe),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    ("~", TokenKind::Tilde),
    ("$", TokenKind::Dollar),
    ("=", TokenKind::Assign),
];

const BUILTINS: &[&str] = &[
    "atan2", "close", "cos", "exp", "gsub", "index", "int", "length", "log", "match", "rand",
    "sin", "split", "sprintf", "sqrt", "srand", "sub", "substr", "system", "tolower", "toupper",
];

lazy_static! {
    static ref NAME: Regex = Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*").unwrap();
    static ref FUNC_NAME: Regex = Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*)\(").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^[0-9]*(?:\.[0-9]+)?(?:[Ee]-?[0-9]+)?").unwrap();
}

/// Expands the string-literal escape set. Used for string tokens and for
/// `VAR=VALUE` words from the command line. Returns the offending character
/// on an unknown escape.
pub fn unescape(s: &str) -> Result<String, char> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('\\') => out.push('\\'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('&') => out.push('&'),
            Some(other) => return Err(other),
        }
    }
    Ok(out)
}

pub struct Lexer<'a> {
    src: &'a str,
    /// Byte offset into `src`.
    pos: usize,
    /// Row and column of `pos`, in characters.
    row: usize,
    col: usize,
    tokens: Vec<Token>,
}

/// A candidate lexeme: resolved kind, token text, and how much source it
/// consumes (bytes and characters may differ inside strings and regexes).
struct Match {
    kind: TokenKind,
    text: String,
    bytes: usize,
    chars: usize,
}

impl<'a> Lexer<'a> {
    pub fn lex(src: &str) -> Result<Vec<Token>, SyntaxError> {
        let mut lexer = Lexer {
            src,
            pos: 0,
            row: 0,
            col: 0,
            tokens: Vec::new(),
        };
        lexer.run()?;
        Ok(lexer.tokens)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, reason: &str, len: usize) -> SyntaxError {
        SyntaxError::new(reason.to_owned(), self.row, self.col, len)
    }

    /// Advances the cursor over `bytes` of source containing `chars`
    /// characters, tracking row and column.
    fn advance(&mut self, bytes: usize) {
        for c in self.src[self.pos..self.pos + bytes].chars() {
            if c == '\n' {
                self.row += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        self.pos += bytes;
    }

    fn run(&mut self) -> Result<(), SyntaxError> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with(' ') || rest.starts_with('\t') {
                self.advance(1);
                continue;
            }
            // A backslash right before a newline continues the line.
            if rest.starts_with("\\\n") {
                self.advance(2);
                continue;
            }
            if rest.starts_with("\\\r\n") {
                self.advance(3);
                continue;
            }
            if rest.starts_with('#') {
                let eol = rest.find('\n').unwrap_or_else(|| rest.len());
                self.advance(eol);
                continue;
            }
            let m = match self.best_match()? {
                Some(m) => m,
                None => return Err(self.error("bad token", 1)),
            };
            self.tokens.push(Token {
                kind: m.kind,
                text: m.text,
                row: self.row,
                col: self.col,
                len: m.chars,
            });
            self.advance(m.bytes);
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            row: self.row,
            col: self.col,
            len: 0,
        });
        Ok(())
    }

    /// Longest match over the pattern list; ties keep the earliest pattern.
    fn best_match(&self) -> Result<Option<Match>, SyntaxError> {
        let mut best: Option<Match> = None;
        let mut consider = |m: Option<Match>, best: &mut Option<Match>| {
            if let Some(m) = m {
                if best.as_ref().map_or(true, |b| m.chars > b.chars) {
                    *best = Some(m);
                }
            }
        };
        consider(self.match_string()?, &mut best);
        consider(self.match_ere(), &mut best);
        for &(spelling, kind) in FIXED {
            if self.rest().starts_with(spelling) {
                let m = Match {
                    kind,
                    text: spelling.to_owned(),
                    bytes: spelling.len(),
                    chars: spelling.chars().count(),
                };
                consider(Some(m), &mut best);
            }
        }
        for &name in BUILTINS {
            if self.rest().starts_with(name) {
                let m = Match {
                    kind: TokenKind::BuiltinFunc,
                    text: name.to_owned(),
                    bytes: name.len(),
                    chars: name.len(),
                };
                consider(Some(m), &mut best);
            }
        }
        if let Some(caps) = FUNC_NAME.captures(self.rest()) {
            let name = caps.get(1).unwrap().as_str();
            let m = Match {
                kind: TokenKind::FuncName,
                text: name.to_owned(),
                bytes: name.len(),
                chars: name.len(),
            };
            consider(Some(m), &mut best);
        }
        if let Some(m) = NAME.find(self.rest()) {
            let m = Match {
                kind: TokenKind::Name,
                text: m.as_str().to_owned(),
                bytes: m.as_str().len(),
                chars: m.as_str().len(),
            };
            consider(Some(m), &mut best);
        }
        if let Some(m) = NUMBER.find(self.rest()) {
            if !m.as_str().is_empty() {
                let m = Match {
                    kind: TokenKind::Number,
                    text: m.as_str().to_owned(),
                    bytes: m.as_str().len(),
                    chars: m.as_str().len(),
                };
                consider(Some(m), &mut best);
            }
        }
        Ok(best)
    }

    /// String literal: escapes are expanded here, so the token text is the
    /// final string value.
    fn match_string(&self) -> Result<Option<Match>, SyntaxError> {
        match self.scan_delimited('"')? {
            Some((raw, bytes, chars)) => {
                let text = unescape(&raw)
                    .map_err(|c| self.error(&format!("bad escape: \\{}", c), chars))?;
                Ok(Some(Match {
                    kind: TokenKind::Str,
                    text,
                    bytes,
                    chars,
                }))
            },
            None => Ok(None),
        }
    }

    /// Regex literal. Admitted only when the previous token cannot end an
    /// expression, which is what disambiguates `/` from division. Escapes
    /// other than `\/` are kept for the regex engine.
    fn match_ere(&self) -> Option<Match> {
        match self.tokens.last().map(|t| t.kind) {
            Some(TokenKind::RParen)
            | Some(TokenKind::Name)
            | Some(TokenKind::Number)
            | Some(TokenKind::Str) => return None,
            _ => {},
        }
        match self.scan_delimited('/') {
            Ok(Some((text, bytes, chars))) => Some(Match {
                kind: TokenKind::Ere,
                text,
                bytes,
                chars,
            }),
            _ => None,
        }
    }

    /// Scans a `delim`-delimited literal starting at the cursor. Within it,
    /// `\delim` collapses to the delimiter, a backslash-newline disappears,
    /// and any other backslash pair is kept verbatim. Returns the body and
    /// the source length consumed.
    fn scan_delimited(&self, delim: char) -> Result<Option<(String, usize, usize)>, SyntaxError> {
        let mut chars = self.rest().char_indices();
        match chars.next() {
            Some((_, c)) if c == delim => {},
            _ => return Ok(None),
        }
        let mut body = String::new();
        let mut count = 1;
        while let Some((i, c)) = chars.next() {
            count += 1;
            if c == '\\' {
                match chars.next() {
                    None => break,
                    Some((_, n)) => {
                        count += 1;
                        if n == delim {
                            body.push(delim);
                        } else if n != '\n' {
                            body.push('\\');
                            body.push(n);
                        }
                    },
                }
            } else if c == delim {
                return Ok(Some((body, i + c.len_utf8(), count)));
            } else {
                body.push(c);
            }
        }
        if delim == '"' {
            Err(self.error("bad string", 1))
        } else {
            Ok(None)
        }
    }
}
