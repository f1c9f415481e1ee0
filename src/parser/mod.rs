//! A recursive-descent parser over the lexer's token buffer.
pub mod ast;
mod expr;
mod stmt;

use crate::{
    errors::SyntaxError,
    lexer::{Token, TokenKind},
    parser::ast::{Item, Pattern, Program, StmtList},
};
use std::rc::Rc;

/// Context flags threaded through the expression grammar. Inside `print`
/// and `printf` argument lists a bare `>` is a redirection and `|` a pipe,
/// so neither may be taken by the expression.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExprOpts {
    pub no_gt: bool,
    pub no_pipe: bool,
}

impl ExprOpts {
    pub const NORMAL: ExprOpts = ExprOpts {
        no_gt: false,
        no_pipe: false,
    };
    pub const PRINT: ExprOpts = ExprOpts {
        no_gt: true,
        no_pipe: true,
    };
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

pub fn parse_program(tokens: Vec<Token>) -> Result<Program, SyntaxError> {
    Parser::new(tokens).parse()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        assert!(!tokens.is_empty(), "token buffer must end with EOF");
        Parser { tokens, pos: 0 }
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// Lookahead without consuming; saturates at the EOF sentinel.
    pub(crate) fn peek_at(&self, n: usize) -> TokenKind {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    pub(crate) fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn matches(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.peek_kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.error_at_peek(format!(
                "want {}, got {}",
                kind.describe(),
                self.peek_kind().describe()
            )))
        }
    }

    pub(crate) fn error_at_peek(&self, reason: String) -> SyntaxError {
        let tok = self.peek();
        SyntaxError::new(reason, tok.row, tok.col, tok.len)
    }

    pub(crate) fn error_at(tok: &Token, reason: String) -> SyntaxError {
        SyntaxError::new(reason, tok.row, tok.col, tok.len)
    }

    /// `bad X` for an unexpected token.
    pub(crate) fn bad_token(&self) -> SyntaxError {
        self.error_at_peek(format!("bad {}", self.peek_kind().describe()))
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.matches(TokenKind::Newline) {}
    }

    pub(crate) fn skip_terminators(&mut self) {
        while self.peek_kind() == TokenKind::Newline || self.peek_kind() == TokenKind::Semi {
            self.bump();
        }
    }

    fn parse(&mut self) -> Result<Program, SyntaxError> {
        let mut items = Vec::new();
        loop {
            self.skip_terminators();
            if self.peek_kind() == TokenKind::Eof {
                return Ok(Program::new(items));
            }
            items.push(self.parse_item()?);
        }
    }

    fn parse_item(&mut self) -> Result<Item, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Function => self.parse_function_def(),
            TokenKind::Begin | TokenKind::End => {
                let kind = self.bump().kind;
                self.expect(TokenKind::LBrace)?;
                let body = self.parse_block()?;
                let pattern = if kind == TokenKind::Begin {
                    Pattern::Begin
                } else {
                    Pattern::End
                };
                Ok(Item::PatternAction(pattern, Some(Rc::new(body))))
            },
            TokenKind::LBrace => {
                self.bump();
                let body = self.parse_block()?;
                Ok(Item::PatternAction(Pattern::Always, Some(Rc::new(body))))
            },
            _ => {
                let first = self.parse_expr(ExprOpts::NORMAL)?;
                let pattern = if self.matches(TokenKind::Comma) {
                    self.skip_newlines();
                    let second = self.parse_expr(ExprOpts::NORMAL)?;
                    Pattern::Range(Rc::new(first), Rc::new(second))
                } else {
                    Pattern::Expr(Rc::new(first))
                };
                let action = if self.matches(TokenKind::LBrace) {
                    Some(Rc::new(self.parse_block()?))
                } else {
                    None
                };
                Ok(Item::PatternAction(pattern, action))
            },
        }
    }

    fn parse_function_def(&mut self) -> Result<Item, SyntaxError> {
        self.bump();
        let name_tok = self.bump();
        match name_tok.kind {
            TokenKind::FuncName | TokenKind::Name => {},
            _ => {
                return Err(Parser::error_at(
                    &name_tok,
                    "bad function name".to_owned(),
                ));
            },
        }
        self.expect(TokenKind::LParen)?;
        let mut params: Vec<String> = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::RParen => {
                    self.bump();
                    break;
                },
                TokenKind::Name => {
                    let tok = self.bump();
                    if params.iter().any(|p| *p == tok.text) {
                        return Err(Parser::error_at(&tok, "bad parameter".to_owned()));
                    }
                    params.push(tok.text);
                    if !self.matches(TokenKind::Comma) && self.peek_kind() != TokenKind::RParen {
                        return Err(self.bad_token());
                    }
                },
                _ => return Err(self.bad_token()),
            }
        }
        self.expect(TokenKind::LBrace)?;
        let body = self.parse_block()?;
        Ok(Item::FunctionDef(name_tok.text, params, Rc::new(body)))
    }

    /// Parses statements until the closing brace, which is consumed.
    pub(crate) fn parse_block(&mut self) -> Result<StmtList, SyntaxError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_terminators();
            if self.matches(TokenKind::RBrace) {
                return Ok(StmtList(stmts));
            }
            if self.peek_kind() == TokenKind::Eof {
                return Err(self.bad_token());
            }
            stmts.push(self.parse_stmt()?);
            match self.peek_kind() {
                TokenKind::Semi
                | TokenKind::Newline
                | TokenKind::RBrace
                | TokenKind::Eof => {},
                _ => return Err(self.bad_token()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lexer::Lexer,
        parser::ast::{Expr, ExprList, Stmt},
    };

    pub(crate) fn parse(input: &str) -> Program {
        let tokens = Lexer::lex(input).unwrap();
        match parse_program(tokens) {
            Ok(p) => p,
            Err(e) => panic!("input: {}\n{}", input, e.pretty(input)),
        }
    }

    fn parse_err(input: &str) -> SyntaxError {
        let tokens = Lexer::lex(input).unwrap();
        parse_program(tokens).unwrap_err()
    }

    #[test]
    fn pattern_action_items() {
        let prog = parse("{ print 42 }");
        assert_eq!(prog.items.len(), 1);
        match &prog.items[0] {
            Item::PatternAction(Pattern::Always, Some(stmts)) => {
                assert_eq!(
                    stmts.0,
                    vec![Stmt::Print(ExprList(vec![Expr::Number(42.0)]), None)]
                );
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn begin_and_end() {
        let prog = parse(r#"BEGIN { print "start" } END { print "end" }"#);
        assert_eq!(prog.items.len(), 2);
        assert!(matches!(
            prog.items[0],
            Item::PatternAction(Pattern::Begin, Some(..))
        ));
        assert!(matches!(
            prog.items[1],
            Item::PatternAction(Pattern::End, Some(..))
        ));
    }

    #[test]
    fn expression_patterns() {
        let prog = parse("/re/ { print }\nNR == 1");
        assert!(matches!(
            prog.items[0],
            Item::PatternAction(Pattern::Expr(..), Some(..))
        ));
        assert!(matches!(
            prog.items[1],
            Item::PatternAction(Pattern::Expr(..), None)
        ));
    }

    #[test]
    fn range_pattern() {
        let prog = parse("/start/, /stop/ { print }");
        assert!(matches!(
            prog.items[0],
            Item::PatternAction(Pattern::Range(..), Some(..))
        ));
        let prog = parse("NR == 2, NR == 4");
        assert!(matches!(
            prog.items[0],
            Item::PatternAction(Pattern::Range(..), None)
        ));
    }

    #[test]
    fn function_definitions() {
        let prog = parse("function my_func1() {}");
        assert_eq!(
            prog.items[0],
            Item::FunctionDef("my_func1".to_owned(), vec![], Rc::new(StmtList(vec![])))
        );
        let prog = parse("function my_func2(a, b) {}");
        match &prog.items[0] {
            Item::FunctionDef(name, params, _) => {
                assert_eq!(name, "my_func2");
                assert_eq!(params, &["a".to_owned(), "b".to_owned()]);
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn duplicate_parameter() {
        let err = parse_err("function f(a, b, a) {}");
        assert_eq!(err.reason, "bad parameter");
        assert_eq!(err.col, 17);
    }

    #[test]
    fn bad_function_name() {
        let err = parse_err("function 42() {}");
        assert_eq!(err.reason, "bad function name");
    }

    #[test]
    fn begin_needs_block() {
        let err = parse_err("BEGIN print");
        assert_eq!(err.reason, "want {, got print");
    }

    #[test]
    fn items_split_on_newlines() {
        let prog = parse("BEGIN { x = 1 }\n\n{ print x }\nEND { print \"done\" }\n");
        assert_eq!(prog.items.len(), 3);
    }

    #[test]
    fn empty_program() {
        assert_eq!(parse(""), Program::new(vec![]));
        assert_eq!(parse(" ;; \n ; "), Program::new(vec![]));
    }
}
