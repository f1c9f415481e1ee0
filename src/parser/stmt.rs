//! The statement grammar.
use crate::{
    errors::SyntaxError,
    lexer::TokenKind,
    parser::{
        ast::{Expr, ExprList, OutputRedirection, Stmt, StmtList},
        ExprOpts, Parser,
    },
};

impl Parser {
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek_kind() {
            TokenKind::LBrace => {
                self.bump();
                Ok(Stmt::Block(self.parse_block()?))
            },
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                self.bump();
                Ok(Stmt::Break)
            },
            TokenKind::Continue => {
                self.bump();
                Ok(Stmt::Continue)
            },
            TokenKind::Next => {
                self.bump();
                Ok(Stmt::Next)
            },
            TokenKind::NextFile => {
                self.bump();
                Ok(Stmt::NextFile)
            },
            TokenKind::Exit => {
                self.bump();
                Ok(Stmt::Exit(self.parse_opt_expr()?))
            },
            TokenKind::Return => {
                self.bump();
                Ok(Stmt::Return(self.parse_opt_expr()?))
            },
            TokenKind::Delete => self.parse_delete(),
            TokenKind::Print => {
                self.bump();
                let (args, redir) = self.parse_output()?;
                Ok(Stmt::Print(args, redir))
            },
            TokenKind::Printf => {
                self.bump();
                let (args, redir) = self.parse_output()?;
                Ok(Stmt::Printf(args, redir))
            },
            // An empty statement; the caller consumes the terminator.
            TokenKind::Semi => Ok(Stmt::Block(StmtList(vec![]))),
            _ => Ok(Stmt::Expr(self.parse_expr(ExprOpts::NORMAL)?)),
        }
    }

    /// The expression after `exit` and `return` is optional.
    fn parse_opt_expr(&mut self) -> Result<Option<Expr>, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Semi
            | TokenKind::Newline
            | TokenKind::RBrace
            | TokenKind::Eof => Ok(None),
            _ => Ok(Some(self.parse_expr(ExprOpts::NORMAL)?)),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump();
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr(ExprOpts::NORMAL)?;
        self.expect(TokenKind::RParen)?;
        self.skip_newlines();
        let then = Box::new(self.parse_stmt()?);
        // The else branch may sit after the statement terminator.
        let save = self.pos;
        self.skip_terminators();
        if self.matches(TokenKind::Else) {
            self.skip_newlines();
            let otherwise = Box::new(self.parse_stmt()?);
            Ok(Stmt::IfElse(cond, then, Some(otherwise)))
        } else {
            self.pos = save;
            Ok(Stmt::IfElse(cond, then, None))
        }
    }

    fn parse_while(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump();
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr(ExprOpts::NORMAL)?;
        self.expect(TokenKind::RParen)?;
        self.skip_newlines();
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While(cond, body))
    }

    fn parse_do_while(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump();
        self.skip_newlines();
        let body = Box::new(self.parse_stmt()?);
        self.skip_terminators();
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr(ExprOpts::NORMAL)?;
        self.expect(TokenKind::RParen)?;
        Ok(Stmt::DoWhile(cond, body))
    }

    fn parse_for(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump();
        self.expect(TokenKind::LParen)?;
        // for (name in array) body
        if self.peek_kind() == TokenKind::Name
            && self.peek_at(1) == TokenKind::In
            && self.peek_at(2) == TokenKind::Name
            && self.peek_at(3) == TokenKind::RParen
        {
            let var = self.bump().text;
            self.bump();
            let array = self.bump().text;
            self.bump();
            self.skip_newlines();
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::ForIn(var, array, body));
        }
        let init = if self.peek_kind() == TokenKind::Semi {
            None
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expr(ExprOpts::NORMAL)?)))
        };
        self.expect(TokenKind::Semi)?;
        self.skip_newlines();
        let cond = if self.peek_kind() == TokenKind::Semi {
            None
        } else {
            Some(self.parse_expr(ExprOpts::NORMAL)?)
        };
        self.expect(TokenKind::Semi)?;
        self.skip_newlines();
        let step = if self.peek_kind() == TokenKind::RParen {
            None
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expr(ExprOpts::NORMAL)?)))
        };
        self.expect(TokenKind::RParen)?;
        self.skip_newlines();
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For(init, cond, step, body))
    }

    fn parse_delete(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump();
        let name = self.expect(TokenKind::Name)?;
        self.expect(TokenKind::LBracket)?;
        let subscript = self.parse_expr_list(ExprOpts::NORMAL)?;
        self.expect(TokenKind::RBracket)?;
        Ok(Stmt::Delete(name.text, subscript))
    }

    /// Argument list and redirection for `print`/`printf`. Arguments stop at
    /// a bare `>` or `|`; a fully parenthesized list is also accepted.
    fn parse_output(&mut self) -> Result<(ExprList, Option<OutputRedirection>), SyntaxError> {
        let args = match self.peek_kind() {
            TokenKind::Semi
            | TokenKind::Newline
            | TokenKind::RBrace
            | TokenKind::Eof
            | TokenKind::Gt
            | TokenKind::Append
            | TokenKind::Pipe => ExprList(vec![]),
            TokenKind::LParen => {
                let save = self.pos;
                match self.parse_expr_list(ExprOpts::PRINT) {
                    Ok(args) => args,
                    Err(_) => {
                        // Retry as `print ( expr, expr, … )`.
                        self.pos = save;
                        self.bump();
                        let args = self.parse_expr_list(ExprOpts::NORMAL)?;
                        self.expect(TokenKind::RParen)?;
                        args
                    },
                }
            },
            _ => self.parse_expr_list(ExprOpts::PRINT)?,
        };
        let redir = match self.peek_kind() {
            TokenKind::Gt => {
                self.bump();
                Some(OutputRedirection::Truncate(
                    self.parse_expr(ExprOpts::PRINT)?,
                ))
            },
            TokenKind::Append => {
                self.bump();
                Some(OutputRedirection::Append(self.parse_expr(ExprOpts::PRINT)?))
            },
            TokenKind::Pipe => {
                self.bump();
                Some(OutputRedirection::Pipe(self.parse_expr(ExprOpts::PRINT)?))
            },
            _ => None,
        };
        Ok((args, redir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lexer::Lexer,
        parser::ast::{CmpOperator, LValueType},
    };

    fn parse_stmt(input: &str) -> Stmt {
        let tokens = Lexer::lex(input).unwrap();
        let mut parser = Parser::new(tokens);
        let stmt = parser
            .parse_stmt()
            .unwrap_or_else(|e| panic!("input: {}\n{}", input, e.pretty(input)));
        parser.skip_terminators();
        assert_eq!(parser.peek_kind(), TokenKind::Eof, "input: {}", input);
        stmt
    }

    #[test]
    fn if_else() {
        match parse_stmt("if (x == 1) a = 1; else a = 2") {
            Stmt::IfElse(cond, _, Some(_)) => {
                assert!(matches!(cond, Expr::Comparison(CmpOperator::Equal, ..)));
            },
            other => panic!("{:?}", other),
        }
        match parse_stmt("if (x) a = 1\nelse a = 2") {
            Stmt::IfElse(_, _, Some(_)) => {},
            other => panic!("{:?}", other),
        }
        match parse_stmt("if (x) a = 1") {
            Stmt::IfElse(_, _, None) => {},
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn else_if_chains() {
        match parse_stmt("if (a) x = 1; else if (b) x = 2; else x = 3") {
            Stmt::IfElse(_, _, Some(otherwise)) => {
                assert!(matches!(*otherwise, Stmt::IfElse(_, _, Some(_))));
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn loops() {
        assert!(matches!(parse_stmt("while (x < 5) x += 2"), Stmt::While(..)));
        assert!(matches!(
            parse_stmt("do x += 2; while (x < 5)"),
            Stmt::DoWhile(..)
        ));
        assert!(matches!(
            parse_stmt("for (i = 0; i < 5; i++) a = a i"),
            Stmt::For(Some(_), Some(_), Some(_), _)
        ));
        assert!(matches!(parse_stmt("for (;;) break"), Stmt::For(None, None, None, _)));
        match parse_stmt("for (k in arr) print k") {
            Stmt::ForIn(var, array, _) => {
                assert_eq!(var, "k");
                assert_eq!(array, "arr");
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn jumps() {
        assert_eq!(parse_stmt("break"), Stmt::Break);
        assert_eq!(parse_stmt("continue"), Stmt::Continue);
        assert_eq!(parse_stmt("next"), Stmt::Next);
        assert_eq!(parse_stmt("nextfile"), Stmt::NextFile);
        assert_eq!(parse_stmt("exit"), Stmt::Exit(None));
        assert_eq!(parse_stmt("exit 2"), Stmt::Exit(Some(Expr::Number(2.0))));
        assert_eq!(parse_stmt("return"), Stmt::Return(None));
    }

    #[test]
    fn delete() {
        match parse_stmt("delete a[i, j]") {
            Stmt::Delete(name, subscript) => {
                assert_eq!(name, "a");
                assert_eq!(subscript.len(), 2);
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn print_forms() {
        assert_eq!(parse_stmt("print"), Stmt::Print(ExprList(vec![]), None));
        match parse_stmt("print $1, $2") {
            Stmt::Print(args, None) => assert_eq!(args.len(), 2),
            other => panic!("{:?}", other),
        }
        match parse_stmt("print (1), (2)") {
            Stmt::Print(args, None) => assert_eq!(args.len(), 2),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn print_redirections() {
        match parse_stmt(r#"print x > "out""#) {
            Stmt::Print(args, Some(OutputRedirection::Truncate(dest))) => {
                assert_eq!(args.len(), 1);
                assert_eq!(dest, Expr::String("out".to_owned()));
            },
            other => panic!("{:?}", other),
        }
        assert!(matches!(
            parse_stmt(r#"print x >> "out""#),
            Stmt::Print(_, Some(OutputRedirection::Append(_)))
        ));
        assert!(matches!(
            parse_stmt(r#"print x | "sort""#),
            Stmt::Print(_, Some(OutputRedirection::Pipe(_)))
        ));
        // `>=` stays a comparison inside print arguments.
        match parse_stmt("print x >= 2") {
            Stmt::Print(args, None) => {
                assert!(matches!(
                    args.0[0],
                    Expr::Comparison(CmpOperator::GreaterThanOrEqual, ..)
                ));
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn printf_parenthesized() {
        match parse_stmt(r#"printf("%d-%d\n", 1, 2)"#) {
            Stmt::Printf(args, None) => assert_eq!(args.len(), 3),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn getline_statement() {
        assert!(matches!(
            parse_stmt("getline line"),
            Stmt::Expr(Expr::Getline(Some(_), _))
        ));
    }

    #[test]
    fn field_assignment() {
        match parse_stmt("$2 = \"x\"") {
            Stmt::Expr(Expr::Assign(_, LValueType::Dollar(_), _)) => {},
            other => panic!("{:?}", other),
        }
    }
}
