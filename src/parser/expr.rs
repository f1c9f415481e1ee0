//! The expression grammar.
//!
//! One method per precedence tier, outermost first: pipe, assignment,
//! conditional, `||`, `&&`, `in`, match, comparison, concatenation,
//! additive, multiplicative, unary, power, prefix, postfix, field
//! reference, grouping, primary.
use crate::{
    errors::SyntaxError,
    lexer::TokenKind,
    parser::{
        ast::{
            AssignType, Builtin, CmpOperator, Expr, ExprList, GetlineSource, LValueType,
        },
        ExprOpts, Parser,
    },
};

impl Parser {
    pub(crate) fn parse_expr(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_assign(opts)?;
        while !opts.no_pipe && self.peek_kind() == TokenKind::Pipe {
            let pipe = self.bump();
            if !self.matches(TokenKind::Getline) {
                return Err(Parser::error_at(&pipe, "bad pipe".to_owned()));
            }
            let var = if self.peek_kind() == TokenKind::Name {
                Some(self.bump().text)
            } else {
                None
            };
            e = Expr::Getline(var, GetlineSource::Command(Box::new(e)));
        }
        Ok(e)
    }

    pub(crate) fn parse_expr_list(&mut self, opts: ExprOpts) -> Result<ExprList, SyntaxError> {
        let mut exprs = vec![self.parse_expr(opts)?];
        while self.matches(TokenKind::Comma) {
            self.skip_newlines();
            exprs.push(self.parse_expr(opts)?);
        }
        Ok(ExprList(exprs))
    }

    fn parse_assign(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let e = self.parse_ternary(opts)?;
        let ty = match self.peek_kind() {
            TokenKind::Assign => AssignType::Normal,
            TokenKind::AddAssign => AssignType::Add,
            TokenKind::SubAssign => AssignType::Sub,
            TokenKind::MulAssign => AssignType::Mul,
            TokenKind::DivAssign => AssignType::Div,
            TokenKind::ModAssign => AssignType::Mod,
            TokenKind::PowAssign => AssignType::Pow,
            _ => return Ok(e),
        };
        let lvalue = match e {
            Expr::LValue(lvalue) => lvalue,
            _ => return Err(self.error_at_peek("bad variable".to_owned())),
        };
        self.bump();
        // Right associative.
        let rhs = self.parse_assign(opts)?;
        Ok(Expr::Assign(ty, lvalue, Box::new(rhs)))
    }

    fn parse_ternary(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let cond = self.parse_or(opts)?;
        if !self.matches(TokenKind::Question) {
            return Ok(cond);
        }
        let ok = self.parse_expr(opts)?;
        self.expect(TokenKind::Colon)?;
        let ko = self.parse_expr(opts)?;
        Ok(Expr::Conditional(
            Box::new(cond),
            Box::new(ok),
            Box::new(ko),
        ))
    }

    fn parse_or(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_and(opts)?;
        while self.matches(TokenKind::Or) {
            let rhs = self.parse_and(opts)?;
            e = Expr::LogicalOr(Box::new(e), Box::new(rhs));
        }
        Ok(e)
    }

    fn parse_and(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_in(opts)?;
        while self.matches(TokenKind::And) {
            let rhs = self.parse_in(opts)?;
            e = Expr::LogicalAnd(Box::new(e), Box::new(rhs));
        }
        Ok(e)
    }

    fn parse_in(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        if self.peek_kind() == TokenKind::LParen {
            let save = self.pos;
            match self.try_paren_in(opts) {
                Ok(e) => return Ok(e),
                Err(_) => self.pos = save,
            }
        }
        let e = self.parse_match(opts)?;
        if self.matches(TokenKind::In) {
            let arr = self.expect(TokenKind::Name)?;
            return Ok(Expr::InArray(ExprList(vec![e]), arr.text));
        }
        Ok(e)
    }

    /// `(k1, k2, …) in arr`; the caller restores the cursor when this does
    /// not pan out.
    fn try_paren_in(&mut self, _opts: ExprOpts) -> Result<Expr, SyntaxError> {
        self.bump();
        let keys = self.parse_expr_list(ExprOpts::NORMAL)?;
        self.expect(TokenKind::RParen)?;
        if !self.matches(TokenKind::In) {
            return Err(self.bad_token());
        }
        let arr = self.expect(TokenKind::Name)?;
        Ok(Expr::InArray(keys, arr.text))
    }

    fn parse_match(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_cmp(opts)?;
        loop {
            let negated = if self.matches(TokenKind::Tilde) {
                false
            } else if self.peek_kind() == TokenKind::Not && self.peek_at(1) == TokenKind::Tilde {
                self.bump();
                self.bump();
                true
            } else {
                return Ok(e);
            };
            let rhs = if self.peek_kind() == TokenKind::Ere {
                Expr::Regexp(self.bump().text)
            } else {
                self.parse_cmp(opts)?
            };
            e = Expr::Match(negated, Box::new(e), Box::new(rhs));
        }
    }

    fn parse_cmp(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_concat(opts)?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => CmpOperator::LessThan,
                TokenKind::Le => CmpOperator::LessThanOrEqual,
                TokenKind::EqEq => CmpOperator::Equal,
                TokenKind::Ne => CmpOperator::NotEqual,
                TokenKind::Ge => CmpOperator::GreaterThanOrEqual,
                TokenKind::Gt if !opts.no_gt => CmpOperator::GreaterThan,
                _ => return Ok(e),
            };
            self.bump();
            let rhs = self.parse_concat(opts)?;
            e = Expr::Comparison(op, Box::new(e), Box::new(rhs));
        }
    }

    fn parse_concat(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_add(opts)?;
        while self.starts_concat_operand() {
            let rhs = self.parse_add(opts)?;
            e = Expr::Concat(Box::new(e), Box::new(rhs));
        }
        Ok(e)
    }

    /// Whether the next token can begin a juxtaposed operand. `+` and `-`
    /// never do, the additive level has already claimed them; `!` only when
    /// it is not half of `!~`.
    fn starts_concat_operand(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Number
            | TokenKind::Str
            | TokenKind::Ere
            | TokenKind::Name
            | TokenKind::FuncName
            | TokenKind::BuiltinFunc
            | TokenKind::Dollar
            | TokenKind::LParen
            | TokenKind::Incr
            | TokenKind::Decr
            | TokenKind::Getline => true,
            TokenKind::Not => self.peek_at(1) != TokenKind::Tilde,
            _ => false,
        }
    }

    fn parse_add(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_mul(opts)?;
        loop {
            let plus = match self.peek_kind() {
                TokenKind::Plus => true,
                TokenKind::Minus => false,
                _ => return Ok(e),
            };
            self.bump();
            let rhs = self.parse_mul(opts)?;
            e = if plus {
                Expr::Add(Box::new(e), Box::new(rhs))
            } else {
                Expr::Minus(Box::new(e), Box::new(rhs))
            };
        }
    }

    fn parse_mul(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let mut e = self.parse_unary(opts)?;
        loop {
            let kind = self.peek_kind();
            match kind {
                TokenKind::Star | TokenKind::Slash | TokenKind::Percent => {},
                _ => return Ok(e),
            }
            self.bump();
            let rhs = self.parse_unary(opts)?;
            e = match kind {
                TokenKind::Star => Expr::Mul(Box::new(e), Box::new(rhs)),
                TokenKind::Slash => Expr::Div(Box::new(e), Box::new(rhs)),
                _ => Expr::Mod(Box::new(e), Box::new(rhs)),
            };
        }
    }

    fn parse_unary(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let kind = self.peek_kind();
        match kind {
            TokenKind::Minus | TokenKind::Plus | TokenKind::Not => {},
            _ => return self.parse_pow(opts),
        }
        self.bump();
        // Right associative.
        let operand = self.parse_unary(opts)?;
        Ok(match kind {
            TokenKind::Minus => Expr::UnaryMinus(Box::new(operand)),
            TokenKind::Plus => Expr::UnaryPlus(Box::new(operand)),
            _ => Expr::LogicalNot(Box::new(operand)),
        })
    }

    fn parse_pow(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let e = self.parse_prefix(opts)?;
        if !self.matches(TokenKind::Pow) {
            return Ok(e);
        }
        // Right associative.
        let rhs = self.parse_pow(opts)?;
        Ok(Expr::Pow(Box::new(e), Box::new(rhs)))
    }

    fn parse_prefix(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let incr = match self.peek_kind() {
            TokenKind::Incr => true,
            TokenKind::Decr => false,
            _ => return self.parse_postfix(opts),
        };
        self.bump();
        let operand = self.parse_postfix(opts)?;
        let lvalue = match operand {
            Expr::LValue(lvalue) => lvalue,
            _ => return Err(self.error_at_peek("bad variable".to_owned())),
        };
        Ok(if incr {
            Expr::PreIncrement(lvalue)
        } else {
            Expr::PreDecrement(lvalue)
        })
    }

    fn parse_postfix(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        let e = self.parse_fieldref(opts)?;
        let incr = match self.peek_kind() {
            TokenKind::Incr => true,
            TokenKind::Decr => false,
            _ => return Ok(e),
        };
        let lvalue = match e {
            Expr::LValue(lvalue) => lvalue,
            _ => return Err(self.error_at_peek("bad variable".to_owned())),
        };
        self.bump();
        Ok(if incr {
            Expr::PostIncrement(lvalue)
        } else {
            Expr::PostDecrement(lvalue)
        })
    }

    fn parse_fieldref(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        if !self.matches(TokenKind::Dollar) {
            return self.parse_group(opts);
        }
        let index = self.parse_group(opts)?;
        Ok(Expr::LValue(LValueType::Dollar(Box::new(index))))
    }

    fn parse_group(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        if !self.matches(TokenKind::LParen) {
            return self.parse_primary(opts);
        }
        let e = self.parse_expr(ExprOpts::NORMAL)?;
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Grouping(Box::new(e)))
    }

    fn parse_primary(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Number => {
                let tok = self.bump();
                match tok.text.parse::<f64>() {
                    Ok(n) => Ok(Expr::Number(n)),
                    Err(_) => Err(Parser::error_at(&tok, "bad number".to_owned())),
                }
            },
            TokenKind::Str => Ok(Expr::String(self.bump().text)),
            TokenKind::Ere => Ok(Expr::Regexp(self.bump().text)),
            TokenKind::Name => {
                let name = self.bump().text;
                if self.matches(TokenKind::LBracket) {
                    let subscript = self.parse_expr_list(ExprOpts::NORMAL)?;
                    self.expect(TokenKind::RBracket)?;
                    Ok(Expr::LValue(LValueType::Brackets(name, subscript)))
                } else {
                    Ok(Expr::LValue(LValueType::Name(name)))
                }
            },
            TokenKind::FuncName => {
                let name = self.bump().text;
                self.expect(TokenKind::LParen)?;
                let args = if self.peek_kind() == TokenKind::RParen {
                    ExprList(vec![])
                } else {
                    self.parse_expr_list(ExprOpts::NORMAL)?
                };
                self.expect(TokenKind::RParen)?;
                Ok(Expr::FunctionCall(name, args))
            },
            TokenKind::BuiltinFunc => {
                let tok = self.bump();
                let builtin = match Builtin::from_name(&tok.text) {
                    Some(b) => b,
                    None => {
                        return Err(Parser::error_at(
                            &tok,
                            format!("bad function: {}", tok.text),
                        ));
                    },
                };
                let args = if self.matches(TokenKind::LParen) {
                    let args = if self.peek_kind() == TokenKind::RParen {
                        ExprList(vec![])
                    } else {
                        self.parse_expr_list(ExprOpts::NORMAL)?
                    };
                    self.expect(TokenKind::RParen)?;
                    args
                } else {
                    ExprList(vec![])
                };
                Ok(Expr::BuiltinCall(builtin, args))
            },
            TokenKind::Getline => self.parse_getline(opts),
            _ => Err(self.bad_token()),
        }
    }

    /// `getline`, `getline var`, `getline < file`, `getline var < file`.
    /// The piped form is assembled at the top of the ladder.
    fn parse_getline(&mut self, opts: ExprOpts) -> Result<Expr, SyntaxError> {
        self.bump();
        let var = if self.peek_kind() == TokenKind::Name {
            Some(self.bump().text)
        } else {
            None
        };
        let source = if self.matches(TokenKind::Lt) {
            let file = self.parse_expr(opts)?;
            GetlineSource::File(Box::new(file))
        } else {
            GetlineSource::Main
        };
        Ok(Expr::Getline(var, source))
    }
}
