//! Tree-walking evaluation of expressions.
use crate::{
    errors::EvaluationError,
    interpreter::{builtins, functions, value::Value, Eval, Runtime},
    parser::ast::Expr,
};
use std::io::Write;

impl Eval for Expr {
    type EvalResult = Value;

    fn eval<Output: Write>(
        &self,
        rt: &mut Runtime<'_, Output>,
    ) -> Result<Value, EvaluationError> {
        match self {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            // A regex literal in an ordinary expression tests itself
            // against the current record.
            Expr::Regexp(source) => {
                let re = rt.regex(source)?;
                Ok(Value::from(re.is_match(rt.record.record())))
            },
            Expr::Grouping(e) => e.eval(rt),
            Expr::UnaryPlus(e) => Ok(Value::from(e.eval(rt)?.as_number())),
            Expr::UnaryMinus(e) => {
                let n = -e.eval(rt)?.as_number();
                // Negating zero stays plain zero.
                Ok(Value::from(if n == 0.0 { 0.0 } else { n }))
            },
            Expr::LogicalNot(e) => Ok(Value::from(!e.eval(rt)?.as_bool())),
            Expr::Pow(l, r) => {
                let base = l.eval(rt)?.as_number();
                let exponent = r.eval(rt)?.as_number();
                Ok(Value::from(base.powf(exponent)))
            },
            Expr::Mul(l, r) => {
                let l = l.eval(rt)?.as_number();
                let r = r.eval(rt)?.as_number();
                Ok(Value::from(l * r))
            },
            Expr::Div(l, r) => {
                let l = l.eval(rt)?.as_number();
                let r = r.eval(rt)?.as_number();
                if r == 0.0 {
                    return Err(EvaluationError::BadDivisor);
                }
                Ok(Value::from(l / r))
            },
            Expr::Mod(l, r) => {
                let l = l.eval(rt)?.as_number();
                let r = r.eval(rt)?.as_number();
                Ok(Value::from(l % r))
            },
            Expr::Add(l, r) => {
                let l = l.eval(rt)?.as_number();
                let r = r.eval(rt)?.as_number();
                Ok(Value::from(l + r))
            },
            Expr::Minus(l, r) => {
                let l = l.eval(rt)?.as_number();
                let r = r.eval(rt)?.as_number();
                Ok(Value::from(l - r))
            },
            Expr::Concat(l, r) => {
                let conv = rt.vars.convfmt();
                let l = l.eval(rt)?.as_string(&conv);
                let r = r.eval(rt)?.as_string(&conv);
                Ok(Value::StrNum(l + &r))
            },
            Expr::Comparison(op, l, r) => {
                let lvalue = l.eval(rt)?;
                let rvalue = r.eval(rt)?;
                let conv = rt.vars.convfmt();
                Ok(Value::compare(*op, &lvalue, &rvalue, &conv))
            },
            Expr::Match(negated, l, r) => {
                let conv = rt.vars.convfmt();
                let subject = l.eval(rt)?.as_string(&conv);
                let pattern = match r.as_ref() {
                    Expr::Regexp(source) => source.clone(),
                    other => other.eval(rt)?.as_string(&conv),
                };
                let re = rt.regex(&pattern)?;
                Ok(Value::from(re.is_match(&subject) != *negated))
            },
            Expr::InArray(keys, array) => {
                let key = rt.subscript(keys)?;
                Ok(Value::from(rt.vars.array_contains(array, &key)?))
            },
            Expr::LogicalAnd(l, r) => {
                if !l.eval(rt)?.as_bool() {
                    return Ok(Value::from(false));
                }
                Ok(Value::from(r.eval(rt)?.as_bool()))
            },
            Expr::LogicalOr(l, r) => {
                if l.eval(rt)?.as_bool() {
                    return Ok(Value::from(true));
                }
                Ok(Value::from(r.eval(rt)?.as_bool()))
            },
            Expr::Conditional(cond, ok, ko) => {
                if cond.eval(rt)?.as_bool() {
                    ok.eval(rt)
                } else {
                    ko.eval(rt)
                }
            },
            Expr::LValue(lvalue) => rt.get_lvalue(lvalue),
            Expr::Assign(ty, lvalue, rhs) => {
                let value = rhs.eval(rt)?;
                rt.set_lvalue(lvalue, *ty, value)
            },
            Expr::PreIncrement(lvalue) => rt.step_lvalue(lvalue, 1.0, true),
            Expr::PreDecrement(lvalue) => rt.step_lvalue(lvalue, -1.0, true),
            Expr::PostIncrement(lvalue) => rt.step_lvalue(lvalue, 1.0, false),
            Expr::PostDecrement(lvalue) => rt.step_lvalue(lvalue, -1.0, false),
            Expr::FunctionCall(name, args) => functions::call(rt, name, args),
            Expr::BuiltinCall(builtin, args) => builtins::call(rt, *builtin, args),
            Expr::Getline(var, source) => rt.eval_getline(var, source),
        }
    }
}
