//! Tree-walking evaluation of statements. Jumps travel as errors; each
//! loop consumes the ones addressed to it.
use crate::{
    errors::{EvaluationError, Jump},
    interpreter::{fmt, streams::WriteMode, value::Value, Eval, Runtime},
    parser::ast::{
        AssignType, ExprList, LValueType, OutputRedirection, Stmt, StmtList,
    },
};
use std::io::Write;

impl Eval for StmtList {
    type EvalResult = ();

    fn eval<Output: Write>(&self, rt: &mut Runtime<'_, Output>) -> Result<(), EvaluationError> {
        for stmt in &self.0 {
            stmt.eval(rt)?;
        }
        Ok(())
    }
}

impl Eval for Stmt {
    type EvalResult = ();

    fn eval<Output: Write>(&self, rt: &mut Runtime<'_, Output>) -> Result<(), EvaluationError> {
        match self {
            Stmt::Block(stmts) => stmts.eval(rt),
            Stmt::Expr(e) => e.eval(rt).map(|_| ()),
            Stmt::IfElse(cond, ok, ko) => {
                if cond.eval(rt)?.as_bool() {
                    ok.eval(rt)
                } else if let Some(ko) = ko {
                    ko.eval(rt)
                } else {
                    Ok(())
                }
            },
            Stmt::While(cond, body) => {
                while cond.eval(rt)?.as_bool() {
                    match body.eval(rt) {
                        Ok(()) => {},
                        Err(EvaluationError::Jump(Jump::Break)) => break,
                        Err(EvaluationError::Jump(Jump::Continue)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            },
            Stmt::DoWhile(cond, body) => {
                loop {
                    match body.eval(rt) {
                        Ok(()) => {},
                        Err(EvaluationError::Jump(Jump::Break)) => break,
                        Err(EvaluationError::Jump(Jump::Continue)) => {},
                        Err(e) => return Err(e),
                    }
                    if !cond.eval(rt)?.as_bool() {
                        break;
                    }
                }
                Ok(())
            },
            Stmt::For(init, cond, step, body) => {
                if let Some(init) = init {
                    init.eval(rt)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !cond.eval(rt)?.as_bool() {
                            break;
                        }
                    }
                    match body.eval(rt) {
                        Ok(()) => {},
                        Err(EvaluationError::Jump(Jump::Break)) => break,
                        // continue still runs the step expression
                        Err(EvaluationError::Jump(Jump::Continue)) => {},
                        Err(e) => return Err(e),
                    }
                    if let Some(step) = step {
                        step.eval(rt)?;
                    }
                }
                Ok(())
            },
            Stmt::ForIn(var, array, body) => {
                let lvalue = LValueType::Name(var.clone());
                for key in rt.vars.array_keys(array)? {
                    rt.set_lvalue(&lvalue, AssignType::Normal, Value::StrNum(key))?;
                    match body.eval(rt) {
                        Ok(()) => {},
                        Err(EvaluationError::Jump(Jump::Break)) => break,
                        Err(EvaluationError::Jump(Jump::Continue)) => {},
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            },
            Stmt::Break => Err(EvaluationError::Jump(Jump::Break)),
            Stmt::Continue => Err(EvaluationError::Jump(Jump::Continue)),
            Stmt::Next => Err(EvaluationError::Jump(Jump::Next)),
            Stmt::NextFile => Err(EvaluationError::Jump(Jump::NextFile)),
            Stmt::Exit(e) => {
                let code = match e {
                    Some(e) => e.eval(rt)?.as_number() as i32,
                    None => 0,
                };
                Err(EvaluationError::Jump(Jump::Exit(code)))
            },
            Stmt::Return(e) => {
                let value = match e {
                    Some(e) => e.eval(rt)?,
                    None => Value::Uninitialised,
                };
                Err(EvaluationError::Jump(Jump::Return(value)))
            },
            Stmt::Delete(name, subscript) => {
                let key = rt.subscript(subscript)?;
                rt.vars.delete(name, &key)
            },
            Stmt::Print(args, redir) => print(rt, args, redir),
            Stmt::Printf(args, redir) => printf(rt, args, redir),
        }
    }
}

/// `print` joins its arguments with OFS, formats numbers with OFMT, and
/// terminates with ORS.
fn print<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
    redir: &Option<OutputRedirection>,
) -> Result<(), EvaluationError> {
    let ofmt = rt.vars.ofmt();
    let mut parts = Vec::with_capacity(args.len().max(1));
    if args.is_empty() {
        parts.push(rt.record.get_field(0).as_string(&ofmt));
    } else {
        for arg in &args.0 {
            let value = arg.eval(rt)?;
            parts.push(value.as_string(&ofmt));
        }
    }
    let data = format!("{}{}", parts.join(&rt.vars.ofs()), rt.vars.ors());
    write_out(rt, redir, &data)
}

fn printf<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
    redir: &Option<OutputRedirection>,
) -> Result<(), EvaluationError> {
    let conv = rt.vars.convfmt();
    let (format, values) = if args.is_empty() {
        // A bare printf treats the record as its format string.
        (rt.record.get_field(0).as_string(&conv), Vec::new())
    } else {
        let format = args.0[0].eval(rt)?.as_string(&conv);
        let mut values = Vec::with_capacity(args.len() - 1);
        for arg in &args.0[1..] {
            values.push(arg.eval(rt)?);
        }
        (format, values)
    };
    let data = fmt::sprintf(&format, &values, &conv)?;
    write_out(rt, redir, &data)
}

fn write_out<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    redir: &Option<OutputRedirection>,
    data: &str,
) -> Result<(), EvaluationError> {
    let (mode, dest) = match redir {
        None => {
            rt.output.write_all(data.as_bytes())?;
            return Ok(());
        },
        Some(OutputRedirection::Truncate(dest)) => (WriteMode::Truncate, dest),
        Some(OutputRedirection::Append(dest)) => (WriteMode::Append, dest),
        Some(OutputRedirection::Pipe(dest)) => (WriteMode::Pipe, dest),
    };
    let conv = rt.vars.convfmt();
    let key = dest.eval(rt)?.as_string(&conv);
    rt.streams.write(mode, &key, data)
}
