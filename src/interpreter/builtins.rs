//! The built-in function set.
use crate::{
    errors::EvaluationError,
    interpreter::{
        fmt,
        record::split_record,
        rnd::Rnd,
        value::Value,
        Eval, Runtime,
    },
    parser::ast::{AssignType, Builtin, Expr, ExprList, LValueType},
};
use regex::Regex;
use std::io::Write;
use std::process::Command;

pub fn call<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    builtin: Builtin,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    match builtin {
        Builtin::Atan2 => {
            let (y, x) = two_numbers(rt, args)?;
            Ok(Value::from(y.atan2(x)))
        },
        Builtin::Cos => Ok(Value::from(one_number(rt, args)?.cos())),
        Builtin::Sin => Ok(Value::from(one_number(rt, args)?.sin())),
        Builtin::Exp => Ok(Value::from(one_number(rt, args)?.exp())),
        Builtin::Log => Ok(Value::from(one_number(rt, args)?.ln())),
        Builtin::Sqrt => Ok(Value::from(one_number(rt, args)?.sqrt())),
        Builtin::Int => Ok(Value::from(one_number(rt, args)?.trunc())),
        Builtin::Rand => {
            if !args.is_empty() {
                return Err(EvaluationError::bad_argc("0", args.len()));
            }
            Ok(Value::from(rt.rnd.rand()))
        },
        Builtin::Srand => {
            let seed = match args.0.as_slice() {
                [] => Rnd::clock_seed(),
                [seed] => seed.eval(rt)?.as_number().trunc() as i64,
                _ => return Err(EvaluationError::bad_argc("0-1", args.len())),
            };
            rt.rnd.srand(seed);
            Ok(Value::from(1.0))
        },
        Builtin::Length => length(rt, args),
        Builtin::Index => index(rt, args),
        Builtin::Substr => substr(rt, args),
        Builtin::Split => split(rt, args),
        Builtin::Sub => substitute(rt, args, false),
        Builtin::Gsub => substitute(rt, args, true),
        Builtin::Match => match_builtin(rt, args),
        Builtin::Sprintf => sprintf(rt, args),
        Builtin::Tolower => {
            let s = one_string(rt, args)?;
            Ok(Value::String(s.to_lowercase()))
        },
        Builtin::Toupper => {
            let s = one_string(rt, args)?;
            Ok(Value::String(s.to_uppercase()))
        },
        Builtin::Close => {
            let key = one_string(rt, args)?;
            rt.streams.close(&key);
            Ok(Value::Uninitialised)
        },
        Builtin::System => system(rt, args),
    }
}

fn one_number<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<f64, EvaluationError> {
    match args.0.as_slice() {
        [arg] => Ok(arg.eval(rt)?.as_number()),
        _ => Err(EvaluationError::bad_argc("1", args.len())),
    }
}

fn two_numbers<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<(f64, f64), EvaluationError> {
    match args.0.as_slice() {
        [a, b] => {
            let a = a.eval(rt)?.as_number();
            let b = b.eval(rt)?.as_number();
            Ok((a, b))
        },
        _ => Err(EvaluationError::bad_argc("2", args.len())),
    }
}

fn one_string<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<String, EvaluationError> {
    match args.0.as_slice() {
        [arg] => {
            let value = arg.eval(rt)?;
            let conv = rt.vars.convfmt();
            Ok(value.as_string(&conv))
        },
        _ => Err(EvaluationError::bad_argc("1", args.len())),
    }
}

/// The pattern argument of the regex-taking builtins: a regex literal is
/// its own pattern, anything else contributes its string form.
fn regex_arg<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    arg: &Expr,
) -> Result<String, EvaluationError> {
    match arg {
        Expr::Regexp(source) => Ok(source.clone()),
        _ => {
            let value = arg.eval(rt)?;
            let conv = rt.vars.convfmt();
            Ok(value.as_string(&conv))
        },
    }
}

/// `length(x)`: element count of an array, rune length of a string,
/// defaulting to `$0`.
fn length<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    if args.len() > 2 {
        return Err(EvaluationError::bad_argc("0-1", args.len()));
    }
    match args.0.first() {
        None => Ok(Value::from(rt.record.record().chars().count())),
        Some(Expr::LValue(LValueType::Name(name))) => {
            if let Some(count) = rt.vars.array_len(name)? {
                return Ok(Value::from(count));
            }
            let value = rt.vars.get_scalar(name)?;
            let conv = rt.vars.convfmt();
            Ok(Value::from(value.as_string(&conv).chars().count()))
        },
        Some(arg) => {
            let value = arg.eval(rt)?;
            let conv = rt.vars.convfmt();
            Ok(Value::from(value.as_string(&conv).chars().count()))
        },
    }
}

/// 1-based rune position of `t` in `s`; an empty needle hits position 1 of
/// any non-empty haystack.
fn index<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    let (s, t) = match args.0.as_slice() {
        [s, t] => {
            let s = s.eval(rt)?;
            let t = t.eval(rt)?;
            let conv = rt.vars.convfmt();
            (s.as_string(&conv), t.as_string(&conv))
        },
        _ => return Err(EvaluationError::bad_argc("2", args.len())),
    };
    if t.is_empty() {
        return Ok(Value::from(if s.is_empty() { 0.0 } else { 1.0 }));
    }
    match s.find(&t) {
        Some(byte_pos) => Ok(Value::from(s[..byte_pos].chars().count() + 1)),
        None => Ok(Value::from(0.0)),
    }
}

/// 1-based substring in runes, clamped at both ends.
fn substr<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvaluationError::bad_argc("2-3", args.len()));
    }
    let conv = rt.vars.convfmt();
    let s: Vec<char> = {
        let value = args.0[0].eval(rt)?;
        value.as_string(&conv).chars().collect()
    };
    let mut m = args.0[1].eval(rt)?.as_number().trunc() as isize - 1;
    let len = s.len() as isize;
    if m > len - 1 {
        return Ok(Value::String(String::new()));
    }
    if m < 0 {
        m = 0;
    }
    let mut n = len;
    if let Some(arg) = args.0.get(2) {
        n = arg.eval(rt)?.as_number().trunc() as isize;
        if n < 0 {
            n = 0;
        }
    }
    let start = m as usize;
    let end = if n.saturating_add(m) > len {
        len as usize
    } else {
        (m + n) as usize
    };
    Ok(Value::String(s[start..end].iter().collect()))
}

/// `split(s, a[, fs])`: clears `a` and fills `a[1]..a[n]`.
fn split<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvaluationError::bad_argc("2-3", args.len()));
    }
    let array = match &args.0[1] {
        Expr::LValue(LValueType::Name(name)) => name.clone(),
        _ => return Err(EvaluationError::BadVariable),
    };
    let conv = rt.vars.convfmt();
    let s = args.0[0].eval(rt)?.as_string(&conv);
    let (fs, from_regex) = match args.0.get(2) {
        None => (rt.vars.fs(), false),
        Some(Expr::Regexp(source)) => (source.clone(), true),
        Some(arg) => (arg.eval(rt)?.as_string(&conv), false),
    };
    let rs = rt.vars.rs();
    let fields = {
        let sep = rt.field_sep(&fs, from_regex)?;
        split_record(&s, &sep, rs.is_empty())
    };
    rt.vars.array_clear(&array)?;
    let count = fields.len();
    for (i, field) in fields.into_iter().enumerate() {
        rt.vars.set_array_element(
            AssignType::Normal,
            &array,
            &(i + 1).to_string(),
            Value::StrNum(field),
        )?;
    }
    Ok(Value::from(count))
}

/// `&` in the replacement expands to the match; `\&` is a literal `&`.
fn expand_repl(repl: &str, matched: &str) -> String {
    let chars: Vec<char> = repl.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == '&' {
            out.push('&');
            i += 2;
        } else if chars[i] == '&' {
            out.push_str(matched);
            i += 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// First or every match of `re` in `input` replaced. Empty matches advance
/// by one rune so the scan terminates.
fn replace(re: &Regex, input: &str, repl: &str, global: bool) -> (String, usize) {
    let mut out = String::new();
    let mut pos = 0;
    let mut count = 0;
    while pos <= input.len() {
        let m = match re.find_at(input, pos) {
            Some(m) => m,
            None => break,
        };
        out.push_str(&input[pos..m.start()]);
        out.push_str(&expand_repl(repl, m.as_str()));
        count += 1;
        pos = if m.start() == m.end() {
            match input[m.end()..].chars().next() {
                Some(c) => {
                    out.push(c);
                    m.end() + c.len_utf8()
                },
                None => m.end() + 1,
            }
        } else {
            m.end()
        };
        if !global {
            break;
        }
    }
    out.push_str(&input[pos.min(input.len())..]);
    (out, count)
}

fn substitute<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
    global: bool,
) -> Result<Value, EvaluationError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvaluationError::bad_argc("2-3", args.len()));
    }
    let pattern = regex_arg(rt, &args.0[0])?;
    let conv = rt.vars.convfmt();
    let repl = args.0[1].eval(rt)?.as_string(&conv);
    let re = rt.regex(&pattern)?;
    let whole_record = LValueType::Dollar(Box::new(Expr::Number(0.0)));
    let (current, target) = match args.0.get(2) {
        None => (rt.record.get_field(0).as_string(&conv), Some(&whole_record)),
        Some(Expr::LValue(lvalue)) => (rt.get_lvalue(lvalue)?.as_string(&conv), Some(lvalue)),
        Some(other) => (other.eval(rt)?.as_string(&conv), None),
    };
    let (result, count) = replace(&re, &current, &repl, global);
    if count > 0 {
        if let Some(lvalue) = target {
            rt.set_lvalue(
                lvalue,
                AssignType::Normal,
                Value::StrNum(result),
            )?;
        }
    }
    Ok(Value::from(count))
}

/// `match(s, re)`: 1-based rune start or 0, with RSTART/RLENGTH updated.
fn match_builtin<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    if args.len() != 2 {
        return Err(EvaluationError::bad_argc("2", args.len()));
    }
    let conv = rt.vars.convfmt();
    let s = args.0[0].eval(rt)?.as_string(&conv);
    let pattern = regex_arg(rt, &args.0[1])?;
    let re = rt.regex(&pattern)?;
    let ty = AssignType::Normal;
    match re.find(&s) {
        Some(m) => {
            let start = s[..m.start()].chars().count() + 1;
            let length = m.as_str().chars().count();
            rt.vars.set_scalar(ty, "RSTART", Value::from(start))?;
            rt.vars.set_scalar(ty, "RLENGTH", Value::from(length))?;
            Ok(Value::from(start))
        },
        None => {
            rt.vars.set_scalar(ty, "RSTART", Value::from(0.0))?;
            rt.vars.set_scalar(ty, "RLENGTH", Value::from(-1.0))?;
            Ok(Value::from(0.0))
        },
    }
}

fn sprintf<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    if args.is_empty() {
        return Err(EvaluationError::bad_argc("1", args.len()));
    }
    let conv = rt.vars.convfmt();
    let format = args.0[0].eval(rt)?.as_string(&conv);
    let mut values = Vec::with_capacity(args.len() - 1);
    for arg in &args.0[1..] {
        values.push(arg.eval(rt)?);
    }
    Ok(Value::String(fmt::sprintf(&format, &values, &conv)?))
}

/// `system(cmd)`: run `sh -c cmd` to completion and return its status.
fn system<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    let command = one_string(rt, args)?;
    rt.output.flush()?;
    let status = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .status()
        .map_err(|e| EvaluationError::BadCommand(command.clone(), e.to_string()))?;
    Ok(Value::from(f64::from(status.code().unwrap_or(-1))))
}
