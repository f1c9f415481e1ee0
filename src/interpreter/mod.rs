//! The tree-walking interpreter.
//!
//! A `Runtime` owns every piece of mutable state: the symbol table, the
//! current record, the user functions, the stream registries, the regex
//! cache and the random generator. Evaluation is driven by the `Eval`
//! trait, implemented for expressions and statements.
pub mod builtins;
pub mod fmt;
pub mod functions;
pub mod record;
pub mod rnd;
pub mod streams;
pub mod value;
pub mod variables;

mod expr;
mod stmt;

use crate::{
    errors::{EvaluationError, Jump},
    lexer,
    parser::ast::{
        AssignType, Expr, ExprList, GetlineSource, Item, LValueType, Pattern, Program, StmtList,
    },
};
use regex::Regex;
use self::functions::Functions;
use self::record::{FieldSep, Record};
use self::rnd::Rnd;
use self::streams::{InputStream, Streams};
use self::value::Value;
use self::variables::Variables;
use std::{
    collections::HashMap,
    io::{BufRead, Write},
    rc::Rc,
};

pub trait Eval {
    type EvalResult;

    fn eval<Output: Write>(
        &self,
        rt: &mut Runtime<'_, Output>,
    ) -> Result<Self::EvalResult, EvaluationError>;
}

/// A record-matching item of the program body.
struct MainItem {
    pattern: MainPattern,
    action: Option<Rc<StmtList>>,
    /// Range items remember whether they are between their two patterns.
    active: bool,
}

enum MainPattern {
    Always,
    Expr(Rc<Expr>),
    Range(Rc<Expr>, Rc<Expr>),
}

pub struct Runtime<'a, Output: Write> {
    pub output: &'a mut Output,
    pub vars: Variables,
    pub record: Record,
    pub funcs: Functions,
    pub streams: Streams<'a>,
    pub rnd: Rnd,
    begins: Vec<Rc<StmtList>>,
    ends: Vec<Rc<StmtList>>,
    items: Vec<MainItem>,
    regexes: HashMap<String, Rc<Regex>>,
    main_input: Option<InputStream<'a>>,
    argv_offset: usize,
    read_file: bool,
}

impl<'a, Output: Write> Runtime<'a, Output> {
    /// Indexes the parsed program (functions, BEGIN/END blocks, items) and
    /// seeds ARGV/ARGC and ENVIRON.
    pub fn new(
        program: Program,
        argv: Vec<String>,
        environ: Vec<(String, String)>,
        stdin: Box<dyn BufRead + 'a>,
        output: &'a mut Output,
    ) -> Result<Runtime<'a, Output>, EvaluationError> {
        let mut vars = Variables::new();
        vars.seed_environ(environ);
        vars.seed_argv(&argv);
        let mut rt = Runtime {
            output,
            vars,
            record: Record::new(),
            funcs: Functions::new(),
            streams: Streams::new(stdin),
            rnd: Rnd::new(),
            begins: Vec::new(),
            ends: Vec::new(),
            items: Vec::new(),
            regexes: HashMap::new(),
            main_input: None,
            argv_offset: 0,
            read_file: false,
        };
        for item in program.items {
            match item {
                Item::FunctionDef(name, params, body) => {
                    rt.funcs.define(name, params, body)?;
                },
                Item::PatternAction(Pattern::Begin, action) => {
                    if let Some(body) = action {
                        rt.begins.push(body);
                    }
                },
                Item::PatternAction(Pattern::End, action) => {
                    if let Some(body) = action {
                        rt.ends.push(body);
                    }
                },
                Item::PatternAction(pattern, action) => {
                    let pattern = match pattern {
                        Pattern::Always => MainPattern::Always,
                        Pattern::Expr(e) => MainPattern::Expr(e),
                        Pattern::Range(from, to) => MainPattern::Range(from, to),
                        Pattern::Begin | Pattern::End => continue,
                    };
                    rt.items.push(MainItem {
                        pattern,
                        action,
                        active: false,
                    });
                },
            }
        }
        Ok(rt)
    }

    /// Sets a variable to a literal string, as `-F` does for FS.
    pub fn set_var(&mut self, name: &str, value: &str) -> Result<(), EvaluationError> {
        self.vars
            .set_scalar(AssignType::Normal, name, Value::StrNum(value.to_owned()))?;
        Ok(())
    }

    /// Sets a variable from a `VAR=VALUE` word, expanding backslash
    /// escapes the way `-v` and command-line assignments require.
    pub fn assign_escaped(&mut self, name: &str, value: &str) -> Result<(), EvaluationError> {
        let value = lexer::unescape(value).map_err(EvaluationError::BadEscape)?;
        self.vars
            .set_scalar(AssignType::Normal, name, Value::StrNum(value))?;
        Ok(())
    }

    /// Compiles a dynamic regex, memoizing by source text.
    pub fn regex(&mut self, pattern: &str) -> Result<Rc<Regex>, EvaluationError> {
        if let Some(re) = self.regexes.get(pattern) {
            return Ok(Rc::clone(re));
        }
        match Regex::new(pattern) {
            Ok(re) => {
                let re = Rc::new(re);
                self.regexes.insert(pattern.to_owned(), Rc::clone(&re));
                Ok(re)
            },
            Err(e) => Err(EvaluationError::BadRegex(e.to_string())),
        }
    }

    /// Resolves the current FS (or an explicit separator for `split`) into
    /// a splitting policy.
    pub fn field_sep(
        &mut self,
        fs: &str,
        from_regex: bool,
    ) -> Result<FieldSep, EvaluationError> {
        if fs.is_empty() {
            Ok(FieldSep::Runes)
        } else if fs == " " {
            Ok(FieldSep::Whitespace)
        } else if from_regex || fs.chars().count() > 1 {
            Ok(FieldSep::Pattern(self.regex(fs)?))
        } else {
            Ok(FieldSep::Char(fs.chars().next().unwrap_or(' ')))
        }
    }

    /// Assigns `$0`: re-splits per FS and refreshes NF.
    pub fn set_record(&mut self, record: String) -> Result<(), EvaluationError> {
        let fs = self.vars.fs();
        let rs = self.vars.rs();
        let sep = self.field_sep(&fs, false)?;
        let nf = self.record.set_record(record, &sep, rs.is_empty());
        self.vars
            .set_scalar(AssignType::Normal, "NF", Value::from(nf))?;
        Ok(())
    }

    pub fn get_lvalue(&mut self, lvalue: &LValueType) -> Result<Value, EvaluationError> {
        match lvalue {
            LValueType::Name(name) => self.vars.get_scalar(name),
            LValueType::Dollar(index) => {
                let index = index.eval(self)?.as_number().trunc() as isize;
                if index < 0 {
                    return Err(EvaluationError::NegativeFieldIndex(index));
                }
                Ok(self.record.get_field(index as usize))
            },
            LValueType::Brackets(name, subscript) => {
                let key = self.subscript(subscript)?;
                self.vars.get_array_element(name, &key)
            },
        }
    }

    /// All writes go through here so `$0`, the fields and NF stay
    /// reconciled no matter which side was assigned.
    pub fn set_lvalue(
        &mut self,
        lvalue: &LValueType,
        ty: AssignType,
        value: Value,
    ) -> Result<Value, EvaluationError> {
        match lvalue {
            LValueType::Name(name) if name == "NF" => {
                let current = Value::from(self.record.nf());
                let result = Value::compute(ty, current, value)?;
                let nf = result.as_number().trunc();
                let nf = if nf < 0.0 { 0 } else { nf as usize };
                let ofs = self.vars.ofs();
                self.record.set_nf(nf, &ofs);
                self.vars
                    .set_scalar(AssignType::Normal, "NF", Value::from(nf))?;
                Ok(Value::from(nf))
            },
            LValueType::Name(name) => self.vars.set_scalar(ty, name, value),
            LValueType::Dollar(index) => {
                let index = index.eval(self)?.as_number().trunc() as isize;
                if index < 0 {
                    return Err(EvaluationError::NegativeFieldIndex(index));
                }
                let conv = self.vars.convfmt();
                let index = index as usize;
                if index == 0 {
                    let current = Value::StrNum(self.record.record().to_owned());
                    let result = Value::compute(ty, current, value)?;
                    self.set_record(result.as_string(&conv))?;
                    Ok(result)
                } else {
                    let current = self.record.get_field(index);
                    let result = Value::compute(ty, current, value)?;
                    let ofs = self.vars.ofs();
                    let nf = self.record.set_field(index, result.as_string(&conv), &ofs);
                    self.vars
                        .set_scalar(AssignType::Normal, "NF", Value::from(nf))?;
                    Ok(result)
                }
            },
            LValueType::Brackets(name, subscript) => {
                let key = self.subscript(subscript)?;
                self.vars.set_array_element(ty, name, &key, value)
            },
        }
    }

    /// `++`/`--` in either position.
    pub fn step_lvalue(
        &mut self,
        lvalue: &LValueType,
        delta: f64,
        prefix: bool,
    ) -> Result<Value, EvaluationError> {
        let current = self.get_lvalue(lvalue)?.as_number();
        let updated = current + delta;
        self.set_lvalue(lvalue, AssignType::Normal, Value::from(updated))?;
        Ok(Value::from(if prefix { updated } else { current }))
    }

    /// Evaluates a subscript list into one SUBSEP-joined key.
    pub fn subscript(&mut self, subscript: &ExprList) -> Result<String, EvaluationError> {
        let conv = self.vars.convfmt();
        let mut parts = Vec::with_capacity(subscript.len());
        for e in &subscript.0 {
            let value = e.eval(self)?;
            parts.push(value.as_string(&conv));
        }
        Ok(self.vars.subscript_key(parts))
    }

    /// Advances to the next main input per ARGV, applying `NAME=VALUE`
    /// operands on the way. False when inputs are exhausted.
    fn next_input(&mut self) -> Result<bool, EvaluationError> {
        loop {
            self.argv_offset += 1;
            let argc = self.vars.get_number("ARGC") as isize;
            let arg = if (self.argv_offset as isize) < argc {
                let key = self.argv_offset.to_string();
                let conv = self.vars.convfmt();
                self.vars.get_array_element("ARGV", &key)?.as_string(&conv)
            } else if self.read_file {
                self.main_input = None;
                return Ok(false);
            } else {
                // Never opened a file: read standard input once.
                "-".to_owned()
            };
            if let Some(eq) = arg.find('=') {
                let value = arg[eq + 1..].to_owned();
                let name = arg[..eq].to_owned();
                self.assign_escaped(&name, &value)?;
                continue;
            }
            let stream = self.streams.open_main_input(&arg)?;
            if arg != "-" {
                self.read_file = true;
            }
            self.main_input = Some(stream);
            self.vars
                .set_scalar(AssignType::Normal, "FILENAME", Value::StrNum(arg))?;
            self.vars
                .set_scalar(AssignType::Normal, "FNR", Value::from(0.0))?;
            return Ok(true);
        }
    }

    fn assign_target(
        &mut self,
        target: Option<&LValueType>,
        record: String,
    ) -> Result<(), EvaluationError> {
        match target {
            None => self.set_record(record),
            Some(lvalue) => {
                self.set_lvalue(lvalue, AssignType::Normal, Value::StrNum(record))?;
                Ok(())
            },
        }
    }

    /// One `getline` against the main input: 1 for a record, 0 at the end
    /// of the current source. The record is assigned before the verdict,
    /// so EOF leaves the target empty.
    fn getline_main(&mut self, target: Option<&LValueType>) -> Result<f64, EvaluationError> {
        if self.main_input.is_none() && !self.next_input()? {
            return Ok(0.0);
        }
        let rs = self.vars.rs();
        let record = match self.main_input.as_mut() {
            Some(input) => {
                if rs.is_empty() {
                    input.skip_newlines()?;
                }
                input.read_record(&rs)?
            },
            None => None,
        };
        match record {
            Some(record) => {
                self.assign_target(target, record)?;
                self.vars
                    .set_scalar(AssignType::Add, "NR", Value::from(1.0))?;
                self.vars
                    .set_scalar(AssignType::Add, "FNR", Value::from(1.0))?;
                Ok(1.0)
            },
            None => {
                self.assign_target(target, String::new())?;
                self.main_input = None;
                Ok(0.0)
            },
        }
    }

    /// `getline` in all of its expression forms.
    pub fn eval_getline(
        &mut self,
        var: &Option<String>,
        source: &GetlineSource,
    ) -> Result<Value, EvaluationError> {
        let target = var.as_ref().map(|name| LValueType::Name(name.clone()));
        let rs = self.vars.rs();
        let record = match source {
            GetlineSource::Main => {
                return Ok(Value::from(self.getline_main(target.as_ref())?));
            },
            GetlineSource::File(key) => {
                let conv = self.vars.convfmt();
                let key = key.eval(self)?.as_string(&conv);
                match self.streams.reader(&key) {
                    // A file that cannot be opened is a quiet -1.
                    None => return Ok(Value::from(-1.0)),
                    Some(input) => {
                        if rs.is_empty() {
                            input.skip_newlines()?;
                        }
                        input.read_record(&rs)?
                    },
                }
            },
            GetlineSource::Command(key) => {
                let conv = self.vars.convfmt();
                let key = key.eval(self)?.as_string(&conv);
                let input = self.streams.command_reader(&key)?;
                if rs.is_empty() {
                    input.skip_newlines()?;
                }
                input.read_record(&rs)?
            },
        };
        match record {
            Some(record) => {
                self.assign_target(target.as_ref(), record)?;
                Ok(Value::from(1.0))
            },
            None => {
                self.assign_target(target.as_ref(), String::new())?;
                Ok(Value::from(0.0))
            },
        }
    }

    /// Runs the program: BEGIN blocks, the record loop, then END blocks
    /// and stream teardown. Returns the exit code.
    pub fn execute(&mut self) -> Result<i32, EvaluationError> {
        let mut code = 0;
        match self.run_body() {
            Ok(()) => {},
            Err(EvaluationError::Jump(Jump::Exit(c))) => code = c,
            Err(e) => {
                self.streams.close_all();
                return Err(e);
            },
        }
        for end in self.ends.clone() {
            match end.eval(self) {
                Ok(()) => {},
                Err(EvaluationError::Jump(Jump::Exit(c))) => {
                    code = c;
                    break;
                },
                Err(e) => {
                    self.streams.close_all();
                    return Err(e);
                },
            }
        }
        self.streams.close_all();
        self.output.flush()?;
        Ok(code)
    }

    fn run_body(&mut self) -> Result<(), EvaluationError> {
        for begin in self.begins.clone() {
            begin.eval(self)?;
        }
        // A BEGIN-only program never touches the input.
        if self.items.is_empty() && self.ends.is_empty() {
            return Ok(());
        }
        self.record_loop()
    }

    fn record_loop(&mut self) -> Result<(), EvaluationError> {
        loop {
            if self.getline_main(None)? == 0.0 {
                let argc = self.vars.get_number("ARGC");
                if self.argv_offset as f64 >= argc - 1.0 {
                    return Ok(());
                }
                continue;
            }
            self.item_loop()?;
        }
    }

    fn item_loop(&mut self) -> Result<(), EvaluationError> {
        for i in 0..self.items.len() {
            if !self.item_matches(i)? {
                continue;
            }
            let action = self.items[i].action.clone();
            let result = match &action {
                Some(stmts) => stmts.eval(self),
                None => self.print_record(),
            };
            match result {
                Ok(()) => {},
                Err(EvaluationError::Jump(Jump::Next)) => return Ok(()),
                Err(EvaluationError::Jump(Jump::NextFile)) => {
                    // Move the input along; the remaining items still see
                    // the current record.
                    self.next_input()?;
                },
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn item_matches(&mut self, i: usize) -> Result<bool, EvaluationError> {
        enum Matcher {
            Single(Rc<Expr>),
            Range(Rc<Expr>, Rc<Expr>),
        }
        let matcher = match &self.items[i].pattern {
            MainPattern::Always => return Ok(true),
            MainPattern::Expr(e) => Matcher::Single(Rc::clone(e)),
            MainPattern::Range(from, to) => Matcher::Range(Rc::clone(from), Rc::clone(to)),
        };
        match matcher {
            Matcher::Single(e) => Ok(e.eval(self)?.as_bool()),
            Matcher::Range(from, to) => {
                let from = from.eval(self)?.as_bool();
                let to = to.eval(self)?.as_bool();
                let mut active = self.items[i].active;
                if !active && from {
                    active = true;
                }
                let matched = if active && to {
                    active = false;
                    true
                } else {
                    active
                };
                self.items[i].active = active;
                Ok(matched)
            },
        }
    }

    /// The implicit action: print the record.
    fn print_record(&mut self) -> Result<(), EvaluationError> {
        let data = format!("{}{}", self.record.record(), self.vars.ors());
        self.output.write_all(data.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser};
    use std::io::Cursor;

    /// Runs a program over the given stdin and extra operands, returning
    /// stdout and the exit code.
    fn run_args(program: &str, input: &str, args: &[&str]) -> (String, i32) {
        let tokens = Lexer::lex(program).unwrap_or_else(|e| panic!("{}", e.pretty(program)));
        let prog = parser::parse_program(tokens)
            .unwrap_or_else(|e| panic!("{}", e.pretty(program)));
        let mut argv = vec!["hawk".to_owned()];
        argv.extend(args.iter().map(|a| (*a).to_string()));
        let mut out = Vec::new();
        let code = {
            let stdin = Box::new(Cursor::new(input.as_bytes().to_vec()));
            let mut rt = Runtime::new(prog, argv, Vec::new(), stdin, &mut out).unwrap();
            rt.execute().unwrap_or_else(|e| panic!("program: {}\n{}", program, e))
        };
        (String::from_utf8(out).unwrap(), code)
    }

    fn run(program: &str, input: &str) -> String {
        run_args(program, input, &[]).0
    }

    fn run_err(program: &str, input: &str) -> EvaluationError {
        let tokens = Lexer::lex(program).unwrap();
        let prog = parser::parse_program(tokens).unwrap();
        let mut out = Vec::new();
        let stdin = Box::new(Cursor::new(input.as_bytes().to_vec()));
        let mut rt = Runtime::new(prog, vec!["hawk".to_owned()], Vec::new(), stdin, &mut out)
            .unwrap();
        rt.execute().unwrap_err()
    }

    #[test]
    fn implicit_print() {
        assert_eq!(run("{print}", "hello world"), "hello world\n");
        assert_eq!(run("{print}", "a\nb\n"), "a\nb\n");
    }

    #[test]
    fn fields_and_nf() {
        assert_eq!(run("{print $1, $3}", "a b c\n"), "a c\n");
        assert_eq!(run("{print NF}", "a b c\n"), "3\n");
        assert_eq!(run("{print $5}", "a b c\n"), "\n");
        assert_eq!(run("{$2 = \"X\"; print}", "a b c\n"), "a X c\n");
        assert_eq!(run("{$5 = \"e\"; print; print NF}", "a b\n"), "a b   e\n5\n");
        assert_eq!(run("{NF = 2; print; print NF}", "a b c d\n"), "a b\n2\n");
    }

    #[test]
    fn record_reassignment_resplits() {
        assert_eq!(
            run("{$0 = \"x y z\"; print $2, NF}", "a\n"),
            "y 3\n"
        );
        // Changing OFS shows up once a field is written.
        assert_eq!(
            run("BEGIN{OFS=\"-\"} {$1 = $1; print}", "a b c\n"),
            "a-b-c\n"
        );
    }

    #[test]
    fn field_separator() {
        assert_eq!(
            run("BEGIN{FS=\":\"} {print $1, $2, $3}", "foo:bar:baz\n"),
            "foo bar baz\n"
        );
        assert_eq!(
            run("BEGIN{FS=\"\"} {print $2}", "abc\n"),
            "b\n"
        );
        // Multi-character FS is a regex.
        assert_eq!(
            run("BEGIN{FS=\"[0-9]+\"} {print $2}", "ab12cd\n"),
            "cd\n"
        );
    }

    #[test]
    fn begin_and_end_order() {
        assert_eq!(
            run("END{print \"end\"} BEGIN{print \"begin\"} {print}", "mid\n"),
            "begin\nmid\nend\n"
        );
        // The record is assigned before the EOF verdict, so END blocks see
        // the cleared record.
        assert_eq!(run("END{print \"[\" $0 \"]\"}", "a\nlast b\n"), "[]\n");
    }

    #[test]
    fn patterns() {
        assert_eq!(run("/b/", "a\nb\nab\n"), "b\nab\n");
        assert_eq!(run("NR == 2", "a\nb\nc\n"), "b\n");
        assert_eq!(run("$1 > 2 {print $1}", "1\n5\n2\n7\n"), "5\n7\n");
        assert_eq!(run("!/b/", "a\nb\n"), "a\n");
    }

    #[test]
    fn range_patterns() {
        assert_eq!(
            run("/start/, /stop/", "a\nstart\nb\nstop\nc\n"),
            "start\nb\nstop\n"
        );
        // Re-activates on a later start.
        assert_eq!(
            run("NR == 1, /x/", "a\nx\nb\nc\n"),
            "a\nx\n"
        );
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run("BEGIN{print 1 + 2 * 3}", ""), "7\n");
        assert_eq!(run("BEGIN{print 2 ^ 3 ^ 2}", ""), "512\n");
        assert_eq!(run("BEGIN{print -2 ^ 2}", ""), "-4\n");
        assert_eq!(run("BEGIN{print 7 % 3}", ""), "1\n");
        assert_eq!(run("BEGIN{print 1 \" \" 2 3}", ""), "1 23\n");
        assert_eq!(run("BEGIN{print 10 / 4}", ""), "2.5\n");
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(run("BEGIN{print (1 < 2), (2 <= 1), (\"a\" < \"b\")}", ""), "1 0 1\n");
        assert_eq!(run("BEGIN{print (1 && 2), (0 || 3), !1}", ""), "1 1 0\n");
        assert_eq!(run("BEGIN{print 1 ? \"y\" : \"n\"}", ""), "y\n");
        // Numeric-looking fields compare numerically.
        assert_eq!(run("$1 == 0.5 {print \"eq\"}", "0.50\n"), "eq\n");
        // But a string constant forces string comparison.
        assert_eq!(run("$1 == \"0.5\" {print \"eq\"}", "0.50\n"), "");
    }

    #[test]
    fn control_flow() {
        assert_eq!(
            run("BEGIN{for (i = 0; i < 5; i++) s = s i; print s}", ""),
            "01234\n"
        );
        assert_eq!(
            run("BEGIN{i = 0; while (i < 3) {print i; i++}}", ""),
            "0\n1\n2\n"
        );
        assert_eq!(
            run("BEGIN{i = 0; do {print i; i++} while (i < 2)}", ""),
            "0\n1\n"
        );
        assert_eq!(
            run(
                "BEGIN{for (i = 0; i < 10; i++) {if (i == 1) continue; if (i == 3) break; print i}}",
                ""
            ),
            "0\n2\n"
        );
    }

    #[test]
    fn next_statement() {
        assert_eq!(
            run("/skip/ {next} {print}", "a\nskip\nb\n"),
            "a\nb\n"
        );
    }

    #[test]
    fn arrays() {
        assert_eq!(
            run("BEGIN{a[\"x\"] = 1; a[\"y\"] = 2; print a[\"x\"] + a[\"y\"]}", ""),
            "3\n"
        );
        assert_eq!(
            run("BEGIN{a[1, 2] = \"v\"; print a[1, 2]}", ""),
            "v\n"
        );
        assert_eq!(
            run("BEGIN{a[1] = 1; delete a[1]; print (1 in a)}", ""),
            "0\n"
        );
        assert_eq!(
            run("BEGIN{a[1] = 1; print (1 in a), (2 in a), ((1, 2) in a)}", ""),
            "1 0 0\n"
        );
        // for-in visits every key.
        assert_eq!(
            run("BEGIN{a[1] = a[2] = a[3] = 1; n = 0; for (k in a) n++; print n}", ""),
            "3\n"
        );
    }

    #[test]
    fn user_functions() {
        assert_eq!(
            run("function add(a, b) {return a + b} BEGIN{print add(40, 2)}", ""),
            "42\n"
        );
        // Locals shadow globals; extra parameters start fresh.
        assert_eq!(
            run(
                "function f(a, b) {a += 10; b = a; return b}
                 BEGIN{a = 1; print f(5), a, b}",
                ""
            ),
            "15 1 \n"
        );
        // Fewer arguments than parameters leave fresh assignable cells.
        assert_eq!(
            run(
                "function join(a, b, c, arr) {arr[0] = a; arr[1] = b; for (i in arr) c += arr[i]; return c}
                 BEGIN{print join(3, 5)}",
                ""
            ),
            "8\n"
        );
        // Arrays pass by reference.
        assert_eq!(
            run(
                "function bump(arr) {arr[0]++}
                 BEGIN{a[0] = 5; bump(a); print a[0]}",
                ""
            ),
            "6\n"
        );
        // Recursion.
        assert_eq!(
            run(
                "function fib(n) {return n < 2 ? n : fib(n - 1) + fib(n - 2)}
                 BEGIN{print fib(10)}",
                ""
            ),
            "55\n"
        );
    }

    #[test]
    fn uninitialised_values() {
        assert_eq!(run("BEGIN{print x, x + 1, length(x)}", ""), " 1 0\n");
        assert_eq!(run("BEGIN{if (x) print \"t\"; else print \"f\"}", ""), "f\n");
    }

    #[test]
    fn getline_variants() {
        // Plain getline advances the record and NR.
        assert_eq!(
            run("NR == 1 {getline; print NR, $0}", "a\nb\nc\n"),
            "2 b\n"
        );
        // getline var leaves $0 alone.
        assert_eq!(
            run("NR == 1 {getline x; print x, $0}", "a\nb\n"),
            "b a\n"
        );
    }

    #[test]
    fn getline_missing_file_is_minus_one() {
        assert_eq!(
            run("BEGIN{print (getline < \"/definitely/not/here\")}", ""),
            "-1\n"
        );
    }

    #[test]
    fn printf_statement() {
        assert_eq!(
            run("BEGIN{printf \"%d-%s|\", 4, \"x\"; printf \"%05.1f\\n\", 3.14159}", ""),
            "4-x|003.1\n"
        );
        assert_eq!(
            run("BEGIN{printf(\"%c%c\\n\", \"hi\", 66)}", ""),
            "hB\n"
        );
    }

    #[test]
    fn string_builtins() {
        assert_eq!(run("BEGIN{print length(\"héllo\")}", ""), "5\n");
        assert_eq!(run("BEGIN{print index(\"hello\", \"ll\")}", ""), "3\n");
        assert_eq!(run("BEGIN{print index(\"hello\", \"\")}", ""), "1\n");
        assert_eq!(run("BEGIN{print substr(\"hello\", 2, 3)}", ""), "ell\n");
        assert_eq!(run("BEGIN{print substr(\"hello\", -1, 2)}", ""), "he\n");
        assert_eq!(run("BEGIN{print substr(\"hello\", 4)}", ""), "lo\n");
        assert_eq!(run("BEGIN{print toupper(\"up\"), tolower(\"DOWN\")}", ""), "UP down\n");
        assert_eq!(
            run("BEGIN{print sprintf(\"%x\", 255)}", ""),
            "ff\n"
        );
    }

    #[test]
    fn math_builtins() {
        assert_eq!(run("BEGIN{print int(3.9), int(-3.9)}", ""), "3 -3\n");
        assert_eq!(run("BEGIN{print sqrt(16), exp(0), log(1)}", ""), "4 1 0\n");
        assert_eq!(run("BEGIN{print atan2(0, 1), sin(0), cos(0)}", ""), "0 0 1\n");
    }

    #[test]
    fn rand_is_deterministic() {
        let (first, _) = run_args("BEGIN{srand(7); print rand(), rand()}", "", &[]);
        let (second, _) = run_args("BEGIN{srand(7); print rand(), rand()}", "", &[]);
        assert_eq!(first, second);
        assert_eq!(run("BEGIN{print srand(2)}", ""), "1\n");
    }

    #[test]
    fn split_builtin() {
        assert_eq!(
            run("BEGIN{n = split(\"a:b:c\", parts, \":\"); print n, parts[1], parts[3]}", ""),
            "3 a c\n"
        );
        // split clears stale entries.
        assert_eq!(
            run("BEGIN{parts[9] = \"old\"; split(\"a b\", parts); print (9 in parts)}", ""),
            "0\n"
        );
        assert_eq!(
            run("BEGIN{n = split(\"ab1cd2ef\", v, /[0-9]/); print n, v[2]}", ""),
            "3 cd\n"
        );
    }

    #[test]
    fn sub_and_gsub() {
        assert_eq!(
            run("{sub(/o/, \"0\"); print}", "foo boo\n"),
            "f0o boo\n"
        );
        assert_eq!(
            run("{n = gsub(/o/, \"0\"); print n, $0}", "foo boo\n"),
            "4 f00 b00\n"
        );
        assert_eq!(
            run("BEGIN{s = \"aaa\"; gsub(/a/, \"[&]\", s); print s}", ""),
            "[a][a][a]\n"
        );
        assert_eq!(
            run("BEGIN{s = \"aaa\"; gsub(/a/, \"[\\\\&]\", s); print s}", ""),
            "[&][&][&]\n"
        );
        assert_eq!(
            run("BEGIN{s = \"x\"; n = gsub(/y/, \"z\", s); print n, s}", ""),
            "0 x\n"
        );
        // Writing back into a field rebuilds the record.
        assert_eq!(
            run("{gsub(/b/, \"B\", $2); print}", "ab bb cb\n"),
            "ab BB cb\n"
        );
    }

    #[test]
    fn match_builtin_sets_rstart_rlength() {
        assert_eq!(
            run("BEGIN{print match(\"abcdef\", /cd/), RSTART, RLENGTH}", ""),
            "3 3 2\n"
        );
        assert_eq!(
            run("BEGIN{print match(\"abc\", /x/), RSTART, RLENGTH}", ""),
            "0 0 -1\n"
        );
    }

    #[test]
    fn regex_match_operators() {
        assert_eq!(run("$0 ~ /lo/ {print \"y\"}", "hello\n"), "y\n");
        assert_eq!(run("$2 !~ /x/ {print \"clean\"}", "a b\n"), "clean\n");
        // Dynamic regex from a string.
        assert_eq!(run("BEGIN{if (\"abc\" ~ \"b+\") print \"m\"}", ""), "m\n");
    }

    #[test]
    fn output_separators() {
        assert_eq!(
            run("BEGIN{OFS=\"-\"; ORS=\"|\"} {print $1, $2}", "a b\nc d\n"),
            "a-b|c-d|"
        );
        assert_eq!(
            run("BEGIN{ORS=\"\"} {print}", "a\nb\n"),
            "ab"
        );
    }

    #[test]
    fn ofmt_and_convfmt() {
        assert_eq!(run("BEGIN{OFMT=\"%.2g\"; print 3.14159}", ""), "3.1\n");
        assert_eq!(run("BEGIN{CONVFMT=\"%.2g\"; x = 3.14159 \"\"; print x}", ""), "3.1\n");
        // Integral values bypass the conversion format.
        assert_eq!(run("BEGIN{OFMT=\"%.2g\"; print 123456}", ""), "123456\n");
    }

    #[test]
    fn record_separator() {
        assert_eq!(run("BEGIN{RS=\";\"} {print NR, $0}", "a;b;c"), "1 a\n2 b\n3 c\n");
        // Paragraph mode.
        assert_eq!(
            run("BEGIN{RS=\"\"} {print NR, $1, $3}", "a b\nc d\n\n\ne f\ng\n"),
            "1 a c\n2 e g\n"
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(run_args("BEGIN{exit}", "", &[]).1, 0);
        assert_eq!(run_args("BEGIN{exit 2}", "", &[]).1, 2);
        assert_eq!(run_args("BEGIN{exit 257}", "", &[]).1, 257);
        // exit still runs END, and a second exit overrides the code.
        let (out, code) = run_args("BEGIN{exit 2} END{print \"end\"}", "", &[]);
        assert_eq!((out.as_str(), code), ("end\n", 2));
        let (out, code) = run_args("BEGIN{exit 2} END{print \"end\"; exit 3}", "", &[]);
        assert_eq!((out.as_str(), code), ("end\n", 3));
    }

    #[test]
    fn exit_skips_records() {
        let (out, code) = run_args("NR == 1 {print; exit 5} {print \"unreached\"}", "a\nb\n", &[]);
        assert_eq!((out.as_str(), code), ("a\n", 5));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(run_err("BEGIN{print 1 / 0}", ""), EvaluationError::BadDivisor);
        assert_eq!(run_err("BEGIN{x = 1; x /= 0}", ""), EvaluationError::BadDivisor);
        assert_eq!(run_err("BEGIN{x = 1; x %= 0}", ""), EvaluationError::BadDivisor);
    }

    #[test]
    fn misplaced_jumps_are_errors() {
        assert_eq!(
            run_err("BEGIN{break}", ""),
            EvaluationError::Jump(Jump::Break)
        );
        assert_eq!(format!("{}", run_err("BEGIN{break}", "")), "bad break");
    }

    #[test]
    fn command_line_assignments() {
        // Assignments take effect when their ARGV slot is reached.
        let (out, _) = run_args(
            "BEGIN{x = 0; print x; getline; print x, $0}",
            "hello\ngoodbye\n",
            &["x=1", "x=2", "x=3"],
        );
        assert_eq!(out, "0\n3 hello\n");
    }

    #[test]
    fn assignments_unescape() {
        let (out, _) = run_args("BEGIN{getline; print v}", "x\n", &["v=a\\tb"]);
        assert_eq!(out, "a\tb\n");
    }

    #[test]
    fn environ_array() {
        let tokens = Lexer::lex("BEGIN{print ENVIRON[\"FOO\"]}").unwrap();
        let prog = parser::parse_program(tokens).unwrap();
        let mut out = Vec::new();
        let stdin = Box::new(Cursor::new(Vec::new()));
        let mut rt = Runtime::new(
            prog,
            vec!["hawk".to_owned()],
            vec![("FOO".to_owned(), "bar".to_owned())],
            stdin,
            &mut out,
        )
        .unwrap();
        rt.execute().unwrap();
        drop(rt);
        assert_eq!(String::from_utf8(out).unwrap(), "bar\n");
    }

    #[test]
    fn nextfile_moves_on() {
        use std::io::Write as _;
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, content) in &[("f0", "a\nb\n"), ("f1", "c\n")] {
            let path = dir.path().join(name);
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(content.as_bytes()).unwrap();
            paths.push(path.to_string_lossy().into_owned());
        }
        let (out, _) = run_args(
            "FNR == 1 {nextfile} {print}",
            "",
            &[&paths[0], &paths[1]],
        );
        // The first record of each file is skipped past via nextfile; the
        // remaining items still ran on the current record, so nothing from
        // f0 after line one is read.
        assert_eq!(out, "a\nc\n");
    }

    #[test]
    fn per_file_counters() {
        use std::io::Write as _;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f0");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"foo\nbar\n").unwrap();
        let p = path.to_string_lossy().into_owned();
        let (out, _) = run_args("{print NR, FNR, $0}", "", &[&p, &p]);
        assert_eq!(out, "1 1 foo\n2 2 bar\n3 1 foo\n4 2 bar\n");
    }
}
