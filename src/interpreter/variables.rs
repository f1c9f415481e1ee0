//! The symbol table: globals, special variables, and function-call frames.
use crate::{errors::EvaluationError, interpreter::value::Value, parser::ast::AssignType};
use std::collections::{hash_map::Entry, HashMap};

/// What a name is bound to. Arrays and scalars are mutually exclusive;
/// an uninitialised binding can still become either.
#[derive(Clone, Debug, PartialEq)]
pub enum VariableValue {
    Uninitialised,
    Scalar(Value),
    Array(HashMap<String, Value>),
}

/// One user-function activation. Only the parameters live here; everything
/// else resolves to the globals. `links` records array parameters that must
/// be written back to the caller's binding on return.
#[derive(Debug, Default)]
pub struct Frame {
    pub locals: HashMap<String, VariableValue>,
    pub links: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct Variables {
    globals: HashMap<String, VariableValue>,
    frames: Vec<Frame>,
}

impl Variables {
    pub fn new() -> Variables {
        let mut vars = Variables {
            globals: HashMap::new(),
            frames: Vec::new(),
        };
        for (name, value) in &[
            ("CONVFMT", "%.6g"),
            ("OFMT", "%.6g"),
            ("FS", " "),
            ("OFS", " "),
            ("ORS", "\n"),
            ("RS", "\n"),
            ("SUBSEP", "\x1c"),
            ("FILENAME", ""),
        ] {
            vars.globals.insert(
                (*name).to_owned(),
                VariableValue::Scalar(Value::StrNum((*value).to_owned())),
            );
        }
        for name in &["NR", "FNR", "NF", "RSTART"] {
            vars.globals.insert(
                (*name).to_owned(),
                VariableValue::Scalar(Value::Number(0.0)),
            );
        }
        vars
    }

    pub fn seed_environ<I: IntoIterator<Item = (String, String)>>(&mut self, environ: I) {
        let map = environ
            .into_iter()
            .map(|(k, v)| (k, Value::StrNum(v)))
            .collect();
        self.globals
            .insert("ENVIRON".to_owned(), VariableValue::Array(map));
    }

    pub fn seed_argv(&mut self, argv: &[String]) {
        let map = argv
            .iter()
            .enumerate()
            .map(|(i, a)| (i.to_string(), Value::StrNum(a.clone())))
            .collect();
        self.globals
            .insert("ARGV".to_owned(), VariableValue::Array(map));
        self.globals.insert(
            "ARGC".to_owned(),
            VariableValue::Scalar(Value::Number(argv.len() as f64)),
        );
    }

    /// The raw string form of a scalar, without number formatting. Used for
    /// the format and separator variables.
    fn raw(&self, name: &str, default: &str) -> String {
        match self.lookup(name) {
            Some(VariableValue::Scalar(Value::String(s)))
            | Some(VariableValue::Scalar(Value::StrNum(s))) => s.clone(),
            Some(VariableValue::Scalar(Value::Number(n))) => format!("{}", n),
            _ => default.to_owned(),
        }
    }

    pub fn convfmt(&self) -> String {
        self.raw("CONVFMT", "%.6g")
    }

    pub fn ofmt(&self) -> String {
        self.raw("OFMT", "%.6g")
    }

    pub fn fs(&self) -> String {
        self.raw("FS", " ")
    }

    pub fn rs(&self) -> String {
        self.raw("RS", "\n")
    }

    pub fn ofs(&self) -> String {
        self.raw("OFS", " ")
    }

    pub fn ors(&self) -> String {
        self.raw("ORS", "\n")
    }

    pub fn subsep(&self) -> String {
        self.raw("SUBSEP", "\x1c")
    }

    pub fn get_number(&self, name: &str) -> f64 {
        match self.lookup(name) {
            Some(VariableValue::Scalar(v)) => v.as_number(),
            _ => 0.0,
        }
    }

    fn lookup(&self, name: &str) -> Option<&VariableValue> {
        if let Some(frame) = self.frames.last() {
            if let Some(value) = frame.locals.get(name) {
                return Some(value);
            }
        }
        self.globals.get(name)
    }

    fn scope_mut(&mut self, name: &str) -> &mut HashMap<String, VariableValue> {
        let local = self
            .frames
            .last()
            .map_or(false, |f| f.locals.contains_key(name));
        match self.frames.last_mut() {
            Some(frame) if local => &mut frame.locals,
            _ => &mut self.globals,
        }
    }

    /// Reads a name in scalar context.
    pub fn get_scalar(&self, name: &str) -> Result<Value, EvaluationError> {
        match self.lookup(name) {
            Some(VariableValue::Array(..)) => Err(EvaluationError::UseArrayInScalarContext),
            Some(VariableValue::Scalar(value)) => Ok(value.clone()),
            Some(VariableValue::Uninitialised) | None => Ok(Value::Uninitialised),
        }
    }

    /// Writes a name in scalar context, applying a compound operator.
    pub fn set_scalar(
        &mut self,
        ty: AssignType,
        name: &str,
        value: Value,
    ) -> Result<Value, EvaluationError> {
        let scope = self.scope_mut(name);
        match scope.entry(name.to_owned()) {
            Entry::Occupied(mut entry) => {
                let current = match entry.get() {
                    VariableValue::Array(..) => {
                        return Err(EvaluationError::UseArrayInScalarContext);
                    },
                    VariableValue::Scalar(value) => value.clone(),
                    VariableValue::Uninitialised => Value::Uninitialised,
                };
                let result = Value::compute(ty, current, value)?;
                entry.insert(VariableValue::Scalar(result.clone()));
                Ok(result)
            },
            Entry::Vacant(entry) => {
                let result = Value::compute(ty, Value::Uninitialised, value)?;
                entry.insert(VariableValue::Scalar(result.clone()));
                Ok(result)
            },
        }
    }

    /// Reads `name[key]`, creating the element like a real reference does.
    pub fn get_array_element(
        &mut self,
        name: &str,
        key: &str,
    ) -> Result<Value, EvaluationError> {
        let scope = self.scope_mut(name);
        let binding = scope
            .entry(name.to_owned())
            .or_insert(VariableValue::Uninitialised);
        if let VariableValue::Uninitialised = binding {
            *binding = VariableValue::Array(HashMap::new());
        }
        match binding {
            VariableValue::Scalar(..) => Err(EvaluationError::UseScalarAsArray),
            VariableValue::Array(array) => Ok(array
                .entry(key.to_owned())
                .or_insert(Value::Uninitialised)
                .clone()),
            VariableValue::Uninitialised => unreachable!(),
        }
    }

    pub fn set_array_element(
        &mut self,
        ty: AssignType,
        name: &str,
        key: &str,
        value: Value,
    ) -> Result<Value, EvaluationError> {
        let scope = self.scope_mut(name);
        let binding = scope
            .entry(name.to_owned())
            .or_insert(VariableValue::Uninitialised);
        if let VariableValue::Uninitialised = binding {
            *binding = VariableValue::Array(HashMap::new());
        }
        match binding {
            VariableValue::Scalar(..) => Err(EvaluationError::UseScalarAsArray),
            VariableValue::Array(array) => {
                let current = array.remove(key).unwrap_or(Value::Uninitialised);
                let result = Value::compute(ty, current, value)?;
                array.insert(key.to_owned(), result.clone());
                Ok(result)
            },
            VariableValue::Uninitialised => unreachable!(),
        }
    }

    pub fn array_contains(&self, name: &str, key: &str) -> Result<bool, EvaluationError> {
        match self.lookup(name) {
            Some(VariableValue::Scalar(..)) => Err(EvaluationError::UseScalarAsArray),
            Some(VariableValue::Array(array)) => Ok(array.contains_key(key)),
            _ => Ok(false),
        }
    }

    pub fn array_keys(&self, name: &str) -> Result<Vec<String>, EvaluationError> {
        match self.lookup(name) {
            Some(VariableValue::Scalar(..)) => Err(EvaluationError::UseScalarAsArray),
            Some(VariableValue::Array(array)) => Ok(array.keys().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn array_len(&self, name: &str) -> Result<Option<usize>, EvaluationError> {
        match self.lookup(name) {
            Some(VariableValue::Array(array)) => Ok(Some(array.len())),
            _ => Ok(None),
        }
    }

    pub fn array_clear(&mut self, name: &str) -> Result<(), EvaluationError> {
        let scope = self.scope_mut(name);
        match scope.entry(name.to_owned()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                VariableValue::Scalar(..) => Err(EvaluationError::UseScalarAsArray),
                VariableValue::Array(array) => {
                    array.clear();
                    Ok(())
                },
                VariableValue::Uninitialised => {
                    entry.insert(VariableValue::Array(HashMap::new()));
                    Ok(())
                },
            },
            Entry::Vacant(entry) => {
                entry.insert(VariableValue::Array(HashMap::new()));
                Ok(())
            },
        }
    }

    pub fn delete(&mut self, name: &str, key: &str) -> Result<(), EvaluationError> {
        let scope = self.scope_mut(name);
        match scope.get_mut(name) {
            Some(VariableValue::Scalar(..)) => Err(EvaluationError::UseScalarAsArray),
            Some(VariableValue::Array(array)) => {
                array.remove(key);
                Ok(())
            },
            _ => Ok(()),
        }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pops the frame and copies linked array parameters back into the
    /// caller's scope, which is how arrays behave as reference arguments.
    pub fn pop_frame(&mut self) {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return,
        };
        for (param, target) in frame.links {
            if let Some(VariableValue::Array(array)) = frame.locals.get(&param) {
                let scope = self.scope_mut(&target);
                scope.insert(target, VariableValue::Array(array.clone()));
            }
        }
    }

    /// Joins subscript strings with SUBSEP into one array key.
    pub fn subscript_key(&self, parts: Vec<String>) -> String {
        parts.join(&self.subsep())
    }
}
