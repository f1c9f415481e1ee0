//! User-defined functions: registry and the call protocol.
use crate::{
    errors::{EvaluationError, Jump},
    interpreter::{
        value::Value,
        variables::{Frame, VariableValue},
        Eval, Runtime,
    },
    parser::ast::{Expr, ExprList, LValueType, StmtList},
};
use std::{collections::HashMap, io::Write, rc::Rc};

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<StmtList>,
}

#[derive(Debug, Default)]
pub struct Functions {
    funcs: HashMap<String, Rc<Function>>,
}

impl Functions {
    pub fn new() -> Functions {
        Functions::default()
    }

    pub fn define(
        &mut self,
        name: String,
        params: Vec<String>,
        body: Rc<StmtList>,
    ) -> Result<(), EvaluationError> {
        if self.funcs.contains_key(&name) {
            return Err(EvaluationError::RedefinedFunction(name));
        }
        self.funcs.insert(
            name.clone(),
            Rc::new(Function {
                name,
                params,
                body,
            }),
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<Function>> {
        self.funcs.get(name).cloned()
    }
}

/// How one argument is handed to the callee: scalars by value, arrays (and
/// names that may yet become arrays) by reference via a frame link.
enum ArgBinding {
    Scalar(Value),
    ArrayRef(String),
}

pub fn call<Output: Write>(
    rt: &mut Runtime<'_, Output>,
    name: &str,
    args: &ExprList,
) -> Result<Value, EvaluationError> {
    let func = match rt.funcs.get(name) {
        Some(func) => func,
        None => return Err(EvaluationError::BadFunction(name.to_owned())),
    };
    let mut bindings = Vec::with_capacity(args.len());
    for (i, arg) in args.0.iter().enumerate() {
        // Extra arguments are evaluated and discarded.
        if i >= func.params.len() {
            arg.eval(rt)?;
            continue;
        }
        match arg {
            Expr::LValue(LValueType::Name(var)) if rt.vars.get_scalar(var).is_err() => {
                // The name is bound to an array: pass it by reference.
                bindings.push(ArgBinding::ArrayRef(var.clone()));
            },
            Expr::LValue(LValueType::Name(var))
                if rt.vars.get_scalar(var) == Ok(Value::Uninitialised) =>
            {
                // Not yet committed to scalar or array; link it so the
                // callee can use it as either.
                bindings.push(ArgBinding::ArrayRef(var.clone()));
            },
            _ => bindings.push(ArgBinding::Scalar(arg.eval(rt)?)),
        }
    }
    let mut frame = Frame::default();
    for (i, param) in func.params.iter().enumerate() {
        match bindings.get_mut(i) {
            None => {
                frame
                    .locals
                    .insert(param.clone(), VariableValue::Uninitialised);
            },
            Some(ArgBinding::Scalar(value)) => {
                frame.locals.insert(
                    param.clone(),
                    VariableValue::Scalar(std::mem::replace(value, Value::Uninitialised)),
                );
            },
            Some(ArgBinding::ArrayRef(target)) => {
                let initial = match rt.vars.array_keys(target) {
                    Ok(keys) if !keys.is_empty() => {
                        let mut map = HashMap::new();
                        for key in keys {
                            map.insert(key.clone(), rt.vars.get_array_element(target, &key)?);
                        }
                        VariableValue::Array(map)
                    },
                    _ => VariableValue::Uninitialised,
                };
                frame.locals.insert(param.clone(), initial);
                frame.links.push((param.clone(), target.clone()));
            },
        }
    }
    rt.vars.push_frame(frame);
    let result = func.body.eval(rt);
    rt.vars.pop_frame();
    match result {
        Ok(()) => Ok(Value::Uninitialised),
        Err(EvaluationError::Jump(Jump::Return(value))) => Ok(value),
        Err(e) => Err(e),
    }
}
