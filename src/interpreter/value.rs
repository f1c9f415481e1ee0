//! The dual-typed scalar value and its lazy coercions.
use crate::{
    errors::EvaluationError,
    interpreter::fmt,
    parser::ast::{AssignType, CmpOperator},
};
use lazy_static::lazy_static;
use regex::Regex;

/// A scalar cell. Strings remember where they came from: `String` is a
/// "pure" string (literals and string-returning builtins) and always
/// compares lexicographically, while `StrNum` arrived from input and
/// compares numerically when it looks like a number.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Uninitialised,
    Number(f64),
    String(String),
    StrNum(String),
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Number(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Value {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Number(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Number(if value { 1.0 } else { 0.0 })
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_owned())
    }
}

lazy_static! {
    /// The numeric prefix recognized when coercing a string to a number.
    static ref NUM_PREFIX: Regex = Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?").unwrap();
}

/// Formats a number the way the engine prints scalars: integral doubles
/// keep their full precision, everything else goes through the conversion
/// format (`CONVFMT` or `OFMT`).
pub fn format_number(n: f64, conv: &str) -> String {
    if n == n.trunc() {
        format!("{}", n)
    } else {
        fmt::sprintf(conv, &[Value::Number(n)], conv).unwrap_or_default()
    }
}

impl Value {
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Uninitialised => 0.0,
            Value::Number(n) => *n,
            Value::String(s) | Value::StrNum(s) => match NUM_PREFIX.find(s) {
                Some(m) => m.as_str().parse().unwrap_or(0.0),
                None => 0.0,
            },
        }
    }

    pub fn as_string(&self, conv: &str) -> String {
        match self {
            Value::Uninitialised => String::new(),
            Value::Number(n) => format_number(*n, conv),
            Value::String(s) | Value::StrNum(s) => s.clone(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Uninitialised => false,
            Value::Number(n) => *n != 0.0,
            Value::String(s) | Value::StrNum(s) => !s.is_empty(),
        }
    }

    /// True when comparisons must be lexicographic.
    pub fn is_string(&self) -> bool {
        match self {
            Value::String(..) => true,
            Value::StrNum(s) => s.parse::<f64>().is_err(),
            _ => false,
        }
    }

    pub fn compare(op: CmpOperator, a: &Value, b: &Value, conv: &str) -> Value {
        let res = if a.is_string() || b.is_string() {
            op.compare(&a.as_string(conv), &b.as_string(conv))
        } else {
            op.compare(&a.as_number(), &b.as_number())
        };
        Value::from(res)
    }

    /// Applies a compound-assignment operator to the current value.
    pub fn compute(ty: AssignType, a: Value, b: Value) -> Result<Value, EvaluationError> {
        match ty {
            AssignType::Normal => Ok(b),
            AssignType::Pow => Ok(Value::from(a.as_number().powf(b.as_number()))),
            AssignType::Mul => Ok(Value::from(a.as_number() * b.as_number())),
            AssignType::Add => Ok(Value::from(a.as_number() + b.as_number())),
            AssignType::Sub => Ok(Value::from(a.as_number() - b.as_number())),
            AssignType::Div => {
                let divisor = b.as_number();
                if divisor == 0.0 {
                    return Err(EvaluationError::BadDivisor);
                }
                Ok(Value::from(a.as_number() / divisor))
            },
            AssignType::Mod => {
                let divisor = b.as_number();
                if divisor == 0.0 {
                    return Err(EvaluationError::BadDivisor);
                }
                Ok(Value::from(a.as_number() % divisor))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONV: &str = "%.6g";

    #[test]
    fn numeric_prefix_coercion() {
        assert_eq!(Value::StrNum("42abc".to_owned()).as_number(), 42.0);
        assert_eq!(Value::StrNum("-1.5x".to_owned()).as_number(), -1.5);
        assert_eq!(Value::StrNum("abc".to_owned()).as_number(), 0.0);
        assert_eq!(Value::Uninitialised.as_number(), 0.0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(Value::Number(16.0).as_string(CONV), "16");
        assert_eq!(Value::Number(-3.0).as_string(CONV), "-3");
        assert_eq!(Value::Number(0.5).as_string(CONV), "0.5");
        assert_eq!(Value::Number(1.0 / 3.0).as_string(CONV), "0.333333");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Uninitialised.as_bool());
        assert!(!Value::Number(0.0).as_bool());
        assert!(Value::Number(0.5).as_bool());
        // Any non-empty string value is true, even "0".
        assert!(Value::StrNum("0".to_owned()).as_bool());
        assert!(!Value::StrNum(String::new()).as_bool());
    }

    #[test]
    fn comparisons() {
        // Numeric-looking input strings compare numerically.
        let res = Value::compare(
            CmpOperator::LessThan,
            &Value::StrNum("9".to_owned()),
            &Value::StrNum("10".to_owned()),
            CONV,
        );
        assert_eq!(res, Value::from(true));
        // A pure string forces lexicographic comparison.
        let res = Value::compare(
            CmpOperator::LessThan,
            &Value::String("9".to_owned()),
            &Value::StrNum("10".to_owned()),
            CONV,
        );
        assert_eq!(res, Value::from(false));
        // An empty input field is a string, not a zero.
        let res = Value::compare(
            CmpOperator::Equal,
            &Value::StrNum(String::new()),
            &Value::Number(0.0),
            CONV,
        );
        assert_eq!(res, Value::from(false));
    }

    #[test]
    fn compute_operators() {
        let v = Value::compute(AssignType::Add, Value::from(40.0), Value::from(2.0)).unwrap();
        assert_eq!(v, Value::from(42.0));
        let v = Value::compute(AssignType::Pow, Value::from(2.0), Value::from(10.0)).unwrap();
        assert_eq!(v, Value::from(1024.0));
        let err = Value::compute(AssignType::Div, Value::from(1.0), Value::from(0.0)).unwrap_err();
        assert_eq!(err, EvaluationError::BadDivisor);
        let err = Value::compute(AssignType::Mod, Value::from(1.0), Value::from(0.0)).unwrap_err();
        assert_eq!(err, EvaluationError::BadDivisor);
    }
}
