//! Field readers over a JSON object.
//!
//! Numbers are read coercively: form inputs and some API payloads carry
//! numeric values as strings, so `"12.5"` reads as `12.5`. The conversion
//! follows the browser's `Number(...)` rules: surrounding whitespace is
//! ignored, an empty string is `0`, `null` is `0`, booleans are `0`/`1`.

use serde_json::{Map, Value};

use super::ValidationErrors;

/// Largest integer a JSON number can carry without losing precision.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

const REQUIRED: &str = "Required";
const EXPECTED_STRING: &str = "Expected string";
const EXPECTED_BOOLEAN: &str = "Expected boolean";
const EXPECTED_NUMBER: &str = "Expected number, received nan";
const EXPECTED_INTEGER: &str = "Expected integer, received float";

/// Browser-style numeric conversion. `None` stands for NaN.
pub(crate) fn to_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().ok()?
            }
        }
        Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Exact integer conversion of an already-coerced number.
pub(crate) fn to_integer(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Some(n as i64)
    } else {
        None
    }
}

/// Reads fields out of one object, recording a message per bad field.
pub(crate) struct Checker<'a> {
    object: &'a Map<String, Value>,
    errors: ValidationErrors,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(value: &'a Value) -> Result<Self, ValidationErrors> {
        match value {
            Value::Object(object) => Ok(Self {
                object,
                errors: ValidationErrors::new(),
            }),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.push("", "Expected object");
                Err(errors)
            }
        }
    }

    pub(crate) fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(field, message);
    }

    /// Required string. A present but invalid value records the rule's message.
    pub(crate) fn string(
        &mut self,
        field: &'static str,
        rule: impl Fn(&str) -> Result<(), &'static str>,
    ) -> Option<String> {
        match self.object.get(field) {
            None | Some(Value::Null) => {
                self.fail(field, REQUIRED);
                None
            }
            Some(Value::String(s)) => match rule(s) {
                Ok(()) => Some(s.clone()),
                Err(message) => {
                    self.fail(field, message);
                    None
                }
            },
            Some(_) => {
                self.fail(field, EXPECTED_STRING);
                None
            }
        }
    }

    /// Optional string. Missing, `null` and `""` all read as absent.
    ///
    /// The outer `Option` is `None` only when an error was recorded.
    pub(crate) fn optional_string(
        &mut self,
        field: &'static str,
        rule: impl Fn(&str) -> Result<(), &'static str>,
    ) -> Option<Option<String>> {
        match self.object.get(field) {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) if s.is_empty() => Some(None),
            Some(Value::String(s)) => match rule(s) {
                Ok(()) => Some(Some(s.clone())),
                Err(message) => {
                    self.fail(field, message);
                    None
                }
            },
            Some(_) => {
                self.fail(field, EXPECTED_STRING);
                None
            }
        }
    }

    pub(crate) fn boolean(&mut self, field: &'static str) -> Option<bool> {
        match self.object.get(field) {
            Some(Value::Bool(b)) => Some(*b),
            None | Some(Value::Null) => {
                self.fail(field, REQUIRED);
                None
            }
            Some(_) => {
                self.fail(field, EXPECTED_BOOLEAN);
                None
            }
        }
    }

    pub(crate) fn number(
        &mut self,
        field: &'static str,
        rule: impl Fn(f64) -> Result<(), &'static str>,
    ) -> Option<f64> {
        let Some(n) = to_number(self.object.get(field)) else {
            self.fail(field, EXPECTED_NUMBER);
            return None;
        };
        match rule(n) {
            Ok(()) => Some(n),
            Err(message) => {
                self.fail(field, message);
                None
            }
        }
    }

    pub(crate) fn integer(
        &mut self,
        field: &'static str,
        rule: impl Fn(i64) -> Result<(), &'static str>,
    ) -> Option<i64> {
        let Some(n) = to_number(self.object.get(field)) else {
            self.fail(field, EXPECTED_NUMBER);
            return None;
        };
        let Some(i) = to_integer(n) else {
            self.fail(field, EXPECTED_INTEGER);
            return None;
        };
        match rule(i) {
            Ok(()) => Some(i),
            Err(message) => {
                self.fail(field, message);
                None
            }
        }
    }

    pub(crate) fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        self.errors.finish(build)
    }
}
