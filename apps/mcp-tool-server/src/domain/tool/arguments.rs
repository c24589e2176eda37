//! Argument checking and coercion against a tool's parameter list.
//!
//! Coercion is narrow: numeric strings become numbers and
//! `"true"`/`"false"` become booleans. Nothing becomes a string.

use serde_json::{Map, Number, Value};

use super::descriptor::{ParamSpec, ParamType};
use crate::domain::market::TradingDate;

/// Arguments that passed schema validation, defaults filled in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    /// Check raw call arguments against a parameter list.
    ///
    /// `None` and `null` are treated as an empty object.
    pub fn coerce(params: &[ParamSpec], raw: Option<Value>) -> Result<Self, ValidationError> {
        let mut supplied = match raw {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ValidationError::NotAnObject {
                    found: json_kind(&other),
                });
            }
        };

        if let Some(unknown) = supplied
            .keys()
            .find(|key| !params.iter().any(|p| &p.name == *key))
        {
            return Err(ValidationError::UnknownArgument(unknown.clone()));
        }

        let mut values = Map::new();
        for spec in params {
            match supplied.remove(&spec.name) {
                Some(Value::Null) | None => {
                    if spec.required {
                        return Err(ValidationError::MissingArgument(spec.name.clone()));
                    }
                    if let Some(default) = &spec.default {
                        values.insert(spec.name.clone(), default.clone());
                    }
                }
                Some(value) => {
                    values.insert(spec.name.clone(), coerce_value(spec, value)?);
                }
            }
        }

        Ok(Self { values })
    }

    /// Get a raw argument value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Get a string argument.
    pub fn string(&self, name: &str) -> Result<&str, ValidationError> {
        match self.values.get(name) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(ValidationError::WrongType {
                name: name.to_string(),
                expected: "string",
                found: json_kind(other),
            }),
            None => Err(ValidationError::MissingArgument(name.to_string())),
        }
    }

    /// Get an integer argument.
    pub fn integer(&self, name: &str) -> Result<i64, ValidationError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ValidationError::MissingArgument(name.to_string()))?;
        value.as_i64().ok_or_else(|| ValidationError::WrongType {
            name: name.to_string(),
            expected: "integer",
            found: json_kind(value),
        })
    }

    /// Get a boolean argument.
    pub fn boolean(&self, name: &str) -> Result<bool, ValidationError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ValidationError::MissingArgument(name.to_string()))?;
        value.as_bool().ok_or_else(|| ValidationError::WrongType {
            name: name.to_string(),
            expected: "boolean",
            found: json_kind(value),
        })
    }

    /// Number of arguments present after defaults.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no arguments are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn coerce_value(spec: &ParamSpec, value: Value) -> Result<Value, ValidationError> {
    let wrong_type = |value: &Value| ValidationError::WrongType {
        name: spec.name.clone(),
        expected: spec.param_type.json_type(),
        found: json_kind(value),
    };

    match spec.param_type {
        ParamType::String => match value {
            Value::String(_) => Ok(value),
            other => Err(wrong_type(&other)),
        },
        ParamType::Date => match &value {
            Value::String(s) => TradingDate::parse(s)
                .map(|date| Value::String(date.to_string()))
                .map_err(|e| ValidationError::InvalidValue {
                    name: spec.name.clone(),
                    reason: e.to_string(),
                }),
            other => Err(wrong_type(other)),
        },
        ParamType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n.clone())),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| Value::from(f as i64))
                .ok_or_else(|| wrong_type(&value)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| wrong_type(&value)),
            other => Err(wrong_type(other)),
        },
        ParamType::Number => match &value {
            Value::Number(n) => Ok(Value::Number(n.clone())),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| wrong_type(&value)),
            other => Err(wrong_type(other)),
        },
        ParamType::Boolean => match &value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => Err(wrong_type(other)),
        },
    }
}

/// JSON type name of a value, for error messages.
#[must_use]
pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Arguments did not satisfy a tool's parameter schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Arguments were not a JSON object.
    #[error("arguments must be an object, got {found}")]
    NotAnObject {
        /// JSON type received.
        found: &'static str,
    },

    /// A required argument was missing or null.
    #[error("missing required argument `{0}`")]
    MissingArgument(String),

    /// An argument name is not in the schema.
    #[error("unknown argument `{0}`")]
    UnknownArgument(String),

    /// An argument has the wrong JSON type.
    #[error("argument `{name}` must be {expected}, got {found}")]
    WrongType {
        /// Argument name.
        name: String,
        /// Expected JSON type.
        expected: &'static str,
        /// JSON type received.
        found: &'static str,
    },

    /// An argument has the right type but an unusable value.
    #[error("argument `{name}` is invalid: {reason}")]
    InvalidValue {
        /// Argument name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Name of the offending argument, if there is one.
    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::NotAnObject { .. } => None,
            Self::MissingArgument(name)
            | Self::UnknownArgument(name)
            | Self::WrongType { name, .. }
            | Self::InvalidValue { name, .. } => Some(name),
        }
    }
}
