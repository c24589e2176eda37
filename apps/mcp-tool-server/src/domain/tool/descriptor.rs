//! Tool descriptors and parameter schema.

use std::collections::HashSet;

use serde_json::{Map, Value, json};

use crate::domain::market::TradingDate;

/// Longest tool name accepted by MCP clients.
pub const MAX_TOOL_NAME_LEN: usize = 64;

// =============================================================================
// Parameter Types
// =============================================================================

/// Type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Any JSON string.
    String,
    /// Whole number.
    Integer,
    /// Any finite number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// String in `YYYY-MM-DD` form.
    Date,
}

impl ParamType {
    /// JSON Schema `type` keyword for this parameter.
    #[must_use]
    pub const fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::Date => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Whether a value already has exactly this type, with no coercion.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::String, Value::String(_)) | (Self::Boolean, Value::Bool(_)) => true,
            (Self::Date, Value::String(s)) => TradingDate::parse(s).is_ok(),
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Number, Value::Number(_)) => true,
            _ => false,
        }
    }
}

// =============================================================================
// Parameter Spec
// =============================================================================

/// One entry of a tool's ordered parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Argument name.
    pub name: String,
    /// Expected type.
    pub param_type: ParamType,
    /// Human-readable description shown to the caller.
    pub description: String,
    /// Whether the caller must supply this argument.
    pub required: bool,
    /// Value used when an optional argument is omitted.
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// An optional parameter with no default.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    /// Set the default value, making the parameter optional.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(default.into());
        self
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.param_type.json_type()));
        if self.param_type == ParamType::Date {
            schema.insert("format".into(), json!("date"));
        }
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        Value::Object(schema)
    }
}

// =============================================================================
// Tool Descriptor
// =============================================================================

/// Name, description and parameter schema of a registered tool.
///
/// Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Description shown to the caller.
    pub description: String,
    /// Parameters in declaration order.
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    /// Create a descriptor with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Check the descriptor is well formed.
    ///
    /// Does not check name uniqueness across tools; the registry does that.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if !is_valid_name(&self.name) {
            return Err(RegistrationError::InvalidName(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(RegistrationError::DuplicateParameter {
                    tool: self.name.clone(),
                    param: param.name.clone(),
                });
            }
            if param.name.is_empty() {
                return Err(RegistrationError::InvalidParameterName {
                    tool: self.name.clone(),
                });
            }
            match (&param.default, param.required) {
                (Some(_), true) => {
                    return Err(RegistrationError::DefaultOnRequired {
                        tool: self.name.clone(),
                        param: param.name.clone(),
                    });
                }
                (Some(default), false) if !param.param_type.matches(default) => {
                    return Err(RegistrationError::DefaultTypeMismatch {
                        tool: self.name.clone(),
                        param: param.name.clone(),
                        expected: param.param_type.json_type(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Render the parameters as a JSON Schema object.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TOOL_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// =============================================================================
// Errors
// =============================================================================

/// Rejected tool registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Tool name is empty, too long, or has unsupported characters.
    #[error("invalid tool name {0:?}")]
    InvalidName(String),

    /// A tool with this name is already registered.
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),

    /// A parameter name appears twice.
    #[error("tool `{tool}` declares parameter `{param}` more than once")]
    DuplicateParameter {
        /// Tool name.
        tool: String,
        /// Parameter name.
        param: String,
    },

    /// A parameter has an empty name.
    #[error("tool `{tool}` declares a parameter with an empty name")]
    InvalidParameterName {
        /// Tool name.
        tool: String,
    },

    /// A required parameter carries a default.
    #[error("tool `{tool}` parameter `{param}` is required but has a default")]
    DefaultOnRequired {
        /// Tool name.
        tool: String,
        /// Parameter name.
        param: String,
    },

    /// A default does not match the parameter type.
    #[error("tool `{tool}` parameter `{param}` default is not a valid {expected}")]
    DefaultTypeMismatch {
        /// Tool name.
        tool: String,
        /// Parameter name.
        param: String,
        /// Expected JSON type.
        expected: &'static str,
    },
}
