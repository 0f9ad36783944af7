//! Tool parameter schema compilation and argument checking
//!
//! A [`ToolDescriptor`] is compiled once per request from a tool's JSON
//! schema and can then check arbitrary call arguments against it.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::ToolDefinition;

/// Tool types the gateway accepts
pub const SUPPORTED_TOOL_TYPES: &[&str] = &["function"];

/// Rejections raised while compiling tool definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unsupported tool type '{tool_type}' at index {index}. Supported types: {}", SUPPORTED_TOOL_TYPES.join(", "))]
    UnsupportedToolType { index: usize, tool_type: String },

    #[error("tool definition at index {index} is missing a function name")]
    MissingName { index: usize },
}

/// Value type of a declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Float,
    Integer,
    Boolean,
    /// Untyped object
    Mapping,
    /// Only `null` is accepted
    Null,
    Array(Box<ParamType>),
}

impl ParamType {
    fn from_schema(schema: &Value) -> Self {
        match schema_type_name(schema) {
            Some("number") => Self::Float,
            Some("integer") => Self::Integer,
            Some("boolean") => Self::Boolean,
            Some("object") => Self::Mapping,
            Some("null") => Self::Null,
            Some("array") => {
                let items = schema.get("items").unwrap_or(&Value::Null);
                Self::Array(Box::new(Self::from_schema(items)))
            }
            _ => Self::Text,
        }
    }

    /// Whether `value` has this type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Text, Value::String(_))
            | (Self::Float, Value::Number(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Mapping, Value::Object(_))
            | (Self::Null, Value::Null) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Array(item), Value::Array(values)) => values.iter().all(|v| item.accepts(v)),
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("string"),
            Self::Float => f.write_str("number"),
            Self::Integer => f.write_str("integer"),
            Self::Boolean => f.write_str("boolean"),
            Self::Mapping => f.write_str("object"),
            Self::Null => f.write_str("null"),
            Self::Array(item) => write!(f, "array<{item}>"),
        }
    }
}

/// `type` may be a single name or a list such as `["string", "null"]`
fn schema_type_name(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(name) => Some(name.as_str()),
        Value::Array(names) => names.iter().filter_map(Value::as_str).find(|n| *n != "null"),
        _ => None,
    }
}

fn schema_is_nullable(schema: &Value) -> bool {
    schema
        .get("type")
        .and_then(Value::as_array)
        .is_some_and(|names| names.iter().any(|n| n == "null"))
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub param_type: ParamType,
    pub required: bool,
    pub description: Option<String>,
}

/// Argument problem found by [`ToolDescriptor::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing { field: String },
    WrongType { field: String, expected: ParamType },
    Unexpected { field: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "missing required field `{field}`"),
            Self::WrongType { field, expected } => write!(f, "field `{field}` should be {expected}"),
            Self::Unexpected { field } => write!(f, "unexpected field `{field}`"),
        }
    }
}

/// Compiled, typed view of a tool's parameter schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Declared parameters in schema order
    pub params: IndexMap<String, ParamSpec>,
    /// Whether undeclared arguments pass through
    pub additional_properties: bool,
}

impl ToolDescriptor {
    /// Compile the definition at `index` of a request's tool list
    pub fn compile(index: usize, definition: &ToolDefinition) -> Result<Self, SchemaError> {
        if !SUPPORTED_TOOL_TYPES.contains(&definition.tool_type.as_str()) {
            return Err(SchemaError::UnsupportedToolType {
                index,
                tool_type: definition.tool_type.clone(),
            });
        }

        let function = &definition.function;
        if function.name.trim().is_empty() {
            return Err(SchemaError::MissingName { index });
        }

        let schema = function.parameters.as_ref().unwrap_or(&Value::Null);

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let params: IndexMap<String, ParamSpec> = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(name, property)| {
                        let spec = ParamSpec {
                            param_type: ParamType::from_schema(property),
                            required: required.contains(&name.as_str()) && !schema_is_nullable(property),
                            description: property.get("description").and_then(Value::as_str).map(str::to_owned),
                        };
                        (name.clone(), spec)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let additional_properties = schema
            .get("additionalProperties")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        Ok(Self {
            name: function.name.clone(),
            description: function.description.clone().unwrap_or_default(),
            params,
            additional_properties,
        })
    }

    /// Check call arguments, returning every violation found
    pub fn validate(&self, arguments: &Map<String, Value>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (field, spec) in &self.params {
            match arguments.get(field) {
                None | Some(Value::Null) if spec.required => violations.push(Violation::Missing { field: field.clone() }),
                None | Some(Value::Null) => {}
                Some(value) if !spec.param_type.accepts(value) => violations.push(Violation::WrongType {
                    field: field.clone(),
                    expected: spec.param_type.clone(),
                }),
                Some(_) => {}
            }
        }

        if !self.additional_properties {
            violations.extend(
                arguments
                    .keys()
                    .filter(|key| !self.params.contains_key(*key))
                    .map(|key| Violation::Unexpected { field: key.clone() }),
            );
        }

        violations
    }

    /// Fill absent optional parameters with `null`
    pub fn apply_defaults(&self, mut arguments: Map<String, Value>) -> Map<String, Value> {
        for (field, spec) in &self.params {
            if !spec.required && !arguments.contains_key(field) {
                arguments.insert(field.clone(), Value::Null);
            }
        }
        arguments
    }
}

/// Compile every tool of a request, failing on the first rejection
pub fn compile_tools(definitions: &[ToolDefinition]) -> Result<Vec<ToolDescriptor>, SchemaError> {
    definitions
        .iter()
        .enumerate()
        .map(|(index, definition)| ToolDescriptor::compile(index, definition))
        .collect()
}
