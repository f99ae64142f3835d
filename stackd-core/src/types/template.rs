//! Stack template domain types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Versioned, parameterized declaration of a multi-service deployment.
///
/// A template is immutable per version; publishing a change means publishing
/// a new version as a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackTemplate {
    /// Unique template identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Template version (a new version is a new record)
    pub version: String,

    /// Nested configuration tree, may contain `{{ ... }}` placeholders
    pub configuration: Value,

    /// Declared variables, in declaration order
    pub variables: IndexMap<String, VariableSpec>,
}

/// Declared variable within a stack template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Variable type (drives form rendering in external surfaces)
    #[serde(rename = "type")]
    pub var_type: VariableType,

    /// Default expression: a literal, or a string containing variable or
    /// macro placeholders rendered when no override is supplied
    pub default: Option<String>,

    /// Whether the variable must resolve to a value
    #[serde(default)]
    pub required: bool,

    /// Display group (opaque to the core)
    pub group: Option<String>,
}

/// Variable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Number,
    Boolean,
    Password,
    Enum,
    Textarea,
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Password => write!(f, "password"),
            Self::Enum => write!(f, "enum"),
            Self::Textarea => write!(f, "textarea"),
        }
    }
}
