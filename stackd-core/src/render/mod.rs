//! Template rendering: placeholder substitution over configuration trees.
//!
//! A stack template's configuration is an arbitrary nested tree. Rendering
//! walks it recursively, replacing every `{{ ... }}` placeholder with either
//! a bound variable's value or the result of a generator macro, and returns
//! a fully concrete tree with no remaining placeholders.
//!
//! Rendering is pure and synchronous; it is exposed standalone (no
//! persistence) for preview and validation use by external callers.

use crate::error::{Result, StackdError};
use indexmap::IndexMap;
use serde_json::Value;

pub mod macros;
pub mod variables;

pub use macros::Macro;
pub use variables::resolve_variables;

/// Variable bindings available during a render.
pub type Bindings = IndexMap<String, Value>;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render a configuration tree against a set of variable bindings.
///
/// Maps and sequences are rendered element-wise, preserving order.
/// Non-string scalars pass through unchanged. Each placeholder occurrence is
/// rendered exactly once and independently; results are never cached or
/// reused across occurrences or calls.
pub fn render(tree: &Value, bindings: &Bindings) -> Result<Value> {
    match tree {
        Value::String(s) => render_string(s, bindings),
        Value::Array(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                rendered.push(render(item, bindings)?);
            }
            Ok(Value::Array(rendered))
        }
        Value::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                rendered.insert(key.clone(), render(value, bindings)?);
            }
            Ok(Value::Object(rendered))
        }
        other => Ok(other.clone()),
    }
}

/// Render a single scalar string.
///
/// If the entire string is exactly one placeholder, the evaluated value is
/// returned with its native type intact (a whole-field macro call keeps
/// numeric/boolean typing). Mixed content always yields a string.
pub fn render_string(s: &str, bindings: &Bindings) -> Result<Value> {
    let segments = scan(s)?;

    // Whole-string single placeholder: return the typed value unmodified.
    if let [Segment::Placeholder(expr)] = segments.as_slice() {
        return eval_expr(expr, bindings);
    }

    if segments.iter().all(|seg| matches!(seg, Segment::Literal(_))) {
        return Ok(Value::String(s.to_string()));
    }

    let mut out = String::with_capacity(s.len());
    for segment in &segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(expr) => out.push_str(&display(&eval_expr(expr, bindings)?)),
        }
    }
    Ok(Value::String(out))
}

/// One lexical piece of a scalar string.
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// Split a string into literal and placeholder segments.
fn scan(s: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = s;

    while let Some(open_idx) = rest.find(OPEN) {
        if open_idx > 0 {
            segments.push(Segment::Literal(&rest[..open_idx]));
        }
        let after_open = &rest[open_idx + OPEN.len()..];
        let close_idx = after_open.find(CLOSE).ok_or_else(|| StackdError::MacroSyntax {
            reason: format!("unterminated placeholder in '{}'", s),
        })?;
        segments.push(Segment::Placeholder(after_open[..close_idx].trim()));
        rest = &after_open[close_idx + CLOSE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// Evaluate a placeholder expression: a bare variable name or a macro call.
fn eval_expr(expr: &str, bindings: &Bindings) -> Result<Value> {
    if expr.is_empty() {
        return Err(StackdError::MacroSyntax { reason: "empty placeholder".to_string() });
    }

    if is_identifier(expr) {
        return bindings
            .get(expr)
            .cloned()
            .ok_or_else(|| StackdError::UnresolvedVariable { name: expr.to_string() });
    }

    let (name, args) = parse_call(expr)?;
    Macro::from_name(name)?.invoke(&args)
}

/// Parse `name(arg, arg, ...)` into the macro name and raw argument literals.
fn parse_call(expr: &str) -> Result<(&str, Vec<String>)> {
    let open = expr.find('(').ok_or_else(|| StackdError::MacroSyntax {
        reason: format!("expected variable name or macro call, got '{}'", expr),
    })?;

    let name = expr[..open].trim();
    if !is_identifier(name) {
        return Err(StackdError::MacroSyntax {
            reason: format!("invalid macro name '{}'", name),
        });
    }

    let rest = &expr[open + 1..];
    let close = rest.rfind(')').ok_or_else(|| StackdError::MacroSyntax {
        reason: format!("missing closing parenthesis in '{}'", expr),
    })?;
    if !rest[close + 1..].trim().is_empty() {
        return Err(StackdError::MacroSyntax {
            reason: format!("trailing characters after macro call in '{}'", expr),
        });
    }

    let inner = rest[..close].trim();
    let args = if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(|a| a.trim().to_string()).collect()
    };

    Ok((name, args))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// String representation used when interpolating into mixed content.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
