//! Variable catalog resolution and override merge.
//!
//! A template declares its variables; a deployment request may override any
//! of them. Overrides win and are taken **verbatim**: a user-supplied value
//! is never passed through the renderer, so text that happens to look like
//! macro syntax is stored exactly as given. Defaults, by contrast, are
//! expressions and are rendered (macros evaluated) when used.
//!
//! Unknown override keys are rejected rather than ignored; a typo'd
//! variable name should fail loudly instead of silently falling back to the
//! default.

use crate::error::{Result, StackdError};
use crate::render::{render_string, Bindings};
use crate::types::StackTemplate;
use indexmap::IndexMap;
use serde_json::Value;

/// Resolve a template's declared variables against user overrides into a
/// concrete binding set.
///
/// Resolution walks the catalog in declaration order, so a default
/// expression may reference any variable declared before it. The returned
/// map is what gets persisted on the deployment, exactly once; it is never
/// re-evaluated on read.
pub fn resolve_variables(
    template: &StackTemplate,
    overrides: &IndexMap<String, Value>,
) -> Result<Bindings> {
    for name in overrides.keys() {
        if !template.variables.contains_key(name) {
            return Err(StackdError::UnknownVariable { name: name.clone() });
        }
    }

    let mut resolved = Bindings::new();

    for (name, spec) in &template.variables {
        if let Some(value) = overrides.get(name) {
            // User override: taken literally, never rendered.
            resolved.insert(name.clone(), value.clone());
            continue;
        }

        match &spec.default {
            Some(expression) => {
                let value = render_string(expression, &resolved)?;
                resolved.insert(name.clone(), value);
            }
            None if spec.required => {
                return Err(StackdError::MissingRequiredVariable { name: name.clone() });
            }
            None => {
                // Optional with no default: absent from the binding set.
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{VariableSpec, VariableType};
    use serde_json::json;

    fn spec(var_type: VariableType, default: Option<&str>, required: bool) -> VariableSpec {
        VariableSpec {
            var_type,
            default: default.map(String::from),
            required,
            group: None,
        }
    }

    fn template(variables: Vec<(&str, VariableSpec)>) -> StackTemplate {
        StackTemplate {
            id: "tpl-1".to_string(),
            name: "postgres".to_string(),
            version: "1.0.0".to_string(),
            configuration: json!({}),
            variables: variables.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    #[test]
    fn defaults_resolve_and_macros_evaluate() {
        let tpl = template(vec![
            ("db_user", spec(VariableType::String, Some("postgres"), true)),
            (
                "db_password",
                spec(VariableType::Password, Some("{{ generate_password(24) }}"), true),
            ),
        ]);

        let resolved = resolve_variables(&tpl, &IndexMap::new()).unwrap();
        assert_eq!(resolved["db_user"], json!("postgres"));

        let password = resolved["db_password"].as_str().unwrap();
        assert_eq!(password.len(), 24);
        assert_ne!(password, "{{ generate_password(24) }}");
    }

    #[test]
    fn override_wins_and_is_stored_verbatim() {
        let tpl = template(vec![(
            "app_secret",
            spec(VariableType::Password, Some("{{ generate_secret(32) }}"), true),
        )]);

        // Macro-looking override text must never be evaluated.
        let mut overrides = IndexMap::new();
        overrides.insert("app_secret".to_string(), json!("{{ generate_password(8) }}"));

        let resolved = resolve_variables(&tpl, &overrides).unwrap();
        assert_eq!(resolved["app_secret"], json!("{{ generate_password(8) }}"));
    }

    #[test]
    fn plain_override_is_exact() {
        let tpl = template(vec![(
            "app_secret",
            spec(VariableType::Password, Some("{{ generate_secret(32) }}"), true),
        )]);

        let mut overrides = IndexMap::new();
        overrides.insert("app_secret".to_string(), json!("custom-secret-123"));

        let resolved = resolve_variables(&tpl, &overrides).unwrap();
        assert_eq!(resolved["app_secret"], json!("custom-secret-123"));
    }

    #[test]
    fn missing_required_variable_fails() {
        let tpl = template(vec![("api_key", spec(VariableType::String, None, true))]);

        let err = resolve_variables(&tpl, &IndexMap::new()).unwrap_err();
        assert!(matches!(err, StackdError::MissingRequiredVariable { ref name } if name == "api_key"));
        assert_eq!(err.kind(), "missing_required_variable");
    }

    #[test]
    fn unknown_override_key_is_rejected() {
        let tpl = template(vec![("db_user", spec(VariableType::String, Some("postgres"), true))]);

        let mut overrides = IndexMap::new();
        overrides.insert("db_usr".to_string(), json!("typo"));

        let err = resolve_variables(&tpl, &overrides).unwrap_err();
        assert!(matches!(err, StackdError::UnknownVariable { ref name } if name == "db_usr"));
    }

    #[test]
    fn optional_without_default_is_absent() {
        let tpl = template(vec![("comment", spec(VariableType::Textarea, None, false))]);

        let resolved = resolve_variables(&tpl, &IndexMap::new()).unwrap();
        assert!(!resolved.contains_key("comment"));
    }

    #[test]
    fn default_may_reference_earlier_variable() {
        let tpl = template(vec![
            ("db_name", spec(VariableType::String, Some("app"), true)),
            ("db_url", spec(VariableType::String, Some("postgres://db/{{ db_name }}"), true)),
        ]);

        let resolved = resolve_variables(&tpl, &IndexMap::new()).unwrap();
        assert_eq!(resolved["db_url"], json!("postgres://db/app"));
    }

    #[test]
    fn resolution_preserves_catalog_order() {
        let tpl = template(vec![
            ("zeta", spec(VariableType::String, Some("z"), true)),
            ("alpha", spec(VariableType::String, Some("a"), true)),
        ]);

        let resolved = resolve_variables(&tpl, &IndexMap::new()).unwrap();
        let names: Vec<&String> = resolved.keys().collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }
}
