//! Structural validation of object outputs against a JSON Schema.
//!
//! The engine only needs `valid` plus a list of human-readable errors, so the
//! validator sits behind a small trait and any schema library can back it.

use serde_json::Value;

/// Outcome of checking one value against a schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl SchemaOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Checks a value against a schema document
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, schema: &Value, instance: &Value) -> SchemaOutcome;
}

/// [`SchemaValidator`] backed by the `jsonschema` crate (draft auto-detected)
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, instance: &Value) -> SchemaOutcome {
        let validator = match jsonschema::validator_for(schema) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Schema does not compile: {}", e);
                return SchemaOutcome::invalid(vec![format!("invalid schema: {}", e)]);
            }
        };

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{} {}", path, e)
                }
            })
            .collect();

        if errors.is_empty() {
            SchemaOutcome::valid()
        } else {
            SchemaOutcome::invalid(errors)
        }
    }
}
