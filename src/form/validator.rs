use std::{fmt, sync::LazyLock};

use indexmap::IndexMap;
use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{FieldPath, FieldPattern, value_at_path};

use super::error::FormError;

pub const REQUIRED_MESSAGE: &str = "Required";

static ENV_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-._a-zA-Z][-._a-zA-Z0-9]*$").expect("invalid env name pattern")
});

/// A per-field rule. `value` is `None` when the field is absent from the
/// form; `all_values` is the whole form value.
pub trait FieldValidator {
    fn validate(
        &self,
        value: Option<&Value>,
        all_values: &Value,
        form_id: &str,
        field_name: &str,
    ) -> Option<String>;
}

struct FnValidator<F>(F);

impl<F> FieldValidator for FnValidator<F>
where
    F: Fn(Option<&Value>, &Value, &str, &str) -> Option<String>,
{
    fn validate(
        &self,
        value: Option<&Value>,
        all_values: &Value,
        form_id: &str,
        field_name: &str,
    ) -> Option<String> {
        (self.0)(value, all_values, form_id, field_name)
    }
}

/// Rejects absent, null, blank and empty values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl FieldValidator for Required {
    fn validate(&self, value: Option<&Value>, _: &Value, _: &str, _: &str) -> Option<String> {
        let missing = match value {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        };
        missing.then(|| REQUIRED_MESSAGE.to_string())
    }
}

/// Kubernetes environment variable name syntax. Empty names are left to
/// [`Required`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvName;

impl FieldValidator for EnvName {
    fn validate(&self, value: Option<&Value>, _: &Value, _: &str, _: &str) -> Option<String> {
        let name = value.and_then(Value::as_str)?;
        if name.is_empty() || ENV_NAME.is_match(name) {
            return None;
        }
        Some(format!(
            "'{name}' is not a valid environment variable name: use letters, digits, '_', '-' or '.', and do not start with a digit"
        ))
    }
}

struct Registration {
    pattern: FieldPattern,
    name: String,
    validator: Box<dyn FieldValidator>,
}

/// Validators keyed by field pattern, run in registration order.
#[derive(Default)]
pub struct ValidatorRegistry {
    entries: Vec<Registration>,
    schema: Option<Validator>,
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|entry| format!("{} [{}]", entry.pattern.as_str(), entry.name))
                    .collect::<Vec<_>>(),
            )
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a whole-form JSON Schema; its errors land on the offending paths.
    pub fn with_schema(mut self, schema: &Value) -> Result<Self, FormError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|err| FormError::Schema(err.to_string()))?;
        self.schema = Some(validator);
        Ok(self)
    }

    pub fn register<V>(
        &mut self,
        pattern: &str,
        name: impl Into<String>,
        validator: V,
    ) -> Result<&mut Self, FormError>
    where
        V: FieldValidator + 'static,
    {
        self.entries.push(Registration {
            pattern: FieldPattern::parse(pattern)?,
            name: name.into(),
            validator: Box::new(validator),
        });
        Ok(self)
    }

    pub fn register_fn<F>(
        &mut self,
        pattern: &str,
        name: impl Into<String>,
        validator: F,
    ) -> Result<&mut Self, FormError>
    where
        F: Fn(Option<&Value>, &Value, &str, &str) -> Option<String> + 'static,
    {
        self.register(pattern, name, FnValidator(validator))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.schema.is_none()
    }

    /// Names of validators that apply to `path`, in run order.
    pub fn names_for(&self, path: &FieldPath) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.pattern.matches(path))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// First failure among validators registered for `path`.
    pub fn validate_field(
        &self,
        form_id: &str,
        path: &FieldPath,
        all_values: &Value,
    ) -> Option<String> {
        let value = value_at_path(all_values, path);
        let field_name = path.to_string();
        self.entries
            .iter()
            .filter(|entry| entry.pattern.matches(path))
            .find_map(|entry| {
                entry
                    .validator
                    .validate(value, all_values, form_id, &field_name)
            })
    }

    /// Every error in the form, one message per path.
    pub fn validate_all(&self, form_id: &str, all_values: &Value) -> IndexMap<FieldPath, String> {
        let mut errors = IndexMap::new();
        for entry in &self.entries {
            for path in entry.pattern.expand(all_values) {
                if errors.contains_key(&path) {
                    continue;
                }
                let field_name = path.to_string();
                let value = value_at_path(all_values, &path);
                if let Some(message) =
                    entry
                        .validator
                        .validate(value, all_values, form_id, &field_name)
                {
                    debug!(form = form_id, field = %path, validator = %entry.name, %message, "field invalid");
                    errors.insert(path, message);
                }
            }
        }
        if let Some(schema) = &self.schema {
            for error in schema.iter_errors(all_values) {
                let pointer = error.instance_path.to_string();
                match FieldPath::from_pointer(&pointer) {
                    Ok(path) => {
                        errors.entry(path).or_insert_with(|| error.to_string());
                    }
                    Err(err) => warn!(form = form_id, %pointer, error = %err, "unmappable schema error"),
                }
            }
        }
        errors
    }
}
