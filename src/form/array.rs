//! Aggregate validation of field-arrays (environment variables, ports,
//! volumes). Validators here are pure: the verdict is recomputed from the
//! current entries after every mutation and never cached.

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::EnvEntry;

use super::validator::FieldValidator;

/// First non-empty name that repeats an earlier one, scanning in list order.
pub fn first_duplicate<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .find(|name| !seen.insert(*name))
}

/// Field-array validator for environment variables.
///
/// `None` input is treated like an empty list.
pub fn validate_env_entries(entries: Option<&[EnvEntry]>) -> Option<String> {
    let entries = entries?;
    first_duplicate(entries.iter().map(|entry| entry.name.as_str()))
        .map(|name| duplicate_message(UniqueEntries::ENV_LABEL, name))
}

fn duplicate_message(label: &str, duplicate: &str) -> String {
    format!("{label} should be unique. {duplicate}")
}

/// Uniqueness of one key across the entries of a JSON array.
///
/// Entries whose key is missing, null or an empty string are exempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueEntries {
    key: String,
    label: String,
}

impl UniqueEntries {
    const ENV_LABEL: &'static str = "Env names";

    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    pub fn env() -> Self {
        Self::new("name", Self::ENV_LABEL)
    }

    pub fn ports() -> Self {
        Self::new("containerPort", "Container ports")
    }

    pub fn volumes() -> Self {
        Self::new("path", "Volume paths")
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn check(&self, entries: Option<&Value>) -> Option<String> {
        let Some(Value::Array(items)) = entries else {
            return None;
        };
        // keyed by JSON text, so "8080" and 8080 are different values
        let mut seen = HashSet::new();
        items
            .iter()
            .filter_map(|item| item.get(&self.key))
            .filter(|key| !is_blank(key))
            .find(|key| !seen.insert(key.to_string()))
            .map(|duplicate| duplicate_message(&self.label, &display_key(duplicate)))
    }
}

impl FieldValidator for UniqueEntries {
    fn validate(&self, value: Option<&Value>, _: &Value, _: &str, _: &str) -> Option<String> {
        self.check(value)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn display_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Lifecycle of one field-array inside a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayStatus {
    #[default]
    Clean,
    Dirty {
        valid: bool,
    },
}

impl ArrayStatus {
    pub fn is_dirty(self) -> bool {
        matches!(self, ArrayStatus::Dirty { .. })
    }

    /// Whether this array blocks submission.
    pub fn is_invalid(self) -> bool {
        matches!(self, ArrayStatus::Dirty { valid: false })
    }

    pub fn revalidated(self, valid: bool) -> Self {
        ArrayStatus::Dirty { valid }
    }
}
