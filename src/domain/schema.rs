use serde::{Deserialize, Serialize};

use super::path::FieldPath;

/// How a field's raw input relates to its stored value. Each kind carries its
/// own debounce delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Plain string typed character by character.
    #[default]
    Text,
    /// Text input holding a structured value (command lines, JSON blobs).
    Complex,
    /// Leaf inside a field-array entry.
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvKind {
    #[default]
    Static,
    External,
    Linked,
}

/// One environment variable row of a component form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: EnvKind,
}

impl EnvEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: EnvKind::Static,
        }
    }

    /// Blank row appended by the "New Variable" action.
    pub fn blank() -> Self {
        Self::default()
    }
}

/// A tab of a multi-section form; owns every field under its roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub title: String,
    #[serde(default)]
    pub roots: Vec<FieldPath>,
}

impl Tab {
    pub fn new(title: impl Into<String>, roots: impl IntoIterator<Item = FieldPath>) -> Self {
        Self {
            title: title.into(),
            roots: roots.into_iter().collect(),
        }
    }

    pub fn owns(&self, path: &FieldPath) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }
}
