use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::domain::FieldPath;

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Valid {
        values: Value,
    },
    Invalid {
        issues: usize,
        errors: IndexMap<FieldPath, String>,
    },
}

impl SubmitOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, SubmitOutcome::Valid { .. })
    }

    pub(crate) fn from_errors(values: Value, errors: &IndexMap<FieldPath, String>) -> Self {
        if errors.is_empty() {
            SubmitOutcome::Valid { values }
        } else {
            SubmitOutcome::Invalid {
                issues: errors.len(),
                errors: errors.clone(),
            }
        }
    }
}

/// Error marker for one tab of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabBadge {
    pub title: String,
    pub errors: usize,
}

impl TabBadge {
    pub fn has_error(&self) -> bool {
        self.errors > 0
    }
}
