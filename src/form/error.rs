use thiserror::Error;

use crate::domain::PathParseError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error(transparent)]
    Path(#[from] PathParseError),
    #[error("{form_id}:{path}: cannot descend into a {found} value")]
    NotAContainer {
        form_id: String,
        path: String,
        found: &'static str,
    },
    #[error("{form_id}:{path}: expected an array")]
    NotAnArray { form_id: String, path: String },
    #[error("{form_id}:{path}: index {index} out of range (len {len})")]
    IndexOutOfRange {
        form_id: String,
        path: String,
        index: usize,
        len: usize,
    },
    #[error("invalid json schema: {0}")]
    Schema(String),
}
