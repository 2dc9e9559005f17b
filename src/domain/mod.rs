mod path;
mod schema;

pub use path::{
    FieldKey, FieldPath, FieldPattern, PathParseError, PathSegment, value_at_path,
};
pub use schema::{EnvEntry, EnvKind, FieldKind, Tab};
