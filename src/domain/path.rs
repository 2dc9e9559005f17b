use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("empty segment in field path '{0}'")]
    EmptySegment(String),
    #[error("json pointer '{0}' must start with '/'")]
    MissingPointerPrefix(String),
}

/// One step into a form's data tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            // "01" or "+1" stay keys so they print back unchanged
            Ok(index) if index.to_string() == raw => PathSegment::Index(index),
            _ => PathSegment::Key(raw.to_string()),
        }
    }

    /// Object-key spelling of the segment; indices double as numeric keys.
    pub fn as_key(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Dotted/indexed location of a value inside a form, e.g. `env.2.value`.
///
/// The empty path addresses the whole form value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, PathParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            if part.is_empty() {
                return Err(PathParseError::EmptySegment(raw.to_string()));
            }
            segments.push(PathSegment::parse(part));
        }
        Ok(Self { segments })
    }

    /// Parse an RFC 6901 pointer such as `/env/0/name`.
    pub fn from_pointer(pointer: &str) -> Result<Self, PathParseError> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = pointer.strip_prefix('/') else {
            return Err(PathParseError::MissingPointerPrefix(pointer.to_string()));
        };
        let segments = rest
            .split('/')
            .map(|part| PathSegment::parse(&part.replace("~1", "/").replace("~0", "~")))
            .collect();
        Ok(Self { segments })
    }

    pub fn to_pointer(&self) -> String {
        self.segments
            .iter()
            .map(|segment| {
                format!(
                    "/{}",
                    segment.as_key().replace('~', "~0").replace('/', "~1")
                )
            })
            .collect()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathSegment::Key(key.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    /// Index segment directly below `prefix`, e.g. `2` for `env.2.name`
    /// under `env`.
    pub fn index_below(&self, prefix: &FieldPath) -> Option<usize> {
        if !self.starts_with(prefix) {
            return None;
        }
        match self.segments.get(prefix.len())? {
            PathSegment::Index(index) => Some(*index),
            PathSegment::Key(_) => None,
        }
    }

    /// Same path with the segment at `depth` replaced by `index`.
    pub fn with_index_at(&self, depth: usize, index: usize) -> Self {
        let mut segments = self.segments.clone();
        if let Some(slot) = segments.get_mut(depth) {
            *slot = PathSegment::Index(index);
        }
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Top-level key, used to attribute errors to tabs.
    pub fn head(&self) -> Option<String> {
        self.segments.first().map(PathSegment::as_key)
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self
                .segments
                .iter()
                .zip(&prefix.segments)
                .all(|(left, right)| left.as_key() == right.as_key())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Identity of one editable leaf: the owning form plus the path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub form_id: String,
    pub path: FieldPath,
}

impl FieldKey {
    pub fn new(form_id: impl Into<String>, path: FieldPath) -> Self {
        Self {
            form_id: form_id.into(),
            path,
        }
    }

    pub fn parse(form_id: impl Into<String>, path: &str) -> Result<Self, PathParseError> {
        Ok(Self::new(form_id, FieldPath::parse(path)?))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.form_id, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Exact(String),
    Any,
}

/// Field path with `*` wildcards, used to register validators against
/// every entry of an array (`env.*.name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPattern {
    raw: String,
    segments: Vec<PatternSegment>,
}

impl FieldPattern {
    pub fn parse(raw: &str) -> Result<Self, PathParseError> {
        let path = FieldPath::parse(raw)?;
        let segments = path
            .segments()
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) if key == "*" => PatternSegment::Any,
                other => PatternSegment::Exact(other.as_key()),
            })
            .collect();
        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_exact(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, PatternSegment::Exact(_)))
    }

    pub fn matches(&self, path: &FieldPath) -> bool {
        self.segments.len() == path.len()
            && self
                .segments
                .iter()
                .zip(path.segments())
                .all(|(pattern, segment)| match pattern {
                    PatternSegment::Any => true,
                    PatternSegment::Exact(key) => *key == segment.as_key(),
                })
    }

    /// Concrete paths this pattern addresses in `values`.
    ///
    /// Exact patterns always yield themselves so that presence checks run on
    /// absent fields; wildcards only yield children that exist.
    pub fn expand(&self, values: &Value) -> Vec<FieldPath> {
        let mut found = Vec::new();
        expand_into(&self.segments, Some(values), FieldPath::root(), &mut found);
        found
    }
}

fn expand_into(
    pattern: &[PatternSegment],
    current: Option<&Value>,
    prefix: FieldPath,
    found: &mut Vec<FieldPath>,
) {
    let Some((head, rest)) = pattern.split_first() else {
        found.push(prefix);
        return;
    };
    match head {
        PatternSegment::Exact(key) => {
            let segment = PathSegment::parse(key);
            let next = current.and_then(|value| child_value(value, &segment));
            expand_into(rest, next, prefix.child(segment), found);
        }
        PatternSegment::Any => match current {
            Some(Value::Array(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    expand_into(rest, Some(item), prefix.index(idx), found);
                }
            }
            Some(Value::Object(map)) => {
                for (key, item) in map {
                    expand_into(rest, Some(item), prefix.key(key.clone()), found);
                }
            }
            _ => {}
        },
    }
}

pub(crate) fn child_value<'a>(value: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
        (Value::Object(map), segment) => map.get(&segment.as_key()),
        _ => None,
    }
}

/// Resolve `path` inside `value`.
pub fn value_at_path<'a>(value: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.segments() {
        current = child_value(current, segment)?;
    }
    Some(current)
}
