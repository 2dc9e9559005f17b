use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::{FieldPath, PathSegment, value_at_path};

use super::error::FormError;

/// Authoritative value store shared by every form of an application.
///
/// Only `set_value` and `get_value` are required; the array helpers are built
/// on top of them and can be overridden by stores with native list support.
pub trait FormStore {
    fn set_value(&mut self, form_id: &str, path: &FieldPath, value: Value)
    -> Result<(), FormError>;

    fn get_value(&self, form_id: &str, path: &FieldPath) -> Option<Value>;

    fn array_push(
        &mut self,
        form_id: &str,
        path: &FieldPath,
        entry: Value,
    ) -> Result<usize, FormError> {
        let mut items = array_at(self, form_id, path)?;
        items.push(entry);
        let index = items.len() - 1;
        self.set_value(form_id, path, Value::Array(items))?;
        Ok(index)
    }

    fn array_insert(
        &mut self,
        form_id: &str,
        path: &FieldPath,
        index: usize,
        entry: Value,
    ) -> Result<(), FormError> {
        let mut items = array_at(self, form_id, path)?;
        if index > items.len() {
            return Err(out_of_range(form_id, path, index, items.len()));
        }
        items.insert(index, entry);
        self.set_value(form_id, path, Value::Array(items))
    }

    fn array_remove(
        &mut self,
        form_id: &str,
        path: &FieldPath,
        index: usize,
    ) -> Result<Value, FormError> {
        let mut items = array_at(self, form_id, path)?;
        if index >= items.len() {
            return Err(out_of_range(form_id, path, index, items.len()));
        }
        let removed = items.remove(index);
        self.set_value(form_id, path, Value::Array(items))?;
        Ok(removed)
    }

    fn array_move(
        &mut self,
        form_id: &str,
        path: &FieldPath,
        from: usize,
        to: usize,
    ) -> Result<(), FormError> {
        let mut items = array_at(self, form_id, path)?;
        let len = items.len();
        if from >= len {
            return Err(out_of_range(form_id, path, from, len));
        }
        if to >= len {
            return Err(out_of_range(form_id, path, to, len));
        }
        let entry = items.remove(from);
        items.insert(to, entry);
        self.set_value(form_id, path, Value::Array(items))
    }
}

fn array_at<S: FormStore + ?Sized>(
    store: &S,
    form_id: &str,
    path: &FieldPath,
) -> Result<Vec<Value>, FormError> {
    match store.get_value(form_id, path) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(FormError::NotAnArray {
            form_id: form_id.to_string(),
            path: path.to_string(),
        }),
    }
}

fn out_of_range(form_id: &str, path: &FieldPath, index: usize, len: usize) -> FormError {
    FormError::IndexOutOfRange {
        form_id: form_id.to_string(),
        path: path.to_string(),
        index,
        len,
    }
}

/// In-memory store keeping one JSON tree per form id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    forms: IndexMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a form's whole value, e.g. with data loaded from the backend.
    pub fn seed(&mut self, form_id: impl Into<String>, value: Value) {
        self.forms.insert(form_id.into(), value);
    }

    pub fn form(&self, form_id: &str) -> Option<&Value> {
        self.forms.get(form_id)
    }

    pub fn form_ids(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }
}

impl FormStore for MemoryStore {
    fn set_value(
        &mut self,
        form_id: &str,
        path: &FieldPath,
        value: Value,
    ) -> Result<(), FormError> {
        let root = self
            .forms
            .entry(form_id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let walked = |depth: usize| {
            path.segments()[..depth]
                .iter()
                .cloned()
                .fold(FieldPath::root(), |acc, segment| acc.child(segment))
                .to_string()
        };
        check_insertable(root, path.segments())
            .and_then(|()| insert_path(root, path.segments(), value))
            .map_err(|err| match err {
                InsertError::NotAContainer { depth, found } => FormError::NotAContainer {
                    form_id: form_id.to_string(),
                    path: walked(depth),
                    found,
                },
                InsertError::OutOfRange { depth, index, len } => FormError::IndexOutOfRange {
                    form_id: form_id.to_string(),
                    path: walked(depth),
                    index,
                    len,
                },
            })
    }

    fn get_value(&self, form_id: &str, path: &FieldPath) -> Option<Value> {
        let root = self.forms.get(form_id)?;
        value_at_path(root, path).cloned()
    }
}

#[derive(Debug)]
enum InsertError {
    NotAContainer {
        depth: usize,
        found: &'static str,
    },
    OutOfRange {
        depth: usize,
        index: usize,
        len: usize,
    },
}

/// Read-only pass over `path` so a rejected write leaves the tree untouched.
/// An index may address an existing entry or append at `len`, nothing past it.
fn check_insertable(root: &Value, path: &[PathSegment]) -> Result<(), InsertError> {
    let mut current = Some(root);
    for (depth, segment) in path.iter().enumerate() {
        current = match (current, segment) {
            (None | Some(Value::Null), PathSegment::Index(index)) => {
                if *index != 0 {
                    return Err(InsertError::OutOfRange {
                        depth,
                        index: *index,
                        len: 0,
                    });
                }
                None
            }
            (None | Some(Value::Null), PathSegment::Key(_)) => None,
            (Some(Value::Array(items)), PathSegment::Index(index)) => {
                if *index > items.len() {
                    return Err(InsertError::OutOfRange {
                        depth,
                        index: *index,
                        len: items.len(),
                    });
                }
                items.get(*index)
            }
            (Some(Value::Object(map)), segment) => map.get(&segment.as_key()),
            (Some(other), _) => {
                return Err(InsertError::NotAContainer {
                    depth,
                    found: kind_name(other),
                });
            }
        };
    }
    Ok(())
}

/// Write `value` at `path`, creating objects for keys and arrays for indices.
/// Null slots are replaced.
fn insert_path(root: &mut Value, path: &[PathSegment], value: Value) -> Result<(), InsertError> {
    let mut current = root;
    for (depth, segment) in path.iter().enumerate() {
        if current.is_null() {
            *current = match segment {
                PathSegment::Index(_) => Value::Array(Vec::new()),
                PathSegment::Key(_) => Value::Object(Map::new()),
            };
        }
        current = match (current, segment) {
            (Value::Array(items), PathSegment::Index(index)) => {
                let len = items.len();
                if *index == len {
                    items.push(Value::Null);
                }
                items.get_mut(*index).ok_or(InsertError::OutOfRange {
                    depth,
                    index: *index,
                    len,
                })?
            }
            (Value::Object(map), segment) => {
                map.entry(segment.as_key()).or_insert(Value::Null)
            }
            (other, _) => {
                return Err(InsertError::NotAContainer {
                    depth,
                    found: kind_name(other),
                });
            }
        };
    }
    *current = value;
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
