use std::{collections::HashSet, time::Instant};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    domain::{FieldKey, FieldKind, FieldPath, FieldPattern, Tab},
    form::{
        ArrayStatus, Clock, Commit, DebounceController, FormError, FormStore, MemoryStore,
        SystemClock, TimerId, ValidatorRegistry,
    },
};

use super::{
    options::FormOptions,
    status::StatusLine,
    validation::{SubmitOutcome, TabBadge},
};

/// One editing form: routes input through the debounce controller into the
/// store and keeps validation results current.
pub struct FormSession<S: FormStore = MemoryStore, C: Clock = SystemClock> {
    form_id: String,
    store: S,
    debounce: DebounceController<C>,
    validators: ValidatorRegistry,
    validate_on_commit: bool,
    tabs: Vec<Tab>,
    arrays: IndexMap<FieldPath, ArrayStatus>,
    errors: IndexMap<FieldPath, String>,
    touched: HashSet<FieldPath>,
    submit_attempted: bool,
    status: StatusLine,
}

impl FormSession<MemoryStore, SystemClock> {
    pub fn in_memory(form_id: impl Into<String>, options: FormOptions) -> Self {
        Self::new(form_id, MemoryStore::new(), SystemClock, options)
    }
}

impl<S: FormStore, C: Clock> FormSession<S, C> {
    pub fn new(form_id: impl Into<String>, store: S, clock: C, options: FormOptions) -> Self {
        Self {
            form_id: form_id.into(),
            store,
            debounce: DebounceController::new(clock, options.delays),
            validators: ValidatorRegistry::new(),
            validate_on_commit: options.validate_on_commit,
            tabs: options.tabs,
            arrays: IndexMap::new(),
            errors: IndexMap::new(),
            touched: HashSet::new(),
            submit_attempted: false,
            status: StatusLine::new(),
        }
    }

    pub fn with_validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    pub fn validators_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.validators
    }

    /// Declare the kind of a leaf field, selecting its debounce delay.
    pub fn declare(&mut self, path: &FieldPath, kind: FieldKind) {
        let key = self.key(path);
        self.debounce.track(key, kind);
    }

    /// Declare a kind for every field matching `pattern` (`env.*.value`),
    /// including entries added later.
    pub fn declare_pattern(&mut self, pattern: &str, kind: FieldKind) -> Result<(), FormError> {
        let pattern = FieldPattern::parse(pattern)?;
        self.debounce
            .track_pattern(self.form_id.clone(), pattern, kind);
        Ok(())
    }

    /// Register a field-array so its clean/dirty/valid status is tracked.
    pub fn register_array(&mut self, path: FieldPath) {
        self.arrays.entry(path).or_default();
    }

    /// Load existing data (e.g. an object fetched for editing).
    pub fn seed(&mut self, values: Value) -> Result<(), FormError> {
        self.store
            .set_value(&self.form_id, &FieldPath::root(), values)?;
        self.revalidate();
        Ok(())
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn debounce(&self) -> &DebounceController<C> {
        &self.debounce
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    /// Raw input event from an editor. Display state updates immediately; the
    /// store is updated once the field settles.
    pub fn input(&mut self, path: &FieldPath, value: Value) -> Option<TimerId> {
        let key = self.key(path);
        self.status.editing(&key.path.to_string());
        self.debounce.on_raw_change(key, value)
    }

    /// What the editor for `path` should display.
    pub fn current_value(&self, path: &FieldPath) -> Option<Value> {
        let key = self.key(path);
        self.debounce
            .current_value(&key)
            .cloned()
            .or_else(|| self.store.get_value(&self.form_id, path))
    }

    /// Field lost focus: commit whatever is pending and show its errors.
    pub fn blur(&mut self, path: &FieldPath) -> Option<Commit> {
        let key = self.key(path);
        self.touched.insert(path.clone());
        let commit = self.debounce.flush(&key, &mut self.store);
        if let Some(commit) = &commit {
            self.after_commits(std::slice::from_ref(commit));
        }
        self.revalidate();
        commit
    }

    pub fn touch(&mut self, path: &FieldPath) {
        self.touched.insert(path.clone());
    }

    /// Event-loop hook: commit every field whose debounce window elapsed.
    pub fn tick(&mut self) -> Vec<Commit> {
        let commits = self.debounce.fire_due(&mut self.store);
        if !commits.is_empty() {
            self.after_commits(&commits);
            if self.validate_on_commit {
                self.revalidate();
            }
        }
        commits
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.next_deadline()
    }

    pub fn push_entry(&mut self, array: &FieldPath, entry: Value) -> Result<usize, FormError> {
        self.settle_array(array);
        let index = self.store.array_push(&self.form_id, array, entry)?;
        self.after_array_change(array);
        Ok(index)
    }

    pub fn insert_entry(
        &mut self,
        array: &FieldPath,
        index: usize,
        entry: Value,
    ) -> Result<(), FormError> {
        self.settle_array(array);
        self.store.array_insert(&self.form_id, array, index, entry)?;
        self.remap_touched(array, |idx| Some(if idx >= index { idx + 1 } else { idx }));
        self.after_array_change(array);
        Ok(())
    }

    pub fn remove_entry(&mut self, array: &FieldPath, index: usize) -> Result<Value, FormError> {
        self.settle_array(array);
        let removed = self.store.array_remove(&self.form_id, array, index)?;
        self.remap_touched(array, |idx| match idx.cmp(&index) {
            std::cmp::Ordering::Less => Some(idx),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(idx - 1),
        });
        self.after_array_change(array);
        Ok(removed)
    }

    pub fn move_entry(
        &mut self,
        array: &FieldPath,
        from: usize,
        to: usize,
    ) -> Result<(), FormError> {
        self.settle_array(array);
        self.store.array_move(&self.form_id, array, from, to)?;
        self.remap_touched(array, |idx| {
            Some(if idx == from {
                to
            } else if from < to && idx > from && idx <= to {
                idx - 1
            } else if to < from && idx >= to && idx < from {
                idx + 1
            } else {
                idx
            })
        });
        self.after_array_change(array);
        Ok(())
    }

    /// Commit everything pending, validate the whole form and report whether
    /// it may be sent.
    pub fn submit(&mut self) -> SubmitOutcome {
        let commits = self.debounce.flush_form(&self.form_id, &mut self.store);
        if !commits.is_empty() {
            self.after_commits(&commits);
        }
        self.submit_attempted = true;
        self.revalidate();
        let outcome = SubmitOutcome::from_errors(self.values(), &self.errors);
        match &outcome {
            SubmitOutcome::Valid { .. } => info!(form = %self.form_id, "form submitted"),
            SubmitOutcome::Invalid { issues, .. } => {
                info!(form = %self.form_id, issues, "submit blocked by validation errors")
            }
        }
        outcome
    }

    /// Submission gate: no field errors and no invalid field-array.
    pub fn can_submit(&self) -> bool {
        self.errors.is_empty() && !self.arrays.values().any(|status| status.is_invalid())
    }

    /// Committed values of the whole form.
    pub fn values(&self) -> Value {
        self.store
            .get_value(&self.form_id, &FieldPath::root())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    pub fn errors(&self) -> &IndexMap<FieldPath, String> {
        &self.errors
    }

    pub fn error(&self, path: &FieldPath) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    /// Error to display under a field: entry fields show theirs once touched
    /// or after a submit attempt; array-level errors show immediately.
    pub fn visible_error(&self, path: &FieldPath) -> Option<&str> {
        let message = self.error(path)?;
        let visible = self.submit_attempted
            || self.touched.contains(path)
            || self.arrays.contains_key(path);
        visible.then_some(message)
    }

    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.touched.contains(path)
    }

    pub fn submit_attempted(&self) -> bool {
        self.submit_attempted
    }

    pub fn array_status(&self, path: &FieldPath) -> Option<ArrayStatus> {
        self.arrays.get(path).copied()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_badges(&self) -> Vec<TabBadge> {
        self.tabs
            .iter()
            .map(|tab| TabBadge {
                title: tab.title.clone(),
                errors: self.errors.keys().filter(|path| tab.owns(path)).count(),
            })
            .collect()
    }

    /// Recompute every validator against the committed values.
    pub fn revalidate(&mut self) {
        let values = self.values();
        self.errors = self.validators.validate_all(&self.form_id, &values);
        for (path, status) in self.arrays.iter_mut() {
            if status.is_dirty() {
                *status = status.revalidated(!self.errors.contains_key(path));
            }
        }
        if self.errors.is_empty() {
            self.status.validation_passed();
        } else {
            self.status.issues_remaining(self.errors.len());
        }
    }

    fn key(&self, path: &FieldPath) -> FieldKey {
        FieldKey::new(self.form_id.clone(), path.clone())
    }

    fn after_commits(&mut self, commits: &[Commit]) {
        for commit in commits {
            for (array, status) in self.arrays.iter_mut() {
                if commit.key.path.starts_with(array) && !status.is_dirty() {
                    *status = status.revalidated(true);
                }
            }
        }
        self.status.value_updated(commits.len());
    }

    /// Pending edits address entries by position; commit them before the
    /// positions shift.
    fn settle_array(&mut self, array: &FieldPath) {
        let commits = self
            .debounce
            .flush_prefix(&self.form_id, array, &mut self.store);
        if !commits.is_empty() {
            debug!(form = %self.form_id, array = %array, flushed = commits.len(), "flushed edits before array mutation");
            self.after_commits(&commits);
        }
        self.debounce.forget_prefix(&self.form_id, array);
    }

    fn after_array_change(&mut self, array: &FieldPath) {
        let status = self.arrays.entry(array.clone()).or_default();
        if !status.is_dirty() {
            *status = status.revalidated(true);
        }
        self.status.entries_changed(&array.to_string());
        self.revalidate();
    }

    fn remap_touched<F>(&mut self, array: &FieldPath, remap: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        let depth = array.len();
        self.touched = self
            .touched
            .drain()
            .filter_map(|path| match path.index_below(array) {
                Some(index) => remap(index).map(|next| path.with_index_at(depth, next)),
                None => Some(path),
            })
            .collect();
    }
}
