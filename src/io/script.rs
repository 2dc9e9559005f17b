//! Scripted input sessions.
//!
//! A script describes one form (options, validators, seed data) and a
//! timeline of editor events. [`replay`] drives a [`FormSession`] on a
//! [`ManualClock`], so debounce timing is reproduced exactly.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    app::{FormOptions, FormSession, SubmitOutcome, TabBadge},
    domain::{FieldKind, FieldPath},
    form::{
        ArrayStatus, Commit, CommitReason, EnvName, ManualClock, MemoryStore, Required,
        UniqueEntries, ValidatorRegistry,
    },
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputScript {
    #[serde(default = "default_form_id")]
    pub form: String,
    /// Same shape as an options document.
    #[serde(default)]
    pub options: Option<Value>,
    /// Whole-form JSON Schema.
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub seed: Option<Value>,
    /// Field kinds by path or wildcard pattern (`env.*.value`).
    #[serde(default)]
    pub fields: IndexMap<String, FieldKind>,
    #[serde(default)]
    pub arrays: Vec<FieldPath>,
    #[serde(default)]
    pub validators: Vec<ValidatorSpec>,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

fn default_form_id() -> String {
    "form".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorSpec {
    pub field: String,
    #[serde(flatten)]
    pub rule: RuleSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    Required,
    EnvName,
    Unique {
        key: String,
        #[serde(default)]
        label: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEvent {
    /// Milliseconds since the start of the session; never decreasing.
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    Input { field: FieldPath, value: Value },
    Blur { field: FieldPath },
    Push { array: FieldPath, entry: Value },
    Insert { array: FieldPath, index: usize, entry: Value },
    Remove { array: FieldPath, index: usize },
    Move { array: FieldPath, from: usize, to: usize },
    Submit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    pub at_ms: u64,
    pub field: FieldPath,
    pub value: Value,
    pub flushed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub form: String,
    pub values: Value,
    pub errors: IndexMap<FieldPath, String>,
    pub visible_errors: IndexMap<FieldPath, String>,
    pub arrays: IndexMap<FieldPath, String>,
    pub tabs: Vec<TabBadge>,
    pub commits: Vec<CommitRecord>,
    pub submits: Vec<SubmitOutcome>,
    pub status: String,
}

impl InputScript {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("invalid input script")
    }

    fn registry(&self) -> Result<ValidatorRegistry> {
        let mut registry = match &self.schema {
            Some(schema) => ValidatorRegistry::new().with_schema(schema)?,
            None => ValidatorRegistry::new(),
        };
        for validator in &self.validators {
            match &validator.rule {
                RuleSpec::Required => registry.register(&validator.field, "required", Required)?,
                RuleSpec::EnvName => registry.register(&validator.field, "env_name", EnvName)?,
                RuleSpec::Unique { key, label } => {
                    let label = label.clone().unwrap_or_else(|| format!("{key} values"));
                    registry.register(&validator.field, "unique", UniqueEntries::new(key.clone(), label))?
                }
            };
        }
        Ok(registry)
    }
}

/// Run every event of `script` and report the final state.
///
/// Pending commits left after the last event are fired at their deadlines,
/// the way an idle editor would settle.
pub fn replay(script: &InputScript) -> Result<ReplayReport> {
    let options = match &script.options {
        Some(doc) => FormOptions::from_document(doc)?,
        None => FormOptions::default(),
    };
    let clock = ManualClock::new();
    let mut session = FormSession::new(
        script.form.clone(),
        MemoryStore::new(),
        clock.clone(),
        options,
    )
    .with_validators(script.registry()?);
    for (pattern, kind) in &script.fields {
        session.declare_pattern(pattern, *kind)?;
    }
    for array in &script.arrays {
        session.register_array(array.clone());
    }
    if let Some(seed) = &script.seed {
        session.seed(seed.clone())?;
    }

    let mut commits = Vec::new();
    let mut submits = Vec::new();
    let mut last_ms = 0;
    for (idx, event) in script.events.iter().enumerate() {
        if event.at_ms < last_ms {
            bail!(
                "event #{} at {}ms happens before the previous event at {}ms",
                idx + 1,
                event.at_ms,
                last_ms
            );
        }
        settle_until(
            &mut session,
            &clock,
            Duration::from_millis(event.at_ms),
            &mut commits,
        );
        last_ms = event.at_ms;
        debug!(at_ms = event.at_ms, action = ?event.action, "replaying event");

        match &event.action {
            ScriptAction::Input { field, value } => {
                session.input(field, value.clone());
            }
            ScriptAction::Blur { field } => {
                if let Some(commit) = session.blur(field) {
                    commits.push(record(&clock, &commit));
                }
            }
            ScriptAction::Push { array, entry } => {
                let flushed = pending_under(&session, array);
                session.push_entry(array, entry.clone())?;
                commits.extend(flushed.into_iter().map(|commit| flushed_record(&clock, commit)));
            }
            ScriptAction::Insert {
                array,
                index,
                entry,
            } => {
                let flushed = pending_under(&session, array);
                session.insert_entry(array, *index, entry.clone())?;
                commits.extend(flushed.into_iter().map(|commit| flushed_record(&clock, commit)));
            }
            ScriptAction::Remove { array, index } => {
                let flushed = pending_under(&session, array);
                session.remove_entry(array, *index)?;
                commits.extend(flushed.into_iter().map(|commit| flushed_record(&clock, commit)));
            }
            ScriptAction::Move { array, from, to } => {
                let flushed = pending_under(&session, array);
                session.move_entry(array, *from, *to)?;
                commits.extend(flushed.into_iter().map(|commit| flushed_record(&clock, commit)));
            }
            ScriptAction::Submit => {
                let flushed = pending_under(&session, &FieldPath::root());
                let outcome = session.submit();
                commits.extend(flushed.into_iter().map(|commit| flushed_record(&clock, commit)));
                submits.push(outcome);
            }
        }
    }
    while let Some(wait) = session.debounce().time_until_next() {
        let target = clock.elapsed() + wait;
        settle_until(&mut session, &clock, target, &mut commits);
    }

    let errors = session.errors().clone();
    let visible_errors = errors
        .iter()
        .filter_map(|(path, _)| {
            session
                .visible_error(path)
                .map(|message| (path.clone(), message.to_string()))
        })
        .collect();
    let arrays = script
        .arrays
        .iter()
        .filter_map(|path| {
            session
                .array_status(path)
                .map(|status| (path.clone(), describe_status(status).to_string()))
        })
        .collect();
    Ok(ReplayReport {
        form: script.form.clone(),
        values: session.values(),
        errors,
        visible_errors,
        arrays,
        tabs: session.tab_badges(),
        commits,
        submits,
        status: session.status().message().to_string(),
    })
}

/// Advance the clock to `target`, firing timers at their own deadlines so
/// commit order matches real time.
fn settle_until(
    session: &mut FormSession<MemoryStore, ManualClock>,
    clock: &ManualClock,
    target: Duration,
    commits: &mut Vec<CommitRecord>,
) {
    while let Some(wait) = session.debounce().time_until_next() {
        let deadline = clock.elapsed() + wait;
        if deadline > target {
            break;
        }
        clock.set_elapsed(deadline);
        for commit in session.tick() {
            commits.push(record(clock, &commit));
        }
    }
    clock.set_elapsed(target);
}

/// Pending values that a structural change or submit is about to flush.
fn pending_under(
    session: &FormSession<MemoryStore, ManualClock>,
    prefix: &FieldPath,
) -> Vec<(FieldPath, Value)> {
    session
        .debounce()
        .pending_keys()
        .filter(|key| key.path.starts_with(prefix))
        .filter_map(|key| {
            session
                .debounce()
                .pending(key)
                .map(|pending| (key.path.clone(), pending.value.clone()))
        })
        .collect()
}

fn record(clock: &ManualClock, commit: &Commit) -> CommitRecord {
    CommitRecord {
        at_ms: clock.elapsed().as_millis() as u64,
        field: commit.key.path.clone(),
        value: commit.value.clone(),
        flushed: commit.reason == CommitReason::Flush,
    }
}

fn flushed_record(clock: &ManualClock, (field, value): (FieldPath, Value)) -> CommitRecord {
    CommitRecord {
        at_ms: clock.elapsed().as_millis() as u64,
        field,
        value,
        flushed: true,
    }
}

fn describe_status(status: ArrayStatus) -> &'static str {
    match status {
        ArrayStatus::Clean => "clean",
        ArrayStatus::Dirty { valid: true } => "valid",
        ArrayStatus::Dirty { valid: false } => "invalid",
    }
}
