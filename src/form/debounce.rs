//! Per-field debouncing of raw input into store commits.
//!
//! Every `(form id, field path)` owns at most one pending commit. A raw
//! change re-arms that slot with a fresh [`TimerId`] and the latest value, so
//! a burst of keystrokes collapses into a single commit of its final value.
//! Timers are not real OS timers: the owner drives [`DebounceController::fire_due`]
//! from its event loop, using [`DebounceController::next_deadline`] to know
//! when to wake up.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::domain::{FieldKey, FieldKind, FieldPath, FieldPattern};

use super::{
    clock::{Clock, SystemClock},
    store::FormStore,
};

pub const DEFAULT_TEXT_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_COMPLEX_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_ARRAY_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceDelays {
    pub text: Duration,
    pub complex: Duration,
    pub array: Duration,
}

impl Default for DebounceDelays {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_DELAY,
            complex: DEFAULT_COMPLEX_DELAY,
            array: DEFAULT_ARRAY_DELAY,
        }
    }
}

impl DebounceDelays {
    pub fn uniform(delay: Duration) -> Self {
        Self {
            text: delay,
            complex: delay,
            array: delay,
        }
    }

    pub fn for_kind(&self, kind: FieldKind) -> Duration {
        match kind {
            FieldKind::Text => self.text,
            FieldKind::Complex => self.complex,
            FieldKind::Array => self.array,
        }
    }
}

/// Identity of one arming. Superseded ids never fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommit {
    pub scheduled_at: Instant,
    pub deadline: Instant,
    pub value: Value,
    pub timer: TimerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitReason {
    Timer,
    Flush,
}

/// A value that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub key: FieldKey,
    pub value: Value,
    pub timer: TimerId,
    pub reason: CommitReason,
}

#[derive(Debug, Clone, Default)]
struct FieldHandle {
    current: Option<Value>,
    committed: Option<Value>,
}

/// Field kinds survive `forget_prefix`; only the per-position values reset.
#[derive(Debug, Clone, Default)]
struct KindTable {
    exact: HashMap<FieldKey, FieldKind>,
    patterns: Vec<(String, FieldPattern, FieldKind)>,
}

impl KindTable {
    fn resolve(&self, key: &FieldKey) -> FieldKind {
        if let Some(kind) = self.exact.get(key) {
            return *kind;
        }
        self.patterns
            .iter()
            .rev()
            .find(|(form_id, pattern, _)| *form_id == key.form_id && pattern.matches(&key.path))
            .map(|(_, _, kind)| *kind)
            .unwrap_or_default()
    }
}

pub struct DebounceController<C: Clock = SystemClock> {
    clock: C,
    delays: DebounceDelays,
    handles: HashMap<FieldKey, FieldHandle>,
    kinds: KindTable,
    pending: IndexMap<FieldKey, PendingCommit>,
    next_timer: u64,
}

impl Default for DebounceController<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock, DebounceDelays::default())
    }
}

impl<C: Clock> DebounceController<C> {
    pub fn new(clock: C, delays: DebounceDelays) -> Self {
        Self {
            clock,
            delays,
            handles: HashMap::new(),
            kinds: KindTable::default(),
            pending: IndexMap::new(),
            next_timer: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn delays(&self) -> DebounceDelays {
        self.delays
    }

    /// Declare the kind of a field so it picks up the matching delay.
    /// Undeclared fields debounce as [`FieldKind::Text`].
    pub fn track(&mut self, key: FieldKey, kind: FieldKind) {
        self.kinds.exact.insert(key, kind);
    }

    /// Declare a kind for every field of `form_id` matching `pattern`, e.g.
    /// `env.*.name`. Exact declarations take precedence; among patterns the
    /// latest one wins.
    pub fn track_pattern(
        &mut self,
        form_id: impl Into<String>,
        pattern: FieldPattern,
        kind: FieldKind,
    ) {
        self.kinds.patterns.push((form_id.into(), pattern, kind));
    }

    /// Kind that selects the delay for `key`.
    pub fn kind_of(&self, key: &FieldKey) -> FieldKind {
        self.kinds.resolve(key)
    }

    /// Record a value already present in the store (e.g. loaded data).
    pub fn seed(&mut self, key: FieldKey, value: Value) {
        let handle = self.handles.entry(key).or_default();
        handle.current = Some(value.clone());
        handle.committed = Some(value);
    }

    /// Record a raw input event and (re)arm the field's commit timer.
    ///
    /// Returns the new timer, or `None` when the value already matches the
    /// committed one and nothing is pending.
    pub fn on_raw_change(&mut self, key: FieldKey, value: Value) -> Option<TimerId> {
        let now = self.clock.now();
        let handle = self.handles.entry(key.clone()).or_default();
        handle.current = Some(value.clone());
        if !self.pending.contains_key(&key) && handle.committed.as_ref() == Some(&value) {
            trace!(field = %key, "value matches committed state; nothing to schedule");
            return None;
        }
        let delay = self.delays.for_kind(self.kinds.resolve(&key));

        let timer = TimerId(self.next_timer);
        self.next_timer += 1;
        // shift_remove keeps `pending` in arming order
        let superseded = self.pending.shift_remove(&key);
        self.pending.insert(
            key.clone(),
            PendingCommit {
                scheduled_at: now,
                deadline: now + delay,
                value,
                timer,
            },
        );
        match superseded {
            Some(previous) => debug!(
                field = %key,
                timer = timer.get(),
                superseded = previous.timer.get(),
                "re-armed commit timer"
            ),
            None => debug!(field = %key, timer = timer.get(), ?delay, "armed commit timer"),
        }
        Some(timer)
    }

    /// Commit the field's pending value now. No-op when idle.
    pub fn flush<S: FormStore + ?Sized>(&mut self, key: &FieldKey, store: &mut S) -> Option<Commit> {
        let pending = self.pending.shift_remove(key)?;
        Some(self.commit(key.clone(), pending, CommitReason::Flush, store))
    }

    pub fn flush_form<S: FormStore + ?Sized>(&mut self, form_id: &str, store: &mut S) -> Vec<Commit> {
        self.flush_matching(|key| key.form_id == form_id, store)
    }

    /// Flush every pending commit at or below `prefix` in `form_id`.
    pub fn flush_prefix<S: FormStore + ?Sized>(
        &mut self,
        form_id: &str,
        prefix: &FieldPath,
        store: &mut S,
    ) -> Vec<Commit> {
        self.flush_matching(
            |key| key.form_id == form_id && key.path.starts_with(prefix),
            store,
        )
    }

    pub fn flush_all<S: FormStore + ?Sized>(&mut self, store: &mut S) -> Vec<Commit> {
        self.flush_matching(|_| true, store)
    }

    /// Commit every pending value whose deadline has passed, earliest first.
    pub fn fire_due<S: FormStore + ?Sized>(&mut self, store: &mut S) -> Vec<Commit> {
        let now = self.clock.now();
        let mut due: Vec<(Instant, TimerId, FieldKey)> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(key, pending)| (pending.deadline, pending.timer, key.clone()))
            .collect();
        due.sort_by(|left, right| (left.0, left.1).cmp(&(right.0, right.1)));

        let mut commits = Vec::with_capacity(due.len());
        for (_, _, key) in due {
            if let Some(pending) = self.pending.shift_remove(&key) {
                commits.push(self.commit(key, pending, CommitReason::Timer, store));
            }
        }
        commits
    }

    /// Drop current/committed values under `prefix` after entries shifted
    /// position. Declared kinds stay. Pending commits must have been flushed
    /// first; any left are discarded.
    pub fn forget_prefix(&mut self, form_id: &str, prefix: &FieldPath) {
        let matches = |key: &FieldKey| key.form_id == form_id && key.path.starts_with(prefix);
        let before = self.pending.len();
        self.pending.retain(|key, _| !matches(key));
        if self.pending.len() != before {
            warn!(
                form = form_id,
                prefix = %prefix,
                dropped = before - self.pending.len(),
                "discarded pending commits for forgotten fields"
            );
        }
        self.handles.retain(|key, _| !matches(key));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }

    /// Time until the earliest deadline, zero if one is already due.
    pub fn time_until_next(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn pending(&self, key: &FieldKey) -> Option<&PendingCommit> {
        self.pending.get(key)
    }

    pub fn is_pending(&self, key: &FieldKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.pending.keys()
    }

    pub fn current_value(&self, key: &FieldKey) -> Option<&Value> {
        self.handles.get(key).and_then(|handle| handle.current.as_ref())
    }

    pub fn committed_value(&self, key: &FieldKey) -> Option<&Value> {
        self.handles
            .get(key)
            .and_then(|handle| handle.committed.as_ref())
    }

    fn flush_matching<S, F>(&mut self, predicate: F, store: &mut S) -> Vec<Commit>
    where
        S: FormStore + ?Sized,
        F: Fn(&FieldKey) -> bool,
    {
        let keys: Vec<FieldKey> = self
            .pending
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        keys.iter()
            .filter_map(|key| self.flush(key, store))
            .collect()
    }

    fn commit<S: FormStore + ?Sized>(
        &mut self,
        key: FieldKey,
        pending: PendingCommit,
        reason: CommitReason,
        store: &mut S,
    ) -> Commit {
        match store.set_value(&key.form_id, &key.path, pending.value.clone()) {
            Ok(()) => {
                debug!(field = %key, timer = pending.timer.get(), ?reason, "committed value");
                self.handles.entry(key.clone()).or_default().committed =
                    Some(pending.value.clone());
            }
            // committed stays as it was, so retyping the value arms a new timer
            Err(err) => warn!(field = %key, error = %err, "store rejected committed value"),
        }
        Commit {
            key,
            value: pending.value,
            timer: pending.timer,
            reason,
        }
    }
}
