use std::time::Duration;

use formsync::{
    FieldKey, FieldKind, FieldPath, FormError, FormStore, MemoryStore,
    form::{CommitReason, DebounceController, DebounceDelays, ManualClock},
};
use serde_json::{Value, json};

/// Store wrapper that records every write it receives.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    writes: Vec<(String, FieldPath, Value)>,
}

impl FormStore for RecordingStore {
    fn set_value(
        &mut self,
        form_id: &str,
        path: &FieldPath,
        value: Value,
    ) -> Result<(), FormError> {
        self.writes
            .push((form_id.to_string(), path.clone(), value.clone()));
        self.inner.set_value(form_id, path, value)
    }

    fn get_value(&self, form_id: &str, path: &FieldPath) -> Option<Value> {
        self.inner.get_value(form_id, path)
    }
}

fn key(form: &str, path: &str) -> FieldKey {
    FieldKey::parse(form, path).unwrap()
}

fn controller(clock: &ManualClock) -> DebounceController<ManualClock> {
    DebounceController::new(clock.clone(), DebounceDelays::default())
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[test]
fn burst_of_keystrokes_commits_only_the_final_value() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let mut store = RecordingStore::default();
    let name = key("component", "name");

    for (at, text) in [(0, "a"), (100, "ab"), (200, "abc")] {
        clock.set_elapsed(ms(at));
        debounce.on_raw_change(name.clone(), json!(text));
        assert!(debounce.fire_due(&mut store).is_empty());
    }

    clock.set_elapsed(ms(499));
    assert!(debounce.fire_due(&mut store).is_empty());
    assert!(store.writes.is_empty());

    clock.set_elapsed(ms(500));
    let commits = debounce.fire_due(&mut store);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].value, json!("abc"));
    assert_eq!(commits[0].reason, CommitReason::Timer);
    assert_eq!(
        store.writes,
        vec![(
            "component".to_string(),
            FieldPath::parse("name").unwrap(),
            json!("abc")
        )]
    );
    assert_eq!(debounce.pending_count(), 0);
}

#[test]
fn at_most_one_pending_commit_per_field() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let name = key("component", "name");
    let image = key("component", "image");

    let first = debounce.on_raw_change(name.clone(), json!("a")).unwrap();
    let second = debounce.on_raw_change(name.clone(), json!("ab")).unwrap();
    debounce.on_raw_change(image.clone(), json!("nginx"));

    assert!(second > first);
    assert_eq!(debounce.pending_count(), 2);
    let pending = debounce.pending(&name).unwrap();
    assert_eq!(pending.timer, second);
    assert_eq!(pending.value, json!("ab"));
}

#[test]
fn timer_ids_increase_across_fields() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let ids: Vec<u64> = ["a", "b", "c", "a"]
        .iter()
        .enumerate()
        .filter_map(|(idx, field)| debounce.on_raw_change(key("f", field), json!(idx)))
        .map(|timer| timer.get())
        .collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn blur_flushes_immediately_and_cancels_the_timer() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let mut store = RecordingStore::default();
    let name = key("component", "name");

    debounce.on_raw_change(name.clone(), json!("web"));
    clock.advance(ms(50));
    let commit = debounce.flush(&name, &mut store).unwrap();
    assert_eq!(commit.reason, CommitReason::Flush);
    assert_eq!(store.writes.len(), 1);

    clock.advance(ms(1_000));
    assert!(debounce.fire_due(&mut store).is_empty());
    assert_eq!(store.writes.len(), 1);
    assert!(debounce.flush(&name, &mut store).is_none());
}

#[test]
fn complex_fields_wait_longer_than_text_fields() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let mut store = MemoryStore::new();
    let command = key("component", "command");
    debounce.track(command.clone(), FieldKind::Complex);
    debounce.on_raw_change(command.clone(), json!(["sh", "-c"]));
    debounce.on_raw_change(key("component", "name"), json!("web"));

    clock.advance(ms(300));
    let commits = debounce.fire_due(&mut store);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].key.path.to_string(), "name");

    clock.advance(ms(200));
    let commits = debounce.fire_due(&mut store);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].key, command);
}

#[test]
fn due_commits_fire_in_deadline_order() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let mut store = MemoryStore::new();

    debounce.on_raw_change(key("f", "first"), json!(1));
    clock.advance(ms(10));
    debounce.on_raw_change(key("f", "second"), json!(2));
    clock.advance(ms(10));
    // re-arming moves `first` behind `second`
    debounce.on_raw_change(key("f", "first"), json!(3));

    clock.advance(ms(1_000));
    let order: Vec<String> = debounce
        .fire_due(&mut store)
        .into_iter()
        .map(|commit| commit.key.path.to_string())
        .collect();
    assert_eq!(order, vec!["second", "first"]);
}

#[test]
fn flush_prefix_only_touches_matching_fields() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let mut store = MemoryStore::new();

    debounce.on_raw_change(key("component", "env.0.name"), json!("A"));
    debounce.on_raw_change(key("component", "env.1.value"), json!("1"));
    debounce.on_raw_change(key("component", "name"), json!("web"));
    debounce.on_raw_change(key("other", "env.0.name"), json!("B"));

    let commits = debounce.flush_prefix("component", &FieldPath::parse("env").unwrap(), &mut store);
    assert_eq!(commits.len(), 2);
    assert_eq!(debounce.pending_count(), 2);
    assert!(debounce.is_pending(&key("component", "name")));
    assert!(debounce.is_pending(&key("other", "env.0.name")));

    let rest = debounce.flush_all(&mut store);
    assert_eq!(rest.len(), 2);
    assert_eq!(debounce.next_deadline(), None);
}

#[test]
fn repeating_the_committed_value_schedules_nothing() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    let mut store = RecordingStore::default();
    let name = key("component", "name");
    debounce.seed(name.clone(), json!("web"));

    assert!(debounce.on_raw_change(name.clone(), json!("web")).is_none());
    debounce.on_raw_change(name.clone(), json!("webx"));
    // back to the committed value still overrides the pending edit
    assert!(debounce.on_raw_change(name.clone(), json!("web")).is_some());

    clock.advance(ms(300));
    debounce.fire_due(&mut store);
    assert_eq!(store.writes.len(), 1);
    assert_eq!(debounce.committed_value(&name), Some(&json!("web")));
}

#[test]
fn time_until_next_reports_the_earliest_deadline() {
    let clock = ManualClock::new();
    let mut debounce = controller(&clock);
    assert_eq!(debounce.time_until_next(), None);

    debounce.on_raw_change(key("f", "a"), json!("x"));
    clock.advance(ms(100));
    assert_eq!(debounce.time_until_next(), Some(ms(200)));
    clock.advance(ms(500));
    assert_eq!(debounce.time_until_next(), Some(Duration::ZERO));
}
