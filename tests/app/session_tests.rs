use std::time::Duration;

use formsync::{
    FieldKind, FieldPath, FormOptions, FormSession, MemoryStore, SubmitOutcome, Tab,
    ValidatorRegistry,
    form::{EnvName, ManualClock, Required, UniqueEntries},
};
use serde_json::json;

fn path(raw: &str) -> FieldPath {
    FieldPath::parse(raw).unwrap()
}

fn options() -> FormOptions {
    FormOptions::default()
        .with_tab(Tab::new("Basic", [path("name"), path("image")]))
        .with_tab(Tab::new("Configurations", [path("env"), path("command")]))
        .with_tab(Tab::new("Networking", [path("ports")]))
}

fn validators() -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::new();
    registry
        .register("name", "required", Required)
        .unwrap()
        .register("env", "unique_env", UniqueEntries::env())
        .unwrap()
        .register("env.*.name", "env_name", EnvName)
        .unwrap();
    registry
}

fn component(clock: &ManualClock) -> FormSession<MemoryStore, ManualClock> {
    let mut session = FormSession::new("component", MemoryStore::new(), clock.clone(), options())
        .with_validators(validators());
    session.declare(&path("command"), FieldKind::Complex);
    session.register_array(path("env"));
    session
}

#[test]
fn store_sees_only_settled_values() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    for (at, text) in [(0, "w"), (100, "we"), (200, "web")] {
        clock.set_elapsed(Duration::from_millis(at));
        session.input(&path("name"), json!(text));
        session.tick();
    }
    assert_eq!(session.current_value(&path("name")), Some(json!("web")));
    assert_eq!(session.values(), json!({}));

    clock.set_elapsed(Duration::from_millis(500));
    let commits = session.tick();
    assert_eq!(commits.len(), 1);
    assert_eq!(session.values(), json!({"name": "web"}));
}

#[test]
fn submit_flushes_pending_edits() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    session.input(&path("name"), json!("web"));
    session.input(&path("command"), json!(["nginx", "-g"]));

    match session.submit() {
        SubmitOutcome::Valid { values } => {
            assert_eq!(values, json!({"name": "web", "command": ["nginx", "-g"]}));
        }
        other => panic!("expected a valid submit, got {other:?}"),
    }
    assert_eq!(session.debounce().pending_count(), 0);
    assert!(session.submit_attempted());
}

#[test]
fn blocked_submit_reveals_untouched_errors() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    session.seed(json!({"name": ""})).unwrap();
    assert_eq!(session.error(&path("name")), Some("Required"));
    assert_eq!(session.visible_error(&path("name")), None);

    let outcome = session.submit();
    assert!(!outcome.is_valid());
    assert!(!session.can_submit());
    assert_eq!(session.visible_error(&path("name")), Some("Required"));
}

#[test]
fn blur_commits_and_shows_the_error() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    session.seed(json!({"name": "web"})).unwrap();
    session.input(&path("name"), json!("  "));
    let commit = session.blur(&path("name")).unwrap();
    assert_eq!(commit.value, json!("  "));
    assert_eq!(session.visible_error(&path("name")), Some("Required"));

    clock.advance(Duration::from_secs(1));
    assert!(session.tick().is_empty());
}

#[test]
fn removing_an_entry_commits_pending_edits_to_the_right_row() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    for name in ["A", "B", "C"] {
        session
            .push_entry(&path("env"), json!({"name": name, "value": ""}))
            .unwrap();
    }
    session.input(&path("env.2.value"), json!("ccc"));
    let removed = session.remove_entry(&path("env"), 0).unwrap();
    assert_eq!(removed["name"], json!("A"));

    let values = session.values();
    assert_eq!(values["env"][1], json!({"name": "C", "value": "ccc"}));
    assert_eq!(session.debounce().pending_count(), 0);

    clock.advance(Duration::from_secs(1));
    assert!(session.tick().is_empty());
    assert_eq!(session.values(), values);
}

#[test]
fn edits_after_a_move_target_the_new_position() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    for name in ["", "B"] {
        session
            .push_entry(&path("env"), json!({"name": name, "value": "x"}))
            .unwrap();
    }
    session.input(&path("env.0.name"), json!("A"));
    clock.advance(Duration::from_millis(300));
    session.tick();

    session.move_entry(&path("env"), 1, 0).unwrap();
    // env.0.name now holds "B"; typing "A" there is a real change
    session.input(&path("env.0.name"), json!("A"));
    clock.advance(Duration::from_millis(300));
    assert_eq!(session.tick().len(), 1);
    assert_eq!(
        session.visible_error(&path("env")),
        Some("Env names should be unique. A")
    );
}

#[test]
fn tab_badges_follow_error_roots() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    session.seed(json!({"name": "web"})).unwrap();
    session
        .push_entry(&path("env"), json!({"name": "9bad", "value": ""}))
        .unwrap();

    let badges = session.tab_badges();
    let flagged: Vec<&str> = badges
        .iter()
        .filter(|badge| badge.has_error())
        .map(|badge| badge.title.as_str())
        .collect();
    assert_eq!(flagged, vec!["Configurations"]);
    assert!(session.error(&path("env.0.name")).is_some());
}

#[test]
fn out_of_range_removal_is_an_error() {
    let clock = ManualClock::new();
    let mut session = component(&clock);
    session
        .push_entry(&path("env"), json!({"name": "A", "value": ""}))
        .unwrap();
    assert!(session.remove_entry(&path("env"), 3).is_err());
    assert_eq!(session.values()["env"].as_array().map(Vec::len), Some(1));
}

#[test]
fn declared_array_delay_survives_a_push() {
    let clock = ManualClock::new();
    let options = FormOptions::default().with_array_delay(Duration::from_secs(1));
    let mut session = FormSession::new("component", MemoryStore::new(), clock.clone(), options);
    session.register_array(path("env"));
    session.declare(&path("env.0.name"), FieldKind::Array);

    session
        .push_entry(&path("env"), json!({"name": ""}))
        .unwrap();
    session.input(&path("env.0.name"), json!("A"));

    clock.advance(Duration::from_millis(300));
    assert!(session.tick().is_empty());
    clock.advance(Duration::from_millis(700));
    assert_eq!(session.tick().len(), 1);
    assert_eq!(session.values()["env"][0]["name"], json!("A"));
}
