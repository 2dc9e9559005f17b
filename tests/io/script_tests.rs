use formsync::{FieldPath, InputScript, SubmitOutcome, replay};
use serde_json::json;

fn path(raw: &str) -> FieldPath {
    FieldPath::parse(raw).unwrap()
}

fn script(events: serde_json::Value) -> InputScript {
    InputScript::from_value(json!({
        "form": "component",
        "options": {
            "debounce": {"text_ms": 300, "complex_ms": 500},
            "tabs": [
                {"title": "Basic", "roots": ["name"]},
                {"title": "Configurations", "roots": ["env", "command"]}
            ]
        },
        "fields": {"command": "complex"},
        "arrays": ["env"],
        "validators": [
            {"field": "name", "rule": "required"},
            {"field": "env", "rule": "unique", "key": "name", "label": "Env names"},
            {"field": "env.*.name", "rule": "env_name"}
        ],
        "events": events
    }))
    .unwrap()
}

#[test]
fn typing_burst_records_a_single_commit() {
    let report = replay(&script(json!([
        {"at_ms": 0, "action": "input", "field": "name", "value": "a"},
        {"at_ms": 100, "action": "input", "field": "name", "value": "ab"},
        {"at_ms": 200, "action": "input", "field": "name", "value": "abc"}
    ])))
    .unwrap();

    assert_eq!(report.values, json!({"name": "abc"}));
    assert_eq!(report.commits.len(), 1);
    assert_eq!(report.commits[0].at_ms, 500);
    assert!(!report.commits[0].flushed);
}

#[test]
fn blur_commits_before_the_timer() {
    let report = replay(&script(json!([
        {"at_ms": 0, "action": "input", "field": "name", "value": "X"},
        {"at_ms": 50, "action": "blur", "field": "name"}
    ])))
    .unwrap();

    assert_eq!(report.commits.len(), 1);
    assert_eq!(report.commits[0].at_ms, 50);
    assert!(report.commits[0].flushed);
}

#[test]
fn array_edits_settle_before_removal() {
    let report = replay(&script(json!([
        {"at_ms": 0, "action": "input", "field": "name", "value": "web"},
        {"at_ms": 0, "action": "push", "array": "env", "entry": {"name": "A", "value": ""}},
        {"at_ms": 0, "action": "push", "array": "env", "entry": {"name": "B", "value": ""}},
        {"at_ms": 10, "action": "input", "field": "env.1.value", "value": "b"},
        {"at_ms": 20, "action": "remove", "array": "env", "index": 0}
    ])))
    .unwrap();

    assert_eq!(report.values["env"], json!([{"name": "B", "value": "b"}]));
    assert_eq!(report.arrays[&path("env")], "valid");
    let flushed: Vec<_> = report
        .commits
        .iter()
        .filter(|commit| commit.flushed)
        .map(|commit| commit.field.to_string())
        .collect();
    assert_eq!(flushed, vec!["env.1.value"]);
}

#[test]
fn submit_reports_blocking_errors() {
    let report = replay(&script(json!([
        {"at_ms": 0, "action": "push", "array": "env", "entry": {"name": "A", "value": ""}},
        {"at_ms": 0, "action": "push", "array": "env", "entry": {"name": "A", "value": ""}},
        {"at_ms": 100, "action": "submit"}
    ])))
    .unwrap();

    match &report.submits[..] {
        [SubmitOutcome::Invalid { errors, .. }] => {
            assert_eq!(errors[&path("name")], "Required");
            assert_eq!(errors[&path("env")], "Env names should be unique. A");
        }
        other => panic!("unexpected submits: {other:?}"),
    }
    assert_eq!(report.arrays[&path("env")], "invalid");
    assert_eq!(report.visible_errors.len(), 2);
    let flagged: Vec<_> = report
        .tabs
        .iter()
        .filter(|tab| tab.has_error())
        .map(|tab| tab.title.as_str())
        .collect();
    assert_eq!(flagged, vec!["Basic", "Configurations"]);
}

#[test]
fn out_of_order_events_are_rejected() {
    let err = replay(&script(json!([
        {"at_ms": 100, "action": "input", "field": "name", "value": "a"},
        {"at_ms": 50, "action": "input", "field": "name", "value": "b"}
    ])))
    .unwrap_err();
    assert!(err.to_string().contains("happens before"));
}

#[test]
fn unknown_script_keys_are_rejected() {
    let err = InputScript::from_value(json!({"form": "x", "bogus": true})).unwrap_err();
    assert!(format!("{err:#}").contains("bogus"));
}

#[test]
fn pattern_kinds_apply_to_entries_added_later() {
    let script = InputScript::from_value(json!({
        "form": "component",
        "options": {"debounce": {"text_ms": 300, "array_ms": 1000}},
        "fields": {"env.*.value": "array"},
        "arrays": ["env"],
        "events": [
            {"at_ms": 0, "action": "push", "array": "env", "entry": {"name": "A", "value": ""}},
            {"at_ms": 0, "action": "input", "field": "env.0.value", "value": "1"},
            {"at_ms": 0, "action": "input", "field": "env.0.name", "value": "B"}
        ]
    }))
    .unwrap();
    let report = replay(&script).unwrap();

    let timings: Vec<(String, u64)> = report
        .commits
        .iter()
        .map(|commit| (commit.field.to_string(), commit.at_ms))
        .collect();
    assert_eq!(
        timings,
        vec![("env.0.name".to_string(), 300), ("env.0.value".to_string(), 1000)]
    );
}
