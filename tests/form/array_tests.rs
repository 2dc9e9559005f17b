use formsync::{
    EnvEntry, EnvKind, validate_env_entries,
    form::{FieldValidator, UniqueEntries, first_duplicate},
};
use serde_json::json;

fn envs(names: &[&str]) -> Vec<EnvEntry> {
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| EnvEntry::new(*name, idx.to_string()))
        .collect()
}

#[test]
fn repeated_name_is_reported() {
    let entries = envs(&["A", "B", "A"]);
    assert_eq!(
        validate_env_entries(Some(entries.as_slice())),
        Some("Env names should be unique. A".to_string())
    );
}

#[test]
fn empty_names_never_collide() {
    let entries = envs(&["", ""]);
    assert_eq!(validate_env_entries(Some(entries.as_slice())), None);
}

#[test]
fn empty_and_absent_lists_are_valid() {
    assert_eq!(validate_env_entries(Some(&[][..])), None);
    assert_eq!(validate_env_entries(None), None);
}

#[test]
fn first_duplicate_in_list_order_wins() {
    let entries = envs(&["X", "X", "Y", "Y"]);
    assert_eq!(
        validate_env_entries(Some(entries.as_slice())),
        Some("Env names should be unique. X".to_string())
    );
    assert_eq!(first_duplicate(["B", "A", "A", "B"]), Some("A"));
}

#[test]
fn validation_is_deterministic_and_leaves_input_alone() {
    let entries = vec![
        EnvEntry::new("A", "1"),
        EnvEntry {
            kind: EnvKind::External,
            ..EnvEntry::new("A", "2")
        },
    ];
    let snapshot = entries.clone();
    let first = validate_env_entries(Some(entries.as_slice()));
    let second = validate_env_entries(Some(entries.as_slice()));
    assert_eq!(first, second);
    assert_eq!(entries, snapshot);
}

#[test]
fn unique_entries_checks_any_key() {
    let ports = UniqueEntries::ports();
    let value = json!([
        {"containerPort": 80},
        {"containerPort": 443},
        {"containerPort": 80}
    ]);
    assert_eq!(
        ports.check(Some(&value)),
        Some("Container ports should be unique. 80".to_string())
    );
}

#[test]
fn unique_entries_exempts_missing_keys() {
    let volumes = UniqueEntries::volumes();
    let value = json!([{"path": ""}, {"name": "data"}, {"path": null}]);
    assert_eq!(volumes.check(Some(&value)), None);
    assert_eq!(volumes.check(None), None);
    assert_eq!(volumes.check(Some(&json!("not a list"))), None);
}

#[test]
fn unique_entries_plugs_into_the_validator_shape() {
    let env = UniqueEntries::env();
    let all = json!({"env": [{"name": "A"}, {"name": "A"}]});
    assert_eq!(
        env.validate(all.get("env"), &all, "component", "env"),
        Some("Env names should be unique. A".to_string())
    );
}
