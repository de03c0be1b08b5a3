//! Unit tests for the definition format

use crate::error::EditorError;
use crate::fsm::{StateDefinition, StateMachineDefinition};

fn two_states() -> StateMachineDefinition {
    StateMachineDefinition::new("A")
        .with_state("A", StateDefinition::new(0.0, 0.0).with_transition("go", "B"))
        .with_state("B", StateDefinition::new(100.0, 0.0))
}

#[test]
fn test_definition_new() {
    let def = StateMachineDefinition::new("Idle");
    assert_eq!(def.initial_state, "Idle");
    assert!(def.is_empty());
    assert_eq!(def.transition_count(), 0);
}

#[test]
fn test_validation_valid() {
    assert!(two_states().validate().is_ok());
    assert!(StateMachineDefinition::default().validate().is_ok());
}

#[test]
fn test_validation_missing_initial_state() {
    let mut def = two_states();
    def.initial_state = "Nowhere".to_string();
    let errors = def.validate().unwrap_err();
    assert!(errors.iter().any(|e| e.contains("Nowhere")));
}

#[test]
fn test_validation_dangling_destination() {
    let def = two_states().with_state("C", StateDefinition::new(5.0, 5.0).with_transition("jump", "Z"));
    let errors = def.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'Z'"));
}

#[test]
fn test_validation_empty_initial_is_allowed() {
    let mut def = two_states();
    def.initial_state.clear();
    assert!(def.validate().is_ok());
}

#[test]
fn test_json_shape() {
    let json = two_states().to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["initialState"], "A");
    assert_eq!(value["states"]["A"]["position"]["x"], 0.0);
    assert_eq!(value["states"]["A"]["transitions"]["go"], "B");
    assert!(value["states"]["B"]["transitions"].as_object().unwrap().is_empty());
}

#[test]
fn test_json_roundtrip() {
    let def = two_states();
    let json = def.to_json_pretty().unwrap();
    assert_eq!(StateMachineDefinition::from_json(&json).unwrap(), def);
}

#[test]
fn test_legacy_keys_accepted() {
    let source = r#"{
        "initialState": "A",
        "rules": {
            "A": { "metadata": { "x": 1, "y": 2 }, "events": { "go": "B" } },
            "B": { "metadata": { "x": 3, "y": 4 }, "events": {} }
        }
    }"#;
    let def = StateMachineDefinition::from_json(source).unwrap();
    assert_eq!(def.states["A"].position.x, 1.0);
    assert_eq!(def.states["A"].transitions["go"], "B");
    assert_eq!(def.states["B"].position.y, 4.0);
}

#[test]
fn test_parse_validated_rejects_dangling() {
    let source = r#"{
        "initialState": "A",
        "states": { "A": { "position": { "x": 0, "y": 0 }, "transitions": { "go": "B" } } }
    }"#;
    match StateMachineDefinition::parse_validated(source) {
        Err(EditorError::Validation(errors)) => assert!(errors[0].contains("'B'")),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_parse_validated_rejects_bad_json() {
    assert!(matches!(
        StateMachineDefinition::parse_validated("{ not json"),
        Err(EditorError::Json(_))
    ));
}

#[test]
fn test_validation_rejects_blank_names() {
    let def = StateMachineDefinition::new("").with_state(" \t", StateDefinition::new(0.0, 0.0));
    let errors = def.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("blank"));
}
