//! Unit tests for the graph model

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::EditorError;
use crate::events::EditorEvent;
use crate::fsm::{StateDefinition, StateMachineDefinition};
use crate::geometry::{LinkParams, Point};
use crate::model::GraphModel;

fn door() -> StateMachineDefinition {
    StateMachineDefinition::new("Closed")
        .with_state(
            "Closed",
            StateDefinition::new(0.0, 0.0)
                .with_transition("open", "Open")
                .with_transition("lock", "Locked"),
        )
        .with_state("Open", StateDefinition::new(200.0, 0.0).with_transition("close", "Closed"))
        .with_state(
            "Locked",
            StateDefinition::new(0.0, 200.0)
                .with_transition("unlock", "Closed")
                .with_transition("knock", "Locked"),
        )
}

fn recorded(model: &mut GraphModel) -> Rc<RefCell<Vec<EditorEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    model.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));
    events
}

fn change_count(events: &Rc<RefCell<Vec<EditorEvent>>>) -> usize {
    events.borrow().iter().filter(|e| e.is_change()).count()
}

#[test]
fn test_roundtrip_law() {
    let def = door();
    let model = GraphModel::from_definition(&def).unwrap();
    assert_eq!(model.export_definition(), def);
    assert_eq!(model.states().len(), 3);
    assert_eq!(model.transitions().len(), 5);

    let reloaded = GraphModel::from_definition(&model.export_definition()).unwrap();
    assert_eq!(reloaded.export_definition(), def);
}

#[test]
fn test_empty_machine_roundtrip() {
    let model = GraphModel::from_definition(&StateMachineDefinition::default()).unwrap();
    assert!(model.is_empty());
    assert_eq!(model.export_definition(), StateMachineDefinition::default());
}

#[test]
fn test_load_marks_initial_and_current() {
    let model = GraphModel::from_definition(&door()).unwrap();
    assert_eq!(model.initial_state().unwrap().name, "Closed");
    assert_eq!(model.current_state().unwrap().name, "Closed");
}

#[test]
fn test_failed_load_leaves_model_untouched() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let before = model.export_definition();

    let broken = StateMachineDefinition::new("A")
        .with_state("A", StateDefinition::new(0.0, 0.0).with_transition("go", "Missing"));
    match model.load_definition(&broken) {
        Err(EditorError::Validation(errors)) => assert!(errors.iter().any(|e| e.contains("Missing"))),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(model.export_definition(), before);
}

#[test]
fn test_load_does_not_publish() {
    let mut model = GraphModel::new();
    let events = recorded(&mut model);
    model.load_definition(&door()).unwrap();
    assert!(events.borrow().is_empty());
}

#[test]
fn test_add_state_publishes_change() {
    let mut model = GraphModel::new();
    let events = recorded(&mut model);

    let state = model.add_state("A", 10.0, 20.0).unwrap();
    assert_eq!(state.name, "A");
    assert_eq!(state.position, Point::new(10.0, 20.0));
    assert!(!state.is_initial && !state.is_active);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    match &events[0] {
        EditorEvent::StateMachineChanged { state_machine } => {
            assert!(state_machine.states.contains_key("A"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_duplicate_rejection() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let before = model.export_definition();
    let events = recorded(&mut model);

    assert!(matches!(
        model.add_state("Closed", 5.0, 5.0),
        Err(EditorError::DuplicateName(name)) if name == "Closed"
    ));
    assert!(matches!(model.add_state("", 5.0, 5.0), Err(EditorError::DuplicateName(_))));
    assert_eq!(model.export_definition(), before);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_rename_state_keeps_transitions() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.rename_state("Open", "Ajar").unwrap();

    let def = model.export_definition();
    assert!(!def.states.contains_key("Open"));
    assert_eq!(def.states["Closed"].transitions["open"], "Ajar");
    assert_eq!(def.states["Ajar"].transitions["close"], "Closed");

    assert!(matches!(model.rename_state("Nope", "X"), Err(EditorError::NotFound { .. })));
    assert!(matches!(model.rename_state("Ajar", "Locked"), Err(EditorError::DuplicateName(_))));
    assert!(model.rename_state("Ajar", "Ajar").is_ok());
}

#[test]
fn test_rename_initial_state_is_exported() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.rename_state("Closed", "Shut").unwrap();
    assert_eq!(model.export_definition().initial_state, "Shut");
}

#[test]
fn test_single_initial_and_active() {
    let mut model = GraphModel::from_definition(&door()).unwrap();

    model.set_initial_state("Open").unwrap();
    model.set_initial_state("Locked").unwrap();
    model.set_current_state(Some("Open"));
    model.set_current_state(Some("Locked"));
    model.set_current_state(Some("Closed"));

    assert_eq!(model.states().iter().filter(|s| s.is_initial).count(), 1);
    assert_eq!(model.states().iter().filter(|s| s.is_active).count(), 1);
    assert_eq!(model.initial_state().unwrap().name, "Locked");
    assert_eq!(model.current_state().unwrap().name, "Closed");

    assert!(matches!(model.set_initial_state("Nope"), Err(EditorError::NotFound { .. })));
    assert_eq!(model.initial_state().unwrap().name, "Locked");
}

#[test]
fn test_set_current_state_unknown_is_ignored() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.set_current_state(Some("Open"));
    model.set_current_state(Some("Nope"));
    assert_eq!(model.current_state().unwrap().name, "Open");

    model.set_current_state(None);
    assert!(model.current_state().is_none());
}

#[test]
fn test_delete_state_cascades() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let events = recorded(&mut model);

    model.delete_state("Closed").unwrap();

    let def = model.export_definition();
    assert!(!def.states.contains_key("Closed"));
    for state in def.states.values() {
        assert!(state.transitions.values().all(|dest| dest != "Closed"));
    }
    assert_eq!(def.transition_count(), 1);
    assert_eq!(def.states["Locked"].transitions["knock"], "Locked");
    assert_eq!(def.initial_state, "");
    assert_eq!(change_count(&events), 1);

    assert!(matches!(model.delete_state("Closed"), Err(EditorError::NotFound { .. })));
    assert_eq!(change_count(&events), 1);
}

#[test]
fn test_export_after_initial_deleted_reloads() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.delete_state("Closed").unwrap();
    let def = model.export_definition();
    let reloaded = GraphModel::from_definition(&def).unwrap();
    assert_eq!(reloaded.export_definition(), def);
}

#[test]
fn test_draft_cancel_is_atomic() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let before = model.export_definition();
    let events = recorded(&mut model);

    let draft = model.begin_transition("push", "Open", 300.0, 300.0).unwrap();
    assert!(draft.dest.is_none());
    assert_eq!(draft.pending_point, Point::new(300.0, 300.0));

    model.update_draft_hint(310.0, 320.0);
    assert_eq!(model.draft().unwrap().pending_point, Point::new(310.0, 320.0));
    model.set_draft_destination(Some("Locked"));
    assert!(model.cancel_draft());
    assert!(!model.cancel_draft());

    assert!(model.draft().is_none());
    assert_eq!(model.export_definition(), before);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_draft_commit_adds_one_transition() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let before = model.export_definition().transition_count();
    let events = recorded(&mut model);

    model.begin_transition("push", "Open", 300.0, 300.0).unwrap();
    model.set_draft_destination(Some("Locked"));
    let id = model.commit_draft().unwrap();

    let def = model.export_definition();
    assert_eq!(def.transition_count(), before + 1);
    assert_eq!(def.states["Open"].transitions["push"], "Locked");
    assert!(model.draft().is_none());
    assert!(model.transitions().iter().any(|t| t.id == id));
    assert_eq!(change_count(&events), 1);
}

#[test]
fn test_commit_without_destination_is_invalid() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    assert!(matches!(model.commit_draft(), Err(EditorError::InvalidState(_))));

    model.begin_transition("push", "Open", 0.0, 0.0).unwrap();
    model.set_draft_destination(Some("Nope"));
    assert!(matches!(model.commit_draft(), Err(EditorError::InvalidState(_))));
    // The draft survives the failed commit
    assert!(model.draft().is_some());

    model.set_draft_destination(Some("Closed"));
    model.set_draft_destination(None);
    assert!(matches!(model.commit_draft(), Err(EditorError::InvalidState(_))));
}

#[test]
fn test_begin_transition_errors() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    assert!(matches!(
        model.begin_transition("x", "Nope", 0.0, 0.0),
        Err(EditorError::NotFound { .. })
    ));
    model.begin_transition("x", "Open", 0.0, 0.0).unwrap();
    assert!(matches!(
        model.begin_transition("y", "Closed", 0.0, 0.0),
        Err(EditorError::Conflict(_))
    ));
    assert_eq!(model.draft().unwrap().name, "x");
}

#[test]
fn test_commit_replaces_same_event_from_same_source() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.begin_transition("open", "Closed", 0.0, 0.0).unwrap();
    model.set_draft_destination(Some("Locked"));
    model.commit_draft().unwrap();

    let def = model.export_definition();
    assert_eq!(def.states["Closed"].transitions["open"], "Locked");
    assert_eq!(model.transitions().len(), 5);
}

#[test]
fn test_self_transition_commit() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.begin_transition("wait", "Open", 0.0, 0.0).unwrap();
    model.set_draft_destination(Some("Open"));
    model.commit_draft().unwrap();
    assert_eq!(model.export_definition().states["Open"].transitions["wait"], "Open");
}

#[test]
fn test_delete_state_drops_draft_from_it() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.begin_transition("push", "Open", 0.0, 0.0).unwrap();
    model.delete_state("Open").unwrap();
    assert!(model.draft().is_none());

    model.begin_transition("push", "Closed", 0.0, 0.0).unwrap();
    model.set_draft_destination(Some("Locked"));
    model.delete_state("Locked").unwrap();
    assert!(model.draft().unwrap().dest.is_none());
}

#[test]
fn test_delete_transition() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let events = recorded(&mut model);
    let id = model
        .transitions()
        .iter()
        .find(|t| t.name == "knock")
        .map(|t| t.id)
        .unwrap();

    model.delete_transition(id).unwrap();
    assert!(!model.export_definition().states["Locked"].transitions.contains_key("knock"));
    assert_eq!(change_count(&events), 1);

    assert!(matches!(model.delete_transition(id), Err(EditorError::NotFound { .. })));
    assert_eq!(change_count(&events), 1);
}

#[test]
fn test_draft_cannot_be_deleted_as_transition() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let id = model.begin_transition("push", "Open", 0.0, 0.0).unwrap().id;
    assert!(matches!(model.delete_transition(id), Err(EditorError::NotFound { .. })));
}

#[test]
fn test_move_state_updates_position_and_geometry() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let events = recorded(&mut model);
    let open = model.state_by_name("Open").unwrap().id;

    model.move_state(open, Point::new(400.0, 0.0)).unwrap();
    assert_eq!(model.export_definition().states["Open"].position, Point::new(400.0, 0.0));
    assert!(events.borrow().is_empty());

    let to_open = model.transitions().iter().find(|t| t.name == "open").unwrap();
    let geo = model.geometry(to_open, LinkParams::default()).unwrap();
    assert!((geo.link.end().x - 370.0).abs() < 1e-9);

    assert_eq!(model.incident_transitions(open).count(), 2);
}

#[test]
fn test_draft_geometry_uses_pending_point() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    model.begin_transition("push", "Closed", 100.0, 0.0).unwrap();
    let draft = model.draft().unwrap();
    let geo = model.geometry(draft, LinkParams::default()).unwrap();
    assert_eq!(geo.link.end(), Point::new(100.0, 0.0));
}

#[test]
fn test_export_is_independent_copy() {
    let model = GraphModel::from_definition(&door()).unwrap();
    let mut def = model.export_definition();
    def.states.clear();
    assert_eq!(model.export_definition().states.len(), 3);
}

#[test]
fn test_end_to_end_current_state_not_exported() {
    let def = StateMachineDefinition::new("A")
        .with_state("A", StateDefinition::new(0.0, 0.0).with_transition("go", "B"))
        .with_state("B", StateDefinition::new(100.0, 0.0));
    let mut model = GraphModel::from_definition(&def).unwrap();
    model.set_current_state(Some("B"));

    let exported = model.export_definition();
    assert_eq!(exported, def);
    let json = serde_json::to_value(&exported).unwrap();
    assert!(!json.to_string().contains("active"));
    assert_eq!(model.current_state().unwrap().name, "B");
}

#[test]
fn test_non_finite_positions_are_rejected() {
    let mut model = GraphModel::from_definition(&door()).unwrap();
    let events = recorded(&mut model);
    let before = model.export_definition();

    assert!(matches!(
        model.add_state("Ghost", f64::NAN, 0.0),
        Err(EditorError::Validation(_))
    ));
    assert!(matches!(
        model.add_state("Ghost", 0.0, f64::INFINITY),
        Err(EditorError::Validation(_))
    ));
    let open = model.state_by_name("Open").unwrap().id;
    assert!(matches!(
        model.move_state(open, Point::new(f64::NEG_INFINITY, 5.0)),
        Err(EditorError::Validation(_))
    ));

    let after = model.export_definition();
    assert_eq!(after, before);
    assert!(events.borrow().is_empty());
    let json = after.to_json_pretty().unwrap();
    assert!(GraphModel::from_definition(&StateMachineDefinition::parse_validated(&json).unwrap()).is_ok());
}

#[test]
fn test_blank_names_rejected_on_add_and_load() {
    let mut model = GraphModel::new();
    assert!(matches!(model.add_state("  ", 0.0, 0.0), Err(EditorError::DuplicateName(_))));

    let def = StateMachineDefinition::new("").with_state("  ", StateDefinition::new(0.0, 0.0));
    assert!(matches!(
        GraphModel::from_definition(&def),
        Err(EditorError::Validation(_))
    ));
}
