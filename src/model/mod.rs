//! Graph model
//!
//! Owns the live state and transition entities and keeps them consistent with
//! the declarative definition. Entities refer to each other by id only; every
//! cross-entity lookup goes through the registries held here.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{EditorError, EditorResult};
use crate::events::{EditorEvent, EventBus, Listener, ListenerId};
use crate::fsm::{is_valid_state_name, StateDefinition, StateMachineDefinition};
use crate::geometry::{compute_transition_geometry, LinkParams, Point, TransitionEnd, TransitionGeometry};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StateId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TransitionId(u64);

impl StateId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl TransitionId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transition#{}", self.0)
    }
}

/// A live state node
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntity {
    pub id: StateId,
    pub name: String,
    pub position: Point,
    pub is_initial: bool,
    pub is_active: bool,
}

/// A live transition edge, or the draft being drawn
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEntity {
    pub id: TransitionId,
    /// Event label
    pub name: String,
    pub src: StateId,
    /// `None` only while the transition is being drawn
    pub dest: Option<StateId>,
    /// Free endpoint used while `dest` is `None`
    pub pending_point: Point,
}

impl TransitionEntity {
    pub fn touches(&self, state: StateId) -> bool {
        self.src == state || self.dest == Some(state)
    }
}

#[derive(Debug, Default)]
pub struct GraphModel {
    states: Vec<StateEntity>,
    transitions: Vec<TransitionEntity>,
    draft: Option<TransitionEntity>,
    next_id: u64,
    events: EventBus,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definition(def: &StateMachineDefinition) -> EditorResult<Self> {
        let mut model = Self::new();
        model.load_definition(def)?;
        Ok(model)
    }

    // ------------------------------------------------------------------
    // Registries

    pub fn states(&self) -> &[StateEntity] {
        &self.states
    }

    /// Committed transitions only; see [`GraphModel::draft`]
    pub fn transitions(&self) -> &[TransitionEntity] {
        &self.transitions
    }

    pub fn draft(&self) -> Option<&TransitionEntity> {
        self.draft.as_ref()
    }

    pub fn state(&self, id: StateId) -> Option<&StateEntity> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn state_by_name(&self, name: &str) -> Option<&StateEntity> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&TransitionEntity> {
        self.transitions
            .iter()
            .chain(self.draft.iter())
            .find(|t| t.id == id)
    }

    pub fn initial_state(&self) -> Option<&StateEntity> {
        self.states.iter().find(|s| s.is_initial)
    }

    pub fn current_state(&self) -> Option<&StateEntity> {
        self.states.iter().find(|s| s.is_active)
    }

    /// Committed transitions and the draft that start or end at `state`
    pub fn incident_transitions(&self, state: StateId) -> impl Iterator<Item = &TransitionEntity> + '_ {
        self.transitions
            .iter()
            .chain(self.draft.iter())
            .filter(move |t| t.touches(state))
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Link and arrowhead for a transition; `None` if its source is gone
    pub fn geometry(&self, transition: &TransitionEntity, params: LinkParams) -> Option<TransitionGeometry> {
        let src = self.state(transition.src)?;
        let dest = match transition.dest.and_then(|d| self.state(d)) {
            Some(dest) => TransitionEnd::Node(dest.position),
            None => TransitionEnd::Free(transition.pending_point),
        };
        Some(compute_transition_geometry(src.position, dest, params))
    }

    // ------------------------------------------------------------------
    // Events

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn emit(&mut self, event: &EditorEvent) {
        self.events.emit(event);
    }

    /// Publish the exported definition to every listener
    pub fn publish_change(&mut self) {
        let state_machine = self.export_definition();
        log::debug!(
            "state machine changed: {} states, {} transitions",
            state_machine.states.len(),
            state_machine.transition_count()
        );
        self.events.emit(&EditorEvent::StateMachineChanged { state_machine });
    }

    // ------------------------------------------------------------------
    // Whole-graph operations

    /// Replace every entity with the contents of `def`
    ///
    /// The current state becomes the initial state. On error nothing changes.
    pub fn load_definition(&mut self, def: &StateMachineDefinition) -> EditorResult<()> {
        def.validate().map_err(EditorError::Validation)?;

        self.states.clear();
        self.transitions.clear();
        self.draft = None;

        for (name, state) in &def.states {
            let id = self.next_state_id();
            self.states.push(StateEntity {
                id,
                name: name.clone(),
                position: state.position,
                is_initial: *name == def.initial_state,
                is_active: *name == def.initial_state,
            });
        }

        for (name, state) in &def.states {
            let Some(src) = self.state_by_name(name).map(|s| s.id) else {
                continue;
            };
            for (event, dest_name) in &state.transitions {
                let Some(dest) = self.state_by_name(dest_name).map(|s| s.id) else {
                    continue;
                };
                let id = self.next_transition_id();
                self.transitions.push(TransitionEntity {
                    id,
                    name: event.clone(),
                    src,
                    dest: Some(dest),
                    pending_point: Point::ZERO,
                });
            }
        }

        log::info!(
            "loaded state machine: {} states, {} transitions",
            self.states.len(),
            self.transitions.len()
        );
        Ok(())
    }

    /// Re-derive the definition from the live entities
    pub fn export_definition(&self) -> StateMachineDefinition {
        let mut def = StateMachineDefinition::new(
            self.initial_state().map(|s| s.name.clone()).unwrap_or_default(),
        );
        for state in &self.states {
            def.states.insert(
                state.name.clone(),
                StateDefinition {
                    position: state.position,
                    transitions: BTreeMap::new(),
                },
            );
        }
        for transition in &self.transitions {
            let src = self.state(transition.src);
            let dest = transition.dest.and_then(|d| self.state(d));
            if let (Some(src), Some(dest)) = (src, dest) {
                if let Some(entry) = def.states.get_mut(&src.name) {
                    entry.transitions.insert(transition.name.clone(), dest.name.clone());
                }
            }
        }
        def
    }

    // ------------------------------------------------------------------
    // States

    pub fn add_state(&mut self, name: &str, x: f64, y: f64) -> EditorResult<&StateEntity> {
        self.check_new_name(name)?;
        check_position(name, Point::new(x, y))?;

        let id = self.next_state_id();
        self.states.push(StateEntity {
            id,
            name: name.to_string(),
            position: Point::new(x, y),
            is_initial: false,
            is_active: false,
        });
        log::debug!("added state '{}' at ({}, {})", name, x, y);
        self.publish_change();
        Ok(&self.states[self.states.len() - 1])
    }

    pub fn rename_state(&mut self, old: &str, new: &str) -> EditorResult<()> {
        let idx = self.state_index(old)?;
        if old == new {
            return Ok(());
        }
        self.check_new_name(new)?;

        self.states[idx].name = new.to_string();
        log::debug!("renamed state '{}' to '{}'", old, new);
        self.publish_change();
        Ok(())
    }

    pub fn set_initial_state(&mut self, name: &str) -> EditorResult<()> {
        let idx = self.state_index(name)?;
        for state in &mut self.states {
            state.is_initial = false;
        }
        self.states[idx].is_initial = true;
        self.publish_change();
        Ok(())
    }

    /// Highlight the current state
    ///
    /// `None` clears the highlight. An unknown name is ignored so externally
    /// driven updates can arrive before the state exists.
    pub fn set_current_state(&mut self, name: Option<&str>) {
        let target = match name {
            Some(name) => match self.state_by_name(name) {
                Some(state) => Some(state.id),
                None => {
                    log::debug!("ignoring unknown current state '{}'", name);
                    return;
                }
            },
            None => None,
        };
        for state in &mut self.states {
            state.is_active = Some(state.id) == target;
        }
    }

    /// Reposition a state without publishing; drags publish on release
    pub fn move_state(&mut self, id: StateId, position: Point) -> EditorResult<()> {
        let state = self
            .states
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| EditorError::unknown_state(id.to_string()))?;
        check_position(&state.name, position)?;
        state.position = position;
        Ok(())
    }

    /// Delete a state and every transition touching it
    pub fn delete_state(&mut self, name: &str) -> EditorResult<()> {
        let idx = self.state_index(name)?;
        let state = self.states.remove(idx);

        let before = self.transitions.len();
        self.transitions.retain(|t| !t.touches(state.id));
        let removed = before - self.transitions.len();

        if self.draft.as_ref().is_some_and(|d| d.src == state.id) {
            self.draft = None;
        } else if let Some(draft) = self.draft.as_mut().filter(|d| d.dest == Some(state.id)) {
            draft.dest = None;
        }

        log::debug!("deleted state '{}' and {} transitions", name, removed);
        self.publish_change();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transitions

    /// Open a draft transition from `src`, its free end at the hint point
    pub fn begin_transition(&mut self, event: &str, src: &str, hint_x: f64, hint_y: f64) -> EditorResult<&TransitionEntity> {
        let src_id = self
            .state_by_name(src)
            .map(|s| s.id)
            .ok_or_else(|| EditorError::unknown_state(src))?;
        if let Some(draft) = &self.draft {
            return Err(EditorError::Conflict(format!(
                "transition '{}' is already being drawn",
                draft.name
            )));
        }

        let id = self.next_transition_id();
        log::debug!("drafting transition '{}' from '{}'", event, src);
        let draft: &TransitionEntity = self.draft.insert(TransitionEntity {
            id,
            name: event.to_string(),
            src: src_id,
            dest: None,
            pending_point: Point::new(hint_x, hint_y),
        });
        Ok(draft)
    }

    pub fn update_draft_hint(&mut self, x: f64, y: f64) {
        if let Some(draft) = &mut self.draft {
            draft.pending_point = Point::new(x, y);
        }
    }

    /// Set or clear the draft's destination without committing
    pub fn set_draft_destination(&mut self, name: Option<&str>) {
        let dest = match name {
            Some(name) => match self.state_by_name(name) {
                Some(state) => Some(state.id),
                None => return,
            },
            None => None,
        };
        if let Some(draft) = &mut self.draft {
            draft.dest = dest;
        }
    }

    /// Promote the draft to a committed transition
    ///
    /// A committed transition with the same source and event name is replaced.
    pub fn commit_draft(&mut self) -> EditorResult<TransitionId> {
        match &self.draft {
            None => return Err(EditorError::InvalidState("no transition is being drawn".to_string())),
            Some(draft) if draft.dest.is_none() => {
                return Err(EditorError::InvalidState(format!(
                    "transition '{}' has no destination",
                    draft.name
                )))
            }
            Some(_) => {}
        }
        let Some(draft) = self.draft.take() else {
            return Err(EditorError::InvalidState("no transition is being drawn".to_string()));
        };

        let before = self.transitions.len();
        self.transitions
            .retain(|t| !(t.src == draft.src && t.name == draft.name));
        if self.transitions.len() != before {
            log::warn!("transition '{}' replaced an existing one from the same state", draft.name);
        }

        let id = draft.id;
        log::debug!("committed transition '{}'", draft.name);
        self.transitions.push(draft);
        self.publish_change();
        Ok(id)
    }

    /// Discard the draft; returns false if none was open
    pub fn cancel_draft(&mut self) -> bool {
        let cancelled = self.draft.take().is_some();
        if cancelled {
            log::debug!("cancelled draft transition");
        }
        cancelled
    }

    pub fn delete_transition(&mut self, id: TransitionId) -> EditorResult<()> {
        let idx = self
            .transitions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| EditorError::unknown_transition(id.to_string()))?;
        let removed = self.transitions.remove(idx);
        log::debug!("deleted transition '{}'", removed.name);
        self.publish_change();
        Ok(())
    }

    // ------------------------------------------------------------------

    fn state_index(&self, name: &str) -> EditorResult<usize> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| EditorError::unknown_state(name))
    }

    fn check_new_name(&self, name: &str) -> EditorResult<()> {
        if !is_valid_state_name(name) || self.state_by_name(name).is_some() {
            return Err(EditorError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn next_state_id(&mut self) -> StateId {
        self.next_id += 1;
        StateId(self.next_id)
    }

    fn next_transition_id(&mut self) -> TransitionId {
        self.next_id += 1;
        TransitionId(self.next_id)
    }
}

/// Only finite positions survive an export and reload
fn check_position(name: &str, position: Point) -> EditorResult<()> {
    if position.x.is_finite() && position.y.is_finite() {
        Ok(())
    } else {
        Err(EditorError::Validation(vec![format!(
            "State '{}' has a non-finite position",
            name
        )]))
    }
}
