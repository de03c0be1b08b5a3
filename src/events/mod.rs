//! Editor events
//!
//! A single typed channel: the graph model publishes change notifications on
//! it and the interaction controller forwards pointer-level domain events.

use std::fmt;

use serde::Serialize;

use crate::fsm::StateMachineDefinition;
use crate::geometry::Point;


/// What the pointer did to an entity or to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerAction {
    Click,
    RightClick,
    DoubleClick,
    HoverEnter,
    HoverExit,
}

impl PointerAction {
    fn suffix(self) -> &'static str {
        match self {
            PointerAction::Click => "click",
            PointerAction::RightClick => "rightclick",
            PointerAction::DoubleClick => "doubleclick",
            PointerAction::HoverEnter => "over",
            PointerAction::HoverExit => "out",
        }
    }
}

/// Pointer position in canvas space and in client (screen) space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointerLocation {
    pub canvas: Point,
    pub client: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRef {
    pub name: String,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRef {
    pub id: u64,
    pub name: String,
    pub src: String,
    pub dest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditorEvent {
    /// The committed graph changed; carries the full exported definition
    StateMachineChanged { state_machine: StateMachineDefinition },
    State {
        action: PointerAction,
        state: StateRef,
        pointer: PointerLocation,
    },
    Transition {
        action: PointerAction,
        transition: TransitionRef,
        pointer: PointerLocation,
    },
    Canvas {
        action: PointerAction,
        pointer: PointerLocation,
    },
}

impl EditorEvent {
    /// Wire name, e.g. `statemachine:change` or `state:click`
    pub fn name(&self) -> String {
        match self {
            EditorEvent::StateMachineChanged { .. } => "statemachine:change".to_string(),
            EditorEvent::State { action, .. } => format!("state:{}", action.suffix()),
            EditorEvent::Transition { action, .. } => format!("transition:{}", action.suffix()),
            EditorEvent::Canvas { action, .. } => format!("canvas:{}", action.suffix()),
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, EditorEvent::StateMachineChanged { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&EditorEvent)>;

/// Listener registry; listeners run synchronously in registration order
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if the listener was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &EditorEvent) {
        log::trace!("emit {}", event.name());
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
