//! State machine definitions
//! The declarative, serialisable form of a machine: positions plus topology

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, EditorResult};
use crate::geometry::Point;

#[cfg(test)]
mod tests;

/// A complete state machine definition
///
/// This is the only interchange shape: live entities, styling and the
/// viewport are never part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineDefinition {
    /// Initial state name, empty when no state is marked initial
    #[serde(default)]
    pub initial_state: String,
    /// All states keyed by their unique name
    #[serde(default, alias = "rules")]
    pub states: BTreeMap<String, StateDefinition>,
}

/// One state in a definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDefinition {
    /// Canvas position of the state's center
    #[serde(alias = "metadata")]
    pub position: Point,
    /// Outgoing transitions: event name -> destination state name
    #[serde(default, alias = "events")]
    pub transitions: BTreeMap<String, String>,
}

/// A state name must contain something other than whitespace
pub fn is_valid_state_name(name: &str) -> bool {
    !name.trim().is_empty()
}

impl StateDefinition {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            transitions: BTreeMap::new(),
        }
    }

    pub fn with_transition(mut self, event: impl Into<String>, dest: impl Into<String>) -> Self {
        self.transitions.insert(event.into(), dest.into());
        self
    }
}

impl StateMachineDefinition {
    pub fn new(initial_state: impl Into<String>) -> Self {
        Self {
            initial_state: initial_state.into(),
            states: BTreeMap::new(),
        }
    }

    pub fn with_state(mut self, name: impl Into<String>, state: StateDefinition) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Total number of transitions across all states
    pub fn transition_count(&self) -> usize {
        self.states.values().map(|s| s.transitions.len()).sum()
    }

    /// Validate the definition
    ///
    /// An empty `initial_state` means "no initial state" and is accepted.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.initial_state.is_empty() && !self.states.contains_key(&self.initial_state) {
            errors.push(format!(
                "Initial state '{}' not found",
                self.initial_state
            ));
        }

        for (name, state) in &self.states {
            if !is_valid_state_name(name) {
                errors.push(format!("State name '{}' is blank", name));
            }
            if !state.position.x.is_finite() || !state.position.y.is_finite() {
                errors.push(format!("State '{}' has a non-finite position", name));
            }
            for (event, dest) in &state.transitions {
                if !self.states.contains_key(dest) {
                    errors.push(format!(
                        "Transition '{}' from '{}' targets unknown state '{}'",
                        event, name, dest
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn from_json(source: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn to_json_pretty(&self) -> EditorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate in one step
    pub fn parse_validated(source: &str) -> EditorResult<Self> {
        let def = Self::from_json(source)?;
        def.validate().map_err(EditorError::Validation)?;
        Ok(def)
    }
}
