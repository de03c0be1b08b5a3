//! Error taxonomy shared by the graph model, the controller and the front-ends

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid state machine definition: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("State '{0}' already exists")]
    DuplicateName(String),
    #[error("Unknown {kind}: {name}")]
    NotFound { kind: &'static str, name: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    pub(crate) fn unknown_state(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "state",
            name: name.into(),
        }
    }

    pub(crate) fn unknown_transition(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "transition",
            name: name.into(),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
