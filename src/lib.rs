//! fsm-canvas - interactive state machine canvas editor
//!
//! A graph model of states and transitions, the geometry of curved and
//! self-looping transition links, and an interaction controller that turns
//! pointer input into model edits. Drawing goes through the [`RenderSurface`]
//! trait, so the core is usable without any GUI.

pub mod error;
pub mod events;
pub mod fsm;
pub mod geometry;
pub mod interaction;
pub mod model;
pub mod render;
pub mod style;

pub use error::{EditorError, EditorResult};
pub use events::{EditorEvent, EventBus, ListenerId, PointerAction};
pub use fsm::{StateDefinition, StateMachineDefinition};
pub use geometry::{compute_transition_geometry, LinkParams, PathSpec, Point, Polygon, TransitionEnd, TransitionGeometry};
pub use interaction::{InteractionController, InteractionMode, Key, Modifiers, PointerButton, PointerEvent, PointerKind};
pub use model::{GraphModel, StateEntity, StateId, TransitionEntity, TransitionId};
pub use render::{DisplayList, DrawableId, RenderSurface, SceneSync, Viewport};
pub use style::{Color, EditorOptions};
