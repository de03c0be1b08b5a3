//! Interaction controller
//!
//! Turns pointer and keyboard input into graph model operations and domain
//! events. Only ids are held across events: the model owns every entity, and
//! a drag or draft session forgets its ids as soon as it ends.

use crate::error::{EditorError, EditorResult};
use crate::events::{EditorEvent, PointerAction, PointerLocation, StateRef, TransitionRef};
use crate::fsm::StateMachineDefinition;
use crate::geometry::Point;
use crate::model::{GraphModel, StateId, TransitionId};
use crate::render::{DrawableId, RenderSurface, SceneSync, Viewport};
use crate::style::EditorOptions;


/// Wheel delta that changes the zoom by 1.0
const WHEEL_ZOOM_DIVISOR: f64 = 200.0;

/// High-level interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    PanningCanvas,
    DraggingState,
    DraftingTransition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerKind {
    Down,
    Up,
    Move,
    DoubleClick,
    /// Pointer entered the target drawable
    Enter,
    /// Pointer left the target drawable
    Leave,
    Wheel { delta_y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
}

/// Pointer input as reported by a rendering adapter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub target: Option<DrawableId>,
    pub canvas: Point,
    pub client: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
}

#[derive(Debug, Clone, Copy)]
struct DragSession {
    state: StateId,
    grab_offset: Point,
    origin: Point,
}

#[derive(Debug)]
pub struct InteractionController {
    model: GraphModel,
    options: EditorOptions,
    viewport: Viewport,
    mode: InteractionMode,
    drag: Option<DragSession>,
    last_client: Point,
    scene: SceneSync,
}

impl InteractionController {
    pub fn new(model: GraphModel, options: EditorOptions) -> Self {
        Self {
            model,
            options,
            viewport: Viewport::default(),
            mode: InteractionMode::Idle,
            drag: None,
            last_client: Point::ZERO,
            scene: SceneSync::new(),
        }
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// Direct access for externally driven edits (add/delete/rename, ...)
    pub fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Swap in new options; invalid ones are rejected and the old ones kept
    pub fn set_options(&mut self, options: EditorOptions) -> EditorResult<()> {
        options.validate().map_err(EditorError::Validation)?;
        self.viewport.zoom = options.clamp_zoom(self.viewport.zoom);
        self.options = options;
        Ok(())
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn reset_viewport(&mut self) {
        self.viewport = Viewport::default();
    }

    /// Replace the machine; any drag, pan or draft in progress is dropped
    pub fn load_definition(&mut self, def: &StateMachineDefinition) -> EditorResult<()> {
        self.model.load_definition(def)?;
        self.drag = None;
        self.transition_to(InteractionMode::Idle);
        Ok(())
    }

    /// Start drawing a transition from `src`
    pub fn begin_transition(&mut self, event: &str, src: &str, hint: Point) -> EditorResult<TransitionId> {
        self.reconcile();
        if matches!(self.mode, InteractionMode::PanningCanvas | InteractionMode::DraggingState) {
            return Err(EditorError::Conflict(format!(
                "cannot draw a transition while {:?}",
                self.mode
            )));
        }
        let id = self.model.begin_transition(event, src, hint.x, hint.y)?.id;
        self.transition_to(InteractionMode::DraftingTransition);
        Ok(id)
    }

    /// Commit the draft explicitly, without a pointer click
    pub fn commit_transition(&mut self) -> EditorResult<TransitionId> {
        let id = self.model.commit_draft()?;
        self.transition_to(InteractionMode::Idle);
        Ok(id)
    }

    /// Discard the draft; returns false if none was open
    pub fn cancel_transition(&mut self) -> bool {
        let cancelled = self.model.cancel_draft();
        if self.mode == InteractionMode::DraftingTransition {
            self.transition_to(InteractionMode::Idle);
        }
        cancelled
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) -> EditorResult<()> {
        self.reconcile();
        match event.kind {
            PointerKind::Down => self.pointer_down(event),
            PointerKind::Move => self.pointer_move(event),
            PointerKind::Up => {
                self.pointer_up();
                Ok(())
            }
            PointerKind::DoubleClick => {
                self.emit_for_target(event, PointerAction::DoubleClick);
                Ok(())
            }
            PointerKind::Enter => {
                self.hover(event, true);
                Ok(())
            }
            PointerKind::Leave => {
                self.hover(event, false);
                Ok(())
            }
            PointerKind::Wheel { delta_y } => {
                self.zoom(event.client, delta_y);
                Ok(())
            }
        }
    }

    pub fn handle_key(&mut self, key: Key) {
        self.reconcile();
        match key {
            Key::Escape => match self.mode {
                InteractionMode::DraftingTransition => {
                    self.cancel_transition();
                }
                InteractionMode::DraggingState => {
                    if let Some(drag) = self.drag.take() {
                        // reconcile() above guarantees the dragged state is alive
                        if let Err(e) = self.model.move_state(drag.state, drag.origin) {
                            log::warn!("could not restore dragged state: {}", e);
                        }
                    }
                    self.transition_to(InteractionMode::Idle);
                }
                InteractionMode::PanningCanvas => self.transition_to(InteractionMode::Idle),
                InteractionMode::Idle => {}
            },
        }
    }

    /// Bring `surface` up to date with the model and viewport
    pub fn present(&mut self, surface: &mut dyn RenderSurface) -> bool {
        self.scene.sync(&self.model, &self.options, self.viewport, surface)
    }

    // ------------------------------------------------------------------

    fn pointer_down(&mut self, event: &PointerEvent) -> EditorResult<()> {
        match event.target {
            None => {
                if self.mode == InteractionMode::Idle && event.modifiers.alt {
                    self.last_client = event.client;
                    self.transition_to(InteractionMode::PanningCanvas);
                    return Ok(());
                }
                self.emit_for_target(event, click_action(event.button));
            }
            Some(DrawableId::State(id)) => {
                self.emit_for_target(event, click_action(event.button));
                match self.mode {
                    InteractionMode::DraftingTransition => {
                        let name = self.model.state(id).map(|s| s.name.clone());
                        if let Some(name) = name {
                            self.model.set_draft_destination(Some(&name));
                        }
                        if self.model.draft().is_some_and(|d| d.dest.is_some()) {
                            self.commit_transition()?;
                        }
                    }
                    InteractionMode::Idle => {
                        if event.button == PointerButton::Primary && self.options.selectable_states {
                            self.start_drag(id, event.canvas);
                        }
                    }
                    InteractionMode::PanningCanvas | InteractionMode::DraggingState => {}
                }
            }
            Some(DrawableId::Transition(_)) => {
                self.emit_for_target(event, click_action(event.button));
            }
        }
        Ok(())
    }

    fn pointer_move(&mut self, event: &PointerEvent) -> EditorResult<()> {
        match self.mode {
            InteractionMode::PanningCanvas => {
                let delta = event.client.delta_from(self.last_client);
                self.viewport.pan_by(delta.x, delta.y);
                self.last_client = event.client;
            }
            InteractionMode::DraggingState => {
                if let Some(drag) = self.drag {
                    let to = event.canvas.delta_from(drag.grab_offset);
                    self.model.move_state(drag.state, to)?;
                }
            }
            InteractionMode::DraftingTransition => {
                self.model.update_draft_hint(event.canvas.x, event.canvas.y);
            }
            InteractionMode::Idle => {}
        }
        Ok(())
    }

    fn pointer_up(&mut self) {
        match self.mode {
            InteractionMode::PanningCanvas => self.transition_to(InteractionMode::Idle),
            InteractionMode::DraggingState => {
                self.drag = None;
                self.transition_to(InteractionMode::Idle);
                self.model.publish_change();
            }
            InteractionMode::DraftingTransition | InteractionMode::Idle => {}
        }
    }

    fn hover(&mut self, event: &PointerEvent, entered: bool) {
        if event.target.is_none() {
            return;
        }
        let action = if entered {
            PointerAction::HoverEnter
        } else {
            PointerAction::HoverExit
        };
        self.emit_for_target(event, action);

        let (InteractionMode::DraftingTransition, Some(DrawableId::State(id))) = (self.mode, event.target) else {
            return;
        };
        if entered {
            let name = self.model.state(id).map(|s| s.name.clone());
            self.model.set_draft_destination(name.as_deref());
        } else if self.model.draft().is_some_and(|d| d.dest == Some(id)) {
            self.model.set_draft_destination(None);
        }
    }

    fn zoom(&mut self, client: Point, delta_y: f64) {
        let zoom = self
            .options
            .clamp_zoom(self.viewport.zoom + delta_y / WHEEL_ZOOM_DIVISOR);
        if !(zoom.is_finite() && zoom > 0.0) {
            log::warn!("ignoring wheel zoom to {}", zoom);
            return;
        }
        self.viewport.zoom_at(client, zoom);
    }

    fn start_drag(&mut self, state: StateId, grab: Point) {
        let Some(position) = self.model.state(state).map(|s| s.position) else {
            return;
        };
        self.drag = Some(DragSession {
            state,
            grab_offset: grab.delta_from(position),
            origin: position,
        });
        self.transition_to(InteractionMode::DraggingState);
    }

    fn emit_for_target(&mut self, event: &PointerEvent, action: PointerAction) {
        let pointer = PointerLocation {
            canvas: event.canvas,
            client: event.client,
        };
        let domain = match event.target {
            None => Some(EditorEvent::Canvas { action, pointer }),
            Some(DrawableId::State(id)) => self.model.state(id).map(|s| EditorEvent::State {
                action,
                state: StateRef {
                    name: s.name.clone(),
                    position: s.position,
                },
                pointer,
            }),
            Some(DrawableId::Transition(id)) => self.transition_ref(id).map(|transition| EditorEvent::Transition {
                action,
                transition,
                pointer,
            }),
        };
        if let Some(domain) = domain {
            self.model.emit(&domain);
        }
    }

    fn transition_ref(&self, id: TransitionId) -> Option<TransitionRef> {
        let transition = self.model.transition(id)?;
        let src = self.model.state(transition.src)?;
        Some(TransitionRef {
            id: id.raw(),
            name: transition.name.clone(),
            src: src.name.clone(),
            dest: transition
                .dest
                .and_then(|d| self.model.state(d))
                .map(|s| s.name.clone()),
        })
    }

    /// Realign the mode with the model after direct model edits
    fn reconcile(&mut self) {
        match self.mode {
            InteractionMode::DraftingTransition if self.model.draft().is_none() => {
                self.transition_to(InteractionMode::Idle);
            }
            InteractionMode::DraggingState => {
                let alive = self
                    .drag
                    .is_some_and(|d| self.model.state(d.state).is_some());
                if !alive {
                    self.drag = None;
                    self.transition_to(InteractionMode::Idle);
                }
            }
            _ => {}
        }
        if self.mode == InteractionMode::Idle && self.model.draft().is_some() {
            self.transition_to(InteractionMode::DraftingTransition);
        }
    }

    fn transition_to(&mut self, mode: InteractionMode) {
        if self.mode != mode {
            log::debug!("interaction: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
}

fn click_action(button: PointerButton) -> PointerAction {
    match button {
        PointerButton::Secondary => PointerAction::RightClick,
        PointerButton::Primary | PointerButton::Middle => PointerAction::Click,
    }
}
