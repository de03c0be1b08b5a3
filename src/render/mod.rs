//! Rendering seam
//!
//! The core never draws. It describes each state and transition as a
//! [`Drawable`] and keeps a [`RenderSurface`] in step with the graph model
//! through [`SceneSync`], which only forwards what changed.

use std::collections::BTreeMap;

use crate::geometry::{Point, TransitionGeometry};
use crate::model::{GraphModel, StateId, TransitionId};
use crate::style::{color_for_label, Color, EditorOptions};


/// Tolerance, in canvas units, for picking a transition link
pub const LINK_PICK_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawableId {
    State(StateId),
    Transition(TransitionId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Node {
        center: Point,
        radius: f64,
        label: String,
    },
    Link {
        geometry: TransitionGeometry,
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawStyle {
    pub fill: Option<Color>,
    pub stroke: Color,
    pub stroke_width: f64,
    pub text_color: Color,
    /// Whether the drawable reports pointer events
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub shape: Shape,
    pub style: DrawStyle,
}

/// Maps canvas space to client space: `client = canvas * zoom + pan`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ZERO,
        }
    }
}

impl Viewport {
    pub fn to_client(&self, canvas: Point) -> Point {
        Point::new(canvas.x * self.zoom + self.pan.x, canvas.y * self.zoom + self.pan.y)
    }

    pub fn to_canvas(&self, client: Point) -> Point {
        Point::new((client.x - self.pan.x) / self.zoom, (client.y - self.pan.y) / self.zoom)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan.offset(dx, dy);
    }

    /// Change the zoom while keeping the canvas point under `client` fixed
    pub fn zoom_at(&mut self, client: Point, zoom: f64) {
        let anchor = self.to_canvas(client);
        self.zoom = zoom;
        self.pan = Point::new(client.x - anchor.x * zoom, client.y - anchor.y * zoom);
    }
}

/// Drawing capability the core consumes
pub trait RenderSurface {
    fn add_drawable(&mut self, id: DrawableId, drawable: &Drawable);
    fn remove_drawable(&mut self, id: DrawableId);
    fn set_drawable_style(&mut self, id: DrawableId, style: &DrawStyle);
    fn set_drawable_shape(&mut self, id: DrawableId, shape: &Shape);
    fn set_viewport(&mut self, viewport: Viewport);
    fn request_redraw(&mut self);
}

/// Retained list of drawables, for immediate-mode front-ends that repaint
/// everything each frame
#[derive(Debug, Default)]
pub struct DisplayList {
    pub items: BTreeMap<DrawableId, Drawable>,
    pub viewport: Viewport,
    redraw_requested: bool,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the redraw flag
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Drawable under a canvas-space point
    pub fn pick(&self, point: Point) -> Option<DrawableId> {
        pick(&self.items, point, LINK_PICK_TOLERANCE / self.viewport.zoom.max(f64::EPSILON))
    }
}

impl RenderSurface for DisplayList {
    fn add_drawable(&mut self, id: DrawableId, drawable: &Drawable) {
        self.items.insert(id, drawable.clone());
    }

    fn remove_drawable(&mut self, id: DrawableId) {
        self.items.remove(&id);
    }

    fn set_drawable_style(&mut self, id: DrawableId, style: &DrawStyle) {
        if let Some(item) = self.items.get_mut(&id) {
            item.style = style.clone();
        }
    }

    fn set_drawable_shape(&mut self, id: DrawableId, shape: &Shape) {
        if let Some(item) = self.items.get_mut(&id) {
            item.shape = shape.clone();
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }
}

/// Topmost interactive drawable at `point`; nodes win over links
pub fn pick(items: &BTreeMap<DrawableId, Drawable>, point: Point, tolerance: f64) -> Option<DrawableId> {
    let interactive = || items.iter().filter(|(_, d)| d.style.interactive);

    let node = interactive().find(|(_, d)| match &d.shape {
        Shape::Node { center, radius, .. } => center.distance(point) <= *radius,
        Shape::Link { .. } => false,
    });
    if let Some((id, _)) = node {
        return Some(*id);
    }

    interactive()
        .filter_map(|(id, d)| match &d.shape {
            Shape::Link { geometry, .. } => {
                if geometry.arrow.contains(point) {
                    return Some((*id, 0.0));
                }
                let distance = geometry.link.distance_to(point);
                (distance <= tolerance).then_some((*id, distance))
            }
            Shape::Node { .. } => None,
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Build the desired scene for the model
pub fn build_scene(model: &GraphModel, options: &EditorOptions) -> BTreeMap<DrawableId, Drawable> {
    let mut scene = BTreeMap::new();

    for state in model.states() {
        let stroke = if state.is_initial {
            options.initial_state_stroke
        } else {
            options.state_stroke
        };
        let fill = if state.is_active {
            options.current_state_fill
        } else {
            options.state_fill
        };
        scene.insert(
            DrawableId::State(state.id),
            Drawable {
                shape: Shape::Node {
                    center: state.position,
                    radius: options.state_radius,
                    label: state.name.clone(),
                },
                style: DrawStyle {
                    fill: Some(fill),
                    stroke,
                    stroke_width: 2.0,
                    text_color: options.text_color,
                    interactive: true,
                },
            },
        );
    }

    let params = options.link_params();
    let committed = model.transitions().iter().map(|t| (t, true));
    let draft = model.draft().into_iter().map(|t| (t, false));
    for (transition, interactive) in committed.chain(draft) {
        let Some(geometry) = model.geometry(transition, params) else {
            continue;
        };
        let color = color_for_label(&transition.name);
        scene.insert(
            DrawableId::Transition(transition.id),
            Drawable {
                shape: Shape::Link {
                    geometry,
                    label: transition.name.clone(),
                },
                style: DrawStyle {
                    fill: Some(color),
                    stroke: color,
                    stroke_width: 2.0,
                    text_color: options.text_color,
                    interactive,
                },
            },
        );
    }

    scene
}

/// Keeps a surface consistent with the model by diffing against what was
/// last sent to it
#[derive(Debug, Default)]
pub struct SceneSync {
    drawn: BTreeMap<DrawableId, Drawable>,
    viewport: Option<Viewport>,
}

impl SceneSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the differences to `surface`; returns true if anything changed
    pub fn sync(
        &mut self,
        model: &GraphModel,
        options: &EditorOptions,
        viewport: Viewport,
        surface: &mut dyn RenderSurface,
    ) -> bool {
        let desired = build_scene(model, options);
        let mut changed = false;

        for id in self.drawn.keys() {
            if !desired.contains_key(id) {
                surface.remove_drawable(*id);
                changed = true;
            }
        }

        for (id, drawable) in &desired {
            match self.drawn.get(id) {
                None => {
                    surface.add_drawable(*id, drawable);
                    changed = true;
                }
                Some(old) => {
                    if old.style != drawable.style {
                        surface.set_drawable_style(*id, &drawable.style);
                        changed = true;
                    }
                    if old.shape != drawable.shape {
                        surface.set_drawable_shape(*id, &drawable.shape);
                        changed = true;
                    }
                }
            }
        }

        if self.viewport != Some(viewport) {
            surface.set_viewport(viewport);
            self.viewport = Some(viewport);
            changed = true;
        }

        if changed {
            log::trace!("scene synced: {} drawables", desired.len());
            surface.request_redraw();
        }
        self.drawn = desired;
        changed
    }
}
