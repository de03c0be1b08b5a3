//! fsm-canvas GUI - state machine canvas editor
//! Draw states and transitions on a zoomable canvas, save them as JSON

use eframe::egui;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fsm_canvas::events::EditorEvent;
use fsm_canvas::render::{DrawStyle, Shape};
use fsm_canvas::{
    Color, DisplayList, DrawableId, EditorOptions, EditorResult, GraphModel, InteractionController, InteractionMode,
    Key, Modifiers, Point, PointerButton, PointerEvent, PointerKind, StateMachineDefinition, TransitionId, Viewport,
};

const EXAMPLE_MACHINE: &str = include_str!("../demos/door.json");

/// Number of event log lines kept
const EVENT_LOG_LEN: usize = 200;

/// Segments used to flatten a link before painting
const LINK_SEGMENTS: usize = 32;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let (editor_options, machine) = parse_args();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_title("fsm-canvas - State Machine Editor"),
        ..Default::default()
    };

    eframe::run_native(
        "fsm-canvas",
        options,
        Box::new(move |cc| Ok(Box::new(CanvasApp::new(cc, editor_options, machine)))),
    )
}

/// `fsm-canvas [--options <opts.json>] [machine.json]`
fn parse_args() -> (EditorOptions, Option<PathBuf>) {
    let mut args = std::env::args().skip(1);
    let mut options = EditorOptions::default();
    let mut machine = None;
    while let Some(arg) = args.next() {
        if arg == "--options" {
            let Some(path) = args.next() else {
                log::error!("--options needs a file argument");
                continue;
            };
            match EditorOptions::load(Path::new(&path)) {
                Ok(loaded) => options = loaded,
                Err(e) => log::error!("could not load options '{}': {}", path, e),
            }
        } else {
            machine = Some(PathBuf::from(arg));
        }
    }
    (options, machine)
}

struct CanvasApp {
    controller: InteractionController,
    /// Retained drawables, kept in step by the controller
    display: DisplayList,
    /// Filled by the model's event listener
    event_log: Rc<RefCell<VecDeque<String>>>,
    /// Drawable under the pointer in the previous frame
    hovered: Option<DrawableId>,
    /// File the machine was loaded from or saved to
    file: Option<PathBuf>,
    /// Last error, shown in the side panel
    status: Option<String>,
    /// Canvas size in the previous frame, for placing new states
    canvas_size: egui::Vec2,
    new_state_name: String,
    rename_to: String,
    selected_state: String,
    event_name: String,
}

impl CanvasApp {
    fn new(_cc: &eframe::CreationContext<'_>, options: EditorOptions, machine: Option<PathBuf>) -> Self {
        let event_log = Rc::new(RefCell::new(VecDeque::new()));
        let mut model = GraphModel::new();
        let sink = Rc::clone(&event_log);
        model.subscribe(Box::new(move |event: &EditorEvent| {
            let mut log = sink.borrow_mut();
            if log.len() == EVENT_LOG_LEN {
                log.pop_front();
            }
            log.push_back(describe(event));
        }));

        let mut app = Self {
            controller: InteractionController::new(model, options),
            display: DisplayList::new(),
            event_log,
            hovered: None,
            file: None,
            status: None,
            canvas_size: egui::vec2(800.0, 600.0),
            new_state_name: String::new(),
            rename_to: String::new(),
            selected_state: String::new(),
            event_name: "next".to_string(),
        };

        let loaded = match &machine {
            Some(path) => app.open(path),
            None => app.load_source(EXAMPLE_MACHINE),
        };
        app.report(loaded);
        app
    }

    fn load_source(&mut self, source: &str) -> EditorResult<()> {
        let def = StateMachineDefinition::parse_validated(source)?;
        self.load(&def)
    }

    fn load(&mut self, def: &StateMachineDefinition) -> EditorResult<()> {
        self.controller.load_definition(def)?;
        self.hovered = None;
        self.selected_state = self
            .controller
            .model()
            .initial_state()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.controller.reset_viewport();
        Ok(())
    }

    fn open(&mut self, path: &Path) -> EditorResult<()> {
        let content = std::fs::read_to_string(path)?;
        self.load_source(&content)?;
        self.file = Some(path.to_path_buf());
        log::info!("opened {}", path.display());
        Ok(())
    }

    fn save(&mut self, path: &Path) -> EditorResult<()> {
        let json = self.controller.model().export_definition().to_json_pretty()?;
        std::fs::write(path, json)?;
        self.file = Some(path.to_path_buf());
        log::info!("saved {}", path.display());
        Ok(())
    }

    /// Record the outcome of a user action in the status line
    fn report<T>(&mut self, result: EditorResult<T>) {
        match result {
            Ok(_) => self.status = None,
            Err(e) => {
                log::warn!("{}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    fn unused_state_name(&self) -> String {
        let model = self.controller.model();
        (1..)
            .map(|n| format!("S{}", n))
            .find(|name| model.state_by_name(name).is_none())
            .unwrap_or_default()
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("New").clicked() {
                    let result = self.load(&StateMachineDefinition::default());
                    self.file = None;
                    self.report(result);
                    ui.close_menu();
                }
                if ui.button("Open Example").clicked() {
                    let result = self.load_source(EXAMPLE_MACHINE);
                    self.file = None;
                    self.report(result);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("📂 Open...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().add_filter("JSON", &["json"]).pick_file() {
                        let result = self.open(&path);
                        self.report(result);
                    }
                    ui.close_menu();
                }
                if ui.button("💾 Save").clicked() {
                    let path = self
                        .file
                        .clone()
                        .or_else(|| rfd::FileDialog::new().add_filter("JSON", &["json"]).save_file());
                    if let Some(path) = path {
                        let result = self.save(&path);
                        self.report(result);
                    }
                    ui.close_menu();
                }
                if ui.button("Save As...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().add_filter("JSON", &["json"]).save_file() {
                        let result = self.save(&path);
                        self.report(result);
                    }
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Reset Zoom").clicked() {
                    self.controller.reset_viewport();
                    ui.close_menu();
                }
                if ui.button("Load Options...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().add_filter("JSON", &["json"]).pick_file() {
                        let result = EditorOptions::load(&path).and_then(|options| self.controller.set_options(options));
                        self.report(result);
                    }
                    ui.close_menu();
                }
                if ui.button("Default Options").clicked() {
                    let result = self.controller.set_options(EditorOptions::default());
                    self.report(result);
                    ui.close_menu();
                }
                if ui.button("Clear Event Log").clicked() {
                    self.event_log.borrow_mut().clear();
                    ui.close_menu();
                }
            });

            ui.separator();
            ui.label(format!("{:?}", self.controller.mode()));
            ui.label(format!("zoom {:.2}", self.controller.viewport().zoom));
            if let Some(path) = &self.file {
                ui.label(path.display().to_string());
            }
        });
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("States");
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.new_state_name)
                    .desired_width(120.0)
                    .hint_text("name"),
            );
            if ui.button("➕ Add").clicked() {
                let name = if self.new_state_name.trim().is_empty() {
                    self.unused_state_name()
                } else {
                    self.new_state_name.trim().to_string()
                };
                let viewport = self.controller.viewport();
                let center = viewport.to_canvas(Point::new(
                    f64::from(self.canvas_size.x) / 2.0,
                    f64::from(self.canvas_size.y) / 2.0,
                ));
                let result = self.controller.model_mut().add_state(&name, center.x, center.y).map(|_| ());
                if result.is_ok() {
                    self.selected_state = name;
                    self.new_state_name.clear();
                }
                self.report(result);
            }
        });

        let names: Vec<String> = self.controller.model().states().iter().map(|s| s.name.clone()).collect();
        let selected_text = if self.selected_state.is_empty() {
            "(select a state)".to_string()
        } else {
            self.selected_state.clone()
        };
        egui::ComboBox::from_id_salt("selected_state")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for name in &names {
                    ui.selectable_value(&mut self.selected_state, name.clone(), name.as_str());
                }
            });

        let selected = self.selected_state.clone();
        ui.add_enabled_ui(!selected.is_empty(), |ui| {
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.rename_to)
                        .desired_width(120.0)
                        .hint_text("new name"),
                );
                if ui.button("Rename").clicked() {
                    let new = self.rename_to.trim().to_string();
                    let result = self.controller.model_mut().rename_state(&selected, &new);
                    if result.is_ok() {
                        self.selected_state = new;
                        self.rename_to.clear();
                    }
                    self.report(result);
                }
            });
            ui.horizontal(|ui| {
                if ui.button("Set Initial").clicked() {
                    let result = self.controller.model_mut().set_initial_state(&selected);
                    self.report(result);
                }
                if ui.button("Set Current").clicked() {
                    self.controller.model_mut().set_current_state(Some(&selected));
                }
                if ui.button("🗑 Delete").clicked() {
                    let result = self.controller.model_mut().delete_state(&selected);
                    if result.is_ok() {
                        self.selected_state.clear();
                    }
                    self.report(result);
                }
            });
        });
        if ui.button("Clear Current").clicked() {
            self.controller.model_mut().set_current_state(None);
        }

        ui.separator();
        ui.heading("Transitions");
        let drafting = self.controller.mode() == InteractionMode::DraftingTransition;
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.event_name)
                    .desired_width(120.0)
                    .hint_text("event"),
            );
            if drafting {
                if ui.button("✖ Cancel").clicked() {
                    self.controller.cancel_transition();
                }
            } else if ui
                .add_enabled(!selected.is_empty(), egui::Button::new("✏ Draw"))
                .on_hover_text("Draw from the selected state")
                .clicked()
            {
                let hint = self
                    .controller
                    .model()
                    .state_by_name(&selected)
                    .map(|s| s.position)
                    .unwrap_or(Point::ZERO);
                let event = self.event_name.trim().to_string();
                let result = self.controller.begin_transition(&event, &selected, hint);
                self.report(result);
            }
        });
        if drafting {
            ui.small("Click a destination state, Esc cancels");
        }

        let mut delete: Option<TransitionId> = None;
        egui::ScrollArea::vertical()
            .id_salt("transitions")
            .max_height(220.0)
            .show(ui, |ui| {
                let model = self.controller.model();
                for transition in model.transitions() {
                    let src = model.state(transition.src).map(|s| s.name.as_str()).unwrap_or("?");
                    let dest = transition
                        .dest
                        .and_then(|d| model.state(d))
                        .map(|s| s.name.as_str())
                        .unwrap_or("?");
                    ui.horizontal(|ui| {
                        if ui.small_button("🗑").clicked() {
                            delete = Some(transition.id);
                        }
                        ui.label(format!("{} --{}--> {}", src, transition.name, dest));
                    });
                }
            });
        if let Some(id) = delete {
            let result = self.controller.model_mut().delete_transition(id);
            self.report(result);
        }

        if let Some(status) = &self.status {
            ui.separator();
            ui.colored_label(egui::Color32::LIGHT_RED, status);
        }
    }

    fn event_log(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .id_salt("event_log")
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in self.event_log.borrow().iter() {
                    ui.monospace(line);
                }
            });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        self.canvas_size = rect.size();

        self.handle_input(ui.ctx(), rect);

        self.controller.present(&mut self.display);
        if self.display.take_redraw_request() {
            ui.ctx().request_repaint();
        }

        painter.rect_filled(rect, 0.0, color32(self.controller.options().background_color));
        let viewport = self.display.viewport;
        let to_screen = |p: Point| -> egui::Pos2 {
            let client = viewport.to_client(p);
            rect.min + egui::vec2(client.x as f32, client.y as f32)
        };

        // Links first so nodes cover their trimmed ends
        for (id, drawable) in &self.display.items {
            if let Shape::Link { geometry, label } = &drawable.shape {
                let hovered = self.hovered == Some(*id);
                paint_link(&painter, geometry, label, &drawable.style, viewport, hovered, &to_screen);
            }
        }
        for (id, drawable) in &self.display.items {
            if let Shape::Node { center, radius, label } = &drawable.shape {
                let hovered = self.hovered == Some(*id);
                let zoom = viewport.zoom as f32;
                let stroke_width = drawable.style.stroke_width as f32 * if hovered { 2.0 } else { 1.0 };
                painter.circle(
                    to_screen(*center),
                    *radius as f32 * zoom,
                    drawable.style.fill.map(color32).unwrap_or(egui::Color32::TRANSPARENT),
                    egui::Stroke::new(stroke_width * zoom, color32(drawable.style.stroke)),
                );
                painter.text(
                    to_screen(*center),
                    egui::Align2::CENTER_CENTER,
                    label,
                    egui::FontId::proportional(14.0 * zoom),
                    color32(drawable.style.text_color),
                );
            }
        }
    }

    /// Translate this frame's egui input into controller calls
    fn handle_input(&mut self, ctx: &egui::Context, rect: egui::Rect) {
        let viewport = self.controller.viewport();
        let (hover_pos, delta, modifiers, scroll, escape) = ctx.input(|i| {
            (
                i.pointer.hover_pos(),
                i.pointer.delta(),
                i.modifiers,
                i.raw_scroll_delta,
                i.key_pressed(egui::Key::Escape),
            )
        });

        if escape {
            self.controller.handle_key(Key::Escape);
        }

        let Some(pos) = hover_pos else {
            return;
        };
        let inside = rect.contains(pos);
        let client = Point::new(f64::from(pos.x - rect.min.x), f64::from(pos.y - rect.min.y));
        let canvas = viewport.to_canvas(client);
        let target = if inside { self.display.pick(canvas) } else { None };
        let modifiers = Modifiers {
            alt: modifiers.alt,
            ctrl: modifiers.ctrl,
            shift: modifiers.shift,
        };
        let event = |kind, target, button| PointerEvent {
            kind,
            target,
            canvas,
            client,
            button,
            modifiers,
        };

        let mut results = Vec::new();
        if target != self.hovered {
            if let Some(old) = self.hovered {
                results.push(self.controller.handle_pointer(&event(PointerKind::Leave, Some(old), PointerButton::Primary)));
            }
            if target.is_some() {
                results.push(self.controller.handle_pointer(&event(PointerKind::Enter, target, PointerButton::Primary)));
            }
            self.hovered = target;
        }

        let busy = self.controller.mode() != InteractionMode::Idle;
        if delta != egui::Vec2::ZERO && (inside || busy) {
            results.push(self.controller.handle_pointer(&event(PointerKind::Move, target, PointerButton::Primary)));
        }

        for (egui_button, button) in [
            (egui::PointerButton::Primary, PointerButton::Primary),
            (egui::PointerButton::Secondary, PointerButton::Secondary),
            (egui::PointerButton::Middle, PointerButton::Middle),
        ] {
            let (pressed, released, double) = ctx.input(|i| {
                (
                    i.pointer.button_pressed(egui_button),
                    i.pointer.button_released(egui_button),
                    i.pointer.button_double_clicked(egui_button),
                )
            });
            if pressed && inside {
                results.push(self.controller.handle_pointer(&event(PointerKind::Down, target, button)));
            }
            if double && inside {
                results.push(self.controller.handle_pointer(&event(PointerKind::DoubleClick, target, button)));
            }
            if released {
                results.push(self.controller.handle_pointer(&event(PointerKind::Up, target, button)));
            }
        }

        if inside && scroll.y != 0.0 {
            let wheel = PointerKind::Wheel {
                delta_y: f64::from(scroll.y),
            };
            results.push(self.controller.handle_pointer(&event(wheel, target, PointerButton::Primary)));
        }

        for result in results {
            if result.is_err() {
                self.report(result);
            }
        }
    }
}

impl eframe::App for CanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                self.controls(ui);
            });

        egui::TopBottomPanel::bottom("event_log")
            .resizable(true)
            .default_height(140.0)
            .show(ctx, |ui| {
                ui.label("Events");
                self.event_log(ui);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.canvas(ui);
            });
    }
}

fn paint_link(
    painter: &egui::Painter,
    geometry: &fsm_canvas::TransitionGeometry,
    label: &str,
    style: &DrawStyle,
    viewport: Viewport,
    hovered: bool,
    to_screen: &impl Fn(Point) -> egui::Pos2,
) {
    let zoom = viewport.zoom as f32;
    let mut color = color32(style.stroke);
    if !style.interactive {
        color = color.gamma_multiply(0.6);
    }
    let width = style.stroke_width as f32 * zoom * if hovered { 2.0 } else { 1.0 };

    let points: Vec<egui::Pos2> = geometry.link.flatten(LINK_SEGMENTS).into_iter().map(to_screen).collect();
    painter.add(egui::Shape::line(points, egui::Stroke::new(width, color)));

    let arrow: Vec<egui::Pos2> = geometry.arrow.points.iter().copied().map(to_screen).collect();
    painter.add(egui::Shape::convex_polygon(arrow, color, egui::Stroke::NONE));

    painter.text(
        to_screen(geometry.link.label_anchor()),
        egui::Align2::CENTER_BOTTOM,
        label,
        egui::FontId::proportional(12.0 * zoom),
        color32(style.text_color),
    );
}

fn color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

fn describe(event: &EditorEvent) -> String {
    match event {
        EditorEvent::StateMachineChanged { state_machine } => format!(
            "{} ({} states, {} transitions)",
            event.name(),
            state_machine.states.len(),
            state_machine.transition_count()
        ),
        EditorEvent::State { state, .. } => format!("{} {}", event.name(), state.name),
        EditorEvent::Transition { transition, .. } => format!("{} {}", event.name(), transition.name),
        EditorEvent::Canvas { pointer, .. } => {
            format!("{} at ({:.0}, {:.0})", event.name(), pointer.canvas.x, pointer.canvas.y)
        }
    }
}
