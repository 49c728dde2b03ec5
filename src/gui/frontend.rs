use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Vec2};
use log::{info, warn};

use tag_map::graph_utils::geometry::{point, Point};
use tag_map::graph_utils::item::{ItemRef, SceneItem, Shape};
use tag_map::graph_utils::scene::{ClickOutcome, GestureState, GraphScene, PointerFrame, PointerRelease, PresetLabel};
use tag_map::persistence::notes::NoteStore;
use tag_map::persistence::persist;
use tag_map::persistence::settings::AppSettings;

const NOTICE_TTL: Duration = Duration::from_secs(4);

// Style for status-bar notices
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NoticeStyle {
    Subtle,
    Error,
}

struct Notice {
    text: String,
    style: NoticeStyle,
    at: Instant,
}

// Label dialog shown while the second click of a connection gesture waits for text
struct LabelDialog {
    start: String,
    end: String,
    text: String,
    focused: bool,
}

pub struct TagMapApp {
    scene: GraphScene,
    settings: AppSettings,
    pan: Vec2,
    zoom: f32,
    label_dialog: Option<LabelDialog>,
    notice: Option<Notice>,
    dirty: bool,
    // a failed save on close keeps the window open once; the next close wins
    close_save_failed: bool,
}

impl TagMapApp {
    pub fn new(scene: GraphScene, settings: AppSettings) -> Self {
        Self {
            scene,
            settings,
            pan: Vec2::ZERO,
            zoom: 1.0,
            label_dialog: None,
            notice: None,
            dirty: false,
            close_save_failed: false,
        }
    }

    fn notify(&mut self, text: impl Into<String>, style: NoticeStyle) {
        self.notice = Some(Notice { text: text.into(), style, at: Instant::now() });
    }

    fn save_now(&mut self) -> bool {
        let doc = self.scene.export_layout();
        match persist::save_layout(&self.settings.layout_path(), &doc) {
            Ok(path) => {
                self.dirty = false;
                info!("tag map saved to {}", path.display());
                self.notify(format!("Saved to {}", path.display()), NoticeStyle::Subtle);
                true
            }
            Err(e) => {
                warn!("saving tag map failed: {}", e);
                self.notify(format!("Save failed: {}", e), NoticeStyle::Error);
                false
            }
        }
    }

    fn save_snapshot_now(&mut self) {
        let doc = self.scene.export_layout();
        match persist::save_snapshot(&self.settings.snapshot_dir(), &doc) {
            Ok(path) => self.notify(format!("Saved snapshot {}", path.display()), NoticeStyle::Subtle),
            Err(e) => self.notify(format!("Snapshot failed: {}", e), NoticeStyle::Error),
        }
    }

    fn reload_tags(&mut self) {
        match NoteStore::load(&self.settings.notes_path()) {
            Ok(store) => {
                self.label_dialog = None;
                self.scene.refresh_tags(store.tag_set());
                self.dirty = true;
                self.notify(format!("{} tags loaded", self.scene.node_count()), NoticeStyle::Subtle);
            }
            Err(e) => self.notify(format!("Could not read notes: {}", e), NoticeStyle::Error),
        }
    }

    fn scene_to_screen(&self, origin: Pos2, p: Point) -> Pos2 {
        Pos2::new(
            origin.x + self.pan.x + p.x as f32 * self.zoom,
            origin.y + self.pan.y + p.y as f32 * self.zoom,
        )
    }

    fn screen_to_scene(&self, origin: Pos2, p: Pos2) -> Point {
        point(
            f64::from((p.x - origin.x - self.pan.x) / self.zoom),
            f64::from((p.y - origin.y - self.pan.y) / self.zoom),
        )
    }

    fn handle_click(&mut self, target: Option<ItemRef>) {
        if self.scene.click_needs_label(target.as_ref()) {
            if let (GestureState::PendingStart { node }, Some(ItemRef::Node(end))) = (self.scene.gesture(), target) {
                self.label_dialog = Some(LabelDialog {
                    start: node.clone(),
                    end,
                    text: String::new(),
                    focused: false,
                });
            }
            return;
        }
        if let ClickOutcome::Selected(_) = self.scene.click(target, &mut PresetLabel(None)) {
            self.dirty = true;
        }
    }

    fn finish_label_dialog(&mut self, label: Option<String>) {
        let Some(dialog) = self.label_dialog.take() else { return };
        let outcome = self.scene.click(Some(ItemRef::Node(dialog.end)), &mut PresetLabel(label));
        if let ClickOutcome::Connected(_) = outcome {
            self.dirty = true;
        }
    }

    fn show_label_dialog(&mut self, ctx: &egui::Context) {
        let mut answer: Option<Option<String>> = None;
        if let Some(dialog) = self.label_dialog.as_mut() {
            egui::Window::new("Connection Label")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(format!("Enter label for the connection {} - {}:", dialog.start, dialog.end));
                    let edit = ui.add(egui::TextEdit::singleline(&mut dialog.text).hint_text("label (optional)"));
                    if !dialog.focused {
                        edit.request_focus();
                        dialog.focused = true;
                    }
                    let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
                    let escape = ui.input(|i| i.key_pressed(egui::Key::Escape));
                    ui.horizontal(|ui| {
                        if ui.button("OK").clicked() || enter {
                            answer = Some(Some(dialog.text.clone()));
                        }
                        if ui.button("Cancel").clicked() || escape {
                            answer = Some(None);
                        }
                    });
                });
        }
        if let Some(label) = answer {
            self.finish_label_dialog(label);
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (resp, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let area = resp.rect;
        let origin = area.center();
        let modal = self.label_dialog.is_some();

        // Zoom with scroll only when pointer is over the canvas area
        if resp.hovered() && !modal {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                self.zoom = (self.zoom * factor).clamp(0.25, 3.0);
            }
        }
        // Middle or right drag pans the view
        if resp.dragged_by(egui::PointerButton::Middle) || resp.dragged_by(egui::PointerButton::Secondary) {
            self.pan += resp.drag_delta();
        }

        if !modal {
            let (frame, pos) = ui.input(|i| {
                let frame = PointerFrame {
                    pressed: i.pointer.primary_pressed(),
                    released: i.pointer.primary_released(),
                    down: i.pointer.primary_down(),
                };
                (frame, i.pointer.interact_pos())
            });
            // presses outside the canvas belong to other widgets
            let frame = PointerFrame { pressed: frame.pressed && resp.hovered(), ..frame };
            if let Some(pos) = pos {
                let world = self.screen_to_scene(origin, pos);
                match self.scene.pointer_frame(frame, world) {
                    Some(PointerRelease::Click(target)) => self.handle_click(target),
                    Some(PointerRelease::Moved(_)) => self.dirty = true,
                    Some(PointerRelease::RubberBand(_) | PointerRelease::Nothing) | None => {}
                }
            }

            if ui.input(|i| i.key_pressed(egui::Key::Delete)) && self.scene.key_delete() > 0 {
                self.dirty = true;
            }
            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.scene.key_escape();
            }
        }

        painter.rect_filled(area, 0.0, Color32::from_rgb(250, 250, 250));

        // Edges first so nodes paint over their clipped ends
        let font_edge = egui::FontId::proportional((12.0 * self.zoom).clamp(8.0, 20.0));
        for conn in self.scene.connections() {
            let Shape::Line { segment, .. } = conn.shape() else { continue };
            let a = self.scene_to_screen(origin, segment.a);
            let b = self.scene_to_screen(origin, segment.b);
            if conn.is_selected() {
                let stroke = Stroke::new(2.0, Color32::RED);
                painter.extend(egui::Shape::dashed_line(&[a, b], stroke, 6.0, 4.0));
            } else {
                painter.line_segment([a, b], Stroke::new(2.0, Color32::DARK_GRAY));
            }
            if self.settings.show_edge_labels && !conn.label().is_empty() {
                painter.text(
                    self.scene_to_screen(origin, conn.geometry().label_center()),
                    egui::Align2::CENTER_CENTER,
                    conn.label(),
                    font_edge.clone(),
                    Color32::from_rgb(0, 0, 139),
                );
            }
        }

        let font_node = egui::FontId::proportional((14.0 * self.zoom).clamp(8.0, 24.0));
        for node in self.scene.nodes() {
            let Shape::Ellipse { center, rx, ry } = node.shape() else { continue };
            let c = self.scene_to_screen(origin, center);
            let radius = Vec2::new(rx as f32 * self.zoom, ry as f32 * self.zoom);
            let stroke = if node.is_highlighted() {
                Stroke::new(3.0, Color32::from_rgb(0, 255, 255))
            } else {
                Stroke::new(1.0, Color32::BLACK)
            };
            painter.add(egui::Shape::ellipse_filled(c, radius, Color32::LIGHT_GRAY));
            painter.add(egui::Shape::ellipse_stroke(c, radius, stroke));
            if node.is_selected() {
                let b = node.bounds();
                let rect = Rect::from_two_pos(self.scene_to_screen(origin, b.min), self.scene_to_screen(origin, b.max));
                painter.rect_stroke(rect, 0.0, Stroke::new(1.0, Color32::GRAY), egui::StrokeKind::Outside);
            }
            painter.text(c, egui::Align2::CENTER_CENTER, node.name(), font_node.clone(), Color32::BLACK);
        }

        // Draw rectangle overlay last so it appears above nodes/edges
        if let Some(band) = self.scene.rubber_band() {
            let rect = Rect::from_two_pos(self.scene_to_screen(origin, band.min), self.scene_to_screen(origin, band.max));
            let fill = Color32::from_rgba_premultiplied(100, 150, 255, 40);
            let stroke = Stroke::new(1.0, Color32::from_rgba_premultiplied(100, 150, 255, 160));
            painter.rect_filled(rect, 0.0, fill);
            painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Inside);
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S))) {
                self.save_now();
            }
            if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::S))) {
                self.save_snapshot_now();
            }
            if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::R))) {
                self.reload_tags();
            }

            ui.horizontal(|ui| {
                ui.label("Tag Map");
                ui.menu_button("File", |ui| {
                    if ui.add(egui::Button::new("Save").shortcut_text(ctx.format_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S)))).clicked() {
                        self.save_now();
                        ui.close();
                    }
                    if ui.add(egui::Button::new("Save Snapshot").shortcut_text(ctx.format_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::S)))).clicked() {
                        self.save_snapshot_now();
                        ui.close();
                    }
                    if ui.add(egui::Button::new("Reload Tags").shortcut_text(ctx.format_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::R)))).clicked() {
                        self.reload_tags();
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    let any = self.scene.connections().any(|c| c.is_selected());
                    if ui.add_enabled(any, egui::Button::new("Delete Selected Connections")).clicked() {
                        if self.scene.delete_selected_connections() > 0 {
                            self.dirty = true;
                        }
                        ui.close();
                    }
                    if ui.button("Deselect All").clicked() {
                        self.scene.clear_selection();
                        ui.close();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Reset View").clicked() {
                        self.pan = Vec2::ZERO;
                        self.zoom = 1.0;
                        ui.close();
                    }
                    if ui.checkbox(&mut self.settings.show_edge_labels, "Connection labels").changed() {
                        if let Err(e) = self.settings.save() {
                            self.notify(format!("Failed to save preferences: {}", e), NoticeStyle::Error);
                        }
                    }
                });
            });
        });
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        if self.notice.as_ref().is_some_and(|n| n.style == NoticeStyle::Subtle && n.at.elapsed() > NOTICE_TTL) {
            self.notice = None;
        }
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match self.scene.gesture() {
                    GestureState::PendingStart { node } => {
                        ui.label(format!("Connecting from '{}': click another tag, or empty space to cancel", node));
                    }
                    GestureState::Idle => {
                        ui.small(format!(
                            "{} tags, {} connections{}",
                            self.scene.node_count(),
                            self.scene.connection_count(),
                            if self.dirty { " (unsaved)" } else { "" }
                        ));
                    }
                }
                if let Some(n) = &self.notice {
                    ui.separator();
                    match n.style {
                        NoticeStyle::Subtle => { ui.small(&n.text); }
                        NoticeStyle::Error => { ui.colored_label(Color32::RED, &n.text); }
                    }
                }
            });
        });
        if self.notice.is_some() {
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }
}

impl eframe::App for TagMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Save on close; a failed save keeps the window open once so the user sees why
        if ctx.input(|i| i.viewport().close_requested()) && !self.save_now() && !self.close_save_failed {
            self.close_save_failed = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        }

        self.menu_bar(ctx);
        self.status_bar(ctx);
        self.show_label_dialog(ctx);
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.canvas(ui));
    }
}
