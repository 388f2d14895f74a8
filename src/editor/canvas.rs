//! Structure Canvas
//!
//! Native egui rendering of the current level with:
//! - Pan (drag empty space or middle mouse) and zoom at the cursor
//! - Node selection, dragging and drill-down on double-click
//! - Click-to-click connection drawing with a rubber-band preview
//! - Context menu for per-node actions

use eframe::egui::{self, Align2, FontId, Painter, Pos2, Rect, Sense, Stroke, Vec2};

use super::geometry::{self, ARROW_LENGTH, ARROW_SPREAD, LABEL_CHIP_RADIUS};
use super::node::{Node, NodeId};
use super::state::EditorState;
use super::viewport::Viewport;
use crate::editor::ConnectionType;
use crate::theme::{contrast_text, Theme};

/// Characters of a node name shown inside its circle
const NAME_CHARS: usize = 14;

/// Requests the canvas cannot fulfil on its own
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasAction {
    /// Open the code editor for a leaf node
    OpenCode(NodeId),
    /// Ask the AI for children of a node
    Suggest(NodeId),
    /// Add a node at a world position on the current level
    AddNodeAt(Pos2),
}

pub struct CanvasView {
    /// Whether to show grid
    pub show_grid: bool,

    /// Grid size in world units
    pub grid_size: f32,

    /// Label given to the next connection
    pub connection_label: String,

    pub hovered_node: Option<NodeId>,

    dragging_node: Option<NodeId>,

    is_panning: bool,

    /// Canvas size from the last frame
    canvas_size: Vec2,

    /// Target of the open context menu
    context_node: Option<NodeId>,

    /// World position of the last secondary click
    context_world: Pos2,

    /// Center the world origin on the next frame
    center_pending: bool,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self::new(true, 40.0)
    }
}

impl CanvasView {
    pub fn new(show_grid: bool, grid_size: f32) -> Self {
        Self {
            show_grid,
            grid_size: grid_size.max(4.0),
            connection_label: String::new(),
            hovered_node: None,
            dragging_node: None,
            is_panning: false,
            canvas_size: Vec2::ZERO,
            context_node: None,
            context_world: Pos2::ZERO,
            center_pending: true,
        }
    }

    /// Zoom 1.0 with the world origin in the middle of the canvas
    pub fn reset_view(&mut self, editor: &mut EditorState) {
        editor.viewport.reset();
        if self.canvas_size == Vec2::ZERO {
            self.center_pending = true;
        } else {
            editor.viewport.center_on(Pos2::ZERO, self.canvas_size);
        }
    }

    /// Frame every node of the current level
    pub fn fit_to_level(&mut self, editor: &mut EditorState) {
        if self.canvas_size == Vec2::ZERO {
            return;
        }
        let points: Vec<Pos2> = editor.current_level().iter().map(Node::position).collect();
        let margin = editor.node_radius() * 1.5;
        editor.viewport.fit(&points, margin, self.canvas_size);
    }

    pub fn canvas_size(&self) -> Vec2 {
        self.canvas_size
    }

    /// World position under the middle of the canvas
    pub fn visible_center(&self, editor: &EditorState) -> Pos2 {
        editor
            .viewport
            .screen_to_world((self.canvas_size / 2.0).to_pos2())
    }

    /// Main UI function
    pub fn ui(&mut self, ui: &mut egui::Ui, editor: &mut EditorState, theme: &Theme) -> Vec<CanvasAction> {
        let available_size = ui.available_size();
        let (response, painter) = ui.allocate_painter(available_size, Sense::click_and_drag());
        let rect = response.rect;
        self.canvas_size = rect.size();
        if self.center_pending && rect.width() > 0.0 {
            editor.viewport.center_on(Pos2::ZERO, self.canvas_size);
            self.center_pending = false;
        }

        let mut actions = Vec::new();
        self.handle_input(ui, &response, editor, &mut actions);
        self.context_menu(&response, editor, &mut actions);

        painter.rect_filled(rect, 0.0, theme.canvas_bg);
        if self.show_grid {
            self.draw_grid(&painter, rect, &editor.viewport, theme);
        }
        self.draw_connections(&painter, rect, editor, theme);
        self.draw_preview(&painter, rect, editor, theme);
        self.draw_nodes(&painter, rect, editor, theme);

        if editor.current_level().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Empty level. Right-click to add a node.",
                FontId::proportional(14.0),
                theme.fg_dim,
            );
        }

        if self.dragging_node.is_some() || self.is_panning || editor.tool().is_pending() {
            ui.ctx().request_repaint();
        }
        actions
    }

    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        editor: &mut EditorState,
        actions: &mut Vec<CanvasAction>,
    ) {
        let rect = response.rect;
        let local = |pos: Pos2| pos - rect.min.to_vec2();
        let (hover_pos, press_origin, scroll) =
            ui.input(|i| (i.pointer.hover_pos(), i.pointer.press_origin(), i.raw_scroll_delta.y));

        self.hovered_node = hover_pos
            .filter(|p| rect.contains(*p))
            .and_then(|p| editor.hit_test_node(local(p)));

        if let Some(pos) = hover_pos.filter(|p| rect.contains(*p)) {
            if editor.tool().is_pending() {
                let world = editor.viewport.screen_to_world(local(pos));
                editor.update_temp_connection(world.x, world.y);
            }
        }

        // Zoom at the cursor
        if response.hovered() && scroll != 0.0 {
            if let Some(pos) = hover_pos {
                editor.viewport.wheel(local(pos), scroll);
            }
        }

        if response.drag_started_by(egui::PointerButton::Primary) {
            let grabbed = press_origin.and_then(|p| editor.hit_test_node(local(p)));
            match grabbed {
                Some(id) => self.dragging_node = Some(id),
                None => self.is_panning = true,
            }
        }
        if response.drag_started_by(egui::PointerButton::Middle) {
            self.is_panning = true;
        }

        if response.dragged() {
            let delta = response.drag_delta();
            if let Some(id) = self.dragging_node.clone() {
                let zoom = editor.viewport.zoom();
                let position = editor.tree().find(&id).map(|n| n.position() + delta / zoom);
                if let Some(position) = position {
                    editor.move_node(&id, position);
                }
            } else if self.is_panning {
                editor.viewport.pan_by(delta);
            }
        }

        if response.drag_stopped() {
            self.dragging_node = None;
            self.is_panning = false;
        }

        let clicked_at = response.interact_pointer_pos().map(local);

        if response.double_clicked() {
            if let Some(id) = clicked_at.and_then(|p| editor.hit_test_node(p)) {
                let has_children = editor.tree().find(&id).is_some_and(Node::has_children);
                if has_children {
                    editor.navigate_to_node(&id);
                } else {
                    actions.push(CanvasAction::OpenCode(id));
                }
            }
        } else if response.clicked() {
            let hit = clicked_at.and_then(|p| editor.hit_test_node(p));
            if editor.tool().is_pending() {
                match hit {
                    Some(target) => {
                        let label = take_label(&mut self.connection_label);
                        editor.finish_connection(&target, label);
                    }
                    None => editor.cancel_connection(),
                }
            } else {
                editor.select(hit.as_deref());
            }
        }

        if response.secondary_clicked() {
            if let Some(pos) = clicked_at {
                self.context_node = editor.hit_test_node(pos);
                self.context_world = editor.viewport.screen_to_world(pos);
            }
        }
    }

    fn context_menu(&mut self, response: &egui::Response, editor: &mut EditorState, actions: &mut Vec<CanvasAction>) {
        let target = self.context_node.clone();
        let world = self.context_world;
        let mut reset_view = false;
        let mut fit = false;

        response.context_menu(|ui| {
            match target.as_deref().and_then(|id| editor.tree().find(id).cloned()) {
                Some(node) => {
                    ui.label(format!("{} {}", node.node_type.icon(), node.name));
                    ui.separator();
                    if ui.button("🔗 Connect from here").clicked() {
                        editor.start_connection(&node.id);
                        ui.close_menu();
                    }
                    if node.has_children() && ui.button("⤵ Drill down").clicked() {
                        editor.navigate_to_node(&node.id);
                        ui.close_menu();
                    }
                    if !node.has_children() && ui.button("📝 Edit code").clicked() {
                        actions.push(CanvasAction::OpenCode(node.id.clone()));
                        ui.close_menu();
                    }
                    if node.node_type.child_type().is_some() && ui.button("✨ Suggest children").clicked() {
                        actions.push(CanvasAction::Suggest(node.id.clone()));
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("🗑 Delete").clicked() {
                        editor.delete_node(&node.id);
                        ui.close_menu();
                    }
                }
                None => {
                    if ui.button("➕ Add node here").clicked() {
                        actions.push(CanvasAction::AddNodeAt(world));
                        ui.close_menu();
                    }
                    if ui.button("⟲ Reset view").clicked() {
                        reset_view = true;
                        ui.close_menu();
                    }
                    if ui.button("⛶ Fit to nodes").clicked() {
                        fit = true;
                        ui.close_menu();
                    }
                }
            }
        });

        if reset_view {
            self.reset_view(editor);
        }
        if fit {
            self.fit_to_level(editor);
        }
    }

    /// Draw the grid
    fn draw_grid(&self, painter: &Painter, rect: Rect, viewport: &Viewport, theme: &Theme) {
        let grid_size = self.grid_size * viewport.zoom();
        if grid_size < 4.0 {
            return;
        }
        let offset = Vec2::new(
            viewport.pan.x.rem_euclid(grid_size),
            viewport.pan.y.rem_euclid(grid_size),
        );
        let start = rect.min + offset;
        let stroke = Stroke::new(1.0, theme.grid_color);

        let mut x = start.x;
        while x < rect.max.x {
            painter.line_segment([Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)], stroke);
            x += grid_size;
        }

        let mut y = start.y;
        while y < rect.max.y {
            painter.line_segment([Pos2::new(rect.min.x, y), Pos2::new(rect.max.x, y)], stroke);
            y += grid_size;
        }
    }

    fn draw_connections(&self, painter: &Painter, rect: Rect, editor: &EditorState, theme: &Theme) {
        let level = editor.current_level();
        let viewport = &editor.viewport;
        let zoom = viewport.zoom();
        let position_of = |id: &str| level.iter().find(|n| n.id == id).map(Node::position);

        for connection in editor.connections_for_level() {
            let (Some(from), Some(to)) = (position_of(&connection.source_id), position_of(&connection.target_id))
            else {
                continue;
            };
            let color = theme.connection_color(connection.connection_type);
            let stroke = Stroke::new((2.0 * zoom).clamp(1.0, 4.0), color);
            let a = to_screen(rect, viewport, from);
            let b = to_screen(rect, viewport, to);

            if connection.connection_type == ConnectionType::Conditional {
                draw_dashed_line(painter, a, b, stroke, 8.0 * zoom.max(0.5));
            } else {
                painter.line_segment([a, b], stroke);
            }

            let tip = geometry::arrow_tip(from, to, editor.node_radius());
            let [left, right] = geometry::arrow_chevron(from, tip, ARROW_LENGTH, ARROW_SPREAD);
            let tip = to_screen(rect, viewport, tip);
            painter.line_segment([tip, to_screen(rect, viewport, left)], stroke);
            painter.line_segment([tip, to_screen(rect, viewport, right)], stroke);

            if let Some(label) = connection.label.as_deref() {
                let center = to_screen(rect, viewport, geometry::midpoint(from, to));
                painter.circle(center, LABEL_CHIP_RADIUS * zoom, theme.label_chip, Stroke::new(1.0, color));
                painter.text(
                    center,
                    Align2::CENTER_CENTER,
                    label,
                    FontId::proportional((11.0 * zoom).clamp(7.0, 22.0)),
                    theme.edge_text,
                );
            }
        }
    }

    /// Rubber band from the pending source to the pointer
    fn draw_preview(&self, painter: &Painter, rect: Rect, editor: &EditorState, theme: &Theme) {
        let tool = editor.tool();
        let (Some(source_id), Some(preview)) = (tool.source_id(), tool.preview()) else {
            return;
        };
        let Some(source) = editor.current_node().find_child_by_id(source_id) else {
            return;
        };
        let a = to_screen(rect, &editor.viewport, source.position());
        let b = to_screen(rect, &editor.viewport, preview);
        draw_dashed_line(painter, a, b, Stroke::new(2.0, theme.accent), 6.0);
    }

    fn draw_nodes(&self, painter: &Painter, rect: Rect, editor: &EditorState, theme: &Theme) {
        let viewport = &editor.viewport;
        let zoom = viewport.zoom();
        let radius = editor.node_radius() * zoom;
        let selected = editor.selected();
        let pending_source = editor.tool().source_id();

        for node in editor.current_level() {
            let center = to_screen(rect, viewport, node.position());
            if !rect.expand(radius).contains(center) {
                continue;
            }
            let fill = theme.node_fill(node.node_type);

            let stroke = if selected == Some(node.id.as_str()) {
                Stroke::new(3.0, theme.node_selected)
            } else if pending_source == Some(node.id.as_str()) {
                Stroke::new(3.0, theme.accent)
            } else if self.hovered_node.as_deref() == Some(node.id.as_str()) {
                Stroke::new(2.0, theme.node_hover)
            } else {
                Stroke::new(1.0, theme.node_stroke)
            };
            painter.circle(center, radius, fill, stroke);

            let text_color = contrast_text(fill);
            painter.text(
                center - Vec2::new(0.0, radius * 0.3),
                Align2::CENTER_CENTER,
                node.node_type.icon(),
                FontId::proportional((16.0 * zoom).clamp(6.0, 40.0)),
                text_color,
            );
            painter.text(
                center + Vec2::new(0.0, radius * 0.25),
                Align2::CENTER_CENTER,
                display_name(&node.name),
                FontId::proportional((12.0 * zoom).clamp(6.0, 30.0)),
                text_color,
            );

            if node.has_children() {
                let badge = center + Vec2::new(radius * 0.72, -radius * 0.72);
                let badge_radius = (9.0 * zoom).clamp(5.0, 18.0);
                painter.circle_filled(badge, badge_radius, theme.accent);
                painter.text(
                    badge,
                    Align2::CENTER_CENTER,
                    node.children.len().to_string(),
                    FontId::proportional(badge_radius * 1.1),
                    theme.node_text,
                );
            }
        }
    }
}

/// Canvas-local viewport output shifted into the painter's coordinates
fn to_screen(rect: Rect, viewport: &Viewport, world: Pos2) -> Pos2 {
    rect.min + viewport.world_to_screen(world).to_vec2()
}

/// Draw a dashed line
fn draw_dashed_line(painter: &Painter, start: Pos2, end: Pos2, stroke: Stroke, dash_len: f32) {
    let dir = end - start;
    let len = dir.length();
    if len <= f32::EPSILON || dash_len <= 0.0 {
        return;
    }
    let dir = dir / len;

    let mut pos = 0.0;
    let mut drawing = true;
    while pos < len {
        let next = (pos + dash_len).min(len);
        if drawing {
            painter.line_segment([start + dir * pos, start + dir * next], stroke);
        }
        pos = next;
        drawing = !drawing;
    }
}

fn display_name(name: &str) -> String {
    if name.chars().count() > NAME_CHARS {
        let mut short: String = name.chars().take(NAME_CHARS - 1).collect();
        short.push('…');
        short
    } else {
        name.to_string()
    }
}

/// Trimmed label, leaving the buffer empty
fn take_label(buffer: &mut String) -> Option<String> {
    let label = std::mem::take(buffer);
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_screen_offsets_by_canvas_origin() {
        let rect = Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(800.0, 600.0));
        let mut viewport = Viewport::default();
        viewport.set_zoom(2.0);
        viewport.pan = Vec2::new(10.0, 20.0);
        assert_eq!(to_screen(rect, &viewport, Pos2::new(5.0, 5.0)), Pos2::new(120.0, 80.0));
    }

    #[test]
    fn test_display_name_truncates() {
        assert_eq!(display_name("Checkout"), "Checkout");
        let long = display_name("Payment reconciliation");
        assert_eq!(long.chars().count(), NAME_CHARS);
        assert!(long.ends_with('…'));
    }

    #[test]
    fn test_take_label() {
        let mut buffer = "  order  ".to_string();
        assert_eq!(take_label(&mut buffer), Some("order".to_string()));
        assert!(buffer.is_empty());
        assert_eq!(take_label(&mut buffer), None);
    }

    #[test]
    fn test_reset_view_before_first_frame() {
        let mut view = CanvasView::default();
        let mut editor = EditorState::default();
        editor.viewport.pan = Vec2::new(3.0, 4.0);
        view.reset_view(&mut editor);
        assert_eq!(editor.viewport.pan, Vec2::ZERO);
        assert!(view.center_pending);
    }
}
