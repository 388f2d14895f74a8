//! Arbor Studio desktop app: panels around the structure canvas

use eframe::egui::{self, Color32, Key, RichText, Vec2};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use arbor_studio::ai::{SuggestionClient, SuggestionRequest, SuggestionWorker};
use arbor_studio::config::AppConfig;
use arbor_studio::document::DocumentStamp;
use arbor_studio::editor::state::DEFAULT_ROOT_NAME;
use arbor_studio::editor::{
    CanvasAction, CanvasView, ConnectionType, EditorState, NodeId, NodeType, Notice, NoticeLevel, Viewport,
};
use arbor_studio::export::generate_code;
use arbor_studio::storage::{self, AutoSave, Storage};
use arbor_studio::theme::Theme;

/// How long a toast stays on screen
const TOAST_TTL: Duration = Duration::from_secs(4);

struct Toast {
    notice: Notice,
    shown_at: Instant,
}

/// Open code editor window for a leaf node
struct CodeEditor {
    node_id: NodeId,
    title: String,
    buffer: String,
}

pub struct ArborStudio {
    editor: EditorState,
    canvas: CanvasView,
    theme: Theme,
    config: AppConfig,
    storage: Storage,
    autosave: AutoSave,

    ai_client: SuggestionClient,
    ai_worker: SuggestionWorker,

    // Toolbar state
    new_node_name: String,
    new_node_type: Option<NodeType>,

    code_editor: Option<CodeEditor>,
    confirm_new: bool,

    toasts: Vec<Toast>,
    status_message: Option<String>,
}

impl ArborStudio {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut theme = Theme::from_name(&config.theme.name);
        if let Some(accent) = &config.theme.accent {
            theme = theme.with_accent(accent);
        }
        theme.apply(&cc.egui_ctx);

        let mut editor = EditorState::new(DEFAULT_ROOT_NAME);
        editor.viewport = Viewport::new(config.canvas.min_zoom, config.canvas.max_zoom);
        editor.set_node_radius(config.canvas.node_radius);

        let storage = Storage::new(config.data_dir());
        let autosave = AutoSave::new(config.autosave_interval(), config.autosave.enabled);
        let ai_client = SuggestionClient::new(&config.ai, config.ai_timeout());

        let mut app = Self {
            editor,
            canvas: CanvasView::new(config.canvas.show_grid, config.canvas.grid_size),
            theme,
            config,
            storage,
            autosave,
            ai_client,
            ai_worker: SuggestionWorker::new(),
            new_node_name: String::new(),
            new_node_type: None,
            code_editor: None,
            confirm_new: false,
            toasts: Vec::new(),
            status_message: None,
        };
        app.restore_autosave();
        app
    }

    fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
        log::info!("{}", msg);
    }

    fn restore_autosave(&mut self) {
        if !self.autosave.is_enabled() {
            return;
        }
        match self.storage.load_autosave() {
            Ok(Some(document)) => match self.editor.load_document(document) {
                Ok(()) => {
                    let name = self.editor.tree().root().name.clone();
                    self.set_status(&format!("✓ Restored \"{}\" from auto-save", name));
                }
                Err(e) => {
                    log::warn!("Auto-save rejected: {}", e);
                    self.editor.notices.warning("The auto-save could not be restored");
                }
            },
            Ok(None) => {}
            Err(e) => {
                log::warn!("Auto-save unreadable: {}", e);
                self.editor.notices.warning("The auto-save could not be read");
            }
        }
    }

    fn save_autosave(&mut self) {
        let document = self.editor.export_document(DocumentStamp::Saved);
        match self.storage.save_autosave(&document) {
            Ok(()) => self.editor.mark_clean(),
            Err(e) => self.editor.notices.error(format!("Auto-save failed: {}", e)),
        }
        self.autosave.mark();
    }

    // ── File actions ────────────────────────────────────────────────────

    fn export_structure(&mut self) {
        let stem = arbor_studio::export::sanitize_identifier(&self.editor.tree().root().name);
        let file_name = if stem.is_empty() {
            "structure.json".to_string()
        } else {
            format!("{}.json", stem)
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Arbor structure", &["json"])
            .set_file_name(file_name)
            .save_file()
        else {
            return;
        };
        let document = self.editor.export_document(DocumentStamp::Exported);
        match storage::write_document(&path, &document) {
            Ok(()) => self.editor.notices.success(format!("Exported to {}", path.display())),
            Err(e) => self.editor.notices.error(format!("Export failed: {}", e)),
        }
    }

    fn export_code(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JavaScript", &["js"])
            .set_file_name("structure.js")
            .save_file()
        else {
            return;
        };
        let code = generate_code(self.editor.tree(), self.editor.connections());
        match std::fs::write(&path, code) {
            Ok(()) => self.editor.notices.success(format!("Code skeleton written to {}", path.display())),
            Err(e) => self.editor.notices.error(format!("Code export failed: {}", e)),
        }
    }

    fn import_structure(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Arbor structure", &["json"])
            .pick_file()
        else {
            return;
        };
        self.import_from(path);
    }

    fn import_from(&mut self, path: PathBuf) {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                self.editor.notices.error(format!("Could not read {}: {}", path.display(), e));
                return;
            }
        };
        if self.editor.import_document(&text).is_ok() {
            self.code_editor = None;
            self.canvas.reset_view(&mut self.editor);
        }
    }

    fn new_project(&mut self) {
        if let Err(e) = self.storage.clear_autosave() {
            log::warn!("Could not remove the previous auto-save: {}", e);
        }
        self.editor.reset(DEFAULT_ROOT_NAME);
        self.code_editor = None;
        self.canvas.reset_view(&mut self.editor);
        self.set_status("✓ Started a new structure");
    }

    // ── Nodes ───────────────────────────────────────────────────────────

    fn add_node_at(&mut self, world: egui::Pos2) {
        let node_type = self.new_node_type.unwrap_or_else(|| self.editor.default_child_type());
        let name = if self.new_node_name.trim().is_empty() {
            format!("New {}", node_type.label())
        } else {
            std::mem::take(&mut self.new_node_name).trim().to_string()
        };
        match self.editor.add_node(&name, node_type, world) {
            Ok(id) => self.editor.select(Some(&id)),
            Err(e) => self.editor.notices.error(e.to_string()),
        }
    }

    fn open_code_editor(&mut self, id: &str) {
        if let Some(node) = self.editor.tree().find(id) {
            self.code_editor = Some(CodeEditor {
                node_id: node.id.clone(),
                title: node.name.clone(),
                buffer: node.metadata.code.clone(),
            });
        }
    }

    // ── AI ──────────────────────────────────────────────────────────────

    fn request_suggestions(&mut self, id: &str) {
        if self.ai_worker.is_busy() {
            self.editor.notices.info("A suggestion request is already running");
            return;
        }
        let Some(request) = SuggestionRequest::for_node(self.editor.tree(), id, self.config.ai.max_suggestions)
        else {
            return;
        };
        if let Err(e) = request.validate() {
            self.editor.notices.warning(e.user_message());
            return;
        }
        let name = request.target_name.clone();
        if self.ai_worker.spawn(self.ai_client.clone(), request) {
            self.set_status(&format!("⏳ Asking for children of {}...", name));
        }
    }

    fn poll_suggestions(&mut self) {
        let Some(outcome) = self.ai_worker.poll() else {
            return;
        };
        match outcome.result {
            Ok(suggestions) if suggestions.is_empty() => {
                self.editor.notices.info("The AI had no suggestions");
            }
            Ok(suggestions) => {
                let added = self.editor.apply_suggestions(&outcome.target_id, &suggestions);
                if added > 0 {
                    self.editor.notices.success(format!("Added {} suggested nodes", added));
                } else {
                    self.editor.notices.warning("The node was removed before suggestions arrived");
                }
            }
            Err(e) => {
                log::warn!("Suggestion request failed: {}", e);
                self.editor.notices.error(e.user_message());
            }
        }
        self.status_message = None;
    }

    // ── Input ───────────────────────────────────────────────────────────

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (escape, delete, back, connect, reset) = ctx.input(|i| {
            (
                i.key_pressed(Key::Escape),
                i.key_pressed(Key::Delete),
                i.key_pressed(Key::Backspace),
                i.key_pressed(Key::C) && i.modifiers.is_none(),
                i.key_pressed(Key::F) && i.modifiers.is_none(),
            )
        });

        if escape {
            if self.editor.tool().is_pending() {
                self.editor.cancel_connection();
            } else {
                self.editor.select(None);
            }
        }
        if delete {
            if let Some(id) = self.editor.selected().map(str::to_string) {
                self.editor.delete_node(&id);
            }
        }
        if back {
            self.editor.navigate_back();
        }
        if connect {
            if let Some(id) = self.editor.selected().map(str::to_string) {
                self.editor.start_connection(&id);
            }
        }
        if reset {
            self.canvas.reset_view(&mut self.editor);
        }
    }

    fn collect_notices(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| now.duration_since(t.shown_at) < TOAST_TTL);
        self.toasts.extend(self.editor.notices.drain().into_iter().map(|notice| Toast {
            notice,
            shown_at: now,
        }));
    }

    // ── Panels ──────────────────────────────────────────────────────────

    fn show_breadcrumbs(&mut self, ui: &mut egui::Ui, theme: Theme) {
        ui.horizontal(|ui| {
            let can_go_back = self.editor.navigation().depth() > 1;
            if ui
                .add_enabled(can_go_back, egui::Button::new("⬅"))
                .on_hover_text("Back (Backspace)")
                .clicked()
            {
                self.editor.navigate_back();
            }
            ui.add_space(4.0);

            let crumbs = self.editor.breadcrumbs();
            let last = crumbs.len().saturating_sub(1);
            for crumb in crumbs {
                if crumb.index > 0 {
                    ui.label(RichText::new("›").color(theme.fg_dim));
                }
                if crumb.index == last {
                    ui.label(RichText::new(&crumb.name).strong().color(theme.fg_bright));
                } else if ui.link(crumb.name.as_str()).clicked() {
                    self.editor.navigate_to_stack_index(crumb.index);
                }
            }
        });
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui, theme: Theme) {
        ui.horizontal_wrapped(|ui| {
            let default_type = self.editor.default_child_type();
            ui.add(
                egui::TextEdit::singleline(&mut self.new_node_name)
                    .hint_text(format!("New {}", default_type.label()))
                    .desired_width(140.0),
            );
            let selected_text = match self.new_node_type {
                Some(t) => format!("{} {}", t.icon(), t.label()),
                None => format!("Auto ({})", default_type.label()),
            };
            egui::ComboBox::from_id_salt("new_node_type")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.new_node_type, None, "Auto");
                    for t in NodeType::ALL {
                        ui.selectable_value(&mut self.new_node_type, Some(t), format!("{} {}", t.icon(), t.label()));
                    }
                });
            if ui.button("➕ Add").clicked() {
                let center = self.canvas.visible_center(&self.editor);
                self.add_node_at(center);
            }

            ui.separator();

            let selected = self.editor.selected().map(str::to_string);
            let pending = self.editor.tool().is_pending();
            let connect_label = if pending { "✖ Cancel link" } else { "🔗 Connect" };
            if ui
                .add_enabled(pending || selected.is_some(), egui::Button::new(connect_label))
                .on_hover_text("Link the selected node to a sibling (C)")
                .clicked()
            {
                if pending {
                    self.editor.cancel_connection();
                } else if let Some(id) = &selected {
                    self.editor.start_connection(id);
                }
            }
            ui.add(
                egui::TextEdit::singleline(&mut self.canvas.connection_label)
                    .hint_text("label")
                    .desired_width(80.0),
            );

            ui.separator();

            let suggest_target = selected.unwrap_or_else(|| self.editor.current_node().id.clone());
            let busy = self.ai_worker.is_busy();
            let has_key = self.ai_client.has_api_key();
            let hover = match self.ai_worker.in_flight() {
                Some(target) => {
                    let name = self.editor.tree().find(target).map_or(target, |n| n.name.as_str());
                    format!("Waiting for suggestions for {}", name)
                }
                None if !has_key => format!("Set ${} to enable suggestions", self.ai_client.api_key_env()),
                None => "Ask the AI for children of the selected node".to_string(),
            };
            if ui
                .add_enabled(
                    has_key && !busy,
                    egui::Button::new(if busy { "⏳ Thinking" } else { "✨ Suggest" }),
                )
                .on_hover_text(hover.as_str())
                .on_disabled_hover_text(hover)
                .clicked()
            {
                self.request_suggestions(&suggest_target);
            }

            ui.separator();

            if ui.button("📂 Import").clicked() {
                self.import_structure();
            }
            if ui.button("💾 Export").clicked() {
                self.export_structure();
            }
            if ui.button("📜 Code").on_hover_text("Export a code skeleton").clicked() {
                self.export_code();
            }
            if ui.button("🆕 New").clicked() {
                if self.editor.is_dirty() {
                    self.confirm_new = true;
                } else {
                    self.new_project();
                }
            }

            ui.separator();
            ui.checkbox(&mut self.canvas.show_grid, "Grid");
            if ui.button("⟲").on_hover_text("Reset view (F)").clicked() {
                self.canvas.reset_view(&mut self.editor);
            }
            ui.label(
                RichText::new(format!("{:.0}%", self.editor.viewport.zoom() * 100.0)).color(theme.fg_dim),
            );
        });
    }

    fn show_properties(&mut self, ui: &mut egui::Ui, theme: Theme) {
        ui.heading("Properties");
        ui.separator();

        let Some(id) = self.editor.selected().map(str::to_string) else {
            let current = self.editor.current_node();
            ui.label(RichText::new(format!("{} {}", current.node_type.icon(), current.name)).strong());
            ui.label(
                RichText::new(format!("{} nodes on this level", current.children.len())).color(theme.fg_dim),
            );
            ui.add_space(8.0);
            ui.label(RichText::new("Select a node to edit it.").color(theme.fg_dim));
            return;
        };
        let Some(node) = self.editor.tree().find(&id).cloned() else {
            return;
        };

        ui.label("Name");
        let mut name = node.name.clone();
        if ui.text_edit_singleline(&mut name).changed() {
            self.editor.rename_node(&id, &name);
        }

        ui.label("Type");
        let mut node_type = node.node_type;
        egui::ComboBox::from_id_salt("node_type")
            .selected_text(format!("{} {}", node_type.icon(), node_type.label()))
            .show_ui(ui, |ui| {
                for t in NodeType::ALL {
                    ui.selectable_value(&mut node_type, t, format!("{} {}", t.icon(), t.label()));
                }
            });
        if node_type != node.node_type {
            self.editor.set_node_type(&id, node_type);
        }

        ui.label("Description");
        let mut description = node.metadata.description.clone();
        if ui
            .add(egui::TextEdit::multiline(&mut description).desired_rows(3))
            .changed()
        {
            self.editor.set_description(&id, &description);
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if node.has_children() {
                if ui.button(format!("⤵ Open ({})", node.children.len())).clicked() {
                    self.editor.navigate_to_node(&id);
                }
            } else if ui.button("📝 Edit code").clicked() {
                self.open_code_editor(&id);
            }
            if ui.button(RichText::new("🗑 Delete").color(theme.error)).clicked() {
                self.editor.delete_node(&id);
            }
        });

        ui.add_space(10.0);
        ui.label(RichText::new("Connections").strong());
        ui.separator();

        let level = self.editor.current_level();
        let name_of = |nid: &str| {
            level
                .iter()
                .find(|n| n.id == nid)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| nid.to_string())
        };
        let rows: Vec<(String, String, String, Option<String>, ConnectionType)> = self
            .editor
            .connections()
            .connections_for_node(&id)
            .into_iter()
            .map(|c| {
                (
                    c.id.clone(),
                    name_of(&c.source_id),
                    name_of(&c.target_id),
                    c.label.clone(),
                    c.connection_type,
                )
            })
            .collect();

        if rows.is_empty() {
            ui.label(RichText::new("None").color(theme.fg_dim));
        }
        for (conn_id, source, target, label, connection_type) in rows {
            ui.push_id(&conn_id, |ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("{} → {}", source, target));
                    if ui.small_button("✖").on_hover_text("Delete connection").clicked() {
                        self.editor.delete_connection(&conn_id);
                    }
                });
                ui.horizontal(|ui| {
                    let mut text = label.unwrap_or_default();
                    if ui
                        .add(egui::TextEdit::singleline(&mut text).hint_text("label").desired_width(90.0))
                        .changed()
                    {
                        self.editor.set_connection_label(&conn_id, Some(text));
                    }
                    let mut kind = connection_type;
                    egui::ComboBox::from_id_salt("connection_type")
                        .selected_text(kind.label())
                        .width(90.0)
                        .show_ui(ui, |ui| {
                            for t in ConnectionType::ALL {
                                ui.selectable_value(&mut kind, t, t.label());
                            }
                        });
                    if kind != connection_type {
                        self.editor.set_connection_type(&conn_id, kind);
                    }
                });
            });
            ui.add_space(4.0);
        }
    }

    fn show_status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let level = self.editor.current_level().len();
            let connections = self.editor.connections_for_level().len();
            ui.label(
                RichText::new(format!(
                    "{} nodes · {} connections · {} total",
                    level,
                    connections,
                    self.editor.tree().node_count()
                ))
                .color(Color32::WHITE),
            );
            if self.editor.tool().is_pending() {
                ui.label(RichText::new("· click a sibling to connect, Esc to cancel").color(Color32::WHITE));
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if self.editor.is_dirty() {
                    ui.label(RichText::new("● unsaved").color(Color32::WHITE));
                }
                if let Some(msg) = &self.status_message {
                    ui.label(RichText::new(msg).color(Color32::WHITE));
                }
            });
        });
    }

    fn show_code_editor(&mut self, ctx: &egui::Context) {
        let Some(code_editor) = self.code_editor.as_mut() else {
            return;
        };
        if !self.editor.tree().contains(&code_editor.node_id) {
            self.code_editor = None;
            return;
        }

        let mut open = true;
        let mut save = false;
        let mut close = false;
        egui::Window::new(format!("📝 {}", code_editor.title))
            .open(&mut open)
            .default_size(Vec2::new(560.0, 420.0))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().max_height(360.0).show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut code_editor.buffer)
                            .code_editor()
                            .desired_rows(18)
                            .desired_width(f32::INFINITY),
                    );
                });
                ui.horizontal(|ui| {
                    save = ui.button("💾 Save").clicked();
                    close = ui.button("Close").clicked();
                });
            });

        if save {
            let (id, code) = (code_editor.node_id.clone(), code_editor.buffer.clone());
            if self.editor.set_code(&id, &code) {
                self.editor.notices.success("Code saved");
            }
        }
        if !open || close {
            self.code_editor = None;
        }
    }

    fn show_confirm_new(&mut self, ctx: &egui::Context) {
        if !self.confirm_new {
            return;
        }
        egui::Window::new("Start a new structure?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Unsaved changes will be lost unless exported.");
                ui.horizontal(|ui| {
                    if ui.button("Discard and start over").clicked() {
                        self.confirm_new = false;
                        self.new_project();
                    }
                    if ui.button("Cancel").clicked() {
                        self.confirm_new = false;
                    }
                });
            });
    }

    fn show_toasts(&self, ctx: &egui::Context, theme: Theme) {
        if self.toasts.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, Vec2::new(-16.0, -40.0))
            .order(egui::Order::Foreground)
            .interactable(false)
            .show(ctx, |ui| {
                for toast in &self.toasts {
                    let color = match toast.notice.level {
                        NoticeLevel::Info => theme.accent,
                        NoticeLevel::Success => theme.success,
                        NoticeLevel::Warning => theme.warning,
                        NoticeLevel::Error => theme.error,
                    };
                    egui::Frame::popup(ui.style())
                        .stroke(egui::Stroke::new(1.0, color))
                        .show(ui, |ui| {
                            ui.label(RichText::new(&toast.notice.message).color(theme.fg));
                        });
                    ui.add_space(4.0);
                }
            });
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

impl eframe::App for ArborStudio {
    /// Flush unsaved work when the app is about to exit
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.autosave.is_enabled() && self.editor.is_dirty() {
            log::info!("Saving structure on exit...");
            self.save_autosave();
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll background work
        self.poll_suggestions();
        if self.ai_worker.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
        if self.autosave.due(self.editor.is_dirty()) {
            self.save_autosave();
        }
        if self.autosave.is_enabled() && self.editor.is_dirty() {
            ctx.request_repaint_after(self.autosave.remaining());
        }

        self.handle_shortcuts(ctx);

        let theme = self.theme;

        egui::TopBottomPanel::top("breadcrumbs")
            .frame(
                egui::Frame::none()
                    .fill(theme.bg)
                    .inner_margin(egui::Margin::symmetric(12.0, 6.0)),
            )
            .show(ctx, |ui| self.show_breadcrumbs(ui, theme));

        egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::none()
                    .fill(theme.sidebar_bg)
                    .inner_margin(egui::Margin::symmetric(12.0, 6.0)),
            )
            .show(ctx, |ui| self.show_toolbar(ui, theme));

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .frame(
                egui::Frame::none()
                    .fill(theme.statusbar_bg)
                    .inner_margin(egui::Margin::symmetric(12.0, 4.0)),
            )
            .show(ctx, |ui| self.show_status_bar(ui));

        egui::SidePanel::right("properties")
            .default_width(260.0)
            .width_range(200.0..=420.0)
            .resizable(true)
            .frame(
                egui::Frame::none()
                    .fill(theme.sidebar_bg)
                    .inner_margin(egui::Margin::same(10.0)),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.show_properties(ui, theme));
            });

        let actions = egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme.canvas_bg))
            .show(ctx, |ui| self.canvas.ui(ui, &mut self.editor, &theme))
            .inner;

        for action in actions {
            match action {
                CanvasAction::OpenCode(id) => self.open_code_editor(&id),
                CanvasAction::Suggest(id) => self.request_suggestions(&id),
                CanvasAction::AddNodeAt(world) => self.add_node_at(world),
            }
        }

        self.show_code_editor(ctx);
        self.show_confirm_new(ctx);

        self.collect_notices();
        self.show_toasts(ctx, theme);
    }
}
