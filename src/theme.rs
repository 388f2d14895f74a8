//! Theme definitions for the editor chrome and the structure canvas

use eframe::egui::{self, Color32, Stroke};

use crate::editor::{ConnectionType, NodeType};

/// VS Code Dark+ inspired theme
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub bg: Color32,
    pub sidebar_bg: Color32,
    pub statusbar_bg: Color32,
    pub input_bg: Color32,
    pub code_bg: Color32,

    pub fg: Color32,
    pub fg_dim: Color32,
    pub fg_bright: Color32,

    pub accent: Color32,
    pub accent_hover: Color32,

    pub success: Color32,
    pub warning: Color32,
    pub error: Color32,

    pub border: Color32,

    // Canvas
    pub canvas_bg: Color32,
    pub grid_color: Color32,
    pub node_stroke: Color32,
    pub node_selected: Color32,
    pub node_hover: Color32,
    pub node_text: Color32,
    pub edge_text: Color32,
    pub label_chip: Color32,

    // Node fills by type
    pub domain_fill: Color32,
    pub process_fill: Color32,
    pub logic_fill: Color32,
    pub code_fill: Color32,

    // Connection colors by type
    pub edge_normal: Color32,
    pub edge_conditional: Color32,
    pub edge_loop: Color32,
    pub edge_llm: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color32::from_rgb(30, 30, 30),           // #1e1e1e
            sidebar_bg: Color32::from_rgb(37, 37, 38),   // #252526
            statusbar_bg: Color32::from_rgb(0, 122, 204), // #007acc
            input_bg: Color32::from_rgb(60, 60, 60),     // #3c3c3c
            code_bg: Color32::from_rgb(26, 26, 26),      // #1a1a1a

            fg: Color32::from_rgb(204, 204, 204),        // #cccccc
            fg_dim: Color32::from_rgb(128, 128, 128),    // #808080
            fg_bright: Color32::from_rgb(255, 255, 255), // #ffffff

            accent: Color32::from_rgb(0, 120, 212),        // #0078d4
            accent_hover: Color32::from_rgb(26, 140, 255), // #1a8cff

            success: Color32::from_rgb(63, 185, 80), // #3fb950
            warning: Color32::from_rgb(204, 167, 0), // #cca700
            error: Color32::from_rgb(248, 81, 73),   // #f85149

            border: Color32::from_rgb(60, 60, 60), // #3c3c3c

            canvas_bg: Color32::from_rgb(24, 24, 27),
            grid_color: Color32::from_rgba_unmultiplied(255, 255, 255, 15),
            node_stroke: Color32::from_rgb(90, 90, 100),
            node_selected: Color32::from_rgb(255, 200, 60),
            node_hover: Color32::from_rgb(26, 140, 255),
            node_text: Color32::from_rgb(240, 240, 240),
            edge_text: Color32::from_rgb(230, 230, 230),
            label_chip: Color32::from_rgb(50, 50, 56),

            domain_fill: Color32::from_rgb(94, 53, 177),   // violet
            process_fill: Color32::from_rgb(21, 101, 192), // blue
            logic_fill: Color32::from_rgb(0, 131, 143),    // teal
            code_fill: Color32::from_rgb(46, 125, 50),     // green

            edge_normal: Color32::from_rgb(160, 160, 170),
            edge_conditional: Color32::from_rgb(255, 167, 38),
            edge_loop: Color32::from_rgb(171, 71, 188),
            edge_llm: Color32::from_rgb(38, 198, 218),
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color32::from_rgb(255, 255, 255),         // #ffffff
            sidebar_bg: Color32::from_rgb(243, 243, 243), // #f3f3f3
            statusbar_bg: Color32::from_rgb(0, 122, 204), // #007acc
            input_bg: Color32::from_rgb(255, 255, 255),   // #ffffff
            code_bg: Color32::from_rgb(248, 248, 248),    // #f8f8f8

            fg: Color32::from_rgb(51, 51, 51),        // #333333
            fg_dim: Color32::from_rgb(128, 128, 128), // #808080
            fg_bright: Color32::from_rgb(0, 0, 0),    // #000000

            accent: Color32::from_rgb(0, 120, 212),      // #0078d4
            accent_hover: Color32::from_rgb(0, 90, 158), // #005a9e

            success: Color32::from_rgb(40, 140, 60),
            warning: Color32::from_rgb(180, 130, 0),
            error: Color32::from_rgb(200, 40, 40),

            border: Color32::from_rgb(200, 200, 200),

            canvas_bg: Color32::from_rgb(250, 250, 252),
            grid_color: Color32::from_rgba_unmultiplied(0, 0, 0, 15),
            node_stroke: Color32::from_rgb(120, 120, 130),
            node_selected: Color32::from_rgb(230, 140, 0),
            node_hover: Color32::from_rgb(0, 120, 212),
            node_text: Color32::from_rgb(255, 255, 255),
            edge_text: Color32::from_rgb(30, 30, 30),
            label_chip: Color32::from_rgb(235, 235, 240),

            domain_fill: Color32::from_rgb(126, 87, 194),
            process_fill: Color32::from_rgb(30, 136, 229),
            logic_fill: Color32::from_rgb(0, 151, 167),
            code_fill: Color32::from_rgb(67, 160, 71),

            edge_normal: Color32::from_rgb(100, 100, 110),
            edge_conditional: Color32::from_rgb(239, 108, 0),
            edge_loop: Color32::from_rgb(142, 36, 170),
            edge_llm: Color32::from_rgb(0, 151, 167),
        }
    }

    /// Theme by config name; unknown names fall back to dark
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light" => Self::light(),
            "dark" => Self::dark(),
            other => {
                log::warn!("Unknown theme '{}', using dark", other);
                Self::dark()
            }
        }
    }

    /// Override the accent with a hex color; invalid strings are ignored
    pub fn with_accent(mut self, hex: &str) -> Self {
        match parse_color(hex) {
            Some(color) => {
                self.accent = color;
                self.accent_hover = lighten(color, 0.15);
                self.node_hover = color;
            }
            None => log::warn!("Ignoring invalid accent color '{}'", hex),
        }
        self
    }

    pub fn node_fill(&self, node_type: NodeType) -> Color32 {
        match node_type {
            NodeType::Domain => self.domain_fill,
            NodeType::Process => self.process_fill,
            NodeType::Logic => self.logic_fill,
            NodeType::Code => self.code_fill,
        }
    }

    pub fn connection_color(&self, connection_type: ConnectionType) -> Color32 {
        match connection_type {
            ConnectionType::Normal => self.edge_normal,
            ConnectionType::Conditional => self.edge_conditional,
            ConnectionType::Loop => self.edge_loop,
            ConnectionType::Llm => self.edge_llm,
        }
    }

    /// Check if this is a light theme
    pub fn is_light(&self) -> bool {
        let brightness = (self.bg.r() as u32 + self.bg.g() as u32 + self.bg.b() as u32) / 3;
        brightness > 128
    }

    /// Push the theme into egui's visuals
    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = if self.is_light() {
            egui::Visuals::light()
        } else {
            egui::Visuals::dark()
        };
        visuals.panel_fill = self.sidebar_bg;
        visuals.extreme_bg_color = self.input_bg;
        visuals.code_bg_color = self.code_bg;
        visuals.selection.bg_fill = self.accent;
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, self.accent);
        visuals.widgets.active.bg_fill = self.accent;
        ctx.set_visuals(visuals);
    }
}

/// Parse a hex color string to Color32
pub fn parse_color(color_str: &str) -> Option<Color32> {
    let hex = color_str.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }

    if hex.len() == 6 {
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color32::from_rgb(r, g, b))
    } else if hex.len() == 8 {
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
        Some(Color32::from_rgba_unmultiplied(r, g, b, a))
    } else {
        None
    }
}

fn lighten(color: Color32, amount: f32) -> Color32 {
    let mix = |c: u8| (c as f32 + (255.0 - c as f32) * amount).round() as u8;
    Color32::from_rgb(mix(color.r()), mix(color.g()), mix(color.b()))
}

/// Readable text color for a given fill
pub fn contrast_text(fill: Color32) -> Color32 {
    let luma = 0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32;
    if luma > 150.0 {
        Color32::from_rgb(20, 20, 20)
    } else {
        Color32::WHITE
    }
}
