//! Canvas Viewport
//!
//! Pan/zoom transform between world (model) coordinates and canvas-local
//! screen pixels: `screen = world * zoom + pan`.

use eframe::egui::{Pos2, Vec2};

/// Zoom multiplier applied per wheel notch
pub const ZOOM_STEP: f32 = 1.1;

pub const DEFAULT_MIN_ZOOM: f32 = 0.1;
pub const DEFAULT_MAX_ZOOM: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Pan offset in screen pixels
    pub pan: Vec2,

    zoom: f32,

    min_zoom: f32,

    max_zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
    }
}

impl Viewport {
    /// Create a viewport at zoom 1.0 (clamped into the bounds)
    pub fn new(min_zoom: f32, max_zoom: f32) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0_f32.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        Pos2::new(
            world.x * self.zoom + self.pan.x,
            world.y * self.zoom + self.pan.y,
        )
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        Pos2::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// Translate by a raw pixel delta; one dragged pixel moves one pixel at any zoom
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Multiply zoom by `factor`, keeping the world point under `anchor` fixed
    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        let world = self.screen_to_world(anchor);
        self.set_zoom(self.zoom * factor);
        self.pan = Vec2::new(
            anchor.x - world.x * self.zoom,
            anchor.y - world.y * self.zoom,
        );
    }

    pub fn zoom_in_at(&mut self, anchor: Pos2) {
        self.zoom_at(anchor, ZOOM_STEP);
    }

    pub fn zoom_out_at(&mut self, anchor: Pos2) {
        self.zoom_at(anchor, 1.0 / ZOOM_STEP);
    }

    /// Apply one notch of wheel input; positive scrolls zoom in
    pub fn wheel(&mut self, anchor: Pos2, scroll_y: f32) {
        if scroll_y > 0.0 {
            self.zoom_in_at(anchor);
        } else if scroll_y < 0.0 {
            self.zoom_out_at(anchor);
        }
    }

    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.set_zoom(1.0);
    }

    /// Pan so that `world` lands in the middle of a canvas of `canvas_size`
    pub fn center_on(&mut self, world: Pos2, canvas_size: Vec2) {
        self.pan = Vec2::new(
            canvas_size.x / 2.0 - world.x * self.zoom,
            canvas_size.y / 2.0 - world.y * self.zoom,
        );
    }

    /// Zoom and pan so every point, padded by `margin` world units, is visible.
    ///
    /// Never zooms in past 1.0; an empty set just re-centers the origin.
    pub fn fit(&mut self, points: &[Pos2], margin: f32, canvas_size: Vec2) {
        let Some(first) = points.first() else {
            self.reset();
            self.center_on(Pos2::ZERO, canvas_size);
            return;
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        let extent = (max - min) + Vec2::splat(margin * 2.0);
        let zoom = (canvas_size.x / extent.x).min(canvas_size.y / extent.y).min(1.0);
        self.set_zoom(zoom);
        self.center_on(min + (max - min) / 2.0, canvas_size);
    }
}
