use serde::{Deserialize, Serialize};

pub const MINI_PLAYER_WIDTH: f64 = 320.0;
pub const MINI_PLAYER_HEIGHT: f64 = 200.0;
pub const MINI_PLAYER_MINIMIZED_HEIGHT: f64 = 40.0;
pub const MINI_PLAYER_ORIGIN: (f64, f64) = (20.0, 20.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Floating panel geometry. Always kept inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniPlayer {
    pub x: f64,
    pub y: f64,
    pub minimized: bool,
    viewport: Viewport,
}

impl MiniPlayer {
    pub fn new(viewport: Viewport) -> Self {
        let mut player = Self {
            x: MINI_PLAYER_ORIGIN.0,
            y: MINI_PLAYER_ORIGIN.1,
            minimized: false,
            viewport,
        };
        player.clamp();
        player
    }

    pub fn size(&self) -> (f64, f64) {
        let height = if self.minimized {
            MINI_PLAYER_MINIMIZED_HEIGHT
        } else {
            MINI_PLAYER_HEIGHT
        };
        (MINI_PLAYER_WIDTH, height)
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn drag_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.clamp();
    }

    pub fn toggle_minimized(&mut self) -> bool {
        self.minimized = !self.minimized;
        self.clamp();
        self.minimized
    }

    pub fn resize_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.clamp();
    }

    fn clamp(&mut self) {
        let (width, height) = self.size();
        let max_x = (self.viewport.width - width).max(0.0);
        let max_y = (self.viewport.height - height).max(0.0);
        self.x = self.x.clamp(0.0, max_x);
        self.y = self.y.clamp(0.0, max_y);
    }
}
