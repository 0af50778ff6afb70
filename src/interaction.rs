//! Pointer state driving the orbit camera.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Vertical orbit offset limit, in NDC units.
pub const MAX_VERTICAL_OFFSET: f32 = 0.5;

pub const DEFAULT_WHEEL: f32 = 300.0;

/// Accumulated drag state. `origin` and `offset` are in normalized device
/// coordinates (`[-1, 1]`, y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseState {
    pub down: bool,
    pub origin: Vec2,
    pub offset: Vec2,
    pub wheel: f32,
}

impl Default for MouseState {
    fn default() -> Self {
        Self {
            down: false,
            origin: Vec2::ZERO,
            offset: Vec2::ZERO,
            wheel: DEFAULT_WHEEL,
        }
    }
}

/// Whether wheel input changes the orbit distance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ZoomMode {
    /// Wheel events are ignored and the distance stays at its initial value.
    #[default]
    Fixed,
    Enabled { min: f32, max: f32 },
}

impl ZoomMode {
    pub const fn enabled() -> Self {
        ZoomMode::Enabled {
            min: 100.0,
            max: 5000.0,
        }
    }
}

/// Wheel movement as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Pixels(f32),
    Lines(f32),
}

/// Pointer handlers and the state they share with the frame tick.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    mouse: MouseState,
    zoom: ZoomMode,
}

impl Interaction {
    pub fn new(wheel: f32, zoom: ZoomMode) -> Self {
        Self {
            mouse: MouseState {
                wheel,
                ..MouseState::default()
            },
            zoom,
        }
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn pointer_down(&mut self, client: Vec2, viewport: (u32, u32)) {
        self.mouse.down = true;
        self.mouse.origin = to_ndc(client, viewport);
    }

    /// Accumulates drag movement. Only the vertical offset is clamped so the
    /// camera can circle freely but never flips over a pole.
    pub fn pointer_move(&mut self, client: Vec2, viewport: (u32, u32)) {
        if !self.mouse.down {
            return;
        }
        let ratio = to_ndc(client, viewport);
        self.mouse.offset += ratio - self.mouse.origin;
        self.mouse.offset.y = self
            .mouse
            .offset
            .y
            .clamp(-MAX_VERTICAL_OFFSET, MAX_VERTICAL_OFFSET);
        self.mouse.origin = ratio;
    }

    pub fn pointer_up(&mut self) {
        self.mouse.down = false;
    }

    pub fn wheel(&mut self, delta: WheelDelta) {
        let ZoomMode::Enabled { min, max } = self.zoom else {
            return;
        };
        let step = match delta {
            WheelDelta::Pixels(value) => value,
            WheelDelta::Lines(value) => value * 3.0,
        };
        self.mouse.wheel = (self.mouse.wheel + step).clamp(min, max);
    }
}

/// Converts client pixel coordinates to NDC with y pointing up.
pub fn to_ndc(client: Vec2, (width, height): (u32, u32)) -> Vec2 {
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    Vec2::new(
        (client.x / width - 0.5) * 2.0,
        -(client.y / height - 0.5) * 2.0,
    )
}
