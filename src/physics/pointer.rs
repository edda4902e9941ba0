//! Pointer input: device → simulation coordinates, hover and drag state.

use serde::{Deserialize, Serialize};

use super::constraint::DragBinding;
use crate::types::Vec2;

/// Where the canvas sits on the device and how large its backing store is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    /// Top-left of the canvas in device coordinates.
    pub left: f32,
    pub top: f32,
    /// Displayed size in device pixels.
    pub display_width: f32,
    pub display_height: f32,
    /// Simulation-space size of the canvas.
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl Viewport {
    /// A canvas shown 1:1 at the device origin.
    pub fn identity(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            display_width: width,
            display_height: height,
            canvas_width: width,
            canvas_height: height,
        }
    }

    pub fn to_world(&self, client_x: f32, client_y: f32) -> Vec2 {
        let scale_x = self.canvas_width / self.display_width.max(1e-6);
        let scale_y = self.canvas_height / self.display_height.max(1e-6);
        Vec2::new(
            (client_x - self.left) * scale_x,
            (client_y - self.top) * scale_y,
        )
    }
}

/// Hover position, drag binding and the sandbox latch.
///
/// Bodies under the pointer wiggle until the player has held a drag for
/// `drag_start_ticks` consecutive ticks; from then on the latch stays set
/// until the room is cleared.
#[derive(Debug, Default)]
pub struct PointerState {
    pub(crate) hover: Option<Vec2>,
    pub(crate) drag: Option<DragBinding>,
    pub(crate) drag_ticks: u32,
    pub(crate) sandbox_started: bool,
}

impl PointerState {
    pub fn hover(&self) -> Option<Vec2> {
        self.hover
    }

    pub fn drag(&self) -> Option<&DragBinding> {
        self.drag.as_ref()
    }

    pub fn drag_ticks(&self) -> u32 {
        self.drag_ticks
    }

    pub fn sandbox_started(&self) -> bool {
        self.sandbox_started
    }

    /// Count one tick of sustained dragging.
    pub(crate) fn tick_drag(&mut self, drag_start_ticks: u32) {
        if self.sandbox_started || self.drag.is_none() {
            return;
        }
        self.drag_ticks += 1;
        if self.drag_ticks >= drag_start_ticks {
            self.sandbox_started = true;
        }
    }

    pub(crate) fn release(&mut self) -> Option<DragBinding> {
        let released = self.drag.take();
        if !self.sandbox_started {
            self.drag_ticks = 0;
        }
        released
    }

    pub(crate) fn reset(&mut self) {
        *self = PointerState::default();
    }
}
