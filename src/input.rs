//! Input mapping
//!
//! Turns keys and drag gestures into unit directions. This is the only place
//! directions are produced, so it keeps them in {-1, 0, 1}.

use crate::sim::Direction;

/// Pixels the pointer must travel before a drag emits a step
pub const DRAG_THRESHOLD: f32 = 10.0;

/// Map a key name (`KeyboardEvent.key`) to a direction
pub fn key_direction(key: &str) -> Option<Direction> {
    match key.to_lowercase().as_str() {
        "w" | "arrowup" => Some(Direction::new(0, -1)),
        "s" | "arrowdown" => Some(Direction::new(0, 1)),
        "a" | "arrowleft" => Some(Direction::new(-1, 0)),
        "d" | "arrowright" => Some(Direction::new(1, 0)),
        _ => None,
    }
}

/// Drag gesture tracker
///
/// Each step is diagonal: a drag that passes the threshold on either axis
/// moves one unit along both, by the sign of the pointer delta.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    anchor: Option<(f32, f32)>,
}

impl DragTracker {
    pub fn new() -> Self {
        Self { anchor: None }
    }

    pub fn start(&mut self, x: f32, y: f32) {
        self.anchor = Some((x, y));
    }

    /// Pointer moved; returns a step once the threshold is crossed and
    /// re-anchors at the current point
    pub fn update(&mut self, x: f32, y: f32) -> Option<Direction> {
        let (ax, ay) = self.anchor?;
        let (dx, dy) = (x - ax, y - ay);
        if dx.abs() <= DRAG_THRESHOLD && dy.abs() <= DRAG_THRESHOLD {
            return None;
        }
        self.anchor = Some((x, y));
        let step_x = if dx > 0.0 { 1 } else { -1 };
        let step_y = if dy > 0.0 { 1 } else { -1 };
        Some(Direction::new(step_x, step_y))
    }

    pub fn end(&mut self) {
        self.anchor = None;
    }
}
