//! Input model: pointer descriptors and the eraser gesture state machine.
//!
//! `Pointer` captures which device and button produced an event. `InputState`
//! is the active gesture tracked between pointer-down and pointer-up; while a
//! gesture is active it owns the stroke being captured.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::geom::Point;

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// The pointer that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    /// Button pressed or released.
    pub button: Button,
    /// `false` for secondary touches of a multi-touch gesture.
    pub is_primary: bool,
}

impl Pointer {
    /// The main pointer pressing its primary button.
    #[must_use]
    pub fn primary() -> Self {
        Self { button: Button::Primary, is_primary: true }
    }

    /// Whether this event may start or drive an erase gesture.
    #[must_use]
    pub fn is_main(self) -> bool {
        self.is_primary && self.button == Button::Primary
    }
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is dragging the eraser across the canvas.
    Erasing {
        /// Samples in scene coordinates, in capture order. Append-only.
        stroke: Vec<Point>,
    },
}

impl InputState {
    /// Whether a gesture is in progress.
    #[must_use]
    pub fn is_erasing(&self) -> bool {
        matches!(self, Self::Erasing { .. })
    }

    /// The stroke captured so far, or an empty slice when idle.
    #[must_use]
    pub fn stroke(&self) -> &[Point] {
        match self {
            Self::Idle => &[],
            Self::Erasing { stroke } => stroke,
        }
    }

    /// Start a gesture at `start`. Returns `false` (leaving the current
    /// gesture untouched) if one is already active.
    pub fn begin(&mut self, start: Point) -> bool {
        if self.is_erasing() {
            return false;
        }
        *self = Self::Erasing { stroke: vec![start] };
        true
    }

    /// Append a sample. No-op when idle.
    pub fn push(&mut self, pt: Point) -> bool {
        match self {
            Self::Idle => false,
            Self::Erasing { stroke } => {
                stroke.push(pt);
                true
            }
        }
    }

    /// End the gesture and hand over its stroke. `None` when idle.
    pub fn finish(&mut self) -> Option<Vec<Point>> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::Erasing { stroke } => Some(stroke),
        }
    }
}
