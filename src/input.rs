//! Pointer state to force signal.

use glam::Vec2;

/// Force requested for one step, in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSignal {
    pub center: Vec2,
    /// Pointer travel since the previous frame, in cells.
    pub direction: Vec2,
    pub active: bool,
}

impl ForceSignal {
    pub fn inactive() -> Self {
        Self {
            center: Vec2::ZERO,
            direction: Vec2::ZERO,
            active: false,
        }
    }

    pub fn impulse(center: Vec2, direction: Vec2) -> Self {
        Self {
            center,
            direction,
            active: true,
        }
    }
}

impl Default for ForceSignal {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Accumulates pointer events between frames.
///
/// A force is reported only while the button is held and the pointer has
/// actually moved since the last poll; the movement flag is consumed by
/// [`InputTranslator::poll`], so a held but stationary pointer stops pushing.
#[derive(Debug, Default)]
pub struct InputTranslator {
    position: Option<Vec2>,
    delta: Vec2,
    pressed: bool,
    moved: bool,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        if let Some(previous) = self.position {
            let delta = position - previous;
            if delta != Vec2::ZERO {
                self.delta += delta;
                self.moved = true;
            }
        }
        self.position = Some(position);
    }

    pub fn pointer_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Signal for the coming step. Clears the per-frame movement state.
    pub fn poll(&mut self) -> ForceSignal {
        let signal = match self.position {
            Some(center) if self.pressed && self.moved => ForceSignal::impulse(center, self.delta),
            Some(center) => ForceSignal {
                center,
                direction: Vec2::ZERO,
                active: false,
            },
            None => ForceSignal::inactive(),
        };
        self.delta = Vec2::ZERO;
        self.moved = false;
        signal
    }
}
