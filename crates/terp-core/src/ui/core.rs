//! Core UI traits and types

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A point on the touch panel, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
}

impl TouchPoint {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn to_point(&self) -> Point {
        Point::new(self.x as i32, self.y as i32)
    }
}

/// What a widget asks the state machine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    OpenSettings,
    ToggleMonitoring,
    /// Row of the settings list, by index.
    SelectItem(u8),
    SetUnit { celsius: bool },
    /// Step the screen's single value (brightness, emissivity).
    Adjust { up: bool },
    AdjustTarget { up: bool },
    AdjustTolerance { up: bool },
    ToggleSound,
    Done,
    Back,
    ConfirmRestart,
    CancelRestart,
}

/// Anything that can draw itself.
pub trait Drawable {
    fn draw<D: DrawTarget<Color = Rgb565>>(&self, display: &mut D) -> Result<(), D::Error>;

    fn bounds(&self) -> Rectangle;
}

/// Widgets that respond to taps.
pub trait Touchable {
    fn contains_point(&self, point: TouchPoint) -> bool;

    /// Action triggered by a tap at `point`, if it lands on this widget.
    fn handle_tap(&self, point: TouchPoint) -> Option<Action>;
}
