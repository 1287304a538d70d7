//! Button widget
//!
//! Buttons are plain values rebuilt every time a screen is laid out, so they
//! carry no dirty tracking of their own.

use embedded_graphics::Drawable as EgDrawable;
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Rectangle, RoundedRectangle};
use embedded_graphics::text::{Alignment as TextAlignment, Baseline, Text, TextStyleBuilder};

use super::core::{Action, Drawable, TouchPoint, Touchable};
use super::theme::{ButtonVariant, ColorPalette, GRAY, Style};

/// Fixed-capacity button text. Longer labels are truncated.
pub type Label = heapless::String<32>;

/// Rounded, labelled touch target.
///
/// Every control on every screen is a `Button`: the settings rows, the
/// steppers, the footer actions, and (with no action attached) the header
/// and value read-outs.
///
/// # Visual Features
/// - Rounded corners (configurable radius, square for the header)
/// - Colors from a [`ButtonVariant`] over the default [`ColorPalette`]
/// - Highlighted background when shown as pressed or selected
/// - Gray text on the surface color when disabled
///
/// # Touch Behavior
/// - A tap inside the bounds yields the button's [`Action`]
/// - Disabled buttons and label-only buttons yield nothing
///
/// # Examples
/// ```ignore
/// let start = Button::new(
///     Rectangle::new(Point::new(20, 184), Size::new(180, 44)),
///     "Start",
///     Action::ToggleMonitoring,
/// )
/// .with_variant(ButtonVariant::Primary);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    bounds: Rectangle,
    label: Label,
    action: Option<Action>,
    variant: ButtonVariant,
    palette: ColorPalette,
    border_radius: u32,
    pressed: bool,
    enabled: bool,
}

impl Button {
    /// Create an outlined button that triggers `action` when tapped.
    ///
    /// # Parameters
    /// - `bounds`: Position and size of the button
    /// - `label`: Text drawn centered on the button (max 32 bytes)
    /// - `action`: Action reported by [`Touchable::handle_tap`]
    pub fn new(bounds: Rectangle, label: &str, action: Action) -> Self {
        let mut button = Self::label_only(bounds, label);
        button.action = Some(action);
        button
    }

    /// A button-shaped label that ignores taps (titles, read-outs).
    pub fn label_only(bounds: Rectangle, label: &str) -> Self {
        let mut text = Label::new();
        // Labels longer than the buffer are truncated at a char boundary.
        for ch in label.chars() {
            if text.push(ch).is_err() {
                break;
            }
        }

        Self {
            bounds,
            label: text,
            action: None,
            variant: ButtonVariant::Outline,
            palette: ColorPalette::default(),
            border_radius: 8,
            pressed: false,
            enabled: true,
        }
    }

    /// Set the button's visual variant.
    ///
    /// Variants control the color scheme (Primary, Outline, Danger, Header).
    pub fn with_variant(mut self, variant: ButtonVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Corner radius in pixels; `0` draws a plain rectangle.
    pub fn with_border_radius(mut self, radius: u32) -> Self {
        self.border_radius = radius;
        self
    }

    /// Shown highlighted, e.g. the currently selected option.
    pub fn with_pressed(mut self, pressed: bool) -> Self {
        self.pressed = pressed;
        self
    }

    /// Disabled buttons are drawn dimmed and ignore taps, e.g. a stepper
    /// already at its limit.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn style(&self) -> Style {
        let base = self.variant.to_style(&self.palette);

        if !self.enabled {
            return base
                .with_background(self.palette.surface)
                .with_foreground(GRAY);
        }

        if self.pressed {
            let bg = base.background.unwrap_or(self.palette.primary);
            if self.variant == ButtonVariant::Outline {
                return base.with_background(self.palette.primary);
            }
            let darkened = Rgb565::new(
                bg.r().saturating_sub(4),
                bg.g().saturating_sub(8),
                bg.b().saturating_sub(4),
            );
            return base.with_background(darkened);
        }

        base
    }
}

impl Drawable for Button {
    fn draw<D: DrawTarget<Color = Rgb565>>(&self, display: &mut D) -> Result<(), D::Error> {
        let style = self.style();

        let corner_radius = Size::new(self.border_radius, self.border_radius);
        RoundedRectangle::with_equal_corners(self.bounds, corner_radius)
            .into_styled(style.to_primitive_style())
            .draw(display)?;

        let text_style = MonoTextStyle::new(&FONT_6X10, style.foreground);
        let layout = TextStyleBuilder::new()
            .alignment(TextAlignment::Center)
            .baseline(Baseline::Middle)
            .build();
        Text::with_text_style(&self.label, self.bounds.center(), text_style, layout)
            .draw(display)?;

        Ok(())
    }

    fn bounds(&self) -> Rectangle {
        self.bounds
    }
}

impl Touchable for Button {
    fn contains_point(&self, point: TouchPoint) -> bool {
        self.bounds.contains(point.to_point())
    }

    fn handle_tap(&self, point: TouchPoint) -> Option<Action> {
        if !self.enabled || !self.contains_point(point) {
            return None;
        }
        self.action
    }
}
