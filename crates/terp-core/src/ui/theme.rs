//! Colors and widget styles
//!
//! All colors are RGB565. To convert from 8-bit RGB: R>>3, G>>2, B>>3.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::primitives::{PrimitiveStyle, PrimitiveStyleBuilder, StrokeAlignment};

use crate::state::Status;

// ============================================================================
// Base Colors
// ============================================================================

/// Screen background - very dark gray-blue
pub const COLOR_BACKGROUND: Rgb565 = Rgb565::new(18 >> 3, 23 >> 2, 24 >> 3);

/// Panels and idle buttons
pub const COLOR_SURFACE: Rgb565 = Rgb565::new(26 >> 3, 32 >> 2, 33 >> 3);

/// Borders and separators
pub const COLOR_STROKE: Rgb565 = Rgb565::new(43 >> 3, 55 >> 2, 57 >> 3);

// ============================================================================
// Status Colors
// ============================================================================

/// At target - bright teal-green
pub const COLOR_AT_TARGET: Rgb565 = Rgb565::new(95 >> 3, 185 >> 2, 141 >> 3);

/// In range, off target - warm amber
pub const COLOR_STABLE: Rgb565 = Rgb565::new(200 >> 3, 145 >> 2, 85 >> 3);

/// Too cold - cool blue
pub const COLOR_COLD: Rgb565 = Rgb565::new(90 >> 3, 140 >> 2, 210 >> 3);

/// Too hot and faults - muted red
pub const COLOR_HOT: Rgb565 = Rgb565::new(190 >> 3, 95 >> 2, 95 >> 3);

// ============================================================================
// Text Colors
// ============================================================================

pub const WHITE: Rgb565 = Rgb565::new(31, 63, 31);

pub const LIGHT_GRAY: Rgb565 = Rgb565::new(21, 42, 21);

pub const GRAY: Rgb565 = Rgb565::new(16, 32, 16);

/// Color of the status line for `status`.
pub fn status_color(status: Status) -> Rgb565 {
    match status {
        Status::Idle => LIGHT_GRAY,
        Status::SensorError | Status::TooHot => COLOR_HOT,
        Status::TooCold => COLOR_COLD,
        Status::AtTarget => COLOR_AT_TARGET,
        Status::Stable => COLOR_STABLE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPalette {
    pub primary: Rgb565,
    pub background: Rgb565,
    pub surface: Rgb565,
    pub danger: Rgb565,
    pub text_primary: Rgb565,
    pub text_secondary: Rgb565,
    pub border: Rgb565,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            primary: COLOR_AT_TARGET,
            background: COLOR_BACKGROUND,
            surface: COLOR_SURFACE,
            danger: COLOR_HOT,
            text_primary: WHITE,
            text_secondary: LIGHT_GRAY,
            border: COLOR_STROKE,
        }
    }
}

/// Resolved colors for one widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub background: Option<Rgb565>,
    pub foreground: Rgb565,
    pub border: Option<(Rgb565, u32)>,
}

impl Style {
    pub fn with_background(mut self, color: Rgb565) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_foreground(mut self, color: Rgb565) -> Self {
        self.foreground = color;
        self
    }

    pub fn to_primitive_style(&self) -> PrimitiveStyle<Rgb565> {
        let mut builder = PrimitiveStyleBuilder::new();

        if let Some(bg) = self.background {
            builder = builder.fill_color(bg);
        }

        if let Some((color, width)) = self.border
            && width > 0
        {
            // Borders stay inside the widget's bounds.
            builder = builder
                .stroke_color(color)
                .stroke_width(width)
                .stroke_alignment(StrokeAlignment::Inside);
        }

        builder.build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonVariant {
    /// Main action on a screen
    Primary,
    /// Settings rows, steppers and other neutral controls
    Outline,
    /// Destructive or irreversible actions
    Danger,
    /// Full-width title bar
    Header,
}

impl ButtonVariant {
    pub fn to_style(self, palette: &ColorPalette) -> Style {
        match self {
            Self::Primary => Style {
                background: Some(palette.primary),
                foreground: WHITE,
                border: None,
            },
            Self::Outline => Style {
                background: Some(palette.surface),
                foreground: palette.text_primary,
                border: Some((palette.border, 2)),
            },
            Self::Danger => Style {
                background: Some(palette.danger),
                foreground: WHITE,
                border: None,
            },
            Self::Header => Style {
                background: Some(palette.surface),
                foreground: palette.text_secondary,
                border: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_distinct_meaning() {
        assert_eq!(status_color(Status::AtTarget), COLOR_AT_TARGET);
        assert_eq!(status_color(Status::SensorError), COLOR_HOT);
        assert_ne!(status_color(Status::TooCold), status_color(Status::TooHot));
    }

    #[test]
    fn outline_has_a_border() {
        let style = ButtonVariant::Outline.to_style(&ColorPalette::default());
        assert_eq!(style.border, Some((COLOR_STROKE, 2)));
        assert_eq!(style.background, Some(COLOR_SURFACE));
    }

    #[test]
    fn borders_are_drawn_inside() {
        let primitive = ButtonVariant::Outline
            .to_style(&ColorPalette::default())
            .to_primitive_style();
        assert_eq!(primitive.stroke_width, 2);
        assert_eq!(primitive.stroke_alignment, StrokeAlignment::Inside);
    }
}
