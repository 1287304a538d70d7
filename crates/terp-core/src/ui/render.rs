//! Screen rendering
//!
//! Redraws the whole screen from `(state, settings)`. The caller decides when
//! a redraw is needed via [`DeviceState::needs_redraw`].

use embedded_graphics::Drawable as EgDrawable;
use embedded_graphics::mono_font::{
    MonoTextStyle,
    ascii::{FONT_6X10, FONT_10X20},
};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Text};

use super::button::Label;
use super::core::Drawable;
use super::screens::{self, write_temperature};
use super::theme::{COLOR_BACKGROUND, LIGHT_GRAY, WHITE, status_color};
use crate::filter::Trend;
use crate::sensors::centi_to_celsius;
use crate::settings::Settings;
use crate::state::{DeviceState, MenuState};

const READOUT_Y: i32 = 100;
const STATUS_Y: i32 = 135;
const TREND_Y: i32 = 155;

/// Draw one full frame.
///
/// While asleep the panel is cleared to black and nothing else is drawn.
/// Otherwise the buttons from [`screens::layout`] are drawn, list rows are
/// clipped to the list viewport, and the main screen adds the readout,
/// the status line and the trend.
pub fn render<D>(display: &mut D, state: &DeviceState, settings: &Settings) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    if state.sleeping {
        return display.clear(Rgb565::BLACK);
    }

    display.clear(COLOR_BACKGROUND)?;

    let screen = screens::layout(state, settings);
    for button in &screen.buttons {
        button.draw(display)?;
    }
    if let Some(viewport) = screen.list_viewport {
        let mut clipped = display.clipped(&viewport);
        for row in &screen.list {
            row.draw(&mut clipped)?;
        }
    }

    if state.menu_state() == MenuState::Main {
        draw_readout(display, state, settings)?;
    }

    Ok(())
}

fn draw_readout<D>(display: &mut D, state: &DeviceState, settings: &Settings) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let centre_x = display.bounding_box().center().x;

    let mut reading = Label::new();
    if state.has_reading {
        write_temperature(
            &mut reading,
            centi_to_celsius(state.current_temperature_centidegrees),
            settings.use_celsius,
        );
    } else {
        reading.push_str("--.-").ok();
    }
    Text::with_alignment(
        &reading,
        Point::new(centre_x, READOUT_Y),
        MonoTextStyle::new(&FONT_10X20, WHITE),
        Alignment::Center,
    )
    .draw(display)?;

    let status = state.status();
    Text::with_alignment(
        status.text(),
        Point::new(centre_x, STATUS_Y),
        MonoTextStyle::new(&FONT_6X10, status_color(status)),
        Alignment::Center,
    )
    .draw(display)?;

    if state.is_monitoring() {
        let trend = match state.temperature_history.trend() {
            Trend::Rising => "Rising",
            Trend::Falling => "Falling",
            Trend::Steady => "Steady",
        };
        Text::with_alignment(
            trend,
            Point::new(centre_x, TREND_Y),
            MonoTextStyle::new(&FONT_6X10, LIGHT_GRAY),
            Alignment::Center,
        )
        .draw(display)?;
    }

    Ok(())
}
