//! Per-screen layouts
//!
//! [`layout`] is the single source of truth for what is on each screen. The
//! state machine hit-tests against it and the renderer draws it, so a button
//! can never be drawn in one place and handled in another.

use core::fmt::Write;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use super::button::{Button, Label};
use super::core::{Action, TouchPoint, Touchable};
use super::theme::ButtonVariant;
use crate::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use crate::settings::{EMISSIVITY_MAX, EMISSIVITY_MIN, Settings};
use crate::state::{DeviceState, MenuState, SettingsItem};

pub const HEADER_HEIGHT: u32 = 36;

const MARGIN: i32 = 20;
const CONTENT_WIDTH: u32 = DISPLAY_WIDTH_PX as u32 - 2 * MARGIN as u32;
const FOOTER_Y: i32 = 184;
const FOOTER_HEIGHT: u32 = 44;

const LIST_TOP: i32 = 40;
const ROW_PITCH: i32 = 40;
const ROW_HEIGHT: u32 = 34;

pub const MAX_BUTTONS: usize = 10;
const LIST_LEN: usize = SettingsItem::ALL.len();

/// One laid-out screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub menu: MenuState,
    pub buttons: heapless::Vec<Button, MAX_BUTTONS>,
    /// Scrolled list rows and the viewport they are clipped to.
    pub list: heapless::Vec<Button, LIST_LEN>,
    pub list_viewport: Option<Rectangle>,
}

impl Screen {
    fn new(menu: MenuState) -> Self {
        Self {
            menu,
            buttons: heapless::Vec::new(),
            list: heapless::Vec::new(),
            list_viewport: None,
        }
    }

    fn add(&mut self, button: Button) {
        if self.buttons.push(button).is_err() {
            log::warn!(" Too many widgets on {:?}", self.menu);
        }
    }

    /// Action under `point`, if any. List rows only respond inside their
    /// viewport.
    pub fn hit_test(&self, point: TouchPoint) -> Option<Action> {
        if let Some(viewport) = self.list_viewport
            && viewport.contains(point.to_point())
        {
            return self.list.iter().find_map(|row| row.handle_tap(point));
        }
        self.buttons.iter().find_map(|button| button.handle_tap(point))
    }

    pub fn find(&self, label: &str) -> Option<&Button> {
        self.buttons
            .iter()
            .chain(self.list.iter())
            .find(|b| b.label() == label)
    }
}

/// Settings list viewport: everything below the header.
pub fn list_viewport() -> Rectangle {
    Rectangle::new(
        Point::new(0, LIST_TOP),
        Size::new(
            DISPLAY_WIDTH_PX as u32,
            DISPLAY_HEIGHT_PX as u32 - LIST_TOP as u32,
        ),
    )
}

/// How far the content of `menu` can scroll.
pub fn max_scroll(menu: MenuState) -> u16 {
    match menu {
        MenuState::Settings => {
            let content = SettingsItem::ALL.len() as u32 * ROW_PITCH as u32;
            content.saturating_sub(list_viewport().size.height) as u16
        }
        MenuState::Main
        | MenuState::UnitSelect
        | MenuState::Brightness
        | MenuState::Sound
        | MenuState::Emissivity
        | MenuState::Target
        | MenuState::RestartConfirm => 0,
    }
}

/// Shorthand for `layout(state, settings).hit_test(point)`.
pub fn hit_test(state: &DeviceState, settings: &Settings, point: TouchPoint) -> Option<Action> {
    layout(state, settings).hit_test(point)
}

/// Lay out the screen for the current menu.
///
/// # Parameters
/// - `state`: Supplies the menu, the list scroll offset, the monitoring
///   flag (Start/Stop label) and the selected settings row
/// - `settings`: Supplies every value shown on a row or stepper
///
/// Layouts are cheap to rebuild and are never cached.
pub fn layout(state: &DeviceState, settings: &Settings) -> Screen {
    let menu = state.menu_state();
    let mut screen = Screen::new(menu);

    match menu {
        MenuState::Main => {
            screen.add(
                Button::new(
                    rect(0, 0, DISPLAY_WIDTH_PX as u32, HEADER_HEIGHT),
                    menu.title(),
                    Action::OpenSettings,
                )
                .with_variant(ButtonVariant::Header)
                .with_border_radius(0),
            );
            let (label, variant) = if state.is_monitoring() {
                ("Stop", ButtonVariant::Danger)
            } else {
                ("Start", ButtonVariant::Primary)
            };
            screen.add(
                Button::new(
                    rect(MARGIN, FOOTER_Y, 180, FOOTER_HEIGHT),
                    label,
                    Action::ToggleMonitoring,
                )
                .with_variant(variant),
            );
            screen.add(Button::new(
                rect(210, FOOTER_Y, 90, FOOTER_HEIGHT),
                "Settings",
                Action::OpenSettings,
            ));
        }
        MenuState::Settings => {
            screen.add(header(menu.title()));
            screen.list_viewport = Some(list_viewport());
            let scroll = state.scroll_position() as i32;
            for (index, item) in SettingsItem::ALL.iter().enumerate() {
                let y = LIST_TOP + index as i32 * ROW_PITCH - scroll;
                let row = Button::new(
                    rect(MARGIN, y, CONTENT_WIDTH, ROW_HEIGHT),
                    &item_label(*item, settings),
                    Action::SelectItem(index as u8),
                )
                .with_pressed(state.selected_menu_item == Some(index as u8));
                if screen.list.push(row).is_err() {
                    log::warn!(" Settings list overflow");
                }
            }
        }
        MenuState::UnitSelect => {
            screen.add(header(menu.title()));
            let confirmed = settings.units_confirmed;
            screen.add(
                Button::new(
                    rect(MARGIN, 56, CONTENT_WIDTH, 50),
                    "Celsius",
                    Action::SetUnit { celsius: true },
                )
                .with_pressed(confirmed && settings.use_celsius),
            );
            screen.add(
                Button::new(
                    rect(MARGIN, 116, CONTENT_WIDTH, 50),
                    "Fahrenheit",
                    Action::SetUnit { celsius: false },
                )
                .with_pressed(confirmed && !settings.use_celsius),
            );
            if confirmed {
                screen.add(footer("Back", Action::Back));
            }
        }
        MenuState::Brightness => {
            screen.add(header(menu.title()));
            let mut value = Label::new();
            write!(value, "{}", settings.brightness()).ok();
            add_stepper(&mut screen, 90, &value, Action::Adjust { up: false }, Action::Adjust { up: true });
            screen.add(footer("Done", Action::Done));
        }
        MenuState::Sound => {
            screen.add(header(menu.title()));
            screen.add(
                Button::new(
                    rect(MARGIN, 80, CONTENT_WIDTH, 60),
                    if settings.sound_enabled {
                        "Sound: On"
                    } else {
                        "Sound: Off"
                    },
                    Action::ToggleSound,
                )
                .with_pressed(settings.sound_enabled),
            );
            screen.add(footer("Done", Action::Done));
        }
        MenuState::Emissivity => {
            screen.add(header(menu.title()));
            let emissivity = settings.emissivity();
            let mut value = Label::new();
            write!(value, "{:.2}", emissivity).ok();
            add_stepper(&mut screen, 90, &value, Action::Adjust { up: false }, Action::Adjust { up: true });
            if let Some(minus) = screen.buttons.get_mut(1) {
                *minus = minus.clone().with_enabled(emissivity > EMISSIVITY_MIN);
            }
            if let Some(plus) = screen.buttons.get_mut(3) {
                *plus = plus.clone().with_enabled(emissivity < EMISSIVITY_MAX);
            }
            screen.add(footer("Done", Action::Done));
        }
        MenuState::Target => {
            screen.add(header(menu.title()));
            let mut target = Label::new();
            target.push_str("Target ").ok();
            write_temperature(&mut target, settings.target_temperature_c(), settings.use_celsius);
            add_stepper(
                &mut screen,
                56,
                &target,
                Action::AdjustTarget { up: false },
                Action::AdjustTarget { up: true },
            );
            let mut tolerance = Label::new();
            tolerance.push_str("+/- ").ok();
            write_temperature_delta(
                &mut tolerance,
                settings.temperature_tolerance_c(),
                settings.use_celsius,
            );
            add_stepper(
                &mut screen,
                116,
                &tolerance,
                Action::AdjustTolerance { up: false },
                Action::AdjustTolerance { up: true },
            );
            screen.add(footer("Done", Action::Done));
        }
        MenuState::RestartConfirm => {
            screen.add(header(menu.title()));
            screen.add(Button::label_only(
                rect(MARGIN, 70, CONTENT_WIDTH, 60),
                "Restart to apply emissivity",
            ));
            screen.add(
                Button::new(
                    rect(MARGIN, FOOTER_Y, 135, FOOTER_HEIGHT),
                    "Restart",
                    Action::ConfirmRestart,
                )
                .with_variant(ButtonVariant::Danger),
            );
            screen.add(Button::new(
                rect(165, FOOTER_Y, 135, FOOTER_HEIGHT),
                "Later",
                Action::CancelRestart,
            ));
        }
    }

    screen
}

/// `- value +` row.
fn add_stepper(screen: &mut Screen, y: i32, value: &str, down: Action, up: Action) {
    screen.add(Button::new(rect(MARGIN, y, 60, 50), "-", down));
    screen.add(Button::label_only(rect(90, y, 140, 50), value).with_variant(ButtonVariant::Header));
    screen.add(Button::new(rect(240, y, 60, 50), "+", up));
}

fn header(title: &str) -> Button {
    Button::label_only(rect(0, 0, DISPLAY_WIDTH_PX as u32, HEADER_HEIGHT), title)
        .with_variant(ButtonVariant::Header)
        .with_border_radius(0)
}

fn footer(label: &str, action: Action) -> Button {
    Button::new(
        rect(MARGIN, FOOTER_Y, CONTENT_WIDTH, FOOTER_HEIGHT),
        label,
        action,
    )
    .with_variant(ButtonVariant::Primary)
}

fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
    Rectangle::new(Point::new(x, y), Size::new(w, h))
}

fn item_label(item: SettingsItem, settings: &Settings) -> Label {
    let on_off = |on: bool| if on { "On" } else { "Off" };
    let mut label = Label::new();
    match item {
        SettingsItem::Units => {
            let unit = if settings.use_celsius {
                "Celsius"
            } else {
                "Fahrenheit"
            };
            write!(label, "Units: {}", unit).ok();
        }
        SettingsItem::Brightness => {
            write!(label, "Brightness: {}", settings.brightness()).ok();
        }
        SettingsItem::Sound => {
            write!(label, "Sound: {}", on_off(settings.sound_enabled)).ok();
        }
        SettingsItem::Emissivity => {
            write!(label, "Emissivity: {:.2}", settings.emissivity()).ok();
        }
        SettingsItem::Target => {
            label.push_str("Target: ").ok();
            write_temperature(&mut label, settings.target_temperature_c(), settings.use_celsius);
        }
        SettingsItem::AutoSleep => {
            write!(
                label,
                "Auto Sleep: {} ({} min)",
                on_off(settings.auto_sleep_enabled),
                settings.sleep_timeout_minutes()
            )
            .ok();
        }
        SettingsItem::Exit => {
            label.push_str("Exit").ok();
        }
    }
    label
}

/// Append an absolute temperature in the display unit, e.g. `180.0 C`.
pub fn write_temperature<W: Write>(out: &mut W, celsius: f32, use_celsius: bool) {
    if use_celsius {
        write!(out, "{:.1} C", celsius).ok();
    } else {
        write!(out, "{:.1} F", crate::sensors::celsius_to_fahrenheit(celsius)).ok();
    }
}

/// Append a temperature difference in the display unit.
pub fn write_temperature_delta<W: Write>(out: &mut W, celsius: f32, use_celsius: bool) {
    if use_celsius {
        write!(out, "{:.1} C", celsius).ok();
    } else {
        write!(
            out,
            "{:.1} F",
            crate::sensors::delta_celsius_to_fahrenheit(celsius)
        )
        .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::core::Drawable;
    use embassy_time::Instant;

    fn state_on(menu: MenuState) -> DeviceState {
        let mut state = DeviceState::new(Instant::from_millis(0));
        state.enter(menu);
        state
    }

    fn confirmed() -> Settings {
        let mut settings = Settings::default();
        settings.units_confirmed = true;
        settings
    }

    fn centre(button: &Button) -> TouchPoint {
        let c = button.bounds().center();
        TouchPoint::new(c.x as u16, c.y as u16)
    }

    #[test]
    fn every_screen_fits_the_display() {
        let display = rect(0, 0, DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32);
        let settings = confirmed();
        for menu in [
            MenuState::Main,
            MenuState::Settings,
            MenuState::UnitSelect,
            MenuState::Brightness,
            MenuState::Sound,
            MenuState::Emissivity,
            MenuState::Target,
            MenuState::RestartConfirm,
        ] {
            let screen = layout(&state_on(menu), &settings);
            for button in &screen.buttons {
                let b = button.bounds();
                assert!(
                    display.contains(b.top_left) && display.contains(b.bottom_right().unwrap()),
                    "{:?}: {} is off screen",
                    menu,
                    button.label()
                );
            }
        }
    }

    #[test]
    fn main_has_monitor_and_settings_targets() {
        let screen = layout(&state_on(MenuState::Main), &confirmed());
        let start = screen.find("Start").unwrap();
        assert_eq!(screen.hit_test(centre(start)), Some(Action::ToggleMonitoring));
        assert_eq!(
            screen.hit_test(TouchPoint::new(160, 10)),
            Some(Action::OpenSettings)
        );
        assert_eq!(screen.hit_test(TouchPoint::new(160, 100)), None);
    }

    #[test]
    fn settings_rows_follow_scroll() {
        let settings = confirmed();
        let mut state = state_on(MenuState::Settings);
        let screen = layout(&state, &settings);
        assert_eq!(
            screen.hit_test(TouchPoint::new(160, 57)),
            Some(Action::SelectItem(0))
        );

        state.scroll_by(40);
        let screen = layout(&state, &settings);
        assert_eq!(
            screen.hit_test(TouchPoint::new(160, 57)),
            Some(Action::SelectItem(1))
        );
    }

    #[test]
    fn rows_scrolled_under_the_header_are_not_hit() {
        let settings = confirmed();
        let mut state = state_on(MenuState::Settings);
        state.scroll_by(40);
        let screen = layout(&state, &settings);
        assert_eq!(screen.hit_test(TouchPoint::new(160, 20)), None);
    }

    #[test]
    fn last_row_reachable_at_max_scroll() {
        let settings = confirmed();
        let mut state = state_on(MenuState::Settings);
        state.scroll_by(i32::from(max_scroll(MenuState::Settings)));
        let screen = layout(&state, &settings);
        let exit = screen.find("Exit").unwrap();
        assert!(list_viewport().contains(exit.bounds().bottom_right().unwrap()));
        assert_eq!(
            screen.hit_test(centre(exit)),
            Some(Action::SelectItem(SettingsItem::ALL.len() as u8 - 1))
        );
    }

    #[test]
    fn first_run_unit_prompt_has_no_back() {
        let screen = layout(&state_on(MenuState::UnitSelect), &Settings::default());
        assert!(screen.find("Back").is_none());
        let screen = layout(&state_on(MenuState::UnitSelect), &confirmed());
        assert!(screen.find("Back").is_some());
    }

    #[test]
    fn emissivity_stepper_disables_at_limits() {
        let mut settings = confirmed();
        settings.set_emissivity(EMISSIVITY_MAX);
        let screen = layout(&state_on(MenuState::Emissivity), &settings);
        assert!(!screen.find("+").unwrap().is_enabled());
        assert!(screen.find("-").unwrap().is_enabled());
        assert!(screen.find("1.00").is_some());
    }

    #[test]
    fn labels_use_display_unit() {
        let mut settings = confirmed();
        settings.use_celsius = false;
        let screen = layout(&state_on(MenuState::Target), &settings);
        assert!(screen.find("Target 356.0 F").is_some());
        assert!(screen.find("+/- 9.0 F").is_some());
    }
}
