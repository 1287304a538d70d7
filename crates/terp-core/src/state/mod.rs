//! In-memory device state
//!
//! [`DeviceState`] is owned by the main loop (through the
//! [`DeviceStateMachine`]) and is never shared. Its menu and monitoring fields
//! are private so the one invariant that matters can be enforced in a single
//! place: monitoring only ever runs on the main screen.

mod machine;

pub use machine::{DeviceStateMachine, Effect, Effects, SettingsItem};

use embassy_time::Instant;
use log::debug;

use crate::alert::{AlertStatus, AlertTracker};
use crate::filter::TemperatureHistory;
use crate::ui::screens;

/// Screens of the flat menu state machine. Modal prompts are screens too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuState {
    Main,
    Settings,
    UnitSelect,
    Brightness,
    Sound,
    Emissivity,
    Target,
    RestartConfirm,
}

impl MenuState {
    /// Screens with a value that is persisted on Done/Back.
    pub fn is_adjustment(self) -> bool {
        matches!(
            self,
            Self::Brightness | Self::Sound | Self::Emissivity | Self::Target
        )
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Main => "TerpMeter",
            Self::Settings => "Settings",
            Self::UnitSelect => "Units",
            Self::Brightness => "Brightness",
            Self::Sound => "Sound",
            Self::Emissivity => "Emissivity",
            Self::Target => "Target",
            Self::RestartConfirm => "Restart?",
        }
    }
}

/// Status line shown under the temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Idle,
    SensorError,
    TooCold,
    TooHot,
    AtTarget,
    Stable,
}

impl Status {
    pub fn text(self) -> &'static str {
        match self {
            Self::Idle => "Press Start",
            Self::SensorError => "Sensor Error",
            Self::TooCold => "Too Cold",
            Self::TooHot => "Too Hot",
            Self::AtTarget => "Perfect",
            Self::Stable => "Ready",
        }
    }
}

impl From<AlertStatus> for Status {
    fn from(value: AlertStatus) -> Self {
        match value {
            AlertStatus::TooCold => Self::TooCold,
            AlertStatus::TooHot => Self::TooHot,
            AlertStatus::AtTarget => Self::AtTarget,
            AlertStatus::Stable => Self::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub current_temperature_centidegrees: i32,
    /// `false` until the first valid sample after boot or wake.
    pub has_reading: bool,
    is_monitoring: bool,
    menu_state: MenuState,
    /// Last row picked on the settings list.
    pub selected_menu_item: Option<u8>,
    scroll_position: u16,
    pub last_activity: Instant,
    pub sleeping: bool,
    status: Status,
    pub temperature_history: TemperatureHistory,
    pub alert: AlertTracker,
    needs_redraw: bool,
}

impl DeviceState {
    pub fn new(now: Instant) -> Self {
        Self {
            current_temperature_centidegrees: 0,
            has_reading: false,
            is_monitoring: false,
            menu_state: MenuState::Main,
            selected_menu_item: None,
            scroll_position: 0,
            last_activity: now,
            sleeping: false,
            status: Status::Idle,
            temperature_history: TemperatureHistory::new(),
            alert: AlertTracker::new(),
            needs_redraw: true,
        }
    }

    pub fn menu_state(&self) -> MenuState {
        self.menu_state
    }

    pub fn is_monitoring(&self) -> bool {
        self.is_monitoring
    }

    pub fn scroll_position(&self) -> u16 {
        self.scroll_position
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Switch screens. Leaving the main screen always stops monitoring.
    pub fn enter(&mut self, menu: MenuState) {
        if menu != self.menu_state {
            debug!(" Screen {:?} -> {:?}", self.menu_state, menu);
        }
        self.menu_state = menu;
        if menu != MenuState::Main {
            self.set_monitoring_flag(false);
        } else {
            self.selected_menu_item = None;
        }
        self.scroll_position = 0;
        self.needs_redraw = true;
    }

    /// Start or stop monitoring. Refused (returns `false`) off the main
    /// screen. Starting clears the at-target edge tracker so the first
    /// at-target sample beeps.
    pub fn set_monitoring(&mut self, on: bool) -> bool {
        if on && self.menu_state != MenuState::Main {
            return false;
        }
        if on && !self.is_monitoring {
            self.alert.reset();
        }
        self.set_monitoring_flag(on);
        true
    }

    fn set_monitoring_flag(&mut self, on: bool) {
        if self.is_monitoring != on {
            self.is_monitoring = on;
            if !on && self.status != Status::SensorError {
                self.status = Status::Idle;
            }
            self.needs_redraw = true;
        }
    }

    /// Scroll the current screen, clamped to its content.
    pub fn scroll_by(&mut self, delta: i32) {
        let max = screens::max_scroll(self.menu_state) as i32;
        let next = (self.scroll_position as i32 + delta).clamp(0, max) as u16;
        if next != self.scroll_position {
            self.scroll_position = next;
            self.needs_redraw = true;
        }
    }

    pub fn set_temperature(&mut self, centi: i32) {
        if !self.has_reading || centi != self.current_temperature_centidegrees {
            self.current_temperature_centidegrees = centi;
            self.has_reading = true;
            self.mark_main_dirty();
        }
    }

    pub fn set_status(&mut self, status: Status) {
        if status != self.status {
            self.status = status;
            self.mark_main_dirty();
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Back to the boot screen: main, not monitoring, nothing measured yet.
    pub fn reset(&mut self, now: Instant) {
        self.enter(MenuState::Main);
        self.set_monitoring_flag(false);
        self.sleeping = false;
        self.status = Status::Idle;
        self.has_reading = false;
        self.temperature_history.clear();
        self.alert.reset();
        self.last_activity = now;
        self.needs_redraw = true;
    }

    pub fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn mark_drawn(&mut self) {
        self.needs_redraw = false;
    }

    fn mark_main_dirty(&mut self) {
        if self.menu_state == MenuState::Main {
            self.needs_redraw = true;
        }
    }
}
