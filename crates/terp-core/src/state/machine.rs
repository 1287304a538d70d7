//! Menu navigation
//!
//! The state machine owns [`DeviceState`] and [`Settings`] and is the only
//! thing that mutates them in response to input. Every screen's behavior is a
//! single arm of the `match` in [`DeviceStateMachine::apply_action`]; a
//! screen/action pair without an arm is a [`StateFault`].
//!
//! The machine performs no I/O. Anything that has to leave the core (saving,
//! backlight, tones, restart) is returned as an [`Effect`] for the caller to
//! carry out.

use embassy_time::Instant;
use log::{debug, info, warn};

use super::{DeviceState, MenuState};
use crate::error::StateFault;
use crate::feedback::Cue;
use crate::input::{ButtonId, Event};
use crate::settings::Settings;
use crate::ui::{Action, TouchPoint, screens};

pub const MAX_EFFECTS: usize = 6;

/// Side effects requested by one event, in the order they should run.
pub type Effects = heapless::Vec<Effect, MAX_EFFECTS>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Persist the current settings.
    SaveSettings,
    Backlight(u8),
    DisplayPower(bool),
    /// Push a new emissivity into the sensor head.
    ApplyEmissivity(f32),
    Cue(Cue),
    /// Hardware restart, only ever after explicit confirmation.
    Restart,
}

/// Rows of the settings list, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsItem {
    Units,
    Brightness,
    Sound,
    Emissivity,
    Target,
    AutoSleep,
    Exit,
}

impl SettingsItem {
    pub const ALL: [SettingsItem; 7] = [
        Self::Units,
        Self::Brightness,
        Self::Sound,
        Self::Emissivity,
        Self::Target,
        Self::AutoSleep,
        Self::Exit,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

pub struct DeviceStateMachine {
    state: DeviceState,
    settings: Settings,
    /// Emissivity when the emissivity screen was opened.
    emissivity_on_entry: Option<f32>,
    restart_pending: bool,
    /// Screen the last single tap landed on. A double tap only counts while
    /// that screen is still showing.
    tap_screen: Option<MenuState>,
}

impl DeviceStateMachine {
    /// Start on the main screen, or on the unit prompt if the user has never
    /// picked a unit.
    pub fn new(settings: Settings, now: Instant) -> Self {
        let mut state = DeviceState::new(now);
        if !settings.units_confirmed {
            info!(" First boot, asking for display unit");
            state.enter(MenuState::UnitSelect);
        }
        Self {
            state,
            settings,
            emissivity_on_entry: None,
            restart_pending: false,
            tap_screen: None,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Route one input event.
    ///
    /// While asleep the first event only wakes the device and is otherwise
    /// discarded.
    pub fn handle_event(&mut self, event: Event, now: Instant) -> Result<Effects, StateFault> {
        let mut fx = Effects::new();

        if self.state.sleeping {
            self.wake(now, &mut fx);
            return Ok(fx);
        }
        self.state.touch(now);

        let tap_screen = self.tap_screen.take();
        match event {
            Event::Tap(point) => {
                self.tap_screen = Some(self.state.menu_state());
                self.tap(point, &mut fx)?;
            }
            Event::DoubleTap(_) if tap_screen != Some(self.state.menu_state()) => {
                debug!(" Ignoring double tap, screen changed since first tap");
            }
            Event::DoubleTap(point) => {
                let on_widget = screens::hit_test(&self.state, &self.settings, point).is_some();
                if self.state.menu_state() == MenuState::Main && !on_widget {
                    self.settings.use_celsius = !self.settings.use_celsius;
                    info!(
                        " Display unit -> {}",
                        if self.settings.use_celsius { "C" } else { "F" }
                    );
                    self.state.mark_dirty();
                    push(&mut fx, Effect::Cue(Cue::Click));
                    push(&mut fx, Effect::SaveSettings);
                } else {
                    // Quick taps on steppers still count as taps.
                    self.tap(point, &mut fx)?;
                }
            }
            Event::Dragging { dy, .. } => {
                if self.state.menu_state() == MenuState::Settings {
                    self.state.scroll_by(-dy);
                }
            }
            Event::DragStart(_) | Event::DragEnd => {}
            Event::ButtonPress(id) => {
                if let Some(action) = self.button_action(id) {
                    push(&mut fx, Effect::Cue(Cue::Click));
                    self.apply_action(action, &mut fx)?;
                }
            }
        }

        Ok(fx)
    }

    fn tap(&mut self, point: TouchPoint, fx: &mut Effects) -> Result<(), StateFault> {
        match screens::hit_test(&self.state, &self.settings, point) {
            Some(action) => {
                push(fx, Effect::Cue(Cue::Click));
                self.apply_action(action, fx)
            }
            None => Ok(()),
        }
    }

    /// What a physical button does on the current screen.
    pub fn button_action(&self, id: ButtonId) -> Option<Action> {
        let menu = self.state.menu_state();
        match (id, menu) {
            (ButtonId::Primary, MenuState::Main) => Some(Action::ToggleMonitoring),
            (ButtonId::Primary, MenuState::RestartConfirm) => Some(Action::ConfirmRestart),
            (ButtonId::Primary, m) if m.is_adjustment() => Some(Action::Done),
            (ButtonId::Primary, _) => None,
            (ButtonId::Secondary, MenuState::Main) => Some(Action::OpenSettings),
            (ButtonId::Secondary, MenuState::RestartConfirm) => Some(Action::CancelRestart),
            (ButtonId::Secondary, MenuState::UnitSelect) if !self.settings.units_confirmed => None,
            (ButtonId::Secondary, _) => Some(Action::Back),
        }
    }

    /// Run `action` on the current screen.
    pub fn apply_action(&mut self, action: Action, fx: &mut Effects) -> Result<(), StateFault> {
        let menu = self.state.menu_state();
        debug!(" {:?} on {:?}", action, menu);

        match (menu, action) {
            (MenuState::Main, Action::OpenSettings) => self.state.enter(MenuState::Settings),
            (MenuState::Main, Action::ToggleMonitoring) => {
                let on = !self.state.is_monitoring();
                self.state.set_monitoring(on);
                info!(" Monitoring {}", if on { "started" } else { "stopped" });
                let cue = if on { Cue::MonitorStart } else { Cue::MonitorStop };
                push(fx, Effect::Cue(cue));
            }

            (MenuState::Settings, Action::SelectItem(index)) => {
                let item =
                    SettingsItem::from_index(index).ok_or(StateFault::NoSuchItem { menu, index })?;
                self.state.selected_menu_item = Some(index);
                self.open_item(item, fx);
            }
            (MenuState::Settings, Action::Back) => {
                push(fx, Effect::SaveSettings);
                self.state.enter(MenuState::Main);
            }

            (MenuState::UnitSelect, Action::SetUnit { celsius }) => {
                let first_run = !self.settings.units_confirmed;
                self.settings.use_celsius = celsius;
                self.settings.units_confirmed = true;
                push(fx, Effect::SaveSettings);
                push(fx, Effect::Cue(Cue::SettingSaved));
                self.state.enter(if first_run {
                    MenuState::Main
                } else {
                    MenuState::Settings
                });
            }
            (MenuState::UnitSelect, Action::Back) if self.settings.units_confirmed => {
                self.state.enter(MenuState::Settings)
            }

            (MenuState::Brightness, Action::Adjust { up }) => {
                self.settings.step_brightness(up);
                push(fx, Effect::Backlight(self.settings.brightness()));
                self.state.mark_dirty();
            }
            (MenuState::Sound, Action::ToggleSound) => {
                self.settings.sound_enabled = !self.settings.sound_enabled;
                self.state.mark_dirty();
            }
            (MenuState::Emissivity, Action::Adjust { up }) => {
                self.settings.step_emissivity(up);
                self.state.mark_dirty();
            }
            (MenuState::Target, Action::AdjustTarget { up }) => {
                self.settings.step_target(up);
                self.state.mark_dirty();
            }
            (MenuState::Target, Action::AdjustTolerance { up }) => {
                self.settings.step_tolerance(up);
                self.state.mark_dirty();
            }

            (MenuState::Emissivity, Action::Done | Action::Back) => {
                push(fx, Effect::SaveSettings);
                push(fx, Effect::Cue(Cue::SettingSaved));
                let before = self.emissivity_on_entry.take();
                let now = self.settings.emissivity();
                if before.is_some_and(|before| before != now) {
                    push(fx, Effect::ApplyEmissivity(now));
                    self.restart_pending = true;
                    self.state.enter(MenuState::RestartConfirm);
                } else {
                    self.state.enter(MenuState::Settings);
                }
            }
            (MenuState::Brightness | MenuState::Sound | MenuState::Target, Action::Done | Action::Back) => {
                push(fx, Effect::SaveSettings);
                push(fx, Effect::Cue(Cue::SettingSaved));
                self.state.enter(MenuState::Settings);
            }

            (MenuState::RestartConfirm, Action::ConfirmRestart) => {
                if !self.restart_pending {
                    return Err(StateFault::NoPendingRestart);
                }
                info!(" Restart confirmed");
                push(fx, Effect::Cue(Cue::Restart));
                push(fx, Effect::Restart);
            }
            (MenuState::RestartConfirm, Action::CancelRestart | Action::Back) => {
                info!(" Restart deferred; new emissivity applies after next power cycle");
                self.restart_pending = false;
                self.state.enter(MenuState::Settings);
            }

            (menu, action) => return Err(StateFault::UnexpectedAction { menu, action }),
        }

        Ok(())
    }

    fn open_item(&mut self, item: SettingsItem, fx: &mut Effects) {
        match item {
            SettingsItem::Units => self.state.enter(MenuState::UnitSelect),
            SettingsItem::Brightness => self.state.enter(MenuState::Brightness),
            SettingsItem::Sound => self.state.enter(MenuState::Sound),
            SettingsItem::Emissivity => {
                self.emissivity_on_entry = Some(self.settings.emissivity());
                self.state.enter(MenuState::Emissivity);
            }
            SettingsItem::Target => self.state.enter(MenuState::Target),
            SettingsItem::AutoSleep => {
                self.settings.auto_sleep_enabled = !self.settings.auto_sleep_enabled;
                push(fx, Effect::SaveSettings);
                self.state.mark_dirty();
            }
            SettingsItem::Exit => {
                push(fx, Effect::SaveSettings);
                self.state.enter(MenuState::Main);
            }
        }
    }

    /// Put the display to sleep once the idle timeout has passed. Only the
    /// main screen sleeps.
    pub fn check_idle(&mut self, now: Instant) -> Effects {
        let mut fx = Effects::new();
        if self.state.sleeping
            || !self.settings.auto_sleep_enabled
            || self.state.menu_state() != MenuState::Main
        {
            return fx;
        }

        let idle_ms = now
            .saturating_duration_since(self.state.last_activity)
            .as_millis();
        if idle_ms >= self.settings.sleep_timeout_ms() {
            info!(" Idle for {} ms, sleeping", idle_ms);
            self.state.sleeping = true;
            push(&mut fx, Effect::DisplayPower(false));
        }
        fx
    }

    fn wake(&mut self, now: Instant, fx: &mut Effects) {
        info!(" Waking up");
        self.state.reset(now);
        push(fx, Effect::DisplayPower(true));
        push(fx, Effect::Backlight(self.settings.brightness()));
        push(fx, Effect::Cue(Cue::Wake));
    }

    /// Recovery after a fault: back to the main screen, monitoring off,
    /// everything redrawn.
    pub fn recover(&mut self) {
        self.emissivity_on_entry = None;
        self.restart_pending = false;
        self.tap_screen = None;
        self.state.enter(MenuState::Main);
        self.state.set_monitoring(false);
        self.state.mark_dirty();
    }
}

fn push(fx: &mut Effects, effect: Effect) {
    if fx.push(effect).is_err() {
        warn!(" Effect buffer full, dropping {:?}", effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EMISSIVITY_MIN;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn confirmed() -> Settings {
        let mut settings = Settings::default();
        settings.units_confirmed = true;
        settings
    }

    fn machine() -> DeviceStateMachine {
        DeviceStateMachine::new(confirmed(), at(0))
    }

    fn act(m: &mut DeviceStateMachine, action: Action) -> Effects {
        let mut fx = Effects::new();
        m.apply_action(action, &mut fx).unwrap();
        fx
    }

    fn press(m: &mut DeviceStateMachine, id: ButtonId, ms: u64) -> Effects {
        m.handle_event(Event::ButtonPress(id), at(ms)).unwrap()
    }

    fn item(item: SettingsItem) -> Action {
        let index = SettingsItem::ALL.iter().position(|i| *i == item).unwrap();
        Action::SelectItem(index as u8)
    }

    #[test]
    fn first_boot_prompts_for_unit() {
        let mut m = DeviceStateMachine::new(Settings::default(), at(0));
        assert_eq!(m.state().menu_state(), MenuState::UnitSelect);
        assert_eq!(m.button_action(ButtonId::Secondary), None);

        let fx = act(&mut m, Action::SetUnit { celsius: false });
        assert!(fx.contains(&Effect::SaveSettings));
        assert!(!m.settings().use_celsius);
        assert!(m.settings().units_confirmed);
        assert_eq!(m.state().menu_state(), MenuState::Main);
    }

    #[test]
    fn unit_change_from_settings_returns_to_settings() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        act(&mut m, item(SettingsItem::Units));
        assert_eq!(m.state().menu_state(), MenuState::UnitSelect);
        act(&mut m, Action::SetUnit { celsius: false });
        assert_eq!(m.state().menu_state(), MenuState::Settings);
    }

    #[test]
    fn monitor_toggle_on_main() {
        let mut m = machine();
        let fx = act(&mut m, Action::ToggleMonitoring);
        assert!(m.state().is_monitoring());
        assert_eq!(fx.as_slice(), &[Effect::Cue(Cue::MonitorStart)]);
        act(&mut m, Action::ToggleMonitoring);
        assert!(!m.state().is_monitoring());
    }

    #[test]
    fn opening_settings_stops_monitoring() {
        let mut m = machine();
        act(&mut m, Action::ToggleMonitoring);
        press(&mut m, ButtonId::Secondary, 10);
        assert_eq!(m.state().menu_state(), MenuState::Settings);
        assert!(!m.state().is_monitoring());
    }

    #[test]
    fn exit_saves_and_returns_to_main() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        let fx = act(&mut m, item(SettingsItem::Exit));
        assert_eq!(fx.as_slice(), &[Effect::SaveSettings]);
        assert_eq!(m.state().menu_state(), MenuState::Main);
    }

    #[test]
    fn brightness_is_previewed_then_saved() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        act(&mut m, item(SettingsItem::Brightness));
        let fx = act(&mut m, Action::Adjust { up: true });
        assert_eq!(fx.as_slice(), &[Effect::Backlight(144)]);
        let fx = press(&mut m, ButtonId::Primary, 10);
        assert!(fx.contains(&Effect::SaveSettings));
        assert_eq!(m.state().menu_state(), MenuState::Settings);
    }

    #[test]
    fn unchanged_emissivity_skips_restart_prompt() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        act(&mut m, item(SettingsItem::Emissivity));
        act(&mut m, Action::Adjust { up: false });
        act(&mut m, Action::Adjust { up: true });
        let fx = act(&mut m, Action::Done);
        assert!(fx.contains(&Effect::SaveSettings));
        assert_eq!(m.state().menu_state(), MenuState::Settings);
    }

    #[test]
    fn changed_emissivity_asks_for_restart() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        act(&mut m, item(SettingsItem::Emissivity));
        act(&mut m, Action::Adjust { up: false });
        let fx = act(&mut m, Action::Done);
        assert!(fx.contains(&Effect::SaveSettings));
        assert!(fx.contains(&Effect::ApplyEmissivity(0.94)));
        assert_eq!(m.state().menu_state(), MenuState::RestartConfirm);

        let fx = act(&mut m, Action::ConfirmRestart);
        assert!(fx.contains(&Effect::Restart));
    }

    #[test]
    fn cancelled_restart_keeps_saved_value() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        act(&mut m, item(SettingsItem::Emissivity));
        for _ in 0..100 {
            act(&mut m, Action::Adjust { up: false });
        }
        assert_eq!(m.settings().emissivity(), EMISSIVITY_MIN);
        act(&mut m, Action::Done);
        let fx = press(&mut m, ButtonId::Secondary, 10);
        assert!(!fx.contains(&Effect::Restart));
        assert_eq!(m.state().menu_state(), MenuState::Settings);
        assert_eq!(m.settings().emissivity(), EMISSIVITY_MIN);
    }

    #[test]
    fn confirm_without_pending_change_is_a_fault() {
        let mut m = machine();
        m.state_mut().enter(MenuState::RestartConfirm);
        let mut fx = Effects::new();
        assert_eq!(
            m.apply_action(Action::ConfirmRestart, &mut fx),
            Err(StateFault::NoPendingRestart)
        );
    }

    #[test]
    fn action_from_another_screen_is_a_fault() {
        let mut m = machine();
        let mut fx = Effects::new();
        assert_eq!(
            m.apply_action(Action::ToggleSound, &mut fx),
            Err(StateFault::UnexpectedAction {
                menu: MenuState::Main,
                action: Action::ToggleSound
            })
        );
        act(&mut m, Action::OpenSettings);
        assert_eq!(
            m.apply_action(Action::SelectItem(42), &mut fx),
            Err(StateFault::NoSuchItem {
                menu: MenuState::Settings,
                index: 42
            })
        );
    }

    #[test]
    fn recover_forces_main() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        m.state_mut().mark_drawn();
        m.recover();
        assert_eq!(m.state().menu_state(), MenuState::Main);
        assert!(!m.state().is_monitoring());
        assert!(m.state().needs_redraw());
    }

    #[test]
    fn recover_stops_monitoring_on_main() {
        let mut m = machine();
        act(&mut m, Action::ToggleMonitoring);
        assert!(m.state().is_monitoring());
        m.recover();
        assert_eq!(m.state().menu_state(), MenuState::Main);
        assert!(!m.state().is_monitoring());
    }

    #[test]
    fn double_tap_on_empty_main_toggles_unit() {
        let mut m = machine();
        let empty = TouchPoint::new(160, 100);
        assert_eq!(screens::hit_test(m.state(), m.settings(), empty), None);
        m.handle_event(Event::Tap(empty), at(0)).unwrap();
        let fx = m.handle_event(Event::DoubleTap(empty), at(10)).unwrap();
        assert!(fx.contains(&Effect::SaveSettings));
        assert!(!m.settings().use_celsius);
    }

    #[test]
    fn double_tap_does_not_replay_onto_the_next_screen() {
        let mut settings = Settings::default();
        settings.units_confirmed = true;
        settings.use_celsius = false;
        let mut m = DeviceStateMachine::new(settings, at(0));
        act(&mut m, Action::OpenSettings);

        let units_row = TouchPoint::new(160, 57);
        m.handle_event(Event::Tap(units_row), at(10)).unwrap();
        assert_eq!(m.state().menu_state(), MenuState::UnitSelect);

        let fx = m.handle_event(Event::DoubleTap(units_row), at(60)).unwrap();
        assert!(fx.is_empty());
        assert_eq!(m.state().menu_state(), MenuState::UnitSelect);
        assert!(!m.settings().use_celsius);
    }

    #[test]
    fn double_tap_on_settings_button_only_opens_settings() {
        let mut m = machine();
        let button = TouchPoint::new(255, 206);
        m.handle_event(Event::Tap(button), at(0)).unwrap();
        assert_eq!(m.state().menu_state(), MenuState::Settings);

        m.handle_event(Event::DoubleTap(button), at(50)).unwrap();
        assert_eq!(m.state().menu_state(), MenuState::Settings);
    }

    #[test]
    fn double_tap_on_a_stepper_steps_twice() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        act(&mut m, item(SettingsItem::Brightness));
        let before = m.settings().brightness();

        let plus = TouchPoint::new(260, 100);
        assert_eq!(
            screens::hit_test(m.state(), m.settings(), plus),
            Some(Action::Adjust { up: true })
        );
        m.handle_event(Event::Tap(plus), at(0)).unwrap();
        m.handle_event(Event::DoubleTap(plus), at(150)).unwrap();
        assert!(m.settings().brightness() > before);
        assert_eq!(m.state().menu_state(), MenuState::Brightness);
    }

    #[test]
    fn idle_sleep_only_on_main() {
        let mut m = machine();
        let timeout = m.settings().sleep_timeout_ms();

        act(&mut m, Action::OpenSettings);
        assert!(m.check_idle(at(timeout + 1)).is_empty());
        assert!(!m.state().sleeping);

        act(&mut m, item(SettingsItem::Exit));
        let fx = m.check_idle(at(timeout));
        assert_eq!(fx.as_slice(), &[Effect::DisplayPower(false)]);
        assert!(m.state().sleeping);
    }

    #[test]
    fn auto_sleep_can_be_disabled() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        act(&mut m, item(SettingsItem::AutoSleep));
        assert!(!m.settings().auto_sleep_enabled);
        act(&mut m, item(SettingsItem::Exit));
        assert!(m.check_idle(at(u32::MAX as u64)).is_empty());
    }

    #[test]
    fn wake_touch_is_consumed_and_resets() {
        let mut m = machine();
        act(&mut m, Action::ToggleMonitoring);
        let timeout = m.settings().sleep_timeout_ms();
        m.check_idle(at(timeout));
        assert!(m.state().sleeping);

        let fx = m
            .handle_event(Event::Tap(TouchPoint::new(5, 5)), at(timeout + 100))
            .unwrap();
        assert!(fx.contains(&Effect::DisplayPower(true)));
        assert!(!m.state().sleeping);
        assert!(!m.state().is_monitoring());
        assert_eq!(m.state().menu_state(), MenuState::Main);
    }

    #[test]
    fn drag_scrolls_settings_list() {
        let mut m = machine();
        act(&mut m, Action::OpenSettings);
        m.handle_event(Event::Dragging { dx: 0, dy: -30 }, at(10))
            .unwrap();
        assert_eq!(m.state().scroll_position(), 30);
        m.handle_event(Event::Dragging { dx: 0, dy: 100 }, at(20))
            .unwrap();
        assert_eq!(m.state().scroll_position(), 0);
    }
}
