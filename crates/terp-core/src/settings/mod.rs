//! User settings and their valid ranges
//!
//! [`Settings`] is the single persisted configuration record. Every setter
//! clamps into the documented domain so an out-of-range value can never be
//! observed, whether it came from a menu adjustment or from storage.

mod store;

pub use store::*;

use crate::config::SettingsDefaults;

pub const EMISSIVITY_MIN: f32 = 0.65;
pub const EMISSIVITY_MAX: f32 = 1.00;
pub const EMISSIVITY_STEP: f32 = 0.01;

pub const BRIGHTNESS_STEP: u8 = 16;

pub const SLEEP_TIMEOUT_MIN_MINUTES: u16 = 1;
pub const SLEEP_TIMEOUT_MAX_MINUTES: u16 = 60;

pub const TARGET_MIN_C: f32 = 0.0;
pub const TARGET_MAX_C: f32 = 500.0;
pub const TARGET_STEP_C: f32 = 1.0;

pub const TOLERANCE_MIN_C: f32 = 0.5;
pub const TOLERANCE_MAX_C: f32 = 50.0;
pub const TOLERANCE_STEP_C: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub use_celsius: bool,
    pub sound_enabled: bool,
    pub auto_sleep_enabled: bool,
    /// Set once the user has picked a display unit on first boot.
    pub units_confirmed: bool,
    brightness: u8,
    sleep_timeout_minutes: u16,
    emissivity: f32,
    target_temperature_c: f32,
    temperature_tolerance_c: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_defaults(&SettingsDefaults::default())
    }
}

impl Settings {
    pub fn from_defaults(defaults: &SettingsDefaults) -> Self {
        let mut settings = Self {
            use_celsius: defaults.use_celsius,
            sound_enabled: defaults.sound_enabled,
            auto_sleep_enabled: defaults.auto_sleep_enabled,
            units_confirmed: false,
            brightness: 0,
            sleep_timeout_minutes: SLEEP_TIMEOUT_MIN_MINUTES,
            emissivity: EMISSIVITY_MAX,
            target_temperature_c: 0.0,
            temperature_tolerance_c: TOLERANCE_MIN_C,
        };
        settings.set_brightness(defaults.brightness);
        settings.set_sleep_timeout_minutes(defaults.sleep_timeout_minutes);
        settings.set_emissivity(defaults.emissivity);
        settings.set_target_temperature_c(defaults.target_temperature_c);
        settings.set_temperature_tolerance_c(defaults.temperature_tolerance_c);
        settings
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// `u8` already spans the full backlight range, so this cannot clamp.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    pub fn step_brightness(&mut self, up: bool) {
        self.brightness = if up {
            self.brightness.saturating_add(BRIGHTNESS_STEP)
        } else {
            self.brightness.saturating_sub(BRIGHTNESS_STEP)
        };
    }

    pub fn sleep_timeout_minutes(&self) -> u16 {
        self.sleep_timeout_minutes
    }

    pub fn set_sleep_timeout_minutes(&mut self, minutes: u16) {
        self.sleep_timeout_minutes = minutes.clamp(SLEEP_TIMEOUT_MIN_MINUTES, SLEEP_TIMEOUT_MAX_MINUTES);
    }

    pub fn emissivity(&self) -> f32 {
        self.emissivity
    }

    pub fn set_emissivity(&mut self, emissivity: f32) {
        self.emissivity = clamp_f32(emissivity, EMISSIVITY_MIN, EMISSIVITY_MAX, EMISSIVITY_MAX);
    }

    /// Nudge emissivity by one step, snapping to the 0.01 grid so repeated
    /// float additions do not drift.
    pub fn step_emissivity(&mut self, up: bool) {
        let hundredths = libm::roundf(self.emissivity * 100.0) as i32;
        let next = if up { hundredths + 1 } else { hundredths - 1 };
        self.set_emissivity(next as f32 / 100.0);
    }

    pub fn target_temperature_c(&self) -> f32 {
        self.target_temperature_c
    }

    pub fn set_target_temperature_c(&mut self, target: f32) {
        self.target_temperature_c = clamp_f32(target, TARGET_MIN_C, TARGET_MAX_C, TARGET_MIN_C);
    }

    pub fn step_target(&mut self, up: bool) {
        let delta = if up { TARGET_STEP_C } else { -TARGET_STEP_C };
        self.set_target_temperature_c(self.target_temperature_c + delta);
    }

    pub fn temperature_tolerance_c(&self) -> f32 {
        self.temperature_tolerance_c
    }

    pub fn set_temperature_tolerance_c(&mut self, tolerance: f32) {
        self.temperature_tolerance_c =
            clamp_f32(tolerance, TOLERANCE_MIN_C, TOLERANCE_MAX_C, TOLERANCE_MIN_C);
    }

    pub fn step_tolerance(&mut self, up: bool) {
        let delta = if up { TOLERANCE_STEP_C } else { -TOLERANCE_STEP_C };
        self.set_temperature_tolerance_c(self.temperature_tolerance_c + delta);
    }

    pub fn sleep_timeout_ms(&self) -> u64 {
        self.sleep_timeout_minutes as u64 * 60_000
    }
}

/// NaN maps to `fallback`; everything else is clamped to `[min, max]`.
fn clamp_f32(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert!(settings.use_celsius);
        assert!(settings.sound_enabled);
        assert!(!settings.units_confirmed);
        assert_eq!(settings.brightness(), 128);
        assert_eq!(settings.emissivity(), 0.95);
        assert_eq!(settings.target_temperature_c(), 180.0);
        assert_eq!(settings.temperature_tolerance_c(), 5.0);
    }

    #[test]
    fn emissivity_is_clamped() {
        let mut settings = Settings::default();
        settings.set_emissivity(2.0);
        assert_eq!(settings.emissivity(), 1.00);
        settings.set_emissivity(-1.0);
        assert_eq!(settings.emissivity(), 0.65);
        settings.set_emissivity(f32::NAN);
        assert_eq!(settings.emissivity(), 1.00);
    }

    #[test]
    fn emissivity_steps_stay_on_grid_and_in_range() {
        let mut settings = Settings::default();
        settings.set_emissivity(0.66);
        settings.step_emissivity(false);
        settings.step_emissivity(false);
        assert_eq!(settings.emissivity(), 0.65);

        settings.set_emissivity(0.99);
        settings.step_emissivity(true);
        settings.step_emissivity(true);
        assert_eq!(settings.emissivity(), 1.00);
    }

    #[test]
    fn brightness_steps_saturate() {
        let mut settings = Settings::default();
        settings.set_brightness(250);
        settings.step_brightness(true);
        assert_eq!(settings.brightness(), 255);
        settings.set_brightness(3);
        settings.step_brightness(false);
        assert_eq!(settings.brightness(), 0);
    }

    #[test]
    fn tolerance_never_reaches_zero() {
        let mut settings = Settings::default();
        settings.set_temperature_tolerance_c(-4.0);
        assert_eq!(settings.temperature_tolerance_c(), TOLERANCE_MIN_C);
    }

    #[test]
    fn sleep_timeout_is_positive() {
        let mut settings = Settings::default();
        settings.set_sleep_timeout_minutes(0);
        assert_eq!(settings.sleep_timeout_minutes(), 1);
        assert_eq!(settings.sleep_timeout_ms(), 60_000);
    }
}
