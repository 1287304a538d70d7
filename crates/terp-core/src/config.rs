//! Tunable device configuration
//!
//! Everything here is fixed at build or boot time and handed to the
//! components that need it. User-facing, persisted values live in
//! [`crate::settings::Settings`] instead.

use serde::{Deserialize, Serialize};

/// Display geometry, in pixels.
pub const DISPLAY_WIDTH_PX: u16 = 320;
pub const DISPLAY_HEIGHT_PX: u16 = 240;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Config {
    pub filter: FilterConfig,
    pub alert: AlertConfig,
    pub input: InputConfig,
    pub sensor: SensorConfig,
    pub feedback: FeedbackConfig,
    pub defaults: SettingsDefaults,
}

/// Median filter post-processing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// Filtered readings above this value get the correction multiplier.
    pub high_temp_threshold_centi: i32,
    /// Empirical gain for sensor nonlinearity at the top of the range.
    /// `1.0` disables the correction.
    pub high_temp_multiplier: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            high_temp_threshold_centi: 45_000,
            high_temp_multiplier: 1.05,
        }
    }
}

/// Legal temperature band used by the alert classification, in °C.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AlertConfig {
    pub min_c: f32,
    pub max_c: f32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_c: 120.0,
            max_c: 260.0,
        }
    }
}

/// Touch and button disambiguation windows.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct InputConfig {
    pub drag_threshold_px: u16,
    pub double_tap_window_ms: u64,
    pub tap_debounce_ms: u64,
    pub button_debounce_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 10,
            double_tap_window_ms: 300,
            tap_debounce_ms: 100,
            button_debounce_ms: 250,
        }
    }
}

/// Sensor sampling cadence and the window of plausible raw values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub sample_interval_ms: u64,
    /// Raw values below this are treated as a communication fault.
    pub min_valid_centi: i32,
    /// Raw values above this are treated as a communication fault.
    pub max_valid_centi: i32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 250,
            min_valid_centi: -1_000,
            max_valid_centi: 100_000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct FeedbackConfig {
    /// Cues arriving faster than this are dropped.
    pub min_cue_interval_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            min_cue_interval_ms: 50,
        }
    }
}

/// Values used when a settings key has never been stored.
///
/// The emissivity default depends on the sensor head fitted to the board;
/// 0.95 suits the common glass/quartz surfaces the device is pointed at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SettingsDefaults {
    pub use_celsius: bool,
    pub sound_enabled: bool,
    pub auto_sleep_enabled: bool,
    pub brightness: u8,
    pub sleep_timeout_minutes: u16,
    pub emissivity: f32,
    pub target_temperature_c: f32,
    pub temperature_tolerance_c: f32,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            use_celsius: true,
            sound_enabled: true,
            auto_sleep_enabled: true,
            brightness: 128,
            sleep_timeout_minutes: 5,
            emissivity: 0.95,
            target_temperature_c: 180.0,
            temperature_tolerance_c: 5.0,
        }
    }
}
