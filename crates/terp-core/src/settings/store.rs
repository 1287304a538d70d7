//! Key-value persistence for [`Settings`]
//!
//! The settings namespace is stored as one postcard-encoded list of
//! `(key, value)` entries. Loading starts from the configured defaults and
//! applies every recognised entry through the clamping setters, so missing
//! keys fall back to defaults, unknown keys are ignored and out-of-range
//! values are pulled back into their domain.
//!
//! The whole list is written in a single backend call, which makes a save
//! atomic from the caller's point of view.

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::Settings;
use crate::config::SettingsDefaults;
use crate::storage::{StorageBackend, StoreError};

/// Namespace used for the settings record.
pub const SETTINGS_NAMESPACE: &str = "settings";

/// Bumped when the meaning of an existing key changes.
const RECORD_VERSION: u8 = 1;

/// Logical keys of the persisted schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    UseCelsius,
    SoundEnabled,
    AutoSleep,
    UnitsConfirmed,
    Brightness,
    SleepTimeout,
    Emissivity,
    TargetTemp,
    Tolerance,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::UseCelsius,
        SettingKey::SoundEnabled,
        SettingKey::AutoSleep,
        SettingKey::UnitsConfirmed,
        SettingKey::Brightness,
        SettingKey::SleepTimeout,
        SettingKey::Emissivity,
        SettingKey::TargetTemp,
        SettingKey::Tolerance,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::UseCelsius => "useCelsius",
            Self::SoundEnabled => "soundEnabled",
            Self::AutoSleep => "autoSleep",
            Self::UnitsConfirmed => "unitsSet",
            Self::Brightness => "brightness",
            Self::SleepTimeout => "sleepTimeout",
            Self::Emissivity => "emissivity",
            Self::TargetTemp => "targetTemp",
            Self::Tolerance => "tolerance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    F32(f32),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct StoredEntry {
    key: String,
    value: SettingValue,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct StoredRecord {
    version: u8,
    entries: Vec<StoredEntry>,
}

/// Loads and saves [`Settings`] through a [`StorageBackend`].
///
/// No handle is held between calls: each `load`/`save` opens and closes the
/// namespace through the backend.
pub struct SettingsStore<B: StorageBackend> {
    backend: B,
    defaults: SettingsDefaults,
}

impl<B: StorageBackend> SettingsStore<B> {
    pub fn new(backend: B, defaults: SettingsDefaults) -> Self {
        Self { backend, defaults }
    }

    /// Read the stored settings. Never fails: any storage or decode problem
    /// is logged and the defaults are returned instead.
    pub fn load(&mut self) -> Settings {
        let mut settings = Settings::from_defaults(&self.defaults);

        let bytes = match self.backend.read(SETTINGS_NAMESPACE) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!(" No stored settings, using defaults");
                return settings;
            }
            Err(e) => {
                warn!(" Settings storage unavailable ({}), using defaults", e);
                return settings;
            }
        };

        let record: StoredRecord = match postcard::from_bytes(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(" Stored settings are corrupt ({:?}), using defaults", e);
                return settings;
            }
        };

        if record.version != RECORD_VERSION {
            warn!(
                " Settings record version {} (expected {}), reading known keys only",
                record.version, RECORD_VERSION
            );
        }

        for entry in &record.entries {
            match SettingKey::from_name(&entry.key) {
                Some(key) => apply(&mut settings, key, entry.value),
                None => debug!(" Ignoring unknown settings key {}", entry.key),
            }
        }

        settings
    }

    /// Write every field in one backend call. Returns once the backend has
    /// accepted the write.
    pub fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        let record = StoredRecord {
            version: RECORD_VERSION,
            entries: SettingKey::ALL
                .into_iter()
                .map(|key| StoredEntry {
                    key: key.name().to_string(),
                    value: value_of(settings, key),
                })
                .collect(),
        };

        let bytes = postcard::to_allocvec(&record).map_err(|_| StoreError::Encode)?;
        self.backend.write(SETTINGS_NAMESPACE, &bytes)?;
        debug!(" Saved settings ({} bytes)", bytes.len());
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn value_of(settings: &Settings, key: SettingKey) -> SettingValue {
    match key {
        SettingKey::UseCelsius => SettingValue::Bool(settings.use_celsius),
        SettingKey::SoundEnabled => SettingValue::Bool(settings.sound_enabled),
        SettingKey::AutoSleep => SettingValue::Bool(settings.auto_sleep_enabled),
        SettingKey::UnitsConfirmed => SettingValue::Bool(settings.units_confirmed),
        SettingKey::Brightness => SettingValue::U8(settings.brightness()),
        SettingKey::SleepTimeout => SettingValue::U16(settings.sleep_timeout_minutes()),
        SettingKey::Emissivity => SettingValue::F32(settings.emissivity()),
        SettingKey::TargetTemp => SettingValue::F32(settings.target_temperature_c()),
        SettingKey::Tolerance => SettingValue::F32(settings.temperature_tolerance_c()),
    }
}

/// Apply a stored value; a value of the wrong type leaves the default.
fn apply(settings: &mut Settings, key: SettingKey, value: SettingValue) {
    match (key, value) {
        (SettingKey::UseCelsius, SettingValue::Bool(v)) => settings.use_celsius = v,
        (SettingKey::SoundEnabled, SettingValue::Bool(v)) => settings.sound_enabled = v,
        (SettingKey::AutoSleep, SettingValue::Bool(v)) => settings.auto_sleep_enabled = v,
        (SettingKey::UnitsConfirmed, SettingValue::Bool(v)) => settings.units_confirmed = v,
        (SettingKey::Brightness, SettingValue::U8(v)) => settings.set_brightness(v),
        (SettingKey::SleepTimeout, SettingValue::U16(v)) => settings.set_sleep_timeout_minutes(v),
        (SettingKey::Emissivity, SettingValue::F32(v)) => settings.set_emissivity(v),
        (SettingKey::TargetTemp, SettingValue::F32(v)) => settings.set_target_temperature_c(v),
        (SettingKey::Tolerance, SettingValue::F32(v)) => settings.set_temperature_tolerance_c(v),
        (key, value) => warn!(
            " Settings key {} has unexpected value {:?}, keeping default",
            key.name(),
            value
        ),
    }
}
