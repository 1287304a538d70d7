//! Temperature sensor boundary
//!
//! The core never talks to the IR sensor's registers. A board crate
//! implements [`TemperatureSensor`] for its sensor head; the core only relies
//! on the read contract below and on [`validate`] to reject readings that
//! indicate a communication fault.

mod scripted;

pub use scripted::ScriptedSensor;

use thiserror_no_std::Error;

use crate::config::SensorConfig;

/// Raw value reported when the bus returned nothing useful.
pub const SENTINEL_CENTI: i32 = 0;

/// One raw sample in centidegrees Celsius, plus the sensor's own validity
/// flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub value_centi: i32,
    pub valid: bool,
}

impl RawReading {
    pub const fn new(value_centi: i32) -> Self {
        Self {
            value_centi,
            valid: true,
        }
    }

    pub const fn invalid() -> Self {
        Self {
            value_centi: SENTINEL_CENTI,
            valid: false,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("sensor flagged the reading as invalid")]
    Invalid,
    #[error("sensor returned the no-data sentinel")]
    Sentinel,
    #[error("reading {value_centi} centidegrees is outside the plausible range")]
    OutOfRange { value_centi: i32 },
}

/// An infrared temperature sensor.
pub trait TemperatureSensor {
    /// Take one raw reading. Bus errors are reported as
    /// [`SensorError::ReadFailed`]; implausible values are reported through
    /// `valid` and filtered by [`validate`].
    fn read_raw(&mut self) -> Result<RawReading, SensorError>;

    /// Push the surface emissivity into the sensor. Heads that keep it in
    /// EEPROM only pick up the new value after a restart.
    fn set_emissivity(&mut self, _emissivity: f32) -> Result<(), SensorError> {
        Ok(())
    }
}

/// Accept a raw reading or explain why it is a fault.
pub fn validate(reading: RawReading, config: &SensorConfig) -> Result<i32, SensorError> {
    if !reading.valid {
        return Err(SensorError::Invalid);
    }
    if reading.value_centi == SENTINEL_CENTI {
        return Err(SensorError::Sentinel);
    }
    if reading.value_centi < config.min_valid_centi || reading.value_centi > config.max_valid_centi
    {
        return Err(SensorError::OutOfRange {
            value_centi: reading.value_centi,
        });
    }
    Ok(reading.value_centi)
}

pub fn centi_to_celsius(centi: i32) -> f32 {
    centi as f32 / 100.0
}

/// Rounds half away from zero.
pub fn celsius_to_centi(celsius: f32) -> i32 {
    libm::roundf(celsius * 100.0) as i32
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert a temperature difference (not an absolute value).
pub fn delta_celsius_to_fahrenheit(delta: f32) -> f32 {
    delta * 9.0 / 5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_reading_passes() {
        let config = SensorConfig::default();
        assert_eq!(validate(RawReading::new(18_000), &config), Ok(18_000));
        assert_eq!(validate(RawReading::new(-500), &config), Ok(-500));
    }

    #[test]
    fn faults_are_classified() {
        let config = SensorConfig::default();
        assert_eq!(validate(RawReading::invalid(), &config), Err(SensorError::Invalid));
        assert_eq!(validate(RawReading::new(0), &config), Err(SensorError::Sentinel));
        assert_eq!(
            validate(RawReading::new(-1_001), &config),
            Err(SensorError::OutOfRange { value_centi: -1_001 })
        );
        assert_eq!(
            validate(RawReading::new(100_001), &config),
            Err(SensorError::OutOfRange {
                value_centi: 100_001
            })
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(centi_to_celsius(18_050), 180.5);
        assert_eq!(celsius_to_centi(20.1), 2_010);
        assert_eq!(celsius_to_centi(-3.25), -325);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(delta_celsius_to_fahrenheit(5.0), 9.0);
    }

    #[test]
    fn centi_rounds_half_away_from_zero() {
        assert_eq!(celsius_to_centi(0.125), 13);
        assert_eq!(celsius_to_centi(-0.125), -13);
        assert_eq!(celsius_to_centi(0.0), 0);
    }
}
