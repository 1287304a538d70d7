use alloc::collections::VecDeque;

use super::{RawReading, SensorError, TemperatureSensor};

/// Replays a fixed list of readings, then repeats the last one.
///
/// Used by tests and host demos in place of a real sensor head.
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    queue: VecDeque<Result<RawReading, SensorError>>,
    last: Option<Result<RawReading, SensorError>>,
    emissivity: Option<f32>,
    reads: usize,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue readings given in centidegrees.
    pub fn with_centi(values: &[i32]) -> Self {
        let mut sensor = Self::new();
        for &value in values {
            sensor.push(Ok(RawReading::new(value)));
        }
        sensor
    }

    pub fn push(&mut self, reading: Result<RawReading, SensorError>) {
        self.queue.push_back(reading);
    }

    pub fn push_centi(&mut self, value: i32) {
        self.push(Ok(RawReading::new(value)));
    }

    /// Emissivity most recently pushed by the core, if any.
    pub fn emissivity(&self) -> Option<f32> {
        self.emissivity
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl TemperatureSensor for ScriptedSensor {
    fn read_raw(&mut self) -> Result<RawReading, SensorError> {
        self.reads += 1;
        if let Some(next) = self.queue.pop_front() {
            self.last = Some(next);
        }
        self.last.unwrap_or(Err(SensorError::ReadFailed {
            sensor: "scripted",
            operation: "read",
            details: "no readings queued",
        }))
    }

    fn set_emissivity(&mut self, emissivity: f32) -> Result<(), SensorError> {
        self.emissivity = Some(emissivity);
        Ok(())
    }
}
