//! Median filtering of raw IR samples
//!
//! IR sensors pick up single-sample spikes from reflections and transient
//! interference. A median over the last [`HISTORY_LEN`] samples rejects
//! those spikes where a moving average would smear them across the window.

use crate::config::FilterConfig;

/// Number of samples the filter looks back over.
pub const HISTORY_LEN: usize = 5;

/// Readings that differ by less than this (in centidegrees) count as steady.
pub const TREND_DEADBAND_CENTI: i32 = 50;

/// Fixed-size ring of the most recent accepted samples, in centidegrees.
///
/// Slots are only considered valid once written; until the ring has wrapped
/// once, statistics run over the written slots only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureHistory {
    slots: [i32; HISTORY_LEN],
    /// Index of the slot the next sample overwrites (the oldest).
    head: usize,
    len: usize,
}

impl Default for TemperatureHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureHistory {
    pub const fn new() -> Self {
        Self {
            slots: [0; HISTORY_LEN],
            head: 0,
            len: 0,
        }
    }

    /// Overwrite the oldest slot.
    pub fn push(&mut self, sample: i32) {
        self.slots[self.head] = sample;
        self.head = (self.head + 1) % HISTORY_LEN;
        if self.len < HISTORY_LEN {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Valid samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        let start = (self.head + HISTORY_LEN - self.len) % HISTORY_LEN;
        (0..self.len).map(move |i| self.slots[(start + i) % HISTORY_LEN])
    }

    pub fn latest(&self) -> Option<i32> {
        self.iter().last()
    }

    /// Median of the valid samples. With an even count the two middle values
    /// are averaged.
    pub fn median(&self) -> Option<i32> {
        if self.len == 0 {
            return None;
        }

        let mut sorted = [0i32; HISTORY_LEN];
        for (slot, value) in sorted.iter_mut().zip(self.iter()) {
            *slot = value;
        }
        let sorted = &mut sorted[..self.len];
        sorted.sort_unstable();

        let mid = self.len / 2;
        if self.len % 2 == 1 {
            Some(sorted[mid])
        } else {
            // i64 keeps the sum of two extreme i32 values from overflowing.
            Some(((sorted[mid - 1] as i64 + sorted[mid] as i64) / 2) as i32)
        }
    }

    /// Direction of travel between the oldest and newest sample.
    pub fn trend(&self) -> Trend {
        let (Some(oldest), Some(newest)) = (self.iter().next(), self.latest()) else {
            return Trend::Steady;
        };
        let delta = newest.saturating_sub(oldest);
        if delta > TREND_DEADBAND_CENTI {
            Trend::Rising
        } else if delta < -TREND_DEADBAND_CENTI {
            Trend::Falling
        } else {
            Trend::Steady
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Steady,
}

/// Turns raw samples into display values.
///
/// The filter itself is stateless; the sample history lives in
/// [`DeviceState`](crate::state::DeviceState) so it can be inspected and
/// reset along with the rest of the device state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureFilter {
    config: FilterConfig,
}

impl TemperatureFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Record `raw_centi` and return the filtered, corrected reading.
    pub fn apply(&self, history: &mut TemperatureHistory, raw_centi: i32) -> i32 {
        history.push(raw_centi);
        let median = history.median().unwrap_or(raw_centi);
        self.correct(median)
    }

    /// Empirical gain above the high-temperature threshold.
    pub fn correct(&self, filtered_centi: i32) -> i32 {
        if filtered_centi > self.config.high_temp_threshold_centi {
            libm::roundf(filtered_centi as f32 * self.config.high_temp_multiplier) as i32
        } else {
            filtered_centi
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_median(samples: &[i32]) -> i32 {
        let mut sorted = samples.to_vec();
        sorted.sort();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            sorted[mid]
        } else {
            ((sorted[mid - 1] as i64 + sorted[mid] as i64) / 2) as i32
        }
    }

    fn no_correction() -> TemperatureFilter {
        TemperatureFilter::new(FilterConfig {
            high_temp_threshold_centi: i32::MAX,
            high_temp_multiplier: 1.0,
        })
    }

    #[test]
    fn spike_is_rejected() {
        let filter = no_correction();
        let mut history = TemperatureHistory::new();
        let mut out = 0;
        for raw in [2_000, 2_010, 5_500, 2_020, 2_000] {
            out = filter.apply(&mut history, raw);
        }
        assert_eq!(out, 2_010);
    }

    #[test]
    fn partial_history_is_not_zero_padded() {
        let filter = no_correction();
        let mut history = TemperatureHistory::new();
        assert_eq!(filter.apply(&mut history, 18_000), 18_000);
        assert_eq!(filter.apply(&mut history, 18_200), 18_100);
        assert_eq!(filter.apply(&mut history, 30_000), 18_200);
    }

    #[test]
    fn oldest_slot_is_overwritten() {
        let mut history = TemperatureHistory::new();
        for value in 1..=7 {
            history.push(value);
        }
        assert_eq!(history.len(), HISTORY_LEN);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn high_readings_are_corrected() {
        let filter = TemperatureFilter::new(FilterConfig::default());
        assert_eq!(filter.correct(45_000), 45_000);
        assert_eq!(filter.correct(46_000), 48_300);
        assert_eq!(filter.correct(20_000), 20_000);
    }

    #[test]
    fn trend_follows_history() {
        let mut history = TemperatureHistory::new();
        assert_eq!(history.trend(), Trend::Steady);
        for value in [10_000, 10_200, 10_400] {
            history.push(value);
        }
        assert_eq!(history.trend(), Trend::Rising);
        for value in [10_000, 9_000, 8_000, 7_000, 6_000] {
            history.push(value);
        }
        assert_eq!(history.trend(), Trend::Falling);
    }

    proptest! {
        #[test]
        fn output_is_median_of_last_five(samples in prop::collection::vec(-1_000i32..100_000, 1..40)) {
            let filter = no_correction();
            let mut history = TemperatureHistory::new();
            for (i, &raw) in samples.iter().enumerate() {
                let out = filter.apply(&mut history, raw);
                let window_start = (i + 1).saturating_sub(HISTORY_LEN);
                prop_assert_eq!(out, reference_median(&samples[window_start..=i]));
            }
        }
    }
}
