//! Temperature classification against the user's target band
//!
//! [`classify`] is a pure function; everything with side effects (status
//! text, colors, the LED, the beep) is decided by the caller from the
//! returned [`AlertStatus`]. [`AlertTracker`] turns the level-triggered
//! classification into the edge that drives the at-target beep.

use crate::config::AlertConfig;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertStatus {
    /// Below the legal range.
    TooCold,
    /// Above the legal range.
    TooHot,
    /// Within tolerance of the target ("Perfect").
    AtTarget,
    /// Inside the legal range but off target ("Ready").
    Stable,
}

/// Classify `temp_c`. Rules are evaluated in order and the first match wins:
/// below `min_c`, above `max_c`, within `tolerance` of `target`, otherwise
/// stable.
pub fn classify(temp_c: f32, target: f32, tolerance: f32, min_c: f32, max_c: f32) -> AlertStatus {
    if temp_c < min_c {
        AlertStatus::TooCold
    } else if temp_c > max_c {
        AlertStatus::TooHot
    } else if libm::fabsf(temp_c - target) <= tolerance {
        AlertStatus::AtTarget
    } else {
        AlertStatus::Stable
    }
}

/// Binds [`classify`] to the configured legal range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvaluator {
    config: AlertConfig,
}

impl AlertEvaluator {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, temp_c: f32, settings: &Settings) -> AlertStatus {
        classify(
            temp_c,
            settings.target_temperature_c(),
            settings.temperature_tolerance_c(),
            self.config.min_c,
            self.config.max_c,
        )
    }
}

/// Remembers the previous classification so callers can react to
/// transitions instead of levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertTracker {
    last: Option<AlertStatus>,
}

impl AlertTracker {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Record `status`. Returns `true` exactly when this observation entered
    /// [`AlertStatus::AtTarget`] from anything else.
    pub fn observe(&mut self, status: AlertStatus) -> bool {
        let entered = status == AlertStatus::AtTarget && self.last != Some(AlertStatus::AtTarget);
        self.last = Some(status);
        entered
    }

    pub fn last(&self) -> Option<AlertStatus> {
        self.last
    }

    /// Forget history, e.g. when monitoring (re)starts, so the first
    /// at-target observation counts as an entry.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_apply_in_order() {
        assert_eq!(classify(99.0, 100.0, 0.0, 100.0, 200.0), AlertStatus::TooCold);
        assert_eq!(classify(201.0, 200.0, 5.0, 100.0, 200.0), AlertStatus::TooHot);
        assert_eq!(classify(178.0, 180.0, 5.0, 100.0, 260.0), AlertStatus::AtTarget);
        assert_eq!(classify(170.0, 180.0, 5.0, 100.0, 260.0), AlertStatus::Stable);
    }

    #[test]
    fn cold_wins_over_at_target() {
        let min_c = 150.0;
        let status = classify(min_c - 1.0, min_c, 0.0, min_c, 250.0);
        assert_eq!(status, AlertStatus::TooCold);
    }

    #[test]
    fn tolerance_is_inclusive() {
        assert_eq!(classify(185.0, 180.0, 5.0, 0.0, 500.0), AlertStatus::AtTarget);
        assert_eq!(classify(175.0, 180.0, 5.0, 0.0, 500.0), AlertStatus::AtTarget);
    }

    #[test]
    fn tolerance_applies_on_both_sides() {
        assert_eq!(classify(174.9, 180.0, 5.0, 0.0, 500.0), AlertStatus::Stable);
        assert_eq!(classify(185.1, 180.0, 5.0, 0.0, 500.0), AlertStatus::Stable);
        assert_eq!(classify(180.0, 180.0, 0.0, 0.0, 500.0), AlertStatus::AtTarget);
    }

    #[test]
    fn classification_is_pure() {
        let first = classify(181.5, 180.0, 2.0, 120.0, 260.0);
        for _ in 0..10 {
            assert_eq!(classify(181.5, 180.0, 2.0, 120.0, 260.0), first);
        }
    }

    #[test]
    fn evaluator_uses_settings_target() {
        let evaluator = AlertEvaluator::new(AlertConfig::default());
        let settings = Settings::default();
        assert_eq!(evaluator.evaluate(182.0, &settings), AlertStatus::AtTarget);
        assert_eq!(evaluator.evaluate(100.0, &settings), AlertStatus::TooCold);
    }

    #[test]
    fn tracker_fires_once_per_entry() {
        let mut tracker = AlertTracker::new();
        assert!(!tracker.observe(AlertStatus::Stable));
        assert!(tracker.observe(AlertStatus::AtTarget));
        assert!(!tracker.observe(AlertStatus::AtTarget));
        assert!(!tracker.observe(AlertStatus::TooHot));
        assert!(tracker.observe(AlertStatus::AtTarget));

        tracker.reset();
        assert!(tracker.observe(AlertStatus::AtTarget));
    }
}
