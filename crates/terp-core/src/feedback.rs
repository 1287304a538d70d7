//! Audio and LED feedback
//!
//! State changes are reported as [`Cue`]s. Each cue maps to a short tone
//! sequence and, for some cues, an LED color. The platform plays them through
//! a [`FeedbackSink`].

use embassy_time::Instant;
use log::debug;

use crate::config::FeedbackConfig;
use crate::state::Status;

/// Frequency of the at-target beep.
pub const AT_TARGET_TONE_HZ: u16 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Click,
    MonitorStart,
    MonitorStop,
    AtTarget,
    SettingSaved,
    Error,
    Wake,
    Restart,
}

impl Cue {
    const COUNT: usize = 8;

    const fn index(self) -> usize {
        match self {
            Self::Click => 0,
            Self::MonitorStart => 1,
            Self::MonitorStop => 2,
            Self::AtTarget => 3,
            Self::SettingSaved => 4,
            Self::Error => 5,
            Self::Wake => 6,
            Self::Restart => 7,
        }
    }

    pub const fn tones(self) -> &'static [Tone] {
        match self {
            Self::Click => CLICK_TONES,
            Self::MonitorStart => MONITOR_START_TONES,
            Self::MonitorStop => MONITOR_STOP_TONES,
            Self::AtTarget => AT_TARGET_TONES,
            Self::SettingSaved => SETTING_SAVED_TONES,
            Self::Error => ERROR_TONES,
            Self::Wake => WAKE_TONES,
            Self::Restart => RESTART_TONES,
        }
    }

    /// LED flash that accompanies the cue, if any.
    pub const fn led(self) -> Option<LedColor> {
        match self {
            Self::AtTarget => Some(LedColor::Green),
            Self::Error => Some(LedColor::Red),
            _ => None,
        }
    }
}

const CLICK_TONES: &[Tone] = &[Tone::new(2_400, 15)];
const MONITOR_START_TONES: &[Tone] = &[Tone::new(1_200, 60), Tone::new(1_600, 60)];
const MONITOR_STOP_TONES: &[Tone] = &[Tone::new(1_600, 60), Tone::new(1_200, 60)];
const AT_TARGET_TONES: &[Tone] = &[Tone::new(AT_TARGET_TONE_HZ, 150)];
const SETTING_SAVED_TONES: &[Tone] = &[Tone::new(1_800, 40)];
const ERROR_TONES: &[Tone] = &[Tone::new(400, 200)];
const WAKE_TONES: &[Tone] = &[Tone::new(1_000, 40)];
const RESTART_TONES: &[Tone] = &[
    Tone::new(1_600, 80),
    Tone::new(1_200, 80),
    Tone::new(800, 120),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub freq_hz: u16,
    pub duration_ms: u16,
}

impl Tone {
    pub const fn new(freq_hz: u16, duration_ms: u16) -> Self {
        Self {
            freq_hz,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColor {
    Off,
    Green,
    Blue,
    Red,
    Amber,
}

impl LedColor {
    pub fn for_status(status: Status) -> Self {
        match status {
            Status::Idle => Self::Off,
            Status::SensorError | Status::TooHot => Self::Red,
            Status::TooCold => Self::Blue,
            Status::AtTarget => Self::Green,
            Status::Stable => Self::Amber,
        }
    }
}

/// Buzzer and status LED. `tone` may block for the tone's duration.
pub trait FeedbackSink {
    fn tone(&mut self, freq_hz: u16, duration_ms: u16);
    fn led(&mut self, color: LedColor);
}

impl<T: FeedbackSink + ?Sized> FeedbackSink for &mut T {
    fn tone(&mut self, freq_hz: u16, duration_ms: u16) {
        (**self).tone(freq_hz, duration_ms)
    }

    fn led(&mut self, color: LedColor) {
        (**self).led(color)
    }
}

pub struct FeedbackController<F: FeedbackSink> {
    sink: F,
    config: FeedbackConfig,
    last_played: [Option<Instant>; Cue::COUNT],
    led: Option<LedColor>,
}

impl<F: FeedbackSink> FeedbackController<F> {
    pub fn new(sink: F, config: FeedbackConfig) -> Self {
        Self {
            sink,
            config,
            last_played: [None; Cue::COUNT],
            led: None,
        }
    }

    /// Play `cue`. A cue repeated within the configured interval is dropped.
    /// With sound off only the LED part is shown. Returns whether the cue
    /// was accepted.
    pub fn play(&mut self, cue: Cue, sound_enabled: bool, now: Instant) -> bool {
        let slot = &mut self.last_played[cue.index()];
        if let Some(last) = *slot
            && now.saturating_duration_since(last).as_millis() < self.config.min_cue_interval_ms
        {
            debug!(" Dropping repeated cue {:?}", cue);
            return false;
        }
        *slot = Some(now);

        if let Some(color) = cue.led() {
            self.set_led(color);
        }
        if sound_enabled {
            for tone in cue.tones() {
                self.sink.tone(tone.freq_hz, tone.duration_ms);
            }
        }
        true
    }

    /// Reflect the status line on the LED.
    pub fn show_status(&mut self, status: Status) {
        self.set_led(LedColor::for_status(status));
    }

    pub fn set_led(&mut self, color: LedColor) {
        if self.led != Some(color) {
            self.led = Some(color);
            self.sink.led(color);
        }
    }

    pub fn sink(&self) -> &F {
        &self.sink
    }

    pub fn into_sink(self) -> F {
        self.sink
    }
}
