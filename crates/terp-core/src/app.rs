//! The device main loop
//!
//! [`App`] wires the core components to the platform. The board crate (or
//! the simulator) calls [`App::tick`] repeatedly; each tick runs, in order:
//!
//! 1. watchdog feed
//! 2. input: poll raw samples, dispatch events, apply the resulting effects
//! 3. idle check (auto-sleep)
//! 4. sensor: sample, validate, filter, classify, alert
//! 5. render, if anything changed
//!
//! Faults are handled inside the tick that raised them. The only way out of
//! the loop is a user-confirmed restart, reported as [`TickOutcome::Restart`].

use embassy_time::Instant;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::DrawTarget;
use log::{debug, error, info, warn};

use crate::alert::AlertEvaluator;
use crate::config::Config;
use crate::error::Fault;
use crate::feedback::{Cue, FeedbackController, FeedbackSink, LedColor};
use crate::filter::TemperatureFilter;
use crate::input::{InputDispatcher, InputSource};
use crate::sensors::{TemperatureSensor, centi_to_celsius, validate};
use crate::settings::{Settings, SettingsStore};
use crate::state::{DeviceState, DeviceStateMachine, Effect, Status};
use crate::storage::StorageBackend;
use crate::ui;

/// Board services the core calls into.
pub trait Platform {
    /// Keep the hardware watchdog from firing. Called once per tick.
    fn feed_watchdog(&mut self) {}

    fn set_display_power(&mut self, on: bool);

    fn set_backlight(&mut self, level: u8);

    /// Reset the device. On hardware this does not return.
    fn restart(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The user confirmed a restart; the platform has been asked to reset.
    Restart,
}

pub struct App<S, B, F, P>
where
    S: TemperatureSensor,
    B: StorageBackend,
    F: FeedbackSink,
    P: Platform,
{
    config: Config,
    sensor: S,
    store: SettingsStore<B>,
    feedback: FeedbackController<F>,
    platform: P,
    dispatcher: InputDispatcher,
    machine: DeviceStateMachine,
    filter: TemperatureFilter,
    alerts: AlertEvaluator,
    last_sample: Option<Instant>,
    last_fault: Option<Fault>,
}

impl<S, B, F, P> App<S, B, F, P>
where
    S: TemperatureSensor,
    B: StorageBackend,
    F: FeedbackSink,
    P: Platform,
{
    /// Load settings and bring the peripherals into the stored configuration.
    pub fn boot(config: Config, sensor: S, backend: B, sink: F, platform: P, now: Instant) -> Self {
        let mut store = SettingsStore::new(backend, config.defaults);
        let settings = store.load();
        info!(
            " Booting: {} units, emissivity {:.2}, target {:.1} C",
            if settings.use_celsius { "Celsius" } else { "Fahrenheit" },
            settings.emissivity(),
            settings.target_temperature_c()
        );

        let mut app = Self {
            config,
            sensor,
            store,
            feedback: FeedbackController::new(sink, config.feedback),
            platform,
            dispatcher: InputDispatcher::new(config.input),
            machine: DeviceStateMachine::new(settings, now),
            filter: TemperatureFilter::new(config.filter),
            alerts: AlertEvaluator::new(config.alert),
            last_sample: None,
            last_fault: None,
        };

        app.platform.set_display_power(true);
        app.platform.set_backlight(settings.brightness());
        app.feedback.set_led(LedColor::Off);
        if let Err(e) = app.sensor.set_emissivity(settings.emissivity()) {
            warn!(" Could not apply stored emissivity: {}", e);
            app.last_fault = Some(e.into());
        }

        app
    }

    /// Run one pass of the main loop.
    pub fn tick<I, D>(&mut self, now: Instant, input: &mut I, display: &mut D) -> Result<TickOutcome, D::Error>
    where
        I: InputSource,
        D: DrawTarget<Color = Rgb565>,
    {
        self.platform.feed_watchdog();

        if self.process_input(now, input) {
            info!(" Restarting");
            self.platform.restart();
            return Ok(TickOutcome::Restart);
        }

        let fx = self.machine.check_idle(now);
        self.run_effects(&fx, now);

        if !self.machine.state().sleeping {
            self.sample(now);
        }

        if self.machine.state().needs_redraw() {
            ui::render(display, self.machine.state(), self.machine.settings())?;
            self.machine.state_mut().mark_drawn();
        }

        Ok(TickOutcome::Continue)
    }

    /// Returns `true` when a restart was requested.
    fn process_input<I: InputSource>(&mut self, now: Instant, input: &mut I) -> bool {
        while let Some(raw) = input.poll() {
            if let Err(e) = self.dispatcher.feed(raw, now) {
                self.last_fault = Some(e.into());
            }
        }

        while let Some(event) = self.dispatcher.next_event() {
            let was_sleeping = self.machine.state().sleeping;

            match self.machine.handle_event(event, now) {
                Ok(fx) => {
                    if self.run_effects(&fx, now) {
                        return true;
                    }
                }
                Err(fault) => {
                    error!(" {} while handling {:?}; returning to main screen", fault, event);
                    self.last_fault = Some(fault.into());
                    self.machine.recover();
                    let sound = self.machine.settings().sound_enabled;
                    self.feedback.play(Cue::Error, sound, now);
                }
            }

            if was_sleeping && !self.machine.state().sleeping {
                // The waking touch is consumed along with anything queued
                // behind it.
                while let Some(dropped) = self.dispatcher.next_event() {
                    debug!(" Dropping {:?} after wake", dropped);
                }
                self.dispatcher.reset_contact();
                self.last_sample = None;
                break;
            }
        }

        false
    }

    /// Carry out effects in order. Returns `true` on a restart request.
    fn run_effects(&mut self, fx: &[Effect], now: Instant) -> bool {
        for effect in fx {
            match *effect {
                Effect::SaveSettings => self.save_settings(),
                Effect::Backlight(level) => self.platform.set_backlight(level),
                Effect::DisplayPower(on) => {
                    self.platform.set_display_power(on);
                    if !on {
                        self.feedback.set_led(LedColor::Off);
                    }
                }
                Effect::ApplyEmissivity(emissivity) => {
                    if let Err(e) = self.sensor.set_emissivity(emissivity) {
                        warn!(" Could not apply emissivity {:.2}: {}", emissivity, e);
                        self.last_fault = Some(e.into());
                    }
                }
                Effect::Cue(cue) => {
                    let sound = self.machine.settings().sound_enabled;
                    self.feedback.play(cue, sound, now);
                }
                Effect::Restart => return true,
            }
        }
        false
    }

    fn save_settings(&mut self) {
        match self.store.save(self.machine.settings()) {
            Ok(()) => debug!(" Settings saved"),
            Err(e) => {
                warn!(" Settings not saved: {}", e);
                self.last_fault = Some(e.into());
            }
        }
    }

    fn sample(&mut self, now: Instant) {
        let interval = self.config.sensor.sample_interval_ms;
        let due = self
            .last_sample
            .is_none_or(|last| now.saturating_duration_since(last).as_millis() >= interval);
        if !due {
            return;
        }
        self.last_sample = Some(now);

        let settings: Settings = *self.machine.settings();
        let reading = self
            .sensor
            .read_raw()
            .and_then(|raw| validate(raw, &self.config.sensor));

        let raw_centi = match reading {
            Ok(value) => value,
            Err(e) => {
                if self.machine.state().status() != Status::SensorError {
                    warn!(" Sensor fault: {}", e);
                    self.feedback.play(Cue::Error, settings.sound_enabled, now);
                }
                self.last_fault = Some(e.into());
                self.machine.state_mut().set_status(Status::SensorError);
                self.feedback.show_status(Status::SensorError);
                return;
            }
        };

        let state = self.machine.state_mut();
        let filtered = self.filter.apply(&mut state.temperature_history, raw_centi);
        state.set_temperature(filtered);

        if !state.is_monitoring() {
            state.set_status(Status::Idle);
            self.feedback.show_status(Status::Idle);
            return;
        }

        let alert = self.alerts.evaluate(centi_to_celsius(filtered), &settings);
        let status = Status::from(alert);
        state.set_status(status);
        let entered_target = state.alert.observe(alert);

        self.feedback.show_status(status);
        if entered_target {
            info!(" At target: {:.1} C", centi_to_celsius(filtered));
            self.feedback.play(Cue::AtTarget, settings.sound_enabled, now);
        }
    }

    pub fn state(&self) -> &DeviceState {
        self.machine.state()
    }

    pub fn settings(&self) -> &Settings {
        self.machine.settings()
    }

    pub fn machine(&self) -> &DeviceStateMachine {
        &self.machine
    }

    /// Most recent fault, if any, for diagnostics.
    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    pub fn take_fault(&mut self) -> Option<Fault> {
        self.last_fault.take()
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn backend(&self) -> &B {
        self.store.backend()
    }

    pub fn feedback_sink(&self) -> &F {
        self.feedback.sink()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Hand the peripherals back, e.g. to boot a fresh `App` after a
    /// simulated restart.
    pub fn into_parts(self) -> (S, B, F, P) {
        let Self {
            sensor,
            store,
            feedback,
            platform,
            ..
        } = self;
        (sensor, store.into_backend(), feedback.into_sink(), platform)
    }
}
