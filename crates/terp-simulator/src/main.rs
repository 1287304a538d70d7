//! Desktop simulator for the TerpMeter.
//!
//! Runs the real `terp-core` main loop in an SDL2 window via
//! `embedded-graphics-simulator`. A simple heating model stands in for the IR
//! sensor and settings are persisted to a directory on disk, so reboots and
//! the emissivity restart can be exercised without hardware.
//!
//! # Controls
//!
//! | Input        | Action                              |
//! |--------------|-------------------------------------|
//! | Mouse        | Touch panel (press, drag, release)  |
//! | A            | Primary button                      |
//! | S            | Secondary button                    |
//! | Up / Down    | Raise / lower the heater setpoint   |
//! | Q / Esc      | Quit                                |
//!
//! Set `TERP_SIM_DIR` to choose where settings are stored (default
//! `./terp-sim-data`).

use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{debug, error, info, warn};

use terp_core::app::{App, Platform, TickOutcome};
use terp_core::config::{Config, DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use terp_core::feedback::{FeedbackSink, LedColor};
use terp_core::input::{ButtonId, InputSource, RawInput};
use terp_core::sensors::{RawReading, SensorError, TemperatureSensor, celsius_to_centi};
use terp_core::storage::{StorageBackend, StoreError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

const AMBIENT_C: f64 = 22.0;
const SETPOINT_STEP_C: f64 = 10.0;

/// Every Nth reading is a reflection spike, to show the median filter.
const SPIKE_EVERY: u32 = 23;

// ---------------------------------------------------------------------------
// Heating model
// ---------------------------------------------------------------------------

/// First-order heating model: the surface approaches the setpoint with a
/// fixed time constant. Reports in centidegrees like the real sensor head.
struct HeaterSensor {
    started: Instant,
    last: Instant,
    surface_c: f64,
    setpoint_c: f64,
    reads: u32,
    emissivity: f32,
}

impl HeaterSensor {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            surface_c: AMBIENT_C,
            setpoint_c: AMBIENT_C,
            reads: 0,
            emissivity: 1.0,
        }
    }

    fn adjust_setpoint(&mut self, delta_c: f64) {
        self.setpoint_c = (self.setpoint_c + delta_c).clamp(AMBIENT_C, 400.0);
        info!("Heater setpoint {:.0} C", self.setpoint_c);
    }
}

impl TemperatureSensor for HeaterSensor {
    fn read_raw(&mut self) -> Result<RawReading, SensorError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f64();
        self.last = now;

        const TIME_CONSTANT_S: f64 = 20.0;
        self.surface_c += (self.setpoint_c - self.surface_c) * (dt / TIME_CONSTANT_S).min(1.0);

        // A little ripple so the trend indicator has something to show.
        let t = now.duration_since(self.started).as_secs_f64();
        let ripple = 0.3 * (t / 3.0).sin();

        self.reads = self.reads.wrapping_add(1);
        let mut celsius = (self.surface_c + ripple) as f32 * self.emissivity;
        if self.reads % SPIKE_EVERY == 0 {
            debug!("Injecting spike");
            celsius += 80.0;
        }

        Ok(RawReading::new(celsius_to_centi(celsius)))
    }

    fn set_emissivity(&mut self, emissivity: f32) -> Result<(), SensorError> {
        info!("Sensor emissivity set to {:.2}", emissivity);
        self.emissivity = emissivity;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Settings storage
// ---------------------------------------------------------------------------

/// One file per namespace under a directory.
struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.bin"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path(namespace)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!("Reading {namespace}: {e}");
                Err(StoreError::ReadFailed)
            }
        }
    }

    fn write(&mut self, namespace: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|_| StoreError::OpenFailed { what: "directory" })?;

        // Write-then-rename so a crash never leaves a half-written record.
        let target = self.path(namespace);
        let staging = target.with_extension("tmp");
        fs::write(&staging, bytes).map_err(|_| StoreError::WriteFailed)?;
        fs::rename(&staging, &target).map_err(|_| StoreError::WriteFailed)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Buzzer, LED and board services
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ConsoleFeedback;

impl FeedbackSink for ConsoleFeedback {
    fn tone(&mut self, freq_hz: u16, duration_ms: u16) {
        info!("Beep {freq_hz} Hz for {duration_ms} ms");
    }

    fn led(&mut self, color: LedColor) {
        info!("LED {:?}", color);
    }
}

#[derive(Default)]
struct SimPlatform {
    display_on: bool,
    backlight: u8,
}

impl Platform for SimPlatform {
    fn set_display_power(&mut self, on: bool) {
        if self.display_on != on {
            info!("Display {}", if on { "on" } else { "off" });
        }
        self.display_on = on;
    }

    fn set_backlight(&mut self, level: u8) {
        debug!("Backlight {level}");
        self.backlight = level;
    }

    fn restart(&mut self) {
        info!("Restart requested, rebooting core");
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Raw samples collected from SDL events since the last tick.
#[derive(Default)]
struct SdlInput {
    pending: VecDeque<RawInput>,
    mouse_down: bool,
}

impl SdlInput {
    fn push(&mut self, input: RawInput) {
        self.pending.push_back(input);
    }
}

impl InputSource for SdlInput {
    fn poll(&mut self) -> Option<RawInput> {
        self.pending.pop_front()
    }
}

fn keycode_to_button(keycode: Keycode) -> Option<ButtonId> {
    match keycode {
        Keycode::A => Some(ButtonId::Primary),
        Keycode::S => Some(ButtonId::Secondary),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

type Device = App<HeaterSensor, FileBackend, ConsoleFeedback, SimPlatform>;

fn main() {
    env_logger::init();
    info!("Starting TerpMeter simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );
    info!("Keys: A=Primary  S=Secondary  Up/Down=Heater  Q=Quit");

    let data_dir = std::env::var_os("TERP_SIM_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("terp-sim-data"));
    info!("Settings directory: {}", data_dir.display());

    let mut display = SimulatorDisplay::<Rgb565>::new(Size::new(
        DISPLAY_WIDTH_PX as u32,
        DISPLAY_HEIGHT_PX as u32,
    ));
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("TerpMeter Simulator", &output_settings);

    let config = Config::default();
    let started = Instant::now();
    let clock = || embassy_time::Instant::from_millis(started.elapsed().as_millis() as u64);

    let mut app: Device = App::boot(
        config,
        HeaterSensor::new(),
        FileBackend::new(data_dir),
        ConsoleFeedback,
        SimPlatform::default(),
        clock(),
    );
    let mut input = SdlInput::default();
    let mut faults: u32 = 0;

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    let _ = display.clear(Rgb565::BLACK);
    window.update(&display);

    'running: loop {
        let frame_start = Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown {
                    keycode, repeat, ..
                } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                    if repeat {
                        continue;
                    }
                    match keycode {
                        Keycode::Up => app.sensor_mut().adjust_setpoint(SETPOINT_STEP_C),
                        Keycode::Down => app.sensor_mut().adjust_setpoint(-SETPOINT_STEP_C),
                        other => {
                            if let Some(id) = keycode_to_button(other) {
                                input.push(RawInput::Button { id, pressed: true });
                            }
                        }
                    }
                }

                SimulatorEvent::KeyUp { keycode, .. } => {
                    if let Some(id) = keycode_to_button(keycode) {
                        input.push(RawInput::Button { id, pressed: false });
                    }
                }

                SimulatorEvent::MouseButtonDown { point, .. } => {
                    input.mouse_down = true;
                    input.push(RawInput::TouchDown {
                        x: point.x,
                        y: point.y,
                    });
                }

                SimulatorEvent::MouseMove { point } if input.mouse_down => {
                    input.push(RawInput::TouchMove {
                        x: point.x,
                        y: point.y,
                    });
                }

                SimulatorEvent::MouseButtonUp { .. } => {
                    input.mouse_down = false;
                    input.push(RawInput::TouchUp);
                }

                _ => {}
            }
        }

        match app.tick(clock(), &mut input, &mut display) {
            Ok(TickOutcome::Continue) => {}
            Ok(TickOutcome::Restart) => {
                let (sensor, backend, feedback, platform) = app.into_parts();
                app = App::boot(config, sensor, backend, feedback, platform, clock());
            }
            Err(e) => error!("Draw error: {:?}", e),
        }
        if let Some(fault) = app.take_fault() {
            faults += 1;
            debug!("Recovered from {fault}");
        }

        window.update(&display);

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!("Simulator exiting, {faults} faults recovered");
}
