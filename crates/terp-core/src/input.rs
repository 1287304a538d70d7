//! Input normalization
//!
//! Touch controllers and GPIO buttons report raw contact state. The
//! [`InputDispatcher`] turns that into one stream of [`Event`]s:
//!
//! - a contact that moves further than the drag threshold from where it
//!   started becomes `DragStart` / `Dragging` / `DragEnd`;
//! - otherwise, on release, a contact within the double-tap window of the
//!   previous tap is a `DoubleTap` (which also clears the pending tap, so a
//!   third quick tap starts a new pair);
//! - otherwise it is a `Tap`, dropped if it follows the last emitted event
//!   too closely (contact bounce);
//! - buttons are edge-detected and rate limited independently.
//!
//! Events are buffered in a channel and drained by the main loop once per
//! tick.

use alloc::collections::VecDeque;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Instant;
use log::{debug, warn};

use crate::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, InputConfig};
use crate::error::InputError;
use crate::ui::TouchPoint;

/// Events buffered between two ticks.
pub const EVENT_QUEUE_CAPACITY: usize = 16;

pub type EventQueue = Channel<NoopRawMutex, Event, EVENT_QUEUE_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    /// Trigger button: start/stop monitoring, confirm.
    Primary,
    /// Side button: open settings, back, cancel.
    Secondary,
}

impl ButtonId {
    const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

/// Normalized input consumed by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Tap(TouchPoint),
    DoubleTap(TouchPoint),
    DragStart(TouchPoint),
    Dragging { dx: i32, dy: i32 },
    DragEnd,
    ButtonPress(ButtonId),
}

/// Raw samples reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    TouchDown { x: i32, y: i32 },
    TouchMove { x: i32, y: i32 },
    TouchUp,
    Button { id: ButtonId, pressed: bool },
}

/// Source of raw input samples, polled once per tick until it returns `None`.
pub trait InputSource {
    fn poll(&mut self) -> Option<RawInput>;
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn poll(&mut self) -> Option<RawInput> {
        (**self).poll()
    }
}

/// Replays queued samples; used by tests and host demos.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    queue: VecDeque<RawInput>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: RawInput) {
        self.queue.push_back(input);
    }

    /// Queue a touch-down/up pair at `(x, y)`.
    pub fn tap(&mut self, x: i32, y: i32) {
        self.push(RawInput::TouchDown { x, y });
        self.push(RawInput::TouchUp);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Option<RawInput> {
        self.queue.pop_front()
    }
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    anchor: TouchPoint,
    last: TouchPoint,
    dragging: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ButtonTracker {
    pressed: bool,
    last_accepted: Option<Instant>,
}

pub struct InputDispatcher {
    config: InputConfig,
    width: u16,
    height: u16,
    contact: Option<Contact>,
    last_tap: Option<Instant>,
    last_event: Option<Instant>,
    buttons: [ButtonTracker; 2],
    queue: EventQueue,
}

impl InputDispatcher {
    pub fn new(config: InputConfig) -> Self {
        Self::with_bounds(config, DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }

    pub fn with_bounds(config: InputConfig, width: u16, height: u16) -> Self {
        Self {
            config,
            width,
            height,
            contact: None,
            last_tap: None,
            last_event: None,
            buttons: [ButtonTracker::default(); 2],
            queue: Channel::new(),
        }
    }

    /// Feed one raw sample. Touches outside the panel are rejected and leave
    /// the dispatcher state untouched.
    pub fn feed(&mut self, input: RawInput, now: Instant) -> Result<(), InputError> {
        match input {
            RawInput::TouchDown { x, y } => {
                let point = self.to_panel(x, y)?;
                self.contact = Some(Contact {
                    anchor: point,
                    last: point,
                    dragging: false,
                });
            }
            RawInput::TouchMove { x, y } => {
                let point = self.to_panel(x, y)?;
                self.on_move(point, now);
            }
            RawInput::TouchUp => self.on_release(now),
            RawInput::Button { id, pressed } => self.on_button(id, pressed, now),
        }
        Ok(())
    }

    /// Next buffered event, oldest first.
    pub fn next_event(&self) -> Option<Event> {
        self.queue.try_receive().ok()
    }

    /// Forget any contact in progress, e.g. after the touch that woke the
    /// device has been consumed.
    pub fn reset_contact(&mut self) {
        self.contact = None;
        self.last_tap = None;
    }

    fn to_panel(&self, x: i32, y: i32) -> Result<TouchPoint, InputError> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            debug!(" Dropping touch outside the panel at ({}, {})", x, y);
            return Err(InputError::OutOfBounds { x, y });
        }
        Ok(TouchPoint::new(x as u16, y as u16))
    }

    fn on_move(&mut self, point: TouchPoint, now: Instant) {
        let Some(mut contact) = self.contact else {
            // Controller missed the down report; treat this sample as one.
            self.contact = Some(Contact {
                anchor: point,
                last: point,
                dragging: false,
            });
            return;
        };

        if !contact.dragging {
            if exceeds(contact.anchor, point, self.config.drag_threshold_px) {
                contact.dragging = true;
                self.emit(Event::DragStart(contact.anchor), now);
                self.emit_drag(contact.anchor, point, now);
                contact.last = point;
            }
        } else if point != contact.last {
            self.emit_drag(contact.last, point, now);
            contact.last = point;
        }

        self.contact = Some(contact);
    }

    fn emit_drag(&mut self, from: TouchPoint, to: TouchPoint, now: Instant) {
        self.emit(
            Event::Dragging {
                dx: to.x as i32 - from.x as i32,
                dy: to.y as i32 - from.y as i32,
            },
            now,
        );
    }

    fn on_release(&mut self, now: Instant) {
        let Some(contact) = self.contact.take() else {
            return;
        };

        if contact.dragging {
            self.last_tap = None;
            self.emit(Event::DragEnd, now);
            return;
        }

        if let Some(previous) = self.last_tap
            && elapsed_ms(previous, now) < self.config.double_tap_window_ms
        {
            self.last_tap = None;
            self.emit(Event::DoubleTap(contact.anchor), now);
            return;
        }

        if let Some(previous) = self.last_event
            && elapsed_ms(previous, now) < self.config.tap_debounce_ms
        {
            debug!(" Debounced tap at {:?}", contact.anchor);
            return;
        }

        self.last_tap = Some(now);
        self.emit(Event::Tap(contact.anchor), now);
    }

    fn on_button(&mut self, id: ButtonId, pressed: bool, now: Instant) {
        let debounce_ms = self.config.button_debounce_ms;
        let tracker = &mut self.buttons[id.index()];
        let rising_edge = pressed && !tracker.pressed;
        tracker.pressed = pressed;
        if !rising_edge {
            return;
        }

        let ready = tracker
            .last_accepted
            .is_none_or(|last| elapsed_ms(last, now) >= debounce_ms);
        if !ready {
            debug!(" Debounced button {:?}", id);
            return;
        }

        tracker.last_accepted = Some(now);
        self.emit(Event::ButtonPress(id), now);
    }

    fn emit(&mut self, event: Event, now: Instant) {
        self.last_event = Some(now);
        if self.queue.try_send(event).is_err() {
            warn!(" Input queue full, dropping {:?}", event);
        }
    }
}

fn elapsed_ms(earlier: Instant, now: Instant) -> u64 {
    now.saturating_duration_since(earlier).as_millis()
}

fn exceeds(a: TouchPoint, b: TouchPoint, threshold: u16) -> bool {
    let dx = a.x as i32 - b.x as i32;
    let dy = a.y as i32 - b.y as i32;
    let threshold = threshold as i32;
    dx * dx + dy * dy > threshold * threshold
}
