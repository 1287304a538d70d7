//! Fault taxonomy shared by the core components
//!
//! Each component has its own error enum; [`Fault`] groups them into the four
//! categories the main loop knows how to recover from. No fault crosses a
//! tick boundary.

use thiserror_no_std::Error;

use crate::state::MenuState;
use crate::ui::Action;

pub use crate::sensors::SensorError;
pub use crate::storage::StoreError;

/// Malformed input dropped by the dispatcher.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("touch at ({x}, {y}) is outside the display")]
    OutOfBounds { x: i32, y: i32 },
}

/// A handler found the state machine in a state it cannot act on.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum StateFault {
    #[error("action {action:?} is not valid on screen {menu:?}")]
    UnexpectedAction { menu: MenuState, action: Action },
    #[error("menu item {index} does not exist on screen {menu:?}")]
    NoSuchItem { menu: MenuState, index: u8 },
    #[error("restart requested without a pending emissivity change")]
    NoPendingRestart,
}

/// The four recovery categories.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Fault {
    #[error("sensor fault: {0}")]
    Sensor(SensorError),
    #[error("storage fault: {0}")]
    Storage(StoreError),
    #[error("input fault: {0}")]
    Input(InputError),
    #[error("state fault: {0}")]
    State(StateFault),
}

impl From<SensorError> for Fault {
    fn from(value: SensorError) -> Self {
        Self::Sensor(value)
    }
}

impl From<StoreError> for Fault {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

impl From<InputError> for Fault {
    fn from(value: InputError) -> Self {
        Self::Input(value)
    }
}

impl From<StateFault> for Fault {
    fn from(value: StateFault) -> Self {
        Self::State(value)
    }
}
