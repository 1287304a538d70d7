//! User interface
//!
//! - `core`: touch points, actions and the widget traits
//! - `button`: the one widget the screens are built from
//! - `theme`: colors and widget styles
//! - `screens`: per-screen layout, shared by hit testing and drawing
//! - `render`: draws a screen to any RGB565 target

pub mod button;
pub mod core;
pub mod render;
pub mod screens;
pub mod theme;

pub use button::Button;
pub use self::core::{Action, Drawable, TouchPoint, Touchable};
pub use render::render;
