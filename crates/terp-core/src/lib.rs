//! Hardware-independent core library for the TerpMeter
//!
//! This crate contains all platform-agnostic logic for the handheld infrared
//! thermometer: settings persistence, the temperature filtering and alert
//! pipeline, input normalization, the menu state machine, audio/LED feedback
//! mapping, and screen rendering.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests). Hardware
//! is reached only through the traits in [`sensors`], [`storage`],
//! [`feedback`], [`input`] and [`app`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod alert;
pub mod app;
pub mod config;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod input;
pub mod sensors;
pub mod settings;
pub mod state;
pub mod storage;
pub mod ui;
