//! Living clock core
//!
//! Shows a photograph of a stopped clock whose hands match the current time,
//! with a short poem laid out in the blank region of the image. A single button
//! toggles a full-screen note (one click) or likes the poem (two clicks).
//!
//! Everything in this library runs on the host: network, panel, and font
//! rasterization are reached through the traits in [`http`], [`pipeline`] and
//! [`render`]. The ESP32 binary in `main.rs` supplies the device implementations.
//!
//! ### Flow per render tick
//! 1. derive the 12-hour [`time_index::TimeCode`] from the wall clock
//! 1. fetch the poem for that minute, or fall back to a default one
//! 1. pick the nearest catalog image and fetch it into an owned buffer
//! 1. fit the poem into the image's text zone and hand the frame to the display

pub mod app;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod input;
pub mod layout;
pub mod pipeline;
pub mod poem;
pub mod render;
pub mod state;
pub mod time_index;

pub use crate::error::{Error, Result};
