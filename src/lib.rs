//! Rhythm game core.
//!
//! [`game::beatmap`] turns a song's tempo and length into a falling-note
//! chart. [`game::gameplay`] plays that chart against an audio clock: it
//! spawns notes ahead of their hit time, drops the ones that scroll past the
//! playfield as misses, and grades key presses. Rendering, audio playback and
//! menus belong to the host.

pub mod config;
pub mod core;
pub mod error;
pub mod game;

pub use error::Error;
