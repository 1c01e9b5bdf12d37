//! Hardware-independent core library for the annulus watch face
//!
//! This crate contains all platform-agnostic logic for an analog watch face
//! that overlays a minute-by-minute rain forecast, a 12-hour sky/rain outlook
//! and upcoming calendar events on the dial: radial geometry, snapshot
//! storage, the three overlay builders, the adaptive refresh scheduler, the
//! renderer and the single-threaded engine loop that ties them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod geometry;
pub mod render;
pub mod scheduler;
pub mod snapshot;
pub mod style;
pub mod time;
pub mod transport;

pub use config::Config;
pub use engine::{Engine, EngineEvent};
pub use error::{ConfigError, DecodeError, SendError};
pub use scheduler::DisplayMode;
pub use snapshot::{CalendarEvent, Datum, SnapshotStore, WeatherSnapshot};
pub use transport::{DataKind, Transport};
