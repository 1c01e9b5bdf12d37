//! Overlay builders
//!
//! Pure functions that turn the current snapshots into drawable overlay data:
//!
//! - [`rain`]: 60 minute bins of forecast rain plus the "imminent" flag
//! - [`day_arc`]: colored arc segments covering the next ~12 hours
//! - [`calendar`]: wedges and labels for events starting within the hour
//!
//! Every builder degrades to "nothing to draw" on empty or odd input; none of
//! them can fail.

pub mod calendar;
pub mod day_arc;
pub mod rain;

pub use calendar::{CalendarArc, CalendarOverlay, CalendarVisibility, build_calendar_overlay};
pub use day_arc::build_day_arcs;
pub use rain::{RainBins, build_rain_bins};

use embedded_graphics::pixelcolor::Rgb565;

/// Expected rain (mm/h) at or above which a slot is drawn as rain
pub const RAIN_THRESHOLD: f32 = 0.08;

/// Expected rain above which the next hour counts as imminent
pub const IMMINENT_RAIN_THRESHOLD: f32 = 0.12;

/// Expected rain at which lengths stop growing
pub const ASSUMED_MAX_RAIN: f32 = 2.5;

/// Colored wedge between two angles and two radii
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSegment {
    /// Start angle in radians, `[0, 2π)`
    pub start_angle: f32,
    /// End angle in radians, `[0, 2π)`
    pub end_angle: f32,
    /// Inner radius in grid units
    pub inner_radius: f32,
    /// Outer radius in grid units
    pub outer_radius: f32,
    pub color: Rgb565,
}

/// Length that grows linearly from `base` toward `max` with `rain`
///
/// Growth is capped once `rain` reaches [`ASSUMED_MAX_RAIN`]; NaN counts as
/// no rain.
pub fn rain_growth(rain: f32, base: f32, max: f32) -> f32 {
    let fraction = if rain.is_nan() {
        0.0
    } else {
        (rain / ASSUMED_MAX_RAIN).clamp(0.0, 1.0)
    };
    base + (max - base) * fraction
}
