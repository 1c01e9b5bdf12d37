//! Radial geometry kernel
//!
//! Angles are radians measured clockwise from twelve o'clock, normalized into
//! `[0, 2π)`. Lengths handed to builders are in *grid units*: the dial radius
//! is [`GRID_SIZE`] units, so every element scales with the display. The
//! [`Dial`] converts grid units into pixel coordinates and knows about the
//! flat cutout at the bottom of some round displays.

use core::f32::consts::{PI, TAU};

use libm::{cosf, fmodf, sinf};

use crate::time::{ClockFields, Instant, WallClock};

/// Number of grid units between the dial center and its horizontal edge
pub const GRID_SIZE: f32 = 8.0;

/// Extra sweep added to every arc sector so neighbours overlap by one degree
pub const ARC_OVERLAP_RAD: f32 = PI / 180.0;

/// Seconds per revolution of the second hand
pub const SECONDS_PER_TURN: f32 = 60.0;

/// Minutes per revolution of the minute hand
pub const MINUTES_PER_TURN: f32 = 60.0;

/// Hours per revolution of the hour hand and of the forecast ring
pub const HOURS_PER_TURN: f32 = 12.0;

const SECONDS_PER_MINUTE: f32 = 60.0;
const MINUTES_PER_HOUR: f32 = 60.0;

/// Point in pixel space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Straight segment in pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment2 {
    pub start: Point2,
    pub end: Point2,
}

/// Normalize an angle into `[0, 2π)`
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = fmodf(angle, TAU);
    let wrapped = if wrapped < 0.0 { wrapped + TAU } else { wrapped };
    // fmodf of a value just below zero can round up to exactly TAU
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Angle of `units` on a dial subdivided into `period` units per revolution
pub fn angle_of(units: f32, period: f32) -> f32 {
    normalize_angle(units / period * TAU)
}

/// Second hand angle
pub fn second_angle(fields: ClockFields) -> f32 {
    angle_of(fields.second as f32, SECONDS_PER_TURN)
}

/// Minute hand angle; `sweep_seconds` adds the seconds fraction
pub fn minute_angle(fields: ClockFields, sweep_seconds: bool) -> f32 {
    let mut minutes = fields.minute as f32;
    if sweep_seconds {
        minutes += fields.second as f32 / SECONDS_PER_MINUTE;
    }
    angle_of(minutes, MINUTES_PER_TURN)
}

/// Hour hand angle, advancing continuously with the minutes
pub fn hour_angle(fields: ClockFields) -> f32 {
    angle_of(fields.hour12 as f32 + fields.minute as f32 / MINUTES_PER_HOUR, HOURS_PER_TURN)
}

/// Angle of a forecast instant on the 12-hour ring
///
/// Identical to the hour-hand mapping, so a forecast slot lands where the
/// hour hand will point at that time.
pub fn forecast_angle(clock: &WallClock, instant: Instant) -> f32 {
    hour_angle(clock.fields(instant))
}

/// Angle of an instant on the 60-minute ring (minute-hand mapping)
pub fn minute_ring_angle(clock: &WallClock, instant: Instant) -> f32 {
    minute_angle(clock.fields(instant), true)
}

/// Clip a point against the bottom cutout line
///
/// Points at or above `cutout_y` are returned unchanged with a scale of 1.
/// Otherwise the point is pulled along its ray from `center` until it lies on
/// the cutout line; the returned scale is the ratio of the new radius to the
/// old one.
pub fn clip_to_cutout(center: Point2, point: Point2, cutout_y: f32) -> (Point2, f32) {
    if point.y <= cutout_y {
        return (point, 1.0);
    }

    let dy = point.y - center.y;
    let scale = if dy > 0.0 {
        ((cutout_y - center.y) / dy).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let clipped = Point2::new(
        center.x + (point.x - center.x) * scale,
        center.y + dy * scale,
    );
    (clipped, scale)
}

/// Filled annular sector in pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSector {
    /// Dial center
    pub center: Point2,
    /// Start angle in radians
    pub start: f32,
    /// Clockwise sweep in radians, including the overlap
    pub sweep: f32,
    /// Inner radius in pixels
    pub inner_radius: f32,
    /// Outer radius in pixels
    pub outer_radius: f32,
}

impl ArcSector {
    /// Point on the sector boundary at `angle` and `radius`
    pub fn point_at(&self, angle: f32, radius: f32) -> Point2 {
        polar(self.center, angle, radius)
    }

    /// Whether `angle` lies within the swept range
    pub fn contains_angle(&self, angle: f32) -> bool {
        normalize_angle(angle - self.start) <= self.sweep
    }
}

/// Build a closed sector from `start_angle` clockwise to `end_angle`
///
/// The sweep is the forward difference normalized into `[0, 2π)`, plus
/// [`ARC_OVERLAP_RAD`] so adjacent sectors leave no anti-aliasing gap.
pub fn arc_sector(
    center: Point2,
    start_angle: f32,
    end_angle: f32,
    inner_radius: f32,
    outer_radius: f32,
) -> ArcSector {
    let sweep = normalize_angle(end_angle - start_angle) + ARC_OVERLAP_RAD;
    ArcSector {
        center,
        start: normalize_angle(start_angle),
        sweep,
        inner_radius: inner_radius.min(outer_radius),
        outer_radius: outer_radius.max(inner_radius),
    }
}

/// Point at `radius` pixels from `center` along `angle`
pub fn polar(center: Point2, angle: f32, radius: f32) -> Point2 {
    Point2::new(
        center.x + sinf(angle) * radius,
        center.y - cosf(angle) * radius,
    )
}

/// Tapered hand outline around the pivot at `center`
///
/// Returns five points: the two base shoulders at the pivot, the two neck
/// points where the taper starts at `length - tip_length`, and the apex at
/// `length`. All measurements are in pixels.
pub fn tapered_hand_polygon(
    center: Point2,
    angle: f32,
    base_thickness: f32,
    tip_thickness: f32,
    length: f32,
    tip_length: f32,
) -> [Point2; 5] {
    let neck = (length - tip_length).max(0.0);
    let (dir_x, dir_y) = (sinf(angle), -cosf(angle));
    // Perpendicular pointing to the right of the hand
    let (perp_x, perp_y) = (-dir_y, dir_x);

    let at = |along: f32, across: f32| {
        Point2::new(
            center.x + dir_x * along + perp_x * across,
            center.y + dir_y * along + perp_y * across,
        )
    };

    [
        at(0.0, -base_thickness / 2.0),
        at(neck, -tip_thickness / 2.0),
        at(length, 0.0),
        at(neck, tip_thickness / 2.0),
        at(0.0, base_thickness / 2.0),
    ]
}

/// Display layout: center, grid unit and cutout line in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dial {
    /// Dial center; ignores the cutout so the face stays centered on the panel
    pub center: Point2,
    /// Pixels per grid unit
    pub grid: f32,
    /// Lowest drawable y coordinate
    pub cutout_y: f32,
}

impl Dial {
    /// Layout for a `width` x `height` panel with a flat bottom inset
    pub fn new(width: u32, height: u32, cutout_bottom_inset: u32) -> Self {
        let center = Point2::new(width as f32 / 2.0, height as f32 / 2.0);
        Self {
            center,
            grid: center.x / GRID_SIZE,
            cutout_y: height.saturating_sub(cutout_bottom_inset) as f32,
        }
    }

    /// Pixel position of a point `radius` grid units along `angle`
    pub fn point(&self, angle: f32, radius: f32) -> Point2 {
        polar(self.center, angle, radius * self.grid)
    }

    /// Radial segment from `inner` to `outer` grid units, clipped to the cutout
    ///
    /// When the far end would fall below the cutout the whole segment is
    /// scaled toward the center by the same factor, so its visible length
    /// shrinks smoothly as it approaches the cutout.
    pub fn radial_segment(&self, angle: f32, inner: f32, outer: f32) -> Segment2 {
        let far = self.point(angle, outer);
        let (end, scale) = clip_to_cutout(self.center, far, self.cutout_y);
        Segment2 {
            start: self.point(angle, inner * scale),
            end,
        }
    }

    /// Sector between two angles with radii in grid units
    pub fn sector(&self, start: f32, end: f32, inner: f32, outer: f32) -> ArcSector {
        arc_sector(self.center, start, end, inner * self.grid, outer * self.grid)
    }
}
