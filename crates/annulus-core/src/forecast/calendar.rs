//! Upcoming calendar events on the minute ring
//!
//! Events overlapping the next 57 minutes are drawn as wedges on the minute
//! ring, at most two, each with a short title below the center. Whether the
//! overlay replaces the day arcs is decided by [`CalendarVisibility`], which
//! only reacts to the active set becoming empty or non-empty.

extern crate alloc;

use alloc::vec::Vec;

use chrono::TimeDelta;

use super::ArcSegment;
use crate::geometry::minute_ring_angle;
use crate::snapshot::CalendarEvent;
use crate::style::{CALENDAR_PALETTE, FaceStyle};
use crate::time::{self, Instant, WallClock};

/// Events beginning before `now` plus this are active
pub const CALENDAR_LOOKAHEAD: TimeDelta = time::minutes(57);

/// Wedges drawn at most
pub const MAX_CALENDAR_ARCS: usize = 2;

/// Characters kept from a title
pub const LABEL_CAPACITY: usize = 24;

/// Inner radius of the first band, grid units
pub const CALENDAR_BAND_INNER: f32 = 3.0;

/// Radial step between bands
pub const CALENDAR_BAND_STEP: f32 = 1.1;

/// Radial thickness of each band
pub const CALENDAR_BAND_THICKNESS: f32 = 1.0;

pub type Label = heapless::String<LABEL_CAPACITY>;

/// One wedge with its label
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarArc {
    pub segment: ArcSegment,
    pub label: Label,
    /// Label row below the dial center, grid units
    pub label_offset: f32,
}

/// Wedges for the first active events plus the size of the active set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarOverlay {
    pub arcs: heapless::Vec<CalendarArc, MAX_CALENDAR_ARCS>,
    pub active_count: usize,
}

impl CalendarOverlay {
    pub fn is_active(&self) -> bool {
        self.active_count > 0
    }
}

/// Edge-triggered visibility of the calendar overlay
///
/// Becomes shown when the active set turns non-empty and hidden when it
/// empties. A manual [`toggle`](Self::toggle) holds until the next such edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarVisibility {
    shown: bool,
    was_active: bool,
}

impl CalendarVisibility {
    pub const fn new() -> Self {
        Self {
            shown: false,
            was_active: false,
        }
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Feed the current state of the active set; returns whether the flag
    /// changed
    pub fn update(&mut self, active: bool) -> bool {
        if active == self.was_active {
            return false;
        }
        self.was_active = active;
        let changed = self.shown != active;
        self.shown = active;
        changed
    }

    /// Manual override
    pub fn toggle(&mut self) {
        self.shown = !self.shown;
    }
}

/// Text inside the first `(...)` of a title, or the whole title
pub fn short_title(title: &str) -> &str {
    title
        .find('(')
        .and_then(|open| {
            let inner = &title[open + 1..];
            inner.find(')').map(|close| &inner[..close])
        })
        .unwrap_or(title)
}

/// Fit a title into a label, dropping whatever does not fit
pub fn truncate_label(text: &str) -> Label {
    let mut label = Label::new();
    for c in text.chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

/// Events overlapping `[now, now + 57min)`, ordered by begin, end, then title
///
/// Events that end before they begin are never active.
pub fn active_events(events: &[CalendarEvent], now: Instant) -> Vec<&CalendarEvent> {
    let horizon = now + CALENDAR_LOOKAHEAD;
    let mut active: Vec<&CalendarEvent> = events
        .iter()
        .filter(|event| match (event.begin_instant(), event.end_instant()) {
            (Some(begin), Some(end)) => begin < end && begin < horizon && end > now,
            _ => false,
        })
        .collect();
    active.sort_by(|a, b| {
        a.begin
            .cmp(&b.begin)
            .then(a.end.cmp(&b.end))
            .then_with(|| a.title.cmp(&b.title))
    });
    active
}

/// Build the wedges and labels for the first two active events
pub fn build_calendar_overlay(
    events: &[CalendarEvent],
    now: Instant,
    clock: &WallClock,
    style: &FaceStyle,
) -> CalendarOverlay {
    let active = active_events(events, now);
    let horizon = now + CALENDAR_LOOKAHEAD;

    let mut overlay = CalendarOverlay {
        active_count: active.len(),
        ..Default::default()
    };

    let drawn = active.len().min(MAX_CALENDAR_ARCS);
    for (index, event) in active.iter().take(drawn).enumerate() {
        let (Some(begin), Some(end)) = (event.begin_instant(), event.end_instant()) else {
            continue;
        };

        let inner_radius = CALENDAR_BAND_INNER + index as f32 * CALENDAR_BAND_STEP;
        let label_offset = if drawn == 1 {
            style.single_label_offset()
        } else {
            style.calendar_label_offsets[index]
        };

        let arc = CalendarArc {
            segment: ArcSegment {
                start_angle: minute_ring_angle(clock, begin.max(now)),
                end_angle: minute_ring_angle(clock, end.min(horizon)),
                inner_radius,
                outer_radius: inner_radius + CALENDAR_BAND_THICKNESS,
                color: CALENDAR_PALETTE[index % CALENDAR_PALETTE.len()],
            },
            label: truncate_label(short_title(&event.title)),
            label_offset,
        };
        overlay.arcs.push(arc).ok();
    }

    overlay
}
