//! Wall-clock helpers
//!
//! Snapshots carry absolute instants; the dial is drawn in local wall-clock
//! time. [`WallClock`] owns the UTC offset and splits an instant into the
//! fields the geometry kernel consumes.

use chrono::{DateTime, FixedOffset, Offset, TimeDelta, Timelike, Utc};
use log::warn;

/// Absolute instant used throughout the engine
pub type Instant = DateTime<Utc>;

/// Largest UTC offset accepted by [`FixedOffset`] (exclusive), in seconds
pub const MAX_UTC_OFFSET_SECS: i32 = 86_400;

/// Local time fields used for hand and tick placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockFields {
    /// Hour on a 12-hour dial (0-11)
    pub hour12: u32,
    /// Minute of the hour (0-59)
    pub minute: u32,
    /// Second of the minute (0-59)
    pub second: u32,
}

/// Converts instants into local wall-clock fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    offset: FixedOffset,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl WallClock {
    /// Wall clock at UTC
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Wall clock at the given offset east of UTC
    ///
    /// Out-of-range offsets fall back to UTC.
    pub fn from_offset_secs(seconds: i32) -> Self {
        match FixedOffset::east_opt(seconds) {
            Some(offset) => Self { offset },
            None => {
                warn!("Rejecting UTC offset {}s, using UTC", seconds);
                Self::utc()
            }
        }
    }

    /// Offset east of UTC in seconds
    pub fn offset_secs(&self) -> i32 {
        self.offset.local_minus_utc()
    }

    /// Local representation of an instant
    pub fn local(&self, instant: Instant) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Hour, minute and second on the local dial
    pub fn fields(&self, instant: Instant) -> ClockFields {
        let local = self.local(instant);
        ClockFields {
            hour12: local.hour() % 12,
            minute: local.minute(),
            second: local.second(),
        }
    }

    /// Local minute of the hour, used as the rain bin index
    pub fn minute_of_hour(&self, instant: Instant) -> usize {
        self.local(instant).minute() as usize
    }
}

/// Instant from Unix seconds (weather wire format)
pub fn from_unix_secs(seconds: i64) -> Option<Instant> {
    DateTime::from_timestamp(seconds, 0)
}

/// Instant from Unix milliseconds (calendar wire format)
pub fn from_unix_millis(millis: i64) -> Option<Instant> {
    DateTime::from_timestamp_millis(millis)
}

/// Whole minutes
pub const fn minutes(count: i64) -> TimeDelta {
    TimeDelta::seconds(count * 60)
}

/// Whole hours
pub const fn hours(count: i64) -> TimeDelta {
    TimeDelta::seconds(count * 3600)
}
