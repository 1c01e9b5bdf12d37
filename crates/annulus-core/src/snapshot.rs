//! Weather and calendar snapshots and the store that holds them
//!
//! Snapshots arrive from the paired device as `postcard` payloads. The store
//! keeps the latest decoded snapshot of each kind behind an [`Arc`] and swaps
//! the whole reference on arrival, so a frame that cloned the previous `Arc`
//! keeps seeing a complete, unchanging snapshot.
//!
//! ## Wire format
//!
//! - Weather instants are Unix **seconds**, as served by the forecast API.
//! - Calendar instants are Unix **milliseconds**, as read from the phone's
//!   calendar provider.
//! - Every optional datum field is encoded as an `Option`; absent values are
//!   never replaced by zero.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::time::{self, Instant};

/// Age of `currently` beyond which a weather snapshot is treated as absent
pub const WEATHER_STALE_AFTER: chrono::TimeDelta = time::hours(6);

/// One sparse forecast record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    /// Unix seconds
    pub time: i64,
    /// Probability of precipitation, 0-1
    pub precip_probability: Option<f32>,
    /// Precipitation intensity in mm/h
    pub precip_intensity: Option<f32>,
    /// Cloud cover fraction, 0-1
    pub cloud_cover: Option<f32>,
    /// Unix seconds; daily data only
    pub sunrise_time: Option<i64>,
    /// Unix seconds; daily data only
    pub sunset_time: Option<i64>,
}

impl Datum {
    /// Expected rain, `intensity * probability`, when both are known
    pub fn rain(&self) -> Option<f32> {
        match (self.precip_intensity, self.precip_probability) {
            (Some(intensity), Some(probability)) => Some(intensity * probability),
            _ => None,
        }
    }

    /// Datum time as an instant
    pub fn instant(&self) -> Option<Instant> {
        time::from_unix_secs(self.time)
    }
}

/// Forecast bundle pushed by the paired device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Current observation; its `time` is the snapshot's reference time
    pub currently: Datum,
    /// Per-minute forecast for roughly the next hour
    pub minutely: Vec<Datum>,
    /// Per-hour forecast for the next days
    pub hourly: Vec<Datum>,
    /// Per-day forecast carrying sunrise and sunset
    pub daily: Vec<Datum>,
}

impl WeatherSnapshot {
    /// Unix seconds of the current observation
    pub fn currently_time(&self) -> i64 {
        self.currently.time
    }

    /// Whether the snapshot is too old to draw at `now`
    ///
    /// A `currently` time outside the representable range counts as stale.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.currently
            .instant()
            .is_none_or(|observed| now - observed >= WEATHER_STALE_AFTER)
    }
}

/// Calendar instance pushed by the paired device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    /// Unix milliseconds
    pub begin: i64,
    /// Unix milliseconds
    pub end: i64,
}

impl CalendarEvent {
    pub fn begin_instant(&self) -> Option<Instant> {
        time::from_unix_millis(self.begin)
    }

    pub fn end_instant(&self) -> Option<Instant> {
        time::from_unix_millis(self.end)
    }
}

/// Decode a weather payload
pub fn decode_weather(bytes: &[u8]) -> DecodeResult<WeatherSnapshot> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    postcard::from_bytes(bytes).map_err(DecodeError::Weather)
}

/// Decode a calendar payload
pub fn decode_calendar(bytes: &[u8]) -> DecodeResult<Vec<CalendarEvent>> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    postcard::from_bytes(bytes).map_err(DecodeError::Calendar)
}

/// Encode a weather snapshot for the wire
pub fn encode_weather(snapshot: &WeatherSnapshot) -> Result<Vec<u8>, postcard::Error> {
    postcard::to_allocvec(snapshot)
}

/// Encode a calendar list for the wire
pub fn encode_calendar(events: &[CalendarEvent]) -> Result<Vec<u8>, postcard::Error> {
    postcard::to_allocvec(events)
}

/// A snapshot together with the instant it was received
#[derive(Debug, Clone)]
pub struct Stored<T: ?Sized> {
    pub data: Arc<T>,
    pub received_at: Instant,
}

/// Latest weather and calendar snapshots
///
/// Builders never see the store itself; they receive cloned `Arc`s through
/// the frame context.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    weather: Option<Stored<WeatherSnapshot>>,
    calendar: Option<Stored<[CalendarEvent]>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the weather snapshot
    pub fn replace_weather(&mut self, snapshot: WeatherSnapshot, now: Instant) {
        debug!(
            "Weather snapshot replaced: {} minutely, {} hourly, {} daily",
            snapshot.minutely.len(),
            snapshot.hourly.len(),
            snapshot.daily.len()
        );
        self.weather = Some(Stored {
            data: Arc::new(snapshot),
            received_at: now,
        });
    }

    /// Replace the calendar event list
    pub fn replace_calendar(&mut self, events: Vec<CalendarEvent>, now: Instant) {
        debug!("Calendar snapshot replaced: {} events", events.len());
        self.calendar = Some(Stored {
            data: Arc::from(events),
            received_at: now,
        });
    }

    /// Decode and store a weather payload; a malformed payload keeps the old one
    pub fn accept_weather_bytes(&mut self, bytes: &[u8], now: Instant) -> DecodeResult<()> {
        match decode_weather(bytes) {
            Ok(snapshot) => {
                self.replace_weather(snapshot, now);
                Ok(())
            }
            Err(e) => {
                warn!("Dropping weather payload ({} bytes): {}", bytes.len(), e);
                Err(e)
            }
        }
    }

    /// Decode and store a calendar payload; a malformed payload keeps the old one
    pub fn accept_calendar_bytes(&mut self, bytes: &[u8], now: Instant) -> DecodeResult<()> {
        match decode_calendar(bytes) {
            Ok(events) => {
                self.replace_calendar(events, now);
                Ok(())
            }
            Err(e) => {
                warn!("Dropping calendar payload ({} bytes): {}", bytes.len(), e);
                Err(e)
            }
        }
    }

    /// Weather snapshot usable at `now`, or `None` when absent or stale
    pub fn weather(&self, now: Instant) -> Option<Arc<WeatherSnapshot>> {
        self.weather
            .as_ref()
            .filter(|stored| !stored.data.is_stale(now))
            .map(|stored| Arc::clone(&stored.data))
    }

    /// Current calendar events; empty until the first snapshot arrives
    pub fn calendar(&self) -> Arc<[CalendarEvent]> {
        match &self.calendar {
            Some(stored) => Arc::clone(&stored.data),
            None => Arc::from(Vec::new()),
        }
    }

    /// Whether a calendar snapshot has ever been received
    pub fn has_calendar(&self) -> bool {
        self.calendar.is_some()
    }

    /// When the current weather snapshot arrived
    pub fn weather_received_at(&self) -> Option<Instant> {
        self.weather.as_ref().map(|stored| stored.received_at)
    }

    /// When the current calendar snapshot arrived
    pub fn calendar_received_at(&self) -> Option<Instant> {
        self.calendar.as_ref().map(|stored| stored.received_at)
    }
}
