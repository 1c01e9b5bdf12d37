//! Minute-bucketed rain forecast
//!
//! The minute ticks around the dial double as a one-hour rain chart. Each of
//! the 60 bins is indexed by *wall-clock* minute of the hour, so bin 15 is the
//! tick at quarter past regardless of the current time.

extern crate alloc;

use alloc::vec::Vec;

use chrono::TimeDelta;

use super::IMMINENT_RAIN_THRESHOLD;
use crate::snapshot::Datum;
use crate::time::{self, Instant, WallClock};

/// Number of minute bins around the dial
pub const MINUTE_BINS: usize = 60;

/// How far back a minutely point may lie and still be binned
pub const RAIN_LOOKBACK: TimeDelta = time::minutes(1);

/// How far ahead a minutely point may lie and still be binned
pub const RAIN_LOOKAHEAD: TimeDelta = time::minutes(59);

/// Bins from the current minute onward that count toward "imminent"
///
/// The four bins just behind the current minute hold smoothing copies, not
/// forecast, and are excluded.
pub const IMMINENT_WINDOW_BINS: usize = MINUTE_BINS - 4;

/// Per-minute intensity and probability plus the imminent-rain flag
#[derive(Debug, Clone, PartialEq)]
pub struct RainBins {
    /// Precipitation intensity per wall-clock minute
    pub intensity: [f32; MINUTE_BINS],
    /// Precipitation probability per wall-clock minute
    pub probability: [f32; MINUTE_BINS],
    /// Rain above [`IMMINENT_RAIN_THRESHOLD`] is forecast within the hour
    pub imminent: bool,
}

impl Default for RainBins {
    fn default() -> Self {
        Self::empty()
    }
}

impl RainBins {
    /// All bins dry
    pub const fn empty() -> Self {
        Self {
            intensity: [0.0; MINUTE_BINS],
            probability: [0.0; MINUTE_BINS],
            imminent: false,
        }
    }

    /// Expected rain of a bin, `intensity * probability`
    pub fn rain(&self, bin: usize) -> f32 {
        let bin = bin % MINUTE_BINS;
        self.intensity[bin] * self.probability[bin]
    }

    fn copy_bin(&mut self, from: usize, to: usize) {
        self.intensity[to] = self.intensity[from];
        self.probability[to] = self.probability[from];
    }

    /// Fill the just-elapsed minutes, which usually carry no forecast sample
    ///
    /// The two bins before `minute` copy `minute`; the two before those copy
    /// the bin five minutes back.
    fn smooth_around(&mut self, minute: usize) {
        let behind = |n: usize| (minute + MINUTE_BINS - n) % MINUTE_BINS;
        self.copy_bin(minute, behind(1));
        self.copy_bin(minute, behind(2));
        self.copy_bin(behind(5), behind(3));
        self.copy_bin(behind(5), behind(4));
    }
}

/// Build the minute bins from the `minutely` forecast
///
/// Points outside `[now - 1min, now + 59min]` or missing either intensity or
/// probability are skipped. Points are applied in chronological order and a
/// later point overwrites an earlier one in the same bin.
pub fn build_rain_bins(minutely: &[Datum], now: Instant, clock: &WallClock) -> RainBins {
    let mut bins = RainBins::empty();
    if minutely.is_empty() {
        return bins;
    }

    let earliest = now - RAIN_LOOKBACK;
    let latest = now + RAIN_LOOKAHEAD;

    let mut eligible: Vec<(Instant, f32, f32)> = minutely
        .iter()
        .filter_map(|datum| {
            let instant = datum.instant()?;
            if instant < earliest || instant > latest {
                return None;
            }
            Some((instant, datum.precip_intensity?, datum.precip_probability?))
        })
        .collect();
    eligible.sort_by_key(|(instant, _, _)| *instant);

    for (instant, intensity, probability) in eligible {
        let bin = clock.minute_of_hour(instant);
        bins.intensity[bin] = intensity;
        bins.probability[bin] = probability;
    }

    let current = clock.minute_of_hour(now);
    bins.smooth_around(current);

    bins.imminent = (0..IMMINENT_WINDOW_BINS)
        .any(|ahead| bins.rain(current + ahead) > IMMINENT_RAIN_THRESHOLD);
    bins
}
