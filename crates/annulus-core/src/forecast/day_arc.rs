//! 12-hour sky and rain outlook
//!
//! Hourly forecast points become colored wedges on the hour ring, starting at
//! the hour hand's current position. Each wedge takes the color and radius of
//! the point it starts from: blue and grown outward for rain, otherwise a sky
//! tone blended by cloud cover (sun-tinted by day, gray at night).

extern crate alloc;

use alloc::vec::Vec;

use chrono::TimeDelta;
use embedded_graphics::pixelcolor::Rgb565;

use super::{ArcSegment, RAIN_THRESHOLD, rain_growth};
use crate::geometry::forecast_angle;
use crate::snapshot::{Datum, WeatherSnapshot};
use crate::style::{
    COLOR_RAIN_DAY, COLOR_RAIN_NIGHT, SKY_DAY_NEUTRAL, SKY_NIGHT_ACCENT, SKY_NIGHT_NEUTRAL,
    SUN_RGB, blend_rgb888,
};
use crate::time::{self, Instant, WallClock};

/// Inner radius of every wedge, grid units
pub const DAY_ARC_INNER: f32 = 3.0;

/// Outer radius reached at the assumed maximum rain, before thickness
pub const DAY_ARC_MAX: f32 = 5.0;

/// Radial thickness of a dry wedge
pub const DAY_ARC_THICKNESS: f32 = 0.15;

/// Oldest hourly point still considered
pub const DAY_ARC_LOOKBACK: TimeDelta = time::hours(1);

/// Hourly points at or beyond `now` plus this are ignored
pub const DAY_ARC_WINDOW: TimeDelta = time::hours(12);

/// Last drawn instant; later points are pulled back onto it
pub const DAY_ARC_HORIZON: TimeDelta = time::hours(11);

/// Hourly point after clamping, ready for classification
#[derive(Debug, Clone, Copy)]
struct ArcPoint {
    at: Instant,
    probability: Option<f32>,
    intensity: Option<f32>,
    cloud_cover: Option<f32>,
}

impl ArcPoint {
    fn rain(&self) -> Option<f32> {
        Some(self.intensity? * self.probability?)
    }
}

/// Sunrise and sunset for today and tomorrow
#[derive(Debug, Clone, Copy)]
struct Daylight {
    sunrise: Instant,
    sunset: Instant,
    next_sunrise: Instant,
    next_sunset: Option<Instant>,
}

impl Daylight {
    /// Needs two daily entries with today's sunrise and sunset and
    /// tomorrow's sunrise
    fn from_daily(daily: &[Datum]) -> Option<Self> {
        let [today, tomorrow, ..] = daily else {
            return None;
        };
        Some(Self {
            sunrise: time::from_unix_secs(today.sunrise_time?)?,
            sunset: time::from_unix_secs(today.sunset_time?)?,
            next_sunrise: time::from_unix_secs(tomorrow.sunrise_time?)?,
            next_sunset: tomorrow.sunset_time.and_then(time::from_unix_secs),
        })
    }

    /// Whether `at` lies in `[sunrise, sunset)` of either day
    ///
    /// Out-of-order times never fail; they just yield an odd but valid
    /// classification.
    fn is_day(&self, at: Instant) -> bool {
        if at < self.sunrise {
            false
        } else if at < self.sunset {
            true
        } else if at < self.next_sunrise {
            false
        } else {
            self.next_sunset.is_none_or(|sunset| at < sunset)
        }
    }

    fn boundaries(&self) -> impl Iterator<Item = Instant> {
        [
            Some(self.sunrise),
            Some(self.sunset),
            Some(self.next_sunrise),
            self.next_sunset,
        ]
        .into_iter()
        .flatten()
    }
}

/// Build the outlook wedges for `now`
///
/// Returns nothing for an absent or stale snapshot, or when fewer than two
/// hourly points fall in the window.
pub fn build_day_arcs(
    weather: Option<&WeatherSnapshot>,
    now: Instant,
    clock: &WallClock,
) -> Vec<ArcSegment> {
    let Some(weather) = weather.filter(|weather| !weather.is_stale(now)) else {
        return Vec::new();
    };

    let mut points = clamp_hourly(&weather.hourly, now);
    if points.len() < 2 {
        return Vec::new();
    }

    fill_cloud_cover(&mut points);

    if let Some(observed) = weather.currently.precip_probability {
        for point in points.iter_mut().filter(|point| point.at <= now) {
            point.probability = Some(point.probability.map_or(observed, |p| p.max(observed)));
        }
    }

    let daylight = Daylight::from_daily(&weather.daily);
    if let Some(daylight) = daylight {
        insert_boundaries(&mut points, &daylight);
    }

    points
        .windows(2)
        .filter(|pair| pair[0].at < pair[1].at)
        .map(|pair| {
            let is_day = daylight.is_none_or(|daylight| daylight.is_day(pair[0].at));
            let (color, outer_radius) = classify(&pair[0], is_day);
            ArcSegment {
                start_angle: forecast_angle(clock, pair[0].at),
                end_angle: forecast_angle(clock, pair[1].at),
                inner_radius: DAY_ARC_INNER,
                outer_radius,
                color,
            }
        })
        .collect()
}

/// Filter to the window, clamp into `[now, now + 11h]` and sort
///
/// Points that clamp onto the same instant keep only the later forecast.
fn clamp_hourly(hourly: &[Datum], now: Instant) -> Vec<ArcPoint> {
    let earliest = now - DAY_ARC_LOOKBACK;
    let end = now + DAY_ARC_WINDOW;
    let horizon = now + DAY_ARC_HORIZON;

    let mut windowed: Vec<(Instant, &Datum)> = hourly
        .iter()
        .filter_map(|datum| Some((datum.instant()?, datum)))
        .filter(|(at, _)| *at >= earliest && *at < end)
        .collect();
    windowed.sort_by_key(|(at, _)| *at);

    let mut points: Vec<ArcPoint> = Vec::with_capacity(windowed.len());
    for (at, datum) in windowed {
        let point = ArcPoint {
            at: at.clamp(now, horizon),
            probability: datum.precip_probability,
            intensity: datum.precip_intensity,
            cloud_cover: datum.cloud_cover,
        };
        match points.last_mut() {
            Some(last) if last.at == point.at => *last = point,
            _ => points.push(point),
        }
    }
    points
}

/// Borrow missing cloud cover from the next later point, then the previous one
fn fill_cloud_cover(points: &mut [ArcPoint]) {
    let mut later = None;
    for point in points.iter_mut().rev() {
        match point.cloud_cover {
            Some(cloud) => later = Some(cloud),
            None => point.cloud_cover = later,
        }
    }

    let mut earlier = None;
    for point in points.iter_mut() {
        match point.cloud_cover {
            Some(cloud) => earlier = Some(cloud),
            None => point.cloud_cover = earlier,
        }
    }
}

/// Add a copy of the preceding point at every sunrise or sunset inside the
/// window, so the color flips exactly there
fn insert_boundaries(points: &mut Vec<ArcPoint>, daylight: &Daylight) {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return;
    };
    let (first, last) = (first.at, last.at);

    for boundary in daylight.boundaries() {
        if boundary <= first || boundary >= last {
            continue;
        }
        let index = points.partition_point(|point| point.at < boundary);
        if points.get(index).is_some_and(|point| point.at == boundary) {
            continue;
        }
        let mut synthetic = points[index - 1];
        synthetic.at = boundary;
        points.insert(index, synthetic);
    }
}

/// Color and outer radius of the wedge starting at `point`
fn classify(point: &ArcPoint, is_day: bool) -> (Rgb565, f32) {
    if let Some(rain) = point.rain().filter(|rain| *rain >= RAIN_THRESHOLD) {
        let color = if is_day { COLOR_RAIN_DAY } else { COLOR_RAIN_NIGHT };
        return (
            color,
            rain_growth(rain, DAY_ARC_INNER, DAY_ARC_MAX) + DAY_ARC_THICKNESS,
        );
    }

    // Unknown cover counts as overcast: no accent contribution
    let cloud = point.cloud_cover.unwrap_or(1.0);
    let color = if is_day {
        let neutral = SKY_DAY_NEUTRAL;
        blend_rgb888(cloud, (neutral, neutral, neutral), SUN_RGB)
    } else {
        let (neutral, accent) = (SKY_NIGHT_NEUTRAL, SKY_NIGHT_ACCENT);
        blend_rgb888(cloud, (neutral, neutral, neutral), (accent, accent, accent))
    };
    (color, DAY_ARC_INNER + DAY_ARC_THICKNESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::rgb888;
    use alloc::vec;
    use core::f32::consts::TAU;

    /// 2023-11-14 22:14:00 UTC
    const NOW: i64 = 1_700_000_040;
    /// Top of the hour before `NOW`
    const HOUR_MARK: i64 = NOW - 14 * 60;

    fn now() -> Instant {
        time::from_unix_secs(NOW).unwrap()
    }

    fn at(offset_secs: i64) -> Instant {
        time::from_unix_secs(NOW + offset_secs).unwrap()
    }

    fn dry_hour(k: i64, cloud: f32) -> Datum {
        Datum {
            time: HOUR_MARK + k * 3600,
            precip_probability: Some(0.0),
            precip_intensity: Some(0.0),
            cloud_cover: Some(cloud),
            ..Default::default()
        }
    }

    fn snapshot(hourly: Vec<Datum>, daily: Vec<Datum>) -> WeatherSnapshot {
        WeatherSnapshot {
            currently: Datum {
                time: NOW - 60,
                ..Default::default()
            },
            hourly,
            daily,
            ..Default::default()
        }
    }

    fn day(sunrise_offset: i64, sunset_offset: i64) -> Datum {
        Datum {
            time: NOW,
            sunrise_time: Some(NOW + sunrise_offset),
            sunset_time: Some(NOW + sunset_offset),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_hourly_yields_nothing() {
        let weather = snapshot(vec![], vec![]);
        assert!(build_day_arcs(Some(&weather), now(), &WallClock::utc()).is_empty());
        assert!(build_day_arcs(None, now(), &WallClock::utc()).is_empty());
    }

    #[test]
    fn test_single_point_yields_nothing() {
        let weather = snapshot(vec![dry_hour(1, 0.5)], vec![]);
        assert!(build_day_arcs(Some(&weather), now(), &WallClock::utc()).is_empty());
    }

    #[test]
    fn test_stale_snapshot_yields_nothing() {
        let mut weather = snapshot((0..14).map(|k| dry_hour(k, 0.5)).collect(), vec![]);
        weather.currently.time = NOW - 6 * 3600;
        assert!(build_day_arcs(Some(&weather), now(), &WallClock::utc()).is_empty());
    }

    #[test]
    fn test_window_is_clamped_to_eleven_hours() {
        let clock = WallClock::utc();
        let weather = snapshot((-2..16).map(|k| dry_hour(k, 0.5)).collect(), vec![]);
        let segments = build_day_arcs(Some(&weather), now(), &clock);

        // 22:00 clamps onto now, 10:00 clamps onto 09:14, 09:00 stays
        assert_eq!(segments.len(), 12);
        assert_eq!(segments[0].start_angle, forecast_angle(&clock, now()));
        assert_eq!(
            segments[segments.len() - 1].end_angle,
            forecast_angle(&clock, at(11 * 3600))
        );
        for segment in &segments {
            assert!((0.0..TAU).contains(&segment.start_angle));
            assert!((0.0..TAU).contains(&segment.end_angle));
        }
    }

    #[test]
    fn test_sunrise_inserts_hard_edge() {
        let clock = WallClock::utc();
        let weather = snapshot(
            (0..14).map(|k| dry_hour(k, 0.0)).collect(),
            vec![day(2 * 3600, 14 * 3600), day(26 * 3600, 38 * 3600)],
        );
        let segments = build_day_arcs(Some(&weather), now(), &clock);

        let sunrise = forecast_angle(&clock, at(2 * 3600));
        let edge = segments
            .iter()
            .position(|segment| segment.end_angle == sunrise)
            .expect("a wedge ends exactly at sunrise");
        let night = rgb888(80, 80, 80);
        let clear_day = rgb888(SUN_RGB.0, SUN_RGB.1, SUN_RGB.2);

        assert!(segments[..=edge].iter().all(|segment| segment.color == night));
        assert_eq!(segments[edge + 1].start_angle, sunrise);
        assert_eq!(segments[edge + 1].color, clear_day);
        // 13 clamped points plus the synthetic sunrise point
        assert_eq!(segments.len(), 13);
    }

    #[test]
    fn test_sunset_inserts_hard_edge() {
        let clock = WallClock::utc();
        let weather = snapshot(
            (0..14).map(|k| dry_hour(k, 0.0)).collect(),
            vec![day(-2 * 3600, 3 * 3600), day(26 * 3600, 38 * 3600)],
        );
        let segments = build_day_arcs(Some(&weather), now(), &clock);

        let sunset = forecast_angle(&clock, at(3 * 3600));
        let edge = segments
            .iter()
            .position(|segment| segment.end_angle == sunset)
            .expect("a wedge ends exactly at sunset");
        let clear_day = rgb888(SUN_RGB.0, SUN_RGB.1, SUN_RGB.2);
        let night = rgb888(80, 80, 80);

        assert!(segments[..=edge].iter().all(|segment| segment.color == clear_day));
        assert_eq!(segments[edge + 1].start_angle, sunset);
        assert!(segments[edge + 1..].iter().all(|segment| segment.color == night));
        assert_eq!(segments.len(), 13);
    }

    #[test]
    fn test_single_daily_entry_means_all_day() {
        let weather = snapshot(
            (0..14).map(|k| dry_hour(k, 1.0)).collect(),
            vec![day(2 * 3600, 14 * 3600)],
        );
        let segments = build_day_arcs(Some(&weather), now(), &WallClock::utc());
        assert_eq!(segments.len(), 12);
        assert!(segments.iter().all(|segment| segment.color == rgb888(255, 255, 255)));
    }

    #[test]
    fn test_rain_grows_the_wedge() {
        let mut hourly: Vec<Datum> = (0..14).map(|k| dry_hour(k, 0.5)).collect();
        hourly[3].precip_intensity = Some(2.5);
        hourly[3].precip_probability = Some(1.0);
        let weather = snapshot(hourly, vec![]);
        let segments = build_day_arcs(Some(&weather), now(), &WallClock::utc());

        let rainy = &segments[3];
        assert_eq!(rainy.color, COLOR_RAIN_DAY);
        assert!((rainy.outer_radius - (DAY_ARC_MAX + DAY_ARC_THICKNESS)).abs() < 1e-6);
        assert!((segments[2].outer_radius - (DAY_ARC_INNER + DAY_ARC_THICKNESS)).abs() < 1e-6);
        assert!(segments.iter().all(|segment| segment.inner_radius == DAY_ARC_INNER));
    }

    #[test]
    fn test_observed_probability_overrides_past_points() {
        let mut hourly: Vec<Datum> = (0..14).map(|k| dry_hour(k, 0.5)).collect();
        hourly[0].precip_intensity = Some(1.0);
        let mut weather = snapshot(hourly, vec![]);

        let dry = build_day_arcs(Some(&weather), now(), &WallClock::utc());
        assert_ne!(dry[0].color, COLOR_RAIN_DAY);

        weather.currently.precip_probability = Some(0.5);
        let wet = build_day_arcs(Some(&weather), now(), &WallClock::utc());
        assert_eq!(wet[0].color, COLOR_RAIN_DAY);
        assert_ne!(wet[1].color, COLOR_RAIN_DAY, "future points keep their forecast");
    }

    #[test]
    fn test_missing_cloud_cover_borrows_from_later_point() {
        let mut hourly: Vec<Datum> = (0..14).map(|k| dry_hour(k, 0.0)).collect();
        hourly[1].cloud_cover = None;
        hourly[2].cloud_cover = Some(1.0);
        let weather = snapshot(hourly, vec![]);
        let segments = build_day_arcs(Some(&weather), now(), &WallClock::utc());

        assert_eq!(segments[1].color, rgb888(255, 255, 255));
        assert_eq!(segments[0].color, rgb888(SUN_RGB.0, SUN_RGB.1, SUN_RGB.2));
    }

    #[test]
    fn test_contradictory_daylight_does_not_fail() {
        let weather = snapshot(
            (0..14).map(|k| dry_hour(k, 0.5)).collect(),
            vec![day(10 * 3600, 2 * 3600), day(5 * 3600, 3600)],
        );
        let segments = build_day_arcs(Some(&weather), now(), &WallClock::utc());
        assert!(segments.len() >= 12);
    }
}
