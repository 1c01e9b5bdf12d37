//! Watch face renderer
//!
//! Draws one frame in a fixed order:
//!
//! 1. background (black in ambient mode)
//! 2. 60 minute ticks, colored and lengthened by the rain bins
//! 3. 12 hour ticks
//! 4. the calendar overlay when shown, otherwise the day arcs
//! 5. minute hand, hour hand, second hand (interactive only)
//! 6. center cap
//!
//! Everything is computed from an immutable [`FrameContext`]; the renderer
//! holds no state besides the style table.

extern crate alloc;

pub mod graphics;
pub mod surface;

pub use graphics::GraphicsSurface;
pub use surface::{DrawCommand, DrawList, FilledPath, Surface, SurfaceBounds, TextSize};

use alloc::sync::Arc;

use embedded_graphics::pixelcolor::Rgb565;

use crate::forecast::{
    ArcSegment, CalendarOverlay, RAIN_THRESHOLD, RainBins, build_calendar_overlay, build_day_arcs,
    build_rain_bins, rain_growth,
};
use crate::geometry::{
    Dial, HOURS_PER_TURN, MINUTES_PER_TURN, Point2, angle_of, hour_angle, minute_angle,
    second_angle, tapered_hand_polygon,
};
use crate::scheduler::DisplayMode;
use crate::snapshot::{CalendarEvent, WeatherSnapshot};
use crate::style::{BLACK, COLOR_BACKGROUND, COLOR_RAIN_DAY, FaceStyle, WHITE};
use crate::time::{Instant, WallClock};

/// Snapshot references and settings one frame is drawn from
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub now: Instant,
    pub clock: WallClock,
    pub mode: DisplayMode,
    /// Fresh weather, if any
    pub weather: Option<Arc<WeatherSnapshot>>,
    pub calendar: Arc<[CalendarEvent]>,
    /// Draw the calendar overlay instead of the day arcs
    pub show_calendar: bool,
    /// Minute bins derived from `weather`
    pub rain: RainBins,
}

impl FrameContext {
    pub fn new(
        now: Instant,
        clock: WallClock,
        mode: DisplayMode,
        weather: Option<Arc<WeatherSnapshot>>,
        calendar: Arc<[CalendarEvent]>,
        show_calendar: bool,
    ) -> Self {
        let rain = match &weather {
            Some(weather) => build_rain_bins(&weather.minutely, now, &clock),
            None => RainBins::empty(),
        };
        Self {
            now,
            clock,
            mode,
            weather,
            calendar,
            show_calendar,
            rain,
        }
    }

    pub fn is_ambient(&self) -> bool {
        self.mode == DisplayMode::Ambient
    }
}

/// Draws frames with a fixed style
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    style: FaceStyle,
}

impl Renderer {
    pub fn new(style: FaceStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &FaceStyle {
        &self.style
    }

    /// Draw a full frame onto `surface`
    pub fn render<S: Surface>(&self, surface: &mut S, frame: &FrameContext) -> Result<(), S::Error> {
        let bounds = surface.bounds();
        let dial = Dial::new(bounds.width, bounds.height, bounds.cutout_bottom_inset);

        surface.clear(if frame.is_ambient() { BLACK } else { COLOR_BACKGROUND })?;

        self.draw_minute_ticks(surface, &dial, frame)?;
        self.draw_hour_ticks(surface, &dial)?;

        if frame.show_calendar {
            let overlay =
                build_calendar_overlay(&frame.calendar, frame.now, &frame.clock, &self.style);
            draw_calendar(surface, &dial, &overlay)?;
        } else {
            let segments = build_day_arcs(frame.weather.as_deref(), frame.now, &frame.clock);
            for segment in &segments {
                draw_segment(surface, &dial, segment)?;
            }
        }

        self.draw_hands(surface, &dial, frame)
    }

    /// Tick length in grid units and color for minute bin `bin`
    pub fn minute_tick(&self, rain: &RainBins, bin: usize, current_minute: usize) -> (f32, Rgb565) {
        let base = self.style.minor_tick_length;
        let amount = rain.rain(bin);

        let (mut length, color) = if amount >= RAIN_THRESHOLD {
            (
                rain_growth(amount, base, self.style.minor_tick_max_length),
                COLOR_RAIN_DAY,
            )
        } else {
            (base, WHITE)
        };

        // Keep the last few minutes behind the minute hand clear
        if rain.imminent {
            match (current_minute + 60 - bin % 60) % 60 {
                0 | 5 => length = base,
                1 | 4 => length = base * 0.5,
                2 | 3 => length = 0.0,
                _ => {}
            }
        }
        (length, color)
    }

    fn draw_minute_ticks<S: Surface>(
        &self,
        surface: &mut S,
        dial: &Dial,
        frame: &FrameContext,
    ) -> Result<(), S::Error> {
        let current = frame.clock.minute_of_hour(frame.now);
        let end = self.style.tick_end;

        for bin in 0..60 {
            let (length, color) = self.minute_tick(&frame.rain, bin, current);
            if length <= 0.0 {
                continue;
            }
            let tick = dial.radial_segment(angle_of(bin as f32, MINUTES_PER_TURN), end - length, end);
            surface.line(tick.start, tick.end, self.style.minor_tick_stroke, color)?;
        }
        Ok(())
    }

    fn draw_hour_ticks<S: Surface>(&self, surface: &mut S, dial: &Dial) -> Result<(), S::Error> {
        for hour in 0..12 {
            let tick = dial.radial_segment(
                angle_of(hour as f32, HOURS_PER_TURN),
                self.style.major_tick_start,
                self.style.tick_end,
            );
            surface.line(tick.start, tick.end, self.style.major_tick_stroke, WHITE)?;
        }
        Ok(())
    }

    fn draw_hands<S: Surface>(
        &self,
        surface: &mut S,
        dial: &Dial,
        frame: &FrameContext,
    ) -> Result<(), S::Error> {
        let style = &self.style;
        let fields = frame.clock.fields(frame.now);
        let grid = dial.grid;

        // Ambient frames are drawn once a minute; the hand snaps to the minute
        let minute_hand = tapered_hand_polygon(
            dial.center,
            minute_angle(fields, !frame.is_ambient()),
            style.minute_hand_base * grid,
            style.hand_tip * grid,
            style.minute_hand_length * grid,
            style.hand_tip_length * grid,
        );
        surface.filled_path(&FilledPath::Polygon(&minute_hand), WHITE)?;

        let hour_hand = tapered_hand_polygon(
            dial.center,
            hour_angle(fields),
            style.hour_hand_base * grid,
            style.hand_tip * grid,
            style.hour_hand_length * grid,
            style.hand_tip_length * grid,
        );
        surface.filled_path(&FilledPath::Polygon(&hour_hand), WHITE)?;

        if !frame.is_ambient() {
            let tip = dial.point(second_angle(fields), style.second_hand_length);
            surface.line(dial.center, tip, style.second_hand_stroke, WHITE)?;
        }

        surface.filled_circle(dial.center, style.cap_radius * grid, WHITE)
    }
}

fn draw_segment<S: Surface>(
    surface: &mut S,
    dial: &Dial,
    segment: &ArcSegment,
) -> Result<(), S::Error> {
    let sector = dial.sector(
        segment.start_angle,
        segment.end_angle,
        segment.inner_radius,
        segment.outer_radius,
    );
    surface.filled_path(&FilledPath::Sector(sector), segment.color)
}

fn draw_calendar<S: Surface>(
    surface: &mut S,
    dial: &Dial,
    overlay: &CalendarOverlay,
) -> Result<(), S::Error> {
    for arc in &overlay.arcs {
        draw_segment(surface, dial, &arc.segment)?;
    }
    for arc in &overlay.arcs {
        let position = Point2::new(dial.center.x, dial.center.y + arc.label_offset * dial.grid);
        surface.text(&arc.label, position, TextSize::Medium, arc.segment.color)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Datum;
    use crate::style::CALENDAR_PALETTE;
    use crate::time;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    /// 2023-11-14 22:14:00 UTC
    const NOW: i64 = 1_700_000_040;

    fn now() -> Instant {
        time::from_unix_secs(NOW).unwrap()
    }

    fn bounds(cutout: u32) -> SurfaceBounds {
        SurfaceBounds {
            width: 320,
            height: 320,
            cutout_bottom_inset: cutout,
        }
    }

    fn frame(mode: DisplayMode, weather: Option<WeatherSnapshot>, show_calendar: bool) -> FrameContext {
        let calendar: Arc<[CalendarEvent]> = Arc::from(vec![CalendarEvent {
            title: String::from("Review (Design)"),
            begin: NOW * 1000 + 5 * 60_000,
            end: NOW * 1000 + 35 * 60_000,
        }]);
        FrameContext::new(
            now(),
            WallClock::utc(),
            mode,
            weather.map(Arc::new),
            calendar,
            show_calendar,
        )
    }

    fn draw(frame: &FrameContext, cutout: u32) -> Vec<DrawCommand> {
        let mut list = DrawList::new(bounds(cutout));
        Renderer::default().render(&mut list, frame).unwrap();
        list.commands().to_vec()
    }

    fn lines(commands: &[DrawCommand]) -> Vec<(Point2, Point2, Rgb565)> {
        commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Line { from, to, color, .. } => Some((*from, *to, *color)),
                _ => None,
            })
            .collect()
    }

    fn rainy_weather(offset_min: i64) -> WeatherSnapshot {
        let hourly = (0..14)
            .map(|k| Datum {
                time: NOW - 14 * 60 + k * 3600,
                precip_probability: Some(0.0),
                precip_intensity: Some(0.0),
                cloud_cover: Some(0.5),
                ..Default::default()
            })
            .collect();
        WeatherSnapshot {
            currently: Datum {
                time: NOW - 60,
                ..Default::default()
            },
            minutely: vec![Datum {
                time: NOW + offset_min * 60,
                precip_probability: Some(1.0),
                precip_intensity: Some(2.5),
                ..Default::default()
            }],
            hourly,
            ..Default::default()
        }
    }

    #[test]
    fn test_interactive_draw_order_without_data() {
        let commands = draw(&frame(DisplayMode::Interactive, None, false), 0);

        assert_eq!(commands[0], DrawCommand::Clear(COLOR_BACKGROUND));
        assert_eq!(lines(&commands[1..73]).len(), 72, "60 minute and 12 hour ticks");
        assert!(matches!(commands[73], DrawCommand::Polygon { .. }));
        assert!(matches!(commands[74], DrawCommand::Polygon { .. }));
        assert!(matches!(commands[75], DrawCommand::Line { .. }));
        assert!(matches!(commands[76], DrawCommand::Circle { .. }));
        assert_eq!(commands.len(), 77);
    }

    #[test]
    fn test_ambient_omits_second_hand() {
        let commands = draw(&frame(DisplayMode::Ambient, None, false), 0);

        assert_eq!(commands[0], DrawCommand::Clear(BLACK));
        assert_eq!(commands.len(), 76);
        assert!(matches!(commands[74], DrawCommand::Polygon { .. }));
        assert!(matches!(commands[75], DrawCommand::Circle { .. }));
    }

    #[test]
    fn test_day_arcs_drawn_between_ticks_and_hands() {
        let commands = draw(&frame(DisplayMode::Interactive, Some(rainy_weather(30)), false), 0);
        let first_sector = commands
            .iter()
            .position(|command| matches!(command, DrawCommand::Sector { .. }))
            .unwrap();
        let first_polygon = commands
            .iter()
            .position(|command| matches!(command, DrawCommand::Polygon { .. }))
            .unwrap();

        assert!(lines(&commands[..first_sector]).len() >= 70);
        assert!(first_sector < first_polygon);
        assert!(!commands.iter().any(|command| matches!(command, DrawCommand::Text { .. })));
    }

    #[test]
    fn test_calendar_replaces_day_arcs() {
        let commands = draw(&frame(DisplayMode::Interactive, Some(rainy_weather(30)), true), 0);
        let sectors: Vec<Rgb565> = commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Sector { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(sectors, vec![CALENDAR_PALETTE[0]]);

        let label = commands.iter().find_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.clone()),
            _ => None,
        });
        assert_eq!(label.as_deref(), Some("Design"));
    }

    #[test]
    fn test_rain_lengthens_minute_tick() {
        let commands = draw(&frame(DisplayMode::Interactive, Some(rainy_weather(10)), false), 0);
        let rainy: Vec<_> = lines(&commands)
            .into_iter()
            .filter(|(_, _, color)| *color == COLOR_RAIN_DAY)
            .collect();
        assert_eq!(rainy.len(), 1);

        // 320px panel: 20px per grid unit, tick spans 3.5 to 7.5 units
        let (from, to, _) = rainy[0];
        let length = libm::sqrtf((to.x - from.x).powi(2) + (to.y - from.y).powi(2));
        assert!((length - 80.0).abs() < 0.01, "length {}", length);
    }

    #[test]
    fn test_imminent_rain_clears_ticks_behind_hand() {
        let frame = frame(DisplayMode::Interactive, Some(rainy_weather(10)), false);
        assert!(frame.rain.imminent);
        let renderer = Renderer::default();
        let current = 14;

        assert_eq!(renderer.minute_tick(&frame.rain, 12, current).0, 0.0);
        assert_eq!(renderer.minute_tick(&frame.rain, 11, current).0, 0.0);
        assert_eq!(renderer.minute_tick(&frame.rain, 13, current).0, 0.25);
        assert_eq!(renderer.minute_tick(&frame.rain, 9, current).0, 0.5);

        let commands = draw(&frame, 0);
        assert_eq!(lines(&commands[1..71]).len(), 70, "58 minute and 12 hour ticks");
    }

    #[test]
    fn test_ticks_respect_cutout() {
        let commands = draw(&frame(DisplayMode::Ambient, None, false), 30);
        for (from, to, _) in lines(&commands) {
            assert!(from.y <= 290.0 + 1e-3);
            assert!(to.y <= 290.0 + 1e-3);
        }
    }
}
