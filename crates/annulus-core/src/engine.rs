//! Single-threaded engine loop
//!
//! All inbound activity (timer ticks, snapshot deliveries, link changes, mode
//! and visibility changes) arrives as an [`EngineEvent`] over one channel and
//! is handled in order, so a scheduler tick and a reachability change can
//! never send the same request twice.

extern crate alloc;

use alloc::vec::Vec;
use core::fmt::Debug;

use chrono::TimeDelta;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use log::{debug, error, info};

use crate::config::Config;
use crate::forecast::CalendarVisibility;
use crate::forecast::calendar::active_events;
use crate::render::{FrameContext, Renderer, Surface};
use crate::scheduler::{DisplayMode, RefreshInputs, RefreshScheduler};
use crate::snapshot::SnapshotStore;
use crate::style::FaceStyle;
use crate::time::{self, Instant, WallClock};
use crate::transport::{DataKind, EndpointId, Transport};

/// Channel capacity for engine events
pub const ENGINE_EVENT_CAPACITY: usize = 8;

/// Redraw period while interactive
pub const INTERACTIVE_TICK: TimeDelta = TimeDelta::seconds(1);

/// Redraw period in ambient mode
pub const AMBIENT_TICK: TimeDelta = time::minutes(1);

/// Inbound event for the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Timer fired
    Tick,
    /// Weather snapshot bytes from the paired device
    WeatherPayload(Vec<u8>),
    /// Calendar snapshot bytes from the paired device
    CalendarPayload(Vec<u8>),
    /// Best paired device changed, or none is reachable
    PeerReachabilityChanged(Option<EndpointId>),
    /// The link finished sending a refresh request
    SendComplete(DataKind),
    ModeChanged(DisplayMode),
    VisibilityChanged(bool),
    /// New UTC offset in seconds
    TimeZoneChanged(i32),
    /// User asked to flip between calendar and day arcs
    ToggleCalendar,
}

/// Global channel for engine events
pub static ENGINE_CHANNEL: Channel<CriticalSectionRawMutex, EngineEvent, ENGINE_EVENT_CAPACITY> =
    Channel::new();

pub type EngineSender = Sender<'static, CriticalSectionRawMutex, EngineEvent, ENGINE_EVENT_CAPACITY>;
pub type EngineReceiver =
    Receiver<'static, CriticalSectionRawMutex, EngineEvent, ENGINE_EVENT_CAPACITY>;

/// Helper to get an engine event sender
pub fn get_engine_sender() -> EngineSender {
    ENGINE_CHANNEL.sender()
}

/// Helper to get an engine event receiver
pub fn get_engine_receiver() -> EngineReceiver {
    ENGINE_CHANNEL.receiver()
}

/// Owns the snapshots, scheduler and renderer of one watch face
pub struct Engine<'a, T: Transport> {
    config: Config<'a>,
    clock: WallClock,
    transport: T,
    store: SnapshotStore,
    scheduler: RefreshScheduler,
    calendar_visibility: CalendarVisibility,
    renderer: Renderer,
    mode: DisplayMode,
    visible: bool,
    needs_redraw: bool,
    /// Frame built by the last tick, reused by the draw that follows it
    tick_frame: Option<FrameContext>,
}

impl<'a, T: Transport> Engine<'a, T> {
    pub fn new(config: Config<'a>, transport: T, style: FaceStyle) -> Self {
        let clock = config.wall_clock();
        Self {
            config,
            clock,
            transport,
            store: SnapshotStore::new(),
            scheduler: RefreshScheduler::new(),
            calendar_visibility: CalendarVisibility::new(),
            renderer: Renderer::new(style),
            mode: DisplayMode::Interactive,
            visible: true,
            needs_redraw: true,
            tick_frame: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn clock(&self) -> &WallClock {
        &self.clock
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn calendar_shown(&self) -> bool {
        self.calendar_visibility.is_shown()
    }

    /// Whether something changed since the last drawn frame
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// How long until the next tick, or `None` while hidden
    pub fn tick_period(&self) -> Option<TimeDelta> {
        if !self.visible {
            return None;
        }
        match self.mode {
            DisplayMode::Interactive => Some(INTERACTIVE_TICK),
            DisplayMode::Ambient => Some(AMBIENT_TICK),
        }
    }

    /// Handle one event at `now`
    pub fn process_event(&mut self, event: EngineEvent, now: Instant) {
        self.tick_frame = None;
        match event {
            EngineEvent::Tick => self.on_tick(now),
            EngineEvent::WeatherPayload(bytes) => {
                if self.store.accept_weather_bytes(&bytes, now).is_ok() {
                    self.needs_redraw = true;
                }
            }
            EngineEvent::CalendarPayload(bytes) => {
                if self.store.accept_calendar_bytes(&bytes, now).is_ok() {
                    self.update_calendar_visibility(now);
                    self.needs_redraw = true;
                }
            }
            EngineEvent::PeerReachabilityChanged(endpoint) => {
                self.scheduler.on_reachability_changed(
                    endpoint,
                    &mut self.transport,
                    &self.config.link,
                    now,
                );
            }
            EngineEvent::SendComplete(kind) => {
                debug!("{:?} request completed", kind);
                self.scheduler.on_send_complete(kind);
            }
            EngineEvent::ModeChanged(mode) => {
                if mode != self.mode {
                    info!("Display mode changed to {:?}", mode);
                    self.mode = mode;
                    self.needs_redraw = true;
                }
            }
            EngineEvent::VisibilityChanged(visible) => {
                debug!("Visibility changed: {}", visible);
                self.visible = visible;
                if visible {
                    self.needs_redraw = true;
                }
            }
            EngineEvent::TimeZoneChanged(offset_secs) => {
                self.clock = WallClock::from_offset_secs(offset_secs);
                info!("UTC offset now {}s", self.clock.offset_secs());
                self.needs_redraw = true;
            }
            EngineEvent::ToggleCalendar => {
                self.calendar_visibility.toggle();
                self.needs_redraw = true;
            }
        }
    }

    fn on_tick(&mut self, now: Instant) {
        if !self.visible {
            debug!("Ignoring tick while hidden");
            return;
        }

        self.update_calendar_visibility(now);

        let frame = self.frame(now);
        let inputs = RefreshInputs {
            mode: self.mode,
            imminent: frame.rain.imminent,
            has_weather: frame.weather.is_some(),
            has_calendar: self.store.has_calendar(),
        };
        self.scheduler.evaluate(
            &mut self.transport,
            &self.config.link,
            &inputs,
            now,
            &self.clock,
        );
        self.tick_frame = Some(frame);
        self.needs_redraw = true;
    }

    fn update_calendar_visibility(&mut self, now: Instant) {
        let events = self.store.calendar();
        let active = !active_events(&events, now).is_empty();
        if self.calendar_visibility.update(active) {
            debug!("Calendar overlay shown: {}", self.calendar_visibility.is_shown());
            self.needs_redraw = true;
        }
    }

    /// Immutable view of everything needed to draw at `now`
    pub fn frame(&self, now: Instant) -> FrameContext {
        FrameContext::new(
            now,
            self.clock,
            self.mode,
            self.store.weather(now),
            self.store.calendar(),
            self.calendar_visibility.is_shown(),
        )
    }

    /// Draw a frame and clear the redraw flag
    ///
    /// Reuses the frame of a tick handled at the same instant.
    pub fn draw<S: Surface>(&mut self, surface: &mut S, now: Instant) -> Result<(), S::Error> {
        let frame = match self.tick_frame.take() {
            Some(frame) if frame.now == now => frame,
            _ => self.frame(now),
        };
        self.renderer.render(surface, &frame)?;
        self.needs_redraw = false;
        Ok(())
    }

    /// Main engine loop
    ///
    /// Waits for events, handles them in arrival order and redraws whenever
    /// an event asked for it. `now` supplies the current instant.
    pub async fn run<S, F>(
        &mut self,
        receiver: Receiver<'_, CriticalSectionRawMutex, EngineEvent, ENGINE_EVENT_CAPACITY>,
        surface: &mut S,
        mut now: F,
    ) where
        S: Surface,
        S::Error: Debug,
        F: FnMut() -> Instant,
    {
        info!("Engine task started");

        let at = now();
        if let Err(e) = self.draw(surface, at) {
            error!("Render error: {:?}", e);
        }

        loop {
            let event = receiver.receive().await;
            let at = now();
            self.process_event(event, at);

            if self.visible && self.needs_redraw {
                if let Err(e) = self.draw(surface, at) {
                    error!("Render error: {:?}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendError;
    use crate::render::{DrawCommand, DrawList, SurfaceBounds};
    use crate::snapshot::{CalendarEvent, Datum, WeatherSnapshot, encode_calendar, encode_weather};
    use crate::transport::endpoint_id;
    use alloc::string::String;
    use alloc::vec;

    /// 2023-11-14 22:14:00 UTC
    const NOW: i64 = 1_700_000_040;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<DataKind>,
    }

    impl Transport for RecordingTransport {
        fn send_refresh_request(
            &mut self,
            _endpoint: &str,
            _path: &str,
            kind: DataKind,
        ) -> Result<(), SendError> {
            self.sent.push(kind);
            Ok(())
        }
    }

    fn at(offset_secs: i64) -> Instant {
        time::from_unix_secs(NOW + offset_secs).unwrap()
    }

    fn engine() -> Engine<'static, RecordingTransport> {
        Engine::new(Config::default(), RecordingTransport::default(), FaceStyle::default())
    }

    fn weather_bytes() -> Vec<u8> {
        encode_weather(&WeatherSnapshot {
            currently: Datum {
                time: NOW,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap()
    }

    fn calendar_bytes(begin_min: i64, end_min: i64) -> Vec<u8> {
        encode_calendar(&[CalendarEvent {
            title: String::from("Sync"),
            begin: (NOW + begin_min * 60) * 1000,
            end: (NOW + end_min * 60) * 1000,
        }])
        .unwrap()
    }

    fn surface() -> DrawList {
        DrawList::new(SurfaceBounds {
            width: 240,
            height: 240,
            cutout_bottom_inset: 0,
        })
    }

    #[test]
    fn test_reachability_then_gated_ticks() {
        let mut engine = engine();
        engine.process_event(EngineEvent::PeerReachabilityChanged(endpoint_id("phone")), at(0));
        assert_eq!(engine.transport().sent, vec![DataKind::Weather, DataKind::Calendar]);

        engine.process_event(EngineEvent::SendComplete(DataKind::Weather), at(1));
        engine.process_event(EngineEvent::SendComplete(DataKind::Calendar), at(1));
        engine.process_event(EngineEvent::WeatherPayload(weather_bytes()), at(2));
        engine.process_event(EngineEvent::CalendarPayload(calendar_bytes(120, 180)), at(2));

        engine.process_event(EngineEvent::Tick, at(60));
        assert_eq!(engine.transport().sent.len(), 2, "dry interactive waits five minutes");

        engine.process_event(EngineEvent::Tick, at(300));
        assert_eq!(engine.transport().sent.len(), 4);
    }

    #[test]
    fn test_missing_data_is_requested_on_tick() {
        let mut engine = engine();
        engine.process_event(EngineEvent::PeerReachabilityChanged(endpoint_id("phone")), at(0));
        engine.process_event(EngineEvent::SendComplete(DataKind::Weather), at(1));
        engine.process_event(EngineEvent::SendComplete(DataKind::Calendar), at(1));

        engine.process_event(EngineEvent::Tick, at(2));
        assert_eq!(engine.transport().sent.len(), 4, "nothing held yet");
    }

    #[test]
    fn test_malformed_payload_keeps_snapshot() {
        let mut engine = engine();
        engine.process_event(EngineEvent::WeatherPayload(weather_bytes()), at(0));
        engine.process_event(EngineEvent::WeatherPayload(vec![0xff, 0x01]), at(1));
        assert_eq!(engine.store().weather(at(2)).unwrap().currently_time(), NOW);
    }

    #[test]
    fn test_calendar_overlay_follows_active_set() {
        let mut engine = engine();
        engine.process_event(EngineEvent::CalendarPayload(calendar_bytes(30, 60)), at(0));
        assert!(engine.calendar_shown());

        let mut list = surface();
        engine.draw(&mut list, at(0)).unwrap();
        assert!(list.commands().iter().any(|c| matches!(c, DrawCommand::Text { .. })));

        // The event has ended an hour later
        engine.process_event(EngineEvent::Tick, at(3600));
        assert!(!engine.calendar_shown());
    }

    #[test]
    fn test_toggle_overrides_until_next_edge() {
        let mut engine = engine();
        engine.process_event(EngineEvent::CalendarPayload(calendar_bytes(30, 60)), at(0));
        engine.process_event(EngineEvent::ToggleCalendar, at(1));
        assert!(!engine.calendar_shown());

        engine.process_event(EngineEvent::Tick, at(2));
        assert!(!engine.calendar_shown(), "no edge, override holds");
    }

    #[test]
    fn test_redraw_flag() {
        let mut engine = engine();
        let mut list = surface();
        assert!(engine.needs_redraw());
        engine.draw(&mut list, at(0)).unwrap();
        assert!(!engine.needs_redraw());

        engine.process_event(EngineEvent::WeatherPayload(weather_bytes()), at(1));
        assert!(engine.needs_redraw());
        engine.draw(&mut list, at(1)).unwrap();

        engine.process_event(EngineEvent::ModeChanged(DisplayMode::Interactive), at(2));
        assert!(!engine.needs_redraw(), "unchanged mode");
        engine.process_event(EngineEvent::ModeChanged(DisplayMode::Ambient), at(2));
        assert!(engine.needs_redraw());
    }

    #[test]
    fn test_tick_period_follows_mode_and_visibility() {
        let mut engine = engine();
        assert_eq!(engine.tick_period(), Some(INTERACTIVE_TICK));

        engine.process_event(EngineEvent::ModeChanged(DisplayMode::Ambient), at(0));
        assert_eq!(engine.tick_period(), Some(AMBIENT_TICK));

        engine.process_event(EngineEvent::VisibilityChanged(false), at(0));
        assert_eq!(engine.tick_period(), None);
    }

    #[test]
    fn test_hidden_ticks_send_nothing() {
        let mut engine = engine();
        engine.process_event(EngineEvent::PeerReachabilityChanged(endpoint_id("phone")), at(0));
        engine.process_event(EngineEvent::SendComplete(DataKind::Weather), at(1));
        engine.process_event(EngineEvent::SendComplete(DataKind::Calendar), at(1));
        engine.process_event(EngineEvent::VisibilityChanged(false), at(2));

        engine.process_event(EngineEvent::Tick, at(3));
        assert_eq!(engine.transport().sent.len(), 2);
    }

    #[test]
    fn test_time_zone_change() {
        let mut engine = engine();
        engine.process_event(EngineEvent::TimeZoneChanged(-5 * 3600), at(0));
        assert_eq!(engine.clock().offset_secs(), -5 * 3600);
        assert_eq!(engine.clock().fields(at(0)).hour12, 5);
    }

    #[test]
    fn test_events_pass_through_channel() {
        let sender = get_engine_sender();
        let receiver = get_engine_receiver();
        sender.try_send(EngineEvent::ToggleCalendar).unwrap();

        let mut engine = engine();
        let event = receiver.try_receive().unwrap();
        engine.process_event(event, at(0));
        assert!(engine.calendar_shown());
    }

    #[test]
    fn test_run_drains_queued_events_then_waits() {
        use core::future::Future;
        use core::task::{Context, Waker};

        let channel: Channel<CriticalSectionRawMutex, EngineEvent, ENGINE_EVENT_CAPACITY> =
            Channel::new();
        channel
            .try_send(EngineEvent::ModeChanged(DisplayMode::Ambient))
            .unwrap();

        let mut engine = engine();
        let mut surface = surface();
        {
            let mut run = core::pin::pin!(engine.run(channel.receiver(), &mut surface, || at(0)));
            let mut cx = Context::from_waker(Waker::noop());
            assert!(run.as_mut().poll(&mut cx).is_pending());
        }

        assert_eq!(engine.mode(), DisplayMode::Ambient);
        let frames = surface
            .commands()
            .iter()
            .filter(|command| matches!(command, DrawCommand::Clear(_)))
            .count();
        assert_eq!(frames, 2, "initial frame plus the mode change");
    }

    #[test]
    fn test_tick_frame_is_reused_by_the_next_draw_only() {
        let mut engine = engine();
        let mut list = surface();

        engine.process_event(EngineEvent::Tick, at(0));
        assert!(engine.tick_frame.as_ref().is_some_and(|frame| frame.now == at(0)));
        engine.draw(&mut list, at(0)).unwrap();
        assert!(engine.tick_frame.is_none());

        // Any later event invalidates the tick's frame
        engine.process_event(EngineEvent::Tick, at(1));
        engine.process_event(EngineEvent::WeatherPayload(weather_bytes()), at(1));
        assert!(engine.tick_frame.is_none());
        assert!(engine.frame(at(1)).weather.is_some());
    }
}
