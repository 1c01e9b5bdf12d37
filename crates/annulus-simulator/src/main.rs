//! Desktop simulator for the annulus watch face.
//!
//! Renders the annulus-core engine in an SDL2 window via
//! `embedded-graphics-simulator`. A loopback transport answers every refresh
//! request with a synthetic weather or calendar snapshot, so the scheduler,
//! the overlays and the renderer can be exercised without a paired phone.
//!
//! # Key bindings
//!
//! | Key | Action                              |
//! |-----|-------------------------------------|
//! | A   | Toggle ambient mode                 |
//! | C   | Toggle calendar / day arcs          |
//! | P   | Toggle paired-device reachability   |
//! | H   | Hide / show the face                |
//! | Q   | Quit                                |
//!
//! Set `ANNULUS_UTC_OFFSET` (seconds) to run in another time zone.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{error, info, warn};

use annulus_core::render::GraphicsSurface;
use annulus_core::snapshot::{encode_calendar, encode_weather};
use annulus_core::style::FaceStyle;
use annulus_core::time::{self, Instant};
use annulus_core::transport::{PeerNode, endpoint_id, select_peer};
use annulus_core::{
    CalendarEvent, Config, DataKind, Datum, DisplayMode, Engine, EngineEvent, SendError,
    Transport, WeatherSnapshot,
};

// ---------------------------------------------------------------------------
// Display constants
// ---------------------------------------------------------------------------

const DISPLAY_SIZE_PX: u32 = 360;

/// Flat strip at the bottom of the simulated panel
const CUTOUT_BOTTOM_INSET_PX: u32 = 30;

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

/// Upper bound on one loop iteration, so key presses stay responsive in ambient mode
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Environment variable holding the UTC offset in seconds
const UTC_OFFSET_ENV: &str = "ANNULUS_UTC_OFFSET";

// ---------------------------------------------------------------------------
// Loopback link
// ---------------------------------------------------------------------------

/// Transport that queues requests for the simulator to answer
struct LoopbackTransport {
    pending: VecDeque<DataKind>,
}

impl LoopbackTransport {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl Transport for LoopbackTransport {
    fn send_refresh_request(
        &mut self,
        endpoint: &str,
        path: &str,
        kind: DataKind,
    ) -> Result<(), SendError> {
        info!("Loopback request {} to {}", path, endpoint);
        self.pending.push_back(kind);
        Ok(())
    }
}

/// Devices the simulated link advertises
fn simulated_peers() -> Vec<PeerNode> {
    ["relay-watch-cloud", "sim-phone"]
        .iter()
        .enumerate()
        .filter_map(|(i, id)| {
            Some(PeerNode {
                id: endpoint_id(id)?,
                nearby: i == 1,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Mock snapshots
// ---------------------------------------------------------------------------

/// Synthetic weather around `now`: a passing shower in the next hour,
/// drifting clouds and today's and tomorrow's sun times
fn mock_weather(now: Instant) -> WeatherSnapshot {
    let now_secs = now.timestamp();
    let minute_start = now_secs - now_secs.rem_euclid(60);
    let hour_start = now_secs - now_secs.rem_euclid(3600);
    let day_start = now_secs - now_secs.rem_euclid(86_400);

    let minutely = (0..61)
        .map(|i| {
            let t = i as f32 / 60.0;
            let shower = (t * core::f32::consts::PI * 1.5).sin().max(0.0);
            Datum {
                time: minute_start + i * 60,
                precip_intensity: Some(2.0 * shower),
                precip_probability: Some(0.4 + 0.5 * shower),
                ..Datum::default()
            }
        })
        .collect();

    let hourly = (0..48)
        .map(|i| {
            let t = i as f32;
            Datum {
                time: hour_start + i * 3600,
                precip_intensity: Some((0.8 * (t / 3.0).sin()).max(0.0)),
                precip_probability: Some(0.3 + 0.2 * (t / 5.0).cos()),
                cloud_cover: Some(0.5 + 0.5 * (t / 4.0).sin()),
                ..Datum::default()
            }
        })
        .collect();

    let daily = (0..2)
        .map(|i| {
            let day = day_start + i * 86_400;
            Datum {
                time: day,
                sunrise_time: Some(day + 6 * 3600 + 30 * 60),
                sunset_time: Some(day + 19 * 3600 + 15 * 60),
                ..Datum::default()
            }
        })
        .collect();

    WeatherSnapshot {
        currently: Datum {
            time: now_secs,
            precip_intensity: Some(0.0),
            precip_probability: Some(0.4),
            cloud_cover: Some(0.6),
            ..Datum::default()
        },
        minutely,
        hourly,
        daily,
    }
}

/// Two overlapping meetings starting in the next few minutes
fn mock_calendar(now: Instant) -> Vec<CalendarEvent> {
    let now_ms = now.timestamp_millis();
    vec![
        CalendarEvent {
            title: String::from("Standup (Standup)"),
            begin: now_ms + 5 * 60_000,
            end: now_ms + 20 * 60_000,
        },
        CalendarEvent {
            title: String::from("Design review with the hardware team (Review)"),
            begin: now_ms + 15 * 60_000,
            end: now_ms + 50 * 60_000,
        },
    ]
}

/// Answer one queued request with a fresh payload
fn answer_request(kind: DataKind, now: Instant) -> Option<EngineEvent> {
    let payload = match kind {
        DataKind::Weather => encode_weather(&mock_weather(now)).map(EngineEvent::WeatherPayload),
        DataKind::Calendar => {
            encode_calendar(&mock_calendar(now)).map(EngineEvent::CalendarPayload)
        }
    };
    match payload {
        Ok(event) => Some(event),
        Err(e) => {
            error!("Failed to encode {:?} payload: {:?}", kind, e);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> Instant {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    time::from_unix_secs(elapsed.as_secs() as i64).unwrap_or_default()
}

/// UTC offset from the environment, falling back to UTC
fn utc_offset_from_env() -> i32 {
    let Ok(raw) = std::env::var(UTC_OFFSET_ENV) else {
        return 0;
    };
    match raw.trim().parse::<i32>() {
        Ok(seconds) => seconds,
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", UTC_OFFSET_ENV, raw, e);
            0
        }
    }
}

fn load_config() -> Config<'static> {
    let config = Config {
        utc_offset_secs: utc_offset_from_env(),
        ..Config::default()
    };
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            warn!("Invalid configuration, using defaults: {}", e);
            Config::default()
        }
    }
}

/// Map an SDL keycode to an engine event
fn keycode_to_event(
    keycode: Keycode,
    engine: &Engine<'_, LoopbackTransport>,
    peer_reachable: &mut bool,
) -> Option<EngineEvent> {
    match keycode {
        Keycode::A => Some(EngineEvent::ModeChanged(match engine.mode() {
            DisplayMode::Interactive => DisplayMode::Ambient,
            DisplayMode::Ambient => DisplayMode::Interactive,
        })),
        Keycode::C => Some(EngineEvent::ToggleCalendar),
        Keycode::H => Some(EngineEvent::VisibilityChanged(!engine.is_visible())),
        Keycode::P => {
            *peer_reachable = !*peer_reachable;
            let peer = if *peer_reachable {
                select_peer(&simulated_peers()).map(|node| node.id.clone())
            } else {
                None
            };
            Some(EngineEvent::PeerReachabilityChanged(peer))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting annulus simulator");
    info!(
        "Display: {}×{} (cutout {}, scale {}×)",
        DISPLAY_SIZE_PX, DISPLAY_SIZE_PX, CUTOUT_BOTTOM_INSET_PX, WINDOW_SCALE
    );
    info!("Keys: A=Ambient  C=Calendar  P=Peer  H=Hide  Q=Quit");

    let mut display =
        SimulatorDisplay::<Rgb565>::new(Size::new(DISPLAY_SIZE_PX, DISPLAY_SIZE_PX));
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Annulus Simulator", &output_settings);

    let mut engine = Engine::new(load_config(), LoopbackTransport::new(), FaceStyle::default());
    let mut inbox: VecDeque<EngineEvent> = VecDeque::new();

    // The phone is reachable from the start
    let mut peer_reachable = true;
    inbox.push_back(EngineEvent::PeerReachabilityChanged(
        select_peer(&simulated_peers()).map(|node| node.id.clone()),
    ));

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    if let Err(e) = engine.draw(
        &mut GraphicsSurface::new(&mut display, CUTOUT_BOTTOM_INSET_PX),
        now(),
    ) {
        error!("Draw error: {:?}", e);
    }
    window.update(&display);

    let mut last_tick = now();

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    'running: loop {
        let frame_start = std::time::Instant::now();

        // --- SDL events ---------------------------------------------------
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,
                SimulatorEvent::KeyDown { keycode, .. } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                    if let Some(event) = keycode_to_event(keycode, &engine, &mut peer_reachable)
                    {
                        info!("Key {:?} → {:?}", keycode, event);
                        inbox.push_back(event);
                    }
                }
                _ => {}
            }
        }

        // --- Timer --------------------------------------------------------
        let current = now();
        if let Some(period) = engine.tick_period() {
            if current - last_tick >= period {
                inbox.push_back(EngineEvent::Tick);
                last_tick = current;
            }
        }

        // --- Engine -------------------------------------------------------
        while let Some(event) = inbox.pop_front() {
            engine.process_event(event, current);

            // Answer whatever the engine just asked for
            let requests: Vec<DataKind> = engine.transport_mut().pending.drain(..).collect();
            for kind in requests {
                inbox.push_back(EngineEvent::SendComplete(kind));
                if let Some(payload) = answer_request(kind, current) {
                    inbox.push_back(payload);
                }
            }
        }

        // --- Render -------------------------------------------------------
        if engine.is_visible() && engine.needs_redraw() {
            let mut surface = GraphicsSurface::new(&mut display, CUTOUT_BOTTOM_INSET_PX);
            if let Err(e) = engine.draw(&mut surface, current) {
                error!("Draw error: {:?}", e);
            }
        }

        window.update(&display);

        // --- Frame pacing -------------------------------------------------
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!("Simulator exiting");
}
