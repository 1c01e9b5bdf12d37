//! Adaptive refresh scheduler
//!
//! Decides when to ask the paired device for new snapshots. Each data kind has
//! its own `Idle` / `RequestInFlight` state; the two never block each other.
//!
//! | condition                  | minimum gap | extra gate          |
//! |----------------------------|-------------|---------------------|
//! | no fresh data held         | 0           |                     |
//! | interactive, imminent rain | 1 min       |                     |
//! | interactive, dry           | 5 min       |                     |
//! | ambient, imminent rain     | 3 min       | minute % 5 <= 1     |
//! | ambient, dry               | 10 min      | minute % 20 < 4     |
//!
//! Requests carry no id. A reply may arrive after the in-flight flag has
//! already cleared, or never; both are accepted and simply show up as a newer
//! snapshot on a later frame.

use chrono::TimeDelta;
use log::{debug, error, info};

use crate::config::LinkConfig;
use crate::time::{self, Instant, WallClock};
use crate::transport::{DataKind, EndpointId, Transport};

/// A request older than this no longer blocks the next one
pub const IN_FLIGHT_TIMEOUT: TimeDelta = TimeDelta::seconds(30);

/// Display power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Full-rate rendering
    #[default]
    Interactive,
    /// Low-power periodic redraw
    Ambient,
}

/// Request state of one data kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    RequestInFlight {
        since: Instant,
    },
}

/// Only allow requests when `minute % modulus < below`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteGate {
    pub modulus: u32,
    pub below: u32,
}

impl MinuteGate {
    pub fn is_open(&self, minute: u32) -> bool {
        minute % self.modulus < self.below
    }
}

/// Minimum gap and optional gate for one row of the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub min_gap: TimeDelta,
    pub gate: Option<MinuteGate>,
}

impl RefreshPolicy {
    /// Policy for a kind whose data is already held
    pub fn for_mode(mode: DisplayMode, imminent: bool) -> Self {
        match (mode, imminent) {
            (DisplayMode::Interactive, true) => Self {
                min_gap: time::minutes(1),
                gate: None,
            },
            (DisplayMode::Interactive, false) => Self {
                min_gap: time::minutes(5),
                gate: None,
            },
            (DisplayMode::Ambient, true) => Self {
                min_gap: time::minutes(3),
                gate: Some(MinuteGate {
                    modulus: 5,
                    below: 2,
                }),
            },
            (DisplayMode::Ambient, false) => Self {
                min_gap: time::minutes(10),
                gate: Some(MinuteGate {
                    modulus: 20,
                    below: 4,
                }),
            },
        }
    }

    /// Policy when nothing usable is held yet
    pub const fn immediate() -> Self {
        Self {
            min_gap: TimeDelta::zero(),
            gate: None,
        }
    }
}

/// What the scheduler needs to know about the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshInputs {
    pub mode: DisplayMode,
    /// Rain is imminent within the hour
    pub imminent: bool,
    /// A fresh weather snapshot is held
    pub has_weather: bool,
    /// A calendar snapshot is held
    pub has_calendar: bool,
}

impl RefreshInputs {
    fn has(&self, kind: DataKind) -> bool {
        match kind {
            DataKind::Weather => self.has_weather,
            DataKind::Calendar => self.has_calendar,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct KindState {
    state: RequestState,
    last_request_at: Option<Instant>,
}

/// Per-kind request state plus the current paired device
#[derive(Debug, Clone, Default)]
pub struct RefreshScheduler {
    endpoint: Option<EndpointId>,
    kinds: [KindState; 2],
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn state(&self, kind: DataKind) -> RequestState {
        self.kinds[kind.index()].state
    }

    pub fn last_request_at(&self, kind: DataKind) -> Option<Instant> {
        self.kinds[kind.index()].last_request_at
    }

    /// Whether `kind` should be requested at `now`
    pub fn is_due(&self, kind: DataKind, inputs: &RefreshInputs, now: Instant, minute: u32) -> bool {
        let kind_state = &self.kinds[kind.index()];

        if let RequestState::RequestInFlight { since } = kind_state.state {
            if now - since < IN_FLIGHT_TIMEOUT {
                debug!("{:?} request still in flight", kind);
                return false;
            }
        }

        let policy = if inputs.has(kind) {
            RefreshPolicy::for_mode(inputs.mode, inputs.imminent)
        } else {
            RefreshPolicy::immediate()
        };

        if let Some(last) = kind_state.last_request_at {
            if now - last < policy.min_gap {
                return false;
            }
        }

        match policy.gate {
            Some(gate) if !gate.is_open(minute) => {
                debug!("{:?} refresh gated at minute {}", kind, minute);
                false
            }
            _ => true,
        }
    }

    /// Run the policy for both kinds and send whatever is due
    ///
    /// Returns the kinds a request was sent for.
    pub fn evaluate<T: Transport>(
        &mut self,
        transport: &mut T,
        link: &LinkConfig<'_>,
        inputs: &RefreshInputs,
        now: Instant,
        clock: &WallClock,
    ) -> heapless::Vec<DataKind, 2> {
        let mut sent = heapless::Vec::new();
        if self.endpoint.is_none() {
            return sent;
        }

        let minute = clock.fields(now).minute;
        for kind in DataKind::ALL {
            if self.is_due(kind, inputs, now, minute) && self.send(transport, link, kind, now) {
                sent.push(kind).ok();
            }
        }
        sent
    }

    /// React to the paired device appearing, changing or disappearing
    ///
    /// A new device gets both kinds requested straight away, whatever the
    /// policy says.
    pub fn on_reachability_changed<T: Transport>(
        &mut self,
        endpoint: Option<EndpointId>,
        transport: &mut T,
        link: &LinkConfig<'_>,
        now: Instant,
    ) -> heapless::Vec<DataKind, 2> {
        let mut sent = heapless::Vec::new();
        match endpoint {
            None => {
                if self.endpoint.take().is_some() {
                    info!("Paired device unreachable");
                }
            }
            Some(endpoint) if self.endpoint.as_ref() == Some(&endpoint) => {
                debug!("Paired device {} unchanged", endpoint);
            }
            Some(endpoint) => {
                info!("Paired device reachable: {}", endpoint);
                self.endpoint = Some(endpoint);
                for kind in DataKind::ALL {
                    if self.send(transport, link, kind, now) {
                        sent.push(kind).ok();
                    }
                }
            }
        }
        sent
    }

    /// The link has finished with the last request of `kind`
    pub fn on_send_complete(&mut self, kind: DataKind) {
        self.kinds[kind.index()].state = RequestState::Idle;
    }

    fn send<T: Transport>(
        &mut self,
        transport: &mut T,
        link: &LinkConfig<'_>,
        kind: DataKind,
        now: Instant,
    ) -> bool {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return false;
        };
        let kind_state = &mut self.kinds[kind.index()];

        match transport.send_refresh_request(endpoint, kind.path(link), kind) {
            Ok(()) => {
                info!("Requested {:?} refresh from {}", kind, endpoint);
                kind_state.state = RequestState::RequestInFlight { since: now };
                kind_state.last_request_at = Some(now);
                true
            }
            Err(e) => {
                error!("{:?} refresh request failed: {}", kind, e);
                kind_state.state = RequestState::Idle;
                false
            }
        }
    }
}
