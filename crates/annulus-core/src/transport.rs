//! Boundary to the link with the paired device
//!
//! The engine never talks to the radio directly. It asks a [`Transport`] to
//! send zero-payload refresh requests; snapshots come back later as engine
//! events, with no correlation to the request that caused them.

use crate::config::LinkConfig;
use crate::error::SendError;

/// Maximum length of a paired-device id
pub const ENDPOINT_ID_CAPACITY: usize = 48;

/// Identifier of a paired device on the link
pub type EndpointId = heapless::String<ENDPOINT_ID_CAPACITY>;

/// Kind of snapshot a refresh request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Weather,
    Calendar,
}

impl DataKind {
    pub const ALL: [DataKind; 2] = [DataKind::Weather, DataKind::Calendar];

    /// Message path used for this kind
    pub fn path<'a>(self, link: &LinkConfig<'a>) -> &'a str {
        match self {
            DataKind::Weather => link.weather_path,
            DataKind::Calendar => link.calendar_path,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            DataKind::Weather => 0,
            DataKind::Calendar => 1,
        }
    }
}

/// A device advertising the snapshot capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerNode {
    pub id: EndpointId,
    /// Directly connected rather than reached through a relay
    pub nearby: bool,
}

/// Pick the device to send requests to
///
/// Nearby devices win; ties go to the smallest id.
pub fn select_peer(nodes: &[PeerNode]) -> Option<&PeerNode> {
    nodes
        .iter()
        .min_by(|a, b| b.nearby.cmp(&a.nearby).then_with(|| a.id.cmp(&b.id)))
}

/// Build an endpoint id, rejecting ids that do not fit
pub fn endpoint_id(id: &str) -> Option<EndpointId> {
    EndpointId::try_from(id).ok()
}

/// Outbound side of the link
pub trait Transport {
    /// Send an empty request on `path` to `endpoint`
    ///
    /// Returning `Ok` only means the request left; completion is reported
    /// later through [`crate::EngineEvent::SendComplete`].
    fn send_refresh_request(
        &mut self,
        endpoint: &str,
        path: &str,
        kind: DataKind,
    ) -> Result<(), SendError>;
}
