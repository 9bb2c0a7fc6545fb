//! Events emitted by the coordinator.

use crate::decode::DecodedTile;
use crate::tile::{FetchErrorKind, TileSpec};

/// Outcome notifications delivered to the coordinator's owner.
///
/// Exactly one event is emitted per request that ends in success or a
/// caller-visible failure. Cancelled requests emit nothing.
#[derive(Debug)]
pub enum TileEvent {
    /// The tile was fetched and decoded. The tile is moved to the receiver.
    Ready { spec: TileSpec, tile: DecodedTile },
    /// The fetch or decode failed. Never carries `FetchErrorKind::Cancelled`.
    Failed {
        spec: TileSpec,
        kind: FetchErrorKind,
        message: String,
    },
}

impl TileEvent {
    /// The tile this event is about.
    pub fn spec(&self) -> TileSpec {
        match self {
            TileEvent::Ready { spec, .. } | TileEvent::Failed { spec, .. } => *spec,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TileEvent::Ready { .. })
    }
}
