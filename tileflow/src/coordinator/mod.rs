//! Tile fetch coordination.
//!
//! ```text
//! caller ──request_tile──► TileFetchCoordinator ──issue_fetch──► NetworkClient
//!                               ▲      │
//!             NetworkEvent ─────┘      ├─ inline decode, or
//!                                      └─ DecodePool ──DecodeOutcome──┐
//!                                                                     │
//! caller ◄──────────── TileEvent (Ready / Failed) ◄── pump_decoded ◄──┘
//! ```
//!
//! The coordinator owns every [`TileFetchRequest`](crate::tile::TileFetchRequest)
//! it creates. Callers hold [`RequestHandle`]s, which stop resolving once the
//! request is evicted.

mod arena;
mod core;
mod events;
mod stats;

pub use self::core::TileFetchCoordinator;
pub use arena::RequestHandle;
pub use events::TileEvent;
pub use stats::CoordinatorStats;
