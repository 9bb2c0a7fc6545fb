//! Tileflow - asynchronous tiled map fetch, decode and composite pipeline.
//!
//! The pipeline has three stages:
//!
//! 1. [`tile::TileFetchRequest`] tracks one network fetch for one tile.
//! 2. [`coordinator::TileFetchCoordinator`] issues fetches, de-duplicates
//!    them, decodes payloads and reports each outcome exactly once as a
//!    [`coordinator::TileEvent`].
//! 3. [`surface::CompositorSurface`] composites decoded tiles into a
//!    backbuffer and presents it, tracking the Active / Suspended /
//!    Discarded lifecycle.
//!
//! Network, decoding and presentation sit behind the
//! [`network::NetworkClient`], [`decode::TileDecoder`] and
//! [`surface::Presenter`] traits.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tileflow::coordinator::{TileEvent, TileFetchCoordinator};
//! use tileflow::decode::ImageTileDecoder;
//! use tileflow::network::{NetworkErrorCode, RecordingNetwork, TileSource};
//! use tileflow::tile::{FetchErrorKind, TileSpec};
//!
//! let network = RecordingNetwork::new();
//! let (mut coordinator, mut events) = TileFetchCoordinator::new(
//!     Box::new(network.clone()),
//!     TileSource::default(),
//!     Arc::new(ImageTileDecoder::new()),
//! );
//!
//! let spec = TileSpec::new(1, 3, 2, 5);
//! coordinator.request_tile(spec);
//! coordinator.request_tile(spec); // joins the pending fetch
//! assert_eq!(network.issued_count(), 1);
//!
//! let transfer = network.last_transfer().unwrap();
//! coordinator.on_network_error(transfer, NetworkErrorCode::Timeout);
//! match events.try_recv().unwrap() {
//!     TileEvent::Failed { kind, .. } => assert_eq!(kind, FetchErrorKind::Communication),
//!     TileEvent::Ready { .. } => unreachable!(),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod decode;
pub mod logging;
pub mod network;
pub mod surface;
pub mod tile;
