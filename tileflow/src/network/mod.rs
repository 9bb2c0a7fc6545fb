//! Network collaborator abstraction.
//!
//! The coordinator never performs I/O itself. It talks to a [`NetworkClient`]
//! that starts transfers without blocking and later reports their outcome as
//! [`NetworkEvent`]s. The owner of the coordinator drains those events on the
//! coordinator's thread and hands them to
//! [`TileFetchCoordinator::handle_network_event`](crate::coordinator::TileFetchCoordinator::handle_network_event).
//!
//! ```text
//! ┌──────────────────────┐  issue_fetch / abort  ┌──────────────────────┐
//! │ TileFetchCoordinator │ ────────────────────► │    NetworkClient     │
//! │   (owning thread)    │                       │ (ReqwestNetwork,     │
//! │                      │ ◄──────────────────── │  RecordingNetwork)   │
//! └──────────────────────┘     NetworkEvent      └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tileflow::network::{ReqwestNetwork, TileSource};
//! use std::time::Duration;
//!
//! let (network, mut events) = ReqwestNetwork::new(runtime.handle().clone(), Duration::from_secs(30))?;
//! // hand `network` to a coordinator, then:
//! while let Some(event) = events.recv().await {
//!     coordinator.handle_network_event(event);
//! }
//! ```

mod client;
mod http;
mod source;
mod types;

pub use client::{NetworkClient, RecordingNetwork};
pub use http::{ReqwestNetwork, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_TRANSFER_TIMEOUT_SECS};
pub use source::{TileSource, DEFAULT_IMAGE_FORMAT, DEFAULT_URL_TEMPLATE};
pub use types::{NetworkError, NetworkErrorCode, NetworkEvent, TransferId};
