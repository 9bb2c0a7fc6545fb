//! Tile identity and per-fetch request state.
//!
//! - [`TileSpec`] identifies a tile (map, zoom, column, row)
//! - [`TileFetchRequest`] tracks one fetch attempt through
//!   `Pending → Finished | Errored`
//! - [`FetchErrorKind`] classifies why a fetch produced no image

mod error;
mod request;
mod spec;

pub use error::FetchErrorKind;
pub use request::{FetchState, TileFetchRequest};
pub use spec::TileSpec;
