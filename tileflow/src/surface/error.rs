//! Error types for the compositor surface.

use thiserror::Error;

use super::presenter::BackbufferHandle;
use super::state::SurfaceState;

/// Failures reported by the presentation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentError {
    #[error("Backbuffer allocation failed: {0}")]
    Allocation(String),

    #[error("Unknown backbuffer {0}")]
    UnknownBackbuffer(BackbufferHandle),

    #[error("Present failed: {0}")]
    Rejected(String),
}

/// Errors from [`CompositorSurface`](super::CompositorSurface) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The operation is not allowed in the current state. Indicates a caller bug.
    #[error("{op} is invalid while the surface is {state}")]
    InvalidState {
        op: &'static str,
        state: SurfaceState,
    },

    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Tile buffer does not match its {width}x{height} dimensions")]
    InvalidTile { width: u32, height: u32 },

    #[error(transparent)]
    Present(#[from] PresentError),
}
