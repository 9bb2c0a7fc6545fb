//! Surface lifecycle state.

use std::fmt;

/// Backbuffer lifecycle of a [`CompositorSurface`](super::CompositorSurface).
///
/// ```text
///            set_visible(false)
///   Active ─────────────────────► Suspended
///     ▲   ◄─────────────────────     │
///     │      set_visible(true)       │
///     │                              │ discard_backbuffer
///     │ ensure_backbuffer            ▼
///     └───────────────────────── Discarded ◄── (from Active too)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceState {
    /// Backbuffer exists and may be drawn and swapped.
    #[default]
    Active,
    /// Backbuffer retained; draws and swaps are refused.
    Suspended,
    /// Backbuffer freed; `ensure_backbuffer` is required before drawing.
    Discarded,
}

impl SurfaceState {
    /// Whether draws and swaps are honored in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, SurfaceState::Active)
    }
}

impl fmt::Display for SurfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceState::Active => write!(f, "active"),
            SurfaceState::Suspended => write!(f, "suspended"),
            SurfaceState::Discarded => write!(f, "discarded"),
        }
    }
}
