//! Frame compositing and presentation.
//!
//! A [`CompositorSurface`] owns one backbuffer (a tiny-skia pixmap), accepts
//! decoded tiles into it and hands finished frames to a [`Presenter`]. The
//! presenter is the seam to whatever actually shows pixels; the
//! [`OffscreenPresenter`] keeps frames in memory for tests and the CLI.
//!
//! ```text
//! DecodedTile ──draw_tile──► CompositorSurface ──present──► Presenter
//!                                 ▲      │                     │
//!                 on_swap_complete│      └──► SwapEvent        │
//!                                 └────────── SwapToken ◄──────┘
//! ```

mod compositor;
mod error;
mod geometry;
mod pixels;
mod presenter;
mod state;

pub use compositor::{CompositorSurface, SwapEvent};
pub use error::{PresentError, SurfaceError};
pub use geometry::{DestRect, SurfaceSize};
pub use presenter::{BackbufferHandle, OffscreenPresenter, PresentedFrame, Presenter, SwapToken};
pub use state::SurfaceState;
