//! Presentation collaborator beneath the compositor surface.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tiny_skia::Pixmap;

use super::error::PresentError;
use super::geometry::SurfaceSize;
use super::pixels::pixmap_to_rgba;

/// Identifies a backbuffer allocated by a [`Presenter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackbufferHandle(u64);

impl BackbufferHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BackbufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Identifies one present. Acknowledged later through
/// [`CompositorSurface::on_swap_complete`](super::CompositorSurface::on_swap_complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwapToken(u64);

impl SwapToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SwapToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swap#{}", self.0)
    }
}

/// The windowing or GPU layer that actually shows frames.
///
/// `present` returns at once; completion is acknowledged asynchronously by
/// the host feeding the token back to the surface.
pub trait Presenter: Send {
    /// Reserve presentation resources for a backbuffer of `size`.
    fn allocate_backbuffer(&mut self, size: SurfaceSize) -> Result<BackbufferHandle, PresentError>;

    /// Give back a backbuffer's resources.
    fn release_backbuffer(&mut self, handle: BackbufferHandle);

    /// Present the contents of `frame`, drawn into backbuffer `handle`.
    fn present(&mut self, handle: BackbufferHandle, frame: &Pixmap) -> Result<SwapToken, PresentError>;
}

/// A frame captured by [`OffscreenPresenter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedFrame {
    pub token: SwapToken,
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8.
    pub pixels: Vec<u8>,
}

#[derive(Debug, Default)]
struct OffscreenInner {
    next_backbuffer: u64,
    next_swap: u64,
    live: Vec<BackbufferHandle>,
    allocations: usize,
    last_frame: Option<PresentedFrame>,
    unacked: Vec<SwapToken>,
}

/// In-memory presenter.
///
/// Keeps the most recent frame and queues swap acknowledgements until the
/// host collects them with [`take_acks`](Self::take_acks). Clones share state,
/// so one clone can be handed to the surface and another kept for reading.
#[derive(Debug, Clone, Default)]
pub struct OffscreenPresenter {
    inner: Arc<Mutex<OffscreenInner>>,
}

impl OffscreenPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently presented frame.
    pub fn last_frame(&self) -> Option<PresentedFrame> {
        self.inner.lock().last_frame.clone()
    }

    /// Drain pending swap acknowledgements, oldest first.
    pub fn take_acks(&self) -> Vec<SwapToken> {
        std::mem::take(&mut self.inner.lock().unacked)
    }

    /// Backbuffers currently allocated.
    pub fn live_backbuffers(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Total allocations made so far.
    pub fn allocations(&self) -> usize {
        self.inner.lock().allocations
    }
}

impl Presenter for OffscreenPresenter {
    fn allocate_backbuffer(&mut self, size: SurfaceSize) -> Result<BackbufferHandle, PresentError> {
        if !size.is_valid() {
            return Err(PresentError::Allocation(format!("empty size {}", size)));
        }
        let mut inner = self.inner.lock();
        inner.next_backbuffer += 1;
        let handle = BackbufferHandle::new(inner.next_backbuffer);
        inner.live.push(handle);
        inner.allocations += 1;
        Ok(handle)
    }

    fn release_backbuffer(&mut self, handle: BackbufferHandle) {
        self.inner.lock().live.retain(|h| *h != handle);
    }

    fn present(&mut self, handle: BackbufferHandle, frame: &Pixmap) -> Result<SwapToken, PresentError> {
        let mut inner = self.inner.lock();
        if !inner.live.contains(&handle) {
            return Err(PresentError::UnknownBackbuffer(handle));
        }
        inner.next_swap += 1;
        let token = SwapToken::new(inner.next_swap);
        inner.last_frame = Some(PresentedFrame {
            token,
            width: frame.width(),
            height: frame.height(),
            pixels: pixmap_to_rgba(frame),
        });
        inner.unacked.push(token);
        Ok(token)
    }
}
