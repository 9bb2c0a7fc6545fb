//! The compositor surface.

use std::collections::HashSet;
use std::sync::Arc;

use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::error::SurfaceError;
use super::geometry::{DestRect, SurfaceSize};
use super::pixels::{pixmap_from_rgba, pixmap_to_rgba};
use super::presenter::{BackbufferHandle, Presenter, SwapToken};
use super::state::SurfaceState;
use crate::cache::PurgeableCache;
use crate::decode::DecodedTile;
use crate::tile::TileSpec;

/// Notification sent to swap subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapEvent {
    /// A frame was handed to the presenter. `frame` counts from 1.
    Presented { token: SwapToken, frame: u64 },
    /// The presenter acknowledged a swap.
    Completed { token: SwapToken },
}

struct Backbuffer {
    handle: BackbufferHandle,
    pixmap: Pixmap,
}

/// Owns a backbuffer, composites decoded tiles into it and presents it.
///
/// See [`SurfaceState`] for the lifecycle. Drawing and swapping are only
/// honored while `Active`; calling them in any other state is a caller bug
/// and yields [`SurfaceError::InvalidState`] without touching the backbuffer.
pub struct CompositorSurface {
    presenter: Box<dyn Presenter>,
    size: SurfaceSize,
    state: SurfaceState,
    visible: bool,
    backbuffer: Option<Backbuffer>,
    background: Color,
    cache: Option<Arc<dyn PurgeableCache>>,
    /// Tiles drawn into the backbuffer since it was last cleared.
    frame_specs: HashSet<TileSpec>,
    /// Tiles in the most recently presented frame.
    presented_specs: HashSet<TileSpec>,
    pending_swaps: HashSet<SwapToken>,
    listeners: Vec<mpsc::UnboundedSender<SwapEvent>>,
    frames_presented: u64,
}

impl CompositorSurface {
    /// Create a visible, `Active` surface with a freshly allocated backbuffer.
    pub fn new(presenter: Box<dyn Presenter>, size: SurfaceSize) -> Result<Self, SurfaceError> {
        let mut surface = Self {
            presenter,
            size,
            state: SurfaceState::Active,
            visible: true,
            backbuffer: None,
            background: Color::TRANSPARENT,
            cache: None,
            frame_specs: HashSet::new(),
            presented_specs: HashSet::new(),
            pending_swaps: HashSet::new(),
            listeners: Vec::new(),
            frames_presented: 0,
        };
        surface.backbuffer = Some(surface.allocate()?);
        info!(size = %size, "Compositor surface created");
        Ok(surface)
    }

    /// Decode cache to purge when the surface is hidden.
    pub fn with_cache(mut self, cache: Arc<dyn PurgeableCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Colour that fresh and cleared backbuffers are filled with.
    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
        if let Some(backbuffer) = self.backbuffer.as_mut() {
            backbuffer.pixmap.fill(self.background);
        }
        self
    }

    // =========================================================================
    // Backbuffer lifecycle
    // =========================================================================

    /// Make the surface drawable again.
    ///
    /// Allocates a cleared backbuffer if none is held, then goes `Active`.
    /// Contents do not survive a discard.
    pub fn ensure_backbuffer(&mut self) -> Result<(), SurfaceError> {
        if self.state.is_active() {
            return Ok(());
        }
        if self.backbuffer.is_none() {
            self.backbuffer = Some(self.allocate()?);
            self.frame_specs.clear();
        }
        let previous = self.state;
        self.state = SurfaceState::Active;
        info!(from = %previous, "Backbuffer ensured");
        Ok(())
    }

    /// Free the backbuffer. Valid from any state.
    pub fn discard_backbuffer(&mut self) {
        if let Some(backbuffer) = self.backbuffer.take() {
            self.presenter.release_backbuffer(backbuffer.handle);
            info!(backbuffer = %backbuffer.handle, from = %self.state, "Backbuffer discarded");
        }
        self.state = SurfaceState::Discarded;
        self.frame_specs.clear();
        self.presented_specs.clear();
        // Acks for frames of the freed buffer are no longer expected.
        self.pending_swaps.clear();
    }

    /// Whether a backbuffer must be ensured before drawing.
    pub fn needs_backbuffer(&self) -> bool {
        self.backbuffer.is_none()
    }

    /// Low-memory signal from the host: drop the backbuffer and every cached tile.
    pub fn on_memory_pressure(&mut self) {
        warn!("Memory pressure, releasing surface resources");
        self.discard_backbuffer();
        self.purge_cache(&HashSet::new());
    }

    /// Change the backbuffer size. A held backbuffer is reallocated and cleared.
    pub fn resize(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        if !size.is_valid() {
            return Err(SurfaceError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        if size == self.size {
            return Ok(());
        }

        let previous = self.size;
        self.size = size;
        if let Some(old) = self.backbuffer.take() {
            self.presenter.release_backbuffer(old.handle);
            self.frame_specs.clear();
            match self.allocate() {
                Ok(backbuffer) => self.backbuffer = Some(backbuffer),
                Err(e) => {
                    self.state = SurfaceState::Discarded;
                    return Err(e);
                }
            }
        }
        debug!(from = %previous, to = %size, "Surface resized");
        Ok(())
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Host window visibility changed.
    ///
    /// Hiding suspends an active surface and purges cached tiles that are not
    /// part of the visible frame. Showing resumes a suspended surface with its
    /// contents intact; a surface discarded while hidden stays `Discarded`.
    pub fn set_visible(&mut self, visible: bool) {
        let was_visible = self.visible;
        self.visible = visible;

        if !visible {
            if self.state == SurfaceState::Active {
                self.state = SurfaceState::Suspended;
                debug!("Surface suspended");
            }
            if was_visible {
                let keep: HashSet<TileSpec> = self
                    .frame_specs
                    .union(&self.presented_specs)
                    .copied()
                    .collect();
                self.purge_cache(&keep);
            }
            return;
        }

        match self.state {
            SurfaceState::Suspended => {
                self.state = SurfaceState::Active;
                debug!("Surface resumed");
            }
            SurfaceState::Discarded => {
                debug!("Surface shown without a backbuffer, ensure_backbuffer required");
            }
            SurfaceState::Active => {}
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Composite `tile` into the backbuffer, scaled to `dest`.
    ///
    /// The tile is consumed whether or not the draw succeeds.
    pub fn draw_tile(&mut self, tile: DecodedTile, dest: DestRect) -> Result<(), SurfaceError> {
        self.check_active("draw_tile")?;
        let spec = tile.spec();
        if !dest.intersects(self.size) {
            trace!(tile = %spec, "Tile outside the surface, skipped");
            return Ok(());
        }

        let source = pixmap_from_rgba(tile.width(), tile.height(), tile.pixels()).ok_or(
            SurfaceError::InvalidTile {
                width: tile.width(),
                height: tile.height(),
            },
        )?;
        let scale_x = dest.width as f32 / tile.width() as f32;
        let scale_y = dest.height as f32 / tile.height() as f32;
        let quality = if dest.width == tile.width() && dest.height == tile.height() {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        };
        let paint = PixmapPaint {
            quality,
            ..PixmapPaint::default()
        };
        let transform =
            Transform::from_scale(scale_x, scale_y).post_translate(dest.x as f32, dest.y as f32);

        let Some(backbuffer) = self.backbuffer.as_mut() else {
            return Err(self.invalid_state("draw_tile"));
        };
        backbuffer
            .pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
        self.frame_specs.insert(spec);
        trace!(tile = %spec, x = dest.x, y = dest.y, "Tile drawn");
        Ok(())
    }

    /// Fill the backbuffer with the background colour.
    pub fn clear(&mut self) -> Result<(), SurfaceError> {
        self.check_active("clear")?;
        let background = self.background;
        let Some(backbuffer) = self.backbuffer.as_mut() else {
            return Err(self.invalid_state("clear"));
        };
        backbuffer.pixmap.fill(background);
        self.frame_specs.clear();
        Ok(())
    }

    /// Present the backbuffer.
    ///
    /// Subscribers get `SwapEvent::Presented` now and `SwapEvent::Completed`
    /// when the presenter's acknowledgement is fed to
    /// [`on_swap_complete`](Self::on_swap_complete).
    pub fn swap_buffers(&mut self) -> Result<SwapToken, SurfaceError> {
        self.check_active("swap_buffers")?;
        let Some(backbuffer) = self.backbuffer.as_ref() else {
            return Err(self.invalid_state("swap_buffers"));
        };
        let token = self.presenter.present(backbuffer.handle, &backbuffer.pixmap)?;

        self.pending_swaps.insert(token);
        self.presented_specs = self.frame_specs.clone();
        self.frames_presented += 1;
        debug!(%token, frame = self.frames_presented, tiles = self.presented_specs.len(), "Frame presented");
        self.notify(SwapEvent::Presented {
            token,
            frame: self.frames_presented,
        });
        Ok(token)
    }

    /// Presenter acknowledged `token`.
    ///
    /// Unknown or late acknowledgements, such as those arriving after a
    /// discard, are ignored. Returns whether the token was pending.
    pub fn on_swap_complete(&mut self, token: SwapToken) -> bool {
        if !self.pending_swaps.remove(&token) {
            debug!(%token, "Ignoring unexpected swap acknowledgement");
            return false;
        }
        trace!(%token, "Swap complete");
        self.notify(SwapEvent::Completed { token });
        true
    }

    /// Receive swap notifications. Dropping the receiver unsubscribes.
    pub fn subscribe_swaps(&mut self) -> mpsc::UnboundedReceiver<SwapEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Swaps presented but not yet acknowledged.
    pub fn pending_swaps(&self) -> usize {
        self.pending_swaps.len()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Tiles drawn into the backbuffer since it was last cleared.
    pub fn drawn_tiles(&self) -> &HashSet<TileSpec> {
        &self.frame_specs
    }

    /// Straight-alpha RGBA8 of one backbuffer pixel.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let pixel = self.backbuffer.as_ref()?.pixmap.pixel(x, y)?.demultiply();
        Some([pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()])
    }

    /// Copy of the whole backbuffer as straight-alpha RGBA8.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.backbuffer
            .as_ref()
            .map(|backbuffer| pixmap_to_rgba(&backbuffer.pixmap))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn allocate(&mut self) -> Result<Backbuffer, SurfaceError> {
        let invalid = SurfaceError::InvalidSize {
            width: self.size.width,
            height: self.size.height,
        };
        if !self.size.is_valid() {
            return Err(invalid);
        }
        let Some(mut pixmap) = Pixmap::new(self.size.width, self.size.height) else {
            return Err(invalid);
        };
        let handle = self.presenter.allocate_backbuffer(self.size)?;
        pixmap.fill(self.background);
        debug!(backbuffer = %handle, size = %self.size, "Backbuffer allocated");
        Ok(Backbuffer { handle, pixmap })
    }

    fn check_active(&self, op: &'static str) -> Result<(), SurfaceError> {
        if self.state.is_active() && self.backbuffer.is_some() {
            Ok(())
        } else {
            Err(self.invalid_state(op))
        }
    }

    fn invalid_state(&self, op: &'static str) -> SurfaceError {
        error!(op, state = %self.state, "Surface operation called out of sequence");
        SurfaceError::InvalidState {
            op,
            state: self.state,
        }
    }

    fn purge_cache(&self, keep: &HashSet<TileSpec>) {
        if let Some(cache) = &self.cache {
            let purged = cache.purge_except(keep);
            if purged > 0 {
                info!(purged, kept = keep.len(), "Purged decoded tiles");
            }
        }
    }

    fn notify(&mut self, event: SwapEvent) {
        self.listeners.retain(|listener| listener.send(event).is_ok());
    }
}

impl Drop for CompositorSurface {
    fn drop(&mut self) {
        if let Some(backbuffer) = self.backbuffer.take() {
            self.presenter.release_backbuffer(backbuffer.handle);
        }
    }
}

impl std::fmt::Debug for CompositorSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositorSurface")
            .field("size", &self.size)
            .field("state", &self.state)
            .field("visible", &self.visible)
            .field("pending_swaps", &self.pending_swaps.len())
            .field("frames_presented", &self.frames_presented)
            .finish_non_exhaustive()
    }
}
