//! The tile fetch coordinator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::arena::{RequestArena, RequestHandle};
use super::events::TileEvent;
use super::stats::CoordinatorStats;
use crate::decode::{DecodeError, DecodeOutcome, DecodePool, DecodedImage, DecodedTile, TileDecoder};
use crate::network::{NetworkClient, NetworkErrorCode, NetworkEvent, TileSource, TransferId};
use crate::tile::{FetchErrorKind, TileFetchRequest, TileSpec};

/// Bookkeeping for one owned request.
struct Entry {
    request: TileFetchRequest,
    /// Network data arrived and a pooled decode is running.
    decoding: bool,
}

/// Context carried through a pooled decode.
struct PendingDecode {
    handle: RequestHandle,
    bytes: Bytes,
    format: String,
}

/// Issues tile fetches, de-duplicates them, decodes results and reports
/// each outcome exactly once.
///
/// The coordinator is owned by a single thread. Network completions and
/// pooled decode results are applied only through `&mut self` on that
/// thread; nothing else ever mutates a request.
///
/// # Delivery guarantees
///
/// - At most one pending fetch exists per [`TileSpec`].
/// - Each request produces at most one [`TileEvent`]; duplicate or late
///   network callbacks are ignored by checking that the request is still
///   pending.
/// - Cancelled requests produce no event.
/// - No retries happen here. Callers decide whether to request again.
pub struct TileFetchCoordinator {
    network: Box<dyn NetworkClient>,
    source: TileSource,
    decoder: Arc<dyn TileDecoder>,
    pool: Option<DecodePool>,
    requests: RequestArena<Entry>,
    by_spec: HashMap<TileSpec, RequestHandle>,
    transfers: HashMap<TransferId, RequestHandle>,
    events: mpsc::UnboundedSender<TileEvent>,
    decoded_tx: mpsc::UnboundedSender<DecodeOutcome<PendingDecode>>,
    decoded_rx: mpsc::UnboundedReceiver<DecodeOutcome<PendingDecode>>,
    decodes_in_flight: usize,
    stats: CoordinatorStats,
}

impl TileFetchCoordinator {
    /// Create a coordinator that decodes inline.
    ///
    /// Returns the coordinator and the receiving end of its event channel.
    pub fn new(
        network: Box<dyn NetworkClient>,
        source: TileSource,
        decoder: Arc<dyn TileDecoder>,
    ) -> (Self, mpsc::UnboundedReceiver<TileEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (decoded_tx, decoded_rx) = mpsc::unbounded_channel();

        (
            Self {
                network,
                source,
                decoder,
                pool: None,
                requests: RequestArena::new(),
                by_spec: HashMap::new(),
                transfers: HashMap::new(),
                events,
                decoded_tx,
                decoded_rx,
                decodes_in_flight: 0,
                stats: CoordinatorStats::default(),
            },
            receiver,
        )
    }

    /// Offload decoding to a worker pool.
    ///
    /// Results must then be applied with [`pump_decoded`](Self::pump_decoded),
    /// [`wait_decoded`](Self::wait_decoded) or [`recv_decoded`](Self::recv_decoded).
    pub fn with_decode_pool(mut self, pool: DecodePool) -> Self {
        self.pool = Some(pool);
        self
    }

    // =========================================================================
    // Caller operations
    // =========================================================================

    /// Request a tile.
    ///
    /// While a request for `spec` is pending, its handle is returned and no
    /// new fetch is issued. Otherwise any finished, unevicted request for the
    /// spec is dropped and a fresh fetch is issued.
    pub fn request_tile(&mut self, spec: TileSpec) -> RequestHandle {
        if let Some(&existing) = self.by_spec.get(&spec) {
            let pending = self
                .requests
                .get(existing)
                .is_some_and(|entry| entry.request.is_pending());
            if pending {
                self.stats.deduplicated += 1;
                trace!(tile = %spec, handle = %existing, "Joined in-flight fetch");
                return existing;
            }
            self.release(existing);
        }

        let url = self.source.url_for(&spec);
        let transfer = self.network.issue_fetch(&url);

        let mut request = TileFetchRequest::new(spec);
        request.attach_transfer(transfer);

        let handle = self.requests.insert(Entry {
            request,
            decoding: false,
        });
        self.by_spec.insert(spec, handle);
        self.transfers.insert(transfer, handle);
        self.stats.requested += 1;

        debug!(tile = %spec, %transfer, %handle, "Tile fetch issued");
        handle
    }

    /// Cancel the pending request for `spec`.
    ///
    /// Returns whether a request was cancelled. No event is emitted for it.
    pub fn cancel_tile(&mut self, spec: TileSpec) -> bool {
        match self.by_spec.get(&spec) {
            Some(&handle) => self.cancel(handle),
            None => false,
        }
    }

    /// Cancel a pending request by handle.
    pub fn cancel(&mut self, handle: RequestHandle) -> bool {
        let Some(entry) = self.requests.get_mut(handle) else {
            return false;
        };
        if !entry.request.abort(self.network.as_mut()) {
            return false;
        }
        self.stats.cancelled += 1;
        true
    }

    /// Cancel every pending request.
    pub fn cancel_all(&mut self) -> usize {
        let pending: Vec<RequestHandle> = self
            .requests
            .iter()
            .filter(|(_, entry)| entry.request.is_pending())
            .map(|(handle, _)| handle)
            .collect();

        let cancelled = pending
            .into_iter()
            .filter(|handle| self.cancel(*handle))
            .count();
        if cancelled > 0 {
            info!(cancelled, "Cancelled all pending tile fetches");
        }
        cancelled
    }

    /// Drop the bookkeeping of a completed request.
    ///
    /// Callers evict once they have consumed the outcome. Pending requests
    /// are left alone; returns whether an entry was removed.
    pub fn evict(&mut self, spec: TileSpec) -> bool {
        let Some(&handle) = self.by_spec.get(&spec) else {
            return false;
        };
        let pending = self
            .requests
            .get(handle)
            .is_some_and(|entry| entry.request.is_pending());
        if pending {
            warn!(tile = %spec, "Refusing to evict a pending request");
            return false;
        }
        self.release(handle);
        true
    }

    /// Fail requests that have been pending for at least `max_age`.
    ///
    /// Each expired request is aborted at the network, completed as a
    /// communication error and reported through `TileEvent::Failed`.
    /// Requests whose payload already arrived and is being decoded are left
    /// alone.
    pub fn expire_stale(&mut self, now: Instant, max_age: Duration) -> usize {
        let stale: Vec<RequestHandle> = self
            .requests
            .iter()
            .filter(|(_, entry)| {
                entry.request.is_pending()
                    && !entry.decoding
                    && now.saturating_duration_since(entry.request.created_at()) >= max_age
            })
            .map(|(handle, _)| handle)
            .collect();

        for handle in &stale {
            let Some(entry) = self.requests.get_mut(*handle) else {
                continue;
            };
            if let Some(transfer) = entry.request.transfer() {
                self.network.abort(transfer);
            }
            let message = format!("fetch timed out after {}s", max_age.as_secs());
            entry
                .request
                .complete_with_error(FetchErrorKind::Communication, message.clone());
            let spec = entry.request.spec();

            self.stats.expired += 1;
            self.stats.failed += 1;
            warn!(tile = %spec, "Tile fetch expired");
            self.emit(TileEvent::Failed {
                spec,
                kind: FetchErrorKind::Communication,
                message,
            });
        }
        stale.len()
    }

    // =========================================================================
    // Network collaborator callbacks
    // =========================================================================

    /// Apply a completion posted by the network collaborator.
    pub fn handle_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Finished { transfer, body } => self.on_network_finished(transfer, body),
            NetworkEvent::Failed { transfer, code } => self.on_network_error(transfer, code),
        }
    }

    /// The network delivered a response body for `transfer`.
    ///
    /// Ignored unless the owning request is pending and still waiting for
    /// the network.
    pub fn on_network_finished(&mut self, transfer: TransferId, body: Bytes) {
        let Some(&handle) = self.transfers.get(&transfer) else {
            debug!(%transfer, "Completion for unknown transfer ignored");
            return;
        };
        let Some(entry) = self.requests.get_mut(handle) else {
            return;
        };
        if !entry.request.is_pending() || entry.decoding {
            debug!(
                tile = %entry.request.spec(),
                %transfer,
                state = %entry.request.state(),
                "Ignoring duplicate or late network completion"
            );
            return;
        }

        let format = self.source.image_format().to_string();
        match &self.pool {
            Some(pool) => {
                entry.decoding = true;
                self.decodes_in_flight += 1;
                pool.submit(
                    Arc::clone(&self.decoder),
                    body.clone(),
                    format.clone(),
                    PendingDecode {
                        handle,
                        bytes: body,
                        format,
                    },
                    self.decoded_tx.clone(),
                );
            }
            None => {
                let result = self.decoder.decode(&body, &format);
                self.apply_decode(handle, body, &format, result);
            }
        }
    }

    /// The network reported a failure for `transfer`.
    pub fn on_network_error(&mut self, transfer: TransferId, code: NetworkErrorCode) {
        let Some(&handle) = self.transfers.get(&transfer) else {
            debug!(%transfer, "Error for unknown transfer ignored");
            return;
        };
        let Some(entry) = self.requests.get_mut(handle) else {
            return;
        };
        if !entry.request.is_pending() || entry.decoding {
            debug!(
                tile = %entry.request.spec(),
                %transfer,
                state = %entry.request.state(),
                "Ignoring duplicate or late network error"
            );
            return;
        }

        let kind = code.kind();
        let message = code.message();
        let spec = entry.request.spec();
        entry.request.complete_with_error(kind, message.clone());

        if kind.is_caller_visible() {
            self.stats.failed += 1;
            warn!(tile = %spec, error_kind = %kind, error = %message, "Tile fetch failed");
            self.emit(TileEvent::Failed {
                spec,
                kind,
                message,
            });
        } else {
            self.stats.cancelled += 1;
            debug!(tile = %spec, "Tile fetch cancelled by network");
        }
    }

    // =========================================================================
    // Pooled decode results
    // =========================================================================

    /// Apply every pooled decode result that is ready, without blocking.
    pub fn pump_decoded(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.decoded_rx.try_recv() {
            self.finish_pooled(outcome);
            applied += 1;
        }
        applied
    }

    /// Block until one pooled decode result is available and apply it.
    ///
    /// Returns `false` immediately when no decode is outstanding. Must not be
    /// called from inside an async runtime; use
    /// [`recv_decoded`](Self::recv_decoded) there.
    pub fn wait_decoded(&mut self) -> bool {
        if self.decodes_in_flight == 0 {
            return false;
        }
        match self.decoded_rx.blocking_recv() {
            Some(outcome) => {
                self.finish_pooled(outcome);
                true
            }
            None => false,
        }
    }

    /// Await one pooled decode result and apply it.
    pub async fn recv_decoded(&mut self) -> bool {
        if self.decodes_in_flight == 0 {
            return false;
        }
        match self.decoded_rx.recv().await {
            Some(outcome) => {
                self.finish_pooled(outcome);
                true
            }
            None => false,
        }
    }

    fn finish_pooled(&mut self, outcome: DecodeOutcome<PendingDecode>) {
        self.decodes_in_flight = self.decodes_in_flight.saturating_sub(1);
        let PendingDecode {
            handle,
            bytes,
            format,
        } = outcome.tag;

        if let Some(entry) = self.requests.get_mut(handle) {
            entry.decoding = false;
        }
        self.apply_decode(handle, bytes, &format, outcome.result);
    }

    fn apply_decode(
        &mut self,
        handle: RequestHandle,
        bytes: Bytes,
        format: &str,
        result: Result<DecodedImage, DecodeError>,
    ) {
        let Some(entry) = self.requests.get_mut(handle) else {
            trace!(%handle, "Decode result for evicted request dropped");
            return;
        };
        let spec = entry.request.spec();
        if !entry.request.is_pending() {
            debug!(tile = %spec, "Decode result for completed request dropped");
            return;
        }

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                let message = err.to_string();
                entry
                    .request
                    .complete_with_error(FetchErrorKind::Decode, message.clone());
                self.stats.failed += 1;
                warn!(tile = %spec, error = %message, "Tile decode failed");
                self.emit(TileEvent::Failed {
                    spec,
                    kind: FetchErrorKind::Decode,
                    message,
                });
                return;
            }
        };

        if !entry.request.complete_with_data(bytes, format) {
            return;
        }
        self.stats.ready += 1;
        debug!(
            tile = %spec,
            width = image.width,
            height = image.height,
            "Tile ready"
        );
        self.emit(TileEvent::Ready {
            spec,
            tile: DecodedTile::new(spec, image),
        });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Read-only view of a request. `None` once it has been evicted.
    pub fn request(&self, handle: RequestHandle) -> Option<&TileFetchRequest> {
        self.requests.get(handle).map(|entry| &entry.request)
    }

    /// Handle of the current request for `spec`, if one is tracked.
    pub fn handle_for(&self, spec: TileSpec) -> Option<RequestHandle> {
        self.by_spec.get(&spec).copied()
    }

    /// Number of pending requests.
    pub fn in_flight(&self) -> usize {
        self.requests
            .iter()
            .filter(|(_, entry)| entry.request.is_pending())
            .count()
    }

    /// Number of tracked requests, pending or completed-but-unevicted.
    pub fn tracked(&self) -> usize {
        self.requests.len()
    }

    /// Pooled decodes whose results have not been applied yet.
    pub fn decodes_in_flight(&self) -> usize {
        self.decodes_in_flight
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            in_flight: self.in_flight(),
            ..self.stats
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn release(&mut self, handle: RequestHandle) {
        let Some(entry) = self.requests.remove(handle) else {
            return;
        };
        if let Some(transfer) = entry.request.transfer() {
            self.transfers.remove(&transfer);
        }
        let spec = entry.request.spec();
        if self.by_spec.get(&spec) == Some(&handle) {
            self.by_spec.remove(&spec);
        }
        trace!(tile = %spec, %handle, "Request evicted");
    }

    fn emit(&self, event: TileEvent) {
        if self.events.send(event).is_err() {
            trace!("Tile event dropped, no receiver");
        }
    }
}

impl std::fmt::Debug for TileFetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileFetchCoordinator")
            .field("source", &self.source)
            .field("pool", &self.pool)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
