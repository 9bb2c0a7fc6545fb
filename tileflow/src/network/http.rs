//! HTTP network collaborator backed by reqwest.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::client::NetworkClient;
use super::types::{NetworkError, NetworkErrorCode, NetworkEvent, TransferId};

/// Default per-transfer timeout in seconds.
pub const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 30;

/// Default cap on a tile response body: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Real network client using async reqwest on a Tokio runtime.
///
/// Every transfer runs as its own task on the supplied runtime handle and
/// posts exactly one [`NetworkEvent`] to the channel returned by
/// [`ReqwestNetwork::new`]. Aborting a transfer cancels its task; the task
/// then reports [`NetworkErrorCode::OperationCanceled`] unless it had already
/// finished.
///
/// Bodies larger than [`with_max_payload`](Self::with_max_payload) fail with
/// [`NetworkErrorCode::PayloadTooLarge`] without being buffered in full.
pub struct ReqwestNetwork {
    client: reqwest::Client,
    max_payload: usize,
    runtime: Handle,
    events: mpsc::UnboundedSender<NetworkEvent>,
    next_id: u64,
    active: Arc<Mutex<HashMap<TransferId, CancellationToken>>>,
}

impl ReqwestNetwork {
    /// Creates a client with the given transfer timeout.
    ///
    /// Returns the client together with the receiving end of its completion
    /// channel.
    pub fn new(
        runtime: Handle,
        timeout: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NetworkEvent>), NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tileflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetworkError::ClientBuild(e.to_string()))?;

        let (events, receiver) = mpsc::unbounded_channel();

        Ok((
            Self {
                client,
                max_payload: DEFAULT_MAX_PAYLOAD_BYTES,
                runtime,
                events,
                next_id: 0,
                active: Arc::new(Mutex::new(HashMap::new())),
            },
            receiver,
        ))
    }

    /// Cap response bodies at `bytes`.
    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload = bytes;
        self
    }

    /// Number of transfers that have not reported back yet.
    pub fn active_transfers(&self) -> usize {
        self.active.lock().len()
    }
}

impl NetworkClient for ReqwestNetwork {
    fn issue_fetch(&mut self, url: &str) -> TransferId {
        self.next_id += 1;
        let transfer = TransferId::new(self.next_id);
        let token = CancellationToken::new();
        self.active.lock().insert(transfer, token.clone());

        let client = self.client.clone();
        let events = self.events.clone();
        let active = Arc::clone(&self.active);
        let url = url.to_string();
        let max_payload = self.max_payload;

        debug!(%transfer, url = %url, "Issuing tile fetch");

        self.runtime.spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => Err(NetworkErrorCode::OperationCanceled),
                result = fetch(&client, &url, max_payload) => result,
            };

            active.lock().remove(&transfer);

            let event = match outcome {
                Ok(body) => NetworkEvent::Finished { transfer, body },
                Err(code) => NetworkEvent::Failed { transfer, code },
            };

            // The receiver is gone once the pipeline shuts down.
            if events.send(event).is_err() {
                trace!(%transfer, "Completion dropped, receiver closed");
            }
        });

        transfer
    }

    fn abort(&mut self, transfer: TransferId) {
        if let Some(token) = self.active.lock().remove(&transfer) {
            debug!(%transfer, "Aborting tile fetch");
            token.cancel();
        }
    }
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
    max_payload: usize,
) -> Result<Bytes, NetworkErrorCode> {
    let mut response = client.get(url).send().await.map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        return Err(NetworkErrorCode::HttpStatus(status.as_u16()));
    }

    let too_large = NetworkErrorCode::PayloadTooLarge { limit: max_payload };
    if response
        .content_length()
        .is_some_and(|len| len > max_payload as u64)
    {
        return Err(too_large);
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(classify)? {
        if body.len() + chunk.len() > max_payload {
            return Err(too_large);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn classify(err: reqwest::Error) -> NetworkErrorCode {
    if err.is_timeout() {
        NetworkErrorCode::Timeout
    } else if err.is_connect() || err.is_request() || err.is_body() {
        NetworkErrorCode::Connection(err.to_string())
    } else {
        NetworkErrorCode::Other(err.to_string())
    }
}
