//! Network collaborator abstraction for testability.

use std::sync::Arc;

use parking_lot::Mutex;

use super::types::TransferId;

/// Trait for the non-blocking network layer beneath the coordinator.
///
/// `issue_fetch` must return immediately. The outcome of the transfer is
/// delivered later as a [`NetworkEvent`](super::NetworkEvent), which the owner
/// of the coordinator feeds back on its own thread.
///
/// `abort` is best-effort: the collaborator may still deliver a completion
/// for an aborted transfer, and the coordinator must tolerate that.
pub trait NetworkClient: Send {
    /// Start fetching `url`.
    fn issue_fetch(&mut self, url: &str) -> TransferId;

    /// Ask the collaborator to cancel an in-flight transfer.
    fn abort(&mut self, transfer: TransferId);
}

#[derive(Debug, Default)]
struct RecordingInner {
    next_id: u64,
    issued: Vec<(TransferId, String)>,
    aborted: Vec<TransferId>,
}

/// Network client that only records what it was asked to do.
///
/// Nothing is fetched. The host (usually a test) plays the part of the
/// network by calling the coordinator's completion methods itself. Clones
/// share the same log, so a clone can be kept for inspection after the
/// original has been handed to a coordinator.
#[derive(Debug, Clone, Default)]
pub struct RecordingNetwork {
    inner: Arc<Mutex<RecordingInner>>,
}

impl RecordingNetwork {
    /// Create an empty recording client.
    pub fn new() -> Self {
        Self::default()
    }

    /// All fetches issued so far, in order.
    pub fn issued(&self) -> Vec<(TransferId, String)> {
        self.inner.lock().issued.clone()
    }

    /// Number of fetches issued so far.
    pub fn issued_count(&self) -> usize {
        self.inner.lock().issued.len()
    }

    /// The most recently issued transfer, if any.
    pub fn last_transfer(&self) -> Option<TransferId> {
        self.inner.lock().issued.last().map(|(id, _)| *id)
    }

    /// Transfers the client was asked to abort.
    pub fn aborted(&self) -> Vec<TransferId> {
        self.inner.lock().aborted.clone()
    }
}

impl NetworkClient for RecordingNetwork {
    fn issue_fetch(&mut self, url: &str) -> TransferId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = TransferId::new(inner.next_id);
        inner.issued.push((id, url.to_string()));
        id
    }

    fn abort(&mut self, transfer: TransferId) {
        self.inner.lock().aborted.push(transfer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_network_issues_unique_ids() {
        let mut network = RecordingNetwork::new();
        let a = network.issue_fetch("http://tiles/a.png");
        let b = network.issue_fetch("http://tiles/b.png");

        assert_ne!(a, b);
        assert_eq!(network.issued_count(), 2);
        assert_eq!(network.last_transfer(), Some(b));
        assert_eq!(network.issued()[0].1, "http://tiles/a.png");
    }

    #[test]
    fn test_recording_network_clones_share_log() {
        let observer = RecordingNetwork::new();
        let mut client: Box<dyn NetworkClient> = Box::new(observer.clone());

        let id = client.issue_fetch("http://tiles/c.png");
        client.abort(id);

        assert_eq!(observer.issued_count(), 1);
        assert_eq!(observer.aborted(), vec![id]);
    }
}
