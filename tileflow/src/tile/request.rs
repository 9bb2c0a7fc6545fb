//! Tile fetch request state.
//!
//! A [`TileFetchRequest`] holds the lifecycle of exactly one network fetch
//! for one tile. It exposes a deliberately narrow mutation surface: the
//! network completion path calls [`complete_with_data`] or
//! [`complete_with_error`], and cancellation goes through [`abort`].
//!
//! # State Machine
//!
//! ```text
//! Pending --complete_with_data--> Finished
//! Pending --complete_with_error--> Errored
//! Pending --abort--> Errored(Cancelled)
//! ```
//!
//! Terminal states are never left. Calls that arrive after a terminal state
//! was reached are ignored and logged; duplicate network callbacks are a real
//! hazard when both a success and an error notification race for the same
//! transfer.
//!
//! [`complete_with_data`]: TileFetchRequest::complete_with_data
//! [`complete_with_error`]: TileFetchRequest::complete_with_error
//! [`abort`]: TileFetchRequest::abort

use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, warn};

use super::error::FetchErrorKind;
use super::spec::TileSpec;
use crate::network::{NetworkClient, TransferId};

/// Lifecycle state of a tile fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    /// Waiting for the network (and decode) to finish.
    Pending,
    /// Payload received and accepted.
    Finished,
    /// Failed or cancelled. See [`TileFetchRequest::error_kind`].
    Errored,
}

impl FetchState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchState::Pending)
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchState::Pending => write!(f, "pending"),
            FetchState::Finished => write!(f, "finished"),
            FetchState::Errored => write!(f, "errored"),
        }
    }
}

/// One fetch attempt for one tile.
///
/// Invariants:
/// - `Finished` implies a non-empty payload and no error kind.
/// - `Errored` implies an error kind is set.
/// - A terminal state is reached at most once.
#[derive(Debug, Clone)]
pub struct TileFetchRequest {
    spec: TileSpec,
    state: FetchState,
    raw_bytes: Bytes,
    image_format: String,
    error_kind: Option<FetchErrorKind>,
    error_message: String,
    transfer: Option<TransferId>,
    created_at: Instant,
}

impl TileFetchRequest {
    /// Create a pending request for `spec`.
    pub fn new(spec: TileSpec) -> Self {
        Self {
            spec,
            state: FetchState::Pending,
            raw_bytes: Bytes::new(),
            image_format: String::new(),
            error_kind: None,
            error_message: String::new(),
            transfer: None,
            created_at: Instant::now(),
        }
    }

    /// Record the network transfer serving this request.
    pub fn attach_transfer(&mut self, transfer: TransferId) {
        self.transfer = Some(transfer);
    }

    /// Store the payload and move to `Finished`.
    ///
    /// Only valid from `Pending`, and only with a non-empty payload. Returns
    /// `false` (and leaves the request untouched) otherwise.
    pub fn complete_with_data(&mut self, bytes: Bytes, format: &str) -> bool {
        if self.state.is_terminal() {
            warn!(
                tile = %self.spec,
                state = %self.state,
                "Ignoring data for a request that already completed"
            );
            return false;
        }
        if bytes.is_empty() {
            warn!(tile = %self.spec, "Ignoring empty payload");
            return false;
        }

        self.raw_bytes = bytes;
        self.image_format = format.to_string();
        self.state = FetchState::Finished;
        true
    }

    /// Move to `Errored` with the given kind and message.
    ///
    /// Only valid from `Pending`. Returns `false` otherwise.
    pub fn complete_with_error(&mut self, kind: FetchErrorKind, message: impl Into<String>) -> bool {
        if self.state.is_terminal() {
            warn!(
                tile = %self.spec,
                state = %self.state,
                error_kind = %kind,
                "Ignoring error for a request that already completed"
            );
            return false;
        }

        self.error_kind = Some(kind);
        self.error_message = message.into();
        self.state = FetchState::Errored;
        true
    }

    /// Cancel the request.
    ///
    /// A pending request is completed with `Cancelled` immediately and the
    /// network collaborator is asked to drop the transfer. Aborting a
    /// terminal request does nothing. Returns whether the request was
    /// cancelled by this call.
    pub fn abort(&mut self, network: &mut dyn NetworkClient) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        self.complete_with_error(FetchErrorKind::Cancelled, "");
        if let Some(transfer) = self.transfer {
            network.abort(transfer);
        }
        debug!(tile = %self.spec, "Tile fetch aborted");
        true
    }

    /// The tile this request is for.
    pub fn spec(&self) -> TileSpec {
        self.spec
    }

    /// Current state.
    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Whether the request is still waiting.
    pub fn is_pending(&self) -> bool {
        self.state == FetchState::Pending
    }

    /// Whether the request ended through cancellation.
    pub fn is_aborted(&self) -> bool {
        self.error_kind == Some(FetchErrorKind::Cancelled)
    }

    /// Payload bytes (empty unless `Finished`).
    pub fn raw_bytes(&self) -> &Bytes {
        &self.raw_bytes
    }

    /// Image format of the payload (empty unless `Finished`).
    pub fn image_format(&self) -> &str {
        &self.image_format
    }

    /// Error kind, if the request errored.
    pub fn error_kind(&self) -> Option<FetchErrorKind> {
        self.error_kind
    }

    /// Error message (empty unless `Errored`).
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Network transfer serving this request, once issued.
    pub fn transfer(&self) -> Option<TransferId> {
        self.transfer
    }

    /// When the request was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::RecordingNetwork;

    fn spec() -> TileSpec {
        TileSpec::new(1, 3, 2, 5)
    }

    #[test]
    fn test_new_is_pending() {
        let request = TileFetchRequest::new(spec());
        assert_eq!(request.state(), FetchState::Pending);
        assert!(request.raw_bytes().is_empty());
        assert_eq!(request.error_kind(), None);
        assert_eq!(request.transfer(), None);
    }

    #[test]
    fn test_complete_with_data() {
        let mut request = TileFetchRequest::new(spec());
        assert!(request.complete_with_data(Bytes::from_static(b"\x89PNG"), "png"));

        assert_eq!(request.state(), FetchState::Finished);
        assert_eq!(request.raw_bytes().as_ref(), b"\x89PNG");
        assert_eq!(request.image_format(), "png");
        assert_eq!(request.error_kind(), None);
    }

    #[test]
    fn test_complete_with_empty_data_is_rejected() {
        let mut request = TileFetchRequest::new(spec());
        assert!(!request.complete_with_data(Bytes::new(), "png"));
        assert!(request.is_pending());
    }

    #[test]
    fn test_duplicate_data_is_ignored() {
        let mut request = TileFetchRequest::new(spec());
        assert!(request.complete_with_data(Bytes::from_static(b"first"), "png"));
        assert!(!request.complete_with_data(Bytes::from_static(b"second"), "jpeg"));

        assert_eq!(request.raw_bytes().as_ref(), b"first");
        assert_eq!(request.image_format(), "png");
    }

    #[test]
    fn test_error_after_data_is_ignored() {
        let mut request = TileFetchRequest::new(spec());
        request.complete_with_data(Bytes::from_static(b"data"), "png");
        assert!(!request.complete_with_error(FetchErrorKind::Communication, "late"));

        assert_eq!(request.state(), FetchState::Finished);
        assert_eq!(request.error_kind(), None);
    }

    #[test]
    fn test_complete_with_error() {
        let mut request = TileFetchRequest::new(spec());
        assert!(request.complete_with_error(FetchErrorKind::Communication, "HTTP 503"));

        assert_eq!(request.state(), FetchState::Errored);
        assert_eq!(request.error_kind(), Some(FetchErrorKind::Communication));
        assert_eq!(request.error_message(), "HTTP 503");
        assert!(!request.is_aborted());
    }

    #[test]
    fn test_abort_pending_cancels_transfer() {
        let mut network = RecordingNetwork::new();
        let transfer = network.issue_fetch("http://tiles/3/2/5.png");

        let mut request = TileFetchRequest::new(spec());
        request.attach_transfer(transfer);

        assert!(request.abort(&mut network));
        assert_eq!(request.state(), FetchState::Errored);
        assert_eq!(request.error_kind(), Some(FetchErrorKind::Cancelled));
        assert!(request.is_aborted());
        assert_eq!(network.aborted(), vec![transfer]);
    }

    #[test]
    fn test_abort_is_idempotent() {
        let mut network = RecordingNetwork::new();
        let mut request = TileFetchRequest::new(spec());
        request.attach_transfer(network.issue_fetch("http://tiles/x.png"));

        assert!(request.abort(&mut network));
        assert!(!request.abort(&mut network));
        assert_eq!(network.aborted().len(), 1);
    }

    #[test]
    fn test_abort_terminal_request_is_noop() {
        let mut network = RecordingNetwork::new();
        let mut request = TileFetchRequest::new(spec());
        request.complete_with_data(Bytes::from_static(b"data"), "png");

        assert!(!request.abort(&mut network));
        assert_eq!(request.state(), FetchState::Finished);
        assert!(network.aborted().is_empty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Data(Vec<u8>),
            Error(FetchErrorKind),
            Abort,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                proptest::collection::vec(any::<u8>(), 0..8).prop_map(Op::Data),
                prop_oneof![
                    Just(FetchErrorKind::Communication),
                    Just(FetchErrorKind::Decode),
                    Just(FetchErrorKind::Cancelled),
                    Just(FetchErrorKind::Unknown),
                ]
                .prop_map(Op::Error),
                Just(Op::Abort),
            ]
        }

        proptest! {
            #[test]
            fn test_invariants_hold_for_any_call_sequence(
                ops in proptest::collection::vec(op_strategy(), 0..12)
            ) {
                let mut network = RecordingNetwork::new();
                let mut request = TileFetchRequest::new(TileSpec::new(0, 1, 0, 0));
                let mut transitions = 0;

                for op in ops {
                    let before = request.state();
                    let changed = match op {
                        Op::Data(bytes) => request.complete_with_data(Bytes::from(bytes), "png"),
                        Op::Error(kind) => request.complete_with_error(kind, "err"),
                        Op::Abort => request.abort(&mut network),
                    };
                    if changed {
                        transitions += 1;
                        prop_assert_eq!(before, FetchState::Pending);
                    } else {
                        prop_assert_eq!(before, request.state());
                    }

                    match request.state() {
                        FetchState::Finished => {
                            prop_assert!(!request.raw_bytes().is_empty());
                            prop_assert_eq!(request.error_kind(), None);
                        }
                        FetchState::Errored => prop_assert!(request.error_kind().is_some()),
                        FetchState::Pending => {}
                    }
                }

                prop_assert!(transitions <= 1);
            }
        }
    }
}
