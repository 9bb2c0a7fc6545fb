//! Types exchanged with the network collaborator.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::tile::FetchErrorKind;

/// Opaque identifier for one network transfer.
///
/// Issued by a [`NetworkClient`](super::NetworkClient) and echoed back in the
/// matching [`NetworkEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(u64);

impl TransferId {
    /// Wrap a raw transfer number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw transfer number.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Error codes reported by the network collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkErrorCode {
    /// Could not connect, or the connection dropped mid-transfer.
    Connection(String),
    /// The transfer exceeded its time limit.
    Timeout,
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// The response body exceeded the configured payload limit.
    PayloadTooLarge { limit: usize },
    /// The transfer was aborted on request.
    OperationCanceled,
    /// Anything the collaborator could not classify.
    Other(String),
}

impl NetworkErrorCode {
    /// Map the collaborator code onto the pipeline's error taxonomy.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            NetworkErrorCode::Connection(_)
            | NetworkErrorCode::Timeout
            | NetworkErrorCode::HttpStatus(_)
            | NetworkErrorCode::PayloadTooLarge { .. } => FetchErrorKind::Communication,
            NetworkErrorCode::OperationCanceled => FetchErrorKind::Cancelled,
            NetworkErrorCode::Other(_) => FetchErrorKind::Unknown,
        }
    }

    /// Human-readable description of the failure.
    pub fn message(&self) -> String {
        match self {
            NetworkErrorCode::Connection(reason) => format!("connection failed: {}", reason),
            NetworkErrorCode::Timeout => "transfer timed out".to_string(),
            NetworkErrorCode::HttpStatus(status) => format!("HTTP {}", status),
            NetworkErrorCode::PayloadTooLarge { limit } => {
                format!("response body exceeds {} bytes", limit)
            }
            NetworkErrorCode::OperationCanceled => String::new(),
            NetworkErrorCode::Other(reason) => reason.clone(),
        }
    }
}

/// Completion notifications posted by the network collaborator.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// The transfer delivered a response body.
    Finished { transfer: TransferId, body: Bytes },
    /// The transfer failed.
    Failed {
        transfer: TransferId,
        code: NetworkErrorCode,
    },
}

impl NetworkEvent {
    /// The transfer this event belongs to.
    pub fn transfer(&self) -> TransferId {
        match self {
            NetworkEvent::Finished { transfer, .. } | NetworkEvent::Failed { transfer, .. } => {
                *transfer
            }
        }
    }
}

/// Errors creating a network collaborator.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}
