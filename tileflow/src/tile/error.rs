//! Error classification for tile fetches.

use std::fmt;

/// Why a tile fetch ended without a usable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Network-layer failure (connection, timeout, HTTP status). May be transient.
    Communication,
    /// The payload could not be decoded into an image. Permanent for that payload.
    Decode,
    /// Cancelled by the caller. Not a failure.
    Cancelled,
    /// Unclassified collaborator error.
    Unknown,
}

impl FetchErrorKind {
    /// Whether this kind should be reported to callers as a failure.
    ///
    /// Cancellation is the expected result of `abort()` and is swallowed.
    pub fn is_caller_visible(&self) -> bool {
        !matches!(self, FetchErrorKind::Cancelled)
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Communication => write!(f, "communication error"),
            FetchErrorKind::Decode => write!(f, "decode error"),
            FetchErrorKind::Cancelled => write!(f, "cancelled"),
            FetchErrorKind::Unknown => write!(f, "unknown error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_not_caller_visible() {
        assert!(!FetchErrorKind::Cancelled.is_caller_visible());
        assert!(FetchErrorKind::Communication.is_caller_visible());
        assert!(FetchErrorKind::Decode.is_caller_visible());
        assert!(FetchErrorKind::Unknown.is_caller_visible());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FetchErrorKind::Communication.to_string(),
            "communication error"
        );
        assert_eq!(FetchErrorKind::Decode.to_string(), "decode error");
        assert_eq!(FetchErrorKind::Cancelled.to_string(), "cancelled");
        assert_eq!(FetchErrorKind::Unknown.to_string(), "unknown error");
    }
}
