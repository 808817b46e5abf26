use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactErrorKind {
    /// No host bridge object was injected into the page.
    HostUnavailable,
    /// Bridge present, `requestContact` missing.
    CapabilityUnavailable,
    RequestTimeout,
    RequestRejected,
    /// The host resolved without a usable phone field.
    AmbiguousSuccess,
}

impl ContactErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostUnavailable => "host_unavailable",
            Self::CapabilityUnavailable => "capability_unavailable",
            Self::RequestTimeout => "request_timeout",
            Self::RequestRejected => "request_rejected",
            Self::AmbiguousSuccess => "ambiguous_success",
        }
    }

    pub fn is_unavailable(self) -> bool {
        matches!(self, Self::HostUnavailable | Self::CapabilityUnavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct ContactError {
    pub kind: ContactErrorKind,
    pub message: String,
}

impl ContactError {
    pub fn new(kind: ContactErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stable_kind() {
        let err = ContactError::new(ContactErrorKind::RequestTimeout, "no answer after 10000 ms");
        assert_eq!(err.to_string(), "request_timeout: no answer after 10000 ms");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let raw = serde_json::to_string(&ContactErrorKind::AmbiguousSuccess).expect("encode");
        assert_eq!(raw, "\"ambiguous_success\"");
    }
}
