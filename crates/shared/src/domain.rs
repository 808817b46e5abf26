use serde::{Deserialize, Serialize};

use crate::{error::ContactError, protocol::WebAppUser};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub $inner);
    };
}

id_newtype!(RequestToken, u64);
id_newtype!(HostUserId, i64);

impl RequestToken {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    Probing,
    Requesting,
    TimedOut,
    Succeeded,
    Failed,
    Simulated,
}

impl RequestState {
    /// States that hold until the next `reset()`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Simulated)
    }

    pub fn carries_phone(self) -> bool {
        matches!(self, Self::Succeeded | Self::Simulated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Requesting => "requesting",
            Self::TimedOut => "timed_out",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    Never,
    #[default]
    OnUnavailable,
    OnTimeout,
    OnAnyFailure,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "never" => Ok(Self::Never),
            "on_unavailable" => Ok(Self::OnUnavailable),
            "on_timeout" => Ok(Self::OnTimeout),
            "on_any_failure" => Ok(Self::OnAnyFailure),
            other => Err(format!("unknown fallback policy '{other}'")),
        }
    }
}

/// Everything a presentation layer is allowed to read about the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub state: RequestState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ContactError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<WebAppUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<RequestToken>,
}

impl ContactSnapshot {
    pub fn is_simulated(&self) -> bool {
        self.state == RequestState::Simulated
    }
}
