use serde::{Deserialize, Serialize};

use crate::domain::HostUserId;

/// Resolution value of the host's `requestContact` call.
///
/// Some host clients resolve with an empty object, so the phone field is
/// optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl ContactPayload {
    pub fn with_phone(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: Some(phone_number.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn usable_phone(&self) -> Option<&str> {
        self.phone_number
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

/// `initDataUnsafe.user` echo. Not authenticated by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: HostUserId,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl WebAppUser {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BridgeMethod {
    Ready,
    Expand,
    Close,
    ShowAlert,
    RequestContact,
    MainButton,
}

impl BridgeMethod {
    pub const ALL: [BridgeMethod; 6] = [
        BridgeMethod::Ready,
        BridgeMethod::Expand,
        BridgeMethod::Close,
        BridgeMethod::ShowAlert,
        BridgeMethod::RequestContact,
        BridgeMethod::MainButton,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Expand => "expand",
            Self::Close => "close",
            Self::ShowAlert => "showAlert",
            Self::RequestContact => "requestContact",
            Self::MainButton => "MainButton",
        }
    }
}
