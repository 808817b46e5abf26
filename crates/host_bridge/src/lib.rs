use std::sync::Arc;

use async_trait::async_trait;
use shared::protocol::{BridgeMethod, ContactPayload, WebAppUser};
use thiserror::Error;

pub mod scripted;

pub use scripted::{ContactBehavior, ScriptedHostBridge, ScriptedMainButton};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host method {} is not available", .0.name())]
    Unsupported(BridgeMethod),
    #[error("host rejected the request: {0}")]
    Rejected(String),
    #[error("host method {} failed: {reason}", .method.name())]
    Failed {
        method: BridgeMethod,
        reason: String,
    },
}

pub type ClickCallback = Box<dyn FnOnce() + Send + 'static>;

#[async_trait]
pub trait HostBridge: Send + Sync {
    fn supports(&self, method: BridgeMethod) -> bool;
    fn ready(&self) -> Result<(), HostError>;
    fn expand(&self) -> Result<(), HostError>;
    fn close(&self) -> Result<(), HostError>;
    fn show_alert(&self, message: &str) -> Result<(), HostError>;
    async fn request_contact(&self) -> Result<ContactPayload, HostError>;
    fn main_button(&self) -> Option<Arc<dyn MainButton>>;
    fn init_data_user(&self) -> Option<WebAppUser>;
}

pub trait MainButton: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), HostError>;
    fn show(&self) -> Result<(), HostError>;
    fn hide(&self) -> Result<(), HostError>;
    fn on_click(&self, callback: ClickCallback) -> Result<(), HostError>;
}

/// Stand-in used whenever the page has no usable bridge.
pub struct MissingHostBridge;

#[async_trait]
impl HostBridge for MissingHostBridge {
    fn supports(&self, _method: BridgeMethod) -> bool {
        false
    }

    fn ready(&self) -> Result<(), HostError> {
        Err(HostError::Unsupported(BridgeMethod::Ready))
    }

    fn expand(&self) -> Result<(), HostError> {
        Err(HostError::Unsupported(BridgeMethod::Expand))
    }

    fn close(&self) -> Result<(), HostError> {
        Err(HostError::Unsupported(BridgeMethod::Close))
    }

    fn show_alert(&self, _message: &str) -> Result<(), HostError> {
        Err(HostError::Unsupported(BridgeMethod::ShowAlert))
    }

    async fn request_contact(&self) -> Result<ContactPayload, HostError> {
        Err(HostError::Unsupported(BridgeMethod::RequestContact))
    }

    fn main_button(&self) -> Option<Arc<dyn MainButton>> {
        None
    }

    fn init_data_user(&self) -> Option<WebAppUser> {
        None
    }
}

#[derive(Clone, Default)]
pub struct HostEnvironment {
    pub script_loaded: bool,
    pub host: Option<HostObject>,
}

#[derive(Clone, Default)]
pub struct HostObject {
    pub web_app: Option<Arc<dyn HostBridge>>,
}

impl HostEnvironment {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn without_web_app() -> Self {
        Self {
            script_loaded: true,
            host: Some(HostObject { web_app: None }),
        }
    }

    pub fn with_bridge(bridge: Arc<dyn HostBridge>) -> Self {
        Self {
            script_loaded: true,
            host: Some(HostObject {
                web_app: Some(bridge),
            }),
        }
    }

    pub fn web_app(&self) -> Option<Arc<dyn HostBridge>> {
        self.host.as_ref().and_then(|host| host.web_app.clone())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
