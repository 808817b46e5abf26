use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use host_bridge::{HostBridge, HostEnvironment, MissingHostBridge};
use serde::Serialize;
use shared::{
    error::ContactErrorKind,
    protocol::{BridgeMethod, WebAppUser},
};
use tracing::{info, warn};

use crate::diagnostics::DiagnosticsRecorder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostCapabilities {
    pub has_request_contact: bool,
    pub has_main_button: bool,
    pub has_show_alert: bool,
    pub has_close: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeAvailability {
    ScriptMissing,
    HostObjectMissing,
    WebAppMissing,
    Available,
}

pub struct HostEnvironmentProbe {
    availability: BridgeAvailability,
    capabilities: HostCapabilities,
    bridge: Arc<dyn HostBridge>,
    profile: Option<WebAppUser>,
}

impl HostEnvironmentProbe {
    pub fn initialize(environment: &HostEnvironment, diagnostics: &DiagnosticsRecorder) -> Self {
        if environment.script_loaded {
            diagnostics.record("host script loaded");
        } else {
            diagnostics.record("host script not detected");
        }

        let Some(host) = environment.host.as_ref() else {
            diagnostics.record("host object absent");
            let availability = if environment.script_loaded {
                BridgeAvailability::HostObjectMissing
            } else {
                BridgeAvailability::ScriptMissing
            };
            return Self::unavailable(availability, diagnostics);
        };
        diagnostics.record("host object present");

        let Some(bridge) = host.web_app.clone() else {
            diagnostics.record("WebApp sub-object absent");
            return Self::unavailable(BridgeAvailability::WebAppMissing, diagnostics);
        };
        diagnostics.record("WebApp sub-object present");

        for method in BridgeMethod::ALL {
            let state = if bridge.supports(method) {
                "present"
            } else {
                "missing"
            };
            diagnostics.record(format!("method {}: {state}", method.name()));
        }

        // Readiness calls are best-effort, panics included.
        for method in [BridgeMethod::Ready, BridgeMethod::Expand] {
            if !bridge.supports(method) {
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match method {
                BridgeMethod::Ready => bridge.ready(),
                _ => bridge.expand(),
            }));
            match outcome {
                Ok(Ok(())) => diagnostics.record(format!("{}() called", method.name())),
                Ok(Err(err)) => {
                    warn!(method = method.name(), error = %err, "host readiness call failed");
                    diagnostics.record(format!("{}() failed: {err}", method.name()));
                }
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    warn!(method = method.name(), reason, "host readiness call panicked");
                    diagnostics.record(format!("{}() panicked: {reason}", method.name()));
                }
            }
        }

        let main_button_present =
            bridge.supports(BridgeMethod::MainButton) && bridge.main_button().is_some();
        let capabilities = HostCapabilities {
            has_request_contact: bridge.supports(BridgeMethod::RequestContact),
            has_main_button: main_button_present,
            has_show_alert: bridge.supports(BridgeMethod::ShowAlert),
            has_close: bridge.supports(BridgeMethod::Close),
        };

        let profile = bridge.init_data_user();
        match &profile {
            Some(user) => diagnostics.record(format!(
                "initDataUnsafe.user present (id {}, unverified)",
                user.id.0
            )),
            None => diagnostics.record("initDataUnsafe.user absent"),
        }

        info!(?capabilities, "host bridge detected");
        Self {
            availability: BridgeAvailability::Available,
            capabilities,
            bridge,
            profile,
        }
    }

    fn unavailable(availability: BridgeAvailability, diagnostics: &DiagnosticsRecorder) -> Self {
        info!(?availability, "host bridge unavailable");
        diagnostics.record("host bridge unavailable; using null bridge");
        Self {
            availability,
            capabilities: HostCapabilities::default(),
            bridge: Arc::new(MissingHostBridge),
            profile: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability == BridgeAvailability::Available
    }

    pub fn availability(&self) -> BridgeAvailability {
        self.availability
    }

    pub fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    pub fn bridge(&self) -> Arc<dyn HostBridge> {
        Arc::clone(&self.bridge)
    }

    pub fn profile(&self) -> Option<&WebAppUser> {
        self.profile.as_ref()
    }

    /// Why a contact request cannot reach the host, if it cannot.
    pub fn unavailable_kind(&self) -> Option<ContactErrorKind> {
        if !self.is_available() {
            Some(ContactErrorKind::HostUnavailable)
        } else if !self.capabilities.has_request_contact {
            Some(ContactErrorKind::CapabilityUnavailable)
        } else {
            None
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
#[path = "tests/probe_tests.rs"]
mod tests;
