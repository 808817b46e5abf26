use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use host_bridge::{HostBridge, HostEnvironment, HostError};
use shared::{
    domain::{ContactSnapshot, FallbackPolicy, RequestState, RequestToken},
    error::{ContactError, ContactErrorKind},
    protocol::{ContactPayload, WebAppUser},
};
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

use crate::{
    config::{CoordinatorConfig, FAILURE_ALERT_TEXT},
    diagnostics::DiagnosticsRecorder,
    probe::{HostCapabilities, HostEnvironmentProbe},
    timeout::{with_timeout, LateSettlement, Race, RaceError},
};

// An empty resolution is never replaced by the placeholder.
pub fn policy_covers(policy: FallbackPolicy, kind: ContactErrorKind) -> bool {
    match kind {
        ContactErrorKind::AmbiguousSuccess => false,
        ContactErrorKind::HostUnavailable | ContactErrorKind::CapabilityUnavailable => matches!(
            policy,
            FallbackPolicy::OnUnavailable | FallbackPolicy::OnAnyFailure
        ),
        ContactErrorKind::RequestTimeout => matches!(
            policy,
            FallbackPolicy::OnTimeout | FallbackPolicy::OnAnyFailure
        ),
        ContactErrorKind::RequestRejected => policy == FallbackPolicy::OnAnyFailure,
    }
}

struct Inner {
    state: RequestState,
    phone: Option<String>,
    error: Option<ContactError>,
    issued: RequestToken,
    live: Option<RequestToken>,
    // Dropped to release a MainButton wait when a request starts elsewhere.
    armed: Option<oneshot::Sender<()>>,
}

pub struct ContactRequestCoordinator {
    bridge: Arc<dyn HostBridge>,
    capabilities: HostCapabilities,
    unavailable: Option<ContactErrorKind>,
    profile: Option<WebAppUser>,
    config: CoordinatorConfig,
    diagnostics: Arc<DiagnosticsRecorder>,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<ContactSnapshot>,
}

impl ContactRequestCoordinator {
    pub fn initialize(environment: &HostEnvironment, config: CoordinatorConfig) -> Arc<Self> {
        let diagnostics = Arc::new(DiagnosticsRecorder::new(config.diagnostics_capacity));
        Self::initialize_with_diagnostics(environment, config, diagnostics)
    }

    pub fn initialize_with_diagnostics(
        environment: &HostEnvironment,
        config: CoordinatorConfig,
        diagnostics: Arc<DiagnosticsRecorder>,
    ) -> Arc<Self> {
        diagnostics.record(format!(
            "coordinator created (fallback {:?}, timeout {} ms)",
            config.fallback_policy,
            config.request_timeout.as_millis()
        ));
        diagnostics.record(transition_line(RequestState::Idle, RequestState::Probing));
        let probe = HostEnvironmentProbe::initialize(environment, &diagnostics);
        diagnostics.record(transition_line(RequestState::Probing, RequestState::Idle));

        let profile = probe.profile().cloned();
        let (snapshots, _) = watch::channel(ContactSnapshot {
            profile: profile.clone(),
            ..ContactSnapshot::default()
        });

        Arc::new(Self {
            bridge: probe.bridge(),
            capabilities: probe.capabilities(),
            unavailable: probe.unavailable_kind(),
            profile,
            config,
            diagnostics,
            inner: Mutex::new(Inner {
                state: RequestState::Idle,
                phone: None,
                error: None,
                issued: RequestToken(0),
                live: None,
                armed: None,
            }),
            snapshots,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn diagnostics(&self) -> &Arc<DiagnosticsRecorder> {
        &self.diagnostics
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    /// Unverified `initDataUnsafe.user` echo, for display only.
    pub fn profile(&self) -> Option<&WebAppUser> {
        self.profile.as_ref()
    }

    pub fn state(&self) -> RequestState {
        self.lock().state
    }

    pub fn phone(&self) -> Option<String> {
        self.lock().phone.clone()
    }

    pub fn error(&self) -> Option<ContactError> {
        self.lock().error.clone()
    }

    pub fn snapshot(&self) -> ContactSnapshot {
        let inner = self.lock();
        self.snapshot_of(&inner)
    }

    pub fn subscribe(&self) -> watch::Receiver<ContactSnapshot> {
        self.snapshots.subscribe()
    }

    fn snapshot_of(&self, inner: &Inner) -> ContactSnapshot {
        ContactSnapshot {
            state: inner.state,
            phone: inner.phone.clone(),
            error: inner.error.clone(),
            profile: self.profile.clone(),
            token: inner.live,
        }
    }

    fn publish(&self, inner: &Inner) {
        self.snapshots.send_replace(self.snapshot_of(inner));
    }

    fn enter(&self, inner: &mut Inner, next: RequestState) {
        self.diagnostics.record(transition_line(inner.state, next));
        inner.state = next;
    }

    pub async fn request_phone_number(self: &Arc<Self>) -> ContactSnapshot {
        let Some(token) = self.begin_request() else {
            return self.snapshot();
        };

        if let Some(kind) = self.unavailable {
            let message = match kind {
                ContactErrorKind::HostUnavailable => "host bridge is not available",
                _ => "host bridge does not expose requestContact",
            };
            self.fail_or_simulate(token, ContactError::new(kind, message));
            return self.snapshot();
        }

        let bridge = Arc::clone(&self.bridge);
        self.diagnostics
            .record(format!("request #{}: calling requestContact()", token.0));
        let race = with_timeout(
            async move { bridge.request_contact().await },
            self.config.request_timeout,
        )
        .await;

        match race {
            Ok(Race::Settled(outcome)) => self.complete(token, outcome),
            Ok(Race::TimedOut(late)) => {
                self.time_out(token);
                let this = Arc::downgrade(self);
                tokio::spawn(collect_late(this, token, late));
            }
            Err(RaceError::Aborted(reason)) => self.fail_or_simulate(
                token,
                ContactError::new(
                    ContactErrorKind::RequestRejected,
                    format!("requestContact aborted: {reason}"),
                ),
            ),
        }

        self.snapshot()
    }

    /// Arms the host MainButton and runs the request once it is tapped.
    pub async fn request_via_main_button(self: &Arc<Self>) -> ContactSnapshot {
        let button = if self.capabilities.has_main_button {
            self.bridge.main_button()
        } else {
            None
        };
        let Some(button) = button else {
            self.diagnostics
                .record("MainButton not exposed by host; requesting directly");
            return self.request_phone_number().await;
        };

        let (disarm_tx, disarm_rx) = oneshot::channel::<()>();
        if !self.arm_main_button(disarm_tx) {
            return self.snapshot();
        }

        let (tapped_tx, tapped_rx) = oneshot::channel::<()>();
        if let Err(err) = button.set_text(&self.config.main_button_text) {
            self.diagnostics
                .record(format!("MainButton.setText failed: {err}"));
        }
        if let Err(err) = button.on_click(Box::new(move || {
            let _ = tapped_tx.send(());
        })) {
            self.diagnostics.record(format!(
                "MainButton.onClick failed: {err}; requesting directly"
            ));
            self.lock().armed = None;
            return self.request_phone_number().await;
        }
        if let Err(err) = button.show() {
            self.diagnostics.record(format!("MainButton.show failed: {err}"));
        }
        self.diagnostics.record("MainButton armed; waiting for tap");

        let outcome = tokio::select! {
            biased;
            _ = disarm_rx => None,
            tapped = tapped_rx => Some(tapped.is_ok()),
        };
        if let Err(err) = button.hide() {
            self.diagnostics.record(format!("MainButton.hide failed: {err}"));
        }
        // Still armed unless a direct request took the slot.
        if outcome.is_some() {
            self.lock().armed = None;
        }
        match outcome {
            Some(true) => {
                self.diagnostics.record("MainButton tapped");
                self.request_phone_number().await
            }
            Some(false) => {
                self.diagnostics
                    .record("MainButton handler released without a tap");
                self.snapshot()
            }
            None => {
                self.diagnostics
                    .record("MainButton hidden; a later tap is ignored");
                self.snapshot()
            }
        }
    }

    fn arm_main_button(&self, disarm: oneshot::Sender<()>) -> bool {
        let mut inner = self.lock();
        if inner.state != RequestState::Idle {
            self.diagnostics
                .record(format!("MainButton not armed: state is {}", inner.state));
            return false;
        }
        if inner.armed.is_some() {
            self.diagnostics
                .record("MainButton not armed: already waiting for a tap");
            return false;
        }
        inner.armed = Some(disarm);
        true
    }

    /// Back to Idle from any state. The diagnostics log is kept.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let abandoned = inner.live.take();
        let dirty = inner.state != RequestState::Idle
            || inner.phone.is_some()
            || inner.error.is_some()
            || abandoned.is_some();
        if !dirty {
            return;
        }

        if let Some(token) = abandoned {
            self.diagnostics.record(format!(
                "reset: request #{} abandoned; its result will be ignored",
                token.0
            ));
        }
        self.enter(&mut inner, RequestState::Idle);
        inner.phone = None;
        inner.error = None;
        self.publish(&inner);
    }

    pub fn close(&self) {
        if !self.capabilities.has_close {
            self.diagnostics.record("close() not available; ignoring");
            return;
        }
        match self.bridge.close() {
            Ok(()) => self.diagnostics.record("close() called"),
            Err(err) => self.diagnostics.record(format!("close() failed: {err}")),
        }
    }

    fn begin_request(&self) -> Option<RequestToken> {
        let mut inner = self.lock();
        let current = inner.state;
        match current {
            RequestState::Idle => {
                let token = inner.issued.next();
                inner.issued = token;
                inner.live = Some(token);
                self.diagnostics
                    .record(format!("request #{} started", token.0));
                if inner.armed.take().is_some() {
                    self.diagnostics.record(format!(
                        "request #{}: MainButton disarmed",
                        token.0
                    ));
                }
                self.enter(&mut inner, RequestState::Requesting);
                self.publish(&inner);
                info!(token = token.0, "contact request started");
                Some(token)
            }
            RequestState::Requesting | RequestState::TimedOut | RequestState::Probing => {
                let live = inner.live.map(|token| token.0).unwrap_or_default();
                self.diagnostics.record(format!(
                    "request ignored: request #{live} still in flight"
                ));
                None
            }
            state => {
                self.diagnostics
                    .record(format!("request ignored: state is {state}; reset first"));
                None
            }
        }
    }

    /// Takes the lock only if `token` still owns the state.
    fn claim(&self, token: RequestToken, what: &str) -> Option<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.live == Some(token) {
            return Some(inner);
        }
        self.diagnostics.record(format!(
            "request #{}: {what} ignored, stale",
            token.0
        ));
        info!(token = token.0, what, "stale completion discarded");
        None
    }

    fn complete(&self, token: RequestToken, outcome: Result<ContactPayload, HostError>) {
        match outcome {
            Ok(payload) => match payload.usable_phone() {
                Some(phone) => self.succeed(token, phone.to_string()),
                None => self.fail_or_simulate(
                    token,
                    ContactError::new(
                        ContactErrorKind::AmbiguousSuccess,
                        "host resolved requestContact without a phone number",
                    ),
                ),
            },
            Err(HostError::Unsupported(method)) => self.fail_or_simulate(
                token,
                ContactError::new(
                    ContactErrorKind::CapabilityUnavailable,
                    format!("host reported {} as unsupported", method.name()),
                ),
            ),
            Err(err) => self.fail_or_simulate(
                token,
                ContactError::new(
                    ContactErrorKind::RequestRejected,
                    format!("requestContact rejected: {err}"),
                ),
            ),
        }
    }

    fn succeed(&self, token: RequestToken, phone: String) {
        let Some(mut inner) = self.claim(token, "resolution") else {
            return;
        };
        self.diagnostics.record(format!(
            "request #{}: host returned phone number {phone}",
            token.0
        ));
        self.enter(&mut inner, RequestState::Succeeded);
        inner.phone = Some(phone);
        inner.error = None;
        inner.live = None;
        self.publish(&inner);
        info!(token = token.0, "contact request succeeded");
    }

    fn time_out(&self, token: RequestToken) {
        let Some(mut inner) = self.claim(token, "timeout") else {
            return;
        };
        self.diagnostics.record(format!(
            "request #{}: no answer within {} ms",
            token.0,
            self.config.request_timeout.as_millis()
        ));
        self.enter(&mut inner, RequestState::TimedOut);
        self.publish(&inner);
        drop(inner);

        self.fail_or_simulate(
            token,
            ContactError::new(
                ContactErrorKind::RequestTimeout,
                format!(
                    "requestContact did not settle within {} ms",
                    self.config.request_timeout.as_millis()
                ),
            ),
        );
    }

    fn fail_or_simulate(&self, token: RequestToken, error: ContactError) {
        if policy_covers(self.config.fallback_policy, error.kind) {
            self.simulate(token, error);
        } else {
            self.fail(token, error);
        }
    }

    fn simulate(&self, token: RequestToken, cause: ContactError) {
        let Some(mut inner) = self.claim(token, "fallback") else {
            return;
        };
        let placeholder = self.config.placeholder_phone.clone();
        self.diagnostics.record(format!(
            "request #{}: {cause}; using simulated placeholder {placeholder} (not a real number)",
            token.0
        ));
        self.enter(&mut inner, RequestState::Simulated);
        inner.phone = Some(placeholder);
        inner.error = None;
        inner.live = None;
        self.publish(&inner);
        warn!(token = token.0, kind = cause.kind.as_str(), "simulated phone number in use");
    }

    fn fail(&self, token: RequestToken, error: ContactError) {
        let Some(mut inner) = self.claim(token, "failure") else {
            return;
        };
        self.diagnostics
            .record(format!("request #{}: failed, {error}", token.0));
        self.enter(&mut inner, RequestState::Failed);
        inner.phone = None;
        inner.live = None;
        warn!(token = token.0, kind = error.kind.as_str(), "contact request failed");
        inner.error = Some(error);
        self.publish(&inner);
        drop(inner);

        if self.config.alert_on_failure {
            self.alert(FAILURE_ALERT_TEXT);
        }
    }

    fn alert(&self, message: &str) {
        if !self.capabilities.has_show_alert {
            self.diagnostics.record("showAlert() not available; alert skipped");
            return;
        }
        if let Err(err) = self.bridge.show_alert(message) {
            self.diagnostics.record(format!("showAlert() failed: {err}"));
        }
    }
}

async fn collect_late(
    coordinator: Weak<ContactRequestCoordinator>,
    token: RequestToken,
    late: LateSettlement<Result<ContactPayload, HostError>>,
) {
    let settled = late.settled().await;
    let Some(coordinator) = coordinator.upgrade() else {
        info!(token = token.0, "late host result ignored, coordinator gone");
        return;
    };
    match settled {
        Ok(outcome) => coordinator.complete(token, outcome),
        Err(err) => coordinator.diagnostics.record(format!(
            "request #{}: late host call ended without settling ({err})",
            token.0
        )),
    }
}

fn transition_line(from: RequestState, to: RequestState) -> String {
    format!("state {from} -> {to}")
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
