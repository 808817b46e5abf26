//! In-process host used outside the container: tests, the demo app, and
//! local runs in a plain browser-less environment.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::protocol::{BridgeMethod, ContactPayload, WebAppUser};
use tracing::debug;

use crate::{ClickCallback, HostBridge, HostError, MainButton};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How the scripted `requestContact` settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactBehavior {
    Resolve(ContactPayload),
    ResolveAfter(Duration, ContactPayload),
    Reject(String),
    RejectAfter(Duration, String),
    Never,
}

pub struct ScriptedHostBridge {
    methods: HashSet<BridgeMethod>,
    behavior: Mutex<ContactBehavior>,
    main_button: Option<Arc<ScriptedMainButton>>,
    user: Option<WebAppUser>,
    expand_failure: Option<String>,
    contact_calls: AtomicUsize,
    journal: Mutex<Vec<String>>,
}

impl ScriptedHostBridge {
    pub fn new(behavior: ContactBehavior) -> Self {
        Self {
            methods: BridgeMethod::ALL.into_iter().collect(),
            behavior: Mutex::new(behavior),
            main_button: Some(Arc::new(ScriptedMainButton::default())),
            user: None,
            expand_failure: None,
            contact_calls: AtomicUsize::new(0),
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Drops a method from the advertised surface, as older clients do.
    pub fn without(mut self, method: BridgeMethod) -> Self {
        self.methods.remove(&method);
        if method == BridgeMethod::MainButton {
            self.main_button = None;
        }
        self
    }

    pub fn with_user(mut self, user: WebAppUser) -> Self {
        self.user = Some(user);
        self
    }

    /// Parses a raw `initDataUnsafe.user` object.
    pub fn with_user_json(self, raw: &str) -> Result<Self, serde_json::Error> {
        let user: WebAppUser = serde_json::from_str(raw)?;
        Ok(self.with_user(user))
    }

    pub fn failing_expand(mut self, reason: impl Into<String>) -> Self {
        self.expand_failure = Some(reason.into());
        self
    }

    pub fn set_behavior(&self, behavior: ContactBehavior) {
        *lock(&self.behavior) = behavior;
    }

    pub fn contact_calls(&self) -> usize {
        self.contact_calls.load(Ordering::SeqCst)
    }

    pub fn scripted_main_button(&self) -> Option<Arc<ScriptedMainButton>> {
        self.main_button.clone()
    }

    pub fn journal(&self) -> Vec<String> {
        lock(&self.journal).clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("showAlert:").map(str::to_string))
            .collect()
    }

    fn note(&self, entry: impl Into<String>) {
        lock(&self.journal).push(entry.into());
    }

    fn guard(&self, method: BridgeMethod) -> Result<(), HostError> {
        if self.methods.contains(&method) {
            Ok(())
        } else {
            Err(HostError::Unsupported(method))
        }
    }
}

#[async_trait]
impl HostBridge for ScriptedHostBridge {
    fn supports(&self, method: BridgeMethod) -> bool {
        self.methods.contains(&method)
    }

    fn ready(&self) -> Result<(), HostError> {
        self.guard(BridgeMethod::Ready)?;
        self.note("ready");
        Ok(())
    }

    fn expand(&self) -> Result<(), HostError> {
        self.guard(BridgeMethod::Expand)?;
        self.note("expand");
        match &self.expand_failure {
            Some(reason) => Err(HostError::Failed {
                method: BridgeMethod::Expand,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn close(&self) -> Result<(), HostError> {
        self.guard(BridgeMethod::Close)?;
        self.note("close");
        Ok(())
    }

    fn show_alert(&self, message: &str) -> Result<(), HostError> {
        self.guard(BridgeMethod::ShowAlert)?;
        self.note(format!("showAlert:{message}"));
        Ok(())
    }

    async fn request_contact(&self) -> Result<ContactPayload, HostError> {
        self.guard(BridgeMethod::RequestContact)?;
        let call = self.contact_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.note("requestContact");
        let behavior = lock(&self.behavior).clone();
        debug!(call, ?behavior, "scripted requestContact invoked");

        match behavior {
            ContactBehavior::Resolve(payload) => Ok(payload),
            ContactBehavior::ResolveAfter(delay, payload) => {
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
            ContactBehavior::Reject(reason) => Err(HostError::Rejected(reason)),
            ContactBehavior::RejectAfter(delay, reason) => {
                tokio::time::sleep(delay).await;
                Err(HostError::Rejected(reason))
            }
            ContactBehavior::Never => futures::future::pending().await,
        }
    }

    fn main_button(&self) -> Option<Arc<dyn MainButton>> {
        self.main_button
            .clone()
            .map(|button| button as Arc<dyn MainButton>)
    }

    fn init_data_user(&self) -> Option<WebAppUser> {
        self.user.clone()
    }
}

#[derive(Default)]
pub struct ScriptedMainButton {
    text: Mutex<String>,
    visible: AtomicBool,
    callback: Mutex<Option<ClickCallback>>,
}

impl ScriptedMainButton {
    pub fn text(&self) -> String {
        lock(&self.text).clone()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn has_listener(&self) -> bool {
        lock(&self.callback).is_some()
    }

    /// Simulates a user tap. Returns whether a registered handler ran.
    pub fn click(&self) -> bool {
        let callback = lock(&self.callback).take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl MainButton for ScriptedMainButton {
    fn set_text(&self, text: &str) -> Result<(), HostError> {
        *lock(&self.text) = text.to_string();
        Ok(())
    }

    fn show(&self) -> Result<(), HostError> {
        self.visible.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn hide(&self) -> Result<(), HostError> {
        self.visible.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn on_click(&self, callback: ClickCallback) -> Result<(), HostError> {
        *lock(&self.callback) = Some(callback);
        Ok(())
    }
}
