use super::*;
use std::time::Duration;

use shared::domain::HostUserId;

#[tokio::test]
async fn missing_bridge_reports_nothing_and_rejects_contact() {
    let bridge = MissingHostBridge;
    for method in BridgeMethod::ALL {
        assert!(!bridge.supports(method), "{} should be unsupported", method.name());
    }
    let err = bridge.request_contact().await.expect_err("no contact");
    assert_eq!(err, HostError::Unsupported(BridgeMethod::RequestContact));
    assert!(bridge.main_button().is_none());
    assert!(bridge.init_data_user().is_none());
}

#[test]
fn environment_constructors_describe_detection_steps() {
    let absent = HostEnvironment::absent();
    assert!(!absent.script_loaded);
    assert!(absent.host.is_none());

    let no_web_app = HostEnvironment::without_web_app();
    assert!(no_web_app.script_loaded);
    assert!(no_web_app.host.is_some());
    assert!(no_web_app.web_app().is_none());

    let bridge: Arc<dyn HostBridge> =
        Arc::new(ScriptedHostBridge::new(ContactBehavior::Never));
    assert!(HostEnvironment::with_bridge(bridge).web_app().is_some());
}

#[tokio::test]
async fn scripted_bridge_counts_contact_calls_and_journals_them() {
    let bridge = ScriptedHostBridge::new(ContactBehavior::Resolve(ContactPayload::with_phone(
        "+15551234567",
    )));
    let payload = bridge.request_contact().await.expect("resolves");
    assert_eq!(payload.usable_phone(), Some("+15551234567"));
    assert_eq!(bridge.contact_calls(), 1);
    assert_eq!(bridge.journal(), vec!["requestContact".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn scripted_bridge_delays_resolution() {
    let bridge = ScriptedHostBridge::new(ContactBehavior::ResolveAfter(
        Duration::from_secs(3),
        ContactPayload::empty(),
    ));
    let started = tokio::time::Instant::now();
    let payload = bridge.request_contact().await.expect("resolves");
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(payload.usable_phone(), None);
}

#[tokio::test]
async fn removed_method_is_unsupported() {
    let bridge = ScriptedHostBridge::new(ContactBehavior::Never)
        .without(BridgeMethod::RequestContact)
        .without(BridgeMethod::MainButton);
    assert!(!bridge.supports(BridgeMethod::RequestContact));
    assert!(bridge.main_button().is_none());
    let err = bridge.request_contact().await.expect_err("unsupported");
    assert_eq!(err, HostError::Unsupported(BridgeMethod::RequestContact));
    assert_eq!(bridge.contact_calls(), 0);
}

#[test]
fn main_button_click_fires_registered_handler_once() {
    let button = ScriptedMainButton::default();
    let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = fired.clone();
    button
        .on_click(Box::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }))
        .expect("register");

    assert!(button.click());
    assert!(!button.click());
    assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn user_json_is_parsed_from_init_data() {
    let bridge = ScriptedHostBridge::new(ContactBehavior::Never)
        .with_user_json(r#"{"id":7,"first_name":"Lin","username":"lin"}"#)
        .expect("valid user json");
    let user = bridge.init_data_user().expect("user");
    assert_eq!(user.id, HostUserId(7));
    assert_eq!(user.username.as_deref(), Some("lin"));
}

#[test]
fn failing_expand_surfaces_host_error() {
    let bridge = ScriptedHostBridge::new(ContactBehavior::Never).failing_expand("viewport locked");
    let err = bridge.expand().expect_err("expand fails");
    assert_eq!(err.to_string(), "host method expand failed: viewport locked");
}
