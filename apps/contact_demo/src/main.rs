use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use client_core::{load_settings, load_settings_from, ContactRequestCoordinator};
use host_bridge::{ContactBehavior, HostEnvironment, ScriptedHostBridge};
use shared::{
    domain::FallbackPolicy,
    protocol::{BridgeMethod, ContactPayload},
};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scenario {
    /// Plain browser tab, no host at all.
    Absent,
    NoWebApp,
    NoMethod,
    Success,
    Empty,
    Never,
    Reject,
    /// Host answers one second after the deadline.
    Late,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, value_enum, default_value_t = Scenario::Success)]
    scenario: Scenario,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    fallback: Option<FallbackPolicy>,
    #[arg(long, default_value = "+15551234567")]
    phone: String,
    /// Trigger through the host MainButton instead of a direct call.
    #[arg(long)]
    main_button: bool,
    #[arg(long)]
    json: bool,
}

fn host_for(
    scenario: Scenario,
    phone: &str,
    timeout: Duration,
) -> (HostEnvironment, Option<Arc<ScriptedHostBridge>>) {
    let behavior = match scenario {
        Scenario::Absent => return (HostEnvironment::absent(), None),
        Scenario::NoWebApp => return (HostEnvironment::without_web_app(), None),
        Scenario::NoMethod | Scenario::Never => ContactBehavior::Never,
        Scenario::Success => ContactBehavior::ResolveAfter(
            Duration::from_millis(300),
            ContactPayload::with_phone(phone),
        ),
        Scenario::Empty => ContactBehavior::Resolve(ContactPayload::empty()),
        Scenario::Reject => ContactBehavior::Reject("user declined to share contact".into()),
        Scenario::Late => ContactBehavior::ResolveAfter(
            timeout + Duration::from_secs(1),
            ContactPayload::with_phone(phone),
        ),
    };

    let mut bridge = ScriptedHostBridge::new(behavior);
    if matches!(scenario, Scenario::NoMethod) {
        bridge = bridge.without(BridgeMethod::RequestContact);
    }
    let bridge = Arc::new(bridge);
    (HostEnvironment::with_bridge(bridge.clone()), Some(bridge))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    if let Some(ms) = args.timeout_ms.filter(|ms| *ms > 0) {
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(policy) = args.fallback {
        config.fallback_policy = policy;
    }
    let timeout = config.request_timeout;

    let (environment, bridge) = host_for(args.scenario, &args.phone, timeout);
    let coordinator = ContactRequestCoordinator::initialize(&environment, config);
    info!(scenario = ?args.scenario, "running contact request");

    let snapshot = match bridge.as_ref().and_then(|b| b.scripted_main_button()) {
        Some(button) if args.main_button => {
            let pending = {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.request_via_main_button().await })
            };
            while !button.has_listener() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            info!(text = %button.text(), "tapping MainButton");
            button.click();
            pending.await?
        }
        _ => coordinator.request_phone_number().await,
    };

    if matches!(args.scenario, Scenario::Late) {
        tokio::time::sleep(Duration::from_millis(1500)).await;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("state: {}", snapshot.state);
        println!("phone: {}", snapshot.phone.as_deref().unwrap_or("-"));
        if let Some(err) = &snapshot.error {
            println!("error: {err}");
        }
        if let Some(user) = &snapshot.profile {
            println!("profile (unverified): {}", user.display_name());
        }
        if snapshot.is_simulated() {
            println!("note: simulated placeholder, not a real number");
        }
    }

    println!("--- diagnostics ---");
    for entry in coordinator.diagnostics().entries() {
        println!("{entry}");
    }

    Ok(())
}
