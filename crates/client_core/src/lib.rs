
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod probe;
pub mod timeout;

pub use config::{load_settings, load_settings_from, CoordinatorConfig};
pub use coordinator::{policy_covers, ContactRequestCoordinator};
pub use diagnostics::{DiagnosticsRecorder, LogEntry};
pub use probe::{BridgeAvailability, HostCapabilities, HostEnvironmentProbe};
pub use timeout::{with_timeout, LateSettlement, Race, RaceError};
