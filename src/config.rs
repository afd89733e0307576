use std::path::PathBuf;

use uuid::Uuid;

use crate::models::{UserRole, UserSession};

/// Application-level constants
pub const APP_NAME: &str = "Carelink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Persisted slot holding the caregiver's current patient selection.
pub const CURRENT_PATIENT_KEY: &str = "current_patient_id";

/// Horizon used by the reminder feed when the caller does not pick one.
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

/// Upper bound on a single generation run (one year plus leap day).
pub const MAX_HORIZON_DAYS: u32 = 366;

/// Bounds on the number of dose times a medication may carry.
pub const MIN_SCHEDULE_ENTRIES: usize = 1;
pub const MAX_SCHEDULE_ENTRIES: usize = 5;

/// Environment variables used by the command-line entry point.
pub const ENV_USER_ID: &str = "CARELINK_USER_ID";
pub const ENV_USER_ROLE: &str = "CARELINK_ROLE";

/// Log filter applied when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "carelink_lib=info,carelink=info,warn"
}

/// Get the application data directory
/// ~/Carelink/ on all platforms, falling back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the local SQLite database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("carelink.db")
}

/// Build the user session from the environment.
///
/// Returns `None` when the user id is missing or not a UUID. An unknown
/// role falls back to `patient`, which carries no switching capability.
pub fn session_from_env() -> Option<UserSession> {
    let user_id = std::env::var(ENV_USER_ID).ok()?;
    let role = std::env::var(ENV_USER_ROLE).unwrap_or_default();
    session_from_values(&user_id, &role)
}

fn session_from_values(user_id: &str, role: &str) -> Option<UserSession> {
    let user_id = Uuid::parse_str(user_id.trim()).ok()?;
    let role = role.trim().parse().unwrap_or(UserRole::Patient);
    Some(UserSession { user_id, role })
}
