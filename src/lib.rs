pub mod config;
pub mod db;
pub mod directory; // Patient/medication directories + selection slot
pub mod feed; // Reminder feed scoped by the patient context
pub mod models;
pub mod patient_context; // Caregiver current-patient state machine
pub mod reminders; // Medication reminder scheduling

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::directory::{SqliteDirectory, SqliteSelectionStore};
use crate::patient_context::PatientContext;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Directory error: {0}")]
    Directory(#[from] directory::DirectoryError),
    #[error("Feed error: {0}")]
    Feed(#[from] feed::FeedError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Print the reminder feed for the configured user as JSON.
///
/// The user comes from `CARELINK_USER_ID` / `CARELINK_ROLE`. Caregivers
/// get their persisted patient selection restored first.
pub fn run() -> Result<(), RunError> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let directory = SqliteDirectory::open(&config::database_path())?;
        let store = SqliteSelectionStore::new(directory.connection());
        let context = PatientContext::new(directory.clone(), store, config::session_from_env());

        if context.is_caregiver() {
            if let Err(e) = context.load_patients().await {
                tracing::warn!("Could not load patients: {e}");
            }
            context.restore().await;
        }

        let now = chrono::Local::now().naive_local();
        let feed =
            feed::load_reminder_feed(&context, &directory, now, config::DEFAULT_HORIZON_DAYS)
                .await?;
        println!("{}", serde_json::to_string_pretty(&feed)?);
        Ok::<(), RunError>(())
    })
}
