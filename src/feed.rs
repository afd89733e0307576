//! Reminder feed: the patient context decides whose medications are
//! fetched, the scheduler turns them into reminders.

use chrono::{Days, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::directory::{DirectoryError, MedicationDirectory, PatientDirectory, SelectionStore};
use crate::models::DoseRecord;
use crate::patient_context::{PatientContext, PatientScope};
use crate::reminders::{self, ReminderInstance, ReminderSummary};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("No active user session")]
    NoActiveSession,
    #[error("Medication directory error: {0}")]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderFeed {
    pub scope: PatientScope,
    /// Patient whose medications were loaded.
    pub patient_id: Uuid,
    pub generated_at: NaiveDateTime,
    pub horizon_days: u32,
    pub reminders: Vec<ReminderInstance>,
    pub summary: ReminderSummary,
}

impl ReminderFeed {
    /// End of the generated window (exclusive).
    pub fn window_end(&self) -> NaiveDateTime {
        let start = self.generated_at.date();
        start
            .checked_add_days(Days::new(u64::from(self.horizon_days)))
            .unwrap_or(start)
            .and_hms_opt(0, 0, 0)
            .unwrap_or(self.generated_at)
    }

    /// Overlay persisted taken/skipped marks and recompute the summary.
    pub fn with_dose_records(mut self, records: &[DoseRecord]) -> Self {
        self.reminders = reminders::apply_dose_records(&self.reminders, records);
        self.summary = reminders::summarize(&self.reminders);
        self
    }
}

/// Build the reminder feed for whatever the context currently scopes to.
///
/// The own dashboard loads the signed-in user's medications; a selected
/// patient loads that patient's.
pub async fn load_reminder_feed<D, S, M>(
    context: &PatientContext<D, S>,
    medications: &M,
    now: NaiveDateTime,
    horizon_days: u32,
) -> Result<ReminderFeed, FeedError>
where
    D: PatientDirectory,
    S: SelectionStore,
    M: MedicationDirectory,
{
    let session = context.session().ok_or(FeedError::NoActiveSession)?;
    let scope = context.scope();
    let patient_id = match scope {
        PatientScope::OwnDashboard => session.user_id,
        PatientScope::Patient(id) => id,
    };

    let meds = medications.list_medications(Some(&patient_id)).await?;
    let horizon_days = reminders::clamp_horizon(horizon_days);
    let generated = reminders::generate(&meds, now, horizon_days);
    tracing::debug!(
        patient_id = %patient_id,
        medications = meds.len(),
        reminders = generated.len(),
        "Built reminder feed"
    );

    Ok(ReminderFeed {
        scope,
        patient_id,
        generated_at: now,
        horizon_days,
        summary: reminders::summarize(&generated),
        reminders: generated,
    })
}
