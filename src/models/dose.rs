use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReminderStatus;

/// A persisted taken/skipped mark for one dose occurrence.
///
/// Keyed by medication and scheduled time because reminder instance ids
/// are only stable within a single generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseRecord {
    pub medication_id: Uuid,
    pub scheduled_time: NaiveDateTime,
    pub status: ReminderStatus,
    pub recorded_at: NaiveDateTime,
}
