//! Medication reminder scheduling.
//!
//! Expands each active medication's dosage schedule into concrete dose
//! reminders over a window of calendar days, then offers pure helpers to
//! mark, group and summarise them. Nothing here performs I/O: the caller
//! fetches medications and persists any taken/skipped marks.
//!
//! Eligibility per frequency:
//! - daily, twice_daily, as_needed, custom: every day
//! - weekly: same weekday as the reference date
//! - monthly: same day-of-month as the reference date (months without
//!   that day get no reminder)

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MAX_HORIZON_DAYS;
use crate::models::{DoseRecord, Frequency, Medication, MedicationStatus, ReminderStatus};

// ═══════════════════════════════════════════
// Types
// ═══════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Malformed schedule entry '{0}': expected HH:MM")]
    MalformedEntry(String),
}

/// One concrete dose occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderInstance {
    /// `{medication_id}:{day_offset}:{slot}`; only stable within one run.
    pub id: String,
    pub medication_id: Uuid,
    pub medication_name: String,
    pub dosage_label: String,
    pub scheduled_time: NaiveDateTime,
    pub status: ReminderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Morning [0,12), afternoon [12,17), evening [17,24).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            _ => Self::Evening,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayGroups {
    pub morning: Vec<ReminderInstance>,
    pub afternoon: Vec<ReminderInstance>,
    pub evening: Vec<ReminderInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub reminders: Vec<ReminderInstance>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSummary {
    pub total: u32,
    pub scheduled: u32,
    pub taken: u32,
    pub skipped: u32,
}

// ═══════════════════════════════════════════
// Recurrence
// ═══════════════════════════════════════════

/// Parse a dose time.
///
/// Stored schedules use `HH:MM`, but the parser also accepts a one-digit
/// hour and surrounding whitespace (`"8:30"`, `" 23:59 "`) so hand-entered
/// times still validate. Minutes must always be two digits.
pub fn parse_dose_time(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let malformed = || ScheduleError::MalformedEntry(raw.to_string());
    let trimmed = raw.trim();
    let (hours, minutes) = trimmed.split_once(':').ok_or_else(malformed)?;

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
        return Err(malformed());
    }

    let h: u32 = hours.parse().map_err(|_| malformed())?;
    let m: u32 = minutes.parse().map_err(|_| malformed())?;
    NaiveTime::from_hms_opt(h, m, 0).ok_or_else(malformed)
}

/// Whether a medication with `frequency` is due on `candidate`.
pub fn is_eligible(frequency: Frequency, candidate: NaiveDate, reference: NaiveDate) -> bool {
    match frequency {
        // Custom free text is displayed but never interpreted.
        Frequency::Daily | Frequency::TwiceDaily | Frequency::AsNeeded | Frequency::Custom => true,
        Frequency::Weekly => candidate.weekday() == reference.weekday(),
        Frequency::Monthly => candidate.day() == reference.day(),
    }
}

fn instance_id(medication_id: &Uuid, day_offset: u32, slot: usize) -> String {
    format!("{medication_id}:{day_offset}:{slot}")
}

/// Parsed dose times paired with their original slot index.
/// Malformed entries are dropped with a warning.
fn parse_schedule(med: &Medication) -> Vec<(usize, NaiveTime)> {
    med.dosage_schedule
        .iter()
        .enumerate()
        .filter_map(|(slot, raw)| match parse_dose_time(raw) {
            Ok(time) => Some((slot, time)),
            Err(e) => {
                tracing::warn!(medication_id = %med.id, slot, "Skipping dose time: {e}");
                None
            }
        })
        .collect()
}

/// Bound a requested horizon to `1..=MAX_HORIZON_DAYS` days.
pub fn clamp_horizon(horizon_days: u32) -> u32 {
    let horizon = horizon_days.clamp(1, MAX_HORIZON_DAYS);
    if horizon != horizon_days {
        tracing::debug!(requested = horizon_days, horizon, "Clamped reminder horizon");
    }
    horizon
}

/// Expand medications into reminders for `horizon_days` calendar days
/// starting on the reference date.
///
/// Inactive medications and empty schedules produce nothing. On the first
/// day, reminders strictly before `reference_time` are dropped. The result
/// is sorted by scheduled time; ties keep medication input order.
pub fn generate(
    medications: &[Medication],
    reference_time: NaiveDateTime,
    horizon_days: u32,
) -> Vec<ReminderInstance> {
    let horizon = clamp_horizon(horizon_days);
    let reference_date = reference_time.date();
    let mut instances = Vec::new();

    for med in medications {
        if med.status != MedicationStatus::Active || med.dosage_schedule.is_empty() {
            continue;
        }
        let slots = parse_schedule(med);
        if slots.is_empty() {
            continue;
        }
        let dosage_label = med.dosage_label();

        for day in 0..horizon {
            let Some(date) = reference_date.checked_add_days(Days::new(u64::from(day))) else {
                break;
            };
            if !is_eligible(med.frequency, date, reference_date) || !med.is_within_course(date) {
                continue;
            }

            for &(slot, time) in &slots {
                let scheduled_time = date.and_time(time);
                if day == 0 && scheduled_time < reference_time {
                    continue;
                }
                instances.push(ReminderInstance {
                    id: instance_id(&med.id, day, slot),
                    medication_id: med.id,
                    medication_name: med.name.clone(),
                    dosage_label: dosage_label.clone(),
                    scheduled_time,
                    status: ReminderStatus::Scheduled,
                });
            }
        }
    }

    // Stable: equal timestamps keep medication order.
    instances.sort_by_key(|i| i.scheduled_time);
    tracing::debug!(
        medications = medications.len(),
        horizon,
        reminders = instances.len(),
        "Generated reminders"
    );
    instances
}

// ═══════════════════════════════════════════
// Status transitions
// ═══════════════════════════════════════════

/// Copy of `instances` with the status of `instance_id` replaced.
/// Unknown ids return an unchanged copy.
pub fn mark_status(
    instances: &[ReminderInstance],
    instance_id: &str,
    status: ReminderStatus,
) -> Vec<ReminderInstance> {
    instances
        .iter()
        .map(|instance| {
            if instance.id == instance_id {
                ReminderInstance {
                    status,
                    ..instance.clone()
                }
            } else {
                instance.clone()
            }
        })
        .collect()
}

/// Overlay persisted marks onto freshly generated reminders, matching on
/// medication and scheduled time.
pub fn apply_dose_records(
    instances: &[ReminderInstance],
    records: &[DoseRecord],
) -> Vec<ReminderInstance> {
    let marks: HashMap<(Uuid, NaiveDateTime), ReminderStatus> = records
        .iter()
        .map(|r| ((r.medication_id, r.scheduled_time), r.status))
        .collect();

    instances
        .iter()
        .map(|instance| {
            match marks.get(&(instance.medication_id, instance.scheduled_time)) {
                Some(&status) => ReminderInstance {
                    status,
                    ..instance.clone()
                },
                None => instance.clone(),
            }
        })
        .collect()
}

// ═══════════════════════════════════════════
// Views
// ═══════════════════════════════════════════

pub fn group_by_time_of_day(instances: &[ReminderInstance]) -> TimeOfDayGroups {
    let mut groups = TimeOfDayGroups::default();
    for instance in instances {
        let bucket = match TimeOfDay::from_hour(instance.scheduled_time.hour()) {
            TimeOfDay::Morning => &mut groups.morning,
            TimeOfDay::Afternoon => &mut groups.afternoon,
            TimeOfDay::Evening => &mut groups.evening,
        };
        bucket.push(instance.clone());
    }
    groups
}

/// Calendar-date buckets in ascending date order.
pub fn group_by_date(instances: &[ReminderInstance]) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<ReminderInstance>> = BTreeMap::new();
    for instance in instances {
        days.entry(instance.scheduled_time.date())
            .or_default()
            .push(instance.clone());
    }
    days.into_iter()
        .map(|(date, reminders)| DayGroup { date, reminders })
        .collect()
}

pub fn summarize(instances: &[ReminderInstance]) -> ReminderSummary {
    instances
        .iter()
        .fold(ReminderSummary::default(), |mut summary, instance| {
            summary.total += 1;
            match instance.status {
                ReminderStatus::Scheduled => summary.scheduled += 1,
                ReminderStatus::Taken => summary.taken += 1,
                ReminderStatus::Skipped => summary.skipped += 1,
            }
            summary
        })
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
