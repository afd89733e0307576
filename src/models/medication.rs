use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Frequency, MedicationStatus};
use crate::config::{MAX_SCHEDULE_ENTRIES, MIN_SCHEDULE_ENTRIES};
use crate::db::DatabaseError;
use crate::reminders::parse_dose_time;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub unit: String,
    pub instructions: Option<String>,
    pub frequency: Frequency,
    /// Free text shown when `frequency` is `custom`. Never interpreted.
    pub custom_frequency: Option<String>,
    /// Ordered `HH:MM` dose times.
    pub dosage_schedule: Vec<String>,
    pub status: MedicationStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Medication {
    /// "500 mg" style label for reminder cards.
    pub fn dosage_label(&self) -> String {
        format!("{} {}", self.dosage.trim(), self.unit.trim())
            .trim()
            .to_string()
    }

    /// Whether `date` falls inside the optional start/end course dates.
    pub fn is_within_course(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Create/edit payload for a medication.
#[derive(Debug, Clone, Deserialize)]
pub struct MedicationInput {
    pub name: String,
    pub dosage: String,
    pub unit: String,
    pub instructions: Option<String>,
    pub frequency: Frequency,
    pub custom_frequency: Option<String>,
    pub dosage_schedule: Vec<String>,
    pub status: MedicationStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl MedicationInput {
    /// Reject input the reminder scheduler would have to work around.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.name.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation(
                "medication name is required".into(),
            ));
        }

        let entries = self.dosage_schedule.len();
        if !(MIN_SCHEDULE_ENTRIES..=MAX_SCHEDULE_ENTRIES).contains(&entries) {
            return Err(DatabaseError::ConstraintViolation(format!(
                "dosage schedule must have {MIN_SCHEDULE_ENTRIES} to {MAX_SCHEDULE_ENTRIES} entries, got {entries}"
            )));
        }

        for entry in &self.dosage_schedule {
            parse_dose_time(entry)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        }

        if self.frequency == Frequency::Custom
            && self
                .custom_frequency
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            return Err(DatabaseError::ConstraintViolation(
                "custom frequency requires a description".into(),
            ));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "end date {end} is before start date {start}"
                )));
            }
        }

        Ok(())
    }

    /// Materialise the input as a medication record.
    pub fn into_medication(self, id: Uuid, patient_id: Uuid) -> Medication {
        let custom_frequency = match self.frequency {
            Frequency::Custom => self.custom_frequency,
            _ => None,
        };
        Medication {
            id,
            patient_id,
            name: self.name.trim().to_string(),
            dosage: self.dosage,
            unit: self.unit,
            instructions: self.instructions,
            frequency: self.frequency,
            custom_frequency,
            dosage_schedule: self
                .dosage_schedule
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect(),
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> MedicationInput {
        MedicationInput {
            name: "Metformin".into(),
            dosage: "500".into(),
            unit: "mg".into(),
            instructions: Some("With food".into()),
            frequency: Frequency::TwiceDaily,
            custom_frequency: None,
            dosage_schedule: vec!["08:00".into(), "20:00".into()],
            status: MedicationStatus::Active,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn empty_schedule_rejected() {
        let mut i = input();
        i.dosage_schedule.clear();
        assert!(matches!(
            i.validate(),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn six_entries_rejected() {
        let mut i = input();
        i.dosage_schedule = ["06:00", "09:00", "12:00", "15:00", "18:00", "21:00"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(i.validate().is_err());
    }

    #[test]
    fn malformed_time_rejected() {
        let mut i = input();
        i.dosage_schedule = vec!["25:00".into()];
        assert!(i.validate().is_err());
    }

    #[test]
    fn custom_without_description_rejected() {
        let mut i = input();
        i.frequency = Frequency::Custom;
        assert!(i.validate().is_err());
        i.custom_frequency = Some("every other day".into());
        assert!(i.validate().is_ok());
    }

    #[test]
    fn end_before_start_rejected() {
        let mut i = input();
        i.start_date = NaiveDate::from_ymd_opt(2025, 3, 10);
        i.end_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert!(i.validate().is_err());
    }

    #[test]
    fn into_medication_drops_custom_text_for_fixed_frequency() {
        let mut i = input();
        i.custom_frequency = Some("ignored".into());
        let med = i.into_medication(Uuid::new_v4(), Uuid::new_v4());
        assert!(med.custom_frequency.is_none());
        assert_eq!(med.dosage_label(), "500 mg");
    }

    #[test]
    fn course_dates_bound_eligibility() {
        let mut i = input();
        i.start_date = NaiveDate::from_ymd_opt(2025, 3, 5);
        i.end_date = NaiveDate::from_ymd_opt(2025, 3, 7);
        let med = i.into_medication(Uuid::new_v4(), Uuid::new_v4());
        assert!(!med.is_within_course(NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()));
        assert!(med.is_within_course(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()));
        assert!(med.is_within_course(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()));
        assert!(!med.is_within_course(NaiveDate::from_ymd_opt(2025, 3, 8).unwrap()));
    }
}
