//! Persisted taken/skipped marks for reminder instances.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_datetime, parse_uuid, DATETIME_FORMAT};
use crate::db::DatabaseError;
use crate::models::{DoseRecord, ReminderStatus};

/// Record (or overwrite) the status of one dose occurrence.
///
/// Recording `scheduled` removes the mark instead, returning the dose
/// to its generated state.
pub fn record_dose_status(
    conn: &Connection,
    medication_id: &Uuid,
    scheduled_time: NaiveDateTime,
    status: ReminderStatus,
    recorded_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let scheduled = scheduled_time.format(DATETIME_FORMAT).to_string();

    if status == ReminderStatus::Scheduled {
        conn.execute(
            "DELETE FROM dose_records WHERE medication_id = ?1 AND scheduled_time = ?2",
            params![medication_id.to_string(), scheduled],
        )?;
        return Ok(());
    }

    conn.execute(
        "INSERT INTO dose_records (medication_id, scheduled_time, status, recorded_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(medication_id, scheduled_time)
         DO UPDATE SET status = ?3, recorded_at = ?4",
        params![
            medication_id.to_string(),
            scheduled,
            status.as_str(),
            recorded_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Dose records with `from <= scheduled_time < to`, oldest first.
pub fn fetch_dose_records(
    conn: &Connection,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<DoseRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT medication_id, scheduled_time, status, recorded_at
         FROM dose_records
         WHERE scheduled_time >= ?1 AND scheduled_time < ?2
         ORDER BY scheduled_time ASC, medication_id ASC",
    )?;
    let rows = stmt.query_map(
        params![
            from.format(DATETIME_FORMAT).to_string(),
            to.format(DATETIME_FORMAT).to_string(),
        ],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    )?;

    let mut records = Vec::new();
    for row in rows {
        let (medication_id, scheduled_time, status, recorded_at) = row?;
        records.push(DoseRecord {
            medication_id: parse_uuid("medication_id", &medication_id)?,
            scheduled_time: parse_datetime("scheduled_time", &scheduled_time)?,
            status: ReminderStatus::from_str(&status)?,
            recorded_at: parse_datetime("recorded_at", &recorded_at)?,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::medication::create_medication;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Frequency, MedicationInput, MedicationStatus};
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn med(conn: &Connection) -> Uuid {
        create_medication(
            conn,
            &Uuid::new_v4(),
            MedicationInput {
                name: "Metformin".into(),
                dosage: "500".into(),
                unit: "mg".into(),
                instructions: None,
                frequency: Frequency::Daily,
                custom_frequency: None,
                dosage_schedule: vec!["08:00".into()],
                status: MedicationStatus::Active,
                start_date: None,
                end_date: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn record_and_fetch_within_window() {
        let conn = open_memory_database().unwrap();
        let id = med(&conn);
        record_dose_status(&conn, &id, at(3, 8), ReminderStatus::Taken, at(3, 9)).unwrap();
        record_dose_status(&conn, &id, at(5, 8), ReminderStatus::Skipped, at(5, 9)).unwrap();

        let records = fetch_dose_records(&conn, at(3, 0), at(4, 0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scheduled_time, at(3, 8));
        assert_eq!(records[0].status, ReminderStatus::Taken);
    }

    #[test]
    fn second_mark_overwrites_first() {
        let conn = open_memory_database().unwrap();
        let id = med(&conn);
        record_dose_status(&conn, &id, at(3, 8), ReminderStatus::Taken, at(3, 9)).unwrap();
        record_dose_status(&conn, &id, at(3, 8), ReminderStatus::Skipped, at(3, 10)).unwrap();

        let records = fetch_dose_records(&conn, at(1, 0), at(10, 0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ReminderStatus::Skipped);
        assert_eq!(records[0].recorded_at, at(3, 10));
    }

    #[test]
    fn recording_scheduled_clears_mark() {
        let conn = open_memory_database().unwrap();
        let id = med(&conn);
        record_dose_status(&conn, &id, at(3, 8), ReminderStatus::Taken, at(3, 9)).unwrap();
        record_dose_status(&conn, &id, at(3, 8), ReminderStatus::Scheduled, at(3, 10)).unwrap();
        assert!(fetch_dose_records(&conn, at(1, 0), at(10, 0)).unwrap().is_empty());
    }

    #[test]
    fn unknown_medication_violates_foreign_key() {
        let conn = open_memory_database().unwrap();
        let err = record_dose_status(
            &conn,
            &Uuid::new_v4(),
            at(3, 8),
            ReminderStatus::Taken,
            at(3, 9),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::Sqlite(_)));
    }
}
