use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_optional_date, parse_uuid, DATE_FORMAT};
use crate::db::DatabaseError;
use crate::models::*;

const MEDICATION_COLUMNS: &str = "id, patient_id, name, dosage, unit, instructions, frequency,
     custom_frequency, dosage_schedule, status, start_date, end_date";

/// Raw column values; enums and ids are parsed after the row is read.
struct MedicationRow {
    id: String,
    patient_id: String,
    name: String,
    dosage: String,
    unit: String,
    instructions: Option<String>,
    frequency: String,
    custom_frequency: Option<String>,
    dosage_schedule: String,
    status: String,
    start_date: Option<String>,
    end_date: Option<String>,
}

fn medication_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<MedicationRow> {
    Ok(MedicationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        name: row.get(2)?,
        dosage: row.get(3)?,
        unit: row.get(4)?,
        instructions: row.get(5)?,
        frequency: row.get(6)?,
        custom_frequency: row.get(7)?,
        dosage_schedule: row.get(8)?,
        status: row.get(9)?,
        start_date: row.get(10)?,
        end_date: row.get(11)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: parse_uuid("medication_id", &row.id)?,
        patient_id: parse_uuid("patient_id", &row.patient_id)?,
        name: row.name,
        dosage: row.dosage,
        unit: row.unit,
        instructions: row.instructions,
        frequency: Frequency::from_str(&row.frequency)?,
        custom_frequency: row.custom_frequency,
        dosage_schedule: serde_json::from_str(&row.dosage_schedule)?,
        status: MedicationStatus::from_str(&row.status)?,
        start_date: parse_optional_date(row.start_date),
        end_date: parse_optional_date(row.end_date),
    })
}

fn collect_medications(
    rows: impl Iterator<Item = rusqlite::Result<MedicationRow>>,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row?)?);
    }
    Ok(meds)
}

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, patient_id, name, dosage, unit, instructions, frequency,
         custom_frequency, dosage_schedule, status, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            med.id.to_string(),
            med.patient_id.to_string(),
            med.name,
            med.dosage,
            med.unit,
            med.instructions,
            med.frequency.as_str(),
            med.custom_frequency,
            serde_json::to_string(&med.dosage_schedule)?,
            med.status.as_str(),
            med.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
            med.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
        ],
    )?;
    Ok(())
}

/// Validate and store a new medication for `patient_id`.
pub fn create_medication(
    conn: &Connection,
    patient_id: &Uuid,
    input: MedicationInput,
) -> Result<Medication, DatabaseError> {
    input.validate()?;
    let med = input.into_medication(Uuid::new_v4(), *patient_id);
    insert_medication(conn, &med)?;
    tracing::debug!(medication_id = %med.id, patient_id = %patient_id, "Medication created");
    Ok(med)
}

/// Validate and replace every editable field of an existing medication.
pub fn update_medication(
    conn: &Connection,
    medication_id: &Uuid,
    input: MedicationInput,
) -> Result<Medication, DatabaseError> {
    input.validate()?;
    let existing = get_medication(conn, medication_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "medication".into(),
        id: medication_id.to_string(),
    })?;
    let med = input.into_medication(existing.id, existing.patient_id);

    conn.execute(
        "UPDATE medications SET
         name = ?2, dosage = ?3, unit = ?4, instructions = ?5, frequency = ?6,
         custom_frequency = ?7, dosage_schedule = ?8, status = ?9, start_date = ?10,
         end_date = ?11, updated_at = datetime('now')
         WHERE id = ?1",
        params![
            med.id.to_string(),
            med.name,
            med.dosage,
            med.unit,
            med.instructions,
            med.frequency.as_str(),
            med.custom_frequency,
            serde_json::to_string(&med.dosage_schedule)?,
            med.status.as_str(),
            med.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
            med.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
        ],
    )?;
    Ok(med)
}

/// Flip a medication between active and inactive without touching its schedule.
pub fn set_medication_status(
    conn: &Connection,
    medication_id: &Uuid,
    status: MedicationStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medications SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![medication_id.to_string(), status.as_str()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medication".into(),
            id: medication_id.to_string(),
        });
    }
    Ok(())
}

/// Delete a medication; its dose records go with it. Returns false when absent.
pub fn delete_medication(conn: &Connection, medication_id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM medications WHERE id = ?1",
        params![medication_id.to_string()],
    )?;
    Ok(deleted > 0)
}

pub fn get_medication(
    conn: &Connection,
    medication_id: &Uuid,
) -> Result<Option<Medication>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1"),
            params![medication_id.to_string()],
            medication_row_from_rusqlite,
        )
        .optional()?;
    row.map(medication_from_row).transpose()
}

/// Medications for one patient, or every medication when `patient_id` is `None`.
/// Ordered by creation so reminder ties resolve in entry order.
pub fn list_medications(
    conn: &Connection,
    patient_id: Option<&Uuid>,
) -> Result<Vec<Medication>, DatabaseError> {
    match patient_id {
        Some(id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEDICATION_COLUMNS} FROM medications
                 WHERE patient_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![id.to_string()], medication_row_from_rusqlite)?;
            collect_medications(rows)
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEDICATION_COLUMNS} FROM medications
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map([], medication_row_from_rusqlite)?;
            collect_medications(rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn input(name: &str) -> MedicationInput {
        MedicationInput {
            name: name.into(),
            dosage: "10".into(),
            unit: "mg".into(),
            instructions: None,
            frequency: Frequency::Daily,
            custom_frequency: None,
            dosage_schedule: vec!["08:00".into()],
            status: MedicationStatus::Active,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 15),
            end_date: None,
        }
    }

    #[test]
    fn create_and_get_round_trips_schedule() {
        let conn = open_memory_database().unwrap();
        let patient = Uuid::new_v4();
        let mut i = input("Lisinopril");
        i.dosage_schedule = vec!["08:00".into(), " 20:00".into()];
        let created = create_medication(&conn, &patient, i).unwrap();

        let fetched = get_medication(&conn, &created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.dosage_schedule, vec!["08:00", "20:00"]);
        assert_eq!(fetched.start_date, NaiveDate::from_ymd_opt(2025, 1, 15));
    }

    #[test]
    fn create_rejects_invalid_input() {
        let conn = open_memory_database().unwrap();
        let mut i = input("Bad");
        i.dosage_schedule = vec!["8am".into()];
        let err = create_medication(&conn, &Uuid::new_v4(), i).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        assert!(list_medications(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn list_scopes_by_patient_in_entry_order() {
        let conn = open_memory_database().unwrap();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        create_medication(&conn, &alice, input("Metformin")).unwrap();
        create_medication(&conn, &bob, input("Warfarin")).unwrap();
        create_medication(&conn, &alice, input("Aspirin")).unwrap();

        let names: Vec<String> = list_medications(&conn, Some(&alice))
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Metformin", "Aspirin"]);
        assert_eq!(list_medications(&conn, None).unwrap().len(), 3);
    }

    #[test]
    fn update_replaces_fields_and_keeps_owner() {
        let conn = open_memory_database().unwrap();
        let patient = Uuid::new_v4();
        let created = create_medication(&conn, &patient, input("Metformin")).unwrap();

        let mut edit = input("Metformin XR");
        edit.frequency = Frequency::Weekly;
        let updated = update_medication(&conn, &created.id, edit).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.patient_id, patient);

        let fetched = get_medication(&conn, &created.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Metformin XR");
        assert_eq!(fetched.frequency, Frequency::Weekly);
    }

    #[test]
    fn update_missing_medication_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_medication(&conn, &Uuid::new_v4(), input("X")).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn set_status_toggles_active_flag() {
        let conn = open_memory_database().unwrap();
        let created = create_medication(&conn, &Uuid::new_v4(), input("Metformin")).unwrap();
        set_medication_status(&conn, &created.id, MedicationStatus::Inactive).unwrap();
        let fetched = get_medication(&conn, &created.id).unwrap().unwrap();
        assert_eq!(fetched.status, MedicationStatus::Inactive);

        let err = set_medication_status(&conn, &Uuid::new_v4(), MedicationStatus::Active);
        assert!(matches!(err, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn delete_reports_presence() {
        let conn = open_memory_database().unwrap();
        let created = create_medication(&conn, &Uuid::new_v4(), input("Metformin")).unwrap();
        assert!(delete_medication(&conn, &created.id).unwrap());
        assert!(!delete_medication(&conn, &created.id).unwrap());
        assert!(get_medication(&conn, &created.id).unwrap().is_none());
    }

    #[test]
    fn corrupt_frequency_surfaces_invalid_enum() {
        let conn = open_memory_database().unwrap();
        let created = create_medication(&conn, &Uuid::new_v4(), input("Metformin")).unwrap();
        conn.execute(
            "UPDATE medications SET frequency = 'hourly' WHERE id = ?1",
            params![created.id.to_string()],
        )
        .unwrap();
        let err = get_medication(&conn, &created.id).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }
}
