use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_optional_date, parse_uuid, DATE_FORMAT};
use crate::db::DatabaseError;
use crate::models::Patient;

const PATIENT_COLUMNS: &str =
    "id, caregiver_id, first_name, last_name, date_of_birth, phone, email, health_id";

struct PatientRow {
    id: String,
    caregiver_id: Option<String>,
    first_name: String,
    last_name: String,
    date_of_birth: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    health_id: Option<String>,
}

fn patient_row_from_rusqlite(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        caregiver_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        date_of_birth: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        health_id: row.get(7)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid("patient_id", &row.id)?,
        caregiver_id: row
            .caregiver_id
            .as_deref()
            .map(|s| parse_uuid("caregiver_id", s))
            .transpose()?,
        first_name: row.first_name,
        last_name: row.last_name,
        date_of_birth: parse_optional_date(row.date_of_birth),
        phone: row.phone,
        email: row.email,
        health_id: row.health_id,
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, caregiver_id, first_name, last_name, date_of_birth,
         phone, email, health_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.caregiver_id.map(|id| id.to_string()),
            patient.first_name,
            patient.last_name,
            patient.date_of_birth.map(|d| d.format(DATE_FORMAT).to_string()),
            patient.phone,
            patient.email,
            patient.health_id,
        ],
    )?;
    Ok(())
}

/// Replace the profile fields of an existing patient.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET caregiver_id = ?2, first_name = ?3, last_name = ?4,
         date_of_birth = ?5, phone = ?6, email = ?7, health_id = ?8
         WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.caregiver_id.map(|id| id.to_string()),
            patient.first_name,
            patient.last_name,
            patient.date_of_birth.map(|d| d.format(DATE_FORMAT).to_string()),
            patient.phone,
            patient.email,
            patient.health_id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

pub fn get_patient(conn: &Connection, patient_id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![patient_id.to_string()],
            patient_row_from_rusqlite,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// Patients managed by `caregiver_id`, sorted by last then first name.
pub fn list_patients_for_caregiver(
    conn: &Connection,
    caregiver_id: &Uuid,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE caregiver_id = ?1
         ORDER BY last_name COLLATE NOCASE ASC, first_name COLLATE NOCASE ASC"
    ))?;
    let rows = stmt.query_map(params![caregiver_id.to_string()], patient_row_from_rusqlite)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn delete_patient(conn: &Connection, patient_id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patients WHERE id = ?1",
        params![patient_id.to_string()],
    )?;
    Ok(deleted > 0)
}
