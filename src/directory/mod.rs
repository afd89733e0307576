//! Collaborator boundaries consumed by the patient context and reminder feed.
//!
//! Three seams:
//! - PatientDirectory: the caregiver's patients and lookup by id
//! - MedicationDirectory: medication lists scoped to a patient
//! - SelectionStore: the persisted key-value slot for the current selection
//!
//! SQLite implementations live in `sqlite`, in-memory ones in `memory`.

pub mod memory;
pub mod sqlite;

pub use memory::{InMemoryMedicationDirectory, InMemoryPatientDirectory, MemorySelectionStore};
pub use sqlite::{shared_connection, SharedConnection, SqliteDirectory, SqliteSelectionStore};

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Medication, Patient};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Patient not found: {0}")]
    NotFound(Uuid),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[allow(async_fn_in_trait)]
pub trait PatientDirectory {
    /// Patients managed by `caregiver_id`.
    async fn list_patients(&self, caregiver_id: &Uuid) -> Result<Vec<Patient>, DirectoryError>;

    /// Fails with `DirectoryError::NotFound` when no record exists.
    async fn get_patient_by_id(&self, patient_id: &Uuid) -> Result<Patient, DirectoryError>;
}

#[allow(async_fn_in_trait)]
pub trait MedicationDirectory {
    /// Medications for `patient_id`, or every visible medication for `None`.
    async fn list_medications(
        &self,
        patient_id: Option<&Uuid>,
    ) -> Result<Vec<Medication>, DirectoryError>;
}

/// Device-scoped key-value slot that survives reloads.
pub trait SelectionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, DirectoryError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), DirectoryError>;
    fn remove_item(&self, key: &str) -> Result<(), DirectoryError>;
}

impl<T: PatientDirectory> PatientDirectory for Arc<T> {
    async fn list_patients(&self, caregiver_id: &Uuid) -> Result<Vec<Patient>, DirectoryError> {
        (**self).list_patients(caregiver_id).await
    }

    async fn get_patient_by_id(&self, patient_id: &Uuid) -> Result<Patient, DirectoryError> {
        (**self).get_patient_by_id(patient_id).await
    }
}

impl<T: MedicationDirectory> MedicationDirectory for Arc<T> {
    async fn list_medications(
        &self,
        patient_id: Option<&Uuid>,
    ) -> Result<Vec<Medication>, DirectoryError> {
        (**self).list_medications(patient_id).await
    }
}

impl<T: SelectionStore> SelectionStore for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, DirectoryError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), DirectoryError> {
        (**self).remove_item(key)
    }
}
