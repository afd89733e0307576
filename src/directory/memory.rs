//! In-memory collaborators for tests and offline use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::{DirectoryError, MedicationDirectory, PatientDirectory, SelectionStore};
use crate::models::{Medication, Patient};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DirectoryError> {
    mutex
        .lock()
        .map_err(|_| DirectoryError::Unavailable("lock poisoned".into()))
}

/// Patient directory over a fixed list.
///
/// Counts lookups so callers can assert which paths hit the directory,
/// and can be switched offline to simulate a backend outage.
#[derive(Default)]
pub struct InMemoryPatientDirectory {
    patients: Mutex<Vec<Patient>>,
    fetches: AtomicUsize,
    offline: AtomicBool,
}

impl InMemoryPatientDirectory {
    pub fn new(patients: Vec<Patient>) -> Self {
        Self {
            patients: Mutex::new(patients),
            ..Self::default()
        }
    }

    /// Insert or replace a patient record.
    pub fn upsert(&self, patient: Patient) -> Result<(), DirectoryError> {
        let mut patients = lock(&self.patients)?;
        match patients.iter().position(|p| p.id == patient.id) {
            Some(index) => patients[index] = patient,
            None => patients.push(patient),
        }
        Ok(())
    }

    /// Number of `get_patient_by_id` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), DirectoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("patient directory offline".into()));
        }
        Ok(())
    }
}

impl PatientDirectory for InMemoryPatientDirectory {
    async fn list_patients(&self, caregiver_id: &Uuid) -> Result<Vec<Patient>, DirectoryError> {
        self.check_online()?;
        let patients = lock(&self.patients)?;
        Ok(patients
            .iter()
            .filter(|p| p.caregiver_id.as_ref() == Some(caregiver_id))
            .cloned()
            .collect())
    }

    async fn get_patient_by_id(&self, patient_id: &Uuid) -> Result<Patient, DirectoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let patients = lock(&self.patients)?;
        patients
            .iter()
            .find(|p| p.id == *patient_id)
            .cloned()
            .ok_or(DirectoryError::NotFound(*patient_id))
    }
}

#[derive(Default)]
pub struct InMemoryMedicationDirectory {
    medications: Mutex<Vec<Medication>>,
}

impl InMemoryMedicationDirectory {
    pub fn new(medications: Vec<Medication>) -> Self {
        Self {
            medications: Mutex::new(medications),
        }
    }
}

impl MedicationDirectory for InMemoryMedicationDirectory {
    async fn list_medications(
        &self,
        patient_id: Option<&Uuid>,
    ) -> Result<Vec<Medication>, DirectoryError> {
        let medications = lock(&self.medications)?;
        Ok(medications
            .iter()
            .filter(|m| patient_id.map_or(true, |id| m.patient_id == *id))
            .cloned()
            .collect())
    }
}

/// Key-value slot kept in process memory.
#[derive(Default)]
pub struct MemorySelectionStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for MemorySelectionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, DirectoryError> {
        Ok(lock(&self.items)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        lock(&self.items)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), DirectoryError> {
        lock(&self.items)?.remove(key);
        Ok(())
    }
}
