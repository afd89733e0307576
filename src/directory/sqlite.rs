//! SQLite-backed directories sharing one connection.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use super::{DirectoryError, MedicationDirectory, PatientDirectory, SelectionStore};
use crate::db::{self, repository};
use crate::models::{Medication, Patient};

/// One connection shared by every SQLite collaborator.
pub type SharedConnection = Arc<Mutex<Connection>>;

pub fn shared_connection(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Connection>, DirectoryError> {
    conn.lock()
        .map_err(|_| DirectoryError::Unavailable("connection lock poisoned".into()))
}

/// Patient and medication lookups against the local database.
#[derive(Clone)]
pub struct SqliteDirectory {
    conn: SharedConnection,
}

impl SqliteDirectory {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Open (and migrate) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, DirectoryError> {
        let conn = db::open_database(path)?;
        Ok(Self::new(shared_connection(conn)))
    }

    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.conn)
    }
}

impl PatientDirectory for SqliteDirectory {
    async fn list_patients(&self, caregiver_id: &Uuid) -> Result<Vec<Patient>, DirectoryError> {
        let conn = lock(&self.conn)?;
        Ok(repository::list_patients_for_caregiver(&conn, caregiver_id)?)
    }

    async fn get_patient_by_id(&self, patient_id: &Uuid) -> Result<Patient, DirectoryError> {
        let conn = lock(&self.conn)?;
        repository::get_patient(&conn, patient_id)?.ok_or(DirectoryError::NotFound(*patient_id))
    }
}

impl MedicationDirectory for SqliteDirectory {
    async fn list_medications(
        &self,
        patient_id: Option<&Uuid>,
    ) -> Result<Vec<Medication>, DirectoryError> {
        let conn = lock(&self.conn)?;
        Ok(repository::list_medications(&conn, patient_id)?)
    }
}

/// Selection slot stored in the `user_preferences` table.
#[derive(Clone)]
pub struct SqliteSelectionStore {
    conn: SharedConnection,
}

impl SqliteSelectionStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl SelectionStore for SqliteSelectionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, DirectoryError> {
        let conn = lock(&self.conn)?;
        Ok(repository::get_user_preference(&conn, key)?)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DirectoryError> {
        let conn = lock(&self.conn)?;
        Ok(repository::set_user_preference(&conn, key, value)?)
    }

    fn remove_item(&self, key: &str) -> Result<(), DirectoryError> {
        let conn = lock(&self.conn)?;
        Ok(repository::delete_user_preference(&conn, key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Frequency, MedicationInput, MedicationStatus};

    fn patient(caregiver: Uuid) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            caregiver_id: Some(caregiver),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            date_of_birth: None,
            phone: None,
            email: None,
            health_id: None,
        }
    }

    #[tokio::test]
    async fn patient_lookup_and_not_found() {
        let dir = SqliteDirectory::new(shared_connection(open_memory_database().unwrap()));
        let caregiver = Uuid::new_v4();
        let p = patient(caregiver);
        {
            let conn = dir.connection();
            let conn = conn.lock().unwrap();
            repository::insert_patient(&conn, &p).unwrap();
        }

        assert_eq!(dir.get_patient_by_id(&p.id).await.unwrap(), p);
        assert_eq!(dir.list_patients(&caregiver).await.unwrap(), vec![p]);

        let missing = Uuid::new_v4();
        let err = dir.get_patient_by_id(&missing).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn medications_scoped_by_patient() {
        let dir = SqliteDirectory::new(shared_connection(open_memory_database().unwrap()));
        let owner = Uuid::new_v4();
        {
            let conn = dir.connection();
            let conn = conn.lock().unwrap();
            repository::create_medication(
                &conn,
                &owner,
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
            .unwrap();
        }
        assert_eq!(dir.list_medications(Some(&owner)).await.unwrap().len(), 1);
        assert!(dir.list_medications(Some(&Uuid::new_v4())).await.unwrap().is_empty());
    }

    #[test]
    fn selection_store_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("carelink.db");

        let store = SqliteSelectionStore::new(SqliteDirectory::open(&path).unwrap().connection());
        store.set_item("current_patient_id", "abc").unwrap();
        drop(store);

        let store = SqliteSelectionStore::new(SqliteDirectory::open(&path).unwrap().connection());
        assert_eq!(store.get_item("current_patient_id").unwrap().as_deref(), Some("abc"));
        store.remove_item("current_patient_id").unwrap();
        assert!(store.get_item("current_patient_id").unwrap().is_none());
    }
}
