//! Caregiver patient context.
//!
//! Single source of truth for which patient a caregiver is viewing. Every
//! other feature reads `scope()` to decide whose data to fetch.
//!
//! States are `Unselected` (no current patient, the caregiver's own
//! dashboard) and `Viewing(patient)`. The selection is persisted in a
//! `SelectionStore` slot so it survives reloads.
//!
//! Overlapping requests: each switch, clear and restore takes a sequence
//! number from `latest_request`. A fetch that resolves after a newer
//! request was issued discards its result, so the last request wins.
//! Store writes happen under the state write lock, so the persisted slot
//! and `current_patient` always name the same patient, also on a
//! multi-threaded runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::CURRENT_PATIENT_KEY;
use crate::directory::{DirectoryError, PatientDirectory, SelectionStore};
use crate::models::{Patient, UserSession};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Patient not found: {0}")]
    NotFound(Uuid),
    #[error("Unable to fetch patient: {0}")]
    Fetch(#[source] DirectoryError),
    #[error("Selection store error: {0}")]
    Store(#[source] DirectoryError),
    #[error("Patient switching requires caregiver access")]
    NotCaregiver,
    #[error("Superseded by a newer patient selection")]
    Superseded,
    #[error("Internal lock error")]
    LockPoisoned,
}

impl ContextError {
    fn from_fetch(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => Self::NotFound(id),
            other => Self::Fetch(other),
        }
    }
}

/// Snapshot of the context for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextState {
    pub patients: Vec<Patient>,
    pub current_patient: Option<Patient>,
}

/// Whose data the rest of the app should load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "patient_id", rename_all = "snake_case")]
pub enum PatientScope {
    OwnDashboard,
    Patient(Uuid),
}

// ═══════════════════════════════════════════════════════════
// PatientContext
// ═══════════════════════════════════════════════════════════

pub struct PatientContext<D, S> {
    directory: D,
    store: S,
    session: Option<UserSession>,
    state: RwLock<ContextState>,
    latest_request: AtomicU64,
}

impl<D: PatientDirectory, S: SelectionStore> PatientContext<D, S> {
    /// Create an `Unselected` context. Call `restore()` to pick up a
    /// persisted selection.
    pub fn new(directory: D, store: S, session: Option<UserSession>) -> Self {
        Self {
            directory,
            store,
            session,
            state: RwLock::new(ContextState::default()),
            latest_request: AtomicU64::new(0),
        }
    }

    // ── Derived flags ───────────────────────────────────────

    pub fn session(&self) -> Option<&UserSession> {
        self.session.as_ref()
    }

    pub fn is_caregiver(&self) -> bool {
        self.session.as_ref().is_some_and(UserSession::is_caregiver)
    }

    pub fn snapshot(&self) -> Result<ContextState, ContextError> {
        Ok(self.read_state()?.clone())
    }

    pub fn patients(&self) -> Result<Vec<Patient>, ContextError> {
        Ok(self.read_state()?.patients.clone())
    }

    pub fn current_patient(&self) -> Result<Option<Patient>, ContextError> {
        Ok(self.read_state()?.current_patient.clone())
    }

    /// Id of the patient being viewed. A poisoned lock reads as unselected.
    pub fn current_patient_id(&self) -> Option<Uuid> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.current_patient.as_ref().map(|p| p.id))
    }

    pub fn is_viewing_patient(&self) -> bool {
        self.current_patient_id().is_some()
    }

    pub fn scope(&self) -> PatientScope {
        match self.current_patient_id() {
            Some(id) => PatientScope::Patient(id),
            None => PatientScope::OwnDashboard,
        }
    }

    // ── Transitions ─────────────────────────────────────────

    /// Replace the visible patient list from the directory.
    ///
    /// A current patient missing from the new list is kept and appended,
    /// so the selection is always part of `patients`.
    pub async fn load_patients(&self) -> Result<Vec<Patient>, ContextError> {
        let caregiver_id = self.require_caregiver()?;
        let mut patients = self
            .directory
            .list_patients(&caregiver_id)
            .await
            .map_err(ContextError::Fetch)?;

        let mut state = self.write_state()?;
        if let Some(current) = state.current_patient.take() {
            let listed = patients.iter().position(|p| p.id == current.id);
            match listed {
                Some(index) => state.current_patient = Some(patients[index].clone()),
                None => {
                    patients.push(current.clone());
                    state.current_patient = Some(current);
                }
            }
        }
        state.patients = patients.clone();
        tracing::debug!(count = patients.len(), "Loaded caregiver patients");
        Ok(patients)
    }

    /// Select a patient, or return to the own dashboard with `None`.
    ///
    /// A patient already in `patients` is selected without a fetch. On a
    /// fetch failure the state is left untouched and the error returned.
    pub async fn switch_patient(
        &self,
        patient_id: Option<Uuid>,
    ) -> Result<Option<Patient>, ContextError> {
        let Some(patient_id) = patient_id else {
            self.clear_current_patient()?;
            return Ok(None);
        };
        self.require_caregiver()?;
        let request = self.next_request();

        if let Some(cached) = self.cached_patient(&patient_id)? {
            tracing::debug!(patient_id = %patient_id, "Switching patient from cache");
            self.commit_selection(request, cached.clone())?;
            return Ok(Some(cached));
        }

        let fetched = self
            .directory
            .get_patient_by_id(&patient_id)
            .await
            .map_err(|e| {
                tracing::warn!(patient_id = %patient_id, "Patient switch failed: {e}");
                ContextError::from_fetch(e)
            })?;

        self.commit_selection(request, fetched.clone())?;
        tracing::info!(patient_id = %patient_id, "Switched current patient");
        Ok(Some(fetched))
    }

    /// Return to `Unselected`.
    ///
    /// The persisted slot is cleared before the in-memory state. If the
    /// store fails the state is left as it was, so a reload can never bring
    /// back a selection the caller saw cleared.
    pub fn clear_current_patient(&self) -> Result<(), ContextError> {
        let mut state = self.write_state()?;
        self.clear_locked(&mut state)
    }

    /// Refetch the current patient and update it in place.
    /// Resolves to `None` without fetching when nothing is selected.
    pub async fn refresh_current_patient(&self) -> Result<Option<Patient>, ContextError> {
        let request = self.latest_request.load(Ordering::SeqCst);
        let Some(patient_id) = self.current_patient_id() else {
            return Ok(None);
        };

        let fresh = self
            .directory
            .get_patient_by_id(&patient_id)
            .await
            .map_err(ContextError::from_fetch)?;

        let mut state = self.write_state()?;
        if let Some(entry) = state.patients.iter_mut().find(|p| p.id == patient_id) {
            *entry = fresh.clone();
        }
        let still_current = state.current_patient.as_ref().map(|p| p.id) == Some(patient_id);
        if still_current && self.is_latest(request) {
            state.current_patient = Some(fresh.clone());
        }
        Ok(Some(fresh))
    }

    /// Restore the persisted selection on load.
    ///
    /// Never fails: any problem is logged, the stale id is discarded and
    /// the context stays `Unselected`. Non-caregiver sessions always have
    /// their persisted id cleared.
    pub async fn restore(&self) -> Option<Patient> {
        if !self.is_caregiver() {
            self.discard_persisted();
            return None;
        }

        let raw = match self.store.get_item(CURRENT_PATIENT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Could not read persisted patient selection: {e}");
                return None;
            }
        };

        let Ok(patient_id) = Uuid::parse_str(raw.trim()) else {
            tracing::warn!(value = %raw, "Discarding unparsable persisted patient id");
            self.discard_persisted();
            return None;
        };

        let request = self.next_request();
        let cached = self.cached_patient(&patient_id).ok().flatten();
        let patient = match cached {
            Some(patient) => patient,
            None => match self.directory.get_patient_by_id(&patient_id).await {
                Ok(patient) => patient,
                Err(e) => {
                    tracing::warn!(patient_id = %patient_id, "Could not restore patient: {e}");
                    if let Ok(_state) = self.write_state() {
                        if self.is_latest(request) {
                            self.discard_persisted();
                        }
                    }
                    return None;
                }
            },
        };

        let mut state = match self.write_state() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Could not apply restored patient: {e}");
                return None;
            }
        };
        if !self.is_latest(request) {
            tracing::debug!(patient_id = %patient_id, "Discarding superseded restore");
            return None;
        }
        merge_current(&mut state, patient.clone());
        tracing::info!(patient_id = %patient_id, "Restored current patient");
        Some(patient)
    }

    /// Logout: clear the selection and forget the patient list.
    pub fn reset(&self) -> Result<(), ContextError> {
        let mut state = self.write_state()?;
        self.clear_locked(&mut state)?;
        state.patients.clear();
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────

    fn read_state(&self) -> Result<RwLockReadGuard<'_, ContextState>, ContextError> {
        self.state.read().map_err(|_| ContextError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, ContextState>, ContextError> {
        self.state.write().map_err(|_| ContextError::LockPoisoned)
    }

    fn require_caregiver(&self) -> Result<Uuid, ContextError> {
        match self.session {
            Some(session) if session.is_caregiver() => Ok(session.user_id),
            _ => Err(ContextError::NotCaregiver),
        }
    }

    fn next_request(&self) -> u64 {
        self.latest_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, request: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == request
    }

    fn cached_patient(&self, patient_id: &Uuid) -> Result<Option<Patient>, ContextError> {
        Ok(self
            .read_state()?
            .patients
            .iter()
            .find(|p| p.id == *patient_id)
            .cloned())
    }

    /// Persist and apply `patient` as one step, unless `request` was
    /// superseded. Store failures leave the state untouched.
    fn commit_selection(&self, request: u64, patient: Patient) -> Result<(), ContextError> {
        let mut state = self.write_state()?;
        if !self.is_latest(request) {
            tracing::debug!(patient_id = %patient.id, "Discarding superseded patient switch");
            return Err(ContextError::Superseded);
        }
        self.store
            .set_item(CURRENT_PATIENT_KEY, &patient.id.to_string())
            .map_err(ContextError::Store)?;
        merge_current(&mut state, patient);
        Ok(())
    }

    fn clear_locked(&self, state: &mut ContextState) -> Result<(), ContextError> {
        self.next_request();
        self.store
            .remove_item(CURRENT_PATIENT_KEY)
            .map_err(ContextError::Store)?;
        state.current_patient = None;
        tracing::info!("Cleared current patient");
        Ok(())
    }

    fn discard_persisted(&self) {
        if let Err(e) = self.store.remove_item(CURRENT_PATIENT_KEY) {
            tracing::warn!("Could not clear persisted patient selection: {e}");
        }
    }

}

/// Make `patient` current, merging it into `patients`.
fn merge_current(state: &mut ContextState, patient: Patient) {
    match state.patients.iter().position(|p| p.id == patient.id) {
        Some(index) => state.patients[index] = patient.clone(),
        None => state.patients.push(patient.clone()),
    }
    state.current_patient = Some(patient);
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
