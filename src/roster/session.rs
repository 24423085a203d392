// SPDX-License-Identifier: MIT

//! Selection and form state for the roster screens
//!
//! - `Session` - which single worker is open for viewing or editing
//! - `AddForm` - the add-worker draft and its per-field errors
//!
//! Both hold owned copies of records. Nothing here keeps a reference into
//! the store; edits reach it only through `save`/`submit`.

use super::error::{FieldError, RosterError};
use super::model::{Field, WorkerId, WorkerPatch, WorkerRecord, WorkerRecordInput};
use super::store::{RosterEvent, RosterStore};

/// The single worker currently targeted, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    Viewing(WorkerId),
    Editing(WorkerId),
}

impl Selection {
    pub fn id(&self) -> Option<WorkerId> {
        match self {
            Selection::Idle => None,
            Selection::Viewing(id) | Selection::Editing(id) => Some(*id),
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    selection: Selection,
    /// Pending changes while `Editing`
    draft: WorkerPatch,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Open the info view. Replaces any current selection.
    pub async fn open_info(
        &mut self,
        store: &RosterStore,
        id: WorkerId,
    ) -> Result<WorkerRecord, RosterError> {
        let record = store.get(id).await?;
        self.draft = WorkerPatch::default();
        self.selection = Selection::Viewing(id);
        log::debug!("Viewing worker {}", id);
        Ok(record)
    }

    /// Open the update form with an empty draft. Replaces any current selection.
    pub async fn open_editor(
        &mut self,
        store: &RosterStore,
        id: WorkerId,
    ) -> Result<WorkerRecord, RosterError> {
        let record = store.get(id).await?;
        self.draft = WorkerPatch::default();
        self.selection = Selection::Editing(id);
        log::debug!("Editing worker {}", id);
        Ok(record)
    }

    /// Stage a field change in the edit draft
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Result<(), RosterError> {
        match self.selection {
            Selection::Editing(_) => {
                self.draft.set(field, value);
                Ok(())
            }
            other => Err(RosterError::InvalidTransition(format!(
                "cannot edit fields while {:?}",
                other
            ))),
        }
    }

    pub fn draft(&self) -> Option<&WorkerPatch> {
        match self.selection {
            Selection::Editing(_) => Some(&self.draft),
            _ => None,
        }
    }

    /// Commit the draft through `update`, then return to `Idle`.
    /// On failure the selection and draft are kept so the user can retry.
    pub async fn save(&mut self, store: &RosterStore) -> Result<WorkerRecord, RosterError> {
        let id = match self.selection {
            Selection::Editing(id) => id,
            other => {
                return Err(RosterError::InvalidTransition(format!(
                    "cannot save while {:?}",
                    other
                )))
            }
        };

        let updated = store.update(id, self.draft.clone()).await?;
        self.close();
        Ok(updated)
    }

    /// Back to `Idle`, discarding any draft
    pub fn close(&mut self) {
        self.selection = Selection::Idle;
        self.draft = WorkerPatch::default();
    }

    /// Drop the selection if its worker was removed
    pub fn apply_event(&mut self, event: &RosterEvent) {
        if let RosterEvent::Removed { id } = event {
            if self.selection.id() == Some(*id) {
                log::debug!("Selected worker {} was removed, closing", id);
                self.close();
            }
        }
    }
}

/// Add-worker form
#[derive(Debug, Default)]
pub struct AddForm {
    visible: bool,
    draft: WorkerRecordInput,
    errors: Vec<FieldError>,
}

impl AddForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hide the form and throw the draft away
    pub fn cancel(&mut self) {
        self.visible = false;
        self.reset();
    }

    pub fn draft(&self) -> &WorkerRecordInput {
        &self.draft
    }

    /// Edit a field; clears any error shown for it
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.draft.set(field, value);
        self.errors.retain(|e| e.field != field);
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn error_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Hand the draft to the store. Success resets and hides the form;
    /// a validation failure keeps the draft and records the field errors.
    pub async fn submit(&mut self, store: &RosterStore) -> Result<WorkerRecord, RosterError> {
        match store.add(self.draft.clone()).await {
            Ok(record) => {
                self.visible = false;
                self.reset();
                Ok(record)
            }
            Err(RosterError::Validation(errors)) => {
                self.errors = errors.clone();
                Err(RosterError::Validation(errors))
            }
            Err(e) => Err(e),
        }
    }

    fn reset(&mut self) {
        self.draft = WorkerRecordInput::default();
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::storage::{MemoryStorage, RosterPersistence, DEFAULT_STORAGE_KEY};
    use std::sync::Arc;

    async fn ready_store() -> RosterStore {
        let persistence =
            RosterPersistence::new(Arc::new(MemoryStorage::new()), DEFAULT_STORAGE_KEY);
        let store = RosterStore::new(persistence, false);
        store.initialize().await.unwrap();
        store
    }

    async fn with_ana(store: &RosterStore) -> WorkerRecord {
        store
            .add(WorkerRecordInput::new("Ana", "30", "2024-01-01"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_view_then_close() {
        let store = ready_store().await;
        let ana = with_ana(&store).await;
        let mut session = Session::new();

        let shown = session.open_info(&store, ana.id).await.unwrap();
        assert_eq!(shown, ana);
        assert_eq!(session.selection(), Selection::Viewing(ana.id));
        assert!(session.draft().is_none());

        session.close();
        assert_eq!(session.selection(), Selection::Idle);
    }

    #[tokio::test]
    async fn test_opening_replaces_selection() {
        let store = ready_store().await;
        let ana = with_ana(&store).await;
        let ben = store
            .add(WorkerRecordInput::new("Ben", "41", "2023-06-12"))
            .await
            .unwrap();
        let mut session = Session::new();

        session.open_info(&store, ana.id).await.unwrap();
        session.open_editor(&store, ben.id).await.unwrap();
        assert_eq!(session.selection(), Selection::Editing(ben.id));

        session.open_info(&store, ana.id).await.unwrap();
        assert_eq!(session.selection(), Selection::Viewing(ana.id));
    }

    #[tokio::test]
    async fn test_open_unknown_keeps_selection() {
        let store = ready_store().await;
        let ana = with_ana(&store).await;
        let mut session = Session::new();
        session.open_info(&store, ana.id).await.unwrap();

        let err = session.open_editor(&store, WorkerId(3)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(session.selection(), Selection::Viewing(ana.id));
    }

    #[tokio::test]
    async fn test_edit_and_save() {
        let store = ready_store().await;
        let ana = with_ana(&store).await;
        let mut session = Session::new();

        session.open_editor(&store, ana.id).await.unwrap();
        session.set_field(Field::Phone, "555-1234").unwrap();
        session.set_field(Field::Picture, "file:///ana.jpg").unwrap();

        let saved = session.save(&store).await.unwrap();
        assert_eq!(saved.phone.as_deref(), Some("555-1234"));
        assert_eq!(saved.picture.as_deref(), Some("file:///ana.jpg"));
        assert_eq!(saved.name, "Ana");
        assert_eq!(session.selection(), Selection::Idle);
        assert_eq!(store.get(ana.id).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_draft() {
        let store = ready_store().await;
        let ana = with_ana(&store).await;
        let mut session = Session::new();

        session.open_editor(&store, ana.id).await.unwrap();
        session.set_field(Field::Name, "").unwrap();
        let err = session.save(&store).await.unwrap_err();

        assert_eq!(err.invalid_fields(), vec![Field::Name]);
        assert_eq!(session.selection(), Selection::Editing(ana.id));
        assert_eq!(session.draft().unwrap().name.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_edit_requires_editing_state() {
        let store = ready_store().await;
        let ana = with_ana(&store).await;
        let mut session = Session::new();

        assert!(matches!(
            session.set_field(Field::Name, "X"),
            Err(RosterError::InvalidTransition(_))
        ));
        session.open_info(&store, ana.id).await.unwrap();
        assert!(matches!(
            session.save(&store).await,
            Err(RosterError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_removed_worker_closes_selection() {
        let store = ready_store().await;
        let ana = with_ana(&store).await;
        let mut session = Session::new();
        session.open_editor(&store, ana.id).await.unwrap();

        session.apply_event(&RosterEvent::Removed { id: WorkerId(1) });
        assert_eq!(session.selection(), Selection::Editing(ana.id));

        session.apply_event(&RosterEvent::Removed { id: ana.id });
        assert_eq!(session.selection(), Selection::Idle);
    }

    #[tokio::test]
    async fn test_add_form_errors_then_success() {
        let store = ready_store().await;
        let mut form = AddForm::new();
        form.show();
        form.set_field(Field::Age, "30");

        let err = form.submit(&store).await.unwrap_err();
        assert_eq!(err.invalid_fields(), vec![Field::Name, Field::StartDate]);
        assert_eq!(form.error_for(Field::Name), Some("Name is required."));
        assert!(form.is_visible());
        assert_eq!(form.draft().age, "30");

        form.set_field(Field::Name, "Ana");
        assert!(form.error_for(Field::Name).is_none());
        assert!(form.error_for(Field::StartDate).is_some());

        form.set_field(Field::StartDate, "2024-01-01");
        let record = form.submit(&store).await.unwrap();
        assert_eq!(record.name, "Ana");
        assert!(!form.is_visible());
        assert_eq!(form.draft(), &WorkerRecordInput::default());
        assert!(form.errors().is_empty());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[test]
    fn test_add_form_cancel_discards_draft() {
        let mut form = AddForm::new();
        form.show();
        form.set_field(Field::Name, "Ana");
        form.cancel();
        assert!(!form.is_visible());
        assert_eq!(form.draft().name, "");
    }
}
