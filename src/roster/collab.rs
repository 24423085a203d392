// SPDX-License-Identifier: MIT

//! Contracts for the UI collaborators the roster talks to
//!
//! - `ImagePicker` - returns a picture URI or a cancellation
//! - `ConfirmDialog` - asks the user to choose between labeled actions
//!
//! `choose_picture` and `confirm_and_remove` are the flows built on them.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::RosterError;
use super::model::{Field, WorkerId, WorkerRecord};
use super::session::{AddForm, Session};
use super::store::RosterStore;

pub const PERMISSION_MESSAGE: &str = "Permission to access gallery is required!";
pub const REMOVE_TITLE: &str = "Remove Worker";
pub const REMOVE_LABEL: &str = "Remove";
pub const CANCEL_LABEL: &str = "Cancel";

/// Marker that is always `true` on the wire; `false` does not deserialize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flag;

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(true)
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if bool::deserialize(deserializer)? {
            Ok(Flag)
        } else {
            Err(D::Error::custom("expected `true`"))
        }
    }
}

/// Result of an image pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PickOutcome {
    Picked { uri: String },
    Cancelled { cancelled: Flag },
    PermissionDenied { denied: Flag },
}

impl PickOutcome {
    pub fn picked(uri: impl Into<String>) -> Self {
        Self::Picked { uri: uri.into() }
    }

    pub fn cancelled() -> Self {
        Self::Cancelled { cancelled: Flag }
    }

    pub fn denied() -> Self {
        Self::PermissionDenied { denied: Flag }
    }
}

#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn pick(&self) -> PickOutcome;
}

/// A draft that can receive a picked picture URI
pub trait PictureDraft {
    fn set_picture(&mut self, uri: String) -> Result<(), RosterError>;
}

impl PictureDraft for AddForm {
    fn set_picture(&mut self, uri: String) -> Result<(), RosterError> {
        self.set_field(Field::Picture, uri);
        Ok(())
    }
}

impl PictureDraft for Session {
    fn set_picture(&mut self, uri: String) -> Result<(), RosterError> {
        self.set_field(Field::Picture, uri)
    }
}

/// Ask the picker for a picture and stage it in `draft`. The store is not
/// touched until the draft is saved. Cancel and denial leave the draft as is.
pub async fn choose_picture<D>(
    picker: &dyn ImagePicker,
    draft: &mut D,
) -> Result<PickOutcome, RosterError>
where
    D: PictureDraft + ?Sized,
{
    let outcome = picker.pick().await;
    match &outcome {
        PickOutcome::Picked { uri } => draft.set_picture(uri.clone())?,
        PickOutcome::Cancelled { .. } => log::debug!("Image pick cancelled"),
        PickOutcome::PermissionDenied { .. } => log::warn!("{}", PERMISSION_MESSAGE),
    }
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStyle {
    Cancel,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogAction {
    pub label: String,
    pub style: ActionStyle,
}

static REMOVE_ACTIONS: Lazy<Vec<DialogAction>> = Lazy::new(|| {
    vec![
        DialogAction {
            label: CANCEL_LABEL.to_string(),
            style: ActionStyle::Cancel,
        },
        DialogAction {
            label: REMOVE_LABEL.to_string(),
            style: ActionStyle::Destructive,
        },
    ]
});

#[async_trait]
pub trait ConfirmDialog: Send + Sync {
    /// Returns the label of the chosen action, `None` if dismissed
    async fn choose(
        &self,
        title: &str,
        prompt: &str,
        actions: &[DialogAction],
    ) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(WorkerRecord),
    Cancelled,
}

pub fn remove_prompt(name: &str) -> String {
    format!("Are you sure you want to remove {}?", name)
}

/// Confirm, then remove. Anything but the destructive action leaves the
/// roster unchanged.
pub async fn confirm_and_remove(
    store: &RosterStore,
    dialog: &dyn ConfirmDialog,
    id: WorkerId,
) -> Result<RemoveOutcome, RosterError> {
    let worker = store.get(id).await?;
    let choice = dialog
        .choose(REMOVE_TITLE, &remove_prompt(&worker.name), &REMOVE_ACTIONS)
        .await;

    if choice.as_deref() != Some(REMOVE_LABEL) {
        log::debug!("Removal of worker {} cancelled", id);
        return Ok(RemoveOutcome::Cancelled);
    }
    let removed = store.remove(id).await?;
    Ok(RemoveOutcome::Removed(removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::model::{WorkerPatch, WorkerRecordInput};
    use crate::roster::session::Selection;
    use crate::roster::storage::{MemoryStorage, RosterPersistence, DEFAULT_STORAGE_KEY};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct MockPicker(PickOutcome);

    #[async_trait]
    impl ImagePicker for MockPicker {
        async fn pick(&self) -> PickOutcome {
            self.0.clone()
        }
    }

    /// Dialog that answers with a fixed label and records what it was asked
    struct MockDialog {
        answer: Option<String>,
        asked: Mutex<Vec<(String, String, Vec<DialogAction>)>>,
    }

    impl MockDialog {
        fn new(answer: Option<&str>) -> Self {
            Self {
                answer: answer.map(str::to_string),
                asked: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl ConfirmDialog for MockDialog {
        async fn choose(
            &self,
            title: &str,
            prompt: &str,
            actions: &[DialogAction],
        ) -> Option<String> {
            self.asked
                .lock()
                .unwrap()
                .push((title.to_string(), prompt.to_string(), actions.to_vec()));
            self.answer.clone()
        }
    }

    async fn store_with_ana() -> (RosterStore, WorkerRecord) {
        let persistence =
            RosterPersistence::new(Arc::new(MemoryStorage::new()), DEFAULT_STORAGE_KEY);
        let store = RosterStore::new(persistence, false);
        store.initialize().await.unwrap();
        let ana = store
            .add(WorkerRecordInput::new("Ana", "30", "2024-01-01"))
            .await
            .unwrap();
        (store, ana)
    }

    #[test]
    fn test_pick_outcome_wire_shape() {
        assert_eq!(
            serde_json::to_value(PickOutcome::picked("file:///a.jpg")).unwrap(),
            json!({"uri": "file:///a.jpg"})
        );
        assert_eq!(
            serde_json::to_value(PickOutcome::denied()).unwrap(),
            json!({"denied": true})
        );
        let cancelled: PickOutcome = serde_json::from_value(json!({"cancelled": true})).unwrap();
        assert_eq!(cancelled, PickOutcome::cancelled());
    }

    #[test]
    fn test_pick_outcome_rejects_false_flags() {
        for value in [json!({"cancelled": false}), json!({"denied": false})] {
            assert!(serde_json::from_value::<PickOutcome>(value.clone()).is_err(), "{}", value);
        }
    }

    #[tokio::test]
    async fn test_picked_uri_goes_to_add_draft() {
        let mut form = AddForm::new();
        let picker = MockPicker(PickOutcome::picked("file:///a.jpg"));

        choose_picture(&picker, &mut form).await.unwrap();
        assert_eq!(form.draft().picture.as_deref(), Some("file:///a.jpg"));
    }

    #[tokio::test]
    async fn test_cancel_and_denial_leave_draft() {
        let mut form = AddForm::new();
        form.set_field(Field::Picture, "file:///old.jpg");

        for outcome in [PickOutcome::cancelled(), PickOutcome::denied()] {
            let picker = MockPicker(outcome.clone());
            assert_eq!(choose_picture(&picker, &mut form).await.unwrap(), outcome);
            assert_eq!(form.draft().picture.as_deref(), Some("file:///old.jpg"));
        }
    }

    #[tokio::test]
    async fn test_picture_reaches_store_only_on_save() {
        let (store, ana) = store_with_ana().await;
        let mut session = Session::new();
        session.open_editor(&store, ana.id).await.unwrap();

        let picker = MockPicker(PickOutcome::picked("file:///new.jpg"));
        choose_picture(&picker, &mut session).await.unwrap();
        assert_eq!(store.get(ana.id).await.unwrap().picture, None);
        assert_eq!(
            session.draft(),
            Some(&WorkerPatch::new().with(Field::Picture, "file:///new.jpg"))
        );

        session.save(&store).await.unwrap();
        assert_eq!(
            store.get(ana.id).await.unwrap().picture.as_deref(),
            Some("file:///new.jpg")
        );
    }

    #[tokio::test]
    async fn test_picking_outside_editor_fails() {
        let mut session = Session::new();
        assert_eq!(session.selection(), Selection::Idle);
        let picker = MockPicker(PickOutcome::picked("file:///x.jpg"));
        assert!(matches!(
            choose_picture(&picker, &mut session).await,
            Err(RosterError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_confirmed_remove() {
        let (store, ana) = store_with_ana().await;
        let dialog = MockDialog::new(Some(REMOVE_LABEL));

        let outcome = confirm_and_remove(&store, &dialog, ana.id).await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed(ana.clone()));
        assert!(store.list().await.unwrap().is_empty());

        let asked = dialog.asked.lock().unwrap();
        assert_eq!(asked[0].0, "Remove Worker");
        assert_eq!(asked[0].1, "Are you sure you want to remove Ana?");
        assert_eq!(asked[0].2[1].style, ActionStyle::Destructive);
    }

    #[tokio::test]
    async fn test_cancelled_or_dismissed_remove() {
        let (store, ana) = store_with_ana().await;

        for answer in [Some(CANCEL_LABEL), None] {
            let dialog = MockDialog::new(answer);
            let outcome = confirm_and_remove(&store, &dialog, ana.id).await.unwrap();
            assert_eq!(outcome, RemoveOutcome::Cancelled);
        }
        assert_eq!(store.list().await.unwrap(), vec![ana]);
    }

    #[tokio::test]
    async fn test_remove_unknown_never_asks() {
        let (store, _) = store_with_ana().await;
        let dialog = MockDialog::new(Some(REMOVE_LABEL));

        let err = confirm_and_remove(&store, &dialog, WorkerId(9)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(dialog.asked.lock().unwrap().is_empty());
    }
}
