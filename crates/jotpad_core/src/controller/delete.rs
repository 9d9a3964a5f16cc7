//! Delete affordance controller.
//!
//! # Responsibility
//! - Route a delete action on a rendered entry to the repository.
//! - Apply the configured `DeletePolicy` to the local list.
//!
//! # Invariants
//! - Deleting the placeholder never calls the repository.
//! - `NotFound` counts as success: the note is absent either way.
//! - Under `Optimistic`, a store failure restores the note in place.

use crate::controller::notification::{Notification, MSG_DELETE_FAILED, MSG_NOTE_DELETED};
use crate::model::note::NoteId;
use crate::projection::note_list::{EntryKey, NoteListProjector};
use crate::repo::note_repo::{NoteRepository, RepoError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How the local list reacts to a delete request. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove immediately, re-insert on failure.
    #[default]
    Optimistic,
    /// Wait for the store, then let the next snapshot (or a local removal
    /// when not subscribed) reflect it.
    Confirmed,
}

impl Display for DeletePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimistic => f.write_str("optimistic"),
            Self::Confirmed => f.write_str("confirmed"),
        }
    }
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(format!(
                "unsupported delete policy `{other}`; expected optimistic|confirmed"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Store had no such note in scope.
    AlreadyGone,
    PlaceholderDismissed,
    /// Store failed; list is as it was before the action.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub outcome: DeleteOutcome,
    pub notification: Notification,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteController {
    policy: DeletePolicy,
}

impl DeleteController {
    pub fn new(policy: DeletePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DeletePolicy {
        self.policy
    }

    /// Handles a delete action on the entry identified by `key`.
    pub fn delete<R: NoteRepository + ?Sized>(
        &self,
        key: &EntryKey,
        projector: &mut NoteListProjector,
        repo: &R,
    ) -> DeleteReport {
        match key {
            EntryKey::Placeholder => {
                projector.dismiss_placeholder();
                DeleteReport {
                    outcome: DeleteOutcome::PlaceholderDismissed,
                    notification: Notification::success(MSG_NOTE_DELETED),
                }
            }
            EntryKey::Note(id) => match self.policy {
                DeletePolicy::Optimistic => delete_optimistic(id, projector, repo),
                DeletePolicy::Confirmed => delete_confirmed(id, projector, repo),
            },
        }
    }
}

fn delete_optimistic<R: NoteRepository + ?Sized>(
    id: &NoteId,
    projector: &mut NoteListProjector,
    repo: &R,
) -> DeleteReport {
    let removed = projector.remove_local(id);
    match repo.delete_by_id(id) {
        Ok(()) => deleted_report(),
        Err(RepoError::NotFound(_)) => already_gone_report(),
        Err(err) => {
            warn!(
                "event=delete_note module=controller status=error policy=optimistic note_id={id} error={err}"
            );
            if let Some(removed) = removed {
                projector.restore(removed);
            }
            failed_report()
        }
    }
}

fn delete_confirmed<R: NoteRepository + ?Sized>(
    id: &NoteId,
    projector: &mut NoteListProjector,
    repo: &R,
) -> DeleteReport {
    let report = match repo.delete_by_id(id) {
        Ok(()) => deleted_report(),
        Err(RepoError::NotFound(_)) => already_gone_report(),
        Err(err) => {
            warn!(
                "event=delete_note module=controller status=error policy=confirmed note_id={id} error={err}"
            );
            return failed_report();
        }
    };

    // A live feed delivers the authoritative list next; mutate only when
    // nothing else will.
    if !projector.is_live() {
        projector.remove_local(id);
    }
    report
}

fn deleted_report() -> DeleteReport {
    DeleteReport {
        outcome: DeleteOutcome::Deleted,
        notification: Notification::success(MSG_NOTE_DELETED),
    }
}

fn already_gone_report() -> DeleteReport {
    DeleteReport {
        outcome: DeleteOutcome::AlreadyGone,
        notification: Notification::info(MSG_NOTE_DELETED),
    }
}

fn failed_report() -> DeleteReport {
    DeleteReport {
        outcome: DeleteOutcome::Failed,
        notification: Notification::error(MSG_DELETE_FAILED, true),
    }
}
