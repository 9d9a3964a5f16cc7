//! Live note session.
//!
//! # Responsibility
//! - Wire editor, delete controller and projector to one repository.
//! - Own the live subscription and feed its snapshots to the projector.
//! - Queue user-facing notifications in the order they were raised.
//!
//! # Invariants
//! - Snapshots are applied one by one in delivery order, none skipped.
//! - The subscription is cancelled on `close` and on drop.
//! - The session never mixes manual reloads with its live feed.

use crate::config::ClientConfig;
use crate::controller::delete::{DeleteController, DeleteOutcome, DeletePolicy};
use crate::controller::editor::{CharCounter, NoteEditor, SaveOutcome, DEFAULT_SOFT_CHAR_LIMIT};
use crate::controller::notification::{Notification, MSG_LOAD_FAILED};
use crate::projection::note_list::{EntryKey, ListEntry, NoteListProjector};
use crate::repo::note_repo::{NoteRepository, NoteSubscription, OrderSpec, RepoResult};
use log::{info, warn};
use std::collections::VecDeque;

/// Startup choices for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub delete_policy: DeletePolicy,
    pub soft_char_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::default(),
            soft_char_limit: DEFAULT_SOFT_CHAR_LIMIT,
        }
    }
}

impl From<&ClientConfig> for SessionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            delete_policy: config.delete_policy,
            soft_char_limit: config.soft_char_limit,
        }
    }
}

/// A live, owner-scoped view over the notes in one repository.
pub struct NotesSession<'repo, R: NoteRepository + ?Sized> {
    repo: &'repo R,
    projector: NoteListProjector,
    editor: NoteEditor,
    deleter: DeleteController,
    subscription: Option<NoteSubscription>,
    notifications: VecDeque<Notification>,
}

impl<'repo, R: NoteRepository + ?Sized> NotesSession<'repo, R> {
    /// Subscribes to the repository scope and applies the initial snapshot.
    pub fn open(repo: &'repo R, options: SessionOptions) -> RepoResult<Self> {
        let subscription = repo.subscribe(&repo.scope(), OrderSpec::CreatedAtDesc)?;
        info!(
            "event=session_open module=session status=ok subscription_id={} delete_policy={}",
            subscription.id(),
            options.delete_policy
        );

        let mut projector = NoteListProjector::new();
        projector.set_live(true);
        let mut session = Self {
            repo,
            projector,
            editor: NoteEditor::new(options.soft_char_limit),
            deleter: DeleteController::new(options.delete_policy),
            subscription: Some(subscription),
            notifications: VecDeque::new(),
        };
        session.pump();
        Ok(session)
    }

    /// Applies every queued snapshot in delivery order.
    ///
    /// Returns the number of snapshots applied. A failed delivery raises a
    /// notification and keeps the last list; before any list has arrived it
    /// falls back to the welcome placeholder.
    pub fn pump(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_ref() else {
            return 0;
        };

        let mut applied = 0;
        while let Some(event) = subscription.try_next() {
            match event {
                Ok(snapshot) => {
                    self.projector.on_snapshot(snapshot);
                    applied += 1;
                }
                Err(err) => {
                    warn!("event=session_snapshot module=session status=error error={err}");
                    self.projector.on_load_failed();
                    self.notifications
                        .push_back(Notification::error(MSG_LOAD_FAILED, true));
                }
            }
        }
        applied
    }

    /// Replaces the compose-box draft.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.editor.set_draft(text);
    }

    /// Saves the draft, then applies whatever the store pushed back.
    pub fn save(&mut self) -> SaveOutcome {
        let report = self.editor.save(self.repo);
        self.notifications.push_back(report.notification);
        self.pump();
        report.outcome
    }

    /// Deletes the entry identified by `key`, then applies pushed snapshots.
    pub fn delete(&mut self, key: &EntryKey) -> DeleteOutcome {
        let report = self.deleter.delete(key, &mut self.projector, self.repo);
        self.notifications.push_back(report.notification);
        if report.outcome != DeleteOutcome::PlaceholderDismissed {
            self.pump();
        }
        report.outcome
    }

    pub fn entries(&self) -> &[ListEntry] {
        self.projector.entries()
    }

    pub fn projector(&self) -> &NoteListProjector {
        &self.projector
    }

    pub fn draft(&self) -> &str {
        self.editor.draft()
    }

    pub fn counter(&self) -> CharCounter {
        self.editor.counter()
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.deleter.policy()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Takes all queued notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Cancels the live subscription and ends the session.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            let id = subscription.id();
            self.repo.cancel(subscription);
            self.projector.set_live(false);
            info!("event=session_close module=session status=ok subscription_id={id}");
        }
    }
}

impl<R: NoteRepository + ?Sized> Drop for NotesSession<'_, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
