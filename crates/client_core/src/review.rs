//! Linear undo/redo history over a post under review, plus the save
//! round-trip to the backend.
//!
//! Every edit records a full snapshot. Making an edit after undoing drops the
//! undone snapshots; there is no branching history.

use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::{domain::PostStatus, protocol::PostRecord};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::PostsApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPhase {
    Idle,
    Editing,
    /// Terminal for the session: edits and saves are ignored until the next
    /// [`ReviewSession::load`].
    Saved,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("no post is loaded for review")]
    NothingLoaded,
    #[error("failed to save post {post_id}: {source}")]
    Save { post_id: i64, source: anyhow::Error },
    #[error("failed to mark post {post_id} reviewed: {source}")]
    MarkReviewed { post_id: i64, source: anyhow::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Persisted {
        record: PostRecord,
        marked_reviewed: bool,
    },
    /// Another save was still in flight; nothing was sent.
    AlreadySaving,
    AlreadySaved,
}

#[derive(Debug)]
struct ReviewState {
    history: Vec<PostRecord>,
    cursor: usize,
    is_saving: bool,
    last_error: Option<String>,
    phase: ReviewPhase,
    /// Bumped by every `load`; a save only settles the post it started on.
    generation: u64,
}

impl ReviewState {
    fn current(&self) -> Option<&PostRecord> {
        self.history.get(self.cursor)
    }
}

#[derive(Debug)]
pub struct ReviewSession {
    state: Mutex<ReviewState>,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReviewState {
                history: Vec::new(),
                cursor: 0,
                is_saving: false,
                last_error: None,
                phase: ReviewPhase::Idle,
                generation: 0,
            }),
        }
    }

    pub fn load(&self, post: PostRecord) {
        let mut state = self.lock();
        debug!(post_id = post.id.0, "review: loading post");
        state.history = vec![post];
        state.cursor = 0;
        state.last_error = None;
        state.phase = ReviewPhase::Editing;
        state.is_saving = false;
        state.generation += 1;
    }

    /// Records `post` as the newest snapshot, discarding anything that could
    /// still be redone.
    pub fn update(&self, post: PostRecord) {
        let mut state = self.lock();
        match state.phase {
            ReviewPhase::Saved => {
                debug!(post_id = post.id.0, "review: ignoring edit after save");
                return;
            }
            ReviewPhase::Idle => state.phase = ReviewPhase::Editing,
            ReviewPhase::Editing => {}
        }
        let keep = if state.history.is_empty() {
            0
        } else {
            state.cursor + 1
        };
        state.history.truncate(keep);
        state.history.push(post);
        state.cursor = state.history.len() - 1;
        state.last_error = None;
    }

    /// Applies `change` to a copy of the current snapshot and records the
    /// result. Returns `false` when there was nothing to edit.
    pub fn edit(&self, change: impl FnOnce(&mut PostRecord)) -> bool {
        let Some(mut next) = ({
            let state = self.lock();
            if state.phase == ReviewPhase::Saved {
                None
            } else {
                state.current().cloned()
            }
        }) else {
            return false;
        };
        change(&mut next);
        self.update(next);
        true
    }

    pub fn undo(&self) {
        let mut state = self.lock();
        if state.phase == ReviewPhase::Editing && state.cursor > 0 {
            state.cursor -= 1;
        }
    }

    pub fn redo(&self) {
        let mut state = self.lock();
        if state.phase == ReviewPhase::Editing && state.cursor + 1 < state.history.len() {
            state.cursor += 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        let state = self.lock();
        state.phase == ReviewPhase::Editing && state.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        let state = self.lock();
        state.phase == ReviewPhase::Editing && state.cursor + 1 < state.history.len()
    }

    pub fn current(&self) -> Option<PostRecord> {
        self.lock().current().cloned()
    }

    pub fn history(&self) -> Vec<PostRecord> {
        self.lock().history.clone()
    }

    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    pub fn is_saving(&self) -> bool {
        self.lock().is_saving
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn phase(&self) -> ReviewPhase {
        self.lock().phase
    }

    /// Persists the current snapshot and marks it reviewed if it was not
    /// already. At most one save runs at a time; a call made while another
    /// is pending returns [`SaveOutcome::AlreadySaving`] without touching
    /// the backend. A failed save keeps history and cursor as they were.
    /// If another post was loaded meanwhile, the result is returned but
    /// leaves the newly loaded post untouched.
    pub async fn save(&self, api: &dyn PostsApi) -> Result<SaveOutcome, ReviewError> {
        let (snapshot, generation) = {
            let mut state = self.lock();
            match state.phase {
                ReviewPhase::Idle => return Err(ReviewError::NothingLoaded),
                ReviewPhase::Saved => return Ok(SaveOutcome::AlreadySaved),
                ReviewPhase::Editing => {}
            }
            if state.is_saving {
                debug!("review: save already in flight");
                return Ok(SaveOutcome::AlreadySaving);
            }
            let Some(snapshot) = state.current().cloned() else {
                return Err(ReviewError::NothingLoaded);
            };
            state.is_saving = true;
            state.last_error = None;
            (snapshot, state.generation)
        };

        let result = persist(api, &snapshot).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                post_id = snapshot.id.0,
                "review: save finished after another post was loaded"
            );
            return result;
        }
        state.is_saving = false;
        match result {
            Ok(outcome) => {
                state.phase = ReviewPhase::Saved;
                info!(post_id = snapshot.id.0, "review: post saved");
                Ok(outcome)
            }
            Err(err) => {
                error!(post_id = snapshot.id.0, "review: save failed: {err}");
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReviewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn persist(api: &dyn PostsApi, snapshot: &PostRecord) -> Result<SaveOutcome, ReviewError> {
    let post_id = snapshot.id;
    let updated = api
        .update_post(post_id, &snapshot.to_payload())
        .await
        .map_err(|source| ReviewError::Save {
            post_id: post_id.0,
            source,
        })?;

    if snapshot.status != PostStatus::Unreviewed {
        return Ok(SaveOutcome::Persisted {
            record: updated,
            marked_reviewed: false,
        });
    }

    let reviewed = api
        .mark_reviewed(post_id)
        .await
        .map_err(|source| ReviewError::MarkReviewed {
            post_id: post_id.0,
            source,
        })?;
    Ok(SaveOutcome::Persisted {
        record: reviewed,
        marked_reviewed: true,
    })
}

#[cfg(test)]
#[path = "tests/review_tests.rs"]
mod tests;
