//! Reviewer work list: unreviewed posts first, then reviewed ones.

use anyhow::Result;
use shared::{domain::PostId, protocol::PostRecord};
use tracing::info;

use crate::PostsApi;

pub const ITEMS_PER_PAGE: usize = 10;
pub const EXCERPT_CHARS: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct VerificationQueue {
    unreviewed: Vec<PostRecord>,
    reviewed: Vec<PostRecord>,
}

impl VerificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh(&mut self, api: &dyn PostsApi) -> Result<()> {
        let (unreviewed, reviewed) =
            tokio::try_join!(api.list_unreviewed_posts(), api.list_reviewed_posts())?;
        info!(
            unreviewed = unreviewed.len(),
            reviewed = reviewed.len(),
            "verification: queue refreshed"
        );
        self.unreviewed = unreviewed;
        self.reviewed = reviewed;
        Ok(())
    }

    pub fn unreviewed(&self) -> &[PostRecord] {
        &self.unreviewed
    }

    pub fn reviewed(&self) -> &[PostRecord] {
        &self.reviewed
    }

    pub fn len(&self) -> usize {
        self.unreviewed.len() + self.reviewed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn page_count(&self) -> usize {
        self.len().div_ceil(ITEMS_PER_PAGE)
    }

    /// One-based page of the combined list. Out-of-range pages are empty.
    pub fn page(&self, page: usize) -> Vec<&PostRecord> {
        let Some(skip) = page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(ITEMS_PER_PAGE))
        else {
            return Vec::new();
        };
        self.unreviewed
            .iter()
            .chain(self.reviewed.iter())
            .skip(skip)
            .take(ITEMS_PER_PAGE)
            .collect()
    }

    /// A copy of the listed post, ready to hand to a review session.
    pub fn take_for_review(&self, id: PostId) -> Option<PostRecord> {
        self.unreviewed
            .iter()
            .chain(self.reviewed.iter())
            .find(|post| post.id == id)
            .cloned()
    }

    pub async fn approve(&mut self, api: &dyn PostsApi, id: PostId) -> Result<PostRecord> {
        let reviewed = api.mark_reviewed(id).await?;
        info!(post_id = id.0, "verification: post approved");
        self.record_saved(reviewed.clone());
        Ok(reviewed)
    }

    /// Files a post the backend just returned under the list matching its
    /// status.
    pub fn record_saved(&mut self, record: PostRecord) {
        self.unreviewed.retain(|post| post.id != record.id);
        self.reviewed.retain(|post| post.id != record.id);
        if record.is_reviewed() {
            self.reviewed.push(record);
        } else {
            self.unreviewed.push(record);
        }
    }
}

/// One-based page of a single list, for views that page one status at a time.
pub fn page_slice<T>(items: &[T], page: usize) -> &[T] {
    let start = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(ITEMS_PER_PAGE))
        .map_or(items.len(), |start| start.min(items.len()));
    let end = start.saturating_add(ITEMS_PER_PAGE).min(items.len());
    &items[start..end]
}

pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/verification_tests.rs"]
mod tests;
