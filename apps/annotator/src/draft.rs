//! Loads a post draft from JSON and replays it through the form controller,
//! so file submissions pass the same step checks as interactive ones.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use client_core::{AnnotationForm, AspectField};
use shared::protocol::PostPayload;
use tracing::debug;

pub fn read_draft(path: &Path) -> Result<PostPayload> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read draft '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid draft '{}'", path.display()))
}

/// Fills a fresh form from `draft` and walks it to the review step.
pub fn fill_form(draft: &PostPayload) -> Result<AnnotationForm> {
    let mut form = AnnotationForm::new();
    form.set_caption(draft.caption.as_str());
    form.set_source(draft.source.as_str());
    form.next()?;

    for (index, comment) in draft.comments.iter().enumerate() {
        let comment_id = if index == 0 {
            form.draft().comments[0].id
        } else {
            form.add_comment()
        };
        form.set_comment_text(comment_id, comment.text.as_str());
        form.set_comment_general_sentiment(comment_id, comment.general_sentiment);

        for (aspect_index, aspect) in comment.aspects.iter().enumerate() {
            let aspect_id = if aspect_index == 0 {
                form.draft()
                    .comments
                    .iter()
                    .find(|c| c.id == comment_id)
                    .and_then(|c| c.aspects.first())
                    .map(|a| a.id)
            } else {
                form.add_aspect(comment_id)
            };
            let Some(aspect_id) = aspect_id else {
                continue;
            };
            form.set_aspect_field(
                comment_id,
                aspect_id,
                AspectField::Name(aspect.aspect_name.clone()),
            );
            form.set_aspect_field(comment_id, aspect_id, AspectField::Sentiment(aspect.sentiment));
        }
    }

    let step = form.next()?;
    debug!(step = step.title(), comments = draft.comments.len(), "draft loaded");
    Ok(form)
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
