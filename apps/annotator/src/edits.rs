use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::{
    domain::Sentiment,
    protocol::{AspectPayload, PostRecord},
};

/// One reviewer correction, addressed by comment and aspect position.
/// Positions that do not exist leave the post untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    Caption { value: String },
    Source { value: String },
    CommentText { comment: usize, value: String },
    CommentSentiment { comment: usize, value: Sentiment },
    AspectName { comment: usize, aspect: usize, value: String },
    AspectSentiment { comment: usize, aspect: usize, value: Sentiment },
    /// Appends a blank neutral aspect to the comment.
    AddAspect { comment: usize },
    RemoveAspect { comment: usize, aspect: usize },
}

impl Edit {
    pub fn apply(&self, post: &mut PostRecord) {
        match self {
            Edit::Caption { value } => post.caption = value.clone(),
            Edit::Source { value } => post.source = value.clone(),
            Edit::CommentText { comment, value } => {
                if let Some(c) = post.comments.get_mut(*comment) {
                    c.text = value.clone();
                }
            }
            Edit::CommentSentiment { comment, value } => {
                if let Some(c) = post.comments.get_mut(*comment) {
                    c.general_sentiment = *value;
                }
            }
            Edit::AspectName {
                comment,
                aspect,
                value,
            } => {
                if let Some(a) = aspect_mut(post, *comment, *aspect) {
                    a.aspect_name = value.clone();
                }
            }
            Edit::AspectSentiment {
                comment,
                aspect,
                value,
            } => {
                if let Some(a) = aspect_mut(post, *comment, *aspect) {
                    a.sentiment = *value;
                }
            }
            Edit::AddAspect { comment } => {
                if let Some(c) = post.comments.get_mut(*comment) {
                    c.aspects.push(AspectPayload {
                        id: None,
                        aspect_name: String::new(),
                        aspect_text: String::new(),
                        sentiment: Sentiment::Neutral,
                    });
                }
            }
            Edit::RemoveAspect { comment, aspect } => {
                if let Some(c) = post.comments.get_mut(*comment) {
                    if *aspect < c.aspects.len() {
                        c.aspects.remove(*aspect);
                    }
                }
            }
        }
    }
}

fn aspect_mut(post: &mut PostRecord, comment: usize, aspect: usize) -> Option<&mut AspectPayload> {
    post.comments.get_mut(comment)?.aspects.get_mut(aspect)
}

pub fn read_edits(path: &Path) -> Result<Vec<Edit>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read edits '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid edits '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/edits_tests.rs"]
mod tests;
