//! Multi-step annotation form: post details, comments with aspects, review.

use shared::{
    domain::{DraftId, Sentiment},
    protocol::{AspectPayload, CommentPayload, PostPayload, PostRecord},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::PostsApi;

pub const COMMENT_REQUIRED_WARNING: &str = "at least one comment required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FormStep {
    #[default]
    Details,
    Comments,
    Review,
}

impl FormStep {
    pub const ALL: [FormStep; 3] = [FormStep::Details, FormStep::Comments, FormStep::Review];
    pub const LAST: FormStep = FormStep::Review;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            FormStep::Details => "Post Caption",
            FormStep::Comments => "Comments",
            FormStep::Review => "Review",
        }
    }

    /// `min(current + 1, last)`. Does not validate.
    pub fn advance(self) -> Self {
        Self::from_index(self.index() + 1).unwrap_or(Self::LAST)
    }

    /// `max(current - 1, 0)`.
    pub fn retreat(self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(Self::from_index)
            .unwrap_or(FormStep::Details)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftAspect {
    pub id: DraftId,
    pub name: String,
    pub sentiment: Sentiment,
}

impl DraftAspect {
    fn blank() -> Self {
        Self {
            id: DraftId::generate(),
            name: String::new(),
            sentiment: Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftComment {
    pub id: DraftId,
    pub text: String,
    pub general_sentiment: Sentiment,
    pub aspects: Vec<DraftAspect>,
}

impl DraftComment {
    fn blank() -> Self {
        Self {
            id: DraftId::generate(),
            text: String::new(),
            general_sentiment: Sentiment::Neutral,
            aspects: vec![DraftAspect::blank()],
        }
    }

    fn aspect_mut(&mut self, aspect_id: DraftId) -> Option<&mut DraftAspect> {
        self.aspects.iter_mut().find(|aspect| aspect.id == aspect_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub caption: String,
    pub source: String,
    pub comments: Vec<DraftComment>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            caption: String::new(),
            source: String::new(),
            comments: vec![DraftComment::blank()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectField {
    Name(String),
    Sentiment(Sentiment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentRemoval {
    Removed,
    NotFound,
    /// The draft kept its only comment; the caller should show
    /// [`COMMENT_REQUIRED_WARNING`].
    LastComment,
}

impl CommentRemoval {
    pub fn warning(self) -> Option<&'static str> {
        match self {
            CommentRemoval::LastComment => Some(COMMENT_REQUIRED_WARNING),
            CommentRemoval::Removed | CommentRemoval::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepIncomplete {
    #[error("Please fill in both the source and post caption fields")]
    Details,
    #[error("Please fill in all comment fields and aspects")]
    Comments,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("the form can only be submitted from the review step (currently {0:?})")]
    NotOnReviewStep(FormStep),
    #[error(transparent)]
    Incomplete(#[from] StepIncomplete),
    #[error("Error creating post: {source}")]
    Create { source: anyhow::Error },
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationForm {
    draft: Draft,
    step: FormStep,
}

impl AnnotationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn set_caption(&mut self, text: impl Into<String>) {
        self.draft.caption = text.into();
    }

    pub fn set_source(&mut self, text: impl Into<String>) {
        self.draft.source = text.into();
    }

    /// Appends a blank comment and returns its id.
    pub fn add_comment(&mut self) -> DraftId {
        let comment = DraftComment::blank();
        let id = comment.id;
        self.draft.comments.push(comment);
        id
    }

    pub fn remove_comment(&mut self, comment_id: DraftId) -> CommentRemoval {
        if self.draft.comments.len() <= 1 {
            warn!(%comment_id, "form: refusing to remove the last comment");
            return CommentRemoval::LastComment;
        }
        let before = self.draft.comments.len();
        self.draft.comments.retain(|comment| comment.id != comment_id);
        if self.draft.comments.len() == before {
            CommentRemoval::NotFound
        } else {
            CommentRemoval::Removed
        }
    }

    pub fn set_comment_text(&mut self, comment_id: DraftId, text: impl Into<String>) {
        if let Some(comment) = self.comment_mut(comment_id) {
            comment.text = text.into();
        }
    }

    /// Appends a blank aspect to the comment. Returns `None` for an unknown
    /// comment.
    pub fn add_aspect(&mut self, comment_id: DraftId) -> Option<DraftId> {
        let comment = self.comment_mut(comment_id)?;
        let aspect = DraftAspect::blank();
        let id = aspect.id;
        comment.aspects.push(aspect);
        Some(id)
    }

    /// Removing a comment's only aspect is ignored.
    pub fn remove_aspect(&mut self, comment_id: DraftId, aspect_id: DraftId) {
        let Some(comment) = self.comment_mut(comment_id) else {
            return;
        };
        if comment.aspects.len() > 1 {
            comment.aspects.retain(|aspect| aspect.id != aspect_id);
        } else {
            debug!(%comment_id, %aspect_id, "form: ignoring removal of the last aspect");
        }
    }

    pub fn set_aspect_field(&mut self, comment_id: DraftId, aspect_id: DraftId, field: AspectField) {
        let Some(aspect) = self
            .comment_mut(comment_id)
            .and_then(|comment| comment.aspect_mut(aspect_id))
        else {
            return;
        };
        match field {
            AspectField::Name(name) => aspect.name = name,
            AspectField::Sentiment(sentiment) => aspect.sentiment = sentiment,
        }
    }

    pub fn set_comment_general_sentiment(&mut self, comment_id: DraftId, value: Sentiment) {
        if let Some(comment) = self.comment_mut(comment_id) {
            comment.general_sentiment = value;
        }
    }

    pub fn validate_step(&self, step: FormStep) -> bool {
        self.check_step(step).is_ok()
    }

    pub fn check_step(&self, step: FormStep) -> Result<(), StepIncomplete> {
        let filled = |value: &str| !value.trim().is_empty();
        match step {
            FormStep::Details => {
                if filled(&self.draft.caption) && filled(&self.draft.source) {
                    Ok(())
                } else {
                    Err(StepIncomplete::Details)
                }
            }
            FormStep::Comments => {
                let complete = self.draft.comments.iter().all(|comment| {
                    filled(&comment.text)
                        && comment.aspects.iter().all(|aspect| filled(&aspect.name))
                });
                if complete {
                    Ok(())
                } else {
                    Err(StepIncomplete::Comments)
                }
            }
            FormStep::Review => Ok(()),
        }
    }

    /// Validates the current step and moves forward when it passes.
    pub fn next(&mut self) -> Result<FormStep, StepIncomplete> {
        self.check_step(self.step)?;
        self.step = self.step.advance();
        Ok(self.step)
    }

    pub fn back(&mut self) -> FormStep {
        self.step = self.step.retreat();
        self.step
    }

    /// Projects the draft into the create-post request body.
    pub fn build_submission(&self) -> PostPayload {
        PostPayload {
            caption: self.draft.caption.clone(),
            source: self.draft.source.clone(),
            comments: self
                .draft
                .comments
                .iter()
                .map(|comment| CommentPayload {
                    id: None,
                    text: comment.text.clone(),
                    general_sentiment: comment.general_sentiment,
                    aspects: comment
                        .aspects
                        .iter()
                        .map(|aspect| AspectPayload {
                            id: None,
                            aspect_name: aspect.name.clone(),
                            aspect_text: String::new(),
                            sentiment: aspect.sentiment,
                        })
                        .collect(),
                    created_at: None,
                })
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Sends the draft to the backend. The form resets only when the post was
    /// created; otherwise the draft is kept for another attempt.
    pub async fn submit(&mut self, api: &dyn PostsApi) -> Result<PostRecord, SubmitError> {
        if self.step != FormStep::Review {
            return Err(SubmitError::NotOnReviewStep(self.step));
        }
        self.check_step(FormStep::Details)?;
        self.check_step(FormStep::Comments)?;

        let payload = self.build_submission();
        let created = api
            .create_post(&payload)
            .await
            .map_err(|source| SubmitError::Create { source })?;

        info!(
            post_id = created.id.0,
            comments = payload.comments.len(),
            "form: post created"
        );
        self.reset();
        Ok(created)
    }

    fn comment_mut(&mut self, comment_id: DraftId) -> Option<&mut DraftComment> {
        self.draft
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
