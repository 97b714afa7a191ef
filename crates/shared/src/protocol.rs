use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AspectId, CommentId, PostId, PostStatus, Sentiment, SourceId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AspectId>,
    pub aspect_name: String,
    #[serde(default)]
    pub aspect_text: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CommentId>,
    pub text: String,
    pub general_sentiment: Sentiment,
    #[serde(default)]
    pub aspects: Vec<AspectPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of the create and update post requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub caption: String,
    pub source: String,
    pub comments: Vec<CommentPayload>,
}

/// A post as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub caption: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<CommentPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl PostRecord {
    /// Projects the record into an update body. Server-managed fields are
    /// dropped; comment and aspect ids stay so existing rows are matched.
    pub fn to_payload(&self) -> PostPayload {
        PostPayload {
            caption: self.caption.clone(),
            source: self.source.clone(),
            comments: self
                .comments
                .iter()
                .map(|comment| CommentPayload {
                    created_at: None,
                    ..comment.clone()
                })
                .collect(),
        }
    }

    pub fn is_reviewed(&self) -> bool {
        self.status == PostStatus::Reviewed
    }
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostListing {
    Page {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<PostRecord>,
    },
    Plain(Vec<PostRecord>),
}

impl PostListing {
    pub fn into_posts(self) -> Vec<PostRecord> {
        match self {
            PostListing::Page { results, .. } => results,
            PostListing::Plain(posts) => posts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSuggestion {
    pub id: SourceId,
    pub name: String,
    #[serde(default)]
    pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: u64,
    pub total_comments: u64,
    pub sources_count: u64,
    #[serde(default)]
    pub last_seven_days: Vec<DailyCount>,
    #[serde(default)]
    pub top_sources: Vec<SourceCount>,
}
