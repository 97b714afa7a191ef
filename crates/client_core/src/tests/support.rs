use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    domain::{AspectId, CommentId, PostId, PostStatus, Sentiment, SourceId, User, UserId},
    error::ApiException,
    protocol::{
        AspectPayload, CommentPayload, Credentials, DailyCount, DashboardStats, PostPayload,
        PostRecord, SourceCount, SourceSuggestion, TokenPair,
    },
};
use tokio::sync::Notify;

use crate::{AuthApi, PostsApi};

pub(crate) fn sample_post(id: i64, status: PostStatus) -> PostRecord {
    PostRecord {
        id: PostId(id),
        caption: format!("caption {id}"),
        source: "@SHOP".to_string(),
        created_at: None,
        comments: vec![CommentPayload {
            id: Some(CommentId(id * 10)),
            text: "Great".to_string(),
            general_sentiment: Sentiment::Positive,
            aspects: vec![AspectPayload {
                id: Some(AspectId(id * 100)),
                aspect_name: "price".to_string(),
                aspect_text: String::new(),
                sentiment: Sentiment::Negative,
            }],
            created_at: None,
        }],
        user: Some(UserId(1)),
        username: Some("ana".to_string()),
        status,
        reviewed_by: None,
        reviewed_at: None,
    }
}

#[derive(Default)]
pub(crate) struct FakePostsApi {
    pub calls: Mutex<Vec<String>>,
    pub payloads: Mutex<Vec<PostPayload>>,
    pub fail_create: Option<String>,
    pub fail_update: Option<String>,
    pub fail_review: Option<String>,
    pub unreviewed: Vec<PostRecord>,
    pub reviewed: Vec<PostRecord>,
    pub sources: Vec<SourceSuggestion>,
    /// When set, `update_post` parks until the gate is notified.
    pub update_gate: Option<Arc<Notify>>,
    pub update_started: Arc<Notify>,
}

impl FakePostsApi {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn payloads(&self) -> Vec<PostPayload> {
        self.payloads.lock().expect("payloads").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls").push(call);
    }

    fn known(&self, id: PostId) -> Option<PostRecord> {
        self.unreviewed
            .iter()
            .chain(self.reviewed.iter())
            .find(|post| post.id == id)
            .cloned()
    }
}

#[async_trait]
impl PostsApi for FakePostsApi {
    async fn create_post(&self, post: &PostPayload) -> Result<PostRecord> {
        self.record("create".to_string());
        self.payloads.lock().expect("payloads").push(post.clone());
        if let Some(err) = &self.fail_create {
            return Err(anyhow!(err.clone()));
        }
        Ok(PostRecord {
            id: PostId(100),
            caption: post.caption.clone(),
            source: post.source.to_uppercase(),
            created_at: None,
            comments: post.comments.clone(),
            user: Some(UserId(1)),
            username: Some("ana".to_string()),
            status: PostStatus::Unreviewed,
            reviewed_by: None,
            reviewed_at: None,
        })
    }

    async fn update_post(&self, id: PostId, post: &PostPayload) -> Result<PostRecord> {
        self.record(format!("update {id}"));
        self.payloads.lock().expect("payloads").push(post.clone());
        self.update_started.notify_one();
        if let Some(gate) = &self.update_gate {
            gate.notified().await;
        }
        if let Some(err) = &self.fail_update {
            return Err(ApiException::new(400, err.clone()).into());
        }
        let status = self
            .known(id)
            .map(|known| known.status)
            .unwrap_or(PostStatus::Unreviewed);
        Ok(PostRecord {
            caption: post.caption.clone(),
            source: post.source.clone(),
            comments: post.comments.clone(),
            status,
            ..sample_post(id.0, status)
        })
    }

    async fn delete_post(&self, id: PostId) -> Result<()> {
        self.record(format!("delete {id}"));
        Ok(())
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>> {
        self.record("list".to_string());
        Ok(self
            .unreviewed
            .iter()
            .chain(self.reviewed.iter())
            .cloned()
            .collect())
    }

    async fn list_unreviewed_posts(&self) -> Result<Vec<PostRecord>> {
        self.record("list unreviewed".to_string());
        Ok(self.unreviewed.clone())
    }

    async fn list_reviewed_posts(&self) -> Result<Vec<PostRecord>> {
        self.record("list reviewed".to_string());
        Ok(self.reviewed.clone())
    }

    async fn mark_reviewed(&self, id: PostId) -> Result<PostRecord> {
        self.record(format!("review {id}"));
        if let Some(err) = &self.fail_review {
            return Err(anyhow!(err.clone()));
        }
        let base = self
            .known(id)
            .unwrap_or_else(|| sample_post(id.0, PostStatus::Unreviewed));
        Ok(PostRecord {
            status: PostStatus::Reviewed,
            reviewed_by: Some(UserId(2)),
            ..base
        })
    }

    async fn export_csv(&self) -> Result<String> {
        self.record("export".to_string());
        Ok("post_id,source,caption\n1,@SHOP,Sale!\n".to_string())
    }

    async fn search_sources(&self, prefix: &str) -> Result<Vec<SourceSuggestion>> {
        self.record(format!("search {prefix}"));
        Ok(self.sources.clone())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.record("stats".to_string());
        Ok(DashboardStats {
            total_posts: 3,
            total_comments: 5,
            sources_count: 1,
            last_seven_days: vec![DailyCount {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
                count: 3,
            }],
            top_sources: vec![SourceCount {
                name: "@SHOP".to_string(),
                count: 3,
            }],
        })
    }
}

pub(crate) fn source(id: i64, name: &str) -> SourceSuggestion {
    SourceSuggestion {
        id: SourceId(id),
        name: name.to_string(),
        usage_count: 1,
    }
}

pub(crate) struct FakeAuthApi {
    pub valid_token: String,
    pub user: User,
    pub reject_login: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeAuthApi {
    pub(crate) fn accepting(token: &str) -> Self {
        Self {
            valid_token: token.to_string(),
            user: User {
                id: UserId(1),
                username: "ana".to_string(),
                email: "ana@example.com".to_string(),
            },
            reject_login: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn rejecting_login(detail: &str) -> Self {
        Self {
            reject_login: Some(detail.to_string()),
            ..Self::accepting("unused")
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn obtain_token(&self, credentials: &Credentials) -> Result<TokenPair> {
        self.calls
            .lock()
            .expect("calls")
            .push(format!("token {}", credentials.username));
        if let Some(detail) = &self.reject_login {
            return Err(ApiException::new(401, detail.clone()).into());
        }
        Ok(TokenPair {
            access: self.valid_token.clone(),
            refresh: None,
        })
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        self.calls
            .lock()
            .expect("calls")
            .push(format!("me {token}"));
        if token != self.valid_token {
            return Err(ApiException::new(401, "Given token not valid for any token type").into());
        }
        Ok(self.user.clone())
    }
}
