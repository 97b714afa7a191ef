use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{PostId, User},
    protocol::{Credentials, DashboardStats, PostPayload, PostRecord, SourceSuggestion, TokenPair},
};

pub mod form;
pub mod http;
pub mod review;
pub mod session;
pub mod sources;
pub mod verification;

pub use form::{AnnotationForm, AspectField, CommentRemoval, FormStep, StepIncomplete, SubmitError};
pub use http::{HttpAuthClient, HttpClientConfig, HttpPostsClient};
pub use review::{ReviewError, ReviewPhase, ReviewSession, SaveOutcome};
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use sources::SourceLookup;
pub use verification::VerificationQueue;

/// Authentication endpoints. Tokens are passed explicitly; holding on to
/// them is the [`Session`]'s job.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn obtain_token(&self, credentials: &Credentials) -> Result<TokenPair>;
    async fn current_user(&self, token: &str) -> Result<User>;
}

#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn create_post(&self, post: &PostPayload) -> Result<PostRecord>;
    async fn update_post(&self, id: PostId, post: &PostPayload) -> Result<PostRecord>;
    async fn delete_post(&self, id: PostId) -> Result<()>;
    async fn list_posts(&self) -> Result<Vec<PostRecord>>;
    async fn list_unreviewed_posts(&self) -> Result<Vec<PostRecord>>;
    async fn list_reviewed_posts(&self) -> Result<Vec<PostRecord>>;
    async fn mark_reviewed(&self, id: PostId) -> Result<PostRecord>;
    async fn export_csv(&self) -> Result<String>;
    async fn search_sources(&self, prefix: &str) -> Result<Vec<SourceSuggestion>>;
    async fn dashboard_stats(&self) -> Result<DashboardStats>;
}

pub struct MissingAuthApi;

#[async_trait]
impl AuthApi for MissingAuthApi {
    async fn obtain_token(&self, _credentials: &Credentials) -> Result<TokenPair> {
        Err(anyhow!("auth backend is unavailable"))
    }

    async fn current_user(&self, _token: &str) -> Result<User> {
        Err(anyhow!("auth backend is unavailable"))
    }
}

pub struct MissingPostsApi;

#[async_trait]
impl PostsApi for MissingPostsApi {
    async fn create_post(&self, _post: &PostPayload) -> Result<PostRecord> {
        Err(anyhow!("posts backend is unavailable"))
    }

    async fn update_post(&self, id: PostId, _post: &PostPayload) -> Result<PostRecord> {
        Err(anyhow!("posts backend is unavailable for post {}", id.0))
    }

    async fn delete_post(&self, id: PostId) -> Result<()> {
        Err(anyhow!("posts backend is unavailable for post {}", id.0))
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>> {
        Err(anyhow!("posts backend is unavailable"))
    }

    async fn list_unreviewed_posts(&self) -> Result<Vec<PostRecord>> {
        Err(anyhow!("posts backend is unavailable"))
    }

    async fn list_reviewed_posts(&self) -> Result<Vec<PostRecord>> {
        Err(anyhow!("posts backend is unavailable"))
    }

    async fn mark_reviewed(&self, id: PostId) -> Result<PostRecord> {
        Err(anyhow!("posts backend is unavailable for post {}", id.0))
    }

    async fn export_csv(&self) -> Result<String> {
        Err(anyhow!("posts backend is unavailable"))
    }

    async fn search_sources(&self, _prefix: &str) -> Result<Vec<SourceSuggestion>> {
        Err(anyhow!("sources backend is unavailable"))
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        Err(anyhow!("stats backend is unavailable"))
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
