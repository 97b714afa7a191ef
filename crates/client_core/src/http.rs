use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{PostId, User},
    error::{ApiException, ErrorBody},
    protocol::{
        Credentials, DashboardStats, PostListing, PostPayload, PostRecord, SourceSuggestion,
        TokenPair,
    },
};
use tracing::debug;
use url::Url;

use crate::{session::Session, AuthApi, PostsApi};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub api_base_url: Url,
    pub auth_base_url: Url,
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(api_base_url: &str, auth_base_url: &str) -> Result<Self> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            auth_base_url: parse_base_url(auth_base_url)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .context("failed to build http client")
    }
}

/// Parses a base URL, forcing a trailing slash so relative joins append
/// instead of replacing the last path segment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash).with_context(|| format!("invalid base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("base url must start with http:// or https://: {raw}");
    }
    Ok(url)
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .with_context(|| format!("failed to build url for '{path}' from '{base}'"))
}

async fn check_status(response: Response, fallback: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    let fallback = fallback
        .or_else(|| status.canonical_reason())
        .unwrap_or("request failed");
    Err(ApiException::from_body(status.as_u16(), fallback, body).into())
}

pub struct HttpAuthClient {
    http: Client,
    base: Url,
}

impl HttpAuthClient {
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        Ok(Self::with_client(config.build_client()?, config))
    }

    pub fn with_client(http: Client, config: &HttpClientConfig) -> Self {
        Self {
            http,
            base: config.auth_base_url.clone(),
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthClient {
    async fn obtain_token(&self, credentials: &Credentials) -> Result<TokenPair> {
        let res = self
            .http
            .post(join(&self.base, "auth/jwt/create/")?)
            .json(credentials)
            .send()
            .await?;
        let res = check_status(res, Some("Login failed")).await?;
        Ok(res.json().await?)
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        let res = self
            .http
            .get(join(&self.base, "auth/users/me/")?)
            .header(AUTHORIZATION, format!("JWT {token}"))
            .send()
            .await?;
        let res = check_status(res, Some("Failed to get user data")).await?;
        Ok(res.json().await?)
    }
}

/// Posts, sources and stats endpoints. Requests carry the session's token
/// when one is present.
pub struct HttpPostsClient {
    http: Client,
    base: Url,
    session: Arc<Session>,
}

impl HttpPostsClient {
    pub fn new(config: &HttpClientConfig, session: Arc<Session>) -> Result<Self> {
        Ok(Self::with_client(config.build_client()?, config, session))
    }

    pub fn with_client(http: Client, config: &HttpClientConfig, session: Arc<Session>) -> Self {
        Self {
            http,
            base: config.api_base_url.clone(),
            session,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => builder.header(AUTHORIZATION, format!("JWT {token}")),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let res = self.authorized(builder).send().await?;
        check_status(res, None).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = join(&self.base, path)?;
        debug!(%url, "http: GET");
        let res = self.send(self.http.get(url)).await?;
        Ok(res.json().await?)
    }

    async fn list(&self, path: &str) -> Result<Vec<PostRecord>> {
        let listing: PostListing = self.get_json(path).await?;
        Ok(listing.into_posts())
    }
}

#[async_trait]
impl PostsApi for HttpPostsClient {
    async fn create_post(&self, post: &PostPayload) -> Result<PostRecord> {
        let url = join(&self.base, "posts/")?;
        let res = self.send(self.http.post(url).json(post)).await?;
        Ok(res.json().await?)
    }

    async fn update_post(&self, id: PostId, post: &PostPayload) -> Result<PostRecord> {
        let url = join(&self.base, &format!("posts/{id}/"))?;
        let res = self.send(self.http.put(url).json(post)).await?;
        Ok(res.json().await?)
    }

    async fn delete_post(&self, id: PostId) -> Result<()> {
        let url = join(&self.base, &format!("posts/{id}/"))?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>> {
        self.list("posts/").await
    }

    async fn list_unreviewed_posts(&self) -> Result<Vec<PostRecord>> {
        self.list("posts/unreviewed/").await
    }

    async fn list_reviewed_posts(&self) -> Result<Vec<PostRecord>> {
        self.list("posts/reviewed/").await
    }

    async fn mark_reviewed(&self, id: PostId) -> Result<PostRecord> {
        let url = join(&self.base, &format!("posts/{id}/review/"))?;
        let res = self.send(self.http.post(url)).await?;
        Ok(res.json().await?)
    }

    async fn export_csv(&self) -> Result<String> {
        let url = join(&self.base, "posts/export_csv/")?;
        let res = self.send(self.http.get(url)).await?;
        Ok(res.text().await?)
    }

    async fn search_sources(&self, prefix: &str) -> Result<Vec<SourceSuggestion>> {
        let url = join(&self.base, "sources/search/")?;
        let res = self
            .send(self.http.get(url).query(&[("q", prefix)]))
            .await?;
        Ok(res.json().await?)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.get_json("posts/dashboard_stats/").await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
