//! Request layer between the table controller and the remote posts
//! collection.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::HeaderMap, Client, Response};
use serde::Deserialize;
use shared::{
    domain::{NewPost, Post, PostId, PostPatch},
    protocol::{CreatePostRequest, PostPage, UpdatePostRequest, POSTS_ROUTE, TOTAL_COUNT_HEADER},
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::GatewayError, types::ViewState};

/// Pure request/response access to the posts collection. Implementations
/// must not touch any local view state.
#[async_trait]
pub trait PostGateway: Send + Sync {
    async fn list(&self, view: &ViewState) -> Result<PostPage, GatewayError>;
    async fn get(&self, post_id: PostId) -> Result<Post, GatewayError>;
    async fn create(&self, post: &NewPost) -> Result<Post, GatewayError>;
    async fn update(&self, post_id: PostId, patch: &PostPatch) -> Result<Post, GatewayError>;
    async fn delete(&self, post_id: PostId) -> Result<(), GatewayError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct HttpPostGateway {
    http: Client,
    base_url: String,
}

impl HttpPostGateway {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("posts API base URL must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("invalid posts API base URL '{base_url}'"))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}{POSTS_ROUTE}", self.base_url)
    }

    fn item_url(&self, post_id: PostId) -> String {
        format!("{}{POSTS_ROUTE}/{post_id}", self.base_url)
    }
}

#[async_trait]
impl PostGateway for HttpPostGateway {
    async fn list(&self, view: &ViewState) -> Result<PostPage, GatewayError> {
        let response = self
            .http
            .get(self.collection_url())
            .query(&view.to_query())
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let total = total_count(response.headers());
        let data: Vec<Post> = response.json().await?;
        debug!(page = view.page, returned = data.len(), total, "listed posts");
        Ok(PostPage { data, total })
    }

    async fn get(&self, post_id: PostId) -> Result<Post, GatewayError> {
        let response = self.http.get(self.item_url(post_id)).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn create(&self, post: &NewPost) -> Result<Post, GatewayError> {
        let response = self
            .http
            .post(self.collection_url())
            .json(&CreatePostRequest::stamped(post, Utc::now()))
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn update(&self, post_id: PostId, patch: &PostPatch) -> Result<Post, GatewayError> {
        let response = self
            .http
            .patch(self.item_url(post_id))
            .json(&UpdatePostRequest::stamped(patch, Utc::now()))
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete(&self, post_id: PostId) -> Result<(), GatewayError> {
        let response = self.http.delete(self.item_url(post_id)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    warn!(status = status.as_u16(), %message, "posts service rejected request");
    Err(GatewayError::Server {
        status: status.as_u16(),
        message,
    })
}

// The collection reports the match count out of band. A missing or
// malformed header counts as zero.
fn total_count(headers: &HeaderMap) -> u64 {
    headers
        .get(TOTAL_COUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
