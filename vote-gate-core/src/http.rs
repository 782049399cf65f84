//! HTTP vote-pool query against an indexer exposing `GET /vote-pools/{id}`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::GateError;
use crate::ports::{Result, VotePoolQuery};
use crate::types::{PoolId, VotePoolRecord};

#[derive(Clone)]
pub struct HttpVotePoolQuery {
    base_url: String,
    client: reqwest::Client,
}

impl HttpVotePoolQuery {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn pool_url(&self, id: &PoolId) -> String {
        format!("{}/vote-pools/{}", self.base_url, id)
    }

    /// GET `url`; a 404 yields `None`.
    async fn get_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GateError::Fetch(format!("HTTP {}: {}", status, text)));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| GateError::Fetch(e.to_string()))
    }
}

#[async_trait]
impl VotePoolQuery for HttpVotePoolQuery {
    async fn fetch_pool(&self, id: &PoolId) -> Result<Option<VotePoolRecord>> {
        let url = self.pool_url(id);
        tracing::debug!(%url, "fetching vote pool");
        self.get_optional(&url).await
    }
}
