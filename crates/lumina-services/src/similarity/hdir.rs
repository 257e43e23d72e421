//! HTTP client for the HDIR image/text encoder service.
//!
//! `GET /encode?img-path=<path>` returns the embedding of an image on a path
//! the service can read. `POST /match` scores a text query against a list of
//! image embeddings, one score per embedding, in order.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// The host could not be reached at all. Trips the circuit breaker.
    #[error("embedding service unreachable: {0}")]
    Unreachable(String),

    #[error("embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid embedding service response: {0}")]
    InvalidResponse(String),

    #[error("embedding request failed: {0}")]
    Request(String),
}

impl EmbeddingError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, EmbeddingError::Unreachable(_))
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            EmbeddingError::Unreachable(err.to_string())
        } else if err.is_decode() {
            EmbeddingError::InvalidResponse(err.to_string())
        } else {
            EmbeddingError::Request(err.to_string())
        }
    }
}

/// Encoder/matcher used by the similarity ranker.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embedding of the image stored at `image_path`.
    async fn encode_image(&self, image_path: &Path) -> Result<Vec<f32>, EmbeddingError>;

    /// One similarity score per entry of `image_features`, in order.
    async fn match_text(
        &self,
        text: &str,
        image_features: &[Vec<f32>],
    ) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    text: &'a str,
    image_features: &'a [Vec<f32>],
}

#[derive(Debug, Deserialize)]
struct MatchResponse {
    similarity: Vec<f32>,
}

pub struct HdirClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HdirClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EmbeddingError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, EmbeddingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(EmbeddingError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl EmbeddingService for HdirClient {
    #[tracing::instrument(skip(self), fields(hdir.url = %self.base_url))]
    async fn encode_image(&self, image_path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        let start = std::time::Instant::now();
        let path = image_path.to_string_lossy();

        let response = self
            .http_client
            .get(format!("{}/encode", self.base_url))
            .query(&[("img-path", path.as_ref())])
            .send()
            .await?;

        let embedding: Vec<f32> = Self::check_status(response).await?.json().await?;
        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()));
        }

        tracing::debug!(
            dimensions = embedding.len(),
            duration_ms = start.elapsed().as_millis(),
            "Image encoded"
        );
        Ok(embedding)
    }

    #[tracing::instrument(
        skip(self, image_features),
        fields(hdir.url = %self.base_url, media_count = image_features.len())
    )]
    async fn match_text(
        &self,
        text: &str,
        image_features: &[Vec<f32>],
    ) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .http_client
            .post(format!("{}/match", self.base_url))
            .json(&MatchRequest {
                text,
                image_features,
            })
            .send()
            .await?;

        let matched: MatchResponse = Self::check_status(response).await?.json().await?;
        Ok(matched.similarity)
    }
}
