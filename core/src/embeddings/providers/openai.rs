//! OpenAI-compatible embeddings provider
//!
//! Talks to `/v1/embeddings` on api.openai.com or any server exposing the
//! same request/response shape (local inference servers included).
//!
//! Supports:
//! - text-embedding-3-small (256-1536 dimensions)
//! - text-embedding-3-large (256-3072 dimensions)
//! - Batch processing (up to 2048 inputs)

use super::super::EmbeddingError;
use super::super::EmbeddingProvider;
use super::super::EmbeddingVector;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

/// OpenAI has a limit of 2048 inputs per batch
const MAX_BATCH_SIZE: usize = 2048;

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
    api_endpoint: Option<String>,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        model: String,
        dimensions: Option<usize>,
        api_endpoint: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            dimensions,
            api_endpoint,
        }
    }

    fn endpoint(&self) -> &str {
        self.api_endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_id(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn dimensions(&self) -> usize {
        self.dimensions.unwrap_or(match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            "nomic-embed-text" => 768,
            _ => 1536,
        })
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if !self.is_available() {
            return Err(EmbeddingError::ProviderNotAvailable(self.model_id()));
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH_SIZE) {
            all_embeddings.extend(self.embed_batch_internal(chunk).await?);
        }
        Ok(all_embeddings)
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty() || self.api_endpoint.is_some()
    }
}

impl OpenAIProvider {
    async fn embed_batch_internal(
        &self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
            encoding_format: "float",
        };

        debug!(
            "Requesting {} embeddings from {} ({})",
            texts.len(),
            self.endpoint(),
            self.model
        );

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&error_text) {
                return Err(EmbeddingError::ApiError(format!(
                    "Embedding API error ({}): {} - {}",
                    status,
                    body.error.error_type.as_deref().unwrap_or("unknown"),
                    body.error.message
                )));
            }

            return Err(EmbeddingError::ApiError(format!(
                "Embedding API error ({status}): {error_text}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("Failed to parse response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }

        // The API may return items out of order
        let mut embeddings = parsed.data;
        embeddings.sort_by_key(|e| e.index);

        let expected_dims = self.dimensions();
        for embedding in &embeddings {
            if embedding.embedding.len() != expected_dims {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: expected_dims,
                    actual: embedding.embedding.len(),
                });
            }
        }

        Ok(embeddings.into_iter().map(|e| e.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    fn provider_for(server: &MockServer, api_key: &str) -> OpenAIProvider {
        OpenAIProvider::new(
            api_key.to_string(),
            "text-embedding-3-small".to_string(),
            Some(3),
            Some(format!("{}/v1/embeddings", server.uri())),
        )
    }

    #[test]
    fn test_model_id() {
        let provider = OpenAIProvider::new(
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            Some(256),
            None,
        );
        assert_eq!(provider.model_id(), "openai:text-embedding-3-small");
    }

    #[test]
    fn test_dimensions() {
        let provider = OpenAIProvider::new(
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            Some(256),
            None,
        );
        assert_eq!(provider.dimensions(), 256);

        let provider_default = OpenAIProvider::new(
            "test-key".to_string(),
            "text-embedding-3-large".to_string(),
            None,
            None,
        );
        assert_eq!(provider_default.dimensions(), 3072);
    }

    #[tokio::test]
    async fn test_is_available() {
        let hosted = OpenAIProvider::new(String::new(), "m".to_string(), None, None);
        assert!(!hosted.is_available());
        assert!(matches!(
            hosted.embed("query").await,
            Err(EmbeddingError::ProviderNotAvailable(_))
        ));

        let keyed = OpenAIProvider::new("k".to_string(), "m".to_string(), None, None);
        assert!(keyed.is_available());

        let local = OpenAIProvider::new(
            String::new(),
            "nomic-embed-text".to_string(),
            None,
            Some("http://localhost:11434/v1/embeddings".to_string()),
        );
        assert!(local.is_available());
        assert_eq!(local.dimensions(), 768);
    }

    #[tokio::test]
    async fn test_embed_batch_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"embedding": [0.0, 1.0, 0.0], "index": 1},
                    {"embedding": [1.0, 0.0, 0.0], "index": 0}
                ],
                "model": "text-embedding-3-small"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, "secret");
        let vectors = provider
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "slow down", "type": "rate_limit_exceeded"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, "secret");
        let err = provider.embed("hello").await.unwrap_err();

        match err {
            EmbeddingError::ApiError(message) => {
                assert!(message.contains("429"));
                assert!(message.contains("rate_limit_exceeded"));
                assert!(message.contains("slow down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_dimensions_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [1.0, 0.0], "index": 0}]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, "");
        assert!(matches!(
            provider.embed("hello").await,
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let provider = provider_for(&server, "secret");
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
