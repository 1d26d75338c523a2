//! Replicate provider implementation for Lipi
//!
//! This module implements the Provider trait for Replicate's hosted models.
//! A generation is a two-step exchange: a prediction is created with
//! `stream: true`, then the returned stream URL is read as Server-Sent
//! Events carrying `output`, `error` and `done` events.

use crate::config::ReplicateConfig;
use crate::credential::ApiToken;
use crate::error::{LipiError, Result};
use crate::providers::sse::{sse_events, SseEvent};
use crate::providers::{FragmentStream, GenerationRequest, Provider};

use async_trait::async_trait;
use futures::{future, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Replicate API provider
///
/// No overall request timeout is configured; how long a prediction may run
/// is Replicate's decision. Only connection establishment is bounded.
///
/// # Examples
///
/// ```no_run
/// use futures::StreamExt;
/// use lipi::config::{GenerationConfig, ReplicateConfig};
/// use lipi::credential::ApiToken;
/// use lipi::providers::{GenerationRequest, Provider, ReplicateProvider};
///
/// # async fn example() -> lipi::error::Result<()> {
/// let provider = ReplicateProvider::new(ReplicateConfig::default())?;
/// let token = ApiToken::parse(std::env::var("REPLICATE_API_TOKEN")?)?;
/// let request = GenerationRequest::new("mero naam Assistant: ", &GenerationConfig::default());
/// let mut fragments = provider.stream_generation(&request, &token).await?;
/// while let Some(fragment) = fragments.next().await {
///     print!("{}", fragment?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ReplicateProvider {
    client: Client,
    api_base: String,
    model: String,
}

/// Body of `POST /models/{owner}/{name}/predictions`
#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    input: &'a GenerationRequest,
    stream: bool,
}

/// Prediction object returned by Replicate
#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    urls: PredictionUrls,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    stream: Option<String>,
}

/// Payload of a `done` event
#[derive(Debug, Default, Deserialize)]
struct DonePayload {
    #[serde(default)]
    reason: Option<String>,
}

impl ReplicateProvider {
    /// Create a new Replicate provider instance
    ///
    /// # Errors
    ///
    /// Returns error if the configured model cannot be resolved or the HTTP
    /// client cannot be built
    ///
    /// # Examples
    ///
    /// ```
    /// use lipi::config::ReplicateConfig;
    /// use lipi::providers::{Provider, ReplicateProvider};
    ///
    /// let provider = ReplicateProvider::new(ReplicateConfig::default()).unwrap();
    /// assert_eq!(provider.model(), "meta/meta-llama-3-8b-instruct");
    /// ```
    pub fn new(config: ReplicateConfig) -> Result<Self> {
        let model = config.model_id()?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("lipi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LipiError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Replicate provider: api_base={}, model={}",
            config.api_base,
            model
        );

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn predictions_url(&self) -> String {
        format!("{}/models/{}/predictions", self.api_base, self.model)
    }

    async fn create_prediction(
        &self,
        request: &GenerationRequest,
        token: &ApiToken,
    ) -> Result<Prediction> {
        let url = self.predictions_url();
        tracing::debug!(
            "Creating prediction: model={}, prompt_bytes={}, temperature={}, top_p={}, max_length={}",
            self.model,
            request.prompt.len(),
            request.temperature,
            request.top_p,
            request.max_length
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose())
            .json(&PredictionRequest {
                input: request,
                stream: true,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Replicate request failed: {}", e);
                LipiError::Provider(format!("Replicate request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Replicate returned error {}: {}", status, error_text);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LipiError::Authentication(
                    format!("Replicate rejected the API token ({}): {}", status, error_text),
                ),
                _ => LipiError::Provider(format!(
                    "Replicate returned error {}: {}",
                    status, error_text
                )),
            }
            .into());
        }

        let body = response.text().await.map_err(LipiError::Http)?;
        let prediction: Prediction = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Replicate prediction: {}", e);
            LipiError::Serialization(e)
        })?;

        if let Some(error) = prediction.error.as_ref().filter(|e| !e.is_null()) {
            return Err(LipiError::Provider(format!(
                "Prediction {} failed: {}",
                prediction.id, error
            ))
            .into());
        }

        tracing::debug!(
            "Prediction created: id={}, status={}",
            prediction.id,
            prediction.status
        );
        Ok(prediction)
    }
}

/// What one SSE event means for the fragment stream
enum StreamStep {
    Fragment(String),
    Failed(LipiError),
    Finished,
    Skip,
}

fn classify_event(event: SseEvent) -> StreamStep {
    match event.kind() {
        "output" => StreamStep::Fragment(event.data),
        "error" => StreamStep::Failed(LipiError::Provider(format!(
            "Prediction failed: {}",
            error_detail(&event.data)
        ))),
        "done" => {
            let payload: DonePayload = serde_json::from_str(&event.data).unwrap_or_default();
            match payload.reason.as_deref() {
                Some(reason @ ("error" | "canceled")) => StreamStep::Failed(
                    LipiError::Provider(format!("Prediction ended early: {}", reason)),
                ),
                _ => StreamStep::Finished,
            }
        }
        other => {
            tracing::debug!("Ignoring SSE event type: {}", other);
            StreamStep::Skip
        }
    }
}

/// Pulls `detail` out of a JSON error payload, falling back to the raw text
fn error_detail(data: &str) -> String {
    serde_json::from_str::<serde_json::Value>(data)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| data.to_string())
}

#[async_trait]
impl Provider for ReplicateProvider {
    async fn stream_generation(
        &self,
        request: &GenerationRequest,
        token: &ApiToken,
    ) -> Result<FragmentStream> {
        let prediction = self.create_prediction(request, token).await?;
        let stream_url = prediction
            .urls
            .stream
            .ok_or(LipiError::StreamingNotSupported)?;

        tracing::debug!("Opening prediction stream: {}", stream_url);
        let response = self
            .client
            .get(&stream_url)
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Replicate stream request failed: {}", e);
                LipiError::Provider(format!("Replicate stream request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Replicate stream returned error {}: {}", status, error_text);
            return Err(LipiError::Provider(format!(
                "Replicate stream returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let fragments = sse_events(response.bytes_stream())
            .scan(false, |ended, item| {
                if *ended {
                    return future::ready(None);
                }
                let step = match item {
                    Ok(event) => classify_event(event),
                    Err(e) => StreamStep::Failed(LipiError::Http(e)),
                };
                let next: Option<Option<Result<String>>> = match step {
                    StreamStep::Fragment(text) => Some(Some(Ok(text))),
                    StreamStep::Skip => Some(None),
                    StreamStep::Finished => None,
                    StreamStep::Failed(error) => {
                        tracing::error!("Prediction stream failed: {}", error);
                        *ended = true;
                        Some(Some(Err(anyhow::Error::from(error))))
                    }
                };
                future::ready(next)
            })
            .filter_map(future::ready);

        Ok(Box::pin(fragments))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, data: &str) -> SseEvent {
        SseEvent {
            event: Some(kind.to_string()),
            data: data.to_string(),
            id: None,
        }
    }

    #[test]
    fn test_provider_resolves_alias() {
        let provider = ReplicateProvider::new(ReplicateConfig::default()).unwrap();
        assert_eq!(provider.model(), "meta/meta-llama-3-8b-instruct");
        assert_eq!(
            provider.predictions_url(),
            "https://api.replicate.com/v1/models/meta/meta-llama-3-8b-instruct/predictions"
        );
    }

    #[test]
    fn test_provider_trims_trailing_slash() {
        let config = ReplicateConfig {
            api_base: "http://localhost:1234/v1/".to_string(),
            ..Default::default()
        };
        let provider = ReplicateProvider::new(config).unwrap();
        assert!(provider
            .predictions_url()
            .starts_with("http://localhost:1234/v1/models/"));
    }

    #[test]
    fn test_provider_rejects_unknown_model() {
        let config = ReplicateConfig {
            model: "not-a-model".to_string(),
            ..Default::default()
        };
        assert!(ReplicateProvider::new(config).is_err());
    }

    #[test]
    fn test_prediction_request_body() {
        let request = GenerationRequest::new("p", &crate::config::GenerationConfig::default());
        let body = serde_json::to_value(PredictionRequest {
            input: &request,
            stream: true,
        })
        .unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["input"]["prompt"], "p");
        assert_eq!(body["input"]["max_length"], 120);
        assert_eq!(body["input"]["repetition_penalty"], 1.0);
    }

    #[test]
    fn test_classify_output_keeps_text() {
        match classify_event(event("output", " थाहा छ")) {
            StreamStep::Fragment(text) => assert_eq!(text, " थाहा छ"),
            _ => panic!("expected fragment"),
        }
    }

    #[test]
    fn test_classify_error_uses_detail() {
        match classify_event(event("error", r#"{"detail":"out of memory"}"#)) {
            StreamStep::Failed(e) => assert!(e.to_string().contains("out of memory")),
            _ => panic!("expected failure"),
        }
        match classify_event(event("error", "plain text")) {
            StreamStep::Failed(e) => assert!(e.to_string().contains("plain text")),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn test_classify_done() {
        assert!(matches!(
            classify_event(event("done", "{}")),
            StreamStep::Finished
        ));
        assert!(matches!(
            classify_event(event("done", "")),
            StreamStep::Finished
        ));
        assert!(matches!(
            classify_event(event("done", r#"{"reason":"canceled"}"#)),
            StreamStep::Failed(_)
        ));
    }

    #[test]
    fn test_classify_unknown_is_skipped() {
        assert!(matches!(
            classify_event(event("logs", "loading weights")),
            StreamStep::Skip
        ));
    }
}
