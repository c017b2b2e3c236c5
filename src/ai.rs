use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::errors::RemoteError;

/// Descriptions shorter than this are not worth a model call.
pub const MIN_ENRICH_CHARS: usize = 20;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-09-2025";

const SYSTEM_INSTRUCTION: &str = "You are a hiring expert. Be concise and use bullet points.";

// --- Provider trait ---

#[async_trait]
pub trait AIProvider: Send + Sync {
    /// `Ok(None)` means the service answered but produced no text.
    async fn complete(&self, prompt: &str, system: &str) -> Result<Option<String>, RemoteError>;
    fn model_name(&self) -> &str;
}

/// Enrichment is only available when an API key is configured.
pub fn create_provider(config: &Config) -> Result<Option<Box<dyn AIProvider>>> {
    let Some(api_key) = config.gemini_api_key.clone() else {
        return Ok(None);
    };
    let provider = GeminiProvider::new(api_key, config.gemini_model.clone(), config.timeout)?;
    Ok(Some(Box::new(provider)))
}

// --- Gemini provider ---

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    model_id: String,
    endpoint: Url,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model_id: String, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(GEMINI_API_URL).context("Invalid Gemini API URL")?;
        Self::with_endpoint(api_key, model_id, endpoint, timeout)
    }

    pub fn with_endpoint(
        api_key: String,
        model_id: String,
        endpoint: Url,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key,
            model_id,
            endpoint,
            client,
        })
    }

    fn generate_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&format!("{}:generateContent", self.model_id));
        }
        url
    }
}

#[async_trait]
impl AIProvider for GeminiProvider {
    async fn complete(&self, prompt: &str, system: &str) -> Result<Option<String>, RemoteError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: GeminiContent {
                parts: vec![GeminiPart {
                    text: system.to_string(),
                }],
            },
        };

        debug!(model = %self.model_id, "requesting Gemini completion");
        let response = self
            .client
            .post(self.generate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            // the URL carries the key, keep it out of error text
            .map_err(|e| RemoteError::from(e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RemoteError::http_status(status.as_u16(), error_text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::from(e.without_url()))?;
        let api_response: GeminiResponse = serde_json::from_slice(&bytes)?;
        Ok(api_response.into_text())
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Standalone AI functions ---

/// Whether `text` is long enough to be sent for analysis.
pub fn passes_gate(text: &str) -> bool {
    text.trim().chars().count() >= MIN_ENRICH_CHARS
}

/// Interview-prep notes for a job description. Short or empty descriptions
/// are skipped without calling the provider.
pub async fn analyze_job_description(
    provider: &dyn AIProvider,
    description: &str,
) -> Result<Option<String>, RemoteError> {
    if !passes_gate(description) {
        return Ok(None);
    }
    let prompt = format!(
        "Analyze this Job Description. Extract: 1. Top 3 required skills. \
        2. Interview strategy. 3. Two potential questions.\n\nJD: {}",
        description
    );
    provider.complete(&prompt, SYSTEM_INSTRUCTION).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemoteErrorKind;
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::StatusCode,
        routing::post,
    };
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AIProvider for CountingProvider {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<Option<String>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("- Rust".to_string()))
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[derive(Clone, Default)]
    struct Seen {
        body: Arc<Mutex<Option<Value>>>,
        key: Arc<Mutex<Option<String>>>,
    }

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{}/v1beta/models", addr)).unwrap()
    }

    fn provider(endpoint: Url) -> GeminiProvider {
        GeminiProvider::with_endpoint(
            "test-key".to_string(),
            "gemini-test".to_string(),
            endpoint,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_gate() {
        assert!(!passes_gate(""));
        assert!(!passes_gate("too short"));
        assert!(!passes_gate("                         "));
        assert!(passes_gate("Senior Rust engineer, async services"));
    }

    #[tokio::test]
    async fn test_short_description_skips_provider() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let result = analyze_job_description(&provider, "Rust dev").await.unwrap();
        assert_eq!(result, None);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let result = analyze_job_description(&provider, "Rust developer for payments team")
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("- Rust"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gemini_extracts_first_part() {
        let seen = Seen::default();
        let router = Router::new()
            .route(
                "/v1beta/models/{call}",
                post(
                    |State(seen): State<Seen>,
                     Query(query): Query<HashMap<String, String>>,
                     Json(body): Json<Value>| async move {
                        *seen.key.lock().unwrap() = query.get("key").cloned();
                        *seen.body.lock().unwrap() = Some(body);
                        Json(json!({
                            "candidates": [
                                {"content": {"parts": [{"text": "- Skill A\n- Skill B"}]}}
                            ]
                        }))
                    },
                ),
            )
            .with_state(seen.clone());
        let provider = provider(serve(router).await);

        let text = analyze_job_description(&provider, "We need a backend engineer with Rust")
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("- Skill A\n- Skill B"));

        assert_eq!(seen.key.lock().unwrap().as_deref(), Some("test-key"));
        let body = seen.body.lock().unwrap().clone().unwrap();
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!(SYSTEM_INSTRUCTION)
        );
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.ends_with("JD: We need a backend engineer with Rust"));
    }

    #[tokio::test]
    async fn test_gemini_missing_text_is_no_insight() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(|| async { Json(json!({"candidates": [{"finishReason": "SAFETY"}]})) }),
        );
        let provider = provider(serve(router).await);

        let text = provider.complete("prompt", "system").await.unwrap();
        assert_eq!(text, None);
    }

    #[tokio::test]
    async fn test_gemini_rate_limit_is_http_status() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota") }),
        );
        let provider = provider(serve(router).await);

        let err = provider.complete("prompt", "system").await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::HttpStatus(429));
    }

    #[test]
    fn test_generate_url() {
        let provider = provider(Url::parse(GEMINI_API_URL).unwrap());
        assert_eq!(
            provider.generate_url().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-test:generateContent"
        );
    }
}
