//! Gemini `generateContent` client for recipe steps.
//!
//! One POST per dish, response constrained to `{"steps": [string]}` by a
//! response schema. No retries: any failure is reported straight back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use sous_core::error::RecipeError;
use sous_core::prompt::{build_prompt, parse_steps, steps_schema};
use sous_core::types::GeneratorConfig;

use crate::source::RecipeSource;

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Longest service error body echoed into an error message.
const MAX_ERROR_BODY: usize = 300;

/// Read the API key from the process environment.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeneratorConfig,
    client: Client,
}

// ─── Wire types ────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// ─── Client ────────────────────────────────────────────────────────────────

impl GeminiClient {
    /// Fails with [`RecipeError::MissingApiKey`] if the config has no key.
    pub fn new(config: GeneratorConfig) -> Result<Self, RecipeError> {
        if config.api_key.trim().is_empty() {
            return Err(RecipeError::MissingApiKey);
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| RecipeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, prompt: String) -> Result<String, RecipeError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: steps_schema(),
            },
        };

        let url = self.endpoint();
        debug!("gemini: POST {url}");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecipeError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!("gemini: service error {status}: {text}");
            return Err(RecipeError::Service {
                status: status.as_u16(),
                body: truncate(&service_message(&text), MAX_ERROR_BODY),
            });
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| RecipeError::Malformed(e.to_string()))?;
        response_text(parsed)
    }
}

#[async_trait]
impl RecipeSource for GeminiClient {
    async fn fetch_steps(&self, dish: &str) -> Result<Vec<String>, RecipeError> {
        info!("gemini: generating recipe for {dish:?} with {}", self.config.model);
        let text = self.generate(build_prompt(dish)).await?;
        let steps = parse_steps(&text)?;
        info!("gemini: received {} steps", steps.len());
        Ok(steps)
    }
}

/// Concatenated text of the first candidate.
fn response_text(resp: GenerateResponse) -> Result<String, RecipeError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(RecipeError::Malformed(format!("prompt was blocked ({reason})")));
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| RecipeError::Malformed("response had no candidates".into()))?;

    let text: String = candidate
        .content
        .unwrap_or_default()
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(RecipeError::Malformed(format!(
            "response contained no text (finish reason: {reason})"
        )));
    }
    Ok(text)
}

/// Pull `error.message` out of a Google API error body, else the raw body.
fn service_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((pos, _)) => format!("{}…", &text[..pos]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, extract::State};
    use std::sync::{Arc, Mutex};

    fn canned(text: &str) -> Value {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
    }

    #[derive(Clone, Default)]
    struct Seen {
        key: Arc<Mutex<Option<String>>>,
        body: Arc<Mutex<Option<Value>>>,
    }

    /// Serve a fake `generateContent` endpoint on an ephemeral port.
    async fn fake_gemini(status: StatusCode, reply: Value) -> (String, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route(
                "/{model}",
                post(
                    move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            *seen.key.lock().unwrap() = headers
                                .get("x-goog-api-key")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_owned);
                            *seen.body.lock().unwrap() = Some(body);
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(GeneratorConfig {
            api_key: "test-key".into(),
            base_url,
            timeout_secs: Some(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = GeminiClient::new(GeneratorConfig::default()).unwrap_err();
        assert_eq!(err, RecipeError::MissingApiKey);
        let err = GeminiClient::new(GeneratorConfig {
            api_key: "   ".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, RecipeError::MissingApiKey);
    }

    #[test]
    fn endpoint_includes_model() {
        let c = client("https://example.test/v1beta/models/".into());
        assert_eq!(
            c.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"steps\":" }, { "text": " [\"Whisk\"]}" }] } }]
        }))
        .unwrap();
        assert_eq!(response_text(resp).unwrap(), "{\"steps\": [\"Whisk\"]}");
    }

    #[test]
    fn response_without_candidates_is_malformed() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(response_text(resp), Err(RecipeError::Malformed(_))));
    }

    #[test]
    fn blocked_prompt_is_malformed() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let err = response_text(resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn service_message_prefers_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(service_message(body), "API key not valid.");
        assert_eq!(service_message("  upstream down "), "upstream down");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("short", 10), "short");
    }

    #[tokio::test]
    async fn fetches_steps_from_service() {
        let (url, seen) = fake_gemini(
            StatusCode::OK,
            canned(r#"{"steps": ["Crack eggs", "Whisk", "Cook"]}"#),
        )
        .await;

        let steps = client(url).fetch_steps("omelette").await.unwrap();
        assert_eq!(steps, vec!["Crack eggs", "Whisk", "Cook"]);

        assert_eq!(seen.key.lock().unwrap().as_deref(), Some("test-key"));
        let body = seen.body.lock().unwrap().clone().unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("omelette"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["properties"]["steps"]["type"],
            "ARRAY"
        );
    }

    #[tokio::test]
    async fn empty_steps_from_service() {
        let (url, _) = fake_gemini(StatusCode::OK, canned(r#"{"steps": []}"#)).await;
        assert_eq!(
            client(url).fetch_steps("omelette").await,
            Err(RecipeError::EmptyRecipe)
        );
    }

    #[tokio::test]
    async fn service_error_status() {
        let (url, _) = fake_gemini(
            StatusCode::FORBIDDEN,
            serde_json::json!({ "error": { "code": 403, "message": "Permission denied" } }),
        )
        .await;
        let err = client(url).fetch_steps("omelette").await.unwrap_err();
        assert_eq!(
            err,
            RecipeError::Service {
                status: 403,
                body: "Permission denied".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}")).fetch_steps("omelette").await.unwrap_err();
        assert!(matches!(err, RecipeError::Network(_)));
    }
}
