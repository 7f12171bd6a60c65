//! Google Gemini API provider
//!
//! https://ai.google.dev/api/generate-content

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{ChatBackend, ChatError, ChatRequest};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            max_output_tokens: None,
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Accepts both `gemini-1.5-pro` and the `models/gemini-1.5-pro` resource form.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = model
            .strip_prefix("models/")
            .map(str::to_string)
            .unwrap_or(model);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn models_endpoint(&self, page_token: Option<&str>) -> String {
        let mut url = format!("{}/models?key={}", self.base_url, self.api_key);
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(token);
        }
        url
    }

    /// Lists the models the API key can reach, following pagination.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let resp = self
                .client
                .get(self.models_endpoint(page_token.as_deref()))
                .send()
                .await
                .map_err(map_send_error)?;

            let status = resp.status();
            if status != StatusCode::OK {
                let text = resp
                    .text()
                    .await
                    .map_err(|e| ChatError::Transport(e.without_url().to_string()))?;
                return Err(format_api_error(status, &text));
            }

            let page: GeminiModelList = resp
                .json()
                .await
                .map_err(|e| ChatError::Decode(e.without_url().to_string()))?;
            models.extend(page.models.into_iter().map(|m| ModelInfo {
                name: m.name,
                supported_generation_methods: m.supported_generation_methods,
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = models.len(), "listed gemini models");
        Ok(models)
    }

    fn build_request(&self, request: &ChatRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .filter(|msg| !msg.parts.is_empty())
            .map(|msg| GeminiContent {
                role: msg.role.as_str().to_string(),
                parts: msg
                    .parts
                    .iter()
                    .map(|text| GeminiPart { text: text.clone() })
                    .collect(),
            })
            .collect();

        let generation_config =
            if self.max_output_tokens.is_none() && self.temperature.is_none() {
                None
            } else {
                Some(GeminiGenerationConfig {
                    max_output_tokens: self.max_output_tokens,
                    temperature: self.temperature,
                })
            };

        GeminiRequest {
            contents,
            generation_config,
        }
    }
}

/// A model as reported by the `models` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-1.5-pro-latest`
    pub name: String,
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Name without the `models/` prefix.
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }
}

fn map_send_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Transport(e.without_url().to_string())
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl ChatBackend for GeminiProvider {
    async fn generate(&self, request: ChatRequest) -> Result<String, ChatError> {
        let payload = self.build_request(&request);
        tracing::debug!(
            model = %self.model,
            messages = payload.contents.len(),
            "sending gemini generateContent request"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp
                .text()
                .await
                .map_err(|e| ChatError::Transport(e.without_url().to_string()))?;
            return Err(format_api_error(status, &text));
        }

        let body: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.without_url().to_string()))?;
        response_text(body)
    }

    /// Checks that the configured model is served and can generate content.
    async fn health(&self) -> Result<(), ChatError> {
        let models = self.list_models().await?;
        match models.iter().find(|m| m.short_name() == self.model) {
            Some(m) if m.supports("generateContent") => Ok(()),
            Some(_) => Err(ChatError::Config(format!(
                "model {} does not support generateContent",
                self.model
            ))),
            None => Err(ChatError::Config(format!(
                "model {} is not served for this api key",
                self.model
            ))),
        }
    }
}

fn response_text(body: GeminiResponse) -> Result<String, ChatError> {
    let candidate = body.candidates.first().ok_or(ChatError::EmptyResponse)?;

    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason) => Err(ChatError::Decode(format!(
                "candidate has no text (finish reason: {reason})"
            ))),
            None => Err(ChatError::EmptyResponse),
        };
    }
    Ok(text)
}

fn format_api_error(status: StatusCode, text: &str) -> ChatError {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(text)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| text.to_string());
    ChatError::Api {
        status: status.as_u16(),
        message,
    }
}

// ============================================================
// Gemini API Types
// ============================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiResponseContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendMessage;
    use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_gemini_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2}
        })
    }

    #[test]
    fn build_request_maps_roles_and_parts() {
        let provider = GeminiProvider::new("test-key");
        let req = ChatRequest::new(vec![
            BackendMessage::user("Hi"),
            BackendMessage::model("Hello"),
        ]);
        let api_req = serde_json::to_value(provider.build_request(&req)).unwrap();

        assert_eq!(
            api_req,
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"text": "Hello"}]}
                ]
            })
        );
    }

    #[test]
    fn build_request_includes_generation_config_when_set() {
        let provider = GeminiProvider::new("k")
            .with_max_output_tokens(Some(256))
            .with_temperature(Some(0.5));
        let api_req = serde_json::to_value(
            provider.build_request(&ChatRequest::new(vec![BackendMessage::user("x")])),
        )
        .unwrap();
        assert_eq!(api_req["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(api_req["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn with_model_strips_resource_prefix() {
        let provider = GeminiProvider::new("k").with_model("models/gemini-1.5-pro-latest");
        assert_eq!(provider.model(), "gemini-1.5-pro-latest");
    }

    #[test]
    fn response_text_concatenates_parts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response_text(parsed).unwrap(), "Hello, world");
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let raw = serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(response_text(parsed), Err(ChatError::EmptyResponse)));
    }

    #[test]
    fn blocked_candidate_reports_finish_reason() {
        let raw = serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]});
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let err = response_text(parsed).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn api_error_extracts_message() {
        let err = format_api_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#,
        );
        assert_eq!(err.to_string(), "api error (403): API key not valid");
    }

    #[tokio::test]
    async fn generate_posts_contents_and_returns_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_gemini_response("Hello!")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key")
            .with_base_url(server.uri())
            .with_model("gemini-test");
        let text = provider
            .generate(ChatRequest::new(vec![BackendMessage::user("hi")]))
            .await
            .unwrap();
        assert_eq!(text, "Hello!");
    }

    #[tokio::test]
    async fn generate_maps_http_failure_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": 429, "message": "Resource has been exhausted"}
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
        let err = provider
            .generate(ChatRequest::new(vec![BackendMessage::user("hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Api { status: 429, .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Resource has been exhausted"));
    }

    #[tokio::test]
    async fn generate_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(mock_gemini_response("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(50));
        let err = provider
            .generate(ChatRequest::new(vec![BackendMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Timeout));
    }

    fn model_list(names: &[(&str, &[&str])], next: Option<&str>) -> serde_json::Value {
        let models: Vec<serde_json::Value> = names
            .iter()
            .map(|(name, methods)| {
                serde_json::json!({
                    "name": name,
                    "displayName": name,
                    "supportedGenerationMethods": methods,
                })
            })
            .collect();
        match next {
            Some(token) => serde_json::json!({"models": models, "nextPageToken": token}),
            None => serde_json::json!({"models": models}),
        }
    }

    #[tokio::test]
    async fn list_models_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .and(query_param("key", "test-key"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_list(
                &[("models/gemini-1.5-pro-latest", &["generateContent", "countTokens"])],
                Some("page-2"),
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_list(
                &[("models/embedding-001", &["embedContent"])],
                None,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
        let models = provider.list_models().await.unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "models/gemini-1.5-pro-latest");
        assert_eq!(models[0].short_name(), "gemini-1.5-pro-latest");
        assert_eq!(
            models[0].supported_generation_methods,
            vec!["generateContent".to_string(), "countTokens".to_string()]
        );
        assert!(!models[1].supports("generateContent"));
    }

    #[tokio::test]
    async fn list_models_maps_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid"}
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
        let err = provider.list_models().await.unwrap_err();
        assert!(matches!(err, ChatError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn health_checks_configured_model() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_list(
                &[
                    ("models/gemini-test", &["generateContent"]),
                    ("models/embed-test", &["embedContent"]),
                ],
                None,
            )))
            .mount(&server)
            .await;

        let served = GeminiProvider::new("k")
            .with_base_url(server.uri())
            .with_model("models/gemini-test");
        assert!(served.health().await.is_ok());

        let wrong_method = GeminiProvider::new("k")
            .with_base_url(server.uri())
            .with_model("embed-test");
        let err = wrong_method.health().await.unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
        assert!(err.to_string().contains("does not support generateContent"));

        let missing = GeminiProvider::new("k")
            .with_base_url(server.uri())
            .with_model("gemini-unknown");
        let err = missing.health().await.unwrap_err();
        assert!(err.to_string().contains("gemini-unknown is not served"));
    }
}
