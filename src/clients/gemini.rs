use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::classification::ClassifierOutput;
use crate::clients::traits::{Classifier, ClassifierError};
use crate::config::Config;
use crate::upload::ImageUpload;

const ERROR_BODY_CAP_CHARS: usize = 500;

/// Prompt sent with every image. The normalizer tolerates any answer, but asks
/// for JSON so the axes can be read field by field.
pub const CLASSIFICATION_PROMPT: &str = r#"Analyze the waste item in this image and classify it.

1. Primary category (choose one): Organic, Recyclable, Hazardous, E-waste, General Waste
2. Secondary category: the specific material and form, e.g. "plastic bottle", "food scraps"
3. Biodegradability (choose one): biodegradable, non-biodegradable
4. Moisture (choose one): wet, dry
5. Confidence (choose one): high, medium, low

Return ONLY a JSON object with this structure:
{
    "primary_category": "chosen primary category",
    "secondary_category": "specific item type",
    "biodegradable": "biodegradable or non-biodegradable",
    "moisture": "wet or dry",
    "item_name": "common name of the item",
    "confidence": "high/medium/low",
    "disposal_advice": "specific disposal instructions"
}"#;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// One entry of the provider's model listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Name without the `models/` prefix
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

/// Client for the Gemini `generateContent` REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    models: Vec<String>,
    temperature: f32,
    max_output_tokens: u32,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, models: Vec<String>) -> Result<Self, ClassifierError> {
        Self::build(
            api_key.into(),
            models,
            crate::config::DEFAULT_API_BASE.to_string(),
            Duration::from_secs(30),
        )
    }

    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let client = Self::build(
            config.api_key()?.to_string(),
            config.model_chain(),
            config.classifier.api_base.clone(),
            Duration::from_millis(config.classifier.timeout_ms),
        )?;
        Ok(client
            .with_temperature(config.classifier.temperature)
            .with_max_output_tokens(config.classifier.max_output_tokens))
    }

    fn build(
        api_key: String,
        models: Vec<String>,
        api_base: String,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        if models.is_empty() {
            return Err(ClassifierError::ModelUnavailable {
                tried: "no models configured".to_string(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            models,
            temperature: 0.1,
            max_output_tokens: 1024,
            timeout,
        })
    }

    /// Point the client at another endpoint (tests, proxies)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// List models visible to the configured key.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ClassifierError> {
        let url = format!("{}/v1beta/models", self.api_base);
        let resp = self
            .http
            .get(url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| self.map_transport_err(e))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(map_status(status.as_u16(), &body));
        }
        let parsed: ListModelsResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifierError::ParseError(format!("model listing: {e}")))?;
        Ok(parsed.models)
    }

    /// Text-only prompt, used to check the credential and model from the probe CLI.
    pub async fn generate_text(&self, prompt: &str) -> Result<ClassifierOutput, ClassifierError> {
        self.generate(vec![Part::Text { text: prompt }]).await
    }

    async fn generate(&self, parts: Vec<Part<'_>>) -> Result<ClassifierOutput, ClassifierError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        for model in &self.models {
            match self.generate_with_model(model, &request).await? {
                Some(output) => return Ok(output),
                None => {
                    tracing::warn!("Model {} not available, trying next fallback", model);
                }
            }
        }

        Err(ClassifierError::ModelUnavailable {
            tried: self.models.join(", "),
        })
    }

    /// `Ok(None)` when the model does not exist for this key.
    async fn generate_with_model(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<Option<ClassifierOutput>, ClassifierError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, model);
        let start = Instant::now();

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_err(e))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status(status.as_u16(), &body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifierError::ParseError(format!("generateContent response: {e}")))?;
        let text = extract_text(&parsed)?;

        tracing::debug!(
            "Gemini call completed: model={}, {} chars, {}ms",
            model,
            text.len(),
            start.elapsed().as_millis()
        );
        if text.trim().is_empty() {
            tracing::warn!("Gemini returned no text for model {}", model);
        }

        Ok(Some(ClassifierOutput::new(text, model)))
    }

    fn map_transport_err(&self, err: reqwest::Error) -> ClassifierError {
        if err.is_timeout() {
            ClassifierError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            ClassifierError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Classifier for GeminiClient {
    async fn classify(&self, image: &ImageUpload) -> Result<ClassifierOutput, ClassifierError> {
        let data = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let parts = vec![
            Part::Text {
                text: CLASSIFICATION_PROMPT,
            },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type(),
                    data,
                },
            },
        ];
        self.generate(parts).await
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }
}

fn extract_text(response: &GenerateResponse) -> Result<String, ClassifierError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(ClassifierError::Blocked(reason.to_string()));
    }

    let Some(candidate) = response.candidates.first() else {
        return Ok(String::new());
    };

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.trim().is_empty()
        && let Some(reason) = candidate.finish_reason.as_deref()
        && matches!(reason, "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII")
    {
        return Err(ClassifierError::Blocked(reason.to_string()));
    }

    Ok(text)
}

fn map_status(status: u16, body: &str) -> ClassifierError {
    let snippet = truncate_chars(body.trim(), ERROR_BODY_CAP_CHARS);
    let lowered = body.to_lowercase();
    match status {
        401 | 403 => ClassifierError::Auth(snippet),
        429 => ClassifierError::Quota(snippet),
        400 if lowered.contains("api key") || lowered.contains("api_key_invalid") => {
            ClassifierError::Auth(snippet)
        }
        400 if lowered.contains("image") => ClassifierError::InvalidImage(snippet),
        _ if lowered.contains("resource_exhausted") || lowered.contains("quota") => {
            ClassifierError::Quota(snippet)
        }
        _ => ClassifierError::Http {
            status,
            body: snippet,
        },
    }
}

fn truncate_chars(input: &str, max: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in input.chars().enumerate() {
        if idx >= max {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let r = response(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"moisture\":"},{"text":"\"wet\"}"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(extract_text(&r).unwrap(), r#"{"moisture":"wet"}"#);
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let r = response(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(matches!(extract_text(&r), Err(ClassifierError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_extract_text_safety_finish_without_text() {
        let r = response(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert!(matches!(extract_text(&r), Err(ClassifierError::Blocked(_))));
    }

    #[test]
    fn test_extract_text_empty_is_not_an_error() {
        assert_eq!(extract_text(&response("{}")).unwrap(), "");
        let r = response(r#"{"candidates":[{"content":{"parts":[]},"finishReason":"MAX_TOKENS"}]}"#);
        assert_eq!(extract_text(&r).unwrap(), "");
    }

    #[test]
    fn test_map_status() {
        assert!(matches!(map_status(403, "denied"), ClassifierError::Auth(_)));
        assert!(matches!(
            map_status(400, r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#),
            ClassifierError::Auth(_)
        ));
        assert!(matches!(map_status(429, "slow down"), ClassifierError::Quota(_)));
        assert!(matches!(
            map_status(400, "Unable to process input image"),
            ClassifierError::InvalidImage(_)
        ));
        assert!(matches!(
            map_status(503, "RESOURCE_EXHAUSTED"),
            ClassifierError::Quota(_)
        ));
        assert!(matches!(
            map_status(500, "boom"),
            ClassifierError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: "hi" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AAAA".to_string(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 64,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            value["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_model_info_names() {
        let info: ModelInfo = serde_json::from_str(
            r#"{"name":"models/gemini-2.5-flash","supportedGenerationMethods":["generateContent","countTokens"]}"#,
        )
        .unwrap();
        assert_eq!(info.short_name(), "gemini-2.5-flash");
        assert!(info.supports_generate_content());
    }

    #[test]
    fn test_new_requires_models() {
        assert!(GeminiClient::new("key", vec![]).is_err());
        let client = GeminiClient::new("key", vec!["m1".into(), "m2".into()]).unwrap();
        assert_eq!(client.models(), vec!["m1", "m2"]);
    }
}
