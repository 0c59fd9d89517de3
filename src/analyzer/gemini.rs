//! Gemini API連携
//!
//! `generateContent` に画像（inlineData）・抽出指示・システム指示・
//! 出力スキーマを1リクエストで送り、JSONテキストをReportFieldsへパースする。

use super::{validate_image_count, ExtractionError, Extractor};
use crate::config::{Config, DEFAULT_API_BASE_URL};
use crate::error::Result;
use crate::staging::StagedImage;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use safety_lens_common::{
    parse_extraction_response, response_schema, ReportFields, EXTRACTION_PROMPT, SYSTEM_INSTRUCTION,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Gemini APIリクエスト
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
    response_schema: Value,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// 先頭候補のテキストパートを連結
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini クライアント
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// 設定から生成（APIキー未設定はエラー）
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        Ok(Self::new(api_key, config.model.clone()).with_base_url(config.api_base_url.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(images: &[StagedImage]) -> GeminiRequest {
        // 画像を先に、抽出指示を最後に置く
        let mut parts: Vec<Part> = images
            .iter()
            .map(|img| Part::InlineData {
                inline_data: InlineData {
                    mime_type: img.mime_type.clone(),
                    data: STANDARD.encode(&img.data),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: EXTRACTION_PROMPT.to_string(),
        });

        GeminiRequest {
            contents: vec![Content { parts }],
            system_instruction: Content {
                parts: vec![Part::Text {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        }
    }

    async fn call(&self, request: &GeminiRequest) -> std::result::Result<String, ExtractionError> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gemini request failed");
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        payload.text().ok_or(ExtractionError::EmptyResponse)
    }
}

#[async_trait]
impl Extractor for GeminiClient {
    async fn analyze(&self, images: &[StagedImage]) -> std::result::Result<ReportFields, ExtractionError> {
        validate_image_count(images)?;

        let request = Self::build_request(images);
        let bytes: usize = images.iter().map(|i| i.data.len()).sum();
        debug!(model = %self.model, images = images.len(), bytes, "sending extraction request");

        let text = self.call(&request).await?;
        debug!(chars = text.chars().count(), "extraction response received");

        Ok(parse_extraction_response(&text)?)
    }
}
