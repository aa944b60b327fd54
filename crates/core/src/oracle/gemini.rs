use crate::config::Settings;
use crate::domain::contract::MAX_RECOMMENDATIONS;
use crate::oracle::error::OracleDiagnosticsError;
use crate::oracle::{OracleRequest, RecommendationOracle};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate_content(
        &self,
        req: &GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);

        let res = self
            .http
            .post(self.url())
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(OracleDiagnosticsError {
                provider: PROVIDER,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to decode Gemini response: {text}"))
    }

    pub fn build_request(request: &OracleRequest) -> anyhow::Result<GenerateContentRequest> {
        Ok(GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Self::system_prompt(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: Self::user_prompt(request)?,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: Self::response_schema(),
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        })
    }

    fn response_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "OBJECT",
            "required": ["recommendations"],
            "properties": {
                "recommendations": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "required": ["cardId", "score", "reasoning"],
                        "properties": {
                            "cardId": {
                                "type": "STRING",
                                "description": "The id of the recommended card, copied from the card list."
                            },
                            "score": {
                                "type": "INTEGER",
                                "description": "How well the card fits the profile, from 1 to 100."
                            },
                            "reasoning": {
                                "type": "STRING",
                                "description": "A short explanation of why the card suits the user."
                            }
                        }
                    }
                }
            }
        })
    }

    fn system_prompt() -> String {
        format!(
            "You are CardGenie, an expert on Indian credit cards.\n\
Pick the credit cards from the provided list that best suit the user's financial profile and preferences.\n\
Recommend the top {MAX_RECOMMENDATIONS} cards, best match first.\n\
Respond in JSON only.\n\
Every cardId MUST exactly match an id from the provided card list."
        )
    }

    pub fn user_prompt(request: &OracleRequest) -> anyhow::Result<String> {
        Ok(format!(
            "User profile:\n\
- Monthly Income: {} INR\n\
- Top Spending Categories: {}\n\
- Desired Benefits: {}\n\n\
Available credit cards:\n{}\n\n\
Return the top {MAX_RECOMMENDATIONS} recommendations in the requested JSON format.",
            request.profile.monthly_income(),
            join_or_unspecified(request.profile.spending_categories()),
            join_or_unspecified(request.profile.desired_benefits()),
            request.catalog_json()?,
        ))
    }

    fn response_text(res: &GenerateContentResponse) -> anyhow::Result<String> {
        let text = res
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let finish_reason = res
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "none".to_string());
            return Err(OracleDiagnosticsError {
                provider: PROVIDER,
                stage: "response",
                detail: format!("no candidate text (finish_reason={finish_reason})"),
                raw_output: None,
                raw_response_json: None,
            }
            .into());
        }

        Ok(text.trim().to_string())
    }
}

fn join_or_unspecified(values: &[String]) -> String {
    if values.is_empty() {
        "Not specified".to_string()
    } else {
        values.join(", ")
    }
}

#[async_trait::async_trait]
impl RecommendationOracle for GeminiClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn recommend(&self, request: &OracleRequest) -> anyhow::Result<String> {
        let req = Self::build_request(request)?;
        tracing::debug!(
            model = %self.model,
            cards_len = request.catalog.len(),
            "calling Gemini for card recommendations"
        );
        let res = self.generate_content(&req).await?;
        Self::response_text(&res)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
