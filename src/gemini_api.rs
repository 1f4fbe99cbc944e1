use std::time::Duration;

use lazy_static::lazy_static;
use log::*;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::config_manager::GeminiConfig;
use crate::error::ReviewInsightError;
use crate::insight_request_builder::InsightRequest;
use crate::review_insight_analyzer::AnalysisResult;

const ERROR_BODY_PREVIEW_CHARS: usize = 300;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap();
}

/// Gemini generateContent 클라이언트. 분석 요청마다 새로 만들고 버린다.
pub struct GeminiApi {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiApi {
    pub fn new(config: &GeminiConfig, api_key: String) -> Result<Self, ReviewInsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ReviewInsightError::AnalysisFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.api_base.trim_end_matches('/'),
                config.model
            ),
            api_key,
        })
    }

    /// 한 번만 요청한다. 재시도는 하지 않는다.
    pub async fn generate_insight(
        &self,
        request: &InsightRequest,
    ) -> Result<AnalysisResult, ReviewInsightError> {
        debug!("Gemini API 호출: {} ({}개 리뷰)", self.endpoint, request.sent_count);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request.to_request_body())
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                ReviewInsightError::AnalysisFailed(format!("Gemini API {}: {}", reason, e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ReviewInsightError::AnalysisFailed(format!(
                "Failed to read Gemini response body: {}",
                e
            ))
        })?;

        if !status.is_success() {
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            return Err(ReviewInsightError::AnalysisFailed(format!(
                "Gemini API HTTP 오류: {} - {}",
                status, preview
            )));
        }

        parse_generate_content_response(&body)
    }
}

/// 응답 봉투에서 첫 번째 후보의 텍스트를 꺼내 `AnalysisResult`로 읽는다.
/// 스키마를 지정해도 모델이 지키지 않을 수 있으므로 필수 필드가 빠지면 실패로 본다.
pub fn parse_generate_content_response(body: &str) -> Result<AnalysisResult, ReviewInsightError> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| {
        ReviewInsightError::AnalysisFailed(format!("Gemini response is not JSON: {}", e))
    })?;

    if let Some(reason) = envelope
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(ReviewInsightError::AnalysisFailed(format!(
            "Gemini blocked the prompt: {}",
            reason
        )));
    }

    let candidate_text = envelope
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| {
            ReviewInsightError::AnalysisFailed(
                "Gemini response does not contain candidate text".to_string(),
            )
        })?;

    serde_json::from_str(strip_code_fence(candidate_text)).map_err(|e| {
        ReviewInsightError::AnalysisFailed(format!("Failed to parse Gemini structured JSON: {}", e))
    })
}

fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}
