use log::*;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config_manager::GeminiConfig;
use crate::error::ReviewInsightError;
use crate::gemini_api::GeminiApi;
use crate::insight_post_processor;
use crate::insight_request_builder::InsightRequest;
use crate::review_data_manager::ReviewRecord;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    #[serde(deserialize_with = "deserialize_review_count")]
    pub total_reviews: u64,
    pub average_rating: f64,
    pub positive_ratio: f64,
    pub neutral_ratio: f64,
    pub negative_ratio: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: AnalysisSummary,
    pub keywords: Vec<String>,
    pub pain_points: Vec<String>,
    pub purchase_factors: Vec<String>,
    pub marketing_suggestions: Vec<String>,
}

// 모델이 NUMBER 타입으로 200.0이나 음수를 돌려주는 경우가 있다.
// 이 값은 후처리에서 업로드된 리뷰 수로 덮어쓰므로 여기서는 0 이상 정수로만 맞춘다.
fn deserialize_review_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() {
        Ok(value.max(0.0).round() as u64)
    } else {
        Ok(0)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnalysisProgress {
    pub step: String,
    pub message: String,
    pub progress: Option<f64>,
    pub completed: bool,
}

pub struct ReviewInsightAnalyzer {
    config: GeminiConfig,
    on_progress: Option<Box<dyn Fn(AnalysisProgress) + Send + Sync>>,
}

impl ReviewInsightAnalyzer {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            on_progress: None,
        }
    }

    pub fn with_progress_callback(mut self, on_progress: Box<dyn Fn(AnalysisProgress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    fn emit_progress(&self, step: &str, message: &str, progress: Option<f64>, completed: bool) {
        if let Some(ref on_progress) = self.on_progress {
            on_progress(AnalysisProgress {
                step: step.to_string(),
                message: message.to_string(),
                progress,
                completed,
            });
        }
    }

    /// 요청 생성 -> Gemini 호출 (1회) -> 결과 보정.
    /// API 키가 없으면 요청을 보내지 않고 `Configuration` 오류를 낸다.
    pub async fn analyze(&self, reviews: &[ReviewRecord]) -> Result<AnalysisResult, ReviewInsightError> {
        let start_total = std::time::Instant::now();

        let api_key = self.config.resolve_api_key()?;

        self.emit_progress("prepare", "리뷰 데이터 준비 중...", Some(0.0), false);
        let request = InsightRequest::build(reviews);
        info!(
            "분석 요청 준비 완료: 전체 {}개 중 {}개 전송 (model={})",
            request.original_count, request.sent_count, self.config.model
        );
        self.emit_progress(
            "prepare",
            &format!("{}개 중 {}개 리뷰 전송 준비 완료", request.original_count, request.sent_count),
            Some(100.0),
            true,
        );

        self.emit_progress("generate", "AI가 리뷰를 분석하는 중...", None, false);
        let start_generate = std::time::Instant::now();
        // 클라이언트는 요청마다 새로 만든다
        let api = GeminiApi::new(&self.config, api_key)?;
        let raw = match api.generate_insight(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Gemini 분석 실패: {}", e);
                self.emit_progress("generate", "AI 분석 실패", None, true);
                return Err(e);
            }
        };
        let generate_elapsed = start_generate.elapsed();
        self.emit_progress(
            "generate",
            &format!("AI 분석 완료 ({:.2}초)", generate_elapsed.as_secs_f64()),
            Some(100.0),
            true,
        );

        let result = insight_post_processor::post_process(raw, request.original_count);
        info!(
            "분석 완료: 총 소요 시간 {:.2}초, 긍정 {}% / 중립 {}% / 부정 {}%",
            start_total.elapsed().as_secs_f64(),
            result.summary.positive_ratio,
            result.summary.neutral_ratio,
            result.summary.negative_ratio
        );
        Ok(result)
    }
}
