use thiserror::Error;

use crate::review_data_manager::{CONTENT_ALIASES, RATING_ALIASES};

#[derive(Debug, Error)]
pub enum ReviewInsightError {
    #[error("API credential is not configured: {0}")]
    Configuration(String),

    #[error("the uploaded file contains no rows")]
    EmptyDataset,

    #[error("no row has review content (expected columns: {expected_columns})")]
    NoValidReviews { expected_columns: String },

    #[error("failed to parse file as tabular data: {0}")]
    Parse(String),

    #[error("AI analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("an analysis request is already in progress")]
    AnalysisInProgress,

    #[error("no reviews are loaded")]
    NoReviewsLoaded,

    #[error("no analysis result is available yet")]
    NoAnalysisResult,

    /// 분석 중에 세션이 초기화되거나 새 파일이 올라와 결과를 버린 경우
    #[error("analysis result was discarded because the session changed")]
    StaleAnalysis,

    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ReviewInsightError {
    pub fn no_valid_reviews() -> Self {
        ReviewInsightError::NoValidReviews {
            expected_columns: expected_columns_hint(),
        }
    }

    /// 웹뷰에 그대로 보여줄 한국어 메시지
    pub fn user_message(&self) -> String {
        match self {
            ReviewInsightError::Configuration(_) => {
                "Google Gemini API 키가 설정되지 않았습니다. 환경 변수를 확인해주세요.".to_string()
            }
            ReviewInsightError::EmptyDataset => "파일에 데이터가 없습니다.".to_string(),
            ReviewInsightError::NoValidReviews { expected_columns } => format!(
                "유효한 리뷰 데이터를 찾을 수 없습니다. 컬럼명을 확인해주세요 ({}).",
                expected_columns
            ),
            ReviewInsightError::Parse(_) => "파일 파싱 중 오류가 발생했습니다.".to_string(),
            ReviewInsightError::AnalysisFailed(_) => {
                "분석 중 오류가 발생했습니다. 잠시 후 다시 시도하거나 파일 데이터를 확인해주세요.".to_string()
            }
            ReviewInsightError::AnalysisInProgress => "이미 분석이 진행 중입니다.".to_string(),
            ReviewInsightError::NoReviewsLoaded => "먼저 리뷰 파일을 업로드해주세요.".to_string(),
            ReviewInsightError::NoAnalysisResult => "먼저 리뷰 분석을 실행해주세요.".to_string(),
            ReviewInsightError::StaleAnalysis => {
                "세션이 초기화되어 이전 분석 결과를 표시하지 않습니다.".to_string()
            }
            ReviewInsightError::Io(e) => format!("파일을 읽거나 쓰는 중 오류가 발생했습니다: {}", e),
        }
    }
}

fn expected_columns_hint() -> String {
    format!(
        "평점: {} / 리뷰 내용: {}",
        RATING_ALIASES.join(", "),
        CONTENT_ALIASES.join(", ")
    )
}
