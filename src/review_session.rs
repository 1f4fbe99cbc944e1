use log::*;

use crate::dashboard_presenter::{self, DashboardView};
use crate::error::ReviewInsightError;
use crate::review_data_manager::ReviewRecord;
use crate::review_insight_analyzer::AnalysisResult;
use crate::review_preview::ReviewPreview;

/// `begin_analysis`가 돌려주는 스냅샷. 결과를 돌려줄 때 세대 번호로 대조한다.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub generation: u64,
    pub reviews: Vec<ReviewRecord>,
}

/// 창 하나가 살아 있는 동안의 리뷰 목록과 분석 결과
#[derive(Debug, Default)]
pub struct ReviewSession {
    reviews: Vec<ReviewRecord>,
    result: Option<AnalysisResult>,
    analyzing: bool,
    generation: u64,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, reviews: Vec<ReviewRecord>) -> Result<(), ReviewInsightError> {
        if self.analyzing {
            return Err(ReviewInsightError::AnalysisInProgress);
        }
        info!("리뷰 {}개 로드됨 (이전 결과 초기화)", reviews.len());
        self.reviews = reviews;
        self.result = None;
        self.generation += 1;
        Ok(())
    }

    pub fn reviews(&self) -> &[ReviewRecord] {
        &self.reviews
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn begin_analysis(&mut self) -> Result<AnalysisTicket, ReviewInsightError> {
        if self.reviews.is_empty() {
            return Err(ReviewInsightError::NoReviewsLoaded);
        }
        if self.analyzing {
            return Err(ReviewInsightError::AnalysisInProgress);
        }
        self.analyzing = true;
        Ok(AnalysisTicket {
            generation: self.generation,
            reviews: self.reviews.clone(),
        })
    }

    /// 분석 결과를 반영한다. 그 사이 reset/load로 세대가 바뀌었으면 결과를 버린다.
    /// 실패해도 리뷰 목록은 그대로 두어 다시 시도할 수 있게 한다.
    pub fn finish_analysis(
        &mut self,
        generation: u64,
        outcome: Result<AnalysisResult, ReviewInsightError>,
    ) -> Result<AnalysisResult, ReviewInsightError> {
        if generation != self.generation {
            warn!(
                "세션이 초기화된 뒤 도착한 분석 결과를 버립니다 (세대 {} != {}, 성공 여부: {})",
                generation,
                self.generation,
                outcome.is_ok()
            );
            return Err(ReviewInsightError::StaleAnalysis);
        }

        self.analyzing = false;
        let result = outcome?;
        self.result = Some(result.clone());
        Ok(result)
    }

    pub fn reset(&mut self) {
        info!("세션 초기화");
        self.reviews.clear();
        self.result = None;
        self.analyzing = false;
        self.generation += 1;
    }

    pub fn preview(&self) -> Option<ReviewPreview> {
        if self.reviews.is_empty() {
            None
        } else {
            Some(ReviewPreview::from_reviews(&self.reviews))
        }
    }

    pub fn dashboard(&self) -> Option<DashboardView> {
        self.result.as_ref().map(DashboardView::from_result)
    }

    /// 현재 분석 결과의 Markdown 보고서. 분석 전이면 `NoAnalysisResult`.
    pub fn report(&self) -> Result<String, ReviewInsightError> {
        self.result
            .as_ref()
            .map(dashboard_presenter::render_markdown)
            .ok_or(ReviewInsightError::NoAnalysisResult)
    }
}
