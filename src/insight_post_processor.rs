use log::*;

use crate::review_insight_analyzer::{AnalysisResult, AnalysisSummary};

/// 합이 100이 아니면 긍정/부정을 비례 환산하고 중립으로 나머지를 채운다.
/// 합이 0 이하인 경우는 나눌 수 없으므로 그대로 둔다.
pub fn repair_ratios(summary: &mut AnalysisSummary) {
    let total = summary.positive_ratio + summary.neutral_ratio + summary.negative_ratio;
    if total == 100.0 || total <= 0.0 || !total.is_finite() {
        return;
    }

    let positive = (summary.positive_ratio / total * 100.0).round();
    let negative = (summary.negative_ratio / total * 100.0).round();
    let neutral = 100.0 - positive - negative;

    debug!(
        "감성 비율 보정: ({}, {}, {}) -> ({}, {}, {})",
        summary.positive_ratio, summary.neutral_ratio, summary.negative_ratio, positive, neutral, negative
    );

    summary.positive_ratio = positive;
    summary.neutral_ratio = neutral;
    summary.negative_ratio = negative;
}

/// 모델 결과를 화면에 보여줄 형태로 맞춘다.
/// 총 리뷰 수는 모델이 본 개수가 아니라 업로드된 개수로 항상 덮어쓴다.
pub fn post_process(mut result: AnalysisResult, original_count: usize) -> AnalysisResult {
    repair_ratios(&mut result.summary);
    result.summary.total_reviews = original_count as u64;
    result
}
