use serde::Serialize;

use crate::review_data_manager::ReviewRecord;

pub const PREVIEW_ROWS: usize = 5;

/// 분석 전에 사용자가 데이터를 확인하는 미리보기
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPreview {
    pub rows: Vec<ReviewRecord>,
    pub total_count: usize,
    pub overflow_count: usize,
    /// 숫자로 읽힌 평점만의 평균. 없으면 None
    pub local_average_rating: Option<f64>,
}

impl ReviewPreview {
    pub fn from_reviews(reviews: &[ReviewRecord]) -> Self {
        let total_count = reviews.len();
        ReviewPreview {
            rows: reviews.iter().take(PREVIEW_ROWS).cloned().collect(),
            total_count,
            overflow_count: total_count.saturating_sub(PREVIEW_ROWS),
            local_average_rating: average_rating(reviews),
        }
    }
}

fn average_rating(reviews: &[ReviewRecord]) -> Option<f64> {
    let ratings: Vec<f64> = reviews.iter().map(|r| r.rating).filter(|r| r.is_finite()).collect();
    if ratings.is_empty() {
        return None;
    }
    let avg = ratings.iter().sum::<f64>() / ratings.len() as f64;
    Some((avg * 100.0).round() / 100.0)
}
