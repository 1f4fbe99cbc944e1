use serde_json::{json, Value};

use crate::review_data_manager::ReviewRecord;

/// 한 번에 모델에 보내는 최대 리뷰 수
pub const MAX_REVIEWS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct InsightRequest {
    pub prompt: String,
    /// 업로드된 전체 리뷰 수 (대시보드에 표시되는 값)
    pub original_count: usize,
    /// 실제로 프롬프트에 포함된 리뷰 수
    pub sent_count: usize,
}

impl InsightRequest {
    /// 리뷰 목록의 앞에서부터 최대 `MAX_REVIEWS`개를 사용한다. 정렬은 호출하는 쪽 책임.
    pub fn build(reviews: &[ReviewRecord]) -> Self {
        let original_count = reviews.len();
        let sent_count = original_count.min(MAX_REVIEWS);
        let lines = review_lines(&reviews[..sent_count]);

        InsightRequest {
            prompt: analysis_prompt(original_count, sent_count, &lines),
            original_count,
            sent_count,
        }
    }

    /// generateContent 요청 본문. 응답 스키마를 함께 보낸다.
    pub fn to_request_body(&self) -> Value {
        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": self.prompt }]
                }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        })
    }
}

pub fn review_lines(reviews: &[ReviewRecord]) -> String {
    reviews
        .iter()
        .map(|r| format!("[Rating: {}] {}", r.rating, r.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "OBJECT",
                "properties": {
                    "totalReviews": { "type": "NUMBER" },
                    "averageRating": { "type": "NUMBER" },
                    "positiveRatio": { "type": "NUMBER" },
                    "neutralRatio": { "type": "NUMBER" },
                    "negativeRatio": { "type": "NUMBER" }
                },
                "required": ["totalReviews", "averageRating", "positiveRatio", "neutralRatio", "negativeRatio"]
            },
            "keywords": { "type": "ARRAY", "items": { "type": "STRING" } },
            "painPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
            "purchaseFactors": { "type": "ARRAY", "items": { "type": "STRING" } },
            "marketingSuggestions": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["summary", "keywords", "painPoints", "purchaseFactors", "marketingSuggestions"]
    })
}

fn analysis_prompt(original_count: usize, sent_count: usize, lines: &str) -> String {
    format!(r#"You are an expert e-commerce data analyst. Analyze the following customer reviews from a Korean e-commerce platform (Naver Smart Store).

Total Reviews Provided: {original} (the list sent to you may be truncated; use the provided data to infer ratios).

Analyze the sentiment, key topics, complaints, and buying reasons.
Return the result in JSON format matching the schema.

IMPORTANT:
- All text outputs (keywords, painPoints, purchaseFactors, marketingSuggestions) MUST be in KOREAN.
- 'totalReviews' should be the number of reviews sent to you ({sent}).
- 'averageRating': calculate from the provided data if possible, or estimate.
- Ratios (positive/neutral/negative) must sum to 100.

Reviews Data:
{lines}"#, original = original_count, sent = sent_count, lines = lines)
}
