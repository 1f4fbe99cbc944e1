use serde::Serialize;

use crate::review_insight_analyzer::AnalysisResult;

pub const POSITIVE_COLOR: &str = "#22c55e";
pub const NEUTRAL_COLOR: &str = "#94a3b8";
pub const NEGATIVE_COLOR: &str = "#ef4444";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTile {
    pub label: String,
    pub value: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSegment {
    pub name: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InsightKind {
    Keywords,
    PainPoints,
    PurchaseFactors,
    MarketingSuggestions,
}

impl InsightKind {
    pub fn title(&self) -> &'static str {
        match self {
            InsightKind::Keywords => "주요 키워드 Top 5",
            InsightKind::PainPoints => "핵심 불만 요소 (Pain Points)",
            InsightKind::PurchaseFactors => "구매 결정 요인",
            InsightKind::MarketingSuggestions => "AI 마케팅 제안",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightPanel {
    pub kind: InsightKind,
    pub title: String,
    pub items: Vec<String>,
}

/// 웹뷰 대시보드가 그대로 그리는 뷰 모델
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub summary_tiles: Vec<SummaryTile>,
    pub sentiment_segments: Vec<SentimentSegment>,
    pub insight_panels: Vec<InsightPanel>,
    pub result: AnalysisResult,
}

impl DashboardView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        DashboardView {
            summary_tiles: summary_tiles(result),
            sentiment_segments: sentiment_segments(result),
            insight_panels: insight_panels(result),
            result: result.clone(),
        }
    }
}

fn summary_tiles(result: &AnalysisResult) -> Vec<SummaryTile> {
    let s = &result.summary;
    vec![
        SummaryTile {
            label: "총 리뷰 수".to_string(),
            value: format_thousands(s.total_reviews),
            caption: None,
        },
        SummaryTile {
            label: "평균 평점".to_string(),
            value: format!("{:.1}", s.average_rating),
            caption: Some("5.0 만점 기준".to_string()),
        },
        SummaryTile {
            label: "긍정 리뷰 비율".to_string(),
            value: format!("{}%", s.positive_ratio),
            caption: None,
        },
        SummaryTile {
            label: "부정 리뷰 비율".to_string(),
            value: format!("{}%", s.negative_ratio),
            caption: None,
        },
    ]
}

// 차트에서만 0 이하 구간을 뺀다. 요약 수치는 그대로 남는다.
fn sentiment_segments(result: &AnalysisResult) -> Vec<SentimentSegment> {
    let s = &result.summary;
    [
        ("긍정", s.positive_ratio, POSITIVE_COLOR),
        ("중립", s.neutral_ratio, NEUTRAL_COLOR),
        ("부정", s.negative_ratio, NEGATIVE_COLOR),
    ]
    .iter()
    .filter(|(_, value, _)| *value > 0.0)
    .map(|(name, value, color)| SentimentSegment {
        name: name.to_string(),
        value: *value,
        color: color.to_string(),
    })
    .collect()
}

fn insight_panels(result: &AnalysisResult) -> Vec<InsightPanel> {
    [
        (InsightKind::Keywords, &result.keywords),
        (InsightKind::PainPoints, &result.pain_points),
        (InsightKind::PurchaseFactors, &result.purchase_factors),
        (InsightKind::MarketingSuggestions, &result.marketing_suggestions),
    ]
    .into_iter()
    .map(|(kind, items)| InsightPanel {
        kind,
        title: kind.title().to_string(),
        items: items.clone(),
    })
    .collect()
}

pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// 대시보드와 같은 내용을 Markdown 보고서로 만든다
pub fn render_markdown(result: &AnalysisResult) -> String {
    let view = DashboardView::from_result(result);
    let mut out = String::from("# 리뷰 분석 리포트\n\n## 요약\n\n");

    for tile in &view.summary_tiles {
        match &tile.caption {
            Some(caption) => out.push_str(&format!("- **{}**: {} ({})\n", tile.label, tile.value, caption)),
            None => out.push_str(&format!("- **{}**: {}\n", tile.label, tile.value)),
        }
    }

    out.push_str("\n## 감성 분포\n\n| 구분 | 비율 |\n| --- | --- |\n");
    let s = &result.summary;
    for (name, value) in [("긍정", s.positive_ratio), ("중립", s.neutral_ratio), ("부정", s.negative_ratio)] {
        out.push_str(&format!("| {} | {}% |\n", name, value));
    }

    for panel in &view.insight_panels {
        out.push_str(&format!("\n## {}\n\n", panel.title));
        if panel.items.is_empty() {
            out.push_str("- (없음)\n");
        }
        for (i, item) in panel.items.iter().enumerate() {
            match panel.kind {
                InsightKind::MarketingSuggestions => out.push_str(&format!("{}. {}\n", i + 1, item)),
                _ => out.push_str(&format!("- {}\n", item)),
            }
        }
    }

    out
}
