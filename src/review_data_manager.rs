use chrono::{DateTime, SecondsFormat, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::error::ReviewInsightError;
use crate::spreadsheet_reader::{self, CellValue, SpreadsheetRow};

// 컬럼 별칭. 위에서부터 순서대로 확인하고 처음 값이 있는 컬럼을 사용한다.
pub const RATING_ALIASES: &[&str] = &["rating", "평점"];
pub const CONTENT_ALIASES: &[&str] = &["content", "리뷰상세내용", "내용", "리뷰"];
pub const DATE_ALIASES: &[&str] = &["date", "작성일", "작성일자"];
pub const OPTION_ALIASES: &[&str] = &["option", "옵션", "옵션정보"];
pub const USER_NAME_ALIASES: &[&str] = &["userName", "작성자", "구매자명"];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// 필터링 전 원본 행 번호 (0부터)
    pub id: usize,
    /// 숫자로 변환할 수 없는 평점은 NaN으로 남는다
    pub rating: f64,
    pub content: String,
    pub date: String,
    pub option: String,
    pub user_name: String,
}

/// 파일 내용을 읽어 정규화된 리뷰 목록을 만든다.
pub fn load_reviews(file_name: &str, bytes: &[u8]) -> Result<Vec<ReviewRecord>, ReviewInsightError> {
    let rows = spreadsheet_reader::read_rows(file_name, bytes)?;
    normalize_rows(&rows, Utc::now())
}

/// 행마다 별칭으로 다섯 필드를 찾아 `ReviewRecord`로 만들고, 내용이 빈 리뷰는 버린다.
/// `loaded_at`은 작성일 컬럼이 없을 때의 기본값이다.
pub fn normalize_rows(
    rows: &[SpreadsheetRow],
    loaded_at: DateTime<Utc>,
) -> Result<Vec<ReviewRecord>, ReviewInsightError> {
    if rows.is_empty() {
        warn!("업로드된 파일에 데이터 행이 없습니다.");
        return Err(ReviewInsightError::EmptyDataset);
    }

    let default_date = loaded_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let records: Vec<ReviewRecord> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| normalize_row(index, row, &default_date))
        .filter(|record| !record.content.trim().is_empty())
        .collect();

    if records.is_empty() {
        warn!("{}개의 행 중 리뷰 내용이 있는 행이 없습니다.", rows.len());
        return Err(ReviewInsightError::no_valid_reviews());
    }

    let dropped = rows.len() - records.len();
    if dropped > 0 {
        info!("리뷰 {}개 로드 완료 (내용 없는 행 {}개 제외)", records.len(), dropped);
    } else {
        info!("리뷰 {}개 로드 완료", records.len());
    }
    Ok(records)
}

fn normalize_row(index: usize, row: &SpreadsheetRow, default_date: &str) -> ReviewRecord {
    ReviewRecord {
        id: index,
        rating: resolve(row, RATING_ALIASES).map_or(0.0, CellValue::to_number),
        content: resolve(row, CONTENT_ALIASES).map(CellValue::to_text).unwrap_or_default(),
        date: resolve(row, DATE_ALIASES).map_or_else(|| default_date.to_string(), CellValue::to_text),
        option: resolve(row, OPTION_ALIASES).map(CellValue::to_text).unwrap_or_default(),
        user_name: resolve(row, USER_NAME_ALIASES)
            .map_or_else(|| format!("User {}", index + 1), CellValue::to_text),
    }
}

fn resolve<'a>(row: &'a SpreadsheetRow, aliases: &[&str]) -> Option<&'a CellValue> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .find(|cell| cell.is_present())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn row(cells: &[(&str, CellValue)]) -> SpreadsheetRow {
        cells.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    fn loaded_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn maps_korean_marketplace_columns() {
        let rows = vec![row(&[
            ("평점", CellValue::Number(5.0)),
            ("리뷰상세내용", text("재구매 의사 있어요")),
            ("작성일", text("2025-12-01")),
            ("옵션정보", text("색상: 블랙")),
            ("구매자명", text("kim***")),
        ])];

        let records = normalize_rows(&rows, loaded_at()).unwrap();
        assert_eq!(
            records,
            vec![ReviewRecord {
                id: 0,
                rating: 5.0,
                content: "재구매 의사 있어요".to_string(),
                date: "2025-12-01".to_string(),
                option: "색상: 블랙".to_string(),
                user_name: "kim***".to_string(),
            }]
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let rows = vec![
            row(&[("내용", text("first"))]),
            row(&[("리뷰", text("second"))]),
        ];

        let records = normalize_rows(&rows, loaded_at()).unwrap();
        assert_eq!(records[1].rating, 0.0);
        assert_eq!(records[1].date, "2026-01-15T09:30:00.000Z");
        assert_eq!(records[1].option, "");
        assert_eq!(records[1].user_name, "User 2");
    }

    #[test]
    fn english_aliases_take_precedence_and_zero_is_a_value() {
        let rows = vec![row(&[
            ("rating", CellValue::Number(0.0)),
            ("평점", CellValue::Number(4.0)),
            ("content", text("english")),
            ("리뷰상세내용", text("korean")),
            ("userName", CellValue::Empty),
            ("작성자", text("lee***")),
        ])];

        let records = normalize_rows(&rows, loaded_at()).unwrap();
        assert_eq!(records[0].rating, 0.0);
        assert_eq!(records[0].content, "english");
        assert_eq!(records[0].user_name, "lee***");
    }

    #[test]
    fn empty_first_alias_falls_through_to_the_next() {
        let rows = vec![row(&[("content", text("")), ("내용", text("fallback"))])];
        let records = normalize_rows(&rows, loaded_at()).unwrap();
        assert_eq!(records[0].content, "fallback");
    }

    #[test]
    fn non_numeric_rating_is_kept_as_nan() {
        let rows = vec![row(&[("평점", text("별 다섯 개")), ("내용", text("좋아요"))])];
        let records = normalize_rows(&rows, loaded_at()).unwrap();
        assert!(records[0].rating.is_nan());
    }

    #[test]
    fn blank_content_rows_are_dropped_and_ids_keep_row_positions() {
        let csv = "평점,리뷰상세내용,작성일\n5,좋아요,2025-01-01\n4,   ,2025-01-02\n1,별로예요,2025-01-03\n";
        let rows = spreadsheet_reader::read_rows("reviews.csv", csv.as_bytes()).unwrap();

        let records = normalize_rows(&rows, loaded_at()).unwrap();
        let ids: Vec<usize> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(records[1].content, "별로예요");
        assert_eq!(records[1].user_name, "User 3");
    }

    #[test]
    fn no_rows_is_an_empty_dataset() {
        let err = normalize_rows(&[], loaded_at()).unwrap_err();
        assert!(matches!(err, ReviewInsightError::EmptyDataset));

        let err = load_reviews("reviews.csv", "평점,리뷰상세내용\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReviewInsightError::EmptyDataset));
    }

    #[test]
    fn all_rows_filtered_is_no_valid_reviews() {
        let rows = vec![
            row(&[("평점", CellValue::Number(5.0)), ("comment", text("wrong column"))]),
            row(&[("평점", CellValue::Number(3.0)), ("내용", text(" \t "))]),
        ];
        let err = normalize_rows(&rows, loaded_at()).unwrap_err();
        assert!(matches!(err, ReviewInsightError::NoValidReviews { .. }));
    }

    #[test]
    fn normalizing_twice_yields_identical_records() {
        let csv = "rating,content,option\n5,great,red\n2,bad,blue\n";
        let rows = spreadsheet_reader::read_rows("reviews.csv", csv.as_bytes()).unwrap();

        let first = normalize_rows(&rows, loaded_at()).unwrap();
        let second = normalize_rows(&rows, loaded_at()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn serializes_with_camel_case_field_names() {
        let rows = vec![row(&[("content", text("ok"))])];
        let records = normalize_rows(&rows, loaded_at()).unwrap();
        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["userName"], "User 1");
    }
}
