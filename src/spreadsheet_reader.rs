use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Timelike;
use encoding_rs::{Encoding, EUC_KR};
use log::*;
use serde::{Deserialize, Serialize};

use crate::error::ReviewInsightError;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const DELIMITER_CANDIDATES: &[u8] = &[b',', b'\t', b';'];

/// 시트 셀 하나의 값. 워크북은 타입이 있는 셀을, CSV는 항상 `Text`를 만든다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

/// 헤더 이름 -> 셀 값
pub type SpreadsheetRow = HashMap<String, CellValue>;

impl CellValue {
    /// 빈 셀과 빈 문자열은 "컬럼 없음"과 같게 취급한다. 숫자 0과 `false`는 값이다.
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(s) => !s.is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            CellValue::Empty => 0.0,
            CellValue::Number(n) => *n,
            CellValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Workbook,
    DelimitedText,
}

impl SpreadsheetFormat {
    pub fn detect(file_name: &str, bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(CFB_MAGIC) {
            return SpreadsheetFormat::Workbook;
        }
        match file_extension(file_name).as_deref() {
            Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => SpreadsheetFormat::Workbook,
            _ => SpreadsheetFormat::DelimitedText,
        }
    }
}

fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// 업로드된 파일을 행 목록으로 읽는다. 워크북은 첫 번째 시트만 사용한다.
pub fn read_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<SpreadsheetRow>, ReviewInsightError> {
    let format = SpreadsheetFormat::detect(file_name, bytes);
    debug!("Reading {} ({} bytes) as {:?}", file_name, bytes.len(), format);

    let rows = match format {
        SpreadsheetFormat::Workbook => read_workbook_rows(bytes)?,
        SpreadsheetFormat::DelimitedText => read_delimited_rows(file_name, bytes)?,
    };

    info!("{}: {}개의 데이터 행을 읽었습니다.", file_name, rows.len());
    Ok(rows)
}

fn read_workbook_rows(bytes: &[u8]) -> Result<Vec<SpreadsheetRow>, ReviewInsightError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ReviewInsightError::Parse(format!("Unable to open the spreadsheet: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReviewInsightError::Parse("The workbook does not contain any worksheets.".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ReviewInsightError::Parse(format!("Unable to read the worksheet '{}': {}", sheet_name, e)))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(|cell| workbook_cell(cell).to_text().trim().to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    Ok(rows_iter
        .filter_map(|row| build_row(&headers, row.iter().map(workbook_cell)))
        .collect())
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.hour() == 0 && datetime.minute() == 0 && datetime.second() == 0 => {
                CellValue::Text(datetime.format("%Y-%m-%d").to_string())
            }
            Some(datetime) => CellValue::Text(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn read_delimited_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<SpreadsheetRow>, ReviewInsightError> {
    let text = decode_text(bytes);
    let delimiter = detect_delimiter(file_name, &text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReviewInsightError::Parse(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReviewInsightError::Parse(format!("Failed to read CSV row: {}", e)))?;
        let cells = record.iter().map(|value| {
            if value.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(value.to_string())
            }
        });
        if let Some(row) = build_row(&headers, cells) {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// BOM이 있으면 그 인코딩을, 없으면 UTF-8을 시도하고 실패하면 EUC-KR(CP949)로 읽는다.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, had_errors) = EUC_KR.decode(bytes);
            if had_errors {
                warn!("File is neither UTF-8 nor EUC-KR; undecodable bytes were replaced.");
            } else {
                debug!("Decoded delimited text as EUC-KR");
            }
            text.into_owned()
        }
    }
}

fn detect_delimiter(file_name: &str, text: &str) -> u8 {
    if file_extension(file_name).as_deref() == Some("tsv") {
        return b'\t';
    }

    let header_line = text.lines().next().unwrap_or_default();
    let mut best = b',';
    let mut best_count = 0;
    for &candidate in DELIMITER_CANDIDATES {
        let count = header_line.bytes().filter(|&b| b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// 헤더와 셀을 묶는다. 이름 없는 헤더는 건너뛰고, 중복 헤더는 처음 나온 컬럼이 이긴다.
/// 값이 하나도 없는 행은 `None`.
fn build_row(headers: &[String], cells: impl Iterator<Item = CellValue>) -> Option<SpreadsheetRow> {
    let mut row = SpreadsheetRow::new();
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        row.entry(header.clone()).or_insert(cell);
    }

    if row.values().any(CellValue::is_present) {
        Some(row)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    #[test]
    fn detects_workbooks_by_magic_bytes_before_extension() {
        assert_eq!(SpreadsheetFormat::detect("reviews.csv", b"PK\x03\x04rest"), SpreadsheetFormat::Workbook);
        assert_eq!(
            SpreadsheetFormat::detect("reviews", &[0xD0, 0xCF, 0x11, 0xE0, 0x00]),
            SpreadsheetFormat::Workbook
        );
        assert_eq!(SpreadsheetFormat::detect("REVIEWS.XLSX", b"not a zip"), SpreadsheetFormat::Workbook);
        assert_eq!(SpreadsheetFormat::detect("reviews.csv", "평점,내용".as_bytes()), SpreadsheetFormat::DelimitedText);
        assert_eq!(SpreadsheetFormat::detect("reviews.txt", b"a\tb"), SpreadsheetFormat::DelimitedText);
    }

    #[test]
    fn reads_utf8_csv_with_korean_headers() {
        let csv = "평점,리뷰상세내용,작성일\n5,배송이 빨라요,2024-01-02\n3,,2024-01-03\n";
        let rows = read_rows("reviews.csv", csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("평점"), Some(&text("5")));
        assert_eq!(rows[0].get("리뷰상세내용"), Some(&text("배송이 빨라요")));
        assert_eq!(rows[1].get("리뷰상세내용"), Some(&CellValue::Empty));
    }

    #[test]
    fn euc_kr_and_bom_prefixed_files_decode_like_utf8() {
        let csv = "평점,내용\n4,포장이 꼼꼼해요\n";
        let expected = read_rows("reviews.csv", csv.as_bytes()).unwrap();

        let (euc_kr, _, had_errors) = EUC_KR.encode(csv);
        assert!(!had_errors);
        assert_eq!(read_rows("reviews.csv", &euc_kr).unwrap(), expected);

        let mut with_bom = vec![0xEF, 0xBB, 0xBF];
        with_bom.extend_from_slice(csv.as_bytes());
        assert_eq!(read_rows("reviews.csv", &with_bom).unwrap(), expected);
    }

    #[test]
    fn sniffs_tab_and_semicolon_delimiters() {
        let tsv = "rating\tcontent\n5\tgood, really\n";
        let rows = read_rows("export.txt", tsv.as_bytes()).unwrap();
        assert_eq!(rows[0].get("content"), Some(&text("good, really")));

        let semicolon = "rating;content\n2;meh\n";
        let rows = read_rows("export.csv", semicolon.as_bytes()).unwrap();
        assert_eq!(rows[0].get("rating"), Some(&text("2")));
    }

    #[test]
    fn skips_blank_rows_and_unnamed_columns() {
        let csv = "rating,,content\n,,\n1,ignored,ok\n";
        let rows = read_rows("reviews.csv", csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert!(!rows[0].contains_key(""));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let rows = read_rows("reviews.csv", "평점,리뷰\n".as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    // 첫 시트: 리뷰 3행 (두 번째 행은 내용 없음), 두 번째 시트: 읽으면 안 되는 데이터
    fn two_sheet_workbook() -> Vec<u8> {
        use rust_xlsxwriter::{Format, Workbook};

        let date = Format::new().set_num_format("yyyy-mm-dd");
        let date_time = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let mut workbook = Workbook::new();

        let reviews = workbook.add_worksheet();
        reviews.set_name("리뷰").unwrap();
        for (col, header) in ["평점", "리뷰상세내용", "작성일", "추천"].iter().enumerate() {
            reviews.write_string(0, col as u16, *header).unwrap();
        }
        reviews.write_number(1, 0, 5.0).unwrap();
        reviews.write_string(1, 1, "배송이 빨라요").unwrap();
        reviews.write_number_with_format(1, 2, 45720.0, &date).unwrap();
        reviews.write_boolean(1, 3, true).unwrap();
        reviews.write_number(2, 0, 3.0).unwrap();
        reviews.write_number_with_format(2, 2, 45721.604166666664, &date_time).unwrap();
        reviews.write_boolean(2, 3, false).unwrap();
        reviews.write_number(3, 0, 1.0).unwrap();
        reviews.write_string(3, 1, "별로예요").unwrap();
        reviews.write_string(3, 2, "2025-03-06").unwrap();

        let other = workbook.add_worksheet();
        other.set_name("요약").unwrap();
        other.write_string(0, 0, "평점").unwrap();
        other.write_string(0, 1, "리뷰상세내용").unwrap();
        other.write_number(1, 0, 4.0).unwrap();
        other.write_string(1, 1, "다른 시트의 리뷰").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_typed_cells_from_the_first_worksheet() {
        let bytes = two_sheet_workbook();
        let rows = read_rows("reviews.xlsx", &bytes).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("평점"), Some(&CellValue::Number(5.0)));
        assert_eq!(rows[0].get("리뷰상세내용"), Some(&text("배송이 빨라요")));
        assert_eq!(rows[0].get("작성일"), Some(&text("2025-03-04")));
        assert_eq!(rows[0].get("추천"), Some(&CellValue::Bool(true)));
        assert_eq!(rows[1].get("작성일"), Some(&text("2025-03-05 14:30:00")));
        assert_eq!(rows[1].get("추천"), Some(&CellValue::Bool(false)));
        assert_eq!(rows[2].get("작성일"), Some(&text("2025-03-06")));
        assert!(rows.iter().all(|row| row.get("리뷰상세내용") != Some(&text("다른 시트의 리뷰"))));
    }

    #[test]
    fn workbook_reviews_keep_their_row_positions() {
        let bytes = two_sheet_workbook();
        let records = crate::review_data_manager::load_reviews("reviews.xlsx", &bytes).unwrap();

        let ids: Vec<usize> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(records[0].rating, 5.0);
        assert_eq!(records[0].date, "2025-03-04");
        assert_eq!(records[1].content, "별로예요");
    }

    #[test]
    fn corrupt_workbook_is_a_parse_error() {
        let err = read_rows("reviews.xlsx", b"PK\x03\x04definitely not a zip archive").unwrap_err();
        assert!(matches!(err, ReviewInsightError::Parse(_)));
    }

    #[test]
    fn cell_coercions_follow_spreadsheet_semantics() {
        assert_eq!(text(" 4.5 ").to_number(), 4.5);
        assert_eq!(text("  ").to_number(), 0.0);
        assert!(text("다섯").to_number().is_nan());
        assert_eq!(CellValue::Bool(true).to_number(), 1.0);
        assert_eq!(CellValue::Number(5.0).to_text(), "5");
        assert_eq!(CellValue::Number(4.25).to_text(), "4.25");
        assert!(CellValue::Number(0.0).is_present());
        assert!(!text("").is_present());
    }
}
