//! CSV・クリップボード出力（共通ライブラリ）
//!
//! 副作用なしの文字列変換のみ。ファイル保存とクリップボード書き込みはCLI側。

use crate::types::{IncidentReport, ReportField};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

/// UTF-8 BOM（表計算ソフトの文字コード判定用）
pub const CSV_BOM: char = '\u{FEFF}';

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref INVALID_FILE_NAME_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|\x00-\x1F]"#).expect("valid regex");
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// CSVテキストを生成（BOM + ヘッダー行 + データ1行）
pub fn to_csv(report: &IncidentReport) -> String {
    let header = ReportField::ALL
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(",");

    let row = report
        .fields
        .values()
        .iter()
        .map(|v| quote(v))
        .collect::<Vec<_>>()
        .join(",");

    format!("{}{}\n{}", CSV_BOM, header, row)
}

/// クリップボード用テキストを生成（タブ区切り、ヘッダーなし）
///
/// 値に含まれるタブはエスケープしない。
pub fn to_clipboard_text(report: &IncidentReport) -> String {
    report.fields.values().join("\t")
}

/// CSVファイル名を生成
///
/// `意外報告_<住客姓名(空白・使用不可文字→_)>_<YYYY-MM-DD>.csv`
pub fn csv_file_name(resident_name: &str, date: NaiveDate) -> String {
    // パス区切りやファイル名に使えない文字は「_」へ
    let name = WHITESPACE_RUN.replace_all(resident_name, "_");
    let name = INVALID_FILE_NAME_CHARS.replace_all(&name, "_");
    format!("意外報告_{}_{}.csv", name, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Answer, ReportFields};

    fn sample_report() -> IncidentReport {
        IncidentReport::stamp(
            ReportFields {
                resident_name: "陳大文".into(),
                incident_date: "2024-05-01".into(),
                incident_time: "14:30".into(),
                location: "浴室".into(),
                description: "滑倒".into(),
                has_injury: Answer::Yes,
                injury_details: "左手擦傷".into(),
                hospitalization_status: Answer::No,
                root_cause_analysis: "地滑".into(),
                suggested_action: "加裝扶手".into(),
            },
            "id-1",
            1_714_545_000_000,
        )
    }

    /// RFC4180形式の1レコードを分解
    fn parse_record(line: &str) -> Vec<String> {
        let mut values = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                ('"', _) => in_quotes = !in_quotes,
                (',', false) => values.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        values.push(current);
        values
    }

    #[test]
    fn test_csv_starts_with_bom_and_header() {
        let csv = to_csv(&sample_report());
        assert!(csv.starts_with(CSV_BOM));

        let body = csv.trim_start_matches(CSV_BOM);
        let (header, _) = body.split_once('\n').unwrap();
        assert_eq!(
            header,
            "住客姓名,發生日期,發生時間,地點,有否受傷,傷勢詳情,有否送院,事發經過,原因分析,建議跟進"
        );
    }

    #[test]
    fn test_csv_row_round_trip() {
        let report = sample_report();
        let csv = to_csv(&report);
        let (_, row) = csv.trim_start_matches(CSV_BOM).split_once('\n').unwrap();

        assert_eq!(row.lines().count(), 1);
        assert_eq!(
            parse_record(row).join(","),
            "陳大文,2024-05-01,14:30,浴室,有,左手擦傷,沒有,滑倒,地滑,加裝扶手"
        );
    }

    #[test]
    fn test_csv_escapes_quotes_and_commas() {
        let mut report = sample_report();
        report.fields.description = r#"住客說"好痛", 然後坐低"#.into();
        report.fields.suggested_action = "".into();

        let csv = to_csv(&report);
        assert!(csv.contains(r#""住客說""好痛"", 然後坐低""#));

        let (_, row) = csv.trim_start_matches(CSV_BOM).split_once('\n').unwrap();
        let values = parse_record(row);
        assert_eq!(values.len(), 10);
        assert_eq!(values[7], r#"住客說"好痛", 然後坐低"#);
        assert_eq!(values[9], "");
        assert!(row.ends_with(",\"\""));
    }

    #[test]
    fn test_clipboard_text_tab_separated() {
        let text = to_clipboard_text(&sample_report());
        assert_eq!(
            text,
            "陳大文\t2024-05-01\t14:30\t浴室\t有\t左手擦傷\t沒有\t滑倒\t地滑\t加裝扶手"
        );
        assert!(!text.ends_with('\t'));
    }

    #[test]
    fn test_clipboard_text_no_quoting() {
        let mut report = sample_report();
        report.fields.location = r#"睡房, "A"座"#.into();
        let text = to_clipboard_text(&report);
        assert_eq!(text.split('\t').nth(3), Some(r#"睡房, "A"座"#));
    }

    #[test]
    fn test_csv_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(csv_file_name("陳大文", date), "意外報告_陳大文_2024-05-02.csv");
        assert_eq!(
            csv_file_name("Chan  Tai\tMan", date),
            "意外報告_Chan_Tai_Man_2024-05-02.csv"
        );
    }

    #[test]
    fn test_csv_file_name_replaces_path_separators() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(csv_file_name("陳/大文", date), "意外報告_陳_大文_2024-05-02.csv");
        assert_eq!(csv_file_name(r"..\李:小明?", date), "意外報告_.._李_小明__2024-05-02.csv");
        assert_eq!(csv_file_name("<張*\"三\">|", date), "意外報告__張__三____2024-05-02.csv");
    }

    #[test]
    fn test_csv_row_for_missing_fields() {
        let report: IncidentReport =
            serde_json::from_str(r#"{"id":"a","createdAt":1,"residentName":"陳大文","hasInjury":null}"#).unwrap();
        let csv = to_csv(&report);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, r#""陳大文","","","","","","","","","""#);
    }
}
