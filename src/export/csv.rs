//! CSVファイル出力

use crate::error::Result;
use chrono::{Local, NaiveDate};
use safety_lens_common::{csv_file_name, to_csv, IncidentReport};
use std::path::{Path, PathBuf};
use tracing::info;

/// 今日の日付でCSVファイルを保存
///
/// 同じ日に同じ報告を出力すると同じファイルを上書きする。
pub fn trigger_download(report: &IncidentReport, output_dir: &Path) -> Result<PathBuf> {
    write_csv(report, output_dir, Local::now().date_naive())
}

/// 指定日付のファイル名でCSVファイルを保存
pub fn write_csv(report: &IncidentReport, output_dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join(csv_file_name(&report.fields.resident_name, date));
    std::fs::write(&path, to_csv(report))?;

    info!(id = %report.id, path = %path.display(), "csv exported");
    Ok(path)
}
