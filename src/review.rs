//! 対話式の報告確認・編集
//!
//! 抽出結果（または紀錄から開いた報告）を表示し、項目の修正・複製・
//! CSV出力を行う。修正は1項目ごとにコントローラ経由で保存される。

use crate::controller::{Controller, Event, Step};
use crate::analyzer::Extractor;
use crate::error::{Result, SafetyLensError};
use crate::export::{copy_to_clipboard, trigger_download};
use crate::store::KeyValueStore;
use chrono::{DateTime, Local};
use dialoguer::{Editor, Input, Select};
use safety_lens_common::{Answer, IncidentReport, ReportField};
use std::path::Path;

/// 確認画面の操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Edit,
    Copy,
    Download,
    NewReport,
    Done,
}

impl ReviewAction {
    pub const ALL: [ReviewAction; 5] = [
        ReviewAction::Edit,
        ReviewAction::Copy,
        ReviewAction::Download,
        ReviewAction::NewReport,
        ReviewAction::Done,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReviewAction::Edit => "修改欄位",
            ReviewAction::Copy => "複製 (Excel 格式)",
            ReviewAction::Download => "下載 CSV",
            ReviewAction::NewReport => "新報告",
            ReviewAction::Done => "完成",
        }
    }
}

/// 確認画面の終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Done,
    NewReport,
}

/// 作成日時（epochミリ秒）をローカル時刻で表示
pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// 未入力の項目は「-」で表示
fn display_value(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// 報告の全項目を「ラベル: 値」で整形
pub fn format_report_lines(report: &IncidentReport) -> Vec<String> {
    ReportField::ALL
        .iter()
        .map(|field| format!("{}: {}", field.label(), display_value(report.fields.get(*field))))
        .collect()
}

/// 紀錄一覧の1行
pub fn format_history_row(report: &IncidentReport) -> String {
    format!(
        "{}  {}  {}  {} {}  {}",
        report.id,
        format_timestamp(report.created_at),
        display_value(&report.fields.resident_name),
        display_value(&report.fields.incident_date),
        display_value(&report.fields.incident_time),
        display_value(&report.fields.location),
    )
}

/// 項目選択メニュー（長い記述は先頭だけ表示）
pub fn field_menu_items(report: &IncidentReport) -> Vec<String> {
    ReportField::ALL
        .iter()
        .map(|field| {
            let value = display_value(report.fields.get(*field));
            let preview: String = value.chars().take(20).collect();
            if preview.chars().count() < value.chars().count() {
                format!("{}: {}…", field.label(), preview)
            } else {
                format!("{}: {}", field.label(), preview)
            }
        })
        .collect()
}

pub fn print_report(report: &IncidentReport) {
    println!("📋 意外報告  (建立於 {})", format_timestamp(report.created_at));
    println!("---");
    for line in format_report_lines(report) {
        println!("  {}", line);
    }
    println!("---");
}

/// 確認・編集ループ
///
/// コントローラが Review 状態であること。
pub async fn run_review<S, E>(controller: &mut Controller<S, E>, output_dir: &Path) -> Result<ReviewOutcome>
where
    S: KeyValueStore,
    E: Extractor,
{
    loop {
        let report = current_report(controller)?;
        println!();
        print_report(&report);

        let labels: Vec<&str> = ReviewAction::ALL.iter().map(|a| a.label()).collect();
        let selected = Select::new()
            .with_prompt("請選擇操作")
            .items(&labels)
            .default(0)
            .interact()?;

        match ReviewAction::ALL[selected] {
            ReviewAction::Edit => edit_field(controller, &report).await?,
            ReviewAction::Copy => {
                if copy_to_clipboard(&report) {
                    println!("✔ 已複製！可直接貼上到 Excel");
                } else {
                    println!("✗ 複製失敗");
                }
            }
            ReviewAction::Download => {
                let path = trigger_download(&report, output_dir)?;
                println!("✔ 已下載: {}", path.display());
            }
            ReviewAction::NewReport => {
                controller.dispatch(Event::ResetRequested).await?;
                return Ok(ReviewOutcome::NewReport);
            }
            ReviewAction::Done => return Ok(ReviewOutcome::Done),
        }
    }
}

fn current_report<S, E>(controller: &Controller<S, E>) -> Result<IncidentReport>
where
    S: KeyValueStore,
    E: Extractor,
{
    let state = controller.state();
    match (&state.step, &state.current) {
        (Step::Review, Some(report)) => Ok(report.clone()),
        _ => Err(SafetyLensError::Prompt("沒有可核對的報告".into())),
    }
}

async fn edit_field<S, E>(controller: &mut Controller<S, E>, report: &IncidentReport) -> Result<()>
where
    S: KeyValueStore,
    E: Extractor,
{
    let items = field_menu_items(report);
    let index = Select::new()
        .with_prompt("修改哪個欄位？")
        .items(&items)
        .default(0)
        .interact()?;
    let field = ReportField::ALL[index];
    let current = report.fields.get(field);

    let value = if field.is_answer() {
        let options = [Answer::YES, Answer::NO];
        let default = if current == Answer::NO { 1 } else { 0 };
        let choice = Select::new()
            .with_prompt(field.label())
            .items(&options)
            .default(default)
            .interact()?;
        options[choice].to_string()
    } else if field.is_long_text() {
        match Editor::new().edit(current)? {
            Some(text) => text.trim_end().to_string(),
            None => {
                println!("  → 未修改");
                return Ok(());
            }
        }
    } else {
        Input::<String>::new()
            .with_prompt(field.label())
            .with_initial_text(current)
            .allow_empty(true)
            .interact_text()?
    };

    if value == current {
        println!("  → 未修改");
        return Ok(());
    }

    controller.dispatch(Event::FieldEdited { field, value }).await?;

    let state = controller.state();
    match &state.storage_warning {
        Some(warning) => println!("⚠ 已修改，但儲存失敗: {}", warning),
        None => println!("✔ 已儲存變更"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use safety_lens_common::ReportFields;

    fn sample() -> IncidentReport {
        IncidentReport::stamp(
            ReportFields {
                resident_name: "陳大文".into(),
                incident_date: "2024-05-01".into(),
                incident_time: "14:30".into(),
                location: "浴室".into(),
                has_injury: Answer::Yes,
                injury_details: "左手擦傷".into(),
                description: "住客於浴室滑倒，左手撐地時擦傷，職員即時協助並通知家屬。".into(),
                ..Default::default()
            },
            "0b6f1c2e-7f7a-4c2f-9a51-3f1e2b9d8c10",
            1_714_545_000_000,
        )
    }

    #[test]
    fn test_report_lines_follow_field_order() {
        let lines = format_report_lines(&sample());
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "住客姓名: 陳大文");
        assert_eq!(lines[4], "有否受傷: 有");
        assert_eq!(lines[6], "有否送院: -");
        assert_eq!(lines[8], "原因分析: -");
    }

    #[test]
    fn test_history_row() {
        let row = format_history_row(&sample());
        assert!(row.starts_with("0b6f1c2e-7f7a-4c2f-9a51-3f1e2b9d8c10"));
        assert!(row.contains("陳大文"));
        assert!(row.contains("2024-05-01 14:30"));
        assert!(row.ends_with("浴室"));
    }

    #[test]
    fn test_field_menu_truncates_long_text() {
        let items = field_menu_items(&sample());
        assert_eq!(items[3], "地點: 浴室");
        assert!(items[7].starts_with("事發經過: 住客於浴室滑倒"));
        assert!(items[7].ends_with('…'));
    }

    #[test]
    fn test_format_timestamp_out_of_range() {
        assert_eq!(format_timestamp(i64::MAX), "-");
        assert_eq!(format_timestamp(0).len(), "1970-01-01 00:00".len());
    }

    #[test]
    fn test_review_actions() {
        assert_eq!(ReviewAction::ALL.len(), 5);
        assert_eq!(ReviewAction::Done.label(), "完成");
    }
}
