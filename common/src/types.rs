//! 意外報告の型定義
//!
//! CLIと将来のフロントエンドで共有される型:
//! - ReportFields: AI抽出結果（ID・作成日時なし）
//! - IncidentReport: 永続化される意外報告（ID・作成日時付き）
//! - Answer: 「有/沒有」の二択回答
//! - ReportField: 編集・出力対象の10項目

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// 「有/沒有」回答
///
/// ユーザー編集で設定できるのは `Yes` / `No` のみ。
/// AIの出力や保存データにそれ以外の値があれば `Other` として原文のまま保持し、
/// 欠損（キーなし・null・空文字）は `Unset`（出力は空文字）。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Answer {
    Yes,
    No,
    NotApplicable,
    #[default]
    Unset,
    Other(String),
}

impl Answer {
    pub const YES: &'static str = "有";
    pub const NO: &'static str = "沒有";
    pub const NOT_APPLICABLE: &'static str = "不適用";

    pub fn as_str(&self) -> &str {
        match self {
            Answer::Yes => Self::YES,
            Answer::No => Self::NO,
            Answer::NotApplicable => Self::NOT_APPLICABLE,
            Answer::Unset => "",
            Answer::Other(value) => value,
        }
    }

    /// ユーザー入力を解釈（「有」「沒有」のみ受理）
    pub fn from_user_input(input: &str) -> Option<Self> {
        match input.trim() {
            Self::YES => Some(Answer::Yes),
            Self::NO => Some(Answer::No),
            _ => None,
        }
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        match value.trim() {
            Self::YES => return Answer::Yes,
            Self::NO => return Answer::No,
            Self::NOT_APPLICABLE => return Answer::NotApplicable,
            "" => return Answer::Unset,
            _ => {}
        }
        Answer::Other(value)
    }
}

impl From<Option<String>> for Answer {
    fn from(value: Option<String>) -> Self {
        value.map(Answer::from).unwrap_or_default()
    }
}

impl From<Answer> for String {
    fn from(value: Answer) -> Self {
        match value {
            Answer::Other(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// null を空文字として読む（旧データ・AI出力の欠損対策）
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// AI抽出結果（10項目）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFields {
    #[serde(deserialize_with = "null_as_empty")]
    pub resident_name: String,        // 住客姓名
    #[serde(deserialize_with = "null_as_empty")]
    pub incident_date: String,        // YYYY-MM-DD
    #[serde(deserialize_with = "null_as_empty")]
    pub incident_time: String,        // HH:mm
    #[serde(deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub description: String,          // 事發經過
    pub has_injury: Answer,
    #[serde(deserialize_with = "null_as_empty")]
    pub injury_details: String,
    pub hospitalization_status: Answer,
    #[serde(deserialize_with = "null_as_empty")]
    pub root_cause_analysis: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub suggested_action: String,
}

impl ReportFields {
    /// 項目の値を取得
    pub fn get(&self, field: ReportField) -> &str {
        match field {
            ReportField::ResidentName => &self.resident_name,
            ReportField::IncidentDate => &self.incident_date,
            ReportField::IncidentTime => &self.incident_time,
            ReportField::Location => &self.location,
            ReportField::HasInjury => self.has_injury.as_str(),
            ReportField::InjuryDetails => &self.injury_details,
            ReportField::HospitalizationStatus => self.hospitalization_status.as_str(),
            ReportField::Description => &self.description,
            ReportField::RootCauseAnalysis => &self.root_cause_analysis,
            ReportField::SuggestedAction => &self.suggested_action,
        }
    }

    /// 項目の値を設定
    ///
    /// 二択項目は「有」「沒有」以外を拒否する。
    pub fn set(&mut self, field: ReportField, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match field {
            ReportField::HasInjury | ReportField::HospitalizationStatus => {
                let answer = Answer::from_user_input(&value).ok_or(Error::InvalidValue {
                    field: field.label(),
                    value,
                })?;
                if field == ReportField::HasInjury {
                    self.has_injury = answer;
                } else {
                    self.hospitalization_status = answer;
                }
            }
            ReportField::ResidentName => self.resident_name = value,
            ReportField::IncidentDate => self.incident_date = value,
            ReportField::IncidentTime => self.incident_time = value,
            ReportField::Location => self.location = value,
            ReportField::InjuryDetails => self.injury_details = value,
            ReportField::Description => self.description = value,
            ReportField::RootCauseAnalysis => self.root_cause_analysis = value,
            ReportField::SuggestedAction => self.suggested_action = value,
        }
        Ok(())
    }

    /// 出力順の10項目の値
    pub fn values(&self) -> [&str; 10] {
        ReportField::ALL.map(|field| self.get(field))
    }
}

/// 永続化される意外報告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    /// 作成時に一度だけ付与される識別子
    pub id: String,
    /// 作成日時（epochミリ秒）
    pub created_at: i64,
    #[serde(flatten)]
    pub fields: ReportFields,
}

impl IncidentReport {
    /// 抽出結果にIDと作成日時を付与
    pub fn stamp(fields: ReportFields, id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            created_at,
            fields,
        }
    }
}

/// 編集・出力対象の項目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportField {
    ResidentName,
    IncidentDate,
    IncidentTime,
    Location,
    HasInjury,
    InjuryDetails,
    HospitalizationStatus,
    Description,
    RootCauseAnalysis,
    SuggestedAction,
}

impl ReportField {
    /// CSV・クリップボードの出力順
    pub const ALL: [ReportField; 10] = [
        ReportField::ResidentName,
        ReportField::IncidentDate,
        ReportField::IncidentTime,
        ReportField::Location,
        ReportField::HasInjury,
        ReportField::InjuryDetails,
        ReportField::HospitalizationStatus,
        ReportField::Description,
        ReportField::RootCauseAnalysis,
        ReportField::SuggestedAction,
    ];

    /// CSVヘッダー・画面表示用ラベル
    pub fn label(&self) -> &'static str {
        match self {
            ReportField::ResidentName => "住客姓名",
            ReportField::IncidentDate => "發生日期",
            ReportField::IncidentTime => "發生時間",
            ReportField::Location => "地點",
            ReportField::HasInjury => "有否受傷",
            ReportField::InjuryDetails => "傷勢詳情",
            ReportField::HospitalizationStatus => "有否送院",
            ReportField::Description => "事發經過",
            ReportField::RootCauseAnalysis => "原因分析",
            ReportField::SuggestedAction => "建議跟進",
        }
    }

    /// JSONキー名
    pub fn key(&self) -> &'static str {
        match self {
            ReportField::ResidentName => "residentName",
            ReportField::IncidentDate => "incidentDate",
            ReportField::IncidentTime => "incidentTime",
            ReportField::Location => "location",
            ReportField::HasInjury => "hasInjury",
            ReportField::InjuryDetails => "injuryDetails",
            ReportField::HospitalizationStatus => "hospitalizationStatus",
            ReportField::Description => "description",
            ReportField::RootCauseAnalysis => "rootCauseAnalysis",
            ReportField::SuggestedAction => "suggestedAction",
        }
    }

    /// 二択（有/沒有）項目か
    pub fn is_answer(&self) -> bool {
        matches!(self, ReportField::HasInjury | ReportField::HospitalizationStatus)
    }

    /// 複数行入力が想定される自由記述項目か
    pub fn is_long_text(&self) -> bool {
        matches!(
            self,
            ReportField::Description | ReportField::RootCauseAnalysis | ReportField::SuggestedAction
        )
    }
}

impl FromStr for ReportField {
    type Err = String;

    /// JSONキー名またはラベルから解釈
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ReportField::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(s) || f.label() == s)
            .ok_or_else(|| format!("Unknown field: {}", s))
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
