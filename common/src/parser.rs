//! APIレスポンスパーサー
//!
//! 推論サービスのレスポンステキストからJSONオブジェクトを抽出し、
//! 抽出結果（ReportFields）にパースする

use crate::error::{Error, Result};
use crate::types::ReportFields;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use safety_lens_common::extract_json;
///
/// let response = "{\"residentName\": \"陳大文\"}";
/// let json = extract_json(response).unwrap();
/// assert!(json.contains("residentName"));
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 抽出レスポンスをパース
///
/// # Returns
/// * `Ok(ReportFields)` - パース成功（欠落した任意項目は空文字）
/// * `Err` - 空レスポンス、JSONが見つからない、またはパース失敗
pub fn parse_extraction_response(response: &str) -> Result<ReportFields> {
    if response.trim().is_empty() {
        return Err(Error::Parse("レスポンスが空です".into()));
    }

    let json_str = extract_json(response)?;
    let fields: ReportFields = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("抽出結果 JSONパースエラー: {}", e)))?;
    Ok(fields)
}
