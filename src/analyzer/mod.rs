//! 意外報告の抽出
//!
//! 写真（1〜2枚）を推論サービスへ送り、10項目の抽出結果を得る。
//! 実装は `Extractor` トレイトの背後に置き、コントローラからは差し替え可能。

mod gemini;

pub use gemini::GeminiClient;

use crate::staging::{StagedImage, MAX_PAGES};
use async_trait::async_trait;
use safety_lens_common::ReportFields;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// 抽出エラー
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("圖片數量必須為1至2張（目前 {0} 張）")]
    InvalidImageCount(usize),

    #[error("API呼叫錯誤: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API回應錯誤 (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    #[error("API回應為空")]
    EmptyResponse,

    #[error("API回應解析失敗: {0}")]
    Malformed(String),

    #[error("分析逾時（{0:?}）")]
    Timeout(Duration),

    #[error("分析已取消")]
    Cancelled,
}

impl From<safety_lens_common::Error> for ExtractionError {
    fn from(err: safety_lens_common::Error) -> Self {
        ExtractionError::Malformed(err.to_string())
    }
}

/// 抽出器
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn analyze(&self, images: &[StagedImage]) -> Result<ReportFields, ExtractionError>;
}

/// 送信枚数を検証（1〜2枚）
pub fn validate_image_count(images: &[StagedImage]) -> Result<(), ExtractionError> {
    if images.is_empty() || images.len() > MAX_PAGES {
        return Err(ExtractionError::InvalidImageCount(images.len()));
    }
    Ok(())
}

/// タイムアウトと取消を付けて抽出を実行
///
/// `cancel` が先に完了した場合は `Cancelled`、`timeout` を超えた場合は `Timeout`。
pub async fn analyze_with_deadline<E, C>(
    extractor: &E,
    images: &[StagedImage],
    timeout: Duration,
    cancel: C,
) -> Result<ReportFields, ExtractionError>
where
    E: Extractor + ?Sized,
    C: Future<Output = ()>,
{
    tokio::select! {
        result = tokio::time::timeout(timeout, extractor.analyze(images)) => {
            result.unwrap_or(Err(ExtractionError::Timeout(timeout)))
        }
        _ = cancel => Err(ExtractionError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowExtractor;

    #[async_trait]
    impl Extractor for SlowExtractor {
        async fn analyze(&self, _images: &[StagedImage]) -> Result<ReportFields, ExtractionError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ReportFields::default())
        }
    }

    struct InstantExtractor;

    #[async_trait]
    impl Extractor for InstantExtractor {
        async fn analyze(&self, images: &[StagedImage]) -> Result<ReportFields, ExtractionError> {
            validate_image_count(images)?;
            Ok(ReportFields {
                resident_name: "陳大文".into(),
                ..Default::default()
            })
        }
    }

    fn page() -> StagedImage {
        StagedImage::new("p1.jpg", "image/jpeg", vec![0xFF, 0xD8])
    }

    #[test]
    fn test_validate_image_count() {
        assert!(matches!(validate_image_count(&[]), Err(ExtractionError::InvalidImageCount(0))));
        assert!(validate_image_count(&[page()]).is_ok());
        assert!(validate_image_count(&[page(), page()]).is_ok());
        assert!(matches!(
            validate_image_count(&[page(), page(), page()]),
            Err(ExtractionError::InvalidImageCount(3))
        ));
    }

    #[tokio::test]
    async fn test_deadline_success() {
        let result = analyze_with_deadline(
            &InstantExtractor,
            &[page()],
            Duration::from_secs(5),
            std::future::pending(),
        )
        .await
        .unwrap();
        assert_eq!(result.resident_name, "陳大文");
    }

    #[tokio::test]
    async fn test_deadline_timeout() {
        let result = analyze_with_deadline(
            &SlowExtractor,
            &[page()],
            Duration::from_millis(20),
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(ExtractionError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_deadline_cancel() {
        let result = analyze_with_deadline(
            &SlowExtractor,
            &[page()],
            Duration::from_secs(5),
            tokio::time::sleep(Duration::from_millis(10)),
        )
        .await;
        assert!(matches!(result, Err(ExtractionError::Cancelled)));
    }
}
