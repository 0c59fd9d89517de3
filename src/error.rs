use thiserror::Error;

use crate::analyzer::ExtractionError;
use crate::controller::TransitionError;
use crate::store::PersistenceError;

#[derive(Error, Debug)]
pub enum SafetyLensError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("API金鑰未設定。請使用 `safety-lens config --set-api-key YOUR_KEY` 或設定環境變數 GEMINI_API_KEY")]
    MissingApiKey,

    #[error("找不到檔案: {0}")]
    FileNotFound(String),

    #[error("圖片讀取錯誤: {0}")]
    ImageLoad(String),

    #[error("找不到報告: {0}")]
    ReportNotFound(String),

    #[error("{0}")]
    AnalysisFailed(String),

    #[error("紀錄儲存失敗: {0}")]
    Storage(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Common(#[from] safety_lens_common::Error),

    #[error("JSON解析錯誤: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("輸入錯誤: {0}")]
    Prompt(String),
}

impl From<dialoguer::Error> for SafetyLensError {
    fn from(err: dialoguer::Error) -> Self {
        SafetyLensError::Prompt(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SafetyLensError>;
