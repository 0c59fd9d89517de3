//! クリップボード出力
//!
//! 表計算ソフトへ貼り付けられるタブ区切りテキストを書き込む。

use safety_lens_common::{to_clipboard_text, IncidentReport};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug, Clone)]
#[error("複製到剪貼簿失敗: {message}")]
pub struct ClipboardError {
    message: String,
}

impl ClipboardError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        ClipboardError::new(err.to_string())
    }
}

/// テキストの書き込み先
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// OSのクリップボード
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        Ok(Self {
            inner: arboard::Clipboard::new()?,
        })
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner.set_text(text.to_string())?;
        Ok(())
    }
}

/// 書き込み先を指定して複製（成功で true）
pub fn copy_with(sink: &mut impl ClipboardSink, report: &IncidentReport) -> bool {
    match sink.set_text(&to_clipboard_text(report)) {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "failed to copy report");
            false
        }
    }
}

/// OSのクリップボードへ複製（成功で true）
pub fn copy_to_clipboard(report: &IncidentReport) -> bool {
    match SystemClipboard::new() {
        Ok(mut clipboard) => copy_with(&mut clipboard, report),
        Err(e) => {
            error!(error = %e, "clipboard unavailable");
            false
        }
    }
}
