//! 報告のエクスポート（ファイル保存・クリップボード）
//!
//! 文字列変換は safety_lens_common::export、ここは副作用側のみ。

pub mod csv;
pub mod clipboard;

pub use clipboard::{copy_to_clipboard, copy_with, ClipboardError, ClipboardSink, SystemClipboard};
pub use csv::{trigger_download, write_csv};
