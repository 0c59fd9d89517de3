//! 安老院意外報告AI分析・紀錄管理
//!
//! 報告書の写真を Gemini で構造化し、確認・修正した結果をローカルに保存して
//! CSV・クリップボードへ出力する。

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod review;
pub mod staging;
pub mod store;
