//! 意外報告ストア
//!
//! 1つのキー（`safety_lens_history`）に報告一覧をJSONで丸ごと保存する。
//! - 新規IDは先頭に追加、既存IDはその位置で置換
//! - 読み書きの失敗は `PersistenceError` として呼び出し側へ返す
//! - 保存形式はバージョン付き。旧形式（素の配列）は open 時に一度だけ移行

mod kv;

pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use safety_lens_common::IncidentReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info};

/// 報告一覧を保存するキー
pub const STORAGE_KEY: &str = "safety_lens_history";

/// 永続化エラー
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("讀取紀錄失敗 ({key}): {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("寫入紀錄失敗 ({key}): {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("紀錄資料損壞 ({key}): {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("不支援的紀錄版本: {found} (支援至 {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// 保存ドキュメント
#[derive(Debug, Serialize, Deserialize)]
struct StoredHistory {
    version: u32,
    reports: Vec<IncidentReport>,
}

/// ファイル保存のストア
pub type FileReportStore = ReportStore<FileKeyValueStore>;

pub struct ReportStore<S> {
    kv: S,
    /// 読み込み→変更→書き込みを直列化
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> ReportStore<S> {
    /// 現在の保存形式バージョン（0 = 旧形式の素の配列）
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(kv: S) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// ストアを開き、必要なら保存形式を移行
    pub fn open(kv: S) -> Result<Self, PersistenceError> {
        let store = Self::new(kv);
        store.migrate()?;
        Ok(store)
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// 旧形式を現行形式へ書き換え（移行した場合 true）
    pub fn migrate(&self) -> Result<bool, PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (version, reports) = self.read()?;
        if version == Self::CURRENT_VERSION {
            return Ok(false);
        }

        info!(from = version, to = Self::CURRENT_VERSION, count = reports.len(), "migrating report history");
        self.write(&reports)?;
        Ok(true)
    }

    /// 全件を保存順で取得
    pub fn load_all(&self) -> Result<Vec<IncidentReport>, PersistenceError> {
        self.read().map(|(_, reports)| reports).map_err(|e| {
            error!(error = %e, "failed to load reports");
            e
        })
    }

    /// IDで1件取得
    pub fn get(&self, id: &str) -> Result<Option<IncidentReport>, PersistenceError> {
        Ok(self.load_all()?.into_iter().find(|r| r.id == id))
    }

    /// 追加または置換
    ///
    /// 既存IDは同じ位置で置換、新規IDは先頭に追加。保存後の全件を返す。
    pub fn upsert(&self, report: IncidentReport) -> Result<Vec<IncidentReport>, PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (_, mut reports) = self.read()?;

        match reports.iter().position(|r| r.id == report.id) {
            Some(index) => {
                debug!(id = %report.id, index, "replacing report");
                reports[index] = report;
            }
            None => {
                debug!(id = %report.id, "inserting report");
                reports.insert(0, report);
            }
        }

        self.write(&reports).map_err(|e| {
            error!(error = %e, "failed to save report");
            e
        })?;
        Ok(reports)
    }

    /// IDで削除
    ///
    /// 該当IDがなければ書き込みせずに現状の一覧を返す。
    pub fn delete_by_id(&self, id: &str) -> Result<Vec<IncidentReport>, PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (_, mut reports) = self.read()?;

        let before = reports.len();
        reports.retain(|r| r.id != id);
        if reports.len() == before {
            debug!(id, "delete requested for unknown report");
            return Ok(reports);
        }

        self.write(&reports).map_err(|e| {
            error!(error = %e, "failed to delete report");
            e
        })?;
        info!(id, remaining = reports.len(), "report deleted");
        Ok(reports)
    }

    fn read(&self) -> Result<(u32, Vec<IncidentReport>), PersistenceError> {
        let Some(content) = self.kv.get(STORAGE_KEY)? else {
            return Ok((Self::CURRENT_VERSION, Vec::new()));
        };

        let corrupt = |source| PersistenceError::Corrupt {
            key: STORAGE_KEY.to_string(),
            source,
        };

        let value: Value = serde_json::from_str(&content).map_err(corrupt)?;
        if value.is_array() {
            let reports: Vec<IncidentReport> = serde_json::from_value(value).map_err(corrupt)?;
            return Ok((0, reports));
        }

        let stored: StoredHistory = serde_json::from_value(value).map_err(corrupt)?;
        if stored.version > Self::CURRENT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: stored.version,
                supported: Self::CURRENT_VERSION,
            });
        }
        Ok((stored.version, stored.reports))
    }

    fn write(&self, reports: &[IncidentReport]) -> Result<(), PersistenceError> {
        let document = serde_json::json!({
            "version": Self::CURRENT_VERSION,
            "reports": reports,
        });
        let content = serde_json::to_string(&document).map_err(|source| PersistenceError::Corrupt {
            key: STORAGE_KEY.to_string(),
            source,
        })?;
        self.kv.set(STORAGE_KEY, &content)
    }
}

impl FileReportStore {
    /// ディレクトリ配下のファイルストアを開く
    pub fn open_in(dir: &Path) -> Result<Self, PersistenceError> {
        Self::open(FileKeyValueStore::new(dir))
    }
}
