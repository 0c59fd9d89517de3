//! 名前空間付きキー・バリュー永続化
//!
//! - FileKeyValueStore: キーごとに `<dir>/<key>.json` へ保存（一時ファイル経由で置換）
//! - MemoryKeyValueStore: プロセス内のみ（テスト・一時利用）

use super::PersistenceError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// キー・バリュー永続化ポート
pub trait KeyValueStore: Send + Sync {
    /// 値を取得（キーが存在しなければ `None`）
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// 値を丸ごと書き込み
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// ファイルベースの実装
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// キーに対応するファイルパス
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| PersistenceError::Read {
                key: key.to_string(),
                source,
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;

        // 書き込み途中で中断しても既存ファイルが壊れないよう一時ファイルから置換
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, value).map_err(write_err)?;
        if let Err(source) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(write_err(source));
        }
        Ok(())
    }
}

/// メモリ上の実装
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let kv = MemoryKeyValueStore::new();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.set("k", "v1").unwrap();
        kv.set("k", "v2").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(dir.path());
        assert_eq!(kv.get("absent").unwrap(), None);
    }

    #[test]
    fn test_file_store_creates_dir_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(dir.path().join("nested"));

        kv.set("history", "[]").unwrap();

        assert_eq!(kv.get("history").unwrap().as_deref(), Some("[]"));
        assert!(kv.path_for("history").exists());
        assert!(!kv.path_for("history").with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_removes_temp_when_rename_fails() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(dir.path());
        // 置換先が空でないディレクトリだと rename は失敗する
        let target = kv.path_for("history");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let err = kv.set("history", "[]").unwrap_err();

        assert!(matches!(err, PersistenceError::Write { ref key, .. } if key == "history"));
        assert!(!target.with_extension("json.tmp").exists());
        assert!(target.is_dir());
    }
}
