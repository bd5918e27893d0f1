//! JSON-file record store with per-key write serialization.
//!
//! Each record lives in `<dir>/<key>.json` and is replaced atomically
//! (write to a temporary file, then rename). Writes to the same key are
//! serialized by a per-key lock; different keys proceed in parallel.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Serialize, de::DeserializeOwned};
use tokio::{fs, sync::Mutex};

use crate::domain::RepositoryError;

const EXTENSION: &str = "json";

pub struct JsonFileStore {
    dir: PathBuf,
    /// Key → last revision written through `write_revision`
    locks: Mutex<HashMap<String, Arc<Mutex<u64>>>>,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        match fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;
        self.write_file(key, value).await
    }

    /// Write `value` unless a newer revision of `key` was already written.
    pub async fn write_revision<T: Serialize + Sync>(
        &self,
        key: &str,
        revision: u64,
        value: &T,
    ) -> Result<bool, RepositoryError> {
        let lock = self.key_lock(key).await;
        let mut last_revision = lock.lock().await;
        if revision < *last_revision {
            tracing::debug!(
                "Skipping stale write of '{}' (revision {} < {})",
                key,
                revision,
                *last_revision
            );
            return Ok(false);
        }
        self.write_file(key, value).await?;
        *last_revision = revision;
        Ok(true)
    }

    /// Read-modify-write `key` under its lock. Returns `false` if the record
    /// does not exist.
    pub async fn update<T, F>(&self, key: &str, apply: F) -> Result<bool, RepositoryError>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: FnOnce(&mut T) + Send,
    {
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;
        let Some(mut value) = self.read::<T>(key).await? else {
            return Ok(false);
        };
        apply(&mut value);
        self.write_file(key, &value).await?;
        Ok(true)
    }

    /// Delete `key`. Its lock entry is dropped too unless another task
    /// still holds it.
    pub async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        let lock = self.key_lock(key).await;
        let result = {
            let _guard = lock.lock().await;
            match fs::remove_file(self.path(key)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        };

        let mut locks = self.locks.lock().await;
        // One reference in the map, one here
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(key);
        }
        result
    }

    /// Keys of every record currently stored.
    pub async fn keys(&self) -> Result<Vec<String>, RepositoryError> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, EXTENSION))
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<u64>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }

    async fn write_file<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec(value)?;
        let tmp_path = self.dir.join(format!("{}.{}.tmp", key, EXTENSION));
        fs::write(&tmp_path, &bytes).await?;
        fs::rename(&tmp_path, self.path(key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (JsonFileStore, TempDir) {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = JsonFileStore::open(temp_dir.path().join("records"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_then_read() {
        // テスト項目: 書き込んだレコードを読み出せる
        // given (前提条件):
        let (store, _dir) = create_test_store().await;

        // when (操作):
        store.write("abc", &vec![1, 2, 3]).await.unwrap();
        let value: Option<Vec<i32>> = store.read("abc").await.unwrap();

        // then (期待する結果):
        assert_eq!(value, Some(vec![1, 2, 3]));
        assert_eq!(store.keys().await.unwrap(), vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_read_missing_key_is_none() {
        // テスト項目: 存在しないキーの読み出しは None になる
        // given (前提条件):
        let (store, _dir) = create_test_store().await;

        // when (操作):
        let value: Option<String> = store.read("missing").await.unwrap();

        // then (期待する結果):
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_stale_revision_is_skipped() {
        // テスト項目: 古いリビジョンの書き込みはスキップされる
        // given (前提条件):
        let (store, _dir) = create_test_store().await;
        assert!(store.write_revision("room", 5, &"newer").await.unwrap());

        // when (操作):
        let written = store.write_revision("room", 3, &"older").await.unwrap();

        // then (期待する結果):
        assert!(!written);
        let value: Option<String> = store.read("room").await.unwrap();
        assert_eq!(value.as_deref(), Some("newer"));
    }

    #[tokio::test]
    async fn test_update_missing_record_returns_false() {
        // テスト項目: 存在しないレコードの update は false を返す
        // given (前提条件):
        let (store, _dir) = create_test_store().await;

        // when (操作):
        let updated = store
            .update::<Vec<i32>, _>("missing", |v| v.push(1))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        // テスト項目: 削除は存在しないキーに対してもエラーにならない
        // given (前提条件):
        let (store, _dir) = create_test_store().await;
        store.write("abc", &1).await.unwrap();

        // when (操作):
        let first = store.remove("abc").await;
        let second = store.remove("abc").await;

        // then (期待する結果):
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_drops_key_lock() {
        // テスト項目: 削除したキーのロックはマップから取り除かれる
        // given (前提条件):
        let (store, _dir) = create_test_store().await;
        store.write("abc", &1).await.unwrap();
        store.write("def", &2).await.unwrap();

        // when (操作):
        store.remove("abc").await.unwrap();

        // then (期待する結果):
        assert_eq!(store.lock_count().await, 1);
    }
}
