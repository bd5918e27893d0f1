//! File-backed stroke lists, one JSON array per room under `<data_dir>/strokes/`.

use std::path::Path;

use async_trait::async_trait;
use rakugaki_shared::stroke::Stroke;

use super::store::JsonFileStore;
use crate::domain::{RepositoryError, RoomId, StrokeRepository};

pub struct FileStrokeRepository {
    store: JsonFileStore,
}

impl FileStrokeRepository {
    pub async fn open(data_dir: &Path) -> Result<Self, RepositoryError> {
        Ok(Self {
            store: JsonFileStore::open(data_dir.join("strokes")).await?,
        })
    }
}

#[async_trait]
impl StrokeRepository for FileStrokeRepository {
    async fn load(&self, id: &RoomId) -> Result<Vec<Stroke>, RepositoryError> {
        Ok(self
            .store
            .read::<Vec<Stroke>>(id.as_str())
            .await?
            .unwrap_or_default())
    }

    async fn save(
        &self,
        id: &RoomId,
        revision: u64,
        strokes: &[Stroke],
    ) -> Result<bool, RepositoryError> {
        self.store
            .write_revision(id.as_str(), revision, &strokes)
            .await
    }

    async fn delete(&self, id: &RoomId) -> Result<(), RepositoryError> {
        self.store.remove(id.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomIdFactory;
    use rakugaki_shared::stroke::{Point, Shape, StrokeStyle};

    fn line(id: &str) -> Stroke {
        Stroke::new(
            id.to_string(),
            "alice".to_string(),
            StrokeStyle::default(),
            Shape::Line {
                start: Point { x: 0.0, y: 0.0 },
                end: Point { x: 10.0, y: 10.0 },
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_room_loads_empty() {
        // テスト項目: 保存されていないルームは空のストロークリストになる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let repo = FileStrokeRepository::open(dir.path()).await.unwrap();

        // when (操作):
        let strokes = repo.load(&RoomIdFactory::generate()).await.unwrap();

        // then (期待する結果):
        assert!(strokes.is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_whole_list() {
        // テスト項目: 保存はリスト全体を置き換え、再オープン後も読み出せる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let repo = FileStrokeRepository::open(dir.path()).await.unwrap();
        let room_id = RoomIdFactory::generate();
        repo.save(&room_id, 1, &[line("s1"), line("s2")]).await.unwrap();

        // when (操作):
        repo.save(&room_id, 2, &[line("s2")]).await.unwrap();
        drop(repo);
        let reopened = FileStrokeRepository::open(dir.path()).await.unwrap();

        // then (期待する結果):
        assert_eq!(reopened.load(&room_id).await.unwrap(), vec![line("s2")]);
    }

    #[tokio::test]
    async fn test_out_of_order_save_keeps_newest() {
        // テスト項目: 古いリビジョンの保存が後から届いても新しい内容が残る
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let repo = FileStrokeRepository::open(dir.path()).await.unwrap();
        let room_id = RoomIdFactory::generate();

        // when (操作):
        let newer = repo.save(&room_id, 7, &[line("s1"), line("s2")]).await.unwrap();
        let older = repo.save(&room_id, 6, &[line("s1")]).await.unwrap();

        // then (期待する結果):
        assert!(newer);
        assert!(!older);
        assert_eq!(repo.load(&room_id).await.unwrap().len(), 2);
    }
}
