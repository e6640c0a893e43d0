use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::mime::detect_mime;
use crate::{Artifact, ArtifactError, ArtifactMeta, ArtifactStore, StoreStats};

/// In-memory artifact backend.
///
/// Blobs live in a single map keyed by id; `list` walks the metadata index
/// newest-first. Suitable for a single process: artifacts survive across
/// runs but not across restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<String, Artifact>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
  async fn save(
    &self,
    blob: Bytes,
    category: &str,
    mime_hint: Option<&str>,
  ) -> Result<String, ArtifactError> {
    if blob.is_empty() {
      return Err(ArtifactError::InvalidInput("empty blob".to_string()));
    }

    let now = Utc::now();
    let id = uuid::Uuid::new_v4().to_string();
    let meta = ArtifactMeta {
      id: id.clone(),
      mime_type: detect_mime(&blob, mime_hint),
      category: category.to_string(),
      size: blob.len(),
      created_at: now,
      updated_at: now,
    };

    let mut entries = self.entries.write().await;
    entries.insert(id.clone(), Artifact { meta, blob });
    Ok(id)
  }

  async fn get(&self, id: &str) -> Result<Option<Artifact>, ArtifactError> {
    let entries = self.entries.read().await;
    Ok(entries.get(id).cloned())
  }

  async fn delete(&self, id: &str) -> Result<bool, ArtifactError> {
    let mut entries = self.entries.write().await;
    Ok(entries.remove(id).is_some())
  }

  async fn list(&self, category: Option<&str>) -> Result<Vec<ArtifactMeta>, ArtifactError> {
    let entries = self.entries.read().await;
    let mut metas: Vec<ArtifactMeta> = entries
      .values()
      .filter(|a| category.is_none_or(|c| a.meta.category == c))
      .map(|a| a.meta.clone())
      .collect();
    metas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(metas)
  }

  async fn stats(&self) -> Result<StoreStats, ArtifactError> {
    let entries = self.entries.read().await;
    Ok(StoreStats {
      count: entries.len(),
      total_size: entries.values().map(|a| a.meta.size).sum(),
    })
  }

  async fn clear_all(&self) -> Result<(), ArtifactError> {
    let mut entries = self.entries.write().await;
    entries.clear();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_save_and_get_round_trip() {
    let store = MemoryStore::new();
    let blob = Bytes::from_static(b"%PDF-1.4 content");
    let id = store.save(blob.clone(), "documents", None).await.unwrap();

    let artifact = store.get(&id).await.unwrap().expect("artifact missing");
    assert_eq!(artifact.blob, blob);
    assert_eq!(artifact.meta.mime_type, "application/pdf");
    assert_eq!(artifact.meta.category, "documents");
    assert_eq!(artifact.meta.size, blob.len());
  }

  #[tokio::test]
  async fn test_empty_blob_rejected() {
    let store = MemoryStore::new();
    let result = store.save(Bytes::new(), "documents", None).await;
    assert!(matches!(result, Err(ArtifactError::InvalidInput(_))));
  }

  #[tokio::test]
  async fn test_delete_reports_absence() {
    let store = MemoryStore::new();
    let id = store
      .save(Bytes::from_static(b"data"), "misc", None)
      .await
      .unwrap();
    assert!(store.delete(&id).await.unwrap());
    assert!(!store.delete(&id).await.unwrap());
    assert!(store.get(&id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_list_filters_by_category() {
    let store = MemoryStore::new();
    store
      .save(Bytes::from_static(b"a"), "audio", None)
      .await
      .unwrap();
    store
      .save(Bytes::from_static(b"b"), "images", None)
      .await
      .unwrap();

    let all = store.list(None).await.unwrap();
    assert_eq!(all.len(), 2);
    let audio = store.list(Some("audio")).await.unwrap();
    assert_eq!(audio.len(), 1);
    assert_eq!(audio[0].category, "audio");
  }

  #[tokio::test]
  async fn test_stats_and_clear_all() {
    let store = MemoryStore::new();
    store
      .save(Bytes::from_static(b"12345"), "misc", None)
      .await
      .unwrap();
    store
      .save(Bytes::from_static(b"123"), "misc", None)
      .await
      .unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.total_size, 8);

    store.clear_all().await.unwrap();
    assert_eq!(store.stats().await.unwrap().count, 0);
  }
}
