//! Iosans Artifact
//!
//! Binary blob storage for workflow nodes. Executors that produce audio,
//! images, or large JSON persist the bytes here and pass
//! `{artifactId, type}` references through the graph instead of inlining
//! payloads.
//!
//! The [`ArtifactStore`] trait is the backend seam; [`MemoryStore`] is the
//! in-tree implementation (a map plus a metadata index with category and
//! creation-time ordering). Artifacts are created by executors, never
//! mutated, deleted only explicitly, and outlive a single run.

mod memory;
mod mime;

pub use memory::MemoryStore;
pub use mime::detect_mime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type for artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
  /// The input blob was rejected before storage.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The backend failed to store or load a blob.
  #[error("storage failure: {0}")]
  Storage(String),
}

/// Metadata for a stored artifact. Returned by `list`; blobs stay in the
/// backend until fetched by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
  pub id: String,
  pub mime_type: String,
  pub category: String,
  pub size: usize,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A stored artifact: metadata plus the blob itself.
#[derive(Debug, Clone)]
pub struct Artifact {
  pub meta: ArtifactMeta,
  pub blob: Bytes,
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
  pub count: usize,
  pub total_size: usize,
}

/// Artifact storage trait.
///
/// Implementations provide the actual backend; public operations are
/// linearizable under concurrent use.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
  /// Store a blob under a fresh uuid and return the id.
  ///
  /// `mime_hint` may be a declared MIME type or a filename whose extension
  /// maps to one; MIME detection order is: trusted specific hint, magic
  /// bytes, extension mapping, `application/octet-stream`.
  async fn save(
    &self,
    blob: Bytes,
    category: &str,
    mime_hint: Option<&str>,
  ) -> Result<String, ArtifactError>;

  /// Fetch an artifact by id.
  async fn get(&self, id: &str) -> Result<Option<Artifact>, ArtifactError>;

  /// Delete an artifact by id. Returns false if absent.
  async fn delete(&self, id: &str) -> Result<bool, ArtifactError>;

  /// List metadata, newest first, optionally filtered by category.
  async fn list(&self, category: Option<&str>) -> Result<Vec<ArtifactMeta>, ArtifactError>;

  /// Count and total size of all stored artifacts.
  async fn stats(&self) -> Result<StoreStats, ArtifactError>;

  /// Remove every artifact.
  async fn clear_all(&self) -> Result<(), ArtifactError>;
}
