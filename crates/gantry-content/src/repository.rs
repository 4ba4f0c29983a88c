//! Content repositories

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::debug;

use crate::error::{ContentError, Result};
use crate::hash::ContentHash;

/// Store of deployment content blobs, addressed by hash.
///
/// Content is immutable: a hash either resolves to the exact bytes it was
/// computed from, or to nothing.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Store a blob and return its hash. Storing bytes that are already
    /// present is a no-op.
    async fn add_content(&self, bytes: Vec<u8>) -> Result<ContentHash>;

    /// Whether content for `hash` is present.
    async fn has_content(&self, hash: &ContentHash) -> bool;

    /// Path of the stored blob for `hash`.
    async fn content_path(&self, hash: &ContentHash) -> Result<PathBuf>;

    /// Drop the blob for `hash`. Removing absent content is a no-op.
    async fn remove_content(&self, hash: &ContentHash) -> Result<()>;
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem-backed repository.
///
/// Blobs live at `<root>/<first 2 hex chars>/<remaining 62 chars>/content`,
/// fanned out by hash prefix so no single directory grows unbounded.
pub struct FsContentRepository {
    root: PathBuf,
}

impl FsContentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn content_dir(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.to_string();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.content_dir(hash).join("content")
    }
}

#[async_trait]
impl ContentRepository for FsContentRepository {
    async fn add_content(&self, bytes: Vec<u8>) -> Result<ContentHash> {
        let hash = ContentHash::of(&bytes);
        let path = self.blob_path(&hash);
        if fs::try_exists(&path).await? {
            return Ok(hash);
        }
        let dir = self.content_dir(&hash);
        fs::create_dir_all(&dir).await?;
        // write to a unique sibling and rename, so a crash mid-write never
        // leaves a partial blob at the final path
        let tmp = dir.join(format!(
            "content.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        debug!(hash = %hash, len = bytes.len(), "Stored deployment content");
        Ok(hash)
    }

    async fn has_content(&self, hash: &ContentHash) -> bool {
        fs::try_exists(self.blob_path(hash)).await.unwrap_or(false)
    }

    async fn content_path(&self, hash: &ContentHash) -> Result<PathBuf> {
        let path = self.blob_path(hash);
        if !fs::try_exists(&path).await? {
            return Err(ContentError::MissingContent(*hash));
        }
        Ok(path)
    }

    async fn remove_content(&self, hash: &ContentHash) -> Result<()> {
        match fs::remove_dir_all(self.content_dir(hash)).await {
            Ok(()) => {
                debug!(hash = %hash, "Removed deployment content");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
