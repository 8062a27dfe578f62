use crate::error::{Result, SlideError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const SLIDES_DIR: &str = "slides";

/// How the store measures current disk usage for quota checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaAccounting {
    /// Sum of the sizes of every file in the slides directory.
    #[default]
    Aggregate,
    /// Size reported by the slides directory's own metadata. Older deployments
    /// measured this; it does not follow the bytes actually stored.
    DirectoryEntry,
}

#[derive(Debug, Clone)]
pub struct PutBlobResult {
    pub blob_path: PathBuf,
    pub size_bytes: u64,
    pub replaced: bool,
}

#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

impl BlobEntry {
    /// Time elapsed since the last write. Timestamps in the future count as zero.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.modified).max(chrono::Duration::zero())
    }
}

/// ContentStore keeps blobs as flat files named by content key:
/// `{storage_root}/slides/{key}`.
pub struct ContentStore {
    slides_dir: PathBuf,
    accounting: QuotaAccounting,
    // held across usage measurement and write
    write_lock: Mutex<()>,
}

impl ContentStore {
    pub fn new(storage_root: &Path, accounting: QuotaAccounting) -> Result<Self> {
        let slides_dir = storage_root.join(SLIDES_DIR);
        std::fs::create_dir_all(&slides_dir)?;
        Ok(Self {
            slides_dir,
            accounting,
            write_lock: Mutex::new(()),
        })
    }

    pub fn slides_dir(&self) -> &Path {
        &self.slides_dir
    }

    /// Path of the blob stored under `key`, or `None` when the key is not a
    /// plain file name.
    pub fn blob_path(&self, key: &str) -> Option<PathBuf> {
        sanitize_key(key).map(|key| self.slides_dir.join(key))
    }

    /// Store `data` under `key`.
    ///
    /// Writing an existing key rewrites the file, which refreshes its
    /// modification time and so extends its lifetime.
    pub async fn put(
        &self,
        key: &str,
        data: Bytes,
        max_size: u64,
        max_quota: u64,
    ) -> Result<PutBlobResult> {
        let size_bytes = data.len() as u64;
        if size_bytes > max_size {
            return Err(SlideError::SizeExceeded {
                max: max_size,
                actual: size_bytes,
            });
        }

        let key = sanitize_key(key)
            .ok_or_else(|| SlideError::Validation(format!("invalid content key: {:?}", key)))?;
        let blob_path = self.slides_dir.join(key);

        let _guard = self.write_lock.lock().await;

        let used = self.usage().await?;
        if used.saturating_add(size_bytes) > max_quota {
            tracing::warn!(
                "disk quota exceeded: {} + {} > {}",
                used,
                size_bytes,
                max_quota
            );
            return Err(SlideError::QuotaExceeded {
                used,
                incoming: size_bytes,
                quota: max_quota,
            });
        }

        let replaced = match fs::try_exists(&blob_path).await {
            Ok(exists) => exists,
            Err(error) => {
                tracing::debug!("Could not check {}: {}", blob_path.display(), error);
                false
            }
        };

        let tmp_path = self
            .slides_dir
            .join(format!(".{}.{}.tmp", key, ulid::Ulid::new()));
        if let Err(error) = write_file(&tmp_path, &data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(error.into());
        }
        if let Err(error) = fs::rename(&tmp_path, &blob_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(error.into());
        }

        tracing::debug!(
            "Stored blob {} ({} bytes, replaced={})",
            key,
            size_bytes,
            replaced
        );

        Ok(PutBlobResult {
            blob_path,
            size_bytes,
            replaced,
        })
    }

    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let Some(blob_path) = self.blob_path(key) else {
            return Err(SlideError::NotFound(key.to_string()));
        };

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                Err(SlideError::NotFound(key.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// List every regular file in the slides directory, sorted by key.
    ///
    /// Leftover temporary files are included so that the sweeper reclaims
    /// them. Entries that disappear while listing are skipped.
    pub async fn list(&self) -> Result<Vec<BlobEntry>> {
        let mut dir = fs::read_dir(&self.slides_dir).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(error) => {
                    tracing::debug!("Skipping {}: {}", path.display(), error);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(error) => {
                    tracing::debug!("No modification time for {}: {}", path.display(), error);
                    continue;
                }
            };

            entries.push(BlobEntry {
                key: entry.file_name().to_string_lossy().into_owned(),
                path,
                size_bytes: metadata.len(),
                modified,
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    pub async fn usage(&self) -> Result<u64> {
        match self.accounting {
            QuotaAccounting::Aggregate => {
                Ok(self.list().await?.iter().map(|entry| entry.size_bytes).sum())
            }
            QuotaAccounting::DirectoryEntry => Ok(fs::metadata(&self.slides_dir).await?.len()),
        }
    }

    /// Delete a listed entry. An entry that is already gone counts as removed.
    pub(crate) async fn remove(&self, entry: &BlobEntry) -> Result<()> {
        match fs::remove_file(&entry.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

/// Accept `raw` as a content key only when it names a single plain file.
/// Keys are never normalized: padding or embedded whitespace is rejected.
pub fn sanitize_key(raw: &str) -> Option<&str> {
    if raw.is_empty()
        || raw.starts_with('.')
        || raw.contains(|c: char| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\'))
    {
        return None;
    }
    Some(raw)
}
