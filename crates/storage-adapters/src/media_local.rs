//! # Local attachment storage
//!
//! Files land under `root` in a two-level sharded layout derived from a
//! SHA-256 digest: `ab/cd/abcd…ef.pdf`. The digest covers the ticket id, a
//! random nonce and the content, so identical uploads on different tickets
//! never share a file and removing one cannot affect the other.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use domains::{AttachmentStorage, DomainError, DomainResult, StoredFile};

use crate::error::StorageError;

const MAX_EXTENSION_LEN: usize = 10;

pub struct LocalAttachmentStorage {
    root: PathBuf,
}

impl LocalAttachmentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative storage path, always `/`-separated.
    fn sharded_path(digest: &str, extension: Option<&str>) -> String {
        let file = match extension {
            Some(ext) => format!("{digest}.{ext}"),
            None => digest.to_string(),
        };
        format!("{}/{}/{file}", &digest[0..2], &digest[2..4])
    }

    /// Resolves a stored relative path, refusing anything that would escape
    /// the root.
    fn resolve(&self, relative: &str) -> DomainResult<PathBuf> {
        let candidate = Path::new(relative);
        let safe = !relative.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(DomainError::Validation(format!("invalid attachment path '{relative}'")));
        }
        Ok(self.root.join(candidate))
    }
}

/// Keeps a short alphanumeric extension from the uploaded name.
fn extension_of(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

#[async_trait]
impl AttachmentStorage for LocalAttachmentStorage {
    async fn save(
        &self,
        ticket_id: Uuid,
        file_name: &str,
        content_type: &mime::Mime,
        data: Bytes,
    ) -> DomainResult<StoredFile> {
        let mut hasher = Sha256::new();
        hasher.update(ticket_id.as_bytes());
        hasher.update(Uuid::new_v4().as_bytes());
        hasher.update(&data);
        let digest = hex::encode(hasher.finalize());

        let relative = Self::sharded_path(&digest, extension_of(file_name).as_deref());
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(StorageError::from)?;
        }
        fs::write(&target, &data).await.map_err(StorageError::from)?;

        info!(
            %ticket_id,
            path = %relative,
            content_type = %content_type,
            size = data.len(),
            "attachment stored"
        );
        Ok(StoredFile {
            path: relative,
            size: data.len() as u64,
        })
    }

    async fn remove(&self, path: &str) -> DomainResult<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path, "attachment file removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path, "attachment file already gone");
                Ok(())
            }
            Err(err) => Err(StorageError::from(err).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> LocalAttachmentStorage {
        LocalAttachmentStorage::new(std::env::temp_dir().join(format!("helpdesk-media-{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn save_writes_sharded_file() {
        let storage = scratch();
        let stored = storage
            .save(Uuid::new_v4(), "Report.PDF", &mime::APPLICATION_PDF, Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        let parts: Vec<&str> = stored.path.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[2].starts_with(&format!("{}{}", parts[0], parts[1])));
        assert!(parts[2].ends_with(".pdf"));
        assert_eq!(stored.size, 8);

        let on_disk = fs::read(storage.root().join(&stored.path)).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.7");

        let _ = fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn identical_uploads_get_distinct_paths() {
        let storage = scratch();
        let ticket = Uuid::new_v4();
        let a = storage
            .save(ticket, "a.txt", &mime::TEXT_PLAIN, Bytes::from_static(b"same"))
            .await
            .unwrap();
        let b = storage
            .save(ticket, "a.txt", &mime::TEXT_PLAIN, Bytes::from_static(b"same"))
            .await
            .unwrap();
        assert_ne!(a.path, b.path);

        storage.remove(&a.path).await.unwrap();
        assert!(storage.root().join(&b.path).exists());
        let _ = fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn remove_tolerates_missing_files_and_rejects_escapes() {
        let storage = scratch();
        storage.remove("ab/cd/missing.txt").await.unwrap();

        for bad in ["../etc/passwd", "/etc/passwd", "", "ab/../../x"] {
            let err = storage.remove(bad).await.unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{bad}");
        }
    }

    #[test]
    fn odd_extensions_are_dropped() {
        assert_eq!(extension_of("notes.md"), Some("md".into()));
        assert_eq!(extension_of("archive.tar.GZ"), Some("gz".into()));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of("x.sh;rm"), None);
        assert_eq!(extension_of("x.averyverylongext"), None);
    }
}
