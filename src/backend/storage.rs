use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::errors::BackendError;

/// Filesystem-backed object storage: one directory per bucket under `root`,
/// public URLs rooted at `public_base_url`.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` at `bucket/path`, replacing any existing object.
    pub async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let full = self.resolve(bucket, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err(bucket, path, e))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| storage_err(bucket, path, e))?;
        debug!(bucket, path, size = bytes.len(), "Stored object");
        Ok(())
    }

    pub async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, BackendError> {
        let full = self.resolve(bucket, path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|e| storage_err(bucket, path, e))
    }

    /// Remove the object at `bucket/path`. Returns `false` when it did not
    /// exist.
    pub async fn delete(&self, bucket: &str, path: &str) -> Result<bool, BackendError> {
        let full = self.resolve(bucket, path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                debug!(bucket, path, "Deleted object");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err(bucket, path, e)),
        }
    }

    /// Names of the objects at the top level of `bucket`, sorted. A bucket
    /// that was never written to is empty.
    pub async fn list(&self, bucket: &str) -> Result<Vec<String>, BackendError> {
        validate_segment(bucket)?;
        let dir = self.root.join(bucket);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err(bucket, "", e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err(bucket, "", e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| storage_err(bucket, "", e))?
                .is_file();
            if is_file && let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Stable public URL for an object. Does not check that it exists.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }

    /// Object path inside `bucket` for a public URL produced by
    /// [`ObjectStore::public_url`].
    pub fn path_from_url<'a>(&self, bucket: &str, url: &'a str) -> Option<&'a str> {
        let prefix = format!("{}/{}/", self.public_base_url, bucket);
        url.strip_prefix(prefix.as_str()).filter(|p| !p.is_empty())
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, BackendError> {
        validate_segment(bucket)?;
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(BackendError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(bucket).join(relative))
    }
}

fn validate_segment(bucket: &str) -> Result<(), BackendError> {
    let valid = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidPath(bucket.to_string()))
    }
}

fn storage_err(bucket: &str, path: &str, source: std::io::Error) -> BackendError {
    BackendError::Storage {
        bucket: bucket.to_string(),
        path: path.to_string(),
        source,
    }
}

/// File extension of an uploaded file name, lower-cased, or `"bin"`.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path(), "http://localhost:3141/storage/");
        (dir, store)
    }

    #[tokio::test]
    async fn test_upload_download_delete() {
        let (_dir, store) = store();
        store.upload("gallery", "a/b.png", b"png").await.unwrap();
        assert_eq!(store.download("gallery", "a/b.png").await.unwrap(), b"png");
        assert!(store.delete("gallery", "a/b.png").await.unwrap());
        assert!(!store.delete("gallery", "a/b.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_top_level_objects() {
        let (_dir, store) = store();
        assert!(store.list("gallery").await.unwrap().is_empty());
        store.upload("gallery", "b.png", b"b").await.unwrap();
        store.upload("gallery", "a.jpg", b"a").await.unwrap();
        store.upload("gallery", "nested/c.png", b"c").await.unwrap();
        assert_eq!(store.list("gallery").await.unwrap(), vec!["a.jpg", "b.png"]);
    }

    #[tokio::test]
    async fn test_download_missing_is_storage_error() {
        let (_dir, store) = store();
        let err = store.download("gallery", "missing.png").await.unwrap_err();
        assert!(matches!(err, BackendError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (_dir, store) = store();
        for path in ["../escape.txt", "a/../../b", "/etc/passwd", ""] {
            let err = store.upload("gallery", path, b"x").await.unwrap_err();
            assert!(matches!(err, BackendError::InvalidPath(_)), "path {path:?}");
        }
        let err = store.upload("../x", "a.txt", b"x").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidPath(_)));
    }

    #[test]
    fn test_public_url_roundtrip() {
        let (_dir, store) = store();
        let url = store.public_url("query-attachments", "contact-documents/x.pdf");
        assert_eq!(
            url,
            "http://localhost:3141/storage/query-attachments/contact-documents/x.pdf"
        );
        assert_eq!(
            store.path_from_url("query-attachments", &url),
            Some("contact-documents/x.pdf")
        );
        assert_eq!(store.path_from_url("gallery", &url), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Scan.PDF"), "pdf");
        assert_eq!(extension_of("photo.final.jpeg"), "jpeg");
        assert_eq!(extension_of("README"), "bin");
        assert_eq!(extension_of("weird.p d f"), "bin");
    }
}
