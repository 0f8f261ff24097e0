use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Resumes,
    CompanyDocuments,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Resumes => "resumes",
            Bucket::CompanyDocuments => "company-documents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key within the bucket.
    pub key: String,
    pub public_url: String,
}

/// Local object storage: one directory per bucket under `root`.
pub struct ObjectStorage {
    root: PathBuf,
}

impl ObjectStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn upload(&self, bucket: Bucket, source: &Path) -> Result<StoredObject> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Validation(format!("not a file: {}", source.display())))?;
        let bytes = std::fs::read(source)?;
        self.put(bucket, file_name, &bytes)
    }

    pub fn put(&self, bucket: Bucket, file_name: &str, bytes: &[u8]) -> Result<StoredObject> {
        let dir = self.root.join(bucket.name());
        std::fs::create_dir_all(&dir)?;

        let key = format!("{}-{}", Utc::now().timestamp_millis(), sanitize(file_name));
        std::fs::write(dir.join(&key), bytes)?;
        info!(bucket = bucket.name(), %key, size = bytes.len(), "stored object");

        Ok(StoredObject {
            public_url: self.public_url(bucket, &key),
            key,
        })
    }

    pub fn path_of(&self, bucket: Bucket, key: &str) -> PathBuf {
        self.root.join(bucket.name()).join(key)
    }

    pub fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("file://{}", self.path_of(bucket, key).display())
    }

    pub fn read(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.path_of(bucket, key))?)
    }

    pub fn remove(&self, bucket: Bucket, key: &str) -> Result<()> {
        let path = self.path_of(bucket, key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ObjectStorage::new(dir.path());

        let stored = storage.put(Bucket::Resumes, "Casey Jones CV.pdf", b"%PDF").unwrap();
        assert!(stored.key.ends_with("Casey_Jones_CV.pdf"));
        assert!(stored.public_url.starts_with("file://"));
        assert!(stored.public_url.contains("/resumes/"));
        assert_eq!(storage.read(Bucket::Resumes, &stored.key).unwrap(), b"%PDF");

        storage.remove(Bucket::Resumes, &stored.key).unwrap();
        assert!(storage.read(Bucket::Resumes, &stored.key).is_err());
    }

    #[test]
    fn test_upload_copies_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("handbook.docx");
        std::fs::write(&source, b"zip bytes").unwrap();

        let storage = ObjectStorage::new(&dir.path().join("store"));
        let stored = storage.upload(Bucket::CompanyDocuments, &source).unwrap();
        assert_eq!(
            storage.read(Bucket::CompanyDocuments, &stored.key).unwrap(),
            b"zip bytes"
        );
    }
}
