use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Report storage rooted at the configured output directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested/reports"));

        storage.write_file("report.json", b"{}").await.unwrap();

        let data = tokio::fs::read(storage.full_path("report.json")).await.unwrap();
        assert_eq!(data, b"{}");
    }

    #[tokio::test]
    async fn test_write_into_a_file_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("taken"), b"x").unwrap();
        let storage = LocalStorage::new(dir.path().join("taken"));
        let result = storage.write_file("report.json", b"{}").await;
        assert!(matches!(result, Err(crate::utils::error::ScoutError::IoError(_))));
    }
}
