use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    /// Writes next to the target and renames, so readers never see a
    /// half-written file.
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = temporary_path(&full_path);
        fs::write(&tmp_path, data)?;
        if let Err(e) = fs::rename(&tmp_path, &full_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

fn temporary_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .write_file("out/payments_generated.csv", b"a,b\n1,2\n")
            .await
            .unwrap();

        let data = storage.read_file("out/payments_generated.csv").await.unwrap();
        assert_eq!(data, b"a,b\n1,2\n");
        assert!(!dir.path().join("out/payments_generated.csv.partial").exists());
    }

    #[tokio::test]
    async fn test_absolute_paths_ignore_base() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("abs.csv");
        let storage = LocalStorage::default();

        storage
            .write_file(target.to_str().unwrap(), b"x")
            .await
            .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let storage = LocalStorage::new("/definitely/not/here");
        assert!(storage.read_file("input.csv").await.is_err());
    }
}
