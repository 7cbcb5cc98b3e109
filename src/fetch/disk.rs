// src/fetch/disk.rs
// Writing fetched content under the mirror root.

use std::path::Path;

use crate::error::{MirrorError, Result};

/// Creates the parent directories of `path` if they don't exist yet.
pub async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MirrorError::filesystem(parent, e))?;
    }
    Ok(())
}

/// Writes `contents` to `path`, creating parent directories on demand.
pub async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path).await?;
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| MirrorError::filesystem(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.html");

        write_file(&path, b"<p>x</p>").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>x</p>");
    }

    #[tokio::test]
    async fn test_write_file_reports_path_on_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        // A file where a directory is needed
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let err = write_file(&blocker.join("page.html"), b"x").await.unwrap_err();
        assert!(matches!(err, MirrorError::Filesystem { .. }));
    }
}
