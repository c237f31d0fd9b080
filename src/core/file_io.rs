//! Raw byte file access used by the replace and sync phases.
//!
//! Writes truncate and rewrite the existing file instead of replacing it, so
//! the file keeps its identity (inode, permissions, hard links).

use crate::error::EngineError;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read a whole file: open, stat, read, close. The first failing step is
/// reported with the path.
pub async fn read_file(path: &Path) -> Result<Vec<u8>, EngineError> {
    let mut file = OpenOptions::new()
        .read(true)
        .open(path)
        .await
        .map_err(|e| EngineError::io(path, e))?;
    let metadata = file.metadata().await.map_err(|e| EngineError::io(path, e))?;

    let mut content = Vec::with_capacity(metadata.len() as usize);
    file.read_to_end(&mut content)
        .await
        .map_err(|e| EngineError::io(path, e))?;
    Ok(content)
}

/// Overwrite an existing file in place. The file must already exist.
pub async fn write_file(path: &Path, content: &[u8]) -> Result<(), EngineError> {
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| EngineError::io(path, e))?;
    file.write_all(content)
        .await
        .map_err(|e| EngineError::io(path, e))?;
    file.flush().await.map_err(|e| EngineError::io(path, e))?;
    log::debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_keeps_file_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"a much longer original content\n").unwrap();

        write_file(&path, b"short\n").await.unwrap();
        assert_eq!(read_file(&path).await.unwrap(), b"short\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let before = std::fs::metadata(&path).unwrap().ino();
            write_file(&path, b"again\n").await.unwrap();
            assert_eq!(std::fs::metadata(&path).unwrap().ino(), before);
        }
    }

    #[tokio::test]
    async fn test_write_never_creates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");
        let err = write_file(&path, b"x").await.unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_error_names_path() {
        let err = read_file(Path::new("/nonexistent/rgfar/file.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rgfar/file.txt"));
    }
}
