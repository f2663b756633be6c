//! Request-scoped scratch files
//!
//! A [`TemporaryArtifact`] owns one uniquely named file inside the scratch
//! directory. The file is removed when the artifact is closed or dropped, so
//! early returns, panics and client disconnects cannot leave it behind.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

const FILE_PREFIX: &str = "upload-";

pub struct TemporaryArtifact {
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl TemporaryArtifact {
    /// Allocates a new empty file in `dir`, creating the directory if needed.
    pub async fn create(dir: &Path) -> std::io::Result<Self> {
        fs_err::tokio::create_dir_all(dir).await?;
        let file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(".part")
            .tempfile_in(dir)?;
        let path = file.path().to_path_buf();
        log::debug!("Allocated temporary file {}", path.display());

        Ok(Self { file: Some(file), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens an async write handle to the artifact.
    pub async fn open_writer(&self) -> std::io::Result<tokio::fs::File> {
        tokio::fs::OpenOptions::new().write(true).open(&self.path).await
    }

    /// Size of the file on disk, in bytes.
    pub async fn size_on_disk(&self) -> std::io::Result<u64> {
        Ok(fs_err::tokio::metadata(&self.path).await?.len())
    }

    /// Removes the file now. Failures are logged, never returned.
    pub fn close(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        match file.close() {
            Ok(()) => log::debug!("Removed temporary file {}", self.path.display()),
            Err(e) => log::warn!("Failed to remove temporary file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_create_write_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = TemporaryArtifact::create(dir.path()).await.unwrap();

        let mut writer = artifact.open_writer().await.unwrap();
        writer.write_all(b"abc").await.unwrap();
        writer.flush().await.unwrap();
        drop(writer);

        assert_eq!(artifact.size_on_disk().await.unwrap(), 3);
        assert!(artifact
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(FILE_PREFIX));
        assert_eq!(entries(dir.path()), 1);

        artifact.close();
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let artifact = TemporaryArtifact::create(dir.path()).await.unwrap();
            assert!(artifact.path().exists());
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = TemporaryArtifact::create(dir.path()).await.unwrap();
        let b = TemporaryArtifact::create(dir.path()).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("scratch").join("uploads");
        let artifact = TemporaryArtifact::create(&nested).await.unwrap();
        assert!(artifact.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_close_after_external_removal_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = TemporaryArtifact::create(dir.path()).await.unwrap();
        std::fs::remove_file(artifact.path()).unwrap();
        artifact.close();
    }
}
