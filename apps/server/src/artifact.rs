use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Errors raised by the firmware artifact source.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// The configured path does not point at a readable file.
    #[error("firmware image not found at {path}")]
    NotFound { path: PathBuf },

    /// The image exists but could not be read.
    #[error("failed to read firmware image {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

/// The firmware image on disk.
///
/// Verified once at startup, read once per served request. The image is
/// expected to stay unchanged for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ArtifactSource {
    path: PathBuf,
}

impl ArtifactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks that the image exists before any network resource is opened.
    ///
    /// # Errors
    /// Returns [`ArtifactError::NotFound`] when the path is absent or not a
    /// regular file; this is a fatal startup error.
    pub fn verify(&self) -> Result<(), ArtifactError> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) if metadata.is_file() => Ok(()),
            Ok(_) => Err(ArtifactError::NotFound { path: self.path.clone() }),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound { path: self.path.clone() })
            }
            Err(source) => Err(ArtifactError::Read { path: self.path.clone(), source }),
        }
    }

    /// Reads the full image. Invoked once per incoming request.
    ///
    /// # Errors
    /// Returns [`ArtifactError::Read`] when the image disappeared or became
    /// unreadable after startup.
    pub async fn read_all(&self) -> Result<Vec<u8>, ArtifactError> {
        fs::read(&self.path)
            .await
            .map_err(|source| ArtifactError::Read { path: self.path.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn verify_accepts_existing_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("firmware.bin");
        std::fs::write(&path, b"image").expect("write image");

        assert!(ArtifactSource::new(&path).verify().is_ok());
    }

    #[test]
    fn verify_rejects_missing_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("missing.bin");

        let err = ArtifactSource::new(&path).verify().expect_err("must fail");
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn verify_rejects_directory() {
        let dir = tempdir().expect("temp dir");

        let err = ArtifactSource::new(dir.path()).verify().expect_err("must fail");
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[tokio::test]
    async fn read_all_returns_image_bytes() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("firmware.bin");
        std::fs::write(&path, b"FW-DATA").expect("write image");

        let bytes = ArtifactSource::new(&path).read_all().await.expect("read image");
        assert_eq!(bytes, b"FW-DATA");
    }
}
