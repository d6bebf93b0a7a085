//! Rendered artifact storage.

pub mod local;

pub use local::LocalStorage;

/// Artifact storage error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("invalid artifact path: {0}")]
    InvalidPath(String),
}

/// Stores rendered certificate binaries.
///
/// `save` derives the artifact path from the recipient's event/name/email
/// and returns it; that path becomes the certificate's `file_path` and is
/// what `load` later resolves for downloads.
pub trait ArtifactStore: Send + Sync {
    fn save(&self, data: &[u8], event: &str, name: &str, email: &str)
        -> Result<String, StorageError>;

    fn load(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}
