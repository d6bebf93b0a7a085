//! Local filesystem artifact store.

use std::path::{Component, Path, PathBuf};

use super::{ArtifactStore, StorageError};

pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(Self { root })
    }
}

impl ArtifactStore for LocalStorage {
    fn save(
        &self,
        data: &[u8],
        event: &str,
        name: &str,
        email: &str,
    ) -> Result<String, StorageError> {
        let dir = slug(event);
        let file = format!("{}-{}.pdf", slug(name), slug(email));

        std::fs::create_dir_all(self.root.join(&dir))
            .map_err(|e| StorageError::Io(e.to_string()))?;

        let relative = format!("{dir}/{file}");
        std::fs::write(self.root.join(&relative), data)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(relative)
    }

    fn load(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        // Stored paths are relative; refuse anything that climbs out of the
        // root.
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        std::fs::read(self.root.join(relative)).map_err(|e| StorageError::Io(e.to_string()))
    }
}

/// Filesystem-safe slug: lowercase alphanumerics with single dashes.
fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> LocalStorage {
        let dir = std::env::temp_dir().join(format!("certmill-store-{tag}-{}", uuid::Uuid::now_v7()));
        LocalStorage::new(dir).unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = temp_store("rt");
        let path = store
            .save(b"PDF", "TechFest 2026", "Asha Rao", "asha@example.org")
            .unwrap();
        assert_eq!(path, "techfest-2026/asha-rao-asha-example-org.pdf");
        assert_eq!(store.load(&path).unwrap(), b"PDF");
    }

    #[test]
    fn load_rejects_traversal() {
        let store = temp_store("trav");
        assert!(matches!(
            store.load("../outside.pdf"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            store.load("/etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn slug_handles_degenerate_input() {
        assert_eq!(slug("  ***  "), "unnamed");
        assert_eq!(slug("A  B"), "a-b");
    }
}
