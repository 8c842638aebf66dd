//! Opaque blob store for uploaded media. Rows persist only the returned
//! path string; there is no content hashing, no deduplication and no
//! cleanup of orphaned files when a referencing row is removed.

use std::io;
use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

pub trait BlobStore: Send + Sync {
    /// Persist the bytes and return the path to store in the database.
    fn store(&self, filename: &str, bytes: &[u8]) -> io::Result<String>;
}

/// Local-filesystem implementation writing under a configured upload root.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Keep only filename characters that are safe in a path and a URL.
fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

impl BlobStore for FsBlobStore {
    fn store(&self, filename: &str, bytes: &[u8]) -> io::Result<String> {
        std::fs::create_dir_all(&self.root)?;
        // uuid prefix keeps same-named uploads from clobbering each other
        let name = format!("{}-{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.root.join(&name);
        std::fs::write(&path, bytes)?;
        debug!(path = %path.display(), size = bytes.len(), "blob stored");
        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_filename("photo 1 (new).jpg"), "photo1new.jpg");
        assert_eq!(sanitize_filename("™©"), "upload");
    }

    #[test]
    fn store_writes_under_root() {
        let dir = std::env::temp_dir().join(format!("shopfront-blob-{}", Uuid::new_v4()));
        let store = FsBlobStore::new(&dir);
        let path = store.store("a.png", b"png-bytes").unwrap();
        assert!(path.contains("a.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
