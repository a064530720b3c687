use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, warn};

/// Local directory holding uploaded logos and photos.
///
/// Only references are handled here; receiving the bytes is the upload proxy's job.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Map a stored reference (`/uploads/logos/x.png`, `logos/x.png`) to a path under the root.
    ///
    /// References escaping the root are rejected.
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let relative = reference
            .trim_start_matches('/')
            .trim_start_matches("uploads/");
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Delete a stored file; missing files are not an error.
    pub async fn delete(&self, reference: &str) {
        let Some(path) = self.resolve(reference) else {
            warn!(reference, "refusing to delete a file outside the upload directory");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "stored file removed"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), error = %err, "failed to remove stored file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_resolve_under_the_root() {
        let storage = FileStorage::new(PathBuf::from("/srv/uploads"));
        assert_eq!(
            storage.resolve("/uploads/logos/event_1.png"),
            Some(PathBuf::from("/srv/uploads/logos/event_1.png"))
        );
        assert_eq!(
            storage.resolve("photos/a.jpg"),
            Some(PathBuf::from("/srv/uploads/photos/a.jpg"))
        );
        assert_eq!(storage.resolve("../etc/passwd"), None);
    }

    #[tokio::test]
    async fn deleting_removes_the_file_and_tolerates_missing_ones() {
        let root = std::env::temp_dir().join(format!("qr-hunt-files-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("logos")).await.unwrap();
        let file = root.join("logos/logo.png");
        tokio::fs::write(&file, b"png").await.unwrap();

        let storage = FileStorage::new(root.clone());
        storage.delete("/uploads/logos/logo.png").await;
        assert!(!file.exists());
        storage.delete("/uploads/logos/logo.png").await;

        tokio::fs::remove_dir_all(root).await.unwrap();
    }
}
