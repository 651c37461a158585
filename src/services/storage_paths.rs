//! Filesystem layout of uploads and extracted games.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::fs;
use tracing::{debug, warn};

use crate::config::StorageConfig;

/// Exclusive upper bound of the random suffix in allocated upload names.
const UPLOAD_SUFFIX_BOUND: u32 = 1_000_000_000;

/// Owns the two storage roots and every path computed beneath them.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    uploads_root: PathBuf,
    executables_root: PathBuf,
    static_base_url: String,
    executables_mount: String,
    uploads_mount: String,
}

impl StoragePaths {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            uploads_root: config.uploads_dir.clone(),
            executables_root: config.executables_dir.clone(),
            static_base_url: config.static_base_url.trim_end_matches('/').to_owned(),
            executables_mount: config.executables_mount.trim_matches('/').to_owned(),
            uploads_mount: config.uploads_mount.trim_matches('/').to_owned(),
        }
    }

    pub fn uploads_root(&self) -> &Path {
        &self.uploads_root
    }

    pub fn executables_root(&self) -> &Path {
        &self.executables_root
    }

    /// Location of an uploaded file inside the uploads root.
    pub fn uploads_path(&self, filename: &str) -> PathBuf {
        self.uploads_root.join(filename)
    }

    /// Extraction directory of a game.
    pub fn executables_path(&self, game_id: i64) -> PathBuf {
        self.executables_root.join(game_id.to_string())
    }

    /// Sibling of the extraction directory used while a replacement archive is unpacked.
    pub fn staging_path(&self, game_id: i64) -> PathBuf {
        self.executables_root.join(format!(".staging-{game_id}"))
    }

    /// Sibling holding the previous extraction directory until a replacement is committed.
    pub fn backup_path(&self, game_id: i64) -> PathBuf {
        self.executables_root.join(format!(".previous-{game_id}"))
    }

    /// Create both roots if they do not exist yet.
    pub async fn ensure_roots(&self) -> io::Result<()> {
        fs::create_dir_all(&self.uploads_root).await?;
        fs::create_dir_all(&self.executables_root).await
    }

    /// Write `bytes` under `filename` inside the uploads root.
    pub async fn store_upload(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.uploads_root).await?;
        let path = self.uploads_path(filename);
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "upload stored");
        Ok(path)
    }

    /// Remove a file or a whole directory tree. Absence counts as success; any other failure is
    /// logged and reported as `false`.
    pub async fn remove_if_exists(&self, path: &Path) -> bool {
        let metadata = match fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to inspect path for removal");
                return false;
            }
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "removed");
                true
            }
            Err(err) if err.kind() == ErrorKind::NotFound => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove path");
                false
            }
        }
    }

    /// Public URL of the entry point of a finalized game.
    pub fn playable_url(&self, playable_path: &str) -> String {
        format!(
            "{}/{}/{}{}",
            self.static_base_url,
            self.executables_mount,
            playable_path,
            super::archive::ENTRY_POINT
        )
    }

    /// Public URL of a file in the uploads root.
    pub fn upload_url(&self, filename: &str) -> String {
        format!("{}/{}/{}", self.static_base_url, self.uploads_mount, filename)
    }
}

/// Randomized upload file name: `{unix millis}-{random}{.ext}`. Only the lowercased extension of
/// the client-supplied name survives, and only when it is plain ASCII alphanumerics.
pub fn allocate_upload_name(original_name: Option<&str>) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let suffix = rand::random_range(0..UPLOAD_SUFFIX_BOUND);

    match original_name.and_then(sanitized_extension) {
        Some(ext) => format!("{millis}-{suffix}.{ext}"),
        None => format!("{millis}-{suffix}"),
    }
}

/// Lowercased extension of `name` when it is non-empty ASCII alphanumerics.
pub fn sanitized_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    (!ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_ascii_lowercase())
}

/// Playable path stored on a game: `{id}/{entry dir}/`, or `{id}/` for a root entry point.
pub fn playable_path(game_id: i64, entry_dir: &Path) -> String {
    let segments: Vec<String> = entry_dir
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        format!("{game_id}/")
    } else {
        format!("{game_id}/{}/", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(root: &Path) -> StoragePaths {
        StoragePaths::new(&StorageConfig {
            uploads_dir: root.join("uploads"),
            executables_dir: root.join("executables"),
            static_base_url: "http://localhost:8080/".to_owned(),
            ..StorageConfig::default()
        })
    }

    #[test]
    fn upload_names_keep_only_a_clean_extension() {
        let name = allocate_upload_name(Some("My Game.ZIP"));
        assert!(name.ends_with(".zip"), "{name}");
        assert!(!name.contains(' '));

        let name = allocate_upload_name(Some("../../etc/passwd"));
        assert!(!name.contains('/'));
        assert!(!name.contains('.'));

        let name = allocate_upload_name(Some("cover.p/ng"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn upload_names_are_unique() {
        let first = allocate_upload_name(Some("a.png"));
        let second = allocate_upload_name(Some("a.png"));
        assert_ne!(first, second);
    }

    #[test]
    fn playable_path_uses_forward_slashes() {
        assert_eq!(playable_path(7, Path::new("")), "7/");
        assert_eq!(playable_path(7, &Path::new("a").join("b")), "7/a/b/");
    }

    #[test]
    fn playable_url_points_at_the_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        assert_eq!(
            paths.playable_url("7/sub/"),
            "http://localhost:8080/executables/7/sub/index.html"
        );
    }

    #[tokio::test]
    async fn remove_if_exists_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());

        let file = paths.store_upload("a.zip", b"zip").await.unwrap();
        assert!(paths.remove_if_exists(&file).await);
        assert!(paths.remove_if_exists(&file).await);
        assert!(!file.exists());

        let tree = paths.executables_path(3).join("nested");
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("index.html"), "<html>").unwrap();
        assert!(paths.remove_if_exists(&paths.executables_path(3)).await);
        assert!(!paths.executables_path(3).exists());
    }
}
