//! File system collaborator backed by `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use crystal_core::ast::ListFilter;
use crystal_core::collab::{DirEntry, FileSystem};
use crystal_core::error::FileSystemError;
use tracing::debug;

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

fn io_error(operation: &'static str, path: &Path, err: std::io::Error) -> FileSystemError {
    match err.kind() {
        ErrorKind::NotFound => FileSystemError::NotFound(path.display().to_string()),
        ErrorKind::AlreadyExists => FileSystemError::AlreadyExists(path.display().to_string()),
        _ => FileSystemError::Io {
            operation,
            path: path.display().to_string(),
            reason: err.to_string(),
        },
    }
}

/// The local disk. Relative paths resolve against the process working directory.
#[derive(Debug, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    async fn remove(path: &Path) -> Result<(), FileSystemError> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| io_error("delete", path, e))?;
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        result.map_err(|e| io_error("delete", path, e))
    }

    /// Canonical form of `path`; a missing final component is joined onto
    /// its canonical parent.
    async fn canonical(path: &Path) -> Option<PathBuf> {
        if let Ok(resolved) = tokio::fs::canonicalize(path).await {
            return Some(resolved);
        }
        let name = path.file_name()?;
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        tokio::fs::canonicalize(parent).await.ok().map(|p| p.join(name))
    }

    /// Replacing the destination would remove the source when both name the same entry.
    async fn ensure_distinct(operation: &'static str, source: &Path, destination: &Path) -> Result<(), FileSystemError> {
        match (Self::canonical(source).await, Self::canonical(destination).await) {
            (Some(from), Some(to)) if from == to => Err(FileSystemError::Io {
                operation,
                path: source.display().to_string(),
                reason: "source and destination are the same".to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn copy_tree(source: &Path, destination: &Path) -> Result<(), FileSystemError> {
        let mut pending = vec![(source.to_path_buf(), destination.to_path_buf())];
        while let Some((from, to)) = pending.pop() {
            tokio::fs::create_dir(&to).await.map_err(|e| io_error("copy", &to, e))?;
            let mut entries = tokio::fs::read_dir(&from).await.map_err(|e| io_error("copy", &from, e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error("copy", &from, e))? {
                let target = to.join(entry.file_name());
                let file_type = entry.file_type().await.map_err(|e| io_error("copy", &entry.path(), e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), target));
                } else {
                    tokio::fs::copy(entry.path(), &target)
                        .await
                        .map_err(|e| io_error("copy", &target, e))?;
                }
            }
        }
        Ok(())
    }

    async fn copy_any(source: &Path, destination: &Path) -> Result<(), FileSystemError> {
        let metadata = tokio::fs::metadata(source).await.map_err(|e| io_error("copy", source, e))?;
        Self::ensure_distinct("copy", source, destination).await?;
        if destination.starts_with(source) && metadata.is_dir() {
            return Err(FileSystemError::Io {
                operation: "copy",
                path: source.display().to_string(),
                reason: "destination is inside source".to_string(),
            });
        }
        if tokio::fs::try_exists(destination).await.unwrap_or(false) {
            Self::remove(destination).await?;
        }
        if metadata.is_dir() {
            Self::copy_tree(source, destination).await
        } else {
            tokio::fs::copy(source, destination)
                .await
                .map(|_| ())
                .map_err(|e| io_error("copy", destination, e))
        }
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn copy(&self, source: &Path, destination: &Path) -> Result<(), FileSystemError> {
        Self::copy_any(&expand_home(source), &expand_home(destination)).await
    }

    async fn move_path(&self, source: &Path, destination: &Path) -> Result<(), FileSystemError> {
        let source = expand_home(source);
        let destination = expand_home(destination);
        tokio::fs::metadata(&source).await.map_err(|e| io_error("move", &source, e))?;
        Self::ensure_distinct("move", &source, &destination).await?;
        if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
            Self::remove(&destination).await?;
        }
        if let Err(e) = tokio::fs::rename(&source, &destination).await {
            // Rename fails across devices; fall back to copy and delete.
            debug!(error = %e, "rename failed, copying instead");
            Self::copy_any(&source, &destination).await?;
            Self::remove(&source).await?;
        }
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<(), FileSystemError> {
        Self::remove(&expand_home(path)).await
    }

    async fn list_entries(&self, path: &Path, filter: ListFilter) -> Result<Vec<DirEntry>, FileSystemError> {
        let path = expand_home(path);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| io_error("list", &path, e))?;
        if !metadata.is_dir() {
            return Err(FileSystemError::NotADirectory(path.display().to_string()));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&path).await.map_err(|e| io_error("list", &path, e))?;
        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error("list", &path, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks so a link to a folder lists as a folder
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            let entry = if is_dir { DirEntry::folder(name) } else { DirEntry::file(name) };
            if entry.matches(filter) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn create_file(&self, path: &Path) -> Result<(), FileSystemError> {
        let path = expand_home(path);
        tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map(|_| ())
            .map_err(|e| io_error("create", &path, e))
    }

    async fn create_folder(&self, path: &Path) -> Result<(), FileSystemError> {
        let path = expand_home(path);
        tokio::fs::create_dir(&path).await.map_err(|e| io_error("create", &path, e))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), FileSystemError> {
        let path = expand_home(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, e))?;
        }
        tokio::fs::write(&path, content).await.map_err(|e| io_error("write", &path, e))
    }

    async fn create_folders(&self, paths: &[PathBuf]) -> Result<(), FileSystemError> {
        for path in paths {
            let path = expand_home(path);
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| io_error("create", &path, e))?;
        }
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(expand_home(path)).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_file_twice_fails() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("a.txt");
        fs.create_file(&path).await.unwrap();
        assert!(matches!(
            fs.create_file(&path).await,
            Err(FileSystemError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("deep/er/note.txt");
        fs.write_file(&path, "hello").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_copy_folder_recursively_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("nested/one.txt"), "1").unwrap();
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(dst.join("stale.txt"), "old").unwrap();

        fs.copy(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read_to_string(dst.join("nested/one.txt")).unwrap(), "1");
        assert!(!dst.join("stale.txt").exists());
        assert!(src.join("nested/one.txt").exists());
    }

    #[tokio::test]
    async fn test_move_and_delete() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "data").unwrap();

        fs.move_path(&a, &b).await.unwrap();
        assert!(!fs.exists(&a).await);
        assert!(fs.exists(&b).await);

        fs.delete(&b).await.unwrap();
        assert!(matches!(fs.delete(&b).await, Err(FileSystemError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_copy_onto_itself_keeps_the_file() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let a = dir.path().join("a.txt");
        std::fs::write(&a, "precious").unwrap();

        let err = fs.copy(&a, &a).await.unwrap_err();
        assert!(matches!(err, FileSystemError::Io { operation: "copy", ref reason, .. } if reason == "source and destination are the same"));
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "precious");
    }

    #[tokio::test]
    async fn test_move_onto_itself_through_another_spelling() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let b = dir.path().join("b.txt");
        std::fs::write(&b, "precious").unwrap();
        let same = dir.path().join(".").join("b.txt");

        let err = fs.move_path(&same, &b).await.unwrap_err();
        assert!(matches!(err, FileSystemError::Io { operation: "move", .. }));
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "precious");
    }

    #[tokio::test]
    async fn test_copy_folder_onto_itself_is_rejected() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("keep.txt"), "k").unwrap();

        assert!(fs.copy(&src, &src).await.is_err());
        assert!(src.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_list_entries_filters() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut all = fs.list_entries(dir.path(), ListFilter::All).await.unwrap();
        all.sort_by(|x, y| x.name.cmp(&y.name));
        assert_eq!(all, vec![DirEntry::file("a.txt"), DirEntry::folder("sub")]);

        let folders = fs.list_entries(dir.path(), ListFilter::Folders).await.unwrap();
        assert_eq!(folders, vec![DirEntry::folder("sub")]);

        assert!(matches!(
            fs.list_entries(&dir.path().join("a.txt"), ListFilter::All).await,
            Err(FileSystemError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("./a")), PathBuf::from("./a"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/notes")), home.join("notes"));
        }
    }
}
