use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use crystal_core::collab::{LoadedScript, ScriptLoader};
use crystal_core::error::LoadError;

use crate::fs::expand_home;

/// Loads scripts from disk. Returned paths are canonical so include cycle
/// detection sees one name per file.
#[derive(Debug, Default)]
pub struct FileScriptLoader;

#[async_trait]
impl ScriptLoader for FileScriptLoader {
    async fn load(&self, path: &Path) -> Result<LoadedScript, LoadError> {
        let path = expand_home(path);
        let source = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound(path.display().to_string()),
            _ => LoadError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
        Ok(LoadedScript { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_canonicalizes() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/util.cry"), "say 1").unwrap();

        let script = FileScriptLoader
            .load(&dir.path().join("lib/../lib/util.cry"))
            .await
            .unwrap();
        assert_eq!(script.source, "say 1");
        assert_eq!(script.path, dir.path().join("lib/util.cry").canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_missing_script() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = FileScriptLoader.load(&dir.path().join("none.cry")).await;
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }
}
