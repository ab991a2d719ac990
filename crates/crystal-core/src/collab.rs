//! Collaborator traits: the narrow seams between the evaluator and the outside world.
//!
//! The evaluator never touches a terminal, disk or socket directly. It calls
//! these traits, which the CLI implements against the real OS and
//! [`crate::testing`] implements in memory.
//!
//! Every method is awaited to completion before the next statement runs, so
//! implementations need no ordering guarantees beyond their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::ast::ListFilter;
use crate::error::{ConsoleError, FileSystemError, LoadError, NetworkError};

/// Line-oriented terminal access.
#[async_trait]
pub trait Console: Send + Sync {
    async fn write_line(&self, text: &str) -> Result<(), ConsoleError>;

    /// Shows `prompt` (without a trailing newline) and reads one line,
    /// stripped of its line terminator.
    ///
    /// Returns [`ConsoleError::Closed`] at end of input.
    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError>;
}

/// Whether a directory entry is a plain file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn matches(&self, filter: ListFilter) -> bool {
        match filter {
            ListFilter::All => true,
            ListFilter::Files => self.kind == EntryKind::File,
            ListFilter::Folders => self.kind == EntryKind::Folder,
        }
    }
}

/// File and folder operations.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Copies a file, or a folder recursively.
    async fn copy(&self, source: &Path, destination: &Path) -> Result<(), FileSystemError>;

    async fn move_path(&self, source: &Path, destination: &Path) -> Result<(), FileSystemError>;

    /// Deletes a file, or a folder with everything inside it.
    async fn delete(&self, path: &Path) -> Result<(), FileSystemError>;

    /// Lists the entries of a folder that pass `filter`, in the order the
    /// underlying store yields them.
    async fn list_entries(&self, path: &Path, filter: ListFilter) -> Result<Vec<DirEntry>, FileSystemError>;

    /// Creates an empty file. Fails with `AlreadyExists` if the path is taken.
    async fn create_file(&self, path: &Path) -> Result<(), FileSystemError>;

    /// Creates one folder. Fails with `AlreadyExists` if the path is taken.
    async fn create_folder(&self, path: &Path) -> Result<(), FileSystemError>;

    /// Writes `content` to a file, creating missing parent folders and
    /// replacing any previous content.
    async fn write_file(&self, path: &Path, content: &str) -> Result<(), FileSystemError>;

    /// Creates each folder along with any missing parents.
    async fn create_folders(&self, paths: &[PathBuf]) -> Result<(), FileSystemError>;

    async fn exists(&self, path: &Path) -> bool;
}

/// Reachability checks and HTTP downloads.
#[async_trait]
pub trait Network: Send + Sync {
    async fn ping(&self, host: &str) -> Result<(), NetworkError>;

    /// Fetches `url` into `destination`, creating missing parent folders.
    /// Returns the number of bytes written.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, NetworkError>;
}

/// A script read by a [`ScriptLoader`].
#[derive(Debug, Clone)]
pub struct LoadedScript {
    /// Where the script was found; includes inside it resolve relative to
    /// this path's parent.
    pub path: PathBuf,
    pub source: String,
}

/// Reads script text for `include`.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<LoadedScript, LoadError>;
}

/// The full set of collaborators an evaluator runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub console: Arc<dyn Console>,
    pub fs: Arc<dyn FileSystem>,
    pub network: Arc<dyn Network>,
    pub loader: Arc<dyn ScriptLoader>,
}
