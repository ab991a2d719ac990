//! In-memory collaborators for exercising the evaluator without a terminal,
//! disk or network.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::ast::ListFilter;
use crate::collab::{Collaborators, Console, DirEntry, FileSystem, LoadedScript, Network, ScriptLoader};
use crate::error::{ConsoleError, FileSystemError, LoadError, NetworkError};
use crate::evaluator::Evaluator;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Normalize a path: drop `/` and `.`, resolve `..` lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(s) => result.push(s),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    result
}

/// Console that records output and replays scripted input.
#[derive(Debug, Default)]
pub struct FakeConsole {
    output: Mutex<Vec<String>>,
    input: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a line for the next `read_line`.
    pub fn push_input(&self, line: impl Into<String>) {
        lock(&self.input).push_back(line.into());
    }

    pub fn output(&self) -> Vec<String> {
        lock(&self.output).clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl Console for FakeConsole {
    async fn write_line(&self, text: &str) -> Result<(), ConsoleError> {
        lock(&self.output).push(text.to_string());
        Ok(())
    }

    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError> {
        lock(&self.prompts).push(prompt.to_string());
        lock(&self.input).pop_front().ok_or(ConsoleError::Closed)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    File(String),
    Folder,
}

/// In-memory file system. Listings come back in name order.
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        // Root folder always exists
        nodes.insert(PathBuf::new(), Node::Folder);
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Adds a file, creating its parent folders.
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        let path = normalize(path.as_ref());
        {
            let mut nodes = self.write_nodes();
            Self::insert_parents(&mut nodes, &path);
            nodes.insert(path, Node::File(content.into()));
        }
        self
    }

    /// Adds a folder and its parents.
    pub fn with_folder(self, path: impl AsRef<Path>) -> Self {
        let path = normalize(path.as_ref());
        {
            let mut nodes = self.write_nodes();
            Self::insert_parents(&mut nodes, &path);
            nodes.insert(path, Node::Folder);
        }
        self
    }

    /// Content of a file, if `path` is one.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.read_nodes().get(&normalize(path.as_ref())) {
            Some(Node::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn is_folder(&self, path: impl AsRef<Path>) -> bool {
        self.read_nodes().get(&normalize(path.as_ref())) == Some(&Node::Folder)
    }

    fn read_nodes(&self) -> RwLockReadGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_nodes(&self) -> RwLockWriteGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            current.push(component);
            nodes.entry(current.clone()).or_insert(Node::Folder);
        }
    }

    fn require_parent_folder(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Result<(), FileSystemError> {
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        match nodes.get(&parent) {
            Some(Node::Folder) => Ok(()),
            Some(Node::File(_)) => Err(FileSystemError::NotADirectory(parent.display().to_string())),
            None => Err(FileSystemError::NotFound(parent.display().to_string())),
        }
    }

    /// Keys of `path` and everything beneath it.
    fn subtree(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Vec<PathBuf> {
        nodes.keys().filter(|key| key.starts_with(path)).cloned().collect()
    }

    fn copy_locked(
        nodes: &mut BTreeMap<PathBuf, Node>,
        operation: &'static str,
        source: &Path,
        destination: &Path,
    ) -> Result<(), FileSystemError> {
        if !nodes.contains_key(source) {
            return Err(FileSystemError::NotFound(source.display().to_string()));
        }
        if destination == source {
            return Err(FileSystemError::Io {
                operation,
                path: source.display().to_string(),
                reason: "source and destination are the same".to_string(),
            });
        }
        if destination.starts_with(source) {
            return Err(FileSystemError::Io {
                operation,
                path: source.display().to_string(),
                reason: "destination is inside source".to_string(),
            });
        }
        Self::require_parent_folder(nodes, destination)?;

        let copies: Vec<(PathBuf, Node)> = Self::subtree(nodes, source)
            .into_iter()
            .filter_map(|key| {
                let node = nodes.get(&key)?.clone();
                let relative = key.strip_prefix(source).ok()?.to_path_buf();
                Some((destination.join(relative), node))
            })
            .collect();
        for key in Self::subtree(nodes, destination) {
            nodes.remove(&key);
        }
        nodes.extend(copies);
        Ok(())
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn copy(&self, source: &Path, destination: &Path) -> Result<(), FileSystemError> {
        let mut nodes = self.write_nodes();
        Self::copy_locked(&mut nodes, "copy", &normalize(source), &normalize(destination))
    }

    async fn move_path(&self, source: &Path, destination: &Path) -> Result<(), FileSystemError> {
        let source = normalize(source);
        let mut nodes = self.write_nodes();
        Self::copy_locked(&mut nodes, "move", &source, &normalize(destination))?;
        for key in Self::subtree(&nodes, &source) {
            nodes.remove(&key);
        }
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<(), FileSystemError> {
        let normalized = normalize(path);
        let mut nodes = self.write_nodes();
        if normalized.as_os_str().is_empty() || !nodes.contains_key(&normalized) {
            return Err(FileSystemError::NotFound(path.display().to_string()));
        }
        for key in Self::subtree(&nodes, &normalized) {
            nodes.remove(&key);
        }
        Ok(())
    }

    async fn list_entries(&self, path: &Path, filter: ListFilter) -> Result<Vec<DirEntry>, FileSystemError> {
        let normalized = normalize(path);
        let nodes = self.read_nodes();
        match nodes.get(&normalized) {
            Some(Node::Folder) => {}
            Some(Node::File(_)) => return Err(FileSystemError::NotADirectory(path.display().to_string())),
            None => return Err(FileSystemError::NotFound(path.display().to_string())),
        }

        Ok(nodes
            .iter()
            .filter(|(key, _)| !key.as_os_str().is_empty() && key.parent() == Some(normalized.as_path()))
            .filter_map(|(key, node)| {
                let name = key.file_name()?.to_string_lossy().into_owned();
                Some(match node {
                    Node::File(_) => DirEntry::file(name),
                    Node::Folder => DirEntry::folder(name),
                })
            })
            .filter(|entry| entry.matches(filter))
            .collect())
    }

    async fn create_file(&self, path: &Path) -> Result<(), FileSystemError> {
        let normalized = normalize(path);
        let mut nodes = self.write_nodes();
        if nodes.contains_key(&normalized) {
            return Err(FileSystemError::AlreadyExists(path.display().to_string()));
        }
        Self::require_parent_folder(&nodes, &normalized)?;
        nodes.insert(normalized, Node::File(String::new()));
        Ok(())
    }

    async fn create_folder(&self, path: &Path) -> Result<(), FileSystemError> {
        let normalized = normalize(path);
        let mut nodes = self.write_nodes();
        if nodes.contains_key(&normalized) {
            return Err(FileSystemError::AlreadyExists(path.display().to_string()));
        }
        Self::require_parent_folder(&nodes, &normalized)?;
        nodes.insert(normalized, Node::Folder);
        Ok(())
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), FileSystemError> {
        let normalized = normalize(path);
        let mut nodes = self.write_nodes();
        if nodes.get(&normalized) == Some(&Node::Folder) {
            return Err(FileSystemError::Io {
                operation: "write",
                path: path.display().to_string(),
                reason: "is a folder".to_string(),
            });
        }
        Self::insert_parents(&mut nodes, &normalized);
        nodes.insert(normalized, Node::File(content.to_string()));
        Ok(())
    }

    async fn create_folders(&self, paths: &[PathBuf]) -> Result<(), FileSystemError> {
        let mut nodes = self.write_nodes();
        for path in paths {
            let mut current = PathBuf::new();
            for component in normalize(path).components() {
                current.push(component);
                match nodes.get(&current) {
                    Some(Node::File(_)) => {
                        return Err(FileSystemError::NotADirectory(current.display().to_string()));
                    }
                    Some(Node::Folder) => {}
                    None => {
                        nodes.insert(current.clone(), Node::Folder);
                    }
                }
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.read_nodes().contains_key(&normalize(path))
    }
}

/// Network with a fixed set of reachable hosts and downloadable URLs.
///
/// Downloads land in the shared [`MemoryFileSystem`].
#[derive(Debug)]
pub struct FakeNetwork {
    fs: Arc<MemoryFileSystem>,
    reachable: Mutex<HashSet<String>>,
    pages: Mutex<HashMap<String, String>>,
    pinged: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new(fs: Arc<MemoryFileSystem>) -> Self {
        Self {
            fs,
            reachable: Mutex::new(HashSet::new()),
            pages: Mutex::new(HashMap::new()),
            pinged: Mutex::new(Vec::new()),
        }
    }

    pub fn add_host(&self, host: impl Into<String>) {
        lock(&self.reachable).insert(host.into());
    }

    pub fn add_page(&self, url: impl Into<String>, body: impl Into<String>) {
        lock(&self.pages).insert(url.into(), body.into());
    }

    pub fn pinged(&self) -> Vec<String> {
        lock(&self.pinged).clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn ping(&self, host: &str) -> Result<(), NetworkError> {
        lock(&self.pinged).push(host.to_string());
        if lock(&self.reachable).contains(host) {
            Ok(())
        } else {
            Err(NetworkError::Unreachable(host.to_string()))
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64, NetworkError> {
        let body = lock(&self.pages).get(url).cloned().ok_or_else(|| NetworkError::Download {
            url: url.to_string(),
            reason: "404 Not Found".to_string(),
        })?;
        self.fs
            .write_file(destination, &body)
            .await
            .map_err(|e| NetworkError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(body.len() as u64)
    }
}

/// Script loader backed by a map of normalized paths to source text.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    scripts: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, path: impl AsRef<Path>, source: impl Into<String>) {
        lock(&self.scripts).insert(normalize(path.as_ref()), source.into());
    }
}

#[async_trait]
impl ScriptLoader for MemoryLoader {
    async fn load(&self, path: &Path) -> Result<LoadedScript, LoadError> {
        let normalized = normalize(path);
        let source = lock(&self.scripts)
            .get(&normalized)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.display().to_string()))?;
        Ok(LoadedScript {
            path: normalized,
            source,
        })
    }
}

/// One of each fake, wired together.
pub struct TestBed {
    pub console: Arc<FakeConsole>,
    pub fs: Arc<MemoryFileSystem>,
    pub network: Arc<FakeNetwork>,
    pub loader: Arc<MemoryLoader>,
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBed {
    pub fn new() -> Self {
        Self::with_fs(MemoryFileSystem::new())
    }

    /// Starts from a pre-populated file system.
    pub fn with_fs(fs: MemoryFileSystem) -> Self {
        let fs = Arc::new(fs);
        Self {
            console: Arc::new(FakeConsole::new()),
            network: Arc::new(FakeNetwork::new(fs.clone())),
            fs,
            loader: Arc::new(MemoryLoader::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            console: self.console.clone(),
            fs: self.fs.clone(),
            network: self.network.clone(),
            loader: self.loader.clone(),
        }
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.collaborators())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_fs_create_and_list() {
        let fs = MemoryFileSystem::new().with_file("docs/b.txt", "b").with_folder("docs/sub");
        fs.create_file(Path::new("docs/a.txt")).await.unwrap();
        let entries = fs.list_entries(Path::new("./docs"), ListFilter::All).await.unwrap();
        assert_eq!(
            entries,
            vec![DirEntry::file("a.txt"), DirEntry::file("b.txt"), DirEntry::folder("sub")]
        );
        let folders = fs.list_entries(Path::new("docs"), ListFilter::Folders).await.unwrap();
        assert_eq!(folders, vec![DirEntry::folder("sub")]);
    }

    #[tokio::test]
    async fn test_memory_fs_create_existing_fails() {
        let fs = MemoryFileSystem::new().with_file("a.txt", "");
        let err = fs.create_file(Path::new("a.txt")).await.unwrap_err();
        assert_eq!(err, FileSystemError::AlreadyExists("a.txt".to_string()));
    }

    #[tokio::test]
    async fn test_memory_fs_copy_folder_recursively() {
        let fs = MemoryFileSystem::new().with_file("src/one.txt", "1").with_file("src/deep/two.txt", "2");
        fs.copy(Path::new("src"), Path::new("backup")).await.unwrap();
        assert_eq!(fs.read("backup/one.txt").as_deref(), Some("1"));
        assert_eq!(fs.read("backup/deep/two.txt").as_deref(), Some("2"));
        assert_eq!(fs.read("src/one.txt").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_memory_fs_move_and_delete() {
        let fs = MemoryFileSystem::new().with_file("a.txt", "hello");
        fs.move_path(Path::new("a.txt"), Path::new("b.txt")).await.unwrap();
        assert!(!fs.exists(Path::new("a.txt")).await);
        assert_eq!(fs.read("b.txt").as_deref(), Some("hello"));
        fs.delete(Path::new("b.txt")).await.unwrap();
        assert!(matches!(
            fs.delete(Path::new("b.txt")).await,
            Err(FileSystemError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_fs_write_creates_parents() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("out/logs/run.txt"), "ok").await.unwrap();
        assert!(fs.is_folder("out/logs"));
        assert_eq!(fs.read("out/logs/run.txt").as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_fake_console_closed_when_input_runs_out() {
        let console = FakeConsole::new();
        console.push_input("yes");
        assert_eq!(console.read_line("Sure? ").await.unwrap(), "yes");
        assert_eq!(console.read_line("Again? ").await, Err(ConsoleError::Closed));
        assert_eq!(console.prompts(), vec!["Sure? ", "Again? "]);
    }

    #[tokio::test]
    async fn test_memory_loader_normalizes_paths() {
        let loader = MemoryLoader::new();
        loader.add("lib/util.cry", "say 1");
        let script = loader.load(Path::new("lib/../lib/./util.cry")).await.unwrap();
        assert_eq!(script.path, PathBuf::from("lib/util.cry"));
        assert!(matches!(
            loader.load(Path::new("missing.cry")).await,
            Err(LoadError::NotFound(_))
        ));
    }
}
