//! In-memory [`FileSystem`] for tests and for callers that need a listing
//! backend detached from the host.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::config::MemFsConfig;
use crate::{DirectoryFile, FileSystem, FsError, FsErrorKind, OpenFlags, Result};

#[derive(Debug)]
enum Node {
    File(Vec<u8>),
    Dir(HashMap<String, Node>),
}

impl Node {
    fn empty_dir() -> Self {
        Node::Dir(HashMap::new())
    }
}

/// A directory tree held in memory.
///
/// Clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemFs {
    root: Arc<RwLock<Node>>,
    config: MemFsConfig,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new(MemFsConfig::default())
    }
}

/// Splits `path` into its normal components, resolving `.` and `..`.
fn components(op: &'static str, path: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => match name.to_str() {
                Some(name) => out.push(name.to_owned()),
                None => return Err(invalid(op, path)),
            },
            Component::Prefix(_) => return Err(invalid(op, path)),
        }
    }
    Ok(out)
}

fn error(kind: FsErrorKind, op: &'static str, path: &Path) -> FsError {
    FsError::new(kind, format!("{op} {}", path.display()))
}

fn invalid(op: &'static str, path: &Path) -> FsError {
    error(FsErrorKind::InvalidInput, op, path)
}

impl MemFs {
    pub fn new(config: MemFsConfig) -> Self {
        Self {
            root: Arc::new(RwLock::new(Node::empty_dir())),
            config,
        }
    }

    pub fn create_dir(&self, path: &Path) -> Result<()> {
        trace!(path = %path.display(), "mem.create_dir");
        self.insert("mkdir", path, Node::empty_dir(), false)
    }

    /// Creates `path` and any missing parents; existing directories are fine.
    pub fn create_dir_all(&self, path: &Path) -> Result<()> {
        trace!(path = %path.display(), "mem.create_dir_all");
        let parts = components("mkdir", path)?;
        let mut root = self.root.write();
        let mut node = &mut *root;
        for part in parts {
            let Node::Dir(children) = node else {
                return Err(error(FsErrorKind::NotADirectory, "mkdir", path));
            };
            if !children.contains_key(&part) {
                self.check_capacity(children.len(), "mkdir", path)?;
            }
            node = children.entry(part).or_insert_with(Node::empty_dir);
        }
        match node {
            Node::Dir(_) => Ok(()),
            Node::File(_) => Err(error(FsErrorKind::AlreadyExists, "mkdir", path)),
        }
    }

    /// Creates or overwrites the file at `path`.
    pub fn create_file(&self, path: &Path, contents: impl Into<Vec<u8>>) -> Result<()> {
        trace!(path = %path.display(), "mem.create_file");
        self.insert("create", path, Node::File(contents.into()), true)
    }

    /// Removes a file or an empty directory.
    pub fn remove(&self, path: &Path) -> Result<()> {
        trace!(path = %path.display(), "mem.remove");
        let mut parts = components("remove", path)?;
        let Some(name) = parts.pop() else {
            return Err(invalid("remove", path));
        };
        let mut root = self.root.write();
        let children = Self::dir_mut(&mut root, &parts, "remove", path)?;
        match children.get(&name) {
            None => return Err(error(FsErrorKind::NotFound, "remove", path)),
            Some(Node::Dir(grandchildren)) if !grandchildren.is_empty() => {
                return Err(error(FsErrorKind::DirectoryNotEmpty, "remove", path));
            }
            Some(_) => {}
        }
        children.remove(&name);
        Ok(())
    }

    /// Returns the contents of the file at `path`.
    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let parts = components("read", path)?;
        let root = self.root.read();
        match Self::lookup(&root, &parts) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir(_)) => Err(error(FsErrorKind::IsADirectory, "read", path)),
            None => Err(error(FsErrorKind::NotFound, "read", path)),
        }
    }

    fn insert(&self, op: &'static str, path: &Path, node: Node, replace_file: bool) -> Result<()> {
        let mut parts = components(op, path)?;
        let Some(name) = parts.pop() else {
            return Err(error(FsErrorKind::AlreadyExists, op, path));
        };
        let mut root = self.root.write();
        let children = Self::dir_mut(&mut root, &parts, op, path)?;
        match children.get(&name) {
            Some(Node::File(_)) if replace_file => {}
            Some(Node::Dir(_)) if replace_file => {
                return Err(error(FsErrorKind::IsADirectory, op, path));
            }
            Some(_) => return Err(error(FsErrorKind::AlreadyExists, op, path)),
            None => self.check_capacity(children.len(), op, path)?,
        }
        children.insert(name, node);
        Ok(())
    }

    fn check_capacity(&self, len: usize, op: &'static str, path: &Path) -> Result<()> {
        match self.config.max_entries {
            Some(max) if len >= max => Err(FsError::new(
                FsErrorKind::InvalidInput,
                format!("{op} {}: directory holds {max} entries", path.display()),
            )),
            _ => Ok(()),
        }
    }

    fn lookup<'a>(root: &'a Node, parts: &[String]) -> Option<&'a Node> {
        parts.iter().try_fold(root, |node, part| match node {
            Node::Dir(children) => children.get(part),
            Node::File(_) => None,
        })
    }

    fn dir_mut<'a>(
        root: &'a mut Node,
        parts: &[String],
        op: &'static str,
        path: &Path,
    ) -> Result<&'a mut HashMap<String, Node>> {
        let mut node = root;
        for part in parts {
            node = match node {
                Node::Dir(children) => children
                    .get_mut(part)
                    .ok_or_else(|| error(FsErrorKind::NotFound, op, path))?,
                Node::File(_) => return Err(error(FsErrorKind::NotADirectory, op, path)),
            };
        }
        match node {
            Node::Dir(children) => Ok(children),
            Node::File(_) => Err(error(FsErrorKind::NotADirectory, op, path)),
        }
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn open_file(&self, path: &Path, flags: OpenFlags, _mode: u32) -> Result<MemFile> {
        trace!(path = %path.display(), ?flags, "mem.open_file");
        if flags.intersects(OpenFlags::WRITE_INTENT) {
            return Err(error(FsErrorKind::ReadOnlyFilesystem, "open", path));
        }
        let parts = components("open", path)?;
        let root = self.root.read();
        let names = match Self::lookup(&root, &parts) {
            None => return Err(error(FsErrorKind::NotFound, "open", path)),
            Some(Node::File(_)) if flags.contains(OpenFlags::DIRECTORY) => {
                return Err(error(FsErrorKind::NotADirectory, "open", path));
            }
            Some(Node::File(_)) => None,
            Some(Node::Dir(children)) => {
                let mut names: Vec<String> = children.keys().cloned().collect();
                if self.config.deterministic_readdir {
                    names.sort_unstable();
                }
                Some(names)
            }
        };
        Ok(MemFile {
            path: path.to_path_buf(),
            names,
            cursor: 0,
        })
    }
}

/// Handle returned by [`MemFs`]. Directory handles list the entries that
/// existed when the handle was opened.
#[derive(Debug)]
pub struct MemFile {
    path: PathBuf,
    names: Option<Vec<String>>,
    cursor: usize,
}

impl DirectoryFile for MemFile {
    fn read_dir_names(&mut self, limit: Option<usize>) -> Result<Vec<String>> {
        let Some(names) = &self.names else {
            return Err(error(FsErrorKind::NotADirectory, "readdirent", &self.path));
        };
        let rest = &names[self.cursor..];
        let take = limit.map_or(rest.len(), |n| n.min(rest.len()));
        self.cursor += take;
        Ok(rest[..take].to_vec())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
