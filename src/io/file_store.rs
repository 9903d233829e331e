use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use crate::io::atomic::atomic_write;
use crate::io::layout::{CAPTURE_FILE, CONFIG_FILE, INBOX_FILE};

/// Path segments that are never served, anywhere in a path
const DENIED_SEGMENTS: &[&str] = &[
    "node_modules",
    ".git",
    ".env",
    CONFIG_FILE,
    "package.json",
    "package-lock.json",
];

/// Files that may be edited but not deleted
const PROTECTED_FILES: &[&str] = &["README.md", "HOWTOUSE.md", CONFIG_FILE];

/// Top-level entries shown by the tree listing
const TREE_ROOT_ALLOWED: &[&str] = &[
    "projects",
    "daily",
    "inbox",
    "ideas",
    INBOX_FILE,
    CAPTURE_FILE,
    "HOWTOUSE.md",
];

/// Top-level files listed before everything else, in this order
const TREE_ROOT_FIRST: &[&str] = &[CAPTURE_FILE, INBOX_FILE];

/// Directories hidden at every level
const TREE_HIDDEN: &[&str] = &["node_modules", "ide"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid or unsafe file path")]
    Forbidden(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        source: std::io::Error,
    },
}

/// File content with the stats the editor needs for its next write
#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    pub content: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Result of a write: conflicts are an expected outcome, not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written {
        modified: DateTime<Utc>,
    },
    Conflict {
        current_content: String,
        modified: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

/// One entry of the filtered file tree
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    /// Relative to the data directory, `/`-separated
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

/// Sandboxed file operations over the data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path inside the root, rejecting anything unsafe
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, StoreError> {
        let rel = rel.trim();
        if rel.is_empty() {
            return Err(StoreError::InvalidPath("empty path".to_string()));
        }
        let mut resolved = self.root.clone();
        for component in Path::new(rel).components() {
            match component {
                Component::Normal(seg) => {
                    let name = seg.to_string_lossy();
                    if DENIED_SEGMENTS.iter().any(|d| *d == name) {
                        tracing::warn!("rejected path with a denied segment");
                        return Err(StoreError::Forbidden(rel.to_string()));
                    }
                    resolved.push(seg);
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    tracing::warn!("rejected path outside the data directory");
                    return Err(StoreError::Forbidden(rel.to_string()));
                }
            }
        }
        if resolved == self.root {
            return Err(StoreError::InvalidPath(rel.to_string()));
        }
        Ok(resolved)
    }

    pub fn exists(&self, rel: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(rel)?.exists())
    }

    pub fn read(&self, rel: &str) -> Result<FileContent, StoreError> {
        let path = self.resolve(rel)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(rel.to_string()));
        }
        let content = fs::read_to_string(&path).map_err(|e| io_err("read", rel, e))?;
        let meta = fs::metadata(&path).map_err(|e| io_err("stat", rel, e))?;
        Ok(FileContent {
            content,
            size: meta.len(),
            modified: mtime_of(&path).map_err(|e| io_err("stat", rel, e))?,
        })
    }

    /// Modification time, or `None` for a missing file
    pub fn modified(&self, rel: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let path = self.resolve(rel)?;
        if !path.exists() {
            return Ok(None);
        }
        mtime_of(&path)
            .map(Some)
            .map_err(|e| io_err("stat", rel, e))
    }

    /// The conflict a write asserting `expected` would hit, if any.
    /// A file whose mtime is strictly newer than `expected` has changed.
    pub fn detect_conflict(
        &self,
        rel: &str,
        expected: Option<DateTime<Utc>>,
    ) -> Result<Option<WriteOutcome>, StoreError> {
        let Some(expected) = expected else {
            return Ok(None);
        };
        let Some(current) = self.modified(rel)? else {
            return Ok(None);
        };
        if current > expected.trunc_subsecs(3) {
            let current_content = self.read(rel)?.content;
            tracing::info!(path = rel, "write conflict");
            return Ok(Some(WriteOutcome::Conflict {
                current_content,
                modified: current,
            }));
        }
        Ok(None)
    }

    /// Write with optimistic concurrency control
    pub fn write(
        &self,
        rel: &str,
        content: &str,
        expected: Option<DateTime<Utc>>,
    ) -> Result<WriteOutcome, StoreError> {
        if let Some(conflict) = self.detect_conflict(rel, expected)? {
            return Ok(conflict);
        }
        let modified = self.write_unchecked(rel, content)?;
        Ok(WriteOutcome::Written { modified })
    }

    /// Write without a conflict check, returning the new mtime
    pub fn write_unchecked(&self, rel: &str, content: &str) -> Result<DateTime<Utc>, StoreError> {
        let path = self.resolve(rel)?;
        if path.is_dir() {
            return Err(StoreError::InvalidPath(rel.to_string()));
        }
        atomic_write(&path, content.as_bytes()).map_err(|e| io_err("write", rel, e))?;
        mtime_of(&path).map_err(|e| io_err("stat", rel, e))
    }

    pub fn create_file(&self, rel: &str, content: &str) -> Result<DateTime<Utc>, StoreError> {
        let path = self.resolve(rel)?;
        if path.exists() {
            return Err(StoreError::AlreadyExists(rel.to_string()));
        }
        self.write_unchecked(rel, content)
    }

    pub fn create_dir(&self, rel: &str) -> Result<(), StoreError> {
        let path = self.resolve(rel)?;
        if path.exists() {
            return Err(StoreError::AlreadyExists(rel.to_string()));
        }
        fs::create_dir_all(&path).map_err(|e| io_err("mkdir", rel, e))
    }

    /// Delete a file, or a directory recursively
    pub fn delete(&self, rel: &str) -> Result<(), StoreError> {
        let path = self.resolve(rel)?;
        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && PROTECTED_FILES.contains(&name)
        {
            return Err(StoreError::Forbidden(rel.to_string()));
        }
        if !path.exists() {
            return Err(StoreError::NotFound(rel.to_string()));
        }
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| io_err("delete", rel, e))
        } else {
            fs::remove_file(&path).map_err(|e| io_err("delete", rel, e))
        }
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        if !src.exists() {
            return Err(StoreError::NotFound(from.to_string()));
        }
        if dst.exists() {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err("mkdir", to, e))?;
        }
        fs::rename(&src, &dst).map_err(|e| io_err("rename", from, e))
    }

    /// The filtered tree the editor shows
    pub fn list_tree(&self) -> Result<Vec<TreeNode>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        build_tree(&self.root, "")
    }
}

fn build_tree(dir: &Path, base: &str) -> Result<Vec<TreeNode>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|e| io_err("list", base, e))?;
    let mut nodes = Vec::new();

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || TREE_HIDDEN.contains(&name.as_str()) {
            continue;
        }
        if base.is_empty() && !TREE_ROOT_ALLOWED.contains(&name.as_str()) {
            continue;
        }
        let rel = if base.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", base, name)
        };
        let path = entry.path();
        if path.is_dir() {
            let children = build_tree(&path, &rel)?;
            nodes.push(TreeNode {
                kind: NodeKind::Directory,
                name,
                path: rel,
                children: Some(children),
            });
        } else {
            nodes.push(TreeNode {
                kind: NodeKind::File,
                name,
                path: rel,
                children: None,
            });
        }
    }

    let at_root = base.is_empty();
    nodes.sort_by(|a, b| {
        if at_root {
            let rank = |n: &TreeNode| {
                TREE_ROOT_FIRST
                    .iter()
                    .position(|f| *f == n.name)
                    .unwrap_or(TREE_ROOT_FIRST.len())
            };
            let order = rank(a).cmp(&rank(b));
            if order.is_ne() {
                return order;
            }
        }
        let dirs_first = |n: &TreeNode| n.kind != NodeKind::Directory;
        dirs_first(a)
            .cmp(&dirs_first(b))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(nodes)
}

/// mtime at millisecond precision, the resolution editors round-trip
pub fn mtime_of(path: &Path) -> std::io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified).trunc_subsecs(3))
}

fn io_err(op: &'static str, path: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        op,
        path: path.to_string(),
        source,
    }
}
