//! The filesystem seen by walks.
//!
//! Walks consume a read-only, `/`-separated view of a tree. [`OsFs`]
//! adapts the host filesystem; tests supply in-memory trees. Paths handed
//! to a [`GlobFs`] are relative to the filesystem's own root, with `""`
//! naming the root itself.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from filesystem operations during a walk. These are surfaced to
/// walk callbacks rather than terminating the walk.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub(crate) fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            _ => FsError::Io {
                path: path.to_string(),
                source: err,
            },
        }
    }
}

/// Kind of directory entry, with lstat semantics: a symlink reports as a
/// symlink, never as its target's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A directory entry as reported to walk callbacks.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Name of the entry (not the full path).
    pub name: String,
    /// Kind of entry.
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

/// Read-only filesystem abstraction consumed by walks.
///
/// Implement this to glob over anything tree-shaped. Listings may come
/// back in any order; the walker sorts them.
#[async_trait]
pub trait GlobFs: Send + Sync {
    /// List the entries of a directory, each reported with lstat
    /// semantics (a symlink is a symlink, not its target's kind).
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError>;

    /// Metadata for a path, following symlinks. The walker uses this to
    /// decide whether a symlink stands in for a directory.
    async fn stat(&self, path: &str) -> Result<DirEntry, FsError>;
}

/// The host filesystem, rooted at a base directory.
pub struct OsFs {
    base: PathBuf,
}

impl OsFs {
    /// A view rooted at `base`. Walk paths that are themselves absolute
    /// bypass the base, so `OsFs::new(".")` serves absolute patterns too.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.base.clone()
        } else {
            self.base.join(path)
        }
    }
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

fn kind_of(ft: std::fs::FileType) -> EntryKind {
    if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

#[async_trait]
impl GlobFs for OsFs {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let full = self.resolve(path);
        let mut rd = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        let mut entries = Vec::new();
        while let Some(ent) = rd
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
        {
            let ft = ent
                .file_type()
                .await
                .map_err(|e| FsError::from_io(path, e))?;
            entries.push(DirEntry {
                name: ent.file_name().to_string_lossy().into_owned(),
                kind: kind_of(ft),
            });
        }
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<DirEntry, FsError> {
        let full = self.resolve(path);
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(DirEntry {
            name: entry_name(&full),
            kind: kind_of(meta.file_type()),
        })
    }
}
