//! Shared in-memory filesystem for walk tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use treeglob::{DirEntry, EntryKind, FsError, GlobFs, WalkControl, WalkFn};

/// In-memory tree with directory-symlink support.
///
/// Paths are `/`-separated and relative to the filesystem root; `""` names
/// the root. Symlinks resolve prefix-by-prefix, the way a real filesystem
/// resolves intermediate links.
#[derive(Default)]
pub struct MemoryFs {
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
    symlinks: HashMap<String, String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: &str) {
        if let Some((dir, _)) = path.rsplit_once('/') {
            self.add_dir(dir);
        }
        self.files.insert(path.to_string());
    }

    pub fn add_dir(&mut self, path: &str) {
        let mut current = String::new();
        for comp in path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(comp);
            self.dirs.insert(current.clone());
        }
    }

    /// A directory symlink: `link` points at `target` (also fs-relative).
    pub fn add_symlink(&mut self, link: &str, target: &str) {
        if let Some((dir, _)) = link.rsplit_once('/') {
            self.add_dir(dir);
        }
        self.symlinks.insert(link.to_string(), target.to_string());
    }

    /// Resolve symlinks in every prefix of `path`.
    fn resolve(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        let mut resolved = String::new();
        for comp in path.split('/') {
            if !resolved.is_empty() {
                resolved.push('/');
            }
            resolved.push_str(comp);
            let mut hops = 0;
            while let Some(target) = self.symlinks.get(&resolved) {
                resolved = target.clone();
                hops += 1;
                if hops > 40 {
                    break;
                }
            }
        }
        resolved
    }

    fn kind_at(&self, resolved: &str) -> Option<EntryKind> {
        if resolved.is_empty() {
            Some(EntryKind::Directory)
        } else if self.files.contains(resolved) {
            Some(EntryKind::File)
        } else if self.dirs.contains(resolved) {
            Some(EntryKind::Directory)
        } else {
            None
        }
    }
}

fn name_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((_, name)) => name.to_string(),
        None if path.is_empty() => ".".to_string(),
        None => path.to_string(),
    }
}

#[async_trait]
impl GlobFs for MemoryFs {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let resolved = self.resolve(path);
        if self.kind_at(&resolved) != Some(EntryKind::Directory) {
            return Err(FsError::NotFound(path.to_string()));
        }

        let prefix = if resolved.is_empty() {
            String::new()
        } else {
            format!("{resolved}/")
        };
        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for dir in &self.dirs {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    children.entry(rest.to_string()).or_insert(EntryKind::Directory);
                }
            }
        }
        for file in &self.files {
            if let Some(rest) = file.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    children.entry(rest.to_string()).or_insert(EntryKind::File);
                }
            }
        }
        for link in self.symlinks.keys() {
            if let Some(rest) = link.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    children.insert(rest.to_string(), EntryKind::Symlink);
                }
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, kind)| DirEntry { name, kind })
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<DirEntry, FsError> {
        let resolved = self.resolve(path);
        match self.kind_at(&resolved) {
            Some(kind) => Ok(DirEntry {
                name: name_of(path),
                kind,
            }),
            None => Err(FsError::NotFound(path.to_string())),
        }
    }
}

/// The walk fixture used across the glob tests, optionally nested under a
/// prefix:
///
/// ```text
/// m
/// a/b/cad/m
/// a/b/cd/elf/g/j/absurdity/m
/// a/b/cid          -> a/b/cod           (symlink)
/// a/b/cod/erf/h/k/{m, n/m}
/// a/b/cod/erf/i    -> a/b/cod/erf/h/k   (symlink)
/// spec/{foo_spec.rb, bar_spec.rb, foo.rb, model/qux_spec.rb, snake/eyes.rb}
/// ```
pub fn fixture_tree_at(prefix: &str) -> MemoryFs {
    let at = |p: &str| {
        if prefix.is_empty() {
            p.to_string()
        } else {
            format!("{prefix}/{p}")
        }
    };
    let mut fs = MemoryFs::new();
    fs.add_file(&at("m"));
    fs.add_dir(&at("a/b/cad"));
    fs.add_file(&at("a/b/cad/m"));
    fs.add_file(&at("a/b/cd/elf/g/j/absurdity/m"));
    fs.add_file(&at("a/b/cod/erf/h/k/m"));
    fs.add_file(&at("a/b/cod/erf/h/k/n/m"));
    fs.add_symlink(&at("a/b/cid"), &at("a/b/cod"));
    fs.add_symlink(&at("a/b/cod/erf/i"), &at("a/b/cod/erf/h/k"));
    fs.add_file(&at("spec/foo_spec.rb"));
    fs.add_file(&at("spec/bar_spec.rb"));
    fs.add_file(&at("spec/foo.rb"));
    fs.add_file(&at("spec/model/qux_spec.rb"));
    fs.add_file(&at("spec/snake/eyes.rb"));
    fs
}

pub fn fixture_tree() -> MemoryFs {
    fixture_tree_at("fixtures")
}

/// A callback that records every invocation.
pub struct Recorder {
    calls: Arc<Mutex<Vec<(String, bool)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn callback(&self) -> WalkFn {
        let calls = self.calls.clone();
        Arc::new(move |path, _entry, err| {
            calls
                .lock()
                .expect("recorder poisoned")
                .push((path.to_string(), err.is_some()));
            WalkControl::Continue
        })
    }

    /// Paths recorded without an error, in invocation order.
    pub fn paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("recorder poisoned")
            .iter()
            .filter(|(_, errored)| !errored)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Paths recorded without an error, sorted.
    pub fn sorted_paths(&self) -> Vec<String> {
        let mut paths = self.paths();
        paths.sort();
        paths
    }

    /// Paths recorded with an error attached.
    pub fn errored_paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("recorder poisoned")
            .iter()
            .filter(|(_, errored)| *errored)
            .map(|(path, _)| path.clone())
            .collect()
    }
}
