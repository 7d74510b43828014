//! File-system boundary.
//!
//! The language core never touches `std::fs` directly.  Enumeration and
//! metadata go through the [`FileSystem`] trait:
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`RealFs`] | `std::fs`, timestamps converted with `chrono` |
//! | [`MemFs`]  | an in-memory tree, with a counter of metadata calls |
//!
//! Paths are plain strings; [`join`] and the name helpers below define how
//! relative element paths combine with a location.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::trace;

use crate::script::time::{Precision, Time};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Everything a single metadata call answers.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub is_dir: bool,
    pub size: u64,
    pub access: Option<Time>,
    pub change: Option<Time>,
    pub creation: Option<Time>,
    pub modification: Option<Time>,
    pub hidden: bool,
    pub readonly: bool,
    pub archive: bool,
    pub compressed: bool,
    pub encrypted: bool,
}

pub trait FileSystem {
    /// Entries of `dir`, sorted by name.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// `None` when nothing exists at `path`.
    fn metadata(&self, path: &Path) -> Option<Metadata>;

    fn is_empty_dir(&self, path: &Path) -> bool {
        self.read_dir(path).map(|e| e.is_empty()).unwrap_or(false)
    }

    /// Total size of every file below `path`.
    fn dir_size(&self, path: &Path) -> u64 {
        let mut total = 0;
        let mut stack = vec![path.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = self.read_dir(&dir) else { continue };
            for e in entries {
                let p = dir.join(&e.name);
                if e.is_dir {
                    stack.push(p);
                } else if let Some(m) = self.metadata(&p) {
                    total += m.size;
                }
            }
        }
        total
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Resolve `path` against `location`.  Absolute paths are kept.
pub fn join(location: &str, path: &str) -> String {
    if path.is_empty() {
        return location.to_string();
    }
    let p = Path::new(path);
    if p.is_absolute() || location.is_empty() {
        return path.to_string();
    }
    Path::new(location).join(p).to_string_lossy().into_owned()
}

/// Final component, with extension.
pub fn fullname(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Final component, without extension.
pub fn name(path: &str) -> String {
    let full = fullname(path);
    match full.rfind('.') {
        Some(0) | None => full,
        Some(i) => full[..i].to_string(),
    }
}

/// Lowercase extension without the dot, or empty.
pub fn extension(path: &str) -> String {
    let full = fullname(path);
    match full.rfind('.') {
        Some(0) | None => String::new(),
        Some(i) => full[i + 1..].to_lowercase(),
    }
}

pub fn parent(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Drive prefix on platforms that have one, empty otherwise.
pub fn drive(path: &str) -> String {
    match Path::new(path).components().next() {
        Some(Component::Prefix(p)) => p.as_os_str().to_string_lossy().into_owned(),
        _ => String::new(),
    }
}

/// Whether `path` names the current or parent directory.
pub fn is_browse_path(name: &str) -> bool {
    name == "." || name == ".."
}

// ── std::fs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

fn to_time(t: io::Result<SystemTime>) -> Option<Time> {
    let t = t.ok()?;
    let local: DateTime<Local> = t.into();
    Some(Time::from_naive(local.naive_local(), Precision::Clock))
}

impl FileSystem for RealFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            out.push(DirEntry { name: entry.file_name().to_string_lossy().into_owned(), is_dir });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn metadata(&self, path: &Path) -> Option<Metadata> {
        let m = fs::metadata(path).ok()?;
        trace!(path = %path.display(), "metadata");
        let modification = to_time(m.modified());
        Some(Metadata {
            is_dir: m.is_dir(),
            size: m.len(),
            access: to_time(m.accessed()),
            change: modification,
            creation: to_time(m.created()),
            modification,
            hidden: fullname(&path.to_string_lossy()).starts_with('.'),
            readonly: m.permissions().readonly(),
            archive: false,
            compressed: false,
            encrypted: false,
        })
    }
}

// ── In-memory tree ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct MemNode {
    is_dir: bool,
    size: u64,
    creation: Time,
    modification: Time,
    hidden: bool,
    readonly: bool,
}

/// In-memory file tree with deterministic listings.
#[derive(Debug, Default)]
pub struct MemFs {
    nodes: BTreeMap<PathBuf, MemNode>,
    metadata_calls: Cell<usize>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_parents(&mut self, path: &Path, stamp: Time) {
        let mut cur = path.parent();
        while let Some(p) = cur {
            if p.as_os_str().is_empty() {
                break;
            }
            self.nodes.entry(p.to_path_buf()).or_insert(MemNode {
                is_dir: true,
                size: 0,
                creation: stamp,
                modification: stamp,
                hidden: false,
                readonly: false,
            });
            cur = p.parent();
        }
    }

    pub fn add_dir(&mut self, path: &str, stamp: Time) {
        let p = PathBuf::from(path);
        self.insert_parents(&p, stamp);
        self.nodes.insert(
            p,
            MemNode { is_dir: true, size: 0, creation: stamp, modification: stamp, hidden: false, readonly: false },
        );
    }

    pub fn add_file(&mut self, path: &str, size: u64, stamp: Time) {
        let p = PathBuf::from(path);
        self.insert_parents(&p, stamp);
        self.nodes.insert(
            p,
            MemNode { is_dir: false, size, creation: stamp, modification: stamp, hidden: false, readonly: false },
        );
    }

    pub fn set_hidden(&mut self, path: &str, hidden: bool) {
        if let Some(n) = self.nodes.get_mut(Path::new(path)) {
            n.hidden = hidden;
        }
    }

    pub fn set_readonly(&mut self, path: &str, readonly: bool) {
        if let Some(n) = self.nodes.get_mut(Path::new(path)) {
            n.readonly = readonly;
        }
    }

    /// Number of [`FileSystem::metadata`] calls answered so far.
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.get()
    }
}

impl FileSystem for MemFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        match self.nodes.get(dir) {
            Some(n) if n.is_dir => {}
            _ => return Err(io::Error::new(io::ErrorKind::NotFound, "not a directory")),
        }
        let out = self
            .nodes
            .range(dir.to_path_buf()..)
            .skip(1)
            .filter(|(p, _)| p.parent() == Some(dir))
            .map(|(p, n)| DirEntry { name: fullname(&p.to_string_lossy()), is_dir: n.is_dir })
            .collect();
        Ok(out)
    }

    fn metadata(&self, path: &Path) -> Option<Metadata> {
        self.metadata_calls.set(self.metadata_calls.get() + 1);
        let n = self.nodes.get(path)?;
        Some(Metadata {
            is_dir: n.is_dir,
            size: n.size,
            access: Some(n.modification),
            change: Some(n.modification),
            creation: Some(n.creation),
            modification: Some(n.modification),
            hidden: n.hidden,
            readonly: n.readonly,
            archive: false,
            compressed: false,
            encrypted: false,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> Time {
        Time::date(1, 1, 2020)
    }

    #[test]
    fn name_helpers() {
        assert_eq!(fullname("/a/b/report.PDF"), "report.PDF");
        assert_eq!(name("/a/b/report.PDF"), "report");
        assert_eq!(extension("/a/b/report.PDF"), "pdf");
        assert_eq!(extension("/a/.hidden"), "");
        assert_eq!(name("/a/.hidden"), ".hidden");
        assert_eq!(parent("/a/b/report.PDF"), "/a/b");
        assert_eq!(join("/a", "b/c.txt"), "/a/b/c.txt");
        assert_eq!(join("/a", "/x"), "/x");
    }

    #[test]
    fn memfs_listing_is_direct_children_only() {
        let mut fs = MemFs::new();
        fs.add_file("/w/a.txt", 3, stamp());
        fs.add_file("/w/sub/b.txt", 4, stamp());
        fs.add_file("/wx/c.txt", 5, stamp());
        let names: Vec<_> = fs.read_dir(Path::new("/w")).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a.txt", "sub"]);
        assert_eq!(fs.dir_size(Path::new("/w")), 7);
    }

    #[test]
    fn memfs_counts_metadata_calls() {
        let mut fs = MemFs::new();
        fs.add_file("/w/a.txt", 3, stamp());
        assert!(fs.metadata(Path::new("/w/a.txt")).is_some());
        assert!(fs.metadata(Path::new("/w/none")).is_none());
        assert_eq!(fs.metadata_calls(), 2);
    }

    #[test]
    fn real_fs_lists_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"12").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();
        let entries = RealFs.read_dir(dir.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
        assert!(entries[2].is_dir);
        let m = RealFs.metadata(&dir.path().join("b.txt")).unwrap();
        assert_eq!(m.size, 2);
        assert!(m.modification.is_some());
        assert!(RealFs.is_empty_dir(&dir.path().join("c")));
    }
}
