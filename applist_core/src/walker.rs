/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::walker
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Sum the sizes of all regular files beneath a directory so
    package data and cache footprints can be reported.

  Security / Safety Notes:
    Read-only traversal. Symbolic links are neither followed
    nor counted.

  Dependencies:
    walkdir for the traversal itself.

  Operational Scope:
    Invoked by the inventory builder once per package data
    root and once per cache root.

  Revision History:
    2026-10-19 COD  Authored iterative directory walker.
    2026-10-19 COD  Moved traversal onto walkdir; prune via
                    skip_current_dir.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Missing directories measure as zero, never as errors
    - Per-entry failures are counted and skipped
    - Iterative traversal, no call-stack recursion
============================================================*/

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Running totals gathered by one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorySize {
    pub bytes: u64,
    pub files: u64,
    /// Entries that could not be listed or stat'ed.
    pub skipped: u64,
}

impl DirectorySize {
    fn add_file(&mut self, len: u64) {
        self.bytes = self.bytes.saturating_add(len);
        self.files += 1;
    }
}

/// Iterative size walker with optional pruned subtrees.
#[derive(Debug, Clone, Default)]
pub struct SizeWalker {
    pruned: Vec<PathBuf>,
}

impl SizeWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude `path` and everything beneath it from subsequent walks.
    pub fn prune<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.pruned.push(path.into());
        self
    }

    /// Walk `root` and return the accumulated totals.
    ///
    /// A missing root yields an all-zero result. A root that is a
    /// regular file measures as that single file.
    pub fn measure(&self, root: &Path) -> DirectorySize {
        let mut total = DirectorySize::default();

        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .follow_root_links(false)
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 && is_not_found(&err) => return total,
                Err(_) => {
                    total.skipped += 1;
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if self.is_pruned(entry.path()) {
                    walker.skip_current_dir();
                }
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(meta) => total.add_file(meta.len()),
                    Err(_) => total.skipped += 1,
                }
            }
        }

        total
    }

    fn is_pruned(&self, path: &Path) -> bool {
        self.pruned.iter().any(|pruned| pruned == path)
    }
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

/// Total size in bytes of all regular files beneath `path`; 0 when absent.
pub fn directory_size(path: &Path) -> u64 {
    SizeWalker::new().measure(path).bytes
}
