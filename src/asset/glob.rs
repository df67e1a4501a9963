//! Glob sets and source collection.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};

/// A compiled set of glob patterns, matched against `/`-separated paths
/// relative to a base directory.
///
/// `*` never crosses a path separator; `**` does.
#[derive(Debug, Clone)]
pub struct Globs {
    set: GlobSet,
}

impl Globs {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern.as_ref())
                .literal_separator(true)
                .build()?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    /// Whether a path relative to the base matches any pattern.
    pub fn is_match(&self, rel: &Path) -> bool {
        self.set.is_match(rel)
    }
}

/// Collect files under `base` matching `globs`, as sorted relative paths.
///
/// Returns `None` when `base` is not a directory.
pub fn collect(base: &Path, globs: &Globs) -> Option<Vec<PathBuf>> {
    if !base.is_dir() {
        return None;
    }

    let mut files: Vec<PathBuf> = WalkDir::new(base)
        .parallelism(Parallelism::Serial)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(base).ok().map(Path::to_path_buf))
        .filter(|rel| globs.is_match(rel))
        .collect();
    files.sort();
    Some(files)
}
