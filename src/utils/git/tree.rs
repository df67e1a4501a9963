use std::{fs, path::Path};

use anyhow::{Result, anyhow};
use gix::{
    Repository,
    bstr::BString,
    objs::{Tree, tree},
};

/// Writes blobs and trees for a directory into a repository's object store.
pub struct TreeBuilder<'a> {
    repo: &'a Repository,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Build a git tree from a directory, recursing into subdirectories.
    ///
    /// Nested `.git` entries are skipped; everything else is published.
    pub fn build_from_dir(&self, dir: &Path) -> Result<Tree> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let filename = file_name(&entry)?;
            if filename == ".git" {
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                let sub_tree = self.build_from_dir(&path)?;
                let oid = self.repo.write_object(&sub_tree)?.detach();
                entries.push(tree::Entry {
                    mode: tree::EntryKind::Tree.into(),
                    oid,
                    filename,
                });
            } else if path.is_file() {
                let oid = self.repo.write_blob(fs::read(&path)?)?.detach();
                entries.push(tree::Entry {
                    mode: tree::EntryKind::Blob.into(),
                    oid,
                    filename,
                });
            }
        }

        sort_tree_entries(&mut entries);
        Ok(Tree { entries })
    }
}

fn file_name(entry: &fs::DirEntry) -> Result<BString> {
    entry
        .file_name()
        .into_string()
        .map(Into::into)
        .map_err(|name| anyhow!("non UTF-8 file name {name:?}"))
}

/// Git tree order: names compared as bytes, directories as if they ended
/// with `/`.
fn sort_tree_entries(entries: &mut [tree::Entry]) {
    let tree_mode: tree::EntryMode = tree::EntryKind::Tree.into();
    entries.sort_by_cached_key(|e| {
        let mut key = e.filename.to_vec();
        if e.mode == tree_mode {
            key.push(b'/');
        }
        key
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use gix::objs::tree::{Entry, EntryKind};

    fn entry(kind: EntryKind, name: &str) -> Entry {
        Entry {
            mode: kind.into(),
            filename: name.into(),
            oid: gix::ObjectId::null(gix::hash::Kind::Sha1),
        }
    }

    #[test]
    fn test_directories_sort_with_trailing_slash() {
        // "app-old" (45) < "app.js" (46) < "app/" (47)
        let mut entries = vec![
            entry(EntryKind::Blob, "app.js"),
            entry(EntryKind::Tree, "app"),
            entry(EntryKind::Blob, "app-old"),
        ];
        sort_tree_entries(&mut entries);

        let names: Vec<_> = entries.iter().map(|e| e.filename.to_string()).collect();
        assert_eq!(names, ["app-old", "app.js", "app"]);
    }
}
