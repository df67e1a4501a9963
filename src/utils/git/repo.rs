use std::path::Path;

use anyhow::{Result, bail};
use gix::{ObjectId, Repository, bstr::BString};

use super::tree::TreeBuilder;

/// Identity used when git has no `user.name`/`user.email` configured.
const FALLBACK_NAME: &str = "pagewright";
const FALLBACK_EMAIL: &str = "pagewright@localhost";

/// Create a bare repository at `path`.
pub fn create_bare_repo(path: &Path) -> Result<Repository> {
    Ok(gix::init_bare(path)?)
}

/// Write the contents of `dir` as a parentless commit and return its id.
///
/// `dir` is only read; no index or work tree is involved, so the commit
/// exists in the object database until something references it.
pub fn commit_dir(repo: &Repository, dir: &Path, message: &str) -> Result<ObjectId> {
    if message.trim().is_empty() {
        bail!("Commit message cannot be empty");
    }

    let tree = TreeBuilder::new(repo).build_from_dir(dir)?;
    let tree_id = repo.write_object(&tree)?.detach();

    let signature = signature(repo);
    let commit = gix::objs::Commit {
        tree: tree_id,
        parents: Default::default(),
        author: signature.clone(),
        committer: signature,
        encoding: None,
        message: BString::from(format!("{}\n", message.trim())),
        extra_headers: Vec::new(),
    };
    Ok(repo.write_object(&commit)?.detach())
}

fn signature(repo: &Repository) -> gix::actor::Signature {
    let (name, email) = match repo.committer() {
        Some(Ok(sig)) => (sig.name.to_owned(), sig.email.to_owned()),
        _ => (BString::from(FALLBACK_NAME), BString::from(FALLBACK_EMAIL)),
    };
    gix::actor::Signature {
        name,
        email,
        time: gix::date::Time::now_local_or_utc(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entry_names(repo: &Repository, tree_id: ObjectId) -> Vec<String> {
        let tree = repo.find_object(tree_id).unwrap().into_tree();
        tree.decode()
            .unwrap()
            .entries
            .iter()
            .map(|e| e.filename.to_string())
            .collect()
    }

    #[test]
    fn test_commit_dir_snapshots_tree() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("dist");
        fs::create_dir_all(site.join("assets")).unwrap();
        fs::write(site.join("index.html"), "<p>hi</p>").unwrap();
        fs::write(site.join("assets/app.js"), "run()").unwrap();

        let repo = create_bare_repo(&dir.path().join("repo.git")).unwrap();
        let id = commit_dir(&repo, &site, "Publish").unwrap();

        let commit = repo.find_object(id).unwrap().into_commit();
        assert_eq!(commit.message_raw().unwrap(), "Publish\n");
        let tree_id = commit.tree_id().unwrap().detach();
        assert_eq!(entry_names(&repo, tree_id), ["assets", "index.html"]);
        // Nothing is written into the published directory
        assert!(!site.join(".git").exists());
    }

    #[test]
    fn test_commit_empty_dir() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("dist");
        fs::create_dir_all(&site).unwrap();

        let repo = create_bare_repo(&dir.path().join("repo.git")).unwrap();
        let id = commit_dir(&repo, &site, "Empty").unwrap();
        let tree_id = repo.find_object(id).unwrap().into_commit().tree_id().unwrap().detach();
        assert!(entry_names(&repo, tree_id).is_empty());
    }

    #[test]
    fn test_blank_message_rejected() {
        let dir = TempDir::new().unwrap();
        let repo = create_bare_repo(&dir.path().join("repo.git")).unwrap();
        assert!(commit_dir(&repo, dir.path(), "  ").is_err());
    }
}
