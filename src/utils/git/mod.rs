//! In-process git objects for publishing a directory.
//!
//! Repository creation and commits go through `gix`; pushing is left to
//! the `git` CLI, which already knows the user's credentials.

mod repo;
mod tree;

pub use repo::{commit_dir, create_bare_repo};
