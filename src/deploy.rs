//! Upload adapter: publishes the output directory to a git branch.
//!
//! The output directory is committed into a throwaway bare repository,
//! so nothing is copied into it and the project's own repository is
//! untouched apart from reading the remote URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::utils::git;
use crate::{debug, log};
use crate::task::{Step, StepError, StepResult};
use crate::utils::exec::{Cmd, format_error};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("nothing to upload: `{}` is not a directory", .0.display())]
    MissingDir(PathBuf),

    #[error("cannot run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Command(String),

    #[error("cannot commit the output directory: {0}")]
    Commit(String),

    #[error("cannot resolve remote `{remote}`: {message}")]
    Remote { remote: String, message: String },
}

/// Publishes a directory somewhere. `describe` names the target for logs.
#[async_trait]
pub trait Uploader: Send + Sync {
    fn describe(&self) -> String;

    async fn upload(&self, dir: &Path) -> Result<(), UploadError>;
}

/// Force-pushes a single commit with the directory's content to a branch.
#[derive(Debug, Clone)]
pub struct GitBranchUploader {
    root: PathBuf,
    remote: String,
    branch: String,
    message: String,
}

impl GitBranchUploader {
    pub fn new(
        root: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            remote: remote.into(),
            branch: branch.into(),
            message: message.into(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(
            &config.root,
            &config.deploy.remote,
            &config.deploy.branch,
            &config.deploy.message,
        )
    }

    /// A remote name is looked up in the project repository. URLs and
    /// absolute paths are used as-is; relative paths are resolved against
    /// the project root.
    async fn remote_url(&self) -> Result<String, UploadError> {
        if !is_remote_name(&self.remote) {
            return Ok(self.resolve_location(&self.remote));
        }
        let cmd = Cmd::new("git")
            .args(["remote", "get-url", &self.remote])
            .cwd(&self.root);
        let output = run(&cmd).await.map_err(|e| UploadError::Remote {
            remote: self.remote.clone(),
            message: e.to_string(),
        })?;
        Ok(self.resolve_location(String::from_utf8_lossy(&output.stdout).trim()))
    }

    fn resolve_location(&self, location: &str) -> String {
        let path = Path::new(location);
        if location.contains("://") || path.is_absolute() {
            return location.to_string();
        }
        // scp-like `host:path`
        if location.contains(':') {
            return location.to_string();
        }
        self.root.join(path).to_string_lossy().into_owned()
    }

    /// Commit `dir` into a bare repository at `git_dir` and force-push it.
    async fn publish(&self, git_dir: &Path, dir: &Path, url: &str) -> Result<(), UploadError> {
        let (repo_dir, site, message) = (git_dir.to_path_buf(), dir.to_path_buf(), self.message.clone());
        let commit = tokio::task::spawn_blocking(move || {
            let repo = git::create_bare_repo(&repo_dir)?;
            git::commit_dir(&repo, &site, &message)
        })
        .await
        .map_err(|e| UploadError::Commit(e.to_string()))?
        .map_err(|e| UploadError::Commit(format!("{e:#}")))?;
        debug!("deploy"; "commit {commit}");

        let refspec = format!("{commit}:refs/heads/{}", self.branch);
        let push = Cmd::new("git")
            .arg(format!("--git-dir={}", git_dir.display()))
            .args(["push", "--force", "--quiet", url, &refspec])
            .env("GIT_TERMINAL_PROMPT", "0")
            .cwd(&self.root);
        run(&push).await?;
        Ok(())
    }
}

/// Plain remote names carry no path or URL syntax.
fn is_remote_name(remote: &str) -> bool {
    !remote.contains([':', '/', '\\'])
}

#[async_trait]
impl Uploader for GitBranchUploader {
    fn describe(&self) -> String {
        format!("{} ({})", self.branch, self.remote)
    }

    async fn upload(&self, dir: &Path) -> Result<(), UploadError> {
        if !dir.is_dir() {
            return Err(UploadError::MissingDir(dir.to_path_buf()));
        }
        let url = self.remote_url().await?;

        let git_dir =
            std::env::temp_dir().join(format!("pagewright-deploy-{}", std::process::id()));
        let _ = tokio::fs::remove_dir_all(&git_dir).await;
        let result = self.publish(&git_dir, dir, &url).await;
        let _ = tokio::fs::remove_dir_all(&git_dir).await;
        result
    }
}

async fn run(cmd: &Cmd) -> Result<std::process::Output, UploadError> {
    let output = cmd.output().await.map_err(|source| UploadError::Spawn {
        program: cmd.program_name(),
        source,
    })?;
    if !output.status.success() {
        return Err(UploadError::Command(format_error(cmd, &output)));
    }
    Ok(output)
}

/// Leaf step wrapping an [`Uploader`].
pub struct UploadStep {
    uploader: Arc<dyn Uploader>,
    dir: PathBuf,
}

impl UploadStep {
    pub fn new(uploader: Arc<dyn Uploader>, dir: PathBuf) -> Self {
        Self { uploader, dir }
    }
}

#[async_trait]
impl Step for UploadStep {
    fn name(&self) -> &str {
        "upload"
    }

    async fn execute(&self) -> Result<StepResult, StepError> {
        let target = self.uploader.describe();
        log!("deploy"; "uploading {} to {}", self.dir.display(), target);
        self.uploader.upload(&self.dir).await?;
        Ok(StepResult {
            note: Some(format!("published to {target}")),
            ..StepResult::default()
        })
    }
}
