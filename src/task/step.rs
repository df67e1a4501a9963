//! Steps: the leaves of the task graph.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::asset::{Globs, collect};
use crate::deploy::UploadError;
use crate::reload::{ReloadChannel, ReloadEvent, ReloadKind};
use crate::transform::{OutputFile, SourceFile, Transform, TransformError};

/// Outcome of one successful step execution.
#[derive(Debug, Clone, Default)]
pub struct StepResult {
    /// Output files written.
    pub files: usize,
    pub bytes_written: u64,
    /// Per-file failures that did not abort the step.
    pub errors: Vec<TransformError>,
    /// The base directory was absent or no file matched.
    pub source_missing: bool,
    /// Written paths, relative to the output directory.
    pub written: Vec<PathBuf>,
    /// Replaces the default file/byte summary when set.
    pub note: Option<String>,
}

impl StepResult {
    pub fn source_missing() -> Self {
        Self {
            source_missing: true,
            ..Self::default()
        }
    }
}

/// Step-level failure; aborts the step and the enclosing composite.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("cannot create `{}`", .0.display())]
    CreateDir(PathBuf, #[source] std::io::Error),

    #[error("cannot write `{}`", .0.display())]
    Write(PathBuf, #[source] std::io::Error),

    #[error("cannot remove `{}`", .0.display())]
    Remove(PathBuf, #[source] std::io::Error),

    #[error("cannot read `{}`", .0.display())]
    Read(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Transform(TransformError),

    #[error("all {failed} file(s) failed, first: {first}")]
    AllFailed { failed: usize, first: TransformError },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{0}")]
    Other(String),
}

/// A named unit of work.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self) -> Result<StepResult, StepError>;
}

/// Reads files matching `globs` under `base`, applies `transform` to each
/// and writes the outputs under `out_dir`, mirroring relative paths.
pub struct TransformStep {
    name: String,
    base: PathBuf,
    globs: Globs,
    out_dir: PathBuf,
    transform: Arc<dyn Transform>,
    notify: Option<(ReloadChannel, ReloadKind)>,
}

impl TransformStep {
    pub fn new(
        name: impl Into<String>,
        base: impl Into<PathBuf>,
        globs: Globs,
        out_dir: impl Into<PathBuf>,
        transform: Arc<dyn Transform>,
    ) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            globs,
            out_dir: out_dir.into(),
            transform,
            notify: None,
        }
    }

    /// Publish a reload event after each batch that wrote files.
    pub fn with_reload(mut self, channel: ReloadChannel, kind: ReloadKind) -> Self {
        self.notify = Some((channel, kind));
        self
    }

    async fn write(&self, output: OutputFile, result: &mut StepResult) -> Result<(), StepError> {
        let path = self.out_dir.join(&output.rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StepError::CreateDir(parent.to_path_buf(), e))?;
        }
        tokio::fs::write(&path, &output.bytes)
            .await
            .map_err(|e| StepError::Write(path.clone(), e))?;

        result.files += 1;
        result.bytes_written += output.bytes.len() as u64;
        result.written.push(output.rel);
        Ok(())
    }

    /// Fire-and-forget; the channel never blocks the step.
    fn publish(&self, result: &StepResult) {
        let Some((channel, kind)) = &self.notify else {
            return;
        };
        if result.files == 0 {
            return;
        }
        let event = match kind {
            ReloadKind::FullReload => ReloadEvent::full(),
            ReloadKind::StyleInject => ReloadEvent::styles(
                result.written.iter().map(|rel| url_path(rel)).collect(),
            ),
        };
        channel.broadcast(event);
    }
}

/// Whether an output path is a plain relative path under the output directory.
fn stays_inside(rel: &Path) -> bool {
    rel.components().next().is_some() && rel.components().all(|c| matches!(c, Component::Normal(_)))
}

/// `/`-separated URL path for an output-relative file.
fn url_path(rel: &Path) -> String {
    let mut url = String::new();
    for component in rel.components() {
        url.push('/');
        url.push_str(&component.as_os_str().to_string_lossy());
    }
    url
}

#[async_trait]
impl Step for TransformStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<StepResult, StepError> {
        // Created up front so an unwritable destination fails the step
        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| StepError::CreateDir(self.out_dir.clone(), e))?;

        let base = self.base.clone();
        let globs = self.globs.clone();
        let matched = tokio::task::spawn_blocking(move || collect(&base, &globs))
            .await
            .map_err(|e| StepError::Other(format!("scan worker: {e}")))?;

        let files = match matched {
            Some(files) if !files.is_empty() => files,
            _ => {
                crate::debug!(&self.name; "no sources in {}", self.base.display());
                return Ok(StepResult::source_missing());
            }
        };

        let mut result = StepResult::default();
        let mut succeeded = 0usize;
        for rel in files {
            let abs = self.base.join(&rel);
            let bytes = match tokio::fs::read(&abs).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    result
                        .errors
                        .push(TransformError::per_file(&rel, e.to_string()));
                    continue;
                }
            };

            match self.transform.apply(SourceFile { rel: rel.clone(), bytes }).await {
                Ok(outputs) => {
                    // Checked before writing so a rejected input leaves nothing behind
                    if let Some(bad) = outputs.iter().find(|o| !stays_inside(&o.rel)) {
                        result.errors.push(TransformError::per_file(
                            &rel,
                            format!("output `{}` escapes the output directory", bad.rel.display()),
                        ));
                        continue;
                    }
                    for output in outputs {
                        self.write(output, &mut result).await?;
                    }
                    succeeded += 1;
                }
                Err(e) if e.is_fatal() => return Err(StepError::Transform(e)),
                Err(e) => result.errors.push(e),
            }

            // Let sibling steps interleave between files
            tokio::task::yield_now().await;
        }

        if succeeded == 0
            && let Some(first) = result.errors.first()
        {
            return Err(StepError::AllFailed {
                failed: result.errors.len(),
                first: first.clone(),
            });
        }

        self.publish(&result);
        Ok(result)
    }
}
