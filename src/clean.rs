//! Artifact cleaner.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::task::{Step, StepError, StepResult};
use crate::utils::plural_count;

/// Recursively removes the output and intermediate directories.
///
/// Missing directories are skipped, so cleaning twice is not an error.
#[derive(Debug, Clone)]
pub struct Cleaner {
    dirs: Vec<PathBuf>,
}

impl Cleaner {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub async fn clean(&self) -> Result<usize, StepError> {
        let mut removed = 0;
        for dir in &self.dirs {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => {
                    crate::debug!("clean"; "removed {}", dir.display());
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StepError::Remove(dir.clone(), e)),
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl Step for Cleaner {
    fn name(&self) -> &str {
        "clean"
    }

    async fn execute(&self) -> Result<StepResult, StepError> {
        let removed = self.clean().await?;
        Ok(StepResult {
            source_missing: removed == 0,
            note: Some(format!("removed {}", plural_count(removed, "directory"))),
            ..StepResult::default()
        })
    }
}
