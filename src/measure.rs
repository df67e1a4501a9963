//! Size reporter for the output directory.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::{Compression, write::GzEncoder};
use jwalk::{Parallelism, WalkDir};

use crate::core::BuildMode;
use crate::task::{Step, StepError, StepResult};
use crate::utils::{format_bytes, plural_count};

/// Totals for one measured directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub label: String,
    pub files: usize,
    pub raw_bytes: u64,
    /// Sum of per-file gzip sizes at the best compression level.
    pub gzip_bytes: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {} (gzip {})",
            self.label,
            plural_count(self.files, "file"),
            format_bytes(self.raw_bytes),
            format_bytes(self.gzip_bytes)
        )
    }
}

/// Walk `dir` and total raw and gzip sizes of every regular file.
///
/// A missing directory measures as empty.
pub fn measure(dir: &Path, label: impl Into<String>) -> Result<Summary, StepError> {
    let mut summary = Summary {
        label: label.into(),
        files: 0,
        raw_bytes: 0,
        gzip_bytes: 0,
    };
    if !dir.is_dir() {
        return Ok(summary);
    }

    let walker = WalkDir::new(dir)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .sort(true);
    for entry in walker {
        let entry = entry.map_err(|e| StepError::Other(format!("walk {}: {e}", dir.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let bytes = std::fs::read(&path).map_err(|e| StepError::Read(path.clone(), e))?;

        summary.files += 1;
        summary.raw_bytes += bytes.len() as u64;
        summary.gzip_bytes += gzip_size(&bytes).map_err(|e| StepError::Read(path, e))?;
    }
    Ok(summary)
}

fn gzip_size(bytes: &[u8]) -> std::io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?.len() as u64)
}

/// Reports the size of the final output directory. Never modifies files.
#[derive(Debug, Clone)]
pub struct SizeReporter {
    dir: PathBuf,
    mode: BuildMode,
}

impl SizeReporter {
    pub fn new(dir: PathBuf, mode: BuildMode) -> Self {
        Self { dir, mode }
    }

    fn label(&self) -> String {
        format!("{} mode build", self.mode.label())
    }
}

#[async_trait]
impl Step for SizeReporter {
    fn name(&self) -> &str {
        "measure"
    }

    async fn execute(&self) -> Result<StepResult, StepError> {
        let dir = self.dir.clone();
        let label = self.label();
        let summary = tokio::task::spawn_blocking(move || measure(&dir, label))
            .await
            .map_err(|e| StepError::Other(format!("measure worker: {e}")))??;

        Ok(StepResult {
            source_missing: summary.files == 0,
            note: Some(summary.to_string()),
            ..StepResult::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_measure_counts_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets/styles")).unwrap();
        fs::write(dir.path().join("index.html"), "<p>hello</p>".repeat(50)).unwrap();
        fs::write(dir.path().join("assets/styles/main.css"), "a{color:red}").unwrap();

        let summary = measure(dir.path(), "Development mode build").unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.raw_bytes, 600 + 12);
        assert!(summary.gzip_bytes > 0);
        // Repetitive markup compresses well
        assert!(summary.gzip_bytes < summary.raw_bytes);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let summary = measure(&dir.path().join("dist"), "x").unwrap();
        assert_eq!(summary.files, 0);
        assert_eq!(summary.raw_bytes, 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = Summary {
            label: "Production mode build".into(),
            files: 3,
            raw_bytes: 48_200,
            gzip_bytes: 12_000,
        };
        assert_eq!(
            summary.to_string(),
            "Production mode build: 3 files, 48.2 kB (gzip 12.0 kB)"
        );
    }

    #[tokio::test]
    async fn test_reporter_leaves_files_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "content").unwrap();

        let result = SizeReporter::new(dir.path().to_path_buf(), BuildMode::Production)
            .execute()
            .await
            .unwrap();

        assert_eq!(result.files, 0);
        assert!(result.note.unwrap().starts_with("Production mode build: 1 file,"));
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "content");
    }
}
