//! Per-file transforms.
//!
//! A transform maps one source file to zero or more output files. Steps
//! depend only on the [`Transform`] trait; the concrete variants live in
//! the submodules:
//!
//! | Transform          | Input                     | Output                     |
//! |--------------------|---------------------------|----------------------------|
//! | `StyleTransform`   | `.css/.scss/.sass/.less`  | `.css` (partials skipped)  |
//! | `ScriptTransform`  | `.js/.mjs/.ts`            | regenerated `.js`          |
//! | `PageTransform`    | handlebars `.html`        | rendered `.html`           |
//! | `ImageTransform`   | images                    | recompressed PNG, others as-is |
//! | `CopyTransform`    | anything                  | identical bytes            |
//! | `UserefTransform`  | `.html` with build blocks | page + bundles             |

mod copy;
mod image;
mod minify;
mod page;
mod script;
mod style;
mod useref;

pub use copy::CopyTransform;
pub use image::ImageTransform;
pub use page::PageTransform;
pub use script::ScriptTransform;
pub use style::StyleTransform;
pub use useref::UserefTransform;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// A source file handed to a transform.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the step's base directory.
    pub rel: PathBuf,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Decode the contents as UTF-8.
    pub fn text(&self) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| TransformError::per_file(&self.rel, format!("invalid UTF-8: {e}")))
    }
}

/// A file produced by a transform, relative to the step's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub rel: PathBuf,
    pub bytes: Vec<u8>,
}

impl OutputFile {
    pub fn new(rel: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            rel: rel.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// One input failed; the step keeps going.
    #[error("{}: {message}", path.display())]
    PerFile { path: PathBuf, message: String },

    /// The transform cannot run at all; the step aborts.
    #[error("{0}")]
    Fatal(String),
}

impl TransformError {
    pub fn per_file(path: &Path, message: impl Into<String>) -> Self {
        Self::PerFile {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Pure mapping from one source file to its outputs.
///
/// Implementations share no mutable state between invocations.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, input: SourceFile) -> Result<Vec<OutputFile>, TransformError>;
}

#[cfg(test)]
pub(crate) fn source(rel: &str, content: &str) -> SourceFile {
    SourceFile {
        rel: PathBuf::from(rel),
        bytes: content.as_bytes().to_vec(),
    }
}
