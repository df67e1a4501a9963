use async_trait::async_trait;

use super::{OutputFile, SourceFile, Transform, TransformError};

/// Identity transform for fonts and static files.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyTransform;

#[async_trait]
impl Transform for CopyTransform {
    async fn apply(&self, input: SourceFile) -> Result<Vec<OutputFile>, TransformError> {
        Ok(vec![OutputFile {
            rel: input.rel,
            bytes: input.bytes,
        }])
    }
}
