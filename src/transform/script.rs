//! Script regeneration through oxc.

use async_trait::async_trait;
use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::{OutputFile, SourceFile, Transform, TransformError};

/// Parses each script and prints it back out.
///
/// Syntax errors surface as per-file failures instead of reaching the browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptTransform;

impl ScriptTransform {
    fn regenerate(input: &SourceFile) -> Result<String, TransformError> {
        let source = input.text()?;
        let source_type = SourceType::from_path(&input.rel).unwrap_or_else(|_| SourceType::mjs());

        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if let Some(first) = ret.errors.first() {
            return Err(TransformError::per_file(&input.rel, first.to_string()));
        }
        Ok(Codegen::new().build(&ret.program).code)
    }
}

#[async_trait]
impl Transform for ScriptTransform {
    async fn apply(&self, input: SourceFile) -> Result<Vec<OutputFile>, TransformError> {
        let code = Self::regenerate(&input)?;
        Ok(vec![OutputFile::new(input.rel.with_extension("js"), code)])
    }
}
