//! Stylesheet compilation through lightningcss.

use async_trait::async_trait;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use super::{OutputFile, SourceFile, Transform, TransformError};

/// Compiles stylesheets to expanded CSS with nesting lowered.
///
/// Files whose name starts with `_` are partials and produce no output.
#[derive(Debug, Clone, Copy)]
pub struct StyleTransform {
    targets: Targets,
}

impl Default for StyleTransform {
    fn default() -> Self {
        // Oldest browsers without native nesting support
        let browsers = Browsers {
            chrome: Some(100 << 16),
            firefox: Some(100 << 16),
            safari: Some(15 << 16),
            ..Browsers::default()
        };
        Self {
            targets: Targets::from(browsers),
        }
    }
}

impl StyleTransform {
    /// Compile one stylesheet. Shared with the lint check.
    pub fn compile(&self, source: &str) -> Result<String, String> {
        let stylesheet =
            StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
        let result = stylesheet
            .to_css(PrinterOptions {
                minify: false,
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| e.to_string())?;
        Ok(result.code)
    }
}

fn is_partial(input: &SourceFile) -> bool {
    input
        .rel
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

#[async_trait]
impl Transform for StyleTransform {
    async fn apply(&self, input: SourceFile) -> Result<Vec<OutputFile>, TransformError> {
        if is_partial(&input) {
            return Ok(Vec::new());
        }

        let css = self
            .compile(input.text()?)
            .map_err(|e| TransformError::per_file(&input.rel, e))?;
        Ok(vec![OutputFile::new(input.rel.with_extension("css"), css)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::source;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_scss_renamed_to_css() {
        let out = StyleTransform::default()
            .apply(source("assets/styles/main.scss", "body { color: red; }"))
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel, PathBuf::from("assets/styles/main.css"));
        let css = String::from_utf8(out[0].bytes.clone()).unwrap();
        assert!(css.contains("color: red"));
    }

    #[tokio::test]
    async fn test_nesting_lowered() {
        let out = StyleTransform::default()
            .apply(source("a.scss", ".nav { & a { color: blue; } }"))
            .await
            .unwrap();
        let css = String::from_utf8(out[0].bytes.clone()).unwrap();
        assert!(css.contains(".nav a"));
    }

    #[tokio::test]
    async fn test_partial_produces_nothing() {
        let out = StyleTransform::default()
            .apply(source("assets/styles/_vars.scss", ":root { --x: 1px; }"))
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_syntax_error_is_per_file() {
        let err = StyleTransform::default()
            .apply(source("broken.scss", "!!! { color: red; }"))
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("broken.scss: "));
    }
}
