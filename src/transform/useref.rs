//! Build-block bundling for HTML pages.
//!
//! ```html
//! <!-- build:css assets/styles/bundle.css -->
//! <link rel="stylesheet" href="assets/styles/main.css">
//! <link rel="stylesheet" href="/node_modules/normalize.css/normalize.css">
//! <!-- endbuild -->
//! ```
//!
//! Each block is replaced by one tag pointing at `target`, and the
//! referenced files (looked up in each search directory in order) are
//! concatenated into a bundle emitted next to the page.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};

use super::minify::minify_by_ext;
use super::{OutputFile, SourceFile, Transform, TransformError};
use crate::core::BuildMode;

static BUILD_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*build:(css|js)\s+(\S+)\s*-->(.*?)<!--\s*endbuild\s*-->")
        .expect("valid regex")
});

static CSS_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

static JS_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<script\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BundleKind {
    Css,
    Js,
}

impl BundleKind {
    fn parse(s: &str) -> Self {
        if s == "css" { Self::Css } else { Self::Js }
    }

    fn references(self, block: &str) -> Vec<String> {
        let re = match self {
            Self::Css => &*CSS_REF,
            Self::Js => &*JS_REF,
        };
        re.captures_iter(block).map(|c| c[1].to_string()).collect()
    }

    fn tag(self, target: &str) -> String {
        match self {
            Self::Css => format!(r#"<link rel="stylesheet" href="{target}">"#),
            Self::Js => format!(r#"<script src="{target}"></script>"#),
        }
    }

    const fn separator(self) -> &'static str {
        match self {
            Self::Css => "\n",
            Self::Js => ";\n",
        }
    }
}

/// A parsed build block.
struct Block {
    kind: BundleKind,
    target: String,
    references: Vec<String>,
}

/// Resolves build blocks and, in production, minifies every output.
#[derive(Debug, Clone)]
pub struct UserefTransform {
    search_paths: Vec<PathBuf>,
    mode: BuildMode,
}

impl UserefTransform {
    pub fn new(search_paths: Vec<PathBuf>, mode: BuildMode) -> Self {
        Self { search_paths, mode }
    }

    /// First search directory containing `rel`.
    fn resolve(&self, rel: &Path) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(rel))
            .find(|path| path.is_file())
    }

    async fn bundle(&self, page: &Path, block: &Block) -> Result<String, TransformError> {
        let mut bundle = String::new();
        for reference in &block.references {
            let rel = reference_path(reference).ok_or_else(|| {
                TransformError::per_file(page, format!("`{reference}` leaves the search paths"))
            })?;
            let path = self.resolve(rel).ok_or_else(|| {
                TransformError::per_file(page, format!("`{reference}` not found for {}", block.target))
            })?;
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| TransformError::per_file(page, format!("{}: {e}", path.display())))?;
            if !bundle.is_empty() {
                bundle.push_str(block.kind.separator());
            }
            bundle.push_str(content.trim_end());
        }
        bundle.push('\n');
        Ok(bundle)
    }

    fn finish(&self, rel: PathBuf, content: String) -> OutputFile {
        if self.mode.minify()
            && let Some(minified) = minify_by_ext(&rel, &content)
        {
            return OutputFile::new(rel, minified);
        }
        OutputFile::new(rel, content)
    }
}

/// Reference without query or fragment, as a path under a search directory.
///
/// `None` for anything but plain path segments, so `..` cannot reach files
/// outside the search paths.
fn reference_path(reference: &str) -> Option<&Path> {
    let reference = reference.split(['?', '#']).next().unwrap_or(reference);
    let rel = Path::new(reference.trim_start_matches('/'));
    let plain = rel.components().next().is_some()
        && rel.components().all(|c| matches!(c, Component::Normal(_)));
    plain.then_some(rel)
}

/// Bundle output path: `/`-prefixed targets are site-absolute, others are
/// relative to the page. `None` when the target climbs above the site root.
fn target_path(page: &Path, target: &str) -> Option<PathBuf> {
    let (mut path, target) = match target.strip_prefix('/') {
        Some(absolute) => (PathBuf::new(), absolute),
        None => (page.parent().map(Path::to_path_buf).unwrap_or_default(), target),
    };
    for component in Path::new(target).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !path.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    path.components().next().is_some().then_some(path)
}

#[async_trait]
impl Transform for UserefTransform {
    async fn apply(&self, input: SourceFile) -> Result<Vec<OutputFile>, TransformError> {
        let html = input.text()?;

        let blocks: Vec<Block> = BUILD_BLOCK
            .captures_iter(html)
            .map(|caps| {
                let kind = BundleKind::parse(&caps[1]);
                Block {
                    kind,
                    target: caps[2].to_string(),
                    references: kind.references(&caps[3]),
                }
            })
            .collect();

        let mut outputs = Vec::with_capacity(blocks.len() + 1);
        for block in &blocks {
            let target = target_path(&input.rel, &block.target).ok_or_else(|| {
                TransformError::per_file(
                    &input.rel,
                    format!("bundle target `{}` is outside the site", block.target),
                )
            })?;
            let bundle = self.bundle(&input.rel, block).await?;
            outputs.push(self.finish(target, bundle));
        }

        let page = BUILD_BLOCK.replace_all(html, |caps: &Captures| {
            BundleKind::parse(&caps[1]).tag(&caps[2])
        });
        outputs.insert(0, self.finish(input.rel.clone(), page.into_owned()));
        Ok(outputs)
    }
}
