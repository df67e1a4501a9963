//! Page rendering through handlebars.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use handlebars::Handlebars;
use jwalk::{Parallelism, WalkDir};
use serde_json::Value;

use super::{OutputFile, SourceFile, Transform, TransformError};

/// Renders page templates with the site `[data]` table as context.
///
/// Partials (`{{> name}}`) are loaded from `partials_dir` on every
/// invocation, so edits show up without restarting a watch session.
#[derive(Debug, Clone)]
pub struct PageTransform {
    partials_dir: PathBuf,
    data: Value,
}

impl PageTransform {
    pub fn new(partials_dir: PathBuf, data: &toml::Table) -> Result<Self, TransformError> {
        let data = serde_json::to_value(data)
            .map_err(|e| TransformError::Fatal(format!("template data: {e}")))?;
        Ok(Self { partials_dir, data })
    }

    fn registry(&self) -> Result<Handlebars<'static>, TransformError> {
        let mut hbs = Handlebars::new();
        for (name, path) in partial_files(&self.partials_dir) {
            let template = std::fs::read_to_string(&path)
                .map_err(|e| TransformError::per_file(&path, e.to_string()))?;
            hbs.register_partial(&name, template)
                .map_err(|e| TransformError::per_file(&path, e.to_string()))?;
        }
        Ok(hbs)
    }
}

/// `(name, path)` for every file under `dir`; the name is the relative path
/// without extension, `/`-separated.
fn partial_files(dir: &Path) -> Vec<(String, PathBuf)> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .parallelism(Parallelism::Serial)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.path();
            let rel = path.strip_prefix(dir).ok()?.with_extension("");
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some((name, path))
        })
        .collect()
}

#[async_trait]
impl Transform for PageTransform {
    async fn apply(&self, input: SourceFile) -> Result<Vec<OutputFile>, TransformError> {
        let hbs = self.registry()?;
        let html = hbs
            .render_template(input.text()?, &self.data)
            .map_err(|e| TransformError::per_file(&input.rel, e.to_string()))?;
        Ok(vec![OutputFile::new(input.rel, html)])
    }
}
