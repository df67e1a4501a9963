//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! src = "src"                 # Source tree (relative to project root)
//! dist = "dist"               # Deployable output
//! temp = "temp"               # Intermediate output served in development
//! public = "public"           # Files copied verbatim into dist
//! partials = "partials"       # Page partials (relative to `src`)
//! debounce_ms = 200           # Watch debounce window
//!
//! [build.paths]               # Globs relative to `src`
//! styles = ["assets/styles/*.scss"]
//! scripts = ["assets/scripts/*.js"]
//! pages = ["*.html"]
//! images = ["assets/images/**"]
//! fonts = ["assets/fonts/**"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source tree.
    pub src: PathBuf,

    /// Deployable output directory.
    pub dist: PathBuf,

    /// Intermediate output directory.
    pub temp: PathBuf,

    /// Static files copied as-is into `dist`.
    pub public: PathBuf,

    /// Handlebars partials, relative to `src`.
    pub partials: PathBuf,

    /// Per-asset-class globs.
    pub paths: PathsConfig,

    /// Watch debounce window in milliseconds.
    pub debounce_ms: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            src: "src".into(),
            dist: "dist".into(),
            temp: "temp".into(),
            public: "public".into(),
            partials: "partials".into(),
            paths: PathsConfig::default(),
            debounce_ms: 200,
        }
    }
}

/// Glob arrays per asset class, relative to `build.src`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
    pub pages: Vec<String>,
    pub images: Vec<String>,
    pub fonts: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            styles: vec!["assets/styles/*.scss".into()],
            scripts: vec!["assets/scripts/*.js".into()],
            pages: vec!["*.html".into()],
            images: vec!["assets/images/**".into()],
            fonts: vec!["assets/fonts/**".into()],
        }
    }
}

impl BuildConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validate normalized (absolute) build paths.
    ///
    /// `clean` removes `dist` and `temp` recursively, so neither may be
    /// the source tree or one of its ancestors.
    pub fn validate(&self, root: &std::path::Path, diag: &mut ConfigDiagnostics) {
        let outputs = [
            (FieldPath::new("build.dist"), &self.dist),
            (FieldPath::new("build.temp"), &self.temp),
        ];
        for (field, dir) in outputs {
            if self.src.starts_with(dir) || self.public.starts_with(dir) || root.starts_with(dir) {
                diag.error_with_hint(
                    field,
                    format!("`{}` contains sources and would be deleted by clean", dir.display()),
                    "point it at a dedicated output directory",
                );
            }
        }
        if self.dist == self.temp {
            diag.error(
                FieldPath::new("build.temp"),
                "`build.temp` must differ from `build.dist`",
            );
        }

        let globs = [
            (FieldPath::new("build.paths.styles"), &self.paths.styles),
            (FieldPath::new("build.paths.scripts"), &self.paths.scripts),
            (FieldPath::new("build.paths.pages"), &self.paths.pages),
            (FieldPath::new("build.paths.images"), &self.paths.images),
            (FieldPath::new("build.paths.fonts"), &self.paths.fonts),
        ];
        for (field, patterns) in globs {
            if let Err(e) = crate::asset::Globs::new(patterns) {
                diag.error(field, e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.src, PathBuf::from("src"));
        assert_eq!(config.build.dist, PathBuf::from("dist"));
        assert_eq!(config.build.temp, PathBuf::from("temp"));
        assert_eq!(config.build.public, PathBuf::from("public"));
        assert_eq!(config.build.partials, PathBuf::from("partials"));
        assert_eq!(config.build.paths.pages, vec!["*.html".to_string()]);
        assert_eq!(config.build.debounce(), Duration::from_millis(200));
    }

    #[test]
    fn test_custom_paths() {
        let config = test_parse_config(
            r#"
[build]
dist = "out"
debounce_ms = 50

[build.paths]
styles = ["css/**/*.css"]
"#,
        );
        assert_eq!(config.build.dist, PathBuf::from("out"));
        assert_eq!(config.build.paths.styles, vec!["css/**/*.css".to_string()]);
        // Untouched classes keep their defaults
        assert_eq!(config.build.paths.scripts, vec!["assets/scripts/*.js".to_string()]);
        assert_eq!(config.build.debounce_ms, 50);
    }

    fn absolute(build: &mut BuildConfig, root: &Path) {
        build.src = root.join(&build.src);
        build.dist = root.join(&build.dist);
        build.temp = root.join(&build.temp);
        build.public = root.join(&build.public);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let root = Path::new("/site");
        let mut build = BuildConfig::default();
        absolute(&mut build, root);

        let mut diag = ConfigDiagnostics::new();
        build.validate(root, &mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_validate_rejects_dist_containing_src() {
        let root = Path::new("/site");
        let mut build = BuildConfig {
            dist: ".".into(),
            ..BuildConfig::default()
        };
        absolute(&mut build, root);
        build.dist = root.to_path_buf();

        let mut diag = ConfigDiagnostics::new();
        build.validate(root, &mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "build.dist");
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let root = Path::new("/site");
        let mut build = BuildConfig::default();
        build.paths.images = vec!["assets/[images".into()];
        absolute(&mut build, root);

        let mut diag = ConfigDiagnostics::new();
        build.validate(root, &mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "build.paths.images");
    }
}
