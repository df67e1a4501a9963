//! Site configuration management for `pages.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build] and [build.paths]
//! │   ├── deploy     # [deploy]
//! │   ├── lint       # [lint]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section         | Purpose                                        |
//! |-----------------|------------------------------------------------|
//! | `[build]`       | Source/output directories, debounce window     |
//! | `[build.paths]` | Glob arrays per asset class                    |
//! | `[data]`        | Free-form table passed to page templates       |
//! | `[serve]`       | Development server (port, interface, routes)   |
//! | `[deploy]`      | Upload target (remote, branch)                 |
//! | `[lint]`        | Stylesheet check and external lint commands    |
//!
//! A missing config file is not an error: every section has defaults.

pub mod section;
pub mod types;

pub use section::{BuildConfig, DeployConfig, LintConfig, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands, ServerArgs},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing pages.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Build settings
    pub build: BuildConfig,

    /// Template data for pages
    pub data: toml::Table,

    /// Development server settings
    pub serve: ServeConfig,

    /// Upload settings
    pub deploy: DeployConfig,

    /// Lint settings
    pub lint: LintConfig,
}

impl SiteConfig {
    /// Load configuration from CLI arguments.
    ///
    /// The project root is the config file's parent directory. Paths are
    /// normalized to absolute paths under the root, then validated.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let config_path = normalize_path(&cwd.join(&cli.config));

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            log!("config"; "{} not found, using defaults", cli.config.display());
            Self::default()
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        config.config_path = config_path;
        config.finalize(&root);
        config.apply_command_options(&cli.command);
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Get path relative to the site root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Serve { server } | Commands::Start { server } => {
                self.apply_server_args(server);
            }
            Commands::Deploy { branch } => {
                Self::update_option(&mut self.deploy.branch, branch.as_ref());
            }
            Commands::Clean | Commands::Lint | Commands::Compile | Commands::Build => {}
        }
    }

    fn apply_server_args(&mut self, args: &ServerArgs) {
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        Self::update_option(&mut self.serve.open, args.open.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Set the root and normalize all paths relative to it.
    fn finalize(&mut self, root: &Path) {
        let root = normalize_path(root);

        self.build.src = normalize_path(&root.join(&self.build.src));
        self.build.dist = normalize_path(&root.join(&self.build.dist));
        self.build.temp = normalize_path(&root.join(&self.build.temp));
        self.build.public = normalize_path(&root.join(&self.build.public));
        self.build.partials = normalize_path(&self.build.src.join(&self.build.partials));

        for dir in self.serve.routes.values_mut() {
            *dir = normalize_path(&root.join(&*dir));
        }

        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the normalized configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&self.root, &mut diag);
        for prefix in self.serve.routes.keys() {
            if !prefix.starts_with('/') {
                diag.error_with_hint(
                    FieldPath::new("serve.routes"),
                    format!("route `{prefix}` is not an absolute URL path"),
                    format!("use \"/{}\"", prefix.trim_start_matches('/')),
                );
            }
        }
        for (i, command) in self.lint.commands.iter().enumerate() {
            if command.is_empty() {
                diag.error(
                    FieldPath::new("lint.commands"),
                    format!("command #{} is empty", i + 1),
                );
            }
        }

        diag.into_result()
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Default config rooted at `root`, with normalized paths.
#[cfg(test)]
pub fn test_config_at(root: &Path) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.finalize(root);
    config
}

// ============================================================================
// tests
// ============================================================================
