//! `[lint]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [lint]
//! style_check = true                      # Parse every stylesheet in-process
//! commands = [["npx", "standard", "--fix"]]  # Run from `build.src`
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Check that every stylesheet matched by `build.paths.styles` parses.
    pub style_check: bool,

    /// External lint commands (program followed by its arguments).
    pub commands: Vec<Vec<String>>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            style_check: true,
            commands: vec![vec!["npx".into(), "standard".into(), "--fix".into()]],
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_lint_config_defaults() {
        let config = test_parse_config("");
        assert!(config.lint.style_check);
        assert_eq!(config.lint.commands.len(), 1);
        assert_eq!(config.lint.commands[0][0], "npx");
    }

    #[test]
    fn test_lint_config_no_commands() {
        let config = test_parse_config("[lint]\ncommands = []\nstyle_check = false");
        assert!(config.lint.commands.is_empty());
        assert!(!config.lint.style_check);
    }
}
