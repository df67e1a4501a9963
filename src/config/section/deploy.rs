//! `[deploy]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [deploy]
//! remote = "origin"           # Remote name of the project repository, or a URL
//! branch = "gh-pages"         # Target branch
//! message = "Update site"     # Commit message
//! ```

use serde::{Deserialize, Serialize};

/// Upload target settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Remote name (resolved through the project repository) or a URL.
    pub remote: String,

    /// Target branch, force-pushed on every deploy.
    pub branch: String,

    /// Commit message for the published tree.
    pub message: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            branch: "gh-pages".to_string(),
            message: "Update site".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_deploy_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.deploy.remote, "origin");
        assert_eq!(config.deploy.branch, "gh-pages");
        assert_eq!(config.deploy.message, "Update site");
    }

    #[test]
    fn test_deploy_config_custom() {
        let config = test_parse_config(
            "[deploy]\nremote = \"git@github.com:user/site.git\"\nbranch = \"main\"",
        );
        assert_eq!(config.deploy.remote, "git@github.com:user/site.git");
        assert_eq!(config.deploy.branch, "main");
    }
}
