//! Build mode resolution for production/development builds.

/// Environment variable consulted when no explicit flag is given.
pub const MODE_ENV: &str = "PAGEWRIGHT_ENV";

/// Build mode, fixed for the lifetime of the process.
///
/// Governs minification in the bundle step and the size report label.
/// The task graph has the same shape in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    /// Resolve the mode: explicit flag > environment variable > development.
    pub fn resolve(production_flag: bool, env: Option<&str>) -> Self {
        if production_flag {
            return Self::Production;
        }
        match env {
            Some(value) if value.trim().eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }

    /// Resolve from the flag and the process environment.
    pub fn from_env(production_flag: bool) -> Self {
        let env = std::env::var(MODE_ENV).ok();
        Self::resolve(production_flag, env.as_deref())
    }

    /// Whether bundled outputs are minified.
    #[inline]
    pub const fn minify(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Label used by the size report.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Development => "Development",
            Self::Production => "Production",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BuildMode;

    #[test]
    fn test_flag_wins_over_env() {
        assert_eq!(
            BuildMode::resolve(true, Some("development")),
            BuildMode::Production
        );
    }

    #[test]
    fn test_env_selects_production() {
        assert_eq!(
            BuildMode::resolve(false, Some("production")),
            BuildMode::Production
        );
        assert_eq!(
            BuildMode::resolve(false, Some(" Production ")),
            BuildMode::Production
        );
        assert_eq!(
            BuildMode::resolve(false, Some("staging")),
            BuildMode::Development
        );
    }

    #[test]
    fn test_default_is_development() {
        let mode = BuildMode::resolve(false, None);
        assert_eq!(mode, BuildMode::Development);
        assert!(!mode.minify());
        assert_eq!(mode.label(), "Development");
        assert!(BuildMode::Production.minify());
    }
}
