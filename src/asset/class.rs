//! Asset class definitions.

use crate::config::SiteConfig;

/// Kind of source asset, each mapped to one glob set and one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Style,
    Script,
    Page,
    Image,
    Font,
    /// Static files from `build.public`, copied verbatim.
    Extra,
}

impl AssetClass {
    /// Name of the step that builds this class.
    pub const fn step_name(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Script => "script",
            Self::Page => "page",
            Self::Image => "image",
            Self::Font => "font",
            Self::Extra => "extra",
        }
    }

    /// Configured glob patterns for this class.
    pub fn patterns(self, config: &SiteConfig) -> Vec<String> {
        let paths = &config.build.paths;
        match self {
            Self::Style => paths.styles.clone(),
            Self::Script => paths.scripts.clone(),
            Self::Page => paths.pages.clone(),
            Self::Image => paths.images.clone(),
            Self::Font => paths.fonts.clone(),
            Self::Extra => vec!["**".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AssetClass; 6] = [
        AssetClass::Style,
        AssetClass::Script,
        AssetClass::Page,
        AssetClass::Image,
        AssetClass::Font,
        AssetClass::Extra,
    ];

    #[test]
    fn test_step_names_unique() {
        let mut names: Vec<_> = ALL.iter().map(|c| c.step_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_patterns_follow_config() {
        let mut config = SiteConfig::default();
        config.build.paths.fonts = vec!["fonts/*.woff2".into()];

        assert_eq!(AssetClass::Font.patterns(&config), vec!["fonts/*.woff2"]);
        assert_eq!(AssetClass::Extra.patterns(&config), vec!["**"]);
    }
}
