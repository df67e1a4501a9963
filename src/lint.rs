//! `lint`: stylesheet check plus external lint tools.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::asset::{AssetClass, Globs, collect};
use crate::config::SiteConfig;
use crate::transform::StyleTransform;
use crate::utils::exec::Cmd;
use crate::utils::plural_count;
use crate::{debug, log};

/// Stylesheet that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleProblem {
    pub path: PathBuf,
    pub message: String,
}

/// Parse every stylesheet matched by the style globs.
pub fn check_styles(config: &SiteConfig) -> Result<(usize, Vec<StyleProblem>)> {
    let globs = Globs::new(&AssetClass::Style.patterns(config))?;
    let Some(files) = collect(&config.build.src, &globs) else {
        return Ok((0, Vec::new()));
    };

    let compiler = StyleTransform::default();
    let mut problems = Vec::new();
    for rel in &files {
        let path = config.build.src.join(rel);
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if let Err(message) = compiler.compile(&source) {
            problems.push(StyleProblem {
                path: rel.clone(),
                message,
            });
        }
    }
    Ok((files.len(), problems))
}

/// Run the configured lint tools from `build.src`.
///
/// Tools that are not installed are skipped with a warning.
pub async fn run_commands(config: &SiteConfig) -> Result<()> {
    for command in &config.lint.commands {
        let Some(program) = command.first() else {
            continue;
        };
        if which::which(program).is_err() {
            log!("warning"; "`{program}` not found, skipping `{}`", command.join(" "));
            continue;
        }

        let cmd = Cmd::from_slice(command.as_slice()).cwd(&config.build.src);
        debug!("lint"; "running {}", cmd.display());
        let status = cmd
            .inherit()
            .await
            .with_context(|| format!("cannot run `{}`", cmd.display()))?;
        if !status.success() {
            bail!("`{}` failed with {status}", cmd.display());
        }
    }
    Ok(())
}

/// The `lint` entry point.
pub async fn lint(config: &SiteConfig) -> Result<()> {
    if config.lint.style_check {
        let (checked, problems) = check_styles(config)?;
        for problem in &problems {
            log!(
                "error";
                "{}: {}",
                config.root_relative(config.build.src.join(&problem.path)).display(),
                problem.message
            );
        }
        if !problems.is_empty() {
            bail!(
                "{} of {} failed to parse",
                plural_count(problems.len(), "stylesheet"),
                checked
            );
        }
        log!("lint"; "{} ok", plural_count(checked, "stylesheet"));
    }
    run_commands(config).await
}
