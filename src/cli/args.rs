//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Pagewright asset build orchestrator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Build in production mode (overrides PAGEWRIGHT_ENV)
    #[arg(long, visible_alias = "prod", global = true)]
    pub production: bool,

    /// Config file path (default: pages.toml)
    #[arg(short = 'C', long, global = true, default_value = "pages.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available named tasks
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Remove the output and intermediate directories
    Clean,

    /// Run stylesheet checks and the configured lint tools
    Lint,

    /// Compile styles, scripts and pages into the intermediate directory
    #[command(visible_alias = "c")]
    Compile,

    /// Clean, compile, bundle and report the output size
    #[command(visible_alias = "b")]
    Build,

    /// Compile, then watch sources and serve them with live reload
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Build, then serve the output directory
    Start {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Build, then push the output directory to a remote branch
    #[command(visible_alias = "d")]
    Deploy {
        /// Target branch (default: gh-pages)
        #[arg(short, long)]
        branch: Option<String>,
    },
}

/// Shared server arguments for Serve and Start commands
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Open the site in the default browser
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub open: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["pagewright", "-v", "clean"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.command, Commands::Clean);
        // `-V` stays with clap's version flag
        let err = Cli::try_parse_from(["pagewright", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["pagewright", "serve", "--port", "3000", "--open"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Serve {
                server: ServerArgs {
                    port: Some(3000),
                    open: Some(true),
                }
            }
        );
    }

    #[test]
    fn test_parse_prod_alias() {
        let cli = Cli::try_parse_from(["pagewright", "build", "--prod"]).unwrap();
        assert!(cli.production);
        assert_eq!(cli.command, Commands::Build);
    }

    #[test]
    fn test_parse_deploy_branch() {
        let cli = Cli::try_parse_from(["pagewright", "deploy", "-b", "pages"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Deploy {
                branch: Some("pages".into())
            }
        );
        assert_eq!(cli.config, PathBuf::from("pages.toml"));
    }

    #[test]
    fn test_unknown_task_rejected() {
        assert!(Cli::try_parse_from(["pagewright", "publish"]).is_err());
    }
}
