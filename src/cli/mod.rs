//! Command-line interface module.

mod args;
mod serve;

pub use args::{Cli, Commands, ServerArgs};

use std::sync::Arc;

use anyhow::Result;

use crate::config::SiteConfig;
use crate::core::{BuildMode, Shutdown};
use crate::deploy::GitBranchUploader;
use crate::lint;
use crate::task::{self, RunReport, Steps, Task};

/// Dispatch a parsed command.
pub async fn run_command(
    command: &Commands,
    config: Arc<SiteConfig>,
    mode: BuildMode,
    shutdown: Shutdown,
) -> Result<()> {
    match command {
        Commands::Clean => run_task(&Steps::new(&config, mode, None)?.clean()).await,
        Commands::Lint => lint::lint(&config).await,
        Commands::Compile => run_task(&Steps::new(&config, mode, None)?.compile()).await,
        Commands::Build => run_task(&Steps::new(&config, mode, None)?.build()).await,
        Commands::Serve { .. } => serve::serve(config, mode, shutdown).await,
        Commands::Start { .. } => serve::start(config, mode, shutdown).await,
        Commands::Deploy { .. } => {
            let steps = Steps::new(&config, mode, None)?;
            let uploader = Arc::new(GitBranchUploader::from_config(&config));
            run_task(&steps.deploy(uploader, &config.build.dist)).await
        }
    }
}

/// Run a named task and log its report.
async fn run_task(task: &Task) -> Result<()> {
    let report: RunReport = task::run(task).await?;
    report.log();
    Ok(())
}
