//! `serve` and `start`: long-running sessions that end on Ctrl+C.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::FutureExt;

use super::run_task;
use crate::asset::{AssetClass, Globs};
use crate::config::SiteConfig;
use crate::core::{BuildMode, Shutdown};
use crate::logger::{status_detach, status_error, status_success, status_warning};
use crate::reload::{ReloadChannel, ReloadEvent, server::ReloadServer};
use crate::serve::{HttpServer, ServeRoots};
use crate::task::{self, Step, Steps, Task};
use crate::watch::{Trigger, WatchBinding, WatchSession};
use crate::{debug, log};

/// Compile, then watch and serve sources with live reload.
pub async fn serve(config: Arc<SiteConfig>, mode: BuildMode, mut shutdown: Shutdown) -> Result<()> {
    let channel = ReloadChannel::new();
    let steps = Steps::new(&config, mode, Some(&channel))?;
    run_task(&steps.compile()).await?;

    let reload = ReloadServer::start(config.serve.interface, config.serve.ws_port, &channel)?;
    let roots = ServeRoots::dev(&config, Some(reload.port()));
    let http = HttpServer::start(config.serve.interface, config.serve.port, roots)?;
    log!("serve"; "{}", http.url());
    if config.serve.open {
        open_browser(&http.url());
    }

    let session = watch_session(&config, &steps, &channel)?;
    status_detach();

    shutdown.arm();
    shutdown.wait().await;

    session.stop().await;
    http.shutdown();
    reload.stop();
    Ok(())
}

/// Build, then serve the output directory without watching.
pub async fn start(config: Arc<SiteConfig>, mode: BuildMode, mut shutdown: Shutdown) -> Result<()> {
    let steps = Steps::new(&config, mode, None)?;
    run_task(&steps.build()).await?;

    let http = HttpServer::start(
        config.serve.interface,
        config.serve.port,
        ServeRoots::dist(&config),
    )?;
    log!("start"; "{}", http.url());
    if config.serve.open {
        open_browser(&http.url());
    }

    shutdown.arm();
    shutdown.wait().await;
    http.shutdown();
    Ok(())
}

/// One binding per asset class group:
///
/// | Globs                         | Action                 |
/// |-------------------------------|------------------------|
/// | styles                        | `style` (style inject) |
/// | scripts                       | `script`               |
/// | pages + partials              | `page`                 |
/// | images, fonts                 | full reload            |
/// | everything under `public`     | full reload            |
fn watch_session(config: &SiteConfig, steps: &Steps, channel: &ReloadChannel) -> Result<WatchSession> {
    let build = &config.build;
    let debounce = build.debounce();
    let globs = |class: AssetClass| Globs::new(&class.patterns(config));

    let mut page_patterns = AssetClass::Page.patterns(config);
    let partials_outside_src = match build.partials.strip_prefix(&build.src) {
        Ok(rel) => {
            page_patterns.push(format!("{}/**", rel.to_string_lossy().replace('\\', "/")));
            false
        }
        Err(_) => true,
    };

    let mut assets = AssetClass::Image.patterns(config);
    assets.extend(AssetClass::Font.patterns(config));

    let mut bindings = vec![
        WatchBinding::new("style", &build.src, globs(AssetClass::Style)?, debounce, step_trigger(&steps.style)),
        WatchBinding::new("script", &build.src, globs(AssetClass::Script)?, debounce, step_trigger(&steps.script)),
        WatchBinding::new("page", &build.src, Globs::new(&page_patterns)?, debounce, step_trigger(&steps.page)),
        WatchBinding::new("assets", &build.src, Globs::new(&assets)?, debounce, reload_trigger(channel)),
        WatchBinding::new("public", &build.public, Globs::new(&["**"])?, debounce, reload_trigger(channel)),
    ];
    if partials_outside_src {
        bindings.push(WatchBinding::new(
            "partials",
            &build.partials,
            Globs::new(&["**"])?,
            debounce,
            step_trigger(&steps.page),
        ));
    }

    debug!("watch"; "{} bindings", bindings.len());
    let mut session = WatchSession::new();
    for binding in bindings {
        session.add(binding).context("failed to start file watcher")?;
    }
    Ok(session)
}

/// Rerun one step and show the outcome in the status line.
fn step_trigger(step: &Arc<dyn Step>) -> Trigger {
    let step = Arc::clone(step);
    Arc::new(move || {
        let leaf = Task::Leaf(Arc::clone(&step));
        async move {
            match task::run(&leaf).await {
                Ok(report) => {
                    let summary: Vec<_> = report
                        .steps
                        .iter()
                        .map(|s| format!("{}: {}", s.name, s.summary()))
                        .collect();
                    let errors: Vec<_> = report
                        .errors()
                        .map(|(step, e)| format!("{step}: {e}"))
                        .collect();
                    if errors.is_empty() {
                        status_success(&summary.join(", "));
                    } else {
                        status_warning(&format!("{}\n{}", summary.join(", "), errors.join("\n")));
                    }
                }
                Err(e) => {
                    let detail = format!("{:#}", anyhow::Error::from(e));
                    status_error("rebuild failed", &detail);
                }
            }
        }
        .boxed()
    })
}

/// Ask every client for a full reload.
fn reload_trigger(channel: &ReloadChannel) -> Trigger {
    let channel = channel.clone();
    Arc::new(move || {
        channel.broadcast(ReloadEvent::full());
        status_success("reload");
        async {}.boxed()
    })
}

fn open_browser(url: &str) {
    if let Err(e) = open::that(url) {
        log!("warning"; "failed to open browser: {}", e);
    }
}
