use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use notify::Watcher;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use sophia_core::build_site;
use sophia_dev_server::{LiveServer, LiveServerConfig};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::cmd::build::add_build_args;
use crate::config::{SophiaConfig, load_serve_config};

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("serve"))
        .about("Start development server with live reload")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on [default: 3000]")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to [default: 127.0.0.1]"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(clap::ArgAction::SetTrue),
        )
}

fn rebuild(config: &SophiaConfig) -> Result<()> {
    let sidebars = config.load_sidebars()?;
    let report = build_site(&config.site, &sidebars, &config.paths())?;
    tracing::info!(pages = report.pages_written, "Site built");
    Ok(())
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_serve_config(args)?;
    rebuild(&config)?;

    let build_config = &config.build;
    let server = LiveServer::new(LiveServerConfig {
        host: build_config.host.clone(),
        port: build_config.port,
        root: PathBuf::from(&build_config.output),
        open: build_config.open,
        ignore: vec![".git".to_string(), ".tmp".to_string()],
    });
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Dev server stopped");
        }
    });

    let watcher_args = args.clone();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_sources(config, watcher_args).await {
            tracing::error!(error = %e, "Source watcher stopped");
        }
    });

    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

/// Inputs whose changes trigger a rebuild.
fn watched_paths(config: &SophiaConfig) -> Vec<PathBuf> {
    let build = &config.build;
    [
        build.source.as_str(),
        build.theme.as_str(),
        build.static_dir.as_str(),
        build.config.as_str(),
        config.site.docs.sidebar_path.as_str(),
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

async fn watch_sources(mut config: SophiaConfig, args: ArgMatches) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for event in events {
                    let _ = tx.blocking_send(event.path);
                }
            }
        },
    )?;

    let watched = watched_paths(&config);
    for path in &watched {
        if !path.exists() {
            continue;
        }
        let mode = if path.is_dir() {
            notify::RecursiveMode::Recursive
        } else {
            notify::RecursiveMode::NonRecursive
        };
        debouncer.watcher().watch(path, mode)?;
        tracing::info!(path = %path.display(), "Watching for changes");
    }
    let watched: Vec<PathBuf> = watched.iter().map(|p| absolute(p)).collect();
    let settings: Vec<PathBuf> = [&config.build.config, &config.site.docs.sidebar_path]
        .into_iter()
        .map(|p| absolute(Path::new(p)))
        .collect();

    while let Some(path) = rx.recv().await {
        let path = absolute(&path);
        if !watched.iter().any(|w| path.starts_with(w)) {
            tracing::debug!(path = %path.display(), "Skipping non-source change");
            continue;
        }
        tracing::info!(path = %path.display(), "Source changed, rebuilding");

        if settings.contains(&path) {
            match load_serve_config(&args) {
                Ok(reloaded) => config = reloaded,
                Err(e) => {
                    tracing::error!(error = %e, "Config reload failed, keeping the previous config");
                }
            }
        }

        // The dev server sees the new output and reloads the pages.
        if let Err(e) = rebuild(&config) {
            tracing::error!(error = %e, "Build failed");
        }
    }

    Ok(())
}
