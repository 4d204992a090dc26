use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use shimframe::config::ShimConfig;
use shimframe::fetch::BundleFetcher;
use shimframe::server::start_server;
use shimframe::shell::spawn_shell;
use shimframe::watch::watch_bundle;
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<PathBuf>,
    bundle_root: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        bundle_root: None,
    };
    let mut raw = std::env::args().skip(1);
    while let Some(arg) = raw.next() {
        if arg == "--config" {
            let path = raw.next().context("--config needs a path")?;
            args.config = Some(PathBuf::from(path));
        } else if arg.starts_with("--") {
            bail!("unknown flag {arg}");
        } else if args.bundle_root.is_none() {
            args.bundle_root = Some(arg);
        } else {
            bail!("unexpected argument {arg}");
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let args = parse_args()?;
    let config_path = ShimConfig::resolve_path(args.config);
    let mut config = ShimConfig::load(config_path.as_deref()).context("failed to load config")?;
    if let Some(root) = args.bundle_root {
        config.bundle_root = root;
    }

    let fetcher = BundleFetcher::from_location(&config.bundle_root)
        .with_context(|| format!("invalid bundle root {}", config.bundle_root))?;
    let bundle_dir = fetcher.root_dir();
    tracing::info!(root = %fetcher.root(), "serving bundle");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    let server_addr = config.server_addr;
    let watch = config.watch;
    let (shell, shell_thread) = spawn_shell(config, fetcher)?;

    let _watcher = match (watch, bundle_dir) {
        (true, Some(dir)) => Some(watch_bundle(&dir, shell.clone()).context("failed to watch bundle")?),
        (true, None) => {
            tracing::warn!("watching is only supported for local bundles");
            None
        }
        (false, _) => None,
    };

    rt.block_on(async {
        let server = match server_addr {
            Some(addr) => Some(start_server(addr, shell.clone()).await?),
            None => None,
        };

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        tracing::info!("shutting down");

        if let Some(server) = server {
            server.shutdown().await;
        }
        shell.shutdown().await
    })?;

    if shell_thread.join().is_err() {
        bail!("shell thread panicked");
    }
    Ok(())
}
