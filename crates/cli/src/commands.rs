use std::time::Duration;

use anyhow::{Context, Result};
use pagebridge::Bridge;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, ServeArgs};
use crate::config::HostConfig;
use crate::{frontend, relay};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub async fn dispatch(cli: Cli) -> Result<()> {
	let mut config = HostConfig::load(cli.config.as_deref())?;
	match cli.command {
		Commands::Serve(args) => {
			config.apply(&args.listen);
			serve(config, &args).await
		}
		Commands::Config(args) => {
			config.apply(&args);
			let rendered = serde_json::to_string_pretty(&config).context("Failed to render config")?;
			println!("{rendered}");
			Ok(())
		}
	}
}

/// Runs the extension endpoint and, unless disabled, the stdio front-end
/// until ctrl-c or stdin EOF.
pub async fn serve(config: HostConfig, args: &ServeArgs) -> Result<()> {
	let bridge = Bridge::new(config.bridge.clone());
	let listener = relay::bind(&config.host, config.port).await?;
	let sweeper = bridge.start_idle_sweeper();

	let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
	let server = tokio::spawn(relay::serve(listener, bridge.clone(), async move {
		let _ = shutdown_rx.wait_for(|stop| *stop).await;
	}));

	if args.no_stdio {
		tokio::signal::ctrl_c().await.context("Failed to install Ctrl+C handler")?;
		info!(target: "pagebridge.serve", "received Ctrl+C, shutting down");
	} else {
		tokio::select! {
			result = frontend::run(bridge.clone(), tokio::io::stdin(), tokio::io::stdout()) => {
				result?;
				info!(target: "pagebridge.serve", "stdin closed, shutting down");
			}
			_ = tokio::signal::ctrl_c() => {
				info!(target: "pagebridge.serve", "received Ctrl+C, shutting down");
			}
		}
	}

	let _ = shutdown_tx.send(true);
	sweeper.stop().await;
	match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
		Ok(joined) => joined.context("Extension endpoint task failed")??,
		Err(_) => warn!(target: "pagebridge.serve", "extension endpoint did not stop in time"),
	}
	Ok(())
}
