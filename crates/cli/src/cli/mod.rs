#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Root CLI for pagebridge.
#[derive(Parser, Debug)]
#[command(name = "pagebridge")]
#[command(about = "Session-aware bridge between automation clients and a browser extension")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (default: <config dir>/pagebridge/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Accept the extension on a WebSocket and serve requests over stdin/stdout (NDJSON).
	Serve(ServeArgs),
	/// Print the resolved configuration as JSON.
	Config(ListenArgs),
}

/// Overrides for the extension endpoint address.
#[derive(Args, Debug, Clone, Default)]
pub struct ListenArgs {
	/// Address to listen on for the extension.
	#[arg(long, value_name = "HOST")]
	pub host: Option<String>,

	/// Port to listen on for the extension.
	#[arg(long, value_name = "PORT")]
	pub port: Option<u16>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
	#[command(flatten)]
	pub listen: ListenArgs,

	/// Only run the extension endpoint; no stdio front-end.
	#[arg(long)]
	pub no_stdio: bool,
}
