use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_serve_defaults() {
	let cli = Cli::try_parse_from(["pagebridge", "serve"]).unwrap();

	assert_eq!(cli.verbose, 0);
	assert!(cli.config.is_none());
	match cli.command {
		Commands::Serve(args) => {
			assert_eq!(args.listen.host, None);
			assert_eq!(args.listen.port, None);
			assert!(!args.no_stdio);
		}
		_ => panic!("Expected Serve command"),
	}
}

#[test]
fn parse_serve_overrides() {
	let args = vec![
		"pagebridge",
		"-vv",
		"serve",
		"--host",
		"0.0.0.0",
		"--port",
		"4000",
		"--no-stdio",
		"--config",
		"/tmp/pb.json",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.config, Some(PathBuf::from("/tmp/pb.json")));
	match cli.command {
		Commands::Serve(args) => {
			assert_eq!(args.listen.host.as_deref(), Some("0.0.0.0"));
			assert_eq!(args.listen.port, Some(4000));
			assert!(args.no_stdio);
		}
		_ => panic!("Expected Serve command"),
	}
}

#[test]
fn parse_config_command() {
	let cli = Cli::try_parse_from(["pagebridge", "config", "--port", "5000"]).unwrap();

	match cli.command {
		Commands::Config(args) => assert_eq!(args.port, Some(5000)),
		_ => panic!("Expected Config command"),
	}
}

#[test]
fn reject_invalid_port() {
	assert!(Cli::try_parse_from(["pagebridge", "serve", "--port", "70000"]).is_err());
}

#[test]
fn require_subcommand() {
	assert!(Cli::try_parse_from(["pagebridge"]).is_err());
}
