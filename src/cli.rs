//! Command-line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

pub fn command() -> Command {
	Command::new("cloudpush")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Replace the contents of a storage container with a local directory")
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.help("TOML configuration file"),
		)
		.arg(Arg::new("user").long("user").value_name("USER").help("Storage user name"))
		.arg(
			Arg::new("password")
				.long("password")
				.value_name("PASSWORD")
				.help("Storage password (prefer CLOUDPUSH_PASSWORD)"),
		)
		.arg(
			Arg::new("container")
				.long("container")
				.value_name("NAME")
				.help("Container to replace"),
		)
		.arg(
			Arg::new("dir")
				.long("dir")
				.visible_alias("directory")
				.value_name("DIR")
				.value_parser(value_parser!(PathBuf))
				.help("Directory to upload"),
		)
		.arg(Arg::new("auth-url").long("auth-url").value_name("URL").help("Authentication endpoint"))
		.arg(
			Arg::new("workers")
				.short('j')
				.long("workers")
				.value_name("N")
				.value_parser(value_parser!(usize))
				.help("Concurrent uploads and removals"),
		)
		.arg(
			Arg::new("attempts")
				.long("attempts")
				.value_name("N")
				.value_parser(value_parser!(u32))
				.help("Upload attempts per file"),
		)
		.arg(
			Arg::new("retry-delay-ms")
				.long("retry-delay-ms")
				.value_name("MS")
				.value_parser(value_parser!(u64))
				.help("Pause before a failed upload is retried"),
		)
		.arg(
			Arg::new("content-type")
				.long("content-type")
				.value_name("MIME")
				.help("Content-Type for every uploaded object"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::SetTrue)
				.help("Debug logging"),
		)
}


// vim: ts=4
