use std::process::ExitCode;
use std::sync::Arc;

use cloudpush::cli;
use cloudpush::logging::*;
use cloudpush::storage::SwiftStore;
use cloudpush::{Config, SyncBuilder, SyncError, SyncReport};

async fn run(config: Config) -> Result<SyncReport, SyncError> {
	info!("Connecting to container {} as {}", config.container, config.user);
	let store = SwiftStore::connect(&config.credentials(), &config.swift_options())
		.await
		.map_err(SyncError::Connect)?;
	SyncBuilder::from_config(&config).run(Arc::new(store)).await
}

#[tokio::main]
async fn main() -> ExitCode {
	let matches = cli::command().get_matches();
	init_tracing(matches.get_flag("verbose"));

	let config = match Config::resolve(&matches) {
		Ok(config) => config,
		Err(e) => {
			error!("{}", e);
			return ExitCode::from(2);
		}
	};
	debug!("{:?}", config);

	match run(config).await {
		Ok(report) => {
			report.log_summary();
			if report.is_success() {
				info!("Well done!");
				ExitCode::SUCCESS
			} else {
				ExitCode::from(1)
			}
		}
		Err(e) => {
			error!("{}", e);
			ExitCode::from(2)
		}
	}
}

// vim: ts=4
