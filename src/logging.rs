//! Logging prelude module for convenient access to tracing macros.
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("File {} uploaded", path.display());
//! warn!("Can't remove object {}: {}", name, err);
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` takes precedence when set. Otherwise INFO and above are shown,
/// or DEBUG and above when `verbose` is set:
///
/// ```bash
/// RUST_LOG=debug cloudpush --dir ./site --container www
/// RUST_LOG=cloudpush::dispatch=trace cloudpush --dir ./site --container www
/// ```
pub fn init_tracing(verbose: bool) {
	let default_level = if verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.init();
}

// vim: ts=4
