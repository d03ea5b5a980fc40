//! Pipeline orchestration: clear the container, then upload the tree
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cloudpush::storage::MemoryStore;
//! use cloudpush::sync::SyncBuilder;
//!
//! let store = MemoryStore::new("www");
//! let report = SyncBuilder::new("./site").workers(8).run(Arc::new(store)).await?;
//! assert!(report.is_success());
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::barrier::CompletionBarrier;
use crate::callbacks::{NoCallbacks, SyncCallbacks};
use crate::config::Config;
use crate::deletion::{DeletionPhase, DeletionSummary};
use crate::dispatch::{DispatchOptions, DispatchSummary, Dispatcher, DEFAULT_WORKERS};
use crate::error::SyncError;
use crate::logging::*;
use crate::queue::WorkQueue;
use crate::storage::ObjectStore;
use crate::task::DEFAULT_ATTEMPTS;
use crate::walker::{DirectoryWalker, WalkSummary};

/// Everything that happened during one run
#[derive(Debug)]
pub struct SyncReport {
	pub deletion: DeletionSummary,
	pub walk: WalkSummary,
	pub uploads: DispatchSummary,
	/// Accepted queue submissions, initial and retried
	pub queued: usize,
	pub elapsed: Duration,
}

impl SyncReport {
	/// Every discovered file was uploaded and the walk saw no errors
	///
	/// Failed removals do not count against success.
	pub fn is_success(&self) -> bool {
		self.uploads.abandoned.is_empty() && self.walk.errors.is_empty()
	}

	/// Write the end-of-run summary to the log
	pub fn log_summary(&self) {
		info!(
			"Removed {}/{} objects, uploaded {}/{} files in {:.1}s ({} attempts, {} retries)",
			self.deletion.removed,
			self.deletion.listed,
			self.uploads.uploaded,
			self.walk.submitted,
			self.elapsed.as_secs_f64(),
			self.uploads.attempts,
			self.uploads.retries
		);
		for (object, err) in &self.deletion.failed {
			warn!("Left in container: {} ({})", object.name, err);
		}
		for err in &self.walk.errors {
			error!("{}", err);
		}
		for err in &self.uploads.abandoned {
			error!("Not uploaded: {}", err);
		}
	}
}

/// Builder for a sync run
pub struct SyncBuilder {
	root: PathBuf,
	workers: usize,
	max_attempts: u32,
	retry_delay: Option<Duration>,
	content_type: Option<String>,
	callbacks: Arc<dyn SyncCallbacks>,
}

impl SyncBuilder {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		SyncBuilder {
			root: root.into(),
			workers: DEFAULT_WORKERS,
			max_attempts: DEFAULT_ATTEMPTS,
			retry_delay: None,
			content_type: None,
			callbacks: Arc::new(NoCallbacks),
		}
	}

	pub fn from_config(config: &Config) -> Self {
		SyncBuilder::new(&config.directory)
			.workers(config.workers)
			.max_attempts(config.max_attempts)
			.retry_delay(config.retry_delay())
			.content_type(config.content_type.clone())
	}

	pub fn workers(mut self, workers: usize) -> Self {
		self.workers = workers;
		self
	}

	/// Attempts per file before it is abandoned
	pub fn max_attempts(mut self, attempts: u32) -> Self {
		self.max_attempts = attempts;
		self
	}

	pub fn retry_delay(mut self, delay: Option<Duration>) -> Self {
		self.retry_delay = delay;
		self
	}

	pub fn content_type(mut self, content_type: Option<String>) -> Self {
		self.content_type = content_type;
		self
	}

	pub fn callbacks(mut self, callbacks: Arc<dyn SyncCallbacks>) -> Self {
		self.callbacks = callbacks;
		self
	}

	/// Run deletion and upload against `store`
	///
	/// Fails only when the container can't be listed or a pipeline task
	/// dies; per-file failures end up in the report.
	pub async fn run(self, store: Arc<dyn ObjectStore>) -> Result<SyncReport, SyncError> {
		let started = Instant::now();

		let deletion =
			DeletionPhase::new(Arc::clone(&store), Arc::clone(&self.callbacks), self.workers)
				.run()
				.await?;

		let queue = Arc::new(WorkQueue::new(CompletionBarrier::new()));
		let mut dispatcher = Dispatcher::new(
			Arc::clone(&queue),
			store,
			Arc::clone(&self.callbacks),
			DispatchOptions {
				workers: self.workers,
				retry_delay: self.retry_delay,
				content_type: self.content_type,
			},
		)
		.spawn();

		info!("Uploading {}", self.root.display());
		let walker = DirectoryWalker::new(self.root, self.max_attempts);
		let walk = {
			let queue = Arc::clone(&queue);
			let callbacks = Arc::clone(&self.callbacks);
			tokio::task::spawn_blocking(move || walker.walk(&queue, callbacks.as_ref())).await
		};
		let walk = match walk {
			Ok(walk) => walk,
			Err(e) => {
				queue.close();
				dispatcher.abort();
				return Err(e.into());
			}
		};

		let uploads = dispatcher.finish().await?;

		Ok(SyncReport {
			deletion,
			walk,
			uploads,
			queued: queue.submitted(),
			elapsed: started.elapsed(),
		})
	}
}

// vim: ts=4
