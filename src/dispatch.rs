//! Upload worker pool draining the work queue
//!
//! A fixed number of long-lived workers pull tasks off the shared
//! [`WorkQueue`]. Each task is opened and uploaded; a failed attempt costs
//! one unit of the task's budget and the task goes back into the queue, or
//! is abandoned when the budget is spent. Abandonment is always reported.
//!
//! A resubmitted task is registered with the completion barrier before the
//! guard of the failed attempt is released, so the barrier cannot drain
//! while a retry is in flight. With a retry delay the old guard moves into
//! the timer task and is only released after the resubmission.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinSet;

use crate::barrier::WorkGuard;
use crate::callbacks::SyncCallbacks;
use crate::error::{SyncError, TaskError};
use crate::logging::*;
use crate::queue::WorkQueue;
use crate::storage::ObjectStore;
use crate::task::UploadTask;

/// Default number of concurrent upload workers
pub const DEFAULT_WORKERS: usize = 16;

#[derive(Debug, Clone)]
pub struct DispatchOptions {
	pub workers: usize,

	/// Wait before a failed task is put back; `None` resubmits at once
	pub retry_delay: Option<Duration>,

	/// Passed to the store with every upload
	pub content_type: Option<String>,
}

impl Default for DispatchOptions {
	fn default() -> Self {
		DispatchOptions { workers: DEFAULT_WORKERS, retry_delay: None, content_type: None }
	}
}

/// Totals of the upload phase
#[derive(Debug, Default)]
pub struct DispatchSummary {
	pub uploaded: usize,

	/// Upload attempts made, including failed ones
	pub attempts: usize,

	/// Tasks put back into the queue
	pub retries: usize,

	pub abandoned: Vec<TaskError>,
}

struct WorkerContext {
	queue: Arc<WorkQueue>,
	store: Arc<dyn ObjectStore>,
	callbacks: Arc<dyn SyncCallbacks>,
	retry_delay: Option<Duration>,
	content_type: Option<String>,
	summary: Mutex<DispatchSummary>,
}

pub struct Dispatcher {
	context: Arc<WorkerContext>,
	workers: usize,
}

impl Dispatcher {
	pub fn new(
		queue: Arc<WorkQueue>,
		store: Arc<dyn ObjectStore>,
		callbacks: Arc<dyn SyncCallbacks>,
		options: DispatchOptions,
	) -> Self {
		let context = WorkerContext {
			queue,
			store,
			callbacks,
			retry_delay: options.retry_delay,
			content_type: options.content_type,
			summary: Mutex::new(DispatchSummary::default()),
		};
		Dispatcher { context: Arc::new(context), workers: options.workers.max(1) }
	}

	/// Start the worker pool
	///
	/// Workers run until the queue is closed and drained.
	pub fn spawn(self) -> DispatcherHandle {
		let mut workers = JoinSet::new();
		for id in 0..self.workers {
			let context = Arc::clone(&self.context);
			workers.spawn(async move { context.run_worker(id).await });
		}
		debug!("Started {} upload workers", self.workers);
		DispatcherHandle { workers, context: self.context }
	}
}

/// Running worker pool
pub struct DispatcherHandle {
	workers: JoinSet<()>,
	context: Arc<WorkerContext>,
}

impl DispatcherHandle {
	/// Wait for every worker to exit and collect the totals
	///
	/// Only returns after the queue has been closed.
	pub async fn join(mut self) -> Result<DispatchSummary, SyncError> {
		while let Some(result) = self.workers.join_next().await {
			result?;
		}
		let mut summary = self.context.summary.lock().unwrap_or_else(|e| e.into_inner());
		Ok(std::mem::take(&mut *summary))
	}

	/// Wait for all outstanding work, close the queue, then join the workers
	///
	/// A worker that panics stops the run: the queue is closed, the rest of
	/// the pool is aborted and the panic comes back as [`SyncError::Join`].
	/// Tasks still queued at that point are dropped unprocessed.
	pub async fn finish(mut self) -> Result<DispatchSummary, SyncError> {
		let queue = Arc::clone(&self.context.queue);
		loop {
			tokio::select! {
				_ = queue.barrier().wait() => break,
				joined = self.workers.join_next() => match joined {
					Some(Err(e)) => {
						error!("Upload worker died: {}", e);
						queue.close();
						self.workers.abort_all();
						return Err(e.into());
					}
					Some(Ok(())) => {}
					None => break,
				},
			}
		}
		// Retries resubmit into the queue, so it may only close once nothing is outstanding.
		queue.close();
		self.join().await
	}

	/// Stop all workers without waiting for the queue
	pub fn abort(&mut self) {
		self.workers.abort_all();
	}
}

impl WorkerContext {
	async fn run_worker(self: Arc<Self>, id: usize) {
		debug!("Upload worker {} started", id);
		while let Some(queued) = self.queue.next().await {
			let (task, guard) = queued.into_parts();
			self.process(task, guard).await;
		}
		debug!("Upload worker {} finished", id);
	}

	fn summary(&self) -> std::sync::MutexGuard<'_, DispatchSummary> {
		self.summary.lock().unwrap_or_else(|e| e.into_inner())
	}

	async fn process(self: &Arc<Self>, task: UploadTask, guard: WorkGuard) {
		if task.is_exhausted() {
			self.abandon(TaskError::AttemptsExhausted {
				path: task.path,
				attempts: task.attempts_made,
				last: None,
			});
			return;
		}

		self.callbacks.on_upload_attempt(&task);
		self.summary().attempts += 1;

		match self.upload(&task).await {
			Ok(()) => {
				info!("File {} uploaded", task.path.display());
				self.summary().uploaded += 1;
				self.callbacks.on_uploaded(&task);
			}
			Err(err) => match task.after_failure() {
				Ok(next) => {
					warn!("{} ({} attempts left)", err, next.attempts_remaining);
					self.callbacks.on_retry(&next, &err);
					self.summary().retries += 1;
					self.schedule_retry(next, guard);
				}
				Err(spent) => {
					warn!("{}", err);
					self.abandon(TaskError::AttemptsExhausted {
						path: spent.path,
						attempts: spent.attempts_made,
						last: Some(Box::new(err)),
					});
				}
			},
		}
	}

	async fn upload(&self, task: &UploadTask) -> Result<(), TaskError> {
		let file = tokio::fs::File::open(&task.path)
			.await
			.map_err(|source| TaskError::Open { path: task.path.clone(), source })?;
		self.store
			.upload(file, &task.object_name, self.content_type.as_deref())
			.await
			.map_err(|source| TaskError::Upload { path: task.path.clone(), source })
	}

	/// Put a failed task back, keeping `guard` alive until it is queued again
	fn schedule_retry(self: &Arc<Self>, task: UploadTask, guard: WorkGuard) {
		match self.retry_delay {
			None => {
				self.resubmit(task);
				guard.end();
			}
			Some(delay) => {
				let context = Arc::clone(self);
				tokio::spawn(async move {
					tokio::time::sleep(delay).await;
					context.resubmit(task);
					guard.end();
				});
			}
		}
	}

	fn resubmit(&self, task: UploadTask) {
		if let Err(task) = self.queue.submit(task) {
			self.abandon(TaskError::QueueClosed { path: task.path });
		}
	}

	fn abandon(&self, err: TaskError) {
		error!("{}", err);
		self.callbacks.on_abandoned(&err);
		self.summary().abandoned.push(err);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::barrier::CompletionBarrier;
	use crate::callbacks::NoCallbacks;
	use crate::storage::MemoryStore;
	use std::fs;
	use std::path::Path;
	use tempfile::TempDir;
	use tokio::time::timeout;

	fn setup(store: &MemoryStore, options: DispatchOptions) -> (Arc<WorkQueue>, DispatcherHandle) {
		let queue = Arc::new(WorkQueue::new(CompletionBarrier::new()));
		let handle = Dispatcher::new(
			Arc::clone(&queue),
			Arc::new(store.clone()),
			Arc::new(NoCallbacks),
			options,
		)
		.spawn();
		(queue, handle)
	}

	fn file_task(dir: &Path, name: &str, attempts: u32) -> UploadTask {
		let path = dir.join(name);
		fs::write(&path, name.as_bytes()).unwrap();
		UploadTask::new(path, name.to_string(), attempts)
	}

	async fn finish(handle: DispatcherHandle) -> DispatchSummary {
		timeout(Duration::from_secs(10), handle.finish()).await.unwrap().unwrap()
	}

	#[tokio::test]
	async fn test_uploads_every_task() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		let (queue, handle) = setup(&store, DispatchOptions { workers: 3, ..Default::default() });

		for i in 0..10 {
			queue.submit(file_task(dir.path(), &format!("f{}", i), 5)).unwrap();
		}

		let summary = finish(handle).await;
		assert_eq!(summary.uploaded, 10);
		assert_eq!(summary.attempts, 10);
		assert!(summary.abandoned.is_empty());
		assert_eq!(store.object_names().len(), 10);
		assert_eq!(store.content("f3"), Some(b"f3".to_vec()));
	}

	#[tokio::test]
	async fn test_pool_caps_concurrent_uploads() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		store.set_latency(Duration::from_millis(10));
		let (queue, handle) = setup(&store, DispatchOptions { workers: 3, ..Default::default() });

		for i in 0..30 {
			queue.submit(file_task(dir.path(), &format!("f{}", i), 5)).unwrap();
		}

		let summary = finish(handle).await;
		assert_eq!(summary.uploaded, 30);
		let peak = store.peak_concurrency();
		assert!(peak > 1 && peak <= 3, "peak {}", peak);
	}

	#[tokio::test]
	async fn test_missing_file_is_retried_then_abandoned() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		let (queue, handle) = setup(&store, DispatchOptions::default());

		let task = UploadTask::new(dir.path().join("ghost"), "ghost".to_string(), 3);
		queue.submit(task).unwrap();

		let summary = finish(handle).await;
		assert_eq!(summary.attempts, 3);
		assert_eq!(summary.retries, 2);
		assert_eq!(summary.abandoned.len(), 1);
		match &summary.abandoned[0] {
			TaskError::AttemptsExhausted { attempts, last: Some(last), .. } => {
				assert_eq!(*attempts, 3);
				assert!(matches!(**last, TaskError::Open { .. }));
			}
			other => panic!("unexpected error: {}", other),
		}
		assert_eq!(store.total_upload_attempts(), 0);
	}

	#[tokio::test]
	async fn test_zero_budget_task_is_reported() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		let (queue, handle) = setup(&store, DispatchOptions::default());

		queue.submit(file_task(dir.path(), "a", 0)).unwrap();

		let summary = finish(handle).await;
		assert_eq!(summary.attempts, 0);
		assert!(matches!(
			summary.abandoned.as_slice(),
			[TaskError::AttemptsExhausted { attempts: 0, last: None, .. }]
		));
	}

	#[tokio::test]
	async fn test_delayed_retry_holds_barrier() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		store.fail_uploads("a", 2);
		let options = DispatchOptions {
			workers: 1,
			retry_delay: Some(Duration::from_millis(30)),
			..Default::default()
		};
		let (queue, handle) = setup(&store, options);

		queue.submit(file_task(dir.path(), "a", 5)).unwrap();

		let summary = finish(handle).await;
		assert_eq!(summary.uploaded, 1);
		assert_eq!(summary.attempts, 3);
		assert!(summary.abandoned.is_empty());
		assert_eq!(queue.submitted(), 3);
	}

	#[tokio::test]
	async fn test_content_type_is_forwarded() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		let options =
			DispatchOptions { content_type: Some("text/html".to_string()), ..Default::default() };
		let (queue, handle) = setup(&store, options);

		queue.submit(file_task(dir.path(), "index.html", 5)).unwrap();

		finish(handle).await;
		assert_eq!(store.content_type("index.html").as_deref(), Some("text/html"));
	}
}

// vim: ts=4
