//! Callback traits for pipeline event handling
//!
//! Logging happens inside the pipeline regardless; callbacks are for callers
//! that want to count, display or assert on what happened.

use crate::error::{StorageError, TaskError, WalkError};
use crate::storage::RemoteObject;
use crate::task::UploadTask;

// Type aliases to reduce complexity
type ObjectFn = dyn Fn(&RemoteObject) + Send + Sync;
type RemoveFailedFn = dyn Fn(&RemoteObject, &StorageError) + Send + Sync;
type TaskFn = dyn Fn(&UploadTask) + Send + Sync;
type RetryFn = dyn Fn(&UploadTask, &TaskError) + Send + Sync;
type AbandonFn = dyn Fn(&TaskError) + Send + Sync;
type WalkErrorFn = dyn Fn(&WalkError) + Send + Sync;

/// Combined callback handler for all pipeline events
///
/// Called from worker tasks and from the walker thread, possibly
/// concurrently; implementations must be cheap and must not block.
pub trait SyncCallbacks: Send + Sync {
	/// A remote object was removed during the deletion phase
	fn on_object_removed(&self, _object: &RemoteObject) {}

	/// Removing a remote object failed; it stays in the container
	fn on_remove_failed(&self, _object: &RemoteObject, _error: &StorageError) {}

	/// The walker queued a new file
	fn on_task_queued(&self, _task: &UploadTask) {}

	/// A worker is about to open and upload a file
	fn on_upload_attempt(&self, _task: &UploadTask) {}

	/// A file was uploaded
	fn on_uploaded(&self, _task: &UploadTask) {}

	/// An attempt failed and the task goes back into the queue
	///
	/// `task` already carries the decremented budget.
	fn on_retry(&self, _task: &UploadTask, _error: &TaskError) {}

	/// A task will never be uploaded
	fn on_abandoned(&self, _error: &TaskError) {}

	/// The directory walk hit an error
	fn on_walk_error(&self, _error: &WalkError) {}
}

/// Default callback implementation that does nothing
pub struct NoCallbacks;

impl SyncCallbacks for NoCallbacks {}

/// Builder for callbacks using function closures
#[derive(Default)]
pub struct CallbackBuilder {
	object_removed: Option<Box<ObjectFn>>,
	remove_failed: Option<Box<RemoveFailedFn>>,
	task_queued: Option<Box<TaskFn>>,
	upload_attempt: Option<Box<TaskFn>>,
	uploaded: Option<Box<TaskFn>>,
	retry: Option<Box<RetryFn>>,
	abandoned: Option<Box<AbandonFn>>,
	walk_error: Option<Box<WalkErrorFn>>,
}

impl CallbackBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_object_removed<F>(mut self, callback: F) -> Self
	where
		F: Fn(&RemoteObject) + Send + Sync + 'static,
	{
		self.object_removed = Some(Box::new(callback));
		self
	}

	pub fn on_remove_failed<F>(mut self, callback: F) -> Self
	where
		F: Fn(&RemoteObject, &StorageError) + Send + Sync + 'static,
	{
		self.remove_failed = Some(Box::new(callback));
		self
	}

	pub fn on_task_queued<F>(mut self, callback: F) -> Self
	where
		F: Fn(&UploadTask) + Send + Sync + 'static,
	{
		self.task_queued = Some(Box::new(callback));
		self
	}

	pub fn on_upload_attempt<F>(mut self, callback: F) -> Self
	where
		F: Fn(&UploadTask) + Send + Sync + 'static,
	{
		self.upload_attempt = Some(Box::new(callback));
		self
	}

	pub fn on_uploaded<F>(mut self, callback: F) -> Self
	where
		F: Fn(&UploadTask) + Send + Sync + 'static,
	{
		self.uploaded = Some(Box::new(callback));
		self
	}

	pub fn on_retry<F>(mut self, callback: F) -> Self
	where
		F: Fn(&UploadTask, &TaskError) + Send + Sync + 'static,
	{
		self.retry = Some(Box::new(callback));
		self
	}

	pub fn on_abandoned<F>(mut self, callback: F) -> Self
	where
		F: Fn(&TaskError) + Send + Sync + 'static,
	{
		self.abandoned = Some(Box::new(callback));
		self
	}

	pub fn on_walk_error<F>(mut self, callback: F) -> Self
	where
		F: Fn(&WalkError) + Send + Sync + 'static,
	{
		self.walk_error = Some(Box::new(callback));
		self
	}

	/// Build the callbacks handler
	pub fn build(self) -> Box<dyn SyncCallbacks> {
		Box::new(CompositeCallbacks {
			object_removed: self.object_removed,
			remove_failed: self.remove_failed,
			task_queued: self.task_queued,
			upload_attempt: self.upload_attempt,
			uploaded: self.uploaded,
			retry: self.retry,
			abandoned: self.abandoned,
			walk_error: self.walk_error,
		})
	}
}

/// Internal composite callbacks implementation
struct CompositeCallbacks {
	object_removed: Option<Box<ObjectFn>>,
	remove_failed: Option<Box<RemoveFailedFn>>,
	task_queued: Option<Box<TaskFn>>,
	upload_attempt: Option<Box<TaskFn>>,
	uploaded: Option<Box<TaskFn>>,
	retry: Option<Box<RetryFn>>,
	abandoned: Option<Box<AbandonFn>>,
	walk_error: Option<Box<WalkErrorFn>>,
}

impl SyncCallbacks for CompositeCallbacks {
	fn on_object_removed(&self, object: &RemoteObject) {
		if let Some(ref callback) = self.object_removed {
			callback(object);
		}
	}

	fn on_remove_failed(&self, object: &RemoteObject, error: &StorageError) {
		if let Some(ref callback) = self.remove_failed {
			callback(object, error);
		}
	}

	fn on_task_queued(&self, task: &UploadTask) {
		if let Some(ref callback) = self.task_queued {
			callback(task);
		}
	}

	fn on_upload_attempt(&self, task: &UploadTask) {
		if let Some(ref callback) = self.upload_attempt {
			callback(task);
		}
	}

	fn on_uploaded(&self, task: &UploadTask) {
		if let Some(ref callback) = self.uploaded {
			callback(task);
		}
	}

	fn on_retry(&self, task: &UploadTask, error: &TaskError) {
		if let Some(ref callback) = self.retry {
			callback(task, error);
		}
	}

	fn on_abandoned(&self, error: &TaskError) {
		if let Some(ref callback) = self.abandoned {
			callback(error);
		}
	}

	fn on_walk_error(&self, error: &WalkError) {
		if let Some(ref callback) = self.walk_error {
			callback(error);
		}
	}
}


// vim: ts=4
