//! Unbounded work queue feeding the upload workers
//!
//! Producers (the directory walker and workers resubmitting failed tasks)
//! call [`WorkQueue::submit`]; the worker pool pulls with
//! [`WorkQueue::next`]. Each queued task owns a [`WorkGuard`] of the
//! completion barrier, so the barrier only drains once every task, retries
//! included, has been fully processed.
//!
//! Closing is explicit and belongs to the pipeline orchestrator, which only
//! closes after the barrier reports zero. Buffered tasks are still delivered
//! after close; new submissions are refused.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::barrier::{CompletionBarrier, WorkGuard};
use crate::task::UploadTask;

/// A task sitting in the queue together with its barrier registration
#[derive(Debug)]
pub struct Queued {
	pub task: UploadTask,
	pub(crate) guard: WorkGuard,
}

impl Queued {
	/// Split into the task and the guard that keeps it registered
	pub fn into_parts(self) -> (UploadTask, WorkGuard) {
		(self.task, self.guard)
	}
}

pub struct WorkQueue {
	sender: Mutex<Option<mpsc::UnboundedSender<Queued>>>,
	receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Queued>>,
	barrier: CompletionBarrier,
	submitted: AtomicUsize,
}

impl WorkQueue {
	pub fn new(barrier: CompletionBarrier) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		WorkQueue {
			sender: Mutex::new(Some(tx)),
			receiver: tokio::sync::Mutex::new(rx),
			barrier,
			submitted: AtomicUsize::new(0),
		}
	}

	/// Enqueue a task
	///
	/// The task is registered with the barrier before it becomes visible to
	/// workers. Hands the task back if the queue is already closed.
	pub fn submit(&self, task: UploadTask) -> Result<(), UploadTask> {
		let guard = self.barrier.begin();
		let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
		let Some(tx) = sender.as_ref() else {
			return Err(task);
		};
		tx.send(Queued { task, guard }).map_err(|e| e.0.task)?;
		self.submitted.fetch_add(1, Ordering::Relaxed);
		Ok(())
	}

	/// Wait for the next task; `None` once the queue is closed and drained
	pub async fn next(&self) -> Option<Queued> {
		self.receiver.lock().await.recv().await
	}

	/// Refuse further submissions; buffered tasks are still delivered
	pub fn close(&self) {
		self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
	}

	pub fn is_closed(&self) -> bool {
		self.sender.lock().unwrap_or_else(|e| e.into_inner()).is_none()
	}

	pub fn barrier(&self) -> &CompletionBarrier {
		&self.barrier
	}

	/// Total number of accepted submissions, initial and retried
	pub fn submitted(&self) -> usize {
		self.submitted.load(Ordering::Relaxed)
	}
}


// vim: ts=4
