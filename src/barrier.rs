//! Completion barrier tracking outstanding pipeline work
//!
//! Every unit of work registers with [`CompletionBarrier::begin`] and gets a
//! [`WorkGuard`] back; dropping the guard marks the unit complete. Because the
//! guard is dropped on every exit path, an early return can never leave the
//! count stuck above zero, and a unit can never be ended twice.
//!
//! A retry must call `begin()` for the resubmitted task *before* the guard of
//! the failed attempt is dropped. The work queue does this by moving a fresh
//! guard into every submitted task while the worker still holds the old one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct BarrierState {
	outstanding: AtomicUsize,
	drained: Notify,
}

/// Counter of outstanding work that can be awaited until it drops to zero
#[derive(Debug, Clone, Default)]
pub struct CompletionBarrier {
	state: Arc<BarrierState>,
}

impl CompletionBarrier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register one more unit of outstanding work
	pub fn begin(&self) -> WorkGuard {
		self.state.outstanding.fetch_add(1, Ordering::AcqRel);
		WorkGuard { state: Arc::clone(&self.state) }
	}

	/// Number of units currently registered
	pub fn outstanding(&self) -> usize {
		self.state.outstanding.load(Ordering::Acquire)
	}

	/// Wait until no work is outstanding
	///
	/// Only meaningful once every producer either holds a guard or has
	/// finished; otherwise a later `begin()` may follow the zero observed here.
	pub async fn wait(&self) {
		loop {
			let drained = self.state.drained.notified();
			tokio::pin!(drained);
			// Register interest before checking so a concurrent drop can't slip between.
			drained.as_mut().enable();
			if self.outstanding() == 0 {
				return;
			}
			drained.await;
		}
	}
}

/// Proof of one registered unit of work; dropping it ends the unit
#[derive(Debug)]
#[must_use = "dropping the guard immediately ends the unit of work"]
pub struct WorkGuard {
	state: Arc<BarrierState>,
}

impl WorkGuard {
	/// End the unit of work explicitly
	pub fn end(self) {}
}

impl Drop for WorkGuard {
	fn drop(&mut self) {
		if self.state.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
			self.state.drained.notify_waiters();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tokio::time::timeout;

	#[tokio::test]
	async fn test_wait_returns_immediately_when_idle() {
		let barrier = CompletionBarrier::new();
		timeout(Duration::from_secs(1), barrier.wait()).await.unwrap();
	}

	#[tokio::test]
	async fn test_wait_blocks_until_guards_dropped() {
		let barrier = CompletionBarrier::new();
		let first = barrier.begin();
		let second = barrier.begin();
		assert_eq!(barrier.outstanding(), 2);

		let waiter = {
			let barrier = barrier.clone();
			tokio::spawn(async move { barrier.wait().await })
		};

		drop(first);
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(!waiter.is_finished());

		second.end();
		timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
		assert_eq!(barrier.outstanding(), 0);
	}

	#[tokio::test]
	async fn test_handoff_never_reaches_zero() {
		let barrier = CompletionBarrier::new();
		let mut guard = barrier.begin();
		for _ in 0..100 {
			let next = barrier.begin();
			drop(guard);
			assert_eq!(barrier.outstanding(), 1);
			guard = next;
		}
		drop(guard);
		assert_eq!(barrier.outstanding(), 0);
	}

	#[tokio::test]
	async fn test_guards_dropped_across_tasks() {
		let barrier = CompletionBarrier::new();
		let mut handles = Vec::new();
		for i in 0..32u64 {
			let guard = barrier.begin();
			handles.push(tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(i % 5)).await;
				drop(guard);
			}));
		}
		timeout(Duration::from_secs(5), barrier.wait()).await.unwrap();
		assert_eq!(barrier.outstanding(), 0);
		for handle in handles {
			handle.await.unwrap();
		}
	}
}

// vim: ts=4
