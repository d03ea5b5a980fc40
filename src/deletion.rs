//! Clearing the remote container before uploads start
//!
//! Listing failure is fatal. Individual removals are best-effort: a failed
//! removal is logged, recorded and left alone, it is never retried.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::callbacks::SyncCallbacks;
use crate::error::{StorageError, SyncError};
use crate::logging::*;
use crate::storage::{ObjectStore, RemoteObject};

/// Outcome of the deletion phase
#[derive(Debug, Default)]
pub struct DeletionSummary {
	/// Objects found in the container
	pub listed: usize,

	pub removed: usize,

	/// Objects left in place, with the reason
	pub failed: Vec<(RemoteObject, StorageError)>,
}

pub struct DeletionPhase {
	store: Arc<dyn ObjectStore>,
	callbacks: Arc<dyn SyncCallbacks>,
	concurrency: usize,
}

impl DeletionPhase {
	pub fn new(
		store: Arc<dyn ObjectStore>,
		callbacks: Arc<dyn SyncCallbacks>,
		concurrency: usize,
	) -> Self {
		DeletionPhase { store, callbacks, concurrency: concurrency.max(1) }
	}

	/// List the container and remove every object in it
	///
	/// Returns once every removal attempt has finished, successful or not.
	pub async fn run(&self) -> Result<DeletionSummary, SyncError> {
		let objects = self.store.list_objects().await.map_err(SyncError::Listing)?;
		let mut summary = DeletionSummary { listed: objects.len(), ..Default::default() };
		info!("Removing {} objects from container {}", objects.len(), self.store.container());

		let results: Vec<(RemoteObject, Result<(), StorageError>)> = stream::iter(objects)
			.map(|object| {
				let store = Arc::clone(&self.store);
				async move {
					let result = store.remove(&object).await;
					(object, result)
				}
			})
			.buffer_unordered(self.concurrency)
			.collect()
			.await;

		for (object, result) in results {
			match result {
				Ok(()) => {
					info!("Object {} removed", object.name);
					self.callbacks.on_object_removed(&object);
					summary.removed += 1;
				}
				Err(e) => {
					warn!("Can't remove object {}: {}", object.name, e);
					self.callbacks.on_remove_failed(&object, &e);
					summary.failed.push((object, e));
				}
			}
		}

		info!(
			"Removed {} of {} objects ({} failed)",
			summary.removed,
			summary.listed,
			summary.failed.len()
		);
		Ok(summary)
	}
}


// vim: ts=4
