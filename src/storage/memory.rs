//! In-memory object store
//!
//! Keeps the container in a map and lets callers inject failures:
//! - fail the first K uploads of a given object name
//! - fail every removal of a given object name
//! - fail the container listing
//!
//! Every call is counted, so tests can check exactly how often the pipeline
//! touched the store. With [`MemoryStore::set_latency`] uploads and removals
//! stay in flight for a while, and the highest number of overlapping calls
//! is recorded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::{ObjectStore, RemoteObject, StorageResult};
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct StoredObject {
	data: Vec<u8>,
	content_type: Option<String>,
}

/// All mutable state behind a single lock
#[derive(Debug, Default)]
struct MemoryState {
	objects: BTreeMap<String, StoredObject>,
	/// Remaining forced upload failures per object name
	upload_failures: HashMap<String, usize>,
	remove_failures: HashSet<String>,
	fail_listing: bool,
	upload_attempts: HashMap<String, usize>,
	list_calls: usize,
	remove_attempts: usize,
	removed: Vec<String>,
	latency: Option<Duration>,
}

/// Overlapping upload and removal calls
#[derive(Debug, Default)]
struct InFlight {
	current: AtomicUsize,
	peak: AtomicUsize,
}

impl InFlight {
	fn enter(self: &Arc<Self>) -> InFlightCall {
		let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
		InFlightCall { counter: Arc::clone(self) }
	}
}

struct InFlightCall {
	counter: Arc<InFlight>,
}

impl Drop for InFlightCall {
	fn drop(&mut self) {
		self.counter.current.fetch_sub(1, Ordering::SeqCst);
	}
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
	container: String,
	state: Arc<Mutex<MemoryState>>,
	in_flight: Arc<InFlight>,
}

impl MemoryStore {
	pub fn new(container: impl Into<String>) -> Self {
		MemoryStore {
			container: container.into(),
			state: Arc::new(Mutex::new(MemoryState::default())),
			in_flight: Arc::new(InFlight::default()),
		}
	}

	fn state(&self) -> MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Put an object into the container directly
	pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
		self.state()
			.objects
			.insert(name.into(), StoredObject { data: data.into(), content_type: None });
	}

	/// Make the next `times` uploads of `name` fail
	pub fn fail_uploads(&self, name: impl Into<String>, times: usize) {
		self.state().upload_failures.insert(name.into(), times);
	}

	/// Make every upload of `name` fail
	pub fn fail_uploads_always(&self, name: impl Into<String>) {
		self.fail_uploads(name, usize::MAX);
	}

	/// Make every removal of `name` fail
	pub fn fail_remove(&self, name: impl Into<String>) {
		self.state().remove_failures.insert(name.into());
	}

	pub fn fail_listing(&self, fail: bool) {
		self.state().fail_listing = fail;
	}

	/// Keep every upload and removal busy for `latency`
	pub fn set_latency(&self, latency: Duration) {
		self.state().latency = Some(latency);
	}

	/// Most uploads and removals that were ever in flight at once
	pub fn peak_concurrency(&self) -> usize {
		self.in_flight.peak.load(Ordering::SeqCst)
	}

	async fn simulate_latency(&self) {
		let latency = self.state().latency;
		if let Some(latency) = latency {
			tokio::time::sleep(latency).await;
		}
	}

	/// Names of the objects currently stored, sorted
	pub fn object_names(&self) -> Vec<String> {
		self.state().objects.keys().cloned().collect()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.state().objects.contains_key(name)
	}

	pub fn content(&self, name: &str) -> Option<Vec<u8>> {
		self.state().objects.get(name).map(|o| o.data.clone())
	}

	pub fn content_type(&self, name: &str) -> Option<String> {
		self.state().objects.get(name).and_then(|o| o.content_type.clone())
	}

	/// Upload attempts made for `name`, failed ones included
	pub fn upload_attempts(&self, name: &str) -> usize {
		self.state().upload_attempts.get(name).copied().unwrap_or(0)
	}

	pub fn total_upload_attempts(&self) -> usize {
		self.state().upload_attempts.values().sum()
	}

	pub fn list_calls(&self) -> usize {
		self.state().list_calls
	}

	pub fn remove_attempts(&self) -> usize {
		self.state().remove_attempts
	}

	/// Names removed successfully, in removal order
	pub fn removed(&self) -> Vec<String> {
		self.state().removed.clone()
	}
}

#[async_trait]
impl ObjectStore for MemoryStore {
	fn container(&self) -> &str {
		&self.container
	}

	async fn list_objects(&self) -> StorageResult<Vec<RemoteObject>> {
		let mut state = self.state();
		state.list_calls += 1;
		if state.fail_listing {
			return Err(StorageError::Rejected {
				message: format!("listing of container {} refused", self.container),
			});
		}
		Ok(state
			.objects
			.iter()
			.map(|(name, object)| RemoteObject {
				name: name.clone(),
				bytes: object.data.len() as u64,
				content_type: object.content_type.clone(),
			})
			.collect())
	}

	async fn remove(&self, object: &RemoteObject) -> StorageResult<()> {
		let _call = self.in_flight.enter();
		self.simulate_latency().await;

		let mut state = self.state();
		state.remove_attempts += 1;
		if state.remove_failures.contains(&object.name) {
			return Err(StorageError::Rejected { message: format!("removal of {} refused", object.name) });
		}
		// Already gone counts as removed.
		if state.objects.remove(&object.name).is_some() {
			state.removed.push(object.name.clone());
		}
		Ok(())
	}

	async fn upload(
		&self,
		mut file: tokio::fs::File,
		name: &str,
		content_type: Option<&str>,
	) -> StorageResult<()> {
		let mut data = Vec::new();
		file.read_to_end(&mut data).await?;
		drop(file);

		let _call = self.in_flight.enter();
		self.simulate_latency().await;

		let mut state = self.state();
		*state.upload_attempts.entry(name.to_string()).or_insert(0) += 1;
		if let Some(remaining) = state.upload_failures.get_mut(name) {
			if *remaining > 0 {
				*remaining -= 1;
				return Err(StorageError::Rejected { message: format!("upload of {} refused", name) });
			}
		}
		state.objects.insert(
			name.to_string(),
			StoredObject { data, content_type: content_type.map(str::to_string) },
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	async fn open(dir: &TempDir, name: &str, content: &[u8]) -> tokio::fs::File {
		let path = dir.path().join(name);
		std::fs::write(&path, content).unwrap();
		tokio::fs::File::open(&path).await.unwrap()
	}

	#[tokio::test]
	async fn test_upload_then_list() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		store.upload(open(&dir, "a", b"hello").await, "a.txt", Some("text/plain")).await.unwrap();

		let objects = store.list_objects().await.unwrap();
		assert_eq!(objects.len(), 1);
		assert_eq!(objects[0].name, "a.txt");
		assert_eq!(objects[0].bytes, 5);
		assert_eq!(store.content_type("a.txt").as_deref(), Some("text/plain"));
	}

	#[tokio::test]
	async fn test_injected_upload_failures_run_out() {
		let dir = TempDir::new().unwrap();
		let store = MemoryStore::new("bucket");
		store.fail_uploads("a.txt", 2);

		assert!(store.upload(open(&dir, "a", b"x").await, "a.txt", None).await.is_err());
		assert!(store.upload(open(&dir, "a", b"x").await, "a.txt", None).await.is_err());
		assert!(store.upload(open(&dir, "a", b"x").await, "a.txt", None).await.is_ok());
		assert_eq!(store.upload_attempts("a.txt"), 3);
		assert!(store.contains("a.txt"));
	}

	#[tokio::test]
	async fn test_remove_failure_keeps_object() {
		let store = MemoryStore::new("bucket");
		store.insert("keep", "data");
		store.insert("drop", "data");
		store.fail_remove("keep");

		assert!(store.remove(&RemoteObject::new("keep")).await.is_err());
		store.remove(&RemoteObject::new("drop")).await.unwrap();
		assert_eq!(store.object_names(), vec!["keep".to_string()]);
		assert_eq!(store.remove_attempts(), 2);
		assert_eq!(store.removed(), vec!["drop".to_string()]);
	}

	#[tokio::test]
	async fn test_remove_missing_object_succeeds() {
		let store = MemoryStore::new("bucket");
		store.remove(&RemoteObject::new("never-there")).await.unwrap();
		assert_eq!(store.remove_attempts(), 1);
		assert!(store.removed().is_empty());
	}

	#[tokio::test]
	async fn test_peak_concurrency_is_recorded() {
		let store = MemoryStore::new("bucket");
		store.set_latency(Duration::from_millis(20));
		for i in 0..4 {
			store.insert(format!("o{}", i), "x");
		}

		let removals = (0..4).map(|i| {
			let store = store.clone();
			tokio::spawn(async move { store.remove(&RemoteObject::new(format!("o{}", i))).await })
		});
		for removal in removals.collect::<Vec<_>>() {
			removal.await.unwrap().unwrap();
		}
		assert!(store.peak_concurrency() >= 2);
		assert!(store.peak_concurrency() <= 4);
	}

	#[tokio::test]
	async fn test_listing_failure() {
		let store = MemoryStore::new("bucket");
		store.fail_listing(true);
		assert!(store.list_objects().await.is_err());
		assert_eq!(store.list_calls(), 1);
	}
}

// vim: ts=4
