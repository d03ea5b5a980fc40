//! Object storage seam used by the deletion phase and the upload workers
//!
//! The pipeline only ever needs three operations: list the objects of one
//! container, remove one of them, and upload a file under a name. Anything
//! implementing [`ObjectStore`] can be synchronized against; the crate ships
//! a Swift HTTP client and an in-memory store.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::StorageError;

pub mod memory;
pub mod swift;

pub use memory::MemoryStore;
pub use swift::{Credentials, SwiftOptions, SwiftStore};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One object as reported by a container listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteObject {
	pub name: String,

	/// Size in bytes, 0 when the store did not report it
	#[serde(default)]
	pub bytes: u64,

	#[serde(default)]
	pub content_type: Option<String>,
}

impl RemoteObject {
	pub fn new(name: impl Into<String>) -> Self {
		RemoteObject { name: name.into(), bytes: 0, content_type: None }
	}
}

/// Operations on a single remote container
///
/// Implementations are shared read-only between all workers, so every method
/// takes `&self` and must be safe to call concurrently.
#[async_trait]
pub trait ObjectStore: Send + Sync {
	/// Name of the container this store operates on
	fn container(&self) -> &str;

	/// List every object currently in the container, in no particular order
	async fn list_objects(&self) -> StorageResult<Vec<RemoteObject>>;

	/// Remove one object
	async fn remove(&self, object: &RemoteObject) -> StorageResult<()>;

	/// Upload the contents of `file` as object `name`
	///
	/// The file handle is consumed and released whether or not the upload
	/// succeeds.
	async fn upload(
		&self,
		file: tokio::fs::File,
		name: &str,
		content_type: Option<&str>,
	) -> StorageResult<()>;
}

// vim: ts=4
