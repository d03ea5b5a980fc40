//! Error types for cloudpush operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for sync operations
///
/// Only failures that stop the whole run end up here. Per-file problems are
/// reported as [`TaskError`] and per-object removal problems as
/// [`StorageError`] through callbacks and the final report.
#[derive(Debug)]
pub enum SyncError {
	/// Configuration could not be resolved or failed validation
	InvalidConfig { message: String },

	/// Authentication against the storage service failed
	Connect(StorageError),

	/// Listing the container failed, nothing was uploaded
	Listing(StorageError),

	/// A pipeline task panicked or was cancelled
	Join { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::Connect(e) => write!(f, "Cannot connect to storage: {}", e),
			SyncError::Listing(e) => write!(f, "Cannot list container: {}", e),
			SyncError::Join { message } => write!(f, "Worker failed: {}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Connect(e) | SyncError::Listing(e) => Some(e),
			_ => None,
		}
	}
}

impl From<tokio::task::JoinError> for SyncError {
	fn from(e: tokio::task::JoinError) -> Self {
		SyncError::Join { message: e.to_string() }
	}
}

/// Errors coming back from the object storage collaborator
#[derive(Debug)]
pub enum StorageError {
	/// Transport level failure (DNS, TLS, connection reset, timeout)
	Http(reqwest::Error),

	/// The service answered with an unexpected status code
	Status { method: &'static str, url: String, status: u16 },

	/// Credentials were rejected or the auth response was incomplete
	Auth { message: String },

	/// Container listing could not be decoded
	InvalidListing { message: String },

	/// Local I/O failure while streaming a body
	Io(io::Error),

	/// The store refused the request
	Rejected { message: String },
}

impl fmt::Display for StorageError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StorageError::Http(e) => write!(f, "HTTP error: {}", e),
			StorageError::Status { method, url, status } => {
				write!(f, "{} {} returned status {}", method, url, status)
			}
			StorageError::Auth { message } => write!(f, "Authentication failed: {}", message),
			StorageError::InvalidListing { message } => {
				write!(f, "Invalid container listing: {}", message)
			}
			StorageError::Io(e) => write!(f, "I/O error: {}", e),
			StorageError::Rejected { message } => write!(f, "Request rejected: {}", message),
		}
	}
}

impl Error for StorageError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			StorageError::Http(e) => Some(e),
			StorageError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<reqwest::Error> for StorageError {
	fn from(e: reqwest::Error) -> Self {
		StorageError::Http(e)
	}
}

impl From<io::Error> for StorageError {
	fn from(e: io::Error) -> Self {
		StorageError::Io(e)
	}
}

impl From<serde_json::Error> for StorageError {
	fn from(e: serde_json::Error) -> Self {
		StorageError::InvalidListing { message: e.to_string() }
	}
}

/// Failure of a single upload task
#[derive(Debug)]
pub enum TaskError {
	/// The local file could not be opened (retried)
	Open { path: PathBuf, source: io::Error },

	/// The upload request failed (retried)
	Upload { path: PathBuf, source: StorageError },

	/// The retry budget ran out; `last` is the failure of the final attempt
	AttemptsExhausted { path: PathBuf, attempts: u32, last: Option<Box<TaskError>> },

	/// A retry was submitted after the queue had been closed
	QueueClosed { path: PathBuf },
}

impl fmt::Display for TaskError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TaskError::Open { path, source } => {
				write!(f, "Can't open file {}: {}", path.display(), source)
			}
			TaskError::Upload { path, source } => {
				write!(f, "Can't upload file {}: {}", path.display(), source)
			}
			TaskError::AttemptsExhausted { path, attempts, last } => match last {
				Some(last) => write!(
					f,
					"Giving up on {} after {} attempts, last error: {}",
					path.display(),
					attempts,
					last
				),
				None => write!(f, "Giving up on {} after {} attempts", path.display(), attempts),
			},
			TaskError::QueueClosed { path } => {
				write!(f, "Work queue closed before {} could be retried", path.display())
			}
		}
	}
}

impl Error for TaskError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			TaskError::Open { source, .. } => Some(source),
			TaskError::Upload { source, .. } => Some(source),
			TaskError::AttemptsExhausted { last: Some(last), .. } => Some(last.as_ref()),
			_ => None,
		}
	}
}

/// Directory traversal failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
	/// Entry the error is attached to, when the walker knows it
	pub path: Option<PathBuf>,
	pub message: String,
}

impl fmt::Display for WalkError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.path {
			Some(path) => write!(f, "Walk error at {}: {}", path.display(), self.message),
			None => write!(f, "Walk error: {}", self.message),
		}
	}
}

impl Error for WalkError {}

impl From<ignore::Error> for WalkError {
	fn from(e: ignore::Error) -> Self {
		let path = walk_error_path(&e);
		WalkError { path, message: e.to_string() }
	}
}

fn walk_error_path(e: &ignore::Error) -> Option<PathBuf> {
	match e {
		ignore::Error::WithPath { path, .. } => Some(path.clone()),
		ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
			walk_error_path(err)
		}
		ignore::Error::Loop { child, .. } => Some(child.clone()),
		_ => None,
	}
}


// vim: ts=4
