//! Upload task carried through the work queue

use std::path::PathBuf;

/// Attempts granted to a freshly discovered file
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// One file waiting to be uploaded, plus what is left of its retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
	/// Path of the local file as produced by the walker
	pub path: PathBuf,

	/// Remote object name the file is stored under
	pub object_name: String,

	/// Attempts left before the task is abandoned
	pub attempts_remaining: u32,

	/// Attempts already made
	pub attempts_made: u32,
}

impl UploadTask {
	pub fn new(path: PathBuf, object_name: String, attempts: u32) -> Self {
		UploadTask { path, object_name, attempts_remaining: attempts, attempts_made: 0 }
	}

	/// Budget exhausted, the task must not be attempted again
	pub fn is_exhausted(&self) -> bool {
		self.attempts_remaining == 0
	}

	/// Consume one attempt after a failure
	///
	/// `Ok` carries the task to resubmit, `Err` the task whose budget just ran out.
	pub fn after_failure(mut self) -> Result<Self, Self> {
		self.attempts_made += 1;
		self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
		if self.is_exhausted() {
			Err(self)
		} else {
			Ok(self)
		}
	}
}


// vim: ts=4
