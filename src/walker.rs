//! Local directory traversal feeding the upload queue

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;

use crate::callbacks::SyncCallbacks;
use crate::error::WalkError;
use crate::logging::*;
use crate::queue::WorkQueue;
use crate::task::UploadTask;

/// What a walk produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
	/// Tasks accepted by the queue
	pub submitted: usize,

	/// Files skipped because their name starts with a dot
	pub hidden_skipped: usize,

	pub errors: Vec<WalkError>,
}

/// Walks a directory tree and submits one upload task per eligible file
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
	root: PathBuf,
	attempts: u32,
}

impl DirectoryWalker {
	pub fn new(root: impl Into<PathBuf>, attempts: u32) -> Self {
		DirectoryWalker { root: root.into(), attempts }
	}

	/// Walk the whole tree, submitting tasks as files are found
	///
	/// Blocking; run it on a blocking thread. Errors are collected and the
	/// walk carries on with the remaining entries.
	pub fn walk(&self, queue: &WorkQueue, callbacks: &dyn SyncCallbacks) -> WalkSummary {
		// Keeps the barrier up while tasks are still being produced.
		let _producing = queue.barrier().begin();
		let mut summary = WalkSummary::default();

		match std::fs::metadata(&self.root) {
			Ok(meta) if meta.is_dir() => {}
			Ok(_) => {
				let err = WalkError {
					path: Some(self.root.clone()),
					message: "not a directory".to_string(),
				};
				self.record_error(&mut summary, err, callbacks);
				return summary;
			}
			Err(e) => {
				let err = WalkError { path: Some(self.root.clone()), message: e.to_string() };
				self.record_error(&mut summary, err, callbacks);
				return summary;
			}
		}

		let walker = WalkBuilder::new(&self.root).standard_filters(false).follow_links(false).build();

		for result in walker {
			let entry = match result {
				Ok(entry) => entry,
				Err(e) => {
					self.record_error(&mut summary, e.into(), callbacks);
					continue;
				}
			};

			let Some(file_type) = entry.file_type() else {
				continue;
			};
			if file_type.is_dir() {
				continue;
			}
			let path = entry.path();
			if file_type.is_symlink() && path.is_dir() {
				debug!("Skipping symlinked directory {}", path.display());
				continue;
			}
			if is_hidden(path) {
				debug!("Skipping hidden file {}", path.display());
				summary.hidden_skipped += 1;
				continue;
			}

			let Some(name) = object_name(&self.root, path) else {
				let err = WalkError {
					path: Some(path.to_path_buf()),
					message: "path is outside the sync root".to_string(),
				};
				self.record_error(&mut summary, err, callbacks);
				continue;
			};

			let task = UploadTask::new(path.to_path_buf(), name, self.attempts);
			match queue.submit(task.clone()) {
				Ok(()) => {
					callbacks.on_task_queued(&task);
					summary.submitted += 1;
				}
				Err(task) => {
					let err = WalkError {
						path: Some(task.path),
						message: "work queue closed during walk".to_string(),
					};
					self.record_error(&mut summary, err, callbacks);
				}
			}
		}

		debug!(
			"Walk of {} done: {} files queued, {} hidden skipped, {} errors",
			self.root.display(),
			summary.submitted,
			summary.hidden_skipped,
			summary.errors.len()
		);
		summary
	}

	fn record_error(&self, summary: &mut WalkSummary, err: WalkError, callbacks: &dyn SyncCallbacks) {
		warn!("{}", err);
		callbacks.on_walk_error(&err);
		summary.errors.push(err);
	}
}

/// Whether the file name (last component) starts with a dot
pub fn is_hidden(path: &Path) -> bool {
	path.file_name().map_or(false, |name| name.to_string_lossy().starts_with('.'))
}

/// Remote object name for `path`: its location under `root`, `/`-separated
///
/// Returns `None` when `path` is not under `root` or is `root` itself.
pub fn object_name(root: &Path, path: &Path) -> Option<String> {
	let relative = path.strip_prefix(root).ok()?;
	let mut parts = Vec::new();
	for component in relative.components() {
		match component {
			Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
			Component::CurDir => {}
			_ => return None,
		}
	}
	if parts.is_empty() {
		None
	} else {
		Some(parts.join("/"))
	}
}


// vim: ts=4
