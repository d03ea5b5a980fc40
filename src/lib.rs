//! # cloudpush - mirror a directory into an object storage container
//!
//! cloudpush replaces the whole content of a Swift-style storage container
//! with the regular files found under a local directory. The run has two
//! phases: every object in the container is removed, then the directory tree
//! is walked and each file is uploaded by a bounded pool of workers, with a
//! per-file retry budget.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cloudpush::storage::{Credentials, SwiftOptions, SwiftStore};
//! use cloudpush::sync::SyncBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials { user: "user".into(), password: "key".into() };
//!     let store = SwiftStore::connect(&credentials, &SwiftOptions::new("www")).await?;
//!     let report = SyncBuilder::new("./public").workers(8).run(Arc::new(store)).await?;
//!     report.log_summary();
//!     Ok(())
//! }
//! ```

pub mod barrier;
pub mod callbacks;
pub mod cli;
pub mod config;
pub mod deletion;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod queue;
pub mod storage;
pub mod sync;
pub mod task;
pub mod walker;

// Re-export commonly used types
pub use config::Config;
pub use error::{StorageError, SyncError, TaskError, WalkError};
pub use storage::{MemoryStore, ObjectStore, RemoteObject, SwiftStore};
pub use sync::{SyncBuilder, SyncReport};
pub use task::UploadTask;

// vim: ts=4
