//! # campsync Storage
//!
//! Durable key/value storage backends for the campsync sync engine.
//!
//! Backends are **opaque byte stores** keyed by short names. They know
//! nothing about change queues, materials or JSON; the sync engine owns
//! every format decision.
//!
//! ## Design Principles
//!
//! - A `put` that returns `Ok` has reached durable storage
//! - A value is replaced as a whole, never partially written
//! - Must be `Send + Sync` so an engine can be shared across tasks
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral sessions
//! - [`FileBackend`] - One file per key inside a locked directory
//!
//! ## Example
//!
//! ```rust
//! use campsync_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.put("change_queue", b"[]").unwrap();
//! assert_eq!(backend.get("change_queue").unwrap().as_deref(), Some(&b"[]"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{validate_key, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
