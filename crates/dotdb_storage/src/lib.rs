//! # DotDB Storage
//!
//! Storage backends for DotDB.
//!
//! A DotDB database is a single text document. Backends store and return
//! that document as an opaque string; they do not know which format it is
//! written in or what it contains.
//!
//! ## Design Principles
//!
//! - Reads return the whole document, or `None` when nothing was written yet
//! - Writes replace the whole document atomically
//! - Concurrent writes through one backend are serialized by a gate
//! - Must be `Send + Sync` for sharing with background tasks
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral databases
//! - [`FileBackend`] - For persistent storage with atomic replace
//!
//! ## Example
//!
//! ```rust
//! use dotdb_storage::{DocumentBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.write("{\"a\":1}").unwrap();
//! assert_eq!(backend.read().unwrap().as_deref(), Some("{\"a\":1}"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::DocumentBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
