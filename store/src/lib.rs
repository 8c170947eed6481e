//! xrate File Store
//!
//! A minimal, append-only record store that keeps one JSON file per record.
//!
//! Records of type `T` live under `{base_dir}/{TypeName}/{key}`, where
//! `TypeName` is the unqualified Rust type name. A key, once written, is never
//! overwritten: storing the same key twice fails with
//! [`StoreError::AlreadyExists`] and leaves the first file untouched.
//!
//! All operations on one store instance are serialised by a single mutex.
//! Calls block on disk I/O; async callers should run them on a blocking
//! thread (`tokio::task::spawn_blocking`).
//!
//! # Example
//!
//! ```rust,ignore
//! use xrate_store::FileStore;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Person { name: String, age: u32 }
//!
//! let store = FileStore::<Person>::new("/var/lib/xrate");
//! store.store("johndoe", &Person { name: "John Doe".into(), age: 30 })?;
//! // -> /var/lib/xrate/Person/johndoe
//!
//! let people = store.fetch_all()?;
//! ```

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{collection_name, FileStore};
