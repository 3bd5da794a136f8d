//! # Asserts Store
//!
//! Storage for assertions and signing keys, with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! Assertions are stored behind the [`Backstore`] trait, keeping the database
//! storage-agnostic. The primary implementation is [`SqliteBackstore`], with
//! [`MemoryBackstore`] for tests and for holding trusted assertions.
//! Private keys live behind [`KeypairManager`].
//!
//! ## Key Types
//!
//! - [`Backstore`] - Storage for the current revision of each assertion
//! - [`SqliteBackstore`] - SQLite-based persistent storage
//! - [`MemoryBackstore`] - In-memory storage
//! - [`PutResult`] - Outcome of storing an assertion
//! - [`KeypairManager`] - Private keys by public key id
//!
//! ## Usage
//!
//! ```rust,no_run
//! use asserts_store::{Backstore, SqliteBackstore, PutResult};
//!
//! let store = SqliteBackstore::open("asserts.db").unwrap();
//! // let doc: Assertion = ...;
//! // match store.put(&doc).unwrap() {
//! //     PutResult::Conflict { current } => println!("already at revision {current}"),
//! //     _ => {}
//! // }
//! ```
//!
//! ## Design Notes
//!
//! - **Monotonic revisions**: putting an equal or older revision returns
//!   `Conflict` and leaves the store unchanged
//! - **Encoded rows**: SQLite keeps the exact signed bytes and decodes on read
//! - **Prefix search**: lookups by a leading part of the primary key

pub mod error;
pub mod keypair;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use keypair::{KeypairManager, MemoryKeypairManager, SqliteKeypairManager, StoredKey};
pub use memory::MemoryBackstore;
pub use sqlite::SqliteBackstore;
pub use traits::{Backstore, PutResult};
