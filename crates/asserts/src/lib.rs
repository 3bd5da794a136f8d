//! # Asserts
//!
//! The unified API for signed assertions: a database that accepts only what
//! verifies back to its trusted roots.
//!
//! ## Overview
//!
//! - **Assertions**: Signed, typed, versioned documents
//! - **Trusted roots**: Account keys accepted without proof
//! - **Checked adds**: Verification, expiry and consistency before commit
//! - **Revisions**: Each primary key only moves forward
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use asserts::{Database, DatabaseConfig, AssertionType};
//! use asserts::store::SqliteBackstore;
//!
//! // let trusted: Vec<Assertion> = ...;
//! let db = Database::open(DatabaseConfig {
//!     backstore: Arc::new(SqliteBackstore::open("asserts.db").unwrap()),
//!     ..DatabaseConfig::default()
//! })
//! .unwrap();
//!
//! // db.add(&doc).unwrap();
//! let found = db.find(AssertionType::Account, &["canonical"]);
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `asserts::core` - Keys, types, codec and verification
//! - `asserts::store` - Backstores and keypair managers

pub mod batch;
pub mod checkers;
pub mod database;
pub mod error;

pub use asserts_core as core;
pub use asserts_store as store;

pub use batch::Batch;
pub use checkers::{
    check_consistency, check_signing_key_expiry, CheckContext, Checker, DEFAULT_CHECKERS,
};
pub use database::{Database, DatabaseConfig};
pub use error::{DatabaseError, Result, RevisionError};

pub use asserts_core::{
    decode, encode, sign, sign_without_authority, Assertion, AssertionType, Headers, PrivateKey,
    PublicKey, TypeRegistry,
};
