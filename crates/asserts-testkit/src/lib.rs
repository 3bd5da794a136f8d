//! # Asserts Testkit
//!
//! Testing utilities for signed assertions.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A trusted root with deterministic keys, brands and devices
//! - **Generators**: Proptest strategies for property-based testing
//! - **Samples**: Encoded documents with placeholder signatures
//!
//! ## Test Fixtures
//!
//! Quickly set up a trust chain:
//!
//! ```rust
//! use asserts_testkit::fixtures::TrustFixture;
//!
//! let fixture = TrustFixture::new();
//! let brand = fixture.brand("acme", 1);
//! let db = fixture.database();
//! for doc in brand.chain() {
//!     db.add(&doc).unwrap();
//! }
//! db.add(&brand.repair("1", 0)).unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use asserts_testkit::generators::{repair_from_params, RepairParams};
//!
//! proptest! {
//!     #[test]
//!     fn repair_roundtrips(params: RepairParams) {
//!         let doc = repair_from_params(&params);
//!         prop_assert_eq!(asserts_core::decode(&doc.encode()).unwrap(), doc);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod samples;

pub use fixtures::{device_key, headers, serial_request, Brand, TrustFixture, ROOT_ID, TIMESTAMP};
pub use generators::{repair_from_params, RepairParams};
pub use samples::{document, MODEL_HEAD, REPAIR_HEAD};
