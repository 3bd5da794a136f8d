//! Typed assertions, one module per family.
//!
//! Each module provides the typed document, its accessors and the
//! [`TypeDescriptor`] wiring its schema into the registry.

mod account;
mod account_key;
mod device;
mod model;
mod repair;
mod serial;
mod snap;
mod user;

pub use account::{Account, Validation};
pub use account_key::AccountKey;
pub use device::{DeviceSessionRequest, SerialRequest};
pub use model::Model;
pub use repair::Repair;
pub use serial::Serial;
pub use snap::{SnapDeclaration, SnapRevision, DEFAULT_SERIES};
pub use user::SystemUser;

use crate::assertion::{Assertion, AssertionType};
use crate::error::ConsistencyError;
use crate::registry::{AssertionLookup, TypeDescriptor};

/// Descriptors for every standard type, in [`AssertionType::ALL`] order.
pub(crate) fn descriptors() -> Vec<TypeDescriptor> {
    vec![
        account::descriptor(),
        account_key::descriptor(),
        model::descriptor(),
        serial::descriptor(),
        device::serial_request_descriptor(),
        device::device_session_request_descriptor(),
        snap::snap_declaration_descriptor(),
        snap::snap_revision_descriptor(),
        repair::descriptor(),
        user::descriptor(),
    ]
}

fn account_exists(lookup: &dyn AssertionLookup, account_id: &str) -> Result<bool, ConsistencyError> {
    Ok(lookup.find(AssertionType::Account, &[account_id])?.is_some())
}

fn authority_of(doc: &Assertion) -> &str {
    doc.authority_id().unwrap_or_default()
}
