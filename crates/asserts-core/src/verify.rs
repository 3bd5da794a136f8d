//! Signature and trust chain verification.
//!
//! An assertion with an authority is trusted when its signing key resolves,
//! through a chain of account-key assertions, to a trusted root key, and
//! every signature along the way checks out. Self-signed assertions are
//! checked against the key they embed and are not tied to any root.

use std::collections::HashMap;

use crate::assertion::{Assertion, AssertionBase};
use crate::crypto::PublicKey;
use crate::error::VerifyError;
use crate::types::AccountKey;

/// Maximum number of account-key hops between an assertion and a root.
pub const MAX_CHAIN_DEPTH: usize = 8;

/// Source of account keys for verification.
pub trait KeyResolver {
    /// A key trusted without further proof.
    fn trusted_key(&self, key_id: &str) -> Option<AccountKey>;

    /// A key that must itself be verified before use.
    fn candidate_key(&self, key_id: &str) -> Result<Option<AccountKey>, VerifyError>;
}

/// An in-memory [`KeyResolver`].
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    trusted: HashMap<String, AccountKey>,
    candidates: HashMap<String, AccountKey>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trusted(&mut self, key: AccountKey) {
        self.trusted.insert(key.public_key_id().to_string(), key);
    }

    pub fn add(&mut self, key: AccountKey) {
        self.candidates.insert(key.public_key_id().to_string(), key);
    }
}

impl KeyResolver for KeySet {
    fn trusted_key(&self, key_id: &str) -> Option<AccountKey> {
        self.trusted.get(key_id).cloned()
    }

    fn candidate_key(&self, key_id: &str) -> Result<Option<AccountKey>, VerifyError> {
        Ok(self.candidates.get(key_id).cloned())
    }
}

/// Verify `doc` and return the account key that signed it.
///
/// Self-signed serial requests verify against their embedded device key and
/// return `None`.
pub fn verify(doc: &Assertion, resolver: &dyn KeyResolver) -> Result<Option<AccountKey>, VerifyError> {
    match doc {
        Assertion::SerialRequest(req) => {
            if req.device_key().id() != req.sign_key_id() {
                return Err(VerifyError::DeviceKeyMismatch);
            }
            signature_check(doc, req.device_key())?;
            Ok(None)
        }
        Assertion::DeviceSessionRequest(_) => Err(VerifyError::NoEmbeddedKey(doc.kind().name())),
        _ => resolve(doc.base(), resolver, 0).map(Some),
    }
}

/// Check the signature of `doc` against a caller-supplied key.
pub fn signature_check(doc: &AssertionBase, key: &PublicKey) -> Result<(), VerifyError> {
    let (content, signature) = doc.signing_parts();
    key.verify(content, signature)
        .map_err(VerifyError::BadSignature)
}

fn resolve(
    doc: &AssertionBase,
    resolver: &dyn KeyResolver,
    depth: usize,
) -> Result<AccountKey, VerifyError> {
    let key_id = doc.sign_key_id();
    let authority_id = doc.authority_id().unwrap_or_default();

    let key = match resolver.trusted_key(key_id) {
        Some(key) => key,
        None => {
            let candidate = resolver.candidate_key(key_id)?.ok_or_else(|| {
                VerifyError::UnresolvedKey {
                    key_id: key_id.to_string(),
                    authority_id: authority_id.to_string(),
                }
            })?;
            check_account(&candidate, authority_id)?;
            if depth >= MAX_CHAIN_DEPTH {
                return Err(VerifyError::ChainTooDeep {
                    key_id: key_id.to_string(),
                    max: MAX_CHAIN_DEPTH,
                });
            }
            resolve(&candidate, resolver, depth + 1)?;
            candidate
        }
    };
    check_account(&key, authority_id)?;
    signature_check(doc, key.public_key())?;
    Ok(key)
}

fn check_account(key: &AccountKey, authority_id: &str) -> Result<(), VerifyError> {
    if key.account_id() != authority_id {
        return Err(VerifyError::AccountMismatch {
            key_id: key.public_key_id().to_string(),
            found: key.account_id().to_string(),
            expected: authority_id.to_string(),
        });
    }
    Ok(())
}
