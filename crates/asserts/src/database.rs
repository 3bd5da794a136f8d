//! The Database: trusted roots, checked adds and lookups.
//!
//! The Database brings together a backstore, a keypair manager and the type
//! registry. Every assertion it accepts has been verified back to one of its
//! trusted account keys and has passed the configured checkers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use asserts_core::{
    sign_with, verify, AccountKey, Assertion, AssertionLookup, AssertionType, ConsistencyError,
    Headers, KeyResolver, PrivateKey, PublicKey, TypeRegistry, VerifyError,
};
use asserts_store::{
    Backstore, KeypairManager, MemoryBackstore, MemoryKeypairManager, PutResult, StoreError,
};
use chrono::Utc;

use crate::checkers::{CheckContext, Checker, DEFAULT_CHECKERS};
use crate::error::{DatabaseError, Result, RevisionError};

/// Configuration for the Database.
pub struct DatabaseConfig {
    /// Account and account-key assertions trusted without verification.
    pub trusted: Vec<Assertion>,
    /// Where accepted assertions are kept.
    pub backstore: Arc<dyn Backstore>,
    /// Private keys available to [`Database::sign`].
    pub keypair_manager: Arc<dyn KeypairManager>,
    /// Checks run after verification, in order.
    pub checkers: Vec<Checker>,
    pub registry: TypeRegistry,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            trusted: Vec::new(),
            backstore: Arc::new(MemoryBackstore::new()),
            keypair_manager: Arc::new(MemoryKeypairManager::new()),
            checkers: DEFAULT_CHECKERS.to_vec(),
            registry: TypeRegistry::standard(),
        }
    }
}

/// A database of verified assertions.
///
/// Provides a unified API for:
/// - Adding assertions after verification and checks
/// - Finding assertions by primary key or by header values
/// - Signing with locally held keys
pub struct Database {
    trusted: MemoryBackstore,
    /// Accounts holding a trusted key.
    trusted_accounts: HashSet<String>,
    backstore: Arc<dyn Backstore>,
    keypair_manager: Arc<dyn KeypairManager>,
    checkers: Vec<Checker>,
    registry: TypeRegistry,
    /// Held across check-then-commit in [`Database::add`].
    writer: Mutex<()>,
}

impl Database {
    /// Open a database with the given configuration.
    ///
    /// Only account and account-key assertions can be trusted.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let trusted = MemoryBackstore::new();
        let mut trusted_accounts = HashSet::new();

        for doc in &config.trusted {
            match doc {
                Assertion::AccountKey(key) => {
                    trusted_accounts.insert(key.account_id().to_string());
                }
                Assertion::Account(_) => {}
                other => return Err(DatabaseError::UntrustableType(other.kind().name())),
            }
            if let PutResult::Conflict { .. } = trusted.put(doc)? {
                return Err(DatabaseError::DuplicateTrusted {
                    type_name: doc.kind().name(),
                    primary_key: doc.primary_key().to_vec(),
                });
            }
        }
        tracing::debug!(
            trusted = trusted.len(),
            accounts = trusted_accounts.len(),
            "opened assertion database"
        );

        Ok(Self {
            trusted,
            trusted_accounts,
            backstore: config.backstore,
            keypair_manager: config.keypair_manager,
            checkers: config.checkers,
            registry: config.registry,
            writer: Mutex::new(()),
        })
    }

    /// The registry this database assembles and checks against.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Verify and store `doc`.
    ///
    /// Fails unless `doc` verifies, passes every checker, does not shadow a
    /// trusted assertion and carries a newer revision than the stored one.
    pub fn add(&self, doc: &Assertion) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        if let Err(e) = self.verify_and_check(doc) {
            tracing::warn!(
                kind = doc.kind().name(),
                primary_key = ?doc.primary_key(),
                error = %e,
                "rejected assertion"
            );
            return Err(e);
        }

        let primary_key = key_refs(doc.primary_key());
        if self.trusted.get(doc.kind(), &primary_key)?.is_some() {
            return Err(DatabaseError::TrustedClash {
                type_name: doc.kind().name(),
                primary_key: doc.primary_key().to_vec(),
            });
        }

        match self.backstore.put(doc)? {
            PutResult::Conflict { current } => {
                Err(RevisionError::new(doc.revision(), current).into())
            }
            result => {
                tracing::debug!(
                    kind = doc.kind().name(),
                    primary_key = ?doc.primary_key(),
                    revision = doc.revision(),
                    ?result,
                    "committed assertion"
                );
                Ok(())
            }
        }
    }

    /// Run the verification and checks of [`Database::add`] without storing.
    pub fn check(&self, doc: &Assertion) -> Result<()> {
        self.verify_and_check(doc)
    }

    fn verify_and_check(&self, doc: &Assertion) -> Result<()> {
        let kind = doc.kind();
        let descriptor = self
            .registry
            .get(kind)
            .ok_or(DatabaseError::UnknownType(kind.name()))?;
        if !descriptor.authority {
            return Err(VerifyError::NoAuthority(kind.name()).into());
        }

        let signing_key = verify(doc, &Resolver(self))?;

        let ctx = CheckContext {
            assertion: doc,
            signing_key: signing_key.as_ref(),
            lookup: &Lookup(self),
            registry: &self.registry,
            now: Utc::now(),
        };
        for checker in &self.checkers {
            checker(&ctx)?;
        }
        Ok(())
    }

    /// Find the assertion of `kind` with exactly this primary key.
    ///
    /// Trusted assertions are searched before stored ones.
    pub fn find(&self, kind: AssertionType, primary_key: &[&str]) -> Result<Assertion> {
        let descriptor = self
            .registry
            .get(kind)
            .ok_or(DatabaseError::UnknownType(kind.name()))?;
        let expected = descriptor.primary_key;
        if primary_key.len() < expected.len() {
            return Err(DatabaseError::MissingPrimaryKey(expected[primary_key.len()]));
        }
        if primary_key.len() > expected.len() {
            return Err(DatabaseError::Internal(format!(
                "too many primary key values for {} assertion: {primary_key:?}",
                kind.name()
            )));
        }

        let mut found: Vec<Assertion> = self
            .trusted
            .get(kind, primary_key)?
            .into_iter()
            .collect();
        found.extend(self.backstore.get(kind, primary_key)?);
        tracing::debug!(kind = kind.name(), ?primary_key, matches = found.len(), "find");

        match found.len() {
            0 => Err(DatabaseError::NotFound {
                type_name: kind.name(),
            }),
            1 => Ok(found.remove(0)),
            n => Err(DatabaseError::Internal(format!(
                "{n} {} assertions match primary key {primary_key:?}",
                kind.name()
            ))),
        }
    }

    /// Find all assertions of `kind` whose headers have the given values.
    ///
    /// Filters on leading primary key headers narrow the search in the
    /// backstore. Other filters are applied to the candidates.
    pub fn find_many(&self, kind: AssertionType, filters: &[(&str, &str)]) -> Result<Vec<Assertion>> {
        let descriptor = self
            .registry
            .get(kind)
            .ok_or(DatabaseError::UnknownType(kind.name()))?;
        let prefix: Vec<&str> = descriptor
            .primary_key
            .iter()
            .map_while(|name| {
                filters
                    .iter()
                    .find(|(header, _)| header == name)
                    .map(|(_, value)| *value)
            })
            .collect();

        let mut found = self.trusted.search(kind, &prefix)?;
        found.extend(self.backstore.search(kind, &prefix)?);
        found.retain(|doc| {
            filters
                .iter()
                .all(|(name, value)| doc.headers().get_str(name) == Some(*value))
        });
        tracing::debug!(kind = kind.name(), ?filters, matches = found.len(), "find many");

        if found.is_empty() {
            return Err(DatabaseError::NotFound {
                type_name: kind.name(),
            });
        }
        Ok(found)
    }

    /// Sign a new assertion with a key held by the keypair manager.
    ///
    /// The key must belong to the account named by `authority-id`.
    pub fn sign(
        &self,
        kind: AssertionType,
        headers: Headers,
        body: &[u8],
        key_id: &str,
    ) -> Result<Assertion> {
        let authority_id = headers.get_str("authority-id").unwrap_or_default().to_string();
        let unknown = || DatabaseError::UnknownSigningKey {
            key_id: key_id.to_string(),
            authority_id: authority_id.clone(),
        };

        let stored = match self.keypair_manager.get(key_id) {
            Ok(stored) => stored,
            Err(StoreError::KeyPairNotFound) => return Err(unknown()),
            Err(e) => return Err(e.into()),
        };
        if stored.owner != authority_id {
            return Err(unknown());
        }

        Ok(sign_with(&self.registry, kind, headers, body, &stored.key)?)
    }

    /// Generate a signing key for `owner`, returning its fingerprint.
    pub fn generate_key(&self, owner: &str) -> Result<String> {
        Ok(self.keypair_manager.generate_key(owner)?)
    }

    /// Hand an existing private key to the keypair manager.
    pub fn import_key(&self, owner: &str, key: &PrivateKey) -> Result<()> {
        self.keypair_manager.put(owner, key)?;
        tracing::info!(owner, key_id = %key.public_key().id(), "imported key pair");
        Ok(())
    }

    /// Public halves of the keys held for `owner`.
    pub fn public_keys(&self, owner: &str) -> Result<Vec<PublicKey>> {
        Ok(self.keypair_manager.public_keys(owner)?)
    }
}

fn key_refs(primary_key: &[String]) -> Vec<&str> {
    primary_key.iter().map(String::as_str).collect()
}

/// Resolves signing keys against trusted and stored account keys.
struct Resolver<'a>(&'a Database);

impl KeyResolver for Resolver<'_> {
    fn trusted_key(&self, key_id: &str) -> Option<AccountKey> {
        self.0
            .trusted
            .get(AssertionType::AccountKey, &[key_id])
            .ok()
            .flatten()
            .and_then(Assertion::into_account_key)
    }

    fn candidate_key(&self, key_id: &str) -> std::result::Result<Option<AccountKey>, VerifyError> {
        let doc = self
            .0
            .backstore
            .get(AssertionType::AccountKey, &[key_id])
            .map_err(|e| VerifyError::Resolver(e.to_string()))?;
        Ok(doc.and_then(Assertion::into_account_key))
    }
}

/// Read access for consistency hooks.
struct Lookup<'a>(&'a Database);

impl AssertionLookup for Lookup<'_> {
    fn find(
        &self,
        kind: AssertionType,
        primary_key: &[&str],
    ) -> std::result::Result<Option<Assertion>, ConsistencyError> {
        match self.0.find(kind, primary_key) {
            Ok(doc) => Ok(Some(doc)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(ConsistencyError::Lookup {
                type_name: kind.name(),
                message: e.to_string(),
            }),
        }
    }

    fn is_trusted_account(&self, account_id: &str) -> bool {
        self.0.trusted_accounts.contains(account_id)
    }
}
