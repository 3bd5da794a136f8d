//! Private key storage for signing.
//!
//! A key pair belongs to an owner, the account id it signs for. Keys are
//! looked up by the id of their public half.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use asserts_core::{decode_private_key, encode_private_key, PrivateKey, PublicKey};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::sqlite::poisoned;

/// A private key together with the account that owns it.
#[derive(Debug, Clone)]
pub struct StoredKey {
    pub owner: String,
    pub key: PrivateKey,
}

/// Storage for private keys.
///
/// Implementations serialise writes against reads, so a key is either fully
/// present or absent to any concurrent reader.
pub trait KeypairManager: Send + Sync {
    /// Store `key` for `owner`. Fails if a key with the same id exists.
    fn put(&self, owner: &str, key: &PrivateKey) -> Result<()>;

    /// Fetch the key with public key id `key_id`.
    fn get(&self, key_id: &str) -> Result<StoredKey>;

    /// Public halves of all keys owned by `owner`.
    fn public_keys(&self, owner: &str) -> Result<Vec<PublicKey>>;

    /// Generate and store a new key for `owner`, returning its fingerprint.
    fn generate_key(&self, owner: &str) -> Result<String> {
        let key = PrivateKey::generate();
        self.put(owner, &key)?;
        let fingerprint = key.public_key().fingerprint();
        tracing::info!(owner, %fingerprint, "generated key pair");
        Ok(fingerprint)
    }
}

/// In-memory key pair manager.
#[derive(Debug, Default)]
pub struct MemoryKeypairManager {
    keys: RwLock<HashMap<String, StoredKey>>,
}

impl MemoryKeypairManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeypairManager for MemoryKeypairManager {
    fn put(&self, owner: &str, key: &PrivateKey) -> Result<()> {
        let mut keys = self.keys.write().unwrap();
        let key_id = key.public_key().id();
        if keys.contains_key(&key_id) {
            return Err(StoreError::KeyPairExists);
        }
        keys.insert(
            key_id,
            StoredKey {
                owner: owner.to_string(),
                key: key.clone(),
            },
        );
        Ok(())
    }

    fn get(&self, key_id: &str) -> Result<StoredKey> {
        let keys = self.keys.read().unwrap();
        keys.get(key_id).cloned().ok_or(StoreError::KeyPairNotFound)
    }

    fn public_keys(&self, owner: &str) -> Result<Vec<PublicKey>> {
        let keys = self.keys.read().unwrap();
        let mut found: Vec<PublicKey> = keys
            .values()
            .filter(|stored| stored.owner == owner)
            .map(|stored| stored.key.public_key())
            .collect();
        found.sort_by_key(PublicKey::id);
        Ok(found)
    }
}

/// SQLite-backed key pair manager.
///
/// Shares the schema of the SQLite backstore, so both can live in one file.
pub struct SqliteKeypairManager {
    conn: Mutex<Connection>,
}

impl SqliteKeypairManager {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeypairManager for SqliteKeypairManager {
    fn put(&self, owner: &str, key: &PrivateKey) -> Result<()> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let key_id = key.public_key().id();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO private_keys (key_id, owner, encoded, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key_id, owner, encode_private_key(key), now_millis()],
        )?;
        if inserted == 0 {
            return Err(StoreError::KeyPairExists);
        }
        Ok(())
    }

    fn get(&self, key_id: &str) -> Result<StoredKey> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT owner, encoded FROM private_keys WHERE key_id = ?1",
                params![key_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (owner, encoded) = row.ok_or(StoreError::KeyPairNotFound)?;
        let key = decode_private_key(encoded.as_bytes())?;
        if key.public_key().id() != key_id {
            return Err(StoreError::InvalidData(format!(
                "stored key does not match its id {key_id:?}"
            )));
        }
        Ok(StoredKey { owner, key })
    }

    fn public_keys(&self, owner: &str) -> Result<Vec<PublicKey>> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let mut stmt =
            conn.prepare("SELECT encoded FROM private_keys WHERE owner = ?1 ORDER BY key_id")?;
        let encoded = stmt
            .query_map(params![owner], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        encoded
            .iter()
            .map(|e| Ok(decode_private_key(e.as_bytes())?.public_key()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(manager: &dyn KeypairManager) {
        let key = PrivateKey::from_seed(&[0x11; 32]);
        let key_id = key.public_key().id();

        manager.put("acme", &key).unwrap();
        let err = manager.put("acme", &key).unwrap_err();
        assert_eq!(err.to_string(), "key pair with given key id already exists");

        let stored = manager.get(&key_id).unwrap();
        assert_eq!(stored.owner, "acme");
        assert_eq!(stored.key.public_key(), key.public_key());

        let err = manager.get("missing").unwrap_err();
        assert_eq!(err.to_string(), "cannot find key pair");

        let fingerprint = manager.generate_key("acme").unwrap();
        let keys = manager.public_keys("acme").unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().any(|k| k.fingerprint() == fingerprint));
        assert!(manager.public_keys("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_memory_keypair_manager() {
        exercise(&MemoryKeypairManager::new());
    }

    #[test]
    fn test_sqlite_keypair_manager() {
        exercise(&SqliteKeypairManager::open_memory().unwrap());
    }

    #[test]
    fn test_sqlite_keys_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.db");
        let key = PrivateKey::from_seed(&[0x12; 32]);

        SqliteKeypairManager::open(&path)
            .unwrap()
            .put("acme", &key)
            .unwrap();

        let manager = SqliteKeypairManager::open(&path).unwrap();
        let stored = manager.get(&key.public_key().id()).unwrap();
        assert_eq!(stored.key.public_key(), key.public_key());
    }
}
