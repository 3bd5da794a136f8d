//! SQLite implementation of the Backstore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite. Assertions are stored in their encoded form and decoded again
//! on the way out, so a stored row is exactly what was signed.

use std::path::Path;
use std::sync::{Arc, Mutex};

use asserts_core::{decode_with, standard_registry, Assertion, AssertionType, TypeRegistry};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{Backstore, PutResult};

/// SQLite-based backstore.
///
/// Thread-safe via internal Mutex.
pub struct SqliteBackstore {
    conn: Arc<Mutex<Connection>>,
    registry: TypeRegistry,
}

impl SqliteBackstore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            registry: standard_registry().clone(),
        }
    }

    /// Decode stored assertions with `registry` instead of the standard one.
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(poisoned)?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(poisoned)?;
        f(&mut conn)
    }

    fn decode_row(&self, encoded: &[u8]) -> Result<Assertion> {
        Ok(decode_with(encoded, &self.registry)?)
    }
}

pub(crate) fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
        Some(format!("mutex poisoned: {}", e)),
    ))
}

fn join_key<S: AsRef<str>>(key: &[S]) -> String {
    key.iter().map(|k| k.as_ref()).collect::<Vec<&str>>().join("/")
}

impl Backstore for SqliteBackstore {
    fn put(&self, assertion: &Assertion) -> Result<PutResult> {
        let kind = assertion.kind().name();
        let key = join_key(assertion.primary_key());
        let revision = assertion.revision();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let current: Option<i64> = tx
                .query_row(
                    "SELECT revision FROM assertions WHERE type = ?1 AND primary_key = ?2",
                    params![kind, key],
                    |row| row.get(0),
                )
                .optional()?;

            let result = match current {
                Some(current) if current as u64 >= revision => {
                    return Ok(PutResult::Conflict {
                        current: current as u64,
                    });
                }
                Some(previous) => PutResult::Replaced {
                    previous: previous as u64,
                },
                None => PutResult::Inserted,
            };

            tx.execute(
                "INSERT OR REPLACE INTO assertions (type, primary_key, revision, encoded, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![kind, key, revision as i64, assertion.encode(), now_millis()],
            )?;
            tx.commit()?;

            Ok(result)
        })
    }

    fn get(&self, kind: AssertionType, primary_key: &[&str]) -> Result<Option<Assertion>> {
        let key = join_key(primary_key);
        let encoded: Option<Vec<u8>> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT encoded FROM assertions WHERE type = ?1 AND primary_key = ?2",
                    params![kind.name(), key],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        encoded.map(|bytes| self.decode_row(&bytes)).transpose()
    }

    fn search(&self, kind: AssertionType, prefix: &[&str]) -> Result<Vec<Assertion>> {
        let rows: Vec<Vec<u8>> = self.with_conn(|conn| {
            if prefix.is_empty() {
                let mut stmt = conn.prepare(
                    "SELECT encoded FROM assertions WHERE type = ?1 ORDER BY primary_key",
                )?;
                let rows = stmt
                    .query_map(params![kind.name()], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                return Ok(rows);
            }

            let exact = join_key(prefix);
            let below = format!("{exact}/");
            let mut stmt = conn.prepare(
                "SELECT encoded FROM assertions
                 WHERE type = ?1
                   AND (primary_key = ?2 OR substr(primary_key, 1, length(?3)) = ?3)
                 ORDER BY primary_key",
            )?;
            let rows = stmt
                .query_map(params![kind.name(), exact, below], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        rows.iter().map(|bytes| self.decode_row(bytes)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::tests::repair;

    #[test]
    fn test_put_and_get() {
        let store = SqliteBackstore::open_memory().unwrap();
        let doc = repair("acme", "1", 0);

        assert_eq!(store.put(&doc).unwrap(), PutResult::Inserted);
        let got = store.get(AssertionType::Repair, &["acme", "1"]).unwrap();
        assert_eq!(got, Some(doc));
        assert!(store.get(AssertionType::Repair, &["acme", "9"]).unwrap().is_none());
    }

    #[test]
    fn test_revision_conflict() {
        let store = SqliteBackstore::open_memory().unwrap();
        store.put(&repair("acme", "1", 2)).unwrap();

        assert_eq!(
            store.put(&repair("acme", "1", 2)).unwrap(),
            PutResult::Conflict { current: 2 }
        );
        assert_eq!(
            store.put(&repair("acme", "1", 1)).unwrap(),
            PutResult::Conflict { current: 2 }
        );
        assert_eq!(
            store.put(&repair("acme", "1", 3)).unwrap(),
            PutResult::Replaced { previous: 2 }
        );
        let got = store.get(AssertionType::Repair, &["acme", "1"]).unwrap().unwrap();
        assert_eq!(got.revision(), 3);
    }

    #[test]
    fn test_search_prefix() {
        let store = SqliteBackstore::open_memory().unwrap();
        store.put(&repair("acme", "1", 0)).unwrap();
        store.put(&repair("acme", "12", 0)).unwrap();
        store.put(&repair("acme-labs", "1", 0)).unwrap();

        let all = store.search(AssertionType::Repair, &[]).unwrap();
        assert_eq!(all.len(), 3);

        let acme = store.search(AssertionType::Repair, &["acme"]).unwrap();
        let keys: Vec<_> = acme.iter().map(|d| d.primary_key().to_vec()).collect();
        assert_eq!(keys, [["acme", "1"], ["acme", "12"]]);

        let exact = store.search(AssertionType::Repair, &["acme", "1"]).unwrap();
        assert_eq!(exact.len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asserts.db");
        let doc = repair("acme", "5", 1);

        {
            let store = SqliteBackstore::open(&path).unwrap();
            store.put(&doc).unwrap();
        }

        let store = SqliteBackstore::open(&path).unwrap();
        assert_eq!(store.get(AssertionType::Repair, &["acme", "5"]).unwrap(), Some(doc));
    }

    #[test]
    fn test_registry_governs_decoding() {
        let store = SqliteBackstore::open_memory().unwrap();
        store.put(&repair("acme", "1", 0)).unwrap();

        let store = store.with_registry(TypeRegistry::standard().without_type(AssertionType::Repair));
        let err = store.get(AssertionType::Repair, &["acme", "1"]).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
