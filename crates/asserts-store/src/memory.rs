//! In-memory implementation of the Backstore trait.
//!
//! Same semantics as SQLite but with no persistence. The database also uses
//! one to hold its trusted assertions.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use asserts_core::{Assertion, AssertionType};

use crate::error::Result;
use crate::traits::{has_prefix, Backstore, PutResult};

/// In-memory backstore.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryBackstore {
    inner: RwLock<HashMap<AssertionType, BTreeMap<Vec<String>, Assertion>>>,
}

impl MemoryBackstore {
    /// Create a new empty memory backstore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assertions held, across all types.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Backstore for MemoryBackstore {
    fn put(&self, assertion: &Assertion) -> Result<PutResult> {
        let mut inner = self.inner.write().unwrap();
        let by_key = inner.entry(assertion.kind()).or_default();
        let key = assertion.primary_key().to_vec();

        let result = match by_key.get(&key) {
            Some(current) if current.revision() >= assertion.revision() => {
                return Ok(PutResult::Conflict {
                    current: current.revision(),
                });
            }
            Some(current) => PutResult::Replaced {
                previous: current.revision(),
            },
            None => PutResult::Inserted,
        };
        by_key.insert(key, assertion.clone());
        Ok(result)
    }

    fn get(&self, kind: AssertionType, primary_key: &[&str]) -> Result<Option<Assertion>> {
        let inner = self.inner.read().unwrap();
        let key: Vec<String> = primary_key.iter().map(|k| k.to_string()).collect();
        Ok(inner.get(&kind).and_then(|m| m.get(&key)).cloned())
    }

    fn search(&self, kind: AssertionType, prefix: &[&str]) -> Result<Vec<Assertion>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .get(&kind)
            .map(|m| {
                m.iter()
                    .filter(|(key, _)| has_prefix(key, prefix))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
