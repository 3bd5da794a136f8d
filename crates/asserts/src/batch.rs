//! Adding many assertions at once.

use std::io::BufRead;

use asserts_core::{Assertion, AssertionType, Decoder};

use crate::database::Database;
use crate::error::{DatabaseError, Result, RevisionError};

/// Assertions collected for a single commit.
///
/// Accounts are committed before account keys, and account keys before
/// everything else, so a batch may hold a signing chain in any order.
#[derive(Debug, Default)]
pub struct Batch {
    docs: Vec<Assertion>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, doc: Assertion) {
        self.docs.push(doc);
    }

    /// Decode every assertion in `reader` into the batch.
    ///
    /// Returns the number added. Nothing is added if the stream fails to
    /// decode.
    pub fn add_stream<R: BufRead>(&mut self, reader: R, db: &Database) -> Result<usize> {
        let decoded = Decoder::with_registry(reader, db.registry())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let count = decoded.len();
        self.docs.extend(decoded);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Add every collected assertion to `db`, in dependency order.
    ///
    /// Assertions already present at the same revision are skipped. The
    /// first other failure stops the commit; earlier adds stay committed.
    pub fn commit(self, db: &Database) -> Result<()> {
        let mut docs = self.docs;
        docs.sort_by_key(|doc| commit_rank(doc.kind()));

        for doc in &docs {
            match db.add(doc) {
                Ok(()) => {}
                Err(DatabaseError::Revision(RevisionError::Current(revision))) => {
                    tracing::debug!(
                        kind = doc.kind().name(),
                        primary_key = ?doc.primary_key(),
                        revision,
                        "skipping assertion already current"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn commit_rank(kind: AssertionType) -> u8 {
    match kind {
        AssertionType::Account => 0,
        AssertionType::AccountKey => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::DEFAULT_CHECKERS;
    use crate::database::tests::{account, account_key, key, open, repair};
    use proptest::prelude::*;

    fn chain() -> Vec<Assertion> {
        let root = key(0x01);
        let brand = key(0x02);
        vec![
            account(&root, "root", "acme"),
            account_key(&root, "root", "acme", &brand),
            repair(&brand, "acme", "1"),
            repair(&brand, "acme", "2"),
        ]
    }

    #[test]
    fn test_commit_is_repeatable() {
        let db = open(DEFAULT_CHECKERS.to_vec());
        for _ in 0..2 {
            let mut batch = Batch::new();
            for doc in chain() {
                batch.add(doc);
            }
            batch.commit(&db).unwrap();
        }
        assert_eq!(db.find_many(AssertionType::Repair, &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_commit_stops_at_first_failure() {
        let db = open(DEFAULT_CHECKERS.to_vec());
        let mut batch = Batch::new();
        for doc in chain().into_iter().skip(1) {
            batch.add(doc);
        }
        assert!(batch.commit(&db).is_err());
        assert!(db.find_many(AssertionType::Repair, &[]).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_commit_order_is_irrelevant(docs in Just(chain()).prop_shuffle()) {
            let db = open(DEFAULT_CHECKERS.to_vec());
            let mut batch = Batch::new();
            for doc in docs {
                batch.add(doc);
            }
            prop_assert_eq!(batch.len(), 4);
            prop_assert!(batch.commit(&db).is_ok());
            prop_assert!(db.find(AssertionType::Repair, &["acme", "2"]).is_ok());
        }
    }
}
