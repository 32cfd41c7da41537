//! Upsert

use memcrm_core::{CrmResult, Record};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::Transaction;

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertResult {
    /// True when a new record was created
    pub record_created: bool,
    /// Id of the created or updated record
    pub id: Uuid,
}

impl Transaction<'_> {
    /// Update the record addressed by id or alternate key, creating it when
    /// nothing matches.
    pub fn upsert(&mut self, mut record: Record) -> CrmResult<UpsertResult> {
        record.logical_name = record.logical_name.to_lowercase();
        let def = self.entry(&record.logical_name);

        let by_id = match record.id.is_nil() {
            false => Some(record.id),
            true => record
                .get_non_null(&def.primary_id_attribute)
                .and_then(|v| v.as_guid()),
        };
        let matched = match by_id {
            Some(id) => self.tables.contains(&def.logical_name, id).then_some(id),
            None if !record.key_attributes.is_empty() => self
                .tables
                .find_by_key(&def.logical_name, &record.key_attributes)?,
            None => None,
        };

        match matched {
            Some(id) => {
                record.id = id;
                record.key_attributes.clear();
                self.update(record)?;
                debug!(entity = %def.logical_name, id = %id, "upsert updated");
                Ok(UpsertResult {
                    record_created: false,
                    id,
                })
            }
            None => {
                if let Some(id) = by_id {
                    record.id = id;
                }
                let id = self.create(record)?;
                debug!(entity = %def.logical_name, id = %id, "upsert created");
                Ok(UpsertResult {
                    record_created: true,
                    id,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::setup;

    #[test]
    fn upsert_by_key_is_idempotent() {
        let db = setup();
        let first = db
            .transaction(|txn| txn.upsert(Record::new("account").with_key("accountnumber", "U-1").with("name", "One")))
            .unwrap();
        assert!(first.record_created);
        let second = db
            .transaction(|txn| txn.upsert(Record::new("account").with_key("accountnumber", "U-1").with("name", "Two")))
            .unwrap();
        assert!(!second.record_created);
        assert_eq!(first.id, second.id);
        assert_eq!(db.scan("account").len(), 1);
        let stored = db.get("account", first.id).unwrap();
        assert_eq!(stored.string("name"), Some("Two"));
        assert_eq!(stored.string("accountnumber"), Some("U-1"));
    }

    #[test]
    fn upsert_by_id_keeps_id() {
        let db = setup();
        let id = Uuid::new_v4();
        let created = db
            .transaction(|txn| txn.upsert(Record::with_id("contact", id).with("lastname", "A")))
            .unwrap();
        assert_eq!(created, UpsertResult { record_created: true, id });
        let updated = db
            .transaction(|txn| txn.upsert(Record::with_id("contact", id).with("lastname", "B")))
            .unwrap();
        assert_eq!(updated, UpsertResult { record_created: false, id });
        assert_eq!(db.get("contact", id).unwrap().string("fullname"), Some("B"));
    }
}
