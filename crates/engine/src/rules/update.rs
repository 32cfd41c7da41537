//! Update path

use memcrm_core::{CrmError, CrmResult, EntityReference, Record, Value};
use tracing::debug;
use uuid::Uuid;

use super::party::party_attributes;
use super::state::{resolve_state, write_state};
use super::Transaction;

impl Transaction<'_> {
    /// Apply the attributes of `record` to the stored record it addresses.
    pub fn update(&mut self, mut record: Record) -> CrmResult<()> {
        record.logical_name = record.logical_name.to_lowercase();
        let def = self.entry(&record.logical_name);
        self.check_writable("Update", &def)?;

        let id = match self.target_id(&def, &record)? {
            Some(id) => id,
            None if !record.key_attributes.is_empty() => {
                return Err(CrmError::KeyValuesNotFound {
                    entity: def.logical_name.clone(),
                })
            }
            None => return Err(CrmError::does_not_exist(&def.logical_name, Uuid::nil())),
        };
        let existing = self.existing(&def.logical_name, id)?;
        record.id = id;
        record.key_attributes.clear();

        self.check_attributes(&def, &record)?;
        let replaced_masks: Vec<Option<i32>> = party_attributes(&def, &record)
            .iter()
            .map(|a| def.attribute_def(a).and_then(|a| a.participation_mask))
            .collect();
        let parties = self.prepare_parties(&def, &mut record)?;
        self.resolve_lookups(&mut record)?;

        if !def.states.is_empty() && (record.contains("statecode") || record.contains("statuscode")) {
            let resolved = resolve_state(
                &def,
                id,
                record.option("statecode"),
                record.option("statuscode"),
                existing.option("statecode"),
            )?;
            write_state(&mut record, resolved);
        }

        let mut merged = existing.clone();
        merged.merge_from(&record);
        for system in ["createdon", "createdby"] {
            match existing.get(system) {
                Some(value) => merged.set(system, value.clone()),
                None => {
                    merged.remove(system);
                }
            }
        }
        merged.set(def.primary_id_attribute.clone(), Value::Guid(id));

        if def.has_owner() {
            if let Some(owner) = record.reference("ownerid").cloned() {
                self.apply_owner(&mut merged, owner)?;
            }
        }

        merged.set("modifiedon", self.now);
        merged.set("modifiedby", self.caller_reference());
        self.apply_full_name(&def, &mut merged);
        self.apply_formatted_values(&def, &mut merged);

        self.tables.put(merged)?;
        if !replaced_masks.is_empty() {
            self.delete_parties(id, Some(&replaced_masks));
            self.insert_parties(parties)?;
        }
        debug!(entity = %def.logical_name, id = %id, "record updated");
        Ok(())
    }

    /// Change the owner of a record.
    pub fn assign(&mut self, target: &EntityReference, owner: EntityReference) -> CrmResult<()> {
        let id = self.resolve_id(target)?;
        let change = Record::with_id(target.logical_name.to_lowercase(), id).with("ownerid", owner);
        self.update(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::party::ACTIVITY_PARTY;
    use crate::rules::test_support::setup;
    use memcrm_core::OptionSetValue;

    #[test]
    fn update_merges_and_recomputes() {
        let db = setup();
        let id = db
            .transaction(|txn| {
                txn.create(Record::new("contact").with("firstname", "Ada").with("lastname", "Byron"))
            })
            .unwrap();
        db.transaction(|txn| txn.update(Record::with_id("contact", id).with("lastname", "Lovelace")))
            .unwrap();
        let stored = db.get("contact", id).unwrap();
        assert_eq!(stored.string("firstname"), Some("Ada"));
        assert_eq!(stored.string("fullname"), Some("Ada Lovelace"));
        assert!(stored.get("createdon").is_some());
    }

    #[test]
    fn update_missing_record() {
        let db = setup();
        let id = Uuid::new_v4();
        let err = db
            .transaction(|txn| txn.update(Record::with_id("account", id).with("name", "x")))
            .unwrap_err();
        assert_eq!(err, CrmError::does_not_exist("account", id));
    }

    #[test]
    fn update_by_alternate_key() {
        let db = setup();
        let id = db
            .transaction(|txn| txn.create(Record::new("account").with("accountnumber", "K-9")))
            .unwrap();
        db.transaction(|txn| {
            txn.update(Record::new("account").with_key("accountnumber", "K-9").with("name", "Keyed"))
        })
        .unwrap();
        assert_eq!(db.get("account", id).unwrap().string("name"), Some("Keyed"));

        let err = db
            .transaction(|txn| {
                txn.update(Record::new("account").with_key("accountnumber", "nope").with("name", "x"))
            })
            .unwrap_err();
        assert!(matches!(err, CrmError::KeyValuesNotFound { .. }));
    }

    #[test]
    fn update_validates_state() {
        let db = setup();
        let account = db
            .transaction(|txn| txn.create(Record::new("account").with("name", "c")))
            .unwrap();
        let err = db
            .transaction(|txn| txn.update(Record::with_id("account", account).with("statuscode", OptionSetValue(9))))
            .unwrap_err();
        assert!(matches!(err, CrmError::InvalidStatus { status: 9, .. }));

        db.transaction(|txn| txn.update(Record::with_id("account", account).with("statuscode", OptionSetValue(2))))
            .unwrap();
        assert_eq!(db.get("account", account).unwrap().option("statecode"), Some(1));
    }

    #[test]
    fn assign_moves_owner_triad() {
        let db = setup();
        let caller = db.caller();
        let team = db.default_team();
        let id = db
            .transaction(|txn| txn.create(Record::new("account").with("name", "Owned")))
            .unwrap();
        db.transaction(|txn| txn.assign(&EntityReference::new("account", id), EntityReference::new("team", team)))
            .unwrap();
        let stored = db.get("account", id).unwrap();
        assert_eq!(stored.reference("ownerid").unwrap().logical_name, "team");
        assert_eq!(stored.reference("owningteam").unwrap().id, team);
        assert_eq!(stored.get("owninguser"), Some(&Value::Null));
        assert_eq!(stored.reference("owningbusinessunit").unwrap().id, caller.business_unit_id);
    }

    #[test]
    fn party_lists_are_replaced() {
        let db = setup();
        let first = db
            .transaction(|txn| txn.create(Record::new("contact").with("lastname", "One")))
            .unwrap();
        let second = db
            .transaction(|txn| txn.create(Record::new("contact").with("lastname", "Two")))
            .unwrap();
        let party = |id| Record::new(ACTIVITY_PARTY).with("partyid", EntityReference::new("contact", id));
        let email = db
            .transaction(|txn| {
                txn.create(
                    Record::new("email")
                        .with("to", vec![party(first)])
                        .with("from", vec![party(second)]),
                )
            })
            .unwrap();
        db.transaction(|txn| txn.update(Record::with_id("email", email).with("to", vec![party(second)])))
            .unwrap();
        let rows = db.scan(ACTIVITY_PARTY);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.guid("partyid") == Some(second)));
    }
}
