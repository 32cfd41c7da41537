//! Activity-party lists
//!
//! Party-list attributes (`to`, `from`, `requiredattendees`, ...) carry a
//! collection of `activityparty` records. Each party becomes a row in the
//! `activityparty` table tagged with the attribute's participation mask.

use memcrm_core::{
    AttributeKind, CrmError, CrmResult, EntityDef, EntityReference, OptionSetValue, Record, Value,
};
use rustc_hash::FxHashSet;
use tracing::debug;
use uuid::Uuid;

use super::Transaction;

/// Logical name of party rows.
pub const ACTIVITY_PARTY: &str = "activityparty";

/// Party-list attributes present on a record.
pub(crate) fn party_attributes(def: &EntityDef, record: &Record) -> Vec<String> {
    record
        .attributes
        .iter()
        .filter(|(name, value)| {
            matches!(value, Value::Entities(_))
                || def
                    .attribute_def(name)
                    .map(|a| a.kind == AttributeKind::PartyList)
                    .unwrap_or(false)
        })
        .map(|(name, _)| name.clone())
        .collect()
}

impl Transaction<'_> {
    /// Validate and normalize the party lists of an activity.
    ///
    /// Returns the party rows to store; the record's attributes are replaced
    /// by the normalized rows.
    pub(crate) fn prepare_parties(&self, def: &EntityDef, record: &mut Record) -> CrmResult<Vec<Record>> {
        let mut rows = Vec::new();
        let mut claimed = FxHashSet::default();
        for attribute in party_attributes(def, record) {
            let mask = def
                .attribute_def(&attribute)
                .and_then(|a| a.participation_mask);
            let parties = match record.remove(&attribute) {
                Some(Value::Entities(parties)) => parties,
                Some(Value::Lookup(reference)) => {
                    vec![Record::new(ACTIVITY_PARTY).with("partyid", reference)]
                }
                _ => Vec::new(),
            };
            let mut normalized = Vec::with_capacity(parties.len());
            for party in parties {
                let row = self.party_row(def, record.id, party, mask, &mut claimed)?;
                normalized.push(row.clone());
                rows.push(row);
            }
            record.set(attribute, normalized);
        }
        Ok(rows)
    }

    fn party_row(
        &self,
        def: &EntityDef,
        activity_id: Uuid,
        party: Record,
        mask: Option<i32>,
        claimed: &mut FxHashSet<Uuid>,
    ) -> CrmResult<Record> {
        let address = party
            .string("addressused")
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string);
        let reference = party.reference("partyid").cloned();
        if reference.is_none() && address.is_none() {
            return Err(CrmError::InvalidActivityParty);
        }
        let id = if self.party_id_reusable(party.id, activity_id, mask, claimed) {
            party.id
        } else {
            Uuid::new_v4()
        };
        claimed.insert(id);
        let mut row = Record::with_id(ACTIVITY_PARTY, id)
            .with("activityid", EntityReference::new(def.logical_name.clone(), activity_id))
            .with("activitypartyid", id);
        if let Some(mut reference) = reference {
            reference.logical_name = reference.logical_name.to_lowercase();
            if reference.is_keyed() {
                reference.id = self.resolve_id(&reference)?;
                reference.key_attributes.clear();
            }
            if !self.tables.contains(&reference.logical_name, reference.id) {
                return Err(CrmError::does_not_exist(&reference.logical_name, reference.id));
            }
            row.set("partyid", reference);
        }
        if let Some(address) = address {
            row.set("addressused", address);
        }
        if let Some(mask) = mask {
            row.set("participationtypemask", OptionSetValue(mask));
        }
        Ok(row)
    }

    /// A supplied party id is kept only when no other row holds it.
    ///
    /// Rows of the same activity and participation mask are about to be
    /// replaced, so their ids may be reused.
    fn party_id_reusable(
        &self,
        id: Uuid,
        activity_id: Uuid,
        mask: Option<i32>,
        claimed: &FxHashSet<Uuid>,
    ) -> bool {
        if id.is_nil() || claimed.contains(&id) {
            return false;
        }
        match self.tables.get_ref(ACTIVITY_PARTY, id) {
            None => true,
            Some(row) => {
                row.guid("activityid") == Some(activity_id) && row.option("participationtypemask") == mask
            }
        }
    }

    /// Store prepared party rows.
    pub(crate) fn insert_parties(&mut self, rows: Vec<Record>) -> CrmResult<()> {
        for row in rows {
            self.tables.insert(row)?;
        }
        Ok(())
    }

    /// Remove party rows of an activity, optionally only those with the
    /// given participation masks.
    pub(crate) fn delete_parties(&mut self, activity_id: Uuid, masks: Option<&[Option<i32>]>) -> usize {
        let doomed: Vec<Uuid> = self
            .tables
            .iter(ACTIVITY_PARTY)
            .filter(|row| row.guid("activityid") == Some(activity_id))
            .filter(|row| match masks {
                None => true,
                Some(masks) => {
                    let mask = row.option("participationtypemask");
                    masks.contains(&mask)
                }
            })
            .map(|row| row.id)
            .collect();
        for id in &doomed {
            self.tables.delete(ACTIVITY_PARTY, *id);
        }
        if !doomed.is_empty() {
            debug!(activity = %activity_id, removed = doomed.len(), "activity parties removed");
        }
        doomed.len()
    }
}
