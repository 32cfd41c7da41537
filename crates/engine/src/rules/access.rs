//! Record sharing
//!
//! Grants are `principalobjectaccess` rows: one per (record, principal) pair
//! holding an access-rights mask.

use memcrm_core::{CrmError, CrmResult, EntityReference, Record, Value};
use memcrm_security::AccessRights;
use rustc_hash::FxHashSet;
use tracing::debug;
use uuid::Uuid;

use super::{ReadView, Transaction};

/// Logical name of grant rows.
pub const ACCESS_GRANT: &str = "principalobjectaccess";

const TEAM_MEMBERSHIP: &str = "teammembership";

fn grant_row(target: &EntityReference, principal: &EntityReference, rights: AccessRights) -> Record {
    let id = Uuid::new_v4();
    Record::with_id(ACCESS_GRANT, id)
        .with("principalobjectaccessid", id)
        .with("objectid", target.id)
        .with("objecttypecode", target.logical_name.clone())
        .with("principalid", principal.id)
        .with("principaltypecode", principal.logical_name.clone())
        .with("accessrightsmask", rights.mask())
}

fn row_rights(row: &Record) -> AccessRights {
    row.get("accessrightsmask")
        .and_then(Value::as_i64)
        .map(|m| AccessRights::from_mask(m as i32))
        .unwrap_or_default()
}

impl Transaction<'_> {
    /// Add rights for a principal, keeping rights already granted.
    pub fn grant_access(
        &mut self,
        target: &EntityReference,
        principal: &EntityReference,
        rights: AccessRights,
    ) -> CrmResult<()> {
        self.write_grant(target, principal, |current| current | rights)
    }

    /// Replace the rights of a principal.
    pub fn modify_access(
        &mut self,
        target: &EntityReference,
        principal: &EntityReference,
        rights: AccessRights,
    ) -> CrmResult<()> {
        self.write_grant(target, principal, |_| rights)
    }

    /// Remove every right a principal was granted on a record.
    pub fn revoke_access(&mut self, target: &EntityReference, revokee: &EntityReference) -> CrmResult<()> {
        let target = self.shared_record(target)?;
        let rows: Vec<Uuid> = self.view().grants(target.id, revokee.id).map(|r| r.id).collect();
        for row in &rows {
            self.tables.delete(ACCESS_GRANT, *row);
        }
        debug!(target = %target, principal = %revokee, removed = rows.len(), "access revoked");
        Ok(())
    }

    fn write_grant(
        &mut self,
        target: &EntityReference,
        principal: &EntityReference,
        rights: impl FnOnce(AccessRights) -> AccessRights,
    ) -> CrmResult<()> {
        let target = self.shared_record(target)?;
        let principal = EntityReference::new(principal.logical_name.to_lowercase(), self.resolve_id(principal)?);
        if !self.tables.contains(&principal.logical_name, principal.id) {
            return Err(CrmError::does_not_exist(&principal.logical_name, principal.id));
        }
        let existing = self.view().grants(target.id, principal.id).next().cloned();
        let row = match existing {
            Some(mut row) => {
                let merged = rights(row_rights(&row));
                row.set("accessrightsmask", merged.mask());
                row
            }
            None => grant_row(&target, &principal, rights(AccessRights::empty())),
        };
        debug!(target = %target, principal = %principal, rights = %row_rights(&row).display_names(), "access granted");
        self.tables.put(row)?;
        Ok(())
    }

    /// Resolved reference to an existing record.
    fn shared_record(&self, target: &EntityReference) -> CrmResult<EntityReference> {
        let logical_name = target.logical_name.to_lowercase();
        let id = self.resolve_id(target)?;
        if !self.tables.contains(&logical_name, id) {
            return Err(CrmError::does_not_exist(&logical_name, id));
        }
        Ok(EntityReference::new(logical_name, id))
    }
}

impl<'a> ReadView<'a> {
    fn grants(&self, object: Uuid, principal: Uuid) -> impl Iterator<Item = &'a Record> + 'a {
        self.tables()
            .iter(ACCESS_GRANT)
            .filter(move |r| r.guid("objectid") == Some(object) && r.guid("principalid") == Some(principal))
    }

    /// Teams a user belongs to.
    fn teams_of(&self, user: Uuid) -> FxHashSet<Uuid> {
        self.tables()
            .iter(TEAM_MEMBERSHIP)
            .filter(|r| r.guid("systemuserid") == Some(user))
            .filter_map(|r| r.guid("teamid"))
            .collect()
    }

    /// Effective rights of a principal on a record.
    ///
    /// Owners (and members of an owning team) hold every right; anyone else
    /// holds the union of their own grants and their teams' grants.
    pub fn principal_access(&self, target: &EntityReference, principal: &EntityReference) -> CrmResult<AccessRights> {
        let logical_name = target.logical_name.to_lowercase();
        let id = self.resolve_id(target)?;
        let record = self
            .tables()
            .get_ref(&logical_name, id)
            .ok_or_else(|| CrmError::does_not_exist(&logical_name, id))?;
        let teams = self.teams_of(principal.id);
        if let Some(owner) = record.reference("ownerid") {
            if owner.id == principal.id || teams.contains(&owner.id) {
                return Ok(AccessRights::owner());
            }
        }
        let mut rights = AccessRights::empty();
        for holder in std::iter::once(principal.id).chain(teams) {
            for row in self.grants(id, holder) {
                rights |= row_rights(row);
            }
        }
        Ok(rights)
    }
}

impl Transaction<'_> {
    /// Effective rights of a principal on a record.
    pub fn retrieve_principal_access(
        &self,
        target: &EntityReference,
        principal: &EntityReference,
    ) -> CrmResult<AccessRights> {
        self.view().principal_access(target, principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::setup;

    fn other_user(db: &crate::database::Database) -> EntityReference {
        let bu = EntityReference::new("businessunit", db.caller().business_unit_id);
        let id = db
            .transaction(|txn| txn.create(Record::new("systemuser").with("lastname", "Other").with("businessunitid", bu)))
            .unwrap();
        EntityReference::new("systemuser", id)
    }

    #[test]
    fn grant_merges_and_modify_replaces() {
        let db = setup();
        let user = other_user(&db);
        let account = db
            .transaction(|txn| txn.create(Record::new("account").with("name", "Shared")))
            .unwrap();
        let target = EntityReference::new("account", account);

        db.transaction(|txn| txn.grant_access(&target, &user, AccessRights::READ)).unwrap();
        db.transaction(|txn| txn.grant_access(&target, &user, AccessRights::WRITE)).unwrap();
        let rights = db.view(|v| v.principal_access(&target, &user)).unwrap();
        assert_eq!(rights, AccessRights::READ | AccessRights::WRITE);
        assert_eq!(db.scan(ACCESS_GRANT).len(), 1);

        db.transaction(|txn| txn.modify_access(&target, &user, AccessRights::DELETE)).unwrap();
        let rights = db.view(|v| v.principal_access(&target, &user)).unwrap();
        assert_eq!(rights, AccessRights::DELETE);

        db.transaction(|txn| txn.revoke_access(&target, &user)).unwrap();
        let rights = db.view(|v| v.principal_access(&target, &user)).unwrap();
        assert!(rights.is_empty());
    }

    #[test]
    fn owner_and_team_rights() {
        let db = setup();
        let caller = db.caller();
        let user = other_user(&db);
        let team = EntityReference::new("team", db.default_team());
        let account = db
            .transaction(|txn| txn.create(Record::new("account").with("name", "Mine")))
            .unwrap();
        let target = EntityReference::new("account", account);

        let owner = EntityReference::new("systemuser", caller.user_id);
        assert_eq!(db.view(|v| v.principal_access(&target, &owner)).unwrap(), AccessRights::all());

        db.transaction(|txn| txn.grant_access(&target, &team, AccessRights::READ | AccessRights::APPEND))
            .unwrap();
        db.transaction(|txn| txn.associate(&team, "teammembership_association", &[user.clone()]))
            .unwrap();
        assert_eq!(
            db.view(|v| v.principal_access(&target, &user)).unwrap(),
            AccessRights::READ | AccessRights::APPEND
        );
    }

    #[test]
    fn deleting_record_drops_grants() {
        let db = setup();
        let user = other_user(&db);
        let account = db
            .transaction(|txn| txn.create(Record::new("account").with("name", "Tmp")))
            .unwrap();
        let target = EntityReference::new("account", account);
        db.transaction(|txn| txn.grant_access(&target, &user, AccessRights::READ)).unwrap();
        db.transaction(|txn| txn.delete(&target)).unwrap();
        assert!(db.scan(ACCESS_GRANT).is_empty());
    }
}
