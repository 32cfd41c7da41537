//! Batch, state, composite, sharing and metadata requests.

use std::collections::BTreeMap;

use memcrm_core::{AttributeDef, EntityDef, EntityReference, Record};
use memcrm_engine::{CallerContext, QualifyLead, QualifyLeadResult, UpsertResult};
use memcrm_security::AccessRights;
use uuid::Uuid;

use super::Crm;
use crate::output::ResponseItem;
use crate::{Command, Error, Output, Result};

impl Crm {
    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Create records in order, stopping at the first failure.
    pub fn create_multiple(&self, records: Vec<Record>) -> Result<Vec<Uuid>> {
        match self.execute(Command::CreateMultiple { records })? {
            Output::Ids(ids) => Ok(ids),
            _ => Err(Error::Internal {
                reason: "Unexpected output for CreateMultiple".into(),
            }),
        }
    }

    /// Update records in order, stopping at the first failure.
    pub fn update_multiple(&self, records: Vec<Record>) -> Result<()> {
        match self.execute(Command::UpdateMultiple { records })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for UpdateMultiple".into(),
            }),
        }
    }

    /// Upsert records in order, stopping at the first failure.
    pub fn upsert_multiple(&self, records: Vec<Record>) -> Result<Vec<UpsertResult>> {
        match self.execute(Command::UpsertMultiple { records })? {
            Output::Upserts(results) => Ok(results),
            _ => Err(Error::Internal {
                reason: "Unexpected output for UpsertMultiple".into(),
            }),
        }
    }

    /// Run requests in order; the fault of a failed request carries its index.
    pub fn execute_transaction(
        &self,
        requests: Vec<Command>,
        return_responses: bool,
    ) -> Result<Vec<Output>> {
        match self.execute(Command::ExecuteTransaction {
            requests,
            return_responses,
        })? {
            Output::Responses(responses) => Ok(responses),
            _ => Err(Error::Internal {
                reason: "Unexpected output for ExecuteTransaction".into(),
            }),
        }
    }

    /// Run requests in order, optionally continuing past failures.
    ///
    /// Returns the per-request entries and whether any request failed.
    pub fn execute_multiple(
        &self,
        requests: Vec<Command>,
        continue_on_error: bool,
        return_responses: bool,
    ) -> Result<(Vec<ResponseItem>, bool)> {
        match self.execute(Command::ExecuteMultiple {
            requests,
            continue_on_error,
            return_responses,
        })? {
            Output::MultipleResponses { items, is_faulted } => Ok((items, is_faulted)),
            _ => Err(Error::Internal {
                reason: "Unexpected output for ExecuteMultiple".into(),
            }),
        }
    }

    // =========================================================================
    // State and Ownership
    // =========================================================================

    /// Change a record's state; `status` of -1 picks the state's default.
    pub fn set_state(&self, target: &EntityReference, state: i32, status: i32) -> Result<()> {
        match self.execute(Command::SetState {
            target: target.clone(),
            state,
            status,
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for SetState".into(),
            }),
        }
    }

    /// Move a record to a new owner.
    pub fn assign(&self, target: &EntityReference, assignee: EntityReference) -> Result<()> {
        match self.execute(Command::Assign {
            target: target.clone(),
            assignee,
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Assign".into(),
            }),
        }
    }

    // =========================================================================
    // Composite Operations
    // =========================================================================

    /// Qualify a lead, creating the requested records.
    pub fn qualify_lead(&self, request: QualifyLead) -> Result<QualifyLeadResult> {
        match self.execute(Command::QualifyLead(request))? {
            Output::Qualified(result) => Ok(result),
            _ => Err(Error::Internal {
                reason: "Unexpected output for QualifyLead".into(),
            }),
        }
    }

    /// Resolve a case; returns the id of the resolution activity.
    pub fn close_incident(&self, resolution: Record, status: i32) -> Result<Uuid> {
        match self.execute(Command::CloseIncident { resolution, status })? {
            Output::Id(id) => Ok(id),
            _ => Err(Error::Internal {
                reason: "Unexpected output for CloseIncident".into(),
            }),
        }
    }

    /// Close an opportunity as won; returns the id of the close activity.
    pub fn win_opportunity(&self, close: Record, status: i32) -> Result<Uuid> {
        match self.execute(Command::WinOpportunity { close, status })? {
            Output::Id(id) => Ok(id),
            _ => Err(Error::Internal {
                reason: "Unexpected output for WinOpportunity".into(),
            }),
        }
    }

    /// Close an opportunity as lost; returns the id of the close activity.
    pub fn lose_opportunity(&self, close: Record, status: i32) -> Result<Uuid> {
        match self.execute(Command::LoseOpportunity { close, status })? {
            Output::Id(id) => Ok(id),
            _ => Err(Error::Internal {
                reason: "Unexpected output for LoseOpportunity".into(),
            }),
        }
    }

    // =========================================================================
    // Sharing
    // =========================================================================

    /// Add rights for a principal on a record.
    pub fn grant_access(
        &self,
        target: &EntityReference,
        principal: &EntityReference,
        rights: AccessRights,
    ) -> Result<()> {
        match self.execute(Command::GrantAccess {
            target: target.clone(),
            principal: principal.clone(),
            rights,
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for GrantAccess".into(),
            }),
        }
    }

    /// Replace the rights of a principal on a record.
    pub fn modify_access(
        &self,
        target: &EntityReference,
        principal: &EntityReference,
        rights: AccessRights,
    ) -> Result<()> {
        match self.execute(Command::ModifyAccess {
            target: target.clone(),
            principal: principal.clone(),
            rights,
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for ModifyAccess".into(),
            }),
        }
    }

    /// Remove a principal's rights on a record.
    pub fn revoke_access(&self, target: &EntityReference, revokee: &EntityReference) -> Result<()> {
        match self.execute(Command::RevokeAccess {
            target: target.clone(),
            revokee: revokee.clone(),
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for RevokeAccess".into(),
            }),
        }
    }

    /// Effective rights of a principal on a record.
    pub fn retrieve_principal_access(
        &self,
        target: &EntityReference,
        principal: &EntityReference,
    ) -> Result<AccessRights> {
        match self.execute(Command::RetrievePrincipalAccess {
            target: target.clone(),
            principal: principal.clone(),
        })? {
            Output::Access(rights) => Ok(rights),
            _ => Err(Error::Internal {
                reason: "Unexpected output for RetrievePrincipalAccess".into(),
            }),
        }
    }

    // =========================================================================
    // Identity and Metadata
    // =========================================================================

    /// Identity requests run as.
    pub fn who_am_i(&self) -> Result<CallerContext> {
        match self.execute(Command::WhoAmI)? {
            Output::WhoAmI {
                user_id,
                business_unit_id,
                organization_id,
            } => Ok(CallerContext {
                user_id,
                business_unit_id,
                organization_id,
            }),
            _ => Err(Error::Internal {
                reason: "Unexpected output for WhoAmI".into(),
            }),
        }
    }

    /// Metadata of one declared type.
    pub fn retrieve_entity(&self, logical_name: &str) -> Result<EntityDef> {
        match self.execute(Command::RetrieveEntity {
            logical_name: logical_name.to_string(),
        })? {
            Output::Entity(def) => Ok(def),
            _ => Err(Error::Internal {
                reason: "Unexpected output for RetrieveEntity".into(),
            }),
        }
    }

    /// Metadata of one attribute of a declared type.
    pub fn retrieve_attribute(&self, entity_logical_name: &str, logical_name: &str) -> Result<AttributeDef> {
        match self.execute(Command::RetrieveAttribute {
            entity_logical_name: entity_logical_name.to_string(),
            logical_name: logical_name.to_string(),
        })? {
            Output::Attribute(def) => Ok(def),
            _ => Err(Error::Internal {
                reason: "Unexpected output for RetrieveAttribute".into(),
            }),
        }
    }

    /// Metadata of every declared type.
    pub fn retrieve_all_entities(&self) -> Result<Vec<EntityDef>> {
        match self.execute(Command::RetrieveAllEntities)? {
            Output::Entities(defs) => Ok(defs),
            _ => Err(Error::Internal {
                reason: "Unexpected output for RetrieveAllEntities".into(),
            }),
        }
    }

    /// Stored record counts per type.
    pub fn retrieve_total_record_count(&self, entity_names: &[&str]) -> Result<BTreeMap<String, usize>> {
        match self.execute(Command::RetrieveTotalRecordCount {
            entity_names: entity_names.iter().map(|n| n.to_string()).collect(),
        })? {
            Output::RecordCounts(counts) => Ok(counts),
            _ => Err(Error::Internal {
                reason: "Unexpected output for RetrieveTotalRecordCount".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memcrm_core::FaultKind;

    #[test]
    fn test_who_am_i_matches_seeded_identity() {
        let crm = Crm::new();
        let me = crm.who_am_i().unwrap();
        assert_eq!(me, crm.database().caller());
    }

    #[test]
    fn test_metadata_requests() {
        let crm = Crm::new();
        let account = crm.retrieve_entity("Account").unwrap();
        assert_eq!(account.primary_id_attribute, "accountid");
        assert!(crm.retrieve_attribute("account", "name").is_ok());

        let err = crm.retrieve_entity("nosuchentity").unwrap_err();
        assert_eq!(err.to_string(), "Could not find entity with name 'nosuchentity'.");
        assert_eq!(err.kind(), FaultKind::Unsupported);

        let err = crm.retrieve_attribute("account", "nosuchattribute").unwrap_err();
        assert_eq!(err.kind(), FaultKind::Validation);
        assert!(crm.retrieve_all_entities().unwrap().iter().any(|e| e.logical_name == "contact"));
    }

    #[test]
    fn test_record_counts() {
        let crm = Crm::new();
        crm.create_multiple(vec![Record::new("account"), Record::new("account")])
            .unwrap();
        let counts = crm.retrieve_total_record_count(&["account", "Lead"]).unwrap();
        assert_eq!(counts["account"], 2);
        assert_eq!(counts["lead"], 0);
    }

    #[test]
    fn test_execute_transaction_returns_responses() {
        let crm = Crm::new();
        let responses = crm
            .execute_transaction(
                vec![
                    Command::Create {
                        record: Record::new("account").with("name", "A"),
                    },
                    Command::WhoAmI,
                ],
                true,
            )
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert!(matches!(responses[0], Output::Id(_)));
        assert!(matches!(responses[1], Output::WhoAmI { .. }));
    }

    #[test]
    fn test_as_caller_stamps_other_user() {
        let crm = Crm::new();
        let bu = EntityReference::new("businessunit", crm.database().caller().business_unit_id);
        let other = crm
            .create(Record::new("systemuser").with("lastname", "Other").with("businessunitid", bu))
            .unwrap();
        let mut caller = crm.database().caller();
        caller.user_id = other;

        let id = crm
            .as_caller(caller)
            .create(Record::new("account").with("name", "Theirs"))
            .unwrap();
        let stored = crm.database().get("account", id).unwrap();
        assert_eq!(stored.reference("createdby").unwrap().id, other);
        assert_eq!(stored.reference("ownerid").unwrap().id, other);
    }
}
