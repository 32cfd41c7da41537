//! Commands accepted by the executor.
//!
//! One variant per supported request. Commands are plain data: they can be
//! built directly, or parsed from JSON with [`Command::from_json`].

use memcrm_core::{EntityReference, Record};
use memcrm_engine::{ColumnSet, Query, QualifyLead};
use memcrm_security::AccessRights;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A request to the CRM engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // =========================================================================
    // Records
    // =========================================================================
    /// Create a record.
    Create {
        /// Record to create
        record: Record,
    },
    /// Retrieve one record.
    Retrieve {
        /// Record to read (id or alternate key)
        target: EntityReference,
        /// Columns to return
        columns: ColumnSet,
    },
    /// Update a record.
    Update {
        /// Changed attributes, addressed by id or alternate key
        record: Record,
    },
    /// Delete a record.
    Delete {
        /// Record to delete
        target: EntityReference,
    },
    /// Delete a record when it exists.
    DeleteIfExists {
        /// Record to delete
        target: EntityReference,
    },
    /// Link records through a relationship.
    Associate {
        /// Record on one side
        target: EntityReference,
        /// Relationship schema name
        relationship: String,
        /// Records on the other side
        related: Vec<EntityReference>,
    },
    /// Remove relationship links.
    Disassociate {
        /// Record on one side
        target: EntityReference,
        /// Relationship schema name
        relationship: String,
        /// Records on the other side
        related: Vec<EntityReference>,
    },
    /// Run a query.
    RetrieveMultiple {
        /// Query in any supported form
        query: Query,
    },
    /// Create or update by id or alternate key.
    Upsert {
        /// Record to write
        record: Record,
    },

    // =========================================================================
    // Batches
    // =========================================================================
    /// Create several records, stopping at the first failure.
    CreateMultiple {
        /// Records to create
        records: Vec<Record>,
    },
    /// Update several records, stopping at the first failure.
    UpdateMultiple {
        /// Records to update
        records: Vec<Record>,
    },
    /// Upsert several records, stopping at the first failure.
    UpsertMultiple {
        /// Records to write
        records: Vec<Record>,
    },
    /// Run requests in order, stopping at the first failure.
    ExecuteTransaction {
        /// Requests to run
        requests: Vec<Command>,
        /// Return each request's output
        return_responses: bool,
    },
    /// Run requests in order, optionally continuing past failures.
    ExecuteMultiple {
        /// Requests to run
        requests: Vec<Command>,
        /// Keep going after a failed request
        continue_on_error: bool,
        /// Return each successful request's output
        return_responses: bool,
    },

    // =========================================================================
    // State, ownership and composite operations
    // =========================================================================
    /// Change a record's state and status.
    SetState {
        /// Record to change
        target: EntityReference,
        /// New state
        state: i32,
        /// New status (-1 for the state's default)
        status: i32,
    },
    /// Change a record's owner.
    Assign {
        /// Record to change
        target: EntityReference,
        /// New owner (user or team)
        assignee: EntityReference,
    },
    /// Qualify a lead.
    QualifyLead(QualifyLead),
    /// Resolve a case.
    CloseIncident {
        /// `incidentresolution` record pointing at the case
        resolution: Record,
        /// Resolved status
        status: i32,
    },
    /// Close an opportunity as won.
    WinOpportunity {
        /// `opportunityclose` record pointing at the opportunity
        close: Record,
        /// Won status
        status: i32,
    },
    /// Close an opportunity as lost.
    LoseOpportunity {
        /// `opportunityclose` record pointing at the opportunity
        close: Record,
        /// Lost status
        status: i32,
    },

    // =========================================================================
    // Sharing
    // =========================================================================
    /// Add rights for a principal.
    GrantAccess {
        /// Shared record
        target: EntityReference,
        /// User or team
        principal: EntityReference,
        /// Rights to add
        rights: AccessRights,
    },
    /// Replace the rights of a principal.
    ModifyAccess {
        /// Shared record
        target: EntityReference,
        /// User or team
        principal: EntityReference,
        /// New rights
        rights: AccessRights,
    },
    /// Remove a principal's rights.
    RevokeAccess {
        /// Shared record
        target: EntityReference,
        /// User or team
        revokee: EntityReference,
    },
    /// Effective rights of a principal.
    RetrievePrincipalAccess {
        /// Record
        target: EntityReference,
        /// User or team
        principal: EntityReference,
    },

    // =========================================================================
    // Identity and metadata
    // =========================================================================
    /// Calling identity.
    WhoAmI,
    /// Metadata of one type.
    RetrieveEntity {
        /// Logical type
        logical_name: String,
    },
    /// Metadata of one attribute.
    RetrieveAttribute {
        /// Logical type
        entity_logical_name: String,
        /// Attribute
        logical_name: String,
    },
    /// Metadata of every declared type.
    RetrieveAllEntities,
    /// Record counts per type.
    RetrieveTotalRecordCount {
        /// Logical types to count
        entity_names: Vec<String>,
    },
}

impl Command {
    /// Request name, as used in fault and log text.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "Create",
            Command::Retrieve { .. } => "Retrieve",
            Command::Update { .. } => "Update",
            Command::Delete { .. } => "Delete",
            Command::DeleteIfExists { .. } => "DeleteIfExists",
            Command::Associate { .. } => "Associate",
            Command::Disassociate { .. } => "Disassociate",
            Command::RetrieveMultiple { .. } => "RetrieveMultiple",
            Command::Upsert { .. } => "Upsert",
            Command::CreateMultiple { .. } => "CreateMultiple",
            Command::UpdateMultiple { .. } => "UpdateMultiple",
            Command::UpsertMultiple { .. } => "UpsertMultiple",
            Command::ExecuteTransaction { .. } => "ExecuteTransaction",
            Command::ExecuteMultiple { .. } => "ExecuteMultiple",
            Command::SetState { .. } => "SetState",
            Command::Assign { .. } => "Assign",
            Command::QualifyLead(_) => "QualifyLead",
            Command::CloseIncident { .. } => "CloseIncident",
            Command::WinOpportunity { .. } => "WinOpportunity",
            Command::LoseOpportunity { .. } => "LoseOpportunity",
            Command::GrantAccess { .. } => "GrantAccess",
            Command::ModifyAccess { .. } => "ModifyAccess",
            Command::RevokeAccess { .. } => "RevokeAccess",
            Command::RetrievePrincipalAccess { .. } => "RetrievePrincipalAccess",
            Command::WhoAmI => "WhoAmI",
            Command::RetrieveEntity { .. } => "RetrieveEntity",
            Command::RetrieveAttribute { .. } => "RetrieveAttribute",
            Command::RetrieveAllEntities => "RetrieveAllEntities",
            Command::RetrieveTotalRecordCount { .. } => "RetrieveTotalRecordCount",
        }
    }

    /// True for requests that carry other requests.
    pub fn is_batch(&self) -> bool {
        matches!(
            self,
            Command::ExecuteTransaction { .. } | Command::ExecuteMultiple { .. }
        )
    }

    /// True for requests that never write.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::Retrieve { .. }
                | Command::RetrieveMultiple { .. }
                | Command::RetrievePrincipalAccess { .. }
                | Command::WhoAmI
                | Command::RetrieveEntity { .. }
                | Command::RetrieveAttribute { .. }
                | Command::RetrieveAllEntities
                | Command::RetrieveTotalRecordCount { .. }
        )
    }

    /// Parse a command from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the command as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
