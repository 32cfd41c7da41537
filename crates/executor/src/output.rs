//! Outputs returned by the executor.

use std::collections::BTreeMap;

use memcrm_core::{AttributeDef, EntityCollection, EntityDef, EntityReference, Record};
use memcrm_engine::{QualifyLeadResult, UpsertResult};
use memcrm_security::AccessRights;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// One entry of an `ExecuteMultiple` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseItem {
    /// Zero-based position of the request
    pub request_index: usize,
    /// Output, when responses were requested and the request succeeded
    pub response: Option<Output>,
    /// Fault of a failed request
    pub fault: Option<Error>,
}

/// Result of a [`Command`](crate::Command).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// No payload (update, delete, associate, ...).
    Unit,
    /// Id of a created record.
    Id(Uuid),
    /// Ids of created records, in request order.
    Ids(Vec<Uuid>),
    /// One record.
    Record(Record),
    /// Query result.
    Collection(EntityCollection),
    /// Flag (delete-if-exists).
    Bool(bool),
    /// Upsert outcome.
    Upserted(UpsertResult),
    /// Upsert outcomes, in request order.
    Upserts(Vec<UpsertResult>),
    /// Outputs of a transactional batch (empty unless requested).
    Responses(Vec<Output>),
    /// Outputs and faults of an `ExecuteMultiple` batch.
    MultipleResponses {
        /// Per-request entries, in request order
        items: Vec<ResponseItem>,
        /// True when any request failed
        is_faulted: bool,
    },
    /// Records created by qualifying a lead.
    Qualified(QualifyLeadResult),
    /// Effective access rights.
    Access(AccessRights),
    /// Calling identity.
    WhoAmI {
        /// Calling user
        user_id: Uuid,
        /// Calling user's business unit
        business_unit_id: Uuid,
        /// Organization
        organization_id: Uuid,
    },
    /// Metadata of one type.
    Entity(EntityDef),
    /// Metadata of one attribute.
    Attribute(AttributeDef),
    /// Metadata of every declared type.
    Entities(Vec<EntityDef>),
    /// Record counts keyed by logical type.
    RecordCounts(BTreeMap<String, usize>),
}

impl Output {
    /// Created record as a reference, when this output is an id.
    pub fn created(&self, logical_name: &str) -> Option<EntityReference> {
        match self {
            Output::Id(id) => Some(EntityReference::new(logical_name, *id)),
            _ => None,
        }
    }

    /// Render the output as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
