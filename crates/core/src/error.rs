//! Fault taxonomy for the CRM engine
//!
//! Every rule violation surfaces as one [`CrmError`] whose `Display` text is
//! the platform's fault message. Callers match on message content, so the
//! strings below are part of the external contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result alias used across the engine crates.
pub type CrmResult<T> = Result<T, CrmError>;

/// Coarse classification of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    /// Malformed request (alias, query shape, attribute/value pairing).
    Validation,
    /// Missing or conflicting referenced data.
    Referential,
    /// Request not supported for the addressed type.
    Unsupported,
    /// Engine invariant broken.
    Internal,
}

/// Engine fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrmError {
    /// Addressed or referenced record is missing.
    #[error("{entity} With Id = {id} Does Not Exist")]
    DoesNotExist {
        /// Logical type
        entity: String,
        /// Missing id
        id: Uuid,
    },

    /// No record matches the supplied alternate-key values.
    #[error("A record with the specified key values does not exist in {entity} entity")]
    KeyValuesNotFound {
        /// Logical type
        entity: String,
    },

    /// The supplied key attribute set matches no declared key.
    #[error("The requested key attributes do not exist for the entity {entity}")]
    KeyNotDeclared {
        /// Logical type
        entity: String,
    },

    /// A write would duplicate the values of a declared alternate key.
    #[error("A record that has the attribute values {values} already exists. The entity key {key} requires that this set of attributes contains unique values.")]
    DuplicateKeyValues {
        /// Comma separated key values
        values: String,
        /// Key name
        key: String,
    },

    /// A record with the same id already exists.
    #[error("Cannot insert duplicate key.")]
    DuplicateId,

    /// Link or column alias contains illegal characters.
    #[error("Invalid character specified for alias: {0}. Only characters within the ranges [A-Z], [a-z] or [0-9] or _ are allowed. The first character may only be in the ranges [A-Z], [a-z] or _.")]
    InvalidAlias(String),

    /// Plain column requested alongside aggregates.
    #[error("Attribute can not be specified if an aggregate operation is requested.")]
    AggregateColumnMix,

    /// Query-by-attribute with uneven lists.
    #[error("The number of attributes and values does not match.")]
    AttributeValueMismatch,

    /// Top count combined with a page number.
    #[error("The top attribute can't be specified with paging attribute page.")]
    TopWithPaging,

    /// A conditionally-required attribute group is unsatisfied.
    #[error("{0}")]
    RequiredAttributeMissing(String),

    /// Id attribute in the property bag differs from the record id.
    #[error("Entity Id must be the same as the value set in property bag.")]
    IdMismatch,

    /// Direct write to a type that only exists as a side effect.
    #[error("The '{method}' method does not support entities of type '{entity}'.")]
    UnsupportedEntity {
        /// Request name ("Create", "Delete", ...)
        method: String,
        /// Logical type
        entity: String,
    },

    /// Activity party without a party or an address.
    #[error("An activity party must specify either a partyid or an addressused value.")]
    InvalidActivityParty,

    /// Attribute not declared on a validated type.
    #[error("'{entity}' entity doesn't contain attribute with Name = '{attribute}'.")]
    UnknownAttribute {
        /// Logical type
        entity: String,
        /// Attribute name
        attribute: String,
    },

    /// State code not declared for the type.
    #[error("{state} is not a valid state code on {entity} with Id {id}.")]
    InvalidState {
        /// Requested state
        state: i32,
        /// Logical type
        entity: String,
        /// Record id
        id: Uuid,
    },

    /// Status code not valid for the state.
    #[error("{status} is not a valid status code for state code {state} on {entity} with Id {id}.")]
    InvalidStatus {
        /// Requested status
        status: i32,
        /// Target state
        state: i32,
        /// Logical type
        entity: String,
        /// Record id
        id: Uuid,
    },

    /// A restrict cascade blocks the delete.
    #[error("The record cannot be deleted because it is associated with another record.")]
    DeleteRestricted,

    /// Relationship name not in the catalog.
    #[error("The relationship '{0}' was not found in the metadata cache.")]
    RelationshipNotFound(String),

    /// Entity metadata lookup for an undeclared type.
    #[error("Could not find entity with name '{0}'.")]
    EntityNotFound(String),

    /// Qualify on a lead that is no longer open.
    #[error("The lead is closed. You cannot convert or qualify a lead that is already closed.")]
    LeadClosed,

    /// FetchXML could not be parsed or names unknown constructs.
    #[error("Invalid FetchXml: {0}")]
    InvalidFetchXml(String),

    /// Query shape rejected by the normalizer.
    #[error("{0}")]
    InvalidQuery(String),

    /// Request argument rejected.
    #[error("{0}")]
    InvalidArgument(String),

    /// Engine invariant broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrmError {
    /// Missing record fault.
    pub fn does_not_exist(entity: impl Into<String>, id: Uuid) -> Self {
        CrmError::DoesNotExist {
            entity: entity.into(),
            id,
        }
    }

    /// Unsupported direct write fault.
    pub fn unsupported(method: impl Into<String>, entity: impl Into<String>) -> Self {
        CrmError::UnsupportedEntity {
            method: method.into(),
            entity: entity.into(),
        }
    }

    /// Unknown attribute fault.
    pub fn unknown_attribute(entity: impl Into<String>, attribute: impl Into<String>) -> Self {
        CrmError::UnknownAttribute {
            entity: entity.into(),
            attribute: attribute.into(),
        }
    }

    /// Invalid FetchXML fault.
    pub fn fetch(message: impl Into<String>) -> Self {
        CrmError::InvalidFetchXml(message.into())
    }

    /// Generic query validation fault.
    pub fn query(message: impl Into<String>) -> Self {
        CrmError::InvalidQuery(message.into())
    }

    /// Generic argument fault.
    pub fn invalid(message: impl Into<String>) -> Self {
        CrmError::InvalidArgument(message.into())
    }

    /// Internal fault.
    pub fn internal(message: impl Into<String>) -> Self {
        CrmError::Internal(message.into())
    }

    /// Classification of this fault.
    pub fn kind(&self) -> FaultKind {
        match self {
            CrmError::DoesNotExist { .. }
            | CrmError::KeyValuesNotFound { .. }
            | CrmError::DuplicateKeyValues { .. }
            | CrmError::DuplicateId
            | CrmError::RequiredAttributeMissing(_)
            | CrmError::IdMismatch
            | CrmError::DeleteRestricted
            | CrmError::LeadClosed => FaultKind::Referential,
            CrmError::UnsupportedEntity { .. }
            | CrmError::RelationshipNotFound(_)
            | CrmError::EntityNotFound(_) => FaultKind::Unsupported,
            CrmError::Internal(_) => FaultKind::Internal,
            _ => FaultKind::Validation,
        }
    }
}
