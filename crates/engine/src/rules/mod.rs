//! Business rule engine
//!
//! Every write goes through a [`Transaction`]: a borrow of the locked
//! tables plus the catalog, configuration and calling identity. One
//! transaction is one write-lock critical section, so a multi-step rule
//! (create plus party rows, delete plus cascades) is never observed half
//! applied.
//!
//! The rule families live in submodules, each adding methods to
//! [`Transaction`]:
//! - `create`, `update`, `delete`, `upsert`: the record write path
//! - `state`: state/status validation and transitions
//! - `references`: lookup resolution, owner triad and formatted values
//! - `party`: activity-party lists
//! - `associate`: relationship writes
//! - `composite`: qualify lead, close incident, win/lose opportunity
//! - `access`: record sharing

mod access;
mod associate;
mod composite;
mod create;
mod delete;
mod party;
mod references;
mod state;
mod update;
mod upsert;

pub use composite::{QualifyLead, QualifyLeadResult};
pub use upsert::UpsertResult;

use chrono::{DateTime, Utc};
use memcrm_core::{Catalog, CrmError, CrmResult, EntityCollection, EntityDef, EntityReference, Record};
use memcrm_storage::Tables;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::query::{self, ColumnSet, EvalContext, Query};

/// Identity a request runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Calling user
    pub user_id: Uuid,
    /// Calling user's business unit
    pub business_unit_id: Uuid,
    /// Organization
    pub organization_id: Uuid,
}

// =============================================================================
// Read view
// =============================================================================

/// Read-only access to the store under a shared lock.
pub struct ReadView<'a> {
    tables: &'a Tables,
    catalog: &'a Catalog,
    config: &'a EngineConfig,
    caller: &'a CallerContext,
}

impl<'a> ReadView<'a> {
    pub(crate) fn new(
        tables: &'a Tables,
        catalog: &'a Catalog,
        config: &'a EngineConfig,
        caller: &'a CallerContext,
    ) -> Self {
        Self {
            tables,
            catalog,
            config,
            caller,
        }
    }

    /// Borrow the underlying tables.
    pub fn tables(&self) -> &'a Tables {
        self.tables
    }

    /// Schema catalog.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Calling identity.
    pub fn caller(&self) -> &'a CallerContext {
        self.caller
    }

    /// Id of a reference, resolving alternate keys.
    pub fn resolve_id(&self, reference: &EntityReference) -> CrmResult<Uuid> {
        if reference.is_keyed() {
            self.tables
                .resolve_alternate_key(&reference.logical_name, &reference.key_attributes)
        } else {
            Ok(reference.id)
        }
    }

    /// One record projected to `columns`.
    pub fn retrieve(&self, reference: &EntityReference, columns: &ColumnSet) -> CrmResult<Record> {
        let logical_name = reference.logical_name.to_lowercase();
        let id = self.resolve_id(reference)?;
        let record = self
            .tables
            .get_ref(&logical_name, id)
            .ok_or_else(|| CrmError::does_not_exist(&logical_name, id))?;
        if columns.all_columns {
            return Ok(record.clone());
        }
        let mut wanted: Vec<String> = columns.columns.iter().map(|c| c.to_lowercase()).collect();
        wanted.push(self.catalog.primary_id_attribute(&logical_name));
        let mut copy = record.clone();
        copy.project(&wanted);
        Ok(copy)
    }

    /// Run any query form.
    pub fn retrieve_multiple(&self, query: &Query) -> CrmResult<EntityCollection> {
        let ctx = EvalContext::new(self.config, self.caller.user_id, self.caller.business_unit_id);
        query::retrieve_multiple(query, self.tables, self.catalog, &ctx)
    }

    /// Every record of a type, in insertion order.
    pub fn entities_in(&self, logical_name: &str) -> Vec<Record> {
        self.tables.scan(&logical_name.to_lowercase())
    }

    /// Number of records of a type.
    pub fn count(&self, logical_name: &str) -> usize {
        self.tables.count(&logical_name.to_lowercase())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Write access to the store under the exclusive lock.
pub struct Transaction<'a> {
    tables: &'a mut Tables,
    catalog: &'a Catalog,
    config: &'a EngineConfig,
    caller: &'a CallerContext,
    now: DateTime<Utc>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        tables: &'a mut Tables,
        catalog: &'a Catalog,
        config: &'a EngineConfig,
        caller: &'a CallerContext,
    ) -> Self {
        Self {
            now: config.now(),
            tables,
            catalog,
            config,
            caller,
        }
    }

    /// Read view over the same tables.
    pub fn view(&self) -> ReadView<'_> {
        ReadView::new(self.tables, self.catalog, self.config, self.caller)
    }

    /// Calling identity.
    pub fn caller(&self) -> &CallerContext {
        self.caller
    }

    /// Schema catalog.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Instant this transaction stamps records with.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub(crate) fn entry(&self, logical_name: &str) -> Cow<'a, EntityDef> {
        self.catalog.entry(logical_name)
    }

    pub(crate) fn caller_reference(&self) -> EntityReference {
        EntityReference::new("systemuser", self.caller.user_id)
    }

    /// Reject direct writes to relationship row types.
    pub(crate) fn check_writable(&self, method: &str, def: &EntityDef) -> CrmResult<()> {
        if def.is_intersect && !self.config.is_writable_relationship(&def.logical_name) {
            return Err(CrmError::unsupported(method, &def.logical_name));
        }
        Ok(())
    }

    /// Reject undeclared attributes when validation is on.
    pub(crate) fn check_attributes(&self, def: &EntityDef, record: &Record) -> CrmResult<()> {
        if !self.config.validate_attributes || !def.declared {
            return Ok(());
        }
        match record.attributes.keys().find(|a| !def.attributes.contains_key(*a)) {
            Some(attribute) => Err(CrmError::unknown_attribute(&def.logical_name, attribute)),
            None => Ok(()),
        }
    }

    /// Id of a reference, resolving alternate keys.
    pub fn resolve_id(&self, reference: &EntityReference) -> CrmResult<Uuid> {
        self.view().resolve_id(reference)
    }

    /// Clone of an existing record.
    pub(crate) fn existing(&self, logical_name: &str, id: Uuid) -> CrmResult<Record> {
        self.tables
            .get(logical_name, id)
            .ok_or_else(|| CrmError::does_not_exist(logical_name, id))
    }

    /// Id addressed by a write request: record id, id attribute or key.
    ///
    /// The id attribute must agree with a non-nil record id.
    pub(crate) fn target_id(&self, def: &EntityDef, record: &Record) -> CrmResult<Option<Uuid>> {
        let bag_id = record
            .get_non_null(&def.primary_id_attribute)
            .and_then(|v| v.as_guid());
        match (record.id.is_nil(), bag_id) {
            (false, Some(bag)) if bag != record.id => Err(CrmError::IdMismatch),
            (false, _) => Ok(Some(record.id)),
            (true, Some(bag)) => Ok(Some(bag)),
            (true, None) if !record.key_attributes.is_empty() => self
                .tables
                .find_by_key(&def.logical_name, &record.key_attributes),
            (true, None) => Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::database::Database;
    use chrono::TimeZone;

    /// Database frozen at 2024-05-15 14:30 UTC.
    pub fn setup() -> Database {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 14, 30, 0).unwrap();
        Database::builder()
            .config(EngineConfig::default().with_fixed_time(now))
            .build()
    }
}
