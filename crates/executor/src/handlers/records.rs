//! Record command handlers.

use memcrm_core::{EntityReference, Record};
use memcrm_engine::{ColumnSet, Query, ReadView, Transaction};

use crate::convert::convert_result;
use crate::{Output, Result};

// =============================================================================
// Writes
// =============================================================================

/// Handle Create command.
pub fn create(txn: &mut Transaction<'_>, record: Record) -> Result<Output> {
    let id = convert_result(txn.create(record))?;
    Ok(Output::Id(id))
}

/// Handle Update command.
pub fn update(txn: &mut Transaction<'_>, record: Record) -> Result<Output> {
    convert_result(txn.update(record))?;
    Ok(Output::Unit)
}

/// Handle Delete command.
pub fn delete(txn: &mut Transaction<'_>, target: &EntityReference) -> Result<Output> {
    convert_result(txn.delete(target))?;
    Ok(Output::Unit)
}

/// Handle DeleteIfExists command.
pub fn delete_if_exists(txn: &mut Transaction<'_>, target: &EntityReference) -> Result<Output> {
    let existed = convert_result(txn.delete_if_exists(target))?;
    Ok(Output::Bool(existed))
}

/// Handle Associate command.
pub fn associate(
    txn: &mut Transaction<'_>,
    target: &EntityReference,
    relationship: &str,
    related: &[EntityReference],
) -> Result<Output> {
    convert_result(txn.associate(target, relationship, related))?;
    Ok(Output::Unit)
}

/// Handle Disassociate command.
pub fn disassociate(
    txn: &mut Transaction<'_>,
    target: &EntityReference,
    relationship: &str,
    related: &[EntityReference],
) -> Result<Output> {
    convert_result(txn.disassociate(target, relationship, related))?;
    Ok(Output::Unit)
}

/// Handle Upsert command.
pub fn upsert(txn: &mut Transaction<'_>, record: Record) -> Result<Output> {
    let result = convert_result(txn.upsert(record))?;
    Ok(Output::Upserted(result))
}

/// Handle SetState command.
pub fn set_state(
    txn: &mut Transaction<'_>,
    target: &EntityReference,
    state: i32,
    status: i32,
) -> Result<Output> {
    convert_result(txn.set_state(target, state, status))?;
    Ok(Output::Unit)
}

/// Handle Assign command.
pub fn assign(
    txn: &mut Transaction<'_>,
    target: &EntityReference,
    assignee: EntityReference,
) -> Result<Output> {
    convert_result(txn.assign(target, assignee))?;
    Ok(Output::Unit)
}

// =============================================================================
// Reads
// =============================================================================

/// Handle Retrieve command.
pub fn retrieve(view: &ReadView<'_>, target: &EntityReference, columns: &ColumnSet) -> Result<Output> {
    let record = convert_result(view.retrieve(target, columns))?;
    Ok(Output::Record(record))
}

/// Handle RetrieveMultiple command.
pub fn retrieve_multiple(view: &ReadView<'_>, query: &Query) -> Result<Output> {
    let collection = convert_result(view.retrieve_multiple(query))?;
    Ok(Output::Collection(collection))
}
