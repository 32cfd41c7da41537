//! Composite operation handlers.

use memcrm_core::Record;
use memcrm_engine::{QualifyLead, Transaction};

use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle QualifyLead command.
pub fn qualify_lead(txn: &mut Transaction<'_>, request: &QualifyLead) -> Result<Output> {
    let result = convert_result(txn.qualify_lead(request))?;
    Ok(Output::Qualified(result))
}

/// Handle CloseIncident command.
pub fn close_incident(txn: &mut Transaction<'_>, resolution: Record, status: i32) -> Result<Output> {
    let id = convert_result(txn.close_incident(resolution, status))?;
    Ok(Output::Id(id))
}

/// Handle WinOpportunity command.
pub fn win_opportunity(txn: &mut Transaction<'_>, close: Record, status: i32) -> Result<Output> {
    let id = convert_result(txn.win_opportunity(close, status))?;
    Ok(Output::Id(id))
}

/// Handle LoseOpportunity command.
pub fn lose_opportunity(txn: &mut Transaction<'_>, close: Record, status: i32) -> Result<Output> {
    let id = convert_result(txn.lose_opportunity(close, status))?;
    Ok(Output::Id(id))
}
