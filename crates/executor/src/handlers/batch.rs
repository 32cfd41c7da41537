//! Batch command handlers.
//!
//! Every batch runs inside the caller's transaction. Requests are applied in
//! order and nothing is rolled back: when request `i` fails, requests
//! `0..i` stay applied and the fault carries index `i`.

use memcrm_core::Record;
use memcrm_engine::Transaction;
use tracing::debug;

use super::dispatch;
use crate::convert::convert_result;
use crate::output::ResponseItem;
use crate::{Command, Error, Output, Result};

/// Handle CreateMultiple command.
pub fn create_multiple(txn: &mut Transaction<'_>, records: Vec<Record>) -> Result<Output> {
    let mut ids = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let id = convert_result(txn.create(record)).map_err(|e| e.at_index(index))?;
        ids.push(id);
    }
    Ok(Output::Ids(ids))
}

/// Handle UpdateMultiple command.
pub fn update_multiple(txn: &mut Transaction<'_>, records: Vec<Record>) -> Result<Output> {
    for (index, record) in records.into_iter().enumerate() {
        convert_result(txn.update(record)).map_err(|e| e.at_index(index))?;
    }
    Ok(Output::Unit)
}

/// Handle UpsertMultiple command.
pub fn upsert_multiple(txn: &mut Transaction<'_>, records: Vec<Record>) -> Result<Output> {
    let mut results = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let result = convert_result(txn.upsert(record)).map_err(|e| e.at_index(index))?;
        results.push(result);
    }
    Ok(Output::Upserts(results))
}

/// Run one request of a batch, rejecting nested batches.
fn run_one(txn: &mut Transaction<'_>, request: Command) -> Result<Output> {
    if request.is_batch() {
        return Err(Error::NestedBatch);
    }
    dispatch(txn, request)
}

/// Handle ExecuteTransaction command.
pub fn execute_transaction(
    txn: &mut Transaction<'_>,
    requests: Vec<Command>,
    return_responses: bool,
) -> Result<Output> {
    let mut responses = Vec::new();
    let total = requests.len();
    for (index, request) in requests.into_iter().enumerate() {
        let output = run_one(txn, request).map_err(|e| e.at_index(index))?;
        if return_responses {
            responses.push(output);
        }
    }
    debug!(requests = total, "transaction batch applied");
    Ok(Output::Responses(responses))
}

/// Handle ExecuteMultiple command.
///
/// Faulted requests always get an entry; successful ones only when
/// `return_responses` is set.
pub fn execute_multiple(
    txn: &mut Transaction<'_>,
    requests: Vec<Command>,
    continue_on_error: bool,
    return_responses: bool,
) -> Result<Output> {
    let mut items = Vec::new();
    let mut is_faulted = false;
    for (request_index, request) in requests.into_iter().enumerate() {
        match run_one(txn, request) {
            Ok(output) => {
                if return_responses {
                    items.push(ResponseItem {
                        request_index,
                        response: Some(output),
                        fault: None,
                    });
                }
            }
            Err(fault) => {
                is_faulted = true;
                items.push(ResponseItem {
                    request_index,
                    response: None,
                    fault: Some(fault),
                });
                if !continue_on_error {
                    break;
                }
            }
        }
    }
    Ok(Output::MultipleResponses { items, is_faulted })
}
