//! Record state machine
//!
//! Every record of a stateful type sits in one declared state with one of
//! that state's status reasons. Creation, updates carrying
//! `statecode`/`statuscode` and explicit state changes validate the same way.

use memcrm_core::{CrmError, CrmResult, EntityDef, EntityReference, OptionSetValue, Record};
use tracing::debug;
use uuid::Uuid;

use super::Transaction;

/// State and status to assign on create.
///
/// The type's default state, with the supplied status when it belongs to
/// that state and the state's default status otherwise.
pub(crate) fn initial_state(def: &EntityDef, requested_status: Option<i32>) -> Option<(i32, i32)> {
    let state = def.initial_state()?;
    let status = requested_status
        .filter(|s| state.has_status(*s))
        .unwrap_or(state.default_status);
    Some((state.value, status))
}

/// Validate a requested transition.
///
/// A status of `None` (or -1) picks the state's default status. A status
/// without a state picks the state that declares it.
pub(crate) fn resolve_state(
    def: &EntityDef,
    id: Uuid,
    state: Option<i32>,
    status: Option<i32>,
    current_state: Option<i32>,
) -> CrmResult<(i32, i32)> {
    let status = status.filter(|s| *s != -1);
    let state = match (state, status) {
        (Some(state), _) => def.state(state).ok_or_else(|| CrmError::InvalidState {
            state,
            entity: def.logical_name.clone(),
            id,
        })?,
        (None, Some(status)) => def.state_for_status(status).ok_or_else(|| CrmError::InvalidStatus {
            status,
            state: current_state.unwrap_or(def.default_state),
            entity: def.logical_name.clone(),
            id,
        })?,
        (None, None) => {
            let value = current_state.unwrap_or(def.default_state);
            def.state(value).ok_or_else(|| CrmError::InvalidState {
                state: value,
                entity: def.logical_name.clone(),
                id,
            })?
        }
    };
    match status {
        Some(status) if !state.has_status(status) => Err(CrmError::InvalidStatus {
            status,
            state: state.value,
            entity: def.logical_name.clone(),
            id,
        }),
        Some(status) => Ok((state.value, status)),
        None => Ok((state.value, state.default_status)),
    }
}

pub(crate) fn write_state(record: &mut Record, (state, status): (i32, i32)) {
    record.set("statecode", OptionSetValue(state));
    record.set("statuscode", OptionSetValue(status));
}

impl Transaction<'_> {
    /// Move a record to a state and status.
    pub fn set_state(&mut self, target: &EntityReference, state: i32, status: i32) -> CrmResult<()> {
        let logical_name = target.logical_name.to_lowercase();
        let id = self.resolve_id(target)?;
        let def = self.entry(&logical_name);
        let existing = self.existing(&logical_name, id)?;
        let resolved = resolve_state(
            &def,
            id,
            Some(state),
            Some(status),
            existing.option("statecode"),
        )?;
        let mut change = Record::with_id(logical_name.clone(), id);
        write_state(&mut change, resolved);
        debug!(entity = %logical_name, id = %id, state = resolved.0, status = resolved.1, "set state");
        self.update(change)
    }
}
