//! Command handlers.
//!
//! Write commands are dispatched against a [`Transaction`]; read-only
//! commands against a [`ReadView`]. Each handler converts engine faults with
//! [`convert_result`](crate::convert::convert_result) and wraps the value in
//! an [`Output`].

mod access;
mod batch;
mod composite;
mod metadata;
mod records;

use memcrm_engine::{ReadView, Transaction};

use crate::{Command, Output, Result};

/// Run any command inside a write transaction.
pub fn dispatch(txn: &mut Transaction<'_>, command: Command) -> Result<Output> {
    match command {
        Command::Create { record } => records::create(txn, record),
        Command::Update { record } => records::update(txn, record),
        Command::Delete { target } => records::delete(txn, &target),
        Command::DeleteIfExists { target } => records::delete_if_exists(txn, &target),
        Command::Associate {
            target,
            relationship,
            related,
        } => records::associate(txn, &target, &relationship, &related),
        Command::Disassociate {
            target,
            relationship,
            related,
        } => records::disassociate(txn, &target, &relationship, &related),
        Command::Upsert { record } => records::upsert(txn, record),
        Command::SetState {
            target,
            state,
            status,
        } => records::set_state(txn, &target, state, status),
        Command::Assign { target, assignee } => records::assign(txn, &target, assignee),

        Command::CreateMultiple { records } => batch::create_multiple(txn, records),
        Command::UpdateMultiple { records } => batch::update_multiple(txn, records),
        Command::UpsertMultiple { records } => batch::upsert_multiple(txn, records),
        Command::ExecuteTransaction {
            requests,
            return_responses,
        } => batch::execute_transaction(txn, requests, return_responses),
        Command::ExecuteMultiple {
            requests,
            continue_on_error,
            return_responses,
        } => batch::execute_multiple(txn, requests, continue_on_error, return_responses),

        Command::QualifyLead(request) => composite::qualify_lead(txn, &request),
        Command::CloseIncident { resolution, status } => {
            composite::close_incident(txn, resolution, status)
        }
        Command::WinOpportunity { close, status } => composite::win_opportunity(txn, close, status),
        Command::LoseOpportunity { close, status } => {
            composite::lose_opportunity(txn, close, status)
        }

        Command::GrantAccess {
            target,
            principal,
            rights,
        } => access::grant_access(txn, &target, &principal, rights),
        Command::ModifyAccess {
            target,
            principal,
            rights,
        } => access::modify_access(txn, &target, &principal, rights),
        Command::RevokeAccess { target, revokee } => access::revoke_access(txn, &target, &revokee),

        read => dispatch_read(&txn.view(), read),
    }
}

/// Run a read-only command.
pub fn dispatch_read(view: &ReadView<'_>, command: Command) -> Result<Output> {
    match command {
        Command::Retrieve { target, columns } => records::retrieve(view, &target, &columns),
        Command::RetrieveMultiple { query } => records::retrieve_multiple(view, &query),
        Command::RetrievePrincipalAccess { target, principal } => {
            access::retrieve_principal_access(view, &target, &principal)
        }
        Command::WhoAmI => metadata::who_am_i(view),
        Command::RetrieveEntity { logical_name } => metadata::retrieve_entity(view, &logical_name),
        Command::RetrieveAttribute {
            entity_logical_name,
            logical_name,
        } => metadata::retrieve_attribute(view, &entity_logical_name, &logical_name),
        Command::RetrieveAllEntities => metadata::retrieve_all_entities(view),
        Command::RetrieveTotalRecordCount { entity_names } => {
            metadata::retrieve_total_record_count(view, &entity_names)
        }
        other => Err(crate::Error::Internal {
            reason: format!("{} is not a read-only command", other.name()),
        }),
    }
}
