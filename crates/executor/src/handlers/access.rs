//! Sharing command handlers.

use memcrm_core::EntityReference;
use memcrm_engine::{ReadView, Transaction};
use memcrm_security::AccessRights;

use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle GrantAccess command.
pub fn grant_access(
    txn: &mut Transaction<'_>,
    target: &EntityReference,
    principal: &EntityReference,
    rights: AccessRights,
) -> Result<Output> {
    convert_result(txn.grant_access(target, principal, rights))?;
    Ok(Output::Unit)
}

/// Handle ModifyAccess command.
pub fn modify_access(
    txn: &mut Transaction<'_>,
    target: &EntityReference,
    principal: &EntityReference,
    rights: AccessRights,
) -> Result<Output> {
    convert_result(txn.modify_access(target, principal, rights))?;
    Ok(Output::Unit)
}

/// Handle RevokeAccess command.
pub fn revoke_access(
    txn: &mut Transaction<'_>,
    target: &EntityReference,
    revokee: &EntityReference,
) -> Result<Output> {
    convert_result(txn.revoke_access(target, revokee))?;
    Ok(Output::Unit)
}

/// Handle RetrievePrincipalAccess command.
pub fn retrieve_principal_access(
    view: &ReadView<'_>,
    target: &EntityReference,
    principal: &EntityReference,
) -> Result<Output> {
    let rights = convert_result(view.principal_access(target, principal))?;
    Ok(Output::Access(rights))
}
