//! Identity and metadata handlers.

use std::collections::BTreeMap;

use memcrm_core::{CrmError, EntityDef};
use memcrm_engine::ReadView;

use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle WhoAmI command.
pub fn who_am_i(view: &ReadView<'_>) -> Result<Output> {
    let caller = view.caller();
    Ok(Output::WhoAmI {
        user_id: caller.user_id,
        business_unit_id: caller.business_unit_id,
        organization_id: caller.organization_id,
    })
}

fn declared<'a>(view: &ReadView<'a>, logical_name: &str) -> Result<&'a EntityDef> {
    let logical_name = logical_name.to_lowercase();
    convert_result(
        view.catalog()
            .get(&logical_name)
            .ok_or(CrmError::EntityNotFound(logical_name)),
    )
}

/// Handle RetrieveEntity command.
pub fn retrieve_entity(view: &ReadView<'_>, logical_name: &str) -> Result<Output> {
    let def = declared(view, logical_name)?;
    Ok(Output::Entity(def.clone()))
}

/// Handle RetrieveAttribute command.
pub fn retrieve_attribute(
    view: &ReadView<'_>,
    entity_logical_name: &str,
    logical_name: &str,
) -> Result<Output> {
    let def = declared(view, entity_logical_name)?;
    let attribute = logical_name.to_lowercase();
    let found = def.attributes.get(&attribute).ok_or_else(|| {
        CrmError::invalid(format!(
            "Could not find attribute with name '{}' on entity '{}'.",
            attribute, def.logical_name
        ))
    });
    Ok(Output::Attribute(convert_result(found)?.clone()))
}

/// Handle RetrieveAllEntities command.
pub fn retrieve_all_entities(view: &ReadView<'_>) -> Result<Output> {
    Ok(Output::Entities(view.catalog().entities().cloned().collect()))
}

/// Handle RetrieveTotalRecordCount command.
///
/// Undeclared types count their stored records like any other.
pub fn retrieve_total_record_count(view: &ReadView<'_>, entity_names: &[String]) -> Result<Output> {
    let counts: BTreeMap<String, usize> = entity_names
        .iter()
        .map(|name| {
            let name = name.to_lowercase();
            let count = view.count(&name);
            (name, count)
        })
        .collect();
    Ok(Output::RecordCounts(counts))
}
