//! Lookup resolution, owner triad and derived attributes.

use memcrm_core::{CrmError, CrmResult, EntityDef, EntityReference, Record, Value};
use rust_decimal::Decimal;
use tracing::debug;

use super::Transaction;

impl Transaction<'_> {
    /// Resolve keyed lookups to ids and check that every lookup target exists.
    pub(crate) fn resolve_lookups(&self, record: &mut Record) -> CrmResult<()> {
        for value in record.attributes.values_mut() {
            let Value::Lookup(reference) = value else {
                continue;
            };
            reference.logical_name = reference.logical_name.to_lowercase();
            if reference.is_keyed() {
                reference.id = self.resolve_id(reference)?;
                reference.key_attributes.clear();
            }
            if !self.tables.contains(&reference.logical_name, reference.id) {
                return Err(CrmError::does_not_exist(&reference.logical_name, reference.id));
            }
        }
        Ok(())
    }

    /// Business unit of a user or team.
    fn business_unit_of(&self, owner: &EntityReference) -> Option<EntityReference> {
        self.tables
            .get_ref(&owner.logical_name, owner.id)
            .and_then(|r| r.reference("businessunitid"))
            .cloned()
    }

    /// Set `ownerid` and derive `owninguser`, `owningteam` and
    /// `owningbusinessunit` from it.
    pub(crate) fn apply_owner(&self, record: &mut Record, owner: EntityReference) -> CrmResult<()> {
        if !self.tables.contains(&owner.logical_name, owner.id) {
            return Err(CrmError::does_not_exist(&owner.logical_name, owner.id));
        }
        let business_unit = self.business_unit_of(&owner);
        match owner.logical_name.as_str() {
            "team" => {
                record.set("owningteam", owner.clone());
                record.set("owninguser", Value::Null);
            }
            _ => {
                record.set("owninguser", owner.clone());
                record.set("owningteam", Value::Null);
            }
        }
        record.set(
            "owningbusinessunit",
            business_unit.map(Value::from).unwrap_or(Value::Null),
        );
        debug!(entity = %record.logical_name, id = %record.id, owner = %owner, "owner applied");
        record.set("ownerid", owner);
        Ok(())
    }

    /// Recompute `fullname` of person types from the configured template.
    pub(crate) fn apply_full_name(&self, def: &EntityDef, record: &mut Record) {
        if !def.is_person {
            return;
        }
        let part = |name: &str| record.string(name).unwrap_or_default().to_string();
        let full = self
            .config
            .format_full_name(&part("firstname"), &part("middlename"), &part("lastname"));
        record.set("fullname", full);
    }

    /// Rebuild the formatted-value overlay.
    pub(crate) fn apply_formatted_values(&self, def: &EntityDef, record: &mut Record) {
        let mut formatted = std::collections::BTreeMap::new();
        for (name, value) in &record.attributes {
            let text = match value {
                Value::Lookup(reference) => reference.name.clone().or_else(|| self.display_name(reference)),
                Value::OptionSet(option) => def.option_label(name, option.0),
                Value::OptionSets(options) => {
                    let labels: Vec<String> = options
                        .iter()
                        .filter_map(|o| def.option_label(name, o.0))
                        .collect();
                    (!labels.is_empty()).then(|| labels.join("; "))
                }
                Value::Money(money) => Some(format_money(money.0, &self.config.currency_symbol)),
                Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
                Value::DateTime(t) => Some(t.format("%-m/%-d/%Y %-I:%M %p").to_string()),
                _ => None,
            };
            if let Some(text) = text {
                formatted.insert(name.clone(), text);
            }
        }
        record.formatted_values = formatted;
    }

    /// Primary name value of a referenced record.
    pub(crate) fn display_name(&self, reference: &EntityReference) -> Option<String> {
        let attribute = self.catalog.primary_name_attribute(&reference.logical_name);
        self.tables
            .get_ref(&reference.logical_name, reference.id)
            .and_then(|r| r.string(&attribute))
            .map(str::to_string)
    }
}

/// Currency text with a symbol, two decimals and thousands separators.
pub(crate) fn format_money(amount: Decimal, symbol: &str) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}{}.{}", if negative { "-" } else { "" }, symbol, grouped, fraction)
}
