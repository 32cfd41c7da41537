//! Query pipeline
//!
//! scan → join → filter → aggregate | (order → project → distinct) → page
//!
//! Runs against a borrowed [`Tables`] snapshot; callers hold the read (or
//! write) lock for the duration.

use std::cmp::Ordering;

use memcrm_core::{AliasedValue, Catalog, CrmResult, EntityCollection, Record, Value, ValueKey};
use memcrm_storage::Tables;
use rustc_hash::FxHashSet;
use tracing::trace;

use super::aggregate::{self, compare_nulls_first};
use super::expression::Query;
use super::filter::{self, EvalContext, RowSource};
use super::join::{JoinIndex, Joiner, Row};
use super::normalize::normalize;
use super::spec::{LinkSpec, Projection, QuerySpec};

/// Normalize and run any query form.
pub fn retrieve_multiple(
    query: &Query,
    tables: &Tables,
    catalog: &Catalog,
    ctx: &EvalContext<'_>,
) -> CrmResult<EntityCollection> {
    let spec = normalize(query, catalog)?;
    execute(&spec, tables, catalog, ctx)
}

/// Run a normalized query.
pub fn execute(
    spec: &QuerySpec,
    tables: &Tables,
    catalog: &Catalog,
    ctx: &EvalContext<'_>,
) -> CrmResult<EntityCollection> {
    aggregate::validate(spec)?;

    let joiner = Joiner::new(JoinIndex::build(spec, tables, catalog), catalog, ctx);
    let mut scanned = 0usize;
    let mut rows: Vec<Row<'_>> = Vec::new();
    for root in tables.iter(&spec.entity_name) {
        scanned += 1;
        rows.extend(
            joiner
                .expand(root, &spec.links)
                .into_iter()
                .filter(|row| filter::matches(&spec.filter, row, ctx)),
        );
    }
    trace!(entity = %spec.entity_name, scanned, matched = rows.len(), "query scan");

    let records = if spec.is_aggregate() {
        aggregate::aggregate(spec, &rows, ctx.config)
    } else {
        order(&mut rows, spec);
        let mut records: Vec<Record> = rows.iter().map(|row| project(row, spec, catalog)).collect();
        if spec.distinct {
            dedupe(&mut records);
        }
        records
    };
    trace!(entity = %spec.entity_name, rows = records.len(), "query projected");

    Ok(page(spec, records))
}

// =============================================================================
// Ordering
// =============================================================================

struct SortKey<'s> {
    qualifier: Option<&'s str>,
    attribute: &'s str,
    descending: bool,
}

fn sort_keys(spec: &QuerySpec) -> Vec<SortKey<'_>> {
    let mut keys = Vec::new();
    for order in &spec.orders {
        let attribute = match order.alias.as_deref() {
            Some(alias) => match spec
                .columns
                .columns()
                .iter()
                .find(|c| c.alias.as_deref() == Some(alias))
            {
                Some(column) => column.attribute.as_str(),
                None => continue,
            },
            None => order.attribute.as_str(),
        };
        keys.push(SortKey {
            qualifier: order.entity_alias.as_deref(),
            attribute,
            descending: order.descending,
        });
    }
    spec.walk_links(&mut |link| {
        keys.extend(link.orders.iter().map(|order| SortKey {
            qualifier: Some(link.alias.as_str()),
            attribute: order.attribute.as_str(),
            descending: order.descending,
        }));
    });
    keys
}

fn order(rows: &mut [Row<'_>], spec: &QuerySpec) {
    let keys = sort_keys(spec);
    if keys.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for key in &keys {
            let ordering = compare_nulls_first(
                a.lookup(key.qualifier, key.attribute),
                b.lookup(key.qualifier, key.attribute),
            );
            if ordering != Ordering::Equal {
                return if key.descending { ordering.reverse() } else { ordering };
            }
        }
        Ordering::Equal
    });
}

// =============================================================================
// Projection
// =============================================================================

fn aliased(entity: &str, attribute: &str, value: &Value) -> Value {
    Value::Aliased(Box::new(AliasedValue {
        entity_logical_name: entity.to_string(),
        attribute_logical_name: attribute.to_string(),
        value: value.unaliased().clone(),
    }))
}

/// Output record of one joined row.
fn project(row: &Row<'_>, spec: &QuerySpec, catalog: &Catalog) -> Record {
    let root = row.root;
    let mut record = Record::with_id(root.logical_name.clone(), root.id);
    record.version = root.version;

    match &spec.columns {
        Projection::All => {
            record.attributes = root.attributes.clone();
            record.formatted_values = root.formatted_values.clone();
        }
        Projection::Columns(columns) => {
            if !spec.distinct {
                let id_attribute = catalog.primary_id_attribute(&root.logical_name);
                let id = root.get(&id_attribute).cloned().unwrap_or(Value::Guid(root.id));
                record.set(id_attribute, id);
            }
            for column in columns {
                let Some(value) = root.get(&column.attribute) else {
                    continue;
                };
                match column.alias.as_deref() {
                    Some(alias) => record.set(alias, aliased(&root.logical_name, &column.attribute, value)),
                    None => {
                        record.set(column.attribute.clone(), value.clone());
                        if let Some(text) = root.formatted(&column.attribute) {
                            record
                                .formatted_values
                                .insert(column.attribute.clone(), text.to_string());
                        }
                    }
                }
            }
        }
    }

    fn publish_links(row: &Row<'_>, links: &[LinkSpec], record: &mut Record) {
        for link in links {
            if let Some(Some(target)) = row.alias(&link.alias) {
                let mut publish = |attribute: &str, alias: Option<&str>, value: &Value| {
                    let key = match alias {
                        Some(alias) => alias.to_string(),
                        None => format!("{}.{}", link.alias, attribute),
                    };
                    if let Some(text) = target.formatted(attribute) {
                        record.formatted_values.insert(key.clone(), text.to_string());
                    }
                    record.set(key, aliased(&link.entity_name, attribute, value));
                };
                match &link.columns {
                    Projection::All => {
                        for (attribute, value) in &target.attributes {
                            publish(attribute, None, value);
                        }
                    }
                    Projection::Columns(columns) => {
                        for column in columns {
                            if let Some(value) = target.get(&column.attribute) {
                                publish(&column.attribute, column.alias.as_deref(), value);
                            }
                        }
                    }
                }
            }
            publish_links(row, &link.links, record);
        }
    }
    publish_links(row, &spec.links, &mut record);
    record
}

fn dedupe(records: &mut Vec<Record>) {
    let mut seen: FxHashSet<Vec<(String, ValueKey)>> = FxHashSet::default();
    records.retain(|record| {
        let signature = record
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.key()))
            .collect();
        seen.insert(signature)
    });
}

// =============================================================================
// Paging
// =============================================================================

fn page(spec: &QuerySpec, mut records: Vec<Record>) -> EntityCollection {
    let total = records.len();
    let mut more_records = false;
    let mut paging_cookie = None;

    if let Some(top) = spec.top {
        records.truncate(top as usize);
    } else if let Some(paging) = &spec.paging {
        let size = paging.page_size as usize;
        let start = size.saturating_mul(paging.page_number.saturating_sub(1) as usize);
        records = records.into_iter().skip(start).take(size).collect();
        more_records = total > start.saturating_add(size);
        if more_records {
            paging_cookie = Some(format!("<cookie page=\"{}\" />", paging.page_number));
        }
    }

    EntityCollection {
        entity_name: spec.entity_name.clone(),
        entities: records,
        more_records,
        paging_cookie,
        total_record_count: spec.return_total_record_count.then_some(total),
    }
}
