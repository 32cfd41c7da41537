//! Aggregate engine
//!
//! Groups joined rows by their group-by columns (with optional date
//! truncation) and computes one output record per group. Output values are
//! `Aliased` and published under each column's alias.

use std::cmp::Ordering;

use chrono::Datelike;
use memcrm_core::{parse_datetime, AliasedValue, CrmError, CrmResult, Money, Record, Value, ValueKey};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use uuid::Uuid;

use crate::config::EngineConfig;

use super::join::Row;
use super::spec::{AggregateFn, ColumnSpec, DateGrouping, LinkSpec, OrderSpec, Projection, QuerySpec};

/// Reject plain columns in an aggregate query.
pub fn validate(spec: &QuerySpec) -> CrmResult<()> {
    if !spec.is_aggregate() {
        return Ok(());
    }
    fn check(projection: &Projection) -> CrmResult<()> {
        match projection {
            Projection::All => Err(CrmError::AggregateColumnMix),
            Projection::Columns(columns) if columns.iter().all(ColumnSpec::is_aggregate_safe) => Ok(()),
            Projection::Columns(_) => Err(CrmError::AggregateColumnMix),
        }
    }
    check(&spec.columns)?;
    let mut result = Ok(());
    spec.walk_links(&mut |link| {
        if result.is_ok() {
            result = check(&link.columns);
        }
    });
    result
}

/// An output column and where it reads from.
struct Output<'s> {
    alias: Option<&'s str>,
    entity: &'s str,
    column: &'s ColumnSpec,
}

impl<'s> Output<'s> {
    fn read<'r>(&self, row: &'r Row<'_>) -> Option<&'r Value> {
        let record = match self.alias {
            None => Some(row.root),
            Some(alias) => row.alias(alias).flatten(),
        };
        record
            .and_then(|r| r.get(&self.column.attribute))
            .map(Value::unaliased)
            .filter(|v| !v.is_null())
    }
}

fn outputs(spec: &QuerySpec) -> Vec<Output<'_>> {
    let mut out: Vec<Output<'_>> = spec
        .columns
        .columns()
        .iter()
        .map(|column| Output {
            alias: None,
            entity: &spec.entity_name,
            column,
        })
        .collect();
    fn walk<'s>(links: &'s [LinkSpec], out: &mut Vec<Output<'s>>) {
        for link in links {
            out.extend(link.columns.columns().iter().map(|column| Output {
                alias: Some(link.alias.as_str()),
                entity: &link.entity_name,
                column,
            }));
            walk(&link.links, out);
        }
    }
    walk(&spec.links, &mut out);
    out
}

/// Group rows and compute aggregate records.
pub fn aggregate(spec: &QuerySpec, rows: &[Row<'_>], config: &EngineConfig) -> Vec<Record> {
    let outputs = outputs(spec);
    let grouping: Vec<&Output<'_>> = outputs.iter().filter(|o| o.column.group_by).collect();

    let mut index: FxHashMap<Vec<ValueKey>, usize> = FxHashMap::default();
    let mut groups: Vec<(Vec<Value>, Vec<&Row<'_>>)> = Vec::new();
    for row in rows {
        let values: Vec<Value> = grouping
            .iter()
            .map(|o| {
                o.read(row)
                    .map(|v| truncate(v, o.column.date_grouping, config))
                    .unwrap_or(Value::Null)
            })
            .collect();
        let key: Vec<ValueKey> = values.iter().map(Value::key).collect();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((values, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }
    if grouping.is_empty() && groups.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }

    let mut records: Vec<Record> = groups
        .into_iter()
        .map(|(group_values, members)| {
            let mut record = Record::with_id(spec.entity_name.clone(), Uuid::nil());
            let mut group_values = group_values.into_iter();
            for output in &outputs {
                let value = if output.column.group_by {
                    group_values.next().filter(|v| !v.is_null())
                } else {
                    let values: Vec<&Value> = members.iter().filter_map(|r| output.read(r)).collect();
                    output
                        .column
                        .aggregate
                        .and_then(|f| compute(f, output.column.distinct, &values, members.len()))
                };
                if let Some(value) = value {
                    record.set(
                        output.column.output_name(),
                        Value::Aliased(Box::new(AliasedValue {
                            entity_logical_name: output.entity.to_string(),
                            attribute_logical_name: output.column.attribute.clone(),
                            value,
                        })),
                    );
                }
            }
            record
        })
        .collect();

    order(&mut records, spec, &outputs);
    records
}

/// Date-part truncation of a group-by value.
fn truncate(value: &Value, grouping: Option<DateGrouping>, config: &EngineConfig) -> Value {
    let Some(grouping) = grouping else {
        return value.clone();
    };
    let t = match value {
        Value::DateTime(t) => *t,
        Value::String(s) => match parse_datetime(s) {
            Some(t) => t,
            None => return value.clone(),
        },
        _ => return value.clone(),
    };
    let int = |n: u32| Value::Int(n as i32);
    match grouping {
        DateGrouping::Day => int(t.day()),
        DateGrouping::Week => int(t.iso_week().week()),
        DateGrouping::Month => int(t.month()),
        DateGrouping::Quarter => int((t.month() - 1) / 3 + 1),
        DateGrouping::Year => Value::Int(t.year()),
        DateGrouping::FiscalPeriod => Value::String(config.fiscal_calendar.period_label(t)),
        DateGrouping::FiscalYear => Value::String(config.fiscal_calendar.year_label(t)),
    }
}

fn count(n: usize) -> Value {
    Value::Int(i32::try_from(n).unwrap_or(i32::MAX))
}

/// One aggregate over the non-null values of a group.
fn compute(function: AggregateFn, distinct: bool, values: &[&Value], rows: usize) -> Option<Value> {
    let values: Vec<&Value> = if distinct {
        let mut seen = FxHashSet::default();
        values.iter().copied().filter(|v| seen.insert(v.key())).collect()
    } else {
        values.to_vec()
    };
    match function {
        AggregateFn::Count => Some(count(rows)),
        AggregateFn::CountColumn => Some(count(values.len())),
        AggregateFn::Min => extreme(&values, Ordering::Less),
        AggregateFn::Max => extreme(&values, Ordering::Greater),
        AggregateFn::Sum => {
            let total = sum(&values)?;
            Some(in_domain(values[0], total, false))
        }
        AggregateFn::Avg => {
            let total = sum(&values)?;
            let avg = total.checked_div(Decimal::from(values.len()))?;
            Some(in_domain(values[0], avg, true))
        }
    }
}

fn sum(values: &[&Value]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    values
        .iter()
        .filter_map(|v| v.as_decimal())
        .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(d))
}

fn extreme(values: &[&Value], wanted: Ordering) -> Option<Value> {
    let mut best: Option<&Value> = None;
    for value in values.iter().copied() {
        best = match best {
            Some(b) if value.compare(b) != Some(wanted) => Some(b),
            _ => Some(value),
        };
    }
    best.cloned()
}

/// Convert a decimal result back to the source value's numeric kind.
fn in_domain(source: &Value, amount: Decimal, truncate: bool) -> Value {
    match source {
        Value::Int(_) | Value::BigInt(_) | Value::OptionSet(_) => {
            let whole = if truncate { amount.trunc() } else { amount };
            match whole.to_i64() {
                Some(n) if matches!(source, Value::BigInt(_)) => Value::BigInt(n),
                Some(n) => i32::try_from(n).map(Value::Int).unwrap_or(Value::BigInt(n)),
                None => Value::Decimal(whole),
            }
        }
        Value::Money(_) => Value::Money(Money(amount)),
        Value::Double(_) => amount
            .to_f64()
            .map(Value::Double)
            .unwrap_or(Value::Decimal(amount)),
        _ => Value::Decimal(amount),
    }
}

/// Order aggregate records by output aliases; stable, so first appearance
/// breaks ties.
fn order(records: &mut [Record], spec: &QuerySpec, outputs: &[Output<'_>]) {
    let keys: Vec<(String, bool)> = spec
        .orders
        .iter()
        .filter_map(|o| output_for(o, outputs).map(|name| (name, o.descending)))
        .collect();
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for (name, descending) in &keys {
            let ordering = compare_nulls_first(a.get(name), b.get(name));
            if ordering != Ordering::Equal {
                return if *descending { ordering.reverse() } else { ordering };
            }
        }
        Ordering::Equal
    });
}

fn output_for(order: &OrderSpec, outputs: &[Output<'_>]) -> Option<String> {
    if let Some(alias) = order.alias.as_deref() {
        return Some(alias.to_string());
    }
    outputs
        .iter()
        .find(|o| o.column.attribute == order.attribute && o.alias == order.entity_alias.as_deref())
        .map(|o| o.column.output_name().to_string())
}

/// Null-first total order over optional values.
pub fn compare_nulls_first(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.compare(y).unwrap_or_else(|| x.key().cmp(&y.key())),
    }
}
