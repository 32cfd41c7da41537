//! Query normalization
//!
//! Converts every query form into one [`QuerySpec`]:
//! - logical and attribute names are lower-cased
//! - unaliased links get `<type><n>` aliases, `n` counted per target type
//!   over the whole query in pre-order; explicit aliases take no slot
//! - explicit link and column aliases are validated
//! - condition operands are coerced to the declared attribute kind
//! - top/paging combinations and paging defaults are resolved
//!
//! Equivalent inputs produce equal specs (see [`QuerySpec::fingerprint`]).

use std::collections::BTreeMap;

use memcrm_core::{Catalog, CrmError, CrmResult, ValueType};

use super::expression::{
    ColumnSet, Condition, ConditionOperator, FilterNode, LinkEntity, OrderExpression, OrderType,
    Query, QueryByAttribute, QueryExpression,
};
use super::fetch;
use super::spec::{ColumnSpec, LinkSpec, OrderSpec, Paging, Projection, QuerySpec};

/// Normalize any query form against a catalog.
pub fn normalize(query: &Query, catalog: &Catalog) -> CrmResult<QuerySpec> {
    Normalizer::new(catalog).normalize(query)
}

/// Normalizer bound to a catalog.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    catalog: &'a Catalog,
}

impl<'a> Normalizer<'a> {
    /// Create a normalizer.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Normalize any query form.
    pub fn normalize(&self, query: &Query) -> CrmResult<QuerySpec> {
        match query {
            Query::Expression(q) => self.expression(q),
            Query::ByAttribute(q) => self.by_attribute(q),
            Query::Fetch(xml) => self.fetch(xml),
        }
    }

    /// Normalize FetchXML text.
    pub fn fetch(&self, xml: &str) -> CrmResult<QuerySpec> {
        let expression = fetch::parse(xml)?;
        self.expression(&expression)
    }

    /// Normalize an attribute/value query.
    pub fn by_attribute(&self, q: &QueryByAttribute) -> CrmResult<QuerySpec> {
        if q.attributes.len() != q.values.len() {
            return Err(CrmError::AttributeValueMismatch);
        }
        let mut expression = QueryExpression::new(&q.entity_name).with_columns(q.column_set.clone());
        for (attribute, value) in q.attributes.iter().zip(&q.values) {
            expression.and_condition(Condition::new(
                attribute.clone(),
                ConditionOperator::Equal,
                [value.clone()],
            ));
        }
        expression.orders = q.orders.clone();
        expression.top_count = q.top_count;
        expression.page_info = q.page_info.clone();
        self.expression(&expression)
    }

    /// Normalize an attribute-object query.
    pub fn expression(&self, q: &QueryExpression) -> CrmResult<QuerySpec> {
        let entity_name = q.entity_name.to_lowercase();

        let requested_page = q
            .page_info
            .as_ref()
            .map(|p| p.count > 0 || p.page_number > 0)
            .unwrap_or(false);
        if q.top_count.is_some() && requested_page {
            return Err(CrmError::TopWithPaging);
        }
        let paging = q.page_info.as_ref().filter(|p| p.count > 0).map(|p| Paging {
            page_size: p.count,
            page_number: p.page_number.max(1),
            cookie: p.paging_cookie.clone(),
        });
        let return_total_record_count = q
            .page_info
            .as_ref()
            .map(|p| p.return_total_record_count)
            .unwrap_or(false);

        let columns = projection(&q.column_set)?;

        let mut counters: BTreeMap<String, u32> = BTreeMap::new();
        let mut links = Vec::with_capacity(q.link_entities.len());
        for link in &q.link_entities {
            links.push(link_spec(link, &mut counters)?);
        }

        let mut scopes: BTreeMap<String, String> = BTreeMap::new();
        collect_scopes(&links, &mut scopes);
        scopes.entry(entity_name.clone()).or_insert_with(|| entity_name.clone());

        let mut filter = q.criteria.clone();
        self.prepare_filter(&mut filter, &entity_name, &scopes);
        for link in &mut links {
            self.prepare_link(link, &scopes);
        }

        Ok(QuerySpec {
            entity_name,
            columns,
            filter,
            orders: q.orders.iter().map(order_spec).collect(),
            top: q.top_count,
            paging,
            distinct: q.distinct,
            aggregate: q.aggregate,
            return_total_record_count,
            links,
        })
    }

    fn prepare_link(&self, link: &mut LinkSpec, scopes: &BTreeMap<String, String>) {
        let scope = link.entity_name.clone();
        self.prepare_filter(&mut link.filter, &scope, scopes);
        for child in &mut link.links {
            self.prepare_link(child, scopes);
        }
    }

    fn prepare_filter(&self, node: &mut FilterNode, scope: &str, scopes: &BTreeMap<String, String>) {
        for condition in &mut node.conditions {
            condition.attribute_name = condition.attribute_name.to_lowercase();
            let entity = condition
                .entity_name
                .as_ref()
                .and_then(|alias| scopes.get(&alias.to_lowercase()))
                .map(String::as_str)
                .unwrap_or(scope);
            self.coerce_operands(condition, entity);
        }
        for child in &mut node.filters {
            self.prepare_filter(child, scope, scopes);
        }
    }

    fn coerce_operands(&self, condition: &mut Condition, entity: &str) {
        use ConditionOperator::*;
        let target = if condition.operator.takes_integer_operands() {
            Some(ValueType::Int)
        } else if matches!(
            condition.operator,
            Like | NotLike | BeginsWith | DoesNotBeginWith | EndsWith | DoesNotEndWith
        ) {
            Some(ValueType::String)
        } else {
            self.catalog
                .attribute(entity, &condition.attribute_name)
                .and_then(|def| def.kind.value_type())
        };
        let Some(target) = target else {
            return;
        };
        condition.values = condition
            .values
            .iter()
            .map(|v| v.coerce_to(target).unwrap_or_else(|| v.clone()))
            .collect();
    }
}

fn link_spec(link: &LinkEntity, counters: &mut BTreeMap<String, u32>) -> CrmResult<LinkSpec> {
    let entity_name = link.link_to_entity_name.to_lowercase();
    let (alias, explicit_alias) = match link.entity_alias.as_deref() {
        Some(alias) if !alias.is_empty() => {
            validate_alias(alias)?;
            (alias.to_string(), true)
        }
        _ => {
            let n = counters.entry(entity_name.clone()).or_insert(0);
            *n += 1;
            (format!("{}{}", entity_name, n), false)
        }
    };

    let columns = projection(&link.columns)?;
    let mut links = Vec::with_capacity(link.link_entities.len());
    for child in &link.link_entities {
        links.push(link_spec(child, counters)?);
    }

    Ok(LinkSpec {
        entity_name,
        source_attribute: link.link_from_attribute_name.to_lowercase(),
        target_attribute: link.link_to_attribute_name.to_lowercase(),
        join: link.join_operator,
        alias,
        explicit_alias,
        filter: link.link_criteria.clone(),
        columns,
        orders: link.orders.iter().map(order_spec).collect(),
        links,
    })
}

fn collect_scopes(links: &[LinkSpec], scopes: &mut BTreeMap<String, String>) {
    for link in links {
        scopes.insert(link.alias.to_lowercase(), link.entity_name.clone());
        collect_scopes(&link.links, scopes);
    }
}

fn projection(columns: &ColumnSet) -> CrmResult<Projection> {
    if columns.all_columns {
        if columns.attribute_expressions.iter().any(|e| e.aggregate.is_some()) {
            return Err(CrmError::AggregateColumnMix);
        }
        return Ok(Projection::All);
    }

    let mut specs: Vec<ColumnSpec> = Vec::new();
    for name in &columns.columns {
        let name = name.to_lowercase();
        if !specs.iter().any(|c| c.attribute == name && c.alias.is_none()) {
            specs.push(ColumnSpec::plain(name));
        }
    }
    for expression in &columns.attribute_expressions {
        if let Some(alias) = expression.alias.as_deref() {
            validate_alias(alias)?;
        }
        specs.push(ColumnSpec {
            attribute: expression.attribute_name.to_lowercase(),
            alias: expression.alias.clone(),
            aggregate: expression.aggregate,
            group_by: expression.has_group_by,
            date_grouping: expression.date_grouping,
            distinct: expression.distinct,
        });
    }
    Ok(Projection::Columns(specs))
}

fn order_spec(order: &OrderExpression) -> OrderSpec {
    OrderSpec {
        attribute: order.attribute_name.to_lowercase(),
        alias: order.alias.clone(),
        descending: order.order_type == OrderType::Descending,
        entity_alias: order.entity_name.clone(),
    }
}

/// Check an alias against `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_alias(alias: &str) -> CrmResult<()> {
    let mut chars = alias.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CrmError::InvalidAlias(alias.to_string()))
    }
}
