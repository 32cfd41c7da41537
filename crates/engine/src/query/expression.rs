//! Query object model
//!
//! The programmatic query forms callers build:
//! - QueryExpression: attribute-object form with links, orders and paging
//! - QueryByAttribute: parallel attribute/value equality lists
//! - FilterNode / Condition: the predicate tree, shared with [`QuerySpec`]
//!
//! [`QuerySpec`]: super::spec::QuerySpec

use std::fmt;
use std::str::FromStr;

use memcrm_core::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::spec::{AggregateFn, DateGrouping, JoinOperator};

// =============================================================================
// Operators
// =============================================================================

/// Logical operator of a filter node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    /// All must hold
    #[default]
    And,
    /// Any must hold
    Or,
}

macro_rules! condition_operators {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Condition operator.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ConditionOperator {
            $(
                #[doc = $name]
                $variant,
            )*
        }

        impl ConditionOperator {
            /// FetchXML operator name.
            pub fn fetch_name(&self) -> &'static str {
                match self {
                    $(ConditionOperator::$variant => $name,)*
                }
            }

            /// Parse a FetchXML operator name.
            pub fn from_fetch_name(name: &str) -> Option<Self> {
                match name.to_ascii_lowercase().as_str() {
                    $($name => Some(ConditionOperator::$variant),)*
                    "neq" => Some(ConditionOperator::NotEqual),
                    _ => None,
                }
            }
        }
    };
}

condition_operators! {
    Equal => "eq",
    NotEqual => "ne",
    GreaterThan => "gt",
    GreaterEqual => "ge",
    LessThan => "lt",
    LessEqual => "le",
    Like => "like",
    NotLike => "not-like",
    In => "in",
    NotIn => "not-in",
    Between => "between",
    NotBetween => "not-between",
    Null => "null",
    NotNull => "not-null",
    BeginsWith => "begins-with",
    DoesNotBeginWith => "not-begin-with",
    EndsWith => "ends-with",
    DoesNotEndWith => "not-end-with",
    Yesterday => "yesterday",
    Today => "today",
    Tomorrow => "tomorrow",
    Last7Days => "last-seven-days",
    Next7Days => "next-seven-days",
    LastWeek => "last-week",
    ThisWeek => "this-week",
    NextWeek => "next-week",
    LastMonth => "last-month",
    ThisMonth => "this-month",
    NextMonth => "next-month",
    LastYear => "last-year",
    ThisYear => "this-year",
    NextYear => "next-year",
    LastXHours => "last-x-hours",
    NextXHours => "next-x-hours",
    LastXDays => "last-x-days",
    NextXDays => "next-x-days",
    LastXWeeks => "last-x-weeks",
    NextXWeeks => "next-x-weeks",
    LastXMonths => "last-x-months",
    NextXMonths => "next-x-months",
    LastXYears => "last-x-years",
    NextXYears => "next-x-years",
    OlderThanXMinutes => "olderthan-x-minutes",
    OlderThanXHours => "olderthan-x-hours",
    OlderThanXDays => "olderthan-x-days",
    OlderThanXWeeks => "olderthan-x-weeks",
    OlderThanXMonths => "olderthan-x-months",
    OlderThanXYears => "olderthan-x-years",
    On => "on",
    OnOrBefore => "on-or-before",
    OnOrAfter => "on-or-after",
    NotOn => "not-on",
    EqualUserId => "eq-userid",
    NotEqualUserId => "ne-userid",
    EqualBusinessId => "eq-businessid",
    NotEqualBusinessId => "ne-businessid",
    InFiscalYear => "in-fiscal-year",
    InFiscalPeriod => "in-fiscal-period",
    InFiscalPeriodAndYear => "in-fiscal-period-and-year",
    InOrBeforeFiscalPeriodAndYear => "in-or-before-fiscal-period-and-year",
    InOrAfterFiscalPeriodAndYear => "in-or-after-fiscal-period-and-year",
    ThisFiscalYear => "this-fiscal-year",
    LastFiscalYear => "last-fiscal-year",
    NextFiscalYear => "next-fiscal-year",
    ThisFiscalPeriod => "this-fiscal-period",
    LastFiscalPeriod => "last-fiscal-period",
    NextFiscalPeriod => "next-fiscal-period",
    ContainValues => "contain-values",
    DoesNotContainValues => "not-contain-values",
}

impl ConditionOperator {
    /// Operators whose operands are counts, periods or years (integers).
    pub fn takes_integer_operands(&self) -> bool {
        use ConditionOperator::*;
        matches!(
            self,
            LastXHours
                | NextXHours
                | LastXDays
                | NextXDays
                | LastXWeeks
                | NextXWeeks
                | LastXMonths
                | NextXMonths
                | LastXYears
                | NextXYears
                | OlderThanXMinutes
                | OlderThanXHours
                | OlderThanXDays
                | OlderThanXWeeks
                | OlderThanXMonths
                | OlderThanXYears
                | InFiscalYear
                | InFiscalPeriod
                | InFiscalPeriodAndYear
                | InOrBeforeFiscalPeriodAndYear
                | InOrAfterFiscalPeriodAndYear
        )
    }

    /// Operators evaluated against a date window.
    pub fn is_date_operator(&self) -> bool {
        use ConditionOperator::*;
        self.takes_integer_operands()
            || matches!(
                self,
                Yesterday
                    | Today
                    | Tomorrow
                    | Last7Days
                    | Next7Days
                    | LastWeek
                    | ThisWeek
                    | NextWeek
                    | LastMonth
                    | ThisMonth
                    | NextMonth
                    | LastYear
                    | ThisYear
                    | NextYear
                    | On
                    | OnOrBefore
                    | OnOrAfter
                    | NotOn
                    | ThisFiscalYear
                    | LastFiscalYear
                    | NextFiscalYear
                    | ThisFiscalPeriod
                    | LastFiscalPeriod
                    | NextFiscalPeriod
            )
    }

    /// Operators compared against the caller rather than operands.
    pub fn is_identity_operator(&self) -> bool {
        use ConditionOperator::*;
        matches!(
            self,
            EqualUserId | NotEqualUserId | EqualBusinessId | NotEqualBusinessId
        )
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fetch_name())
    }
}

impl FromStr for ConditionOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fetch_name(s).ok_or_else(|| format!("unknown operator '{}'", s))
    }
}

impl Serialize for ConditionOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.fetch_name())
    }
}

impl<'de> Deserialize<'de> for ConditionOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Filter tree
// =============================================================================

/// Leaf predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Attribute name
    pub attribute_name: String,
    /// Operator
    pub operator: ConditionOperator,
    /// Operands
    pub values: Vec<Value>,
    /// Link alias owning the attribute
    pub entity_name: Option<String>,
}

impl Condition {
    /// Condition with operands.
    pub fn new(
        attribute_name: impl Into<String>,
        operator: ConditionOperator,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            operator,
            values: values.into_iter().collect(),
            entity_name: None,
        }
    }

    /// `attribute eq value`.
    pub fn eq(attribute_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute_name, ConditionOperator::Equal, [value.into()])
    }

    /// Operand-free condition (`null`, `today`, ...).
    pub fn unary(attribute_name: impl Into<String>, operator: ConditionOperator) -> Self {
        Self::new(attribute_name, operator, [])
    }

    /// Scope the condition to a link alias.
    pub fn on_alias(mut self, alias: impl Into<String>) -> Self {
        self.entity_name = Some(alias.into());
        self
    }
}

/// Predicate tree node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterNode {
    /// How conditions and children combine
    pub filter_operator: LogicalOperator,
    /// Leaf conditions
    pub conditions: Vec<Condition>,
    /// Child nodes
    pub filters: Vec<FilterNode>,
}

/// Object-form name of a filter node.
pub type FilterExpression = FilterNode;
/// Object-form name of a condition.
pub type ConditionExpression = Condition;

impl FilterNode {
    /// Empty node with the given operator.
    pub fn new(filter_operator: LogicalOperator) -> Self {
        Self {
            filter_operator,
            conditions: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Empty AND node.
    pub fn and() -> Self {
        Self::new(LogicalOperator::And)
    }

    /// Empty OR node.
    pub fn or() -> Self {
        Self::new(LogicalOperator::Or)
    }

    /// True when the node holds nothing.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.filters.iter().all(FilterNode::is_empty)
    }

    /// Builder-style condition (plain append under the node's operator).
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Builder-style child (plain append under the node's operator).
    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append a condition under the node's own operator.
    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Append a child under the node's own operator.
    pub fn add_filter(&mut self, filter: FilterNode) {
        self.filters.push(filter);
    }

    /// Append a condition that must hold in addition to everything present.
    ///
    /// On a non-empty OR node the existing contents move into an OR child
    /// under a new AND root; an empty OR node simply becomes AND.
    pub fn and_condition(&mut self, condition: Condition) {
        self.enforce_and();
        self.conditions.push(condition);
    }

    /// Append a child that must hold in addition to everything present.
    pub fn and_filter(&mut self, filter: FilterNode) {
        self.enforce_and();
        self.filters.push(filter);
    }

    fn enforce_and(&mut self) {
        if self.filter_operator == LogicalOperator::And {
            return;
        }
        if self.is_empty() {
            self.filter_operator = LogicalOperator::And;
            self.conditions.clear();
            self.filters.clear();
            return;
        }
        let previous = std::mem::replace(self, FilterNode::and());
        self.filters.push(previous);
    }
}

// =============================================================================
// Query forms
// =============================================================================

/// Column selection of a query or link.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnSet {
    /// Select every attribute
    pub all_columns: bool,
    /// Plain attribute names
    pub columns: Vec<String>,
    /// Aggregate / group-by / aliased columns
    pub attribute_expressions: Vec<AttributeExpression>,
}

impl ColumnSet {
    /// Every attribute.
    pub fn all() -> Self {
        Self {
            all_columns: true,
            ..Default::default()
        }
    }

    /// No attributes.
    pub fn none() -> Self {
        Self::default()
    }

    /// The named attributes.
    pub fn new(columns: &[&str]) -> Self {
        Self {
            all_columns: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            attribute_expressions: Vec::new(),
        }
    }

    /// Add an attribute expression.
    pub fn with_expression(mut self, expression: AttributeExpression) -> Self {
        self.attribute_expressions.push(expression);
        self
    }
}

/// Column with alias, aggregate or grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeExpression {
    /// Source attribute
    pub attribute_name: String,
    /// Output alias
    pub alias: Option<String>,
    /// Aggregate function
    pub aggregate: Option<AggregateFn>,
    /// Group-by column
    pub has_group_by: bool,
    /// Date truncation
    pub date_grouping: Option<DateGrouping>,
    /// Count distinct values
    pub distinct: bool,
}

impl AttributeExpression {
    /// Aggregate column.
    pub fn aggregate(attribute_name: &str, function: AggregateFn, alias: &str) -> Self {
        Self {
            attribute_name: attribute_name.to_string(),
            alias: Some(alias.to_string()),
            aggregate: Some(function),
            has_group_by: false,
            date_grouping: None,
            distinct: false,
        }
    }

    /// Group-by column.
    pub fn group_by(attribute_name: &str, alias: &str) -> Self {
        Self {
            attribute_name: attribute_name.to_string(),
            alias: Some(alias.to_string()),
            aggregate: None,
            has_group_by: true,
            date_grouping: None,
            distinct: false,
        }
    }

    /// Aliased plain column.
    pub fn aliased(attribute_name: &str, alias: &str) -> Self {
        Self {
            attribute_name: attribute_name.to_string(),
            alias: Some(alias.to_string()),
            aggregate: None,
            has_group_by: false,
            date_grouping: None,
            distinct: false,
        }
    }

    /// Set date truncation.
    pub fn with_date_grouping(mut self, grouping: DateGrouping) -> Self {
        self.date_grouping = Some(grouping);
        self
    }

    /// Count distinct values.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderType {
    /// Ascending
    #[default]
    Ascending,
    /// Descending
    Descending,
}

/// Order clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExpression {
    /// Attribute to order by
    pub attribute_name: String,
    /// Direction
    pub order_type: OrderType,
    /// Output alias to order by (aggregate queries)
    pub alias: Option<String>,
    /// Link alias owning the attribute
    pub entity_name: Option<String>,
}

impl OrderExpression {
    /// Order by an attribute.
    pub fn new(attribute_name: impl Into<String>, order_type: OrderType) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            order_type,
            alias: None,
            entity_name: None,
        }
    }

    /// Order by an output alias.
    pub fn by_alias(alias: impl Into<String>, order_type: OrderType) -> Self {
        Self {
            attribute_name: String::new(),
            order_type,
            alias: Some(alias.into()),
            entity_name: None,
        }
    }
}

/// Paging request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PagingInfo {
    /// Rows per page (0 = unpaged)
    pub count: u32,
    /// 1-based page number (0 = first)
    pub page_number: u32,
    /// Cookie from a previous page
    pub paging_cookie: Option<String>,
    /// Report the total row count
    pub return_total_record_count: bool,
}

/// Join from a parent to a target type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntity {
    /// Parent logical type
    pub link_from_entity_name: String,
    /// Attribute on the parent
    pub link_from_attribute_name: String,
    /// Target logical type
    pub link_to_entity_name: String,
    /// Attribute on the target
    pub link_to_attribute_name: String,
    /// Join kind
    pub join_operator: JoinOperator,
    /// Explicit alias
    pub entity_alias: Option<String>,
    /// Target columns
    pub columns: ColumnSet,
    /// Target criteria
    pub link_criteria: FilterNode,
    /// Target orders
    pub orders: Vec<OrderExpression>,
    /// Nested links
    pub link_entities: Vec<LinkEntity>,
}

impl LinkEntity {
    /// Link `from.from_attribute = to.to_attribute`.
    pub fn new(
        link_from_entity_name: &str,
        link_to_entity_name: &str,
        link_from_attribute_name: &str,
        link_to_attribute_name: &str,
        join_operator: JoinOperator,
    ) -> Self {
        Self {
            link_from_entity_name: link_from_entity_name.to_string(),
            link_from_attribute_name: link_from_attribute_name.to_string(),
            link_to_entity_name: link_to_entity_name.to_string(),
            link_to_attribute_name: link_to_attribute_name.to_string(),
            join_operator,
            entity_alias: None,
            columns: ColumnSet::none(),
            link_criteria: FilterNode::and(),
            orders: Vec::new(),
            link_entities: Vec::new(),
        }
    }

    /// Set an explicit alias.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.entity_alias = Some(alias.to_string());
        self
    }

    /// Set the target columns.
    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    /// Add a nested link.
    pub fn with_link(mut self, link: LinkEntity) -> Self {
        self.link_entities.push(link);
        self
    }

    /// Append a link criterion with enforced AND.
    pub fn and_condition(&mut self, condition: Condition) {
        self.link_criteria.and_condition(condition);
    }

    /// Append a link child filter with enforced AND.
    pub fn and_filter(&mut self, filter: FilterNode) {
        self.link_criteria.and_filter(filter);
    }
}

/// Attribute-object query form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExpression {
    /// Root logical type
    pub entity_name: String,
    /// Root columns
    pub column_set: ColumnSet,
    /// Root criteria
    pub criteria: FilterNode,
    /// Orders
    pub orders: Vec<OrderExpression>,
    /// Links
    pub link_entities: Vec<LinkEntity>,
    /// Top count
    pub top_count: Option<u32>,
    /// Paging
    pub page_info: Option<PagingInfo>,
    /// Distinct rows
    pub distinct: bool,
    /// Lock hint (no effect)
    pub no_lock: bool,
    /// Aggregate query
    pub aggregate: bool,
}

impl QueryExpression {
    /// Query over a type with no columns.
    pub fn new(entity_name: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            column_set: ColumnSet::none(),
            criteria: FilterNode::and(),
            orders: Vec::new(),
            link_entities: Vec::new(),
            top_count: None,
            page_info: None,
            distinct: false,
            no_lock: false,
            aggregate: false,
        }
    }

    /// Set the columns.
    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.column_set = columns;
        self
    }

    /// Replace the root criteria.
    pub fn with_criteria(mut self, criteria: FilterNode) -> Self {
        self.criteria = criteria;
        self
    }

    /// Add an order.
    pub fn with_order(mut self, attribute: &str, order_type: OrderType) -> Self {
        self.orders.push(OrderExpression::new(attribute, order_type));
        self
    }

    /// Add a link.
    pub fn with_link(mut self, link: LinkEntity) -> Self {
        self.link_entities.push(link);
        self
    }

    /// Set the top count.
    pub fn with_top(mut self, top: u32) -> Self {
        self.top_count = Some(top);
        self
    }

    /// Set the paging window.
    pub fn with_page(mut self, count: u32, page_number: u32) -> Self {
        self.page_info = Some(PagingInfo {
            count,
            page_number,
            ..Default::default()
        });
        self
    }

    /// Set distinct.
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Append a root condition with enforced AND.
    pub fn and_condition(&mut self, condition: Condition) {
        self.criteria.and_condition(condition);
    }

    /// Append a root child filter with enforced AND.
    pub fn and_filter(&mut self, filter: FilterNode) {
        self.criteria.and_filter(filter);
    }
}

/// Parallel attribute/value equality query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryByAttribute {
    /// Root logical type
    pub entity_name: String,
    /// Root columns
    pub column_set: ColumnSet,
    /// Attribute names
    pub attributes: Vec<String>,
    /// Values, parallel to `attributes`
    pub values: Vec<Value>,
    /// Orders
    pub orders: Vec<OrderExpression>,
    /// Top count
    pub top_count: Option<u32>,
    /// Paging
    pub page_info: Option<PagingInfo>,
}

impl QueryByAttribute {
    /// Query over a type returning every column.
    pub fn new(entity_name: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            column_set: ColumnSet::all(),
            attributes: Vec::new(),
            values: Vec::new(),
            orders: Vec::new(),
            top_count: None,
            page_info: None,
        }
    }

    /// Add an attribute/value pair.
    pub fn with_attribute_value(mut self, attribute: &str, value: impl Into<Value>) -> Self {
        self.attributes.push(attribute.to_string());
        self.values.push(value.into());
        self
    }

    /// Set the columns.
    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.column_set = columns;
        self
    }
}

/// Any supported query form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// Attribute-object form
    Expression(QueryExpression),
    /// Attribute/value form
    ByAttribute(QueryByAttribute),
    /// FetchXML text
    Fetch(String),
}

impl From<QueryExpression> for Query {
    fn from(q: QueryExpression) -> Self {
        Query::Expression(q)
    }
}

impl From<QueryByAttribute> for Query {
    fn from(q: QueryByAttribute) -> Self {
        Query::ByAttribute(q)
    }
}
