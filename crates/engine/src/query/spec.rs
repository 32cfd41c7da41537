//! Canonical query specification
//!
//! Every query form normalizes into one [`QuerySpec`]. Two inputs with the
//! same meaning produce equal specs, and `fingerprint` gives their canonical
//! serialized form.

use serde::{Deserialize, Serialize};

use super::expression::FilterNode;

/// Aggregate function of an output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    /// Rows in the group
    Count,
    /// Non-null values in the group
    CountColumn,
    /// Sum
    Sum,
    /// Average
    Avg,
    /// Minimum
    Min,
    /// Maximum
    Max,
}

impl AggregateFn {
    /// Parse a FetchXML aggregate name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "count" => AggregateFn::Count,
            "countcolumn" => AggregateFn::CountColumn,
            "sum" => AggregateFn::Sum,
            "avg" => AggregateFn::Avg,
            "min" => AggregateFn::Min,
            "max" => AggregateFn::Max,
            _ => return None,
        })
    }
}

/// Date-part truncation of a group-by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateGrouping {
    /// Day of month
    Day,
    /// Week of year
    Week,
    /// Month number
    Month,
    /// Quarter number
    Quarter,
    /// Calendar year
    Year,
    /// Fiscal period label
    FiscalPeriod,
    /// Fiscal year label
    FiscalYear,
}

impl DateGrouping {
    /// Parse a FetchXML `dategrouping` value.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "day" => DateGrouping::Day,
            "week" => DateGrouping::Week,
            "month" => DateGrouping::Month,
            "quarter" => DateGrouping::Quarter,
            "year" => DateGrouping::Year,
            "fiscal-period" | "fiscalperiod" => DateGrouping::FiscalPeriod,
            "fiscal-year" | "fiscalyear" => DateGrouping::FiscalYear,
            _ => return None,
        })
    }
}

/// Join kind of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinOperator {
    /// Drop the parent row when nothing matches
    #[default]
    Inner,
    /// Keep the parent row with null link attributes
    LeftOuter,
}

/// One output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Source attribute
    pub attribute: String,
    /// Output alias
    pub alias: Option<String>,
    /// Aggregate function, if any
    pub aggregate: Option<AggregateFn>,
    /// Group-by column
    pub group_by: bool,
    /// Date truncation for group-by
    pub date_grouping: Option<DateGrouping>,
    /// Count distinct values
    pub distinct: bool,
}

impl ColumnSpec {
    /// Plain attribute column.
    pub fn plain(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            alias: None,
            aggregate: None,
            group_by: false,
            date_grouping: None,
            distinct: false,
        }
    }

    /// True for aggregate or group-by columns.
    pub fn is_aggregate_safe(&self) -> bool {
        self.aggregate.is_some() || self.group_by
    }

    /// Key the column's value is published under.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.attribute)
    }
}

/// Column projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Every attribute
    All,
    /// Listed columns (possibly none)
    Columns(Vec<ColumnSpec>),
}

impl Projection {
    /// Column list, empty for `All`.
    pub fn columns(&self) -> &[ColumnSpec] {
        match self {
            Projection::All => &[],
            Projection::Columns(c) => c,
        }
    }

    /// True for `All`.
    pub fn is_all(&self) -> bool {
        matches!(self, Projection::All)
    }
}

/// Order clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Attribute to order by (empty when ordering by alias)
    pub attribute: String,
    /// Output alias to order by (aggregate queries)
    pub alias: Option<String>,
    /// Descending order
    pub descending: bool,
    /// Link alias owning the attribute
    pub entity_alias: Option<String>,
}

/// Paging window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Rows per page
    pub page_size: u32,
    /// 1-based page number
    pub page_number: u32,
    /// Cookie from a previous page
    pub cookie: Option<String>,
}

/// Normalized link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Target logical type
    pub entity_name: String,
    /// Attribute on the parent
    pub source_attribute: String,
    /// Attribute on the target
    pub target_attribute: String,
    /// Join kind
    pub join: JoinOperator,
    /// Explicit or computed alias
    pub alias: String,
    /// True when the alias was supplied
    pub explicit_alias: bool,
    /// Link criteria
    pub filter: FilterNode,
    /// Link columns
    pub columns: Projection,
    /// Link orders
    pub orders: Vec<OrderSpec>,
    /// Nested links
    pub links: Vec<LinkSpec>,
}

/// Canonical query specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Root logical type
    pub entity_name: String,
    /// Root projection
    pub columns: Projection,
    /// Root filter
    pub filter: FilterNode,
    /// Root orders (and alias orders)
    pub orders: Vec<OrderSpec>,
    /// Top count
    pub top: Option<u32>,
    /// Paging window
    pub paging: Option<Paging>,
    /// Distinct rows
    pub distinct: bool,
    /// Aggregate query
    pub aggregate: bool,
    /// Report the total row count
    pub return_total_record_count: bool,
    /// Links
    pub links: Vec<LinkSpec>,
}

impl QuerySpec {
    /// Spec selecting every column of a type.
    pub fn all(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            columns: Projection::All,
            filter: FilterNode::default(),
            orders: Vec::new(),
            top: None,
            paging: None,
            distinct: false,
            aggregate: false,
            return_total_record_count: false,
            links: Vec::new(),
        }
    }

    /// Canonical serialized form.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// True when any column (root or linked) aggregates or the flag is set.
    pub fn is_aggregate(&self) -> bool {
        fn link_has(links: &[LinkSpec]) -> bool {
            links.iter().any(|l| {
                l.columns.columns().iter().any(|c| c.aggregate.is_some()) || link_has(&l.links)
            })
        }
        self.aggregate
            || self.columns.columns().iter().any(|c| c.aggregate.is_some())
            || link_has(&self.links)
    }

    /// Visit every link in pre-order.
    pub fn walk_links<'a>(&'a self, f: &mut dyn FnMut(&'a LinkSpec)) {
        fn walk<'a>(links: &'a [LinkSpec], f: &mut dyn FnMut(&'a LinkSpec)) {
            for link in links {
                f(link);
                walk(&link.links, f);
            }
        }
        walk(&self.links, f);
    }
}
