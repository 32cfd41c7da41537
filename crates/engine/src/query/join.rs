//! Join resolution
//!
//! Expands a root record into joined rows, depth first:
//! - link criteria see the target record unqualified and nested aliases qualified
//! - inner links drop the parent when no target survives
//! - left-outer links keep the parent once with the link (and its subtree) null
//! - sibling links multiply
//!
//! Join keys use [`Value::key`], so guids match lookup ids and text matches
//! case-insensitively.

use memcrm_core::{Catalog, Record, Value, ValueKey};
use memcrm_storage::Tables;
use rustc_hash::FxHashMap;

use super::filter::{self, EvalContext, RowSource};
use super::spec::{JoinOperator, LinkSpec, QuerySpec};

/// Alias assignments of one joined row.
pub type Assignment<'a> = Vec<(&'a str, Option<&'a Record>)>;

// =============================================================================
// Row
// =============================================================================

/// A root record plus the records bound to each link alias.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    /// Root (or link target, while evaluating link criteria)
    pub root: &'a Record,
    /// Alias bindings; `None` for unmatched outer links
    pub joined: Assignment<'a>,
}

impl<'a> Row<'a> {
    /// Row without joins.
    pub fn single(root: &'a Record) -> Self {
        Self {
            root,
            joined: Vec::new(),
        }
    }

    /// Record bound to an alias. `Some(None)` for a null outer binding.
    pub fn alias(&self, alias: &str) -> Option<Option<&'a Record>> {
        self.joined
            .iter()
            .find(|(a, _)| a.eq_ignore_ascii_case(alias))
            .map(|(_, r)| *r)
    }
}

impl RowSource for Row<'_> {
    fn lookup(&self, qualifier: Option<&str>, attribute: &str) -> Option<&Value> {
        match qualifier {
            None => self.root.get(attribute),
            Some(q) => match self.alias(q) {
                Some(bound) => bound.and_then(|r| r.get(attribute)),
                None if q.eq_ignore_ascii_case(&self.root.logical_name) => self.root.get(attribute),
                None => None,
            },
        }
    }
}

// =============================================================================
// Index
// =============================================================================

/// Join key of an attribute; the primary id falls back to the record id.
pub fn join_key(record: &Record, attribute: &str, catalog: &Catalog) -> Option<ValueKey> {
    match record.get_non_null(attribute) {
        Some(value) => Some(value.key()),
        None if attribute == catalog.primary_id_attribute(&record.logical_name) => {
            Some(ValueKey::Guid(record.id))
        }
        None => None,
    }
}

/// Link targets grouped by join key, one map per (type, target attribute).
#[derive(Debug, Default)]
pub struct JoinIndex<'a> {
    by_link: FxHashMap<(String, String), FxHashMap<ValueKey, Vec<&'a Record>>>,
}

impl<'a> JoinIndex<'a> {
    /// Index every link target of a query.
    pub fn build(spec: &QuerySpec, tables: &'a Tables, catalog: &Catalog) -> Self {
        let mut by_link: FxHashMap<(String, String), FxHashMap<ValueKey, Vec<&'a Record>>> =
            FxHashMap::default();
        spec.walk_links(&mut |link| {
            let slot = (link.entity_name.clone(), link.target_attribute.clone());
            if by_link.contains_key(&slot) {
                return;
            }
            let mut index: FxHashMap<ValueKey, Vec<&'a Record>> = FxHashMap::default();
            for record in tables.iter(&link.entity_name) {
                if let Some(key) = join_key(record, &link.target_attribute, catalog) {
                    index.entry(key).or_default().push(record);
                }
            }
            by_link.insert(slot, index);
        });
        Self { by_link }
    }

    fn targets(&self, link: &LinkSpec, key: &ValueKey) -> &[&'a Record] {
        self.by_link
            .get(&(link.entity_name.clone(), link.target_attribute.clone()))
            .and_then(|index| index.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// =============================================================================
// Expansion
// =============================================================================

/// Joins for one query.
pub struct Joiner<'q, 'a> {
    index: JoinIndex<'a>,
    catalog: &'q Catalog,
    ctx: &'q EvalContext<'q>,
}

impl<'q, 'a> Joiner<'q, 'a> {
    /// Joiner over pre-indexed link targets.
    pub fn new(index: JoinIndex<'a>, catalog: &'q Catalog, ctx: &'q EvalContext<'q>) -> Self {
        Self {
            index,
            catalog,
            ctx,
        }
    }

    /// Every joined row produced by a root record.
    pub fn expand(&self, root: &'a Record, links: &'a [LinkSpec]) -> Vec<Row<'a>> {
        match self.resolve_children(root, links, Vec::new()) {
            Some(combos) => combos
                .into_iter()
                .map(|joined| Row { root, joined })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Cartesian product of sibling link matches, starting from `seed`.
    /// `None` when an inner link has no match.
    fn resolve_children(
        &self,
        parent: &'a Record,
        links: &'a [LinkSpec],
        seed: Assignment<'a>,
    ) -> Option<Vec<Assignment<'a>>> {
        let mut combos = vec![seed];
        for link in links {
            let mut matches = self.link_matches(parent, link);
            if matches.is_empty() {
                match link.join {
                    JoinOperator::Inner => return None,
                    JoinOperator::LeftOuter => matches.push(null_assignment(link)),
                }
            }
            combos = product(combos, &matches);
        }
        Some(combos)
    }

    fn link_matches(&self, parent: &'a Record, link: &'a LinkSpec) -> Vec<Assignment<'a>> {
        let Some(key) = join_key(parent, &link.source_attribute, self.catalog) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for target in self.index.targets(link, &key) {
            let seed = vec![(link.alias.as_str(), Some(*target))];
            let Some(combos) = self.resolve_children(target, &link.links, seed) else {
                continue;
            };
            for joined in combos {
                let row = Row {
                    root: target,
                    joined,
                };
                if filter::matches(&link.filter, &row, self.ctx) {
                    out.push(row.joined);
                }
            }
        }
        out
    }
}

fn null_assignment(link: &LinkSpec) -> Assignment<'_> {
    let mut out = vec![(link.alias.as_str(), None)];
    for child in &link.links {
        out.extend(null_assignment(child));
    }
    out
}

fn product<'a>(left: Vec<Assignment<'a>>, right: &[Assignment<'a>]) -> Vec<Assignment<'a>> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in &left {
        for r in right {
            let mut combined = l.clone();
            combined.extend(r.iter().copied());
            out.push(combined);
        }
    }
    out
}
