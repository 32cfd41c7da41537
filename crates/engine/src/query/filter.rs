//! Filter evaluation
//!
//! `matches(node, row, ctx)` with platform semantics:
//! - any operator but `null`/`not-null` is false on a missing or null value
//! - text compares case-insensitively
//! - `like` patterns translate `%`, `_` and `[...]` to an anchored regex
//! - operands are coerced to the runtime type of the attribute value
//! - `eq-userid`/`eq-businessid` compare to the calling identity

use std::cell::RefCell;
use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use memcrm_core::{Record, Value};
use regex::Regex;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::config::EngineConfig;

use super::dates;
use super::expression::{Condition, ConditionOperator, FilterNode, LogicalOperator};

// =============================================================================
// Row access
// =============================================================================

/// Anything a condition can read attribute values from.
pub trait RowSource {
    /// Value of `attribute`, optionally scoped to an alias (or the root type name).
    fn lookup(&self, qualifier: Option<&str>, attribute: &str) -> Option<&Value>;
}

impl RowSource for Record {
    fn lookup(&self, qualifier: Option<&str>, attribute: &str) -> Option<&Value> {
        match qualifier {
            None => self.get(attribute),
            Some(q) if q == self.logical_name => self.get(attribute),
            Some(_) => None,
        }
    }
}

/// Resolve a condition's attribute against a row.
///
/// `entityname` wins; otherwise an `alias.attribute` name is tried as a
/// qualified lookup before falling back to the literal name.
pub fn resolve<'r, R: RowSource + ?Sized>(row: &'r R, condition: &Condition) -> Option<&'r Value> {
    if let Some(qualifier) = condition.entity_name.as_deref() {
        return row.lookup(Some(qualifier), &condition.attribute_name);
    }
    match condition.attribute_name.split_once('.') {
        Some((qualifier, attribute)) => row
            .lookup(Some(qualifier), attribute)
            .or_else(|| row.lookup(None, &condition.attribute_name)),
        None => row.lookup(None, &condition.attribute_name),
    }
}

// =============================================================================
// Evaluation context
// =============================================================================

/// Per-query evaluation state: clock reading, caller identity, config and
/// the compiled like-pattern cache.
pub struct EvalContext<'a> {
    /// Instant relative date operators are evaluated against
    pub now: DateTime<Utc>,
    /// Calling user
    pub user_id: Uuid,
    /// Calling user's business unit
    pub business_unit_id: Uuid,
    /// Engine configuration
    pub config: &'a EngineConfig,
    patterns: RefCell<FxHashMap<String, Option<Regex>>>,
}

impl<'a> EvalContext<'a> {
    /// Context reading the clock once.
    pub fn new(config: &'a EngineConfig, user_id: Uuid, business_unit_id: Uuid) -> Self {
        Self {
            now: config.now(),
            user_id,
            business_unit_id,
            config,
            patterns: RefCell::new(FxHashMap::default()),
        }
    }

    fn like(&self, text: &str, pattern: &str) -> bool {
        let mut cache = self.patterns.borrow_mut();
        let regex = cache
            .entry(pattern.to_string())
            .or_insert_with(|| like_regex(pattern));
        regex.as_ref().map(|r| r.is_match(text)).unwrap_or(false)
    }
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("now", &self.now)
            .field("user_id", &self.user_id)
            .field("business_unit_id", &self.business_unit_id)
            .finish()
    }
}

// =============================================================================
// Matching
// =============================================================================

/// True when the row satisfies the filter tree. Empty nodes match.
pub fn matches<R: RowSource + ?Sized>(node: &FilterNode, row: &R, ctx: &EvalContext<'_>) -> bool {
    if node.is_empty() {
        return true;
    }
    let mut conditions = node.conditions.iter().map(|c| evaluate(c, row, ctx));
    let mut children = node
        .filters
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| matches(f, row, ctx));
    match node.filter_operator {
        LogicalOperator::And => conditions.all(|b| b) && children.all(|b| b),
        LogicalOperator::Or => conditions.any(|b| b) || children.any(|b| b),
    }
}

/// Evaluate one condition against a row.
pub fn evaluate<R: RowSource + ?Sized>(condition: &Condition, row: &R, ctx: &EvalContext<'_>) -> bool {
    use ConditionOperator::*;

    let value = resolve(row, condition).map(Value::unaliased);
    match condition.operator {
        Null => return value.map(Value::is_null).unwrap_or(true),
        NotNull => return value.map(|v| !v.is_null()).unwrap_or(false),
        _ => {}
    }
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return false;
    };
    let operands = &condition.values;
    let first = operands.first();

    match condition.operator {
        Equal => first.map(|o| equals(value, o)).unwrap_or(false),
        NotEqual => first.map(|o| !equals(value, o)).unwrap_or(false),
        GreaterThan => compare(value, first) == Some(Ordering::Greater),
        GreaterEqual => matches!(compare(value, first), Some(Ordering::Greater | Ordering::Equal)),
        LessThan => compare(value, first) == Some(Ordering::Less),
        LessEqual => matches!(compare(value, first), Some(Ordering::Less | Ordering::Equal)),
        Between => between(value, operands),
        NotBetween => operands.len() >= 2 && !between(value, operands),
        In => operands.iter().any(|o| equals(value, o)),
        NotIn => !operands.iter().any(|o| equals(value, o)),
        Like => like(value, first, ctx, |p| p.to_string()),
        NotLike => first.is_some() && !like(value, first, ctx, |p| p.to_string()),
        BeginsWith => like(value, first, ctx, |p| format!("{}%", p)),
        DoesNotBeginWith => first.is_some() && !like(value, first, ctx, |p| format!("{}%", p)),
        EndsWith => like(value, first, ctx, |p| format!("%{}", p)),
        DoesNotEndWith => first.is_some() && !like(value, first, ctx, |p| format!("%{}", p)),
        EqualUserId => value.as_guid() == Some(ctx.user_id),
        NotEqualUserId => value.as_guid().map(|g| g != ctx.user_id).unwrap_or(false),
        EqualBusinessId => value.as_guid() == Some(ctx.business_unit_id),
        NotEqualBusinessId => value.as_guid().map(|g| g != ctx.business_unit_id).unwrap_or(false),
        ContainValues => contains_any(value, operands),
        DoesNotContainValues => !contains_any(value, operands),
        Null | NotNull => false,
        op => dates::matches(op, operands, value, ctx.now, ctx.config),
    }
}

/// Operand coerced to the runtime type of `value`.
fn coerce(value: &Value, operand: &Value) -> Value {
    value
        .value_type()
        .and_then(|t| operand.coerce_to(t))
        .unwrap_or_else(|| operand.unaliased().clone())
}

fn equals(value: &Value, operand: &Value) -> bool {
    value.loosely_equals(&coerce(value, operand))
}

fn compare(value: &Value, operand: Option<&Value>) -> Option<Ordering> {
    value.compare(&coerce(value, operand?))
}

fn between(value: &Value, operands: &[Value]) -> bool {
    let (Some(low), Some(high)) = (operands.first(), operands.get(1)) else {
        return false;
    };
    matches!(compare(value, Some(low)), Some(Ordering::Greater | Ordering::Equal))
        && matches!(compare(value, Some(high)), Some(Ordering::Less | Ordering::Equal))
}

fn like(
    value: &Value,
    operand: Option<&Value>,
    ctx: &EvalContext<'_>,
    shape: impl Fn(&str) -> String,
) -> bool {
    let Some(operand) = operand.filter(|o| !o.is_null()) else {
        return false;
    };
    let text = value.to_string();
    ctx.like(&text, &shape(&operand.to_string()))
}

fn contains_any(value: &Value, operands: &[Value]) -> bool {
    match value.as_options() {
        Some(options) => operands
            .iter()
            .filter_map(|o| o.as_i64())
            .any(|o| options.iter().any(|v| i64::from(*v) == o)),
        None => operands.iter().any(|o| equals(value, o)),
    }
}

/// Translate a SQL `LIKE` pattern into an anchored, case-insensitive regex.
///
/// `%` matches any run, `_` one character, `[abc]`/`[a-c]`/`[^a]` a class.
/// An unterminated `[` is literal.
pub fn like_regex(pattern: &str) -> Option<Regex> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?is)^");
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '[' => match chars[i + 1..].iter().position(|c| *c == ']') {
                Some(len) if len > 0 => {
                    let class = &chars[i + 1..i + 1 + len];
                    out.push('[');
                    for (n, c) in class.iter().enumerate() {
                        match c {
                            '^' if n == 0 => out.push('^'),
                            '-' if n > 0 && n + 1 < class.len() => out.push('-'),
                            other => out.push_str(&regex::escape(&other.to_string())),
                        }
                    }
                    out.push(']');
                    i += len + 1;
                }
                _ => out.push_str(r"\["),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }
    out.push('$');
    Regex::new(&out).ok()
}
