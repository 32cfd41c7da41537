//! Filter construction and operator behavior.

use chrono::Duration;
use memcrm::{
    ColumnSet, Condition, ConditionOperator, FilterExpression, LinkEntity, JoinOperator,
    LogicalOperator, OrderType, PagingInfo, QueryByAttribute, QueryExpression, Record, Value,
};

use crate::test_utils::{crm, crm_at, names, noon};

// =============================================================================
// Operator-safe append
// =============================================================================

fn two_way_or() -> FilterExpression {
    FilterExpression::or()
        .with_condition(Condition::eq("name", "A"))
        .with_condition(Condition::eq("name", "B"))
}

#[test]
fn and_append_demotes_or_contents() {
    let mut filter = two_way_or();
    filter.and_condition(Condition::eq("telephone1", "555"));

    assert_eq!(filter.filter_operator, LogicalOperator::And);
    assert_eq!(filter.conditions, vec![Condition::eq("telephone1", "555")]);
    assert_eq!(filter.filters.len(), 1);
    assert_eq!(filter.filters[0], two_way_or());
}

#[test]
fn and_append_holds_for_every_query_form() {
    let mut query = QueryExpression::new("account").with_criteria(two_way_or());
    query.and_filter(FilterExpression::and().with_condition(Condition::eq("telephone1", "555")));
    assert_eq!(query.criteria.filter_operator, LogicalOperator::And);
    assert_eq!(query.criteria.filters[0], two_way_or());
    assert_eq!(query.criteria.filters.len(), 2);

    let mut link = LinkEntity::new("contact", "account", "parentcustomerid", "accountid", JoinOperator::Inner);
    link.link_criteria = two_way_or();
    link.and_condition(Condition::eq("telephone1", "555"));
    assert_eq!(link.link_criteria.filter_operator, LogicalOperator::And);
    assert_eq!(link.link_criteria.filters, vec![two_way_or()]);
}

#[test]
fn and_append_changes_results() {
    let crm = crm();
    crm.create(Record::new("account").with("name", "A").with("telephone1", "555"))
        .unwrap();
    crm.create(Record::new("account").with("name", "B").with("telephone1", "999"))
        .unwrap();
    crm.create(Record::new("account").with("name", "C").with("telephone1", "555"))
        .unwrap();

    let mut query = QueryExpression::new("account")
        .with_columns(ColumnSet::new(&["name"]))
        .with_criteria(two_way_or());
    query.and_condition(Condition::eq("telephone1", "555"));
    let found = crm.retrieve_multiple(query).unwrap().entities;
    assert_eq!(names(&found, "name"), vec!["A"]);
}

// =============================================================================
// Pattern operators
// =============================================================================

#[test]
fn like_wildcards() {
    let crm = crm();
    for name in ["Alpha", "Alps", "Beta", "alpine"] {
        crm.create(Record::new("account").with("name", name)).unwrap();
    }
    let count = |operator: ConditionOperator, pattern: &str| {
        let query = QueryExpression::new("account").with_criteria(
            FilterExpression::and().with_condition(Condition::new(
                "name",
                operator,
                [Value::from(pattern)],
            )),
        );
        crm.retrieve_multiple(query).unwrap().len()
    };
    assert_eq!(count(ConditionOperator::Like, "alp%"), 3);
    assert_eq!(count(ConditionOperator::Like, "Alp_"), 1);
    assert_eq!(count(ConditionOperator::Like, "[ab]%"), 4);
    assert_eq!(count(ConditionOperator::NotLike, "%a"), 2);
    assert_eq!(count(ConditionOperator::BeginsWith, "be"), 1);
    assert_eq!(count(ConditionOperator::EndsWith, "INE"), 1);
    assert_eq!(count(ConditionOperator::DoesNotEndWith, "s"), 3);
}

// =============================================================================
// Relative dates and identity operators
// =============================================================================

fn due_names(crm: &memcrm::Crm, condition: Condition) -> Vec<String> {
    let query = QueryExpression::new("task")
        .with_columns(ColumnSet::new(&["subject"]))
        .with_criteria(FilterExpression::and().with_condition(condition))
        .with_order("subject", OrderType::Ascending);
    names(&crm.retrieve_multiple(query).unwrap().entities, "subject")
}

#[test]
fn relative_dates_follow_the_clock() {
    let now = noon(2024, 5, 15);
    let (crm, clock) = crm_at(now);
    for (subject, at) in [
        ("a-today", now - Duration::hours(2)),
        ("b-two-days-ago", now - Duration::days(2)),
        ("c-ten-days-ago", now - Duration::days(10)),
        ("d-tomorrow", now + Duration::days(1)),
        ("e-last-year", now - Duration::days(400)),
    ] {
        crm.create(Record::new("task").with("subject", subject).with("scheduledend", at))
            .unwrap();
    }

    assert_eq!(due_names(&crm, Condition::unary("scheduledend", ConditionOperator::Today)), vec!["a-today"]);
    assert_eq!(
        due_names(&crm, Condition::unary("scheduledend", ConditionOperator::Tomorrow)),
        vec!["d-tomorrow"]
    );
    let recent = due_names(
        &crm,
        Condition::new("scheduledend", ConditionOperator::LastXDays, [Value::from(3)]),
    );
    assert!(recent.contains(&"b-two-days-ago".to_string()));
    assert!(!recent.contains(&"c-ten-days-ago".to_string()));
    assert_eq!(
        due_names(&crm, Condition::unary("scheduledend", ConditionOperator::LastYear)),
        vec!["e-last-year"]
    );
    assert_eq!(
        due_names(&crm, Condition::new("scheduledend", ConditionOperator::InFiscalYear, [Value::from(2023)])),
        vec!["e-last-year"]
    );

    clock.advance(Duration::days(1));
    assert_eq!(
        due_names(&crm, Condition::unary("scheduledend", ConditionOperator::Today)),
        vec!["d-tomorrow"]
    );
}

#[test]
fn user_operators_compare_to_the_caller() {
    let crm = crm();
    crm.create(Record::new("account").with("name", "Mine")).unwrap();
    let mine = |operator: ConditionOperator| {
        let query = QueryExpression::new("account")
            .with_criteria(FilterExpression::and().with_condition(Condition::unary("ownerid", operator)));
        crm.retrieve_multiple(query).unwrap().len()
    };
    assert_eq!(mine(ConditionOperator::EqualUserId), 1);
    assert_eq!(mine(ConditionOperator::NotEqualUserId), 0);

    let query = QueryExpression::new("account").with_criteria(
        FilterExpression::and()
            .with_condition(Condition::unary("owningbusinessunit", ConditionOperator::EqualBusinessId)),
    );
    assert_eq!(crm.retrieve_multiple(query).unwrap().len(), 1);
}

// =============================================================================
// Query shape validation and paging
// =============================================================================

#[test]
fn by_attribute_lists_must_line_up() {
    let crm = crm();
    let mut query = QueryByAttribute::new("account").with_attribute_value("name", "A");
    query.values.push(Value::from("extra"));
    let err = crm.retrieve_multiple(query).unwrap_err();
    assert_eq!(err.to_string(), "The number of attributes and values does not match.");
}

#[test]
fn top_with_page_is_rejected() {
    let crm = crm();
    let query = QueryExpression::new("account").with_top(5).with_page(2, 2);
    let err = crm.retrieve_multiple(query).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The top attribute can't be specified with paging attribute page."
    );
}

#[test]
fn paging_reports_more_records() {
    let crm = crm();
    let records = (0..5)
        .map(|i| Record::new("account").with("name", format!("Account {}", i)))
        .collect();
    crm.create_multiple(records).unwrap();

    let page = |number: u32| {
        let mut query = QueryExpression::new("account")
            .with_columns(ColumnSet::new(&["name"]))
            .with_order("name", OrderType::Ascending);
        query.page_info = Some(PagingInfo {
            count: 2,
            page_number: number,
            paging_cookie: None,
            return_total_record_count: true,
        });
        crm.retrieve_multiple(query).unwrap()
    };

    let first = page(0);
    assert_eq!(names(&first.entities, "name"), vec!["Account 0", "Account 1"]);
    assert!(first.more_records);
    assert!(first.paging_cookie.is_some());
    assert_eq!(first.total_record_count, Some(5));

    let last = page(3);
    assert_eq!(names(&last.entities, "name"), vec!["Account 4"]);
    assert!(!last.more_records);
    assert!(last.paging_cookie.is_none());
}

#[test]
fn invalid_fetch_is_reported() {
    let crm = crm();
    let err = crm
        .fetch(r#"<fetch><entity name="account"><bogus /></entity></fetch>"#)
        .unwrap_err();
    assert!(err.to_string().starts_with("Invalid FetchXml"));

    let err = crm
        .fetch(r#"<fetch><entity name="account"><filter><condition attribute="name" operator="sounds-like" value="x" /></filter></entity></fetch>"#)
        .unwrap_err();
    assert!(err.to_string().starts_with("Invalid FetchXml"));
}
