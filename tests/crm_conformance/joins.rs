//! Link aliases and join kinds.

use memcrm::{
    ColumnSet, Condition, CrmError, JoinOperator, LinkEntity, OrderType, QueryExpression, Record,
    Value,
};

use crate::test_utils::{account, crm, inner};

fn parent_link(join: JoinOperator) -> LinkEntity {
    LinkEntity::new("contact", "account", "parentcustomerid", "accountid", join)
        .with_columns(ColumnSet::new(&["name"]))
}

#[test]
fn unaliased_links_are_numbered_per_type() {
    let crm = crm();
    let parent = account(&crm, "Parent");
    crm.create(
        Record::new("contact")
            .with("lastname", "Child")
            .with("parentcustomerid", parent.clone()),
    )
    .unwrap();

    let query = QueryExpression::new("contact")
        .with_columns(ColumnSet::new(&["lastname"]))
        .with_link(parent_link(JoinOperator::Inner))
        .with_link(parent_link(JoinOperator::Inner));
    let rows = crm.retrieve_multiple(query).unwrap().entities;
    assert_eq!(rows.len(), 1);
    assert_eq!(inner(&rows[0], "account1.name"), Some(Value::from("Parent")));
    assert_eq!(inner(&rows[0], "account2.name"), Some(Value::from("Parent")));
    match rows[0].get("account1.name") {
        Some(Value::Aliased(aliased)) => {
            assert_eq!(aliased.entity_logical_name, "account");
            assert_eq!(aliased.attribute_logical_name, "name");
        }
        other => panic!("expected an aliased value, got {:?}", other),
    }
}

#[test]
fn explicit_aliases_do_not_consume_numbers() {
    let crm = crm();
    let parent = account(&crm, "Parent");
    crm.create(
        Record::new("contact")
            .with("lastname", "Child")
            .with("parentcustomerid", parent),
    )
    .unwrap();

    let query = QueryExpression::new("contact")
        .with_link(parent_link(JoinOperator::Inner).with_alias("parent"))
        .with_link(parent_link(JoinOperator::Inner));
    let rows = crm.retrieve_multiple(query).unwrap().entities;
    assert!(rows[0].contains("parent.name"));
    assert!(rows[0].contains("account1.name"));
}

#[test]
fn left_outer_keeps_unmatched_rows_and_inner_drops_them() {
    let crm = crm();
    let matched = account(&crm, "Match");
    let unmatched = account(&crm, "Other");
    crm.create(
        Record::new("contact")
            .with("lastname", "A")
            .with("parentcustomerid", matched),
    )
    .unwrap();
    crm.create(
        Record::new("contact")
            .with("lastname", "B")
            .with("parentcustomerid", unmatched),
    )
    .unwrap();

    let query = |join: JoinOperator| {
        let mut link = parent_link(join).with_alias("p");
        link.and_condition(Condition::eq("name", "Match"));
        QueryExpression::new("contact")
            .with_columns(ColumnSet::new(&["lastname"]))
            .with_order("lastname", OrderType::Ascending)
            .with_link(link)
    };

    let outer = crm.retrieve_multiple(query(JoinOperator::LeftOuter)).unwrap().entities;
    assert_eq!(outer.len(), 2);
    assert_eq!(inner(&outer[0], "p.name"), Some(Value::from("Match")));
    assert_eq!(outer[1].string("lastname"), Some("B"));
    assert!(outer[1].get_non_null("p.name").is_none());

    let inner_rows = crm.retrieve_multiple(query(JoinOperator::Inner)).unwrap().entities;
    assert_eq!(inner_rows.len(), 1);
    assert_eq!(inner_rows[0].string("lastname"), Some("A"));
}

#[test]
fn sibling_links_multiply() {
    let crm = crm();
    let parent = account(&crm, "Parent");
    for name in ["One", "Two"] {
        crm.create(
            Record::new("contact")
                .with("lastname", name)
                .with("parentcustomerid", parent.clone()),
        )
        .unwrap();
    }
    let children = LinkEntity::new("account", "contact", "accountid", "parentcustomerid", JoinOperator::Inner)
        .with_columns(ColumnSet::new(&["lastname"]));
    let query = QueryExpression::new("account")
        .with_columns(ColumnSet::new(&["name"]))
        .with_link(children.clone())
        .with_link(children);
    assert_eq!(crm.retrieve_multiple(query).unwrap().len(), 4);
}

#[test]
fn invalid_alias_is_rejected() {
    let crm = crm();
    let query = QueryExpression::new("contact").with_link(parent_link(JoinOperator::Inner).with_alias("1bad"));
    let err = crm.retrieve_multiple(query).unwrap_err();
    assert_eq!(err.to_string(), CrmError::InvalidAlias("1bad".into()).to_string());
}
