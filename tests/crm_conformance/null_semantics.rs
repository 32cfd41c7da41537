//! A record missing the filtered attribute only matches the null tests.

use memcrm::{
    ColumnSet, Condition, ConditionOperator, FilterExpression, QueryExpression, Record, Value,
};

use crate::test_utils::{crm, names};

fn seeded() -> memcrm::Crm {
    let crm = crm();
    crm.create(
        Record::new("contact")
            .with("lastname", "WithMail")
            .with("emailaddress1", "a@example.com")
            .with("numberofchildren", 2),
    )
    .unwrap();
    crm.create(Record::new("contact").with("lastname", "NoMail"))
        .unwrap();
    crm
}

fn matching(crm: &memcrm::Crm, condition: Condition) -> Vec<String> {
    let query = QueryExpression::new("contact")
        .with_columns(ColumnSet::new(&["lastname"]))
        .with_criteria(FilterExpression::and().with_condition(condition));
    let mut found = names(&crm.retrieve_multiple(query).unwrap().entities, "lastname");
    found.sort();
    found
}

#[test]
fn negative_operators_skip_missing_attributes() {
    let crm = seeded();
    let cases = [
        Condition::new("emailaddress1", ConditionOperator::NotEqual, [Value::from("b@example.com")]),
        Condition::new("emailaddress1", ConditionOperator::NotIn, [Value::from("b@example.com")]),
        Condition::new("emailaddress1", ConditionOperator::NotLike, [Value::from("%zzz%")]),
        Condition::new("emailaddress1", ConditionOperator::DoesNotBeginWith, [Value::from("z")]),
        Condition::new("numberofchildren", ConditionOperator::LessThan, [Value::from(10)]),
    ];
    for condition in cases {
        assert_eq!(matching(&crm, condition.clone()), vec!["WithMail"], "{:?}", condition);
    }
}

#[test]
fn null_operators_see_missing_attributes() {
    let crm = seeded();
    assert_eq!(
        matching(&crm, Condition::unary("emailaddress1", ConditionOperator::Null)),
        vec!["NoMail"]
    );
    assert_eq!(
        matching(&crm, Condition::unary("emailaddress1", ConditionOperator::NotNull)),
        vec!["WithMail"]
    );
}

#[test]
fn explicit_null_is_distinct_from_absent() {
    let crm = crm();
    let id = crm
        .create(
            Record::new("contact")
                .with("lastname", "Blank")
                .with("emailaddress1", Value::Null),
        )
        .unwrap();
    let stored = crm.database().get("contact", id).unwrap();
    assert!(stored.contains("emailaddress1"));
    assert!(stored.get_non_null("emailaddress1").is_none());
    assert!(!stored.contains("telephone1"));

    assert_eq!(
        matching(&crm, Condition::unary("emailaddress1", ConditionOperator::Null)),
        vec!["Blank"]
    );
}
