//! String comparisons and logical names ignore case.

use memcrm::{
    ColumnSet, Condition, ConditionOperator, EntityReference, FilterExpression, QueryExpression,
    Record, Value,
};
use proptest::prelude::*;

use crate::test_utils::{crm, names};

#[test]
fn entities_where_ignores_value_case() {
    let crm = crm();
    crm.create(Record::new("contact").with("firstname", "firstname").with("lastname", "A"))
        .unwrap();
    crm.create(Record::new("contact").with("firstname", "other").with("lastname", "B"))
        .unwrap();

    let results: Vec<Vec<String>> = ["FirstName", "FIRSTNAME", "firstname"]
        .iter()
        .map(|probe| names(&crm.entities_where("contact", "firstname", *probe).unwrap(), "lastname"))
        .collect();
    assert_eq!(results[0], vec!["A"]);
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn logical_names_ignore_case() {
    let crm = crm();
    let id = crm
        .create(Record::new("Account").with("name", "Contoso"))
        .unwrap();
    let stored = crm
        .retrieve(&EntityReference::new("ACCOUNT", id), ColumnSet::new(&["NAME"]))
        .unwrap();
    assert_eq!(stored.logical_name, "account");
    assert_eq!(stored.string("name"), Some("Contoso"));

    let query = QueryExpression::new("AcCoUnT").with_columns(ColumnSet::new(&["name"]));
    assert_eq!(crm.retrieve_multiple(query).unwrap().len(), 1);
}

#[test]
fn in_and_like_ignore_case() {
    let crm = crm();
    crm.create(Record::new("account").with("name", "Fourth Coffee"))
        .unwrap();
    let query = |condition: Condition| {
        QueryExpression::new("account")
            .with_columns(ColumnSet::new(&["name"]))
            .with_criteria(FilterExpression::and().with_condition(condition))
    };

    let found = crm
        .retrieve_multiple(query(Condition::new(
            "name",
            ConditionOperator::In,
            [Value::from("fourth coffee"), Value::from("Other")],
        )))
        .unwrap();
    assert_eq!(found.len(), 1);

    let found = crm
        .retrieve_multiple(query(Condition::new(
            "name",
            ConditionOperator::Like,
            [Value::from("FOURTH%")],
        )))
        .unwrap();
    assert_eq!(found.len(), 1);
}

fn flip_case(text: &str, mask: &[bool]) -> String {
    text.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn eq_matches_any_casing(word in "[a-z]{1,12}", mask in proptest::collection::vec(any::<bool>(), 1..12)) {
        let crm = crm();
        crm.create(Record::new("contact").with("firstname", word.as_str())).unwrap();
        let probe = flip_case(&word, &mask);
        let found = crm.entities_where("contact", "firstname", probe.as_str()).unwrap();
        prop_assert_eq!(found.len(), 1);
    }

    #[test]
    fn like_prefix_matches_any_casing(word in "[a-z]{2,12}", mask in proptest::collection::vec(any::<bool>(), 1..12)) {
        let crm = crm();
        crm.create(Record::new("account").with("name", word.as_str())).unwrap();
        let prefix = flip_case(&word[..1], &mask);
        let query = QueryExpression::new("account").with_criteria(
            FilterExpression::and().with_condition(Condition::new(
                "name",
                ConditionOperator::Like,
                [Value::from(format!("{}%", prefix))],
            )),
        );
        prop_assert_eq!(crm.retrieve_multiple(query).unwrap().len(), 1);
    }
}
