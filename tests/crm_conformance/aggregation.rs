//! Aggregate validation and aggregate results.

use memcrm::{
    AggregateFn, AttributeExpression, ColumnSet, Crm, OrderExpression, OrderType, QueryExpression,
    Record, Value,
};

use crate::test_utils::{crm, inner};

const AMOUNTS: [Option<i32>; 10] = [
    None,
    Some(1500),
    Some(2700),
    Some(2900),
    Some(2900),
    Some(3900),
    Some(4300),
    Some(4800),
    Some(6000),
    Some(6200),
];

fn seeded() -> Crm {
    let crm = crm();
    let records = AMOUNTS
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let record = Record::new("new_sale")
                .with("new_name", format!("sale {}", i))
                .with("new_region", if i % 2 == 0 { "East" } else { "West" });
            match amount {
                Some(a) => record.with("new_amount", *a),
                None => record,
            }
        })
        .collect();
    crm.create_multiple(records).unwrap();
    crm
}

fn aggregate_columns() -> ColumnSet {
    ColumnSet::none()
        .with_expression(AttributeExpression::aggregate("new_amount", AggregateFn::Avg, "avg"))
        .with_expression(AttributeExpression::aggregate("new_amount", AggregateFn::Count, "count"))
        .with_expression(AttributeExpression::aggregate(
            "new_amount",
            AggregateFn::CountColumn,
            "countcolumn",
        ))
        .with_expression(AttributeExpression::aggregate("new_amount", AggregateFn::Max, "max"))
        .with_expression(AttributeExpression::aggregate("new_amount", AggregateFn::Min, "min"))
        .with_expression(AttributeExpression::aggregate("new_amount", AggregateFn::Sum, "sum"))
}

#[test]
fn aggregates_over_ten_rows() {
    let crm = seeded();
    let query = QueryExpression::new("new_sale").with_columns(aggregate_columns());
    let rows = crm.retrieve_multiple(query).unwrap().entities;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(inner(row, "avg"), Some(Value::Int(3911)));
    assert_eq!(inner(row, "count"), Some(Value::Int(10)));
    assert_eq!(inner(row, "countcolumn"), Some(Value::Int(9)));
    assert_eq!(inner(row, "max"), Some(Value::Int(6200)));
    assert_eq!(inner(row, "min"), Some(Value::Int(1500)));
    assert_eq!(inner(row, "sum"), Some(Value::Int(35200)));
}

#[test]
fn distinct_count_column_skips_duplicates() {
    let crm = seeded();
    let query = QueryExpression::new("new_sale").with_columns(ColumnSet::none().with_expression(
        AttributeExpression::aggregate("new_amount", AggregateFn::CountColumn, "distinct_amounts")
            .distinct(),
    ));
    let rows = crm.retrieve_multiple(query).unwrap().entities;
    assert_eq!(inner(&rows[0], "distinct_amounts"), Some(Value::Int(8)));
}

#[test]
fn plain_column_with_aggregate_is_rejected() {
    let crm = seeded();
    let mut columns = aggregate_columns();
    columns.columns.push("new_name".into());
    let err = crm
        .retrieve_multiple(QueryExpression::new("new_sale").with_columns(columns))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Attribute can not be specified if an aggregate operation is requested."
    );

    assert!(crm
        .retrieve_multiple(QueryExpression::new("new_sale").with_columns(aggregate_columns()))
        .is_ok());
}

#[test]
fn fetch_aggregate_with_all_attributes_is_rejected() {
    let crm = seeded();
    let err = crm
        .fetch(
            r#"<fetch aggregate="true"><entity name="new_sale"><all-attributes /><attribute name="new_amount" aggregate="sum" alias="total" /></entity></fetch>"#,
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Attribute can not be specified if an aggregate operation is requested."
    );
}

#[test]
fn group_by_orders_by_alias() {
    let crm = seeded();
    let query = QueryExpression {
        orders: vec![OrderExpression::by_alias("region", OrderType::Descending)],
        ..QueryExpression::new("new_sale").with_columns(
            ColumnSet::none()
                .with_expression(AttributeExpression::group_by("new_region", "region"))
                .with_expression(AttributeExpression::aggregate(
                    "new_amount",
                    AggregateFn::Sum,
                    "total",
                )),
        )
    };
    let rows = crm.retrieve_multiple(query).unwrap().entities;
    assert_eq!(rows.len(), 2);
    assert_eq!(inner(&rows[0], "region"), Some(Value::from("West")));
    // East holds the null row plus 2700, 2900, 4300, 6000
    assert_eq!(inner(&rows[1], "total"), Some(Value::Int(15900)));
    assert_eq!(inner(&rows[0], "total"), Some(Value::Int(19300)));
}

#[test]
fn fetch_group_by_matches_object_form() {
    let crm = seeded();
    let rows = crm
        .fetch(
            r#"<fetch aggregate="true">
                 <entity name="new_sale">
                   <attribute name="new_region" groupby="true" alias="region" />
                   <attribute name="new_amount" aggregate="count" alias="n" />
                   <order alias="region" />
                 </entity>
               </fetch>"#,
        )
        .unwrap()
        .entities;
    assert_eq!(rows.len(), 2);
    assert_eq!(inner(&rows[0], "region"), Some(Value::from("East")));
    assert_eq!(inner(&rows[0], "n"), Some(Value::Int(5)));
    assert_eq!(inner(&rows[1], "n"), Some(Value::Int(5)));
}

#[test]
fn empty_ungrouped_aggregate_returns_one_row() {
    let crm = crm();
    let query = QueryExpression::new("new_sale").with_columns(aggregate_columns());
    let rows = crm.retrieve_multiple(query).unwrap().entities;
    assert_eq!(rows.len(), 1);
    assert_eq!(inner(&rows[0], "count"), Some(Value::Int(0)));
    assert!(rows[0].get("sum").is_none());
}
