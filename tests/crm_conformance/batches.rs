//! Transactional and continue-on-error batches.

use memcrm::{Command, EntityReference, FaultKind, Output, Record, Uuid};

use crate::test_utils::crm;

fn duplicate_batch(id: Uuid) -> Vec<Command> {
    vec![
        Command::Create {
            record: Record::with_id("account", id).with("name", "A"),
        },
        Command::Create {
            record: Record::with_id("account", id).with("name", "A again"),
        },
    ]
}

#[test]
fn transaction_fails_at_the_conflicting_index() {
    let crm = crm();
    let id = Uuid::new_v4();
    let err = crm.execute_transaction(duplicate_batch(id), true).unwrap_err();
    assert_eq!(err.index(), Some(1));
    assert_eq!(err.to_string(), "Cannot insert duplicate key.");
    assert_eq!(err.kind(), FaultKind::Referential);

    let accounts = crm.entities_in("account");
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].string("name"), Some("A"));
}

#[test]
fn continue_on_error_applies_the_rest() {
    let crm = crm();
    let id = Uuid::new_v4();
    let mut requests = duplicate_batch(id);
    requests.push(Command::Create {
        record: Record::new("account").with("name", "B"),
    });

    let (items, faulted) = crm.execute_multiple(requests, true, false).unwrap();
    assert!(faulted);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].request_index, 1);
    assert_eq!(
        items[0].fault.as_ref().map(|f| f.message()),
        Some("Cannot insert duplicate key.".to_string())
    );
    assert_eq!(crm.entities_in("account").len(), 2);
}

#[test]
fn execute_multiple_without_continue_stops() {
    let crm = crm();
    let mut requests = duplicate_batch(Uuid::new_v4());
    requests.push(Command::Create {
        record: Record::new("account").with("name", "never"),
    });
    let (items, faulted) = crm.execute_multiple(requests, false, true).unwrap();
    assert!(faulted);
    assert_eq!(items.len(), 2);
    assert!(matches!(items[0].response, Some(Output::Id(_))));
    assert!(items[1].fault.is_some());
    assert_eq!(crm.entities_in("account").len(), 1);
}

#[test]
fn nested_batches_are_rejected() {
    let crm = crm();
    let nested = Command::ExecuteMultiple {
        requests: vec![],
        continue_on_error: true,
        return_responses: false,
    };
    let err = crm
        .execute_transaction(
            vec![
                Command::Create {
                    record: Record::new("account"),
                },
                nested,
            ],
            false,
        )
        .unwrap_err();
    assert_eq!(err.index(), Some(1));
    assert_eq!(err.message(), "Batch requests cannot contain other batch requests.");
}

#[test]
fn multiple_requests_report_their_index() {
    let crm = crm();
    let ids = crm
        .create_multiple(vec![
            Record::new("account").with("name", "One"),
            Record::new("account").with("name", "Two"),
        ])
        .unwrap();
    assert_eq!(ids.len(), 2);

    let err = crm
        .update_multiple(vec![
            Record::with_id("account", ids[0]).with("name", "One!"),
            Record::with_id("account", Uuid::new_v4()).with("name", "Ghost"),
        ])
        .unwrap_err();
    assert_eq!(err.index(), Some(1));
    let first = crm.database().get("account", ids[0]).unwrap();
    assert_eq!(first.string("name"), Some("One!"));

    let results = crm
        .upsert_multiple(vec![
            Record::with_id("account", ids[1]).with("name", "Two!"),
            Record::new("account").with_key("accountnumber", "NEW").with("name", "Three"),
        ])
        .unwrap();
    assert!(!results[0].record_created);
    assert!(results[1].record_created);
}

#[test]
fn commands_round_trip_through_json() {
    let crm = crm();
    let command = Command::from_json(r#"{"Create":{"record":{"logical_name":"account","id":"00000000-0000-0000-0000-000000000000","attributes":{},"formatted_values":{},"version":0}}}"#);
    let id = match crm.execute(command.unwrap()).unwrap() {
        Output::Id(id) => id,
        other => panic!("unexpected output {:?}", other),
    };
    let json = Command::Delete {
        target: EntityReference::new("account", id),
    }
    .to_json()
    .unwrap();
    crm.execute(Command::from_json(&json).unwrap()).unwrap();
    assert!(crm.entities_in("account").is_empty());
}
