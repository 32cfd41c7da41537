//! Write path: upsert, cascades, state and ownership.

use memcrm::{
    ColumnSet, EntityReference, FaultKind, OptionSetValue, QueryExpression, Record, Value,
};

use crate::test_utils::{account, contact, crm};

#[test]
fn upsert_by_alternate_key_is_idempotent() {
    let crm = crm();
    let first = crm
        .upsert(
            Record::new("account")
                .with_key("accountnumber", "ACC-1")
                .with("name", "Before"),
        )
        .unwrap();
    assert!(first.record_created);

    let second = crm
        .upsert(
            Record::new("account")
                .with_key("accountnumber", "ACC-1")
                .with("name", "After"),
        )
        .unwrap();
    assert!(!second.record_created);
    assert_eq!(first.id, second.id);

    let stored = crm.entities_in("account");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].string("name"), Some("After"));
    assert_eq!(stored[0].string("accountnumber"), Some("ACC-1"));
}

#[test]
fn alternate_key_addresses_updates_and_lookups() {
    let crm = crm();
    crm.create(
        Record::new("account")
            .with("accountnumber", "ACC-9")
            .with("name", "Keyed"),
    )
    .unwrap();

    crm.update(
        Record::new("account")
            .with_key("accountnumber", "ACC-9")
            .with("telephone1", "555"),
    )
    .unwrap();
    let by_key = EntityReference::by_key("account", [("accountnumber", "ACC-9")]);
    let stored = crm.retrieve(&by_key, ColumnSet::all()).unwrap();
    assert_eq!(stored.string("telephone1"), Some("555"));

    let child = crm
        .create(
            Record::new("contact")
                .with("lastname", "Child")
                .with("parentcustomerid", by_key),
        )
        .unwrap();
    let child = crm.database().get("contact", child).unwrap();
    assert_eq!(child.reference("parentcustomerid").unwrap().id, stored.id);
    assert_eq!(child.formatted("parentcustomerid"), Some("Keyed"));

    let missing = EntityReference::by_key("account", [("accountnumber", "NOPE")]);
    let err = crm.retrieve(&missing, ColumnSet::all()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "A record with the specified key values does not exist in account entity"
    );
}

#[test]
fn missing_lookup_target_is_rejected() {
    let crm = crm();
    let ghost = EntityReference::new("account", memcrm::Uuid::new_v4());
    let err = crm
        .create(
            Record::new("contact")
                .with("lastname", "Orphan")
                .with("parentcustomerid", ghost.clone()),
        )
        .unwrap_err();
    assert_eq!(err.kind(), FaultKind::Referential);
    assert_eq!(err.to_string(), format!("account With Id = {} Does Not Exist", ghost.id));
}

#[test]
fn delete_cascades_and_removes_links() {
    let crm = crm();
    let parent = account(&crm, "Parent");
    let person = contact(&crm, "Ada", "Child");
    crm.update(Record::with_id("contact", person.id).with("parentcustomerid", parent.clone()))
        .unwrap();
    let task = crm
        .create(
            Record::new("task")
                .with("subject", "Call")
                .with("regardingobjectid", parent.clone()),
        )
        .unwrap();

    crm.delete(&parent).unwrap();
    assert!(crm.database().get("task", task).is_none());
    let person = crm.database().get("contact", person.id).unwrap();
    assert!(person.get_non_null("parentcustomerid").is_none());
}

#[test]
fn restrict_blocks_delete_without_side_effects() {
    let crm = crm();
    let bu = EntityReference::new("businessunit", crm.database().caller().business_unit_id);
    let err = crm.delete(&bu).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The record cannot be deleted because it is associated with another record."
    );
    assert!(crm.database().get("businessunit", bu.id).is_some());
}

#[test]
fn state_changes_are_validated() {
    let crm = crm();
    let target = account(&crm, "Stateful");

    crm.set_state(&target, 1, -1).unwrap();
    let stored = crm.database().get("account", target.id).unwrap();
    assert_eq!(stored.option("statecode"), Some(1));
    assert_eq!(stored.option("statuscode"), Some(2));

    let err = crm.set_state(&target, 7, -1).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("7 is not a valid state code on account with Id {}.", target.id)
    );

    let err = crm
        .update(
            Record::with_id("account", target.id)
                .with("statecode", OptionSetValue(0))
                .with("statuscode", OptionSetValue(2)),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("2 is not a valid status code for state code 0 on account with Id {}.", target.id)
    );
}

#[test]
fn assign_moves_the_owner_triad() {
    let crm = crm();
    let target = account(&crm, "Owned");
    let team = EntityReference::new("team", crm.database().default_team());
    crm.assign(&target, team.clone()).unwrap();

    let stored = crm.database().get("account", target.id).unwrap();
    assert_eq!(stored.reference("ownerid").unwrap().id, team.id);
    assert_eq!(stored.reference("owningteam").unwrap().id, team.id);
    assert!(stored.get_non_null("owninguser").is_none());
}

#[test]
fn many_to_many_links_are_queryable() {
    let crm = crm();
    let acme = account(&crm, "Acme");
    let lead = EntityReference::new(
        "lead",
        crm.create(Record::new("lead").with("lastname", "Prospect")).unwrap(),
    );
    crm.associate(&acme, "accountleads_association", &[lead.clone()])
        .unwrap();
    crm.associate(&acme, "accountleads_association", &[lead.clone()])
        .unwrap();

    let rows = crm
        .retrieve_multiple(QueryExpression::new("accountleads").with_columns(ColumnSet::all()))
        .unwrap()
        .entities;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("leadid"), Some(&Value::Guid(lead.id)));

    crm.disassociate(&acme, "accountleads_association", &[lead])
        .unwrap();
    assert!(crm.entities_in("accountleads").is_empty());

    let err = crm
        .create(Record::new("accountleads"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The 'Create' method does not support entities of type 'accountleads'."
    );
}

#[test]
fn initialize_replaces_everything() {
    let crm = crm();
    account(&crm, "Before");
    let id = memcrm::Uuid::new_v4();
    crm.initialize(vec![Record::with_id("account", id).with("name", "Seeded")])
        .unwrap();
    let accounts = crm.entities_in("account");
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, id);
    assert!(crm.who_am_i().is_ok());
}
