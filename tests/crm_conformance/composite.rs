//! Lead qualification, case and opportunity closing, record sharing.

use memcrm::{AccessRights, EntityReference, Money, QualifyLead, Record, Value};
use rust_decimal::Decimal;

use crate::test_utils::{account, contact, crm};

#[test]
fn qualify_lead_creates_linked_records() {
    let crm = crm();
    let lead = EntityReference::new(
        "lead",
        crm.create(
            Record::new("lead")
                .with("firstname", "Grace")
                .with("lastname", "Hopper")
                .with("companyname", "Navy Labs")
                .with("subject", "Compilers")
                .with("emailaddress1", "grace@example.com"),
        )
        .unwrap(),
    );

    let result = crm
        .qualify_lead(QualifyLead {
            create_account: true,
            create_contact: true,
            create_opportunity: true,
            ..QualifyLead::new(lead.clone())
        })
        .unwrap();
    let kinds: Vec<&str> = result.created.iter().map(|r| r.logical_name.as_str()).collect();
    assert_eq!(kinds, vec!["account", "contact", "opportunity"]);

    let db = crm.database();
    let account = db.get("account", result.created[0].id).unwrap();
    assert_eq!(account.string("name"), Some("Navy Labs"));
    let contact = db.get("contact", result.created[1].id).unwrap();
    assert_eq!(contact.string("fullname"), Some("Grace Hopper"));
    assert_eq!(contact.reference("parentcustomerid").unwrap().id, account.id);
    let opportunity = db.get("opportunity", result.created[2].id).unwrap();
    assert_eq!(opportunity.string("name"), Some("Compilers"));
    assert_eq!(opportunity.reference("customerid").unwrap().id, account.id);

    let lead_row = db.get("lead", lead.id).unwrap();
    assert_eq!(lead_row.option("statecode"), Some(1));
    assert_eq!(lead_row.option("statuscode"), Some(3));
    assert_eq!(lead_row.reference("qualifyingopportunityid").unwrap().id, opportunity.id);

    let err = crm.qualify_lead(QualifyLead::new(lead)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The lead is closed. You cannot convert or qualify a lead that is already closed."
    );
}

#[test]
fn close_incident_resolves_the_case() {
    let crm = crm();
    let customer = account(&crm, "Customer");
    let case = EntityReference::new(
        "incident",
        crm.create(
            Record::new("incident")
                .with("title", "Broken")
                .with("customerid", customer),
        )
        .unwrap(),
    );

    let resolution = crm
        .close_incident(
            Record::new("incidentresolution")
                .with("subject", "Fixed")
                .with("incidentid", case.clone()),
            5,
        )
        .unwrap();

    let db = crm.database();
    assert_eq!(db.get("incident", case.id).unwrap().option("statecode"), Some(1));
    let activity = db.get("incidentresolution", resolution).unwrap();
    assert_eq!(activity.option("statecode"), Some(1));

    let err = crm
        .close_incident(Record::new("incidentresolution").with("subject", "No case"), 5)
        .unwrap_err();
    assert_eq!(err.to_string(), "incidentid is required.");
}

#[test]
fn incident_requires_a_customer() {
    let crm = crm();
    assert!(crm.create(Record::new("incident").with("title", "Nobody")).is_err());
}

#[test]
fn win_and_lose_opportunities() {
    let crm = crm();
    let customer = account(&crm, "Buyer");
    let open = |name: &str| {
        EntityReference::new(
            "opportunity",
            crm.create(
                Record::new("opportunity")
                    .with("name", name)
                    .with("customerid", customer.clone()),
            )
            .unwrap(),
        )
    };
    let won = open("Big deal");
    let lost = open("Lost deal");

    crm.win_opportunity(
        Record::new("opportunityclose")
            .with("opportunityid", won.clone())
            .with("actualrevenue", Money(Decimal::from(5000))),
        3,
    )
    .unwrap();
    crm.lose_opportunity(
        Record::new("opportunityclose").with("opportunityid", lost.clone()),
        4,
    )
    .unwrap();

    let db = crm.database();
    let won = db.get("opportunity", won.id).unwrap();
    assert_eq!(won.option("statecode"), Some(1));
    assert_eq!(won.get("actualvalue"), Some(&Value::Money(Money(Decimal::from(5000)))));
    assert!(won.get("actualclosedate").is_some());
    let lost = db.get("opportunity", lost.id).unwrap();
    assert_eq!(lost.option("statecode"), Some(2));
    assert_eq!(lost.option("statuscode"), Some(4));
    assert_eq!(crm.entities_in("opportunityclose").len(), 2);
}

#[test]
fn sharing_grants_and_revokes_rights() {
    let crm = crm();
    let target = account(&crm, "Shared");
    let bu = EntityReference::new("businessunit", crm.database().caller().business_unit_id);
    let other = EntityReference::new(
        "systemuser",
        crm.create(
            Record::new("systemuser")
                .with("lastname", "Colleague")
                .with("businessunitid", bu),
        )
        .unwrap(),
    );

    assert_eq!(crm.retrieve_principal_access(&target, &other).unwrap(), AccessRights::empty());

    crm.grant_access(&target, &other, AccessRights::READ).unwrap();
    crm.grant_access(&target, &other, AccessRights::WRITE).unwrap();
    assert_eq!(
        crm.retrieve_principal_access(&target, &other).unwrap(),
        AccessRights::READ | AccessRights::WRITE
    );

    crm.modify_access(&target, &other, AccessRights::APPEND).unwrap();
    assert_eq!(crm.retrieve_principal_access(&target, &other).unwrap(), AccessRights::APPEND);

    crm.revoke_access(&target, &other).unwrap();
    assert!(crm.retrieve_principal_access(&target, &other).unwrap().is_empty());

    let me = EntityReference::new("systemuser", crm.database().caller().user_id);
    assert_eq!(crm.retrieve_principal_access(&target, &me).unwrap(), AccessRights::owner());
}

#[test]
fn team_grants_reach_members() {
    let crm = crm();
    let person = contact(&crm, "Team", "Shared");
    let bu = EntityReference::new("businessunit", crm.database().caller().business_unit_id);
    let member = EntityReference::new(
        "systemuser",
        crm.create(
            Record::new("systemuser")
                .with("lastname", "Member")
                .with("businessunitid", bu.clone()),
        )
        .unwrap(),
    );
    let team = EntityReference::new(
        "team",
        crm.create(Record::new("team").with("name", "Sales").with("businessunitid", bu))
            .unwrap(),
    );
    crm.associate(&team, "teammembership_association", &[member.clone()])
        .unwrap();
    crm.grant_access(&person, &team, AccessRights::READ | AccessRights::SHARE)
        .unwrap();

    let rights = crm.retrieve_principal_access(&person, &member).unwrap();
    assert!(rights.contains(AccessRights::READ));
    assert!(rights.contains(AccessRights::SHARE));
    assert!(!rights.contains(AccessRights::DELETE));
}

// =============================================================================
// Faults leave the store unchanged
// =============================================================================

fn store_counts(crm: &memcrm::Crm) -> Vec<usize> {
    ["account", "contact", "opportunity", "incidentresolution", "opportunityclose", "email", "activityparty"]
        .iter()
        .map(|entity| crm.entities_in(entity).len())
        .collect()
}

#[test]
fn rejected_qualify_writes_nothing() {
    let crm = crm();
    let lead = EntityReference::new(
        "lead",
        crm.create(
            Record::new("lead")
                .with("lastname", "Hopper")
                .with("companyname", "Navy Labs")
                .with("subject", "Compilers"),
        )
        .unwrap(),
    );
    let before = store_counts(&crm);

    let err = crm
        .qualify_lead(QualifyLead {
            create_account: true,
            create_contact: true,
            create_opportunity: true,
            status: Some(99),
            ..QualifyLead::new(lead.clone())
        })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("99 is not a valid status code for state code 1 on lead with Id {}.", lead.id)
    );
    assert_eq!(store_counts(&crm), before);
    let stored = crm.database().get("lead", lead.id).unwrap();
    assert_eq!(stored.option("statecode"), Some(0));
    assert!(stored.get_non_null("parentaccountid").is_none());
}

#[test]
fn rejected_closes_write_nothing() {
    let crm = crm();
    let customer = account(&crm, "Customer");
    let case = EntityReference::new(
        "incident",
        crm.create(
            Record::new("incident")
                .with("title", "Broken")
                .with("customerid", customer.clone()),
        )
        .unwrap(),
    );
    let deal = EntityReference::new(
        "opportunity",
        crm.create(
            Record::new("opportunity")
                .with("name", "Deal")
                .with("customerid", customer),
        )
        .unwrap(),
    );
    let before = store_counts(&crm);

    assert!(crm
        .close_incident(Record::new("incidentresolution").with("incidentid", case.clone()), 99)
        .is_err());
    assert!(crm
        .win_opportunity(
            Record::new("opportunityclose")
                .with("opportunityid", deal.clone())
                .with("actualrevenue", Money(Decimal::from(10))),
            4,
        )
        .is_err());
    assert!(crm
        .lose_opportunity(Record::new("opportunityclose").with("opportunityid", deal.clone()), 3)
        .is_err());

    assert_eq!(store_counts(&crm), before);
    let db = crm.database();
    assert_eq!(db.get("incident", case.id).unwrap().option("statecode"), Some(0));
    let deal = db.get("opportunity", deal.id).unwrap();
    assert_eq!(deal.option("statecode"), Some(0));
    assert!(deal.get_non_null("actualvalue").is_none());
}

#[test]
fn email_created_from_another_emails_recipients() {
    let crm = crm();
    let person = contact(&crm, "Ada", "Lovelace");
    let recipient = Record::new("activityparty").with("partyid", person);
    let first = crm
        .create(Record::new("email").with("subject", "one").with("to", vec![recipient]))
        .unwrap();
    let to = crm
        .retrieve(&EntityReference::new("email", first), memcrm::ColumnSet::all())
        .unwrap()
        .get("to")
        .cloned()
        .unwrap();

    crm.create(Record::new("email").with("subject", "two").with("to", to))
        .unwrap();
    assert_eq!(crm.entities_in("email").len(), 2);
    assert_eq!(crm.entities_in("activityparty").len(), 2);
}
