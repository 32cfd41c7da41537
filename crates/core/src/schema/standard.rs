//! Standard entity and relationship table.

use super::{AttributeDef, CascadePolicy, EntityDef, OwnershipType, RelationshipDef, StateDef};

/// Explicit primary-name overrides.
pub const NAME_OVERRIDES: &[(&str, &str)] = &[
    ("incident", "title"),
    ("annotation", "subject"),
    ("transactioncurrency", "currencyname"),
    ("list", "listname"),
    ("activityparty", "partyid"),
    ("email", "subject"),
    ("phonecall", "subject"),
    ("task", "subject"),
    ("appointment", "subject"),
    ("letter", "subject"),
    ("fax", "subject"),
    ("incidentresolution", "subject"),
    ("opportunityclose", "subject"),
    ("principalobjectaccess", "objectid"),
];

/// Required customer message for cases.
pub const INCIDENT_CUSTOMER_REQUIRED: &str = "You should specify a parent contact or account.";

/// Participation masks of activity-party attributes.
pub mod participation {
    /// Sender
    pub const SENDER: i32 = 1;
    /// To recipient
    pub const TO: i32 = 2;
    /// Cc recipient
    pub const CC: i32 = 3;
    /// Bcc recipient
    pub const BCC: i32 = 4;
    /// Required attendee
    pub const REQUIRED: i32 = 5;
    /// Optional attendee
    pub const OPTIONAL: i32 = 6;
    /// Organizer
    pub const ORGANIZER: i32 = 7;
    /// Customer
    pub const CUSTOMER: i32 = 11;
}

/// Standard entity definitions.
pub fn entities() -> Vec<EntityDef> {
    use participation::*;

    let mut out = vec![
        EntityDef::new("account")
            .object_type_code(1)
            .attributes([
                AttributeDef::string("name"),
                AttributeDef::string("accountnumber"),
                AttributeDef::string("telephone1"),
                AttributeDef::string("emailaddress1"),
                AttributeDef::string("address1_city"),
                AttributeDef::string("address1_country"),
                AttributeDef::memo("description"),
                AttributeDef::money("revenue"),
                AttributeDef::money("creditlimit"),
                AttributeDef::integer("numberofemployees"),
                AttributeDef::boolean("donotemail"),
                AttributeDef::picklist(
                    "industrycode",
                    &[(1, "Accounting"), (2, "Agriculture"), (3, "Broadcasting"), (4, "Brokers")],
                ),
                AttributeDef::picklist("accountcategorycode", &[(1, "Preferred Customer"), (2, "Standard")]),
                AttributeDef::lookup("parentaccountid", &["account"]),
                AttributeDef::lookup("primarycontactid", &["contact"]),
                AttributeDef::lookup("originatingleadid", &["lead"]),
                AttributeDef::lookup("transactioncurrencyid", &["transactioncurrency"]),
            ])
            .alternate_key("accountnumberkey", &["accountnumber"]),
        EntityDef::new("contact")
            .object_type_code(2)
            .person()
            .attributes([
                AttributeDef::string("emailaddress1"),
                AttributeDef::string("telephone1"),
                AttributeDef::string("jobtitle"),
                AttributeDef::string("address1_city"),
                AttributeDef::memo("description"),
                AttributeDef::customer("parentcustomerid"),
                AttributeDef::datetime("birthdate"),
                AttributeDef::integer("numberofchildren"),
                AttributeDef::money("annualincome"),
                AttributeDef::boolean("donotemail"),
                AttributeDef::picklist("gendercode", &[(1, "Male"), (2, "Female")]),
                AttributeDef::picklist(
                    "familystatuscode",
                    &[(1, "Single"), (2, "Married"), (3, "Divorced"), (4, "Widowed")],
                ),
                AttributeDef::lookup("originatingleadid", &["lead"]),
                AttributeDef::lookup("transactioncurrencyid", &["transactioncurrency"]),
            ]),
        EntityDef::new("lead")
            .object_type_code(4)
            .person()
            .attributes([
                AttributeDef::string("subject"),
                AttributeDef::string("companyname"),
                AttributeDef::string("emailaddress1"),
                AttributeDef::string("telephone1"),
                AttributeDef::money("estimatedamount"),
                AttributeDef::picklist(
                    "leadsourcecode",
                    &[(1, "Advertisement"), (2, "Employee Referral"), (3, "External Referral"), (8, "Web")],
                ),
                AttributeDef::lookup("parentaccountid", &["account"]),
                AttributeDef::lookup("parentcontactid", &["contact"]),
                AttributeDef::customer("customerid"),
                AttributeDef::lookup("qualifyingopportunityid", &["opportunity"]),
            ])
            .states(
                vec![
                    StateDef::new(0, "Open", &[(1, "New"), (2, "Contacted")]),
                    StateDef::new(1, "Qualified", &[(3, "Qualified")]),
                    StateDef::new(
                        2,
                        "Disqualified",
                        &[(4, "Lost"), (5, "Cannot Contact"), (6, "No Longer Interested"), (7, "Canceled")],
                    ),
                ],
                0,
            ),
        EntityDef::new("opportunity")
            .object_type_code(3)
            .attributes([
                AttributeDef::string("name"),
                AttributeDef::memo("description"),
                AttributeDef::money("estimatedvalue"),
                AttributeDef::money("actualvalue"),
                AttributeDef::datetime("estimatedclosedate"),
                AttributeDef::datetime("actualclosedate"),
                AttributeDef::integer("closeprobability"),
                AttributeDef::customer("customerid"),
                AttributeDef::lookup("parentaccountid", &["account"]),
                AttributeDef::lookup("parentcontactid", &["contact"]),
                AttributeDef::lookup("originatingleadid", &["lead"]),
                AttributeDef::lookup("transactioncurrencyid", &["transactioncurrency"]),
            ])
            .states(
                vec![
                    StateDef::new(0, "Open", &[(1, "In Progress"), (2, "On Hold")]),
                    StateDef::new(1, "Won", &[(3, "Won")]),
                    StateDef::new(2, "Lost", &[(4, "Canceled"), (5, "Out-Sold")]),
                ],
                0,
            ),
        EntityDef::new("incident")
            .object_type_code(112)
            .attributes([
                AttributeDef::string("title"),
                AttributeDef::string("ticketnumber"),
                AttributeDef::memo("description"),
                AttributeDef::customer("customerid"),
                AttributeDef::lookup("primarycontactid", &["contact"]),
                AttributeDef::picklist("prioritycode", &[(1, "High"), (2, "Normal"), (3, "Low")]),
                AttributeDef::picklist("caseorigincode", &[(1, "Phone"), (2, "Email"), (3, "Web")]),
            ])
            .requires(&["customerid"], INCIDENT_CUSTOMER_REQUIRED)
            .states(
                vec![
                    StateDef::new(
                        0,
                        "Active",
                        &[(1, "In Progress"), (2, "On Hold"), (3, "Waiting for Details"), (4, "Researching")],
                    ),
                    StateDef::new(1, "Resolved", &[(5, "Problem Solved"), (1000, "Information Provided")]),
                    StateDef::new(2, "Canceled", &[(6, "Cancelled"), (2000, "Merged")]),
                ],
                0,
            ),
        EntityDef::new("incidentresolution")
            .object_type_code(4206)
            .activity()
            .attributes([
                AttributeDef::lookup("incidentid", &["incident"]),
                AttributeDef::integer("timespent"),
            ]),
        EntityDef::new("opportunityclose")
            .object_type_code(4208)
            .activity()
            .attributes([
                AttributeDef::lookup("opportunityid", &["opportunity"]),
                AttributeDef::money("actualrevenue"),
                AttributeDef::lookup("competitorid", &["competitor"]),
            ]),
        EntityDef::new("systemuser")
            .object_type_code(8)
            .ownership(OwnershipType::BusinessOwned)
            .person()
            .attributes([
                AttributeDef::string("domainname"),
                AttributeDef::string("internalemailaddress"),
                AttributeDef::boolean("isdisabled"),
                AttributeDef::lookup("businessunitid", &["businessunit"]),
            ]),
        EntityDef::new("team")
            .object_type_code(9)
            .ownership(OwnershipType::BusinessOwned)
            .attributes([
                AttributeDef::string("name"),
                AttributeDef::lookup("businessunitid", &["businessunit"]),
                AttributeDef::lookup("administratorid", &["systemuser"]),
                AttributeDef::picklist("teamtype", &[(0, "Owner"), (1, "Access")]),
            ]),
        EntityDef::new("businessunit")
            .object_type_code(10)
            .ownership(OwnershipType::None)
            .attributes([
                AttributeDef::string("name"),
                AttributeDef::lookup("parentbusinessunitid", &["businessunit"]),
            ]),
        EntityDef::new("role")
            .object_type_code(1036)
            .ownership(OwnershipType::BusinessOwned)
            .stateless()
            .attributes([
                AttributeDef::string("name"),
                AttributeDef::lookup("businessunitid", &["businessunit"]),
            ]),
        EntityDef::new("transactioncurrency")
            .object_type_code(9105)
            .ownership(OwnershipType::OrganizationOwned)
            .attributes([
                AttributeDef::string("currencyname"),
                AttributeDef::string("isocurrencycode"),
                AttributeDef::string("currencysymbol"),
                AttributeDef::decimal("exchangerate"),
            ]),
        EntityDef::new("product")
            .object_type_code(1024)
            .ownership(OwnershipType::OrganizationOwned)
            .attributes([
                AttributeDef::string("name"),
                AttributeDef::string("productnumber"),
                AttributeDef::money("price"),
                AttributeDef::decimal("quantitydecimal"),
                AttributeDef::picklist("producttypecode", &[(1, "Sales Inventory"), (2, "Miscellaneous Charges"), (3, "Services")]),
            ])
            .alternate_key("productnumberkey", &["productnumber"]),
        EntityDef::new("annotation")
            .object_type_code(5)
            .stateless()
            .attributes([
                AttributeDef::string("subject"),
                AttributeDef::memo("notetext"),
                AttributeDef::string("filename"),
                AttributeDef::boolean("isdocument"),
                AttributeDef::lookup("objectid", &[]),
            ]),
        EntityDef::new("list")
            .object_type_code(4300)
            .attributes([
                AttributeDef::string("listname"),
                AttributeDef::boolean("type"),
                AttributeDef::picklist("createdfromcode", &[(1, "Account"), (2, "Contact"), (4, "Lead")]),
            ]),
        EntityDef::new("activityparty")
            .object_type_code(135)
            .ownership(OwnershipType::None)
            .stateless()
            .attributes([
                AttributeDef::lookup("activityid", &[]),
                AttributeDef::lookup("partyid", &[]),
                AttributeDef::string("addressused"),
                AttributeDef::picklist(
                    "participationtypemask",
                    &[
                        (SENDER, "Sender"),
                        (TO, "To Recipient"),
                        (CC, "CC Recipient"),
                        (BCC, "BCC Recipient"),
                        (REQUIRED, "Required attendee"),
                        (OPTIONAL, "Optional attendee"),
                        (ORGANIZER, "Organizer"),
                        (8, "Regarding"),
                        (9, "Owner"),
                        (CUSTOMER, "Customer"),
                    ],
                ),
            ]),
        EntityDef::new("principalobjectaccess")
            .ownership(OwnershipType::None)
            .stateless()
            .attributes([
                AttributeDef::guid("objectid"),
                AttributeDef::new("objecttypecode", super::AttributeKind::EntityName),
                AttributeDef::guid("principalid"),
                AttributeDef::new("principaltypecode", super::AttributeKind::EntityName),
                AttributeDef::integer("accessrightsmask"),
            ]),
        EntityDef::new("email")
            .object_type_code(4202)
            .activity()
            .attributes([
                AttributeDef::party_list("from", SENDER),
                AttributeDef::party_list("to", TO),
                AttributeDef::party_list("cc", CC),
                AttributeDef::party_list("bcc", BCC),
                AttributeDef::boolean("directioncode"),
            ]),
        EntityDef::new("phonecall")
            .object_type_code(4210)
            .activity()
            .attributes([
                AttributeDef::party_list("from", SENDER),
                AttributeDef::party_list("to", TO),
                AttributeDef::string("phonenumber"),
                AttributeDef::boolean("directioncode"),
            ]),
        EntityDef::new("task")
            .object_type_code(4212)
            .activity()
            .attribute(AttributeDef::integer("percentcomplete")),
        EntityDef::new("appointment")
            .object_type_code(4201)
            .activity()
            .attributes([
                AttributeDef::party_list("organizer", ORGANIZER),
                AttributeDef::party_list("requiredattendees", REQUIRED),
                AttributeDef::party_list("optionalattendees", OPTIONAL),
                AttributeDef::string("location"),
            ])
            .states(
                vec![
                    StateDef::new(0, "Open", &[(1, "Free"), (2, "Tentative")]),
                    StateDef::new(1, "Completed", &[(3, "Completed")]),
                    StateDef::new(2, "Canceled", &[(4, "Canceled")]),
                    StateDef::new(3, "Scheduled", &[(5, "Busy"), (6, "Out of Office")]),
                ],
                3,
            ),
        EntityDef::new("letter")
            .object_type_code(4207)
            .activity()
            .attributes([
                AttributeDef::party_list("from", SENDER),
                AttributeDef::party_list("to", TO),
                AttributeDef::string("address"),
            ]),
        EntityDef::new("fax")
            .object_type_code(4204)
            .activity()
            .attributes([
                AttributeDef::party_list("from", SENDER),
                AttributeDef::party_list("to", TO),
                AttributeDef::integer("numberofpages"),
            ]),
    ];

    out.extend([
        intersect("accountleads", 16, ("accountid", "account"), ("leadid", "lead")),
        intersect("contactleads", 22, ("contactid", "contact"), ("leadid", "lead")),
        intersect("teammembership", 23, ("teamid", "team"), ("systemuserid", "systemuser")),
        intersect("systemuserroles", 15, ("systemuserid", "systemuser"), ("roleid", "role")),
        intersect("listmember", 4301, ("listid", "list"), ("entityid", "")),
    ]);
    out
}

fn intersect(name: &str, code: i32, first: (&str, &str), second: (&str, &str)) -> EntityDef {
    EntityDef::new(name)
        .object_type_code(code)
        .intersect()
        .attribute(AttributeDef::lookup(first.0, &target(first.1)))
        .attribute(AttributeDef::lookup(second.0, &target(second.1)))
}

fn target(logical_name: &str) -> Vec<&str> {
    if logical_name.is_empty() {
        Vec::new()
    } else {
        vec![logical_name]
    }
}

/// Standard relationships.
pub fn relationships() -> Vec<RelationshipDef> {
    use CascadePolicy::*;

    vec![
        RelationshipDef::many_to_many(
            "accountleads_association",
            "accountleads",
            ("account", "accountid"),
            ("lead", "leadid"),
        ),
        RelationshipDef::many_to_many(
            "contactleads_association",
            "contactleads",
            ("contact", "contactid"),
            ("lead", "leadid"),
        ),
        RelationshipDef::many_to_many(
            "teammembership_association",
            "teammembership",
            ("team", "teamid"),
            ("systemuser", "systemuserid"),
        ),
        RelationshipDef::many_to_many(
            "systemuserroles_association",
            "systemuserroles",
            ("systemuser", "systemuserid"),
            ("role", "roleid"),
        ),
        RelationshipDef::many_to_many(
            "listcontact_association",
            "listmember",
            ("list", "listid"),
            ("contact", "entityid"),
        ),
        RelationshipDef::many_to_many(
            "listaccount_association",
            "listmember",
            ("list", "listid"),
            ("account", "entityid"),
        ),
        RelationshipDef::many_to_many(
            "listlead_association",
            "listmember",
            ("list", "listid"),
            ("lead", "entityid"),
        ),
        RelationshipDef::one_to_many("contact_customer_accounts", "account", ("contact", "parentcustomerid"), RemoveLink),
        RelationshipDef::one_to_many("contact_customer_contacts", "contact", ("contact", "parentcustomerid"), RemoveLink),
        RelationshipDef::one_to_many("account_parent_account", "account", ("account", "parentaccountid"), RemoveLink),
        RelationshipDef::one_to_many("account_primary_contact", "contact", ("account", "primarycontactid"), RemoveLink),
        RelationshipDef::one_to_many("account_originating_lead", "lead", ("account", "originatingleadid"), RemoveLink),
        RelationshipDef::one_to_many("contact_originating_lead", "lead", ("contact", "originatingleadid"), RemoveLink),
        RelationshipDef::one_to_many("opportunity_originating_lead", "lead", ("opportunity", "originatingleadid"), RemoveLink),
        RelationshipDef::one_to_many("incident_customer_accounts", "account", ("incident", "customerid"), Cascade),
        RelationshipDef::one_to_many("incident_customer_contacts", "contact", ("incident", "customerid"), Cascade),
        RelationshipDef::one_to_many("opportunity_customer_accounts", "account", ("opportunity", "customerid"), Cascade),
        RelationshipDef::one_to_many("opportunity_customer_contacts", "contact", ("opportunity", "customerid"), Cascade),
        RelationshipDef::one_to_many("incident_resolution_activities", "incident", ("incidentresolution", "incidentid"), Cascade),
        RelationshipDef::one_to_many("opportunity_opportunityclose", "opportunity", ("opportunityclose", "opportunityid"), Cascade),
        RelationshipDef::one_to_many("account_annotation", "account", ("annotation", "objectid"), Cascade),
        RelationshipDef::one_to_many("contact_annotation", "contact", ("annotation", "objectid"), Cascade),
        RelationshipDef::one_to_many("lead_annotation", "lead", ("annotation", "objectid"), Cascade),
        RelationshipDef::one_to_many("account_tasks", "account", ("task", "regardingobjectid"), Cascade),
        RelationshipDef::one_to_many("contact_tasks", "contact", ("task", "regardingobjectid"), Cascade),
        RelationshipDef::one_to_many("business_unit_system_users", "businessunit", ("systemuser", "businessunitid"), Restrict),
        RelationshipDef::one_to_many("business_unit_teams", "businessunit", ("team", "businessunitid"), Restrict),
        RelationshipDef::one_to_many("business_unit_parent_business_unit", "businessunit", ("businessunit", "parentbusinessunitid"), Restrict),
    ]
}
