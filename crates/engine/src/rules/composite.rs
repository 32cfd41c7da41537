//! Composite sales and service operations
//!
//! Each operation is a sequence of ordinary writes inside the caller's
//! transaction: qualify a lead into account/contact/opportunity, resolve a
//! case, close an opportunity as won or lost.

use memcrm_core::{CrmError, CrmResult, EntityReference, Record, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::state::resolve_state;
use super::Transaction;

const LEAD_OPEN: i32 = 0;
const LEAD_QUALIFIED: i32 = 1;
const LEAD_QUALIFIED_STATUS: i32 = 3;
const INCIDENT_RESOLVED: i32 = 1;
const OPPORTUNITY_WON: i32 = 1;
const OPPORTUNITY_LOST: i32 = 2;
const ACTIVITY_COMPLETED: i32 = 1;

/// Qualify-lead request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifyLead {
    /// Lead to qualify
    pub lead: EntityReference,
    /// Create an account from the lead's company name
    pub create_account: bool,
    /// Create a contact from the lead's person fields
    pub create_contact: bool,
    /// Create an opportunity from the lead's topic
    pub create_opportunity: bool,
    /// Customer of the new opportunity; defaults to the created account,
    /// then the created contact
    pub opportunity_customer: Option<EntityReference>,
    /// Status for the qualified lead; defaults to Qualified
    pub status: Option<i32>,
}

impl QualifyLead {
    /// Request that only closes the lead.
    pub fn new(lead: EntityReference) -> Self {
        Self {
            lead,
            create_account: false,
            create_contact: false,
            create_opportunity: false,
            opportunity_customer: None,
            status: None,
        }
    }
}

/// Records created by a lead qualification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualifyLeadResult {
    /// Created records, in creation order
    pub created: Vec<EntityReference>,
}

/// Copy `from` attributes of `source` onto `target` as `to`.
fn copy_attributes(source: &Record, target: &mut Record, pairs: &[(&str, &str)]) {
    for (from, to) in pairs {
        if let Some(value) = source.get_non_null(from) {
            target.set(*to, value.clone());
        }
    }
}

impl Transaction<'_> {
    /// Qualify an open lead.
    pub fn qualify_lead(&mut self, request: &QualifyLead) -> CrmResult<QualifyLeadResult> {
        let id = self.resolve_id(&request.lead)?;
        let lead = self.existing("lead", id)?;
        if lead.option("statecode").unwrap_or(LEAD_OPEN) != LEAD_OPEN {
            return Err(CrmError::LeadClosed);
        }
        let status = request.status.unwrap_or(LEAD_QUALIFIED_STATUS);
        self.check_transition("lead", id, LEAD_QUALIFIED, status)?;
        if request.create_opportunity {
            if let Some(customer) = &request.opportunity_customer {
                let customer_id = self.resolve_id(customer)?;
                let logical_name = customer.logical_name.to_lowercase();
                if !self.tables.contains(&logical_name, customer_id) {
                    return Err(CrmError::does_not_exist(&logical_name, customer_id));
                }
            }
        }

        let origin = EntityReference::new("lead", id);
        let mut created = Vec::new();

        let account = if request.create_account {
            let mut account = Record::new("account").with("originatingleadid", origin.clone());
            copy_attributes(
                &lead,
                &mut account,
                &[
                    ("companyname", "name"),
                    ("emailaddress1", "emailaddress1"),
                    ("telephone1", "telephone1"),
                ],
            );
            let reference = EntityReference::new("account", self.create(account)?);
            created.push(reference.clone());
            Some(reference)
        } else {
            None
        };

        let contact = if request.create_contact {
            let mut contact = Record::new("contact").with("originatingleadid", origin.clone());
            copy_attributes(
                &lead,
                &mut contact,
                &[
                    ("firstname", "firstname"),
                    ("middlename", "middlename"),
                    ("lastname", "lastname"),
                    ("emailaddress1", "emailaddress1"),
                    ("telephone1", "telephone1"),
                ],
            );
            if let Some(account) = &account {
                contact.set("parentcustomerid", account.clone());
            }
            let reference = EntityReference::new("contact", self.create(contact)?);
            created.push(reference.clone());
            Some(reference)
        } else {
            None
        };

        let mut lead_change = Record::with_id("lead", id);
        if request.create_opportunity {
            let mut opportunity = Record::new("opportunity").with("originatingleadid", origin.clone());
            copy_attributes(
                &lead,
                &mut opportunity,
                &[("subject", "name"), ("estimatedamount", "estimatedvalue")],
            );
            let customer = request
                .opportunity_customer
                .clone()
                .or_else(|| account.clone())
                .or_else(|| contact.clone());
            if let Some(customer) = customer {
                opportunity.set("customerid", customer);
            }
            let reference = EntityReference::new("opportunity", self.create(opportunity)?);
            lead_change.set("qualifyingopportunityid", reference.clone());
            created.push(reference);
        }
        if let Some(account) = account {
            lead_change.set("parentaccountid", account);
        }
        if let Some(contact) = contact {
            lead_change.set("parentcontactid", contact);
        }
        if !lead_change.attributes.is_empty() {
            self.update(lead_change)?;
        }

        self.set_state(&origin, LEAD_QUALIFIED, status)?;
        debug!(lead = %id, created = created.len(), "lead qualified");
        Ok(QualifyLeadResult { created })
    }

    /// Record a resolution and move the case to Resolved.
    pub fn close_incident(&mut self, resolution: Record, status: i32) -> CrmResult<Uuid> {
        let incident = self.closed_parent(&resolution, "incidentid", "incident")?;
        self.check_transition("incident", incident.id, INCIDENT_RESOLVED, status)?;
        let resolution_id = self.close_activity(resolution, "incidentresolution")?;
        self.set_state(&incident, INCIDENT_RESOLVED, status)?;
        debug!(incident = %incident.id, resolution = %resolution_id, "incident closed");
        Ok(resolution_id)
    }

    /// Record a close activity and move the opportunity to Won.
    pub fn win_opportunity(&mut self, close: Record, status: i32) -> CrmResult<Uuid> {
        self.close_opportunity(close, OPPORTUNITY_WON, status)
    }

    /// Record a close activity and move the opportunity to Lost.
    pub fn lose_opportunity(&mut self, close: Record, status: i32) -> CrmResult<Uuid> {
        self.close_opportunity(close, OPPORTUNITY_LOST, status)
    }

    fn close_opportunity(&mut self, close: Record, state: i32, status: i32) -> CrmResult<Uuid> {
        let opportunity = self.closed_parent(&close, "opportunityid", "opportunity")?;
        self.check_transition("opportunity", opportunity.id, state, status)?;
        let actual = close.get_non_null("actualrevenue").cloned();
        let close_id = self.close_activity(close, "opportunityclose")?;
        let mut change = Record::with_id("opportunity", opportunity.id).with("actualclosedate", self.now);
        if let Some(actual) = actual {
            change.set("actualvalue", actual);
        }
        self.update(change)?;
        self.set_state(&opportunity, state, status)?;
        debug!(opportunity = %opportunity.id, state, status, "opportunity closed");
        Ok(close_id)
    }

    /// Fail before any write when the target state or status is invalid.
    fn check_transition(&self, logical_name: &str, id: Uuid, state: i32, status: i32) -> CrmResult<()> {
        let def = self.entry(logical_name);
        resolve_state(&def, id, Some(state), Some(status), None).map(|_| ())
    }

    /// The record a close activity points at, checked to exist.
    fn closed_parent(&self, activity: &Record, attribute: &str, expected: &str) -> CrmResult<EntityReference> {
        let reference = activity
            .reference(attribute)
            .ok_or_else(|| CrmError::invalid(format!("{} is required.", attribute)))?;
        let id = self.resolve_id(reference)?;
        if !self.tables.contains(expected, id) {
            return Err(CrmError::does_not_exist(expected, id));
        }
        Ok(EntityReference::new(expected, id))
    }

    /// Create a close activity in the Completed state.
    fn close_activity(&mut self, mut activity: Record, logical_name: &str) -> CrmResult<Uuid> {
        activity.logical_name = logical_name.to_string();
        activity.set("actualend", Value::DateTime(self.now));
        let id = self.create(activity)?;
        self.set_state(&EntityReference::new(logical_name, id), ACTIVITY_COMPLETED, -1)?;
        Ok(id)
    }
}
