//! Record operations: create, retrieve, update, delete, associate, query.

use memcrm_core::{EntityCollection, EntityReference, Record, Value};
use memcrm_engine::{ColumnSet, Query, QueryByAttribute, UpsertResult};
use uuid::Uuid;

use super::Crm;
use crate::convert::convert_result;
use crate::{Command, Error, Output, Result};

impl Crm {
    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Create a record and return its id.
    pub fn create(&self, record: Record) -> Result<Uuid> {
        match self.execute(Command::Create { record })? {
            Output::Id(id) => Ok(id),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Create".into(),
            }),
        }
    }

    /// Retrieve one record projected to `columns`.
    pub fn retrieve(&self, target: &EntityReference, columns: ColumnSet) -> Result<Record> {
        match self.execute(Command::Retrieve {
            target: target.clone(),
            columns,
        })? {
            Output::Record(record) => Ok(record),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Retrieve".into(),
            }),
        }
    }

    /// Merge the record's attributes onto the stored record.
    pub fn update(&self, record: Record) -> Result<()> {
        match self.execute(Command::Update { record })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Update".into(),
            }),
        }
    }

    /// Delete a record and apply cascades.
    pub fn delete(&self, target: &EntityReference) -> Result<()> {
        match self.execute(Command::Delete {
            target: target.clone(),
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Delete".into(),
            }),
        }
    }

    /// Delete a record if present. Returns whether it existed.
    pub fn delete_if_exists(&self, target: &EntityReference) -> Result<bool> {
        match self.execute(Command::DeleteIfExists {
            target: target.clone(),
        })? {
            Output::Bool(existed) => Ok(existed),
            _ => Err(Error::Internal {
                reason: "Unexpected output for DeleteIfExists".into(),
            }),
        }
    }

    /// Create or update by id or alternate key.
    pub fn upsert(&self, record: Record) -> Result<UpsertResult> {
        match self.execute(Command::Upsert { record })? {
            Output::Upserted(result) => Ok(result),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Upsert".into(),
            }),
        }
    }

    // =========================================================================
    // Relationship Operations
    // =========================================================================

    /// Link `target` to `related` through a relationship.
    pub fn associate(
        &self,
        target: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<()> {
        match self.execute(Command::Associate {
            target: target.clone(),
            relationship: relationship.to_string(),
            related: related.to_vec(),
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Associate".into(),
            }),
        }
    }

    /// Remove links created by [`Crm::associate`].
    pub fn disassociate(
        &self,
        target: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<()> {
        match self.execute(Command::Disassociate {
            target: target.clone(),
            relationship: relationship.to_string(),
            related: related.to_vec(),
        })? {
            Output::Unit => Ok(()),
            _ => Err(Error::Internal {
                reason: "Unexpected output for Disassociate".into(),
            }),
        }
    }

    // =========================================================================
    // Query Operations
    // =========================================================================

    /// Run a query in any supported form.
    pub fn retrieve_multiple(&self, query: impl Into<Query>) -> Result<EntityCollection> {
        match self.execute(Command::RetrieveMultiple {
            query: query.into(),
        })? {
            Output::Collection(collection) => Ok(collection),
            _ => Err(Error::Internal {
                reason: "Unexpected output for RetrieveMultiple".into(),
            }),
        }
    }

    /// Run a FetchXML query.
    pub fn fetch(&self, xml: &str) -> Result<EntityCollection> {
        self.retrieve_multiple(Query::Fetch(xml.to_string()))
    }

    // =========================================================================
    // Test Harness Operations
    // =========================================================================

    /// Every stored record of a type.
    pub fn entities_in(&self, logical_name: &str) -> Vec<Record> {
        self.database().scan(logical_name)
    }

    /// Records of a type whose `attribute` equals `value`.
    pub fn entities_where(
        &self,
        logical_name: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<Record>> {
        let query = QueryByAttribute::new(logical_name).with_attribute_value(attribute, value);
        Ok(self.retrieve_multiple(query)?.entities)
    }

    /// Replace all data with the seeded defaults plus `records`.
    pub fn initialize(&self, records: Vec<Record>) -> Result<()> {
        convert_result(self.database().initialize(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let crm = Crm::new();
        let id = crm
            .create(Record::new("account").with("name", "Contoso"))
            .unwrap();
        let target = EntityReference::new("account", id);

        crm.update(Record::with_id("account", id).with("telephone1", "555"))
            .unwrap();
        let stored = crm.retrieve(&target, ColumnSet::all()).unwrap();
        assert_eq!(stored.string("name"), Some("Contoso"));
        assert_eq!(stored.string("telephone1"), Some("555"));

        crm.delete(&target).unwrap();
        assert!(!crm.delete_if_exists(&target).unwrap());
        let err = crm.retrieve(&target, ColumnSet::all()).unwrap_err();
        assert_eq!(err.to_string(), format!("account With Id = {} Does Not Exist", id));
    }

    #[test]
    fn test_fetch_and_entities_in() {
        let crm = Crm::new();
        crm.create(Record::new("contact").with("lastname", "Smith"))
            .unwrap();
        crm.create(Record::new("contact").with("lastname", "Jones"))
            .unwrap();
        let result = crm
            .fetch(
                r#"<fetch><entity name="contact"><attribute name="lastname" /><filter><condition attribute="lastname" operator="eq" value="Smith" /></filter></entity></fetch>"#,
            )
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(crm.entities_in("Contact").len(), 2);
        assert_eq!(crm.entities_where("contact", "lastname", "JONES").unwrap().len(), 1);
    }
}
