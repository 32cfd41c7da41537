//! Relationship writes
//!
//! Many-to-many associations store one intersect row per pairing. One-to-many
//! associations set the child's lookup to the parent; disassociation clears it.

use memcrm_core::{
    CrmError, CrmResult, EntityReference, ManyToMany, OneToMany, Record, RelationshipDef, Value,
};
use tracing::debug;
use uuid::Uuid;

use super::Transaction;

/// Which side of a relationship a request's target sits on.
enum Side {
    First,
    Second,
}

impl Transaction<'_> {
    /// Link `target` to every record in `related` through `relationship`.
    pub fn associate(
        &mut self,
        target: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> CrmResult<()> {
        let rel = self.relationship_def(relationship)?;
        let target = self.existing_reference(target)?;
        let related = self.existing_references(related)?;
        match rel {
            RelationshipDef::ManyToMany(m) => self.link_many(&m, &target, &related),
            RelationshipDef::OneToMany(o) => self.link_one(&o, &target, &related, true),
        }
    }

    /// Remove the links `associate` would create.
    pub fn disassociate(
        &mut self,
        target: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> CrmResult<()> {
        let rel = self.relationship_def(relationship)?;
        let target = self.existing_reference(target)?;
        let related = self.existing_references(related)?;
        match rel {
            RelationshipDef::ManyToMany(m) => {
                self.unlink_many(&m, &target, &related);
                Ok(())
            }
            RelationshipDef::OneToMany(o) => self.link_one(&o, &target, &related, false),
        }
    }

    fn relationship_def(&self, name: &str) -> CrmResult<RelationshipDef> {
        self.catalog
            .relationship(name)
            .cloned()
            .ok_or_else(|| CrmError::RelationshipNotFound(name.to_string()))
    }

    /// Lower-cased, key-resolved reference to a record that exists.
    fn existing_reference(&self, reference: &EntityReference) -> CrmResult<EntityReference> {
        let logical_name = reference.logical_name.to_lowercase();
        let id = self.resolve_id(reference)?;
        if !self.tables.contains(&logical_name, id) {
            return Err(CrmError::does_not_exist(&logical_name, id));
        }
        Ok(EntityReference::new(logical_name, id))
    }

    fn existing_references(&self, references: &[EntityReference]) -> CrmResult<Vec<EntityReference>> {
        references.iter().map(|r| self.existing_reference(r)).collect()
    }

    // =========================================================================
    // Many-to-many
    // =========================================================================

    fn side_of(m: &ManyToMany, target: &EntityReference) -> Side {
        if m.entity1 == target.logical_name {
            Side::First
        } else {
            Side::Second
        }
    }

    /// Intersect column pair for (target, related) on the target's side.
    fn columns(m: &ManyToMany, side: &Side) -> (String, String) {
        match side {
            Side::First => (m.entity1_attribute.clone(), m.entity2_attribute.clone()),
            Side::Second => (m.entity2_attribute.clone(), m.entity1_attribute.clone()),
        }
    }

    fn intersect_rows(&self, m: &ManyToMany, own: &str, other: &str, target: Uuid, related: Uuid) -> Vec<Uuid> {
        self.tables
            .iter(&m.intersect_entity)
            .filter(|r| r.guid(own) == Some(target) && r.guid(other) == Some(related))
            .map(|r| r.id)
            .collect()
    }

    fn link_many(
        &mut self,
        m: &ManyToMany,
        target: &EntityReference,
        related: &[EntityReference],
    ) -> CrmResult<()> {
        let (own, other) = Self::columns(m, &Self::side_of(m, target));
        let primary_id = self.catalog.primary_id_attribute(&m.intersect_entity);
        for item in related {
            if !self.intersect_rows(m, &own, &other, target.id, item.id).is_empty() {
                continue;
            }
            let id = Uuid::new_v4();
            let row = Record::with_id(m.intersect_entity.clone(), id)
                .with(primary_id.clone(), id)
                .with(own.clone(), target.id)
                .with(other.clone(), item.id);
            self.tables.insert(row)?;
            debug!(relationship = %m.schema_name, target = %target, related = %item, "associated");
        }
        Ok(())
    }

    fn unlink_many(&mut self, m: &ManyToMany, target: &EntityReference, related: &[EntityReference]) {
        let (own, other) = Self::columns(m, &Self::side_of(m, target));
        for item in related {
            for row in self.intersect_rows(m, &own, &other, target.id, item.id) {
                self.tables.delete(&m.intersect_entity, row);
                debug!(relationship = %m.schema_name, target = %target, related = %item, "disassociated");
            }
        }
    }

    // =========================================================================
    // One-to-many
    // =========================================================================

    fn link_one(
        &mut self,
        o: &OneToMany,
        target: &EntityReference,
        related: &[EntityReference],
        link: bool,
    ) -> CrmResult<()> {
        let pairs: Vec<(EntityReference, EntityReference)> = if target.logical_name == o.referenced_entity {
            related.iter().map(|child| (target.clone(), child.clone())).collect()
        } else {
            related.iter().map(|parent| (parent.clone(), target.clone())).collect()
        };
        for (parent, child) in pairs {
            let value = if link {
                Value::Lookup(parent.clone())
            } else {
                let current = self
                    .tables
                    .get_ref(&child.logical_name, child.id)
                    .and_then(|r| r.reference(&o.referencing_attribute))
                    .map(|r| r.id);
                if current != Some(parent.id) {
                    continue;
                }
                Value::Null
            };
            let change = Record::with_id(child.logical_name.clone(), child.id)
                .with(o.referencing_attribute.clone(), value);
            self.update(change)?;
            debug!(relationship = %o.schema_name, parent = %parent, child = %child, link, "lookup relationship changed");
        }
        Ok(())
    }
}
