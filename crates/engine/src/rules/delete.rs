//! Delete path and cascades
//!
//! A delete first plans the full set of records it will remove (following
//! `Cascade` relationships), checks `Restrict` relationships against that
//! plan, and only then mutates. A refused delete leaves the store untouched.
//!
//! For every removed record the following also go:
//! - activity-party rows of an activity
//! - intersect rows that reference it
//! - access grants on it
//!
//! `RemoveLink` children outside the plan get their lookup cleared.

use memcrm_core::{CascadePolicy, CrmError, CrmResult, EntityReference, RelationshipDef, Value};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};
use uuid::Uuid;

use super::access::ACCESS_GRANT;
use super::Transaction;

type Doomed = Vec<(String, Uuid)>;

impl Transaction<'_> {
    /// Delete a record and everything that cascades from it.
    pub fn delete(&mut self, target: &EntityReference) -> CrmResult<()> {
        let logical_name = target.logical_name.to_lowercase();
        let def = self.entry(&logical_name);
        self.check_writable("Delete", &def)?;
        let id = self.resolve_id(target)?;
        if !self.tables.contains(&logical_name, id) {
            return Err(CrmError::does_not_exist(&logical_name, id));
        }
        self.delete_existing(&logical_name, id)
    }

    /// Delete a record when present. Returns whether anything was deleted.
    pub fn delete_if_exists(&mut self, target: &EntityReference) -> CrmResult<bool> {
        let logical_name = target.logical_name.to_lowercase();
        let def = self.entry(&logical_name);
        self.check_writable("Delete", &def)?;
        let id = match self.resolve_id(target) {
            Ok(id) => id,
            Err(CrmError::KeyValuesNotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        if !self.tables.contains(&logical_name, id) {
            return Ok(false);
        }
        self.delete_existing(&logical_name, id)?;
        Ok(true)
    }

    fn delete_existing(&mut self, logical_name: &str, id: Uuid) -> CrmResult<()> {
        let doomed = self.plan_delete(logical_name, id);
        let planned: FxHashSet<Uuid> = doomed.iter().map(|(_, id)| *id).collect();
        for (name, id) in &doomed {
            self.check_restrict(name, *id, &planned)?;
        }
        for (name, id) in &doomed {
            self.remove_one(name, *id, &planned);
        }
        debug!(entity = %logical_name, id = %id, removed = doomed.len(), "record deleted");
        Ok(())
    }

    /// Every record a delete removes, the target first.
    fn plan_delete(&self, logical_name: &str, id: Uuid) -> Doomed {
        let mut doomed = vec![(logical_name.to_string(), id)];
        let mut seen: FxHashSet<Uuid> = FxHashSet::default();
        seen.insert(id);
        let mut cursor = 0;
        while cursor < doomed.len() {
            let (name, parent) = doomed[cursor].clone();
            cursor += 1;
            for child in self.children(&name, parent, CascadePolicy::Cascade) {
                if seen.insert(child.1) {
                    doomed.push(child);
                }
            }
        }
        doomed
    }

    /// Records referencing `(logical_name, id)` through one-to-many
    /// relationships with the given policy.
    fn children(&self, logical_name: &str, id: Uuid, policy: CascadePolicy) -> Vec<(String, Uuid)> {
        self.one_to_many_from(logical_name, policy)
            .into_iter()
            .flat_map(|(entity, attribute)| {
                self.tables
                    .iter(&entity)
                    .filter(|r| {
                        r.reference(&attribute)
                            .map(|re| re.id == id && re.logical_name == logical_name)
                            .unwrap_or(false)
                    })
                    .map(|r| (entity.clone(), r.id))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn one_to_many_from(&self, logical_name: &str, policy: CascadePolicy) -> Vec<(String, String)> {
        self.catalog
            .relationships()
            .filter_map(|rel| match rel {
                RelationshipDef::OneToMany(o)
                    if o.referenced_entity == logical_name && o.cascade_delete == policy =>
                {
                    Some((o.referencing_entity.clone(), o.referencing_attribute.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn check_restrict(&self, logical_name: &str, id: Uuid, planned: &FxHashSet<Uuid>) -> CrmResult<()> {
        let blocked = self
            .children(logical_name, id, CascadePolicy::Restrict)
            .iter()
            .any(|(_, child)| !planned.contains(child));
        if blocked {
            return Err(CrmError::DeleteRestricted);
        }
        Ok(())
    }

    fn remove_one(&mut self, logical_name: &str, id: Uuid, planned: &FxHashSet<Uuid>) {
        if self.catalog.is_activity(logical_name) {
            self.delete_parties(id, None);
        }
        self.remove_intersect_rows(logical_name, id);
        self.remove_grants(id);

        for (entity, child) in self.children(logical_name, id, CascadePolicy::RemoveLink) {
            if planned.contains(&child) {
                continue;
            }
            self.clear_links(&entity, child, logical_name, id);
        }

        self.tables.delete(logical_name, id);
    }

    fn remove_intersect_rows(&mut self, logical_name: &str, id: Uuid) {
        let mut targets: Vec<(String, String)> = Vec::new();
        for rel in self.catalog.relationships() {
            if let RelationshipDef::ManyToMany(m) = rel {
                if m.entity1 == logical_name {
                    targets.push((m.intersect_entity.clone(), m.entity1_attribute.clone()));
                }
                if m.entity2 == logical_name {
                    targets.push((m.intersect_entity.clone(), m.entity2_attribute.clone()));
                }
            }
        }
        for (intersect, attribute) in targets {
            let rows: Vec<Uuid> = self
                .tables
                .iter(&intersect)
                .filter(|r| r.guid(&attribute) == Some(id))
                .map(|r| r.id)
                .collect();
            for row in rows {
                self.tables.delete(&intersect, row);
                debug!(intersect = %intersect, id = %row, "intersect row removed");
            }
        }
    }

    fn remove_grants(&mut self, id: Uuid) {
        let grants: Vec<Uuid> = self
            .tables
            .iter(ACCESS_GRANT)
            .filter(|r| r.guid("objectid") == Some(id))
            .map(|r| r.id)
            .collect();
        for grant in grants {
            self.tables.delete(ACCESS_GRANT, grant);
        }
    }

    /// Null every lookup on a child that points at the removed parent.
    fn clear_links(&mut self, entity: &str, child: Uuid, parent_name: &str, parent: Uuid) {
        let Some(mut record) = self.tables.get(entity, child) else {
            return;
        };
        let linked: Vec<String> = record
            .attributes
            .iter()
            .filter(|(_, v)| {
                v.as_reference()
                    .map(|r| r.id == parent && r.logical_name == parent_name)
                    .unwrap_or(false)
            })
            .map(|(name, _)| name.clone())
            .collect();
        for attribute in &linked {
            record.set(attribute.clone(), Value::Null);
            record.formatted_values.remove(attribute);
        }
        if let Err(e) = self.tables.put(record) {
            warn!(entity = %entity, id = %child, error = %e, "remove-link cascade failed");
        }
    }
}
