//! Create path

use memcrm_core::{CrmError, CrmResult, Record, Value};
use tracing::debug;
use uuid::Uuid;

use super::state::{initial_state, write_state};
use super::Transaction;

impl Transaction<'_> {
    /// Create a record and return its id.
    ///
    /// Applies, in order: writable-type check, id assignment, attribute
    /// validation, lookup resolution, required groups, default state, owner
    /// triad, system fields, computed `fullname`, formatted values, the
    /// insert itself and finally any activity-party rows.
    pub fn create(&mut self, record: Record) -> CrmResult<Uuid> {
        self.create_record(record, true)
    }

    /// Create a record for test-data setup.
    ///
    /// Same as [`Transaction::create`] except lookups may point at records
    /// that are seeded later; call [`Transaction::refresh_formatted_values`]
    /// once everything is in.
    pub fn seed(&mut self, record: Record) -> CrmResult<Uuid> {
        self.create_record(record, false)
    }

    /// Recompute the formatted values of a stored record.
    pub fn refresh_formatted_values(&mut self, logical_name: &str, id: Uuid) -> CrmResult<()> {
        let def = self.entry(logical_name);
        let mut record = self.existing(logical_name, id)?;
        self.apply_formatted_values(&def, &mut record);
        self.tables.put(record)?;
        Ok(())
    }

    fn create_record(&mut self, mut record: Record, check_lookups: bool) -> CrmResult<Uuid> {
        record.logical_name = record.logical_name.to_lowercase();
        let def = self.entry(&record.logical_name);
        self.check_writable("Create", &def)?;

        let id = match self.target_id_for_create(&def, &record)? {
            Some(id) => id,
            None => Uuid::new_v4(),
        };
        if self.tables.contains(&def.logical_name, id) {
            return Err(CrmError::DuplicateId);
        }
        record.id = id;
        for (name, value) in std::mem::take(&mut record.key_attributes) {
            record.attributes.entry(name).or_insert(value);
        }

        self.check_attributes(&def, &record)?;
        let parties = self.prepare_parties(&def, &mut record)?;
        if check_lookups {
            self.resolve_lookups(&mut record)?;
        }

        for group in &def.required_groups {
            if !group.attributes.iter().any(|a| record.get_non_null(a).is_some()) {
                return Err(CrmError::RequiredAttributeMissing(group.message.clone()));
            }
        }

        if let Some(state) = initial_state(&def, record.option("statuscode")) {
            write_state(&mut record, state);
        }

        if def.has_owner() {
            let owner = match record.reference("ownerid") {
                Some(owner) => owner.clone(),
                None => self.caller_reference(),
            };
            self.apply_owner(&mut record, owner)?;
        }

        let caller = self.caller_reference();
        record.set(def.primary_id_attribute.clone(), Value::Guid(id));
        record.set("createdon", self.now);
        record.set("modifiedon", self.now);
        record.set("createdby", caller.clone());
        record.set("modifiedby", caller);

        self.apply_full_name(&def, &mut record);
        self.apply_formatted_values(&def, &mut record);

        self.tables.insert(record)?;
        self.insert_parties(parties)?;
        debug!(entity = %def.logical_name, id = %id, "record created");
        Ok(id)
    }

    /// Like `target_id`, but a key that matches no record is not an error.
    fn target_id_for_create(
        &self,
        def: &memcrm_core::EntityDef,
        record: &Record,
    ) -> CrmResult<Option<Uuid>> {
        if record.id.is_nil() && !record.key_attributes.is_empty() {
            return Ok(None);
        }
        self.target_id(def, record)
    }
}
