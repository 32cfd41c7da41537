//! Database: store, catalog, configuration and seeded identity
//!
//! Each `Database` owns its own store and seeds its own default
//! organization, business unit, team and user at construction. Two
//! databases never share state.

use std::sync::Arc;

use memcrm_core::{Catalog, CrmResult, EntityReference, Record};
use memcrm_storage::{RecordStore, Tables};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::rules::{CallerContext, ReadView, Transaction};

/// Ids of the records seeded into every database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Defaults {
    organization: Uuid,
    business_unit: Uuid,
    team: Uuid,
    user: Uuid,
}

impl Defaults {
    fn new() -> Self {
        Self {
            organization: Uuid::new_v4(),
            business_unit: Uuid::new_v4(),
            team: Uuid::new_v4(),
            user: Uuid::new_v4(),
        }
    }
}

/// Builder for a [`Database`].
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    catalog: Option<Arc<Catalog>>,
    config: Option<EngineConfig>,
    user_id: Option<Uuid>,
    business_unit_id: Option<Uuid>,
}

impl DatabaseBuilder {
    /// Use a custom catalog instead of the standard one.
    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use the given configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Fix the id of the seeded calling user.
    pub fn user_id(mut self, id: Uuid) -> Self {
        self.user_id = Some(id);
        self
    }

    /// Fix the id of the seeded business unit.
    pub fn business_unit_id(mut self, id: Uuid) -> Self {
        self.business_unit_id = Some(id);
        self
    }

    /// Build and seed the database.
    pub fn build(self) -> Database {
        let catalog = self.catalog.unwrap_or_else(Catalog::standard);
        let mut defaults = Defaults::new();
        if let Some(user) = self.user_id {
            defaults.user = user;
        }
        if let Some(bu) = self.business_unit_id {
            defaults.business_unit = bu;
        }
        let db = Database {
            store: RecordStore::from_catalog(&catalog),
            catalog,
            config: self.config.unwrap_or_default(),
            defaults,
        };
        db.store.write(|tables| db.seed_defaults(tables));
        info!(user = %defaults.user, business_unit = %defaults.business_unit, "database ready");
        db
    }
}

/// In-memory CRM database.
///
/// # Example
///
/// ```ignore
/// use memcrm_engine::Database;
///
/// let db = Database::new();
/// let id = db.transaction(|txn| txn.create(Record::new("account").with("name", "Contoso")))?;
/// let account = db.get("account", id);
/// ```
#[derive(Debug)]
pub struct Database {
    store: RecordStore,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    defaults: Defaults,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Database with the standard catalog and default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a database.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    /// Schema catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Identity of the seeded default user.
    pub fn caller(&self) -> CallerContext {
        CallerContext {
            user_id: self.defaults.user,
            business_unit_id: self.defaults.business_unit,
            organization_id: self.defaults.organization,
        }
    }

    /// Id of the seeded default team.
    pub fn default_team(&self) -> Uuid {
        self.defaults.team
    }

    /// Run `f` in one write transaction as the default user.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Transaction<'_>) -> CrmResult<R>) -> CrmResult<R> {
        self.transaction_as(&self.caller(), f)
    }

    /// Run `f` in one write transaction as `caller`.
    ///
    /// Nothing is rolled back when `f` fails part way.
    pub fn transaction_as<R>(
        &self,
        caller: &CallerContext,
        f: impl FnOnce(&mut Transaction<'_>) -> CrmResult<R>,
    ) -> CrmResult<R> {
        self.store.write(|tables| {
            let mut txn = Transaction::new(tables, &self.catalog, &self.config, caller);
            f(&mut txn)
        })
    }

    /// Run `f` against a consistent read view as the default user.
    pub fn view<R>(&self, f: impl FnOnce(&ReadView<'_>) -> R) -> R {
        self.view_as(&self.caller(), f)
    }

    /// Run `f` against a consistent read view as `caller`.
    pub fn view_as<R>(&self, caller: &CallerContext, f: impl FnOnce(&ReadView<'_>) -> R) -> R {
        self.store.read(|tables| {
            let view = ReadView::new(tables, &self.catalog, &self.config, caller);
            f(&view)
        })
    }

    /// Clone of a stored record.
    pub fn get(&self, logical_name: &str, id: Uuid) -> Option<Record> {
        self.store.get(&logical_name.to_lowercase(), id)
    }

    /// Clones of every record of a type.
    pub fn scan(&self, logical_name: &str) -> Vec<Record> {
        self.store.scan(&logical_name.to_lowercase())
    }

    /// Replace all data with the seeded defaults plus `records`.
    ///
    /// Records may reference each other in any order; formatted values are
    /// computed once everything is stored.
    pub fn initialize(&self, records: Vec<Record>) -> CrmResult<()> {
        let caller = self.caller();
        self.store.write(|tables| {
            tables.clear();
            self.seed_defaults(tables);
            let mut txn = Transaction::new(tables, &self.catalog, &self.config, &caller);
            let mut seeded = Vec::with_capacity(records.len());
            for record in records {
                let logical_name = record.logical_name.to_lowercase();
                let id = txn.seed(record)?;
                seeded.push((logical_name, id));
            }
            for (logical_name, id) in &seeded {
                txn.refresh_formatted_values(logical_name, *id)?;
            }
            debug!(records = seeded.len(), "database initialized");
            Ok(())
        })
    }

    /// Seed the default business unit, team, user, membership and organization.
    fn seed_defaults(&self, tables: &mut Tables) {
        let d = self.defaults;
        let caller = self.caller();
        let mut txn = Transaction::new(tables, &self.catalog, &self.config, &caller);
        let bu = EntityReference::new("businessunit", d.business_unit);
        let seeds = [
            Record::with_id("businessunit", d.business_unit).with("name", "Default Business Unit"),
            Record::with_id("team", d.team)
                .with("name", "Default Team")
                .with("businessunitid", bu.clone()),
            Record::with_id("systemuser", d.user)
                .with("firstname", "Default")
                .with("lastname", "User")
                .with("domainname", "default.user")
                .with("businessunitid", bu),
            Record::with_id("organization", d.organization).with("name", "Default Organization"),
        ];
        for record in seeds {
            if let Err(e) = txn.seed(record) {
                warn!(error = %e, "default record seeding failed");
            }
        }
        let membership = txn.associate(
            &EntityReference::new("team", d.team),
            "teammembership_association",
            &[EntityReference::new("systemuser", d.user)],
        );
        if let Err(e) = membership {
            warn!(error = %e, "default team membership failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_seeded_per_instance() {
        let a = Database::new();
        let b = Database::new();
        assert_ne!(a.caller().user_id, b.caller().user_id);

        let user = a.get("systemuser", a.caller().user_id).unwrap();
        assert_eq!(user.string("fullname"), Some("Default User"));
        assert_eq!(user.reference("businessunitid").unwrap().id, a.caller().business_unit_id);
        assert!(b.get("systemuser", a.caller().user_id).is_none());
        assert_eq!(a.scan("teammembership").len(), 1);
    }

    #[test]
    fn builder_fixes_identity() {
        let user = Uuid::new_v4();
        let db = Database::builder().user_id(user).build();
        assert_eq!(db.caller().user_id, user);
        assert!(db.get("systemuser", user).is_some());
    }

    #[test]
    fn initialize_replaces_data_and_allows_forward_references() {
        let db = Database::new();
        db.transaction(|txn| txn.create(Record::new("account").with("name", "Old")))
            .unwrap();

        let account = Uuid::new_v4();
        let contact = Uuid::new_v4();
        db.initialize(vec![
            Record::with_id("contact", contact)
                .with("lastname", "Early")
                .with("parentcustomerid", EntityReference::new("account", account)),
            Record::with_id("account", account).with("name", "Late"),
        ])
        .unwrap();

        let accounts = db.scan("account");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].string("name"), Some("Late"));
        let stored = db.get("contact", contact).unwrap();
        assert_eq!(stored.formatted("parentcustomerid"), Some("Late"));
        assert!(db.get("systemuser", db.caller().user_id).is_some());
    }

    #[test]
    fn transaction_does_not_roll_back() {
        let db = Database::new();
        let id = Uuid::new_v4();
        let result = db.transaction(|txn| {
            txn.create(Record::with_id("account", id))?;
            txn.create(Record::with_id("account", id))
        });
        assert!(result.is_err());
        assert!(db.get("account", id).is_some());
    }
}
