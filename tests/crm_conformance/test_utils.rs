//! Shared helpers for the conformance suite.

use std::sync::{Arc, Once};

use chrono::{DateTime, TimeZone, Utc};
use memcrm::{Crm, Database, EngineConfig, EntityReference, FixedClock, Record, Value};

static TRACING: Once = Once::new();

/// Route engine logs to the test harness output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Fresh service with the standard catalog.
pub fn crm() -> Crm {
    init_tracing();
    Crm::new()
}

/// Service whose clock is frozen at `now`.
pub fn crm_at(now: DateTime<Utc>) -> (Crm, Arc<FixedClock>) {
    init_tracing();
    let clock = Arc::new(FixedClock::new(now));
    let config = EngineConfig::default().with_clock(clock.clone());
    let db = Database::builder().config(config).build();
    (Crm::from_database(Arc::new(db)), clock)
}

/// Noon UTC on the given date.
pub fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

/// Create an account and return a reference to it.
pub fn account(crm: &Crm, name: &str) -> EntityReference {
    let id = crm.create(Record::new("account").with("name", name)).unwrap();
    EntityReference::new("account", id)
}

/// Create a contact and return a reference to it.
pub fn contact(crm: &Crm, first: &str, last: &str) -> EntityReference {
    let id = crm
        .create(
            Record::new("contact")
                .with("firstname", first)
                .with("lastname", last),
        )
        .unwrap();
    EntityReference::new("contact", id)
}

/// Unwrap an aliased value to its inner value.
pub fn inner(record: &Record, attribute: &str) -> Option<Value> {
    record.get(attribute).map(|v| v.unaliased().clone())
}

/// Names of the records, in result order.
pub fn names(records: &[Record], attribute: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| r.string(attribute).unwrap_or_default().to_string())
        .collect()
}
