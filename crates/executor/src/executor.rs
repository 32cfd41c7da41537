//! Command executor.
//!
//! The executor is the single entry point that runs a [`Command`] against a
//! [`Database`]. Read-only commands run under the shared lock; everything
//! else runs in one write transaction, so a batch is never interleaved with
//! other writers.

use std::sync::Arc;

use memcrm_engine::{CallerContext, Database};
use tracing::debug;

use crate::convert::convert_result;
use crate::handlers;
use crate::{Command, Output, Result};

/// Runs commands against one database.
#[derive(Debug, Clone)]
pub struct Executor {
    db: Arc<Database>,
}

impl Executor {
    /// Executor over `db`.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Underlying database.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run a command as the database's default user.
    pub fn execute(&self, command: Command) -> Result<Output> {
        self.execute_as(&self.db.caller(), command)
    }

    /// Run a command as `caller`.
    pub fn execute_as(&self, caller: &CallerContext, command: Command) -> Result<Output> {
        debug!(command = command.name(), user = %caller.user_id, "executing");
        if command.is_read_only() {
            return self.db.view_as(caller, |view| handlers::dispatch_read(view, command));
        }
        convert_result(
            self.db
                .transaction_as(caller, |txn| Ok(handlers::dispatch(txn, command))),
        )?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memcrm_core::{EntityReference, Record};
    use memcrm_engine::ColumnSet;

    #[test]
    fn test_create_then_retrieve() {
        let executor = Executor::new(Arc::new(Database::new()));
        let id = match executor
            .execute(Command::Create {
                record: Record::new("account").with("name", "Contoso"),
            })
            .unwrap()
        {
            Output::Id(id) => id,
            other => panic!("unexpected output {:?}", other),
        };
        let output = executor
            .execute(Command::Retrieve {
                target: EntityReference::new("account", id),
                columns: ColumnSet::new(&["name"]),
            })
            .unwrap();
        match output {
            Output::Record(record) => assert_eq!(record.string("name"), Some("Contoso")),
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_execute_as_other_caller() {
        let db = Arc::new(Database::new());
        let executor = Executor::new(Arc::clone(&db));
        let mut caller = db.caller();
        caller.user_id = uuid::Uuid::new_v4();
        match executor.execute_as(&caller, Command::WhoAmI).unwrap() {
            Output::WhoAmI { user_id, .. } => assert_eq!(user_id, caller.user_id),
            other => panic!("unexpected output {:?}", other),
        }
    }
}
