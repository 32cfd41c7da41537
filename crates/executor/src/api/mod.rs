//! Typed facade over the executor.
//!
//! [`Crm`] offers one method per [`Command`](crate::Command). Methods are
//! grouped by concern in the submodules; each builds the command, runs it
//! and unwraps the expected [`Output`](crate::Output) variant.

mod records;
mod requests;

use std::sync::Arc;

use memcrm_engine::{CallerContext, Database};

use crate::{Command, Executor, Output, Result};

/// In-memory CRM service.
#[derive(Debug, Clone)]
pub struct Crm {
    executor: Executor,
    caller: Option<CallerContext>,
}

impl Default for Crm {
    fn default() -> Self {
        Self::new()
    }
}

impl Crm {
    /// Service over a fresh database with the standard catalog.
    pub fn new() -> Self {
        Self::from_database(Arc::new(Database::new()))
    }

    /// Service over an existing database.
    pub fn from_database(db: Arc<Database>) -> Self {
        Self {
            executor: Executor::new(db),
            caller: None,
        }
    }

    /// Same database, with requests running as `caller`.
    pub fn as_caller(&self, caller: CallerContext) -> Self {
        Self {
            executor: self.executor.clone(),
            caller: Some(caller),
        }
    }

    /// Underlying executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Underlying database.
    pub fn database(&self) -> &Arc<Database> {
        self.executor.database()
    }

    /// Run any command.
    pub fn execute(&self, command: Command) -> Result<Output> {
        match &self.caller {
            Some(caller) => self.executor.execute_as(caller, command),
            None => self.executor.execute(command),
        }
    }
}
