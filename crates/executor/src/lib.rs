//! Request layer for memcrm
//!
//! Every request the engine supports is a [`Command`]; running it through the
//! [`Executor`] yields an [`Output`] or an [`Error`]. The [`Crm`] facade wraps
//! the executor with one typed method per request.
//!
//! # Example
//!
//! ```ignore
//! use memcrm_executor::Crm;
//! use memcrm_core::Record;
//!
//! let crm = Crm::new();
//! let id = crm.create(Record::new("account").with("name", "Contoso"))?;
//! ```

#![warn(missing_docs)]

mod api;
mod command;
mod convert;
mod error;
mod executor;
mod handlers;
mod output;

pub use api::Crm;
pub use command::Command;
pub use convert::convert_result;
pub use error::Error;
pub use executor::Executor;
pub use output::{Output, ResponseItem};

/// Result type for executor operations.
pub type Result<T> = std::result::Result<T, Error>;
