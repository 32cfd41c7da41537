//! Error conversion from engine error types.
//!
//! This module provides conversions from [`CrmError`] to the executor's
//! [`Error`] type.

use crate::Error;
use memcrm_core::{CrmError, CrmResult};

/// Convert a CrmError to an executor Error.
///
/// The fault message is carried verbatim; only engine invariant failures
/// map to `Internal`.
impl From<CrmError> for Error {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::Internal(reason) => Error::Internal { reason },
            other => Error::Fault {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Convert a CrmResult to an executor Result.
pub fn convert_result<T>(result: CrmResult<T>) -> crate::Result<T> {
    result.map_err(Error::from)
}
