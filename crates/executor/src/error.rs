//! Executor error type.
//!
//! Every failure surfaces as one [`Error`] whose `Display` text is the fault
//! message callers match on. Faults raised inside a transactional batch also
//! carry the zero-based index of the failing request.

use memcrm_core::FaultKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Executor error.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum Error {
    /// A request was rejected by the engine.
    #[error("{message}")]
    Fault {
        /// Fault classification
        kind: FaultKind,
        /// Platform fault message
        message: String,
    },

    /// A request inside a batch failed; earlier requests stay applied.
    #[error("{message}")]
    Transaction {
        /// Zero-based position of the failing request
        index: usize,
        /// Classification of the underlying fault
        kind: FaultKind,
        /// Message of the underlying fault
        message: String,
    },

    /// A batch request contained another batch request.
    #[error("Batch requests cannot contain other batch requests.")]
    NestedBatch,

    /// A command or output could not be (de)serialized.
    #[error("Serialization error: {reason}")]
    Serialization {
        /// What went wrong
        reason: String,
    },

    /// Executor invariant broken.
    #[error("Internal error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Fault message without any batch position.
    pub fn message(&self) -> String {
        match self {
            Error::Fault { message, .. } | Error::Transaction { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Position of the failing request inside a batch.
    pub fn index(&self) -> Option<usize> {
        match self {
            Error::Transaction { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Classification of the fault.
    pub fn kind(&self) -> FaultKind {
        match self {
            Error::Fault { kind, .. } | Error::Transaction { kind, .. } => *kind,
            Error::NestedBatch => FaultKind::Validation,
            Error::Serialization { .. } => FaultKind::Validation,
            Error::Internal { .. } => FaultKind::Internal,
        }
    }

    /// Tag this error with its position in a batch.
    pub fn at_index(self, index: usize) -> Self {
        match self {
            Error::Transaction { .. } => self,
            other => Error::Transaction {
                index,
                kind: other.kind(),
                message: other.message(),
            },
        }
    }
}
