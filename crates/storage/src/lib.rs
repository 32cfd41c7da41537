//! Storage layer for memcrm
//!
//! This crate implements the in-memory record store:
//! - RecordStore: per-type tables behind one writer-fair RwLock
//! - Tables: the lock-protected state, exposed to closures for atomic
//!   multi-step operations
//! - KeyIndex: unique alternate-key indexes with case-insensitive text keys

#![warn(missing_docs)]

pub mod index;
pub mod store;

pub use index::{KeyIndex, KeyTuple};
pub use store::{RecordStore, Table, Tables};
