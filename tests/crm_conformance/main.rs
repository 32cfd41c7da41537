//! CRM Conformance Test Suite
//!
//! Exercises the public facade end to end: every request goes through
//! `Crm`, the executor and the engine, against a fresh in-memory database.
//!
//! ## Topics
//!
//! - **null_semantics**: missing attributes and the null operators
//! - **case_insensitivity**: string comparison and logical-name casing
//! - **joins**: alias numbering and inner vs left-outer links
//! - **aggregation**: aggregate validation and correctness
//! - **filters**: operator-safe appends, like patterns, relative dates
//! - **writes**: upsert, cascades, state changes, ownership
//! - **batches**: transactional and continue-on-error batches
//! - **composite**: lead qualification, case and opportunity closing, sharing
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test crm_conformance
//! ```

mod test_utils;

mod aggregation;
mod batches;
mod case_insensitivity;
mod composite;
mod filters;
mod joins;
mod null_semantics;
mod writes;
