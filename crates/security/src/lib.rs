//! Record access rights for memcrm.
//!
//! This crate provides the [`AccessRights`] mask stored on access grants
//! and returned by principal-access lookups.

#![warn(missing_docs)]

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Rights a principal holds on a record.
    ///
    /// Bit values match the platform's access-rights enumeration so masks
    /// round-trip through `accessrightsmask` attributes unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessRights: u32 {
        /// Read the record.
        const READ = 1;
        /// Update the record.
        const WRITE = 2;
        /// Attach other records to this record.
        const APPEND = 4;
        /// Attach this record to other records.
        const APPEND_TO = 16;
        /// Create records.
        const CREATE = 32;
        /// Delete the record.
        const DELETE = 65536;
        /// Share the record.
        const SHARE = 262144;
        /// Assign the record to another owner.
        const ASSIGN = 524288;
    }
}

impl AccessRights {
    /// Rights of a record owner.
    pub fn owner() -> Self {
        Self::all()
    }

    /// Rights from a stored mask, ignoring unknown bits.
    pub fn from_mask(mask: i32) -> Self {
        Self::from_bits_truncate(mask as u32)
    }

    /// Mask as stored in an `accessrightsmask` attribute.
    pub fn mask(&self) -> i32 {
        self.bits() as i32
    }

    /// Platform names of the set rights, e.g. `ReadAccess, WriteAccess`.
    pub fn display_names(&self) -> String {
        if self.is_empty() {
            return "None".to_string();
        }
        let names: Vec<&str> = [
            (Self::READ, "ReadAccess"),
            (Self::WRITE, "WriteAccess"),
            (Self::APPEND, "AppendAccess"),
            (Self::APPEND_TO, "AppendToAccess"),
            (Self::CREATE, "CreateAccess"),
            (Self::DELETE, "DeleteAccess"),
            (Self::SHARE, "ShareAccess"),
            (Self::ASSIGN, "AssignAccess"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_round_trip() {
        let rights = AccessRights::READ | AccessRights::WRITE;
        assert_eq!(rights.mask(), 3);
        assert_eq!(AccessRights::from_mask(3), rights);
    }

    #[test]
    fn unknown_bits_are_dropped() {
        assert_eq!(AccessRights::from_mask(1 | 8), AccessRights::READ);
    }

    #[test]
    fn owner_holds_everything() {
        let owner = AccessRights::owner();
        assert!(owner.contains(AccessRights::DELETE | AccessRights::ASSIGN));
    }

    #[test]
    fn display_names() {
        assert_eq!(AccessRights::empty().display_names(), "None");
        assert_eq!(
            (AccessRights::READ | AccessRights::SHARE).display_names(),
            "ReadAccess, ShareAccess"
        );
    }

    #[test]
    fn serializes() {
        let json = serde_json::to_string(&AccessRights::READ).unwrap();
        let back: AccessRights = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccessRights::READ);
    }
}
