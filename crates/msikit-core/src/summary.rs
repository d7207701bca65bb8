//! Summary information property set
//!
//! The package container embeds a property set keyed by numeric property
//! identifiers. It is staged through [`crate::store::Package::persist_summary`]
//! so it lands in the same durable write as the tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tables::new_guid;

/// Numeric property identifiers for the summary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SummaryPid {
    Title = 2,
    Subject = 3,
    Author = 4,
    Keywords = 5,
    Comments = 6,
    /// Architecture and locale string, e.g. `Intel;1033`
    Template = 7,
    /// Unique token regenerated for every build
    RevisionNumber = 9,
    PageCount = 14,
    WordCount = 15,
}

impl SummaryPid {
    /// The numeric identifier used in the persisted property set
    pub const fn id(self) -> u16 {
        self as u16
    }
}

/// A summary property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SummaryValue {
    Int(i32),
    Text(String),
}

impl From<i32> for SummaryValue {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<String> for SummaryValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for SummaryValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Editable summary property set for one package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryInformation {
    codepage: u16,
    properties: BTreeMap<u16, SummaryValue>,
}

impl SummaryInformation {
    /// Create an empty property set with the given codepage
    pub fn new(codepage: u16) -> Self {
        Self {
            codepage,
            properties: BTreeMap::new(),
        }
    }

    /// The codepage declared at open time
    pub const fn codepage(&self) -> u16 {
        self.codepage
    }

    /// Set a property, replacing any earlier value
    pub fn set_property(&mut self, pid: SummaryPid, value: impl Into<SummaryValue>) {
        self.properties.insert(pid.id(), value.into());
    }

    /// Current value for a property
    pub fn property(&self, pid: SummaryPid) -> Option<&SummaryValue> {
        self.properties.get(&pid.id())
    }

    /// Number of properties set
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no properties are set
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Generate the per-build revision identifier
pub fn new_revision_token() -> String {
    new_guid()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_property() {
        let mut info = SummaryInformation::new(1252);
        info.set_property(SummaryPid::Author, "example");
        info.set_property(SummaryPid::PageCount, 200);

        assert_eq!(
            info.property(SummaryPid::Author),
            Some(&SummaryValue::Text("example".into()))
        );
        assert_eq!(
            info.property(SummaryPid::PageCount),
            Some(&SummaryValue::Int(200))
        );
        assert!(info.property(SummaryPid::Title).is_none());
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn test_set_property_replaces() {
        let mut info = SummaryInformation::new(1252);
        info.set_property(SummaryPid::Subject, "first");
        info.set_property(SummaryPid::Subject, "second");
        assert_eq!(
            info.property(SummaryPid::Subject),
            Some(&SummaryValue::Text("second".into()))
        );
        assert_eq!(info.len(), 1);
    }

    #[test]
    fn test_revision_tokens_are_unique() {
        assert_ne!(new_revision_token(), new_revision_token());
    }
}
