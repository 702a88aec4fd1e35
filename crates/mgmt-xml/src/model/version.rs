//! Schema versions.

use std::fmt;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

/// A document schema version. Declaration order is version order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaVersion {
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
    V2_0,
    V2_1,
}

lazy_static! {
    static ref BY_URI: FxHashMap<&'static str, SchemaVersion> = SchemaVersion::ALL
        .iter()
        .map(|v| (v.uri(), *v))
        .collect();
}

impl SchemaVersion {
    /// The version the marshaller writes.
    pub const CURRENT: SchemaVersion = SchemaVersion::V2_1;

    /// All known versions, oldest first.
    pub const ALL: [SchemaVersion; 8] = [
        SchemaVersion::V1_0,
        SchemaVersion::V1_1,
        SchemaVersion::V1_2,
        SchemaVersion::V1_3,
        SchemaVersion::V1_4,
        SchemaVersion::V1_5,
        SchemaVersion::V2_0,
        SchemaVersion::V2_1,
    ];

    /// Returns the document namespace URI for this version.
    pub fn uri(self) -> &'static str {
        match self {
            SchemaVersion::V1_0 => "urn:jboss:domain:1.0",
            SchemaVersion::V1_1 => "urn:jboss:domain:1.1",
            SchemaVersion::V1_2 => "urn:jboss:domain:1.2",
            SchemaVersion::V1_3 => "urn:jboss:domain:1.3",
            SchemaVersion::V1_4 => "urn:jboss:domain:1.4",
            SchemaVersion::V1_5 => "urn:jboss:domain:1.5",
            SchemaVersion::V2_0 => "urn:jboss:domain:2.0",
            SchemaVersion::V2_1 => "urn:jboss:domain:2.1",
        }
    }

    /// Looks a version up by namespace URI.
    pub fn from_uri(uri: &str) -> Option<SchemaVersion> {
        BY_URI.get(uri).copied()
    }

    pub fn major(self) -> u8 {
        match self {
            SchemaVersion::V2_0 | SchemaVersion::V2_1 => 2,
            _ => 1,
        }
    }

    pub fn minor(self) -> u8 {
        match self {
            SchemaVersion::V1_0 | SchemaVersion::V2_0 => 0,
            SchemaVersion::V1_1 | SchemaVersion::V2_1 => 1,
            SchemaVersion::V1_2 => 2,
            SchemaVersion::V1_3 => 3,
            SchemaVersion::V1_4 => 4,
            SchemaVersion::V1_5 => 5,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
