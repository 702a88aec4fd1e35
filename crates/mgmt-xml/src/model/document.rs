//! Document-level types.

use std::fmt;

use crate::model::{Operation, SchemaVersion};

/// Which kind of configuration file a document is.
///
/// The context decides a few grammar details: management interfaces are
/// ignored in domain-wide documents, and the audit log `server-logger` only
/// exists in host documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentContext {
    /// A standalone server (`<server>` root).
    #[default]
    Standalone,
    /// A host controller (`<host>` root).
    Host,
    /// The domain-wide configuration (`<domain>` root).
    Domain,
}

impl DocumentContext {
    pub fn root_element(self) -> &'static str {
        match self {
            DocumentContext::Standalone => "server",
            DocumentContext::Host => "host",
            DocumentContext::Domain => "domain",
        }
    }

    pub fn from_root_element(name: &str) -> Option<Self> {
        match name {
            "server" => Some(DocumentContext::Standalone),
            "host" => Some(DocumentContext::Host),
            "domain" => Some(DocumentContext::Domain),
            _ => None,
        }
    }

    pub fn allows_management_interfaces(self) -> bool {
        self != DocumentContext::Domain
    }
}

impl fmt::Display for DocumentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_element())
    }
}

/// The result of parsing a whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub version: SchemaVersion,
    pub context: DocumentContext,
    pub operations: Vec<Operation>,
}
