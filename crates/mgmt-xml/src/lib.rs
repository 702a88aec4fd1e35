//! Versioned parser and canonical marshaller for management-model XML.
//!
//! This crate reads the `<management>` section of a server, host or
//! domain-wide configuration document in any supported schema version and
//! turns it into an ordered list of add/write-attribute operations. It also
//! writes a model tree back out in the current schema.
//!
//! # Overview
//!
//! - **Versioned reading**: each section looks up the grammar family for the
//!   document's namespace, so old documents keep parsing exactly as they did
//! - **Canonical writing**: only the current schema is ever written; old
//!   documents are upgraded by parse, apply, marshal
//! - **Replayable output**: operations are plain data and replay into a
//!   [`ModelNode`] tree with [`ModelApplier`]
//!
//! # Quick Start
//!
//! ```rust
//! use mgmt_xml::{apply_operations, marshal_document, parse_document, MarshalOptions};
//!
//! let xml = r#"<server xmlns="urn:jboss:domain:1.0">
//!   <management>
//!     <security-realms>
//!       <security-realm name="ManagementRealm">
//!         <authentication>
//!           <properties path="mgmt-users.properties"/>
//!         </authentication>
//!       </security-realm>
//!     </security-realms>
//!   </management>
//! </server>"#;
//!
//! let parsed = parse_document(xml).unwrap();
//! assert_eq!(parsed.operations.len(), 3);
//!
//! let tree = apply_operations(&parsed.operations).unwrap();
//! let options = MarshalOptions::new().with_indent(0).with_xml_declaration(false);
//! let current = marshal_document(&tree, &options).unwrap();
//! assert!(current.contains(r#"<local default-user="$local"/>"#));
//! assert!(current.contains(r#"plain-text="true""#));
//! ```
//!
//! # Modules
//!
//! - [`model`]: value tree, addresses, operations, schema versions
//! - [`descriptor`]: attribute descriptors and the resource registry
//! - [`xml`]: token reader and writer
//! - [`parse`]: the versioned parser
//! - [`marshal`]: the current-schema marshaller
//! - [`apply`]: operation replay
//! - [`error`]: error types
//! - [`limits`]: resource limits enforced while reading
//!
//! # Security
//!
//! The reader is safe to point at untrusted input:
//! - Document size, nesting depth and attribute sizes are bounded
//! - Unknown elements, attributes and namespaces are rejected, never skipped

use std::sync::Arc;

use lazy_static::lazy_static;

pub mod apply;
pub mod descriptor;
pub mod error;
pub mod limits;
pub mod marshal;
pub mod model;
pub mod parse;
pub mod xml;

// Re-export commonly used types at crate root
pub use apply::ModelApplier;
pub use descriptor::{DescriptorRegistry, ResourceKind};
pub use error::{ApplyError, ErrorKind, Location, MarshalError, ParseError};
pub use marshal::{ManagementMarshaller, MarshalOptions};
pub use model::{
    derive_alias, Address, DocumentContext, ModelNode, Operation, OperationKind,
    OperationsBuilder, ParsedDocument, PrincipalType, SchemaVersion,
};
pub use parse::{ManagementParser, ParseOptions};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

lazy_static! {
    static ref STANDARD_REGISTRY: Arc<DescriptorRegistry> =
        Arc::new(DescriptorRegistry::standard());
}

/// Returns the shared standard registry.
pub fn standard_registry() -> Arc<DescriptorRegistry> {
    Arc::clone(&STANDARD_REGISTRY)
}

/// Parses a whole document with default options.
pub fn parse_document(xml: &str) -> Result<ParsedDocument, ParseError> {
    ManagementParser::new(standard_registry()).parse_document(xml)
}

/// Writes a model tree as a current-schema document.
pub fn marshal_document(root: &ModelNode, options: &MarshalOptions) -> Result<String, MarshalError> {
    ManagementMarshaller::with_options(standard_registry(), *options).marshal_document(root)
}

/// Replays operations into a fresh model tree.
pub fn apply_operations(ops: &[Operation]) -> Result<ModelNode, ApplyError> {
    ModelApplier::new(standard_registry()).apply(ops)
}
