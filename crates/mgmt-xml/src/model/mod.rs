//! Data model types.
//!
//! This module contains the core types shared by parser, marshaller and
//! applier:
//! - Value tree ([`ModelNode`])
//! - Addresses and operations
//! - Schema versions and document context
//! - Builders (ergonomic construction)

pub mod address;
pub mod alias;
pub mod builder;
pub mod document;
pub mod node;
pub mod op;
pub mod version;

pub use address::Address;
pub use alias::{derive_alias, PrincipalType};
pub use builder::{AttributesBuilder, OperationsBuilder};
pub use document::{DocumentContext, ParsedDocument};
pub use node::ModelNode;
pub use op::{Operation, OperationKind};
pub use version::SchemaVersion;
