//! Resource limits enforced while reading configuration documents.
//!
//! The reader is expected to see documents written by administrators, but
//! nothing stops a caller from handing it arbitrary input, so every buffer it
//! builds is bounded.

/// Maximum size of a configuration document in bytes (16 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum element nesting depth.
///
/// The deepest legal path in the current schema is nine levels
/// (`server/management/security-realms/security-realm/authorization/ldap/
/// group-search/group-to-principal/membership-filter`); the limit leaves room
/// for foreign wrapper elements.
pub const MAX_ELEMENT_DEPTH: usize = 64;

/// Maximum length of a single attribute value or element text in bytes.
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 64 * 1024;

/// Maximum number of attributes on a single element.
pub const MAX_ATTRIBUTES_PER_ELEMENT: usize = 64;
