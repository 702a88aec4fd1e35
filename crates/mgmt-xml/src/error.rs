//! Error types for parsing, marshalling and applying management configuration.

use std::fmt;

use thiserror::Error;

use crate::model::{Address, SchemaVersion};

/// Position of a token in the source document (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Stable error kinds, one per diagnostic category a tool may want to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// P001: Element not valid for its parent or the active schema version
    UnexpectedElement,
    /// P002: Attribute not valid for its element or the active schema version
    UnexpectedAttribute,
    /// P003: One or more mandatory attributes absent
    MissingRequiredAttribute,
    /// P004: Mandatory child element (or exactly-one-of choice) absent
    MissingRequiredElement,
    /// P005: Singular element appeared more than once
    DuplicateElement,
    /// P006: Attribute value failed type coercion or enumeration check
    InvalidAttributeValue,
    /// P007: Construct recognized but not allowed for this version or context
    UnsupportedForVersion,
    /// P008: Document is not well-formed markup
    MalformedXml,
    /// P009: Document exceeds a reader limit
    LimitExceeded,
}

impl ErrorKind {
    /// Returns the error code string (e.g., "P003").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnexpectedElement => "P001",
            ErrorKind::UnexpectedAttribute => "P002",
            ErrorKind::MissingRequiredAttribute => "P003",
            ErrorKind::MissingRequiredElement => "P004",
            ErrorKind::DuplicateElement => "P005",
            ErrorKind::InvalidAttributeValue => "P006",
            ErrorKind::UnsupportedForVersion => "P007",
            ErrorKind::MalformedXml => "P008",
            ErrorKind::LimitExceeded => "P009",
        }
    }
}

/// Error raised while parsing a configuration document.
///
/// Every variant is terminal: the whole document is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    // === P001: Unexpected element ===
    #[error("[P001] unexpected element <{name}> at {location}")]
    UnexpectedElement { name: String, location: Location },

    #[error("[P001] element <{name}> at {location} is in namespace {found:?}, expected {expected}")]
    UnexpectedNamespace {
        name: String,
        expected: String,
        found: Option<String>,
        location: Location,
    },

    #[error("[P001] unexpected text content {text:?} at {location}")]
    UnexpectedContent { text: String, location: Location },

    // === P002: Unexpected attribute ===
    #[error("[P002] unexpected attribute '{name}' on <{element}> at {location}")]
    UnexpectedAttribute {
        element: String,
        name: String,
        location: Location,
    },

    // === P003: Missing required attribute ===
    #[error("[P003] <{element}> at {location} is missing required attribute(s): {}", .missing.join(", "))]
    MissingRequiredAttribute {
        element: String,
        missing: Vec<String>,
        location: Location,
    },

    // === P004: Missing required element ===
    #[error("[P004] <{parent}> at {location} is missing required element(s): {}", .missing.join(", "))]
    MissingRequiredElement {
        parent: String,
        missing: Vec<String>,
        location: Location,
    },

    #[error("[P004] <{parent}> at {location} must contain exactly one of: {}", .choices.join(", "))]
    MissingOneOf {
        parent: String,
        choices: Vec<String>,
        location: Location,
    },

    // === P005: Duplicate element ===
    #[error("[P005] element <{name}> at {location} may only appear once")]
    DuplicateElement { name: String, location: Location },

    // === P006: Invalid attribute value ===
    #[error("[P006] invalid value {value:?} for '{name}' at {location}: {reason}")]
    InvalidAttributeValue {
        name: String,
        value: String,
        reason: String,
        location: Location,
    },

    // === P007: Unsupported for version or context ===
    #[error("[P007] <{name}> at {location} is not supported {context}")]
    UnsupportedForVersion {
        name: String,
        context: String,
        location: Location,
    },

    #[error("[P007] unknown document namespace {uri:?} at {location}")]
    UnknownNamespace {
        uri: Option<String>,
        location: Location,
    },

    // === P008: Malformed markup ===
    #[error("[P008] unexpected end of document at {location}")]
    UnexpectedEof { location: Location },

    #[error("[P008] malformed document at {location}: {message}")]
    Xml { message: String, location: Location },

    // === P009: Limits ===
    #[error("[P009] {what} {actual} exceeds maximum {max}")]
    LimitExceeded {
        what: &'static str,
        actual: usize,
        max: usize,
    },
}

impl ParseError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::UnexpectedElement { .. }
            | ParseError::UnexpectedNamespace { .. }
            | ParseError::UnexpectedContent { .. } => ErrorKind::UnexpectedElement,
            ParseError::UnexpectedAttribute { .. } => ErrorKind::UnexpectedAttribute,
            ParseError::MissingRequiredAttribute { .. } => ErrorKind::MissingRequiredAttribute,
            ParseError::MissingRequiredElement { .. } | ParseError::MissingOneOf { .. } => {
                ErrorKind::MissingRequiredElement
            }
            ParseError::DuplicateElement { .. } => ErrorKind::DuplicateElement,
            ParseError::InvalidAttributeValue { .. } => ErrorKind::InvalidAttributeValue,
            ParseError::UnsupportedForVersion { .. } | ParseError::UnknownNamespace { .. } => {
                ErrorKind::UnsupportedForVersion
            }
            ParseError::UnexpectedEof { .. } | ParseError::Xml { .. } => ErrorKind::MalformedXml,
            ParseError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
        }
    }

    /// Returns where in the document the error was detected, if known.
    pub fn location(&self) -> Option<Location> {
        match self {
            ParseError::UnexpectedElement { location, .. }
            | ParseError::UnexpectedNamespace { location, .. }
            | ParseError::UnexpectedContent { location, .. }
            | ParseError::UnexpectedAttribute { location, .. }
            | ParseError::MissingRequiredAttribute { location, .. }
            | ParseError::MissingRequiredElement { location, .. }
            | ParseError::MissingOneOf { location, .. }
            | ParseError::DuplicateElement { location, .. }
            | ParseError::InvalidAttributeValue { location, .. }
            | ParseError::UnsupportedForVersion { location, .. }
            | ParseError::UnknownNamespace { location, .. }
            | ParseError::UnexpectedEof { location }
            | ParseError::Xml { location, .. } => Some(*location),
            ParseError::LimitExceeded { .. } => None,
        }
    }

    pub(crate) fn unsupported_in_version(
        name: &str,
        version: SchemaVersion,
        location: Location,
    ) -> Self {
        ParseError::UnsupportedForVersion {
            name: name.to_string(),
            context: format!("in schema version {version}"),
            location,
        }
    }
}

/// Error raised while writing a configuration document.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("failed to write document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("writer produced invalid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("attribute '{name}' written with no open element")]
    MisplacedAttribute { name: String },

    #[error("end_element called with no open element")]
    UnbalancedElement,
}

/// Error raised while replaying operations into a model tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("resource {address} already exists")]
    DuplicateResource { address: Address },

    #[error("resource {address} does not exist")]
    NoSuchResource { address: Address },

    #[error("parent of {address} does not exist")]
    NoSuchParent { address: Address },

    #[error("write-attribute at {address} must carry exactly one attribute, found {count}")]
    MalformedWrite { address: Address, count: usize },
}
