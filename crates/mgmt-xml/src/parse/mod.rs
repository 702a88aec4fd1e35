//! Schema-versioned parser.
//!
//! Every section with a history of grammar changes has one entry point that
//! looks up a [`SectionGrammar`] for the negotiated [`SchemaVersion`]. Versions
//! sharing a grammar share an implementation; a family differing from its
//! predecessor gets its own type so each historical grammar stays exact.
//!
//! Parsing produces a flat list of [`Operation`]s in document order, except
//! for cache resources, which are appended after the resource that owns them.

mod access;
mod audit;
mod context;
mod interfaces;
mod ldap;
mod management;
mod realm;

use std::sync::Arc;

use log::debug;

use crate::descriptor::DescriptorRegistry;
use crate::error::ParseError;
use crate::model::{Address, DocumentContext, Operation, ParsedDocument, SchemaVersion};
use crate::xml::{StartElement, XmlReader};

pub(crate) use context::ParseCx;
use context::{unexpected_element, Singles};

/// One version family of a document section.
pub(crate) trait SectionGrammar: Sync {
    /// The versions this grammar covers, for diagnostics.
    fn family(&self) -> &'static str;

    /// Parses `element` (already read) and its content, anchoring resources
    /// at `base`.
    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError>;
}

/// Looks up a family and logs the choice.
pub(crate) fn select(
    section: &str,
    version: SchemaVersion,
    lookup: fn(SchemaVersion) -> &'static dyn SectionGrammar,
) -> &'static dyn SectionGrammar {
    let grammar = lookup(version);
    debug!(
        "{section}: schema {version} uses the {} grammar",
        grammar.family()
    );
    grammar
}

/// Parser settings.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Expected document context. `None` infers it from the root element.
    pub context: Option<DocumentContext>,
    /// Address the management resources are anchored under.
    pub base_address: Address,
    /// Fail if `<management-interfaces>` (or its native interface) is absent.
    /// Always on for host documents.
    pub require_native_interface: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: DocumentContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_base_address(mut self, base_address: Address) -> Self {
        self.base_address = base_address;
        self
    }

    pub fn require_native_interface(mut self, require: bool) -> Self {
        self.require_native_interface = require;
        self
    }
}

/// Parses management configuration documents into operation lists.
///
/// The parser holds no per-document state, so one instance can be shared
/// across threads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mgmt_xml::{DescriptorRegistry, ManagementParser};
///
/// let parser = ManagementParser::new(Arc::new(DescriptorRegistry::standard()));
/// let doc = parser
///     .parse_document(
///         r#"<server xmlns="urn:jboss:domain:2.1">
///              <management>
///                <security-realms><security-realm name="ManagementRealm"/></security-realms>
///              </management>
///            </server>"#,
///     )
///     .unwrap();
/// assert_eq!(doc.operations.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ManagementParser {
    registry: Arc<DescriptorRegistry>,
    options: ParseOptions,
}

impl ManagementParser {
    pub fn new(registry: Arc<DescriptorRegistry>) -> Self {
        Self::with_options(registry, ParseOptions::default())
    }

    pub fn with_options(registry: Arc<DescriptorRegistry>, options: ParseOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses a whole `<server>`, `<host>` or `<domain>` document.
    pub fn parse_document(&self, xml: &str) -> Result<ParsedDocument, ParseError> {
        let mut reader = XmlReader::new(xml)?;
        let root = reader.next_root()?;
        let version = negotiate(&root)?;
        let context = self.root_context(&root)?;
        debug!("parsing <{}> document, schema {version}", root.name);

        let mut cx = self.cx(reader, version, context);
        cx.read_attributes(&root, &["name"], &[], |_| Ok(()))?;
        let mut singles = Singles::new();
        while let Some(child) = cx.next_child(&root)? {
            match child.name.as_str() {
                "management" => {
                    singles.check(&child)?;
                    management::parse_management(&mut cx, &child, &self.options.base_address)?;
                }
                _ => return Err(unexpected_element(&child)),
            }
        }
        let operations = cx.finish()?;
        Ok(ParsedDocument {
            version,
            context,
            operations,
        })
    }

    /// Parses a standalone `<management>` fragment.
    pub fn parse_management(&self, xml: &str) -> Result<Vec<Operation>, ParseError> {
        let mut reader = XmlReader::new(xml)?;
        let root = reader.next_root()?;
        if root.name != "management" {
            return Err(unexpected_element(&root));
        }
        let version = negotiate(&root)?;
        let mut cx = self.cx(reader, version, self.options.context.unwrap_or_default());
        management::parse_management(&mut cx, &root, &self.options.base_address)?;
        cx.finish()
    }

    /// Parses a standalone `<audit-log>` fragment. Resources are anchored
    /// under `core-service=management` of the base address.
    pub fn parse_audit_log(&self, xml: &str) -> Result<Vec<Operation>, ParseError> {
        let mut reader = XmlReader::new(xml)?;
        let root = reader.next_root()?;
        if root.name != "audit-log" {
            return Err(unexpected_element(&root));
        }
        let version = negotiate(&root)?;
        let mut cx = self.cx(reader, version, self.options.context.unwrap_or_default());
        let management = management::management_address(&self.options.base_address);
        audit::parse_audit_log(&mut cx, &root, &management)?;
        cx.finish()
    }

    fn cx<'s, 'a>(
        &'s self,
        reader: XmlReader<'a>,
        version: SchemaVersion,
        context: DocumentContext,
    ) -> ParseCx<'s, 'a> {
        let mut cx = ParseCx::new(reader, &self.registry, version, context);
        cx.require_native_interface =
            self.options.require_native_interface || context == DocumentContext::Host;
        cx
    }

    fn root_context(&self, root: &StartElement) -> Result<DocumentContext, ParseError> {
        let found = DocumentContext::from_root_element(&root.name);
        match (self.options.context, found) {
            (Some(expected), Some(found)) if expected == found => Ok(found),
            (None, Some(found)) => Ok(found),
            _ => Err(unexpected_element(root)),
        }
    }
}

/// Picks the schema version from the namespace of the root element.
fn negotiate(root: &StartElement) -> Result<SchemaVersion, ParseError> {
    root.namespace
        .as_deref()
        .and_then(SchemaVersion::from_uri)
        .ok_or_else(|| ParseError::UnknownNamespace {
            uri: root.namespace.clone(),
            location: root.location,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parser() -> ManagementParser {
        ManagementParser::new(Arc::new(DescriptorRegistry::standard()))
    }

    #[test]
    fn test_empty_management() {
        let doc = parser()
            .parse_document(r#"<server xmlns="urn:jboss:domain:1.4"><management/></server>"#)
            .unwrap();
        assert_eq!(doc.version, SchemaVersion::V1_4);
        assert_eq!(doc.context, DocumentContext::Standalone);
        assert!(doc.operations.is_empty());
    }

    #[test]
    fn test_root_without_management() {
        let doc = parser()
            .parse_document(r#"<domain xmlns="urn:jboss:domain:2.0" name="d"/>"#)
            .unwrap();
        assert_eq!(doc.context, DocumentContext::Domain);
        assert!(doc.operations.is_empty());
    }

    #[test]
    fn test_unknown_namespace() {
        let err = parser()
            .parse_document(r#"<server xmlns="urn:jboss:domain:9.9"><management/></server>"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownNamespace);

        let err = parser()
            .parse_document("<server><management/></server>")
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownNamespace { uri: None, .. }));
    }

    #[test]
    fn test_child_in_wrong_namespace() {
        let err = parser()
            .parse_document(
                r#"<server xmlns="urn:jboss:domain:2.1"><management xmlns="urn:jboss:domain:2.0"/></server>"#,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedNamespace);
    }

    #[test]
    fn test_duplicate_management() {
        let err = parser()
            .parse_document(
                r#"<server xmlns="urn:jboss:domain:2.1"><management/><management/></server>"#,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateElement);
    }

    #[test]
    fn test_unknown_root() {
        let err = parser()
            .parse_document(r#"<standalone xmlns="urn:jboss:domain:2.1"/>"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedElement);
    }

    #[test]
    fn test_context_mismatch() {
        let parser = ManagementParser::with_options(
            Arc::new(DescriptorRegistry::standard()),
            ParseOptions::new().with_context(DocumentContext::Host),
        );
        let err = parser
            .parse_document(r#"<server xmlns="urn:jboss:domain:2.1"/>"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedElement);
    }

    #[test]
    fn test_base_address() {
        let parser = ManagementParser::with_options(
            Arc::new(DescriptorRegistry::standard()),
            ParseOptions::new().with_base_address(Address::root().append("host", "master")),
        );
        let ops = parser
            .parse_management(
                r#"<management xmlns="urn:jboss:domain:2.1">
                     <security-realms><security-realm name="R"/></security-realms>
                   </management>"#,
            )
            .unwrap();
        assert_eq!(
            ops[0].address.to_string(),
            "/host=master/core-service=management/security-realm=R"
        );
    }

    #[test]
    fn test_audit_log_fragment() {
        let ops = parser()
            .parse_audit_log(
                r#"<audit-log xmlns="urn:jboss:domain:2.1">
                     <formatters><json-formatter name="json"/></formatters>
                   </audit-log>"#,
            )
            .unwrap();
        let addresses: Vec<_> = ops.iter().map(|op| op.address.to_string()).collect();
        assert_eq!(
            addresses,
            vec![
                "/core-service=management/access=audit",
                "/core-service=management/access=audit/json-formatter=json",
            ]
        );
    }
}
