//! Canonical marshaller.
//!
//! Writes a model tree in the current schema only. Old documents reach the
//! current shape by being parsed, applied and written again.
//!
//! The writer cannot take back an element once it is open, so every optional
//! container checks its subtree before writing its start tag. Collections whose
//! tree order carries no meaning are sorted first so output is byte-stable.

mod access;
mod audit;
mod realm;

use std::sync::Arc;

use crate::descriptor::{DescriptorRegistry, ResourceKind};
use crate::error::MarshalError;
use crate::model::{DocumentContext, ModelNode, SchemaVersion};
use crate::xml::XmlWriter;

/// Marshaller settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Spaces per nesting level; 0 writes a single line.
    pub indent: usize,
    /// Whether to start with `<?xml version="1.0" encoding="UTF-8"?>`.
    pub xml_declaration: bool,
    /// Selects the root element and the host-only sections.
    pub context: DocumentContext,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            xml_declaration: true,
            context: DocumentContext::Standalone,
        }
    }
}

impl MarshalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_xml_declaration(mut self, xml_declaration: bool) -> Self {
        self.xml_declaration = xml_declaration;
        self
    }

    pub fn with_context(mut self, context: DocumentContext) -> Self {
        self.context = context;
        self
    }
}

/// Writes model trees as current-schema documents.
#[derive(Debug, Clone)]
pub struct ManagementMarshaller {
    registry: Arc<DescriptorRegistry>,
    options: MarshalOptions,
}

impl ManagementMarshaller {
    pub fn new(registry: Arc<DescriptorRegistry>) -> Self {
        Self::with_options(registry, MarshalOptions::default())
    }

    pub fn with_options(registry: Arc<DescriptorRegistry>, options: MarshalOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &MarshalOptions {
        &self.options
    }

    /// Writes a whole document. `root` is the node the management resources
    /// hang under (the tree built by applying a parse with the default base
    /// address).
    pub fn marshal_document(&self, root: &ModelNode) -> Result<String, MarshalError> {
        let mut writer = XmlWriter::new(self.options.indent);
        if self.options.xml_declaration {
            writer.write_declaration()?;
        }
        writer.start_element(self.options.context.root_element())?;
        writer.write_attribute("xmlns", SchemaVersion::CURRENT.uri())?;
        if let Some(management) = root.get_path(&["core-service", "management"]) {
            self.write_management(management, &mut writer)?;
        }
        writer.end_element()?;
        writer.finish()
    }

    /// Writes `<management>` for the `core-service=management` resource.
    pub fn write_management(
        &self,
        management: &ModelNode,
        writer: &mut XmlWriter,
    ) -> Result<(), MarshalError> {
        let mut cx = self.cx(writer);
        let audit = management.get_path(&["access", "audit"]);
        let authorization = management
            .get_path(&["access", "authorization"])
            .filter(|node| access::has_access_control(&cx, node));
        let interfaces = InterfaceSet::collect(cx.context, management);
        if !management.has_children("security-realm")
            && !management.has_children("ldap-connection")
            && audit.is_none()
            && interfaces.is_empty()
            && authorization.is_none()
        {
            return Ok(());
        }

        cx.start("management")?;
        if management.has_children("security-realm") {
            realm::write_security_realms(&mut cx, management)?;
        }
        if management.has_children("ldap-connection") {
            write_outbound_connections(&mut cx, management)?;
        }
        if let Some(audit) = audit {
            audit::write_audit_log(&mut cx, audit)?;
        }
        write_management_interfaces(&mut cx, &interfaces)?;
        if let Some(authorization) = authorization {
            access::write_access_control(&mut cx, authorization)?;
        }
        cx.end()
    }

    /// Writes `<audit-log>` for the `access=audit` resource.
    pub fn write_audit_log(
        &self,
        audit: &ModelNode,
        writer: &mut XmlWriter,
    ) -> Result<(), MarshalError> {
        audit::write_audit_log(&mut self.cx(writer), audit)
    }

    fn cx<'s, 'w>(&'s self, writer: &'w mut XmlWriter) -> MarshalCx<'s, 'w> {
        MarshalCx {
            registry: &self.registry,
            writer,
            context: self.options.context,
        }
    }
}

/// Writer plus the registry the attribute tokens come from.
pub(crate) struct MarshalCx<'r, 'w> {
    registry: &'r DescriptorRegistry,
    writer: &'w mut XmlWriter,
    pub(crate) context: DocumentContext,
}

impl MarshalCx<'_, '_> {
    pub(crate) fn start(&mut self, name: &str) -> Result<(), MarshalError> {
        self.writer.start_element(name)
    }

    pub(crate) fn empty(&mut self, name: &str) -> Result<(), MarshalError> {
        self.writer.empty_element(name)
    }

    pub(crate) fn end(&mut self) -> Result<(), MarshalError> {
        self.writer.end_element()
    }

    pub(crate) fn attribute(&mut self, name: &str, value: &str) -> Result<(), MarshalError> {
        self.writer.write_attribute(name, value)
    }

    /// Writes every marshallable attribute of `kind` in registry order.
    pub(crate) fn attributes(
        &mut self,
        kind: ResourceKind,
        node: &ModelNode,
    ) -> Result<(), MarshalError> {
        for descriptor in self.registry.attributes(kind) {
            descriptor.marshal_as_attribute(node, self.writer)?;
        }
        Ok(())
    }

    /// Writes the named attributes of `kind`, in the order given.
    pub(crate) fn selected(
        &mut self,
        kind: ResourceKind,
        node: &ModelNode,
        names: &[&str],
    ) -> Result<(), MarshalError> {
        for name in names {
            if let Some(descriptor) = self.registry.attribute(kind, name) {
                descriptor.marshal_as_attribute(node, self.writer)?;
            }
        }
        Ok(())
    }

    /// Writes an attribute of `kind` as a text element.
    pub(crate) fn element(
        &mut self,
        kind: ResourceKind,
        node: &ModelNode,
        name: &str,
    ) -> Result<(), MarshalError> {
        if let Some(descriptor) = self.registry.attribute(kind, name) {
            descriptor.marshal_as_element(node, self.writer)?;
        }
        Ok(())
    }

    /// Returns true if any attribute of `kind` would be written for `node`.
    pub(crate) fn has_marshallable(&self, kind: ResourceKind, node: &ModelNode) -> bool {
        self.registry
            .attributes(kind)
            .iter()
            .any(|descriptor| descriptor.is_marshallable(node))
    }
}

fn write_outbound_connections(
    cx: &mut MarshalCx<'_, '_>,
    management: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start("outbound-connections")?;
    for (name, connection) in children(management, "ldap-connection") {
        cx.empty("ldap")?;
        cx.attribute("name", name)?;
        cx.attributes(ResourceKind::LdapConnection, connection)?;
    }
    cx.end()
}

/// Iterates the resources of one child type.
pub(crate) fn children<'a>(
    node: &'a ModelNode,
    child_type: &'static str,
) -> impl Iterator<Item = (&'a str, &'a ModelNode)> {
    node.get(child_type).into_iter().flat_map(|resources| resources.children())
}

/// The management interfaces that will be written for a document context.
struct InterfaceSet<'a> {
    native: Option<&'a ModelNode>,
    http: Option<&'a ModelNode>,
    remoting: bool,
}

impl<'a> InterfaceSet<'a> {
    /// Domain documents carry no interfaces, and hosts have no remoting one.
    fn collect(context: DocumentContext, management: &'a ModelNode) -> Self {
        let interfaces = management
            .get("management-interface")
            .filter(|_| context.allows_management_interfaces());
        let interface = |name| interfaces.and_then(|i| i.get(name)).filter(|n| n.is_defined());
        Self {
            native: interface("native-interface"),
            http: interface("http-interface"),
            remoting: context != DocumentContext::Host
                && interface("native-remoting-interface").is_some(),
        }
    }

    fn is_empty(&self) -> bool {
        self.native.is_none() && self.http.is_none() && !self.remoting
    }
}

fn write_management_interfaces(
    cx: &mut MarshalCx<'_, '_>,
    interfaces: &InterfaceSet<'_>,
) -> Result<(), MarshalError> {
    if interfaces.is_empty() {
        return Ok(());
    }
    cx.start("management-interfaces")?;
    if let Some(native) = interfaces.native {
        cx.start("native-interface")?;
        cx.selected(
            ResourceKind::NativeInterface,
            native,
            &["security-realm", "sasl-protocol", "server-name"],
        )?;
        cx.empty("socket")?;
        cx.selected(ResourceKind::NativeInterface, native, &["interface", "port"])?;
        cx.end()?;
    }
    if let Some(http) = interfaces.http {
        cx.start("http-interface")?;
        cx.selected(
            ResourceKind::HttpInterface,
            http,
            &[
                "security-realm",
                "console-enabled",
                "http-upgrade-enabled",
                "sasl-protocol",
                "server-name",
            ],
        )?;
        cx.empty("socket")?;
        cx.selected(ResourceKind::HttpInterface, http, &["interface", "port", "secure-port"])?;
        cx.end()?;
    }
    if interfaces.remoting {
        cx.empty("native-remoting-interface")?;
    }
    cx.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::ModelApplier;
    use crate::model::{Address, OperationsBuilder};

    fn marshaller(options: MarshalOptions) -> ManagementMarshaller {
        ManagementMarshaller::with_options(Arc::new(DescriptorRegistry::standard()), options)
    }

    fn compact() -> MarshalOptions {
        MarshalOptions::new().with_indent(0).with_xml_declaration(false)
    }

    fn tree(ops: &[crate::model::Operation]) -> ModelNode {
        ModelApplier::new(Arc::new(DescriptorRegistry::standard()))
            .apply(ops)
            .unwrap()
    }

    fn management() -> Address {
        Address::root().append("core-service", "management")
    }

    #[test]
    fn test_empty_tree() {
        let xml = marshaller(compact()).marshal_document(&ModelNode::object()).unwrap();
        assert_eq!(xml, r#"<server xmlns="urn:jboss:domain:2.1"/>"#);
    }

    #[test]
    fn test_declaration_and_root() {
        let options = MarshalOptions::new()
            .with_indent(0)
            .with_context(DocumentContext::Domain);
        let xml = marshaller(options).marshal_document(&ModelNode::object()).unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><domain xmlns="urn:jboss:domain:2.1"/>"#
        );
    }

    #[test]
    fn test_interfaces_and_connections() {
        let ops = OperationsBuilder::new(management())
            .add(&[("ldap-connection", "ldap")], |a| {
                a.string("url", "ldap://localhost").string("referrals", "FOLLOW")
            })
            .add(&[("management-interface", "native-interface")], |a| {
                a.string("security-realm", "ManagementRealm")
                    .string("interface", "management")
                    .int("port", 9999)
            })
            .add(&[("management-interface", "native-remoting-interface")], |a| a)
            .build();
        let xml = marshaller(compact()).marshal_document(&tree(&ops)).unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<server xmlns="urn:jboss:domain:2.1"><management>"#,
                r#"<outbound-connections><ldap name="ldap" url="ldap://localhost" referrals="FOLLOW"/></outbound-connections>"#,
                r#"<management-interfaces>"#,
                r#"<native-interface security-realm="ManagementRealm"><socket interface="management" port="9999"/></native-interface>"#,
                r#"<native-remoting-interface/>"#,
                r#"</management-interfaces>"#,
                r#"</management></server>"#
            )
        );
    }

    #[test]
    fn test_domain_skips_interfaces() {
        let ops = OperationsBuilder::new(management())
            .add(&[("management-interface", "http-interface")], |a| {
                a.string("interface", "management")
            })
            .build();
        let xml = marshaller(compact().with_context(DocumentContext::Domain))
            .marshal_document(&tree(&ops))
            .unwrap();
        assert_eq!(xml, r#"<domain xmlns="urn:jboss:domain:2.1"/>"#);
    }

    #[test]
    fn test_host_drops_remoting_interface() {
        let ops = OperationsBuilder::new(management())
            .add(&[("management-interface", "native-remoting-interface")], |a| a)
            .build();
        let tree = tree(&ops);
        let host = marshaller(compact().with_context(DocumentContext::Host))
            .marshal_document(&tree)
            .unwrap();
        assert_eq!(host, r#"<host xmlns="urn:jboss:domain:2.1"/>"#);

        let server = marshaller(compact()).marshal_document(&tree).unwrap();
        assert!(server.contains("<native-remoting-interface/>"), "{server}");
    }

    #[test]
    fn test_host_keeps_native_without_remoting() {
        let ops = OperationsBuilder::new(management())
            .add(&[("management-interface", "native-interface")], |a| {
                a.string("interface", "management").int("port", 9999)
            })
            .add(&[("management-interface", "native-remoting-interface")], |a| a)
            .build();
        let xml = marshaller(compact().with_context(DocumentContext::Host))
            .marshal_document(&tree(&ops))
            .unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<host xmlns="urn:jboss:domain:2.1"><management><management-interfaces>"#,
                r#"<native-interface><socket interface="management" port="9999"/></native-interface>"#,
                r#"</management-interfaces></management></host>"#
            )
        );
    }

    #[test]
    fn test_policy_only_access_control_omits_management() {
        let ops = OperationsBuilder::new(management())
            .write_attribute(
                &[("access", "authorization")],
                "permission-combination-policy",
                "rejecting",
            )
            .build();
        let xml = marshaller(compact()).marshal_document(&tree(&ops)).unwrap();
        assert_eq!(xml, r#"<server xmlns="urn:jboss:domain:2.1"/>"#);
    }
}
