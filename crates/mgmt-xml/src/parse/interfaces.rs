//! `<management-interfaces>` grammars.

use crate::descriptor::ResourceKind;
use crate::error::ParseError;
use crate::model::{Address, DocumentContext, Operation, SchemaVersion};
use crate::xml::StartElement;

use super::context::{missing_element, unexpected_element, ParseCx, Singles};
use super::SectionGrammar;

pub(crate) fn grammar(version: SchemaVersion) -> &'static dyn SectionGrammar {
    use SchemaVersion::*;
    match version {
        V1_0 => &Interfaces1_0,
        V1_1 | V1_2 | V1_3 | V1_4 | V1_5 | V2_0 => &Interfaces1_1,
        V2_1 => &Interfaces2_1,
    }
}

fn interface_address(management: &Address, name: &str) -> Address {
    management.append("management-interface", name)
}

/// Socket binding given as attributes on the interface element.
struct Interfaces1_0;

impl SectionGrammar for Interfaces1_0 {
    fn family(&self) -> &'static str {
        "1.0"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        cx.require_no_attributes(element)?;
        let mut singles = Singles::new();
        while let Some(child) = cx.next_child(element)? {
            let (kind, allowed) = match child.name.as_str() {
                "native-interface" => (
                    ResourceKind::NativeInterface,
                    &["interface", "port", "secure-port", "security-realm"][..],
                ),
                "http-interface" => (
                    ResourceKind::HttpInterface,
                    &["interface", "port", "secure-port", "max-threads", "security-realm"][..],
                ),
                _ => return Err(unexpected_element(&child)),
            };
            singles.check(&child)?;
            let mut op = Operation::add(interface_address(base, &child.name));
            cx.read_attributes(&child, allowed, &["interface"], |attr| {
                match (kind, attr.name.as_str()) {
                    // Accepted by the old schema but never had an effect.
                    (_, "max-threads") | (ResourceKind::NativeInterface, "secure-port") => Ok(()),
                    (_, other) => cx.set(&child, kind, other, attr, &mut op),
                }
            })?;
            cx.require_no_content(&child)?;
            cx.push(op);
        }
        check_native(cx, element, &singles)
    }
}

/// Socket binding moved into a `<socket>` child.
struct Interfaces1_1;

impl SectionGrammar for Interfaces1_1 {
    fn family(&self) -> &'static str {
        "1.1-2.0"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        socket_interfaces(
            cx,
            element,
            base,
            &["security-realm"],
            &["security-realm", "console-enabled"],
        )
    }
}

/// Adds SASL naming and the HTTP upgrade switch.
struct Interfaces2_1;

impl SectionGrammar for Interfaces2_1 {
    fn family(&self) -> &'static str {
        "2.1"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        socket_interfaces(
            cx,
            element,
            base,
            &["security-realm", "sasl-protocol", "server-name"],
            &[
                "security-realm",
                "console-enabled",
                "http-upgrade-enabled",
                "sasl-protocol",
                "server-name",
            ],
        )
    }
}

fn socket_interfaces(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
    native_attributes: &[&'static str],
    http_attributes: &[&'static str],
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "native-interface" => {
                singles.check(&child)?;
                socket_interface(
                    cx,
                    &child,
                    management,
                    ResourceKind::NativeInterface,
                    native_attributes,
                    &["interface", "port"],
                )?;
            }
            "http-interface" => {
                singles.check(&child)?;
                socket_interface(
                    cx,
                    &child,
                    management,
                    ResourceKind::HttpInterface,
                    http_attributes,
                    &["interface", "port", "secure-port"],
                )?;
            }
            "native-remoting-interface" => {
                if cx.context == DocumentContext::Host {
                    return Err(ParseError::UnsupportedForVersion {
                        name: child.name.clone(),
                        context: "in host documents".to_string(),
                        location: child.location,
                    });
                }
                singles.check(&child)?;
                cx.require_no_attributes(&child)?;
                cx.require_no_content(&child)?;
                cx.push(Operation::add(interface_address(management, &child.name)));
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    check_native(cx, element, &singles)
}

fn socket_interface(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
    kind: ResourceKind,
    attributes: &[&'static str],
    socket_attributes: &[&'static str],
) -> Result<(), ParseError> {
    let mut op = Operation::add(interface_address(management, &element.name));
    cx.set_attributes(element, kind, attributes, &[], &mut op)?;

    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "socket" => {
                singles.check(&child)?;
                cx.set_attributes(&child, kind, socket_attributes, &["interface"], &mut op)?;
                cx.require_no_content(&child)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    if !singles.contains("socket") {
        return Err(missing_element(element, &["socket"]));
    }
    cx.push(op);
    Ok(())
}

fn check_native(
    cx: &ParseCx<'_, '_>,
    element: &StartElement,
    seen: &Singles,
) -> Result<(), ParseError> {
    if cx.require_native_interface && !seen.contains("native-interface") {
        return Err(missing_element(element, &["native-interface"]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::descriptor::DescriptorRegistry;
    use crate::error::{ErrorKind, ParseError};
    use crate::model::{ModelNode, Operation};
    use crate::parse::ManagementParser;

    fn parse(version: &str, root: &str, interfaces: &str) -> Result<Vec<Operation>, ParseError> {
        let xml = format!(
            r#"<{root} xmlns="urn:jboss:domain:{version}"><management>
                 <management-interfaces>{interfaces}</management-interfaces>
               </management></{root}>"#
        );
        ManagementParser::new(Arc::new(DescriptorRegistry::standard()))
            .parse_document(&xml)
            .map(|doc| doc.operations)
    }

    #[test]
    fn test_attributes_on_element_1_0() {
        let ops = parse(
            "1.0",
            "server",
            r#"<native-interface interface="management" port="9999" secure-port="9998"/>
               <http-interface interface="management" port="9990" max-threads="5" security-realm="R"/>"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].get("port"), Some(&ModelNode::Int(9999)));
        assert!(ops[0].get("secure-port").is_none());
        assert!(ops[1].get("max-threads").is_none());
        assert_eq!(ops[1].get("security-realm"), Some(&ModelNode::from("R")));
    }

    #[test]
    fn test_socket_child() {
        let ops = parse(
            "1.4",
            "server",
            r#"<http-interface security-realm="ManagementRealm" console-enabled="false">
                 <socket interface="management" port="9990" secure-port="9443"/>
               </http-interface>
               <native-remoting-interface/>"#,
        )
        .unwrap();
        assert_eq!(
            ops[0].address.to_string(),
            "/core-service=management/management-interface=http-interface"
        );
        assert_eq!(ops[0].get("console-enabled"), Some(&ModelNode::Boolean(false)));
        assert_eq!(ops[0].get("secure-port"), Some(&ModelNode::Int(9443)));
        assert_eq!(
            ops[1].address.to_string(),
            "/core-service=management/management-interface=native-remoting-interface"
        );
    }

    #[test]
    fn test_socket_required() {
        let err = parse("2.0", "server", r#"<http-interface security-realm="R"/>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredElement);
    }

    #[test]
    fn test_sasl_attributes_only_in_2_1() {
        let body = r#"<native-interface sasl-protocol="remote" server-name="srv">
                        <socket interface="management"/>
                      </native-interface>"#;
        let err = parse("2.0", "server", body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedAttribute);
        let ops = parse("2.1", "server", body).unwrap();
        assert_eq!(ops[0].get("server-name"), Some(&ModelNode::from("srv")));
    }

    #[test]
    fn test_host_rules() {
        let err = parse(
            "2.1",
            "host",
            r#"<native-interface><socket interface="management"/></native-interface>
               <native-remoting-interface/>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedForVersion);

        let err = parse(
            "2.1",
            "host",
            r#"<http-interface><socket interface="management"/></http-interface>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredElement);
    }
}
