//! The `<management>` element and outbound connections.

use log::warn;

use crate::descriptor::ResourceKind;
use crate::error::ParseError;
use crate::model::{Address, Operation, SchemaVersion};
use crate::xml::StartElement;

use super::context::{missing_attribute, missing_element, unexpected_element, ParseCx, Singles};
use super::{access, audit, interfaces, realm, select, SectionGrammar};

pub(crate) fn management_address(base: &Address) -> Address {
    base.append("core-service", "management")
}

pub(crate) fn parse_management(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    base: &Address,
) -> Result<(), ParseError> {
    cx.require_namespace(element)?;
    cx.require_no_attributes(element)?;
    let management = management_address(base);

    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "security-realms" => {
                singles.check(&child)?;
                realm::parse_security_realms(cx, &child, &management)?;
            }
            "outbound-connections" => {
                singles.check(&child)?;
                parse_outbound_connections(cx, &child, &management)?;
            }
            "management-interfaces" => {
                if !cx.context.allows_management_interfaces() {
                    warn!(
                        "ignoring <management-interfaces> at {} in a {} document",
                        child.location, cx.context
                    );
                    cx.skip_element(&child)?;
                    continue;
                }
                singles.check(&child)?;
                select("management-interfaces", cx.version, interfaces::grammar)
                    .parse(cx, &child, &management)?;
            }
            "audit-log" => {
                singles.check(&child)?;
                audit::parse_audit_log(cx, &child, &management)?;
            }
            "access-control" => {
                singles.check(&child)?;
                access::parse_access_control(cx, &child, &management)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }

    if cx.require_native_interface && !singles.contains("management-interfaces") {
        return Err(missing_element(element, &["management-interfaces"]));
    }
    Ok(())
}

fn parse_outbound_connections(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let grammar = select("outbound-connections", cx.version, connection_grammar);
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "ldap" => grammar.parse(cx, &child, management)?,
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

fn connection_grammar(version: SchemaVersion) -> &'static dyn SectionGrammar {
    use SchemaVersion::*;
    match version {
        V1_0 | V1_1 | V1_2 => &LdapConnection1_0,
        V1_3 | V1_4 | V1_5 | V2_0 | V2_1 => &LdapConnection1_3,
    }
}

/// Search credentials mandatory, no realm or referral handling.
struct LdapConnection1_0;

impl SectionGrammar for LdapConnection1_0 {
    fn family(&self) -> &'static str {
        "1.0-1.2"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        ldap_connection(
            cx,
            element,
            base,
            &["name", "url", "search-dn", "search-credential", "initial-context-factory"],
            &["name", "url", "search-dn", "search-credential"],
        )
    }
}

struct LdapConnection1_3;

impl SectionGrammar for LdapConnection1_3 {
    fn family(&self) -> &'static str {
        "1.3+"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        ldap_connection(
            cx,
            element,
            base,
            &[
                "name",
                "url",
                "search-dn",
                "search-credential",
                "security-realm",
                "initial-context-factory",
                "referrals",
            ],
            &["name", "url"],
        )
    }
}

fn ldap_connection(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
    allowed: &[&'static str],
    required: &[&'static str],
) -> Result<(), ParseError> {
    let mut op = Operation::add(Address::root());
    let mut name = None;
    cx.read_attributes(element, allowed, required, |attr| match attr.name.as_str() {
        "name" => {
            name = Some(attr.value.clone());
            Ok(())
        }
        other => cx.set(element, ResourceKind::LdapConnection, other, attr, &mut op),
    })?;
    let name = name.ok_or_else(|| missing_attribute(element, &["name"]))?;
    op.address = management.append("ldap-connection", name);
    cx.require_no_content(element)?;
    cx.push(op);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::descriptor::DescriptorRegistry;
    use crate::error::ErrorKind;
    use crate::model::{DocumentContext, ModelNode};
    use crate::parse::{ManagementParser, ParseOptions};

    fn parse(xml: &str) -> Result<Vec<crate::model::Operation>, crate::error::ParseError> {
        ManagementParser::new(Arc::new(DescriptorRegistry::standard()))
            .parse_document(xml)
            .map(|doc| doc.operations)
    }

    #[test]
    fn test_outbound_connection_1_3() {
        let ops = parse(
            r#"<server xmlns="urn:jboss:domain:1.3"><management>
                 <outbound-connections>
                   <ldap name="ldap" url="ldap://localhost:389" referrals="FOLLOW"/>
                 </outbound-connections>
               </management></server>"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(
            ops[0].address.to_string(),
            "/core-service=management/ldap-connection=ldap"
        );
        assert_eq!(ops[0].get("referrals"), Some(&ModelNode::from("FOLLOW")));
        assert!(ops[0].get("name").is_none());
    }

    #[test]
    fn test_outbound_connection_1_0_requires_search_credentials() {
        let err = parse(
            r#"<server xmlns="urn:jboss:domain:1.2"><management>
                 <outbound-connections><ldap name="ldap" url="ldap://x"/></outbound-connections>
               </management></server>"#,
        )
        .unwrap_err();
        match err {
            crate::error::ParseError::MissingRequiredAttribute { missing, .. } => {
                assert_eq!(missing, vec!["search-dn", "search-credential"]);
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = parse(
            r#"<server xmlns="urn:jboss:domain:1.2"><management>
                 <outbound-connections>
                   <ldap name="l" url="u" search-dn="d" search-credential="c" referrals="FOLLOW"/>
                 </outbound-connections>
               </management></server>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedAttribute);
    }

    #[test]
    fn test_duplicate_section() {
        let err = parse(
            r#"<server xmlns="urn:jboss:domain:2.1"><management>
                 <security-realms/><security-realms/>
               </management></server>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateElement);
    }

    #[test]
    fn test_management_rejects_attributes() {
        let err = parse(r#"<server xmlns="urn:jboss:domain:2.1"><management x="1"/></server>"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedAttribute);
    }

    #[test]
    fn test_interfaces_ignored_in_domain() {
        let ops = parse(
            r#"<domain xmlns="urn:jboss:domain:2.1"><management>
                 <management-interfaces>
                   <native-interface><socket interface="management"/></native-interface>
                 </management-interfaces>
               </management></domain>"#,
        )
        .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_host_requires_interfaces() {
        let err = parse(r#"<host xmlns="urn:jboss:domain:2.1"><management/></host>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredElement);

        let parser = ManagementParser::with_options(
            Arc::new(DescriptorRegistry::standard()),
            ParseOptions::new()
                .with_context(DocumentContext::Standalone)
                .require_native_interface(true),
        );
        let err = parser
            .parse_document(r#"<server xmlns="urn:jboss:domain:2.1"><management/></server>"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredElement);
    }
}
