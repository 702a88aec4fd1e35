//! `<access-control>`: provider selection, role mappings and constraints.
//!
//! The authorization resource and its constraint children exist in every
//! runtime, so the document only writes their attributes.

use rustc_hash::FxHashSet;

use crate::descriptor::ResourceKind;
use crate::error::ParseError;
use crate::model::{derive_alias, Address, ModelNode, Operation, PrincipalType, SchemaVersion};
use crate::xml::{StartElement, XmlAttribute};

use super::context::{duplicate_element, missing_attribute, unexpected_element, ParseCx, Singles};
use super::{select, SectionGrammar};

pub(crate) fn grammar(version: SchemaVersion) -> &'static dyn SectionGrammar {
    if version >= SchemaVersion::V1_5 {
        &AccessControl1_5
    } else {
        &AccessControlUnsupported
    }
}

pub(crate) fn parse_access_control(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
) -> Result<(), ParseError> {
    select("access-control", cx.version, grammar).parse(cx, element, management)
}

struct AccessControlUnsupported;

impl SectionGrammar for AccessControlUnsupported {
    fn family(&self) -> &'static str {
        "unsupported"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        _base: &Address,
    ) -> Result<(), ParseError> {
        Err(ParseError::unsupported_in_version(
            &element.name,
            cx.version,
            element.location,
        ))
    }
}

struct AccessControl1_5;

impl SectionGrammar for AccessControl1_5 {
    fn family(&self) -> &'static str {
        "1.5+"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        let authorization = base.append("access", "authorization");
        let mut writes = Vec::new();
        cx.read_attributes(
            element,
            &["provider", "permission-combination-policy"],
            &["provider"],
            |attr| {
                let kind = ResourceKind::Authorization;
                writes.push(write(cx, element, &authorization, kind, &attr.name, attr)?);
                Ok(())
            },
        )?;
        for op in writes {
            cx.push(op);
        }

        let mut singles = Singles::new();
        while let Some(child) = cx.next_child(element)? {
            match child.name.as_str() {
                "role-mapping" => {
                    singles.check(&child)?;
                    role_mapping(cx, &child, &authorization)?;
                }
                "constraints" => {
                    singles.check(&child)?;
                    constraints(cx, &child, &authorization)?;
                }
                _ => return Err(unexpected_element(&child)),
            }
        }
        Ok(())
    }
}

/// Builds a write-attribute operation for `attr`, coerced as `model_name`.
fn write(
    cx: &ParseCx<'_, '_>,
    element: &StartElement,
    address: &Address,
    kind: ResourceKind,
    model_name: &str,
    attr: &XmlAttribute,
) -> Result<Operation, ParseError> {
    let mut op = Operation::write_attribute(address.clone(), model_name, ModelNode::Undefined);
    cx.set(element, kind, model_name, attr, &mut op)?;
    Ok(op)
}

// =============================================================================
// Role mapping
// =============================================================================

fn role_mapping(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    authorization: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    while let Some(child) = cx.next_child(element)? {
        if child.name != "role" {
            return Err(unexpected_element(&child));
        }
        let mut op = Operation::add(Address::root());
        let mut name = None;
        cx.read_attributes(&child, &["name", "include-all"], &["name"], |attr| {
            match attr.name.as_str() {
                "name" => {
                    name = Some(attr.value.clone());
                    Ok(())
                }
                other => cx.set(&child, ResourceKind::RoleMapping, other, attr, &mut op),
            }
        })?;
        let name = name.ok_or_else(|| missing_attribute(&child, &["name"]))?;
        let role = authorization.append("role-mapping", name);
        op.address = role.clone();
        cx.push(op);

        let mut singles = Singles::new();
        while let Some(block) = cx.next_child(&child)? {
            match block.name.as_str() {
                "include" | "exclude" => {
                    singles.check(&block)?;
                    principals(cx, &block, &role)?;
                }
                _ => return Err(unexpected_element(&block)),
            }
        }
    }
    Ok(())
}

/// `<include>` or `<exclude>`: user and group entries keyed by alias.
fn principals(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    role: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut aliases = FxHashSet::default();
    while let Some(child) = cx.next_child(element)? {
        let Some(principal) = PrincipalType::from_element_name(&child.name) else {
            return Err(unexpected_element(&child));
        };
        let mut op = Operation::add(Address::root());
        let mut name = None;
        let mut realm = None;
        let mut alias = None;
        cx.read_attributes(&child, &["alias", "name", "realm"], &["name"], |attr| {
            match attr.name.as_str() {
                "alias" => alias = Some(attr.value.clone()),
                "name" => name = Some(attr.value.clone()),
                _ => realm = Some(attr.value.clone()),
            }
            if attr.name != "alias" {
                cx.set(&child, ResourceKind::RoleMappingPrincipal, &attr.name, attr, &mut op)?;
            }
            Ok(())
        })?;
        let name = name.ok_or_else(|| missing_attribute(&child, &["name"]))?;
        let alias = alias.unwrap_or_else(|| derive_alias(principal, &name, realm.as_deref()));
        if !aliases.insert(alias.clone()) {
            return Err(duplicate_element(&child));
        }
        op.set("type", principal.model_value());
        op.address = role.append(element.name.as_str(), alias);
        cx.require_no_content(&child)?;
        cx.push(op);
    }
    Ok(())
}

// =============================================================================
// Constraints
// =============================================================================

fn constraints(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    authorization: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "vault-expression-sensitivity" => {
                singles.check(&child)?;
                let address = authorization.append("constraint", "vault-expression");
                let mut writes = Vec::new();
                cx.read_attributes(&child, &["requires-read", "requires-write"], &[], |attr| {
                    writes.push(write(
                        cx,
                        &child,
                        &address,
                        ResourceKind::VaultExpressionConstraint,
                        &format!("configured-{}", attr.name),
                        attr,
                    )?);
                    Ok(())
                })?;
                cx.require_no_content(&child)?;
                for op in writes {
                    cx.push(op);
                }
            }
            "sensitive-classifications" => {
                singles.check(&child)?;
                classifications(
                    cx,
                    &child,
                    authorization,
                    "sensitive-classification",
                    ResourceKind::SensitivityClassification,
                    &["requires-addressable", "requires-read", "requires-write"],
                )?;
            }
            "application-classifications" => {
                singles.check(&child)?;
                classifications(
                    cx,
                    &child,
                    authorization,
                    "application-classification",
                    ResourceKind::ApplicationClassification,
                    &["application"],
                )?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

/// Classification entries become writes on
/// `constraint=<kind>/type=<type>/classification=<name>`.
fn classifications(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    authorization: &Address,
    entry: &str,
    kind: ResourceKind,
    settings: &[&'static str],
) -> Result<(), ParseError> {
    let constraint = match kind {
        ResourceKind::ApplicationClassification => "application-classification",
        _ => "sensitivity-classification",
    };
    let mut allowed = vec!["type", "name"];
    allowed.extend_from_slice(settings);

    cx.require_no_attributes(element)?;
    while let Some(child) = cx.next_child(element)? {
        if child.name != entry {
            return Err(unexpected_element(&child));
        }
        let mut type_name = None;
        let mut name = None;
        let mut configured = Vec::new();
        cx.read_attributes(&child, &allowed, &["type", "name"], |attr| {
            match attr.name.as_str() {
                "type" => type_name = Some(attr.value.clone()),
                "name" => name = Some(attr.value.clone()),
                _ => configured.push(attr.clone()),
            }
            Ok(())
        })?;
        let (Some(type_name), Some(name)) = (type_name, name) else {
            return Err(missing_attribute(&child, &["type", "name"]));
        };
        let address = authorization
            .append("constraint", constraint)
            .append("type", type_name)
            .append("classification", name);
        cx.require_no_content(&child)?;
        for attr in &configured {
            let op = write(cx, &child, &address, kind, &format!("configured-{}", attr.name), attr)?;
            cx.push(op);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::descriptor::DescriptorRegistry;
    use crate::error::{ErrorKind, ParseError};
    use crate::model::{ModelNode, Operation, OperationKind};
    use crate::parse::ManagementParser;

    fn parse(version: &str, access: &str) -> Result<Vec<Operation>, ParseError> {
        let xml = format!(
            r#"<server xmlns="urn:jboss:domain:{version}"><management>{access}</management></server>"#
        );
        ManagementParser::new(Arc::new(DescriptorRegistry::standard()))
            .parse_document(&xml)
            .map(|doc| doc.operations)
    }

    fn relative(op: &Operation) -> String {
        op.address
            .to_string()
            .trim_start_matches("/core-service=management/access=authorization")
            .to_string()
    }

    #[test]
    fn test_unsupported_before_1_5() {
        let err = parse("1.4", r#"<access-control provider="simple"/>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedForVersion);
    }

    #[test]
    fn test_provider_writes() {
        let ops = parse(
            "1.5",
            r#"<access-control provider="rbac" permission-combination-policy="rejecting"/>"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.kind == OperationKind::WriteAttribute));
        assert_eq!(ops[0].get("provider"), Some(&ModelNode::from("rbac")));
        assert_eq!(
            ops[1].get("permission-combination-policy"),
            Some(&ModelNode::from("rejecting"))
        );

        let err = parse("1.5", r#"<access-control provider="ldap"/>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAttributeValue);
    }

    #[test]
    fn test_role_mapping_aliases() {
        let ops = parse(
            "2.1",
            r#"<access-control provider="rbac"><role-mapping>
                 <role name="SuperUser" include-all="false">
                   <include>
                     <user name="$local"/>
                     <group name="admins" realm="ManagementRealm"/>
                     <user alias="bob" name="robert"/>
                   </include>
                   <exclude><user name="guest"/></exclude>
                 </role>
               </role-mapping></access-control>"#,
        )
        .unwrap();
        let addresses: Vec<_> = ops.iter().map(relative).collect();
        assert_eq!(
            addresses,
            vec![
                "",
                "/role-mapping=SuperUser",
                "/role-mapping=SuperUser/include=user-$local",
                "/role-mapping=SuperUser/include=group-admins@ManagementRealm",
                "/role-mapping=SuperUser/include=bob",
                "/role-mapping=SuperUser/exclude=user-guest",
            ]
        );
        assert_eq!(ops[3].get("type"), Some(&ModelNode::from("GROUP")));
        assert_eq!(ops[3].get("realm"), Some(&ModelNode::from("ManagementRealm")));
        assert_eq!(ops[4].get("name"), Some(&ModelNode::from("robert")));
        assert!(ops[4].get("alias").is_none());
    }

    #[test]
    fn test_duplicate_alias_in_block() {
        let err = parse(
            "2.1",
            r#"<access-control provider="rbac"><role-mapping><role name="R"><include>
                 <user name="a"/><user alias="user-a" name="b"/>
               </include></role></role-mapping></access-control>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateElement);
    }

    #[test]
    fn test_constraints() {
        let ops = parse(
            "2.1",
            r#"<access-control provider="simple"><constraints>
                 <vault-expression-sensitivity requires-read="false" requires-write="true"/>
                 <sensitive-classifications>
                   <sensitive-classification type="core" name="socket-config" requires-addressable="true"/>
                 </sensitive-classifications>
                 <application-classifications>
                   <application-classification type="core" name="deployment" application="true"/>
                 </application-classifications>
               </constraints></access-control>"#,
        )
        .unwrap();
        let addresses: Vec<_> = ops.iter().map(relative).collect();
        assert_eq!(
            addresses,
            vec![
                "",
                "/constraint=vault-expression",
                "/constraint=vault-expression",
                "/constraint=sensitivity-classification/type=core/classification=socket-config",
                "/constraint=application-classification/type=core/classification=deployment",
            ]
        );
        assert_eq!(ops[1].get("configured-requires-read"), Some(&ModelNode::Boolean(false)));
        assert_eq!(
            ops[3].get("configured-requires-addressable"),
            Some(&ModelNode::Boolean(true))
        );
        assert_eq!(ops[4].get("configured-application"), Some(&ModelNode::Boolean(true)));
        assert!(ops.iter().all(|op| op.attributes.len() == 1));
    }
}
