use crate::descriptor::ResourceKind;
use crate::error::MarshalError;
use crate::model::{derive_alias, ModelNode, PrincipalType};

use super::{children, MarshalCx};

/// Provider written when the tree has access-control content but no explicit
/// provider; the attribute is required in documents.
const DEFAULT_PROVIDER: &str = "simple";

type Classification<'a> = (&'a str, &'a str, &'a ModelNode);

/// What `<access-control>` would contain for an `access=authorization` node.
struct AccessControl<'a> {
    provider: Option<String>,
    vault: Option<&'a ModelNode>,
    sensitive: Vec<Classification<'a>>,
    application: Vec<Classification<'a>>,
}

impl<'a> AccessControl<'a> {
    /// Returns `None` when nothing would be written.
    fn collect(cx: &MarshalCx<'_, '_>, authorization: &'a ModelNode) -> Option<Self> {
        let vault = authorization
            .get_path(&["constraint", "vault-expression"])
            .filter(|node| cx.has_marshallable(ResourceKind::VaultExpressionConstraint, node));
        let sensitive = classifications(
            cx,
            authorization,
            "sensitivity-classification",
            ResourceKind::SensitivityClassification,
        );
        let application = classifications(
            cx,
            authorization,
            "application-classification",
            ResourceKind::ApplicationClassification,
        );
        let control = Self {
            provider: authorization.get("provider").and_then(ModelNode::to_xml_string),
            vault,
            sensitive,
            application,
        };
        if control.provider.is_none()
            && !authorization.has_children("role-mapping")
            && !control.has_constraints()
        {
            return None;
        }
        Some(control)
    }

    fn has_constraints(&self) -> bool {
        self.vault.is_some() || !self.sensitive.is_empty() || !self.application.is_empty()
    }
}

/// Returns true if [`write_access_control`] would write anything.
pub(crate) fn has_access_control(cx: &MarshalCx<'_, '_>, authorization: &ModelNode) -> bool {
    AccessControl::collect(cx, authorization).is_some()
}

pub(crate) fn write_access_control(
    cx: &mut MarshalCx<'_, '_>,
    authorization: &ModelNode,
) -> Result<(), MarshalError> {
    let Some(control) = AccessControl::collect(cx, authorization) else {
        return Ok(());
    };
    let has_constraints = control.has_constraints();
    let AccessControl {
        provider,
        vault,
        sensitive,
        application,
    } = control;

    cx.start("access-control")?;
    cx.attribute("provider", provider.as_deref().unwrap_or(DEFAULT_PROVIDER))?;
    cx.selected(
        ResourceKind::Authorization,
        authorization,
        &["permission-combination-policy"],
    )?;
    if authorization.has_children("role-mapping") {
        cx.start("role-mapping")?;
        for (name, role) in children(authorization, "role-mapping") {
            write_role(cx, name, role)?;
        }
        cx.end()?;
    }
    if has_constraints {
        cx.start("constraints")?;
        if let Some(vault) = vault {
            cx.empty("vault-expression-sensitivity")?;
            cx.attributes(ResourceKind::VaultExpressionConstraint, vault)?;
        }
        write_classifications(
            cx,
            &sensitive,
            "sensitive-classifications",
            "sensitive-classification",
            ResourceKind::SensitivityClassification,
        )?;
        write_classifications(
            cx,
            &application,
            "application-classifications",
            "application-classification",
            ResourceKind::ApplicationClassification,
        )?;
        cx.end()?;
    }
    cx.end()
}

fn write_role(cx: &mut MarshalCx<'_, '_>, name: &str, role: &ModelNode) -> Result<(), MarshalError> {
    cx.start("role")?;
    cx.attribute("name", name)?;
    cx.attributes(ResourceKind::RoleMapping, role)?;
    for block in ["include", "exclude"] {
        if !role.has_children(block) {
            continue;
        }
        cx.start(block)?;
        for (alias, entry) in children(role, block) {
            let principal = entry
                .get("type")
                .and_then(ModelNode::as_str)
                .and_then(PrincipalType::from_model_value)
                .unwrap_or(PrincipalType::User);
            let principal_name = entry.get("name").and_then(ModelNode::as_str).unwrap_or(alias);
            let realm = entry.get("realm").and_then(ModelNode::as_str);
            cx.empty(principal.element_name())?;
            if derive_alias(principal, principal_name, realm) != alias {
                cx.attribute("alias", alias)?;
            }
            cx.selected(ResourceKind::RoleMappingPrincipal, entry, &["name", "realm"])?;
        }
        cx.end()?;
    }
    cx.end()
}

/// Collects the classifications of one constraint that carry configured
/// settings, sorted by type then name.
fn classifications<'a>(
    cx: &MarshalCx<'_, '_>,
    authorization: &'a ModelNode,
    constraint: &str,
    kind: ResourceKind,
) -> Vec<Classification<'a>> {
    let Some(node) = authorization.get_path(&["constraint", constraint]) else {
        return Vec::new();
    };
    let mut found: Vec<_> = children(node, "type")
        .flat_map(|(type_name, by_type)| {
            children(by_type, "classification").map(move |(name, c)| (type_name, name, c))
        })
        .filter(|(_, _, c)| cx.has_marshallable(kind, c))
        .collect();
    found.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    found
}

fn write_classifications(
    cx: &mut MarshalCx<'_, '_>,
    entries: &[Classification<'_>],
    wrapper: &str,
    element: &str,
    kind: ResourceKind,
) -> Result<(), MarshalError> {
    if entries.is_empty() {
        return Ok(());
    }
    cx.start(wrapper)?;
    for (type_name, name, classification) in entries {
        cx.empty(element)?;
        cx.attribute("type", type_name)?;
        cx.attribute("name", name)?;
        cx.attributes(kind, classification)?;
    }
    cx.end()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::apply::ModelApplier;
    use crate::descriptor::DescriptorRegistry;
    use crate::marshal::{ManagementMarshaller, MarshalOptions};
    use crate::model::{Address, ModelNode, OperationsBuilder};

    fn authorization() -> Address {
        Address::root()
            .append("core-service", "management")
            .append("access", "authorization")
    }

    fn marshal(f: impl FnOnce(OperationsBuilder) -> OperationsBuilder) -> String {
        let registry = Arc::new(DescriptorRegistry::standard());
        let ops = f(OperationsBuilder::new(authorization())).build();
        let tree = ModelApplier::new(registry.clone()).apply(&ops).unwrap();
        let options = MarshalOptions::new().with_indent(0).with_xml_declaration(false);
        let xml = ManagementMarshaller::with_options(registry, options)
            .marshal_document(&tree)
            .unwrap();
        xml.trim_start_matches(r#"<server xmlns="urn:jboss:domain:2.1"><management>"#)
            .trim_end_matches("</management></server>")
            .to_string()
    }

    #[test]
    fn test_policy_alone_is_suppressed() {
        let xml = marshal(|b| {
            b.write_attribute(&[], "permission-combination-policy", ModelNode::from("rejecting"))
        });
        assert!(!xml.contains("access-control"));
    }

    #[test]
    fn test_default_provider_is_written() {
        let xml = marshal(|b| b.write_attribute(&[], "provider", ModelNode::from("simple")));
        assert_eq!(xml, r#"<access-control provider="simple"/>"#);
    }

    #[test]
    fn test_role_mapping_aliases() {
        let xml = marshal(|b| {
            b.write_attribute(&[], "provider", ModelNode::from("rbac"))
                .add(&[("role-mapping", "SuperUser")], |a| a)
                .add(
                    &[("role-mapping", "SuperUser"), ("include", "group-admins@R")],
                    |a| a.string("name", "admins").string("realm", "R").string("type", "GROUP"),
                )
                .add(&[("role-mapping", "SuperUser"), ("include", "bob")], |a| {
                    a.string("name", "robert").string("type", "USER")
                })
        });
        assert_eq!(
            xml,
            concat!(
                r#"<access-control provider="rbac"><role-mapping><role name="SuperUser"><include>"#,
                r#"<group name="admins" realm="R"/>"#,
                r#"<user alias="bob" name="robert"/>"#,
                r#"</include></role></role-mapping></access-control>"#
            )
        );
    }

    #[test]
    fn test_constraints_sorted_and_suppressed() {
        let xml = marshal(|b| {
            let b = b.write_attribute(&[], "provider", ModelNode::from("rbac"));
            [("naming", "jndi"), ("core", "socket-config"), ("core", "credential")]
                .into_iter()
                .fold(b, |b, (t, n)| {
                    b.write_attribute(
                        &[
                            ("constraint", "sensitivity-classification"),
                            ("type", t),
                            ("classification", n),
                        ],
                        "configured-requires-read",
                        ModelNode::Boolean(true),
                    )
                })
        });
        assert_eq!(
            xml,
            concat!(
                r#"<access-control provider="rbac"><constraints><sensitive-classifications>"#,
                r#"<sensitive-classification type="core" name="credential" requires-read="true"/>"#,
                r#"<sensitive-classification type="core" name="socket-config" requires-read="true"/>"#,
                r#"<sensitive-classification type="naming" name="jndi" requires-read="true"/>"#,
                r#"</sensitive-classifications></constraints></access-control>"#
            )
        );
    }
}
