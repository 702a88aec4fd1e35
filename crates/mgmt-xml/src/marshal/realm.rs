//! Security realms in the current schema.

use crate::descriptor::ResourceKind;
use crate::error::MarshalError;
use crate::model::ModelNode;

use super::{children, MarshalCx};

const KEYSTORE: &[&str] = &[
    "keystore-path",
    "keystore-relative-to",
    "keystore-password",
    "alias",
    "key-password",
];

const GROUP_SEARCH: &[&str] = &[
    "group-name",
    "iterative",
    "group-dn-attribute",
    "group-name-attribute",
];

pub(crate) fn write_security_realms(
    cx: &mut MarshalCx<'_, '_>,
    management: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start("security-realms")?;
    for (name, realm) in children(management, "security-realm") {
        cx.start("security-realm")?;
        cx.attribute("name", name)?;
        if realm.has_children("plug-in") {
            cx.start("plug-ins")?;
            for (module, _) in children(realm, "plug-in") {
                cx.empty("plug-in")?;
                cx.attribute("module", module)?;
            }
            cx.end()?;
        }
        if let Some(identities) = realm.get("server-identity").filter(|n| !n.is_empty()) {
            write_server_identities(cx, identities)?;
        }
        if let Some(authentication) = realm.get("authentication").filter(|n| !n.is_empty()) {
            write_authentication(cx, authentication)?;
        }
        if let Some(authorization) = realm.get("authorization").filter(|n| !n.is_empty()) {
            write_authorization(cx, authorization)?;
        }
        cx.end()?;
    }
    cx.end()
}

fn write_server_identities(
    cx: &mut MarshalCx<'_, '_>,
    identities: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start("server-identities")?;
    if let Some(secret) = identities.get("secret") {
        cx.empty("secret")?;
        cx.attributes(ResourceKind::SecretIdentity, secret)?;
    }
    if let Some(ssl) = identities.get("ssl") {
        cx.start("ssl")?;
        cx.selected(ResourceKind::SslIdentity, ssl, &["protocol"])?;
        if ssl.has_defined("keystore-path") {
            cx.empty("keystore")?;
            cx.selected(ResourceKind::SslIdentity, ssl, KEYSTORE)?;
        }
        cx.end()?;
    }
    cx.end()
}

fn write_authentication(
    cx: &mut MarshalCx<'_, '_>,
    authentication: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start("authentication")?;
    if let Some(truststore) = authentication.get("truststore") {
        cx.empty("truststore")?;
        cx.selected(ResourceKind::Truststore, truststore, KEYSTORE)?;
    }
    if let Some(local) = authentication.get("local") {
        cx.empty("local")?;
        cx.attributes(ResourceKind::LocalAuthentication, local)?;
    }
    if let Some(jaas) = authentication.get("jaas") {
        cx.empty("jaas")?;
        cx.attributes(ResourceKind::JaasAuthentication, jaas)?;
    }
    if let Some(ldap) = authentication.get("ldap") {
        cx.start("ldap")?;
        cx.selected(
            ResourceKind::LdapAuthentication,
            ldap,
            &[
                "connection",
                "base-dn",
                "recursive",
                "user-dn",
                "allow-empty-passwords",
                "username-load",
            ],
        )?;
        write_cache(cx, ldap)?;
        if ldap.has_defined("advanced-filter") {
            cx.empty("advanced-filter")?;
            cx.selected(ResourceKind::LdapAuthentication, ldap, &["advanced-filter"])?;
        } else if ldap.has_defined("username-attribute") {
            cx.empty("username-filter")?;
            cx.selected(ResourceKind::LdapAuthentication, ldap, &["username-attribute"])?;
        }
        cx.end()?;
    }
    if let Some(properties) = authentication.get("properties") {
        cx.empty("properties")?;
        cx.attributes(ResourceKind::PropertiesAuthentication, properties)?;
    }
    if let Some(users) = authentication.get("users") {
        cx.start("users")?;
        for (username, user) in children(users, "user") {
            cx.start("user")?;
            cx.attribute("username", username)?;
            cx.element(ResourceKind::User, user, "password")?;
            cx.end()?;
        }
        cx.end()?;
    }
    if let Some(plug_in) = authentication.get("plug-in") {
        write_plug_in(cx, plug_in, ResourceKind::PlugInAuthentication)?;
    }
    cx.end()
}

fn write_authorization(
    cx: &mut MarshalCx<'_, '_>,
    authorization: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start("authorization")?;
    if let Some(properties) = authorization.get("properties") {
        cx.empty("properties")?;
        cx.attributes(ResourceKind::PropertiesAuthorization, properties)?;
    }
    if let Some(plug_in) = authorization.get("plug-in") {
        write_plug_in(cx, plug_in, ResourceKind::PlugInAuthorization)?;
    }
    if let Some(ldap) = authorization.get("ldap") {
        cx.start("ldap")?;
        cx.attributes(ResourceKind::LdapAuthorization, ldap)?;
        if let Some((strategy, node)) = children(ldap, "username-to-dn").next() {
            write_username_to_dn(cx, strategy, node)?;
        }
        if let Some((direction, node)) = children(ldap, "group-search").next() {
            write_group_search(cx, direction, node)?;
        }
        cx.end()?;
    }
    cx.end()
}

fn write_username_to_dn(
    cx: &mut MarshalCx<'_, '_>,
    strategy: &str,
    node: &ModelNode,
) -> Result<(), MarshalError> {
    let (kind, names): (_, &[&str]) = match strategy {
        "username-filter" => (
            ResourceKind::UsernameFilter,
            &["base-dn", "recursive", "user-dn-attribute", "attribute"],
        ),
        "advanced-filter" => (
            ResourceKind::UsernameAdvancedFilter,
            &["base-dn", "recursive", "user-dn-attribute", "filter"],
        ),
        _ => (ResourceKind::UsernameIsDn, &[]),
    };
    cx.start("username-to-dn")?;
    cx.selected(kind, node, &["force"])?;
    write_cache(cx, node)?;
    cx.empty(strategy)?;
    cx.selected(kind, node, names)?;
    cx.end()
}

fn write_group_search(
    cx: &mut MarshalCx<'_, '_>,
    direction: &str,
    node: &ModelNode,
) -> Result<(), MarshalError> {
    let kind = match direction {
        "group-to-principal" => ResourceKind::GroupToPrincipal,
        _ => ResourceKind::PrincipalToGroup,
    };
    cx.start("group-search")?;
    cx.selected(kind, node, GROUP_SEARCH)?;
    write_cache(cx, node)?;
    if kind == ResourceKind::GroupToPrincipal {
        cx.start(direction)?;
        cx.selected(kind, node, &["base-dn", "recursive", "search-by"])?;
        if node.has_defined("principal-attribute") {
            cx.empty("membership-filter")?;
            cx.selected(kind, node, &["principal-attribute"])?;
        }
        cx.end()?;
    } else {
        cx.empty(direction)?;
        cx.selected(kind, node, &["group-attribute"])?;
    }
    cx.end()
}

fn write_cache(cx: &mut MarshalCx<'_, '_>, owner: &ModelNode) -> Result<(), MarshalError> {
    for (cache_type, cache) in children(owner, "cache") {
        cx.empty("cache")?;
        cx.attribute("type", cache_type)?;
        cx.attributes(ResourceKind::LdapCache, cache)?;
    }
    Ok(())
}

fn write_plug_in(
    cx: &mut MarshalCx<'_, '_>,
    plug_in: &ModelNode,
    kind: ResourceKind,
) -> Result<(), MarshalError> {
    cx.start("plug-in")?;
    cx.attributes(kind, plug_in)?;
    if plug_in.has_children("property") {
        cx.start("properties")?;
        for (name, property) in children(plug_in, "property") {
            cx.empty("property")?;
            cx.attribute("name", name)?;
            cx.attributes(ResourceKind::PlugInProperty, property)?;
        }
        cx.end()?;
    }
    cx.end()
}
