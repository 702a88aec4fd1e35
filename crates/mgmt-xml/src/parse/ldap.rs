//! LDAP authentication and authorization inside a security realm.
//!
//! Caches are parsed before the address of the resource owning them is
//! fixed, so they are built relative to the root and spliced under the owner
//! once the owner has been pushed.

use crate::descriptor::ResourceKind;
use crate::error::ParseError;
use crate::model::{Address, Operation};
use crate::xml::{StartElement, XmlAttribute};

use super::context::{missing_element, unexpected_element, Choice, ParseCx, Singles};

/// Cache eviction policies; the first is the default.
pub(crate) const CACHE_TYPES: &[&str] = &["by-search-time", "by-access-time"];

/// LDAP grammar revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LdapFlavor {
    /// `username-attribute` on the element, no children.
    V1_0,
    /// Username filter children.
    V1_1,
    /// Caches, `allow-empty-passwords`, `username-load`.
    V2_0,
}

impl LdapFlavor {
    fn caches(self) -> bool {
        self == LdapFlavor::V2_0
    }
}

const USERNAME_FILTERS: &[&str] = &["username-filter", "advanced-filter"];

pub(crate) fn authentication(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    flavor: LdapFlavor,
) -> Result<(), ParseError> {
    let address = realm.append("authentication", "ldap");
    let mut op = Operation::add(address.clone());
    let kind = ResourceKind::LdapAuthentication;

    match flavor {
        LdapFlavor::V1_0 => {
            cx.set_attributes(
                element,
                kind,
                &["connection", "base-dn", "username-attribute", "recursive", "user-dn"],
                &["connection", "base-dn", "username-attribute"],
                &mut op,
            )?;
            cx.require_no_content(element)?;
            cx.push(op);
            return Ok(());
        }
        LdapFlavor::V1_1 => cx.set_attributes(
            element,
            kind,
            &["connection", "base-dn", "recursive", "user-dn"],
            &["connection", "base-dn"],
            &mut op,
        )?,
        LdapFlavor::V2_0 => cx.set_attributes(
            element,
            kind,
            &[
                "connection",
                "base-dn",
                "recursive",
                "user-dn",
                "allow-empty-passwords",
                "username-load",
            ],
            &["connection", "base-dn"],
            &mut op,
        )?,
    }

    let mut cache = None;
    let mut singles = Singles::new();
    let mut choice = Choice::new(USERNAME_FILTERS);
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "cache" if flavor.caches() => {
                singles.check(&child)?;
                cache = Some(parse_cache(cx, &child)?);
            }
            "username-filter" => {
                choice.select(&child)?;
                cx.read_attributes(&child, &["attribute"], &["attribute"], |attr| {
                    cx.set(&child, kind, "username-attribute", attr, &mut op)
                })?;
                cx.require_no_content(&child)?;
            }
            "advanced-filter" => {
                choice.select(&child)?;
                cx.read_attributes(&child, &["filter"], &["filter"], |attr| {
                    cx.set(&child, kind, "advanced-filter", attr, &mut op)
                })?;
                cx.require_no_content(&child)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    choice.finish(element)?;

    cx.push(op);
    push_cache(cx, cache, &address);
    Ok(())
}

pub(crate) fn authorization(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    flavor: LdapFlavor,
) -> Result<(), ParseError> {
    let address = realm.append("authorization", "ldap");
    let mut op = Operation::add(address.clone());
    cx.set_attributes(
        element,
        ResourceKind::LdapAuthorization,
        &["connection"],
        &["connection"],
        &mut op,
    )?;
    cx.push(op);

    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "username-to-dn" => {
                singles.check(&child)?;
                username_to_dn(cx, &child, &address, flavor)?;
            }
            "group-search" => {
                singles.check(&child)?;
                group_search(cx, &child, &address, flavor)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    if !singles.contains("group-search") {
        return Err(missing_element(element, &["group-search"]));
    }
    Ok(())
}

/// `<username-to-dn force=>` with exactly one strategy child.
fn username_to_dn(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    ldap: &Address,
    flavor: LdapFlavor,
) -> Result<(), ParseError> {
    let shared = collect_attributes(cx, element, &["force"])?;

    let mut cache = None;
    let mut chosen = None;
    let mut singles = Singles::new();
    let mut choice = Choice::new(&["username-is-dn", "username-filter", "advanced-filter"]);
    while let Some(child) = cx.next_child(element)? {
        let (kind, allowed, required): (_, &[&str], &[&str]) = match child.name.as_str() {
            "cache" if flavor.caches() => {
                singles.check(&child)?;
                cache = Some(parse_cache(cx, &child)?);
                continue;
            }
            "username-is-dn" => (ResourceKind::UsernameIsDn, &[], &[]),
            "username-filter" => (
                ResourceKind::UsernameFilter,
                &["base-dn", "recursive", "user-dn-attribute", "attribute"],
                &["base-dn", "attribute"],
            ),
            "advanced-filter" => (
                ResourceKind::UsernameAdvancedFilter,
                &["base-dn", "recursive", "user-dn-attribute", "filter"],
                &["base-dn", "filter"],
            ),
            _ => return Err(unexpected_element(&child)),
        };
        choice.select(&child)?;
        let mut op = Operation::add(ldap.append("username-to-dn", child.name.as_str()));
        for attr in &shared {
            cx.set(element, kind, &attr.name, attr, &mut op)?;
        }
        cx.set_attributes(&child, kind, allowed, required, &mut op)?;
        cx.require_no_content(&child)?;
        chosen = Some(op);
    }
    choice.finish(element)?;

    if let Some(op) = chosen {
        let address = op.address.clone();
        cx.push(op);
        push_cache(cx, cache, &address);
    }
    Ok(())
}

/// `<group-search>` with exactly one direction child.
fn group_search(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    ldap: &Address,
    flavor: LdapFlavor,
) -> Result<(), ParseError> {
    let shared = collect_attributes(
        cx,
        element,
        &["group-name", "iterative", "group-dn-attribute", "group-name-attribute"],
    )?;

    let mut cache = None;
    let mut chosen = None;
    let mut singles = Singles::new();
    let mut choice = Choice::new(&["group-to-principal", "principal-to-group"]);
    while let Some(child) = cx.next_child(element)? {
        let kind = match child.name.as_str() {
            "cache" if flavor.caches() => {
                singles.check(&child)?;
                cache = Some(parse_cache(cx, &child)?);
                continue;
            }
            "group-to-principal" => ResourceKind::GroupToPrincipal,
            "principal-to-group" => ResourceKind::PrincipalToGroup,
            _ => return Err(unexpected_element(&child)),
        };
        choice.select(&child)?;
        let mut op = Operation::add(ldap.append("group-search", child.name.as_str()));
        for attr in &shared {
            cx.set(element, kind, &attr.name, attr, &mut op)?;
        }
        if kind == ResourceKind::GroupToPrincipal {
            cx.set_attributes(
                &child,
                kind,
                &["base-dn", "recursive", "search-by"],
                &["base-dn"],
                &mut op,
            )?;
            membership_filter(cx, &child, &mut op)?;
        } else {
            cx.set_attributes(&child, kind, &["group-attribute"], &[], &mut op)?;
            cx.require_no_content(&child)?;
        }
        chosen = Some(op);
    }
    choice.finish(element)?;

    if let Some(op) = chosen {
        let address = op.address.clone();
        cx.push(op);
        push_cache(cx, cache, &address);
    }
    Ok(())
}

/// The required `<membership-filter principal-attribute=>` child of
/// `group-to-principal`.
fn membership_filter(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    op: &mut Operation,
) -> Result<(), ParseError> {
    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "membership-filter" => {
                singles.check(&child)?;
                cx.set_attributes(
                    &child,
                    ResourceKind::GroupToPrincipal,
                    &["principal-attribute"],
                    &["principal-attribute"],
                    op,
                )?;
                cx.require_no_content(&child)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    if !singles.contains("membership-filter") {
        return Err(missing_element(element, &["membership-filter"]));
    }
    Ok(())
}

/// Validates the attribute names of `element` and keeps them for the
/// resource chosen among its children.
fn collect_attributes(
    cx: &ParseCx<'_, '_>,
    element: &StartElement,
    allowed: &[&'static str],
) -> Result<Vec<XmlAttribute>, ParseError> {
    let mut kept = Vec::new();
    cx.read_attributes(element, allowed, &[], |attr| {
        kept.push(attr.clone());
        Ok(())
    })?;
    Ok(kept)
}

/// Parses `<cache>` into an operation addressed relative to the root.
fn parse_cache(cx: &mut ParseCx<'_, '_>, element: &StartElement) -> Result<Operation, ParseError> {
    let mut op = Operation::add(Address::root());
    let mut cache_type = CACHE_TYPES[0].to_string();
    cx.read_attributes(
        element,
        &["type", "eviction-time", "cache-failures", "max-cache-size"],
        &[],
        |attr| match attr.name.as_str() {
            "type" => {
                if !CACHE_TYPES.contains(&attr.value.as_str()) {
                    return Err(ParseError::InvalidAttributeValue {
                        name: attr.name.clone(),
                        value: attr.value.clone(),
                        reason: format!("expected one of {}", CACHE_TYPES.join(", ")),
                        location: element.location,
                    });
                }
                cache_type = attr.value.clone();
                Ok(())
            }
            other => cx.set(element, ResourceKind::LdapCache, other, attr, &mut op),
        },
    )?;
    cx.require_no_content(element)?;
    op.address = Address::root().append("cache", cache_type);
    Ok(op)
}

fn push_cache(cx: &mut ParseCx<'_, '_>, cache: Option<Operation>, owner: &Address) {
    if let Some(mut cache) = cache {
        cache.address = cache.address.prefixed_with(owner);
        cx.push(cache);
    }
}
