//! `<security-realm>` grammars.
//!
//! | family  | changes                                                         |
//! |---------|-----------------------------------------------------------------|
//! | 1.0     | identities, authentication (ldap, properties, users)            |
//! | 1.1-1.2 | authorization, truststore, jaas, ldap username filters          |
//! | 1.3-1.4 | plug-ins, explicit local authentication, keystore aliases       |
//! | 1.5     | ldap authorization                                              |
//! | 2.0-2.1 | ldap caches, empty-password and username-load options           |
//!
//! Up to 1.2 every realm with authentication implicitly allowed local
//! authentication; the parser adds that resource itself.

use crate::descriptor::ResourceKind;
use crate::error::ParseError;
use crate::model::{Address, Operation, SchemaVersion};
use crate::xml::StartElement;

use super::context::{missing_attribute, missing_element, unexpected_element, Choice, ParseCx, Singles};
use super::ldap::{self, LdapFlavor};
use super::{select, SectionGrammar};

/// Default user of the implicit local authentication of old schemas.
pub(crate) const IMPLICIT_LOCAL_USER: &str = "$local";

pub(crate) fn grammar(version: SchemaVersion) -> &'static dyn SectionGrammar {
    use SchemaVersion::*;
    match version {
        V1_0 => &Realm1_0,
        V1_1 | V1_2 => &Realm1_1,
        V1_3 | V1_4 => &Realm1_3,
        V1_5 => &Realm1_5,
        V2_0 | V2_1 => &Realm2_0,
    }
}

pub(crate) fn parse_security_realms(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let grammar = select("security-realm", cx.version, grammar);
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "security-realm" => grammar.parse(cx, &child, management)?,
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

// =============================================================================
// Families
// =============================================================================

struct Realm1_0;

impl SectionGrammar for Realm1_0 {
    fn family(&self) -> &'static str {
        "1.0"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        let realm = add_realm(cx, element, base)?;
        let mut singles = Singles::new();
        while let Some(child) = cx.next_child(element)? {
            match child.name.as_str() {
                "server-identities" => {
                    singles.check(&child)?;
                    server_identities(cx, &child, &realm, &KEYSTORE_1_0)?;
                }
                "authentication" => {
                    singles.check(&child)?;
                    authentication_1_0(cx, &child, &realm)?;
                    implicit_local(cx, &realm);
                }
                _ => return Err(unexpected_element(&child)),
            }
        }
        Ok(())
    }
}

struct Realm1_1;

impl SectionGrammar for Realm1_1 {
    fn family(&self) -> &'static str {
        "1.1-1.2"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        let realm = add_realm(cx, element, base)?;
        let mut singles = Singles::new();
        while let Some(child) = cx.next_child(element)? {
            match child.name.as_str() {
                "server-identities" => {
                    singles.check(&child)?;
                    server_identities(cx, &child, &realm, &KEYSTORE_1_0)?;
                }
                "authentication" => {
                    singles.check(&child)?;
                    authentication_1_1(cx, &child, &realm)?;
                    implicit_local(cx, &realm);
                }
                "authorization" => {
                    singles.check(&child)?;
                    authorization(cx, &child, &realm, AUTHORIZATION_1_1, None)?;
                }
                _ => return Err(unexpected_element(&child)),
            }
        }
        Ok(())
    }
}

struct Realm1_3;

impl SectionGrammar for Realm1_3 {
    fn family(&self) -> &'static str {
        "1.3-1.4"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        realm_1_3(cx, element, base, AUTHORIZATION_1_3, LdapFlavor::V1_1, None)
    }
}

struct Realm1_5;

impl SectionGrammar for Realm1_5 {
    fn family(&self) -> &'static str {
        "1.5"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        realm_1_3(
            cx,
            element,
            base,
            AUTHORIZATION_1_5,
            LdapFlavor::V1_1,
            Some(LdapFlavor::V1_1),
        )
    }
}

struct Realm2_0;

impl SectionGrammar for Realm2_0 {
    fn family(&self) -> &'static str {
        "2.0-2.1"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        realm_1_3(
            cx,
            element,
            base,
            AUTHORIZATION_1_5,
            LdapFlavor::V2_0,
            Some(LdapFlavor::V2_0),
        )
    }
}

/// Realm body shared from 1.3 on; later families differ only in the ldap
/// grammar and the authorization menu.
fn realm_1_3(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    base: &Address,
    authorization_menu: &'static [&'static str],
    ldap_authentication: LdapFlavor,
    ldap_authorization: Option<LdapFlavor>,
) -> Result<(), ParseError> {
    let realm = add_realm(cx, element, base)?;
    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "plug-ins" => {
                singles.check(&child)?;
                plug_ins(cx, &child, &realm)?;
            }
            "server-identities" => {
                singles.check(&child)?;
                server_identities(cx, &child, &realm, &KEYSTORE_1_3)?;
            }
            "authentication" => {
                singles.check(&child)?;
                authentication_1_3(cx, &child, &realm, ldap_authentication)?;
            }
            "authorization" => {
                singles.check(&child)?;
                authorization(cx, &child, &realm, authorization_menu, ldap_authorization)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

fn add_realm(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
) -> Result<Address, ParseError> {
    let mut name = None;
    cx.read_attributes(element, &["name"], &["name"], |attr| {
        name = Some(attr.value.clone());
        Ok(())
    })?;
    let name = name.ok_or_else(|| missing_attribute(element, &["name"]))?;
    let realm = management.append("security-realm", name);
    cx.push(Operation::add(realm.clone()));
    Ok(realm)
}

fn implicit_local(cx: &mut ParseCx<'_, '_>, realm: &Address) {
    let mut op = Operation::add(realm.append("authentication", "local"));
    op.set("default-user", IMPLICIT_LOCAL_USER);
    cx.push(op);
}

// =============================================================================
// Server identities and keystores
// =============================================================================

/// Keystore attribute set of one family.
struct KeystoreGrammar {
    allowed: &'static [&'static str],
    required: &'static [&'static str],
}

const KEYSTORE_1_0: KeystoreGrammar = KeystoreGrammar {
    allowed: &["path", "password", "relative-to"],
    required: &["path", "password"],
};

const KEYSTORE_1_3: KeystoreGrammar = KeystoreGrammar {
    allowed: &["path", "keystore-password", "relative-to", "alias", "key-password"],
    required: &["path", "keystore-password"],
};

const TRUSTSTORE_1_3: KeystoreGrammar = KeystoreGrammar {
    allowed: &["path", "keystore-password", "relative-to"],
    required: &["path", "keystore-password"],
};

fn server_identities(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    keystore_grammar: &KeystoreGrammar,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "secret" => {
                singles.check(&child)?;
                let mut op = Operation::add(realm.append("server-identity", "secret"));
                cx.set_attributes(&child, ResourceKind::SecretIdentity, &["value"], &["value"], &mut op)?;
                cx.require_no_content(&child)?;
                cx.push(op);
            }
            "ssl" => {
                singles.check(&child)?;
                let mut op = Operation::add(realm.append("server-identity", "ssl"));
                cx.set_attributes(&child, ResourceKind::SslIdentity, &["protocol"], &[], &mut op)?;
                let mut keystores = Singles::new();
                while let Some(store) = cx.next_child(&child)? {
                    match store.name.as_str() {
                        "keystore" => {
                            keystores.check(&store)?;
                            keystore(cx, &store, ResourceKind::SslIdentity, keystore_grammar, &mut op)?;
                        }
                        _ => return Err(unexpected_element(&store)),
                    }
                }
                cx.push(op);
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

/// Reads keystore attributes onto the operation of the owning resource.
fn keystore(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    kind: ResourceKind,
    grammar: &KeystoreGrammar,
    op: &mut Operation,
) -> Result<(), ParseError> {
    cx.read_attributes(element, grammar.allowed, grammar.required, |attr| {
        let model_name = match attr.name.as_str() {
            "path" => "keystore-path",
            "relative-to" => "keystore-relative-to",
            "password" | "keystore-password" => "keystore-password",
            other => other,
        };
        cx.set(element, kind, model_name, attr, op)
    })?;
    cx.require_no_content(element)
}

fn truststore(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    grammar: &KeystoreGrammar,
) -> Result<(), ParseError> {
    let mut op = Operation::add(realm.append("authentication", "truststore"));
    keystore(cx, element, ResourceKind::Truststore, grammar, &mut op)?;
    cx.push(op);
    Ok(())
}

// =============================================================================
// Authentication
// =============================================================================

fn authentication_1_0(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut choice = Choice::new(&["ldap", "properties", "users"]);
    while let Some(child) = cx.next_child(element)? {
        if !choice.contains(&child.name) {
            return Err(unexpected_element(&child));
        }
        choice.select(&child)?;
        match child.name.as_str() {
            "ldap" => ldap::authentication(cx, &child, realm, LdapFlavor::V1_0)?,
            "properties" => properties_authentication(cx, &child, realm, false)?,
            "users" => users(cx, &child, realm)?,
            _ => return Err(unexpected_element(&child)),
        }
    }
    choice.finish(element)
}

fn authentication_1_1(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut singles = Singles::new();
    let mut choice = Choice::new(&["jaas", "ldap", "properties", "users"]);
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "truststore" => {
                singles.check(&child)?;
                truststore(cx, &child, realm, &KEYSTORE_1_0)?;
            }
            name if choice.contains(name) => {
                choice.select(&child)?;
                match name {
                    "jaas" => jaas(cx, &child, realm)?,
                    "ldap" => ldap::authentication(cx, &child, realm, LdapFlavor::V1_1)?,
                    "properties" => properties_authentication(cx, &child, realm, true)?,
                    _ => users(cx, &child, realm)?,
                }
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    choice.finish(element)
}

fn authentication_1_3(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    ldap_flavor: LdapFlavor,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut singles = Singles::new();
    let mut choice = Choice::new(&["jaas", "ldap", "properties", "users", "plug-in"]);
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "truststore" => {
                singles.check(&child)?;
                truststore(cx, &child, realm, &TRUSTSTORE_1_3)?;
            }
            "local" => {
                singles.check(&child)?;
                let mut op = Operation::add(realm.append("authentication", "local"));
                cx.set_attributes(
                    &child,
                    ResourceKind::LocalAuthentication,
                    &["default-user", "allowed-users"],
                    &[],
                    &mut op,
                )?;
                cx.require_no_content(&child)?;
                cx.push(op);
            }
            name if choice.contains(name) => {
                choice.select(&child)?;
                match name {
                    "jaas" => jaas(cx, &child, realm)?,
                    "ldap" => ldap::authentication(cx, &child, realm, ldap_flavor)?,
                    "properties" => properties_authentication(cx, &child, realm, true)?,
                    "users" => users(cx, &child, realm)?,
                    _ => plug_in(cx, &child, realm, "authentication", ResourceKind::PlugInAuthentication)?,
                }
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    choice.finish(element)
}

/// `plain_text_attribute` is false for 1.0, where property files were always
/// plain text and the flag is synthesized.
fn properties_authentication(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    plain_text_attribute: bool,
) -> Result<(), ParseError> {
    let mut op = Operation::add(realm.append("authentication", "properties"));
    let allowed: &[&str] = if plain_text_attribute {
        &["path", "relative-to", "plain-text"]
    } else {
        &["path", "relative-to"]
    };
    cx.set_attributes(element, ResourceKind::PropertiesAuthentication, allowed, &["path"], &mut op)?;
    if !plain_text_attribute {
        op.set("plain-text", true);
    }
    cx.require_no_content(element)?;
    cx.push(op);
    Ok(())
}

fn jaas(cx: &mut ParseCx<'_, '_>, element: &StartElement, realm: &Address) -> Result<(), ParseError> {
    let mut op = Operation::add(realm.append("authentication", "jaas"));
    cx.set_attributes(element, ResourceKind::JaasAuthentication, &["name"], &["name"], &mut op)?;
    cx.require_no_content(element)?;
    cx.push(op);
    Ok(())
}

fn users(cx: &mut ParseCx<'_, '_>, element: &StartElement, realm: &Address) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let users = realm.append("authentication", "users");
    cx.push(Operation::add(users.clone()));
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "user" => user(cx, &child, &users)?,
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

fn user(cx: &mut ParseCx<'_, '_>, element: &StartElement, users: &Address) -> Result<(), ParseError> {
    let mut username = None;
    cx.read_attributes(element, &["username"], &["username"], |attr| {
        username = Some(attr.value.clone());
        Ok(())
    })?;
    let username = username.ok_or_else(|| missing_attribute(element, &["username"]))?;
    let mut op = Operation::add(users.append("user", username));

    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "password" => {
                singles.check(&child)?;
                cx.require_no_attributes(&child)?;
                let text = cx.element_text(&child)?;
                cx.set_raw(&child, ResourceKind::User, "password", &text, &mut op)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    if !singles.contains("password") {
        return Err(missing_element(element, &["password"]));
    }
    cx.push(op);
    Ok(())
}

/// `<plug-in name=>` under authentication or authorization, with optional
/// `<properties>`.
fn plug_in(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    section: &str,
    kind: ResourceKind,
) -> Result<(), ParseError> {
    let address = realm.append(section, "plug-in");
    let mut op = Operation::add(address.clone());
    cx.set_attributes(element, kind, &["name"], &["name"], &mut op)?;
    cx.push(op);

    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "properties" => {
                singles.check(&child)?;
                plug_in_properties(cx, &child, &address)?;
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

fn plug_in_properties(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    plug_in: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    while let Some(child) = cx.next_child(element)? {
        if child.name != "property" {
            return Err(unexpected_element(&child));
        }
        let mut op = Operation::add(Address::root());
        let mut name = None;
        cx.read_attributes(&child, &["name", "value"], &["name"], |attr| {
            match attr.name.as_str() {
                "name" => {
                    name = Some(attr.value.clone());
                    Ok(())
                }
                other => cx.set(&child, ResourceKind::PlugInProperty, other, attr, &mut op),
            }
        })?;
        let name = name.ok_or_else(|| missing_attribute(&child, &["name"]))?;
        op.address = plug_in.append("property", name);
        cx.require_no_content(&child)?;
        cx.push(op);
    }
    Ok(())
}

fn plug_ins(cx: &mut ParseCx<'_, '_>, element: &StartElement, realm: &Address) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    while let Some(child) = cx.next_child(element)? {
        if child.name != "plug-in" {
            return Err(unexpected_element(&child));
        }
        let mut module = None;
        cx.read_attributes(&child, &["module"], &["module"], |attr| {
            module = Some(attr.value.clone());
            Ok(())
        })?;
        let module = module.ok_or_else(|| missing_attribute(&child, &["module"]))?;
        cx.require_no_content(&child)?;
        cx.push(Operation::add(realm.append("plug-in", module)));
    }
    Ok(())
}

// =============================================================================
// Authorization
// =============================================================================

const AUTHORIZATION_1_1: &[&str] = &["properties"];
const AUTHORIZATION_1_3: &[&str] = &["properties", "plug-in"];
const AUTHORIZATION_1_5: &[&str] = &["properties", "plug-in", "ldap"];

fn authorization(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    realm: &Address,
    menu: &'static [&'static str],
    ldap_flavor: Option<LdapFlavor>,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    let mut choice = Choice::new(menu);
    while let Some(child) = cx.next_child(element)? {
        if !choice.contains(&child.name) {
            return Err(unexpected_element(&child));
        }
        choice.select(&child)?;
        match (child.name.as_str(), ldap_flavor) {
            ("properties", _) => {
                let mut op = Operation::add(realm.append("authorization", "properties"));
                cx.set_attributes(
                    &child,
                    ResourceKind::PropertiesAuthorization,
                    &["path", "relative-to"],
                    &["path"],
                    &mut op,
                )?;
                cx.require_no_content(&child)?;
                cx.push(op);
            }
            ("plug-in", _) => {
                plug_in(cx, &child, realm, "authorization", ResourceKind::PlugInAuthorization)?
            }
            ("ldap", Some(flavor)) => ldap::authorization(cx, &child, realm, flavor)?,
            _ => return Err(unexpected_element(&child)),
        }
    }
    choice.finish(element)
}
