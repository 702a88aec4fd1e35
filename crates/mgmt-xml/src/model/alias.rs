//! Derived aliases for role-mapping principals.
//!
//! An `<include>`/`<exclude>` principal is addressed by its alias. Documents
//! may omit the alias, in which case it is derived from the principal itself
//! as `{type}-{name}[@{realm}]`. The marshaller leaves the attribute out
//! whenever the stored alias equals the derived one.

use std::fmt;

/// Kind of principal referenced by a role-mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrincipalType {
    User,
    Group,
}

impl PrincipalType {
    /// The element name used in documents (`user` / `group`).
    pub fn element_name(self) -> &'static str {
        match self {
            PrincipalType::User => "user",
            PrincipalType::Group => "group",
        }
    }

    /// The model value stored in the `type` attribute (`USER` / `GROUP`).
    pub fn model_value(self) -> &'static str {
        match self {
            PrincipalType::User => "USER",
            PrincipalType::Group => "GROUP",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "user" => Some(PrincipalType::User),
            "group" => Some(PrincipalType::Group),
            _ => None,
        }
    }

    pub fn from_model_value(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(PrincipalType::User),
            "GROUP" => Some(PrincipalType::Group),
            _ => None,
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_value())
    }
}

/// Derives the alias of a principal with no explicit alias.
///
/// Parser and marshaller must both call this so the comparison used to
/// suppress the alias attribute is exact.
pub fn derive_alias(principal: PrincipalType, name: &str, realm: Option<&str>) -> String {
    let mut alias = format!("{}-{}", principal.element_name(), name);
    if let Some(realm) = realm {
        alias.push('@');
        alias.push_str(realm);
    }
    alias
}
