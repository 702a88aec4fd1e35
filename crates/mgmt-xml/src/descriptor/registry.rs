//! The descriptor registry.
//!
//! One [`ResourceDescriptor`] per resource type, each listing its attributes.
//! The registry is built once and shared read-only (typically behind an
//! `Arc`) by any number of parsers, marshallers and appliers.

use rustc_hash::FxHashMap;

use crate::descriptor::AttributeDescriptor;
use crate::model::Address;

/// Every resource type the management section can create or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    SecurityRealm,
    PlugIn,
    SecretIdentity,
    SslIdentity,
    Truststore,
    LocalAuthentication,
    JaasAuthentication,
    LdapAuthentication,
    PropertiesAuthentication,
    UsersAuthentication,
    User,
    PlugInAuthentication,
    PlugInProperty,
    LdapCache,
    PropertiesAuthorization,
    PlugInAuthorization,
    LdapAuthorization,
    UsernameIsDn,
    UsernameFilter,
    UsernameAdvancedFilter,
    GroupToPrincipal,
    PrincipalToGroup,
    LdapConnection,
    NativeInterface,
    HttpInterface,
    NativeRemotingInterface,
    AuditLog,
    JsonFormatter,
    FileHandler,
    SyslogHandler,
    SyslogUdp,
    SyslogTcp,
    SyslogTls,
    TlsTruststore,
    TlsClientCertStore,
    AuditLogger,
    HandlerReference,
    Authorization,
    RoleMapping,
    RoleMappingPrincipal,
    VaultExpressionConstraint,
    SensitivityClassification,
    ApplicationClassification,
}

impl ResourceKind {
    /// Short human-readable name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::SecurityRealm => "security-realm",
            ResourceKind::PlugIn => "plug-in",
            ResourceKind::SecretIdentity => "server-identity=secret",
            ResourceKind::SslIdentity => "server-identity=ssl",
            ResourceKind::Truststore => "authentication=truststore",
            ResourceKind::LocalAuthentication => "authentication=local",
            ResourceKind::JaasAuthentication => "authentication=jaas",
            ResourceKind::LdapAuthentication => "authentication=ldap",
            ResourceKind::PropertiesAuthentication => "authentication=properties",
            ResourceKind::UsersAuthentication => "authentication=users",
            ResourceKind::User => "user",
            ResourceKind::PlugInAuthentication => "authentication=plug-in",
            ResourceKind::PlugInProperty => "property",
            ResourceKind::LdapCache => "cache",
            ResourceKind::PropertiesAuthorization => "authorization=properties",
            ResourceKind::PlugInAuthorization => "authorization=plug-in",
            ResourceKind::LdapAuthorization => "authorization=ldap",
            ResourceKind::UsernameIsDn => "username-to-dn=username-is-dn",
            ResourceKind::UsernameFilter => "username-to-dn=username-filter",
            ResourceKind::UsernameAdvancedFilter => "username-to-dn=advanced-filter",
            ResourceKind::GroupToPrincipal => "group-search=group-to-principal",
            ResourceKind::PrincipalToGroup => "group-search=principal-to-group",
            ResourceKind::LdapConnection => "ldap-connection",
            ResourceKind::NativeInterface => "management-interface=native-interface",
            ResourceKind::HttpInterface => "management-interface=http-interface",
            ResourceKind::NativeRemotingInterface => {
                "management-interface=native-remoting-interface"
            }
            ResourceKind::AuditLog => "access=audit",
            ResourceKind::JsonFormatter => "json-formatter",
            ResourceKind::FileHandler => "file-handler",
            ResourceKind::SyslogHandler => "syslog-handler",
            ResourceKind::SyslogUdp => "protocol=udp",
            ResourceKind::SyslogTcp => "protocol=tcp",
            ResourceKind::SyslogTls => "protocol=tls",
            ResourceKind::TlsTruststore => "authentication=truststore (syslog)",
            ResourceKind::TlsClientCertStore => "authentication=client-certificate-store",
            ResourceKind::AuditLogger => "logger=audit-log",
            ResourceKind::HandlerReference => "handler",
            ResourceKind::Authorization => "access=authorization",
            ResourceKind::RoleMapping => "role-mapping",
            ResourceKind::RoleMappingPrincipal => "include/exclude",
            ResourceKind::VaultExpressionConstraint => "constraint=vault-expression",
            ResourceKind::SensitivityClassification => "constraint=sensitivity-classification",
            ResourceKind::ApplicationClassification => "constraint=application-classification",
        }
    }
}

/// The attributes of one resource type, in the order they are written.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub attributes: Vec<AttributeDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, attributes: Vec<AttributeDescriptor>) -> Self {
        Self { kind, attributes }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// One step of a built-in resource pattern; `None` matches any value.
type PatternStep = (&'static str, Option<&'static str>);

/// Immutable table of resource descriptors plus the resources the runtime
/// provides without an explicit add.
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    resources: FxHashMap<ResourceKind, ResourceDescriptor>,
    builtins: Vec<Vec<PatternStep>>,
}

impl DescriptorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a resource descriptor.
    pub fn register(mut self, descriptor: ResourceDescriptor) -> Self {
        self.resources.insert(descriptor.kind, descriptor);
        self
    }

    /// Registers a built-in resource pattern, relative to
    /// `core-service=management`.
    pub fn builtin(mut self, pattern: &[PatternStep]) -> Self {
        self.builtins.push(pattern.to_vec());
        self
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceDescriptor> {
        self.resources.get(&kind)
    }

    pub fn attribute(&self, kind: ResourceKind, name: &str) -> Option<&AttributeDescriptor> {
        self.resource(kind).and_then(|r| r.attribute(name))
    }

    /// Returns the attributes of a resource in registration order.
    pub fn attributes(&self, kind: ResourceKind) -> &[AttributeDescriptor] {
        self.resource(kind)
            .map(|r| r.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Returns true if the runtime provides the resource at `address`.
    ///
    /// Anything outside `core-service=management` (the server or host root
    /// the section is anchored at) counts as provided.
    pub fn is_builtin(&self, address: &Address) -> bool {
        let pairs = address.pairs();
        let Some(start) = pairs
            .iter()
            .position(|(k, v)| *k == "core-service" && *v == "management")
        else {
            return true;
        };
        let rest = &pairs[start + 1..];
        rest.is_empty()
            || self.builtins.iter().any(|pattern| {
                pattern.len() == rest.len()
                    && pattern
                        .iter()
                        .zip(rest)
                        .all(|((pk, pv), (k, v))| pk == k && pv.is_none_or(|pv| pv == *v))
            })
    }

    /// Builds the registry describing the management model.
    pub fn standard() -> Self {
        use AttributeDescriptor as A;
        use ResourceKind as K;

        const REFERRALS: &[&str] = &["FOLLOW", "IGNORE", "THROW"];
        const GROUP_NAME: &[&str] = &["SIMPLE", "DISTINGUISHED_NAME"];
        const CACHE_BOUNDS: (i64, i64) = (0, i32::MAX as i64);
        const SYSLOG_FORMAT: &[&str] = &["RFC3164", "RFC5424"];
        const FACILITY: &[&str] = &[
            "KERNEL",
            "USER_LEVEL",
            "MAIL_SYSTEM",
            "SYSTEM_DAEMONS",
            "SECURITY",
            "SYSLOGD",
            "LINE_PRINTER",
            "NETWORK_NEWS",
            "UUCP",
            "CLOCK_DAEMON",
            "SECURITY2",
            "FTP_DAEMON",
            "NTP",
            "LOG_AUDIT",
            "LOG_ALERT",
            "CLOCK_DAEMON2",
            "LOCAL_USE_0",
            "LOCAL_USE_1",
            "LOCAL_USE_2",
            "LOCAL_USE_3",
            "LOCAL_USE_4",
            "LOCAL_USE_5",
            "LOCAL_USE_6",
            "LOCAL_USE_7",
        ];
        const MESSAGE_TRANSFER: &[&str] = &["OCTET_COUNTING", "NON_TRANSPARENT_FRAMING"];
        const PRINCIPAL_TYPE: &[&str] = &["USER", "GROUP"];
        const PROVIDER: &[&str] = &["simple", "rbac"];
        const COMBINATION_POLICY: &[&str] = &["permissive", "rejecting"];

        let port = || A::int("port", 0, 65535).expressions();
        let keystore = |with_key_password: bool| {
            let mut attrs = vec![
                A::string("keystore-path").xml_name("path").expressions(),
                A::string("keystore-relative-to")
                    .xml_name("relative-to")
                    .expressions(),
                A::string("keystore-password").expressions(),
            ];
            if with_key_password {
                attrs.push(A::string("alias").expressions());
                attrs.push(A::string("key-password").expressions());
            }
            attrs
        };
        let group_search = |mut attrs: Vec<AttributeDescriptor>| {
            attrs.extend([
                A::enumeration("group-name", GROUP_NAME).default_value("SIMPLE"),
                A::boolean("iterative").default_value(false).expressions(),
                A::string("group-dn-attribute").default_value("dn").expressions(),
                A::string("group-name-attribute").default_value("uid").expressions(),
            ]);
            attrs
        };
        let username_to_dn = |extra: Vec<AttributeDescriptor>| {
            let mut attrs = vec![A::boolean("force").default_value(false).expressions()];
            attrs.extend(extra);
            attrs
        };

        Self::new()
            // Security realms
            .register(ResourceDescriptor::new(K::SecurityRealm, vec![]))
            .register(ResourceDescriptor::new(K::PlugIn, vec![]))
            .register(ResourceDescriptor::new(
                K::SecretIdentity,
                vec![A::string("value").expressions()],
            ))
            .register(ResourceDescriptor::new(K::SslIdentity, {
                let mut attrs = vec![A::string("protocol").default_value("TLS").expressions()];
                attrs.extend(keystore(true));
                attrs
            }))
            .register(ResourceDescriptor::new(K::Truststore, keystore(false)))
            .register(ResourceDescriptor::new(
                K::LocalAuthentication,
                vec![
                    A::string("default-user").expressions(),
                    A::string("allowed-users").expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::JaasAuthentication,
                vec![A::string("name").expressions()],
            ))
            .register(ResourceDescriptor::new(
                K::LdapAuthentication,
                vec![
                    A::string("connection"),
                    A::string("base-dn").expressions(),
                    A::boolean("recursive").default_value(false).expressions(),
                    A::string("user-dn").default_value("dn").expressions(),
                    A::boolean("allow-empty-passwords")
                        .default_value(false)
                        .expressions(),
                    A::string("username-load").expressions(),
                    A::string("username-attribute")
                        .xml_name("attribute")
                        .expressions(),
                    A::string("advanced-filter")
                        .xml_name("filter")
                        .expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::PropertiesAuthentication,
                vec![
                    A::string("path").expressions(),
                    A::string("relative-to"),
                    A::boolean("plain-text").default_value(false).expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(K::UsersAuthentication, vec![]))
            .register(ResourceDescriptor::new(
                K::User,
                vec![A::string("password").expressions()],
            ))
            .register(ResourceDescriptor::new(
                K::PlugInAuthentication,
                vec![A::string("name")],
            ))
            .register(ResourceDescriptor::new(
                K::PlugInProperty,
                vec![A::string("value").expressions()],
            ))
            .register(ResourceDescriptor::new(
                K::LdapCache,
                vec![
                    A::int("eviction-time", CACHE_BOUNDS.0, CACHE_BOUNDS.1)
                        .default_value(900)
                        .expressions(),
                    A::boolean("cache-failures").default_value(false).expressions(),
                    A::int("max-cache-size", CACHE_BOUNDS.0, CACHE_BOUNDS.1)
                        .default_value(0)
                        .expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::PropertiesAuthorization,
                vec![A::string("path").expressions(), A::string("relative-to")],
            ))
            .register(ResourceDescriptor::new(
                K::PlugInAuthorization,
                vec![A::string("name")],
            ))
            .register(ResourceDescriptor::new(
                K::LdapAuthorization,
                vec![A::string("connection")],
            ))
            .register(ResourceDescriptor::new(K::UsernameIsDn, username_to_dn(vec![])))
            .register(ResourceDescriptor::new(
                K::UsernameFilter,
                username_to_dn(vec![
                    A::string("base-dn").expressions(),
                    A::boolean("recursive").default_value(false).expressions(),
                    A::string("user-dn-attribute").default_value("dn").expressions(),
                    A::string("attribute").default_value("uid").expressions(),
                ]),
            ))
            .register(ResourceDescriptor::new(
                K::UsernameAdvancedFilter,
                username_to_dn(vec![
                    A::string("base-dn").expressions(),
                    A::boolean("recursive").default_value(false).expressions(),
                    A::string("user-dn-attribute").default_value("dn").expressions(),
                    A::string("filter").expressions(),
                ]),
            ))
            .register(ResourceDescriptor::new(
                K::GroupToPrincipal,
                group_search(vec![
                    A::string("base-dn").expressions(),
                    A::boolean("recursive").default_value(false).expressions(),
                    A::enumeration("search-by", GROUP_NAME).default_value("DISTINGUISHED_NAME"),
                    A::string("principal-attribute")
                        .default_value("member")
                        .expressions(),
                ]),
            ))
            .register(ResourceDescriptor::new(
                K::PrincipalToGroup,
                group_search(vec![A::string("group-attribute")
                    .default_value("memberOf")
                    .expressions()]),
            ))
            // Outbound connections
            .register(ResourceDescriptor::new(
                K::LdapConnection,
                vec![
                    A::string("url").expressions(),
                    A::string("search-dn").expressions(),
                    A::string("search-credential").expressions(),
                    A::string("security-realm"),
                    A::string("initial-context-factory").expressions(),
                    A::enumeration("referrals", REFERRALS).default_value("IGNORE"),
                ],
            ))
            // Management interfaces
            .register(ResourceDescriptor::new(
                K::NativeInterface,
                vec![
                    A::string("security-realm"),
                    A::string("sasl-protocol").default_value("remote").expressions(),
                    A::string("server-name").expressions(),
                    A::string("interface"),
                    port(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::HttpInterface,
                vec![
                    A::string("security-realm"),
                    A::boolean("console-enabled").default_value(true).expressions(),
                    A::boolean("http-upgrade-enabled")
                        .default_value(false)
                        .expressions(),
                    A::string("sasl-protocol").default_value("remote").expressions(),
                    A::string("server-name").expressions(),
                    A::string("interface"),
                    port(),
                    A::int("secure-port", 0, 65535).expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(K::NativeRemotingInterface, vec![]))
            // Audit log
            .register(ResourceDescriptor::new(K::AuditLog, vec![]))
            .register(ResourceDescriptor::new(
                K::JsonFormatter,
                vec![
                    A::boolean("compact").default_value(false).expressions(),
                    A::string("date-format")
                        .default_value("yyyy-MM-dd HH:mm:ss")
                        .expressions(),
                    A::string("date-separator").default_value(" - ").expressions(),
                    A::boolean("escape-control-characters")
                        .default_value(false)
                        .expressions(),
                    A::boolean("escape-new-line").default_value(false).expressions(),
                    A::boolean("include-date").default_value(true).expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::FileHandler,
                vec![
                    A::string("formatter"),
                    A::int("max-failure-count", 0, i32::MAX as i64)
                        .default_value(10)
                        .expressions(),
                    A::string("path").expressions(),
                    A::string("relative-to"),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::SyslogHandler,
                vec![
                    A::string("formatter"),
                    A::int("max-failure-count", 0, i32::MAX as i64)
                        .default_value(10)
                        .expressions(),
                    A::enumeration("syslog-format", SYSLOG_FORMAT).default_value("RFC5424"),
                    A::int("max-length", 0, i32::MAX as i64).expressions(),
                    A::boolean("truncate").default_value(false).expressions(),
                    A::enumeration("facility", FACILITY).default_value("USER_LEVEL"),
                    A::string("app-name").expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::SyslogUdp,
                vec![A::string("host").default_value("localhost").expressions(), port()],
            ))
            .register(ResourceDescriptor::new(
                K::SyslogTcp,
                vec![
                    A::string("host").default_value("localhost").expressions(),
                    port(),
                    A::enumeration("message-transfer", MESSAGE_TRANSFER)
                        .default_value("NON_TRANSPARENT_FRAMING"),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::SyslogTls,
                vec![
                    A::string("host").default_value("localhost").expressions(),
                    port(),
                    A::enumeration("message-transfer", MESSAGE_TRANSFER)
                        .default_value("NON_TRANSPARENT_FRAMING"),
                ],
            ))
            .register(ResourceDescriptor::new(K::TlsTruststore, keystore(false)))
            .register(ResourceDescriptor::new(K::TlsClientCertStore, {
                let mut attrs = keystore(false);
                attrs.push(A::string("key-password").expressions());
                attrs
            }))
            .register(ResourceDescriptor::new(
                K::AuditLogger,
                vec![
                    A::boolean("log-boot").default_value(true).expressions(),
                    A::boolean("log-read-only").default_value(false).expressions(),
                    A::boolean("enabled").default_value(true).expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(K::HandlerReference, vec![]))
            // Access control
            .register(ResourceDescriptor::new(
                K::Authorization,
                vec![
                    A::enumeration("provider", PROVIDER).default_value("simple"),
                    A::enumeration("permission-combination-policy", COMBINATION_POLICY)
                        .default_value("permissive"),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::RoleMapping,
                vec![A::boolean("include-all").default_value(false).expressions()],
            ))
            .register(ResourceDescriptor::new(
                K::RoleMappingPrincipal,
                vec![
                    A::string("name"),
                    A::string("realm"),
                    A::enumeration("type", PRINCIPAL_TYPE),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::VaultExpressionConstraint,
                vec![
                    A::boolean("configured-requires-read")
                        .xml_name("requires-read")
                        .expressions(),
                    A::boolean("configured-requires-write")
                        .xml_name("requires-write")
                        .expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::SensitivityClassification,
                vec![
                    A::boolean("configured-requires-addressable")
                        .xml_name("requires-addressable")
                        .expressions(),
                    A::boolean("configured-requires-read")
                        .xml_name("requires-read")
                        .expressions(),
                    A::boolean("configured-requires-write")
                        .xml_name("requires-write")
                        .expressions(),
                ],
            ))
            .register(ResourceDescriptor::new(
                K::ApplicationClassification,
                vec![A::boolean("configured-application")
                    .xml_name("application")
                    .expressions()],
            ))
            .builtin(&[("access", Some("authorization"))])
            .builtin(&[
                ("access", Some("authorization")),
                ("constraint", Some("vault-expression")),
            ])
            .builtin(&[
                ("access", Some("authorization")),
                ("constraint", Some("sensitivity-classification")),
                ("type", None),
                ("classification", None),
            ])
            .builtin(&[
                ("access", Some("authorization")),
                ("constraint", Some("application-classification")),
                ("type", None),
                ("classification", None),
            ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ValueKind;

    #[test]
    fn test_standard_registry_lookup() {
        let registry = DescriptorRegistry::standard();
        let ssl = registry.attribute(ResourceKind::SslIdentity, "keystore-path");
        assert_eq!(ssl.map(|a| a.xml_name), Some("path"));
        assert!(registry.attribute(ResourceKind::Truststore, "alias").is_none());
        assert!(registry.attribute(ResourceKind::TlsClientCertStore, "key-password").is_some());
        assert!(registry.attribute(ResourceKind::TlsTruststore, "key-password").is_none());
        assert_eq!(
            registry.attribute(ResourceKind::LdapCache, "eviction-time").map(|a| a.kind),
            Some(ValueKind::Int { min: 0, max: i32::MAX as i64 })
        );
        assert!(registry.attributes(ResourceKind::SecurityRealm).is_empty());
    }

    #[test]
    fn test_attribute_order_follows_registration() {
        let registry = DescriptorRegistry::standard();
        let names: Vec<_> = registry
            .attributes(ResourceKind::AuditLogger)
            .iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["log-boot", "log-read-only", "enabled"]);
    }

    #[test]
    fn test_builtin_patterns() {
        let registry = DescriptorRegistry::standard();
        let management = Address::root().append("core-service", "management");
        let authz = management.append("access", "authorization");

        assert!(registry.is_builtin(&Address::root()));
        assert!(registry.is_builtin(&Address::root().append("host", "master")));
        assert!(registry.is_builtin(&management));
        assert!(registry.is_builtin(&authz));
        assert!(registry.is_builtin(
            &authz
                .append("constraint", "sensitivity-classification")
                .append("type", "core")
                .append("classification", "socket-config")
        ));
        assert!(!registry.is_builtin(
            &authz.append("constraint", "sensitivity-classification").append("type", "core")
        ));
        assert!(!registry.is_builtin(&management.append("security-realm", "R")));
        assert!(!registry.is_builtin(&authz.append("role-mapping", "Monitor")));
    }

    #[test]
    fn test_custom_registry() {
        let registry = DescriptorRegistry::new().register(ResourceDescriptor::new(
            ResourceKind::JaasAuthentication,
            vec![AttributeDescriptor::string("name")],
        ));
        assert!(registry.attribute(ResourceKind::JaasAuthentication, "name").is_some());
        assert!(registry.resource(ResourceKind::LdapConnection).is_none());
        assert!(!registry.is_builtin(
            &Address::root()
                .append("core-service", "management")
                .append("access", "authorization")
        ));
    }
}
