//! `<audit-log>`: formatters, handlers and the loggers that reference them.

use crate::descriptor::ResourceKind;
use crate::error::ParseError;
use crate::model::{Address, DocumentContext, Operation, SchemaVersion};
use crate::xml::StartElement;

use super::context::{missing_attribute, unexpected_element, Choice, ParseCx, Singles};
use super::{select, SectionGrammar};

pub(crate) fn grammar(version: SchemaVersion) -> &'static dyn SectionGrammar {
    if version >= SchemaVersion::V1_5 {
        &AuditLog1_5
    } else {
        &AuditLogUnsupported
    }
}

pub(crate) fn parse_audit_log(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    management: &Address,
) -> Result<(), ParseError> {
    select("audit-log", cx.version, grammar).parse(cx, element, management)
}

struct AuditLogUnsupported;

impl SectionGrammar for AuditLogUnsupported {
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

struct AuditLog1_5;

impl SectionGrammar for AuditLog1_5 {
    fn family(&self) -> &'static str {
        "1.5+"
    }

    fn parse(
        &self,
        cx: &mut ParseCx<'_, '_>,
        element: &StartElement,
        base: &Address,
    ) -> Result<(), ParseError> {
        cx.require_namespace(element)?;
        cx.require_no_attributes(element)?;
        let audit = base.append("access", "audit");
        cx.push(Operation::add(audit.clone()));

        let mut singles = Singles::new();
        while let Some(child) = cx.next_child(element)? {
            match child.name.as_str() {
                "formatters" => {
                    singles.check(&child)?;
                    formatters(cx, &child, &audit)?;
                }
                "handlers" => {
                    singles.check(&child)?;
                    handlers(cx, &child, &audit)?;
                }
                "logger" => {
                    singles.check(&child)?;
                    logger(cx, &child, &audit.append("logger", "audit-log"))?;
                }
                "server-logger" => {
                    if cx.context != DocumentContext::Host {
                        return Err(ParseError::UnsupportedForVersion {
                            name: child.name.clone(),
                            context: format!("in {} documents", cx.context),
                            location: child.location,
                        });
                    }
                    singles.check(&child)?;
                    logger(cx, &child, &audit.append("server-logger", "audit-log"))?;
                }
                _ => return Err(unexpected_element(&child)),
            }
        }
        Ok(())
    }
}

/// Reads attributes, taking `name` as the address value and storing the
/// rest on an add operation under `parent.key=name`.
fn named_resource(
    cx: &ParseCx<'_, '_>,
    element: &StartElement,
    parent: &Address,
    key: &str,
    kind: ResourceKind,
    allowed: &[&'static str],
    required: &[&'static str],
) -> Result<Operation, ParseError> {
    let mut op = Operation::add(Address::root());
    let mut name = None;
    cx.read_attributes(element, allowed, required, |attr| match attr.name.as_str() {
        "name" => {
            name = Some(attr.value.clone());
            Ok(())
        }
        other => cx.set(element, kind, other, attr, &mut op),
    })?;
    let name = name.ok_or_else(|| missing_attribute(element, &["name"]))?;
    op.address = parent.append(key, name);
    Ok(op)
}

fn formatters(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    audit: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "json-formatter" => {
                let op = named_resource(
                    cx,
                    &child,
                    audit,
                    "json-formatter",
                    ResourceKind::JsonFormatter,
                    &[
                        "name",
                        "compact",
                        "date-format",
                        "date-separator",
                        "escape-control-characters",
                        "escape-new-line",
                        "include-date",
                    ],
                    &["name"],
                )?;
                cx.require_no_content(&child)?;
                cx.push(op);
            }
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

fn handlers(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    audit: &Address,
) -> Result<(), ParseError> {
    cx.require_no_attributes(element)?;
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "file-handler" => {
                let op = named_resource(
                    cx,
                    &child,
                    audit,
                    "file-handler",
                    ResourceKind::FileHandler,
                    &["name", "formatter", "max-failure-count", "path", "relative-to"],
                    &["name", "formatter", "path"],
                )?;
                cx.require_no_content(&child)?;
                cx.push(op);
            }
            "syslog-handler" => syslog_handler(cx, &child, audit)?,
            _ => return Err(unexpected_element(&child)),
        }
    }
    Ok(())
}

fn syslog_handler(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    audit: &Address,
) -> Result<(), ParseError> {
    let op = named_resource(
        cx,
        element,
        audit,
        "syslog-handler",
        ResourceKind::SyslogHandler,
        &[
            "name",
            "formatter",
            "max-failure-count",
            "syslog-format",
            "max-length",
            "truncate",
            "facility",
            "app-name",
        ],
        &["name", "formatter"],
    )?;
    let handler = op.address.clone();
    cx.push(op);

    // The transport is optional; the runtime falls back to udp.
    let mut protocol = Choice::new(&["udp", "tcp", "tls"]);
    while let Some(child) = cx.next_child(element)? {
        let (kind, allowed): (_, &[&str]) = match child.name.as_str() {
            "udp" => (ResourceKind::SyslogUdp, &["host", "port"]),
            "tcp" => (ResourceKind::SyslogTcp, &["host", "port", "message-transfer"]),
            "tls" => (ResourceKind::SyslogTls, &["host", "port", "message-transfer"]),
            _ => return Err(unexpected_element(&child)),
        };
        protocol.select(&child)?;
        let address = handler.append("protocol", child.name.as_str());
        let mut op = Operation::add(address.clone());
        cx.set_attributes(&child, kind, allowed, &[], &mut op)?;
        cx.push(op);
        if kind == ResourceKind::SyslogTls {
            tls_stores(cx, &child, &address)?;
        } else {
            cx.require_no_content(&child)?;
        }
    }
    Ok(())
}

fn tls_stores(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    protocol: &Address,
) -> Result<(), ParseError> {
    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        let (kind, allowed): (_, &[&str]) = match child.name.as_str() {
            "truststore" => (
                ResourceKind::TlsTruststore,
                &["path", "relative-to", "keystore-password"],
            ),
            "client-certificate-store" => (
                ResourceKind::TlsClientCertStore,
                &["path", "relative-to", "keystore-password", "key-password"],
            ),
            _ => return Err(unexpected_element(&child)),
        };
        singles.check(&child)?;
        let mut op = Operation::add(protocol.append("authentication", child.name.as_str()));
        cx.read_attributes(&child, allowed, &["path", "keystore-password"], |attr| {
            let model_name = match attr.name.as_str() {
                "path" => "keystore-path",
                "relative-to" => "keystore-relative-to",
                other => other,
            };
            cx.set(&child, kind, model_name, attr, &mut op)
        })?;
        cx.require_no_content(&child)?;
        cx.push(op);
    }
    Ok(())
}

/// `<logger>` or `<server-logger>` with its handler references.
fn logger(
    cx: &mut ParseCx<'_, '_>,
    element: &StartElement,
    logger: &Address,
) -> Result<(), ParseError> {
    let mut op = Operation::add(logger.clone());
    cx.set_attributes(
        element,
        ResourceKind::AuditLogger,
        &["log-boot", "log-read-only", "enabled"],
        &[],
        &mut op,
    )?;
    cx.push(op);

    let mut singles = Singles::new();
    while let Some(child) = cx.next_child(element)? {
        match child.name.as_str() {
            "handlers" => {
                singles.check(&child)?;
                cx.require_no_attributes(&child)?;
                while let Some(handler) = cx.next_child(&child)? {
                    if handler.name != "handler" {
                        return Err(unexpected_element(&handler));
                    }
                    let op = named_resource(
                        cx,
                        &handler,
                        logger,
                        "handler",
                        ResourceKind::HandlerReference,
                        &["name"],
                        &["name"],
                    )?;
                    cx.require_no_content(&handler)?;
                    cx.push(op);
                }
            }
            _ => return Err(unexpected_element(&child)),
        }
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

    fn parse(version: &str, root: &str, audit: &str) -> Result<Vec<Operation>, ParseError> {
        let interfaces = if root == "host" {
            "<management-interfaces><native-interface><socket interface=\"management\"/></native-interface></management-interfaces>"
        } else {
            ""
        };
        let xml = format!(
            r#"<{root} xmlns="urn:jboss:domain:{version}"><management>
                 <audit-log>{audit}</audit-log>{interfaces}
               </management></{root}>"#
        );
        ManagementParser::new(Arc::new(DescriptorRegistry::standard()))
            .parse_document(&xml)
            .map(|doc| doc.operations)
    }

    fn relative(ops: &[Operation]) -> Vec<String> {
        ops.iter()
            .map(|op| {
                op.address
                    .to_string()
                    .trim_start_matches("/core-service=management/access=audit")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_unsupported_before_1_5() {
        for version in ["1.0", "1.3", "1.4"] {
            let err = parse(version, "server", "").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedForVersion);
        }
        assert_eq!(parse("1.5", "server", "").unwrap().len(), 1);
    }

    #[test]
    fn test_full_audit_log() {
        let ops = parse(
            "2.1",
            "server",
            r#"<formatters><json-formatter name="json" compact="true"/></formatters>
               <handlers>
                 <file-handler name="file" formatter="json" path="audit-log.log" relative-to="jboss.server.data.dir"/>
                 <syslog-handler name="syslog" formatter="json" facility="LOCAL_USE_0">
                   <tls host="logs.example.com" port="6514">
                     <truststore path="t.jks" keystore-password="p"/>
                     <client-certificate-store path="c.jks" keystore-password="p" key-password="k"/>
                   </tls>
                 </syslog-handler>
               </handlers>
               <logger log-boot="true" enabled="false">
                 <handlers><handler name="file"/><handler name="syslog"/></handlers>
               </logger>"#,
        )
        .unwrap();
        assert_eq!(
            relative(&ops),
            vec![
                "",
                "/json-formatter=json",
                "/file-handler=file",
                "/syslog-handler=syslog",
                "/syslog-handler=syslog/protocol=tls",
                "/syslog-handler=syslog/protocol=tls/authentication=truststore",
                "/syslog-handler=syslog/protocol=tls/authentication=client-certificate-store",
                "/logger=audit-log",
                "/logger=audit-log/handler=file",
                "/logger=audit-log/handler=syslog",
            ]
        );
        assert_eq!(ops[1].get("compact"), Some(&ModelNode::Boolean(true)));
        assert_eq!(ops[5].get("keystore-path"), Some(&ModelNode::from("t.jks")));
        assert_eq!(ops[6].get("key-password"), Some(&ModelNode::from("k")));
        assert_eq!(ops[7].get("enabled"), Some(&ModelNode::Boolean(false)));
    }

    #[test]
    fn test_handler_requirements() {
        let err = parse("2.1", "server", r#"<handlers><file-handler name="f" formatter="j"/></handlers>"#)
            .unwrap_err();
        match err {
            ParseError::MissingRequiredAttribute { missing, .. } => assert_eq!(missing, vec!["path"]),
            other => panic!("unexpected error {other:?}"),
        }

        let err = parse(
            "2.1",
            "server",
            r#"<handlers><syslog-handler name="s" formatter="j"><udp/><tcp/></syslog-handler></handlers>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedElement);

        let err = parse(
            "2.1",
            "server",
            r#"<handlers><syslog-handler name="s" formatter="j"><tls><truststore path="t" keystore-password="p" key-password="k"/></tls></syslog-handler></handlers>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedAttribute);

        let ops = parse(
            "2.1",
            "server",
            r#"<handlers><syslog-handler name="s" formatter="j"/></handlers>"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_server_logger_host_only() {
        let body = r#"<server-logger log-read-only="true"/>"#;
        let err = parse("2.1", "server", body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedForVersion);
        let ops = parse("2.1", "host", body).unwrap();
        assert_eq!(
            ops[1].address.to_string(),
            "/core-service=management/access=audit/server-logger=audit-log"
        );
    }
}
