use crate::descriptor::ResourceKind;
use crate::error::MarshalError;
use crate::model::{DocumentContext, ModelNode};

use super::{children, MarshalCx};

const STORE: &[&str] = &[
    "keystore-path",
    "keystore-relative-to",
    "keystore-password",
    "key-password",
];

pub(crate) fn write_audit_log(
    cx: &mut MarshalCx<'_, '_>,
    audit: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start("audit-log")?;
    if audit.has_children("json-formatter") {
        cx.start("formatters")?;
        for (name, formatter) in children(audit, "json-formatter") {
            cx.empty("json-formatter")?;
            cx.attribute("name", name)?;
            cx.attributes(ResourceKind::JsonFormatter, formatter)?;
        }
        cx.end()?;
    }
    if audit.has_children("file-handler") || audit.has_children("syslog-handler") {
        cx.start("handlers")?;
        for (name, handler) in children(audit, "file-handler") {
            cx.empty("file-handler")?;
            cx.attribute("name", name)?;
            cx.attributes(ResourceKind::FileHandler, handler)?;
        }
        for (name, handler) in children(audit, "syslog-handler") {
            write_syslog_handler(cx, name, handler)?;
        }
        cx.end()?;
    }
    if let Some(logger) = audit.get_path(&["logger", "audit-log"]) {
        write_logger(cx, "logger", logger)?;
    }
    if cx.context == DocumentContext::Host {
        if let Some(logger) = audit.get_path(&["server-logger", "audit-log"]) {
            write_logger(cx, "server-logger", logger)?;
        }
    }
    cx.end()
}

fn write_syslog_handler(
    cx: &mut MarshalCx<'_, '_>,
    name: &str,
    handler: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start("syslog-handler")?;
    cx.attribute("name", name)?;
    cx.attributes(ResourceKind::SyslogHandler, handler)?;
    for (transport, protocol) in children(handler, "protocol") {
        let kind = match transport {
            "udp" => ResourceKind::SyslogUdp,
            "tcp" => ResourceKind::SyslogTcp,
            _ => ResourceKind::SyslogTls,
        };
        cx.start(transport)?;
        cx.attributes(kind, protocol)?;
        if kind == ResourceKind::SyslogTls {
            if let Some(store) = protocol.get_path(&["authentication", "truststore"]) {
                cx.empty("truststore")?;
                cx.selected(ResourceKind::TlsTruststore, store, STORE)?;
            }
            if let Some(store) = protocol.get_path(&["authentication", "client-certificate-store"])
            {
                cx.empty("client-certificate-store")?;
                cx.selected(ResourceKind::TlsClientCertStore, store, STORE)?;
            }
        }
        cx.end()?;
    }
    cx.end()
}

fn write_logger(
    cx: &mut MarshalCx<'_, '_>,
    element: &str,
    logger: &ModelNode,
) -> Result<(), MarshalError> {
    cx.start(element)?;
    cx.attributes(ResourceKind::AuditLogger, logger)?;
    if logger.has_children("handler") {
        cx.start("handlers")?;
        for (name, _) in children(logger, "handler") {
            cx.empty("handler")?;
            cx.attribute("name", name)?;
        }
        cx.end()?;
    }
    cx.end()
}
