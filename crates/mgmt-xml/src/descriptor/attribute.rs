//! Attribute descriptors.
//!
//! A descriptor knows how to turn a raw document token into a typed model
//! value and back. Descriptors are immutable once the registry is built.

use crate::error::{Location, MarshalError, ParseError};
use crate::limits::MAX_ATTRIBUTE_VALUE_LEN;
use crate::model::{ModelNode, Operation};
use crate::xml::XmlWriter;

/// The type an attribute value is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Boolean,
    /// Integer with an inclusive range.
    Int { min: i64, max: i64 },
    /// One of a fixed set of literals (case-sensitive).
    Enum(&'static [&'static str]),
}

/// A named, typed configuration attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    /// Name in the model and in operations.
    pub name: &'static str,
    /// Name in the current document schema.
    pub xml_name: &'static str,
    pub kind: ValueKind,
    /// Value the runtime assumes when the attribute is undefined.
    pub default: Option<ModelNode>,
    /// Whether `${...}` expressions are accepted in place of a literal.
    pub allow_expression: bool,
    /// Whether a value equal to the default is still written out.
    pub marshal_default: bool,
}

impl AttributeDescriptor {
    fn new(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            xml_name: name,
            kind,
            default: None,
            allow_expression: false,
            marshal_default: true,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, ValueKind::String)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, ValueKind::Boolean)
    }

    pub fn int(name: &'static str, min: i64, max: i64) -> Self {
        Self::new(name, ValueKind::Int { min, max })
    }

    pub fn enumeration(name: &'static str, values: &'static [&'static str]) -> Self {
        Self::new(name, ValueKind::Enum(values))
    }

    /// Sets the document name when it differs from the model name.
    pub fn xml_name(mut self, xml_name: &'static str) -> Self {
        self.xml_name = xml_name;
        self
    }

    pub fn default_value(mut self, value: impl Into<ModelNode>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn expressions(mut self) -> Self {
        self.allow_expression = true;
        self
    }

    /// Leaves the attribute out of documents when it equals its default.
    pub fn skip_default(mut self) -> Self {
        self.marshal_default = false;
        self
    }

    /// Coerces a raw token into a typed value.
    pub fn parse(&self, raw: &str, location: Location) -> Result<ModelNode, ParseError> {
        if raw.len() > MAX_ATTRIBUTE_VALUE_LEN {
            return Err(ParseError::LimitExceeded {
                what: "attribute value length",
                actual: raw.len(),
                max: MAX_ATTRIBUTE_VALUE_LEN,
            });
        }
        if self.allow_expression && is_expression(raw) {
            return Ok(ModelNode::Expression(raw.to_string()));
        }
        let invalid = |reason: String| ParseError::InvalidAttributeValue {
            name: self.name.to_string(),
            value: raw.to_string(),
            reason,
            location,
        };
        match self.kind {
            ValueKind::String => {
                if raw.is_empty() {
                    return Err(invalid("value must not be empty".to_string()));
                }
                Ok(ModelNode::String(raw.to_string()))
            }
            ValueKind::Boolean => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(ModelNode::Boolean(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(ModelNode::Boolean(false))
                } else {
                    Err(invalid("expected true or false".to_string()))
                }
            }
            ValueKind::Int { min, max } => {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid("expected an integer".to_string()))?;
                if value < min || value > max {
                    return Err(invalid(format!("must be in range [{min}, {max}]")));
                }
                Ok(ModelNode::Int(value))
            }
            ValueKind::Enum(values) => {
                if values.contains(&raw) {
                    Ok(ModelNode::String(raw.to_string()))
                } else {
                    Err(invalid(format!("expected one of {}", values.join(", "))))
                }
            }
        }
    }

    /// Coerces `raw` and stores it in the operation under the model name.
    pub fn parse_and_set(
        &self,
        raw: &str,
        op: &mut Operation,
        location: Location,
    ) -> Result<(), ParseError> {
        let value = self.parse(raw, location)?;
        op.set(self.name, value);
        Ok(())
    }

    /// Returns true if `resource` holds a value for this attribute that should
    /// appear in a document.
    pub fn is_marshallable(&self, resource: &ModelNode) -> bool {
        match resource.get(self.name) {
            Some(value) if value.is_defined() => {
                self.marshal_default || self.default.as_ref() != Some(value)
            }
            _ => false,
        }
    }

    pub fn marshal_as_attribute(
        &self,
        resource: &ModelNode,
        writer: &mut XmlWriter,
    ) -> Result<(), MarshalError> {
        if let Some(token) = self.marshallable_token(resource) {
            writer.write_attribute(self.xml_name, &token)?;
        }
        Ok(())
    }

    /// Writes the value as `<xml_name>value</xml_name>`.
    pub fn marshal_as_element(
        &self,
        resource: &ModelNode,
        writer: &mut XmlWriter,
    ) -> Result<(), MarshalError> {
        if let Some(token) = self.marshallable_token(resource) {
            writer.start_element(self.xml_name)?;
            writer.write_text(&token)?;
            writer.end_element()?;
        }
        Ok(())
    }

    fn marshallable_token(&self, resource: &ModelNode) -> Option<String> {
        if !self.is_marshallable(resource) {
            return None;
        }
        resource.get(self.name).and_then(ModelNode::to_xml_string)
    }
}

fn is_expression(raw: &str) -> bool {
    raw.find("${").is_some_and(|start| raw[start..].contains('}'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_boolean_coercion() {
        let d = AttributeDescriptor::boolean("plain-text");
        let loc = Location::default();
        assert_eq!(d.parse("true", loc), Ok(ModelNode::Boolean(true)));
        assert_eq!(d.parse("FALSE", loc), Ok(ModelNode::Boolean(false)));
        let err = d.parse("yes", loc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAttributeValue);
    }

    #[test]
    fn test_int_range() {
        let d = AttributeDescriptor::int("port", 1, 65535);
        let loc = Location::default();
        assert_eq!(d.parse("9999", loc), Ok(ModelNode::Int(9999)));
        assert!(d.parse("0", loc).is_err());
        assert!(d.parse("70000", loc).is_err());
        assert!(d.parse("ninety", loc).is_err());
    }

    #[test]
    fn test_enum_is_case_sensitive() {
        let d = AttributeDescriptor::enumeration("provider", &["simple", "rbac"]);
        let loc = Location::default();
        assert_eq!(d.parse("rbac", loc), Ok(ModelNode::from("rbac")));
        let err = d.parse("RBAC", loc).unwrap_err();
        assert!(err.to_string().contains("expected one of simple, rbac"));
    }

    #[test]
    fn test_expressions_only_when_allowed() {
        let loc = Location::default();
        let with = AttributeDescriptor::int("port", 1, 65535).expressions();
        assert_eq!(
            with.parse("${jboss.management.native.port:9999}", loc),
            Ok(ModelNode::Expression("${jboss.management.native.port:9999}".into()))
        );
        let without = AttributeDescriptor::int("port", 1, 65535);
        assert!(without.parse("${port}", loc).is_err());
        let s = AttributeDescriptor::string("connection");
        assert_eq!(s.parse("${x}", loc), Ok(ModelNode::from("${x}")));
    }

    #[test]
    fn test_empty_string_rejected() {
        let d = AttributeDescriptor::string("path");
        assert!(d.parse("", Location::default()).is_err());
    }

    #[test]
    fn test_is_marshallable() {
        let mut resource = ModelNode::object();
        resource.set("plain-text", false);

        let keep = AttributeDescriptor::boolean("plain-text").default_value(false);
        let skip = AttributeDescriptor::boolean("plain-text")
            .default_value(false)
            .skip_default();
        assert!(keep.is_marshallable(&resource));
        assert!(!skip.is_marshallable(&resource));

        resource.set("plain-text", true);
        assert!(skip.is_marshallable(&resource));
        assert!(!AttributeDescriptor::string("path").is_marshallable(&resource));
    }

    #[test]
    fn test_marshal_as_attribute_uses_xml_name() {
        let mut resource = ModelNode::object();
        resource.set("keystore-path", "server.keystore");
        let d = AttributeDescriptor::string("keystore-path").xml_name("path");

        let mut writer = XmlWriter::new(0);
        writer.empty_element("keystore").unwrap();
        d.marshal_as_attribute(&resource, &mut writer).unwrap();
        let xml = writer.finish().unwrap();
        assert_eq!(xml, r#"<keystore path="server.keystore"/>"#);
    }

    #[test]
    fn test_marshal_as_element() {
        let mut resource = ModelNode::object();
        resource.set("password", "s3cret");
        let d = AttributeDescriptor::string("password");

        let mut writer = XmlWriter::new(0);
        writer.start_element("user").unwrap();
        d.marshal_as_element(&resource, &mut writer).unwrap();
        writer.end_element().unwrap();
        assert_eq!(writer.finish().unwrap(), "<user><password>s3cret</password></user>");
    }
}
