//! Shared parsing state and the bookkeeping helpers every grammar uses.

use log::trace;

use crate::descriptor::{DescriptorRegistry, ResourceKind};
use crate::error::ParseError;
use crate::model::{DocumentContext, Operation, SchemaVersion};
use crate::xml::{StartElement, XmlAttribute, XmlReader};

/// State of one parse: the token reader, the negotiated version and the
/// operation list being built.
pub(crate) struct ParseCx<'r, 'a> {
    reader: XmlReader<'a>,
    registry: &'r DescriptorRegistry,
    pub(crate) version: SchemaVersion,
    pub(crate) context: DocumentContext,
    /// Host documents must configure the native management interface.
    pub(crate) require_native_interface: bool,
    ops: Vec<Operation>,
}

impl<'r, 'a> ParseCx<'r, 'a> {
    pub(crate) fn new(
        reader: XmlReader<'a>,
        registry: &'r DescriptorRegistry,
        version: SchemaVersion,
        context: DocumentContext,
    ) -> Self {
        Self {
            reader,
            registry,
            version,
            context,
            require_native_interface: false,
            ops: Vec::new(),
        }
    }

    /// Checks trailing content and returns the operations.
    pub(crate) fn finish(mut self) -> Result<Vec<Operation>, ParseError> {
        self.reader.finish()?;
        Ok(self.ops)
    }

    pub(crate) fn push(&mut self, op: Operation) {
        trace!("{op}");
        self.ops.push(op);
    }

    // =========================================================================
    // Elements
    // =========================================================================

    /// Fails unless `element` is in the namespace of the active version.
    pub(crate) fn require_namespace(&self, element: &StartElement) -> Result<(), ParseError> {
        let expected = self.version.uri();
        if element.namespace.as_deref() == Some(expected) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedNamespace {
                name: element.name.clone(),
                expected: expected.to_string(),
                found: element.namespace.clone(),
                location: element.location,
            })
        }
    }

    /// Returns the next child of `parent`, namespace-checked.
    pub(crate) fn next_child(
        &mut self,
        parent: &StartElement,
    ) -> Result<Option<StartElement>, ParseError> {
        match self.reader.next_child(parent)? {
            Some(child) => {
                self.require_namespace(&child)?;
                Ok(Some(child))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn require_no_content(&mut self, element: &StartElement) -> Result<(), ParseError> {
        self.reader.require_no_content(element)
    }

    pub(crate) fn element_text(&mut self, element: &StartElement) -> Result<String, ParseError> {
        self.reader.element_text(element)
    }

    pub(crate) fn skip_element(&mut self, element: &StartElement) -> Result<(), ParseError> {
        self.reader.skip_element(element)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Scans the attributes of `element`.
    ///
    /// Each attribute must be un-prefixed and listed in `allowed`; it is
    /// removed from the `required` set and handed to `f`. Afterwards any name
    /// still in the required set is reported.
    pub(crate) fn read_attributes<F>(
        &self,
        element: &StartElement,
        allowed: &[&'static str],
        required: &[&'static str],
        mut f: F,
    ) -> Result<(), ParseError>
    where
        F: FnMut(&XmlAttribute) -> Result<(), ParseError>,
    {
        let mut missing = Required::new(required);
        for attr in &element.attributes {
            if attr.namespace.is_some() || !allowed.contains(&attr.name.as_str()) {
                return Err(unexpected_attribute(element, attr));
            }
            missing.seen(&attr.name);
            f(attr)?;
        }
        missing.check(element)
    }

    /// Scans attributes, storing every one of them on `op` through the
    /// registry under the same name it has in the document.
    pub(crate) fn set_attributes(
        &self,
        element: &StartElement,
        kind: ResourceKind,
        allowed: &[&'static str],
        required: &[&'static str],
        op: &mut Operation,
    ) -> Result<(), ParseError> {
        self.read_attributes(element, allowed, required, |attr| {
            self.set(element, kind, &attr.name, attr, op)
        })
    }

    pub(crate) fn require_no_attributes(&self, element: &StartElement) -> Result<(), ParseError> {
        self.read_attributes(element, &[], &[], |_| Ok(()))
    }

    /// Coerces `attr` with the descriptor `kind.model_name` and stores it on `op`.
    pub(crate) fn set(
        &self,
        element: &StartElement,
        kind: ResourceKind,
        model_name: &str,
        attr: &XmlAttribute,
        op: &mut Operation,
    ) -> Result<(), ParseError> {
        match self.registry.attribute(kind, model_name) {
            Some(descriptor) => descriptor.parse_and_set(&attr.value, op, element.location),
            None => Err(unexpected_attribute(element, attr)),
        }
    }

    /// Coerces a raw value (element text, for instance) for `kind.model_name`.
    pub(crate) fn set_raw(
        &self,
        element: &StartElement,
        kind: ResourceKind,
        model_name: &str,
        raw: &str,
        op: &mut Operation,
    ) -> Result<(), ParseError> {
        match self.registry.attribute(kind, model_name) {
            Some(descriptor) => descriptor.parse_and_set(raw, op, element.location),
            None => Err(unexpected_element(element)),
        }
    }
}

pub(crate) fn unexpected_element(element: &StartElement) -> ParseError {
    ParseError::UnexpectedElement {
        name: element.name.clone(),
        location: element.location,
    }
}

pub(crate) fn unexpected_attribute(element: &StartElement, attr: &XmlAttribute) -> ParseError {
    let name = match &attr.namespace {
        Some(ns) => format!("{{{ns}}}{}", attr.name),
        None => attr.name.clone(),
    };
    ParseError::UnexpectedAttribute {
        element: element.name.clone(),
        name,
        location: element.location,
    }
}

pub(crate) fn duplicate_element(element: &StartElement) -> ParseError {
    ParseError::DuplicateElement {
        name: element.name.clone(),
        location: element.location,
    }
}

pub(crate) fn missing_attribute(element: &StartElement, missing: &[&str]) -> ParseError {
    ParseError::MissingRequiredAttribute {
        element: element.name.clone(),
        missing: missing.iter().map(|s| s.to_string()).collect(),
        location: element.location,
    }
}

pub(crate) fn missing_element(parent: &StartElement, missing: &[&str]) -> ParseError {
    ParseError::MissingRequiredElement {
        parent: parent.name.clone(),
        missing: missing.iter().map(|s| s.to_string()).collect(),
        location: parent.location,
    }
}

/// The "remove from required set as seen" tracker.
pub(crate) struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    pub(crate) fn new(required: &[&'static str]) -> Self {
        Self {
            missing: required.to_vec(),
        }
    }

    pub(crate) fn seen(&mut self, name: &str) {
        self.missing.retain(|m| *m != name);
    }

    pub(crate) fn check(&self, element: &StartElement) -> Result<(), ParseError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(missing_attribute(element, &self.missing))
        }
    }
}

/// Tracks an exactly-one-of child group.
pub(crate) struct Choice {
    choices: &'static [&'static str],
    chosen: Option<String>,
}

impl Choice {
    pub(crate) fn new(choices: &'static [&'static str]) -> Self {
        Self {
            choices,
            chosen: None,
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.choices.contains(&name)
    }

    /// Records `element` as the choice. A repeat of the chosen element is a
    /// duplicate; any other member after a choice is unexpected.
    pub(crate) fn select(&mut self, element: &StartElement) -> Result<(), ParseError> {
        match &self.chosen {
            Some(chosen) if *chosen == element.name => Err(duplicate_element(element)),
            Some(_) => Err(unexpected_element(element)),
            None => {
                self.chosen = Some(element.name.clone());
                Ok(())
            }
        }
    }

    pub(crate) fn chosen(&self) -> Option<&str> {
        self.chosen.as_deref()
    }

    /// Fails if no member of the group appeared inside `parent`.
    pub(crate) fn finish(&self, parent: &StartElement) -> Result<(), ParseError> {
        if self.chosen.is_some() {
            Ok(())
        } else {
            Err(ParseError::MissingOneOf {
                parent: parent.name.clone(),
                choices: self.choices.iter().map(|s| s.to_string()).collect(),
                location: parent.location,
            })
        }
    }
}

/// Tracks elements that may appear at most once.
#[derive(Default)]
pub(crate) struct Singles {
    seen: Vec<String>,
}

impl Singles {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn check(&mut self, element: &StartElement) -> Result<(), ParseError> {
        if self.seen.iter().any(|s| *s == element.name) {
            return Err(duplicate_element(element));
        }
        self.seen.push(element.name.clone());
        Ok(())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.seen.iter().any(|s| s == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Location};

    fn element(name: &str) -> StartElement {
        StartElement {
            name: name.to_string(),
            namespace: None,
            attributes: Vec::new(),
            location: Location::new(1, 1),
            empty: true,
        }
    }

    #[test]
    fn test_required_reports_remaining_in_declared_order() {
        let mut required = Required::new(&["name", "url", "search-dn"]);
        required.seen("url");
        required.seen("unrelated");
        let err = required.check(&element("ldap")).unwrap_err();
        match err {
            ParseError::MissingRequiredAttribute { missing, .. } => {
                assert_eq!(missing, vec!["name", "search-dn"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_choice() {
        let mut choice = Choice::new(&["username-filter", "advanced-filter"]);
        assert!(choice.contains("advanced-filter"));
        assert_eq!(
            choice.finish(&element("ldap")).unwrap_err().kind(),
            ErrorKind::MissingRequiredElement
        );
        choice.select(&element("username-filter")).unwrap();
        assert_eq!(choice.chosen(), Some("username-filter"));
        assert_eq!(
            choice.select(&element("username-filter")).unwrap_err().kind(),
            ErrorKind::DuplicateElement
        );
        assert_eq!(
            choice.select(&element("advanced-filter")).unwrap_err().kind(),
            ErrorKind::UnexpectedElement
        );
        choice.finish(&element("ldap")).unwrap();
    }

    #[test]
    fn test_singles() {
        let mut singles = Singles::new();
        singles.check(&element("truststore")).unwrap();
        singles.check(&element("local")).unwrap();
        assert!(singles.contains("local"));
        assert_eq!(
            singles.check(&element("truststore")).unwrap_err().kind(),
            ErrorKind::DuplicateElement
        );
    }
}
