//! Namespace-aware pull reader.
//!
//! Wraps `quick_xml::NsReader` and exposes the handful of operations the
//! grammars need: "next child of this element", "this element has no
//! content", "text of this element". Every element handed out must be fully
//! consumed (by walking its children, [`XmlReader::require_no_content`] or
//! [`XmlReader::element_text`]) before the caller asks for its next sibling.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::{Location, ParseError};
use crate::limits::{
    MAX_ATTRIBUTES_PER_ELEMENT, MAX_ATTRIBUTE_VALUE_LEN, MAX_DOCUMENT_SIZE, MAX_ELEMENT_DEPTH,
};

/// An attribute of a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    /// Namespace of a prefixed attribute; `None` for plain attributes.
    pub namespace: Option<String>,
    pub value: String,
}

/// A start tag (or self-closing tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub location: Location,
    /// True for `<foo/>`; such an element has no children and no end event.
    pub empty: bool,
}

impl StartElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// Pull reader over an in-memory document.
pub struct XmlReader<'a> {
    inner: NsReader<&'a [u8]>,
    input: &'a str,
    depth: usize,
    // Incremental line/column bookkeeping.
    line: usize,
    column: usize,
    scanned: usize,
}

impl<'a> XmlReader<'a> {
    pub fn new(input: &'a str) -> Result<Self, ParseError> {
        if input.len() > MAX_DOCUMENT_SIZE {
            return Err(ParseError::LimitExceeded {
                what: "document size",
                actual: input.len(),
                max: MAX_DOCUMENT_SIZE,
            });
        }
        let mut inner = NsReader::from_str(input);
        inner.expand_empty_elements(false);
        inner.check_end_names(true);
        Ok(Self {
            inner,
            input,
            depth: 0,
            line: 1,
            column: 1,
            scanned: 0,
        })
    }

    /// Current position, as line and column of the last consumed byte.
    pub fn location(&mut self) -> Location {
        let pos = self.inner.buffer_position().min(self.input.len());
        if pos < self.scanned {
            // Positions only move forward; keep the last known location.
            return Location::new(self.line, self.column);
        }
        for ch in self.input[self.scanned..pos].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.scanned = pos;
        Location::new(self.line, self.column)
    }

    /// Current element nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn xml_error(&mut self, err: impl std::fmt::Display) -> ParseError {
        ParseError::Xml {
            message: err.to_string(),
            location: self.location(),
        }
    }

    /// Reads up to the document element.
    pub fn next_root(&mut self) -> Result<StartElement, ParseError> {
        match self.next_markup()? {
            Step::Start(element) => Ok(element),
            Step::End => Err(self.xml_error("unbalanced end tag")),
            Step::Eof => Err(ParseError::UnexpectedEof {
                location: self.location(),
            }),
            Step::Text(text) => Err(ParseError::UnexpectedContent {
                text,
                location: self.location(),
            }),
        }
    }

    /// Returns the next child element of `parent`, or `None` once `parent`
    /// has been closed.
    pub fn next_child(
        &mut self,
        parent: &StartElement,
    ) -> Result<Option<StartElement>, ParseError> {
        if parent.empty {
            return Ok(None);
        }
        match self.next_markup()? {
            Step::Start(element) => Ok(Some(element)),
            Step::End => Ok(None),
            Step::Text(text) => Err(ParseError::UnexpectedContent {
                text,
                location: self.location(),
            }),
            Step::Eof => Err(ParseError::UnexpectedEof {
                location: self.location(),
            }),
        }
    }

    /// Consumes `element`, failing if it has any child element or text.
    pub fn require_no_content(&mut self, element: &StartElement) -> Result<(), ParseError> {
        match self.next_child(element)? {
            None => Ok(()),
            Some(child) => Err(ParseError::UnexpectedElement {
                name: child.name,
                location: child.location,
            }),
        }
    }

    /// Consumes `element` and returns its text content.
    pub fn element_text(&mut self, element: &StartElement) -> Result<String, ParseError> {
        if element.empty {
            return Ok(String::new());
        }
        let mut text = String::new();
        loop {
            match self.next_event()? {
                Step::Text(chunk) => {
                    text.push_str(&chunk);
                    if text.len() > MAX_ATTRIBUTE_VALUE_LEN {
                        return Err(ParseError::LimitExceeded {
                            what: "element text length",
                            actual: text.len(),
                            max: MAX_ATTRIBUTE_VALUE_LEN,
                        });
                    }
                }
                Step::End => return Ok(text),
                Step::Start(child) => {
                    return Err(ParseError::UnexpectedElement {
                        name: child.name,
                        location: child.location,
                    })
                }
                Step::Eof => {
                    return Err(ParseError::UnexpectedEof {
                        location: self.location(),
                    })
                }
            }
        }
    }

    /// Consumes `element` and everything inside it.
    pub fn skip_element(&mut self, element: &StartElement) -> Result<(), ParseError> {
        if element.empty {
            return Ok(());
        }
        let target = self.depth - 1;
        while self.depth > target {
            if let Step::Eof = self.next_event()? {
                return Err(ParseError::UnexpectedEof {
                    location: self.location(),
                });
            }
        }
        Ok(())
    }

    /// Checks that nothing but comments and whitespace follow the document
    /// element.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        match self.next_markup()? {
            Step::Eof => Ok(()),
            Step::Start(element) => Err(ParseError::UnexpectedElement {
                name: element.name,
                location: element.location,
            }),
            Step::Text(text) => Err(ParseError::UnexpectedContent {
                text,
                location: self.location(),
            }),
            Step::End => Err(self.xml_error("unbalanced end tag")),
        }
    }

    /// Like `next_event`, but drops whitespace-only text between elements.
    fn next_markup(&mut self) -> Result<Step, ParseError> {
        loop {
            match self.next_event()? {
                Step::Text(text) if text.trim().is_empty() => {}
                step => return Ok(step),
            }
        }
    }

    /// Next token. Text is returned untrimmed.
    fn next_event(&mut self) -> Result<Step, ParseError> {
        loop {
            let (resolved, event) = match self.inner.read_resolved_event() {
                Ok(pair) => pair,
                Err(err) => return Err(self.xml_error(err)),
            };
            let namespace = match resolved {
                ResolveResult::Bound(Namespace(ns)) => {
                    Some(String::from_utf8_lossy(ns).into_owned())
                }
                ResolveResult::Unbound => None,
                ResolveResult::Unknown(prefix) => {
                    let prefix = String::from_utf8_lossy(&prefix).into_owned();
                    return Err(self.xml_error(format!("unknown namespace prefix '{prefix}'")));
                }
            };
            match event {
                Event::Start(start) => {
                    self.depth += 1;
                    if self.depth > MAX_ELEMENT_DEPTH {
                        return Err(ParseError::LimitExceeded {
                            what: "element depth",
                            actual: self.depth,
                            max: MAX_ELEMENT_DEPTH,
                        });
                    }
                    return self.start_element(&start, namespace, false).map(Step::Start);
                }
                Event::Empty(start) => {
                    if self.depth + 1 > MAX_ELEMENT_DEPTH {
                        return Err(ParseError::LimitExceeded {
                            what: "element depth",
                            actual: self.depth + 1,
                            max: MAX_ELEMENT_DEPTH,
                        });
                    }
                    return self.start_element(&start, namespace, true).map(Step::Start);
                }
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    return Ok(Step::End);
                }
                Event::Text(text) => {
                    let text = match text.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(err) => return Err(self.xml_error(err)),
                    };
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(Step::Text(text));
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    return Ok(Step::Text(text));
                }
                Event::Eof => return Ok(Step::Eof),
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }
    }

    fn start_element(
        &mut self,
        start: &BytesStart<'_>,
        namespace: Option<String>,
        empty: bool,
    ) -> Result<StartElement, ParseError> {
        let location = self.location();
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| self.xml_error(err))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            if attributes.len() >= MAX_ATTRIBUTES_PER_ELEMENT {
                return Err(ParseError::LimitExceeded {
                    what: "attribute count",
                    actual: attributes.len() + 1,
                    max: MAX_ATTRIBUTES_PER_ELEMENT,
                });
            }
            let (resolved, local) = self.inner.resolve_attribute(attr.key);
            let attr_namespace = match resolved {
                ResolveResult::Bound(Namespace(ns)) => {
                    Some(String::from_utf8_lossy(ns).into_owned())
                }
                ResolveResult::Unbound => None,
                ResolveResult::Unknown(prefix) => {
                    let prefix = String::from_utf8_lossy(&prefix).into_owned();
                    return Err(self.xml_error(format!("unknown namespace prefix '{prefix}'")));
                }
            };
            let attr_name = String::from_utf8_lossy(local.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| self.xml_error(err))?
                .into_owned();
            if value.len() > MAX_ATTRIBUTE_VALUE_LEN {
                return Err(ParseError::LimitExceeded {
                    what: "attribute value length",
                    actual: value.len(),
                    max: MAX_ATTRIBUTE_VALUE_LEN,
                });
            }
            attributes.push(XmlAttribute {
                name: attr_name,
                namespace: attr_namespace,
                value,
            });
        }
        Ok(StartElement {
            name,
            namespace,
            attributes,
            location,
            empty,
        })
    }
}

enum Step {
    Start(StartElement),
    End,
    Text(String),
    Eof,
}
