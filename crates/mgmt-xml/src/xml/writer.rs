//! Forward-only XML writer.
//!
//! Wraps `quick_xml::Writer`. A start tag is held back until the next
//! structural call so attributes can be added after `start_element`, and an
//! element closed with no content is written self-closing.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::MarshalError;

pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
    pending: Option<Pending>,
    open: Vec<String>,
}

struct Pending {
    start: BytesStart<'static>,
    /// Written self-closing and never pushed on the open stack.
    empty: bool,
}

impl XmlWriter {
    /// Creates a writer indenting nested elements by `indent` spaces (0 writes
    /// everything on one line).
    pub fn new(indent: usize) -> Self {
        let inner = if indent == 0 {
            Writer::new(Vec::new())
        } else {
            Writer::new_with_indent(Vec::new(), b' ', indent)
        };
        Self {
            inner,
            pending: None,
            open: Vec::new(),
        }
    }

    pub fn write_declaration(&mut self) -> Result<(), MarshalError> {
        self.flush_pending()?;
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    /// Opens an element; attributes may follow until the next structural call.
    pub fn start_element(&mut self, name: &str) -> Result<(), MarshalError> {
        self.flush_pending()?;
        self.pending = Some(Pending {
            start: BytesStart::new(name.to_string()),
            empty: false,
        });
        self.open.push(name.to_string());
        Ok(())
    }

    /// Writes a self-closing element; attributes may follow until the next
    /// structural call.
    pub fn empty_element(&mut self, name: &str) -> Result<(), MarshalError> {
        self.flush_pending()?;
        self.pending = Some(Pending {
            start: BytesStart::new(name.to_string()),
            empty: true,
        });
        Ok(())
    }

    /// Adds an attribute to the element opened by the last structural call.
    pub fn write_attribute(&mut self, name: &str, value: &str) -> Result<(), MarshalError> {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.start.push_attribute((name, value));
                Ok(())
            }
            None => Err(MarshalError::MisplacedAttribute {
                name: name.to_string(),
            }),
        }
    }

    pub fn write_text(&mut self, text: &str) -> Result<(), MarshalError> {
        self.flush_pending()?;
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Closes the innermost open element.
    pub fn end_element(&mut self) -> Result<(), MarshalError> {
        let name = self.open.pop().ok_or(MarshalError::UnbalancedElement)?;
        match self.pending.take() {
            Some(Pending { start, empty: false }) => {
                self.inner.write_event(Event::Empty(start))?;
            }
            Some(pending) => {
                self.inner.write_event(Event::Empty(pending.start))?;
                self.inner.write_event(Event::End(BytesEnd::new(name)))?;
            }
            None => {
                self.inner.write_event(Event::End(BytesEnd::new(name)))?;
            }
        }
        Ok(())
    }

    /// Returns the document. Fails if an element is still open.
    pub fn finish(mut self) -> Result<String, MarshalError> {
        self.flush_pending()?;
        if !self.open.is_empty() {
            return Err(MarshalError::UnbalancedElement);
        }
        Ok(String::from_utf8(self.inner.into_inner())?)
    }

    fn flush_pending(&mut self) -> Result<(), MarshalError> {
        if let Some(pending) = self.pending.take() {
            let event = if pending.empty {
                Event::Empty(pending.start)
            } else {
                Event::Start(pending.start)
            };
            self.inner.write_event(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_nested() {
        let mut w = XmlWriter::new(0);
        w.start_element("management").unwrap();
        w.start_element("security-realms").unwrap();
        w.start_element("security-realm").unwrap();
        w.write_attribute("name", "R").unwrap();
        w.end_element().unwrap();
        w.end_element().unwrap();
        w.empty_element("native-remoting-interface").unwrap();
        w.end_element().unwrap();
        assert_eq!(
            w.finish().unwrap(),
            r#"<management><security-realms><security-realm name="R"/></security-realms><native-remoting-interface/></management>"#
        );
    }

    #[test]
    fn test_attribute_values_escaped() {
        let mut w = XmlWriter::new(0);
        w.empty_element("advanced-filter").unwrap();
        w.write_attribute("filter", "(&(uid={0})(x<1))").unwrap();
        let xml = w.finish().unwrap();
        assert_eq!(xml, r#"<advanced-filter filter="(&amp;(uid={0})(x&lt;1))"/>"#);
    }

    #[test]
    fn test_misplaced_attribute() {
        let mut w = XmlWriter::new(0);
        w.start_element("a").unwrap();
        w.write_text("x").unwrap();
        assert!(matches!(
            w.write_attribute("b", "c"),
            Err(MarshalError::MisplacedAttribute { .. })
        ));
    }

    #[test]
    fn test_unbalanced() {
        let mut w = XmlWriter::new(0);
        assert!(matches!(w.end_element(), Err(MarshalError::UnbalancedElement)));
        let mut w = XmlWriter::new(0);
        w.start_element("a").unwrap();
        assert!(matches!(w.finish(), Err(MarshalError::UnbalancedElement)));
    }

    #[test]
    fn test_indent() {
        let mut w = XmlWriter::new(4);
        w.start_element("a").unwrap();
        w.empty_element("b").unwrap();
        w.end_element().unwrap();
        assert_eq!(w.finish().unwrap(), "<a>\n    <b/>\n</a>");
    }
}
