//! Markup token reader and writer.

mod reader;
mod writer;

pub use reader::{StartElement, XmlAttribute, XmlReader};
pub use writer::XmlWriter;
