use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::OaiError;

/// Thin event writer producing an indented UTF-8 document
pub struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    pub fn new() -> Result<Self, OaiError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| OaiError::Xml(e.to_string()))?;
        Ok(Self { writer })
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), OaiError> {
        self.writer.write_event(event).map_err(|e| OaiError::Xml(e.to_string()))
    }

    fn element<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        start
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), OaiError> {
        self.emit(Event::Start(Self::element(name, attributes)))
    }

    pub fn end(&mut self, name: &str) -> Result<(), OaiError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    /// `<name attrs>text</name>`, text escaped
    pub fn text(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), OaiError> {
        self.start(name, attributes)?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub fn finish(self) -> Result<String, OaiError> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| OaiError::Xml(e.to_string()))
    }
}
