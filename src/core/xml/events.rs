//! Typed XML event stream over quick-xml
//!
//! [`XmlEventReader`] turns the raw quick-xml events into a small sum type
//! that both streaming passes consume: start tags carry their attributes and
//! namespace declarations separately, empty elements are expanded into a
//! start/end pair, and everything that carries no content (comments,
//! processing instructions, declarations) is skipped. Any well-formedness
//! problem becomes [`StrataError::StructuralParse`] naming the input file.

use crate::domain::{Result, StrataError, Tag};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, ErrorKind};
use std::path::{Path, PathBuf};

/// A namespace declaration (`xmlns` or `xmlns:prefix`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// `None` for the default namespace
    pub prefix: Option<String>,
    pub uri: String,
}

/// An attribute with its unescaped value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub tag: Tag,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    Start {
        tag: Tag,
        attributes: Vec<Attribute>,
        namespaces: Vec<Namespace>,
    },
    /// Unescaped character data, untrimmed; CDATA sections included
    Text(String),
    End(Tag),
    Eof,
}

/// Pull reader yielding [`XmlEvent`]s
///
/// The encoding named in the XML declaration (or a byte order mark) is
/// honoured; events are always UTF-8.
pub struct XmlEventReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    origin: PathBuf,
    open: Vec<Tag>,
    pending_end: bool,
    seen_root: bool,
    finished: bool,
}

impl<R: BufRead> XmlEventReader<R> {
    /// Wraps `input`; `origin` names the artifact in parse errors
    pub fn new(input: R, origin: impl Into<PathBuf>) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::new(),
            origin: origin.into(),
            open: Vec::new(),
            pending_end: false,
            seen_root: false,
            finished: false,
        }
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Byte offset into the (decompressed) input
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn parse_error(&self, message: impl std::fmt::Display) -> StrataError {
        StrataError::StructuralParse {
            path: self.origin.clone(),
            message: format!("{message} (byte {})", self.position()),
        }
    }

    fn reader_error(&self, error: quick_xml::Error) -> StrataError {
        if let quick_xml::Error::Io(io) = &error {
            // Corrupt compressed input surfaces as an I/O error of these kinds
            let structural = matches!(
                io.kind(),
                ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof
            );
            if !structural {
                return StrataError::Storage(format!(
                    "Failed to read {}: {}",
                    self.origin.display(),
                    io
                ));
            }
        }
        self.parse_error(error)
    }

    /// Decodes raw bytes with the encoding the document declared
    fn decode(&self, bytes: &[u8]) -> Result<String> {
        self.reader
            .decoder()
            .decode(bytes)
            .map(|text| text.into_owned())
            .map_err(|e| self.parse_error(format!("undecodable text: {e}")))
    }

    fn start_event(&mut self, start: &BytesStart<'_>) -> Result<XmlEvent> {
        if self.open.is_empty() {
            if self.seen_root {
                return Err(self.parse_error("multiple root elements"));
            }
            self.seen_root = true;
        }
        let tag = Tag::element(&self.decode(start.name().as_ref())?);
        let mut attributes = Vec::new();
        let mut namespaces = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| self.parse_error(e))?;
            let key = self.decode(attribute.key.as_ref())?;
            let value = attribute
                .decode_and_unescape_value(self.reader.decoder())
                .map_err(|e| self.reader_error(e))?
                .into_owned();
            if key == "xmlns" {
                namespaces.push(Namespace {
                    prefix: None,
                    uri: value,
                });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                namespaces.push(Namespace {
                    prefix: Some(prefix.to_string()),
                    uri: value,
                });
            } else {
                attributes.push(Attribute {
                    tag: Tag::attribute(&key),
                    value,
                });
            }
        }
        self.open.push(tag.clone());
        Ok(XmlEvent::Start {
            tag,
            attributes,
            namespaces,
        })
    }

    fn close(&mut self) -> Result<XmlEvent> {
        self.open
            .pop()
            .map(XmlEvent::End)
            .ok_or_else(|| self.parse_error("unexpected end tag"))
    }

    /// Next content event; `Eof` is returned once and then repeatedly
    pub fn next_event(&mut self) -> Result<XmlEvent> {
        if self.pending_end {
            self.pending_end = false;
            return self.close();
        }
        if self.finished {
            return Ok(XmlEvent::Eof);
        }
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event.into_owned(),
                Err(e) => return Err(self.reader_error(e)),
            };
            match event {
                Event::Start(start) => return self.start_event(&start),
                Event::Empty(start) => {
                    let event = self.start_event(&start)?;
                    self.pending_end = true;
                    return Ok(event);
                }
                Event::End(_) => return self.close(),
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| self.reader_error(e))?;
                    if self.open.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(self.parse_error("text outside the root element"));
                        }
                        continue;
                    }
                    return Ok(XmlEvent::Text(text.into_owned()));
                }
                Event::CData(data) => {
                    if self.open.is_empty() {
                        return Err(self.parse_error("CDATA outside the root element"));
                    }
                    return Ok(XmlEvent::Text(self.decode(&data.into_inner())?));
                }
                Event::Eof => {
                    if let Some(tag) = self.open.last() {
                        return Err(self.parse_error(format!("unexpected end of document inside <{}>", tag.qname())));
                    }
                    if !self.seen_root {
                        return Err(self.parse_error("document has no root element"));
                    }
                    self.finished = true;
                    return Ok(XmlEvent::Eof);
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(xml: &str) -> Result<Vec<XmlEvent>> {
        events_from_bytes(xml.as_bytes())
    }

    fn events_from_bytes(xml: &[u8]) -> Result<Vec<XmlEvent>> {
        let mut reader = XmlEventReader::new(xml, "test.xml");
        let mut events = Vec::new();
        loop {
            let event = reader.next_event()?;
            if event == XmlEvent::Eof {
                return Ok(events);
            }
            events.push(event);
        }
    }

    #[test]
    fn test_start_text_end() {
        let events = events("<?xml version=\"1.0\"?><!-- c --><a><b>x &amp; y</b></a>").unwrap();
        assert_eq!(events.len(), 5);
        assert!(matches!(&events[1], XmlEvent::Start { tag, .. } if tag.qname() == "b"));
        assert_eq!(events[2], XmlEvent::Text("x & y".to_string()));
        assert_eq!(events[4], XmlEvent::End(Tag::element("a")));
    }

    #[test]
    fn test_empty_element_expanded() {
        let events = events("<a><b id=\"1\"/></a>").unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[2], XmlEvent::End(Tag::element("b")));
    }

    #[test]
    fn test_attributes_and_namespaces_split() {
        let events =
            events(r#"<r xmlns="urn:d" xmlns:dc="urn:dc" dc:id="7" lang="en"/>"#).unwrap();
        let XmlEvent::Start {
            attributes,
            namespaces,
            ..
        } = &events[0]
        else {
            panic!("expected start");
        };
        assert_eq!(namespaces.len(), 2);
        assert_eq!(namespaces[0].prefix, None);
        assert_eq!(namespaces[1].prefix.as_deref(), Some("dc"));
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].tag, Tag::attribute("dc:id"));
        assert_eq!(attributes[0].value, "7");
    }

    #[test]
    fn test_latin1_document_is_decoded() {
        let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
            <l><r place=\"M\xFCnchen\"><id>caf\xE9</id></r></l>";
        let events = events_from_bytes(xml).unwrap();
        let XmlEvent::Start { attributes, .. } = &events[1] else {
            panic!("expected start");
        };
        assert_eq!(attributes[0].value, "M\u{fc}nchen");
        assert_eq!(events[3], XmlEvent::Text("caf\u{e9}".to_string()));
    }

    #[test]
    fn test_cdata_is_text() {
        let events = events("<a><![CDATA[<raw>]]></a>").unwrap();
        assert_eq!(events[1], XmlEvent::Text("<raw>".to_string()));
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = events("<a><b></a>").unwrap_err();
        match err {
            StrataError::StructuralParse { path, .. } => assert_eq!(path, PathBuf::from("test.xml")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_truncated_document() {
        assert!(matches!(
            events("<a><b>text"),
            Err(StrataError::StructuralParse { .. })
        ));
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(events("  "), Err(StrataError::StructuralParse { .. })));
    }

    #[test]
    fn test_eof_repeats() {
        let mut reader = XmlEventReader::new("<a/>".as_bytes(), "x");
        while reader.next_event().unwrap() != XmlEvent::Eof {}
        assert_eq!(reader.next_event().unwrap(), XmlEvent::Eof);
        assert_eq!(reader.depth(), 0);
    }
}
