//! Streaming rewrite of delimited input into the canonical envelope
//!
//! Output shape:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <envelope xmlns:dc="...">
//! <record><unique-id>7</unique-id><priref>7</priref><title>Vase</title></record>
//! </envelope>
//! ```
//!
//! Only one record is held in memory at a time. Attributes at or below the
//! record root become child elements, and the identifier found at the unique
//! element path is emitted first. A missing or repeated identifier aborts the
//! pass; the caller discards everything written so far.
//!
//! `<envelope>`, `<record>` and `<unique-id>` are in no namespace. A default
//! namespace from the input is redeclared with `xmlns="..."` on the first
//! unprefixed record descendant that uses it, so copied elements keep their
//! expanded names.

use crate::core::progress::PassContext;
use crate::core::store::Delimiters;
use crate::core::xml::{Attribute, Namespace, XmlEvent, XmlEventReader};
use crate::domain::{Path, Result, StrataError, Tag, UniquenessViolation};
use quick_xml::escape::escape;
use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, Write};

pub const ENVELOPE_TAG: &str = "envelope";
pub const RECORD_TAG: &str = "record";
pub const UNIQUE_ID_TAG: &str = "unique-id";

const PREAMBLE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Prefix to URI bindings; the default namespace is never bound here
type Bindings = BTreeMap<String, String>;

fn bind(bindings: &mut Bindings, namespaces: &[Namespace]) {
    for namespace in namespaces {
        if let Some(prefix) = &namespace.prefix {
            bindings.insert(prefix.clone(), namespace.uri.clone());
        }
    }
}

fn write_declarations(out: &mut String, bindings: &Bindings) {
    for (prefix, uri) in bindings {
        out.push_str(" xmlns:");
        out.push_str(prefix);
        out.push_str("=\"");
        out.push_str(&escape(uri.as_str()));
        out.push('"');
    }
}

/// Default namespace declared on an element; `Some("")` undeclares it
fn default_namespace(namespaces: &[Namespace]) -> Option<&str> {
    namespaces
        .iter()
        .find(|namespace| namespace.prefix.is_none())
        .map(|namespace| namespace.uri.as_str())
}

/// Buffered output of one record
#[derive(Debug, PartialEq, Eq)]
enum Buffered {
    /// Start tag; `default` is an `xmlns` value to declare on it
    Start { name: String, default: Option<String> },
    Text(String),
    End(String),
}

/// State of the record being read
struct RecordBuffer {
    events: Vec<Buffered>,
    pending_text: String,
    identifier: Option<String>,
    /// Direct text of the unique element while it is open
    capture: Option<String>,
    /// Declarations found on the record root or inside the record
    inner_namespaces: Bindings,
    /// Default namespace in effect for each open output element, `<record>` first
    defaults: Vec<String>,
    /// The innermost open element has no child elements yet
    in_leaf: bool,
}

impl RecordBuffer {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            pending_text: String::new(),
            identifier: None,
            capture: None,
            inner_namespaces: Bindings::new(),
            defaults: vec![String::new()],
            in_leaf: false,
        }
    }

    fn output_default(&self) -> &str {
        self.defaults.last().map(String::as_str).unwrap_or_default()
    }

    /// Opens an element; `default` is the namespace of an unprefixed name,
    /// `None` for prefixed names, which leave the default untouched
    fn open(&mut self, name: String, default: Option<&str>) {
        let inherited = self.output_default().to_string();
        let declare = default
            .filter(|uri| *uri != inherited)
            .map(str::to_string);
        self.events.push(Buffered::Start { name, default: declare });
        self.defaults
            .push(default.map(str::to_string).unwrap_or(inherited));
        self.in_leaf = true;
    }

    fn close(&mut self, name: String) {
        self.events.push(Buffered::End(name));
        self.defaults.pop();
        self.in_leaf = false;
    }

    /// Applies the text policy to text gathered since the last tag
    ///
    /// `closing_leaf` is set when the element being closed had no child
    /// elements; its whitespace-only content collapses to one space.
    fn flush_text(&mut self, closing_leaf: bool) {
        if self.pending_text.is_empty() {
            return;
        }
        let trimmed = self.pending_text.trim();
        if !trimmed.is_empty() {
            self.events.push(Buffered::Text(trimmed.to_string()));
        } else if closing_leaf {
            self.events.push(Buffered::Text(" ".to_string()));
        }
        self.pending_text.clear();
    }

    /// Writes an attribute as a child element; unprefixed attributes have no namespace
    fn push_attribute(&mut self, attribute: &Attribute) {
        let in_leaf = self.in_leaf;
        let name = attribute.tag.qname();
        let default = attribute.tag.prefix().is_none().then_some("");
        self.open(name.clone(), default);
        let value = attribute.value.trim();
        if !value.is_empty() {
            self.events.push(Buffered::Text(value.to_string()));
        }
        self.close(name);
        self.in_leaf = in_leaf;
    }

    fn render(&self, identifier: &str, declarations: &Bindings) -> String {
        let mut out = String::new();
        out.push('<');
        out.push_str(RECORD_TAG);
        write_declarations(&mut out, declarations);
        out.push_str("><");
        out.push_str(UNIQUE_ID_TAG);
        out.push('>');
        out.push_str(&escape(identifier));
        out.push_str("</");
        out.push_str(UNIQUE_ID_TAG);
        out.push('>');
        for event in &self.events {
            match event {
                Buffered::Start { name, default } => {
                    out.push('<');
                    out.push_str(name);
                    if let Some(uri) = default {
                        out.push_str(" xmlns=\"");
                        out.push_str(&escape(uri.as_str()));
                        out.push('"');
                    }
                    out.push('>');
                }
                Buffered::Text(text) => out.push_str(&escape(text.as_str())),
                Buffered::End(name) => {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
        out.push_str("</");
        out.push_str(RECORD_TAG);
        out.push_str(">\n");
        out
    }
}

/// Rewrites delimited XML into canonical form
///
/// # Examples
///
/// ```
/// use strata::core::normalize::SourceNormalizer;
/// use strata::core::progress::{CancellationToken, NoProgress, PassContext};
/// use strata::core::store::Delimiters;
/// use strata::core::xml::XmlEventReader;
///
/// let delimiters = Delimiters::new(
///     "/list/item".parse().unwrap(),
///     1,
///     "/list/item/@id".parse().unwrap(),
/// )
/// .unwrap();
/// let input = r#"<list><item id="a1">text</item></list>"#;
/// let mut events = XmlEventReader::new(input.as_bytes(), "input.xml");
/// let mut output = Vec::new();
/// let mut listener = NoProgress;
/// let mut ctx = PassContext::new(&mut listener, CancellationToken::new());
///
/// let count = SourceNormalizer::new(&delimiters)
///     .normalize(&mut events, &mut output, &mut ctx)
///     .unwrap();
/// assert_eq!(count, 1);
/// let text = String::from_utf8(output).unwrap();
/// assert!(text.contains("<record><unique-id>a1</unique-id><id>a1</id>text</record>"));
/// ```
pub struct SourceNormalizer {
    record_root: Path,
    unique_element: Path,
}

impl SourceNormalizer {
    pub fn new(delimiters: &Delimiters) -> Self {
        Self {
            record_root: delimiters.record_root.clone(),
            unique_element: delimiters.unique_element.clone(),
        }
    }

    /// Runs one pass and returns the number of records written
    pub fn normalize<R: BufRead, W: Write>(
        &self,
        events: &mut XmlEventReader<R>,
        output: &mut W,
        ctx: &mut PassContext<'_>,
    ) -> Result<u64> {
        let mut pass = Pass {
            normalizer: self,
            output,
            path: Path::root(),
            scopes: Vec::new(),
            defaults: Vec::new(),
            envelope: None,
            record: None,
            seen: HashSet::new(),
            count: 0,
            warned_namespaces: false,
        };
        pass.output.write_all(PREAMBLE.as_bytes())?;

        loop {
            match events.next_event()? {
                XmlEvent::Start {
                    tag,
                    attributes,
                    namespaces,
                } => pass.start(tag, &attributes, &namespaces)?,
                XmlEvent::Text(text) => pass.text(&text),
                XmlEvent::End(tag) => {
                    if pass.end(&tag)? {
                        ctx.checkpoint(pass.count)?;
                    }
                }
                XmlEvent::Eof => break,
            }
        }

        pass.open_envelope()?;
        pass.output.write_all(format!("</{ENVELOPE_TAG}>\n").as_bytes())?;
        pass.output.flush()?;
        Ok(pass.count)
    }
}

struct Pass<'a, W: Write> {
    normalizer: &'a SourceNormalizer,
    output: &'a mut W,
    path: Path,
    /// Bindings declared on each open element outside records
    scopes: Vec<Bindings>,
    /// Default namespace in effect for each open input element
    defaults: Vec<String>,
    /// Bindings declared on the envelope once it is written
    envelope: Option<Bindings>,
    record: Option<RecordBuffer>,
    seen: HashSet<String>,
    count: u64,
    warned_namespaces: bool,
}

impl<W: Write> Pass<'_, W> {
    fn in_scope(&self) -> Bindings {
        let mut bindings = Bindings::new();
        for scope in &self.scopes {
            bindings.extend(scope.iter().map(|(p, u)| (p.clone(), u.clone())));
        }
        bindings
    }

    fn open_envelope(&mut self) -> Result<()> {
        if self.envelope.is_some() {
            return Ok(());
        }
        let bindings = self.in_scope();
        let mut start = format!("<{ENVELOPE_TAG}");
        write_declarations(&mut start, &bindings);
        start.push_str(">\n");
        self.output.write_all(start.as_bytes())?;
        self.envelope = Some(bindings);
        Ok(())
    }

    fn start(&mut self, tag: Tag, attributes: &[Attribute], namespaces: &[Namespace]) -> Result<()> {
        self.path.push(tag);
        let normalizer = self.normalizer;
        let unique = &normalizer.unique_element;
        let default = default_namespace(namespaces)
            .map(str::to_string)
            .or_else(|| self.defaults.last().cloned())
            .unwrap_or_default();
        self.defaults.push(default.clone());

        if self.record.is_none() {
            if self.path != normalizer.record_root {
                let mut scope = Bindings::new();
                bind(&mut scope, namespaces);
                self.scopes.push(scope);
                if Some(&self.path) == normalizer.record_root.parent().as_ref() {
                    self.open_envelope()?;
                }
                return Ok(());
            }
            self.open_envelope()?;
            let mut record = RecordBuffer::new();
            bind(&mut record.inner_namespaces, namespaces);
            for attribute in attributes {
                if record.identifier.is_none() && self.path.child(attribute.tag.clone()) == *unique {
                    record.identifier = Some(attribute.value.trim().to_string());
                }
                record.push_attribute(attribute);
            }
            self.record = Some(record);
            return Ok(());
        }

        let path = &self.path;
        if let Some(record) = self.record.as_mut() {
            record.flush_text(false);
            bind(&mut record.inner_namespaces, namespaces);
            let unprefixed = path.last().is_some_and(|tag| tag.prefix().is_none());
            let qname = path.last().map(Tag::qname).unwrap_or_default();
            record.open(qname, unprefixed.then_some(default.as_str()));
            for attribute in attributes {
                if record.identifier.is_none() && path.child(attribute.tag.clone()) == *unique {
                    record.identifier = Some(attribute.value.trim().to_string());
                }
                record.push_attribute(attribute);
            }
            if record.identifier.is_none() && record.capture.is_none() && path == unique {
                record.capture = Some(String::new());
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        let capturing = self.path == self.normalizer.unique_element;
        if let Some(record) = self.record.as_mut() {
            record.pending_text.push_str(text);
            if capturing {
                if let Some(capture) = record.capture.as_mut() {
                    capture.push_str(text);
                }
            }
        }
    }

    /// Handles an end tag; returns true when a record was completed
    fn end(&mut self, tag: &Tag) -> Result<bool> {
        self.defaults.pop();
        if self.record.is_none() {
            self.scopes.pop();
            self.path.pop();
            return Ok(false);
        }

        if self.path == self.normalizer.record_root {
            self.path.pop();
            return self.emit_record().map(|()| true);
        }

        let at_unique = self.path == self.normalizer.unique_element;
        if let Some(record) = self.record.as_mut() {
            let qname = tag.qname();
            let in_leaf = record.in_leaf;
            record.flush_text(in_leaf);
            record.close(qname);
            if at_unique {
                if let Some(captured) = record.capture.take() {
                    record.identifier = Some(captured.trim().to_string());
                }
            }
        }
        self.path.pop();
        Ok(false)
    }

    fn emit_record(&mut self) -> Result<()> {
        let Some(mut record) = self.record.take() else {
            return Ok(());
        };
        record.flush_text(false);
        let number = self.count + 1;
        let identifier = record.identifier.take().ok_or_else(|| {
            StrataError::from(UniquenessViolation::MissingIdentifier {
                record: number,
                path: self.normalizer.unique_element.to_string(),
            })
        })?;
        if !self.seen.insert(identifier.clone()) {
            return Err(UniquenessViolation::DuplicateIdentifier {
                record: number,
                identifier,
            }
            .into());
        }

        let declarations = self.undeclared(&record.inner_namespaces);
        self.output
            .write_all(record.render(&identifier, &declarations).as_bytes())?;
        self.count = number;
        Ok(())
    }

    /// Bindings a record needs that the envelope does not provide
    fn undeclared(&mut self, inner: &Bindings) -> Bindings {
        let mut needed = self.in_scope();
        needed.extend(inner.iter().map(|(p, u)| (p.clone(), u.clone())));
        let empty = Bindings::new();
        let envelope = self.envelope.as_ref().unwrap_or(&empty);
        let missing: Bindings = needed
            .into_iter()
            .filter(|(prefix, uri)| envelope.get(prefix) != Some(uri))
            .collect();
        if !missing.is_empty() && !self.warned_namespaces {
            self.warned_namespaces = true;
            tracing::warn!(
                record = self.count + 1,
                prefixes = ?missing.keys().collect::<Vec<_>>(),
                "Namespaces declared inside records are redeclared on each record"
            );
        }
        missing
    }
}
