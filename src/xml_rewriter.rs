//! Streaming reformatter for extracted SOAP envelopes.
//!
//! `stream_xml_events` drives any [`XmlEventSink`] from a `quick-xml` reader. [`SoapXmlRewriter`]
//! is the sink that pretty prints the envelope, optionally strips namespace prefixes, and applies
//! the AbaConnect import rules (`mode` attributes, `ExtendedFields` flattening).

use crate::err::{RewriteError, RewriteResult};

use log::{debug, trace};
use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use std::borrow::Cow;
use std::fmt;

const DATA_ELEMENT: &str = "Data";
const EXTENDED_FIELDS_ELEMENT: &str = "ExtendedFields";
const FIELD_NAME_ATTRIBUTE: &str = "Name";
const MODE_ATTRIBUTE: &str = "mode";
const REQUEST_ELEMENTS: [&str; 3] = ["SaveRequest", "InsertRequest", "UpdateRequest"];
const ABACONNECT_NAMESPACE: &str = "http://www.abacus.ch/abaconnect";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImportMode {
    #[default]
    None,
    Save,
    Insert,
    Update,
}

impl ImportMode {
    /// Case-insensitive; anything unrecognized disables import mode.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "SAVE" => ImportMode::Save,
            "INSERT" => ImportMode::Insert,
            "UPDATE" => ImportMode::Update,
            _ => ImportMode::None,
        }
    }

    pub fn is_active(self) -> bool {
        self != ImportMode::None
    }

    /// Value of the injected `mode` attribute.
    pub fn as_attribute_value(self) -> Option<&'static str> {
        match self {
            ImportMode::None => None,
            ImportMode::Save => Some("SAVE"),
            ImportMode::Insert => Some("INSERT"),
            ImportMode::Update => Some("UPDATE"),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_attribute_value().unwrap_or("NONE"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    pub strip_namespace_prefixes: bool,
    pub convert_extended_fields_to_xml: bool,
    pub import_mode: ImportMode,
    pub indent_unit: String,
    pub line_terminator: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            strip_namespace_prefixes: true,
            convert_extended_fields_to_xml: false,
            import_mode: ImportMode::None,
            indent_unit: "  ".to_owned(),
            line_terminator: "\r\n".to_owned(),
        }
    }
}

/// An attribute as written in the source document, value still in escaped form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute<'a> {
    pub name: &'a str,
    pub value: Cow<'a, str>,
}

impl XmlAttribute<'_> {
    pub fn local_name(&self) -> &str {
        local_name(self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement<'a> {
    /// Qualified name, prefix included.
    pub name: &'a str,
    pub attributes: Vec<XmlAttribute<'a>>,
}

/// Receives the element stream of one document.
pub trait XmlEventSink {
    fn visit_open_start_element(&mut self, element: &XmlElement) -> RewriteResult<()>;
    /// Unescaped character data of the innermost open element.
    fn visit_characters(&mut self, value: &str) -> RewriteResult<()>;
    fn visit_close_element(&mut self, name: &str) -> RewriteResult<()>;
    fn visit_end_of_stream(&mut self) -> RewriteResult<()>;
}

/// Tokenizes `xml` and forwards its elements and character data to `sink`.
///
/// Declarations, comments, processing instructions and doctypes are skipped. The document must
/// have exactly one root element and nothing but whitespace outside of it.
pub fn stream_xml_events<S: XmlEventSink>(xml: &str, sink: &mut S) -> RewriteResult<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut depth = 0_usize;
    let mut seen_root = false;

    loop {
        let position = reader.buffer_position() as u64;

        match reader.read_event() {
            Ok(Event::Start(e)) => {
                check_root(depth, &mut seen_root, position)?;
                sink.visit_open_start_element(&xml_element(&e, position)?)?;
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                check_root(depth, &mut seen_root, position)?;
                let element = xml_element(&e, position)?;
                sink.visit_open_start_element(&element)?;
                sink.visit_close_element(element.name)?;
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                sink.visit_close_element(utf8(e.name().into_inner(), position)?)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| RewriteError::malformed(position, err.to_string()))?;
                characters(sink, depth, &text, position)?;
            }
            Ok(Event::CData(e)) => {
                let text = utf8(&e, position)?;
                characters(sink, depth, text, position)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(RewriteError::malformed(
                    reader.buffer_position() as u64,
                    err.to_string(),
                ));
            }
        }
    }

    let end = reader.buffer_position() as u64;
    if depth > 0 {
        return Err(RewriteError::malformed(
            end,
            format!("unexpected end of document, {} element(s) left open", depth),
        ));
    }
    if !seen_root {
        return Err(RewriteError::malformed(end, "document has no root element"));
    }

    sink.visit_end_of_stream()
}

fn check_root(depth: usize, seen_root: &mut bool, position: u64) -> RewriteResult<()> {
    if depth == 0 {
        if *seen_root {
            return Err(RewriteError::malformed(
                position,
                "more than one root element",
            ));
        }
        *seen_root = true;
    }
    Ok(())
}

fn characters<S: XmlEventSink>(
    sink: &mut S,
    depth: usize,
    text: &str,
    position: u64,
) -> RewriteResult<()> {
    if depth > 0 {
        sink.visit_characters(text)
    } else if text.trim().is_empty() {
        Ok(())
    } else {
        Err(RewriteError::malformed(
            position,
            "character data outside of the root element",
        ))
    }
}

fn xml_element<'e>(start: &'e BytesStart, position: u64) -> RewriteResult<XmlElement<'e>> {
    let name = utf8(start.name().into_inner(), position)?;

    let mut attributes = vec![];
    for attribute in start.attributes().with_checks(false) {
        let Attribute { key, value } =
            attribute.map_err(|err| RewriteError::malformed(position, err.to_string()))?;

        let value = match value {
            Cow::Borrowed(bytes) => Cow::Borrowed(utf8(bytes, position)?),
            Cow::Owned(bytes) => Cow::Owned(
                String::from_utf8(bytes)
                    .map_err(|err| RewriteError::malformed(position, err.to_string()))?,
            ),
        };

        attributes.push(XmlAttribute {
            name: utf8(key.into_inner(), position)?,
            value,
        });
    }

    Ok(XmlElement { name, attributes })
}

fn utf8(bytes: &[u8], position: u64) -> RewriteResult<&str> {
    std::str::from_utf8(bytes).map_err(|err| RewriteError::malformed(position, err.to_string()))
}

/// Everything after the first `:`.
fn local_name(name: &str) -> &str {
    match name.find(':') {
        Some(colon) => &name[colon + 1..],
        None => name,
    }
}

fn escape_text(value: &str) -> Cow<'_, str> {
    if value.contains('&') {
        Cow::Owned(value.replace('&', "&amp;"))
    } else {
        Cow::Borrowed(value)
    }
}

fn escape_attribute_value(value: &str) -> Cow<'_, str> {
    if value.contains('"') {
        Cow::Owned(value.replace('"', "&quot;"))
    } else {
        Cow::Borrowed(value)
    }
}

/// Where the rewriter currently is relative to an AbaConnect request payload.
///
/// Depths are those of the elements that caused each transition, so leaving happens on the
/// close of the very same element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestScope {
    Outside,
    InRequest {
        request_depth: usize,
    },
    InRequestData {
        request_depth: usize,
        data_depth: usize,
    },
    InExtendedFields {
        request_depth: usize,
        data_depth: usize,
        fields_depth: usize,
        field_name: Option<String>,
    },
}

impl RequestScope {
    fn is_in_data(&self) -> bool {
        matches!(
            self,
            RequestScope::InRequestData { .. } | RequestScope::InExtendedFields { .. }
        )
    }

    fn is_in_extended_fields(&self) -> bool {
        matches!(self, RequestScope::InExtendedFields { .. })
    }

    fn enter(&mut self, local_name: &str, depth: usize, options: &RewriteOptions) {
        let next = match *self {
            RequestScope::Outside
                if options.import_mode.is_active() && REQUEST_ELEMENTS.contains(&local_name) =>
            {
                RequestScope::InRequest {
                    request_depth: depth,
                }
            }
            RequestScope::InRequest { request_depth } if local_name == DATA_ELEMENT => {
                RequestScope::InRequestData {
                    request_depth,
                    data_depth: depth,
                }
            }
            RequestScope::InRequestData {
                request_depth,
                data_depth,
            } if local_name == EXTENDED_FIELDS_ELEMENT
                && options.convert_extended_fields_to_xml =>
            {
                RequestScope::InExtendedFields {
                    request_depth,
                    data_depth,
                    fields_depth: depth,
                    field_name: None,
                }
            }
            _ => return,
        };

        trace!("scope {:?} -> {:?} at depth {}", self, next, depth);
        *self = next;
    }

    fn leave(&mut self, depth: usize) {
        let next = match *self {
            RequestScope::InExtendedFields {
                request_depth,
                data_depth,
                fields_depth,
                ..
            } if fields_depth == depth => RequestScope::InRequestData {
                request_depth,
                data_depth,
            },
            RequestScope::InRequestData {
                request_depth,
                data_depth,
            } if data_depth == depth => RequestScope::InRequest { request_depth },
            RequestScope::InRequest { request_depth } if request_depth == depth => {
                RequestScope::Outside
            }
            _ => return,
        };

        trace!("scope {:?} -> {:?} at depth {}", self, next, depth);
        *self = next;
    }
}

#[derive(Debug)]
struct OpenElement {
    /// Name as written to the output.
    output_name: String,
    local_name: String,
    /// Set when the source already carries a `mode` attribute.
    has_mode_attribute: bool,
    text: String,
}

impl OpenElement {
    fn content(&self, is_leaf: bool) -> &str {
        if is_leaf { &self.text } else { self.text.trim() }
    }
}

/// Pretty printer for one SOAP envelope.
///
/// A start tag is left open (no `>`) until either its first child opens or it closes, so that
/// leaves are written as `<name>value</name>` on a single line and the `mode` attribute can still
/// be added once an element turns out to have children.
#[derive(Debug)]
pub struct SoapXmlRewriter {
    options: RewriteOptions,
    output: String,
    stack: Vec<OpenElement>,
    start_tag_pending: bool,
    scope: RequestScope,
}

impl SoapXmlRewriter {
    pub fn new(options: RewriteOptions) -> Self {
        SoapXmlRewriter {
            options,
            output: String::new(),
            stack: vec![],
            start_tag_pending: false,
            scope: RequestScope::Outside,
        }
    }

    pub fn into_output(self) -> String {
        self.output
    }

    fn write_line_break(&mut self, depth: usize) {
        self.output.push_str(&self.options.line_terminator);
        for _ in 0..depth {
            self.output.push_str(&self.options.indent_unit);
        }
    }

    /// Terminates the start tag of the innermost element, which just got its first child.
    fn close_pending_start_tag(&mut self) {
        let Some(parent) = self.stack.last() else {
            return;
        };

        if self.scope.is_in_data()
            && parent.local_name != DATA_ELEMENT
            && !parent.has_mode_attribute
        {
            if let Some(mode) = self.options.import_mode.as_attribute_value() {
                self.output.push_str(" mode=\"");
                self.output.push_str(mode);
                self.output.push('"');
            }
        }
        self.output.push('>');
    }

    fn write_start_tag(&mut self, element: &XmlElement, output_name: &str, depth: usize) {
        if depth > 0 {
            self.write_line_break(depth);
        }
        self.output.push('<');
        self.output.push_str(output_name);

        for attribute in &element.attributes {
            if self.options.import_mode.is_active() && attribute.value.contains(ABACONNECT_NAMESPACE)
            {
                trace!("dropping attribute `{}`", attribute.name);
                continue;
            }
            self.output.push(' ');
            self.output.push_str(attribute.local_name());
            self.output.push_str("=\"");
            self.output.push_str(&escape_attribute_value(&attribute.value));
            self.output.push('"');
        }
    }

    fn write_element(&mut self, name: &str, value: &str) {
        self.output.push('<');
        self.output.push_str(name);
        self.output.push('>');
        self.output.push_str(&escape_text(value));
        self.output.push_str("</");
        self.output.push_str(name);
        self.output.push('>');
    }
}

impl XmlEventSink for SoapXmlRewriter {
    fn visit_open_start_element(&mut self, element: &XmlElement) -> RewriteResult<()> {
        trace!("visit_open_start_element: {}", element.name);

        let depth = self.stack.len();
        let local = local_name(element.name);

        if self.start_tag_pending && !self.scope.is_in_extended_fields() {
            self.close_pending_start_tag();
        }

        self.scope.enter(local, depth, &self.options);

        let output_name = if self.options.strip_namespace_prefixes {
            local
        } else {
            element.name
        };

        if let RequestScope::InExtendedFields { field_name, .. } = &mut self.scope {
            *field_name = element
                .attributes
                .iter()
                .find(|attribute| attribute.local_name() == FIELD_NAME_ATTRIBUTE)
                .map(|attribute| attribute.value.to_string());
        } else {
            self.write_start_tag(element, output_name, depth);
        }

        self.stack.push(OpenElement {
            output_name: output_name.to_owned(),
            local_name: local.to_owned(),
            has_mode_attribute: element
                .attributes
                .iter()
                .any(|attribute| attribute.local_name() == MODE_ATTRIBUTE),
            text: String::new(),
        });
        self.start_tag_pending = true;

        Ok(())
    }

    fn visit_characters(&mut self, value: &str) -> RewriteResult<()> {
        if let Some(element) = self.stack.last_mut() {
            element.text.push_str(value);
        }
        Ok(())
    }

    fn visit_close_element(&mut self, name: &str) -> RewriteResult<()> {
        trace!("visit_close_element: {}", name);

        let Some(element) = self.stack.pop() else {
            return Err(RewriteError::malformed(
                0,
                format!("closing tag `{}` without an open element", name),
            ));
        };
        let depth = self.stack.len();
        let is_leaf = self.start_tag_pending;
        self.start_tag_pending = false;

        match &mut self.scope {
            RequestScope::InExtendedFields {
                fields_depth,
                field_name,
                ..
            } if depth > *fields_depth => {
                let fields_depth = *fields_depth;
                if let Some(field_name) = field_name.take() {
                    self.write_line_break(fields_depth);
                    self.write_element(&field_name, element.content(is_leaf));
                }
            }
            RequestScope::InExtendedFields { .. } => {}
            _ => {
                if is_leaf {
                    self.output.push('>');
                } else {
                    self.write_line_break(depth);
                }
                self.output
                    .push_str(&escape_text(element.content(is_leaf)));
                self.output.push_str("</");
                self.output.push_str(&element.output_name);
                self.output.push('>');
            }
        }

        self.scope.leave(depth);
        Ok(())
    }

    fn visit_end_of_stream(&mut self) -> RewriteResult<()> {
        debug!("rewrote envelope into {} bytes", self.output.len());
        Ok(())
    }
}

/// Reformats one XML document. Each call starts from a fresh rewriter, so a failed document
/// never affects the next one.
pub fn render(xml: &str, options: &RewriteOptions) -> RewriteResult<String> {
    let mut rewriter = SoapXmlRewriter::new(options.clone());
    stream_xml_events(xml, &mut rewriter)?;
    Ok(rewriter.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn options() -> RewriteOptions {
        RewriteOptions {
            line_terminator: "\n".to_owned(),
            ..RewriteOptions::default()
        }
    }

    fn import_options(mode: ImportMode, convert: bool) -> RewriteOptions {
        RewriteOptions {
            import_mode: mode,
            convert_extended_fields_to_xml: convert,
            ..options()
        }
    }

    const LOGIN: &str = r#"<soap:Envelope xmlns:soap="urn:s"><soap:Body><ns1:Login xmlns:ns1="urn:l"><User>Tom &amp; Jerry</User><Empty/></ns1:Login></soap:Body></soap:Envelope>"#;

    const SAVE_REQUEST: &str = concat!(
        r#"<s:Envelope xmlns:s="urn:s"><s:Body>"#,
        r#"<ns:SaveRequest xmlns:ns="http://www.abacus.ch/abaconnect/ws"><ns:Data><Customer>"#,
        r#"<Name>ACME</Name><ExtendedFields><Field Name="Foo">1</Field><Field Name="Bar">2</Field></ExtendedFields>"#,
        r#"<City>Bern</City></Customer></ns:Data></ns:SaveRequest>"#,
        r#"<Other><Child>x</Child></Other></s:Body></s:Envelope>"#,
    );

    #[test]
    fn test_pretty_prints_and_strips_prefixes() {
        let expected = indoc!(
            r#"
            <Envelope soap="urn:s">
              <Body>
                <Login ns1="urn:l">
                  <User>Tom &amp; Jerry</User>
                  <Empty></Empty>
                </Login>
              </Body>
            </Envelope>"#
        );
        assert_eq!(render(LOGIN, &options()).unwrap(), expected.trim_start());
    }

    #[test]
    fn test_keeps_element_prefixes_when_asked() {
        let options = RewriteOptions {
            strip_namespace_prefixes: false,
            ..options()
        };
        let output = render(LOGIN, &options).unwrap();
        assert!(output.starts_with("<soap:Envelope soap=\"urn:s\">\n  <soap:Body>"));
        assert!(output.ends_with("\n  </soap:Body>\n</soap:Envelope>"));
    }

    #[test]
    fn test_crlf_and_custom_indent() {
        let options = RewriteOptions {
            indent_unit: "\t".to_owned(),
            ..RewriteOptions::default()
        };
        assert_eq!(
            render("<a><b>1</b></a>", &options).unwrap(),
            "<a>\r\n\t<b>1</b>\r\n</a>"
        );
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let once = render(LOGIN, &options()).unwrap();
        let twice = render(&once, &options()).unwrap();
        assert_eq!(once, twice);

        let mixed = render("<a>hello<b>x</b>world</a>", &options()).unwrap();
        assert_eq!(mixed, "<a>\n  <b>x</b>\nhelloworld</a>");
        assert_eq!(render(&mixed, &options()).unwrap(), mixed);
    }

    #[test]
    fn test_import_mode_converts_extended_fields() {
        let expected = indoc!(
            r#"
            <Envelope s="urn:s">
              <Body>
                <SaveRequest>
                  <Data>
                    <Customer mode="SAVE">
                      <Name>ACME</Name>
                      <Foo>1</Foo>
                      <Bar>2</Bar>
                      <City>Bern</City>
                    </Customer>
                  </Data>
                </SaveRequest>
                <Other>
                  <Child>x</Child>
                </Other>
              </Body>
            </Envelope>"#
        );
        for mode in [ImportMode::Save, ImportMode::Insert] {
            let output = render(SAVE_REQUEST, &import_options(mode, true)).unwrap();
            assert_eq!(
                output,
                expected.trim_start().replace("SAVE", &mode.to_string())
            );
            assert!(output.contains("\n          <Foo>1</Foo>\n          <Bar>2</Bar>\n"));
            assert!(output.contains("\n    <Other>\n"));
            assert!(!output.contains("ExtendedFields"));
        }
    }

    #[test]
    fn test_import_mode_rendering_is_idempotent() {
        let options = import_options(ImportMode::Insert, true);
        let once = render(SAVE_REQUEST, &options).unwrap();
        let twice = render(&once, &options).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.matches("mode=").count(), 1);
    }

    #[test]
    fn test_existing_mode_attribute_is_kept() {
        let xml = r#"<SaveRequest><Data><Customer mode="UPDATE"><Name>A</Name></Customer></Data></SaveRequest>"#;
        assert_eq!(
            render(xml, &import_options(ImportMode::Save, false)).unwrap(),
            "<SaveRequest>\n  <Data>\n    <Customer mode=\"UPDATE\">\n      <Name>A</Name>\n    </Customer>\n  </Data>\n</SaveRequest>"
        );
    }

    #[test]
    fn test_insert_mode_without_conversion_keeps_field_list() {
        let output = render(SAVE_REQUEST, &import_options(ImportMode::Insert, false)).unwrap();
        assert!(output.contains(
            "<ExtendedFields mode=\"INSERT\">\n            <Field Name=\"Foo\">1</Field>"
        ));
        assert!(output.contains("<Customer mode=\"INSERT\">"));
        assert!(output.contains("<Other>\n"));
        assert!(!output.contains("<Data mode"));
    }

    #[test]
    fn test_conversion_needs_import_mode() {
        let output = render(SAVE_REQUEST, &import_options(ImportMode::None, true)).unwrap();
        assert!(output.contains("<Field Name=\"Bar\">2</Field>"));
        assert!(output.contains("<SaveRequest ns=\"http://www.abacus.ch/abaconnect/ws\">"));
        assert!(!output.contains("mode="));
    }

    #[test]
    fn test_update_request_and_extended_fields_as_first_child() {
        let xml = concat!(
            r#"<UpdateRequest><Data><Item><ExtendedFields><F Name="Color">red &amp; blue</F>"#,
            r#"</ExtendedFields></Item></Data></UpdateRequest>"#
        );
        assert_eq!(
            render(xml, &import_options(ImportMode::Update, true)).unwrap(),
            "<UpdateRequest>\n  <Data>\n    <Item mode=\"UPDATE\">\n      <Color>red &amp; blue</Color>\n    </Item>\n  </Data>\n</UpdateRequest>"
        );
    }

    #[test]
    fn test_mode_outside_data_is_not_injected() {
        let xml = "<SaveRequest><Header><Id>1</Id></Header><Data><Row><A>1</A></Row></Data></SaveRequest>";
        let output = render(xml, &import_options(ImportMode::Save, false)).unwrap();
        assert!(output.contains("<Header>\n"));
        assert!(output.contains("<Row mode=\"SAVE\">"));
    }

    #[test]
    fn test_attribute_quotes_are_escaped() {
        let output = render(r#"<a title='say "hi"'/>"#, &options()).unwrap();
        assert_eq!(output, r#"<a title="say &quot;hi&quot;"></a>"#);
    }

    #[test]
    fn test_malformed_xml_is_reported_and_isolated() {
        for broken in ["<a><b></a>", "<a><b>", "", "junk<a/>", "<a/><b/>"] {
            let result = render(broken, &options());
            assert!(
                matches!(result, Err(RewriteError::MalformedXml { .. })),
                "expected failure for {:?}, got {:?}",
                broken,
                result
            );
        }

        assert_eq!(render("<ok>1</ok>", &options()).unwrap(), "<ok>1</ok>");
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<String>,
    }

    impl XmlEventSink for RecordingSink {
        fn visit_open_start_element(&mut self, element: &XmlElement) -> RewriteResult<()> {
            self.events.push(format!("open {}", element.name));
            Ok(())
        }

        fn visit_characters(&mut self, value: &str) -> RewriteResult<()> {
            self.events.push(format!("text {}", value));
            Ok(())
        }

        fn visit_close_element(&mut self, name: &str) -> RewriteResult<()> {
            self.events.push(format!("close {}", name));
            Ok(())
        }

        fn visit_end_of_stream(&mut self) -> RewriteResult<()> {
            self.events.push("eof".to_owned());
            Ok(())
        }
    }

    #[test]
    fn test_event_stream() {
        let mut sink = RecordingSink::default();
        stream_xml_events(
            "<?xml version=\"1.0\"?><!-- c --><a:x><![CDATA[<raw>]]><y/>&lt;</a:x>",
            &mut sink,
        )
        .unwrap();
        assert_eq!(
            sink.events,
            vec![
                "open a:x",
                "text <raw>",
                "open y",
                "close y",
                "text <",
                "close a:x",
                "eof"
            ]
        );
    }

    #[test]
    fn test_import_mode_from_name() {
        assert_eq!(ImportMode::from_name("insert"), ImportMode::Insert);
        assert_eq!(ImportMode::from_name("Save"), ImportMode::Save);
        assert_eq!(ImportMode::from_name("delete"), ImportMode::None);
        assert_eq!(ImportMode::Update.to_string(), "UPDATE");
    }
}
