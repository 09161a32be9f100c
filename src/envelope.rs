use serde::Serialize;
use std::fmt;

const REQUEST_LINE_MARKER: &str = "POST ";
const STATUS_LINE_MARKER: &str = "HTTP/1.";

/// Whether an envelope was sent by the client or returned by the server, judged by its HTTP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageType {
    Unknown,
    Request,
    Response,
}

impl MessageType {
    pub fn from_header(header: &str) -> Self {
        if header.starts_with(STATUS_LINE_MARKER) {
            MessageType::Response
        } else if header.starts_with(REQUEST_LINE_MARKER) {
            MessageType::Request
        } else {
            MessageType::Unknown
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Unknown => write!(f, "UNKNOWN"),
            MessageType::Request => write!(f, "REQUEST"),
            MessageType::Response => write!(f, "RESPONSE"),
        }
    }
}

/// One SOAP message recovered from a capture log.
///
/// `message_type` and `body_name` are pure functions of `header` and `xml`, so they are computed
/// once when the envelope is built. Only `order_index` changes afterwards, when the envelopes are
/// sequenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    xml: String,
    header: String,
    message_type: MessageType,
    body_name: String,
    order_index: Option<u32>,
}

impl Envelope {
    pub fn new(xml: impl Into<String>, header: impl Into<String>) -> Self {
        let xml = xml.into();
        let header = header.into();
        let message_type = MessageType::from_header(&header);
        let body_name = extract_body_name(&xml).to_owned();

        Envelope {
            xml,
            header,
            message_type,
            body_name,
            order_index: None,
        }
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn body_name(&self) -> &str {
        &self.body_name
    }

    /// Sort key assigned by the sequencer, `None` until assigned.
    pub fn order_index(&self) -> Option<u32> {
        self.order_index
    }

    pub(crate) fn set_order_index(&mut self, order_index: u32) {
        self.order_index = Some(order_index);
    }
}

/// Name of the first element following the SOAP `Body` opening tag, without namespace prefix.
///
/// Returns an empty string when no `Body` element (or no child of it) is found.
pub fn extract_body_name(xml: &str) -> &str {
    let bytes = xml.as_bytes();
    let mut search_from = 0;

    while let Some(relative) = xml[search_from..].find("Body") {
        let body_pos = search_from + relative;
        search_from = body_pos + 1;

        if body_pos == 0 || !matches!(bytes[body_pos - 1], b'<' | b':') {
            continue;
        }
        match bytes.get(body_pos + 4) {
            Some(b) if *b == b'>' || *b == b'/' || b.is_ascii_whitespace() => {}
            _ => continue,
        }

        let Some(tag_start) = xml[body_pos..].find('<').map(|i| body_pos + i) else {
            continue;
        };
        let Some(tag_end) = xml[tag_start..].find('>').map(|i| tag_start + i) else {
            continue;
        };

        let name = &xml[tag_start + 1..tag_end];
        if name.starts_with('/') {
            // `<Body></Body>`, nothing to name.
            return "";
        }

        let name = name
            .split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or_default();
        let name = match name.find(':') {
            Some(colon) => &name[colon + 1..],
            None => name,
        };
        let name = name.strip_suffix('/').unwrap_or(name);

        if !name.is_empty() {
            return name;
        }
    }

    ""
}
