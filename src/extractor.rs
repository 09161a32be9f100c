//! Line based recovery of SOAP envelopes from captured HTTP traffic.
//!
//! Capture logs (TCPMon and similar tools) interleave HTTP headers and XML bodies, sometimes with
//! several exchanges on one physical line and sometimes with chunked transfer-encoding markers in
//! the middle of a body. The scanner below recovers envelope boundaries with plain substring
//! matching and never fails on content, only on I/O.

use crate::envelope::Envelope;
use crate::err::{ExtractionError, ExtractionResult};
use crate::notice::{Notice, NoticeKind};
use crate::tag_scanner::find_all;

use encoding::{DecoderTrap, EncodingRef};
use log::{debug, info, trace, warn};

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::Path;

const ENVELOPE_TAG_NAME: &str = "Envelope";
const REQUEST_LINE_MARKER: &str = "POST ";
const STATUS_LINE_MARKER: &str = "HTTP/1.";
const HEADER_LINE_TERMINATOR: &str = "\r\n";

/// Lines inside an envelope this short (after trimming) are chunk-size markers, not XML.
const MAX_SUSPECT_LINE_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum ScanPhase {
    #[default]
    Idle,
    CapturingHeader,
    InEnvelope {
        /// `</` + the opening tag's literal prefix + `Envelope`.
        close_tag: String,
    },
}

/// Working state of the scanner for one input.
#[derive(Debug, Default)]
pub struct ScanState {
    phase: ScanPhase,
    envelope: String,
    header: String,
}

impl ScanState {
    pub fn is_in_envelope(&self) -> bool {
        matches!(self.phase, ScanPhase::InEnvelope { .. })
    }

    fn close_tag(&self) -> Option<&str> {
        match &self.phase {
            ScanPhase::InEnvelope { close_tag } => Some(close_tag),
            _ => None,
        }
    }

    /// Header lines captured so far for the next envelope.
    pub fn pending_header(&self) -> &str {
        &self.header
    }

    fn append_header_line(&mut self, line: &str) {
        self.header.push_str(line.trim());
        self.header.push_str(HEADER_LINE_TERMINATOR);
    }
}

/// The result of scanning one capture log.
#[derive(Debug, Default)]
pub struct Extraction {
    pub envelopes: Vec<Envelope>,
    pub notices: Vec<Notice>,
}

/// Feeds capture log lines through a [`ScanState`], collecting envelopes in capture order.
#[derive(Debug, Default)]
pub struct EnvelopeExtractor {
    state: ScanState,
    line_number: usize,
    extraction: Extraction,
}

impl EnvelopeExtractor {
    pub fn new() -> Self {
        EnvelopeExtractor::default()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn feed_line(&mut self, line: &str) {
        self.line_number += 1;
        self.scan(line);
    }

    fn scan(&mut self, line: &str) {
        let mut line = line;

        if self.state.phase == ScanPhase::Idle && contains_header_start(line) {
            trace!("line {}: header starts", self.line_number);
            self.state.phase = ScanPhase::CapturingHeader;
        }

        if let Some(open) = find_envelope_open(line) {
            let closes_first = self
                .state
                .close_tag()
                .and_then(|close_tag| line.find(close_tag))
                .is_some_and(|close_pos| close_pos < open.start);

            if !closes_first {
                if self.state.is_in_envelope() {
                    warn!(
                        "line {}: new envelope starts before the previous one was closed, discarding {} buffered bytes",
                        self.line_number,
                        self.state.envelope.len()
                    );
                    self.extraction.notices.push(Notice::info(
                        NoticeKind::UnterminatedEnvelope,
                        format!(
                            "Envelope interrupted at line {} by the start of another envelope, it was discarded.",
                            self.line_number
                        ),
                    ));
                }

                trace!(
                    "line {}: envelope opens with prefix `{}`",
                    self.line_number, open.prefix
                );

                // Header and body sharing one physical line. An XML prolog is not header text.
                let before = &line[..open.start];
                let before_trimmed = before.trim();
                if self.state.phase == ScanPhase::CapturingHeader
                    && !before_trimmed.is_empty()
                    && !before_trimmed.starts_with('<')
                {
                    let before = if self.state.header.is_empty() {
                        trim_to_header_start(before)
                    } else {
                        before
                    };
                    self.state.append_header_line(before);
                }

                line = &line[open.start..];
                self.state.phase = ScanPhase::InEnvelope {
                    close_tag: format!("</{}{}", open.prefix, ENVELOPE_TAG_NAME),
                };
                self.state.envelope.clear();
            }
        }

        if self.state.phase == ScanPhase::CapturingHeader {
            if self.state.header.is_empty() {
                line = trim_to_header_start(line);
            }
            self.state.append_header_line(line);
        }

        let Some(close_tag) = self.state.close_tag().map(str::to_owned) else {
            return;
        };

        let Some(close_pos) = line.find(&close_tag) else {
            let trimmed = line.trim();
            if trimmed.chars().count() > MAX_SUSPECT_LINE_LEN {
                self.state.envelope.push_str(trimmed);
            } else if !trimmed.is_empty() {
                warn!(
                    "line {}: suspect line (probably a chunk marker): `{}`",
                    self.line_number, line
                );
                self.extraction.notices.push(Notice::info(
                    NoticeKind::SuspectChunkLine,
                    format!(
                        "Suspect line {} (probably chunked transfer break) was dropped: `{}`",
                        self.line_number, trimmed
                    ),
                ));
            }
            return;
        };

        let (closing, trailing) = match line[close_pos..].find('>') {
            Some(gt) => line.split_at(close_pos + gt + 1),
            None => (line, ""),
        };

        self.state.envelope.push_str(closing.trim());
        self.close_envelope();

        self.scan_trailing_text(trailing, &close_tag);
    }

    fn close_envelope(&mut self) {
        let xml = mem::take(&mut self.state.envelope);
        let header = mem::take(&mut self.state.header);
        self.state.phase = ScanPhase::Idle;

        let envelope = Envelope::new(xml, header);
        debug!(
            "line {}: closed envelope #{} ({}, body `{}`, {} bytes)",
            self.line_number,
            self.extraction.envelopes.len() + 1,
            envelope.message_type(),
            envelope.body_name(),
            envelope.xml().len()
        );
        self.extraction.envelopes.push(envelope);
    }

    /// Handles whatever follows a closing envelope tag on the same physical line.
    fn scan_trailing_text(&mut self, trailing: &str, close_tag: &str) {
        let mut rest = trailing;

        if trailing.contains(close_tag) {
            for packed in find_all(ENVELOPE_TAG_NAME, trailing, true) {
                debug!(
                    "line {}: recovered packed envelope ({} bytes)",
                    self.line_number,
                    packed.len()
                );
                self.extraction.envelopes.push(Envelope::new(packed, ""));
                rest = &trailing[offset_within(trailing, packed) + packed.len()..];
            }
        }

        if contains_header_start(rest) || find_envelope_open(rest).is_some() {
            self.scan(rest);
        }
    }

    pub fn finish(mut self) -> Extraction {
        if self.state.is_in_envelope() && !self.state.envelope.is_empty() {
            warn!(
                "input ended inside an envelope, discarding {} buffered bytes",
                self.state.envelope.len()
            );
            self.extraction.notices.push(Notice::info(
                NoticeKind::UnterminatedEnvelope,
                "Input ended before the last envelope was closed, it was discarded.",
            ));
        }

        info!(
            "extracted {} envelope(s) from {} line(s)",
            self.extraction.envelopes.len(),
            self.line_number
        );
        self.extraction
    }
}

/// Scans already decoded lines. Never fails: malformed input yields fewer envelopes and notices.
pub fn extract_lines<I, S>(lines: I) -> Extraction
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut extractor = EnvelopeExtractor::new();
    for line in lines {
        extractor.feed_line(line.as_ref());
    }
    extractor.finish()
}

/// Reads and scans a capture log line by line.
///
/// Lines that are not valid UTF-8 are decoded with `ansi_codec`.
pub fn extract_from_reader<R: BufRead>(
    mut reader: R,
    ansi_codec: EncodingRef,
) -> ExtractionResult<Extraction> {
    let mut extractor = EnvelopeExtractor::new();
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .map_err(|source| ExtractionError::Io {
                line_number: extractor.line_number + 1,
                source,
            })?;

        if read == 0 {
            break;
        }

        let line = decode_line(strip_line_terminator(&buffer), ansi_codec);
        extractor.feed_line(&line);
    }

    Ok(extractor.finish())
}

pub fn extract_from_path(
    path: impl AsRef<Path>,
    ansi_codec: EncodingRef,
) -> ExtractionResult<Extraction> {
    extract_from_reader(open_capture(path)?, ansi_codec)
}

pub(crate) fn open_capture(path: impl AsRef<Path>) -> ExtractionResult<BufReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ExtractionError::FailedToOpenFile {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(BufReader::new(file))
}

#[derive(Debug, PartialEq)]
struct EnvelopeOpen<'a> {
    /// Offset of the `<` starting the opening tag.
    start: usize,
    /// Literal namespace prefix including its `:`, empty when unprefixed.
    prefix: &'a str,
}

fn find_envelope_open(line: &str) -> Option<EnvelopeOpen<'_>> {
    let bytes = line.as_bytes();
    let mut search_from = 0;

    while let Some(relative) = line[search_from..].find(ENVELOPE_TAG_NAME) {
        let marker = search_from + relative;
        let marker_end = marker + ENVELOPE_TAG_NAME.len();
        search_from = marker_end;

        if marker == 0 {
            continue;
        }
        match line[marker_end..].chars().next() {
            None => {}
            Some(c) if c == '>' || c.is_whitespace() => {}
            _ => continue,
        }

        let start = match bytes[marker - 1] {
            b'<' => marker - 1,
            b':' => match line[..marker].rfind('<') {
                Some(lt) => lt,
                None => continue,
            },
            _ => continue,
        };

        let prefix = &line[start + 1..marker];
        if prefix.starts_with('/') || prefix.chars().any(|c| c.is_whitespace() || c == '>') {
            continue;
        }

        return Some(EnvelopeOpen { start, prefix });
    }

    None
}

fn contains_header_start(line: &str) -> bool {
    line.contains(REQUEST_LINE_MARKER) || line.contains(STATUS_LINE_MARKER)
}

/// Drops anything preceding the request or status line marker.
fn trim_to_header_start(line: &str) -> &str {
    match line.find(REQUEST_LINE_MARKER) {
        Some(pos) => &line[pos..],
        None => match line.find(STATUS_LINE_MARKER) {
            Some(pos) => &line[pos..],
            None => line,
        },
    }
}

fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn decode_line(bytes: &[u8], ansi_codec: EncodingRef) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(line) => Cow::Borrowed(line),
        Err(_) => {
            trace!("line is not valid UTF-8, decoding with {}", ansi_codec.name());
            match ansi_codec.decode(bytes, DecoderTrap::Replace) {
                Ok(line) => Cow::Owned(line),
                Err(_) => String::from_utf8_lossy(bytes),
            }
        }
    }
}

/// Offset of `inner` within `outer`; `inner` must be a subslice of `outer`.
fn offset_within(outer: &str, inner: &str) -> usize {
    inner.as_ptr() as usize - outer.as_ptr() as usize
}
