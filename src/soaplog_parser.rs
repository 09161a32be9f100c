use crate::envelope::{Envelope, MessageType};
use crate::err::Result;
use crate::extractor::{extract_from_reader, open_capture};
use crate::import_file::ImportFileBuilder;
use crate::notice::{Notice, NoticeKind};
use crate::sequencer::{SequenceSummary, sequence_envelopes};
use crate::xml_rewriter::{ImportMode, RewriteOptions, render};

use encoding::EncodingRef;
use log::{debug, info, warn};
use serde::Serialize;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const HEADER_COMMENT_DASHES: &str = "--";
const HEADER_COMMENT_DASHES_REPLACEMENT: &str = "&#8211;&#8211;";

#[derive(Clone)]
pub struct ParserSettings {
    reformat_xml: bool,
    strip_namespace_prefixes: bool,
    convert_extended_fields_to_xml: bool,
    output_soap_headers: bool,
    import_mode: ImportMode,
    indent: String,
    line_terminator: String,
    ansi_codec: EncodingRef,
    import_application: String,
}

impl fmt::Debug for ParserSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserSettings")
            .field("reformat_xml", &self.reformat_xml)
            .field("strip_namespace_prefixes", &self.strip_namespace_prefixes)
            .field(
                "convert_extended_fields_to_xml",
                &self.convert_extended_fields_to_xml,
            )
            .field("output_soap_headers", &self.output_soap_headers)
            .field("import_mode", &self.import_mode)
            .field("indent", &self.indent)
            .field("line_terminator", &self.line_terminator)
            .field("ansi_codec", &self.ansi_codec.name())
            .field("import_application", &self.import_application)
            .finish()
    }
}

impl PartialEq for ParserSettings {
    fn eq(&self, other: &ParserSettings) -> bool {
        self.reformat_xml == other.reformat_xml
            && self.strip_namespace_prefixes == other.strip_namespace_prefixes
            && self.convert_extended_fields_to_xml == other.convert_extended_fields_to_xml
            && self.output_soap_headers == other.output_soap_headers
            && self.import_mode == other.import_mode
            && self.indent == other.indent
            && self.line_terminator == other.line_terminator
            && self.ansi_codec.name() == other.ansi_codec.name()
            && self.import_application == other.import_application
    }
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            reformat_xml: true,
            strip_namespace_prefixes: true,
            convert_extended_fields_to_xml: false,
            output_soap_headers: false,
            import_mode: ImportMode::None,
            indent: "  ".to_owned(),
            line_terminator: "\r\n".to_owned(),
            ansi_codec: encoding::all::WINDOWS_1252,
            import_application: "UNKNOWN".to_owned(),
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    pub fn reformat_xml(mut self, reformat_xml: bool) -> Self {
        self.reformat_xml = reformat_xml;
        self
    }

    pub fn strip_namespace_prefixes(mut self, strip: bool) -> Self {
        self.strip_namespace_prefixes = strip;
        self
    }

    pub fn convert_extended_fields_to_xml(mut self, convert: bool) -> Self {
        self.convert_extended_fields_to_xml = convert;
        self
    }

    pub fn output_soap_headers(mut self, output_soap_headers: bool) -> Self {
        self.output_soap_headers = output_soap_headers;
        self
    }

    pub fn import_mode(mut self, import_mode: ImportMode) -> Self {
        self.import_mode = import_mode;
        self
    }

    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn line_terminator(mut self, line_terminator: impl Into<String>) -> Self {
        self.line_terminator = line_terminator.into();
        self
    }

    pub fn ansi_codec(mut self, ansi_codec: EncodingRef) -> Self {
        self.ansi_codec = ansi_codec;
        self
    }

    pub fn import_application(mut self, application: impl Into<String>) -> Self {
        self.import_application = application.into();
        self
    }

    pub fn should_reformat_xml(&self) -> bool {
        self.reformat_xml
    }

    pub fn should_output_soap_headers(&self) -> bool {
        self.output_soap_headers
    }

    pub fn get_import_mode(&self) -> ImportMode {
        self.import_mode
    }

    pub fn get_ansi_codec(&self) -> EncodingRef {
        self.ansi_codec
    }

    pub fn get_line_terminator(&self) -> &str {
        &self.line_terminator
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            strip_namespace_prefixes: self.strip_namespace_prefixes,
            convert_extended_fields_to_xml: self.convert_extended_fields_to_xml,
            import_mode: self.import_mode,
            indent_unit: self.indent.clone(),
            line_terminator: self.line_terminator.clone(),
        }
    }
}

/// Entry point: reads a capture log and splits it into sequenced SOAP envelopes.
pub struct SoapLogParser<R: BufRead> {
    reader: R,
    config: ParserSettings,
}

impl SoapLogParser<BufReader<File>> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(SoapLogParser::from_reader(open_capture(path)?))
    }
}

impl<R: BufRead> SoapLogParser<R> {
    pub fn from_reader(reader: R) -> Self {
        SoapLogParser {
            reader,
            config: ParserSettings::default(),
        }
    }

    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.config = configuration;
        self
    }

    /// Extracts every envelope and orders requests and responses into pairs.
    pub fn explode(self) -> Result<ExplodedLog> {
        let extraction = extract_from_reader(self.reader, self.config.get_ansi_codec())?;

        let mut envelopes = extraction.envelopes;
        let mut notices = extraction.notices;
        let summary = sequence_envelopes(&mut envelopes, &mut notices);

        Ok(ExplodedLog {
            envelopes,
            notices,
            summary,
        })
    }
}

/// Sequenced envelopes of one capture log, along with everything worth telling the user.
#[derive(Debug)]
pub struct ExplodedLog {
    pub envelopes: Vec<Envelope>,
    pub notices: Vec<Notice>,
    pub summary: SequenceSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEnvelope {
    /// 1-based position in the sequenced output.
    pub sequence_number: usize,
    pub message_type: MessageType,
    pub body_name: String,
    pub order_index: Option<u32>,
    pub header: String,
    /// Whether `document` went through the rewriter (false when disabled or when it failed).
    pub reformatted: bool,
    pub document: String,
}

#[derive(Debug)]
pub struct RenderedLog {
    pub envelopes: Vec<RenderedEnvelope>,
    pub notices: Vec<Notice>,
    pub summary: SequenceSummary,
    /// AbaConnect import document, only when an import mode is set and requests were found.
    pub import_document: Option<String>,
}

impl ExplodedLog {
    /// Renders every envelope. A document the rewriter cannot parse is kept as extracted and
    /// reported as a notice, the remaining envelopes are rendered normally.
    pub fn render(self, settings: &ParserSettings) -> RenderedLog {
        let options = settings.rewrite_options();
        let mut notices = self.notices;
        let mut import_file =
            ImportFileBuilder::new(settings.indent.as_str(), settings.line_terminator.as_str())
                .application(settings.import_application.as_str());

        let mut rendered = Vec::with_capacity(self.envelopes.len());

        for (i, envelope) in self.envelopes.into_iter().enumerate() {
            let sequence_number = i + 1;

            let (mut document, reformatted) = if settings.should_reformat_xml() {
                match render(envelope.xml(), &options) {
                    Ok(document) => (document, true),
                    Err(err) => {
                        warn!(
                            "envelope {} (`{}`) could not be reformatted: {}",
                            sequence_number,
                            envelope.body_name(),
                            err
                        );
                        notices.push(Notice::warning(
                            NoticeKind::MalformedXml,
                            format!(
                                "Envelope {} ({}) may have format syntax problems: {}",
                                sequence_number,
                                envelope.body_name(),
                                err
                            ),
                        ));
                        (envelope.xml().to_owned(), false)
                    }
                }
            } else {
                (envelope.xml().to_owned(), false)
            };

            if settings.get_import_mode().is_active() {
                import_file.add_envelope(&document);
            }

            if settings.should_output_soap_headers() && !envelope.header().is_empty() {
                document.push_str(&header_comment(
                    envelope.header(),
                    settings.get_line_terminator(),
                ));
            }

            debug!(
                "rendered envelope {} ({} `{}`)",
                sequence_number,
                envelope.message_type(),
                envelope.body_name()
            );

            rendered.push(RenderedEnvelope {
                sequence_number,
                message_type: envelope.message_type(),
                body_name: envelope.body_name().to_owned(),
                order_index: envelope.order_index(),
                header: envelope.header().to_owned(),
                reformatted,
                document,
            });
        }

        info!(
            "rendered {} envelope(s), {} import transaction(s)",
            rendered.len(),
            import_file.transaction_count()
        );

        RenderedLog {
            envelopes: rendered,
            notices,
            summary: self.summary,
            import_document: import_file.document(),
        }
    }
}

/// The captured HTTP header as an XML comment, `--` replaced so the comment stays well-formed.
pub fn header_comment(header: &str, line_terminator: &str) -> String {
    let lt = line_terminator;
    format!(
        "{lt}<!--  {lt}{}{lt}  -->{lt}",
        header.replace(HEADER_COMMENT_DASHES, HEADER_COMMENT_DASHES_REPLACEMENT)
    )
}
