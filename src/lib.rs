#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use envelope::{Envelope, MessageType, extract_body_name};
pub use extractor::{
    EnvelopeExtractor, Extraction, ScanState, extract_from_path, extract_from_reader,
    extract_lines,
};
pub use import_file::ImportFileBuilder;
pub use notice::{Notice, NoticeKind, Severity};
pub use sequencer::{SequenceSummary, sequence_envelopes};
pub use soaplog_parser::{
    ExplodedLog, ParserSettings, RenderedEnvelope, RenderedLog, SoapLogParser, header_comment,
};
pub use tag_scanner::{TagValues, find_all};
pub use xml_rewriter::{
    ImportMode, RewriteOptions, SoapXmlRewriter, XmlAttribute, XmlElement, XmlEventSink, render,
    stream_xml_events,
};

pub mod err;

mod envelope;
mod extractor;
mod import_file;
mod notice;
mod sequencer;
mod soaplog_parser;
mod tag_scanner;
mod xml_rewriter;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
