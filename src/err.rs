use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SoapLogError>;

pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;
pub type RewriteResult<T> = std::result::Result<T, RewriteError>;

/// Errors raised while reading a capture log.
///
/// Anything that can be read is scanned tolerantly, so the only failures here are I/O failures.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to open file {}: {}", path.display(), source)]
    FailedToOpenFile { path: PathBuf, source: io::Error },

    #[error("An I/O error has occurred while reading line {line_number}: {source}")]
    Io { line_number: usize, source: io::Error },
}

/// Errors raised by the streaming XML rewriter.
#[derive(Debug, Error)]
pub enum RewriteError {
    // Since `quick-xml` checks tag nesting for us, structural errors are reported
    // through this variant as well.
    #[error("Malformed XML at offset {position}: {message}")]
    MalformedXml { position: u64, message: String },
}

impl RewriteError {
    pub(crate) fn malformed(position: u64, message: impl Into<String>) -> Self {
        RewriteError::MalformedXml {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SoapLogError {
    #[error("Failed to extract SOAP envelopes, caused by:\n\t{0}")]
    Extraction(#[from] ExtractionError),

    #[error("Failed to rewrite SOAP envelope, caused by:\n\t{0}")]
    Rewrite(#[from] RewriteError),
}
