use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
    /// A very short line inside an envelope, most likely a chunked transfer-encoding size marker.
    SuspectChunkLine,
    /// An envelope was opened but never closed, its partial content was dropped.
    UnterminatedEnvelope,
    /// The envelope's header is neither a request line nor a status line.
    UnclassifiedMessage,
    /// Request and response counts differ, so request/response pairs may be misaligned.
    InconsistentPairing,
    /// The rewriter could not parse an envelope; it was kept unformatted.
    MalformedXml,
}

/// A non-fatal condition met while exploding a capture log.
///
/// Notices are collected rather than raised, one bad record never stops the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(kind: NoticeKind, message: impl Into<String>) -> Self {
        Notice {
            kind,
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(kind: NoticeKind, message: impl Into<String>) -> Self {
        Notice {
            kind,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => write!(f, "INFO : {}", self.message),
            Severity::Warning => write!(f, "WARNING : {}", self.message),
        }
    }
}
