#![allow(dead_code)]
use std::path::PathBuf;

use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

pub fn samples_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("samples")
        .canonicalize()
        .unwrap()
}

/// Login and save exchanges, CRLF line endings, one chunked response.
pub fn customer_session_sample() -> PathBuf {
    samples_dir().join("customer_session.log")
}

/// Two envelopes and a status line packed on one physical line.
pub fn packed_envelopes_sample() -> PathBuf {
    samples_dir().join("packed_envelopes.log")
}

/// windows-1252 encoded, ends inside an unterminated fault envelope.
pub fn ansi_encoded_sample() -> PathBuf {
    samples_dir().join("ansi_encoded.log")
}
