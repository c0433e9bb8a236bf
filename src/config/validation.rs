//! Request configuration validation.
//!
//! # Responsibilities
//! - Enforce the exactly-once rule for mandatory keys
//! - Parse the confidence-value list with full-consumption semantics
//! - Define the recoverable per-request error taxonomy
//!
//! # Design Decisions
//! - Validation is pure: it inspects the occurrence counts recorded by the
//!   parser and never mutates the descriptor under construction
//! - Errors are a closed enum so tests can match on exact failure kinds
//! - Stops at the first violation, checked in declaration order

use std::collections::HashMap;

use thiserror::Error;

/// Keys that must appear exactly once in every request configuration.
pub const MANDATORY_KEYS: [&str; 7] = [
    "score.lm",
    "score.alignment",
    "score.ngram",
    "score.overlap",
    "output.one_best",
    "input.matched_file",
    "input.confidence",
];

/// Errors that reject a request before any decoding work happens.
///
/// These are recoverable at the service level: the message is written back
/// to the client and the accept loop carries on.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mandatory key was absent or assigned more than once.
    #[error("expected {key} exactly {expected} time(s), got it {actual}")]
    MissingOrDuplicateField {
        key: String,
        expected: u32,
        actual: u32,
    },

    /// A recognized key carried a value that failed to parse.
    #[error("malformed value for {key}: {value:?}")]
    MalformedValue { key: String, value: String },

    /// The confidence list had non-numeric residue. Carries the raw string.
    #[error("bad confidence list: {0:?}")]
    MalformedConfidenceList(String),

    /// A line was not of the form `key = value`.
    #[error("malformed configuration line: {0:?}")]
    MalformedLine(String),

    /// A key the protocol does not recognize.
    #[error("unknown configuration key: {0:?}")]
    UnknownKey(String),

    /// The connection failed while the configuration was being read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Require that every key in `keys` was assigned exactly once.
///
/// `counts` is the side-channel occurrence map maintained by the parser.
/// Fails on the first key whose count differs from one.
pub fn require_exactly_once(
    counts: &HashMap<String, u32>,
    keys: &[&str],
) -> Result<(), ConfigError> {
    for key in keys {
        let actual = counts.get(*key).copied().unwrap_or(0);
        if actual != 1 {
            return Err(ConfigError::MissingOrDuplicateField {
                key: (*key).to_string(),
                expected: 1,
                actual,
            });
        }
    }
    Ok(())
}

/// Parse a whitespace-separated list of real numbers.
///
/// The whole string must be consumed: any token that fails to parse rejects
/// the list and the error carries the original string. An empty string is
/// zero tokens, fully consumed, and therefore valid.
pub fn parse_confidences(raw: &str) -> Result<Vec<f64>, ConfigError> {
    let mut values = Vec::new();
    for token in raw.split_whitespace() {
        match token.parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => return Err(ConfigError::MalformedConfidenceList(raw.to_string())),
        }
    }
    Ok(values)
}
