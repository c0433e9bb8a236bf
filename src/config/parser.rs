//! Line-protocol request parser.
//!
//! # Responsibilities
//! - Parse the `key = value` configuration stream a client sends on connect
//! - Track per-key occurrence counts for the exactly-once check
//! - Apply defaults, run validation, and resolve the final descriptor
//!
//! # Design Decisions
//! - Dotted namespaces are cosmetic: keys are matched as flat strings
//! - Optional keys assigned more than once take the last value; only
//!   mandatory keys are occurrence-checked
//! - The resolved-descriptor echo is a tracing event and can never fail
//!   or block the parse

use std::collections::HashMap;

use crate::config::schema::RequestConfig;
use crate::config::validation::{
    parse_confidences, require_exactly_once, ConfigError, MANDATORY_KEYS,
};

/// Parse a full request configuration from the text a client sent.
///
/// Blank lines and lines starting with `#` are skipped. Everything else
/// must be a `key = value` assignment with a recognized key. On success the
/// returned descriptor has defaults filled in, the confidence list parsed,
/// and the horizon radius copied into the input-side configuration.
pub fn parse_request(input: &str) -> Result<RequestConfig, ConfigError> {
    let mut config = RequestConfig::default();
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut confidence_raw = String::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedLine(line.to_string()))?;
        let key = key.trim();
        let value = value.trim();
        apply(&mut config, &mut confidence_raw, key, value)?;
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }

    require_exactly_once(&counts, &MANDATORY_KEYS)?;
    config.text.confidences = parse_confidences(&confidence_raw)?;

    // One source value feeds both the decoder and the input reader.
    config.text.horizon_radius = config.decoder.coverage.horizon_radius;

    tracing::info!(matched_file = %config.matched_path, "input.matched_file resolved");
    tracing::info!(text = %config.text, "request text configuration");
    tracing::info!(decoder = %config.decoder, "request decoder configuration");

    Ok(config)
}

/// Assign one `key = value` pair into the descriptor under construction.
fn apply(
    config: &mut RequestConfig,
    confidence_raw: &mut String,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    match key {
        "score.lm" => config.decoder.scorer.lm = parse_f64(key, value)?,
        "score.alignment" => config.decoder.scorer.alignment = parse_f64(key, value)?,
        "score.ngram" => config.decoder.scorer.ngram = parse_f64(key, value)?,
        "score.ngram_base" => config.decoder.scorer.ngram_base = parse_f64(key, value)?,
        "score.overlap" => config.decoder.scorer.overlap = parse_f64(key, value)?,
        "score.fuzz.ratio" => config.decoder.scorer.fuzz_ratio = parse_f64(key, value)?,
        "beam_size" => config.decoder.beam_size = parse_usize(key, value)?,
        "length_normalize" => config.decoder.length_normalize = parse_bool(key, value)?,
        "output.nbest" => config.decoder.nbest_size = parse_usize(key, value)?,
        "horizon.radius" => config.decoder.coverage.horizon_radius = parse_usize(key, value)?,
        "horizon.new" => config.decoder.coverage.use_new = parse_bool(key, value)?,
        "horizon.threshold" => config.decoder.coverage.stay_threshold = parse_f64(key, value)?,
        "output.oracle_prefix" => config.oracle_prefix = value.to_string(),
        "output.one_best" => config.one_best_path = value.to_string(),
        "input.matched_file" => config.matched_path = value.to_string(),
        "input.confidence" => *confidence_raw = value.to_string(),
        "align.pick_best" => config.text.pick_best = parse_bool(key, value)?,
        "align.transitive" => config.text.transitive = parse_bool(key, value)?,
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }
    Ok(())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse().map_err(|_| malformed(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| malformed(key, value))
}

/// Boolean literals accepted by the protocol: `1/0`, `true/false`,
/// `on/off`, `yes/no`, case-insensitive.
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(malformed(key, value)),
    }
}

fn malformed(key: &str, value: &str) -> ConfigError {
    ConfigError::MalformedValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
