//! Request descriptor schema.
//!
//! This module defines the per-connection configuration structure the
//! line-protocol parser fills in. Every optional field carries its default
//! here; the parser only overwrites what the client actually sent.

use std::fmt;

use rand::Rng;

/// Scoring weights for hypothesis ranking.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    /// Language model weight.
    pub lm: f64,

    /// Alignment confidence weight.
    pub alignment: f64,

    /// N-gram continuity weight.
    pub ngram: f64,

    /// Base for the n-gram continuity feature.
    pub ngram_base: f64,

    /// Engine agreement (overlap) weight.
    pub overlap: f64,

    /// Proportion of each weight to randomly perturb. Useful for seeding
    /// MERT; zero disables fuzzing.
    pub fuzz_ratio: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            lm: 0.0,
            alignment: 0.0,
            ngram: 0.0,
            ngram_base: 1.0 / 3.0,
            overlap: 0.0,
            fuzz_ratio: 0.0,
        }
    }
}

impl ScoreWeights {
    /// Return a copy with each weight perturbed by a uniform factor in
    /// `[1 - fuzz_ratio, 1 + fuzz_ratio]`. Applied once per request, before
    /// decoding starts.
    pub fn fuzzed(&self) -> Self {
        if self.fuzz_ratio <= 0.0 {
            return self.clone();
        }
        let mut rng = rand::thread_rng();
        let ratio = self.fuzz_ratio;
        let mut fuzz = |weight: f64| weight * rng.gen_range(1.0 - ratio..=1.0 + ratio);
        Self {
            lm: fuzz(self.lm),
            alignment: fuzz(self.alignment),
            ngram: fuzz(self.ngram),
            ngram_base: self.ngram_base,
            overlap: fuzz(self.overlap),
            fuzz_ratio: ratio,
        }
    }
}

/// Horizon (coverage) pruning parameters, passed through to the decoder.
#[derive(Debug, Clone)]
pub struct CoverageConfig {
    /// Horizon radius. The same value also feeds the input-side
    /// configuration; the parser maintains that duplication.
    pub horizon_radius: usize,

    /// Use the new horizon implementation?
    pub use_new: bool,

    /// Relative score threshold for the new horizon.
    pub stay_threshold: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            horizon_radius: 5,
            use_new: false,
            stay_threshold: 0.8,
        }
    }
}

/// Search parameters consumed by the decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Scoring weights.
    pub scorer: ScoreWeights,

    /// Size of the decoder's internal search beam.
    pub beam_size: usize,

    /// Length normalize before comparing sentence-end scores?
    pub length_normalize: bool,

    /// Number of n-best hypotheses to keep per sentence.
    pub nbest_size: usize,

    /// Horizon pruning parameters.
    pub coverage: CoverageConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            scorer: ScoreWeights::default(),
            beam_size: 500,
            length_normalize: true,
            nbest_size: 1,
            coverage: CoverageConfig::default(),
        }
    }
}

impl fmt::Display for DecoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decoder: beam_size={} length_normalize={} nbest={} horizon_radius={} \
             horizon_new={} horizon_threshold={} weights: lm={} alignment={} ngram={} \
             ngram_base={} overlap={} fuzz={}",
            self.beam_size,
            self.length_normalize,
            self.nbest_size,
            self.coverage.horizon_radius,
            self.coverage.use_new,
            self.coverage.stay_threshold,
            self.scorer.lm,
            self.scorer.alignment,
            self.scorer.ngram,
            self.scorer.ngram_base,
            self.scorer.overlap,
            self.scorer.fuzz_ratio,
        )
    }
}

/// Text-side options consumed by the matched-input reader.
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    /// Pick the aligned word with most confidence?
    pub pick_best: bool,

    /// Make alignments transitive?
    pub transitive: bool,

    /// Per-engine confidence values, in engine order. The count also fixes
    /// how many lines make up one matched-input block.
    pub confidences: Vec<f64>,

    /// Horizon radius, copied from the decoder-side value by the parser.
    pub horizon_radius: usize,
}

impl fmt::Display for InputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input: pick_best={} transitive={} horizon_radius={} confidences={:?}",
            self.pick_best, self.transitive, self.horizon_radius, self.confidences,
        )
    }
}

/// The validated per-connection request descriptor.
///
/// Created fresh for every connection, never shared across connections,
/// and dropped when the connection closes.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Search and scoring parameters.
    pub decoder: DecoderConfig,

    /// Matched-input reading options.
    pub text: InputConfig,

    /// Prefix for oracle output files, or empty for no oracle output.
    pub oracle_prefix: String,

    /// One-best output file path.
    pub one_best_path: String,

    /// Matched-input file path.
    pub matched_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol() {
        let config = RequestConfig::default();
        assert_eq!(config.decoder.beam_size, 500);
        assert!(config.decoder.length_normalize);
        assert_eq!(config.decoder.nbest_size, 1);
        assert_eq!(config.decoder.coverage.horizon_radius, 5);
        assert!(!config.decoder.coverage.use_new);
        assert!((config.decoder.coverage.stay_threshold - 0.8).abs() < 1e-12);
        assert!((config.decoder.scorer.ngram_base - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(config.decoder.scorer.fuzz_ratio, 0.0);
        assert!(!config.text.pick_best);
        assert!(!config.text.transitive);
        assert!(config.oracle_prefix.is_empty());
    }

    #[test]
    fn zero_fuzz_leaves_weights_untouched() {
        let weights = ScoreWeights {
            lm: 1.0,
            alignment: 2.0,
            ngram: 3.0,
            overlap: 4.0,
            ..ScoreWeights::default()
        };
        let fuzzed = weights.fuzzed();
        assert_eq!(fuzzed.lm, 1.0);
        assert_eq!(fuzzed.alignment, 2.0);
        assert_eq!(fuzzed.ngram, 3.0);
        assert_eq!(fuzzed.overlap, 4.0);
    }

    #[test]
    fn fuzz_stays_within_ratio() {
        let weights = ScoreWeights {
            lm: 1.0,
            alignment: -2.0,
            ngram: 0.5,
            overlap: 4.0,
            fuzz_ratio: 0.1,
            ..ScoreWeights::default()
        };
        for _ in 0..50 {
            let fuzzed = weights.fuzzed();
            assert!(fuzzed.lm >= 0.9 && fuzzed.lm <= 1.1);
            assert!(fuzzed.alignment <= -1.8 && fuzzed.alignment >= -2.2);
            assert!(fuzzed.overlap >= 3.6 && fuzzed.overlap <= 4.4);
        }
    }
}
