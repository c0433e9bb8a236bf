//! Decoding subsystem.
//!
//! The pipeline treats the decoder as opaque: anything implementing
//! [`Decoder`] can be plugged in at construction, which is also the seam
//! tests use to inject fakes.

pub mod beam;
pub mod pipeline;

pub use beam::BeamDecoder;
pub use pipeline::{run_request, PipelineError, PipelineStats};

use crate::config::DecoderConfig;
use crate::input::MatchedSentence;
use crate::lm::LanguageModel;

/// A completed decoding hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    pub words: Vec<String>,
    pub score: f64,
}

/// The external decode operation: one sentence in, a ranked n-best list
/// out, best first, bounded by the configured n-best size.
pub trait Decoder: Send + Sync {
    fn run(
        &self,
        config: &DecoderConfig,
        model: &dyn LanguageModel,
        sentence: &MatchedSentence,
    ) -> Vec<Hypothesis>;
}
