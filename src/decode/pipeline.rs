//! Decode pipeline adapter.
//!
//! Bridges a validated request descriptor plus the shared model to the
//! input reader, the decoder, and the output writers. Per input unit the
//! one-best write always happens and the oracle write (when enabled)
//! follows it. The adapter holds no retry logic: collaborator failures
//! propagate unchanged to the connection fault boundary.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use crate::config::RequestConfig;
use crate::input::{MatchedReader, ReadError};
use crate::lm::LanguageModel;
use crate::output::{OracleWriter, TopWriter};

use super::Decoder;

/// Faults escaping the pipeline. None of these are reported to the
/// client; the connection is abandoned and the service continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] ReadError),

    #[error("failed to open one-best output {path}: {source}")]
    OpenOutput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write one-best output: {0}")]
    OneBest(std::io::Error),

    #[error("failed to write oracle output: {0}")]
    Oracle(std::io::Error),
}

/// What a finished pipeline run did, for the completion log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineStats {
    pub sentences: usize,
}

/// Decode every sentence in the request's matched input.
///
/// Stops cleanly when the reader reports exhaustion. Partial output may
/// remain on disk if a collaborator fails mid-run; the protocol makes no
/// atomicity promise for runtime faults.
pub fn run_request(
    model: &dyn LanguageModel,
    decoder: &dyn Decoder,
    config: &RequestConfig,
) -> Result<PipelineStats, PipelineError> {
    let mut reader = MatchedReader::open(
        Path::new(&config.matched_path),
        config.text.clone(),
        model.vocabulary(),
    )?;

    let one_best = File::create(&config.one_best_path).map_err(|source| {
        PipelineError::OpenOutput {
            path: config.one_best_path.clone(),
            source,
        }
    })?;
    let mut top = TopWriter::new(BufWriter::new(one_best), true);
    let oracle = (!config.oracle_prefix.is_empty())
        .then(|| OracleWriter::new(config.oracle_prefix.clone()));

    // Weights are perturbed once per request; every sentence in the run
    // decodes under the same fuzzed weights.
    let mut decoder_config = config.decoder.clone();
    decoder_config.scorer = decoder_config.scorer.fuzzed();

    let mut stats = PipelineStats::default();
    while let Some(sentence) = reader.next_sentence()? {
        let nbest = decoder.run(&decoder_config, model, &sentence);
        top.write(&nbest, &sentence).map_err(PipelineError::OneBest)?;
        if let Some(oracle) = &oracle {
            oracle.write(&nbest, &sentence).map_err(PipelineError::Oracle)?;
        }
        stats.sentences += 1;
    }

    Ok(stats)
}
