//! Default beam decoder.
//!
//! Walks the sentence's candidate columns left to right, extending a beam
//! of partial hypotheses and pruning to the configured beam size at each
//! step. Scoring combines the language model, alignment confidence, an
//! engine-continuity feature, and engine agreement, under the weights the
//! pipeline hands in (already fuzzed once per request when requested).

use crate::config::{DecoderConfig, ScoreWeights};
use crate::input::{Candidate, MatchedSentence};
use crate::lm::{LanguageModel, WordId};

use super::{Decoder, Hypothesis};

/// Confidence floor so a zero-confidence candidate stays finite.
const MIN_CONFIDENCE: f64 = 1e-6;

#[derive(Debug, Default)]
pub struct BeamDecoder;

struct Partial {
    ids: Vec<WordId>,
    words: Vec<String>,
    engine: Option<usize>,
    score: f64,
}

impl Decoder for BeamDecoder {
    fn run(
        &self,
        config: &DecoderConfig,
        model: &dyn LanguageModel,
        sentence: &MatchedSentence,
    ) -> Vec<Hypothesis> {
        let weights = &config.scorer;

        let mut beam = vec![Partial {
            ids: Vec::new(),
            words: Vec::new(),
            engine: None,
            score: 0.0,
        }];

        for column in &sentence.columns {
            if column.is_empty() {
                continue;
            }
            let mut extended: Vec<Partial> = Vec::with_capacity(beam.len() * column.len());
            for hypothesis in &beam {
                for candidate in column {
                    extended.push(extend(hypothesis, candidate, column, model, weights));
                }
            }
            extended.sort_by(|a, b| b.score.total_cmp(&a.score));
            if config.coverage.use_new {
                prune_relative(&mut extended, config.coverage.stay_threshold);
            }
            extended.truncate(config.beam_size);
            beam = extended;
        }

        let normalize = config.length_normalize;
        let mut finished: Vec<Hypothesis> = beam
            .into_iter()
            .map(|hypothesis| {
                let score = if normalize && !hypothesis.words.is_empty() {
                    hypothesis.score / hypothesis.words.len() as f64
                } else {
                    hypothesis.score
                };
                Hypothesis {
                    words: hypothesis.words,
                    score,
                }
            })
            .collect();
        finished.sort_by(|a, b| b.score.total_cmp(&a.score));
        finished.truncate(config.nbest_size);
        finished
    }
}

fn extend(
    hypothesis: &Partial,
    candidate: &Candidate,
    column: &[Candidate],
    model: &dyn LanguageModel,
    weights: &ScoreWeights,
) -> Partial {
    let mut score = hypothesis.score;
    score += weights.lm * model.score(&hypothesis.ids, candidate.id);
    score += weights.alignment * candidate.confidence.max(MIN_CONFIDENCE).ln();
    // Switching engines breaks the n-gram run the continuity feature rewards.
    if let Some(previous) = hypothesis.engine {
        if previous != candidate.engine {
            score += weights.ngram * weights.ngram_base.max(MIN_CONFIDENCE).ln();
        }
    }
    score += weights.overlap * agreement(column, candidate);

    let mut ids = hypothesis.ids.clone();
    ids.push(candidate.id);
    let mut words = hypothesis.words.clone();
    words.push(candidate.word.clone());
    Partial {
        ids,
        words,
        engine: Some(candidate.engine),
        score,
    }
}

/// Fraction of the column's candidates sharing this surface form.
fn agreement(column: &[Candidate], candidate: &Candidate) -> f64 {
    let matching = column.iter().filter(|c| c.word == candidate.word).count();
    matching as f64 / column.len() as f64
}

/// New-horizon pruning: drop hypotheses whose score falls outside the
/// stay-threshold fraction of the beam's score span. `hypotheses` must be
/// sorted best first.
fn prune_relative(hypotheses: &mut Vec<Partial>, stay_threshold: f64) {
    let Some(best) = hypotheses.first().map(|h| h.score) else {
        return;
    };
    let worst = hypotheses.last().map(|h| h.score).unwrap_or(best);
    let cutoff = best - (1.0 - stay_threshold) * (best - worst);
    hypotheses.retain(|h| h.score >= cutoff);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::input::MatchedReader;
    use crate::lm::{TableLm, Vocabulary};
    use std::io::{Cursor, Write};

    fn table_model(contents: &str, order: usize) -> TableLm {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        TableLm::load(file.path(), order).unwrap()
    }

    fn read_sentence(data: &str, vocab: &Vocabulary, confidences: Vec<f64>) -> MatchedSentence {
        let config = InputConfig {
            pick_best: false,
            transitive: false,
            confidences,
            horizon_radius: 5,
        };
        MatchedReader::new(Cursor::new(data.to_string()), config, vocab)
            .next_sentence()
            .unwrap()
            .unwrap()
    }

    fn config(nbest: usize) -> DecoderConfig {
        let mut config = DecoderConfig::default();
        config.scorer.lm = 1.0;
        config.scorer.alignment = 1.0;
        config.nbest_size = nbest;
        config
    }

    #[test]
    fn prefers_high_probability_path() {
        let model = table_model("-0.1 the\n-0.1 cat\n-0.05 the cat\n-8.0 dog\n", 2);
        let sentence = read_sentence("the cat\nthe dog\n", model.vocabulary(), vec![0.5, 0.5]);
        let nbest = BeamDecoder.run(&config(1), &model, &sentence);
        assert_eq!(nbest.len(), 1);
        assert_eq!(nbest[0].words, vec!["the", "cat"]);
    }

    #[test]
    fn nbest_is_ranked_and_bounded() {
        let model = table_model("-0.1 a\n-0.2 b\n-0.3 c\n", 1);
        let sentence = read_sentence("a\nb\nc\n", model.vocabulary(), vec![0.5, 0.5, 0.5]);
        let nbest = BeamDecoder.run(&config(2), &model, &sentence);
        assert_eq!(nbest.len(), 2);
        assert!(nbest[0].score >= nbest[1].score);
        assert_eq!(nbest[0].words, vec!["a"]);
    }

    #[test]
    fn confidence_breaks_lm_ties() {
        let model = table_model("-0.1 a\n-0.1 b\n", 1);
        let sentence = read_sentence("a\nb\n", model.vocabulary(), vec![0.2, 0.9]);
        let nbest = BeamDecoder.run(&config(1), &model, &sentence);
        assert_eq!(nbest[0].words, vec!["b"]);
    }

    #[test]
    fn beam_of_one_is_greedy() {
        let model = table_model("-0.1 a\n-0.2 b\n", 1);
        let sentence = read_sentence("a a\nb b\n", model.vocabulary(), vec![0.5, 0.5]);
        let mut cfg = config(5);
        cfg.beam_size = 1;
        let nbest = BeamDecoder.run(&cfg, &model, &sentence);
        assert_eq!(nbest.len(), 1);
    }

    #[test]
    fn empty_sentence_yields_empty_hypothesis() {
        let model = table_model("-0.1 a\n", 1);
        let sentence = MatchedSentence {
            index: 0,
            columns: Vec::new(),
        };
        let nbest = BeamDecoder.run(&config(1), &model, &sentence);
        assert_eq!(nbest.len(), 1);
        assert!(nbest[0].words.is_empty());
    }

    #[test]
    fn relative_prune_keeps_best() {
        let mut hypotheses = vec![
            Partial {
                ids: vec![],
                words: vec![],
                engine: None,
                score: -1.0,
            },
            Partial {
                ids: vec![],
                words: vec![],
                engine: None,
                score: -2.0,
            },
            Partial {
                ids: vec![],
                words: vec![],
                engine: None,
                score: -11.0,
            },
        ];
        prune_relative(&mut hypotheses, 0.8);
        assert_eq!(hypotheses.len(), 2);
        assert_eq!(hypotheses[0].score, -1.0);
    }
}
