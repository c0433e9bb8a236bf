//! Matched-input ingestion.
//!
//! # Responsibilities
//! - Pull sentence blocks from the matcher's output file
//! - Build per-position candidate columns across engine outputs
//! - Apply the request's alignment options (pick-best, transitive)
//!
//! One block is one line per engine (the confidence count fixes how many),
//! blocks separated by a blank line. Exhaustion at a block boundary is
//! clean end-of-input; a truncated block is a runtime fault for the
//! connection that requested it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::config::InputConfig;
use crate::lm::{Vocabulary, WordId};

/// Faults raised while reading matched input.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open matched input {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("matched input block {index} has {got} engine line(s), expected {expected}")]
    TruncatedBlock {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("failed to read matched input: {0}")]
    Io(#[from] std::io::Error),
}

/// One translation candidate at one sentence position.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub word: String,
    pub id: WordId,
    pub confidence: f64,
    pub engine: usize,
}

/// One input unit: per-position candidate columns for one sentence.
#[derive(Debug, Clone)]
pub struct MatchedSentence {
    /// Zero-based position in the matched file; also names oracle output.
    pub index: usize,
    pub columns: Vec<Vec<Candidate>>,
}

/// Lazy reader over the matched-input file for one request.
pub struct MatchedReader<'a, R> {
    reader: R,
    config: InputConfig,
    vocab: &'a Vocabulary,
    next_index: usize,
}

impl<'a> MatchedReader<'a, BufReader<File>> {
    pub fn open(
        path: &Path,
        config: InputConfig,
        vocab: &'a Vocabulary,
    ) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(|source| ReadError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), config, vocab))
    }
}

impl<'a, R: BufRead> MatchedReader<'a, R> {
    pub fn new(reader: R, config: InputConfig, vocab: &'a Vocabulary) -> Self {
        Self {
            reader,
            config,
            vocab,
            next_index: 0,
        }
    }

    /// Next sentence, or `None` once the file is exhausted.
    pub fn next_sentence(&mut self) -> Result<Option<MatchedSentence>, ReadError> {
        let engines = self.config.confidences.len();
        let mut lines: Vec<String> = Vec::new();
        let mut buffer = String::new();
        loop {
            buffer.clear();
            if self.reader.read_line(&mut buffer)? == 0 {
                break;
            }
            let line = buffer.trim();
            if line.is_empty() {
                if lines.is_empty() {
                    continue;
                }
                break;
            }
            lines.push(line.to_string());
        }

        if lines.is_empty() {
            return Ok(None);
        }
        if lines.len() != engines {
            return Err(ReadError::TruncatedBlock {
                index: self.next_index,
                expected: engines,
                got: lines.len(),
            });
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(MatchedSentence {
            index,
            columns: self.build_columns(&lines),
        }))
    }

    fn build_columns(&self, lines: &[String]) -> Vec<Vec<Candidate>> {
        let tokenized: Vec<Vec<&str>> = lines
            .iter()
            .map(|line| line.split_whitespace().collect())
            .collect();
        let longest = tokenized.iter().map(Vec::len).max().unwrap_or(0);
        let shortest = tokenized.iter().map(Vec::len).min().unwrap_or(0);
        // The horizon radius caps how far past the shortest engine output
        // the ragged tails may extend.
        let limit = longest.min(shortest + self.config.horizon_radius);

        let mut columns = Vec::with_capacity(limit);
        for position in 0..limit {
            let mut column: Vec<Candidate> = Vec::new();
            for (engine, tokens) in tokenized.iter().enumerate() {
                let Some(&word) = tokens.get(position) else {
                    continue;
                };
                column.push(Candidate {
                    word: word.to_string(),
                    id: self.vocab.lookup(word),
                    confidence: self.config.confidences[engine],
                    engine,
                });
            }
            if self.config.transitive {
                column = merge_transitive(column);
            }
            if self.config.pick_best {
                column = pick_best(column);
            }
            columns.push(column);
        }
        columns
    }
}

/// Merge candidates with the same surface form, summing their confidence.
fn merge_transitive(column: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::new();
    for candidate in column {
        match merged.iter_mut().find(|c| c.word == candidate.word) {
            Some(existing) => existing.confidence += candidate.confidence,
            None => merged.push(candidate),
        }
    }
    merged
}

/// Keep only the candidate with the highest confidence.
fn pick_best(column: Vec<Candidate>) -> Vec<Candidate> {
    column
        .into_iter()
        .reduce(|best, next| {
            if next.confidence > best.confidence {
                next
            } else {
                best
            }
        })
        .into_iter()
        .collect()
}
