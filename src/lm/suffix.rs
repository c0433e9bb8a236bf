//! Suffix-array language model (`lm.type = salm`).
//!
//! Built from a tokenized training corpus. Scoring finds the longest
//! suffix of the context plus candidate word (up to the model order) that
//! occurs in the corpus and returns its smoothed relative frequency.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use super::{LanguageModel, LmError, Vocabulary, WordId};

#[derive(Debug)]
pub struct SuffixArrayLm {
    vocab: Vocabulary,
    order: usize,
    corpus: Vec<WordId>,
    /// Corpus positions sorted by the suffix starting there.
    suffixes: Vec<usize>,
}

impl SuffixArrayLm {
    pub fn load(path: &Path, order: usize) -> Result<Self, LmError> {
        let text = fs::read_to_string(path).map_err(|source| LmError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let mut vocab = Vocabulary::new();
        let corpus: Vec<WordId> = text
            .split_whitespace()
            .map(|word| vocab.intern(word))
            .collect();
        if corpus.is_empty() {
            return Err(LmError::Malformed {
                path: path.display().to_string(),
                line: 1,
                reason: "corpus contains no tokens".to_string(),
            });
        }

        let mut suffixes: Vec<usize> = (0..corpus.len()).collect();
        suffixes.sort_by(|&a, &b| corpus[a..].cmp(&corpus[b..]));

        Ok(Self {
            vocab,
            order,
            corpus,
            suffixes,
        })
    }

    /// Compare the suffix starting at `start`, truncated to the pattern
    /// length, against `pattern`. A suffix shorter than the pattern cannot
    /// contain it and orders before any suffix that does.
    fn prefix_cmp(&self, start: usize, pattern: &[WordId]) -> Ordering {
        let end = (start + pattern.len()).min(self.corpus.len());
        self.corpus[start..end].cmp(pattern)
    }

    /// Number of corpus positions where `pattern` occurs.
    fn occurrences(&self, pattern: &[WordId]) -> usize {
        let lower = self
            .suffixes
            .partition_point(|&s| self.prefix_cmp(s, pattern) == Ordering::Less);
        let upper = self
            .suffixes
            .partition_point(|&s| self.prefix_cmp(s, pattern) != Ordering::Greater);
        upper - lower
    }
}

impl LanguageModel for SuffixArrayLm {
    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn order(&self) -> usize {
        self.order
    }

    fn score(&self, context: &[WordId], word: WordId) -> f64 {
        let vocab_size = self.vocab.len() as f64;
        let longest = self.order.min(context.len() + 1);
        for n in (1..=longest).rev() {
            let mut pattern = context[context.len() - (n - 1)..].to_vec();
            pattern.push(word);
            let count = self.occurrences(&pattern);
            if count == 0 {
                continue;
            }
            let history = if n == 1 {
                self.corpus.len()
            } else {
                self.occurrences(&pattern[..n - 1])
            };
            return (count as f64 / (history as f64 + vocab_size)).ln();
        }
        (1.0 / (self.corpus.len() as f64 + vocab_size)).ln()
    }
}
