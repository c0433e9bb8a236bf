//! N-gram table language model (`lm.type = sri`).
//!
//! The model file holds one n-gram per line: a log-probability followed by
//! one to `order` words. Lookups back off to shorter n-grams with a fixed
//! per-step cost.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{LanguageModel, LmError, Vocabulary, WordId};

/// Cost added for each backoff step to a shorter n-gram.
const BACKOFF_COST: f64 = -0.5;

/// Floor score for events absent from the table entirely.
const UNSEEN_LOG_PROB: f64 = -10.0;

#[derive(Debug)]
pub struct TableLm {
    vocab: Vocabulary,
    order: usize,
    ngrams: HashMap<Vec<WordId>, f64>,
}

impl TableLm {
    pub fn load(path: &Path, order: usize) -> Result<Self, LmError> {
        let text = fs::read_to_string(path).map_err(|source| LmError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let mut vocab = Vocabulary::new();
        let mut ngrams = HashMap::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let malformed = |reason: &str| LmError::Malformed {
                path: path.display().to_string(),
                line: number + 1,
                reason: reason.to_string(),
            };
            let log_prob: f64 = tokens
                .next()
                .ok_or_else(|| malformed("empty entry"))?
                .parse()
                .map_err(|_| malformed("log-probability is not a number"))?;
            let words: Vec<WordId> = tokens.map(|word| vocab.intern(word)).collect();
            if words.is_empty() {
                return Err(malformed("n-gram has no words"));
            }
            if words.len() > order {
                return Err(malformed("n-gram longer than model order"));
            }
            ngrams.insert(words, log_prob);
        }

        Ok(Self {
            vocab,
            order,
            ngrams,
        })
    }
}

impl LanguageModel for TableLm {
    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn order(&self) -> usize {
        self.order
    }

    fn score(&self, context: &[WordId], word: WordId) -> f64 {
        let longest = self.order.min(context.len() + 1);
        for n in (1..=longest).rev() {
            let mut key = context[context.len() - (n - 1)..].to_vec();
            key.push(word);
            if let Some(&log_prob) = self.ngrams.get(&key) {
                return log_prob + BACKOFF_COST * (longest - n) as f64;
            }
        }
        UNSEEN_LOG_PROB
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_model(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn scores_known_ngrams() {
        let file = write_model("-0.2 the\n-0.3 cat\n-0.1 the cat\n");
        let model = TableLm::load(file.path(), 2).unwrap();
        let the = model.vocabulary().lookup("the");
        let cat = model.vocabulary().lookup("cat");
        assert!((model.score(&[the], cat) - -0.1).abs() < 1e-12);
        // No bigram for "cat the": backs off to the unigram with one step.
        assert!((model.score(&[cat], the) - (-0.2 + BACKOFF_COST)).abs() < 1e-12);
    }

    #[test]
    fn unseen_word_gets_floor() {
        let file = write_model("-0.2 the\n");
        let model = TableLm::load(file.path(), 2).unwrap();
        let the = model.vocabulary().lookup("the");
        let unk = model.vocabulary().lookup("never-seen");
        assert_eq!(model.score(&[the], unk), UNSEEN_LOG_PROB);
    }

    #[test]
    fn rejects_overlong_ngram() {
        let file = write_model("-0.1 a b c\n");
        let err = TableLm::load(file.path(), 2).unwrap_err();
        assert!(matches!(err, LmError::Malformed { line: 1, .. }));
    }

    #[test]
    fn rejects_bad_log_prob() {
        let file = write_model("notanumber the\n");
        assert!(matches!(
            TableLm::load(file.path(), 2),
            Err(LmError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = TableLm::load(Path::new("/nonexistent/model"), 2).unwrap_err();
        assert!(matches!(err, LmError::Load { .. }));
    }
}
