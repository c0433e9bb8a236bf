//! Language model subsystem.
//!
//! # Responsibilities
//! - Load exactly one model at startup, selected by a type tag
//! - Expose vocabulary lookup and context scoring behind one trait
//! - Stay immutable after load so every connection can share the handle
//!
//! # Design Decisions
//! - The model is loaded before the listener binds; a load failure is fatal
//! - Connections hold `Arc<dyn LanguageModel>`; the trait has no `&mut`
//!   methods, so no locking discipline is needed

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

pub mod suffix;
pub mod table;

pub use suffix::SuffixArrayLm;
pub use table::TableLm;

/// Identifier of a word in the model vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WordId(pub u32);

/// Surface form reserved for out-of-vocabulary words.
pub const UNKNOWN_WORD: &str = "<unk>";

/// Word ↔ id mapping shared by the model and the input reader.
#[derive(Debug, Default)]
pub struct Vocabulary {
    ids: HashMap<String, WordId>,
    words: Vec<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut vocab = Self {
            ids: HashMap::new(),
            words: Vec::new(),
        };
        // Id 0 is always the unknown word.
        vocab.intern(UNKNOWN_WORD);
        vocab
    }

    /// Look up a word, inserting it if absent.
    pub fn intern(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = WordId(self.words.len() as u32);
        self.ids.insert(word.to_string(), id);
        self.words.push(word.to_string());
        id
    }

    /// Look up a word, mapping anything out of vocabulary to `<unk>`.
    pub fn lookup(&self, word: &str) -> WordId {
        self.ids.get(word).copied().unwrap_or(WordId(0))
    }

    /// Surface form for an id.
    pub fn word(&self, id: WordId) -> &str {
        self.words
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_WORD)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Scoring and vocabulary capability every model implementation provides.
///
/// Implementations are read-only after construction and shared by all
/// connections for the process lifetime.
pub trait LanguageModel: Send + Sync {
    /// The vocabulary this model was built over.
    fn vocabulary(&self) -> &Vocabulary;

    /// Model order (maximum context length plus one).
    fn order(&self) -> usize;

    /// Log-probability of `word` following `context` (most recent word
    /// last). Total over all inputs; unseen events get a smoothed floor.
    fn score(&self, context: &[WordId], word: WordId) -> f64;
}

/// Model implementation selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmType {
    /// N-gram table file.
    Sri,
    /// Suffix-array model over a tokenized corpus.
    Salm,
}

impl LmType {
    /// Parse the startup type tag. Anything but `sri` or `salm` is fatal.
    pub fn from_tag(tag: &str) -> Result<Self, LmError> {
        match tag {
            "sri" => Ok(Self::Sri),
            "salm" => Ok(Self::Salm),
            other => Err(LmError::NoSuchLanguageModel(other.to_string())),
        }
    }
}

/// Fatal model-loading errors. Any of these aborts startup before the
/// listening socket is bound.
#[derive(Debug, Error)]
pub enum LmError {
    /// The startup type tag named no known implementation.
    #[error("lm.type {0:?} is not sri or salm")]
    NoSuchLanguageModel(String),

    /// The model file could not be read.
    #[error("failed to load language model from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The model file could not be interpreted.
    #[error("malformed language model {path}, line {line}: {reason}")]
    Malformed {
        path: String,
        line: usize,
        reason: String,
    },
}

/// Load the model named by the startup type tag.
pub fn load(tag: &str, path: &Path, order: usize) -> Result<Arc<dyn LanguageModel>, LmError> {
    let lm_type = LmType::from_tag(tag)?;
    tracing::info!(lm_type = ?lm_type, path = %path.display(), order, "Loading language model");
    let model: Arc<dyn LanguageModel> = match lm_type {
        LmType::Sri => Arc::new(TableLm::load(path, order)?),
        LmType::Salm => Arc::new(SuffixArrayLm::load(path, order)?),
    };
    tracing::info!(
        vocabulary = model.vocabulary().len(),
        "Language model loaded"
    );
    Ok(model)
}
