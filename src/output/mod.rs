//! Result writers.
//!
//! # Responsibilities
//! - Write the top-ranked hypothesis per sentence to the one-best file
//! - Write full n-best lists to per-sentence oracle files when enabled
//!
//! Writers are opened and owned per request; there is no cross-request
//! sharing of output handles.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::decode::Hypothesis;
use crate::input::MatchedSentence;

/// Writes the best hypothesis of each sentence, one line per sentence.
pub struct TopWriter<W: Write> {
    out: W,
    flush_each: bool,
}

impl<W: Write> TopWriter<W> {
    pub fn new(out: W, flush_each: bool) -> Self {
        Self { out, flush_each }
    }

    pub fn write(&mut self, nbest: &[Hypothesis], sentence: &MatchedSentence) -> io::Result<()> {
        match nbest.first() {
            Some(best) => writeln!(self.out, "{}", best.words.join(" "))?,
            // A sentence with no hypotheses still occupies its output line.
            None => writeln!(self.out)?,
        }
        if self.flush_each {
            self.out.flush()?;
        }
        tracing::debug!(sentence = sentence.index, "one-best written");
        Ok(())
    }
}

/// Writes each sentence's full n-best list to `<prefix><index>`.
pub struct OracleWriter {
    prefix: String,
}

impl OracleWriter {
    pub fn new(prefix: String) -> Self {
        Self { prefix }
    }

    pub fn write(&self, nbest: &[Hypothesis], sentence: &MatchedSentence) -> io::Result<()> {
        let path = format!("{}{}", self.prefix, sentence.index);
        let mut out = BufWriter::new(File::create(&path)?);
        for hypothesis in nbest {
            writeln!(out, "{}\t{}", hypothesis.score, hypothesis.words.join(" "))?;
        }
        out.flush()?;
        tracing::debug!(sentence = sentence.index, path = %path, "oracle written");
        Ok(())
    }
}
